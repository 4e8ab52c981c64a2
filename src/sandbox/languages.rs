mod cpp;
mod java;
mod javascript;
mod python;

pub use cpp::Cpp;
pub use java::Java;
pub use javascript::JavaScript;
pub use python::Python;
