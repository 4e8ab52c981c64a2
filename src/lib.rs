pub mod catalog;
pub mod config;
pub mod queue;
pub mod routes;
pub mod sandbox;
pub mod value;
pub mod verifier;
pub mod web_server;
pub mod worker;
