mod adapter;
pub mod codegen;
pub mod compare;
mod languages;
pub mod process;
pub mod workspace;

pub use adapter::{Adapters, Cancelled, Harness, LanguageAdapter};
pub use process::{CommandSpec, Execution, ProcessExecutor, ProcessOutput};
pub use workspace::{Workspace, WorkspaceManager};

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// The closed set of submission languages
///
/// Adding a language means adding a variant here and an arm in
/// [`Adapters::get`]; the compiler points at everything else that must change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[serde(alias = "interpreted-dynamic")]
    JavaScript,
    #[serde(alias = "interpreted-runtime")]
    Python,
    #[serde(alias = "bytecode-compiled")]
    Java,
    #[serde(alias = "natively-compiled")]
    Cpp,
}

impl Language {
    pub const ALL: [Language; 4] = [
        Language::JavaScript,
        Language::Python,
        Language::Java,
        Language::Cpp,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::JavaScript => "javascript",
            Language::Python => "python",
            Language::Java => "java",
            Language::Cpp => "cpp",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "javascript" | "js" | "interpreted-dynamic" => Ok(Language::JavaScript),
            "python" | "py" | "interpreted-runtime" => Ok(Language::Python),
            "java" | "bytecode-compiled" => Ok(Language::Java),
            "cpp" | "c++" | "natively-compiled" => Ok(Language::Cpp),
            _ => Err(s.to_string()),
        }
    }
}

/// Category of a per-test-case execution failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    /// The compiler rejected the driver
    Compile,
    /// The program exited non-zero or reported an uncaught error
    Runtime,
    /// The program's output was not a canonical value
    Protocol,
    /// Output cap exceeded, or the scratch space or process could not be set up
    Resource,
}

/// What happened when one test case ran
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Value(Value),
    ExecutionError { kind: ErrorKind, message: String },
    Timeout,
}

impl RunOutcome {
    pub fn error(kind: ErrorKind, message: impl Into<String>) -> Self {
        RunOutcome::ExecutionError {
            kind,
            message: message.into(),
        }
    }

    pub fn value(&self) -> Option<&Value> {
        match self {
            RunOutcome::Value(v) => Some(v),
            _ => None,
        }
    }

    /// Message surfaced to the caller, `None` for a produced value
    pub fn error_message(&self) -> Option<String> {
        match self {
            RunOutcome::Value(_) => None,
            RunOutcome::ExecutionError { message, .. } => Some(message.clone()),
            RunOutcome::Timeout => Some("Execution timeout".to_string()),
        }
    }
}
