use std::io;
use std::time::Duration;

use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use super::codegen::{self, Call, GenerateError};
use super::compare::normalize_output;
use super::languages::{Cpp, Java, JavaScript, Python};
use super::process::{CommandSpec, Execution, ProcessExecutor, ProcessOutput};
use super::workspace::{Workspace, WorkspaceManager};
use super::{ErrorKind, Language, RunOutcome};
use crate::catalog::TestCase;
use crate::config::{Limits, Toolchains};
use crate::value::Value;

/// Longest error message kept in a report
const MAX_MESSAGE_CHARS: usize = 4096;

/// Language-specific half of running a submission
///
/// Implementations only describe *what* to generate and *which* commands to
/// run; the shared pipeline in [`Harness::run_test_case`] owns workspaces,
/// process execution and output interpretation.
pub trait LanguageAdapter: Send + Sync {
    fn language(&self) -> Language;

    /// File name the driver is written to inside the workspace
    fn source_file(&self) -> &'static str;

    /// Translates the exercise's function name to this language's convention
    fn function_name(&self, name: &str) -> String {
        name.to_string()
    }

    /// Renders one argument as a source literal, refusing unsupported values
    fn literal(&self, value: &Value) -> Result<String, GenerateError>;

    /// Wraps the submission with an entry point performing `call`
    fn render_driver(&self, source: &str, call: &Call) -> String;

    /// Compiler invocation, if the language has a separate compile step
    fn compile_command(&self, _timeout: Duration) -> Option<CommandSpec> {
        None
    }

    fn run_command(&self, timeout: Duration) -> CommandSpec;
}

/// Exhaustive dispatch table from [`Language`] to its adapter
pub struct Adapters {
    javascript: JavaScript,
    python: Python,
    java: Java,
    cpp: Cpp,
}

impl Adapters {
    pub fn new(toolchains: &Toolchains) -> Self {
        Self {
            javascript: JavaScript::new(&toolchains.node),
            python: Python::new(&toolchains.python),
            java: Java::new(&toolchains.javac, &toolchains.java),
            cpp: Cpp::new(&toolchains.cxx),
        }
    }

    pub fn get(&self, language: Language) -> &dyn LanguageAdapter {
        match language {
            Language::JavaScript => &self.javascript,
            Language::Python => &self.python,
            Language::Java => &self.java,
            Language::Cpp => &self.cpp,
        }
    }
}

/// The run was abandoned because its request was cancelled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

#[derive(Deserialize)]
struct ErrorLine {
    error: String,
}

/// Shared execution pipeline used by every adapter
#[derive(Debug, Clone)]
pub struct Harness {
    workspaces: WorkspaceManager,
    executor: ProcessExecutor,
    limits: Limits,
}

impl Harness {
    pub fn new(workspaces: WorkspaceManager, limits: Limits) -> Self {
        let executor = ProcessExecutor::new(limits.output_limit.0 as usize);
        Self {
            workspaces,
            executor,
            limits,
        }
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    pub fn workspaces(&self) -> &WorkspaceManager {
        &self.workspaces
    }

    /// Runs one test case for one submission
    ///
    /// Every failure is folded into the returned [`RunOutcome`]; only
    /// cancellation escapes. The attempt's workspace is gone when this
    /// returns, whichever way it returns.
    pub async fn run_test_case(
        &self,
        adapter: &dyn LanguageAdapter,
        source: &str,
        function_name: &str,
        case: &TestCase,
        cancel: &CancellationToken,
    ) -> Result<RunOutcome, Cancelled> {
        let driver = match codegen::generate(adapter, source, function_name, &case.input) {
            Ok(driver) => driver,
            Err(e) => return Ok(RunOutcome::error(ErrorKind::Protocol, e.to_string())),
        };

        let workspace = match self.workspaces.allocate() {
            Ok(workspace) => workspace,
            Err(e) => {
                log::error!("Failed to allocate workspace: {e}");
                return Ok(RunOutcome::error(
                    ErrorKind::Resource,
                    format!("Failed to allocate workspace: {e}"),
                ));
            }
        };

        let outcome = self.run_in(&workspace, adapter, &driver, cancel).await;

        if let Err(e) = workspace.close() {
            log::warn!("Failed to remove workspace: {e}");
        }
        outcome
    }

    async fn run_in(
        &self,
        workspace: &Workspace,
        adapter: &dyn LanguageAdapter,
        driver: &str,
        cancel: &CancellationToken,
    ) -> Result<RunOutcome, Cancelled> {
        if let Err(e) = workspace.write_file(adapter.source_file(), driver) {
            return Ok(RunOutcome::error(
                ErrorKind::Resource,
                format!("Failed to write driver source: {e}"),
            ));
        }

        // Step 1: compile, if the language needs it
        if let Some(compile) = adapter.compile_command(self.limits.compile_timeout.into()) {
            let execution = self
                .executor
                .execute(&compile, workspace.path(), cancel)
                .await;
            match self.settle(execution, &compile, workspace)? {
                Settled::Finished(output) if output.success() => {}
                Settled::Finished(output) => {
                    let diagnostics = compile_diagnostics(&output);
                    return Ok(RunOutcome::error(
                        ErrorKind::Compile,
                        clip(workspace.scrub(&diagnostics)),
                    ));
                }
                Settled::Outcome(outcome) => return Ok(outcome),
            }
        }

        // Step 2: run the driver
        let run = adapter.run_command(self.limits.run_timeout.into());
        let execution = self.executor.execute(&run, workspace.path(), cancel).await;
        let output = match self.settle(execution, &run, workspace)? {
            Settled::Finished(output) => output,
            Settled::Outcome(outcome) => return Ok(outcome),
        };

        // Step 3: interpret what the driver printed
        let flagged = structured_error(&output.stderr);
        if !output.success() || flagged.is_some() {
            let message = flagged.unwrap_or_else(|| runtime_diagnostics(&output));
            return Ok(RunOutcome::error(
                ErrorKind::Runtime,
                clip(workspace.scrub(&message)),
            ));
        }

        Ok(match normalize_output(&output.stdout) {
            Ok(value) => RunOutcome::Value(value),
            Err(e) => RunOutcome::error(ErrorKind::Protocol, e.to_string()),
        })
    }

    /// Maps non-completed executions to their outcome
    fn settle(
        &self,
        execution: io::Result<Execution>,
        command: &CommandSpec,
        workspace: &Workspace,
    ) -> Result<Settled, Cancelled> {
        match execution {
            Ok(Execution::Completed(output)) => Ok(Settled::Finished(output)),
            Ok(Execution::TimedOut) => Ok(Settled::Outcome(RunOutcome::Timeout)),
            Ok(Execution::OutputTooLarge) => Ok(Settled::Outcome(RunOutcome::error(
                ErrorKind::Resource,
                "output too large",
            ))),
            Ok(Execution::Cancelled) => Err(Cancelled),
            Err(e) => {
                log::error!("Failed to launch `{}`: {e}", command.program);
                Ok(Settled::Outcome(RunOutcome::error(
                    ErrorKind::Resource,
                    workspace.scrub(&format!("Failed to launch `{}`: {e}", command.program)),
                )))
            }
        }
    }
}

enum Settled {
    Finished(ProcessOutput),
    Outcome(RunOutcome),
}

/// Message from the driver's `{"error": ...}` line on stderr, if present
fn structured_error(stderr: &str) -> Option<String> {
    stderr
        .lines()
        .rev()
        .map(str::trim)
        .filter(|line| line.starts_with('{'))
        .find_map(|line| serde_json::from_str::<ErrorLine>(line).ok())
        .map(|line| line.error)
}

fn compile_diagnostics(output: &ProcessOutput) -> String {
    let text = [output.stderr.trim(), output.stdout.trim()]
        .iter()
        .filter(|s| !s.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("\n");
    if text.is_empty() {
        format!("Compilation failed: {}", output.status_line())
    } else {
        text
    }
}

fn runtime_diagnostics(output: &ProcessOutput) -> String {
    let stderr = output.stderr.trim();
    if stderr.is_empty() {
        output.status_line()
    } else {
        stderr.to_string()
    }
}

fn clip(message: String) -> String {
    if message.chars().count() <= MAX_MESSAGE_CHARS {
        return message;
    }
    let mut clipped: String = message.chars().take(MAX_MESSAGE_CHARS).collect();
    clipped.push_str("\n[truncated]");
    clipped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(stdout: &str, stderr: &str, exit_code: i32) -> ProcessOutput {
        ProcessOutput {
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
            exit_code: Some(exit_code),
            signal: None,
        }
    }

    #[test]
    fn test_structured_error_line() {
        assert_eq!(
            structured_error("{\"error\": \"division by zero\"}\n").as_deref(),
            Some("division by zero")
        );
        assert_eq!(
            structured_error("warning: noise\n{\"error\": \"boom\"}\n").as_deref(),
            Some("boom")
        );
        assert_eq!(structured_error("Traceback (most recent call last):\n"), None);
        assert_eq!(structured_error("{not json}"), None);
    }

    #[test]
    fn test_diagnostics_fall_back_to_status() {
        assert_eq!(
            runtime_diagnostics(&output("", "", 139)),
            "Process exited with code 139"
        );
        assert_eq!(runtime_diagnostics(&output("", " oops \n", 1)), "oops");
        assert_eq!(
            compile_diagnostics(&output("", "", 1)),
            "Compilation failed: Process exited with code 1"
        );
        assert_eq!(
            compile_diagnostics(&output("note", "error: x", 1)),
            "error: x\nnote"
        );
    }

    #[test]
    fn test_clip_long_messages() {
        let long = "x".repeat(MAX_MESSAGE_CHARS + 10);
        let clipped = clip(long);
        assert!(clipped.ends_with("[truncated]"));
        assert_eq!(clip("short".to_string()), "short");
    }

    #[test]
    fn test_dispatch_is_exhaustive() {
        let adapters = Adapters::new(&Toolchains::default());
        for language in Language::ALL {
            assert_eq!(adapters.get(language).language(), language);
        }
    }
}
