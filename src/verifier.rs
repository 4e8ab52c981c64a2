use std::sync::Arc;

use futures_util::stream::{self, StreamExt, TryStreamExt};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::catalog::{Exercise, ExerciseCatalog, TestCase};
use crate::config::{Limits, Toolchains};
use crate::sandbox::codegen::{self, GenerateError};
use crate::sandbox::compare::compare;
use crate::sandbox::{
    Adapters, Cancelled, ErrorKind, Harness, Language, LanguageAdapter, RunOutcome,
    WorkspaceManager,
};
use crate::value::Value;

/// A verification request as it arrives over the wire
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    pub exercise_id: String,
    pub code: String,
    pub language: String,
}

#[derive(Debug, Clone)]
pub struct Submission {
    pub language: Language,
    pub code: String,
}

#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("Exercise '{0}' not found")]
    NotFound(String),
    #[error("Language '{0}' is not supported")]
    UnsupportedLanguage(String),
    #[error("Submitted code is empty")]
    EmptyCode,
    #[error("Test case {case} cannot be run in {language}: {source}")]
    UnsupportedArgument {
        case: usize,
        language: Language,
        source: GenerateError,
    },
    #[error("Verification was cancelled")]
    Cancelled,
}

impl From<Cancelled> for VerifyError {
    fn from(_: Cancelled) -> Self {
        VerifyError::Cancelled
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TestResult {
    pub input: Vec<Value>,
    pub expected: Value,
    pub outcome: RunOutcome,
    pub passed: bool,
}

impl TestResult {
    fn new(case: &TestCase, outcome: RunOutcome) -> Self {
        let passed = compare(&outcome, &case.expected_output);
        Self {
            input: case.input.clone(),
            expected: case.expected_output.clone(),
            outcome,
            passed,
        }
    }

    /// `timeout` for timeouts, the error kind for execution errors
    pub fn error_kind(&self) -> Option<&'static str> {
        match &self.outcome {
            RunOutcome::Value(_) => None,
            RunOutcome::Timeout => Some("timeout"),
            RunOutcome::ExecutionError { kind, .. } => Some(match kind {
                ErrorKind::Compile => "compile",
                ErrorKind::Runtime => "runtime",
                ErrorKind::Protocol => "protocol",
                ErrorKind::Resource => "resource",
            }),
        }
    }
}

impl Serialize for TestResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("TestResult", 6)?;
        state.serialize_field("input", &self.input)?;
        state.serialize_field("expected", &self.expected)?;
        state.serialize_field("actual", &self.outcome.value())?;
        state.serialize_field("passed", &self.passed)?;
        state.serialize_field("error", &self.outcome.error_message())?;
        state.serialize_field("errorKind", &self.error_kind())?;
        state.end()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationReport {
    pub exercise_id: String,
    pub success: bool,
    pub all_passed: bool,
    pub passed: usize,
    pub total: usize,
    #[serde(rename = "testResults")]
    pub results: Vec<TestResult>,
    /// First error message in test case order
    pub error: Option<String>,
}

impl VerificationReport {
    fn new(exercise_id: &str, results: Vec<TestResult>) -> Self {
        let passed = results.iter().filter(|r| r.passed).count();
        let total = results.len();
        let error = results.iter().find_map(|r| r.outcome.error_message());
        Self {
            exercise_id: exercise_id.to_string(),
            success: true,
            all_passed: passed == total,
            passed,
            total,
            results,
            error,
        }
    }
}

/// Runs submissions against the exercise catalog
pub struct Verifier {
    catalog: Arc<ExerciseCatalog>,
    adapters: Adapters,
    harness: Harness,
}

impl Verifier {
    pub fn new(
        catalog: Arc<ExerciseCatalog>,
        toolchains: &Toolchains,
        workspaces: WorkspaceManager,
        limits: Limits,
    ) -> Self {
        Self {
            catalog,
            adapters: Adapters::new(toolchains),
            harness: Harness::new(workspaces, limits),
        }
    }

    pub fn catalog(&self) -> &ExerciseCatalog {
        &self.catalog
    }

    /// Validates a wire request without running anything
    pub fn check(&self, request: &VerifyRequest) -> Result<Submission, VerifyError> {
        let exercise = self.exercise(&request.exercise_id)?;
        let language = request
            .language
            .parse::<Language>()
            .map_err(VerifyError::UnsupportedLanguage)?;
        let submission = Submission {
            language,
            code: request.code.clone(),
        };
        self.preflight(exercise, &submission)?;
        Ok(submission)
    }

    /// Checks then verifies a wire request
    pub async fn verify_request(
        &self,
        request: &VerifyRequest,
        cancel: &CancellationToken,
    ) -> Result<VerificationReport, VerifyError> {
        let submission = self.check(request)?;
        self.verify(&request.exercise_id, &submission, cancel).await
    }

    /// Runs every test case of an exercise against a submission
    ///
    /// Fails only on pre-flight errors or cancellation; per-case failures are
    /// recorded in the report. Results keep catalog order.
    pub async fn verify(
        &self,
        exercise_id: &str,
        submission: &Submission,
        cancel: &CancellationToken,
    ) -> Result<VerificationReport, VerifyError> {
        let exercise = self.exercise(exercise_id)?;
        self.preflight(exercise, submission)?;

        let adapter = self.adapters.get(submission.language);
        let parallelism = self.harness.limits().case_parallelism.max(1);
        log::debug!(
            "Verifying {} submission for '{exercise_id}' ({} cases, {parallelism} at a time)",
            submission.language,
            exercise.test_cases.len()
        );

        // Futures are built eagerly so the returned future stays Send
        let runs: Vec<_> = exercise
            .test_cases
            .iter()
            .enumerate()
            .map(|(idx, case)| self.run_case(adapter, exercise, &submission.code, idx, case, cancel))
            .collect();
        let results: Vec<TestResult> = stream::iter(runs)
            .buffered(parallelism)
            .try_collect()
            .await?;

        let report = VerificationReport::new(exercise_id, results);
        log::info!(
            "Verified {} submission for '{exercise_id}': {}/{} passed",
            submission.language,
            report.passed,
            report.total
        );
        Ok(report)
    }

    async fn run_case(
        &self,
        adapter: &dyn LanguageAdapter,
        exercise: &Exercise,
        code: &str,
        idx: usize,
        case: &TestCase,
        cancel: &CancellationToken,
    ) -> Result<TestResult, Cancelled> {
        let outcome = self
            .harness
            .run_test_case(adapter, code, &exercise.function_name, case, cancel)
            .await?;
        log::debug!("Case {idx} of '{}': {outcome:?}", exercise.id);
        Ok(TestResult::new(case, outcome))
    }

    fn exercise(&self, id: &str) -> Result<&Exercise, VerifyError> {
        self.catalog
            .get(id)
            .ok_or_else(|| VerifyError::NotFound(id.to_string()))
    }

    fn preflight(&self, exercise: &Exercise, submission: &Submission) -> Result<(), VerifyError> {
        if submission.code.trim().is_empty() {
            return Err(VerifyError::EmptyCode);
        }

        let adapter = self.adapters.get(submission.language);
        for (case, test_case) in exercise.test_cases.iter().enumerate() {
            codegen::build_call(adapter, &exercise.function_name, &test_case.input).map_err(
                |source| VerifyError::UnsupportedArgument {
                    case,
                    language: submission.language,
                    source,
                },
            )?;
        }
        Ok(())
    }
}
