mod get;
mod verify;

pub use get::{get_exercise_by_id_handler, get_exercises_handler};
pub use verify::verify_exercise_handler;

use std::collections::BTreeMap;

use actix_web::{HttpResponse, Responder, get, post, web};
use serde::Serialize;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use super::{ErrorResponse, verify_error_response};
use crate::catalog::{Difficulty, Exercise};
use crate::queue::{JobQueue, VerifyJob};
use crate::sandbox::Language;
use crate::value::Value;
use crate::verifier::{Verifier, VerifyRequest};

/// Catalog entry as exposed to clients
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseView<'a> {
    pub id: &'a str,
    pub title: &'a str,
    pub description: &'a str,
    pub difficulty: Difficulty,
    pub function_name: &'a str,
    pub test_cases: Vec<TestCaseView<'a>>,
    pub starter_code: &'a BTreeMap<Language, String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCaseView<'a> {
    pub input: &'a [Value],
    pub expected_output: &'a Value,
}

impl<'a> From<&'a Exercise> for ExerciseView<'a> {
    fn from(exercise: &'a Exercise) -> Self {
        Self {
            id: &exercise.id,
            title: &exercise.title,
            description: &exercise.description,
            difficulty: exercise.difficulty,
            function_name: &exercise.function_name,
            test_cases: exercise
                .test_cases
                .iter()
                .map(|case| TestCaseView {
                    input: &case.input,
                    expected_output: &case.expected_output,
                })
                .collect(),
            starter_code: &exercise.starter_code,
        }
    }
}
