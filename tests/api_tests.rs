use std::sync::Arc;

use actix_web::{App, http::StatusCode, test, web};
use assert_json_diff::assert_json_include;
use pretty_assertions::assert_eq;
use serde_json::{Value as Json, json};
use tempfile::TempDir;

use exercise_runner::catalog::ExerciseCatalog;
use exercise_runner::config::{Limits, Toolchains};
use exercise_runner::queue::JobQueue;
use exercise_runner::routes;
use exercise_runner::sandbox::{RunOutcome, WorkspaceManager};
use exercise_runner::value::Value;
use exercise_runner::verifier::{TestResult, VerificationReport, Verifier};

// Helper function to build a verifier over the built-in catalog
fn create_test_verifier() -> (Arc<Verifier>, TempDir) {
    let root = TempDir::new().unwrap();
    let verifier = Verifier::new(
        Arc::new(ExerciseCatalog::builtin()),
        &Toolchains::default(),
        WorkspaceManager::new(root.path()).unwrap(),
        Limits::default(),
    );
    (Arc::new(verifier), root)
}

// Mock worker that answers every job with a passing report
async fn mock_worker(job_queue: Arc<JobQueue>) {
    loop {
        let job = job_queue.pop().await;
        println!("Mock worker received job: {}", job.id);

        let results = vec![TestResult {
            input: vec![Value::Int(2), Value::Int(3)],
            expected: Value::Int(5),
            outcome: RunOutcome::Value(Value::Int(5)),
            passed: true,
        }];
        let report = VerificationReport {
            exercise_id: job.request.exercise_id.clone(),
            success: true,
            all_passed: true,
            passed: 1,
            total: 1,
            results,
            error: None,
        };
        let _ = job.responder.send(Ok(report));
    }
}

macro_rules! init_app {
    ($verifier:expr, $queue:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::from($verifier.clone()))
                .app_data(web::Data::from($queue.clone()))
                .configure(routes::configure),
        )
        .await
    };
}

async fn post_verify(body: Json) -> (StatusCode, Json) {
    let (verifier, _root) = create_test_verifier();
    let queue = Arc::new(JobQueue::new());
    let app = init_app!(verifier, queue);

    let req = test::TestRequest::post()
        .uri("/api/exercises/verify")
        .set_json(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    let status = resp.status();
    let body: Json = test::read_body_json(resp).await;
    (status, body)
}

#[actix_web::test]
async fn test_verify_unknown_exercise() {
    let (status, body) = post_verify(json!({
        "exerciseId": "does-not-exist",
        "code": "def f(): pass",
        "language": "python"
    }))
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_json_include!(
        actual: body,
        expected: json!({"reason": "ERR_NOT_FOUND", "code": 3})
    );
}

#[actix_web::test]
async fn test_verify_unsupported_language() {
    let (status, body) = post_verify(json!({
        "exerciseId": "sum-two-numbers",
        "code": "sum = 1",
        "language": "ruby"
    }))
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["reason"], "ERR_UNSUPPORTED_LANGUAGE");
    assert_eq!(body["message"], "Language 'ruby' is not supported");
}

#[actix_web::test]
async fn test_verify_empty_code() {
    let (status, body) = post_verify(json!({
        "exerciseId": "sum-two-numbers",
        "code": "   \n",
        "language": "javascript"
    }))
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["reason"], "ERR_EMPTY_CODE");
}

#[actix_web::test]
async fn test_verify_malformed_body() {
    let (verifier, _root) = create_test_verifier();
    let queue = Arc::new(JobQueue::new());
    let app = init_app!(verifier, queue);

    let req = test::TestRequest::post()
        .uri("/api/exercises/verify")
        .insert_header(("content-type", "application/json"))
        .set_payload("{\"exerciseId\": 5")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Json = test::read_body_json(resp).await;
    assert_eq!(body["reason"], "ERR_INVALID_ARGUMENT");
    assert_eq!(body["code"], 1);
}

#[actix_web::test]
async fn test_verify_is_answered_by_worker() {
    let (verifier, _root) = create_test_verifier();
    let queue = Arc::new(JobQueue::new());
    let app = init_app!(verifier, queue);
    let worker = actix_web::rt::spawn(mock_worker(queue.clone()));

    let req = test::TestRequest::post()
        .uri("/api/exercises/verify")
        .set_json(json!({
            "exerciseId": "sum-two-numbers",
            "code": "function sum(a, b) { return a + b; }",
            "language": "interpreted-dynamic"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Json = test::read_body_json(resp).await;
    assert_json_include!(
        actual: body,
        expected: json!({
            "exerciseId": "sum-two-numbers",
            "allPassed": true,
            "passed": 1,
            "total": 1,
            "error": null,
            "testResults": [{
                "input": [2, 3],
                "expected": 5,
                "actual": 5,
                "passed": true,
                "error": null
            }]
        })
    );

    worker.abort();
}

#[actix_web::test]
async fn test_list_and_get_exercises() {
    let (verifier, _root) = create_test_verifier();
    let queue = Arc::new(JobQueue::new());
    let app = init_app!(verifier, queue);

    let req = test::TestRequest::get().uri("/api/exercises").to_request();
    let body: Json = test::call_and_read_body_json(&app, req).await;
    let ids: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["id"].as_str().unwrap())
        .collect();
    assert_eq!(
        ids,
        vec![
            "sum-two-numbers",
            "is-even",
            "reverse-string",
            "find-max",
            "count-vowels",
            "fibonacci"
        ]
    );

    let req = test::TestRequest::get()
        .uri("/api/exercises/find-max")
        .to_request();
    let body: Json = test::call_and_read_body_json(&app, req).await;
    assert_json_include!(
        actual: body,
        expected: json!({
            "id": "find-max",
            "functionName": "findMax",
            "difficulty": "medium",
            "testCases": [{"input": [[1, 5, 3, 9, 2]], "expectedOutput": 9}]
        })
    );
    assert!(body["starterCode"]["python"]
        .as_str()
        .unwrap()
        .starts_with("def find_max"));

    let req = test::TestRequest::get()
        .uri("/api/exercises/nope")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_health() {
    let (verifier, _root) = create_test_verifier();
    let queue = Arc::new(JobQueue::new());
    let app = init_app!(verifier, queue);

    let req = test::TestRequest::get().uri("/api/health").to_request();
    let body: Json = test::call_and_read_body_json(&app, req).await;
    assert_eq!(
        body,
        json!({
            "status": "healthy",
            "languages": ["javascript", "python", "java", "cpp"]
        })
    );
}
