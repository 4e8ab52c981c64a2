mod exercises;
mod health;

pub use exercises::*;
pub use health::health_handler;

use actix_web::error::{InternalError, JsonPayloadError};
use actix_web::{HttpRequest, HttpResponse, web};
use serde::Serialize;

use crate::verifier::VerifyError;

#[derive(Serialize)]
struct ErrorResponse {
    reason: &'static str,
    code: u32,
    message: String,
}

impl ErrorResponse {
    fn bad_request(reason: &'static str, code: u32, message: impl Into<String>) -> HttpResponse {
        HttpResponse::BadRequest().json(Self {
            reason,
            code,
            message: message.into(),
        })
    }

    fn not_found(message: impl Into<String>) -> HttpResponse {
        HttpResponse::NotFound().json(Self {
            reason: "ERR_NOT_FOUND",
            code: 3,
            message: message.into(),
        })
    }

    fn internal(message: impl Into<String>) -> HttpResponse {
        HttpResponse::InternalServerError().json(Self {
            reason: "ERR_INTERNAL",
            code: 6,
            message: message.into(),
        })
    }
}

/// Maps a rejected verification to its HTTP status and error tag
pub(crate) fn verify_error_response(err: &VerifyError) -> HttpResponse {
    let message = err.to_string();
    match err {
        VerifyError::NotFound(_) => ErrorResponse::not_found(message),
        VerifyError::UnsupportedLanguage(_) => {
            ErrorResponse::bad_request("ERR_UNSUPPORTED_LANGUAGE", 7, message)
        }
        VerifyError::EmptyCode => ErrorResponse::bad_request("ERR_EMPTY_CODE", 8, message),
        VerifyError::UnsupportedArgument { .. } => {
            ErrorResponse::bad_request("ERR_UNSUPPORTED_ARGUMENT", 9, message)
        }
        VerifyError::Cancelled => ErrorResponse::internal(message),
    }
}

pub fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    let response = ErrorResponse::bad_request("ERR_INVALID_ARGUMENT", 1, err.to_string());
    InternalError::from_response(err, response).into()
}

/// Registers every route under `/api`
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error_handler))
        .service(
            web::scope("/api")
                .service(verify_exercise_handler)
                .service(get_exercises_handler)
                .service(get_exercise_by_id_handler)
                .service(health_handler),
        );
}
