use actix_web::{HttpResponse, Responder, get};
use serde_json::json;

use crate::sandbox::Language;

#[get("/health")]
pub async fn health_handler() -> impl Responder {
    HttpResponse::Ok().json(json!({
        "status": "healthy",
        "languages": Language::ALL,
    }))
}
