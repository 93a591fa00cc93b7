// src/handlers/mod.rs

pub mod admin;
pub mod auth;
pub mod feedback;
pub mod message;
pub mod profile;
pub mod skill;
pub mod swap_request;

use axum::Json;
use serde_json::{Value, json};

/// Liveness check.
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
