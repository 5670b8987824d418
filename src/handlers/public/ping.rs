// handlers/public/ping.rs - GET /ping health check

use axum::Json;
use chrono::Utc;
use serde_json::{json, Value};

pub const SERVICE_NAME: &str = "US Federal Data Exchange";

pub async fn ping_get() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "timestamp": Utc::now().to_rfc3339(),
        "service": SERVICE_NAME,
    }))
}
