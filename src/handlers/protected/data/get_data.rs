// handlers/protected/data/get_data.rs - POST /get_data handler

use axum::extract::{rejection::JsonRejection, State};
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Instant;

use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::server::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct DataRequest {
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DataResponse {
    pub status: &'static str,
    pub data: Value,
    pub metadata: DataMetadata,
}

#[derive(Debug, Serialize)]
pub struct DataMetadata {
    pub processing_time_seconds: f64,
    pub records_returned: usize,
    pub privacy_applied: bool,
}

/// POST /get_data - natural-language data request
///
/// Collects matching datasets, redacts them through the LLM, then runs the
/// PII guard over the result. If redaction fails the data is withheld and
/// the request still succeeds.
pub async fn get_data_post(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    payload: Result<Json<DataRequest>, JsonRejection>,
) -> ApiResult<DataResponse> {
    let started = Instant::now();
    let Json(payload) = payload?;

    let description = payload
        .description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
        .ok_or_else(|| ApiError::bad_request("Description required"))?;

    tracing::info!("Data request from {}: {:?}", user.email, description);

    // A panic anywhere in the pipeline surfaces as a 500 instead of a dropped connection
    let data = tokio::spawn(process(state, description))
        .await
        .map_err(|e| {
            tracing::error!("Data request pipeline failed: {}", e);
            ApiError::processing_failed("Failed to process data request", e.to_string())
        })?;

    let records_returned = match &data {
        Value::Array(items) => items.len(),
        _ => 1,
    };

    Ok(ApiResponse::success(DataResponse {
        status: "success",
        data,
        metadata: DataMetadata {
            processing_time_seconds: round2(started.elapsed().as_secs_f64()),
            records_returned,
            privacy_applied: true,
        },
    }))
}

async fn process(state: AppState, description: String) -> Value {
    let collected = state.collector.collect(&description).await;

    let mut data = match state.redactor.redact_json(&collected).await {
        Ok(redacted) => redacted,
        Err(e) => {
            tracing::error!("Redaction failed, withholding data: {}", e);
            withheld(&e.to_string())
        }
    };

    let masked = state.guard.scrub(&mut data);
    if masked > 0 {
        tracing::warn!("PII guard masked {} value(s) the redactor left behind", masked);
    }
    data
}

fn withheld(reason: &str) -> Value {
    json!({
        "error": "Redaction failed",
        "original_data": "[WITHHELD FOR PRIVACY]",
        "note": reason,
    })
}

fn round2(seconds: f64) -> f64 {
    (seconds * 100.0).round() / 100.0
}
