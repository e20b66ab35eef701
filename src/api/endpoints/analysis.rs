//! Analysis lifecycle endpoints.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::pipeline::analysis::AnalysisJob;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRequest {
    pub document_url: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartResponse {
    pub generation: u64,
    pub document_url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobResponse {
    pub generation: u64,
    #[serde(flatten)]
    pub job: AnalysisJob,
}

/// `POST /api/analysis`: start a screening cycle.
///
/// The body is optional; without a `documentUrl` the configured demo
/// document is analysed.
pub async fn start(
    State(ctx): State<ApiContext>,
    body: Bytes,
) -> Result<(StatusCode, Json<StartResponse>), ApiError> {
    let request: StartRequest = if body.iter().all(u8::is_ascii_whitespace) {
        StartRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| ApiError::BadRequest(e.to_string()))?
    };

    let document_url = request
        .document_url
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .or_else(|| ctx.config.demo_pdf_url.clone())
        .ok_or_else(|| {
            ApiError::BadRequest("documentUrl is required (no DEMO_PDF_URL configured)".into())
        })?;

    let generation = ctx.runner.start(&document_url)?;

    Ok((
        StatusCode::ACCEPTED,
        Json(StartResponse {
            generation,
            document_url,
        }),
    ))
}

/// `GET /api/analysis`: current job snapshot.
pub async fn status(State(ctx): State<ApiContext>) -> Result<Json<JobResponse>, ApiError> {
    let session = ctx.session();
    Ok(Json(JobResponse {
        generation: session.generation(),
        job: session.job()?,
    }))
}

/// `DELETE /api/analysis`: cancel in-flight work and clear the session.
pub async fn reset(State(ctx): State<ApiContext>) -> Result<StatusCode, ApiError> {
    ctx.session().reset()?;
    Ok(StatusCode::NO_CONTENT)
}
