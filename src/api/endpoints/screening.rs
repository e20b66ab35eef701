//! Screening result and user-input endpoints.

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::pipeline::verdict::{Feedback, ManualDecision};
use crate::session::{IndicatorFocus, ScreeningSnapshot};

#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    pub feedback: Feedback,
}

#[derive(Debug, Serialize)]
pub struct FeedbackResponse {
    pub id: String,
    /// `None` when the request cleared the previous feedback.
    pub feedback: Option<Feedback>,
}

#[derive(Debug, Deserialize)]
pub struct DecisionRequest {
    pub decision: ManualDecision,
}

#[derive(Debug, Serialize)]
pub struct DecisionResponse {
    pub id: String,
    pub decision: Option<ManualDecision>,
}

/// `GET /api/screening`
pub async fn snapshot(State(ctx): State<ApiContext>) -> Result<Json<ScreeningSnapshot>, ApiError> {
    Ok(Json(ctx.session().snapshot()?))
}

/// `GET /api/screening/indicators/:id/locations`
pub async fn locations(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<IndicatorFocus>, ApiError> {
    Ok(Json(ctx.session().focus(&id)?))
}

/// `PUT /api/screening/indicators/:id/feedback`: toggles.
pub async fn feedback(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
    Json(request): Json<FeedbackRequest>,
) -> Result<Json<FeedbackResponse>, ApiError> {
    let feedback = ctx.session().toggle_feedback(&id, request.feedback)?;
    tracing::info!(indicator = id.as_str(), feedback = ?feedback, "Feedback updated");
    Ok(Json(FeedbackResponse { id, feedback }))
}

/// `PUT /api/screening/indicators/:id/decision`: toggles; warning indicators only.
pub async fn decision(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
    Json(request): Json<DecisionRequest>,
) -> Result<Json<DecisionResponse>, ApiError> {
    let decision = ctx.session().toggle_decision(&id, request.decision)?;
    tracing::info!(indicator = id.as_str(), decision = ?decision, "Manual decision updated");
    Ok(Json(DecisionResponse { id, decision }))
}
