use crate::errors::AppError;
use crate::leads::{LeadFunnelService, LeadStep, StepOutcome};
use crate::storage::UserStore;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

/// Shared application state injected into handlers.
pub struct AppState {
    /// Lead funnel business logic.
    pub service: LeadFunnelService,
    /// User lookups for the demo endpoint.
    pub users: UserStore,
}

/// Health check endpoint.
///
/// Returns the service status, version, and health information.
pub async fn health() -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "rust-leads-api",
            "version": "0.1.0"
        })),
    )
}

#[derive(Debug, Deserialize)]
pub struct DisbursementParams {
    pub pancard: Option<String>,
}

/// GET /leads/getCustomerDisbursement
///
/// Resolves the repayment/disbursement summary for the lead identified by
/// the `pancard` query parameter.
///
/// # Returns
///
/// * 400 when the parameter is missing.
/// * 404 when no lead exists for the key or the provider has no data.
/// * 200 with `{success, status, data}` otherwise.
pub async fn get_customer_disbursement(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DisbursementParams>,
) -> Result<Json<Value>, AppError> {
    let pancard = params
        .pancard
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| AppError::Validation("Missing pancard".to_string()))?;

    tracing::info!("GET /leads/getCustomerDisbursement - pancard: {}", pancard);

    let data = state
        .service
        .repayment_info(&pancard)
        .await?
        .ok_or_else(|| AppError::NotFound("Lead not found or no data available".to_string()))?;

    Ok(Json(json!({
        "success": true,
        "status": 200,
        "data": data,
    })))
}

/// POST /leads/step/:step
///
/// Submits one step of the multi-step lead form. The body is the step's
/// field set plus the `pancard` natural key.
pub async fn submit_lead_step(
    State(state): State<Arc<AppState>>,
    Path(step): Path<u8>,
    Json(body): Json<Value>,
) -> Result<Json<StepOutcome>, AppError> {
    let pancard = body
        .get("pancard")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| AppError::Validation("Pancard is required".to_string()))?;

    let step = LeadStep::from_request(step, &body)?;
    tracing::info!("POST /leads/step/{} - pancard: {}", step.number(), pancard);

    let outcome = state.service.save_lead_by_step(step, &pancard).await?;
    Ok(Json(outcome))
}

/// GET /users/
///
/// Returns a user looked up by a fixed id. Placeholder behavior carried
/// over from the funnel prototype, not a production contract.
pub async fn get_user(State(state): State<Arc<AppState>>) -> Result<Json<Value>, AppError> {
    let user = state.users.find_by_id(20).await?;
    Ok(Json(json!({ "user": user })))
}
