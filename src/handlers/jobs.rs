//! HTTP handlers for the job-trigger endpoints
//!
//! These routes invoke the collection and evaluation jobs on demand. They
//! sit behind the service-token middleware: the scheduler calls the services
//! directly, so only operators holding the token can reach these.

use axum::{extract::State, Json};

use crate::error::AppResult;
use crate::services::collection::CollectionSummary;
use crate::services::evaluation::SweepSummary;
use crate::AppState;

/// Trigger the initial bulk collection over the seed city list
pub async fn run_initial_collection(
    State(state): State<AppState>,
) -> AppResult<Json<CollectionSummary>> {
    let service = state.collection_service();
    let summary = service.run_initial_collection().await?;
    Ok(Json(summary))
}

/// Trigger the daily next-day forecast append
pub async fn run_daily_append(
    State(state): State<AppState>,
) -> AppResult<Json<CollectionSummary>> {
    let service = state.collection_service();
    let summary = service.run_daily_append().await?;
    Ok(Json(summary))
}

/// Trigger an alert evaluation sweep
pub async fn run_alert_sweep(State(state): State<AppState>) -> AppResult<Json<SweepSummary>> {
    let service = state.evaluation_service();
    let summary = service.run_sweep().await?;
    Ok(Json(summary))
}
