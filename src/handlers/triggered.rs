//! HTTP handlers for the triggered alert log

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::triggered::{TriggeredAlert, TriggeredAlertService};
use crate::AppState;

/// Query parameters for the triggered alert listing
#[derive(Debug, Deserialize)]
pub struct TriggeredListQuery {
    #[serde(default)]
    pub unread_only: bool,
}

/// List the calling user's triggered alerts
pub async fn list_triggered_alerts(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<TriggeredListQuery>,
) -> AppResult<Json<Vec<TriggeredAlert>>> {
    let service = TriggeredAlertService::new(state.db);
    let alerts = service
        .list_for_user(current_user.0.user_id, query.unread_only)
        .await?;
    Ok(Json(alerts))
}

/// Mark one of the calling user's triggered alerts as read
pub async fn mark_triggered_alert_read(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(alert_id): Path<Uuid>,
) -> AppResult<Json<TriggeredAlert>> {
    let service = TriggeredAlertService::new(state.db);
    let alert = service.mark_read(current_user.0.user_id, alert_id).await?;
    Ok(Json(alert))
}
