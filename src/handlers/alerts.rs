//! HTTP handlers for alert rule endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::alert_rules::{
    AlertRule, AlertRuleService, CreateAlertRuleInput, UpdateAlertRuleInput,
};
use crate::AppState;

/// Create an alert rule for the calling user
pub async fn create_alert_rule(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateAlertRuleInput>,
) -> AppResult<(StatusCode, Json<AlertRule>)> {
    let service = AlertRuleService::new(state.db);
    let rule = service.create(current_user.0.user_id, input).await?;
    Ok((StatusCode::CREATED, Json(rule)))
}

/// List the calling user's alert rules
pub async fn list_alert_rules(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<AlertRule>>> {
    let service = AlertRuleService::new(state.db);
    let rules = service.list_for_user(current_user.0.user_id).await?;
    Ok(Json(rules))
}

/// Get one of the calling user's alert rules
pub async fn get_alert_rule(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(rule_id): Path<Uuid>,
) -> AppResult<Json<AlertRule>> {
    let service = AlertRuleService::new(state.db);
    let rule = service.get(current_user.0.user_id, rule_id).await?;
    Ok(Json(rule))
}

/// Update one of the calling user's alert rules
pub async fn update_alert_rule(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(rule_id): Path<Uuid>,
    Json(input): Json<UpdateAlertRuleInput>,
) -> AppResult<Json<AlertRule>> {
    let service = AlertRuleService::new(state.db);
    let rule = service.update(current_user.0.user_id, rule_id, input).await?;
    Ok(Json(rule))
}

/// Delete one of the calling user's alert rules
pub async fn delete_alert_rule(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(rule_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let service = AlertRuleService::new(state.db);
    service.delete(current_user.0.user_id, rule_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
