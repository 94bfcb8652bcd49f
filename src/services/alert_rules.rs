//! User-defined alert rules
//!
//! A rule watches one weather metric for the owning user and carries exactly
//! one threshold shape: a scalar comparison (`temperature > 30`) or a range
//! whose breach means "outside [min, max]". Rows that would carry both shapes
//! (or neither) are rejected at construction time, so every evaluation path
//! handles exactly one variant.
//!
//! Every query is scoped by `user_id`; a rule owned by someone else surfaces
//! as NotFound, never as the other user's data.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Alert rule service
#[derive(Clone)]
pub struct AlertRuleService {
    db: PgPool,
}

/// Watched weather metric
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "alert_metric", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AlertMetric {
    Temperature,
    Humidity,
    Wind,
    Pressure,
    Rain,
    Uv,
}

/// Scalar comparison operator
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "alert_condition", rename_all = "snake_case")]
pub enum AlertCondition {
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "<=")]
    Le,
}

/// Alert severity
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "alert_severity", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

/// The threshold a rule fires on: exactly one shape
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AlertThreshold {
    /// Fires when `measured <op> value` holds
    Scalar {
        condition: AlertCondition,
        value: Decimal,
    },
    /// Fires when the measured value falls outside [min, max]
    Range { min: Decimal, max: Decimal },
}

impl AlertThreshold {
    /// Build a threshold from the four optional request fields, rejecting
    /// ambiguous (both shapes) and empty (neither shape) combinations.
    pub fn from_parts(
        condition: Option<AlertCondition>,
        value: Option<Decimal>,
        min: Option<Decimal>,
        max: Option<Decimal>,
    ) -> AppResult<Self> {
        let scalar = match (condition, value) {
            (Some(condition), Some(value)) => Some(AlertThreshold::Scalar { condition, value }),
            (None, None) => None,
            _ => {
                return Err(AppError::ValidationError(
                    "condition and value must be provided together".to_string(),
                ))
            }
        };

        let range = match (min, max) {
            (Some(min), Some(max)) => {
                if min > max {
                    return Err(AppError::ValidationError(
                        "threshold min must not exceed max".to_string(),
                    ));
                }
                Some(AlertThreshold::Range { min, max })
            }
            (None, None) => None,
            _ => {
                return Err(AppError::ValidationError(
                    "threshold min and max must be provided together".to_string(),
                ))
            }
        };

        match (scalar, range) {
            (Some(threshold), None) | (None, Some(threshold)) => Ok(threshold),
            (Some(_), Some(_)) => Err(AppError::ValidationError(
                "a rule may carry either a condition/value pair or a min/max range, not both"
                    .to_string(),
            )),
            (None, None) => Err(AppError::ValidationError(
                "a rule needs a condition/value pair or a min/max range".to_string(),
            )),
        }
    }

    /// Whether a measured value breaches the threshold
    pub fn matches(&self, measured: Decimal) -> bool {
        match *self {
            AlertThreshold::Scalar { condition, value } => match condition {
                AlertCondition::Gt => measured > value,
                AlertCondition::Lt => measured < value,
                AlertCondition::Eq => measured == value,
                AlertCondition::Ge => measured >= value,
                AlertCondition::Le => measured <= value,
            },
            AlertThreshold::Range { min, max } => measured < min || measured > max,
        }
    }
}

/// Alert rule
#[derive(Debug, Clone, Serialize)]
pub struct AlertRule {
    pub id: Uuid,
    pub user_id: Uuid,
    pub metric: AlertMetric,
    pub description: String,
    pub threshold: AlertThreshold,
    pub severity: Severity,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Raw rule row; the threshold columns are normalized into [`AlertThreshold`]
/// before leaving the service.
#[derive(Debug, FromRow)]
struct AlertRuleRow {
    id: Uuid,
    user_id: Uuid,
    metric: AlertMetric,
    description: String,
    condition: Option<AlertCondition>,
    value: Option<Decimal>,
    threshold_min: Option<Decimal>,
    threshold_max: Option<Decimal>,
    severity: Severity,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<AlertRuleRow> for AlertRule {
    type Error = AppError;

    fn try_from(row: AlertRuleRow) -> Result<Self, Self::Error> {
        let threshold = AlertThreshold::from_parts(
            row.condition,
            row.value,
            row.threshold_min,
            row.threshold_max,
        )
        .map_err(|_| {
            AppError::Internal(format!("alert rule {} has an invalid threshold shape", row.id))
        })?;

        Ok(AlertRule {
            id: row.id,
            user_id: row.user_id,
            metric: row.metric,
            description: row.description,
            threshold,
            severity: row.severity,
            is_active: row.is_active,
            created_at: row.created_at,
        })
    }
}

/// Input for creating an alert rule
#[derive(Debug, Deserialize)]
pub struct CreateAlertRuleInput {
    pub metric: AlertMetric,
    pub description: String,
    pub condition: Option<AlertCondition>,
    pub value: Option<Decimal>,
    pub threshold_min: Option<Decimal>,
    pub threshold_max: Option<Decimal>,
    pub severity: Severity,
    pub is_active: Option<bool>,
}

/// Input for updating an alert rule
///
/// When any threshold field is present the four fields are re-validated as a
/// whole; the threshold is replaced, never merged with the stored one.
#[derive(Debug, Deserialize)]
pub struct UpdateAlertRuleInput {
    pub metric: Option<AlertMetric>,
    pub description: Option<String>,
    pub condition: Option<AlertCondition>,
    pub value: Option<Decimal>,
    pub threshold_min: Option<Decimal>,
    pub threshold_max: Option<Decimal>,
    pub severity: Option<Severity>,
    pub is_active: Option<bool>,
}

const RULE_COLUMNS: &str = "id, user_id, metric, description, condition, value, \
                            threshold_min, threshold_max, severity, is_active, created_at";

impl AlertRuleService {
    /// Create a new AlertRuleService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create a rule for a user
    pub async fn create(&self, user_id: Uuid, input: CreateAlertRuleInput) -> AppResult<AlertRule> {
        let threshold = AlertThreshold::from_parts(
            input.condition,
            input.value,
            input.threshold_min,
            input.threshold_max,
        )?;

        let (condition, value, min, max) = threshold_columns(threshold);

        let row = sqlx::query_as::<_, AlertRuleRow>(&format!(
            r#"
            INSERT INTO alert_rules (user_id, metric, description, condition, value,
                                     threshold_min, threshold_max, severity, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {RULE_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(input.metric)
        .bind(&input.description)
        .bind(condition)
        .bind(value)
        .bind(min)
        .bind(max)
        .bind(input.severity)
        .bind(input.is_active.unwrap_or(true))
        .fetch_one(&self.db)
        .await?;

        row.try_into()
    }

    /// List a user's rules, newest first
    pub async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<AlertRule>> {
        let rows = sqlx::query_as::<_, AlertRuleRow>(&format!(
            "SELECT {RULE_COLUMNS} FROM alert_rules WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(AlertRule::try_from).collect()
    }

    /// Get one of a user's rules by id
    pub async fn get(&self, user_id: Uuid, rule_id: Uuid) -> AppResult<AlertRule> {
        let row = sqlx::query_as::<_, AlertRuleRow>(&format!(
            "SELECT {RULE_COLUMNS} FROM alert_rules WHERE id = $1 AND user_id = $2"
        ))
        .bind(rule_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Alert rule".to_string()))?;

        row.try_into()
    }

    /// All active rules across users, for the evaluation sweep
    pub async fn list_active(&self) -> AppResult<Vec<AlertRule>> {
        let rows = sqlx::query_as::<_, AlertRuleRow>(&format!(
            "SELECT {RULE_COLUMNS} FROM alert_rules WHERE is_active = true ORDER BY created_at"
        ))
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(AlertRule::try_from).collect()
    }

    /// Update one of a user's rules
    pub async fn update(
        &self,
        user_id: Uuid,
        rule_id: Uuid,
        input: UpdateAlertRuleInput,
    ) -> AppResult<AlertRule> {
        let existing = self.get(user_id, rule_id).await?;

        let threshold_touched = input.condition.is_some()
            || input.value.is_some()
            || input.threshold_min.is_some()
            || input.threshold_max.is_some();

        let threshold = if threshold_touched {
            AlertThreshold::from_parts(
                input.condition,
                input.value,
                input.threshold_min,
                input.threshold_max,
            )?
        } else {
            existing.threshold
        };

        let (condition, value, min, max) = threshold_columns(threshold);

        let row = sqlx::query_as::<_, AlertRuleRow>(&format!(
            r#"
            UPDATE alert_rules
            SET metric = $1, description = $2, condition = $3, value = $4,
                threshold_min = $5, threshold_max = $6, severity = $7, is_active = $8
            WHERE id = $9 AND user_id = $10
            RETURNING {RULE_COLUMNS}
            "#
        ))
        .bind(input.metric.unwrap_or(existing.metric))
        .bind(input.description.unwrap_or(existing.description))
        .bind(condition)
        .bind(value)
        .bind(min)
        .bind(max)
        .bind(input.severity.unwrap_or(existing.severity))
        .bind(input.is_active.unwrap_or(existing.is_active))
        .bind(rule_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Alert rule".to_string()))?;

        row.try_into()
    }

    /// Delete one of a user's rules
    pub async fn delete(&self, user_id: Uuid, rule_id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM alert_rules WHERE id = $1 AND user_id = $2")
            .bind(rule_id)
            .bind(user_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Alert rule".to_string()));
        }

        Ok(())
    }
}

fn threshold_columns(
    threshold: AlertThreshold,
) -> (
    Option<AlertCondition>,
    Option<Decimal>,
    Option<Decimal>,
    Option<Decimal>,
) {
    match threshold {
        AlertThreshold::Scalar { condition, value } => (Some(condition), Some(value), None, None),
        AlertThreshold::Range { min, max } => (None, None, Some(min), Some(max)),
    }
}
