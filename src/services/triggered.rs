//! Triggered alert log
//!
//! Append-only record of alert firings. Rows are created by the evaluation
//! sweep only; the single mutation a user can apply is flipping `is_read`,
//! and that transition is one-way and idempotent.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::alert_rules::{AlertMetric, Severity};

/// Triggered alert log service
#[derive(Clone)]
pub struct TriggeredAlertService {
    db: PgPool,
}

/// A recorded alert firing, joined with the source rule's display fields
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TriggeredAlert {
    pub id: Uuid,
    pub user_id: Uuid,
    pub rule_id: Uuid,
    pub city: String,
    pub metric: AlertMetric,
    pub value: Decimal,
    pub is_read: bool,
    pub triggered_at: DateTime<Utc>,
    pub rule_description: Option<String>,
    pub rule_severity: Option<Severity>,
}

/// Input recorded by the evaluation sweep
#[derive(Debug)]
pub struct NewTriggeredAlert {
    pub user_id: Uuid,
    pub rule_id: Uuid,
    pub city: String,
    pub metric: AlertMetric,
    pub value: Decimal,
}

/// Newest-first listing is capped so the endpoint stays cheap even though
/// the log itself grows without bound.
const LIST_LIMIT: i64 = 50;

impl TriggeredAlertService {
    /// Create a new TriggeredAlertService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Record one firing
    pub async fn record(&self, input: NewTriggeredAlert) -> AppResult<Uuid> {
        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO triggered_alerts (user_id, rule_id, city, metric, value)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(input.user_id)
        .bind(input.rule_id)
        .bind(&input.city)
        .bind(input.metric)
        .bind(input.value)
        .fetch_one(&self.db)
        .await?;

        Ok(id)
    }

    /// List a user's triggered alerts, newest first, capped at 50
    pub async fn list_for_user(
        &self,
        user_id: Uuid,
        unread_only: bool,
    ) -> AppResult<Vec<TriggeredAlert>> {
        let alerts = sqlx::query_as::<_, TriggeredAlert>(
            r#"
            SELECT t.id, t.user_id, t.rule_id, t.city, t.metric, t.value, t.is_read, t.triggered_at,
                   r.description AS rule_description, r.severity AS rule_severity
            FROM triggered_alerts t
            LEFT JOIN alert_rules r ON r.id = t.rule_id
            WHERE t.user_id = $1 AND (NOT $2 OR t.is_read = false)
            ORDER BY t.triggered_at DESC
            LIMIT $3
            "#,
        )
        .bind(user_id)
        .bind(unread_only)
        .bind(LIST_LIMIT)
        .fetch_all(&self.db)
        .await?;

        Ok(alerts)
    }

    /// Mark one of a user's triggered alerts as read
    ///
    /// Idempotent: re-marking an already-read record succeeds and returns it
    /// unchanged.
    pub async fn mark_read(&self, user_id: Uuid, alert_id: Uuid) -> AppResult<TriggeredAlert> {
        let result =
            sqlx::query("UPDATE triggered_alerts SET is_read = true WHERE id = $1 AND user_id = $2")
                .bind(alert_id)
                .bind(user_id)
                .execute(&self.db)
                .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Triggered alert".to_string()));
        }

        let alert = sqlx::query_as::<_, TriggeredAlert>(
            r#"
            SELECT t.id, t.user_id, t.rule_id, t.city, t.metric, t.value, t.is_read, t.triggered_at,
                   r.description AS rule_description, r.severity AS rule_severity
            FROM triggered_alerts t
            LEFT JOIN alert_rules r ON r.id = t.rule_id
            WHERE t.id = $1 AND t.user_id = $2
            "#,
        )
        .bind(alert_id)
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;

        Ok(alert)
    }
}
