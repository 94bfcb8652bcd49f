//! User profile service
//!
//! Account creation and credential handling live in the auth service; this
//! service covers profile reads and the recipient listing the alert sweep
//! iterates over.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// User profile service
#[derive(Clone)]
pub struct UserService {
    db: PgPool,
}

/// User record
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub city: Option<String>,
    pub latitude: Option<Decimal>,
    pub longitude: Option<Decimal>,
    pub is_verified: bool,
    #[serde(skip_serializing)]
    pub verification_code: Option<String>,
    #[serde(skip_serializing)]
    pub reset_code: Option<String>,
    #[serde(skip_serializing)]
    pub reset_code_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// The slice of a user the alert sweep needs
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AlertRecipient {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub city: Option<String>,
    pub latitude: Option<Decimal>,
    pub longitude: Option<Decimal>,
}

/// Input for updating a user's monitored city
#[derive(Debug, Deserialize)]
pub struct UpdateCityInput {
    pub city: String,
    pub latitude: Option<Decimal>,
    pub longitude: Option<Decimal>,
}

impl UserService {
    /// Create a new UserService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Get a user by ID
    pub async fn get(&self, user_id: Uuid) -> AppResult<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, city, latitude, longitude,
                   is_verified, verification_code, reset_code, reset_code_expires_at, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("User".to_string()))?;

        Ok(user)
    }

    /// List all verified users as alert recipients
    pub async fn list_recipients(&self) -> AppResult<Vec<AlertRecipient>> {
        let recipients = sqlx::query_as::<_, AlertRecipient>(
            r#"
            SELECT id, username, email, city, latitude, longitude
            FROM users
            WHERE is_verified = true
            ORDER BY created_at
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(recipients)
    }

    /// Update the city a user's alerts are evaluated against
    pub async fn update_city(&self, user_id: Uuid, input: UpdateCityInput) -> AppResult<User> {
        if input.city.trim().is_empty() {
            return Err(AppError::Validation {
                field: "city".to_string(),
                message: "City must not be empty".to_string(),
            });
        }

        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET city = $1, latitude = $2, longitude = $3
            WHERE id = $4
            RETURNING id, username, email, password_hash, city, latitude, longitude,
                      is_verified, verification_code, reset_code, reset_code_expires_at, created_at
            "#,
        )
        .bind(input.city.trim())
        .bind(input.latitude)
        .bind(input.longitude)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("User".to_string()))?;

        Ok(user)
    }
}
