//! Authentication service for user registration, login, and token management

use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;
use validator::validate_email;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::services::users::User;

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    db: PgPool,
    jwt_secret: String,
    access_token_expiry: i64,
}

/// Input for registering a new account
#[derive(Debug, Deserialize)]
pub struct RegisterInput {
    pub username: String,
    pub email: String,
    pub password: String,
    pub city: Option<String>,
}

/// Response after successful registration
#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub email: String,
    /// One-time code the user confirms their address with. In production this
    /// goes out by email only; it is returned here so the flow works without a
    /// configured mail provider in development.
    pub verification_code: String,
}

/// Input for verifying an account
#[derive(Debug, Deserialize)]
pub struct VerifyInput {
    pub email: String,
    pub code: String,
}

/// Input for logging in
#[derive(Debug, Deserialize)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // User ID
    pub email: String,
    pub exp: i64,
    pub iat: i64,
}

/// Authentication tokens
#[derive(Debug, Serialize)]
pub struct AuthTokens {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// Input for requesting a password reset
#[derive(Debug, Deserialize)]
pub struct ResetRequestInput {
    pub email: String,
}

/// Input for confirming a password reset
#[derive(Debug, Deserialize)]
pub struct ResetConfirmInput {
    pub email: String,
    pub code: String,
    pub new_password: String,
}

impl AuthService {
    /// Create a new AuthService instance
    pub fn new(db: PgPool, config: &Config) -> Self {
        Self {
            db,
            jwt_secret: config.jwt.secret.clone(),
            access_token_expiry: config.jwt.access_token_expiry,
        }
    }

    /// Register a new account
    pub async fn register(&self, input: RegisterInput) -> AppResult<RegisterResponse> {
        if !validate_email(&input.email) {
            return Err(AppError::Validation {
                field: "email".to_string(),
                message: "Invalid email address".to_string(),
            });
        }

        if input.password.len() < 8 {
            return Err(AppError::Validation {
                field: "password".to_string(),
                message: "Password must be at least 8 characters".to_string(),
            });
        }

        let existing =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE email = $1")
                .bind(&input.email)
                .fetch_one(&self.db)
                .await?;

        if existing > 0 {
            return Err(AppError::DuplicateEntry("email".to_string()));
        }

        let password_hash = hash(&input.password, DEFAULT_COST)
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?;

        let verification_code = generate_code();

        let user_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO users (username, email, password_hash, city, verification_code)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(&input.username)
        .bind(&input.email)
        .bind(&password_hash)
        .bind(&input.city)
        .bind(&verification_code)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(user_id = %user_id, email = %input.email, "registered new user");

        Ok(RegisterResponse {
            user_id,
            email: input.email,
            verification_code,
        })
    }

    /// Verify an account with its one-time code
    pub async fn verify(&self, input: VerifyInput) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET is_verified = true, verification_code = NULL
            WHERE email = $1 AND verification_code = $2 AND is_verified = false
            "#,
        )
        .bind(&input.email)
        .bind(&input.code)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::ValidationError(
                "Invalid verification code".to_string(),
            ));
        }

        Ok(())
    }

    /// Log in with email and password, returning an access token
    pub async fn login(&self, input: LoginInput) -> AppResult<AuthTokens> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, city, latitude, longitude,
                   is_verified, verification_code, reset_code, reset_code_expires_at, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(&input.email)
        .fetch_optional(&self.db)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

        let valid = verify(&input.password, &user.password_hash)
            .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))?;

        if !valid {
            return Err(AppError::InvalidCredentials);
        }

        // Unverified accounts cannot authenticate
        if !user.is_verified {
            return Err(AppError::AccountNotVerified);
        }

        self.issue_tokens(user.id, &user.email)
    }

    /// Request a password reset code for an email address
    ///
    /// Always succeeds from the caller's perspective so the endpoint does not
    /// leak which addresses have accounts.
    pub async fn request_password_reset(&self, input: ResetRequestInput) -> AppResult<Option<String>> {
        let code = generate_code();
        let expires_at = Utc::now() + Duration::hours(1);

        let result = sqlx::query(
            "UPDATE users SET reset_code = $1, reset_code_expires_at = $2 WHERE email = $3",
        )
        .bind(&code)
        .bind(expires_at)
        .bind(&input.email)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            tracing::debug!(email = %input.email, "reset requested for unknown address");
            return Ok(None);
        }

        Ok(Some(code))
    }

    /// Confirm a password reset with the emailed code
    pub async fn confirm_password_reset(&self, input: ResetConfirmInput) -> AppResult<()> {
        if input.new_password.len() < 8 {
            return Err(AppError::Validation {
                field: "new_password".to_string(),
                message: "Password must be at least 8 characters".to_string(),
            });
        }

        let password_hash = hash(&input.new_password, DEFAULT_COST)
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?;

        let result = sqlx::query(
            r#"
            UPDATE users
            SET password_hash = $1, reset_code = NULL, reset_code_expires_at = NULL
            WHERE email = $2 AND reset_code = $3 AND reset_code_expires_at > NOW()
            "#,
        )
        .bind(&password_hash)
        .bind(&input.email)
        .bind(&input.code)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::ValidationError(
                "Invalid or expired reset code".to_string(),
            ));
        }

        Ok(())
    }

    fn issue_tokens(&self, user_id: Uuid, email: &str) -> AppResult<AuthTokens> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            email: email.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::seconds(self.access_token_expiry)).timestamp(),
        };

        let access_token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|e| AppError::Internal(format!("Token creation failed: {}", e)))?;

        Ok(AuthTokens {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: self.access_token_expiry,
        })
    }
}

/// Generate a short one-time code
fn generate_code() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_uppercase()
}
