//! Weather source registry and monthly statistics
//!
//! Two small persisted surfaces next to the core jobs: a registry of weather
//! data sources (not consumed by the collection jobs, which talk to the
//! configured provider directly) and a write-only store of monthly
//! aggregates filled by external tooling.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Source registry and statistics service
#[derive(Clone)]
pub struct SourceService {
    db: PgPool,
}

/// A registered weather data source
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct WeatherSource {
    pub id: Uuid,
    pub name: String,
    pub url: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Input for registering a source
#[derive(Debug, Deserialize)]
pub struct CreateSourceInput {
    pub name: String,
    pub url: String,
    pub is_active: Option<bool>,
}

/// Monthly aggregate row
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct MonthlyStatistics {
    pub id: Uuid,
    pub city: String,
    pub month: NaiveDate,
    pub avg_temperature: Decimal,
    pub avg_humidity: Decimal,
    pub total_rain_mm: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Input for recording monthly statistics
#[derive(Debug, Deserialize)]
pub struct RecordStatisticsInput {
    pub city: String,
    pub month: NaiveDate,
    pub avg_temperature: Decimal,
    pub avg_humidity: Decimal,
    pub total_rain_mm: Decimal,
}

impl SourceService {
    /// Create a new SourceService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// List registered sources
    pub async fn list(&self) -> AppResult<Vec<WeatherSource>> {
        let sources = sqlx::query_as::<_, WeatherSource>(
            "SELECT id, name, url, is_active, created_at FROM weather_sources ORDER BY created_at",
        )
        .fetch_all(&self.db)
        .await?;

        Ok(sources)
    }

    /// Register a source
    pub async fn create(&self, input: CreateSourceInput) -> AppResult<WeatherSource> {
        if input.name.trim().is_empty() {
            return Err(AppError::Validation {
                field: "name".to_string(),
                message: "Source name must not be empty".to_string(),
            });
        }

        let source = sqlx::query_as::<_, WeatherSource>(
            r#"
            INSERT INTO weather_sources (name, url, is_active)
            VALUES ($1, $2, $3)
            RETURNING id, name, url, is_active, created_at
            "#,
        )
        .bind(input.name.trim())
        .bind(&input.url)
        .bind(input.is_active.unwrap_or(true))
        .fetch_one(&self.db)
        .await?;

        Ok(source)
    }

    /// Delete a source
    pub async fn delete(&self, source_id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM weather_sources WHERE id = $1")
            .bind(source_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Weather source".to_string()));
        }

        Ok(())
    }

    /// Record a monthly aggregate for a city
    pub async fn record_statistics(
        &self,
        input: RecordStatisticsInput,
    ) -> AppResult<MonthlyStatistics> {
        let stats = sqlx::query_as::<_, MonthlyStatistics>(
            r#"
            INSERT INTO monthly_statistics (city, month, avg_temperature, avg_humidity, total_rain_mm)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, city, month, avg_temperature, avg_humidity, total_rain_mm, created_at
            "#,
        )
        .bind(&input.city)
        .bind(input.month)
        .bind(input.avg_temperature)
        .bind(input.avg_humidity)
        .bind(input.total_rain_mm)
        .fetch_one(&self.db)
        .await?;

        Ok(stats)
    }

    /// List monthly aggregates for a city, newest month first
    pub async fn list_statistics(&self, city: &str) -> AppResult<Vec<MonthlyStatistics>> {
        let stats = sqlx::query_as::<_, MonthlyStatistics>(
            r#"
            SELECT id, city, month, avg_temperature, avg_humidity, total_rain_mm, created_at
            FROM monthly_statistics
            WHERE city = $1
            ORDER BY month DESC
            "#,
        )
        .bind(city)
        .fetch_all(&self.db)
        .await?;

        Ok(stats)
    }
}
