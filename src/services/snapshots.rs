//! Persisted weather store
//!
//! One snapshot row per monitored city plus an appended list of daily
//! forecast entries. Snapshots are created once by the bulk-insert job and
//! afterwards only grow by one forecast day per daily run; the application
//! never deletes them.
//!
//! City uniqueness and forecast-day uniqueness are real constraints here
//! (unique indexes with `ON CONFLICT DO NOTHING`), so concurrent job runs
//! cannot produce duplicate rows. The forecast key is a proper DATE; the
//! `DD/MM/YYYY` display string is derived, never stored.

use chrono::{DateTime, Datelike, NaiveDate, Utc, Weekday};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Store for per-city weather snapshots
#[derive(Clone)]
pub struct SnapshotStore {
    db: PgPool,
}

/// Weather snapshot record (one per city)
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct WeatherSnapshot {
    pub id: Uuid,
    pub city_name: String,
    pub country: String,
    pub latitude: Decimal,
    pub longitude: Decimal,
    pub snapshot_date: NaiveDate,
    pub temperature: Decimal,
    pub feels_like: Decimal,
    pub humidity: i32,
    pub pressure: i32,
    pub wind_speed: Decimal,
    pub wind_direction: i32,
    pub condition: String,
    pub icon: String,
    pub rain_1h_mm: Option<Decimal>,
    pub snow_1h_mm: Option<Decimal>,
    pub cloud_coverage: i32,
    pub air_quality_index: Option<i32>,
    pub uv_index: Option<Decimal>,
    pub provider_alerts: serde_json::Value,
    pub last_updated: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Daily forecast entry appended to a snapshot
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ForecastDay {
    pub id: Uuid,
    pub snapshot_id: Uuid,
    pub forecast_date: NaiveDate,
    pub day_name: String,
    pub temperature: Decimal,
    pub temp_min: Decimal,
    pub temp_max: Decimal,
    pub condition: String,
    pub icon: String,
    pub humidity: i32,
    pub wind_speed: Decimal,
    pub rain_mm: Option<Decimal>,
    pub snow_mm: Option<Decimal>,
    pub cloud_coverage: i32,
    pub created_at: DateTime<Utc>,
}

/// Input for inserting a snapshot
#[derive(Debug, Clone, Deserialize)]
pub struct NewSnapshot {
    pub city_name: String,
    pub country: String,
    pub latitude: Decimal,
    pub longitude: Decimal,
    pub snapshot_date: NaiveDate,
    pub temperature: Decimal,
    pub feels_like: Decimal,
    pub humidity: i32,
    pub pressure: i32,
    pub wind_speed: Decimal,
    pub wind_direction: i32,
    pub condition: String,
    pub icon: String,
    pub rain_1h_mm: Option<Decimal>,
    pub snow_1h_mm: Option<Decimal>,
    pub cloud_coverage: i32,
    pub air_quality_index: Option<i32>,
    pub uv_index: Option<Decimal>,
    pub provider_alerts: serde_json::Value,
}

/// Input for appending a forecast day
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewForecastDay {
    pub forecast_date: NaiveDate,
    pub temperature: Decimal,
    pub temp_min: Decimal,
    pub temp_max: Decimal,
    pub condition: String,
    pub icon: String,
    pub humidity: i32,
    pub wind_speed: Decimal,
    pub rain_mm: Option<Decimal>,
    pub snow_mm: Option<Decimal>,
    pub cloud_coverage: i32,
}

/// Snapshot together with its forecast list
#[derive(Debug, Serialize)]
pub struct SnapshotWithForecast {
    #[serde(flatten)]
    pub snapshot: WeatherSnapshot,
    pub forecast: Vec<ForecastDay>,
}

/// English day-of-week name for a forecast date
pub fn day_name(date: NaiveDate) -> &'static str {
    match date.weekday() {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// `DD/MM/YYYY` display string for a forecast date
pub fn display_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

impl SnapshotStore {
    /// Create a new SnapshotStore instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Check whether a snapshot exists for a city name
    pub async fn exists(&self, city_name: &str) -> AppResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM weather_snapshots WHERE city_name = $1)",
        )
        .bind(city_name)
        .fetch_one(&self.db)
        .await?;

        Ok(exists)
    }

    /// Insert a snapshot with its initial forecast days
    ///
    /// Returns `None` when a snapshot for the city already exists (the unique
    /// index wins over a concurrent insert).
    pub async fn insert(
        &self,
        input: &NewSnapshot,
        forecast: &[NewForecastDay],
    ) -> AppResult<Option<Uuid>> {
        let mut tx = self.db.begin().await?;

        let snapshot_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO weather_snapshots (
                city_name, country, latitude, longitude, snapshot_date,
                temperature, feels_like, humidity, pressure, wind_speed, wind_direction,
                condition, icon, rain_1h_mm, snow_1h_mm, cloud_coverage,
                air_quality_index, uv_index, provider_alerts
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)
            ON CONFLICT (city_name) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(&input.city_name)
        .bind(&input.country)
        .bind(input.latitude)
        .bind(input.longitude)
        .bind(input.snapshot_date)
        .bind(input.temperature)
        .bind(input.feels_like)
        .bind(input.humidity)
        .bind(input.pressure)
        .bind(input.wind_speed)
        .bind(input.wind_direction)
        .bind(&input.condition)
        .bind(&input.icon)
        .bind(input.rain_1h_mm)
        .bind(input.snow_1h_mm)
        .bind(input.cloud_coverage)
        .bind(input.air_quality_index)
        .bind(input.uv_index)
        .bind(&input.provider_alerts)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(snapshot_id) = snapshot_id else {
            tx.rollback().await?;
            return Ok(None);
        };

        for day in forecast {
            insert_forecast_day(&mut *tx, snapshot_id, day).await?;
        }

        tx.commit().await?;
        Ok(Some(snapshot_id))
    }

    /// List all snapshots, oldest city first
    pub async fn list(&self) -> AppResult<Vec<WeatherSnapshot>> {
        let snapshots = sqlx::query_as::<_, WeatherSnapshot>(
            r#"
            SELECT id, city_name, country, latitude, longitude, snapshot_date,
                   temperature, feels_like, humidity, pressure, wind_speed, wind_direction,
                   condition, icon, rain_1h_mm, snow_1h_mm, cloud_coverage,
                   air_quality_index, uv_index, provider_alerts, last_updated, created_at
            FROM weather_snapshots
            ORDER BY created_at
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(snapshots)
    }

    /// Get a snapshot with its forecast list by city name
    pub async fn get_by_city(&self, city_name: &str) -> AppResult<SnapshotWithForecast> {
        let snapshot = sqlx::query_as::<_, WeatherSnapshot>(
            r#"
            SELECT id, city_name, country, latitude, longitude, snapshot_date,
                   temperature, feels_like, humidity, pressure, wind_speed, wind_direction,
                   condition, icon, rain_1h_mm, snow_1h_mm, cloud_coverage,
                   air_quality_index, uv_index, provider_alerts, last_updated, created_at
            FROM weather_snapshots
            WHERE city_name = $1
            "#,
        )
        .bind(city_name)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Weather snapshot".to_string()))?;

        let forecast = self.forecast_days(snapshot.id).await?;

        Ok(SnapshotWithForecast { snapshot, forecast })
    }

    /// List a snapshot's forecast days, earliest first
    pub async fn forecast_days(&self, snapshot_id: Uuid) -> AppResult<Vec<ForecastDay>> {
        let days = sqlx::query_as::<_, ForecastDay>(
            r#"
            SELECT id, snapshot_id, forecast_date, day_name, temperature, temp_min, temp_max,
                   condition, icon, humidity, wind_speed, rain_mm, snow_mm, cloud_coverage, created_at
            FROM forecast_days
            WHERE snapshot_id = $1
            ORDER BY forecast_date
            "#,
        )
        .bind(snapshot_id)
        .fetch_all(&self.db)
        .await?;

        Ok(days)
    }

    /// Append one forecast day to a snapshot
    ///
    /// Returns `false` (a no-op) when the snapshot already has an entry for
    /// that date.
    pub async fn append_forecast_day(
        &self,
        snapshot_id: Uuid,
        day: &NewForecastDay,
    ) -> AppResult<bool> {
        let inserted = insert_forecast_day(&self.db, snapshot_id, day).await?;
        Ok(inserted)
    }

    /// Refresh a snapshot's air quality reading and last-updated timestamp
    pub async fn refresh_air_quality(
        &self,
        snapshot_id: Uuid,
        air_quality_index: Option<i32>,
    ) -> AppResult<()> {
        sqlx::query(
            "UPDATE weather_snapshots SET air_quality_index = COALESCE($1, air_quality_index), last_updated = NOW() WHERE id = $2",
        )
        .bind(air_quality_index)
        .bind(snapshot_id)
        .execute(&self.db)
        .await?;

        Ok(())
    }
}

async fn insert_forecast_day<'e, E>(
    executor: E,
    snapshot_id: Uuid,
    day: &NewForecastDay,
) -> AppResult<bool>
where
    E: sqlx::Executor<'e, Database = sqlx::Postgres>,
{
    let result = sqlx::query(
        r#"
        INSERT INTO forecast_days (
            snapshot_id, forecast_date, day_name, temperature, temp_min, temp_max,
            condition, icon, humidity, wind_speed, rain_mm, snow_mm, cloud_coverage
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
        ON CONFLICT (snapshot_id, forecast_date) DO NOTHING
        "#,
    )
    .bind(snapshot_id)
    .bind(day.forecast_date)
    .bind(day_name(day.forecast_date))
    .bind(day.temperature)
    .bind(day.temp_min)
    .bind(day.temp_max)
    .bind(&day.condition)
    .bind(&day.icon)
    .bind(day.humidity)
    .bind(day.wind_speed)
    .bind(day.rain_mm)
    .bind(day.snow_mm)
    .bind(day.cloud_coverage)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn day_names_follow_the_calendar() {
        assert_eq!(day_name(date(2026, 8, 31)), "Monday");
        assert_eq!(day_name(date(2026, 9, 6)), "Sunday");
    }

    #[test]
    fn display_date_is_day_month_year() {
        assert_eq!(display_date(date(2026, 1, 5)), "05/01/2026");
        assert_eq!(display_date(date(2026, 11, 23)), "23/11/2026");
    }
}
