//! Weather collection jobs
//!
//! Two jobs feed the persisted weather store:
//! - the initial bulk insert walks a fixed seed list of cities and creates a
//!   snapshot (current conditions + five derived forecast days) for every
//!   city not already present;
//! - the daily append fetches a fresh forecast for every stored city and
//!   appends the "today + 6" forecast day, skipping dates already present.
//!
//! Cities are processed strictly in sequence; only the per-city provider
//! sub-fetches fan out concurrently. A pacer enforces a configurable minimum
//! spacing between cities so the provider's rate limit is respected.

use std::time::Duration;

use chrono::{NaiveDate, Timelike, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tokio::time::Instant;

use crate::error::{AppError, AppResult};
use crate::external::weather::{ForecastSample, ForecastSeries, ProviderLocation, WeatherClient};
use crate::services::snapshots::{NewForecastDay, NewSnapshot, SnapshotStore};

/// A city in the fixed collection seed list
#[derive(Debug, Clone)]
pub struct CitySeed {
    pub name: &'static str,
    pub country: &'static str,
    pub latitude: Decimal,
    pub longitude: Decimal,
}

/// The monitored cities. Coordinates are WGS84 with four decimal places.
pub fn seed_cities() -> Vec<CitySeed> {
    fn coord(units: i64) -> Decimal {
        Decimal::new(units, 4)
    }

    vec![
        CitySeed { name: "Casablanca", country: "MA", latitude: coord(335731), longitude: coord(-75898) },
        CitySeed { name: "Rabat", country: "MA", latitude: coord(340209), longitude: coord(-68416) },
        CitySeed { name: "Marrakesh", country: "MA", latitude: coord(316295), longitude: coord(-79811) },
        CitySeed { name: "Fes", country: "MA", latitude: coord(340181), longitude: coord(-50078) },
        CitySeed { name: "Tangier", country: "MA", latitude: coord(357595), longitude: coord(-58340) },
        CitySeed { name: "Agadir", country: "MA", latitude: coord(304278), longitude: coord(-95981) },
        CitySeed { name: "Meknes", country: "MA", latitude: coord(338935), longitude: coord(-55473) },
        CitySeed { name: "Oujda", country: "MA", latitude: coord(346814), longitude: coord(-19086) },
        CitySeed { name: "Kenitra", country: "MA", latitude: coord(342610), longitude: coord(-65802) },
        CitySeed { name: "Tetouan", country: "MA", latitude: coord(355889), longitude: coord(-53626) },
    ]
}

/// Per-city outcome in a collection run
#[derive(Debug, Clone, Serialize)]
pub struct CityOutcome {
    pub city: String,
    pub status: CityStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CityStatus {
    Success,
    Skipped,
    Failed,
}

/// Summary of a collection run
#[derive(Debug, Serialize)]
pub struct CollectionSummary {
    pub total_cities: usize,
    pub success: usize,
    pub skipped: usize,
    pub errors: usize,
    pub details: Vec<CityOutcome>,
}

impl CollectionSummary {
    fn from_outcomes(details: Vec<CityOutcome>) -> Self {
        let success = details.iter().filter(|o| o.status == CityStatus::Success).count();
        let skipped = details.iter().filter(|o| o.status == CityStatus::Skipped).count();
        let errors = details.iter().filter(|o| o.status == CityStatus::Failed).count();

        Self {
            total_cities: details.len(),
            success,
            skipped,
            errors,
            details,
        }
    }
}

/// Enforces a minimum spacing between provider fetches
pub struct Pacer {
    interval: Duration,
    last: Option<Instant>,
}

impl Pacer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    /// Wait until at least `interval` has passed since the previous call.
    /// The first call never waits.
    pub async fn wait(&mut self) {
        if let Some(last) = self.last {
            let elapsed = last.elapsed();
            if elapsed < self.interval {
                tokio::time::sleep(self.interval - elapsed).await;
            }
        }
        self.last = Some(Instant::now());
    }
}

/// Collection job service
#[derive(Clone)]
pub struct CollectionService {
    snapshots: SnapshotStore,
    weather: WeatherClient,
    request_interval: Duration,
}

impl CollectionService {
    pub fn new(snapshots: SnapshotStore, weather: WeatherClient, request_interval: Duration) -> Self {
        Self {
            snapshots,
            weather,
            request_interval,
        }
    }

    /// Initial bulk insert over the seed list
    ///
    /// Per-city failures are recorded and never abort the batch.
    pub async fn run_initial_collection(&self) -> AppResult<CollectionSummary> {
        let cities = seed_cities();
        let mut pacer = Pacer::new(self.request_interval);
        let mut details = Vec::with_capacity(cities.len());

        tracing::info!(cities = cities.len(), "starting initial weather collection");

        for city in &cities {
            pacer.wait().await;

            let outcome = match self.collect_city(city).await {
                Ok(status) => CityOutcome {
                    city: city.name.to_string(),
                    status,
                    error: None,
                },
                Err(e) => {
                    tracing::warn!(city = city.name, error = %e, "city collection failed");
                    CityOutcome {
                        city: city.name.to_string(),
                        status: CityStatus::Failed,
                        error: Some(e.to_string()),
                    }
                }
            };
            details.push(outcome);
        }

        let summary = CollectionSummary::from_outcomes(details);
        tracing::info!(
            success = summary.success,
            skipped = summary.skipped,
            errors = summary.errors,
            "initial weather collection finished"
        );

        Ok(summary)
    }

    async fn collect_city(&self, city: &CitySeed) -> AppResult<CityStatus> {
        if self.snapshots.exists(city.name).await? {
            tracing::debug!(city = city.name, "snapshot already present, skipping");
            return Ok(CityStatus::Skipped);
        }

        let location = ProviderLocation::Coordinates {
            latitude: city.latitude,
            longitude: city.longitude,
        };

        // The five sub-fetches fan out together; current and forecast are
        // required, the rest degrade to empty values on failure.
        let (current, forecast, air_quality, uv_index, provider_alerts) = tokio::join!(
            self.weather.get_current_conditions(&location),
            self.weather.get_forecast(&location),
            self.weather.get_air_quality(city.latitude, city.longitude),
            self.weather.get_uv_index(city.latitude, city.longitude),
            self.weather.get_provider_alerts(city.latitude, city.longitude),
        );

        let current = current?;
        let forecast = forecast?;

        let air_quality_index = air_quality
            .map_err(|e| tracing::warn!(city = city.name, error = %e, "air quality fetch failed"))
            .ok()
            .map(|aq| aq.index);
        let uv_index = uv_index
            .map_err(|e| tracing::warn!(city = city.name, error = %e, "UV index fetch failed"))
            .ok();
        let provider_alerts = provider_alerts
            .map_err(|e| tracing::warn!(city = city.name, error = %e, "alerts feed fetch failed"))
            .unwrap_or_default();

        let today_local = local_date(Utc::now(), forecast.timezone_offset_seconds);
        let forecast_days = build_forecast_days(&forecast, today_local, 1..=5);

        let snapshot = NewSnapshot {
            city_name: city.name.to_string(),
            country: if current.country.is_empty() {
                city.country.to_string()
            } else {
                current.country.clone()
            },
            latitude: city.latitude,
            longitude: city.longitude,
            snapshot_date: today_local,
            temperature: current.temperature,
            feels_like: current.feels_like,
            humidity: current.humidity,
            pressure: current.pressure,
            wind_speed: current.wind_speed,
            wind_direction: current.wind_direction,
            condition: current.condition,
            icon: current.icon,
            rain_1h_mm: current.rain_1h_mm,
            snow_1h_mm: current.snow_1h_mm,
            cloud_coverage: current.cloud_coverage,
            air_quality_index,
            uv_index,
            provider_alerts: serde_json::to_value(&provider_alerts)
                .map_err(|e| AppError::Internal(e.to_string()))?,
        };

        match self.snapshots.insert(&snapshot, &forecast_days).await? {
            Some(id) => {
                tracing::info!(city = city.name, snapshot_id = %id, days = forecast_days.len(), "snapshot inserted");
                Ok(CityStatus::Success)
            }
            // A concurrent run inserted the city first
            None => Ok(CityStatus::Skipped),
        }
    }

    /// Daily append: add the "today + 6" forecast day to every stored city
    pub async fn run_daily_append(&self) -> AppResult<CollectionSummary> {
        let snapshots = self.snapshots.list().await?;
        let mut pacer = Pacer::new(self.request_interval);
        let mut details = Vec::with_capacity(snapshots.len());

        tracing::info!(cities = snapshots.len(), "starting next-day forecast append");

        for snapshot in &snapshots {
            pacer.wait().await;

            let outcome = match self.append_city(snapshot.id, &snapshot.city_name, snapshot.latitude, snapshot.longitude).await {
                Ok(status) => CityOutcome {
                    city: snapshot.city_name.clone(),
                    status,
                    error: None,
                },
                Err(e) => {
                    tracing::warn!(city = %snapshot.city_name, error = %e, "next-day append failed");
                    CityOutcome {
                        city: snapshot.city_name.clone(),
                        status: CityStatus::Failed,
                        error: Some(e.to_string()),
                    }
                }
            };
            details.push(outcome);
        }

        let summary = CollectionSummary::from_outcomes(details);
        tracing::info!(
            success = summary.success,
            skipped = summary.skipped,
            errors = summary.errors,
            "next-day forecast append finished"
        );

        Ok(summary)
    }

    async fn append_city(
        &self,
        snapshot_id: uuid::Uuid,
        city_name: &str,
        latitude: Decimal,
        longitude: Decimal,
    ) -> AppResult<CityStatus> {
        let location = ProviderLocation::Coordinates {
            latitude,
            longitude,
        };

        let (forecast, air_quality) = tokio::join!(
            self.weather.get_forecast(&location),
            self.weather.get_air_quality(latitude, longitude),
        );

        let forecast = forecast?;
        let air_quality_index = air_quality
            .map_err(|e| tracing::warn!(city = city_name, error = %e, "air quality fetch failed"))
            .ok()
            .map(|aq| aq.index);

        let today_local = local_date(Utc::now(), forecast.timezone_offset_seconds);
        let target_date = today_local + chrono::Duration::days(6);

        let Some(day) = build_forecast_day(&forecast, target_date) else {
            return Err(AppError::WeatherProvider(format!(
                "no forecast samples for {}",
                target_date
            )));
        };

        let inserted = self.snapshots.append_forecast_day(snapshot_id, &day).await?;
        if !inserted {
            tracing::debug!(city = city_name, date = %target_date, "forecast day already present");
            return Ok(CityStatus::Skipped);
        }

        self.snapshots
            .refresh_air_quality(snapshot_id, air_quality_index)
            .await?;

        Ok(CityStatus::Success)
    }
}

/// Local calendar date of a UTC instant under a fixed offset
pub fn local_date(at: chrono::DateTime<Utc>, tz_offset_seconds: i32) -> NaiveDate {
    (at + chrono::Duration::seconds(tz_offset_seconds as i64)).date_naive()
}

/// Derive per-day forecast aggregates for the given day offsets from today
pub fn build_forecast_days(
    series: &ForecastSeries,
    today_local: NaiveDate,
    offsets: std::ops::RangeInclusive<i64>,
) -> Vec<NewForecastDay> {
    offsets
        .filter_map(|offset| build_forecast_day(series, today_local + chrono::Duration::days(offset)))
        .collect()
}

/// Derive one day's forecast aggregate from the 3-hour sample series
///
/// Temperature min/max are taken across the day's samples. The representative
/// sample is the one at local noon when present, otherwise the middle sample
/// of the day. Rain and snow are summed over the day's 3-hour accumulations.
pub fn build_forecast_day(series: &ForecastSeries, date: NaiveDate) -> Option<NewForecastDay> {
    let offset = chrono::Duration::seconds(series.timezone_offset_seconds as i64);
    let day_samples: Vec<&ForecastSample> = series
        .samples
        .iter()
        .filter(|s| (s.timestamp + offset).date_naive() == date)
        .collect();

    if day_samples.is_empty() {
        return None;
    }

    let representative = day_samples
        .iter()
        .find(|s| (s.timestamp + offset).time().hour() == 12)
        .copied()
        .unwrap_or(day_samples[day_samples.len() / 2]);

    let temp_min = day_samples.iter().map(|s| s.temperature).min()?;
    let temp_max = day_samples.iter().map(|s| s.temperature).max()?;

    let rain_total: Decimal = day_samples.iter().filter_map(|s| s.rain_3h_mm).sum();
    let snow_total: Decimal = day_samples.iter().filter_map(|s| s.snow_3h_mm).sum();

    Some(NewForecastDay {
        forecast_date: date,
        temperature: representative.temperature,
        temp_min,
        temp_max,
        condition: representative.condition.clone(),
        icon: representative.icon.clone(),
        humidity: representative.humidity,
        wind_speed: representative.wind_speed,
        rain_mm: (rain_total > Decimal::ZERO).then_some(rain_total),
        snow_mm: (snow_total > Decimal::ZERO).then_some(snow_total),
        cloud_coverage: representative.cloud_coverage,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone};

    fn sample(at: DateTime<Utc>, temp: i64) -> ForecastSample {
        ForecastSample {
            timestamp: at,
            temperature: Decimal::from(temp),
            temp_min: Decimal::from(temp - 1),
            temp_max: Decimal::from(temp + 1),
            humidity: 50,
            pressure: 1013,
            wind_speed: Decimal::new(35, 1),
            cloud_coverage: 20,
            condition: "Clear".to_string(),
            description: "clear sky".to_string(),
            icon: "01d".to_string(),
            rain_3h_mm: None,
            snow_3h_mm: None,
        }
    }

    fn series(samples: Vec<ForecastSample>, tz: i32) -> ForecastSeries {
        ForecastSeries {
            city_name: "Agadir".to_string(),
            country: "MA".to_string(),
            latitude: Decimal::new(304278, 4),
            longitude: Decimal::new(-95981, 4),
            timezone_offset_seconds: tz,
            samples,
        }
    }

    fn utc(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn representative_is_the_noon_sample_when_present() {
        let samples = (0..8).map(|i| sample(utc(2026, 9, 1, i * 3), 20 + i as i64)).collect();
        let series = series(samples, 0);

        let day = build_forecast_day(&series, NaiveDate::from_ymd_opt(2026, 9, 1).unwrap()).unwrap();
        // 12:00 sample carries temperature 24
        assert_eq!(day.temperature, Decimal::from(24));
        assert_eq!(day.temp_min, Decimal::from(20));
        assert_eq!(day.temp_max, Decimal::from(27));
    }

    #[test]
    fn representative_falls_back_to_the_middle_sample() {
        // Samples at 01:00, 04:00, 07:00, 10:00 local: no noon sample
        let samples = (0..4).map(|i| sample(utc(2026, 9, 1, 1 + i * 3), 10 + i as i64)).collect();
        let series = series(samples, 0);

        let day = build_forecast_day(&series, NaiveDate::from_ymd_opt(2026, 9, 1).unwrap()).unwrap();
        assert_eq!(day.temperature, Decimal::from(12));
    }

    #[test]
    fn timezone_offset_shifts_the_day_boundary() {
        // 23:00 UTC lands on the next local day at UTC+2
        let series = series(vec![sample(utc(2026, 9, 1, 23), 15)], 7200);

        assert!(build_forecast_day(&series, NaiveDate::from_ymd_opt(2026, 9, 1).unwrap()).is_none());
        assert!(build_forecast_day(&series, NaiveDate::from_ymd_opt(2026, 9, 2).unwrap()).is_some());
    }

    #[test]
    fn missing_day_yields_no_entry() {
        let series = series(vec![sample(utc(2026, 9, 1, 12), 20)], 0);
        assert!(build_forecast_day(&series, NaiveDate::from_ymd_opt(2026, 9, 3).unwrap()).is_none());
    }

    #[test]
    fn rain_is_summed_over_the_day() {
        let mut wet = sample(utc(2026, 9, 1, 9), 20);
        wet.rain_3h_mm = Some(Decimal::new(15, 1));
        let mut wetter = sample(utc(2026, 9, 1, 12), 21);
        wetter.rain_3h_mm = Some(Decimal::new(25, 1));
        let series = series(vec![wet, wetter], 0);

        let day = build_forecast_day(&series, NaiveDate::from_ymd_opt(2026, 9, 1).unwrap()).unwrap();
        assert_eq!(day.rain_mm, Some(Decimal::new(40, 1)));
    }

    #[tokio::test]
    async fn pacer_spaces_consecutive_waits() {
        let mut pacer = Pacer::new(Duration::from_millis(30));
        let started = std::time::Instant::now();
        pacer.wait().await; // first call is free
        pacer.wait().await;
        assert!(started.elapsed() >= Duration::from_millis(30));
    }
}
