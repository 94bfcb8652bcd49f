//! Forecast derivation integration tests
//!
//! Exercises the 3-hour-series to daily-forecast aggregation used by the
//! collection jobs: a full 40-sample provider series yields exactly five
//! forecast days, representative samples are picked at local noon, and
//! timezone offsets shift day boundaries.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;

use meteowatch::external::weather::{ForecastSample, ForecastSeries};
use meteowatch::services::collection::{build_forecast_day, build_forecast_days, local_date};
use meteowatch::services::snapshots::{day_name, display_date};

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn sample(at: DateTime<Utc>, temp: Decimal) -> ForecastSample {
    ForecastSample {
        timestamp: at,
        temperature: temp,
        temp_min: temp - dec("1.0"),
        temp_max: temp + dec("1.0"),
        humidity: 60,
        pressure: 1015,
        wind_speed: dec("4.2"),
        cloud_coverage: 30,
        condition: "Clouds".to_string(),
        description: "scattered clouds".to_string(),
        icon: "03d".to_string(),
        rain_3h_mm: None,
        snow_3h_mm: None,
    }
}

/// A full provider response: 40 samples, every 3 hours, starting at the
/// given instant
fn full_series(start: DateTime<Utc>, tz_offset_seconds: i32) -> ForecastSeries {
    let samples = (0..40)
        .map(|i| {
            let at = start + Duration::hours(3 * i);
            // Temperatures cycle within each day so min/max are distinct
            let temp = dec("18.0") + Decimal::from(i % 8);
            sample(at, temp)
        })
        .collect();

    ForecastSeries {
        city_name: "Casablanca".to_string(),
        country: "MA".to_string(),
        latitude: dec("33.5731"),
        longitude: dec("-7.5898"),
        timezone_offset_seconds: tz_offset_seconds,
        samples,
    }
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_full_series_yields_five_forecast_days() {
        let start = Utc.with_ymd_and_hms(2026, 9, 1, 0, 0, 0).unwrap();
        let series = full_series(start, 0);

        let days = build_forecast_days(&series, date(2026, 9, 1), 1..=5);

        assert_eq!(days.len(), 5);
        for (i, day) in days.iter().enumerate() {
            assert_eq!(day.forecast_date, date(2026, 9, 2 + i as u32));
        }
    }

    #[test]
    fn test_aggregates_bound_the_representative() {
        let start = Utc.with_ymd_and_hms(2026, 9, 1, 0, 0, 0).unwrap();
        let series = full_series(start, 0);

        for day in build_forecast_days(&series, date(2026, 9, 1), 1..=5) {
            assert!(day.temp_min <= day.temperature);
            assert!(day.temperature <= day.temp_max);
        }
    }

    #[test]
    fn test_representative_is_local_noon() {
        let start = Utc.with_ymd_and_hms(2026, 9, 1, 0, 0, 0).unwrap();
        let series = full_series(start, 0);

        // Day 2 starts at sample index 8; its 12:00 sample is index 12,
        // carrying temperature 18 + (12 % 8) = 22
        let day = build_forecast_day(&series, date(2026, 9, 2)).unwrap();
        assert_eq!(day.temperature, dec("22.0"));
    }

    #[test]
    fn test_dry_day_has_no_rain_entry() {
        let start = Utc.with_ymd_and_hms(2026, 9, 1, 0, 0, 0).unwrap();
        let series = full_series(start, 0);

        let day = build_forecast_day(&series, date(2026, 9, 2)).unwrap();
        assert_eq!(day.rain_mm, None);
        assert_eq!(day.snow_mm, None);
    }

    #[test]
    fn test_rain_sums_across_the_day() {
        let start = Utc.with_ymd_and_hms(2026, 9, 1, 0, 0, 0).unwrap();
        let mut series = full_series(start, 0);
        // Two wet samples on day 2
        series.samples[9].rain_3h_mm = Some(dec("1.5"));
        series.samples[12].rain_3h_mm = Some(dec("2.5"));

        let day = build_forecast_day(&series, date(2026, 9, 2)).unwrap();
        assert_eq!(day.rain_mm, Some(dec("4.0")));
    }

    #[test]
    fn test_timezone_shifts_day_grouping() {
        // A 22:30 UTC sample belongs to the next local day at UTC+3
        let at = Utc.with_ymd_and_hms(2026, 9, 1, 22, 30, 0).unwrap();
        let series = ForecastSeries {
            samples: vec![sample(at, dec("20.0"))],
            ..full_series(at, 3 * 3600)
        };

        assert!(build_forecast_day(&series, date(2026, 9, 1)).is_none());
        assert!(build_forecast_day(&series, date(2026, 9, 2)).is_some());
    }

    #[test]
    fn test_local_date_crosses_midnight() {
        let at = Utc.with_ymd_and_hms(2026, 8, 31, 23, 30, 0).unwrap();

        assert_eq!(local_date(at, 0), date(2026, 8, 31));
        assert_eq!(local_date(at, 3600), date(2026, 9, 1));
        assert_eq!(local_date(at, -3600), date(2026, 8, 31));
    }

    #[test]
    fn test_display_fields_derive_from_the_date() {
        let d = date(2026, 9, 2);
        assert_eq!(day_name(d), "Wednesday");
        assert_eq!(display_date(d), "02/09/2026");
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    /// Strategy for generating temperatures (-10.0 to 45.0)
    fn temperature_strategy() -> impl Strategy<Value = Decimal> {
        (-100i64..=450i64).prop_map(|n| Decimal::new(n, 1))
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// The representative temperature always lies within the day's
        /// min/max aggregates
        #[test]
        fn prop_representative_within_bounds(
            temps in proptest::collection::vec(temperature_strategy(), 1..=8)
        ) {
            let start = Utc.with_ymd_and_hms(2026, 9, 1, 0, 0, 0).unwrap();
            let samples = temps
                .iter()
                .enumerate()
                .map(|(i, t)| sample(start + Duration::hours(3 * i as i64), *t))
                .collect();
            let series = ForecastSeries { samples, ..full_series(start, 0) };

            let day = build_forecast_day(&series, date(2026, 9, 1)).unwrap();
            prop_assert!(day.temp_min <= day.temperature);
            prop_assert!(day.temperature <= day.temp_max);
            prop_assert_eq!(day.temp_min, temps.iter().copied().min().unwrap());
            prop_assert_eq!(day.temp_max, temps.iter().copied().max().unwrap());
        }

        /// Requesting a date the series does not cover yields no entry
        #[test]
        fn prop_uncovered_dates_yield_nothing(offset in 6i64..=30i64) {
            let start = Utc.with_ymd_and_hms(2026, 9, 1, 0, 0, 0).unwrap();
            let series = full_series(start, 0);

            let target = date(2026, 9, 1) + Duration::days(offset);
            prop_assert!(build_forecast_day(&series, target).is_none());
        }

        /// The local date never drifts more than one calendar day from UTC
        /// for real-world offsets
        #[test]
        fn prop_local_date_within_one_day(
            hour in 0u32..24u32,
            offset_hours in -12i32..=14i32
        ) {
            let at = Utc.with_ymd_and_hms(2026, 9, 15, hour, 0, 0).unwrap();
            let local = local_date(at, offset_hours * 3600);
            let utc_day = at.date_naive();

            let drift = (local - utc_day).num_days().abs();
            prop_assert!(drift <= 1);
        }
    }
}
