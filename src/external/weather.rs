//! Weather API client for fetching weather data
//!
//! Integrates with OpenWeatherMap for current conditions, the 5-day/3-hour
//! forecast, air quality, UV index, and provider-issued severe weather alerts.

use chrono::{DateTime, Utc};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Weather API client
#[derive(Clone)]
pub struct WeatherClient {
    client: Client,
    api_key: String,
    base_url: String,
}

/// A lookup target for the provider: either a city name or GPS coordinates.
#[derive(Debug, Clone)]
pub enum ProviderLocation {
    City(String),
    Coordinates { latitude: Decimal, longitude: Decimal },
}

impl ProviderLocation {
    fn query_string(&self) -> String {
        match self {
            ProviderLocation::City(name) => format!("q={}", name),
            ProviderLocation::Coordinates {
                latitude,
                longitude,
            } => format!("lat={}&lon={}", latitude, longitude),
        }
    }
}

/// Current weather conditions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub city_name: String,
    pub country: String,
    pub latitude: Decimal,
    pub longitude: Decimal,
    pub timestamp: DateTime<Utc>,
    pub temperature: Decimal,
    pub feels_like: Decimal,
    pub humidity: i32,
    pub pressure: i32,
    pub wind_speed: Decimal,
    pub wind_direction: i32,
    pub cloud_coverage: i32,
    pub condition: String,
    pub description: String,
    pub icon: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rain_1h_mm: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rain_3h_mm: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snow_1h_mm: Option<Decimal>,
}

/// One 3-hour forecast sample
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastSample {
    pub timestamp: DateTime<Utc>,
    pub temperature: Decimal,
    pub temp_min: Decimal,
    pub temp_max: Decimal,
    pub humidity: i32,
    pub pressure: i32,
    pub wind_speed: Decimal,
    pub cloud_coverage: i32,
    pub condition: String,
    pub description: String,
    pub icon: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rain_3h_mm: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snow_3h_mm: Option<Decimal>,
}

/// 5-day/3-hour forecast series (40 samples)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastSeries {
    pub city_name: String,
    pub country: String,
    pub latitude: Decimal,
    pub longitude: Decimal,
    pub timezone_offset_seconds: i32,
    pub samples: Vec<ForecastSample>,
}

/// Air quality reading (1 = good .. 5 = very poor)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AirQuality {
    pub index: i32,
}

/// Provider-issued severe weather alert
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderAlert {
    pub sender: String,
    pub event: String,
    pub description: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

/// OpenWeatherMap API response for current weather
#[derive(Debug, Deserialize)]
struct OwmCurrentResponse {
    coord: OwmCoord,
    weather: Vec<OwmWeather>,
    main: OwmMain,
    wind: OwmWind,
    clouds: OwmClouds,
    rain: Option<OwmPrecipitation>,
    snow: Option<OwmPrecipitation>,
    dt: i64,
    sys: OwmSys,
    name: String,
}

#[derive(Debug, Deserialize)]
struct OwmCoord {
    lat: f64,
    lon: f64,
}

#[derive(Debug, Deserialize)]
struct OwmWeather {
    main: String,
    description: String,
    icon: String,
}

#[derive(Debug, Deserialize)]
struct OwmMain {
    temp: f64,
    feels_like: f64,
    temp_min: f64,
    temp_max: f64,
    pressure: i32,
    humidity: i32,
}

#[derive(Debug, Deserialize)]
struct OwmWind {
    speed: f64,
    deg: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct OwmClouds {
    all: i32,
}

#[derive(Debug, Deserialize)]
struct OwmPrecipitation {
    #[serde(rename = "1h")]
    one_hour: Option<f64>,
    #[serde(rename = "3h")]
    three_hour: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OwmSys {
    country: Option<String>,
}

/// OpenWeatherMap API response for the 5-day forecast
#[derive(Debug, Deserialize)]
struct OwmForecastResponse {
    city: OwmCity,
    list: Vec<OwmForecastItem>,
}

#[derive(Debug, Deserialize)]
struct OwmCity {
    name: String,
    country: Option<String>,
    coord: OwmCoord,
    timezone: i32,
}

#[derive(Debug, Deserialize)]
struct OwmForecastItem {
    dt: i64,
    main: OwmMain,
    weather: Vec<OwmWeather>,
    clouds: OwmClouds,
    wind: OwmWind,
    rain: Option<OwmPrecipitation>,
    snow: Option<OwmPrecipitation>,
}

/// OpenWeatherMap air pollution response
#[derive(Debug, Deserialize)]
struct OwmAirPollutionResponse {
    list: Vec<OwmAirPollutionItem>,
}

#[derive(Debug, Deserialize)]
struct OwmAirPollutionItem {
    main: OwmAqi,
}

#[derive(Debug, Deserialize)]
struct OwmAqi {
    aqi: i32,
}

/// OpenWeatherMap UV index response
#[derive(Debug, Deserialize)]
struct OwmUvResponse {
    value: f64,
}

/// OpenWeatherMap One Call response, trimmed to the alerts feed
#[derive(Debug, Deserialize)]
struct OwmOneCallResponse {
    #[serde(default)]
    alerts: Vec<OwmAlert>,
}

#[derive(Debug, Deserialize)]
struct OwmAlert {
    sender_name: String,
    event: String,
    description: String,
    start: i64,
    end: i64,
}

impl WeatherClient {
    /// Create a new WeatherClient
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: "https://api.openweathermap.org".to_string(),
        }
    }

    /// Create a new WeatherClient with custom base URL (for testing)
    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url,
        }
    }

    /// Fetch current weather conditions for a city or coordinate pair
    pub async fn get_current_conditions(
        &self,
        location: &ProviderLocation,
    ) -> AppResult<CurrentConditions> {
        let url = format!(
            "{}/data/2.5/weather?{}&appid={}&units=metric",
            self.base_url,
            location.query_string(),
            self.api_key
        );

        let data: OwmCurrentResponse = self.fetch_json(&url, "current conditions").await?;
        Ok(convert_current_response(data))
    }

    /// Fetch the 5-day/3-hour forecast for a city or coordinate pair
    pub async fn get_forecast(&self, location: &ProviderLocation) -> AppResult<ForecastSeries> {
        let url = format!(
            "{}/data/2.5/forecast?{}&appid={}&units=metric",
            self.base_url,
            location.query_string(),
            self.api_key
        );

        let data: OwmForecastResponse = self.fetch_json(&url, "forecast").await?;
        Ok(convert_forecast_response(data))
    }

    /// Fetch the air quality index for a coordinate pair
    pub async fn get_air_quality(
        &self,
        latitude: Decimal,
        longitude: Decimal,
    ) -> AppResult<AirQuality> {
        let url = format!(
            "{}/data/2.5/air_pollution?lat={}&lon={}&appid={}",
            self.base_url, latitude, longitude, self.api_key
        );

        let data: OwmAirPollutionResponse = self.fetch_json(&url, "air quality").await?;
        let index = data
            .list
            .first()
            .map(|item| item.main.aqi)
            .ok_or_else(|| AppError::WeatherProvider("empty air quality response".to_string()))?;

        Ok(AirQuality { index })
    }

    /// Fetch the UV index for a coordinate pair
    pub async fn get_uv_index(&self, latitude: Decimal, longitude: Decimal) -> AppResult<Decimal> {
        let url = format!(
            "{}/data/2.5/uvi?lat={}&lon={}&appid={}",
            self.base_url, latitude, longitude, self.api_key
        );

        let data: OwmUvResponse = self.fetch_json(&url, "UV index").await?;
        Ok(Decimal::from_f64_retain(data.value).unwrap_or_default())
    }

    /// Fetch provider-issued severe weather alerts for a coordinate pair
    pub async fn get_provider_alerts(
        &self,
        latitude: Decimal,
        longitude: Decimal,
    ) -> AppResult<Vec<ProviderAlert>> {
        let url = format!(
            "{}/data/2.5/onecall?lat={}&lon={}&exclude=current,minutely,hourly,daily&appid={}",
            self.base_url, latitude, longitude, self.api_key
        );

        let data: OwmOneCallResponse = self.fetch_json(&url, "weather alerts").await?;
        let alerts = data
            .alerts
            .into_iter()
            .map(|alert| ProviderAlert {
                sender: alert.sender_name,
                event: alert.event,
                description: alert.description,
                starts_at: DateTime::from_timestamp(alert.start, 0).unwrap_or_else(Utc::now),
                ends_at: DateTime::from_timestamp(alert.end, 0).unwrap_or_else(Utc::now),
            })
            .collect();

        Ok(alerts)
    }

    async fn fetch_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        what: &str,
    ) -> AppResult<T> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::WeatherProvider(format!("{} request failed: {}", what, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::WeatherProvider(format!(
                "{} request returned {}: {}",
                what, status, body
            )));
        }

        response.json().await.map_err(|e| {
            AppError::WeatherProvider(format!("failed to parse {} response: {}", what, e))
        })
    }
}

/// Convert OpenWeatherMap current response to our format
fn convert_current_response(data: OwmCurrentResponse) -> CurrentConditions {
    let weather = data.weather.first();

    CurrentConditions {
        city_name: data.name,
        country: data.sys.country.unwrap_or_default(),
        latitude: Decimal::from_f64_retain(data.coord.lat).unwrap_or_default(),
        longitude: Decimal::from_f64_retain(data.coord.lon).unwrap_or_default(),
        timestamp: DateTime::from_timestamp(data.dt, 0).unwrap_or_else(Utc::now),
        temperature: Decimal::from_f64_retain(data.main.temp).unwrap_or_default(),
        feels_like: Decimal::from_f64_retain(data.main.feels_like).unwrap_or_default(),
        humidity: data.main.humidity,
        pressure: data.main.pressure,
        wind_speed: Decimal::from_f64_retain(data.wind.speed).unwrap_or_default(),
        wind_direction: data.wind.deg.unwrap_or(0),
        cloud_coverage: data.clouds.all,
        condition: weather.map(|w| w.main.clone()).unwrap_or_default(),
        description: weather.map(|w| w.description.clone()).unwrap_or_default(),
        icon: weather.map(|w| w.icon.clone()).unwrap_or_default(),
        rain_1h_mm: data
            .rain
            .as_ref()
            .and_then(|r| r.one_hour)
            .map(|v| Decimal::from_f64_retain(v).unwrap_or_default()),
        rain_3h_mm: data
            .rain
            .as_ref()
            .and_then(|r| r.three_hour)
            .map(|v| Decimal::from_f64_retain(v).unwrap_or_default()),
        snow_1h_mm: data
            .snow
            .as_ref()
            .and_then(|s| s.one_hour)
            .map(|v| Decimal::from_f64_retain(v).unwrap_or_default()),
    }
}

/// Convert OpenWeatherMap forecast response to our format
fn convert_forecast_response(data: OwmForecastResponse) -> ForecastSeries {
    let samples = data
        .list
        .into_iter()
        .map(|item| {
            let weather = item.weather.first();
            ForecastSample {
                timestamp: DateTime::from_timestamp(item.dt, 0).unwrap_or_else(Utc::now),
                temperature: Decimal::from_f64_retain(item.main.temp).unwrap_or_default(),
                temp_min: Decimal::from_f64_retain(item.main.temp_min).unwrap_or_default(),
                temp_max: Decimal::from_f64_retain(item.main.temp_max).unwrap_or_default(),
                humidity: item.main.humidity,
                pressure: item.main.pressure,
                wind_speed: Decimal::from_f64_retain(item.wind.speed).unwrap_or_default(),
                cloud_coverage: item.clouds.all,
                condition: weather.map(|w| w.main.clone()).unwrap_or_default(),
                description: weather.map(|w| w.description.clone()).unwrap_or_default(),
                icon: weather.map(|w| w.icon.clone()).unwrap_or_default(),
                rain_3h_mm: item
                    .rain
                    .and_then(|r| r.three_hour)
                    .map(|v| Decimal::from_f64_retain(v).unwrap_or_default()),
                snow_3h_mm: item
                    .snow
                    .and_then(|s| s.three_hour)
                    .map(|v| Decimal::from_f64_retain(v).unwrap_or_default()),
            }
        })
        .collect();

    ForecastSeries {
        city_name: data.city.name,
        country: data.city.country.unwrap_or_default(),
        latitude: Decimal::from_f64_retain(data.city.coord.lat).unwrap_or_default(),
        longitude: Decimal::from_f64_retain(data.city.coord.lon).unwrap_or_default(),
        timezone_offset_seconds: data.city.timezone,
        samples,
    }
}
