//! MeteoWatch backend library
//!
//! A weather-monitoring service: scheduled collection of per-city weather
//! snapshots from an external provider, user-defined threshold alerts
//! evaluated against live conditions, and a REST API over both.

use std::sync::Arc;
use std::time::Duration;

use axum::{routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod config;
pub mod error;
pub mod external;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod scheduler;
pub mod services;

pub use config::Config;

use external::{MailClient, WeatherClient};
use services::evaluation::SystemClock;
use services::{CollectionService, EvaluationService, SnapshotStore};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub config: Arc<Config>,
}

impl AppState {
    /// Weather provider client built from configuration
    pub fn weather_client(&self) -> WeatherClient {
        WeatherClient::with_base_url(
            self.config.weather.api_key.clone(),
            self.config.weather.api_endpoint.clone(),
        )
    }

    /// Mail API client built from configuration
    pub fn mail_client(&self) -> MailClient {
        MailClient::new(
            self.config.mail.api_endpoint.clone(),
            self.config.mail.api_key.clone(),
            self.config.mail.from_address.clone(),
        )
    }

    /// Collection job service
    pub fn collection_service(&self) -> CollectionService {
        CollectionService::new(
            SnapshotStore::new(self.db.clone()),
            self.weather_client(),
            Duration::from_millis(self.config.weather.request_interval_ms),
        )
    }

    /// Alert evaluation service
    pub fn evaluation_service(&self) -> EvaluationService {
        EvaluationService::new(
            self.db.clone(),
            self.weather_client(),
            self.mail_client(),
            Arc::new(SystemClock),
            self.config.jobs.alert_cooldown_minutes,
            self.config.mail.admin_address.clone(),
        )
    }
}

/// Create the application router with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", routes::api_routes(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Root endpoint
async fn root() -> &'static str {
    "MeteoWatch API v1.0"
}
