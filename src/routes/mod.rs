//! Route definitions for the MeteoWatch backend

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};

use crate::{
    handlers,
    middleware::{auth_middleware, service_auth_middleware},
    AppState,
};

/// Create API routes
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Auth routes (public)
        .nest("/auth", auth_routes())
        // Job triggers (service token)
        .nest("/collection", collection_routes(state.clone()))
        // Protected routes - alert rules and triggered log
        .nest("/alerts", alert_routes(state.clone()))
        .nest("/triggered-alerts", triggered_routes(state.clone()))
        // Protected routes - stored weather
        .nest("/snapshots", snapshot_routes(state.clone()))
        // Protected routes - profile
        .nest("/users", user_routes(state.clone()))
        // Protected routes - source registry and statistics
        .nest("/sources", source_routes(state.clone()))
        .nest("/statistics", statistics_routes(state))
}

/// Authentication routes (public)
fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(handlers::register))
        .route("/verify", post(handlers::verify))
        .route("/login", post(handlers::login))
        .route("/password-reset", post(handlers::request_password_reset))
        .route("/password-reset/confirm", post(handlers::confirm_password_reset))
}

/// Job-trigger routes (service token)
fn collection_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/init", get(handlers::run_initial_collection))
        .route("/add-next-day", get(handlers::run_daily_append))
        .route_layer(middleware::from_fn_with_state(state, service_auth_middleware))
}

/// Alert rule routes (protected)
fn alert_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_alert_rules).post(handlers::create_alert_rule),
        )
        .route("/triggered", get(handlers::list_triggered_alerts))
        .route(
            "/:rule_id",
            get(handlers::get_alert_rule)
                .patch(handlers::update_alert_rule)
                .delete(handlers::delete_alert_rule),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        // Manual sweep trigger: service token, not user auth
        .route(
            "/check/now",
            post(handlers::run_alert_sweep)
                .route_layer(middleware::from_fn_with_state(state, service_auth_middleware)),
        )
}

/// Triggered alert routes (protected)
fn triggered_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/:alert_id/read", put(handlers::mark_triggered_alert_read))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Stored weather routes (protected)
fn snapshot_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_snapshots))
        .route("/:city", get(handlers::get_snapshot))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Profile routes (protected)
fn user_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/me", get(handlers::get_profile))
        .route("/me/city", put(handlers::update_city))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Source registry routes (protected)
fn source_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_sources).post(handlers::create_source))
        .route("/:source_id", delete(handlers::delete_source))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Monthly statistics routes (protected)
fn statistics_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/monthly",
            get(handlers::list_monthly_statistics).post(handlers::record_monthly_statistics),
        )
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}
