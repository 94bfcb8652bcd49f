//! HTTP handlers for the source registry and monthly statistics

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::sources::{
    CreateSourceInput, MonthlyStatistics, RecordStatisticsInput, SourceService, WeatherSource,
};
use crate::AppState;

/// List registered weather sources
pub async fn list_sources(State(state): State<AppState>) -> AppResult<Json<Vec<WeatherSource>>> {
    let service = SourceService::new(state.db);
    let sources = service.list().await?;
    Ok(Json(sources))
}

/// Register a weather source
pub async fn create_source(
    State(state): State<AppState>,
    Json(input): Json<CreateSourceInput>,
) -> AppResult<(StatusCode, Json<WeatherSource>)> {
    let service = SourceService::new(state.db);
    let source = service.create(input).await?;
    Ok((StatusCode::CREATED, Json(source)))
}

/// Delete a weather source
pub async fn delete_source(
    State(state): State<AppState>,
    Path(source_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let service = SourceService::new(state.db);
    service.delete(source_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Record a monthly aggregate
pub async fn record_monthly_statistics(
    State(state): State<AppState>,
    Json(input): Json<RecordStatisticsInput>,
) -> AppResult<(StatusCode, Json<MonthlyStatistics>)> {
    let service = SourceService::new(state.db);
    let stats = service.record_statistics(input).await?;
    Ok((StatusCode::CREATED, Json(stats)))
}

/// Query parameters for the statistics listing
#[derive(Debug, Deserialize)]
pub struct StatisticsQuery {
    pub city: String,
}

/// List monthly aggregates for a city
pub async fn list_monthly_statistics(
    State(state): State<AppState>,
    Query(query): Query<StatisticsQuery>,
) -> AppResult<Json<Vec<MonthlyStatistics>>> {
    let service = SourceService::new(state.db);
    let stats = service.list_statistics(&query.city).await?;
    Ok(Json(stats))
}
