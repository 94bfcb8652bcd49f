//! HTTP handlers for stored weather snapshots

use axum::{
    extract::{Path, State},
    Json,
};

use crate::error::AppResult;
use crate::services::snapshots::{SnapshotStore, SnapshotWithForecast, WeatherSnapshot};
use crate::AppState;

/// List all city snapshots
pub async fn list_snapshots(State(state): State<AppState>) -> AppResult<Json<Vec<WeatherSnapshot>>> {
    let store = SnapshotStore::new(state.db);
    let snapshots = store.list().await?;
    Ok(Json(snapshots))
}

/// Get one city's snapshot with its forecast list
pub async fn get_snapshot(
    State(state): State<AppState>,
    Path(city): Path<String>,
) -> AppResult<Json<SnapshotWithForecast>> {
    let store = SnapshotStore::new(state.db);
    let snapshot = store.get_by_city(&city).await?;
    Ok(Json(snapshot))
}
