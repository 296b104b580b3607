//! API Handlers
//!
//! HTTP request handlers for the cache inspection endpoints.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};

use crate::adapter::CacheThroughStore;
use crate::error::{CacheError, Result};
use crate::models::{
    ClearResponse, GetResponse, HealthResponse, InvalidateResponse, MaintenanceResponse,
    SetRequest, SetResponse, StatsResponse,
};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Cache-through adapter over the backing store
    pub cache: Arc<CacheThroughStore>,
}

impl AppState {
    pub fn new(cache: CacheThroughStore) -> Self {
        Self {
            cache: Arc::new(cache),
        }
    }

    fn active(&self) -> Result<&CacheThroughStore> {
        if self.cache.is_disposed() {
            return Err(CacheError::Disposed("cache is shutting down".to_string()));
        }
        Ok(&self.cache)
    }
}

/// Handler for GET /get/:key
///
/// Reads through the cache. Absent keys and tombstones are both 404.
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<GetResponse>> {
    let cache = state.active()?;

    match cache.get(&key).await? {
        Some(record) if !record.is_tombstone => Ok(Json(GetResponse::from(record))),
        _ => Err(CacheError::NotFound(key)),
    }
}

/// Handler for PUT /set
///
/// Writes to the backing store, which invalidates the cached copy.
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let cache = state.active()?;
    cache.put(&req.key, &req.value).await?;

    Ok(Json(SetResponse::new(req.key)))
}

/// Handler for DELETE /cache/:key
///
/// Drops the cached copy only; the backing store keeps the record.
pub async fn invalidate_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<InvalidateResponse>> {
    let cache = state.active()?;
    let invalidated = cache.invalidate(&key).await;

    Ok(Json(InvalidateResponse { key, invalidated }))
}

/// Handler for POST /cache/clear
pub async fn clear_handler(State(state): State<AppState>) -> Result<Json<ClearResponse>> {
    state.active()?.clear_cache().await;
    Ok(Json(ClearResponse::cleared()))
}

/// Handler for POST /cache/maintenance
pub async fn maintenance_handler(
    State(state): State<AppState>,
) -> Result<Json<MaintenanceResponse>> {
    let removed = state.active()?.perform_maintenance().await;
    Ok(Json(MaintenanceResponse { removed }))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let engine = state.cache.engine();
    let entries = engine.len().await;
    let metrics = engine.metrics().await;

    Json(StatsResponse::new(entries, &metrics))
}

/// Handler for GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::new(state.cache.is_disposed()))
}
