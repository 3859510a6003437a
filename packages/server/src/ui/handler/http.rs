//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{Json, extract::State};

use crate::{
    infrastructure::dto::federation::{FederationStateDto, PresenceDto},
    ui::state::AppState,
};

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Federation snapshot, the same document watchers receive
pub async fn get_federation(State(state): State<Arc<AppState>>) -> Json<FederationStateDto> {
    Json(FederationStateDto::from(state.federation.state().await))
}

/// Local presence across the reporting sub-spaces
pub async fn get_presence(State(state): State<Arc<AppState>>) -> Json<PresenceDto> {
    Json(PresenceDto::from(state.federation.local_presence().await))
}
