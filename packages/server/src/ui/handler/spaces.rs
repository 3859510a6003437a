//! WebSocket handlers of the real-time spaces.
//!
//! Each handler joins the space once the upgrade completes, hands every
//! incoming frame to the space's use case, and leaves when the socket
//! closes. Malformed frames are dropped without a reply.

use std::sync::Arc;

use axum::{
    extract::{
        Query, State,
        ws::{WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, de::DeserializeOwned};
use tokio::sync::mpsc;

use crate::{
    domain::{DisplayName, Point, Position, SpaceName, Stroke, TextFragment},
    infrastructure::dto::websocket::{
        EdgeRequest, ResonanceRequest, ThresholdRequest, WeaveRequest,
    },
    ui::state::AppState,
};

use super::websocket::run_socket;

const DEFAULT_PRESENCE_SPACE: &str = "clearing";
const MAX_WEAVE_NAME_CHARS: usize = 30;

/// Query parameters of the presence endpoint
#[derive(Debug, Deserialize)]
pub struct PresenceQuery {
    pub space: Option<String>,
}

fn parse<T: DeserializeOwned>(space: &str, text: &str) -> Option<T> {
    match serde_json::from_str(text) {
        Ok(request) => Some(request),
        Err(e) => {
            tracing::debug!("Ignoring malformed frame in '{}': {}", space, e);
            None
        }
    }
}

// ========================================
// Presence
// ========================================

pub async fn presence_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<PresenceQuery>,
) -> Result<impl IntoResponse, StatusCode> {
    let raw = query
        .space
        .unwrap_or_else(|| DEFAULT_PRESENCE_SPACE.to_string());
    let space = match SpaceName::new(raw) {
        Ok(space) => space,
        Err(e) => {
            tracing::debug!("Rejecting presence connection: {}", e);
            return Err(StatusCode::BAD_REQUEST);
        }
    };
    Ok(ws.on_upgrade(move |socket| presence_socket(socket, state, space)))
}

async fn presence_socket(socket: WebSocket, state: Arc<AppState>, space: SpaceName) {
    let (tx, rx) = mpsc::unbounded_channel();
    let party_id = state.presence.admit(space, tx).await;

    // The presence endpoint only listens
    run_socket(socket, rx, |_| async {}).await;

    state.presence.remove(&party_id).await;
}

// ========================================
// Edge
// ========================================

pub async fn edge_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| edge_socket(socket, state))
}

async fn edge_socket(socket: WebSocket, state: Arc<AppState>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let party = state.edge.join(tx).await;

    let edge = state.edge.clone();
    let party_id = party.id.clone();
    run_socket(socket, rx, move |text| {
        let edge = edge.clone();
        let party_id = party_id.clone();
        async move {
            let Some(EdgeRequest::Stroke { points }) = parse("edge", &text) else {
                return;
            };
            let points: Vec<Point> = points.into_iter().map(Point::from).collect();
            edge.submit(&party_id, |_| Stroke::new(points)).await;
        }
    })
    .await;

    state.edge.leave(&party.id).await;
}

// ========================================
// Weave
// ========================================

pub async fn weave_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| weave_socket(socket, state))
}

async fn weave_socket(socket: WebSocket, state: Arc<AppState>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let party = state.weave.join(tx).await;

    let weave = state.weave.clone();
    let party_id = party.id.clone();
    run_socket(socket, rx, move |text| {
        let weave = weave.clone();
        let party_id = party_id.clone();
        async move {
            let Some(request) = parse::<WeaveRequest>("weave", &text) else {
                return;
            };
            match request {
                WeaveRequest::Cursor { x, y } => {
                    weave
                        .update_party(&party_id, |party| {
                            party.position = Position::clamped(x, y);
                            true
                        })
                        .await;
                }
                WeaveRequest::Name { name } => {
                    weave
                        .update_party(&party_id, |party| {
                            match DisplayName::truncated(&name, MAX_WEAVE_NAME_CHARS) {
                                Some(name) => {
                                    party.name = Some(name);
                                    true
                                }
                                None => false,
                            }
                        })
                        .await;
                }
                WeaveRequest::Fragment { content, x, y } => {
                    weave
                        .submit(&party_id, |party| {
                            TextFragment::new(&content, Position::clamped(x, y), party.id.clone())
                        })
                        .await;
                }
            }
        }
    })
    .await;

    state.weave.leave(&party.id).await;
}

// ========================================
// Resonance
// ========================================

pub async fn resonance_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| resonance_socket(socket, state))
}

async fn resonance_socket(socket: WebSocket, state: Arc<AppState>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let party = state.resonance.join(tx).await;

    let resonance = state.resonance.clone();
    let party_id = party.id.clone();
    run_socket(socket, rx, move |text| {
        let resonance = resonance.clone();
        let party_id = party_id.clone();
        async move {
            match parse::<ResonanceRequest>("resonance", &text) {
                Some(ResonanceRequest::Move { x, y }) => resonance.move_to(&party_id, x, y).await,
                Some(ResonanceRequest::Start) => resonance.start(&party_id).await,
                Some(ResonanceRequest::Stop) => resonance.stop(&party_id).await,
                None => {}
            }
        }
    })
    .await;

    state.resonance.leave(&party.id).await;
}

// ========================================
// Threshold
// ========================================

pub async fn threshold_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| threshold_socket(socket, state))
}

async fn threshold_socket(socket: WebSocket, state: Arc<AppState>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let party_id = state.threshold.join(tx).await;

    let threshold = state.threshold.clone();
    let id = party_id.clone();
    run_socket(socket, rx, move |text| {
        let threshold = threshold.clone();
        let id = id.clone();
        async move {
            match parse::<ThresholdRequest>("threshold", &text) {
                Some(ThresholdRequest::Message { content }) => {
                    threshold.speak(&id, &content).await;
                }
                Some(ThresholdRequest::Witness) => {
                    threshold.witness(&id).await;
                }
                Some(ThresholdRequest::Name { name }) => threshold.set_name(&id, &name).await,
                None => {}
            }
        }
    })
    .await;

    state.threshold.leave(&party_id).await;
}
