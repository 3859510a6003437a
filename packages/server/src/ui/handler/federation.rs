//! The federation endpoint: peer instances and local watchers share one path.

use std::sync::Arc;

use axum::{
    extract::{
        State,
        ws::{WebSocket, WebSocketUpgrade},
    },
    http::{HeaderMap, header::SEC_WEBSOCKET_PROTOCOL},
    response::IntoResponse,
};
use tokio::sync::mpsc;

use crate::{
    domain::PeerChannel, infrastructure::dto::federation::WATCHER_PROTOCOL, ui::state::AppState,
};

use super::websocket::run_socket;

/// Whether the client offered the watcher subprotocol
fn offers_watcher_protocol(headers: &HeaderMap) -> bool {
    headers
        .get_all(SEC_WEBSOCKET_PROTOCOL)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .any(|protocol| protocol.trim() == WATCHER_PROTOCOL)
}

pub async fn federation_handler(
    ws: WebSocketUpgrade,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    if offers_watcher_protocol(&headers) {
        ws.protocols([WATCHER_PROTOCOL])
            .on_upgrade(move |socket| watcher_socket(socket, state))
    } else {
        ws.on_upgrade(move |socket| peer_socket(socket, state))
    }
}

async fn watcher_socket(socket: WebSocket, state: Arc<AppState>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let watcher_id = state.federation.add_watcher(tx).await;

    let federation = state.federation.clone();
    run_socket(socket, rx, move |text| {
        let federation = federation.clone();
        async move { federation.handle_watcher_frame(&text).await }
    })
    .await;

    state.federation.remove_watcher(&watcher_id).await;
}

/// Bridge the socket to a [`PeerChannel`] served by the federation use case
async fn peer_socket(socket: WebSocket, state: Arc<AppState>) {
    let (outbound, rx) = mpsc::unbounded_channel();
    let (forward, inbound) = mpsc::unbounded_channel();
    let serve = tokio::spawn(
        state
            .federation
            .clone()
            .serve_inbound(PeerChannel { outbound, inbound }),
    );

    run_socket(socket, rx, move |text| {
        let sent = forward.send(text);
        async move {
            if sent.is_err() {
                tracing::debug!("Peer frame arrived after the connection was released");
            }
        }
    })
    .await;

    // The reader is gone, so the inbound side has ended
    if let Err(e) = serve.await {
        tracing::warn!("Peer connection task failed: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_watcher_protocol_is_detected_among_offers() {
        // テスト項目: 複数のサブプロトコルが提示されてもウォッチャーを判別できる
        // given (前提条件):
        let mut headers = HeaderMap::new();
        headers.insert(
            SEC_WEBSOCKET_PROTOCOL,
            HeaderValue::from_static("chat, federation-watcher"),
        );

        // when (操作):
        let is_watcher = offers_watcher_protocol(&headers);

        // then (期待する結果):
        assert!(is_watcher);
        assert!(!offers_watcher_protocol(&HeaderMap::new()));
    }
}
