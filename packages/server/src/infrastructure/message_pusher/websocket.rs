//! WebSocket-backed MessagePusher.
//!
//! Sockets are accepted in the UI layer, which hands each party's frame
//! queue (`PusherChannel`) to this pusher. The pusher only routes frames to
//! queues; the socket's send loop drains them.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{MessagePushError, MessagePusher, PartyId, PusherChannel};

/// Routes frames to the queues of connected parties.
///
/// Each space has its own pusher, so a broadcast only ever reaches the
/// sockets of one endpoint.
#[derive(Default)]
pub struct WebSocketMessagePusher {
    /// Key: party id
    clients: Arc<Mutex<HashMap<PartyId, PusherChannel>>>,
}

impl WebSocketMessagePusher {
    pub fn new(clients: Arc<Mutex<HashMap<PartyId, PusherChannel>>>) -> Self {
        Self { clients }
    }
}

#[async_trait]
impl MessagePusher for WebSocketMessagePusher {
    async fn register_client(&self, party_id: PartyId, sender: PusherChannel) {
        let mut clients = self.clients.lock().await;
        tracing::debug!("Party '{}' registered to MessagePusher", party_id);
        clients.insert(party_id, sender);
    }

    async fn unregister_client(&self, party_id: &PartyId) {
        let mut clients = self.clients.lock().await;
        clients.remove(party_id);
        tracing::debug!("Party '{}' unregistered from MessagePusher", party_id);
    }

    async fn push_to(&self, party_id: &PartyId, content: &str) -> Result<(), MessagePushError> {
        let clients = self.clients.lock().await;

        if let Some(sender) = clients.get(party_id) {
            sender
                .send(content.to_string())
                .map_err(|e| MessagePushError::PushFailed(e.to_string()))?;
            tracing::debug!("Pushed message to party '{}'", party_id);
            Ok(())
        } else {
            Err(MessagePushError::ClientNotFound(party_id.to_string()))
        }
    }

    async fn broadcast(
        &self,
        targets: &[PartyId],
        content: &str,
    ) -> Result<(), MessagePushError> {
        let clients = self.clients.lock().await;

        for target in targets {
            match clients.get(target) {
                // A half-closed socket is skipped; the others still get the frame
                Some(sender) => {
                    if let Err(e) = sender.send(content.to_string()) {
                        tracing::warn!("Failed to push message to party '{}': {}", target, e);
                    }
                }
                None => {
                    tracing::debug!("Party '{}' not found during broadcast, skipping", target);
                }
            }
        }

        Ok(())
    }
}
