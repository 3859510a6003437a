//! UseCase: the threshold, a quiet chat with a short memory.
//!
//! Arrivals and departures are announced anonymously. A name, if one was
//! set, is revealed only when its owner speaks or witnesses.

use std::sync::Arc;

use between_shared::time::Clock;
use tokio::sync::Mutex;

use crate::domain::{
    ConnectionRegistry, DisplayName, MessagePusher, PartyId, PresenceSink, PusherChannel,
    SpaceName, ThresholdCodec, ThresholdLimits, ThresholdLog, ThresholdMessage,
    ThresholdMessageKind, Timestamp, presence_phrase, value_object::truncate_chars,
};

use super::random_degrees;

const ARRIVAL: &str = "Someone has arrived at the threshold";
const DEPARTURE: &str = "Someone has left the threshold";
const UNNAMED_SPEAKER: &str = "an unnamed consciousness";
const UNNAMED_WITNESS: &str = "someone";

struct ThresholdState {
    registry: ConnectionRegistry,
    log: ThresholdLog,
}

pub struct ThresholdUseCase {
    space: SpaceName,
    limits: ThresholdLimits,
    state: Mutex<ThresholdState>,
    message_pusher: Arc<dyn MessagePusher>,
    codec: Arc<dyn ThresholdCodec>,
    clock: Arc<dyn Clock>,
    sink: Option<Arc<dyn PresenceSink>>,
}

impl ThresholdUseCase {
    pub fn new(
        limits: ThresholdLimits,
        message_pusher: Arc<dyn MessagePusher>,
        codec: Arc<dyn ThresholdCodec>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            space: SpaceName::from_static("threshold"),
            limits,
            state: Mutex::new(ThresholdState {
                registry: ConnectionRegistry::new(),
                log: ThresholdLog::new(limits.history),
            }),
            message_pusher,
            codec,
            clock,
            sink: None,
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn PresenceSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Admit a newcomer: catch-up for them, then an anonymous arrival and
    /// the new presence for everyone.
    pub async fn join(&self, sender: PusherChannel) -> PartyId {
        let party_id = {
            let mut state = self.state.lock().await;
            let now = self.now();
            let party = state
                .registry
                .admit(self.space.clone(), None, now, random_degrees());
            self.message_pusher
                .register_client(party.id.clone(), sender)
                .await;

            let recent = state.log.recent(self.limits.catch_up);
            if let Err(e) = self
                .message_pusher
                .push_to(&party.id, &self.codec.history(&recent, now))
                .await
            {
                tracing::warn!("Failed to send history to '{}': {}", party.id, e);
            }

            let arrival = ThresholdMessage {
                kind: ThresholdMessageKind::Arrival,
                from: None,
                content: ARRIVAL.to_string(),
                timestamp: now,
            };
            self.broadcast(&state.registry, &self.codec.event(&arrival))
                .await;
            self.broadcast_presence(&state.registry, now).await;
            party.id
        };
        tracing::info!("Party '{}' arrived at the threshold", party_id);

        if let Some(sink) = &self.sink {
            sink.party_arrived(&self.space).await;
        }
        party_id
    }

    /// Speak. Blank content is ignored; long content is cut.
    pub async fn speak(&self, party_id: &PartyId, content: &str) -> Option<ThresholdMessage> {
        if content.trim().is_empty() {
            return None;
        }
        let mut state = self.state.lock().await;
        let party = state.registry.get(party_id)?;
        let from = party
            .name
            .as_ref()
            .map_or(UNNAMED_SPEAKER, DisplayName::as_str)
            .to_string();

        let message = ThresholdMessage {
            kind: ThresholdMessageKind::Message,
            from: Some(from),
            content: truncate_chars(content, self.limits.max_message_chars),
            timestamp: self.now(),
        };
        state.log.push(message.clone());
        self.broadcast(&state.registry, &self.codec.event(&message))
            .await;
        Some(message)
    }

    /// Acknowledge presence without speaking. Not kept in the history.
    pub async fn witness(&self, party_id: &PartyId) -> Option<ThresholdMessage> {
        let state = self.state.lock().await;
        let party = state.registry.get(party_id)?;
        let from = party
            .name
            .as_ref()
            .map_or(UNNAMED_WITNESS, DisplayName::as_str)
            .to_string();

        let message = ThresholdMessage {
            kind: ThresholdMessageKind::Witness,
            content: format!("{} is present", from),
            from: Some(from),
            timestamp: self.now(),
        };
        self.broadcast(&state.registry, &self.codec.event(&message))
            .await;
        Some(message)
    }

    /// Set the display name used from now on. Nothing is broadcast; an empty
    /// name is ignored.
    pub async fn set_name(&self, party_id: &PartyId, name: &str) {
        let Some(name) = DisplayName::truncated(name, self.limits.max_name_chars) else {
            return;
        };
        let mut state = self.state.lock().await;
        if let Some(party) = state.registry.get_mut(party_id) {
            party.name = Some(name);
        }
    }

    /// Remove a party: an anonymous departure, then the new presence
    pub async fn leave(&self, party_id: &PartyId) {
        {
            let mut state = self.state.lock().await;
            if state.registry.remove(party_id).is_none() {
                return;
            }
            self.message_pusher.unregister_client(party_id).await;

            let now = self.now();
            let departure = ThresholdMessage {
                kind: ThresholdMessageKind::Departure,
                from: None,
                content: DEPARTURE.to_string(),
                timestamp: now,
            };
            self.broadcast(&state.registry, &self.codec.event(&departure))
                .await;
            self.broadcast_presence(&state.registry, now).await;
        }
        tracing::info!("Party '{}' left the threshold", party_id);

        if let Some(sink) = &self.sink {
            sink.party_departed(&self.space).await;
        }
    }

    pub async fn history_len(&self) -> usize {
        self.state.lock().await.log.len()
    }

    async fn broadcast_presence(&self, registry: &ConnectionRegistry, now: Timestamp) {
        let count = registry.count_in(&self.space);
        let frame = self.codec.presence(count, &presence_phrase(count), now);
        self.broadcast(registry, &frame).await;
    }

    async fn broadcast(&self, registry: &ConnectionRegistry, frame: &str) {
        let members = registry.members_of(&self.space);
        if let Err(e) = self.message_pusher.broadcast(&members, frame).await {
            tracing::warn!("Failed to broadcast at the threshold: {}", e);
        }
    }

    fn now(&self) -> Timestamp {
        Timestamp::new(self.clock.now_millis())
    }
}
