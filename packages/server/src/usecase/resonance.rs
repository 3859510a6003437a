//! UseCase: the resonance, where each party is a voice at a position.
//!
//! Positions are the fragments of this space: they are replaced rather than
//! accumulated, and a voice left sounding without any update fades to
//! silence on the next sweep.

use std::{sync::Arc, time::Duration};

use between_shared::time::Clock;
use tokio::{sync::Mutex, task::JoinHandle};

use crate::domain::{
    ConnectionRegistry, MessagePusher, Party, PartyId, Position, PusherChannel, SpaceName,
    Timestamp, VoiceCodec,
};

use super::random_degrees;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResonancePolicy {
    /// A sounding voice with no update for this long is silenced
    pub idle_fade: Duration,
    pub sweep_interval: Duration,
}

impl Default for ResonancePolicy {
    fn default() -> Self {
        Self {
            idle_fade: Duration::from_secs(30),
            sweep_interval: Duration::from_secs(5),
        }
    }
}

pub struct ResonanceUseCase {
    space: SpaceName,
    registry: Mutex<ConnectionRegistry>,
    policy: ResonancePolicy,
    message_pusher: Arc<dyn MessagePusher>,
    codec: Arc<dyn VoiceCodec>,
    clock: Arc<dyn Clock>,
}

impl ResonanceUseCase {
    pub fn new(
        policy: ResonancePolicy,
        message_pusher: Arc<dyn MessagePusher>,
        codec: Arc<dyn VoiceCodec>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            space: SpaceName::from_static("resonance"),
            registry: Mutex::new(ConnectionRegistry::new()),
            policy,
            message_pusher,
            codec,
            clock,
        }
    }

    /// Admit a new voice at the centre, silent
    pub async fn join(&self, sender: PusherChannel) -> Party {
        let mut registry = self.registry.lock().await;
        let party = registry.admit(self.space.clone(), None, self.now(), random_degrees());
        self.message_pusher
            .register_client(party.id.clone(), sender)
            .await;
        if let Err(e) = self
            .message_pusher
            .push_to(&party.id, &self.codec.welcome(&party))
            .await
        {
            tracing::warn!("Failed to welcome party '{}': {}", party.id, e);
        }
        self.broadcast_positions(&registry).await;
        tracing::info!("Voice '{}' joined the resonance", party.id);
        party
    }

    /// Move a voice; coordinates are clamped to the unit square
    pub async fn move_to(&self, party_id: &PartyId, x: f64, y: f64) {
        self.update(party_id, |party| party.position = Position::clamped(x, y))
            .await;
    }

    pub async fn start(&self, party_id: &PartyId) {
        self.update(party_id, |party| party.active = true).await;
    }

    pub async fn stop(&self, party_id: &PartyId) {
        self.update(party_id, |party| party.active = false).await;
    }

    /// Silence voices idle for longer than the idle fade.
    ///
    /// Positions are rebroadcast once if anything changed. Returns how many
    /// voices were silenced.
    pub async fn sweep(&self) -> usize {
        let mut registry = self.registry.lock().await;
        let now = self.now();
        let idle_millis = i64::try_from(self.policy.idle_fade.as_millis()).unwrap_or(i64::MAX);

        let idle: Vec<PartyId> = registry
            .parties_in(&self.space)
            .filter(|p| p.active && p.last_update.elapsed_until(now) > idle_millis)
            .map(|p| p.id.clone())
            .collect();
        for id in &idle {
            if let Some(party) = registry.get_mut(id) {
                party.active = false;
            }
        }
        if !idle.is_empty() {
            self.broadcast_positions(&registry).await;
        }
        idle.len()
    }

    pub async fn leave(&self, party_id: &PartyId) {
        let mut registry = self.registry.lock().await;
        if registry.remove(party_id).is_none() {
            return;
        }
        self.message_pusher.unregister_client(party_id).await;
        self.broadcast_positions(&registry).await;
        tracing::info!("Voice '{}' left the resonance", party_id);
    }

    pub fn spawn_sweeper(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.policy.sweep_interval);
            interval.tick().await;
            loop {
                interval.tick().await;
                let silenced = self.sweep().await;
                if silenced > 0 {
                    tracing::debug!("Silenced {} idle voices", silenced);
                }
            }
        })
    }

    async fn update<F>(&self, party_id: &PartyId, update: F)
    where
        F: FnOnce(&mut Party),
    {
        let mut registry = self.registry.lock().await;
        let now = self.now();
        let Some(party) = registry.get_mut(party_id) else {
            return;
        };
        update(party);
        party.last_update = now;
        self.broadcast_positions(&registry).await;
    }

    async fn broadcast_positions(&self, registry: &ConnectionRegistry) {
        let parties: Vec<Party> = registry.parties_in(&self.space).cloned().collect();
        let members: Vec<PartyId> = parties.iter().map(|p| p.id.clone()).collect();
        if let Err(e) = self
            .message_pusher
            .broadcast(&members, &self.codec.positions(&parties))
            .await
        {
            tracing::warn!("Failed to broadcast positions: {}", e);
        }
    }

    fn now(&self) -> Timestamp {
        Timestamp::new(self.clock.now_millis())
    }
}
