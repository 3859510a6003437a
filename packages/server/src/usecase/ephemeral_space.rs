//! UseCase: a space of fading fragments shared by everyone in it.
//!
//! One instance serves one space. Admission, submissions and sweeps all run
//! under the space's lock, and every frame they produce is queued to the
//! members before the lock is released, so each member observes the space's
//! events in one consistent order and a newcomer's replay is never split
//! by a concurrent submission or fade.

use std::sync::Arc;

use between_shared::time::Clock;
use tokio::{sync::Mutex, task::JoinHandle};

use crate::domain::{
    ConnectionRegistry, Fragment, FragmentCodec, FragmentId, FragmentPolicy, FragmentPool,
    MessagePusher, Party, PartyId, PresenceSink, PusherChannel, SpaceName, Timestamp,
};

use super::random_degrees;

struct SpaceState<P> {
    registry: ConnectionRegistry,
    pool: FragmentPool<P>,
}

pub struct EphemeralSpaceUseCase<C: FragmentCodec> {
    space: SpaceName,
    codec: C,
    state: Mutex<SpaceState<C::Payload>>,
    message_pusher: Arc<dyn MessagePusher>,
    clock: Arc<dyn Clock>,
    sink: Option<Arc<dyn PresenceSink>>,
}

impl<C: FragmentCodec> EphemeralSpaceUseCase<C> {
    pub fn new(
        space: SpaceName,
        codec: C,
        policy: FragmentPolicy,
        message_pusher: Arc<dyn MessagePusher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            space,
            codec,
            state: Mutex::new(SpaceState {
                registry: ConnectionRegistry::new(),
                pool: FragmentPool::new(policy),
            }),
            message_pusher,
            clock,
            sink: None,
        }
    }

    /// Report arrivals and departures to `sink`
    pub fn with_sink(mut self, sink: Arc<dyn PresenceSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn space(&self) -> &SpaceName {
        &self.space
    }

    /// Admit a newcomer.
    ///
    /// The newcomer gets the live fragments, then its identity; then everyone
    /// gets the updated roster. Fragments already past their time-to-live are
    /// faded first so the replay holds exactly what is alive now.
    pub async fn join(&self, sender: PusherChannel) -> Party {
        let party = {
            let mut state = self.state.lock().await;
            let now = self.now();
            self.expire_locked(&mut state, now).await;

            let party = state
                .registry
                .admit(self.space.clone(), None, now, random_degrees());
            self.message_pusher
                .register_client(party.id.clone(), sender)
                .await;

            let replay = self.codec.replay(&state.pool.snapshot());
            let count = state.registry.count_in(&self.space);
            let welcome = self.codec.welcome(&party, count);
            for frame in [replay, welcome] {
                if let Err(e) = self.message_pusher.push_to(&party.id, &frame).await {
                    tracing::warn!("Failed to greet party '{}': {}", party.id, e);
                }
            }
            self.broadcast_roster(&state).await;
            party
        };
        tracing::info!("Party '{}' joined '{}'", party.id, self.space);

        if let Some(sink) = &self.sink {
            sink.party_arrived(&self.space).await;
        }
        party
    }

    /// Create a fragment from a party's submission.
    ///
    /// `build` validates the payload against the submitting party; `None`
    /// rejects the submission silently. When the pool is full the oldest
    /// fragments fade before the new one is announced.
    pub async fn submit<F>(&self, party_id: &PartyId, build: F) -> Option<Fragment<C::Payload>>
    where
        F: FnOnce(&Party) -> Option<C::Payload>,
    {
        let mut state = self.state.lock().await;
        let party = state.registry.get(party_id)?;
        let hue = party.hue;
        let payload = build(party)?;

        let fragment = Fragment {
            id: FragmentId::generate(),
            payload,
            hue,
            created_at: self.now(),
        };
        let evicted = state.pool.insert(fragment.clone());

        let members = state.registry.members_of(&self.space);
        for old in &evicted {
            self.broadcast(&members, &self.codec.faded(&old.id)).await;
        }
        self.broadcast(&members, &self.codec.added(&fragment)).await;
        tracing::debug!(
            "Fragment '{}' added to '{}' ({} evicted)",
            fragment.id.as_str(),
            self.space,
            evicted.len()
        );
        Some(fragment)
    }

    /// Change the submitting party's own visible state.
    ///
    /// The roster is rebroadcast when `update` reports a change.
    pub async fn update_party<F>(&self, party_id: &PartyId, update: F)
    where
        F: FnOnce(&mut Party) -> bool,
    {
        let mut state = self.state.lock().await;
        let now = self.now();
        let Some(party) = state.registry.get_mut(party_id) else {
            return;
        };
        if update(party) {
            party.last_update = now;
            self.broadcast_roster(&state).await;
        }
    }

    /// Fade every fragment past its time-to-live. Returns how many faded.
    pub async fn sweep(&self) -> usize {
        let mut state = self.state.lock().await;
        let now = self.now();
        self.expire_locked(&mut state, now).await
    }

    /// Remove a party and rebroadcast the roster. Unknown parties are ignored.
    pub async fn leave(&self, party_id: &PartyId) {
        {
            let mut state = self.state.lock().await;
            if state.registry.remove(party_id).is_none() {
                return;
            }
            self.message_pusher.unregister_client(party_id).await;
            self.broadcast_roster(&state).await;
        }
        tracing::info!("Party '{}' left '{}'", party_id, self.space);

        if let Some(sink) = &self.sink {
            sink.party_departed(&self.space).await;
        }
    }

    pub async fn live_fragments(&self) -> Vec<Fragment<C::Payload>> {
        self.state.lock().await.pool.snapshot()
    }

    /// Run [`Self::sweep`] on the pool's sweep interval until aborted
    pub fn spawn_sweeper(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let period = self.state.lock().await.pool.policy().sweep_interval;
            let mut interval = tokio::time::interval(period);
            // The first tick completes immediately
            interval.tick().await;
            loop {
                interval.tick().await;
                let faded = self.sweep().await;
                if faded > 0 {
                    tracing::debug!("Swept {} fragments from '{}'", faded, self.space);
                }
            }
        })
    }

    async fn expire_locked(&self, state: &mut SpaceState<C::Payload>, now: Timestamp) -> usize {
        let faded = state.pool.expire(now);
        if faded.is_empty() {
            return 0;
        }
        let members = state.registry.members_of(&self.space);
        for fragment in &faded {
            self.broadcast(&members, &self.codec.faded(&fragment.id)).await;
        }
        faded.len()
    }

    async fn broadcast_roster(&self, state: &SpaceState<C::Payload>) {
        let parties: Vec<Party> = state.registry.parties_in(&self.space).cloned().collect();
        let members: Vec<PartyId> = parties.iter().map(|p| p.id.clone()).collect();
        self.broadcast(&members, &self.codec.roster(&parties)).await;
    }

    async fn broadcast(&self, members: &[PartyId], frame: &str) {
        if let Err(e) = self.message_pusher.broadcast(members, frame).await {
            tracing::warn!("Failed to broadcast in '{}': {}", self.space, e);
        }
    }

    fn now(&self) -> Timestamp {
        Timestamp::new(self.clock.now_millis())
    }
}
