//! UseCase: federation with other Between instances.
//!
//! Every peer connection, inbound or outbound, runs the same loop: announce
//! ourselves with `hello` and our current presence, then apply whatever the
//! peer sends until the channel closes. Local watchers receive the full
//! federation snapshot after every change.

use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use between_shared::time::Clock;
use tokio::{sync::Mutex, task::JoinHandle};

use crate::domain::{
    ConnectionId, FederationCodec, FederationError, FederationState, GardenStore, HelloOutcome,
    InstanceInfo, PeerChannel, PeerDialer, PeerId, PeerMessage, PeerTable, PresenceSink,
    PresenceSnapshot, PusherChannel, ReportingSpace, SpaceName, Timestamp, WatcherRequest,
};

const FEDERATION_PATH: &str = "/federation";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FederationConfig {
    /// How often a heartbeat goes out to every connected peer
    pub heartbeat_interval: Duration,
    /// How long a disconnected peer stays listed before it is removed
    pub disconnect_grace: Duration,
    /// A connected peer silent for longer than this is marked disconnected
    pub liveness_timeout: Duration,
}

impl Default for FederationConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_secs(30),
            disconnect_grace: Duration::from_secs(30),
            liveness_timeout: Duration::from_secs(90),
        }
    }
}

/// Turn a peer's base URL into its federation WebSocket URL.
///
/// `http(s)` becomes `ws(s)`, one trailing `/` is removed and
/// `/federation` is appended unless already present.
pub fn normalize_peer_url(url: &str) -> Result<String, FederationError> {
    let trimmed = url.trim();
    let ws_url = match trimmed.strip_prefix("http") {
        Some(rest) => format!("ws{}", rest),
        None => trimmed.to_string(),
    };

    let host = ws_url
        .strip_prefix("ws://")
        .or_else(|| ws_url.strip_prefix("wss://"));
    if host.is_none_or(|h| h.is_empty() || h.starts_with('/')) {
        return Err(FederationError::InvalidPeerUrl(url.to_string()));
    }

    let base = ws_url.strip_suffix('/').unwrap_or(&ws_url);
    if base.ends_with(FEDERATION_PATH) {
        Ok(base.to_string())
    } else {
        Ok(format!("{}{}", base, FEDERATION_PATH))
    }
}

pub struct FederationUseCase {
    instance: InstanceInfo,
    config: FederationConfig,
    local_presence: Mutex<PresenceSnapshot>,
    peers: Mutex<PeerTable>,
    watchers: Mutex<HashMap<ConnectionId, PusherChannel>>,
    garden_store: Arc<dyn GardenStore>,
    dialer: Arc<dyn PeerDialer>,
    codec: Arc<dyn FederationCodec>,
    clock: Arc<dyn Clock>,
}

impl FederationUseCase {
    /// Create the federation of a fresh instance with a random identity
    pub fn new(
        name: String,
        config: FederationConfig,
        garden_store: Arc<dyn GardenStore>,
        dialer: Arc<dyn PeerDialer>,
        codec: Arc<dyn FederationCodec>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            instance: InstanceInfo {
                id: PeerId::generate(),
                name,
            },
            config,
            local_presence: Mutex::new(PresenceSnapshot::default()),
            peers: Mutex::new(PeerTable::new()),
            watchers: Mutex::new(HashMap::new()),
            garden_store,
            dialer,
            codec,
            clock,
        }
    }

    pub fn instance(&self) -> &InstanceInfo {
        &self.instance
    }

    /// Serve a connection another instance opened to us, until it closes
    pub async fn serve_inbound(self: Arc<Self>, channel: PeerChannel) {
        let connection = ConnectionId::generate();
        let temporary = self
            .peers
            .lock()
            .await
            .insert_pending(None, connection, self.now());
        tracing::info!("Inbound peer connection accepted as '{}'", temporary);
        self.run_connection(connection, channel, true).await;
    }

    /// Start an outbound connection to the instance at `url`.
    ///
    /// Returns once the attempt is registered; dialling happens in the
    /// background and a failure only marks the peer disconnected.
    pub async fn connect_to_peer(self: &Arc<Self>, url: &str) -> Result<(), FederationError> {
        let ws_url = normalize_peer_url(url)?;
        let connection = ConnectionId::generate();
        {
            let mut peers = self.peers.lock().await;
            if peers.has_active_url(&ws_url) {
                return Err(FederationError::AlreadyConnected(ws_url));
            }
            peers.discard_disconnected_url(&ws_url);
            peers.insert_pending(Some(ws_url.clone()), connection, self.now());
        }
        tracing::info!("Connecting to peer at {}", ws_url);
        self.broadcast_state().await;

        let this = Arc::clone(self);
        tokio::spawn(async move {
            match this.dialer.dial(&ws_url).await {
                Ok(channel) => this.run_connection(connection, channel, false).await,
                Err(e) => {
                    tracing::warn!("Federation connection error: {}", e);
                    this.connection_closed(connection).await;
                }
            }
        });
        Ok(())
    }

    /// Apply one frame received on `connection`. Malformed frames are ignored.
    pub async fn handle_peer_frame(self: &Arc<Self>, connection: ConnectionId, frame: &str) {
        let Some(message) = self.codec.decode(frame) else {
            return;
        };
        let now = self.now();

        let applied = match message {
            PeerMessage::Hello { id, name } => {
                let outcome = self.peers.lock().await.record_hello(
                    connection,
                    id.clone(),
                    name.clone(),
                    &self.instance.id,
                    now,
                );
                match outcome {
                    HelloOutcome::Accepted { replaced } => {
                        tracing::info!("Peer '{}' ({}) connected", name, id);
                        if replaced {
                            tracing::debug!("Replaced an older entry for peer '{}'", id);
                        }
                        self.send_garden(connection).await;
                        true
                    }
                    HelloOutcome::Rejected => {
                        tracing::info!("Dropping duplicate connection to peer '{}'", id);
                        true
                    }
                    HelloOutcome::SelfConnection => {
                        tracing::warn!("Refusing a federation connection to this instance itself");
                        true
                    }
                    HelloOutcome::UnknownConnection => false,
                }
            }
            PeerMessage::Presence(presence) => self
                .peers
                .lock()
                .await
                .record_presence(connection, presence, now),
            PeerMessage::Garden(garden) => self
                .peers
                .lock()
                .await
                .record_garden(connection, garden, now),
            PeerMessage::Heartbeat => self.peers.lock().await.touch(connection, now),
            PeerMessage::Goodbye => {
                tracing::debug!("Peer said goodbye");
                self.connection_closed(connection).await;
                false
            }
        };

        if applied {
            self.broadcast_state().await;
        }
    }

    /// The channel of `connection` is gone: mark its peer disconnected and
    /// remove it after the grace period unless it comes back.
    pub async fn connection_closed(self: &Arc<Self>, connection: ConnectionId) {
        let now = self.now();
        let Some(id) = self.peers.lock().await.mark_disconnected(connection, now) else {
            return;
        };
        tracing::info!("Peer '{}' disconnected", id);
        self.schedule_prune(id, now);
        self.broadcast_state().await;
    }

    /// Send a heartbeat to every connected peer and disconnect peers that
    /// have been silent past the liveness timeout
    pub async fn heartbeat_tick(self: &Arc<Self>) {
        let frame = self.codec.encode(&PeerMessage::Heartbeat);
        let stale = {
            let peers = self.peers.lock().await;
            for (id, link) in peers.open_links() {
                if link.send(frame.clone()).is_err() {
                    tracing::debug!("Heartbeat to peer '{}' not delivered", id);
                }
            }
            peers.stale_connections(self.now(), as_millis(self.config.liveness_timeout))
        };
        for connection in stale {
            tracing::warn!("Peer silent past the liveness timeout; disconnecting");
            self.connection_closed(connection).await;
        }
    }

    /// Run [`Self::heartbeat_tick`] on the heartbeat interval until aborted
    pub fn spawn_heartbeat(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.config.heartbeat_interval);
            // The first tick completes immediately
            interval.tick().await;
            loop {
                interval.tick().await;
                self.heartbeat_tick().await;
            }
        })
    }

    /// Tell every connected peer we are leaving
    pub async fn farewell(&self) {
        let frame = self.codec.encode(&PeerMessage::Goodbye);
        let peers = self.peers.lock().await;
        for (id, link) in peers.open_links() {
            if link.send(frame.clone()).is_err() {
                tracing::debug!("Goodbye to peer '{}' not delivered", id);
            }
        }
    }

    /// Snapshot of this instance, its peers and the constellation totals
    pub async fn state(&self) -> FederationState {
        let local_presence = *self.local_presence.lock().await;
        let peers = self.peers.lock().await;
        FederationState {
            instance: self.instance.clone(),
            local_presence,
            peers: peers.peers(),
            constellation: peers.constellation(&local_presence),
        }
    }

    pub async fn state_frame(&self) -> String {
        self.codec.state(&self.state().await)
    }

    pub async fn local_presence(&self) -> PresenceSnapshot {
        *self.local_presence.lock().await
    }

    /// Register a local watcher and send it the current snapshot
    pub async fn add_watcher(&self, sender: PusherChannel) -> ConnectionId {
        let id = ConnectionId::generate();
        if sender.send(self.state_frame().await).is_err() {
            tracing::debug!("Watcher closed before the first snapshot");
        }
        self.watchers.lock().await.insert(id, sender);
        tracing::info!("Federation watcher connected");
        id
    }

    pub async fn remove_watcher(&self, id: &ConnectionId) {
        if self.watchers.lock().await.remove(id).is_some() {
            tracing::info!("Federation watcher disconnected");
        }
    }

    /// Apply a command sent by a local watcher
    pub async fn handle_watcher_frame(self: &Arc<Self>, frame: &str) {
        match self.codec.decode_watcher(frame) {
            Some(WatcherRequest::Connect { url }) => {
                if let Err(e) = self.connect_to_peer(&url).await {
                    tracing::info!("Not connecting to '{}': {}", url, e);
                }
            }
            None => tracing::debug!("Ignoring malformed watcher command"),
        }
    }

    async fn run_connection(
        self: Arc<Self>,
        connection: ConnectionId,
        channel: PeerChannel,
        inbound_side: bool,
    ) {
        let PeerChannel {
            outbound,
            mut inbound,
        } = channel;

        let hello = self.codec.encode(&PeerMessage::Hello {
            id: self.instance.id.clone(),
            name: self.instance.name.clone(),
        });
        if outbound.send(hello).is_err() {
            self.connection_closed(connection).await;
            return;
        }
        let presence = *self.local_presence.lock().await;
        if outbound
            .send(self.codec.encode(&PeerMessage::Presence(presence)))
            .is_err()
        {
            tracing::debug!("Initial presence not delivered");
        }

        let connected = self
            .peers
            .lock()
            .await
            .mark_connected(connection, outbound, self.now());
        if !connected {
            tracing::debug!("Peer connection superseded before the handshake finished");
            return;
        }
        if inbound_side {
            self.send_garden(connection).await;
        }
        self.broadcast_state().await;

        while let Some(frame) = inbound.recv().await {
            tracing::debug!("Federation frame: {}", frame);
            self.handle_peer_frame(connection, &frame).await;
        }
        self.connection_closed(connection).await;
    }

    /// Send our garden statistics on `connection`. A missing garden sends nothing.
    async fn send_garden(&self, connection: ConnectionId) {
        let stats = match self.garden_store.load_stats().await {
            Ok(stats) => stats,
            Err(e) => {
                tracing::debug!("No garden statistics to share: {}", e);
                return;
            }
        };
        let Some(link) = self.peers.lock().await.link_of(connection) else {
            return;
        };
        if link
            .send(self.codec.encode(&PeerMessage::Garden(stats)))
            .is_err()
        {
            tracing::debug!("Garden statistics not delivered");
        }
    }

    fn schedule_prune(self: &Arc<Self>, id: PeerId, since: Timestamp) {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(this.config.disconnect_grace).await;
            let pruned = this
                .peers
                .lock()
                .await
                .prune_if_still_disconnected(&id, since);
            if pruned {
                tracing::debug!("Removed peer '{}' after the grace period", id);
                this.broadcast_state().await;
            }
        });
    }

    /// Apply a local membership change and share the new presence.
    ///
    /// The presence lock is held while pushing so peers see changes in order.
    async fn adjust_presence(&self, space: &SpaceName, arrived: bool) {
        let Some(reporting) = ReportingSpace::from_space(space) else {
            return;
        };
        {
            let mut presence = self.local_presence.lock().await;
            if arrived {
                presence.arrive(reporting);
            } else {
                presence.depart(reporting);
            }
            let frame = self.codec.encode(&PeerMessage::Presence(*presence));
            let peers = self.peers.lock().await;
            for (id, link) in peers.open_links() {
                if link.send(frame.clone()).is_err() {
                    tracing::debug!("Presence to peer '{}' not delivered", id);
                }
            }
        }
        self.broadcast_state().await;
    }

    async fn broadcast_state(&self) {
        let frame = self.state_frame().await;
        let mut watchers = self.watchers.lock().await;
        watchers.retain(|_, watcher| watcher.send(frame.clone()).is_ok());
    }

    fn now(&self) -> Timestamp {
        Timestamp::new(self.clock.now_millis())
    }
}

#[async_trait]
impl PresenceSink for FederationUseCase {
    async fn party_arrived(&self, space: &SpaceName) {
        self.adjust_presence(space, true).await;
    }

    async fn party_departed(&self, space: &SpaceName) {
        self.adjust_presence(space, false).await;
    }
}

fn as_millis(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}
