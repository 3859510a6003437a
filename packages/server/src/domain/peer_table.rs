//! Table of federated peers.
//!
//! Entries are keyed by peer id: a temporary one until the peer announces
//! itself in `hello`, then the announced one. Each entry remembers the
//! connection that owns it, and every mutation is addressed by connection,
//! so events arriving on a superseded socket never touch the live entry.

use std::collections::HashMap;

use super::{
    entity::{
        Constellation, FederatedPeer, GardenStats, PeerStatus, PresenceSnapshot,
    },
    message_pusher::PusherChannel,
    value_object::{ConnectionId, PeerId, Timestamp},
};

const UNKNOWN_PEER_NAME: &str = "Unknown";

/// Result of processing a peer's `hello`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HelloOutcome {
    /// The connection now owns the entry keyed by the announced id.
    /// `replaced` is true when an older entry for that id was discarded.
    Accepted { replaced: bool },
    /// Another live connection to the same instance was kept instead; the
    /// connection's entry was removed and its link dropped.
    Rejected,
    /// The peer announced this instance's own id; the entry was removed.
    SelfConnection,
    /// No entry is owned by the connection any more
    UnknownConnection,
}

#[derive(Debug, Default)]
pub struct PeerTable {
    peers: HashMap<PeerId, FederatedPeer>,
}

impl PeerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a new connection under a temporary id, in `connecting` state
    pub fn insert_pending(
        &mut self,
        url: Option<String>,
        connection: ConnectionId,
        now: Timestamp,
    ) -> PeerId {
        let mut id = PeerId::generate();
        while self.peers.contains_key(&id) {
            id = PeerId::generate();
        }
        self.peers.insert(
            id.clone(),
            FederatedPeer {
                id: id.clone(),
                name: UNKNOWN_PEER_NAME.to_string(),
                url,
                last_seen: now,
                status: PeerStatus::Connecting,
                presence: PresenceSnapshot::default(),
                garden: GardenStats::default(),
                connection,
                link: None,
                disconnected_at: None,
            },
        );
        id
    }

    /// Our `hello` went out on `link`: the connection is now `connected`.
    ///
    /// Returns false if the connection no longer owns an entry, in which case
    /// `link` is dropped.
    pub fn mark_connected(
        &mut self,
        connection: ConnectionId,
        link: PusherChannel,
        now: Timestamp,
    ) -> bool {
        match self.by_connection_mut(connection) {
            Some(peer) if peer.status != PeerStatus::Disconnected => {
                peer.status = PeerStatus::Connected;
                peer.link = Some(link);
                peer.last_seen = now;
                true
            }
            _ => false,
        }
    }

    /// Whether an entry for `url` is `connecting` or `connected`
    pub fn has_active_url(&self, url: &str) -> bool {
        self.peers.values().any(|p| {
            p.url.as_deref() == Some(url) && p.status != PeerStatus::Disconnected
        })
    }

    /// Forget `disconnected` entries for `url` before a fresh attempt
    pub fn discard_disconnected_url(&mut self, url: &str) -> usize {
        let before = self.peers.len();
        self.peers.retain(|_, p| {
            !(p.url.as_deref() == Some(url) && p.status == PeerStatus::Disconnected)
        });
        before - self.peers.len()
    }

    /// Re-key the connection's entry under the id the peer announced.
    ///
    /// An existing entry with the announced id is replaced unless it is a
    /// live `connected` entry that wins the tie-break: of two live
    /// connections between the same pair of instances, the one initiated by
    /// the instance with the lower id is kept, and between connections with
    /// the same initiator the newer one is kept.
    pub fn record_hello(
        &mut self,
        connection: ConnectionId,
        announced: PeerId,
        name: String,
        local: &PeerId,
        now: Timestamp,
    ) -> HelloOutcome {
        let Some(current_key) = self.key_of(connection) else {
            return HelloOutcome::UnknownConnection;
        };

        if &announced == local {
            self.peers.remove(&current_key);
            return HelloOutcome::SelfConnection;
        }

        let Some(mut peer) = self.peers.remove(&current_key) else {
            return HelloOutcome::UnknownConnection;
        };

        let mut replaced = false;
        if current_key != announced {
            if let Some(existing) = self.peers.get(&announced) {
                if existing.status == PeerStatus::Connected {
                    let existing_initiator = initiator(existing, &announced, local);
                    let incoming_initiator = initiator(&peer, &announced, local);
                    if existing_initiator < incoming_initiator {
                        return HelloOutcome::Rejected;
                    }
                }
                self.peers.remove(&announced);
                replaced = true;
            }
        }

        peer.id = announced.clone();
        peer.name = name;
        peer.status = PeerStatus::Connected;
        peer.last_seen = now;
        peer.disconnected_at = None;
        self.peers.insert(announced, peer);
        HelloOutcome::Accepted { replaced }
    }

    /// Note that the connection is alive
    pub fn touch(&mut self, connection: ConnectionId, now: Timestamp) -> bool {
        match self.by_connection_mut(connection) {
            Some(peer) => {
                peer.last_seen = now;
                true
            }
            None => false,
        }
    }

    pub fn record_presence(
        &mut self,
        connection: ConnectionId,
        presence: PresenceSnapshot,
        now: Timestamp,
    ) -> bool {
        match self.by_connection_mut(connection) {
            Some(peer) => {
                peer.presence = presence;
                peer.last_seen = now;
                true
            }
            None => false,
        }
    }

    pub fn record_garden(
        &mut self,
        connection: ConnectionId,
        garden: GardenStats,
        now: Timestamp,
    ) -> bool {
        match self.by_connection_mut(connection) {
            Some(peer) => {
                peer.garden = garden;
                peer.last_seen = now;
                true
            }
            None => false,
        }
    }

    /// Mark the connection's entry `disconnected` and drop its link.
    ///
    /// Returns the entry's id, or `None` if the connection owns no entry or
    /// the entry was already disconnected.
    pub fn mark_disconnected(&mut self, connection: ConnectionId, now: Timestamp) -> Option<PeerId> {
        let peer = self.by_connection_mut(connection)?;
        if peer.status == PeerStatus::Disconnected {
            return None;
        }
        peer.status = PeerStatus::Disconnected;
        peer.link = None;
        peer.disconnected_at = Some(now);
        Some(peer.id.clone())
    }

    /// Remove `id` if it is still the same disconnected entry that went
    /// down at `since`
    pub fn prune_if_still_disconnected(&mut self, id: &PeerId, since: Timestamp) -> bool {
        let still_down = self.peers.get(id).is_some_and(|p| {
            p.status == PeerStatus::Disconnected && p.disconnected_at == Some(since)
        });
        if still_down {
            self.peers.remove(id);
        }
        still_down
    }

    /// Connections of `connected` peers not heard from for longer than `timeout_millis`
    pub fn stale_connections(&self, now: Timestamp, timeout_millis: i64) -> Vec<ConnectionId> {
        self.peers
            .values()
            .filter(|p| p.status == PeerStatus::Connected)
            .filter(|p| p.last_seen.elapsed_until(now) > timeout_millis)
            .map(|p| p.connection)
            .collect()
    }

    /// Outbound link of the connection, if it is open
    pub fn link_of(&self, connection: ConnectionId) -> Option<PusherChannel> {
        self.peers
            .values()
            .find(|p| p.connection == connection)
            .and_then(|p| p.link.clone())
    }

    /// Every open outbound link, with its peer's id
    pub fn open_links(&self) -> impl Iterator<Item = (&PeerId, &PusherChannel)> {
        self.peers
            .values()
            .filter_map(|p| p.link.as_ref().map(|link| (&p.id, link)))
    }

    /// Totals of this instance plus every `connected` peer
    pub fn constellation(&self, local: &PresenceSnapshot) -> Constellation {
        let mut constellation = Constellation {
            total_beings: local.total,
            ..Constellation::default()
        };
        for peer in self
            .peers
            .values()
            .filter(|p| p.status == PeerStatus::Connected)
        {
            // Peer-reported counts are untrusted
            constellation.total_beings =
                constellation.total_beings.saturating_add(peer.presence.total);
            constellation.total_questions =
                constellation.total_questions.saturating_add(peer.garden.questions);
            constellation.total_tendings =
                constellation.total_tendings.saturating_add(peer.garden.tendings);
            constellation.connected_peers += 1;
        }
        constellation
    }

    /// Copy of every known peer, ordered by id, without links
    pub fn peers(&self) -> Vec<FederatedPeer> {
        let mut peers: Vec<FederatedPeer> = self
            .peers
            .values()
            .map(|p| FederatedPeer {
                link: None,
                ..p.clone()
            })
            .collect();
        peers.sort_by(|a, b| a.id.cmp(&b.id));
        peers
    }

    #[cfg(test)]
    pub fn get(&self, id: &PeerId) -> Option<&FederatedPeer> {
        self.peers.get(id)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.peers.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    fn key_of(&self, connection: ConnectionId) -> Option<PeerId> {
        self.peers
            .values()
            .find(|p| p.connection == connection)
            .map(|p| p.id.clone())
    }

    fn by_connection_mut(&mut self, connection: ConnectionId) -> Option<&mut FederatedPeer> {
        self.peers.values_mut().find(|p| p.connection == connection)
    }
}

/// The instance that opened the entry's connection
fn initiator<'a>(peer: &FederatedPeer, remote: &'a PeerId, local: &'a PeerId) -> &'a PeerId {
    if peer.is_outbound() { local } else { remote }
}
