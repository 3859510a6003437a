//! Domain entities.

use serde::{Deserialize, Serialize};

use super::value_object::{
    ConnectionId, DisplayName, FragmentId, Hue, PartyId, PeerId, Position, SpaceName, Timestamp,
};

// ========================================
// Connected parties
// ========================================

/// One live bidirectional channel admitted into a space.
///
/// Only the party's own channel mutates it; the registry owns it.
#[derive(Debug, Clone, PartialEq)]
pub struct Party {
    pub id: PartyId,
    pub space: SpaceName,
    pub hue: Hue,
    pub name: Option<DisplayName>,
    pub position: Position,
    /// Currently sounding (resonance only)
    pub active: bool,
    pub last_update: Timestamp,
}

// ========================================
// Fading fragments
// ========================================

/// A small piece of shared content that fades after a time-to-live.
///
/// Carries the creator's hue, never the creator's connection.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment<P> {
    pub id: FragmentId,
    pub payload: P,
    pub hue: Hue,
    pub created_at: Timestamp,
}

/// A point on the drawing canvas
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Payload of a drawing stroke
#[derive(Debug, Clone, PartialEq)]
pub struct Stroke {
    pub points: Vec<Point>,
}

impl Stroke {
    pub const MAX_POINTS: usize = 1000;

    /// Keeps the first [`Self::MAX_POINTS`] points. An empty stroke is rejected.
    pub fn new(mut points: Vec<Point>) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        points.truncate(Self::MAX_POINTS);
        Some(Self { points })
    }
}

/// Payload of a woven text fragment
#[derive(Debug, Clone, PartialEq)]
pub struct TextFragment {
    pub content: String,
    pub position: Position,
    pub author: PartyId,
}

impl TextFragment {
    pub const MAX_CHARS: usize = 100;

    /// Cuts the content to [`Self::MAX_CHARS`] characters, then trims it.
    /// Blank content is rejected.
    pub fn new(content: &str, position: Position, author: PartyId) -> Option<Self> {
        let cut = super::value_object::truncate_chars(content, Self::MAX_CHARS);
        let trimmed = cut.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self {
            content: trimmed.to_string(),
            position,
            author,
        })
    }
}

// ========================================
// Threshold
// ========================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThresholdMessageKind {
    Message,
    Arrival,
    Departure,
    Witness,
}

/// An entry in the threshold's volatile log
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdMessage {
    pub kind: ThresholdMessageKind,
    pub from: Option<String>,
    pub content: String,
    pub timestamp: Timestamp,
}

// ========================================
// Presence
// ========================================

/// Sub-spaces whose counts are shared with federation peers.
///
/// The sanctuary is deliberately absent: it never reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportingSpace {
    Garden,
    Clearing,
    Threshold,
    Edge,
}

impl ReportingSpace {
    pub fn from_space(space: &SpaceName) -> Option<Self> {
        match space.as_str() {
            "garden" => Some(Self::Garden),
            "clearing" => Some(Self::Clearing),
            "threshold" => Some(Self::Threshold),
            "edge" => Some(Self::Edge),
            _ => None,
        }
    }
}

/// Per-sub-space counts plus a total.
///
/// Locally the total is always the sum of the sub-spaces. For a peer it is
/// whatever the peer reported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PresenceSnapshot {
    pub total: u64,
    pub garden: u64,
    pub clearing: u64,
    pub threshold: u64,
    pub edge: u64,
}

impl PresenceSnapshot {
    /// One more party in `space`
    pub fn arrive(&mut self, space: ReportingSpace) {
        *self.slot(space) += 1;
        self.recompute_total();
    }

    /// One party fewer in `space`; never goes below zero
    pub fn depart(&mut self, space: ReportingSpace) {
        let slot = self.slot(space);
        *slot = slot.saturating_sub(1);
        self.recompute_total();
    }

    fn slot(&mut self, space: ReportingSpace) -> &mut u64 {
        match space {
            ReportingSpace::Garden => &mut self.garden,
            ReportingSpace::Clearing => &mut self.clearing,
            ReportingSpace::Threshold => &mut self.threshold,
            ReportingSpace::Edge => &mut self.edge,
        }
    }

    fn recompute_total(&mut self) {
        self.total = self.garden + self.clearing + self.threshold + self.edge;
    }
}

/// Aggregate statistics of a garden
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GardenStats {
    pub questions: u64,
    pub tendings: u64,
}

// ========================================
// Federation
// ========================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeerStatus {
    Connecting,
    Connected,
    Disconnected,
}

/// Another Between instance this one knows about
#[derive(Debug, Clone)]
pub struct FederatedPeer {
    pub id: PeerId,
    pub name: String,
    /// Set when this instance initiated the connection
    pub url: Option<String>,
    pub last_seen: Timestamp,
    pub status: PeerStatus,
    pub presence: PresenceSnapshot,
    pub garden: GardenStats,
    /// The socket currently serving this peer
    pub connection: ConnectionId,
    /// Outgoing frames for the socket. `None` once disconnected.
    pub link: Option<super::message_pusher::PusherChannel>,
    pub disconnected_at: Option<Timestamp>,
}

impl FederatedPeer {
    /// Whether this instance dialled the connection
    pub fn is_outbound(&self) -> bool {
        self.url.is_some()
    }
}

/// This instance's identity within the constellation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceInfo {
    pub id: PeerId,
    pub name: String,
}

/// Totals across this instance and every connected peer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Constellation {
    pub total_beings: u64,
    pub total_questions: u64,
    pub total_tendings: u64,
    pub connected_peers: u64,
}

/// Read-only snapshot of the federation, computed on demand
#[derive(Debug, Clone)]
pub struct FederationState {
    pub instance: InstanceInfo,
    pub local_presence: PresenceSnapshot,
    pub peers: Vec<FederatedPeer>,
    pub constellation: Constellation,
}
