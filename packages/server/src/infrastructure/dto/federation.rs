//! Federation protocol DTOs: peer messages, watcher commands and the
//! state snapshot.

use serde::{Deserialize, Serialize};

pub const PROTOCOL_VERSION: &str = "1.0";

/// Subprotocol a local UI offers to connect as a watcher instead of a peer
pub const WATCHER_PROTOCOL: &str = "federation-watcher";

/// Messages exchanged between instances, in both directions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FederationMessage {
    Hello {
        id: String,
        name: String,
        #[serde(default)]
        version: String,
    },
    Presence {
        presence: PresenceDto,
    },
    Garden {
        garden: GardenDto,
    },
    Heartbeat,
    Goodbye,
}

/// Presence counts. Every field defaults to 0 when absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PresenceDto {
    pub total: u64,
    pub garden: u64,
    pub clearing: u64,
    pub threshold: u64,
    pub edge: u64,
    /// The sanctuary never reports; always 0 on the wire
    pub sanctuary: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GardenDto {
    pub questions: u64,
    pub tendings: u64,
}

/// Commands a watcher may send
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WatcherCommand {
    Connect { url: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceDto {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerDto {
    pub id: String,
    pub name: String,
    pub url: Option<String>,
    pub status: String,
    pub presence: PresenceDto,
    pub garden: GardenDto,
    /// ISO-8601, UTC
    pub last_seen: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstellationDto {
    pub total_beings: u64,
    pub total_questions: u64,
    pub total_tendings: u64,
    pub connected_peers: u64,
}

/// Full federation snapshot, sent to watchers and served over HTTP
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FederationStateDto {
    pub instance: InstanceDto,
    pub local_presence: PresenceDto,
    pub peers: Vec<PeerDto>,
    pub constellation: ConstellationDto,
}
