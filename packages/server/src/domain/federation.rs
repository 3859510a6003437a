//! Seams between the federation core and its transports.

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{
    entity::{FederationState, GardenStats, PresenceSnapshot},
    error::FederationError,
    value_object::{PeerId, SpaceName},
};

/// A bidirectional text frame pipe to one remote instance.
///
/// Dropping `outbound` closes the underlying socket; `inbound` ends when
/// the socket closes.
#[derive(Debug)]
pub struct PeerChannel {
    pub outbound: mpsc::UnboundedSender<String>,
    pub inbound: mpsc::UnboundedReceiver<String>,
}

impl PeerChannel {
    /// Two connected channel ends, for wiring instances together in memory
    pub fn pair() -> (PeerChannel, PeerChannel) {
        let (a_tx, a_rx) = mpsc::unbounded_channel();
        let (b_tx, b_rx) = mpsc::unbounded_channel();
        (
            PeerChannel {
                outbound: a_tx,
                inbound: b_rx,
            },
            PeerChannel {
                outbound: b_tx,
                inbound: a_rx,
            },
        )
    }
}

/// Opens outbound connections to peer instances
#[async_trait]
pub trait PeerDialer: Send + Sync {
    /// Connect to an already-normalised federation WebSocket URL
    async fn dial(&self, url: &str) -> Result<PeerChannel, FederationError>;
}

/// Receives local membership changes of the reporting sub-spaces
#[async_trait]
pub trait PresenceSink: Send + Sync {
    async fn party_arrived(&self, space: &SpaceName);

    async fn party_departed(&self, space: &SpaceName);
}

/// A decoded message of the peer protocol
#[derive(Debug, Clone, PartialEq)]
pub enum PeerMessage {
    Hello { id: PeerId, name: String },
    Presence(PresenceSnapshot),
    Garden(GardenStats),
    Heartbeat,
    Goodbye,
}

/// A decoded command from a local watcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatcherRequest {
    Connect { url: String },
}

/// Wire encoding of the federation endpoint
pub trait FederationCodec: Send + Sync {
    fn encode(&self, message: &PeerMessage) -> String;

    /// `None` for anything that is not a well-formed peer message
    fn decode(&self, frame: &str) -> Option<PeerMessage>;

    fn decode_watcher(&self, frame: &str) -> Option<WatcherRequest>;

    fn state(&self, state: &FederationState) -> String;
}
