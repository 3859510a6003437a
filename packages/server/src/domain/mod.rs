//! Domain layer: the real-time coordination model, free of transports.

pub mod codec;
pub mod entity;
pub mod error;
pub mod federation;
pub mod fragment;
pub mod hue;
pub mod message_pusher;
pub mod peer_table;
pub mod registry;
pub mod repository;
pub mod threshold;
pub mod value_object;

pub use codec::{FragmentCodec, PresenceCodec, ThresholdCodec, VoiceCodec};
pub use entity::{
    Constellation, FederatedPeer, FederationState, Fragment, GardenStats, InstanceInfo, Party,
    PeerStatus, Point, PresenceSnapshot, ReportingSpace, Stroke, TextFragment, ThresholdMessage,
    ThresholdMessageKind,
};
pub use error::{FederationError, MessagePushError, RepositoryError, ValueObjectError};
pub use federation::{
    FederationCodec, PeerChannel, PeerDialer, PeerMessage, PresenceSink, WatcherRequest,
};
pub use fragment::{FragmentPolicy, FragmentPool};
pub use hue::assign_hue;
pub use message_pusher::{MessagePusher, PusherChannel};
pub use peer_table::{HelloOutcome, PeerTable};
pub use registry::ConnectionRegistry;
pub use repository::GardenStore;
pub use threshold::{ThresholdLimits, ThresholdLog, presence_phrase};
pub use value_object::{
    ConnectionId, DisplayName, FragmentId, Hue, PartyId, PeerId, Position, SpaceName, Timestamp,
};
