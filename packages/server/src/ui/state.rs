//! Shared application state.

use std::{path::PathBuf, sync::Arc};

use between_shared::time::Clock;

use crate::{
    domain::{FragmentPolicy, SpaceName, ThresholdLimits},
    infrastructure::{
        codec::{
            ChatCodec, EdgeCodec, PeerProtocolCodec, PresenceCountCodec, ResonanceCodec,
            WeaveCodec,
        },
        dialer::TungsteniteDialer,
        message_pusher::WebSocketMessagePusher,
        repository::JsonGardenStore,
    },
    usecase::{
        EphemeralSpaceUseCase, FederationConfig, FederationUseCase, PresenceUseCase,
        ResonancePolicy, ResonanceUseCase, ThresholdUseCase,
    },
};

/// One use case per endpoint
pub struct AppState {
    /// Generic per-space presence counter（汎用の在室カウンタ）
    pub presence: Arc<PresenceUseCase>,
    /// Drawing strokes that fade（消えていく線）
    pub edge: Arc<EphemeralSpaceUseCase<EdgeCodec>>,
    /// Positioned text fragments that fade（消えていく言葉）
    pub weave: Arc<EphemeralSpaceUseCase<WeaveCodec>>,
    pub resonance: Arc<ResonanceUseCase>,
    pub threshold: Arc<ThresholdUseCase>,
    pub federation: Arc<FederationUseCase>,
}

impl AppState {
    /// Wire every space with the default tunables.
    ///
    /// Each space gets its own set of connected clients. The presence
    /// endpoint, the edge and the threshold report their membership to the
    /// federation.
    pub fn new(instance_name: String, gardens_dir: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Self {
        let federation = Arc::new(FederationUseCase::new(
            instance_name,
            FederationConfig::default(),
            Arc::new(JsonGardenStore::new(gardens_dir)),
            Arc::new(TungsteniteDialer),
            Arc::new(PeerProtocolCodec),
            clock.clone(),
        ));

        let presence = PresenceUseCase::new(
            Arc::new(WebSocketMessagePusher::default()),
            Arc::new(PresenceCountCodec),
            clock.clone(),
        )
        .with_sink(federation.clone());
        let edge = EphemeralSpaceUseCase::new(
            SpaceName::from_static("edge"),
            EdgeCodec,
            FragmentPolicy::STROKES,
            Arc::new(WebSocketMessagePusher::default()),
            clock.clone(),
        )
        .with_sink(federation.clone());
        let weave = EphemeralSpaceUseCase::new(
            SpaceName::from_static("weave"),
            WeaveCodec,
            FragmentPolicy::TEXT,
            Arc::new(WebSocketMessagePusher::default()),
            clock.clone(),
        );
        let resonance = ResonanceUseCase::new(
            ResonancePolicy::default(),
            Arc::new(WebSocketMessagePusher::default()),
            Arc::new(ResonanceCodec),
            clock.clone(),
        );
        let threshold = ThresholdUseCase::new(
            ThresholdLimits::default(),
            Arc::new(WebSocketMessagePusher::default()),
            Arc::new(ChatCodec),
            clock,
        )
        .with_sink(federation.clone());

        Self {
            presence: Arc::new(presence),
            edge: Arc::new(edge),
            weave: Arc::new(weave),
            resonance: Arc::new(resonance),
            threshold: Arc::new(threshold),
            federation,
        }
    }
}
