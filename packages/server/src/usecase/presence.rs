//! UseCase: generic per-space presence counter.

use std::sync::Arc;

use between_shared::time::Clock;
use tokio::sync::Mutex;

use crate::domain::{
    ConnectionRegistry, MessagePusher, PartyId, PresenceCodec, PresenceSink, PusherChannel,
    SpaceName, Timestamp,
};

use super::random_degrees;

/// Counts the parties of every space on the presence endpoint and tells
/// each of them how many are in their space.
pub struct PresenceUseCase {
    registry: Mutex<ConnectionRegistry>,
    message_pusher: Arc<dyn MessagePusher>,
    codec: Arc<dyn PresenceCodec>,
    clock: Arc<dyn Clock>,
    sink: Option<Arc<dyn PresenceSink>>,
}

impl PresenceUseCase {
    pub fn new(
        message_pusher: Arc<dyn MessagePusher>,
        codec: Arc<dyn PresenceCodec>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            registry: Mutex::new(ConnectionRegistry::new()),
            message_pusher,
            codec,
            clock,
            sink: None,
        }
    }

    /// Report membership changes of the reporting sub-spaces to `sink`
    pub fn with_sink(mut self, sink: Arc<dyn PresenceSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Admit a party into `space` and broadcast the new count
    pub async fn admit(&self, space: SpaceName, sender: PusherChannel) -> PartyId {
        let party_id = {
            let mut registry = self.registry.lock().await;
            let now = Timestamp::new(self.clock.now_millis());
            let party = registry.admit(space.clone(), None, now, random_degrees());
            self.message_pusher
                .register_client(party.id.clone(), sender)
                .await;
            self.broadcast_presence(&registry, &space).await;
            party.id
        };
        tracing::info!("Party '{}' present in '{}'", party_id, space);

        if let Some(sink) = &self.sink {
            sink.party_arrived(&space).await;
        }
        party_id
    }

    /// Remove a party and broadcast the new count of its space.
    /// Removing an unknown party is a no-op.
    pub async fn remove(&self, party_id: &PartyId) {
        let removed = {
            let mut registry = self.registry.lock().await;
            let Some(party) = registry.remove(party_id) else {
                return;
            };
            self.message_pusher.unregister_client(party_id).await;
            self.broadcast_presence(&registry, &party.space).await;
            party
        };
        tracing::info!("Party '{}' left '{}'", party_id, removed.space);

        if let Some(sink) = &self.sink {
            sink.party_departed(&removed.space).await;
        }
    }

    pub async fn count_in_space(&self, space: &SpaceName) -> usize {
        self.registry.lock().await.count_in(space)
    }

    async fn broadcast_presence(&self, registry: &ConnectionRegistry, space: &SpaceName) {
        let frame = self.codec.presence(space, registry.count_in(space));
        let targets = registry.members_of(space);
        if let Err(e) = self.message_pusher.broadcast(&targets, &frame).await {
            tracing::warn!("Failed to broadcast presence of '{}': {}", space, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::{
        codec::PresenceCountCodec, message_pusher::WebSocketMessagePusher,
    };
    use async_trait::async_trait;
    use between_shared::time::ManualClock;
    use tokio::sync::mpsc;

    /// Records every membership change it is told about
    #[derive(Default)]
    struct RecordingSink {
        events: Mutex<Vec<(String, i32)>>,
    }

    #[async_trait]
    impl PresenceSink for RecordingSink {
        async fn party_arrived(&self, space: &SpaceName) {
            self.events.lock().await.push((space.to_string(), 1));
        }

        async fn party_departed(&self, space: &SpaceName) {
            self.events.lock().await.push((space.to_string(), -1));
        }
    }

    fn create_usecase() -> PresenceUseCase {
        PresenceUseCase::new(
            Arc::new(WebSocketMessagePusher::default()),
            Arc::new(PresenceCountCodec),
            Arc::new(ManualClock::new(0)),
        )
    }

    fn clearing() -> SpaceName {
        SpaceName::new("clearing".to_string()).unwrap()
    }

    fn last_count(rx: &mut mpsc::UnboundedReceiver<String>) -> Option<u64> {
        let mut last = None;
        while let Ok(frame) = rx.try_recv() {
            let json: serde_json::Value = serde_json::from_str(&frame).unwrap();
            last = json["count"].as_u64();
        }
        last
    }

    #[tokio::test]
    async fn test_two_parties_join_then_one_leaves() {
        // テスト項目: 2 人目の参加で両者が count 2 を受け取り、1 人が去ると残った側が count 1 を受け取る
        // given (前提条件):
        let usecase = create_usecase();
        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();

        // when (操作):
        let a = usecase.admit(clearing(), tx_a).await;
        assert_eq!(last_count(&mut rx_a), Some(1));
        let _b = usecase.admit(clearing(), tx_b).await;

        // then (期待する結果):
        assert_eq!(last_count(&mut rx_a), Some(2));
        assert_eq!(last_count(&mut rx_b), Some(2));

        // when (操作):
        usecase.remove(&a).await;

        // then (期待する結果):
        assert_eq!(last_count(&mut rx_b), Some(1));
        assert_eq!(usecase.count_in_space(&clearing()).await, 1);
    }

    #[tokio::test]
    async fn test_broadcast_is_scoped_to_the_space() {
        // テスト項目: 別のスペースの参加者には presence が届かない
        // given (前提条件):
        let usecase = create_usecase();
        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let (tx_b, _rx_b) = mpsc::unbounded_channel();
        usecase.admit(clearing(), tx_a).await;
        let _ = last_count(&mut rx_a);

        // when (操作):
        usecase
            .admit(SpaceName::new("garden".to_string()).unwrap(), tx_b)
            .await;

        // then (期待する結果):
        assert_eq!(last_count(&mut rx_a), None);
    }

    #[tokio::test]
    async fn test_remove_unknown_party_is_noop() {
        // テスト項目: 未登録の参加者の削除は何もしない
        // given (前提条件):
        let sink = Arc::new(RecordingSink::default());
        let usecase = create_usecase().with_sink(sink.clone());

        // when (操作):
        usecase.remove(&PartyId::generate()).await;

        // then (期待する結果):
        assert!(sink.events.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_membership_changes_reach_the_sink() {
        // テスト項目: 参加と退出がそれぞれ 1 回ずつ sink に通知される
        // given (前提条件):
        let sink = Arc::new(RecordingSink::default());
        let usecase = create_usecase().with_sink(sink.clone());
        let (tx, _rx) = mpsc::unbounded_channel();

        // when (操作):
        let party = usecase.admit(clearing(), tx).await;
        usecase.remove(&party).await;

        // then (期待する結果):
        assert_eq!(
            *sink.events.lock().await,
            vec![("clearing".to_string(), 1), ("clearing".to_string(), -1)]
        );
    }
}
