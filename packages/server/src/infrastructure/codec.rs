//! Wire encodings of the fragment spaces.

use between_shared::time::timestamp_to_iso8601;

use crate::domain::{
    codec::{FragmentCodec, PresenceCodec, ThresholdCodec, VoiceCodec},
    entity::{
        FederationState, Fragment, Party, Stroke, TextFragment, ThresholdMessage,
    },
    federation::{FederationCodec, PeerMessage, WatcherRequest},
    value_object::{FragmentId, PeerId, SpaceName, Timestamp},
};

use super::dto::{
    federation::{FederationMessage, FederationStateDto, PROTOCOL_VERSION, WatcherCommand},
    websocket::{
        CursorDto, CursorsMessage, EdgePresenceMessage, FragmentFadeMessage, FragmentMessage,
        FragmentsMessage, HistoryMessage, MessageType, PointDto, PositionsMessage,
        ResonanceWelcomeMessage, SpacePresenceMessage, StrokeDto, StrokeFadeMessage,
        StrokeMessage, StrokesMessage, TextFragmentDto, ThresholdEventDto, VoiceDto,
        WeaveWelcomeMessage, to_frame,
    },
};

/// The edge: anonymous drawing strokes. Membership is a bare count.
#[derive(Debug, Clone, Copy, Default)]
pub struct EdgeCodec;

impl FragmentCodec for EdgeCodec {
    type Payload = Stroke;

    fn replay(&self, live: &[Fragment<Stroke>]) -> String {
        to_frame(&StrokesMessage {
            r#type: MessageType::Strokes,
            strokes: live.iter().map(StrokeDto::from).collect(),
        })
    }

    fn welcome(&self, party: &Party, count: usize) -> String {
        to_frame(&EdgePresenceMessage {
            r#type: MessageType::Presence,
            count,
            hue: Some(party.hue.value()),
        })
    }

    fn roster(&self, parties: &[Party]) -> String {
        to_frame(&EdgePresenceMessage {
            r#type: MessageType::Presence,
            count: parties.len(),
            hue: None,
        })
    }

    fn added(&self, fragment: &Fragment<Stroke>) -> String {
        to_frame(&StrokeMessage {
            r#type: MessageType::Stroke,
            stroke: StrokeDto::from(fragment),
        })
    }

    fn faded(&self, id: &FragmentId) -> String {
        to_frame(&StrokeFadeMessage {
            r#type: MessageType::Fade,
            stroke_id: id.as_str().to_string(),
        })
    }
}

/// The weave: positioned text with visible cursors and names
#[derive(Debug, Clone, Copy, Default)]
pub struct WeaveCodec;

impl FragmentCodec for WeaveCodec {
    type Payload = TextFragment;

    fn replay(&self, live: &[Fragment<TextFragment>]) -> String {
        to_frame(&FragmentsMessage {
            r#type: MessageType::Fragments,
            fragments: live.iter().map(TextFragmentDto::from).collect(),
        })
    }

    fn welcome(&self, party: &Party, _count: usize) -> String {
        to_frame(&WeaveWelcomeMessage {
            r#type: MessageType::Welcome,
            id: party.id.as_str().to_string(),
            hue: party.hue.value(),
        })
    }

    fn roster(&self, parties: &[Party]) -> String {
        to_frame(&CursorsMessage {
            r#type: MessageType::Cursors,
            cursors: parties.iter().map(CursorDto::from).collect(),
            count: parties.len(),
        })
    }

    fn added(&self, fragment: &Fragment<TextFragment>) -> String {
        to_frame(&FragmentMessage {
            r#type: MessageType::Fragment,
            fragment: TextFragmentDto::from(fragment),
        })
    }

    fn faded(&self, id: &FragmentId) -> String {
        to_frame(&FragmentFadeMessage {
            r#type: MessageType::Fade,
            id: id.as_str().to_string(),
        })
    }
}

/// The resonance: voices with a position and an on/off state
#[derive(Debug, Clone, Copy, Default)]
pub struct ResonanceCodec;

impl VoiceCodec for ResonanceCodec {
    fn welcome(&self, party: &Party) -> String {
        to_frame(&ResonanceWelcomeMessage {
            r#type: MessageType::Welcome,
            id: party.id.as_str().to_string(),
            hue: party.hue.value(),
            position: PointDto::from(party.position),
        })
    }

    fn positions(&self, parties: &[Party]) -> String {
        to_frame(&PositionsMessage {
            r#type: MessageType::Positions,
            positions: parties.iter().map(VoiceDto::from).collect(),
            count: parties.len(),
        })
    }
}

/// The threshold chat
#[derive(Debug, Clone, Copy, Default)]
pub struct ChatCodec;

impl ThresholdCodec for ChatCodec {
    fn history(&self, recent: &[ThresholdMessage], now: Timestamp) -> String {
        to_frame(&HistoryMessage {
            r#type: MessageType::History,
            messages: recent.iter().map(ThresholdEventDto::from).collect(),
            timestamp: timestamp_to_iso8601(now.value()),
        })
    }

    fn event(&self, message: &ThresholdMessage) -> String {
        to_frame(&ThresholdEventDto::from(message))
    }

    fn presence(&self, count: usize, phrase: &str, now: Timestamp) -> String {
        to_frame(&ThresholdEventDto {
            r#type: MessageType::Presence,
            from: None,
            content: Some(phrase.to_string()),
            count: Some(count),
            timestamp: timestamp_to_iso8601(now.value()),
        })
    }
}

/// The generic per-space presence counter
#[derive(Debug, Clone, Copy, Default)]
pub struct PresenceCountCodec;

impl PresenceCodec for PresenceCountCodec {
    fn presence(&self, space: &SpaceName, count: usize) -> String {
        to_frame(&SpacePresenceMessage {
            r#type: MessageType::Presence,
            space: space.as_str().to_string(),
            count,
        })
    }
}

/// The federation peer protocol and watcher snapshots
#[derive(Debug, Clone, Copy, Default)]
pub struct PeerProtocolCodec;

impl FederationCodec for PeerProtocolCodec {
    fn encode(&self, message: &PeerMessage) -> String {
        let dto = match message {
            PeerMessage::Hello { id, name } => FederationMessage::Hello {
                id: id.as_str().to_string(),
                name: name.clone(),
                version: PROTOCOL_VERSION.to_string(),
            },
            PeerMessage::Presence(presence) => FederationMessage::Presence {
                presence: (*presence).into(),
            },
            PeerMessage::Garden(garden) => FederationMessage::Garden {
                garden: (*garden).into(),
            },
            PeerMessage::Heartbeat => FederationMessage::Heartbeat,
            PeerMessage::Goodbye => FederationMessage::Goodbye,
        };
        to_frame(&dto)
    }

    fn decode(&self, frame: &str) -> Option<PeerMessage> {
        let message = match serde_json::from_str::<FederationMessage>(frame) {
            Ok(message) => message,
            Err(e) => {
                tracing::debug!("Ignoring malformed federation message: {}", e);
                return None;
            }
        };
        Some(match message {
            FederationMessage::Hello { id, name, .. } => PeerMessage::Hello {
                id: PeerId::new(id).ok()?,
                name,
            },
            FederationMessage::Presence { presence } => PeerMessage::Presence(presence.into()),
            FederationMessage::Garden { garden } => PeerMessage::Garden(garden.into()),
            FederationMessage::Heartbeat => PeerMessage::Heartbeat,
            FederationMessage::Goodbye => PeerMessage::Goodbye,
        })
    }

    fn decode_watcher(&self, frame: &str) -> Option<WatcherRequest> {
        match serde_json::from_str::<WatcherCommand>(frame).ok()? {
            WatcherCommand::Connect { url } => Some(WatcherRequest::Connect { url }),
        }
    }

    fn state(&self, state: &FederationState) -> String {
        to_frame(&FederationStateDto::from(state.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        entity::Point,
        value_object::{DisplayName, Hue, PartyId, Position, SpaceName, Timestamp},
    };

    fn party(name: Option<&str>) -> Party {
        Party {
            id: PartyId::generate(),
            space: SpaceName::new("weave".to_string()).unwrap(),
            hue: Hue::new(90.0),
            name: name.and_then(|n| DisplayName::truncated(n, 30)),
            position: Position::clamped(0.25, 0.75),
            active: false,
            last_update: Timestamp::new(0),
        }
    }

    #[test]
    fn test_edge_welcome_carries_hue_and_count() {
        // テスト項目: edge の新規参加者向け presence に hue と人数が含まれる
        // when (操作):
        let frame = EdgeCodec.welcome(&party(None), 3);

        // then (期待する結果):
        let json: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "presence", "count": 3, "hue": 90.0})
        );
    }

    #[test]
    fn test_edge_added_wire_format() {
        // テスト項目: stroke のブロードキャストが stroke フィールドに包まれる
        // given (前提条件):
        let fragment = Fragment {
            id: FragmentId::generate(),
            payload: Stroke::new(vec![Point { x: 0.5, y: 0.5 }]).unwrap(),
            hue: Hue::new(200.0),
            created_at: Timestamp::new(42),
        };

        // when (操作):
        let frame = EdgeCodec.added(&fragment);

        // then (期待する結果):
        let json: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(json["type"], "stroke");
        assert_eq!(json["stroke"]["id"], fragment.id.as_str());
        assert_eq!(json["stroke"]["points"][0]["x"], 0.5);
        assert_eq!(json["stroke"]["timestamp"], 42);
    }

    #[test]
    fn test_weave_roster_includes_names_only_when_set() {
        // テスト項目: weave のカーソル一覧には名前がある人だけ name が含まれる
        // given (前提条件):
        let parties = vec![party(Some("ren")), party(None)];

        // when (操作):
        let frame = WeaveCodec.roster(&parties);

        // then (期待する結果):
        let json: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(json["type"], "cursors");
        assert_eq!(json["count"], 2);
        assert_eq!(json["cursors"][0]["name"], "ren");
        assert_eq!(json["cursors"][0]["x"], 0.25);
        assert!(json["cursors"][1].get("name").is_none());
    }

    #[test]
    fn test_fade_field_names_differ_per_space() {
        // テスト項目: fade のフィールド名は edge が strokeId、weave が id
        // given (前提条件):
        let id = FragmentId::generate();

        // when (操作):
        let edge: serde_json::Value = serde_json::from_str(&EdgeCodec.faded(&id)).unwrap();
        let weave: serde_json::Value = serde_json::from_str(&WeaveCodec.faded(&id)).unwrap();

        // then (期待する結果):
        assert_eq!(edge["strokeId"], id.as_str());
        assert_eq!(weave["id"], id.as_str());
    }

    #[test]
    fn test_resonance_welcome_starts_at_center() {
        // テスト項目: resonance の welcome に中央の初期位置が含まれる
        // when (操作):
        let frame = ResonanceCodec.welcome(&party(None));

        // then (期待する結果):
        let json: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(json["type"], "welcome");
        assert_eq!(json["position"], serde_json::json!({"x": 0.25, "y": 0.75}));
    }

    #[test]
    fn test_threshold_presence_carries_phrase() {
        // テスト項目: threshold の presence に人数と文言が含まれる
        // when (操作):
        let frame = ChatCodec.presence(2, "One other is here", Timestamp::new(0));

        // then (期待する結果):
        let json: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "presence",
                "count": 2,
                "content": "One other is here",
                "timestamp": "1970-01-01T00:00:00.000Z"
            })
        );
    }

    #[test]
    fn test_space_presence_wire_format() {
        // テスト項目: presence エンドポイントのメッセージに space と count が含まれる
        // given (前提条件):
        let space = SpaceName::new("clearing".to_string()).unwrap();

        // when (操作):
        let frame = PresenceCountCodec.presence(&space, 2);

        // then (期待する結果):
        assert_eq!(frame, r#"{"type":"presence","space":"clearing","count":2}"#);
    }

    #[test]
    fn test_peer_protocol_ignores_malformed_frames() {
        // テスト項目: 壊れたメッセージや不正な ID の hello は無視される
        assert_eq!(PeerProtocolCodec.decode("{oops"), None);
        assert_eq!(
            PeerProtocolCodec.decode(r#"{"type":"hello","id":"  ","name":"x","version":"1.0"}"#),
            None
        );
    }

    #[test]
    fn test_peer_protocol_decodes_hello() {
        // テスト項目: hello が PeerId と名前に変換される
        // when (操作):
        let message = PeerProtocolCodec
            .decode(r#"{"type":"hello","id":"q1","name":"Q","version":"1.0"}"#)
            .unwrap();

        // then (期待する結果):
        assert_eq!(
            message,
            PeerMessage::Hello {
                id: PeerId::new("q1".to_string()).unwrap(),
                name: "Q".to_string(),
            }
        );
    }
}
