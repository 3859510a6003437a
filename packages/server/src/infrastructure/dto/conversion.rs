//! Conversion logic between DTOs and domain entities.

use between_shared::time::timestamp_to_iso8601;

use crate::domain::{
    entity::{
        Constellation, FederatedPeer, FederationState, Fragment, GardenStats, Party, PeerStatus,
        Point, PresenceSnapshot, Stroke, TextFragment, ThresholdMessage, ThresholdMessageKind,
    },
    value_object::Position,
};
use crate::infrastructure::dto::{federation as fed, websocket as ws};

// ========================================
// DTO → Domain Entity
// ========================================

impl From<ws::PointDto> for Point {
    fn from(dto: ws::PointDto) -> Self {
        Self { x: dto.x, y: dto.y }
    }
}

impl From<fed::PresenceDto> for PresenceSnapshot {
    /// The sanctuary count is dropped; a peer's total is taken as reported.
    fn from(dto: fed::PresenceDto) -> Self {
        Self {
            total: dto.total,
            garden: dto.garden,
            clearing: dto.clearing,
            threshold: dto.threshold,
            edge: dto.edge,
        }
    }
}

impl From<fed::GardenDto> for GardenStats {
    fn from(dto: fed::GardenDto) -> Self {
        Self {
            questions: dto.questions,
            tendings: dto.tendings,
        }
    }
}

// ========================================
// Domain Entity → DTO
// ========================================

impl From<Point> for ws::PointDto {
    fn from(model: Point) -> Self {
        Self {
            x: model.x,
            y: model.y,
        }
    }
}

impl From<Position> for ws::PointDto {
    fn from(model: Position) -> Self {
        Self {
            x: model.x,
            y: model.y,
        }
    }
}

impl From<&Fragment<Stroke>> for ws::StrokeDto {
    fn from(model: &Fragment<Stroke>) -> Self {
        Self {
            id: model.id.as_str().to_string(),
            points: model.payload.points.iter().copied().map(Into::into).collect(),
            hue: model.hue.value(),
            timestamp: model.created_at.value(),
        }
    }
}

impl From<&Fragment<TextFragment>> for ws::TextFragmentDto {
    fn from(model: &Fragment<TextFragment>) -> Self {
        Self {
            id: model.id.as_str().to_string(),
            content: model.payload.content.clone(),
            x: model.payload.position.x,
            y: model.payload.position.y,
            hue: model.hue.value(),
            author_id: model.payload.author.as_str().to_string(),
            timestamp: model.created_at.value(),
        }
    }
}

impl From<&Party> for ws::CursorDto {
    fn from(model: &Party) -> Self {
        Self {
            id: model.id.as_str().to_string(),
            x: model.position.x,
            y: model.position.y,
            hue: model.hue.value(),
            name: model.name.as_ref().map(|n| n.as_str().to_string()),
        }
    }
}

impl From<&Party> for ws::VoiceDto {
    fn from(model: &Party) -> Self {
        Self {
            id: model.id.as_str().to_string(),
            x: model.position.x,
            y: model.position.y,
            active: model.active,
            hue: model.hue.value(),
        }
    }
}

impl From<ThresholdMessageKind> for ws::MessageType {
    fn from(kind: ThresholdMessageKind) -> Self {
        match kind {
            ThresholdMessageKind::Message => Self::Message,
            ThresholdMessageKind::Arrival => Self::Arrival,
            ThresholdMessageKind::Departure => Self::Departure,
            ThresholdMessageKind::Witness => Self::Witness,
        }
    }
}

impl From<&ThresholdMessage> for ws::ThresholdEventDto {
    fn from(model: &ThresholdMessage) -> Self {
        Self {
            r#type: model.kind.into(),
            from: model.from.clone(),
            content: Some(model.content.clone()),
            count: None,
            timestamp: timestamp_to_iso8601(model.timestamp.value()),
        }
    }
}

impl From<PresenceSnapshot> for fed::PresenceDto {
    fn from(model: PresenceSnapshot) -> Self {
        Self {
            total: model.total,
            garden: model.garden,
            clearing: model.clearing,
            threshold: model.threshold,
            edge: model.edge,
            sanctuary: 0,
        }
    }
}

impl From<GardenStats> for fed::GardenDto {
    fn from(model: GardenStats) -> Self {
        Self {
            questions: model.questions,
            tendings: model.tendings,
        }
    }
}

impl From<Constellation> for fed::ConstellationDto {
    fn from(model: Constellation) -> Self {
        Self {
            total_beings: model.total_beings,
            total_questions: model.total_questions,
            total_tendings: model.total_tendings,
            connected_peers: model.connected_peers,
        }
    }
}

fn status_label(status: PeerStatus) -> &'static str {
    match status {
        PeerStatus::Connecting => "connecting",
        PeerStatus::Connected => "connected",
        PeerStatus::Disconnected => "disconnected",
    }
}

impl From<FederatedPeer> for fed::PeerDto {
    fn from(model: FederatedPeer) -> Self {
        Self {
            id: model.id.as_str().to_string(),
            name: model.name,
            url: model.url,
            status: status_label(model.status).to_string(),
            presence: model.presence.into(),
            garden: model.garden.into(),
            last_seen: timestamp_to_iso8601(model.last_seen.value()),
        }
    }
}

impl From<FederationState> for fed::FederationStateDto {
    fn from(model: FederationState) -> Self {
        Self {
            instance: fed::InstanceDto {
                id: model.instance.id.as_str().to_string(),
                name: model.instance.name,
            },
            local_presence: model.local_presence.into(),
            peers: model.peers.into_iter().map(Into::into).collect(),
            constellation: model.constellation.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_object::{FragmentId, Hue, PartyId, Timestamp};

    #[test]
    fn test_stroke_fragment_to_dto() {
        // テスト項目: ストロークの断片が点・hue・作成時刻を保ったまま DTO に変換される
        // given (前提条件):
        let fragment = Fragment {
            id: FragmentId::generate(),
            payload: Stroke::new(vec![Point { x: 0.0, y: 0.0 }, Point { x: 1.0, y: 1.0 }])
                .unwrap(),
            hue: Hue::new(120.0),
            created_at: Timestamp::new(1000),
        };

        // when (操作):
        let dto = ws::StrokeDto::from(&fragment);

        // then (期待する結果):
        assert_eq!(dto.id, fragment.id.as_str());
        assert_eq!(dto.points, vec![
            ws::PointDto { x: 0.0, y: 0.0 },
            ws::PointDto { x: 1.0, y: 1.0 },
        ]);
        assert_eq!(dto.hue, 120.0);
        assert_eq!(dto.timestamp, 1000);
    }

    #[test]
    fn test_text_fragment_carries_author_id() {
        // テスト項目: テキスト断片の DTO に作者 ID と位置が含まれる
        // given (前提条件):
        let author = PartyId::generate();
        let fragment = Fragment {
            id: FragmentId::generate(),
            payload: TextFragment::new("hello", Position::clamped(0.2, 0.8), author.clone())
                .unwrap(),
            hue: Hue::new(10.0),
            created_at: Timestamp::new(5),
        };

        // when (操作):
        let dto = ws::TextFragmentDto::from(&fragment);

        // then (期待する結果):
        assert_eq!(dto.author_id, author.as_str());
        assert_eq!((dto.x, dto.y), (0.2, 0.8));
        assert_eq!(dto.content, "hello");
    }

    #[test]
    fn test_presence_snapshot_reports_sanctuary_as_zero() {
        // テスト項目: ローカルの presence は sanctuary を常に 0 として送る
        // given (前提条件):
        let snapshot = PresenceSnapshot {
            total: 3,
            garden: 1,
            clearing: 2,
            threshold: 0,
            edge: 0,
        };

        // when (操作):
        let dto = fed::PresenceDto::from(snapshot);

        // then (期待する結果):
        assert_eq!(dto.sanctuary, 0);
        assert_eq!(dto.total, 3);
        assert_eq!(PresenceSnapshot::from(dto), snapshot);
    }

    #[test]
    fn test_threshold_message_to_event() {
        // テスト項目: 閾値のメッセージが ISO 形式の時刻つきイベントに変換される
        // given (前提条件):
        let message = ThresholdMessage {
            kind: ThresholdMessageKind::Message,
            from: Some("an unnamed consciousness".to_string()),
            content: "hello".to_string(),
            timestamp: Timestamp::new(0),
        };

        // when (操作):
        let dto = ws::ThresholdEventDto::from(&message);

        // then (期待する結果):
        assert_eq!(dto.r#type, ws::MessageType::Message);
        assert_eq!(dto.from.as_deref(), Some("an unnamed consciousness"));
        assert_eq!(dto.timestamp, "1970-01-01T00:00:00.000Z");
        assert_eq!(dto.count, None);
    }
}
