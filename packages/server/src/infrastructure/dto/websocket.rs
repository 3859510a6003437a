//! WebSocket message DTOs of the client-facing spaces.

use serde::{Deserialize, Serialize};

// ========================================
// Shared
// ========================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointDto {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Presence,
    Strokes,
    Stroke,
    Fade,
    Welcome,
    Fragments,
    Fragment,
    Cursors,
    Positions,
    History,
    Message,
    Arrival,
    Departure,
    Witness,
}

/// `{"type":"presence","space","count"}` of the generic presence endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpacePresenceMessage {
    pub r#type: MessageType,
    pub space: String,
    pub count: usize,
}

// ========================================
// Edge (drawing strokes)
// ========================================

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EdgeRequest {
    Stroke { points: Vec<PointDto> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrokeDto {
    pub id: String,
    pub points: Vec<PointDto>,
    pub hue: f64,
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrokesMessage {
    pub r#type: MessageType,
    pub strokes: Vec<StrokeDto>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrokeMessage {
    pub r#type: MessageType,
    pub stroke: StrokeDto,
}

/// Edge presence. `hue` is only present in the message a newcomer gets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgePresenceMessage {
    pub r#type: MessageType,
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hue: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrokeFadeMessage {
    pub r#type: MessageType,
    pub stroke_id: String,
}

// ========================================
// Weave (positioned text fragments)
// ========================================

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WeaveRequest {
    Cursor { x: f64, y: f64 },
    Name { name: String },
    Fragment { content: String, x: f64, y: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextFragmentDto {
    pub id: String,
    pub content: String,
    pub x: f64,
    pub y: f64,
    pub hue: f64,
    pub author_id: String,
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FragmentsMessage {
    pub r#type: MessageType,
    pub fragments: Vec<TextFragmentDto>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FragmentMessage {
    pub r#type: MessageType,
    pub fragment: TextFragmentDto,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FragmentFadeMessage {
    pub r#type: MessageType,
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeaveWelcomeMessage {
    pub r#type: MessageType,
    pub id: String,
    pub hue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CursorDto {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub hue: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CursorsMessage {
    pub r#type: MessageType,
    pub cursors: Vec<CursorDto>,
    pub count: usize,
}

// ========================================
// Resonance (sound positions)
// ========================================

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ResonanceRequest {
    Move { x: f64, y: f64 },
    Start,
    Stop,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResonanceWelcomeMessage {
    pub r#type: MessageType,
    pub id: String,
    pub hue: f64,
    pub position: PointDto,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceDto {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub active: bool,
    pub hue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionsMessage {
    pub r#type: MessageType,
    pub positions: Vec<VoiceDto>,
    pub count: usize,
}

// ========================================
// Threshold (chat)
// ========================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ThresholdRequest {
    Message { content: String },
    Witness,
    Name { name: String },
}

/// A threshold event: message, arrival, departure, witness or presence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdEventDto {
    pub r#type: MessageType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    /// ISO-8601, UTC
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryMessage {
    pub r#type: MessageType,
    pub messages: Vec<ThresholdEventDto>,
    pub timestamp: String,
}

/// Anything the threshold sends to its clients
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ThresholdServerMessage {
    History(HistoryMessage),
    Event(ThresholdEventDto),
}

/// Serialize an outbound DTO.
///
/// DTOs are plain data and always serialize; a failure is logged and
/// yields an empty object rather than aborting the caller.
pub fn to_frame<T: Serialize>(message: &T) -> String {
    serde_json::to_string(message).unwrap_or_else(|e| {
        tracing::error!("Failed to serialize outbound message: {}", e);
        "{}".to_string()
    })
}
