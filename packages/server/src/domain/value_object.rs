//! Value objects.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::ValueObjectError;

const MAX_SPACE_NAME_LENGTH: usize = 32;
const MAX_PEER_ID_LENGTH: usize = 64;

/// Unix timestamp in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(i64);

impl Timestamp {
    pub fn new(millis: i64) -> Self {
        Self(millis)
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    /// Milliseconds elapsed between `self` and `now` (negative if `now` is earlier)
    pub fn elapsed_until(&self, now: Timestamp) -> i64 {
        now.0 - self.0
    }
}

/// Name of a logical space. Lowercase ASCII letters, digits and `-`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpaceName(String);

impl SpaceName {
    pub fn new(name: String) -> Result<Self, ValueObjectError> {
        let valid = !name.is_empty()
            && name.len() <= MAX_SPACE_NAME_LENGTH
            && name
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
        if valid {
            Ok(Self(name))
        } else {
            Err(ValueObjectError::InvalidSpaceName(name))
        }
    }

    /// Build a space name from a compile-time constant known to be valid
    pub(crate) fn from_static(name: &'static str) -> Self {
        Self(name.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for SpaceName {
    type Error = ValueObjectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl std::fmt::Display for SpaceName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

fn short_random_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(12);
    id
}

/// Server-generated identity of a connected party. Never client-supplied.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PartyId(String);

impl PartyId {
    pub fn generate() -> Self {
        Self(short_random_id())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for PartyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of a fading fragment
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FragmentId(String);

impl FragmentId {
    pub fn generate() -> Self {
        Self(short_random_id())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Identity of a federated instance, either self-announced in `hello`
/// or a temporary one generated while the handshake is pending.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PeerId(String);

impl PeerId {
    pub fn new(id: String) -> Result<Self, ValueObjectError> {
        if id.trim().is_empty() || id.len() > MAX_PEER_ID_LENGTH {
            return Err(ValueObjectError::InvalidPeerId(id));
        }
        Ok(Self(id))
    }

    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PeerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One physical federation socket. A logical peer may be served by
/// different connections over its lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

/// Colour identity on the 0–360 ring
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Hue(f64);

impl Hue {
    /// Wrap any finite angle onto `[0, 360)`; non-finite input maps to 0.
    pub fn new(degrees: f64) -> Self {
        if !degrees.is_finite() {
            return Self(0.0);
        }
        Self(degrees.rem_euclid(360.0))
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    /// Shortest distance around the ring, in degrees
    pub fn circular_distance(&self, other: &Hue) -> f64 {
        let d = (self.0 - other.0).abs();
        d.min(360.0 - d)
    }
}

/// Normalized 2D position, each axis in `[0.0, 1.0]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub const CENTER: Position = Position { x: 0.5, y: 0.5 };

    pub fn clamped(x: f64, y: f64) -> Self {
        Self {
            x: clamp_unit(x),
            y: clamp_unit(y),
        }
    }
}

fn clamp_unit(v: f64) -> f64 {
    if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) }
}

/// Client-supplied display name, cut to a maximum number of characters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayName(String);

impl DisplayName {
    /// Returns `None` for an empty name
    pub fn truncated(raw: &str, max_chars: usize) -> Option<Self> {
        let name = truncate_chars(raw, max_chars);
        if name.is_empty() { None } else { Some(Self(name)) }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Keep at most `max_chars` characters of `s`
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_space_name_accepts_lowercase_names() {
        // テスト項目: 英小文字・数字・ハイフンのスペース名が受け付けられる
        // given (前提条件):
        let raw = "clearing-2".to_string();

        // when (操作):
        let result = SpaceName::new(raw);

        // then (期待する結果):
        assert_eq!(result.unwrap().as_str(), "clearing-2");
    }

    #[test]
    fn test_space_name_rejects_invalid_names() {
        // テスト項目: 空・大文字・記号・長すぎる名前は拒否される
        // given (前提条件):
        let candidates = vec![
            String::new(),
            "Clearing".to_string(),
            "../garden".to_string(),
            "a".repeat(33),
        ];

        for raw in candidates {
            // when (操作):
            let result = SpaceName::new(raw.clone());

            // then (期待する結果):
            assert_eq!(result, Err(ValueObjectError::InvalidSpaceName(raw)));
        }
    }

    #[test]
    fn test_party_ids_are_unique() {
        // テスト項目: 生成される PartyId が重複しない
        // given (前提条件):
        let ids: std::collections::HashSet<PartyId> = (0..1000).map(|_| PartyId::generate()).collect();

        // then (期待する結果):
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn test_peer_id_rejects_blank() {
        // テスト項目: 空白のみの PeerId は拒否される
        // when (操作):
        let result = PeerId::new("   ".to_string());

        // then (期待する結果):
        assert!(result.is_err());
    }

    #[test]
    fn test_hue_wraps_onto_ring() {
        // テスト項目: Hue は 0-360 の範囲に正規化される
        // then (期待する結果):
        assert_eq!(Hue::new(370.0).value(), 10.0);
        assert_eq!(Hue::new(-90.0).value(), 270.0);
        assert_eq!(Hue::new(f64::NAN).value(), 0.0);
    }

    #[test]
    fn test_hue_circular_distance_uses_short_way_round() {
        // テスト項目: 色相の距離はリング上の短い方で計算される
        // given (前提条件):
        let a = Hue::new(350.0);
        let b = Hue::new(10.0);

        // then (期待する結果):
        assert_eq!(a.circular_distance(&b), 20.0);
    }

    #[test]
    fn test_position_is_clamped() {
        // テスト項目: 座標は 0.0-1.0 に丸められる
        // when (操作):
        let position = Position::clamped(-0.5, 1.7);

        // then (期待する結果):
        assert_eq!(position, Position { x: 0.0, y: 1.0 });
    }

    #[test]
    fn test_display_name_is_truncated_by_chars() {
        // テスト項目: 表示名は文字数で切り詰められ、空文字は None になる
        // then (期待する結果):
        assert_eq!(
            DisplayName::truncated("あいうえお", 3).unwrap().as_str(),
            "あいう"
        );
        assert!(DisplayName::truncated("", 30).is_none());
    }
}
