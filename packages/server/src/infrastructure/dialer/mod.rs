//! Implementations of the `PeerDialer` trait.
//!
//! - `tungstenite`: outbound WebSocket connections

pub mod tungstenite;

pub use tungstenite::TungsteniteDialer;
