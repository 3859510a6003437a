//! Implementations of the `MessagePusher` trait.
//!
//! - `websocket`: delivery through the per-socket frame queues

pub mod websocket;

pub use websocket::WebSocketMessagePusher;
