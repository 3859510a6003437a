//! Data Transfer Objects (DTOs).
//!
//! DTOs are organized by protocol:
//! - `websocket`: client-facing space messages
//! - `federation`: peer protocol, watcher commands and the state snapshot

pub mod conversion;
pub mod federation;
pub mod websocket;
