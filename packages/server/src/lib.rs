//! Between: presence, fading shared spaces and federation between instances.
//!
//! Layers, innermost first:
//! - [`domain`]: registries, fragment pools, the peer table and the traits
//!   the outer layers implement
//! - [`infrastructure`]: JSON wire codecs, WebSocket pushers, the garden
//!   store and the outbound peer dialer
//! - [`usecase`]: one use case per real-time space, plus federation
//! - [`ui`]: the axum router and WebSocket handlers

pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;
