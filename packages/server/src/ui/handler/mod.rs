//! Request handlers.

mod federation;
mod http;
mod spaces;
mod websocket;

pub use federation::federation_handler;
pub use http::{get_federation, get_presence, health_check};
pub use spaces::{
    edge_handler, presence_handler, resonance_handler, threshold_handler, weave_handler,
};
