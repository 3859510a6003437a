//! UseCase layer: one use case per real-time space, plus federation.

mod ephemeral_space;
mod federation;
mod presence;
mod resonance;
mod threshold;

pub use ephemeral_space::EphemeralSpaceUseCase;
pub use federation::{FederationConfig, FederationUseCase, normalize_peer_url};
pub use presence::PresenceUseCase;
pub use resonance::{ResonancePolicy, ResonanceUseCase};
pub use threshold::ThresholdUseCase;

use rand::Rng;

/// Random starting hue for the first party of a space
pub(crate) fn random_degrees() -> f64 {
    rand::thread_rng().gen_range(0.0..360.0)
}
