//! Garden store trait.
//!
//! The persistent garden is owned by another part of the system. The
//! coordination core only reads its aggregate statistics.

use async_trait::async_trait;

use super::{entity::GardenStats, error::RepositoryError};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GardenStore: Send + Sync {
    /// Question count and total tending count of the default garden
    async fn load_stats(&self) -> Result<GardenStats, RepositoryError>;
}
