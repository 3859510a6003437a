//! Implementations of the `GardenStore` trait.
//!
//! - `json_garden`: reads the garden JSON files on disk

pub mod json_garden;

pub use json_garden::JsonGardenStore;
