//! Utilities shared by the Between server and client.

pub mod logger;
pub mod time;
