//! Infrastructure layer: transports, codecs and storage behind the domain traits.

pub mod codec;
pub mod dialer;
pub mod dto;
pub mod message_pusher;
pub mod repository;
