//! Core types for Kestrel.

pub mod message;
pub mod stream;

pub use message::*;
pub use stream::*;
