//! Core types for Colloquy.

pub mod message;
pub mod stream;
pub mod structured;

pub use message::*;
pub use stream::*;
pub use structured::*;
