//! jackbridge core - realtime audio bridge library
//!
//! Hands fixed-size multichannel blocks from a realtime audio callback to a
//! compute engine running on its own thread, and the engine's output back,
//! without the callback ever blocking, allocating, or calling the engine.

pub mod audio;
pub mod bridge;
pub mod compute;
pub mod config;
pub mod ringbuf;
pub mod types;

pub use types::*;
