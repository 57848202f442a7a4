//! Audio server backends
//!
//! - **Linux**: native JACK with one port per bridge channel (with the
//!   `jack-backend` feature)
//!
//! The backend owns the server client and drives
//! [`RealtimeAdapter::process_cycle`](crate::bridge::RealtimeAdapter::process_cycle)
//! from the server's process callback.
//!
//! # Example Usage
//!
//! ```ignore
//! use jackbridge_core::audio::JackBridge;
//! use jackbridge_core::compute::engine_from_config;
//!
//! let engine = engine_from_config(&config.engine)?;
//! let mut jack = JackBridge::start(&config, engine)?;
//! // ... monitor jack.bridge().stats() ...
//! let summary = jack.close()?;
//! ```

mod error;

#[cfg(all(target_os = "linux", feature = "jack-backend"))]
mod jack_backend;

pub use error::{AudioError, AudioResult};

#[cfg(all(target_os = "linux", feature = "jack-backend"))]
pub use jack_backend::{auto_connect, JackBridge};
