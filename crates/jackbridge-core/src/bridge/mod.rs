//! Realtime audio bridge
//!
//! This module connects the backend's realtime callback to a best-effort
//! compute thread through per-channel lock-free rings:
//! - ChannelBank: one SPSC ring per input and per output channel
//! - Gate: all-or-nothing block transfers across a channel set
//! - RealtimeAdapter: the per-cycle capture/playback path
//! - DispatchLoop: moves whole blocks through the compute engine
//! - Lifecycle, BridgeStats, BridgeEvent: shared state and diagnostics

mod adapter;
mod bank;
mod dispatch;
mod error;
mod events;
mod gate;
mod lifecycle;
mod runtime;
mod stats;

pub use adapter::*;
pub use bank::*;
pub use dispatch::*;
pub use error::*;
pub use events::*;
pub use gate::{min_readable, min_writable, BlockRejected};
pub use lifecycle::*;
pub use runtime::*;
pub use stats::*;
