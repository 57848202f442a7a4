//! Bridge error types

use thiserror::Error;

use super::lifecycle::BridgeState;
use crate::types::Direction;

/// Errors raised while configuring, starting, or running the bridge
///
/// Everything except `ProtocolViolation` is a startup error: the bridge never
/// reaches `Running`. `ProtocolViolation` is returned from the realtime cycle
/// and is plain data, so producing it does not allocate.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BridgeError {
    /// Neither inputs nor outputs were requested
    #[error("input or output channel count must be greater than 0")]
    NoChannels,

    /// Channel count above the supported maximum
    #[error("{direction} channel count {requested} exceeds maximum of {max}")]
    TooManyChannels {
        direction: Direction,
        requested: usize,
        max: usize,
    },

    /// Frames per cycle outside 1..=MAX_FRAMES
    #[error("frames per cycle {frames} is outside 1..={max}")]
    InvalidFrameCount { frames: usize, max: usize },

    /// Configured block size differs from the backend's fixed cycle size
    #[error("configured frames per cycle ({configured}) differs from backend cycle size ({backend})")]
    FrameCountMismatch { configured: usize, backend: usize },

    /// Ring depth outside 1..=MAX_BUFFER_BLOCKS, or too large to allocate
    #[error("buffer depth of {blocks} blocks is outside 1..={max}")]
    InvalidBufferDepth { blocks: usize, max: usize },

    /// A cycle arrived with a frame count other than the configured one
    #[error("cycle delivered {got} frames, bridge is fixed at {expected}")]
    ProtocolViolation { expected: usize, got: usize },

    /// No compute engine registered under the requested name
    #[error("no compute engine named '{name}'")]
    EngineMissing { name: String },

    /// The compute engine refused the block shape during its capability check
    #[error("compute engine '{name}' rejected the block shape: {reason}")]
    EngineRejected { name: String, reason: String },

    /// Lifecycle transition not allowed from the current state
    #[error("invalid lifecycle transition {from:?} -> {to:?}")]
    InvalidTransition { from: BridgeState, to: BridgeState },

    /// Dispatch thread could not be spawned or panicked
    #[error("dispatch thread error: {0}")]
    DispatchThread(String),
}

impl BridgeError {
    /// Whether this error was raised by the realtime cycle (as opposed to startup)
    pub fn is_protocol_violation(&self) -> bool {
        matches!(self, BridgeError::ProtocolViolation { .. })
    }
}

/// Result type for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;
