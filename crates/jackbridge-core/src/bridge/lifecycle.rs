//! Process lifecycle state machine
//!
//! ```text
//! Uninitialized ──► Configured ──► Running ──► ShuttingDown ──► Closed
//!                        │                                       ▲
//!                        └───────────────────────────────────────┘
//! ```
//!
//! The whole state lives in one `AtomicU8`, which doubles as the shutdown
//! flag: the realtime adapter checks it once per cycle and the dispatch loop
//! once per poll.

use std::sync::atomic::{AtomicU8, Ordering};

use super::error::{BridgeError, BridgeResult};

/// Bridge lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BridgeState {
    Uninitialized = 0,
    Configured = 1,
    Running = 2,
    ShuttingDown = 3,
    Closed = 4,
}

impl BridgeState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => BridgeState::Uninitialized,
            1 => BridgeState::Configured,
            2 => BridgeState::Running,
            3 => BridgeState::ShuttingDown,
            _ => BridgeState::Closed,
        }
    }

    /// Whether `self -> to` is a legal transition
    pub fn can_transition_to(self, to: BridgeState) -> bool {
        use BridgeState::*;
        matches!(
            (self, to),
            (Uninitialized, Configured)
                | (Configured, Running)
                | (Configured, Closed)
                | (Running, ShuttingDown)
                | (ShuttingDown, Closed)
        )
    }
}

/// Shared lifecycle state (lock-free)
#[derive(Debug)]
pub struct Lifecycle {
    state: AtomicU8,
}

impl Lifecycle {
    /// Create in `Uninitialized`
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(BridgeState::Uninitialized as u8),
        }
    }

    /// Current state
    #[inline]
    pub fn state(&self) -> BridgeState {
        BridgeState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Whether new blocks may be accepted (only while `Running`)
    #[inline]
    pub fn is_running(&self) -> bool {
        self.state() == BridgeState::Running
    }

    /// Move to `to`, failing if the transition is not legal from the current state
    pub fn transition(&self, to: BridgeState) -> BridgeResult<()> {
        let mut current = self.state.load(Ordering::Acquire);
        loop {
            let from = BridgeState::from_u8(current);
            if !from.can_transition_to(to) {
                return Err(BridgeError::InvalidTransition { from, to });
            }
            match self.state.compare_exchange_weak(
                current,
                to as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Ok(()),
                Err(actual) => current = actual,
            }
        }
    }

    /// Ask both threads to stop accepting blocks
    ///
    /// Idempotent and safe from any thread (signal handler, JACK shutdown
    /// notification). Returns `true` if this call performed the transition.
    pub fn request_shutdown(&self) -> bool {
        self.state
            .compare_exchange(
                BridgeState::Running as u8,
                BridgeState::ShuttingDown as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}
