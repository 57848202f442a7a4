//! Ring transfer errors

use thiserror::Error;

/// Why an all-or-nothing ring transfer moved nothing
///
/// Plain `Copy` data, so it can be created and returned on the realtime
/// thread without allocating.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RingError {
    /// Not enough free slots for the whole write
    #[error("ring would overflow: {requested} samples requested, {writable} writable")]
    WouldOverflow { requested: usize, writable: usize },

    /// Not enough samples for the whole read
    #[error("ring would underflow: {requested} samples requested, {readable} readable")]
    WouldUnderflow { requested: usize, readable: usize },
}
