//! Synchronization gate
//!
//! Every ring is lock-free on its own, but a block spans all channels of a
//! direction. The gate makes block transfers all-or-nothing across channels:
//! it takes the minimum fill level over the whole set and only then moves
//! `frames` samples on every channel. If any single channel is short, no
//! channel moves, so channels can never drift apart by a partial block.
//!
//! Blocks are staged channel-major: channel `c` occupies
//! `stage[c * frames..(c + 1) * frames]`.

use crate::ringbuf::{RingConsumer, RingLevels, RingProducer};
use crate::types::Sample;

/// A block transfer the gate refused
///
/// `available` is the minimum level across the channel set at the time of
/// the check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockRejected {
    pub required: usize,
    pub available: usize,
}

/// Minimum readable count across a channel set
///
/// An empty set imposes no limit and reports `usize::MAX`.
pub fn min_readable<R: RingLevels>(rings: &[R]) -> usize {
    rings.iter().map(|r| r.readable()).min().unwrap_or(usize::MAX)
}

/// Minimum writable count across a channel set
///
/// An empty set imposes no limit and reports `usize::MAX`.
pub fn min_writable<R: RingLevels>(rings: &[R]) -> usize {
    rings.iter().map(|r| r.writable()).min().unwrap_or(usize::MAX)
}

/// Push one block into every ring, or into none
pub fn push_block(
    rings: &mut [RingProducer],
    stage: &[Sample],
    frames: usize,
) -> Result<(), BlockRejected> {
    debug_assert_eq!(stage.len(), rings.len() * frames);

    let available = min_writable(rings);
    if available < frames {
        return Err(BlockRejected {
            required: frames,
            available,
        });
    }

    // Only this thread writes these rings, so free space can only have grown
    // since the check above and every per-channel write succeeds.
    for (ring, channel) in rings.iter_mut().zip(stage.chunks_exact(frames)) {
        let written = ring.try_write(channel);
        debug_assert!(written.is_ok(), "gate admitted a block a ring refused");
    }
    Ok(())
}

/// Pop one block from every ring, or from none
///
/// On rejection `stage` is left untouched.
pub fn pop_block(
    rings: &mut [RingConsumer],
    stage: &mut [Sample],
    frames: usize,
) -> Result<(), BlockRejected> {
    debug_assert_eq!(stage.len(), rings.len() * frames);

    let available = min_readable(rings);
    if available < frames {
        return Err(BlockRejected {
            required: frames,
            available,
        });
    }

    for (ring, channel) in rings.iter_mut().zip(stage.chunks_exact_mut(frames)) {
        let read = ring.try_read(channel);
        debug_assert!(read.is_ok(), "gate admitted a block a ring refused");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ringbuf::sample_ring;
    use proptest::prelude::*;

    fn rings(n: usize, capacity: usize) -> (Vec<RingProducer>, Vec<RingConsumer>) {
        (0..n).map(|_| sample_ring(capacity)).unzip()
    }

    #[test]
    fn test_push_reaches_every_channel() {
        let (mut tx, rx) = rings(3, 8);
        let stage = [1.0, 1.0, 2.0, 2.0, 3.0, 3.0];
        push_block(&mut tx, &stage, 2).unwrap();
        assert!(rx.iter().all(|r| r.readable() == 2));
    }

    #[test]
    fn test_push_rejected_when_one_channel_full() {
        let (mut tx, rx) = rings(2, 4);
        // Fill channel 1 behind the gate's back
        tx[1].try_write(&[0.0; 3]).unwrap();

        let err = push_block(&mut tx, &[5.0; 4], 2).unwrap_err();
        assert_eq!(
            err,
            BlockRejected {
                required: 2,
                available: 1
            }
        );
        assert_eq!(rx[0].readable(), 0);
        assert_eq!(rx[1].readable(), 3);
    }

    #[test]
    fn test_pop_rejected_leaves_everything_untouched() {
        let (mut tx, mut rx) = rings(2, 512);
        tx[0].try_write(&[1.0; 256]).unwrap();
        tx[1].try_write(&[1.0; 200]).unwrap();

        let mut stage = vec![7.0; 512];
        let err = pop_block(&mut rx, &mut stage, 256).unwrap_err();
        assert_eq!(err.available, 200);
        assert_eq!(rx[0].readable(), 256);
        assert_eq!(rx[1].readable(), 200);
        assert!(stage.iter().all(|&s| s == 7.0));
    }

    #[test]
    fn test_pop_is_channel_major() {
        let (mut tx, mut rx) = rings(2, 4);
        tx[0].try_write(&[1.0, 2.0]).unwrap();
        tx[1].try_write(&[3.0, 4.0]).unwrap();

        let mut stage = [0.0; 4];
        pop_block(&mut rx, &mut stage, 2).unwrap();
        assert_eq!(stage, [1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_empty_set_never_limits() {
        let mut none: Vec<RingProducer> = Vec::new();
        assert_eq!(min_writable(&none), usize::MAX);
        assert!(push_block(&mut none, &[], 64).is_ok());
    }

    proptest! {
        #[test]
        fn prop_pop_is_all_or_nothing(
            fills in proptest::collection::vec(0usize..64, 1..8),
            frames in 1usize..64,
        ) {
            let (mut tx, mut rx) = rings(fills.len(), 64);
            for (ring, &fill) in tx.iter_mut().zip(&fills) {
                ring.try_write(&vec![0.25; fill]).unwrap();
            }

            let mut stage = vec![0.0; fills.len() * frames];
            let ready = fills.iter().copied().min().unwrap_or(0) >= frames;
            let result = pop_block(&mut rx, &mut stage, frames);

            prop_assert_eq!(result.is_ok(), ready);
            for (ring, &fill) in rx.iter().zip(&fills) {
                let expected = if ready { fill - frames } else { fill };
                prop_assert_eq!(ring.readable(), expected);
            }
        }
    }
}
