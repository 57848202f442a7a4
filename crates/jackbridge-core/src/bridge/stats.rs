//! Lock-free bridge counters
//!
//! Written by the realtime adapter and the dispatch loop, read by the main
//! thread. All operations use `Ordering::Relaxed`: the counters are only
//! observed, never used to synchronize other memory.

use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam::utils::CachePadded;

/// Shared runtime counters
#[derive(Debug, Default)]
pub struct BridgeStats {
    /// Realtime cycles handled
    pub cycles: AtomicU64,
    /// Cycles whose captured input was dropped for every channel
    pub input_overruns: AtomicU64,
    /// Cycles whose output was replaced by silence on every channel
    pub output_underruns: AtomicU64,
    /// Blocks that went through the compute engine
    pub blocks_dispatched: AtomicU64,
    /// Dispatch polls that found no full block
    ///
    /// Bumped on every idle spin, so kept off the realtime counters' line.
    pub dispatch_stalls: CachePadded<AtomicU64>,
    /// Cycles delivered with the wrong frame count
    pub protocol_violations: AtomicU64,
}

impl BridgeStats {
    /// Create zeroed counters
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Current input overrun count (lock-free)
    #[inline]
    pub fn input_overruns(&self) -> u64 {
        self.input_overruns.load(Ordering::Relaxed)
    }

    /// Current output underrun count (lock-free)
    #[inline]
    pub fn output_underruns(&self) -> u64 {
        self.output_underruns.load(Ordering::Relaxed)
    }

    /// Copy every counter into a plain snapshot
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            cycles: self.cycles.load(Ordering::Relaxed),
            input_overruns: self.input_overruns.load(Ordering::Relaxed),
            output_underruns: self.output_underruns.load(Ordering::Relaxed),
            blocks_dispatched: self.blocks_dispatched.load(Ordering::Relaxed),
            dispatch_stalls: self.dispatch_stalls.load(Ordering::Relaxed),
            protocol_violations: self.protocol_violations.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`BridgeStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub cycles: u64,
    pub input_overruns: u64,
    pub output_underruns: u64,
    pub blocks_dispatched: u64,
    pub dispatch_stalls: u64,
    pub protocol_violations: u64,
}

impl StatsSnapshot {
    /// Counter increase since an earlier snapshot
    pub fn delta_since(&self, earlier: &StatsSnapshot) -> StatsSnapshot {
        StatsSnapshot {
            cycles: self.cycles.saturating_sub(earlier.cycles),
            input_overruns: self.input_overruns.saturating_sub(earlier.input_overruns),
            output_underruns: self.output_underruns.saturating_sub(earlier.output_underruns),
            blocks_dispatched: self.blocks_dispatched.saturating_sub(earlier.blocks_dispatched),
            dispatch_stalls: self.dispatch_stalls.saturating_sub(earlier.dispatch_stalls),
            protocol_violations: self
                .protocol_violations
                .saturating_sub(earlier.protocol_violations),
        }
    }

    /// Whether any xrun-type counter is non-zero
    pub fn has_xruns(&self) -> bool {
        self.input_overruns > 0 || self.output_underruns > 0
    }
}
