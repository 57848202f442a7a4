//! Bridge construction and teardown
//!
//! ```text
//! configure() ──► ConfiguredBridge ──start()──► (RealtimeAdapter, RunningBridge)
//!                        │                                        │
//!                     close()                          shutdown() / drop
//!                        ▼                                        ▼
//!                     Closed                                   Closed
//! ```
//!
//! The [`BridgeContext`] holds what every thread shares (shape, lifecycle,
//! counters) and is passed by reference into the adapter and dispatch
//! constructors.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use super::adapter::RealtimeAdapter;
use super::bank::ChannelBank;
use super::dispatch::{DispatchLoop, DispatchSummary};
use super::error::{BridgeError, BridgeResult};
use super::events::{event_queue, BridgeEvent, EventReceiver};
use super::lifecycle::{BridgeState, Lifecycle};
use super::stats::{BridgeStats, StatsSnapshot};
use crate::compute::{validate_engine, ComputeEngine};
use crate::config::BridgeConfig;
use crate::types::BlockShape;

/// Name of the compute dispatch thread
pub const DISPATCH_THREAD_NAME: &str = "jackbridge-dispatch";

/// State shared by every bridge thread
#[derive(Debug, Clone)]
pub struct BridgeContext {
    shape: BlockShape,
    lifecycle: Arc<Lifecycle>,
    stats: Arc<BridgeStats>,
}

impl BridgeContext {
    pub fn new(shape: BlockShape) -> Self {
        Self {
            shape,
            lifecycle: Arc::new(Lifecycle::new()),
            stats: Arc::new(BridgeStats::new()),
        }
    }

    pub fn shape(&self) -> BlockShape {
        self.shape
    }

    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    pub fn stats(&self) -> &BridgeStats {
        &self.stats
    }

    pub(crate) fn lifecycle_handle(&self) -> Arc<Lifecycle> {
        Arc::clone(&self.lifecycle)
    }

    pub(crate) fn stats_handle(&self) -> Arc<BridgeStats> {
        Arc::clone(&self.stats)
    }
}

/// Validate everything and allocate the rings
///
/// `backend_frames` is the backend's fixed cycle size. Every failure here is
/// reported before any audio flows.
pub fn configure<E: ComputeEngine>(
    config: &BridgeConfig,
    backend_frames: usize,
    mut engine: E,
) -> BridgeResult<ConfiguredBridge<E>> {
    config.validate()?;
    let frames = config.resolve_frames(backend_frames)?;
    let shape = BlockShape::new(frames, config.input_channels, config.output_channels);

    validate_engine(&mut engine, shape)?;

    let ctx = BridgeContext::new(shape);
    let bank = ChannelBank::new(shape, config.buffer_blocks)?;
    ctx.lifecycle().transition(BridgeState::Configured)?;

    log::info!(
        "Bridge configured: {} in / {} out, {} frames per cycle, ring capacity {} samples, engine '{}'",
        shape.inputs,
        shape.outputs,
        shape.frames,
        bank.ring_capacity(),
        engine.name()
    );

    Ok(ConfiguredBridge { ctx, bank, engine })
}

/// Rings allocated and engine accepted, nothing running yet
pub struct ConfiguredBridge<E> {
    ctx: BridgeContext,
    bank: ChannelBank,
    engine: E,
}

impl<E: ComputeEngine + 'static> ConfiguredBridge<E> {
    pub fn context(&self) -> &BridgeContext {
        &self.ctx
    }

    /// Per-channel ring capacity (power of two)
    pub fn ring_capacity(&self) -> usize {
        self.bank.ring_capacity()
    }

    /// Split the rings, enter `Running`, and spawn the dispatch thread
    ///
    /// The returned adapter belongs to the realtime callback; the
    /// [`RunningBridge`] stays with the caller.
    pub fn start(self) -> BridgeResult<(RealtimeAdapter, RunningBridge)> {
        let Self { ctx, bank, engine } = self;

        let (adapter_channels, dispatch_channels) = bank.split();
        let (event_tx, event_rx) = event_queue();
        let adapter = RealtimeAdapter::new(&ctx, adapter_channels, event_tx);
        let dispatch = DispatchLoop::new(&ctx, dispatch_channels, engine);

        ctx.lifecycle().transition(BridgeState::Running)?;

        let handle = thread::Builder::new()
            .name(DISPATCH_THREAD_NAME.to_string())
            .spawn(move || dispatch.run());

        let handle = match handle {
            Ok(handle) => handle,
            Err(e) => {
                ctx.lifecycle().request_shutdown();
                let _ = ctx.lifecycle().transition(BridgeState::Closed);
                return Err(BridgeError::DispatchThread(e.to_string()));
            }
        };

        log::info!("Bridge running");

        Ok((
            adapter,
            RunningBridge {
                ctx,
                dispatch: Some(handle),
                events: event_rx,
            },
        ))
    }

    /// Release the rings without ever running
    pub fn close(self) -> BridgeResult<()> {
        self.ctx.lifecycle().transition(BridgeState::Closed)
    }
}

/// Main-thread handle to a running bridge
///
/// Dropping it performs the same teardown as [`RunningBridge::shutdown`].
pub struct RunningBridge {
    ctx: BridgeContext,
    dispatch: Option<JoinHandle<DispatchSummary>>,
    events: EventReceiver,
}

impl RunningBridge {
    pub fn context(&self) -> &BridgeContext {
        &self.ctx
    }

    pub fn shape(&self) -> BlockShape {
        self.ctx.shape()
    }

    pub fn state(&self) -> BridgeState {
        self.ctx.lifecycle().state()
    }

    /// Shared lifecycle, for signal handlers and backend notifications
    pub fn lifecycle(&self) -> Arc<Lifecycle> {
        self.ctx.lifecycle_handle()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.ctx.stats().snapshot()
    }

    /// Events reported by the realtime side since the last call
    pub fn drain_events(&mut self) -> Vec<BridgeEvent> {
        self.events.drain()
    }

    /// Ask both threads to stop; returns false if already stopping
    pub fn request_shutdown(&self) -> bool {
        self.ctx.lifecycle().request_shutdown()
    }

    /// Stop, join the dispatch thread, and close
    pub fn shutdown(mut self) -> BridgeResult<DispatchSummary> {
        self.teardown()
    }

    fn teardown(&mut self) -> BridgeResult<DispatchSummary> {
        let lifecycle = self.ctx.lifecycle();
        lifecycle.request_shutdown();

        let joined = match self.dispatch.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| BridgeError::DispatchThread("dispatch thread panicked".to_string())),
            None => Err(BridgeError::InvalidTransition {
                from: lifecycle.state(),
                to: BridgeState::Closed,
            }),
        };

        if lifecycle.state() == BridgeState::ShuttingDown {
            lifecycle.transition(BridgeState::Closed)?;
        }

        let summary = joined?;
        let stats = self.ctx.stats().snapshot();
        log::info!(
            "Bridge closed: {} cycles, {} blocks, {} input overruns, {} output underruns",
            stats.cycles,
            summary.blocks,
            stats.input_overruns,
            stats.output_underruns
        );
        Ok(summary)
    }
}

impl Drop for RunningBridge {
    fn drop(&mut self) {
        if self.dispatch.is_some() {
            if let Err(e) = self.teardown() {
                log::warn!("Bridge teardown on drop failed: {}", e);
            }
        }
    }
}

impl std::fmt::Debug for RunningBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunningBridge")
            .field("shape", &self.ctx.shape())
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::adapter::{CycleOutcome, OwnedCycle};
    use crate::compute::{Gain, MixDown, Passthrough};
    use crate::types::MAX_BUFFER_BLOCKS;
    use std::time::{Duration, Instant};

    #[test]
    fn test_configure_adopts_backend_frames() {
        let config = BridgeConfig::with_channels(2, 2);
        let bridge = configure(&config, 128, Passthrough).unwrap();
        assert_eq!(bridge.context().shape(), BlockShape::new(128, 2, 2));
        assert_eq!(bridge.context().lifecycle().state(), BridgeState::Configured);
        assert_eq!(bridge.ring_capacity(), 512);
    }

    #[test]
    fn test_configure_rejects_mismatched_frames() {
        let config = BridgeConfig::with_channels(1, 1).with_frames(512);
        assert!(matches!(
            configure(&config, 256, Passthrough),
            Err(BridgeError::FrameCountMismatch { .. })
        ));
    }

    #[test]
    fn test_configure_rejects_oversized_buffer_depth() {
        let config = BridgeConfig::with_channels(1, 1).with_buffer_blocks(usize::MAX / 2);
        assert_eq!(
            configure(&config, 1024, Passthrough).err(),
            Some(BridgeError::InvalidBufferDepth {
                blocks: usize::MAX / 2,
                max: MAX_BUFFER_BLOCKS
            })
        );
    }

    #[test]
    fn test_configure_rejects_unfit_engine() {
        let config = BridgeConfig::with_channels(0, 2);
        assert!(matches!(
            configure(&config, 64, MixDown),
            Err(BridgeError::EngineRejected { .. })
        ));
        let config = BridgeConfig::with_channels(1, 1);
        assert!(configure(&config, 64, Gain::new(f32::NAN)).is_err());
    }

    #[test]
    fn test_close_without_start() {
        let bridge = configure(&BridgeConfig::with_channels(1, 0), 64, Passthrough).unwrap();
        let ctx = bridge.context().clone();
        bridge.close().unwrap();
        assert_eq!(ctx.lifecycle().state(), BridgeState::Closed);
    }

    #[test]
    fn test_shutdown_between_cycles() {
        let config = BridgeConfig::with_channels(1, 1).with_buffer_blocks(2);
        let (mut adapter, bridge) = configure(&config, 16, Passthrough)
            .unwrap()
            .start()
            .unwrap();
        assert_eq!(bridge.state(), BridgeState::Running);

        let mut io = OwnedCycle::new(16, 1, 1);
        adapter.process_cycle(16, &mut io).unwrap();

        let ctx = bridge.context().clone();
        let summary = bridge.shutdown().unwrap();
        assert_eq!(summary.engine, "passthrough");
        assert_eq!(ctx.lifecycle().state(), BridgeState::Closed);

        // Later cycles are silent and touch no ring
        io.inputs[0].fill(1.0);
        io.outputs[0].fill(1.0);
        assert_eq!(adapter.process_cycle(16, &mut io), Ok(CycleOutcome::Idle));
        assert!(io.outputs[0].iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_drop_joins_dispatch_thread() {
        let config = BridgeConfig::with_channels(1, 1);
        let (_adapter, bridge) = configure(&config, 32, Passthrough)
            .unwrap()
            .start()
            .unwrap();
        let ctx = bridge.context().clone();
        drop(bridge);
        assert_eq!(ctx.lifecycle().state(), BridgeState::Closed);
    }

    #[test]
    fn test_blocks_reach_outputs_through_dispatch_thread() {
        let config = BridgeConfig::with_channels(1, 1).with_buffer_blocks(4);
        let (mut adapter, mut bridge) = configure(&config, 8, Gain::new(2.0))
            .unwrap()
            .start()
            .unwrap();

        let mut io = OwnedCycle::new(8, 1, 1);
        io.inputs[0].fill(0.25);
        adapter.process_cycle(8, &mut io).unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            io.inputs[0].fill(0.25);
            if let Ok(CycleOutcome::Transferred { played: true, .. }) =
                adapter.process_cycle(8, &mut io)
            {
                break;
            }
            assert!(Instant::now() < deadline, "dispatch never produced a block");
            std::thread::sleep(Duration::from_millis(1));
        }
        assert!(io.outputs[0].iter().all(|&s| s == 0.5));
        assert!(bridge.drain_events().is_empty());
        assert!(bridge.stats().blocks_dispatched >= 1);
        bridge.shutdown().unwrap();
    }
}
