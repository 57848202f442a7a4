//! Compute dispatch loop
//!
//! Runs on its own thread. Each iteration checks the gate for a full block on
//! every input ring and room for a full block on every output ring; only when
//! both hold does it pop, run the compute engine, and push. Otherwise it
//! backs off (spin, then yield) and retries until the bridge stops running.

use std::sync::Arc;

use crossbeam::utils::Backoff;

use super::bank::DispatchChannels;
use super::lifecycle::Lifecycle;
use super::runtime::BridgeContext;
use super::stats::BridgeStats;
use crate::compute::{ComputeEngine, FrameMatrix};
use crate::types::{BlockShape, Sample};

/// Result of one dispatch attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchPoll {
    /// One block went through the engine on every channel
    Dispatched,
    /// Gate closed; levels observed at the check
    NotReady {
        input_readable: usize,
        output_writable: usize,
    },
}

/// What the dispatch thread did over its lifetime
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchSummary {
    pub engine: String,
    pub blocks: u64,
    pub stalls: u64,
}

/// Dispatch side of the bridge
pub struct DispatchLoop<E> {
    channels: DispatchChannels,
    engine: E,
    shape: BlockShape,
    input_stage: Vec<Sample>,
    output_stage: Vec<Sample>,
    input: FrameMatrix,
    output: FrameMatrix,
    stats: Arc<BridgeStats>,
    lifecycle: Arc<Lifecycle>,
}

impl<E: ComputeEngine> DispatchLoop<E> {
    pub(crate) fn new(ctx: &BridgeContext, channels: DispatchChannels, engine: E) -> Self {
        let shape = ctx.shape();
        Self {
            channels,
            engine,
            shape,
            input_stage: vec![0.0; shape.input_samples()],
            output_stage: vec![0.0; shape.output_samples()],
            input: FrameMatrix::zeros(shape.frames, shape.inputs),
            output: FrameMatrix::zeros(shape.frames, shape.outputs),
            stats: ctx.stats_handle(),
            lifecycle: ctx.lifecycle_handle(),
        }
    }

    /// Try to move exactly one block through the engine
    pub fn poll_once(&mut self) -> DispatchPoll {
        let frames = self.shape.frames;
        let input_readable = self.channels.min_input_readable();
        let output_writable = self.channels.min_output_writable();
        if input_readable < frames || output_writable < frames {
            BridgeStats::bump(&self.stats.dispatch_stalls);
            return DispatchPoll::NotReady {
                input_readable,
                output_writable,
            };
        }

        // Sole consumer of the input rings and sole producer of the output
        // rings: the levels checked above can only have improved.
        if self.channels.pop_input_block(&mut self.input_stage).is_err() {
            return DispatchPoll::NotReady {
                input_readable,
                output_writable,
            };
        }
        self.input.load_channel_major(&self.input_stage);

        self.output.fill(0.0);
        self.engine.process(&self.input, &mut self.output);
        self.output.store_channel_major(&mut self.output_stage);

        if self.channels.push_output_block(&self.output_stage).is_err() {
            return DispatchPoll::NotReady {
                input_readable,
                output_writable,
            };
        }

        BridgeStats::bump(&self.stats.blocks_dispatched);
        DispatchPoll::Dispatched
    }

    /// Loop until the bridge leaves `Running`
    pub fn run(mut self) -> DispatchSummary {
        log::info!(
            "[DISPATCH] Started: engine '{}', {} frames, {} in / {} out",
            self.engine.name(),
            self.shape.frames,
            self.shape.inputs,
            self.shape.outputs
        );

        let backoff = Backoff::new();
        let mut blocks = 0u64;
        let mut stalls = 0u64;

        while self.lifecycle.is_running() {
            match self.poll_once() {
                DispatchPoll::Dispatched => {
                    blocks += 1;
                    backoff.reset();
                }
                DispatchPoll::NotReady { .. } => {
                    stalls += 1;
                    backoff.snooze();
                }
            }
        }

        log::info!(
            "[DISPATCH] Stopped after {} blocks ({} stalled polls)",
            blocks,
            stalls
        );

        DispatchSummary {
            engine: self.engine.name().to_string(),
            blocks,
            stalls,
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::bank::{AdapterChannels, ChannelBank};
    use crate::bridge::lifecycle::BridgeState;
    use crate::compute::{FnEngine, Passthrough};

    fn running(shape: BlockShape, blocks: usize) -> (AdapterChannels, DispatchChannels, BridgeContext) {
        let ctx = BridgeContext::new(shape);
        ctx.lifecycle().transition(BridgeState::Configured).unwrap();
        ctx.lifecycle().transition(BridgeState::Running).unwrap();
        let (a, d) = ChannelBank::new(shape, blocks).unwrap().split();
        (a, d, ctx)
    }

    #[test]
    fn test_lagging_input_channel_blocks_dispatch() {
        // Two inputs, 256-frame blocks: channel 0 has 256, channel 1 has 200
        let shape = BlockShape::new(256, 2, 1);
        let (mut adapter, channels, ctx) = running(shape, 4);
        adapter.input_ring(0).unwrap().try_write(&[0.1; 256]).unwrap();
        adapter.input_ring(1).unwrap().try_write(&[0.2; 200]).unwrap();

        let mut dispatch = DispatchLoop::new(&ctx, channels, Passthrough);
        let before = ctx.stats().snapshot();

        assert_eq!(
            dispatch.poll_once(),
            DispatchPoll::NotReady {
                input_readable: 200,
                output_writable: 1024
            }
        );

        // Nothing consumed, nothing produced, no xrun counted
        let after = ctx.stats().snapshot();
        assert_eq!(adapter.min_output_readable(), 0);
        assert_eq!(adapter.min_input_writable(), 1024 - 256);
        assert_eq!(after.input_overruns, before.input_overruns);
        assert_eq!(after.output_underruns, before.output_underruns);
        assert_eq!(after.blocks_dispatched, 0);
        assert_eq!(after.dispatch_stalls, 1);
    }

    #[test]
    fn test_full_output_rings_block_dispatch() {
        let shape = BlockShape::new(4, 1, 1);
        let (mut adapter, channels, ctx) = running(shape, 1);
        adapter.push_input_block(&[1.0; 4]).unwrap();

        let mut dispatch = DispatchLoop::new(&ctx, channels, Passthrough);
        assert_eq!(dispatch.poll_once(), DispatchPoll::Dispatched);

        adapter.push_input_block(&[2.0; 4]).unwrap();
        assert_eq!(
            dispatch.poll_once(),
            DispatchPoll::NotReady {
                input_readable: 4,
                output_writable: 0
            }
        );
    }

    #[test]
    fn test_engine_sees_frame_major_block() {
        let shape = BlockShape::new(2, 2, 2);
        let (mut adapter, channels, ctx) = running(shape, 2);
        adapter.push_input_block(&[1.0, 2.0, 10.0, 20.0]).unwrap();

        let engine = FnEngine::new("swap", |input: &FrameMatrix, output: &mut FrameMatrix| {
            assert_eq!(input.as_slice(), &[1.0, 10.0, 2.0, 20.0]);
            assert!(output.as_slice().iter().all(|&s| s == 0.0));
            for f in 0..input.frames() {
                output.set(f, 0, input.get(f, 1));
                output.set(f, 1, input.get(f, 0));
            }
        });
        let mut dispatch = DispatchLoop::new(&ctx, channels, engine);
        assert_eq!(dispatch.poll_once(), DispatchPoll::Dispatched);

        let mut stage = [0.0; 4];
        adapter.pop_output_block(&mut stage).unwrap();
        assert_eq!(stage, [10.0, 20.0, 1.0, 2.0]);
        assert_eq!(ctx.stats().snapshot().blocks_dispatched, 1);
    }

    #[test]
    fn test_output_is_zeroed_between_blocks() {
        let shape = BlockShape::new(2, 1, 1);
        let (mut adapter, channels, ctx) = running(shape, 2);
        adapter.push_input_block(&[1.0, 1.0]).unwrap();
        adapter.push_input_block(&[1.0, 1.0]).unwrap();

        let mut first = true;
        let engine = FnEngine::new("first-only", move |_: &FrameMatrix, output: &mut FrameMatrix| {
            if first {
                output.fill(7.0);
                first = false;
            }
        });
        let mut dispatch = DispatchLoop::new(&ctx, channels, engine);
        dispatch.poll_once();
        dispatch.poll_once();

        let mut stage = [0.0; 2];
        adapter.pop_output_block(&mut stage).unwrap();
        assert_eq!(stage, [7.0, 7.0]);
        adapter.pop_output_block(&mut stage).unwrap();
        assert_eq!(stage, [0.0, 0.0]);
    }

    #[test]
    fn test_run_returns_once_shutdown_requested() {
        let shape = BlockShape::new(8, 0, 1);
        let (_adapter, channels, ctx) = running(shape, 2);
        ctx.lifecycle().request_shutdown();

        let summary = DispatchLoop::new(&ctx, channels, Passthrough).run();
        assert_eq!(summary.engine, "passthrough");
        assert_eq!(summary.blocks, 0);
    }
}
