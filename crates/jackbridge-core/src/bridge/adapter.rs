//! Realtime adapter
//!
//! Runs inside the audio backend's per-cycle callback. Per cycle it:
//!
//! 1. copies every input port into the capture stage, then pushes the stage
//!    through the write-side gate (whole cycle dropped on overrun);
//! 2. pops one block through the read-side gate into the playback stage and
//!    copies it to every output port (whole cycle silent on underrun).
//!
//! No allocation, no locks, no logging, no call into the compute engine.
//! Both stages are allocated once in [`RealtimeAdapter::new`].

use std::sync::Arc;

use super::bank::AdapterChannels;
use super::error::{BridgeError, BridgeResult};
use super::events::{BridgeEvent, EventSender};
use super::lifecycle::Lifecycle;
use super::runtime::BridgeContext;
use super::stats::BridgeStats;
use crate::types::Sample;

/// Backend buffers for one cycle
///
/// Every slice returned must be exactly the cycle's frame count long.
pub trait CycleBuffers {
    /// Native buffer of input channel `channel`
    fn input(&self, channel: usize) -> &[Sample];
    /// Native buffer of output channel `channel`
    fn output(&mut self, channel: usize) -> &mut [Sample];
}

/// What one cycle did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Bridge running. `captured` is false on input overrun, `played` is
    /// false on output underrun (outputs were silenced).
    Transferred { captured: bool, played: bool },
    /// Bridge no longer running: outputs silenced, rings untouched
    Idle,
}

/// Realtime side of the bridge
pub struct RealtimeAdapter {
    channels: AdapterChannels,
    frames: usize,
    capture_stage: Vec<Sample>,
    playback_stage: Vec<Sample>,
    stats: Arc<BridgeStats>,
    lifecycle: Arc<Lifecycle>,
    events: EventSender,
    stop_reported: bool,
}

impl RealtimeAdapter {
    pub(crate) fn new(ctx: &BridgeContext, channels: AdapterChannels, events: EventSender) -> Self {
        let shape = ctx.shape();
        Self {
            channels,
            frames: shape.frames,
            capture_stage: vec![0.0; shape.input_samples()],
            playback_stage: vec![0.0; shape.output_samples()],
            stats: ctx.stats_handle(),
            lifecycle: ctx.lifecycle_handle(),
            events,
            stop_reported: false,
        }
    }

    /// Fixed frames per cycle
    pub fn frames_per_cycle(&self) -> usize {
        self.frames
    }

    pub fn input_count(&self) -> usize {
        self.channels.input_count()
    }

    pub fn output_count(&self) -> usize {
        self.channels.output_count()
    }

    /// Handle one backend cycle of `n_frames`
    ///
    /// A frame count other than the configured one is a protocol violation:
    /// it is counted, reported on the event queue, shutdown is requested, and
    /// the error is returned before any buffer is touched.
    pub fn process_cycle<B: CycleBuffers + ?Sized>(
        &mut self,
        n_frames: usize,
        io: &mut B,
    ) -> BridgeResult<CycleOutcome> {
        if n_frames != self.frames {
            return Err(self.report_frame_mismatch(n_frames));
        }

        if !self.lifecycle.is_running() {
            self.silence_outputs(io);
            if !self.stop_reported {
                self.stop_reported = true;
                self.events.send(BridgeEvent::Stopped);
            }
            return Ok(CycleOutcome::Idle);
        }

        let frames = self.frames;

        // Capture: ports -> stage -> gated push
        for (channel, stage) in self.capture_stage.chunks_exact_mut(frames).enumerate() {
            stage.copy_from_slice(io.input(channel));
        }
        let captured = match self.channels.push_input_block(&self.capture_stage) {
            Ok(()) => true,
            Err(_) => {
                BridgeStats::bump(&self.stats.input_overruns);
                false
            }
        };

        // Playback: gated pop -> stage -> ports, or silence
        let played = match self.channels.pop_output_block(&mut self.playback_stage) {
            Ok(()) => {
                for (channel, stage) in self.playback_stage.chunks_exact(frames).enumerate() {
                    io.output(channel).copy_from_slice(stage);
                }
                true
            }
            Err(_) => {
                BridgeStats::bump(&self.stats.output_underruns);
                self.silence_outputs(io);
                false
            }
        };

        BridgeStats::bump(&self.stats.cycles);
        Ok(CycleOutcome::Transferred { captured, played })
    }

    /// Record a cycle size other than the configured one
    ///
    /// Counts it, reports it on the event queue, and requests shutdown.
    /// Also used when the backend announces a new cycle size.
    pub fn report_frame_mismatch(&mut self, got: usize) -> BridgeError {
        BridgeStats::bump(&self.stats.protocol_violations);
        self.events.send(BridgeEvent::ProtocolViolation {
            expected: self.frames,
            got,
        });
        self.lifecycle.request_shutdown();
        BridgeError::ProtocolViolation {
            expected: self.frames,
            got,
        }
    }

    fn silence_outputs<B: CycleBuffers + ?Sized>(&self, io: &mut B) {
        for channel in 0..self.channels.output_count() {
            io.output(channel).fill(0.0);
        }
    }
}

impl std::fmt::Debug for RealtimeAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeAdapter")
            .field("frames", &self.frames)
            .field("channels", &self.channels)
            .finish()
    }
}

/// Owned per-channel buffers implementing [`CycleBuffers`]
///
/// Used by offline drivers and tests in place of a real backend.
#[derive(Debug, Clone)]
pub struct OwnedCycle {
    pub inputs: Vec<Vec<Sample>>,
    pub outputs: Vec<Vec<Sample>>,
}

impl OwnedCycle {
    /// Zeroed buffers for `inputs`/`outputs` channels of `frames` each
    pub fn new(frames: usize, inputs: usize, outputs: usize) -> Self {
        Self {
            inputs: vec![vec![0.0; frames]; inputs],
            outputs: vec![vec![0.0; frames]; outputs],
        }
    }
}

impl CycleBuffers for OwnedCycle {
    fn input(&self, channel: usize) -> &[Sample] {
        &self.inputs[channel]
    }

    fn output(&mut self, channel: usize) -> &mut [Sample] {
        &mut self.outputs[channel]
    }
}
