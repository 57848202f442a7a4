//! Channel bank: one ring per input channel and one per output channel
//!
//! Allocated once at configure time, then split by thread ownership:
//!
//! ```text
//!                 input rings                      output rings
//! ┌────────────┐  producer ──────► consumer  ┌──────────────┐
//! │  Realtime  │                             │   Dispatch   │
//! │  adapter   │  consumer ◄────── producer  │   loop       │
//! └────────────┘                             └──────────────┘
//!  AdapterChannels                            DispatchChannels
//! ```
//!
//! Each half exposes the all-channels levels its owner gates on.

use super::error::{BridgeError, BridgeResult};
use super::gate::{self, BlockRejected};
use crate::ringbuf::{sample_ring, RingConsumer, RingLevels, RingProducer};
use crate::types::{BlockShape, Sample, MAX_BUFFER_BLOCKS};

/// Every ring of the bridge, before ownership is split
pub struct ChannelBank {
    shape: BlockShape,
    ring_capacity: usize,
    input_tx: Vec<RingProducer>,
    input_rx: Vec<RingConsumer>,
    output_tx: Vec<RingProducer>,
    output_rx: Vec<RingConsumer>,
}

impl ChannelBank {
    /// Allocate rings for `shape`, each holding at least `buffer_blocks` blocks
    ///
    /// Fails without allocating if the depth is outside
    /// `1..=MAX_BUFFER_BLOCKS` or the ring size would overflow.
    pub fn new(shape: BlockShape, buffer_blocks: usize) -> BridgeResult<Self> {
        let requested = (1..=MAX_BUFFER_BLOCKS)
            .contains(&buffer_blocks)
            .then(|| shape.frames.checked_mul(buffer_blocks))
            .flatten()
            .filter(|samples| samples.checked_next_power_of_two().is_some())
            .ok_or(BridgeError::InvalidBufferDepth {
                blocks: buffer_blocks,
                max: MAX_BUFFER_BLOCKS,
            })?;

        let (input_tx, input_rx): (Vec<_>, Vec<_>) =
            (0..shape.inputs).map(|_| sample_ring(requested)).unzip();
        let (output_tx, output_rx): (Vec<_>, Vec<_>) =
            (0..shape.outputs).map(|_| sample_ring(requested)).unzip();

        Ok(Self {
            shape,
            ring_capacity: crate::ringbuf::ring_capacity_for(requested),
            input_tx,
            input_rx,
            output_tx,
            output_rx,
        })
    }

    /// Block shape the bank was sized for
    pub fn shape(&self) -> BlockShape {
        self.shape
    }

    /// Per-channel ring capacity (power of two)
    pub fn ring_capacity(&self) -> usize {
        self.ring_capacity
    }

    /// Minimum readable count across input channels
    pub fn min_input_readable(&self) -> usize {
        gate::min_readable(&self.input_rx)
    }

    /// Minimum writable count across output channels
    pub fn min_output_writable(&self) -> usize {
        gate::min_writable(&self.output_tx)
    }

    /// Split into the realtime half and the dispatch half
    pub fn split(self) -> (AdapterChannels, DispatchChannels) {
        (
            AdapterChannels {
                frames: self.shape.frames,
                inputs: self.input_tx,
                outputs: self.output_rx,
            },
            DispatchChannels {
                frames: self.shape.frames,
                inputs: self.input_rx,
                outputs: self.output_tx,
            },
        )
    }
}

/// Ring ends owned by the realtime adapter
///
/// Produces into the input rings, consumes from the output rings.
pub struct AdapterChannels {
    frames: usize,
    inputs: Vec<RingProducer>,
    outputs: Vec<RingConsumer>,
}

impl AdapterChannels {
    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    pub fn output_count(&self) -> usize {
        self.outputs.len()
    }

    /// Minimum writable count across input channels
    pub fn min_input_writable(&self) -> usize {
        gate::min_writable(&self.inputs)
    }

    /// Minimum readable count across output channels
    pub fn min_output_readable(&self) -> usize {
        gate::min_readable(&self.outputs)
    }

    /// Write end of one input channel
    pub fn input_ring(&mut self, channel: usize) -> Option<&mut RingProducer> {
        self.inputs.get_mut(channel)
    }

    /// Read end of one output channel
    pub fn output_ring(&mut self, channel: usize) -> Option<&mut RingConsumer> {
        self.outputs.get_mut(channel)
    }

    /// Gated push of a channel-major captured block into every input ring
    #[inline]
    pub fn push_input_block(&mut self, stage: &[Sample]) -> Result<(), BlockRejected> {
        gate::push_block(&mut self.inputs, stage, self.frames)
    }

    /// Gated pop of a channel-major block from every output ring
    #[inline]
    pub fn pop_output_block(&mut self, stage: &mut [Sample]) -> Result<(), BlockRejected> {
        gate::pop_block(&mut self.outputs, stage, self.frames)
    }
}

/// Ring ends owned by the compute dispatch loop
///
/// Consumes from the input rings, produces into the output rings.
pub struct DispatchChannels {
    frames: usize,
    inputs: Vec<RingConsumer>,
    outputs: Vec<RingProducer>,
}

impl DispatchChannels {
    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    pub fn output_count(&self) -> usize {
        self.outputs.len()
    }

    /// Minimum readable count across input channels
    pub fn min_input_readable(&self) -> usize {
        gate::min_readable(&self.inputs)
    }

    /// Minimum writable count across output channels
    pub fn min_output_writable(&self) -> usize {
        gate::min_writable(&self.outputs)
    }

    /// Whether a full block can be popped from every input and pushed to every output
    #[inline]
    pub fn block_ready(&self) -> bool {
        self.min_input_readable() >= self.frames && self.min_output_writable() >= self.frames
    }

    /// Read end of one input channel
    pub fn input_ring(&mut self, channel: usize) -> Option<&mut RingConsumer> {
        self.inputs.get_mut(channel)
    }

    /// Write end of one output channel
    pub fn output_ring(&mut self, channel: usize) -> Option<&mut RingProducer> {
        self.outputs.get_mut(channel)
    }

    /// Gated pop of one block from every input ring (channel-major)
    #[inline]
    pub fn pop_input_block(&mut self, stage: &mut [Sample]) -> Result<(), BlockRejected> {
        gate::pop_block(&mut self.inputs, stage, self.frames)
    }

    /// Gated push of one channel-major block into every output ring
    #[inline]
    pub fn push_output_block(&mut self, stage: &[Sample]) -> Result<(), BlockRejected> {
        gate::push_block(&mut self.outputs, stage, self.frames)
    }
}

impl std::fmt::Debug for AdapterChannels {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterChannels")
            .field("frames", &self.frames)
            .field("inputs", &self.inputs.len())
            .field("outputs", &self.outputs.len())
            .finish()
    }
}

impl std::fmt::Debug for DispatchChannels {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchChannels")
            .field("frames", &self.frames)
            .field("inputs", &self.inputs.len())
            .field("outputs", &self.outputs.len())
            .finish()
    }
}
