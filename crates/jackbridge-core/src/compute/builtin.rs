//! Built-in compute engines

use super::{ComputeEngine, FrameMatrix};
use crate::types::{BlockShape, Sample};

/// Input channel `c` to output channel `c`; outputs without a matching input stay silent
#[derive(Debug, Default, Clone)]
pub struct Passthrough;

impl ComputeEngine for Passthrough {
    fn name(&self) -> &str {
        "passthrough"
    }

    fn process(&mut self, input: &FrameMatrix, output: &mut FrameMatrix) {
        let shared = input.channels().min(output.channels());
        for frame in 0..input.frames() {
            output.frame_mut(frame)[..shared].copy_from_slice(&input.frame(frame)[..shared]);
        }
    }
}

/// Passthrough scaled by a constant factor
#[derive(Debug, Clone)]
pub struct Gain {
    gain: Sample,
}

impl Gain {
    pub fn new(gain: Sample) -> Self {
        Self { gain }
    }
}

impl ComputeEngine for Gain {
    fn name(&self) -> &str {
        "gain"
    }

    fn prepare(&mut self, _shape: BlockShape) -> Result<(), String> {
        if self.gain.is_finite() {
            Ok(())
        } else {
            Err(format!("gain must be finite, got {}", self.gain))
        }
    }

    fn process(&mut self, input: &FrameMatrix, output: &mut FrameMatrix) {
        let shared = input.channels().min(output.channels());
        for frame in 0..input.frames() {
            let src = &input.frame(frame)[..shared];
            for (o, &i) in output.frame_mut(frame)[..shared].iter_mut().zip(src) {
                *o = i * self.gain;
            }
        }
    }
}

/// Mean of all inputs written to every output
#[derive(Debug, Default, Clone)]
pub struct MixDown;

impl ComputeEngine for MixDown {
    fn name(&self) -> &str {
        "mixdown"
    }

    fn prepare(&mut self, shape: BlockShape) -> Result<(), String> {
        if shape.inputs == 0 {
            return Err("mixdown needs at least one input channel".to_string());
        }
        Ok(())
    }

    fn process(&mut self, input: &FrameMatrix, output: &mut FrameMatrix) {
        let scale = 1.0 / input.channels().max(1) as Sample;
        for frame in 0..input.frames() {
            let mean = input.frame(frame).iter().sum::<Sample>() * scale;
            output.frame_mut(frame).fill(mean);
        }
    }
}

/// Leaves the (pre-zeroed) output untouched
#[derive(Debug, Default, Clone)]
pub struct Silence;

impl ComputeEngine for Silence {
    fn name(&self) -> &str {
        "silence"
    }

    fn process(&mut self, _input: &FrameMatrix, _output: &mut FrameMatrix) {}
}
