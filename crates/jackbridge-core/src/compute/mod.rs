//! Compute engines
//!
//! A compute engine is the best-effort stage behind the bridge: it receives
//! one frame-major input block and fills one frame-major output block, once
//! per dispatched block, on the dispatch thread. It may take as long as it
//! likes; if it is too slow the rings saturate and the overrun/underrun
//! counters climb.
//!
//! Engines are checked once before the bridge starts running
//! ([`ComputeEngine::prepare`]), never per block.
//!
//! # Example
//!
//! ```ignore
//! use jackbridge_core::compute::{FnEngine, FrameMatrix};
//!
//! let invert = FnEngine::new("invert", |input: &FrameMatrix, output: &mut FrameMatrix| {
//!     for (o, i) in output.as_mut_slice().iter_mut().zip(input.as_slice()) {
//!         *o = -*i;
//!     }
//! });
//! ```

mod builtin;
mod matrix;

pub use builtin::{Gain, MixDown, Passthrough, Silence};
pub use matrix::FrameMatrix;

use crate::bridge::{BridgeError, BridgeResult};
use crate::config::EngineConfig;
use crate::types::BlockShape;

/// Names accepted by [`engine_from_config`]
pub const ENGINE_NAMES: [&str; 4] = ["passthrough", "gain", "mixdown", "silence"];

/// Block-processing stage run on the dispatch thread
pub trait ComputeEngine: Send {
    /// Name used in diagnostics
    fn name(&self) -> &str;

    /// Capability check for the block shape, run once while configuring
    ///
    /// Returning `Err` aborts startup.
    fn prepare(&mut self, _shape: BlockShape) -> Result<(), String> {
        Ok(())
    }

    /// Process one block
    ///
    /// `input` is `frames × inputs`; `output` is `frames × outputs` and is
    /// zeroed before every call.
    fn process(&mut self, input: &FrameMatrix, output: &mut FrameMatrix);
}

impl<E: ComputeEngine + ?Sized> ComputeEngine for Box<E> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn prepare(&mut self, shape: BlockShape) -> Result<(), String> {
        (**self).prepare(shape)
    }

    fn process(&mut self, input: &FrameMatrix, output: &mut FrameMatrix) {
        (**self).process(input, output)
    }
}

/// Engine backed by a closure
pub struct FnEngine<F> {
    name: String,
    func: F,
}

impl<F> FnEngine<F>
where
    F: FnMut(&FrameMatrix, &mut FrameMatrix) + Send,
{
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F> ComputeEngine for FnEngine<F>
where
    F: FnMut(&FrameMatrix, &mut FrameMatrix) + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn process(&mut self, input: &FrameMatrix, output: &mut FrameMatrix) {
        (self.func)(input, output)
    }
}

/// Look up a built-in engine by its configured name
pub fn engine_from_config(config: &EngineConfig) -> BridgeResult<Box<dyn ComputeEngine>> {
    let engine: Box<dyn ComputeEngine> = match config.name.as_str() {
        "passthrough" => Box::new(Passthrough),
        "gain" => Box::new(Gain::new(config.gain)),
        "mixdown" => Box::new(MixDown),
        "silence" => Box::new(Silence),
        other => {
            return Err(BridgeError::EngineMissing {
                name: other.to_string(),
            })
        }
    };
    Ok(engine)
}

/// Run the engine's capability check, mapping refusal to a startup error
pub(crate) fn validate_engine<E: ComputeEngine + ?Sized>(
    engine: &mut E,
    shape: BlockShape,
) -> BridgeResult<()> {
    engine
        .prepare(shape)
        .map_err(|reason| BridgeError::EngineRejected {
            name: engine.name().to_string(),
            reason,
        })
}
