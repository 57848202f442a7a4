//! Bridge configuration
//!
//! Consumed once at startup. Values come from an optional YAML file and are
//! then overridden by command-line flags in the binary.
//!
//! # Usage
//!
//! ```ignore
//! use jackbridge_core::config::{default_config_path, load_config, BridgeConfig};
//!
//! let mut config: BridgeConfig = load_config(&default_config_path());
//! config.input_channels = 2;
//! config.validate()?;
//! let frames = config.resolve_frames(backend_buffer_size)?;
//! ```

mod io;
mod paths;

pub use io::load_config;
pub use paths::{default_config_dir, default_config_path};

use serde::{Deserialize, Serialize};

use crate::bridge::{BridgeError, BridgeResult};
use crate::types::{Direction, DEFAULT_BUFFER_BLOCKS, MAX_BUFFER_BLOCKS, MAX_CHANNELS, MAX_FRAMES};

/// Default JACK client name
pub const DEFAULT_CLIENT_NAME: &str = "jackbridge";

/// Which compute engine to run and its parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Engine name (see [`crate::compute::ENGINE_NAMES`])
    pub name: String,
    /// Linear gain, used by the `gain` engine
    pub gain: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            name: "passthrough".to_string(),
            gain: 1.0,
        }
    }
}

/// Configuration for one bridge instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Backend client name (the server may make it unique)
    pub client_name: String,

    /// Number of input channels (0..=64)
    pub input_channels: usize,

    /// Number of output channels (0..=64)
    pub output_channels: usize,

    /// Frames per block
    /// None = adopt the backend's cycle size
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frames_per_cycle: Option<usize>,

    /// Ring depth per channel, in blocks
    pub buffer_blocks: usize,

    /// Client whose outputs are auto-connected to our inputs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_connect: Option<String>,

    /// Client whose inputs are auto-connected to our outputs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_connect: Option<String>,

    /// Compute engine selection
    pub engine: EngineConfig,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            client_name: DEFAULT_CLIENT_NAME.to_string(),
            input_channels: 0,
            output_channels: 0,
            frames_per_cycle: None,
            buffer_blocks: DEFAULT_BUFFER_BLOCKS,
            input_connect: None,
            output_connect: None,
            engine: EngineConfig::default(),
        }
    }
}

impl BridgeConfig {
    /// Create config with the given channel counts
    pub fn with_channels(inputs: usize, outputs: usize) -> Self {
        Self {
            input_channels: inputs,
            output_channels: outputs,
            ..Default::default()
        }
    }

    /// Set a fixed block size in frames
    pub fn with_frames(mut self, frames: usize) -> Self {
        self.frames_per_cycle = Some(frames);
        self
    }

    /// Set the ring depth in blocks
    pub fn with_buffer_blocks(mut self, blocks: usize) -> Self {
        self.buffer_blocks = blocks;
        self
    }

    /// Select the compute engine
    pub fn with_engine(mut self, engine: EngineConfig) -> Self {
        self.engine = engine;
        self
    }

    /// Check channel counts, frame range, and buffer depth
    pub fn validate(&self) -> BridgeResult<()> {
        if self.input_channels == 0 && self.output_channels == 0 {
            return Err(BridgeError::NoChannels);
        }
        for (direction, requested) in [
            (Direction::Input, self.input_channels),
            (Direction::Output, self.output_channels),
        ] {
            if requested > MAX_CHANNELS {
                return Err(BridgeError::TooManyChannels {
                    direction,
                    requested,
                    max: MAX_CHANNELS,
                });
            }
        }
        if let Some(frames) = self.frames_per_cycle {
            check_frame_range(frames)?;
        }
        if !(1..=MAX_BUFFER_BLOCKS).contains(&self.buffer_blocks) {
            return Err(BridgeError::InvalidBufferDepth {
                blocks: self.buffer_blocks,
                max: MAX_BUFFER_BLOCKS,
            });
        }
        Ok(())
    }

    /// Frames per cycle given the backend's fixed cycle size
    ///
    /// An unset value adopts the backend's; a set value must equal it.
    pub fn resolve_frames(&self, backend_frames: usize) -> BridgeResult<usize> {
        check_frame_range(backend_frames)?;
        match self.frames_per_cycle {
            None => Ok(backend_frames),
            Some(configured) if configured == backend_frames => Ok(configured),
            Some(configured) => Err(BridgeError::FrameCountMismatch {
                configured,
                backend: backend_frames,
            }),
        }
    }
}

fn check_frame_range(frames: usize) -> BridgeResult<()> {
    if (1..=MAX_FRAMES).contains(&frames) {
        Ok(())
    } else {
        Err(BridgeError::InvalidFrameCount {
            frames,
            max: MAX_FRAMES,
        })
    }
}
