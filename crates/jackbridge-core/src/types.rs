//! Common types for jackbridge
//!
//! Sample type and the hard limits every buffer is sized against.

/// Audio sample type (32-bit float, the JACK native format)
pub type Sample = f32;

/// Maximum number of channels per direction
pub const MAX_CHANNELS: usize = 64;

/// Maximum frames per audio cycle
pub const MAX_FRAMES: usize = 16384;

/// Default ring depth, in blocks of `frames_per_cycle`
pub const DEFAULT_BUFFER_BLOCKS: usize = 4;

/// Maximum ring depth, in blocks
pub const MAX_BUFFER_BLOCKS: usize = 256;

/// Fixed shape of one transfer block
///
/// Every channel of a direction advances by exactly `frames` per block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockShape {
    /// Frames per cycle
    pub frames: usize,
    /// Input channel count
    pub inputs: usize,
    /// Output channel count
    pub outputs: usize,
}

impl BlockShape {
    pub fn new(frames: usize, inputs: usize, outputs: usize) -> Self {
        Self {
            frames,
            inputs,
            outputs,
        }
    }

    /// Samples in one channel-major input block (`frames * inputs`)
    #[inline]
    pub fn input_samples(&self) -> usize {
        self.frames * self.inputs
    }

    /// Samples in one channel-major output block (`frames * outputs`)
    #[inline]
    pub fn output_samples(&self) -> usize {
        self.frames * self.outputs
    }
}

/// Channel direction, used for port naming and diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Input,
    Output,
}

impl Direction {
    /// Port name prefix for this direction
    pub fn port_prefix(&self) -> &'static str {
        match self {
            Direction::Input => "in",
            Direction::Output => "out",
        }
    }

    /// Port name for a zero-based channel index (`in_01`, `out_12`, ...)
    pub fn port_name(&self, channel: usize) -> String {
        format!("{}_{:02}", self.port_prefix(), channel + 1)
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Input => write!(f, "input"),
            Direction::Output => write!(f, "output"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_names_are_one_based_and_padded() {
        assert_eq!(Direction::Input.port_name(0), "in_01");
        assert_eq!(Direction::Output.port_name(11), "out_12");
        assert_eq!(Direction::Output.port_name(63), "out_64");
    }
}
