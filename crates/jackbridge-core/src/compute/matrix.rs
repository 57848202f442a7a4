//! Frame-major sample matrix handed to compute engines

use crate::types::Sample;

/// Contiguous `frames × channels` matrix, frame-major
///
/// Sample `(frame, channel)` lives at `frame * channels + channel`, so one
/// frame is a contiguous slice across all channels.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameMatrix {
    data: Vec<Sample>,
    frames: usize,
    channels: usize,
}

impl FrameMatrix {
    /// Zero-filled matrix
    pub fn zeros(frames: usize, channels: usize) -> Self {
        Self {
            data: vec![0.0; frames * channels],
            frames,
            channels,
        }
    }

    /// Build from frame-major data
    ///
    /// Returns `None` if `data.len() != frames * channels`.
    pub fn from_frame_major(data: Vec<Sample>, frames: usize, channels: usize) -> Option<Self> {
        (data.len() == frames * channels).then_some(Self {
            data,
            frames,
            channels,
        })
    }

    #[inline]
    pub fn frames(&self) -> usize {
        self.frames
    }

    #[inline]
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Sample at `(frame, channel)`
    #[inline]
    pub fn get(&self, frame: usize, channel: usize) -> Sample {
        self.data[frame * self.channels + channel]
    }

    /// Set sample at `(frame, channel)`
    #[inline]
    pub fn set(&mut self, frame: usize, channel: usize, value: Sample) {
        self.data[frame * self.channels + channel] = value;
    }

    /// All channels of one frame
    #[inline]
    pub fn frame(&self, frame: usize) -> &[Sample] {
        let start = frame * self.channels;
        &self.data[start..start + self.channels]
    }

    /// All channels of one frame (mutable)
    #[inline]
    pub fn frame_mut(&mut self, frame: usize) -> &mut [Sample] {
        let start = frame * self.channels;
        &mut self.data[start..start + self.channels]
    }

    /// Iterate over frames
    pub fn iter_frames(&self) -> impl Iterator<Item = &[Sample]> {
        // chunks_exact(0) would panic; a zero-channel matrix has no samples anyway
        self.data.chunks_exact(self.channels.max(1))
    }

    #[inline]
    pub fn as_slice(&self) -> &[Sample] {
        &self.data
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [Sample] {
        &mut self.data
    }

    /// Overwrite every sample
    #[inline]
    pub fn fill(&mut self, value: Sample) {
        self.data.fill(value);
    }

    /// Scatter a channel-major block into this matrix
    pub(crate) fn load_channel_major(&mut self, stage: &[Sample]) {
        debug_assert_eq!(stage.len(), self.data.len());
        if self.frames == 0 {
            return;
        }
        for (channel, samples) in stage.chunks_exact(self.frames).enumerate() {
            for (frame, &sample) in samples.iter().enumerate() {
                self.data[frame * self.channels + channel] = sample;
            }
        }
    }

    /// Gather this matrix into a channel-major block
    pub(crate) fn store_channel_major(&self, stage: &mut [Sample]) {
        debug_assert_eq!(stage.len(), self.data.len());
        if self.frames == 0 {
            return;
        }
        for (channel, samples) in stage.chunks_exact_mut(self.frames).enumerate() {
            for (frame, sample) in samples.iter_mut().enumerate() {
                *sample = self.data[frame * self.channels + channel];
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_major_layout() {
        let mut m = FrameMatrix::zeros(3, 2);
        m.set(1, 0, 10.0);
        m.set(1, 1, 11.0);
        assert_eq!(m.frame(1), &[10.0, 11.0]);
        assert_eq!(m.as_slice(), &[0.0, 0.0, 10.0, 11.0, 0.0, 0.0]);
    }

    #[test]
    fn test_channel_major_conversion() {
        // Two channels of three frames: ch0 = 1,2,3 ; ch1 = 4,5,6
        let stage = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let mut m = FrameMatrix::zeros(3, 2);
        m.load_channel_major(&stage);
        assert_eq!(m.as_slice(), &[1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);

        let mut back = [0.0; 6];
        m.store_channel_major(&mut back);
        assert_eq!(back, stage);
    }

    #[test]
    fn test_from_frame_major_checks_length() {
        assert!(FrameMatrix::from_frame_major(vec![0.0; 5], 2, 2).is_none());
        let m = FrameMatrix::from_frame_major(vec![1.0, 2.0, 3.0, 4.0], 2, 2).unwrap();
        assert_eq!(m.get(1, 0), 3.0);
    }

    #[test]
    fn test_zero_channel_matrix_has_no_frames_to_iterate() {
        let m = FrameMatrix::zeros(16, 0);
        assert_eq!(m.iter_frames().count(), 0);
    }
}
