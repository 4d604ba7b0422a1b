//! Interleaved multi-channel sample buffer

/// Dense interleaved audio buffer
///
/// Samples are normalized f32 values in the range -1.0 to 1.0 and are
/// addressed by `(frame, channel)` with `index = frame * channels + channel`.
/// Sampling rate and channel count are fixed at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    samples: Vec<f32>,
    frame_count: usize,
    sampling_rate: u32,
    channel_count: u16,
}

impl AudioBuffer {
    /// Allocate a zero-filled buffer
    pub fn new(frames: usize, sampling_rate: u32, channels: u16) -> Self {
        Self {
            samples: vec![0.0; frames * channels as usize],
            frame_count: frames,
            sampling_rate,
            channel_count: channels,
        }
    }

    /// Wrap existing interleaved samples
    ///
    /// Trailing samples that do not form a complete frame are dropped.
    pub fn from_interleaved(mut samples: Vec<f32>, sampling_rate: u32, channels: u16) -> Self {
        let frame_count = if channels == 0 {
            0
        } else {
            samples.len() / channels as usize
        };
        samples.truncate(frame_count * channels as usize);

        Self {
            samples,
            frame_count,
            sampling_rate,
            channel_count: channels,
        }
    }

    /// Sample at `(frame, channel)`
    ///
    /// Panics if the position is outside the buffer.
    #[inline]
    pub fn sample(&self, frame: usize, channel: usize) -> f32 {
        self.samples[self.index(frame, channel)]
    }

    /// Mutable reference to the sample at `(frame, channel)`
    #[inline]
    pub fn sample_mut(&mut self, frame: usize, channel: usize) -> &mut f32 {
        let index = self.index(frame, channel);
        &mut self.samples[index]
    }

    #[inline]
    fn index(&self, frame: usize, channel: usize) -> usize {
        debug_assert!(channel < self.channel_count as usize);
        frame * self.channel_count as usize + channel
    }

    /// Iterate over one channel's samples in frame order
    pub fn channel(&self, channel: usize) -> impl Iterator<Item = f32> + '_ {
        self.samples
            .iter()
            .skip(channel)
            .step_by(self.channel_count.max(1) as usize)
            .copied()
    }

    /// Interleaved sample data
    pub fn data(&self) -> &[f32] {
        &self.samples
    }

    /// Mutable interleaved sample data
    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.samples
    }

    /// Number of frames
    pub fn frames(&self) -> usize {
        self.frame_count
    }

    /// Sampling rate in Hz
    pub fn rate(&self) -> u32 {
        self.sampling_rate
    }

    /// Number of channels
    pub fn channels(&self) -> u16 {
        self.channel_count
    }

    /// Total number of samples (frames * channels)
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds
    pub fn duration_secs(&self) -> f64 {
        if self.sampling_rate == 0 {
            return 0.0;
        }
        self.frame_count as f64 / self.sampling_rate as f64
    }
}
