//! Recursive filters and the Moorer reverb built from them

mod allpass;
mod comb;
mod delay_line;
mod reverb;

pub use allpass::AllPassFilter;
pub use comb::{CombFilter, DEFAULT_ZERO_FREQ_GAIN};
pub use delay_line::DelayLine;
pub use reverb::{ReverbEngine, NUM_COMBS};

/// Smallest delay a filter will accept, in samples
pub(crate) const MIN_DELAY_SAMPLES: usize = 1;

/// Trait for single-input single-output sample processors
pub trait Effect: Send {
    /// Filter one sample
    fn process(&mut self, input: f32) -> f32;

    /// Clear filter history, keeping coefficients
    fn reset(&mut self);

    /// Get effect name
    fn name(&self) -> &'static str;

    /// Filter a run of samples in place
    fn process_block(&mut self, samples: &mut [f32]) {
        for sample in samples.iter_mut() {
            *sample = self.process(*sample);
        }
    }
}
