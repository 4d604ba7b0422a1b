//! Audio core for Moorer - buffers, filters, and the reverb engine
//!
//! This crate provides the sample-level processing pipeline:
//! - AudioBuffer: Interleaved sample store addressed by (frame, channel)
//! - Effects: All-pass and low-pass comb filters, Moorer reverb engine
//! - Render: Per-channel reverb application with a decay tail
//! - Normalize: DC offset removal and peak normalization

mod buffer;
mod effects;
mod normalize;
mod render;

pub use buffer::AudioBuffer;
pub use effects::{
    AllPassFilter, CombFilter, DelayLine, Effect, ReverbEngine, DEFAULT_ZERO_FREQ_GAIN, NUM_COMBS,
};
pub use normalize::{normalize, NormalizeError};
pub use render::{apply_reverb, apply_reverb_parallel, tail_frames, DEFAULT_TAIL_MS};
