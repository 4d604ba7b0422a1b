//! Offline reverb rendering
//!
//! Every channel runs through its own copy of the configured engine, so
//! filter state never leaks between channels. After the input ends the
//! engine keeps being fed silence for the tail, capturing the decay.

use crate::effects::{Effect, ReverbEngine};
use crate::AudioBuffer;
use std::thread;

/// Reverb tail appended after the input, in milliseconds
pub const DEFAULT_TAIL_MS: u32 = 1000;

/// Number of tail frames for `tail_ms` at `rate`
pub fn tail_frames(rate: u32, tail_ms: u32) -> usize {
    (rate as u64 * tail_ms as u64 / 1000) as usize
}

/// Clone `engine`, retune it to `rate` and clear its history
fn channel_engine(engine: &ReverbEngine, rate: u32) -> ReverbEngine {
    let mut engine = engine.clone();
    engine.set_sampling_rate(rate);
    engine.reset();
    engine
}

/// Render one channel of `input` into `out_frames` samples
fn render_channel(
    input: &AudioBuffer,
    channel: usize,
    engine: &mut ReverbEngine,
    out_frames: usize,
) -> Vec<f32> {
    let mut out: Vec<f32> = input.channel(channel).collect();
    out.resize(out_frames, 0.0);
    engine.process_block(&mut out);
    out
}

/// Write a rendered channel into its interleaved slot
fn interleave_into(output: &mut AudioBuffer, channel: usize, samples: &[f32]) {
    for (frame, &sample) in samples.iter().enumerate() {
        *output.sample_mut(frame, channel) = sample;
    }
}

/// Apply `engine` to every channel of `input`, one channel after another
///
/// The output is `tail_ms` longer than the input. The engine passed in is
/// only used as a template and is not modified.
pub fn apply_reverb(input: &AudioBuffer, engine: &ReverbEngine, tail_ms: u32) -> AudioBuffer {
    let rate = input.rate();
    let channels = input.channels();
    let out_frames = input.frames() + tail_frames(rate, tail_ms);
    let mut output = AudioBuffer::new(out_frames, rate, channels);

    for channel in 0..channels as usize {
        let mut engine = channel_engine(engine, rate);
        let rendered = render_channel(input, channel, &mut engine, out_frames);
        interleave_into(&mut output, channel, &rendered);
    }

    tracing::debug!(effect = engine.name(), channels, frames = out_frames, "Rendered reverb");
    output
}

/// Same as [`apply_reverb`], with one worker thread per channel
///
/// Channels share no filter state, so the result is identical to the
/// sequential render.
pub fn apply_reverb_parallel(
    input: &AudioBuffer,
    engine: &ReverbEngine,
    tail_ms: u32,
) -> AudioBuffer {
    let rate = input.rate();
    let channels = input.channels();
    let out_frames = input.frames() + tail_frames(rate, tail_ms);
    let mut output = AudioBuffer::new(out_frames, rate, channels);

    let (tx, rx) = crossbeam_channel::unbounded::<(usize, Vec<f32>)>();

    thread::scope(|scope| {
        for channel in 0..channels as usize {
            let tx = tx.clone();
            let mut engine = channel_engine(engine, rate);

            scope.spawn(move || {
                let rendered = render_channel(input, channel, &mut engine, out_frames);
                let _ = tx.send((channel, rendered));
            });
        }
        drop(tx);

        for (channel, rendered) in rx.iter() {
            interleave_into(&mut output, channel, &rendered);
        }
    });

    tracing::debug!(
        effect = engine.name(),
        channels,
        frames = out_frames,
        "Rendered reverb in parallel"
    );
    output
}
