//! DC offset removal and peak normalization

use crate::AudioBuffer;
use thiserror::Error;

/// Errors that can occur during normalization
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NormalizeError {
    #[error("Cannot normalize an empty buffer")]
    EmptyBuffer,
    #[error("Cannot normalize a silent buffer (peak is zero after DC removal)")]
    Silent,
    #[error("Normalization gain is not finite (peak {peak}, target {db} dB)")]
    GainOverflow { peak: f32, db: f32 },
}

/// Remove each channel's DC offset, then scale to a peak of `db` dBFS
///
/// The peak is measured across all channels after offset removal and a
/// single gain is applied to every sample. A peak so small, or a target
/// so loud, that the gain does not fit in an `f32` is an error. On error
/// the buffer is left untouched.
pub fn normalize(buffer: &mut AudioBuffer, db: f32) -> Result<(), NormalizeError> {
    let frames = buffer.frames();
    let channels = buffer.channels() as usize;
    if frames == 0 || channels == 0 {
        return Err(NormalizeError::EmptyBuffer);
    }

    let target = 10f32.powf(db / 20.0).abs();

    let offsets: Vec<f32> = (0..channels)
        .map(|ch| {
            let sum: f64 = buffer.channel(ch).map(|s| s as f64).sum();
            (sum / frames as f64) as f32
        })
        .collect();

    let peak = buffer
        .data()
        .chunks_exact(channels)
        .flat_map(|frame| frame.iter().zip(&offsets).map(|(s, off)| (s - off).abs()))
        .fold(0.0f32, f32::max);

    if peak == 0.0 {
        return Err(NormalizeError::Silent);
    }

    let gain = target / peak;
    if !gain.is_finite() {
        return Err(NormalizeError::GainOverflow { peak, db });
    }
    for frame in buffer.data_mut().chunks_exact_mut(channels) {
        for (sample, offset) in frame.iter_mut().zip(&offsets) {
            *sample = (*sample - offset) * gain;
        }
    }

    tracing::debug!(db, peak, gain, "Normalized buffer");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn mean(buffer: &AudioBuffer, channel: usize) -> f64 {
        buffer.channel(channel).map(|s| s as f64).sum::<f64>() / buffer.frames() as f64
    }

    fn peak(buffer: &AudioBuffer) -> f32 {
        buffer.data().iter().fold(0.0f32, |m, s| m.max(s.abs()))
    }

    #[test]
    fn test_normalize_removes_dc_and_scales_to_unity() {
        // channel 0: sine at 0.25 riding on +0.3, channel 1: square at 0.1 on -0.2
        let frames = 1000;
        let mut buffer = AudioBuffer::new(frames, 44100, 2);
        for i in 0..frames {
            let phase = i as f32 / frames as f32 * std::f32::consts::TAU * 10.0;
            *buffer.sample_mut(i, 0) = 0.3 + 0.25 * phase.sin();
            *buffer.sample_mut(i, 1) = -0.2 + if i % 2 == 0 { 0.1 } else { -0.1 };
        }

        normalize(&mut buffer, 0.0).unwrap();

        assert_abs_diff_eq!(peak(&buffer), 1.0, epsilon = 1e-5);
        assert_abs_diff_eq!(mean(&buffer, 0), 0.0, epsilon = 1e-5);
        assert_abs_diff_eq!(mean(&buffer, 1), 0.0, epsilon = 1e-5);
        // one gain for all channels keeps the 0.25 : 0.1 ratio
        let ch1_peak = buffer.channel(1).fold(0.0f32, |m, s| m.max(s.abs()));
        assert_abs_diff_eq!(ch1_peak, 0.4, epsilon = 1e-4);
    }

    #[test]
    fn test_normalize_to_negative_db() {
        let mut buffer = AudioBuffer::from_interleaved(vec![0.5, -0.5, 0.25, -0.25], 8000, 1);
        normalize(&mut buffer, -6.0).unwrap();

        let expected = 10f32.powf(-6.0 / 20.0);
        assert_abs_diff_eq!(peak(&buffer), expected, epsilon = 1e-6);
        assert_abs_diff_eq!(buffer.sample(0, 0), expected, epsilon = 1e-6);
        assert_abs_diff_eq!(buffer.sample(1, 0), -expected, epsilon = 1e-6);
    }

    #[test]
    fn test_normalize_silent_buffer_is_error() {
        let mut buffer = AudioBuffer::new(64, 44100, 2);
        assert_eq!(normalize(&mut buffer, 0.0), Err(NormalizeError::Silent));
    }

    #[test]
    fn test_normalize_constant_buffer_is_error_and_untouched() {
        let mut buffer = AudioBuffer::from_interleaved(vec![0.4; 32], 44100, 1);
        assert_eq!(normalize(&mut buffer, 0.0), Err(NormalizeError::Silent));
        assert!(buffer.data().iter().all(|&s| s == 0.4));
    }

    #[test]
    fn test_normalize_empty_buffer_is_error() {
        let mut buffer = AudioBuffer::new(0, 44100, 2);
        assert_eq!(normalize(&mut buffer, 0.0), Err(NormalizeError::EmptyBuffer));
    }

    #[test]
    fn test_normalize_subnormal_peak_is_error_and_untouched() {
        let samples = vec![1e-39, -1e-39, 0.0, 0.0];
        let mut buffer = AudioBuffer::from_interleaved(samples.clone(), 8000, 1);

        let result = normalize(&mut buffer, 0.0);
        assert!(matches!(result, Err(NormalizeError::GainOverflow { .. })));
        assert_eq!(buffer.data(), &samples[..]);
    }

    #[test]
    fn test_normalize_huge_target_is_error() {
        let mut buffer = AudioBuffer::from_interleaved(vec![0.5, -0.5], 8000, 1);

        let result = normalize(&mut buffer, 1000.0);
        assert!(matches!(
            result,
            Err(NormalizeError::GainOverflow { db, .. }) if db == 1000.0
        ));
        assert_eq!(buffer.data(), &[0.5, -0.5]);
    }
}
