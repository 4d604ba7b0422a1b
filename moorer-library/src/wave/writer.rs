//! WAVE encoding

use super::{
    BitDepth, WaveFormat, DATA_TAG, FMT_LEN, FMT_TAG, FORMAT_PCM, HEADER_LEN, RIFF_TAG, WAVE_TAG,
};
use moorer_audio::AudioBuffer;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur while writing a WAVE file
///
/// Nothing here is fatal to the caller; another path or depth can be tried.
#[derive(Error, Debug)]
pub enum WriteError {
    #[error("Unsupported bit depth: {0} (expected 8 or 16)")]
    UnsupportedBitDepth(u16),
    #[error("Buffer has no channels")]
    NoChannels,
    #[error("Audio data too large for a WAVE file: {0} bytes")]
    TooLarge(u64),
    #[error("Layout does not fit a WAVE header: {channels} channels at {sample_rate} Hz")]
    LayoutOverflow { channels: u16, sample_rate: u32 },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Quantize to signed 16-bit
#[inline]
fn quantize_16(sample: f32) -> i16 {
    (sample * 32767.0).round() as i16
}

/// Quantize to unsigned 8-bit around 128
#[inline]
fn quantize_8(sample: f32) -> u8 {
    (sample * 127.0 + 128.0).round() as u8
}

/// Canonical 44-byte PCM header
fn header(format: &WaveFormat, data_size: u32) -> [u8; HEADER_LEN] {
    let mut header = [0u8; HEADER_LEN];
    header[0..4].copy_from_slice(&RIFF_TAG);
    header[4..8].copy_from_slice(&(36 + data_size).to_le_bytes());
    header[8..12].copy_from_slice(&WAVE_TAG);
    header[12..16].copy_from_slice(&FMT_TAG);
    header[16..20].copy_from_slice(&FMT_LEN.to_le_bytes());
    header[20..22].copy_from_slice(&FORMAT_PCM.to_le_bytes());
    header[22..24].copy_from_slice(&format.channels.to_le_bytes());
    header[24..28].copy_from_slice(&format.sample_rate.to_le_bytes());
    header[28..32].copy_from_slice(&format.byte_rate.to_le_bytes());
    header[32..34].copy_from_slice(&format.block_align.to_le_bytes());
    header[34..36].copy_from_slice(&format.bit_depth.bits().to_le_bytes());
    header[36..40].copy_from_slice(&DATA_TAG);
    header[40..44].copy_from_slice(&data_size.to_le_bytes());
    header
}

/// Encode `buffer` as a complete WAVE file
///
/// Samples outside -1.0 to 1.0 are clamped before quantization.
pub fn encode(buffer: &AudioBuffer, bit_depth: BitDepth) -> Result<Vec<u8>, WriteError> {
    if buffer.channels() == 0 {
        return Err(WriteError::NoChannels);
    }

    let format = WaveFormat::pcm(buffer.channels(), buffer.rate(), bit_depth).ok_or(
        WriteError::LayoutOverflow {
            channels: buffer.channels(),
            sample_rate: buffer.rate(),
        },
    )?;

    let data_size = buffer.len() as u64 * bit_depth.bytes() as u64;
    if data_size > (u32::MAX - 36) as u64 {
        return Err(WriteError::TooLarge(data_size));
    }

    let mut out = Vec::with_capacity(HEADER_LEN + data_size as usize);
    out.extend_from_slice(&header(&format, data_size as u32));

    let mut clamped = 0usize;
    let samples = buffer.data().iter().map(|&s| {
        let limited = s.clamp(-1.0, 1.0);
        if limited != s {
            clamped += 1;
        }
        limited
    });

    match bit_depth {
        BitDepth::Sixteen => {
            for sample in samples {
                out.extend_from_slice(&quantize_16(sample).to_le_bytes());
            }
        }
        BitDepth::Eight => out.extend(samples.map(quantize_8)),
    }

    if clamped > 0 {
        tracing::warn!(clamped, "Clamped out-of-range samples while encoding");
    }
    Ok(out)
}

/// Encode `buffer` into any writer
pub fn write_to<W: Write>(
    writer: &mut W,
    buffer: &AudioBuffer,
    bit_depth: BitDepth,
) -> Result<(), WriteError> {
    let bytes = encode(buffer, bit_depth)?;
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}

/// Save `buffer` to `path` at `bits` bits per sample (8 or 16)
pub fn save(path: &Path, buffer: &AudioBuffer, bits: u16) -> Result<(), WriteError> {
    let bit_depth = BitDepth::from_bits(bits).ok_or(WriteError::UnsupportedBitDepth(bits))?;

    let mut writer = BufWriter::new(File::create(path)?);
    write_to(&mut writer, buffer, bit_depth)?;

    tracing::info!(
        path = %path.display(),
        channels = buffer.channels(),
        sample_rate = buffer.rate(),
        bits,
        frames = buffer.frames(),
        "Saved WAVE file"
    );
    Ok(())
}
