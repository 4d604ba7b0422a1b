//! WAVE decoding

use super::{BitDepth, WaveFormat, DATA_TAG, FMT_LEN, FMT_TAG, FORMAT_PCM, RIFF_TAG, WAVE_TAG};
use moorer_audio::AudioBuffer;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur while reading a WAVE file
///
/// Every variant aborts the load; no partial buffer is produced.
#[derive(Error, Debug)]
pub enum FormatError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Not a RIFF file")]
    NotRiff,
    #[error("Not a WAVE file")]
    NotWave,
    #[error("WAVE file missing format chunk")]
    MissingFormatChunk,
    #[error("Format chunk too short: {0} bytes")]
    FormatChunkTooShort(u32),
    #[error("Compressed audio data (format code {0})")]
    Compressed(u16),
    #[error("Unsupported bit resolution: {0} bits")]
    UnsupportedBitDepth(u16),
    #[error("Format declares zero channels")]
    NoChannels,
    #[error("Bytes-per-sample not consistent: declared {declared}, expected {expected}")]
    InconsistentBlockAlign { declared: u16, expected: u32 },
    #[error("Bytes-per-second not consistent: declared {declared}, expected {expected}")]
    InconsistentByteRate { declared: u32, expected: u64 },
    #[error("WAVE file missing data chunk")]
    MissingDataChunk,
    #[error("WAVE file missing data: expected {expected} bytes, found {available}")]
    TruncatedData { expected: usize, available: usize },
}

/// Little-endian cursor over the file bytes
struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take(&mut self, len: usize) -> Option<&'a [u8]> {
        if self.remaining() < len {
            return None;
        }
        let bytes = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Some(bytes)
    }

    fn tag(&mut self) -> Option<[u8; 4]> {
        self.take(4).map(|b| [b[0], b[1], b[2], b[3]])
    }

    fn u16(&mut self) -> Option<u16> {
        self.take(2).map(|b| u16::from_le_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> Option<u32> {
        self.take(4).map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Skip forward, stopping at the end of the data
    fn skip(&mut self, len: u64) {
        let len = len.min(self.remaining() as u64) as usize;
        self.pos += len;
    }

    /// Scan chunk headers until `label`, skipping everything else
    ///
    /// Returns the chunk size with the cursor on the first body byte.
    fn find_chunk(&mut self, label: [u8; 4]) -> Option<u32> {
        loop {
            let tag = self.tag()?;
            let size = self.u32()?;
            if tag == label {
                return Some(size);
            }

            tracing::debug!(
                chunk = %String::from_utf8_lossy(&tag),
                size,
                "Skipping WAVE chunk"
            );
            // chunk bodies are word aligned
            self.skip(size as u64 + (size & 1) as u64);
        }
    }
}

/// Read and validate the body of a `fmt ` chunk of `size` bytes
fn read_format(reader: &mut ByteReader<'_>, size: u32) -> Result<WaveFormat, FormatError> {
    if size < FMT_LEN {
        return Err(FormatError::FormatChunkTooShort(size));
    }
    let body = reader
        .take(FMT_LEN as usize)
        .ok_or(FormatError::FormatChunkTooShort(size))?;
    let mut fields = ByteReader::new(body);

    // body is exactly FMT_LEN bytes, so these reads cannot fail
    let format_code = fields.u16().unwrap_or_default();
    let channels = fields.u16().unwrap_or_default();
    let sample_rate = fields.u32().unwrap_or_default();
    let byte_rate = fields.u32().unwrap_or_default();
    let block_align = fields.u16().unwrap_or_default();
    let bits = fields.u16().unwrap_or_default();

    if format_code != FORMAT_PCM {
        return Err(FormatError::Compressed(format_code));
    }

    let bit_depth = BitDepth::from_bits(bits).ok_or(FormatError::UnsupportedBitDepth(bits))?;

    if channels == 0 {
        return Err(FormatError::NoChannels);
    }

    let expected_align = channels as u32 * bit_depth.bytes() as u32;
    if block_align as u32 != expected_align {
        return Err(FormatError::InconsistentBlockAlign {
            declared: block_align,
            expected: expected_align,
        });
    }

    let expected_rate = sample_rate as u64 * block_align as u64;
    if byte_rate as u64 != expected_rate {
        return Err(FormatError::InconsistentByteRate {
            declared: byte_rate,
            expected: expected_rate,
        });
    }

    // extension bytes (cbSize and friends) are not needed for PCM
    let extra = size - FMT_LEN;
    reader.skip(extra as u64 + (size & 1) as u64);

    Ok(WaveFormat {
        channels,
        sample_rate,
        byte_rate,
        block_align,
        bit_depth,
    })
}

/// Convert raw PCM bytes to normalized samples
fn convert_samples(bytes: &[u8], bit_depth: BitDepth) -> Vec<f32> {
    match bit_depth {
        BitDepth::Sixteen => bytes
            .chunks_exact(2)
            .map(|b| i16::from_le_bytes([b[0], b[1]]) as f32 / 32768.0)
            .collect(),
        BitDepth::Eight => bytes.iter().map(|&b| (b as f32 - 128.0) / 128.0).collect(),
    }
}

/// Decode a WAVE file held in memory, returning its format as well
pub fn decode_with_format(bytes: &[u8]) -> Result<(AudioBuffer, WaveFormat), FormatError> {
    let mut reader = ByteReader::new(bytes);

    if reader.tag() != Some(RIFF_TAG) {
        return Err(FormatError::NotRiff);
    }
    // total size is not trusted; chunks are scanned up to the real end
    reader.u32().ok_or(FormatError::NotWave)?;
    if reader.tag() != Some(WAVE_TAG) {
        return Err(FormatError::NotWave);
    }

    let fmt_size = reader
        .find_chunk(FMT_TAG)
        .ok_or(FormatError::MissingFormatChunk)?;
    let format = read_format(&mut reader, fmt_size)?;

    let data_size = reader
        .find_chunk(DATA_TAG)
        .ok_or(FormatError::MissingDataChunk)?;

    let channels = format.channels as u64;
    let bits = format.bit_depth.bits() as u64;
    let frames = (8 * data_size as u64 / (channels * bits)) as usize;
    let expected = frames * format.block_align as usize;

    let available = reader.remaining();
    let pcm = reader.take(expected).ok_or(FormatError::TruncatedData {
        expected,
        available,
    })?;

    let samples = convert_samples(pcm, format.bit_depth);
    let buffer = AudioBuffer::from_interleaved(samples, format.sample_rate, format.channels);
    Ok((buffer, format))
}

/// Decode a WAVE file held in memory
pub fn decode(bytes: &[u8]) -> Result<AudioBuffer, FormatError> {
    decode_with_format(bytes).map(|(buffer, _)| buffer)
}

/// Load a WAVE file from disk, returning its format as well
pub fn load_with_format(path: &Path) -> Result<(AudioBuffer, WaveFormat), FormatError> {
    let bytes = std::fs::read(path)?;
    let (buffer, format) = decode_with_format(&bytes)?;

    tracing::info!(
        path = %path.display(),
        channels = format.channels,
        sample_rate = format.sample_rate,
        bits = format.bit_depth.bits(),
        frames = buffer.frames(),
        "Loaded WAVE file"
    );
    Ok((buffer, format))
}

/// Load a WAVE file from disk
pub fn load(path: &Path) -> Result<AudioBuffer, FormatError> {
    load_with_format(path).map(|(buffer, _)| buffer)
}
