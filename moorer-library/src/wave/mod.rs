//! RIFF/WAVE codec for 8-bit and 16-bit linear PCM
//!
//! Whole files are buffered in memory. Header fields are read and written
//! at explicit byte offsets in little-endian order.

mod reader;
mod writer;

pub use reader::{decode, decode_with_format, load, load_with_format, FormatError};
pub use writer::{encode, save, write_to, WriteError};

/// Size of the canonical header emitted by the writer
pub const HEADER_LEN: usize = 44;

/// WAVE format code for integer PCM
const FORMAT_PCM: u16 = 1;

const RIFF_TAG: [u8; 4] = *b"RIFF";
const WAVE_TAG: [u8; 4] = *b"WAVE";
const FMT_TAG: [u8; 4] = *b"fmt ";
const DATA_TAG: [u8; 4] = *b"data";

/// Length of the PCM `fmt ` chunk body
const FMT_LEN: u32 = 16;

/// Supported PCM sample widths
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BitDepth {
    /// Unsigned 8-bit, 128 is silence
    Eight,
    /// Signed 16-bit little-endian
    #[default]
    Sixteen,
}

impl BitDepth {
    /// Map a bits-per-sample field to a supported depth
    pub fn from_bits(bits: u16) -> Option<Self> {
        match bits {
            8 => Some(BitDepth::Eight),
            16 => Some(BitDepth::Sixteen),
            _ => None,
        }
    }

    pub fn bits(self) -> u16 {
        match self {
            BitDepth::Eight => 8,
            BitDepth::Sixteen => 16,
        }
    }

    /// Bytes per sample
    pub fn bytes(self) -> u16 {
        self.bits() / 8
    }
}

/// Contents of a validated `fmt ` chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaveFormat {
    pub channels: u16,
    pub sample_rate: u32,
    pub byte_rate: u32,
    pub block_align: u16,
    pub bit_depth: BitDepth,
}

impl WaveFormat {
    /// Canonical PCM format for the given layout
    ///
    /// Returns `None` when block align or byte rate do not fit their header
    /// fields.
    pub fn pcm(channels: u16, sample_rate: u32, bit_depth: BitDepth) -> Option<Self> {
        let block_align = channels.checked_mul(bit_depth.bytes())?;
        let byte_rate = sample_rate.checked_mul(block_align as u32)?;
        Some(Self {
            channels,
            sample_rate,
            byte_rate,
            block_align,
            bit_depth,
        })
    }
}
