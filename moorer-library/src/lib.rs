//! File handling for Moorer - WAVE reading/writing and settings persistence

mod config;
pub mod wave;

pub use config::{CombSettings, Config, ConfigError};
pub use wave::{BitDepth, FormatError, WaveFormat, WriteError};
