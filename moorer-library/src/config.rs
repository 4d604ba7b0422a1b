//! Simple configuration persistence for Moorer
//!
//! Stores render settings and reverb parameter overrides in a `key=value`
//! text file.

use moorer_audio::{ReverbEngine, DEFAULT_TAIL_MS, NUM_COMBS};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Peak level the rendered output is normalized to, in dBFS
const DEFAULT_NORMALIZE_DB: f32 = -1.5;
const DEFAULT_BIT_DEPTH: u16 = 16;

/// Errors that can occur while loading or saving the config
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: String, value: String },
}

/// Overrides for one comb filter; unset fields keep the engine's value
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CombSettings {
    pub delay_ms: Option<u32>,
    /// Zero-frequency gain zf
    pub zero_freq_gain: Option<f64>,
    /// Low-pass coefficient g
    pub low_pass: Option<f64>,
    /// Loop gain R
    pub gain_constant: Option<f64>,
}

/// Application configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Reverb tail appended after the input
    pub tail_ms: u32,
    /// Output peak level in dBFS
    pub normalize_db: f32,
    /// Output bits per sample
    pub bit_depth: u16,
    /// Dry share in percent
    pub dry_percent: Option<u32>,
    pub allpass_coefficient: Option<f64>,
    pub allpass_delay_ms: Option<u32>,
    pub combs: [CombSettings; NUM_COMBS],
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tail_ms: DEFAULT_TAIL_MS,
            normalize_db: DEFAULT_NORMALIZE_DB,
            bit_depth: DEFAULT_BIT_DEPTH,
            dry_percent: None,
            allpass_coefficient: None,
            allpass_delay_ms: None,
            combs: [CombSettings::default(); NUM_COMBS],
        }
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

impl Config {
    /// Load config from the default location
    ///
    /// Returns default config if the file doesn't exist or can't be parsed.
    pub fn load() -> Self {
        let path = Self::config_path();
        match Self::load_from(&path) {
            Ok(config) => config,
            Err(ConfigError::Io(_)) => Self::default(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Ignoring broken config");
                Self::default()
            }
        }
    }

    /// Load config from a specific path
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Save config to the default location
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::config_path();
        self.save_to(&path)
    }

    /// Save config to a specific path
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(path, self.serialize())?;
        tracing::debug!(path = %path.display(), "Saved config");
        Ok(())
    }

    /// Get the default config file path
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("moorer")
            .join("config.txt")
    }

    /// Push every set parameter into `engine`
    ///
    /// Comb values go through the coupled setters in the order delay, zf,
    /// g, R, so a later value re-derives what an earlier one set.
    pub fn apply(&self, engine: &mut ReverbEngine) {
        if let Some(dry) = self.dry_percent {
            engine.set_dry_percentage(dry);
        }
        if let Some(ms) = self.allpass_delay_ms {
            engine.set_all_pass_delay_ms(ms);
        }
        if let Some(a) = self.allpass_coefficient {
            engine.set_all_pass_coefficient(a);
        }

        for (i, comb) in self.combs.iter().enumerate() {
            if let Some(ms) = comb.delay_ms {
                engine.set_comb_delay_ms(i, ms);
            }
            if let Some(zf) = comb.zero_freq_gain {
                engine.set_comb_zero_freq_gain(i, zf);
            }
            if let Some(g) = comb.low_pass {
                engine.set_comb_low_pass(i, g);
            }
            if let Some(r) = comb.gain_constant {
                engine.set_comb_gain_constant(i, r);
            }
        }
    }

    /// Record every parameter of `engine` as an explicit override
    pub fn capture(&mut self, engine: &ReverbEngine) {
        self.dry_percent = Some(engine.dry_percentage());
        self.allpass_delay_ms = Some(engine.all_pass_delay_ms());
        self.allpass_coefficient = Some(engine.all_pass_coefficient());

        for (i, comb) in self.combs.iter_mut().enumerate() {
            comb.delay_ms = engine.comb_delay_ms(i);
            comb.zero_freq_gain = engine.comb_zero_freq_gain(i);
            comb.low_pass = engine.comb_low_pass(i);
            comb.gain_constant = engine.comb_gain_constant(i);
        }
    }

    /// Parse config from simple key=value format
    fn parse(content: &str) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim();
            let value = value.trim();

            match key {
                "tail_ms" => config.tail_ms = parse_value(key, value)?,
                "normalize_db" => config.normalize_db = parse_value(key, value)?,
                "bit_depth" => config.bit_depth = parse_value(key, value)?,
                "dry_percent" => config.dry_percent = Some(parse_value(key, value)?),
                "allpass_coefficient" => {
                    config.allpass_coefficient = Some(parse_value(key, value)?)
                }
                "allpass_delay_ms" => config.allpass_delay_ms = Some(parse_value(key, value)?),
                _ => {
                    if let Some((index, field)) = comb_key(key) {
                        let comb = &mut config.combs[index];
                        match field {
                            "delay_ms" => comb.delay_ms = Some(parse_value(key, value)?),
                            "zf" => comb.zero_freq_gain = Some(parse_value(key, value)?),
                            "g" => comb.low_pass = Some(parse_value(key, value)?),
                            "r" => comb.gain_constant = Some(parse_value(key, value)?),
                            _ => {} // Ignore unknown keys
                        }
                    }
                }
            }
        }

        Ok(config)
    }

    /// Serialize config to simple key=value format
    fn serialize(&self) -> String {
        let mut lines = Vec::new();
        lines.push("# Moorer Configuration".to_string());

        lines.push(format!("tail_ms={}", self.tail_ms));
        lines.push(format!("normalize_db={}", self.normalize_db));
        lines.push(format!("bit_depth={}", self.bit_depth));

        if let Some(dry) = self.dry_percent {
            lines.push(format!("dry_percent={}", dry));
        }
        if let Some(a) = self.allpass_coefficient {
            lines.push(format!("allpass_coefficient={}", a));
        }
        if let Some(ms) = self.allpass_delay_ms {
            lines.push(format!("allpass_delay_ms={}", ms));
        }

        for (i, comb) in self.combs.iter().enumerate() {
            let n = i + 1;
            if let Some(ms) = comb.delay_ms {
                lines.push(format!("comb{}.delay_ms={}", n, ms));
            }
            if let Some(zf) = comb.zero_freq_gain {
                lines.push(format!("comb{}.zf={}", n, zf));
            }
            if let Some(g) = comb.low_pass {
                lines.push(format!("comb{}.g={}", n, g));
            }
            if let Some(r) = comb.gain_constant {
                lines.push(format!("comb{}.r={}", n, r));
            }
        }

        lines.join("\n")
    }
}

/// Split `combN.field` into a zero-based comb index and the field name
fn comb_key(key: &str) -> Option<(usize, &str)> {
    let (comb, field) = key.split_once('.')?;
    let n: usize = comb.strip_prefix("comb")?.parse().ok()?;
    if (1..=NUM_COMBS).contains(&n) {
        Some((n - 1, field))
    } else {
        None
    }
}
