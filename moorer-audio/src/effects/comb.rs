//! Low-pass feedback comb filter
//!
//! `y[t] = x[t-L] + g * (y[t-1] - x[t-(L+1)]) + R * y[t-L]`
//!
//! The three gains are coupled by `R = zf * (1 - g)`. Each setter treats
//! its own value as the driving one and re-derives exactly one dependent
//! gain; calling two setters in a row is last-writer-wins, there is no
//! simultaneous solve.

use super::{DelayLine, Effect, MIN_DELAY_SAMPLES};

/// Zero-frequency loop gain used by new filters
pub const DEFAULT_ZERO_FREQ_GAIN: f64 = 0.83;

/// Lower bound of every gain parameter
const GAIN_MIN: f64 = 0.0;
/// Gains at or above this are out of range
const GAIN_MAX: f64 = 1.0;
/// Value an out-of-range gain is clamped to
const GAIN_CLAMP: f64 = 0.99;

/// Low-pass comb filter with delay `L` samples
#[derive(Debug, Clone)]
pub struct CombFilter {
    /// Low-pass coefficient g
    low_pass: f64,
    /// Loop gain R
    gain_constant: f64,
    /// Zero-frequency loop gain zf
    zero_freq_gain: f64,
    delay: usize,
    /// x[t-(L+1)] .. x[t-1]
    x_history: DelayLine,
    /// y[t-L] .. y[t-1]
    y_history: DelayLine,
}

impl CombFilter {
    /// Create a filter with a delay in samples and low-pass coefficient `g`
    ///
    /// The zero-frequency gain starts at [`DEFAULT_ZERO_FREQ_GAIN`] and the
    /// loop gain is derived from it.
    pub fn new(delay: usize, low_pass: f64) -> Self {
        let delay = delay.max(MIN_DELAY_SAMPLES);
        let zero_freq_gain = DEFAULT_ZERO_FREQ_GAIN;
        Self {
            low_pass,
            gain_constant: zero_freq_gain * (1.0 - low_pass),
            zero_freq_gain,
            delay,
            x_history: DelayLine::new(delay + 1),
            y_history: DelayLine::new(delay),
        }
    }

    /// Set the low-pass coefficient g and re-derive R
    ///
    /// Negative values are treated as g = 0 (R becomes zf); values of 1 or
    /// more are clamped to 0.99.
    pub fn set_low_pass(&mut self, g: f64) {
        if g < GAIN_MIN {
            self.low_pass = 0.0;
            self.gain_constant = self.zero_freq_gain;
            return;
        }
        let g = if g >= GAIN_MAX { GAIN_CLAMP } else { g };

        self.low_pass = g;
        self.gain_constant = self.zero_freq_gain * (1.0 - g);
    }

    /// Set the loop gain R and re-derive g
    ///
    /// Negative values zero both R and zf; values of 1 or more are clamped
    /// to 0.99. With zf at zero no loop gain is possible, so R stays 0 and
    /// g is left alone.
    pub fn set_gain_constant(&mut self, r: f64) {
        if r < GAIN_MIN {
            self.gain_constant = 0.0;
            self.zero_freq_gain = 0.0;
            return;
        }
        let r = if r >= GAIN_MAX { GAIN_CLAMP } else { r };

        if self.zero_freq_gain == 0.0 {
            self.gain_constant = 0.0;
            return;
        }

        self.gain_constant = r;
        self.low_pass = 1.0 - r / self.zero_freq_gain;
    }

    /// Set the zero-frequency gain zf and re-derive R
    ///
    /// Negative values zero both R and zf; values of 1 or more are clamped
    /// to 0.99.
    pub fn set_zero_freq_gain(&mut self, zf: f64) {
        if zf < GAIN_MIN {
            self.gain_constant = 0.0;
            self.zero_freq_gain = 0.0;
            return;
        }
        let zf = if zf >= GAIN_MAX { GAIN_CLAMP } else { zf };

        self.zero_freq_gain = zf;
        self.gain_constant = zf * (1.0 - self.low_pass);
    }

    /// Set the delay in samples
    ///
    /// Changing the delay re-derives both histories at the new length, so
    /// it implies a reset.
    pub fn set_delay(&mut self, samples: usize) {
        self.delay = samples.max(MIN_DELAY_SAMPLES);
        self.reset();
    }

    /// Get low-pass coefficient g
    pub fn low_pass(&self) -> f64 {
        self.low_pass
    }

    /// Get loop gain R
    pub fn gain_constant(&self) -> f64 {
        self.gain_constant
    }

    /// Get zero-frequency gain zf
    pub fn zero_freq_gain(&self) -> f64 {
        self.zero_freq_gain
    }

    /// Get delay in samples
    pub fn delay(&self) -> usize {
        self.delay
    }
}

impl Effect for CombFilter {
    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        let xl1 = self.x_history.front(); // x[t-(L+1)]
        let xl = self.x_history.get(1); // x[t-L]
        let yl = self.y_history.front(); // y[t-L]
        let y1 = self.y_history.back(); // y[t-1]

        let y = xl + self.low_pass * (y1 - xl1) + self.gain_constant * yl;

        self.y_history.push(y);
        self.x_history.push(input as f64);
        y as f32
    }

    fn reset(&mut self) {
        self.x_history.resize(self.delay + 1);
        self.y_history.resize(self.delay);
    }

    fn name(&self) -> &'static str {
        "Comb"
    }
}
