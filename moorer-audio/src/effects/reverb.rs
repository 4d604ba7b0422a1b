//! Moorer reverb
//!
//! Six low-pass comb filters in parallel, summed into a single all-pass
//! stage, blended with the dry signal:
//!
//! `out = wet * allpass(sum(comb_i(x))) + dry * x`
//!
//! Delay times and low-pass coefficients follow Moorer's table, with g
//! interpolated from the 25 kHz and 50 kHz reference values.

use super::{AllPassFilter, CombFilter, Effect};

/// Number of parallel comb filters
pub const NUM_COMBS: usize = 6;

/// Sampling rate used by [`ReverbEngine::default`]
const DEFAULT_SAMPLING_RATE: u32 = 44100;

/// Comb delay times in milliseconds
const COMB_DELAYS_MS: [u32; NUM_COMBS] = [50, 56, 61, 68, 72, 78];

/// Comb low-pass coefficients at 25 kHz
const G25: [f64; NUM_COMBS] = [0.24, 0.26, 0.28, 0.29, 0.30, 0.32];

/// Comb low-pass coefficients at 50 kHz
const G50: [f64; NUM_COMBS] = [0.46, 0.48, 0.50, 0.52, 0.53, 0.55];

/// Distance between the two reference rates in Hz
const G_REFERENCE_SPAN: f64 = 25000.0;

const DEFAULT_ALLPASS_DELAY_MS: u32 = 6;
const DEFAULT_ALLPASS_COEFFICIENT: f64 = 0.7;
const DEFAULT_DRY: f64 = 0.9;

/// Convert milliseconds to samples at `rate`
fn ms_to_samples(rate: u32, ms: u32) -> usize {
    (rate as u64 * ms as u64 / 1000) as usize
}

/// Convert samples to milliseconds at `rate`, rounded to the nearest ms
fn samples_to_ms(rate: u32, samples: usize) -> u32 {
    if rate == 0 {
        return 0;
    }
    (1000.0 * samples as f64 / rate as f64).round() as u32
}

/// Low-pass coefficient of comb `index` at `rate`
fn comb_low_pass(rate: u32, index: usize) -> f64 {
    rate as f64 * (G50[index] - G25[index]) / G_REFERENCE_SPAN
}

/// Moorer reverb engine for a single channel
///
/// Holds filter state, so every channel needs its own clone.
#[derive(Debug, Clone)]
pub struct ReverbEngine {
    sampling_rate: u32,
    dry: f64,
    wet: f64,
    combs: [CombFilter; NUM_COMBS],
    all_pass: AllPassFilter,
}

impl Default for ReverbEngine {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLING_RATE)
    }
}

impl ReverbEngine {
    /// Create an engine tuned for `sampling_rate`
    pub fn new(sampling_rate: u32) -> Self {
        let combs = std::array::from_fn(|i| {
            CombFilter::new(
                ms_to_samples(sampling_rate, COMB_DELAYS_MS[i]),
                comb_low_pass(sampling_rate, i),
            )
        });
        let all_pass = AllPassFilter::new(
            DEFAULT_ALLPASS_COEFFICIENT,
            ms_to_samples(sampling_rate, DEFAULT_ALLPASS_DELAY_MS),
        );

        Self {
            sampling_rate,
            dry: DEFAULT_DRY,
            wet: 1.0 - DEFAULT_DRY,
            combs,
            all_pass,
        }
    }

    /// Change the sampling rate
    ///
    /// Comb delays are rescaled proportionally from their current length
    /// (integer arithmetic) rather than re-derived from the millisecond
    /// table; the all-pass delay is left as is. A rate of zero is ignored.
    /// An engine created at rate zero has no length to scale from, so its
    /// delays are re-derived from the default table instead.
    pub fn set_sampling_rate(&mut self, rate: u32) {
        if rate == 0 {
            tracing::warn!("Ignoring zero sampling rate");
            return;
        }
        if rate == self.sampling_rate {
            return;
        }
        if self.sampling_rate == 0 {
            for (i, comb) in self.combs.iter_mut().enumerate() {
                comb.set_delay(ms_to_samples(rate, COMB_DELAYS_MS[i]));
            }
            self.all_pass.set_delay(ms_to_samples(rate, DEFAULT_ALLPASS_DELAY_MS));
            tracing::debug!(to = rate, "Derived reverb delays from table");
            self.sampling_rate = rate;
            return;
        }

        let old = self.sampling_rate as u64;
        for comb in &mut self.combs {
            let delay = (comb.delay() as u64 * rate as u64 / old) as usize;
            comb.set_delay(delay);
        }
        tracing::debug!(from = old, to = rate, "Retuned reverb comb delays");
        self.sampling_rate = rate;
    }

    /// Get the sampling rate in Hz
    pub fn sampling_rate(&self) -> u32 {
        self.sampling_rate
    }

    /// Set the dry share in percent (clamped to 0-100); wet is the rest
    pub fn set_dry_percentage(&mut self, percent: u32) {
        self.dry = percent.min(100) as f64 / 100.0;
        self.wet = 1.0 - self.dry;
    }

    /// Get the dry share in percent
    pub fn dry_percentage(&self) -> u32 {
        (self.dry * 100.0).round() as u32
    }

    /// Dry fraction (0.0 - 1.0)
    pub fn dry(&self) -> f64 {
        self.dry
    }

    /// Wet fraction, always `1 - dry`
    pub fn wet(&self) -> f64 {
        self.wet
    }

    /// Set the all-pass delay in milliseconds
    pub fn set_all_pass_delay_ms(&mut self, ms: u32) {
        self.all_pass.set_delay(ms_to_samples(self.sampling_rate, ms));
    }

    /// Get the all-pass delay in milliseconds
    pub fn all_pass_delay_ms(&self) -> u32 {
        samples_to_ms(self.sampling_rate, self.all_pass.delay())
    }

    pub fn set_all_pass_coefficient(&mut self, a: f64) {
        self.all_pass.set_coefficient(a);
    }

    pub fn all_pass_coefficient(&self) -> f64 {
        self.all_pass.coefficient()
    }

    /// Set the delay of comb `index` in milliseconds
    pub fn set_comb_delay_ms(&mut self, index: usize, ms: u32) {
        let samples = ms_to_samples(self.sampling_rate, ms);
        if let Some(comb) = self.comb_mut(index) {
            comb.set_delay(samples);
        }
    }

    /// Get the delay of comb `index` in milliseconds
    pub fn comb_delay_ms(&self, index: usize) -> Option<u32> {
        self.combs
            .get(index)
            .map(|comb| samples_to_ms(self.sampling_rate, comb.delay()))
    }

    /// Set the low-pass coefficient g of comb `index`
    pub fn set_comb_low_pass(&mut self, index: usize, g: f64) {
        if let Some(comb) = self.comb_mut(index) {
            comb.set_low_pass(g);
        }
    }

    /// Set the loop gain R of comb `index`
    pub fn set_comb_gain_constant(&mut self, index: usize, r: f64) {
        if let Some(comb) = self.comb_mut(index) {
            comb.set_gain_constant(r);
        }
    }

    /// Set the zero-frequency gain of comb `index`
    pub fn set_comb_zero_freq_gain(&mut self, index: usize, zf: f64) {
        if let Some(comb) = self.comb_mut(index) {
            comb.set_zero_freq_gain(zf);
        }
    }

    pub fn comb_low_pass(&self, index: usize) -> Option<f64> {
        self.combs.get(index).map(CombFilter::low_pass)
    }

    pub fn comb_gain_constant(&self, index: usize) -> Option<f64> {
        self.combs.get(index).map(CombFilter::gain_constant)
    }

    pub fn comb_zero_freq_gain(&self, index: usize) -> Option<f64> {
        self.combs.get(index).map(CombFilter::zero_freq_gain)
    }

    /// The comb bank, in order
    pub fn combs(&self) -> &[CombFilter] {
        &self.combs
    }

    /// The all-pass stage
    pub fn all_pass(&self) -> &AllPassFilter {
        &self.all_pass
    }

    fn comb_mut(&mut self, index: usize) -> Option<&mut CombFilter> {
        let comb = self.combs.get_mut(index);
        if comb.is_none() {
            tracing::warn!(index, "Ignoring parameter for nonexistent comb");
        }
        comb
    }
}

impl Effect for ReverbEngine {
    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        let mut sum = 0.0f64;
        for comb in &mut self.combs {
            sum += comb.process(input) as f64;
        }

        let diffused = self.all_pass.process(sum as f32) as f64;
        (diffused * self.wet + input as f64 * self.dry) as f32
    }

    fn reset(&mut self) {
        for comb in &mut self.combs {
            comb.reset();
        }
        self.all_pass.reset();
    }

    fn name(&self) -> &'static str {
        "Moorer Reverb"
    }
}
