//! Single-stage all-pass filter
//!
//! `y[t] = x[t-m] + a * (x[t] - y[t-m])`
//!
//! Unity magnitude at every frequency; used after the comb bank to diffuse
//! the echo pattern.

use super::{DelayLine, Effect, MIN_DELAY_SAMPLES};

/// All-pass filter with coefficient `a` and delay `m` samples
#[derive(Debug, Clone)]
pub struct AllPassFilter {
    coefficient: f64,
    delay: usize,
    /// x[t-m] .. x[t-1]
    x_history: DelayLine,
    /// y[t-m] .. y[t-1]
    y_history: DelayLine,
}

impl AllPassFilter {
    /// Create a filter with coefficient `a` and a delay in samples
    ///
    /// Delays below one sample are raised to one.
    pub fn new(coefficient: f64, delay: usize) -> Self {
        let delay = delay.max(MIN_DELAY_SAMPLES);
        Self {
            coefficient,
            delay,
            x_history: DelayLine::new(delay),
            y_history: DelayLine::new(delay),
        }
    }

    /// Set the coefficient; history is preserved
    pub fn set_coefficient(&mut self, coefficient: f64) {
        self.coefficient = coefficient;
    }

    /// Get the coefficient
    pub fn coefficient(&self) -> f64 {
        self.coefficient
    }

    /// Set the delay in samples
    ///
    /// Changing the delay re-derives both histories at the new length, so
    /// it implies a reset.
    pub fn set_delay(&mut self, samples: usize) {
        self.delay = samples.max(MIN_DELAY_SAMPLES);
        self.reset();
    }

    /// Get the delay in samples
    pub fn delay(&self) -> usize {
        self.delay
    }
}

impl Effect for AllPassFilter {
    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        let x = input as f64;
        let xm = self.x_history.front();
        let ym = self.y_history.front();

        let y = xm + self.coefficient * (x - ym);

        self.x_history.push(x);
        self.y_history.push(y);
        y as f32
    }

    fn reset(&mut self) {
        self.x_history.resize(self.delay);
        self.y_history.resize(self.delay);
    }

    fn name(&self) -> &'static str {
        "All-Pass"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn run(filter: &mut AllPassFilter, input: &[f32]) -> Vec<f32> {
        input.iter().map(|&x| filter.process(x)).collect()
    }

    #[test]
    fn test_allpass_impulse_response() {
        let mut filter = AllPassFilter::new(0.5, 2);
        let out = run(&mut filter, &[1.0, 0.0, 0.0, 0.0, 0.0]);

        // y0 = a*x0, y2 = x0 - a*y0, y4 = -a*y2
        let expected = [0.5, 0.0, 0.75, 0.0, -0.375];
        for (got, want) in out.iter().zip(expected) {
            assert_abs_diff_eq!(*got, want, epsilon = 1e-7);
        }
    }

    #[test]
    fn test_allpass_delayed_impulse_lands_at_m() {
        for m in [1usize, 3, 17, 264] {
            let a = 0.7;
            let mut filter = AllPassFilter::new(a, m);

            let first = filter.process(1.0);
            assert_abs_diff_eq!(first, a as f32, epsilon = 1e-7);

            for _ in 1..m {
                assert_eq!(filter.process(0.0), 0.0);
            }

            // x[t-m] = 1, y[t-m] = a
            let at_m = filter.process(0.0);
            assert_abs_diff_eq!(at_m as f64, 1.0 - a * a, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_allpass_zero_coefficient_is_pure_delay() {
        let mut filter = AllPassFilter::new(0.0, 3);
        let out = run(&mut filter, &[0.1, 0.2, 0.3, 0.4, 0.5, 0.6]);
        assert_eq!(out[..3], [0.0, 0.0, 0.0]);
        assert_abs_diff_eq!(out[3], 0.1, epsilon = 1e-7);
        assert_abs_diff_eq!(out[4], 0.2, epsilon = 1e-7);
        assert_abs_diff_eq!(out[5], 0.3, epsilon = 1e-7);
    }

    #[test]
    fn test_allpass_reset_clears_history() {
        let mut filter = AllPassFilter::new(0.5, 2);
        run(&mut filter, &[1.0, -1.0, 0.5]);

        filter.reset();
        let out = run(&mut filter, &[0.0, 0.0, 0.0]);
        assert!(out.iter().all(|&y| y == 0.0));
    }

    #[test]
    fn test_allpass_coefficient_change_keeps_history() {
        let mut filter = AllPassFilter::new(0.5, 1);
        filter.process(1.0);

        filter.set_coefficient(0.0);
        // x[t-1] = 1 survives the coefficient change
        assert_abs_diff_eq!(filter.process(0.0), 1.0, epsilon = 1e-7);
    }

    #[test]
    fn test_allpass_delay_change_resets() {
        let mut filter = AllPassFilter::new(0.5, 2);
        filter.process(1.0);

        filter.set_delay(4);
        assert_eq!(filter.delay(), 4);
        let out = run(&mut filter, &[0.0; 6]);
        assert!(out.iter().all(|&y| y == 0.0));
    }

    #[test]
    fn test_allpass_zero_delay_clamped() {
        let mut filter = AllPassFilter::new(0.5, 0);
        assert_eq!(filter.delay(), 1);

        filter.set_delay(0);
        assert_eq!(filter.delay(), 1);
        assert!(filter.process(1.0).is_finite());
    }
}
