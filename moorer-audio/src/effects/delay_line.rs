//! Fixed-length sample history backed by a circular buffer
//!
//! The line always holds exactly `len()` samples, oldest first. Pushing a
//! new sample evicts the oldest one, so a pop-front/push-back pair costs a
//! single write and never allocates.

/// Circular delay line of f64 samples
#[derive(Debug, Clone)]
pub struct DelayLine {
    buffer: Vec<f64>,
    /// Position of the oldest sample
    head: usize,
}

impl DelayLine {
    /// Create a zero-filled line holding `len` samples
    pub fn new(len: usize) -> Self {
        Self {
            buffer: vec![0.0; len],
            head: 0,
        }
    }

    /// Number of samples held
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Oldest sample
    #[inline]
    pub fn front(&self) -> f64 {
        self.get(0)
    }

    /// Newest sample
    #[inline]
    pub fn back(&self) -> f64 {
        match self.buffer.len() {
            0 => 0.0,
            len => self.get(len - 1),
        }
    }

    /// Sample `offset` positions after the oldest one
    ///
    /// Returns 0.0 for an empty line.
    #[inline]
    pub fn get(&self, offset: usize) -> f64 {
        let len = self.buffer.len();
        if len == 0 {
            return 0.0;
        }
        self.buffer[(self.head + offset) % len]
    }

    /// Append `value` as the newest sample and return the evicted oldest one
    ///
    /// An empty line passes the value straight through.
    #[inline]
    pub fn push(&mut self, value: f64) -> f64 {
        let len = self.buffer.len();
        if len == 0 {
            return value;
        }

        let oldest = std::mem::replace(&mut self.buffer[self.head], value);
        self.head += 1;
        if self.head == len {
            self.head = 0;
        }
        oldest
    }

    /// Zero the history, keeping the length
    pub fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.head = 0;
    }

    /// Zero the history and change its length
    pub fn resize(&mut self, len: usize) {
        self.buffer.clear();
        self.buffer.resize(len, 0.0);
        self.head = 0;
    }

    /// Samples oldest first
    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        (0..self.buffer.len()).map(move |i| self.get(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_zeroed() {
        let line = DelayLine::new(4);
        assert_eq!(line.len(), 4);
        assert!(line.iter().all(|s| s == 0.0));
    }

    #[test]
    fn test_push_evicts_oldest() {
        let mut line = DelayLine::new(3);

        assert_eq!(line.push(1.0), 0.0);
        assert_eq!(line.push(2.0), 0.0);
        assert_eq!(line.push(3.0), 0.0);
        assert_eq!(line.push(4.0), 1.0);

        assert_eq!(line.iter().collect::<Vec<_>>(), vec![2.0, 3.0, 4.0]);
        assert_eq!(line.front(), 2.0);
        assert_eq!(line.get(1), 3.0);
        assert_eq!(line.back(), 4.0);
    }

    #[test]
    fn test_wraps_many_times() {
        let mut line = DelayLine::new(5);
        for i in 0..1000 {
            let evicted = line.push(i as f64);
            if i >= 5 {
                assert_eq!(evicted, (i - 5) as f64);
            }
        }
        assert_eq!(line.back(), 999.0);
        assert_eq!(line.front(), 995.0);
    }

    #[test]
    fn test_clear_and_resize() {
        let mut line = DelayLine::new(2);
        line.push(1.0);
        line.push(2.0);

        line.clear();
        assert_eq!(line.len(), 2);
        assert!(line.iter().all(|s| s == 0.0));

        line.push(7.0);
        line.resize(6);
        assert_eq!(line.len(), 6);
        assert!(line.iter().all(|s| s == 0.0));
    }

    #[test]
    fn test_empty_line_passes_through() {
        let mut line = DelayLine::new(0);
        assert!(line.is_empty());
        assert_eq!(line.push(0.25), 0.25);
        assert_eq!(line.front(), 0.0);
        assert_eq!(line.back(), 0.0);
    }
}
