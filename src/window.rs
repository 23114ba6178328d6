use heapless::Deque;

/// Fixed-size sample window, newest first.
///
/// Starts out full of zeros. Every push drops the oldest sample, so the
/// length never changes.
#[derive(Clone, Debug)]
pub struct RollingWindow<const N: usize> {
    samples: Deque<f64, N>,
}

impl<const N: usize> RollingWindow<N> {
    pub fn new() -> Self {
        let mut samples = Deque::new();
        for _ in 0..N {
            // Cannot fail, the deque holds exactly N.
            let _ = samples.push_back(0.0);
        }
        Self { samples }
    }

    /// Inserts `value` at the front and returns the sample pushed out the back.
    pub fn push(&mut self, value: f64) -> Option<f64> {
        let evicted = self.samples.pop_back();
        let _ = self.samples.push_front(value);
        evicted
    }

    pub fn to_array(&self) -> [f64; N] {
        let mut out = [0.0; N];
        for (slot, sample) in out.iter_mut().zip(self.samples.iter()) {
            *slot = *sample;
        }
        out
    }
}

impl<const N: usize> Default for RollingWindow<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_full_of_zeros() {
        let window = RollingWindow::<100>::new();
        assert_eq!(window.to_array(), [0.0; 100]);
    }

    #[test]
    fn push_keeps_length_and_evicts_oldest() {
        let mut window = RollingWindow::<4>::new();
        assert_eq!(window.push(1.0), Some(0.0));
        assert_eq!(window.push(2.0), Some(0.0));
        assert_eq!(window.to_array(), [2.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn holds_most_recent_values_newest_first() {
        let mut window = RollingWindow::<100>::new();
        for i in 0..250 {
            window.push(i as f64);
        }

        let expected: [f64; 100] = core::array::from_fn(|i| (249 - i) as f64);
        assert_eq!(window.to_array(), expected);
        assert_eq!(window.push(250.0), Some(150.0));
    }
}
