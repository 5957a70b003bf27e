/// Trailing moving average over per-sample paces.
///
/// Keeps the full history of instantaneous paces (seconds per kilometer),
/// including `None` for samples where no pace could be computed. The smoothed
/// value for a new sample is the mean of the most recent `window` defined
/// paces. Past values are never revised.
#[derive(Debug, Clone)]
pub struct PaceSmoother {
    history: Vec<Option<f64>>,
    window: usize,
}

impl PaceSmoother {
    /// Create a smoother averaging over `window` defined paces (at least 1).
    pub fn new(window: u32) -> Self {
        Self {
            history: Vec::new(),
            window: window.max(1) as usize,
        }
    }

    /// Instantaneous pace for one interval, `None` if distance or time is zero.
    pub fn instant_pace(dist_m: f64, delta_t_ms: i64) -> Option<f64> {
        if dist_m > 0.0 && delta_t_ms > 0 {
            Some((delta_t_ms as f64 / 1000.0) / (dist_m / 1000.0))
        } else {
            None
        }
    }

    /// Record a raw pace and return the smoothed pace for this sample.
    ///
    /// Falls back to the raw value when no defined paces are in the window.
    pub fn push(&mut self, raw: Option<f64>) -> Option<f64> {
        self.history.push(raw);

        let (sum, count) = self
            .history
            .iter()
            .rev()
            .flatten()
            .take(self.window)
            .fold((0.0_f64, 0usize), |(sum, count), pace| (sum + pace, count + 1));

        if count > 0 {
            Some(sum / count as f64)
        } else {
            raw
        }
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn clear(&mut self) {
        self.history.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_instant_pace() {
        // 10 m in 3 s = 300 s/km
        assert_relative_eq!(PaceSmoother::instant_pace(10.0, 3000).unwrap(), 300.0);
        assert_eq!(PaceSmoother::instant_pace(0.0, 3000), None);
        assert_eq!(PaceSmoother::instant_pace(10.0, 0), None);
    }

    #[test]
    fn test_first_sample_undefined() {
        let mut smoother = PaceSmoother::new(5);
        assert_eq!(smoother.push(None), None);
        assert_eq!(smoother.len(), 1);
    }

    #[test]
    fn test_mean_skips_undefined() {
        let mut smoother = PaceSmoother::new(5);
        smoother.push(None);
        assert_eq!(smoother.push(Some(300.0)), Some(300.0));
        assert_eq!(smoother.push(Some(360.0)), Some(330.0));
        // An undefined pace still reports the mean of what is defined
        assert_eq!(smoother.push(None), Some(330.0));
    }

    #[test]
    fn test_window_limits_history() {
        let mut smoother = PaceSmoother::new(3);
        for pace in [100.0, 200.0, 300.0, 400.0] {
            smoother.push(Some(pace));
        }
        // Last three defined: 300, 400, 500
        assert_relative_eq!(smoother.push(Some(500.0)).unwrap(), 400.0);
        assert_eq!(smoother.len(), 5);
    }

    #[test]
    fn test_window_of_one_is_raw() {
        let mut smoother = PaceSmoother::new(1);
        smoother.push(Some(250.0));
        assert_eq!(smoother.push(Some(310.0)), Some(310.0));
    }

    #[test]
    fn test_clear() {
        let mut smoother = PaceSmoother::new(2);
        smoother.push(Some(250.0));
        smoother.clear();
        assert!(smoother.is_empty());
        assert_eq!(smoother.push(None), None);
    }
}
