/// First-order exponential low-pass for scalar telemetry and force samples.
///
/// Aerodynamic coefficients interpolated from coarse tables can step between
/// ticks; smoothing them keeps the impulses fed to the solver continuous.
#[derive(Debug, Clone, PartialEq)]
pub struct Smoother {
    /// Time constant [s]
    smoothing_time: f64,
    /// Snap to the target once within this distance of it
    precision: f64,
    current: Option<f64>,
}

impl Smoother {
    pub fn new(smoothing_time: f64) -> Self {
        Self {
            smoothing_time,
            precision: 0.0,
            current: None,
        }
    }

    pub fn with_precision(mut self, precision: f64) -> Self {
        self.precision = precision;
        self
    }

    /// Advance toward `sample` by `dt` seconds of first-order lag. The first
    /// sample initializes the state directly.
    pub fn smooth(&mut self, sample: f64, dt: f64) -> f64 {
        let next = match self.current {
            None => sample,
            Some(current) => {
                let alpha = 1.0 - (-dt / self.smoothing_time).exp();
                let next = current + alpha * (sample - current);
                if (sample - next).abs() <= self.precision {
                    sample
                } else {
                    next
                }
            }
        };
        self.current = Some(next);
        next
    }

    /// Last smoothed value, if any sample has been seen.
    pub fn value(&self) -> Option<f64> {
        self.current
    }

    pub fn reset(&mut self) {
        self.current = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_first_sample_passes_through() {
        let mut smoother = Smoother::new(1.0);
        assert_relative_eq!(smoother.smooth(5.0, 0.01), 5.0);
    }

    #[test]
    fn test_converges_to_constant_input() {
        let mut smoother = Smoother::new(0.1);
        smoother.smooth(0.0, 0.01);

        let mut value = 0.0;
        for _ in 0..1000 {
            value = smoother.smooth(1.0, 0.01);
        }
        assert_relative_eq!(value, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_single_step_is_partial() {
        let mut smoother = Smoother::new(1.0);
        smoother.smooth(0.0, 0.01);
        let value = smoother.smooth(1.0, 0.5);

        // One time-constant's worth would be 1 - e⁻¹; half of one is less.
        assert!(value > 0.0 && value < 1.0 - (-1.0_f64).exp());
    }

    #[test]
    fn test_precision_snaps_to_target() {
        let mut smoother = Smoother::new(10.0).with_precision(0.5);
        smoother.smooth(0.0, 0.01);
        assert_relative_eq!(smoother.smooth(0.4, 0.01), 0.4);
    }
}
