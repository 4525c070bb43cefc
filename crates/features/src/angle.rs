//! Trend angle.
//!
//! Least-squares slope of the last `window` values against x = 1..=window,
//! expressed as an angle in degrees.

use statrs::statistics::Statistics;
use tickbar_core::{Error, Result};

/// Regression-slope angle over a fixed window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrendAngle {
    /// Number of trailing values in each fit.
    window: usize,
}

impl TrendAngle {
    /// Create an indicator. `window` must be at least 2.
    pub fn new(window: usize) -> Result<Self> {
        if window < 2 {
            return Err(Error::config(format!(
                "trend angle window must be at least 2, got {window}"
            )));
        }
        Ok(Self { window })
    }

    #[inline]
    pub fn window(&self) -> usize {
        self.window
    }

    /// Angle of the last `window` values, or 0.0 if there are fewer.
    pub fn calculate_angle(&self, data: &[f64]) -> f64 {
        if data.len() < self.window {
            return 0.0;
        }
        self.fit(&data[data.len() - self.window..])
    }

    /// Angle of every window ending at each index; NaN where the window is
    /// not yet full.
    pub fn windowed_angle(&self, data: &[f64]) -> Vec<f64> {
        let mut out = vec![f64::NAN; data.len().min(self.window - 1)];
        out.extend(data.windows(self.window).map(|w| self.fit(w)));
        out
    }

    fn fit(&self, ys: &[f64]) -> f64 {
        let n = ys.len() as f64;
        let x_mean = (n + 1.0) / 2.0;
        let y_mean = ys.iter().mean();

        let (cov, var) = ys.iter().enumerate().fold((0.0, 0.0), |(cov, var), (i, &y)| {
            let dx = (i + 1) as f64 - x_mean;
            (cov + dx * (y - y_mean), var + dx * dx)
        });

        (cov / var).atan().to_degrees()
    }
}

/// One-off [`TrendAngle::calculate_angle`].
pub fn calculate_angle(data: &[f64], window: usize) -> Result<f64> {
    Ok(TrendAngle::new(window)?.calculate_angle(data))
}

/// One-off [`TrendAngle::windowed_angle`].
pub fn windowed_angle(data: &[f64], window: usize) -> Result<Vec<f64>> {
    Ok(TrendAngle::new(window)?.windowed_angle(data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_angle_of_trailing_window() {
        let angle = calculate_angle(&[6.0, 5.0, 4.0, 1.0, 1.1763, 1.3526], 3).unwrap();
        assert_abs_diff_eq!(angle, 10.0, epsilon = 1e-2);
    }

    #[test]
    fn test_negative_slope() {
        let angle = calculate_angle(&[1.0, 0.1609, -0.6782], 3).unwrap();
        assert_abs_diff_eq!(angle, -40.0, epsilon = 1e-3);
    }

    #[test]
    fn test_flat_and_short_input() {
        let indicator = TrendAngle::new(3).unwrap();
        assert_eq!(indicator.calculate_angle(&[2.0, 2.0, 2.0, 2.0]), 0.0);
        assert_eq!(indicator.calculate_angle(&[1.0, 5.0]), 0.0);
        assert_eq!(indicator.calculate_angle(&[]), 0.0);
    }

    #[test]
    fn test_window_of_six() {
        // Only the last six points matter
        let angle = calculate_angle(&[100.0, 0.0, 1.0, 2.0, 3.0, 4.0, 5.0], 6).unwrap();
        assert_abs_diff_eq!(angle, 45.0, epsilon = 1e-9);
    }

    #[test]
    fn test_windowed_angle() {
        let data = [1.0, 1.2679491924311228, 1.5358983848622457, 1.823, 2.58923];
        let angles = windowed_angle(&data, 3).unwrap();

        assert_eq!(angles.len(), data.len());
        assert!(angles[0].is_nan());
        assert!(angles[1].is_nan());
        assert_abs_diff_eq!(angles[2], 15.0, epsilon = 1e-9);
        assert_abs_diff_eq!(angles[3], 15.51068597, epsilon = 1e-6);
        assert_abs_diff_eq!(angles[4], 27.77424267, epsilon = 1e-6);

        // Stateless: recomputing gives the same series
        let again = windowed_angle(&data, 3).unwrap();
        assert_eq!(angles[2..], again[2..]);
    }

    #[test]
    fn test_windowed_angle_short_input() {
        let angles = windowed_angle(&[1.0, 2.0], 3).unwrap();
        assert_eq!(angles.len(), 2);
        assert!(angles.iter().all(|a| a.is_nan()));
        assert!(windowed_angle(&[], 3).unwrap().is_empty());
    }

    #[test]
    fn test_window_must_be_at_least_two() {
        assert!(TrendAngle::new(1).is_err());
        assert!(TrendAngle::new(0).is_err());
        assert!(matches!(calculate_angle(&[1.0], 1), Err(Error::Config(_))));
        assert_eq!(TrendAngle::new(2).unwrap().window(), 2);
    }
}
