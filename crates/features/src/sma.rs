//! Simple moving average.

use statrs::statistics::Statistics;

/// Rolling mean over `length` values; NaN for the first `length - 1` entries.
///
/// A NaN inside a window makes that window's mean NaN. A zero `length`
/// yields all NaN.
pub fn simple_moving_average(data: &[f64], length: usize) -> Vec<f64> {
    if length == 0 {
        return vec![f64::NAN; data.len()];
    }
    let mut out = vec![f64::NAN; data.len().min(length - 1)];
    out.extend(data.windows(length).map(|w| w.iter().mean()));
    out
}
