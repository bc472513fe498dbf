//! Rolling standard deviation.
//!
//! STDDEV(n)[i] = sqrt(sum((x[i-j] - mean)^2 for j in 0..n) / (n - ddof))
//! Sample deviation (ddof = 1) is the default used by the Bollinger Bands.
//! Warmup: first (n-1) positions are undefined.

/// Delta degrees of freedom for the sample standard deviation.
pub const SAMPLE_DDOF: usize = 1;

/// Compute a rolling standard deviation over a raw f64 slice.
///
/// A position is undefined when the window is not yet full, when the window
/// holds a missing value, or when `window <= ddof`.
pub fn rolling_std(values: &[f64], window: usize, ddof: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];

    if window == 0 || window <= ddof || n < window {
        return result;
    }

    let divisor = (window - ddof) as f64;

    for i in (window - 1)..n {
        let slice = &values[(i + 1 - window)..=i];
        if slice.iter().any(|v| v.is_nan()) {
            continue;
        }

        let mean = slice.iter().sum::<f64>() / window as f64;
        let variance = slice
            .iter()
            .map(|v| {
                let diff = v - mean;
                diff * diff
            })
            .sum::<f64>()
            / divisor;

        result[i] = variance.sqrt();
    }

    result
}
