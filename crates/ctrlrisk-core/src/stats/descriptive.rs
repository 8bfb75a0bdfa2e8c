//! Descriptive statistics.
//!
//! Variance, standard deviation, and covariance use the sample (n − 1)
//! denominator and return 0 when fewer than two observations are available.
//! Deviations are taken on data divided by its largest magnitude, so spreads
//! near `f64::MAX` do not overflow while squaring.

const NO_VARIANCE_TOLERANCE: f64 = 1e-12;

/// Arithmetic mean; 0 for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Largest |v|, or 1 when that is zero or not finite.
fn magnitude(values: &[f64]) -> f64 {
    let m = values.iter().fold(0.0f64, |acc, v| acc.max(v.abs()));
    if m > 0.0 && m.is_finite() {
        m
    } else {
        1.0
    }
}

/// Sample variance of `values / scale`.
fn scaled_variance(values: &[f64], scale: f64) -> f64 {
    let n = values.len();
    let m = values.iter().map(|v| v / scale).sum::<f64>() / n as f64;
    values.iter().map(|v| (v / scale - m).powi(2)).sum::<f64>() / (n - 1) as f64
}

/// Sample variance.
pub fn variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let scale = magnitude(values);
    scaled_variance(values, scale) * scale * scale
}

/// Sample standard deviation.
pub fn standard_deviation(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let scale = magnitude(values);
    scaled_variance(values, scale).sqrt() * scale
}

/// Middle value (mean of the two middle values for even n); 0 for an empty slice.
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Sample covariance; 0 if the lengths differ or n < 2.
pub fn covariance(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len();
    if n != y.len() || n < 2 {
        return 0.0;
    }
    let (kx, ky) = (magnitude(x), magnitude(y));
    scaled_covariance(x, y, kx, ky) * kx * ky
}

/// Sample covariance of `x / kx` and `y / ky`; lengths must match and n ≥ 2.
fn scaled_covariance(x: &[f64], y: &[f64], kx: f64, ky: f64) -> f64 {
    let n = x.len();
    let mx = x.iter().map(|v| v / kx).sum::<f64>() / n as f64;
    let my = y.iter().map(|v| v / ky).sum::<f64>() / n as f64;
    x.iter()
        .zip(y)
        .map(|(a, b)| (a / kx - mx) * (b / ky - my))
        .sum::<f64>()
        / (n - 1) as f64
}

/// Pearson r of two equal-length samples (n ≥ 2), computed on
/// magnitude-scaled data. NaN when either sample is constant or a value is
/// not finite.
pub(crate) fn pearson(x: &[f64], y: &[f64]) -> f64 {
    let (kx, ky) = (magnitude(x), magnitude(y));
    let cov = scaled_covariance(x, y, kx, ky);
    let sx = scaled_variance(x, kx).sqrt();
    let sy = scaled_variance(y, ky).sqrt();
    cov / (sx * sy)
}

/// True when the spread is at rounding level (a column of 0.1s, say).
pub(crate) fn has_no_variance(values: &[f64]) -> bool {
    if values.len() < 2 {
        return true;
    }
    // sd ≤ tol·(1 + |mean|), evaluated on the scaled data
    let scale = magnitude(values);
    let scaled_mean = values.iter().map(|v| v / scale).sum::<f64>() / values.len() as f64;
    scaled_variance(values, scale).sqrt() <= NO_VARIANCE_TOLERANCE * (1.0 / scale + scaled_mean.abs())
}

/// Empirical percentile of an ascending slice, read at index ⌊q·n⌋.
///
/// `q` is clamped to [0, 1]; an empty slice yields 0.
pub fn percentile_of_sorted(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let idx = (q.clamp(0.0, 1.0) * sorted.len() as f64).floor() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_and_variance() {
        let xs = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_eq!(mean(&xs), 5.0);
        assert!((variance(&xs) - 32.0 / 7.0).abs() < 1e-12);
        assert!((standard_deviation(&xs) - (32.0f64 / 7.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn small_samples_are_zero() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(variance(&[3.0]), 0.0);
        assert_eq!(standard_deviation(&[]), 0.0);
    }

    #[test]
    fn median_handles_odd_and_even_lengths() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), 2.5);
        assert_eq!(median(&[]), 0.0);
    }

    #[test]
    fn covariance_guards() {
        assert_eq!(covariance(&[1.0, 2.0], &[1.0]), 0.0);
        assert_eq!(covariance(&[1.0], &[1.0]), 0.0);
        assert!((covariance(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn huge_magnitudes_do_not_overflow() {
        let xs = [1e300, 2e300, 3e300, 4e300];
        let sd = standard_deviation(&xs);
        assert!(sd.is_finite());
        assert!((sd / 1e300 - (5.0f64 / 3.0).sqrt()).abs() < 1e-12);
        assert!(!has_no_variance(&xs));
        assert!(has_no_variance(&[1e300, 1e300, 1e300]));
        assert!((pearson(&xs, &[1.0, 2.0, 3.0, 4.0]) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn rounding_noise_counts_as_no_variance() {
        assert!(has_no_variance(&[0.1, 0.1, 0.1]));
        assert!(has_no_variance(&[7.0]));
        assert!(!has_no_variance(&[0.1, 0.2]));
    }

    #[test]
    fn percentile_reads_floor_index() {
        let sorted: Vec<f64> = (0..10).map(f64::from).collect();
        assert_eq!(percentile_of_sorted(&sorted, 0.0), 0.0);
        assert_eq!(percentile_of_sorted(&sorted, 0.25), 2.0);
        assert_eq!(percentile_of_sorted(&sorted, 1.0), 9.0);
        assert_eq!(percentile_of_sorted(&[], 0.5), 0.0);
    }
}
