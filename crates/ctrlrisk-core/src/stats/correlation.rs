//! Pearson correlation with significance testing.
//!
//! - r = cov(x, y) / (σx·σy)
//! - t = r·√((n − 2) / (1 − r²)), two-tailed p-value with n − 2 degrees of freedom
//! - 95% interval via the Fisher z-transform: z ± 1.96/√(n − 3), mapped back with tanh

use crate::engine::errors::RiskError;
use crate::engine::special::student_t_two_tailed_p;
use crate::stats::descriptive::{has_no_variance, pearson};
use crate::stats::{ensure_same_length, AnalysisStatus, ConfidenceInterval};

/// Minimum paired observations for a correlation estimate.
pub const MIN_CORRELATION_SAMPLES: usize = 3;

const Z_95: f64 = 1.96;
const SIGNIFICANCE_LEVEL: f64 = 0.05;

/// |r| within this distance of 1 is treated as a perfect linear relationship.
const PERFECT_CORRELATION_EPSILON: f64 = 1e-12;

/// Magnitude bucket for |r|.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum CorrelationStrength {
    Negligible,
    Weak,
    Moderate,
    Strong,
    VeryStrong,
}

impl CorrelationStrength {
    pub fn classify(r: f64) -> Self {
        let magnitude = r.abs();
        if magnitude >= 0.8 {
            CorrelationStrength::VeryStrong
        } else if magnitude >= 0.6 {
            CorrelationStrength::Strong
        } else if magnitude >= 0.4 {
            CorrelationStrength::Moderate
        } else if magnitude >= 0.2 {
            CorrelationStrength::Weak
        } else {
            CorrelationStrength::Negligible
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CorrelationStrength::VeryStrong => "very strong",
            CorrelationStrength::Strong => "strong",
            CorrelationStrength::Moderate => "moderate",
            CorrelationStrength::Weak => "weak",
            CorrelationStrength::Negligible => "negligible",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct CorrelationResult {
    pub pearson_r: f64,
    pub t_statistic: f64,
    pub p_value: f64,
    pub sample_size: usize,
    pub confidence_interval: ConfidenceInterval,
    /// p < 0.05
    pub significant: bool,
    pub strength: CorrelationStrength,
    /// Human-readable summary, e.g. "Negative moderate correlation" or "No variance".
    pub interpretation: String,
    pub status: AnalysisStatus,
}

impl CorrelationResult {
    fn unavailable(sample_size: usize, status: AnalysisStatus) -> Self {
        let interpretation = match status {
            AnalysisStatus::NoVariance => "No variance",
            _ => "Insufficient data",
        };
        Self {
            pearson_r: 0.0,
            t_statistic: 0.0,
            p_value: 1.0,
            sample_size,
            confidence_interval: ConfidenceInterval {
                lower: -1.0,
                upper: 1.0,
            },
            significant: false,
            strength: CorrelationStrength::Negligible,
            interpretation: interpretation.to_string(),
            status,
        }
    }
}

/// Correlates two paired samples.
///
/// Unequal lengths are a [`RiskError::DimensionMismatch`]. Fewer than three
/// pairs, or a constant variable, produce a flagged degenerate result with
/// r = 0 and p = 1. A NaN or infinite observation is a [`RiskError::Numerical`].
pub fn calculate_correlation(x: &[f64], y: &[f64]) -> Result<CorrelationResult, RiskError> {
    ensure_same_length(x.len(), y.len())?;
    let n = x.len();
    if n < MIN_CORRELATION_SAMPLES {
        return Ok(CorrelationResult::unavailable(
            n,
            AnalysisStatus::InsufficientData,
        ));
    }

    if x.iter().chain(y).any(|v| !v.is_finite()) {
        return Err(RiskError::Numerical(
            "calculate_correlation: non-finite observation".into(),
        ));
    }
    if has_no_variance(x) || has_no_variance(y) {
        return Ok(CorrelationResult::unavailable(n, AnalysisStatus::NoVariance));
    }

    let r = pearson(x, y);
    if !r.is_finite() {
        return Err(RiskError::Numerical(
            "calculate_correlation: correlation is not finite".into(),
        ));
    }
    let r = r.clamp(-1.0, 1.0);
    let df = (n - 2) as f64;
    let one_minus_r2 = 1.0 - r * r;
    let perfect = one_minus_r2 <= PERFECT_CORRELATION_EPSILON;

    let t_statistic = if perfect {
        f64::INFINITY.copysign(r)
    } else {
        r * (df / one_minus_r2).sqrt()
    };
    let p_value = student_t_two_tailed_p(t_statistic, df);

    let confidence_interval = if perfect {
        ConfidenceInterval { lower: r, upper: r }
    } else if n > MIN_CORRELATION_SAMPLES {
        let z = 0.5 * ((1.0 + r) / (1.0 - r)).ln();
        let se = 1.0 / ((n - 3) as f64).sqrt();
        ConfidenceInterval {
            lower: (z - Z_95 * se).tanh(),
            upper: (z + Z_95 * se).tanh(),
        }
    } else {
        // n = 3 leaves no degrees of freedom for the z standard error.
        ConfidenceInterval {
            lower: -1.0,
            upper: 1.0,
        }
    };

    let strength = CorrelationStrength::classify(r);
    Ok(CorrelationResult {
        pearson_r: r,
        t_statistic,
        p_value,
        sample_size: n,
        confidence_interval,
        significant: p_value < SIGNIFICANCE_LEVEL,
        strength,
        interpretation: interpret(r, strength),
        status: AnalysisStatus::Computed,
    })
}

fn interpret(r: f64, strength: CorrelationStrength) -> String {
    if r < 0.0 {
        format!("Negative {} correlation", strength.label())
    } else {
        let label = strength.label();
        let mut chars = label.chars();
        match chars.next() {
            Some(first) => format!("{}{} correlation", first.to_ascii_uppercase(), chars.as_str()),
            None => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perfect_linear_relationship() {
        let x: Vec<f64> = (1..=10).map(f64::from).collect();
        let y: Vec<f64> = x.iter().map(|v| 2.0 * v + 1.0).collect();
        let result = calculate_correlation(&x, &y).unwrap();
        assert!((result.pearson_r - 1.0).abs() < 1e-6, "r = {}", result.pearson_r);
        assert!(result.p_value < 1e-6);
        assert!(result.significant);
        assert_eq!(result.strength, CorrelationStrength::VeryStrong);
        assert_eq!(result.interpretation, "Very strong correlation");
    }

    #[test]
    fn constant_series_reports_no_variance() {
        let x = [1.0, 2.0, 3.0, 4.0];
        let y = [5.0, 5.0, 5.0, 5.0];
        let result = calculate_correlation(&x, &y).unwrap();
        assert_eq!(result.pearson_r, 0.0);
        assert_eq!(result.p_value, 1.0);
        assert_eq!(result.status, AnalysisStatus::NoVariance);
        assert_eq!(result.interpretation, "No variance");
    }

    #[test]
    fn large_magnitude_data_keeps_its_correlation() {
        let x = [1e200, 2e200, 3e200, 4e200];
        let y = [1.0, 2.0, 3.0, 5.0];
        let result = calculate_correlation(&x, &y).unwrap();
        // Sxy = 6.5, Sxx = 5, Syy = 8.75 on the unscaled x = 1..4
        let expected = 6.5 / (5.0f64 * 8.75).sqrt();
        assert!((result.pearson_r - expected).abs() < 1e-12, "r = {}", result.pearson_r);
        assert_eq!(result.status, AnalysisStatus::Computed);
        assert_eq!(result.strength, CorrelationStrength::VeryStrong);
    }

    #[test]
    fn non_finite_observations_are_numerical_errors() {
        assert!(matches!(
            calculate_correlation(&[1.0, f64::INFINITY, 3.0], &[1.0, 2.0, 3.0]),
            Err(RiskError::Numerical(_))
        ));
        assert!(calculate_correlation(&[1.0, 2.0, 3.0], &[1.0, f64::NAN, 3.0]).is_err());
    }

    #[test]
    fn too_few_pairs_is_insufficient_data() {
        let result = calculate_correlation(&[1.0, 2.0], &[3.0, 4.0]).unwrap();
        assert_eq!(result.status, AnalysisStatus::InsufficientData);
        assert_eq!(result.pearson_r, 0.0);
        assert_eq!(result.p_value, 1.0);
    }

    #[test]
    fn mismatched_lengths_error() {
        let err = calculate_correlation(&[1.0, 2.0, 3.0], &[1.0, 2.0]).unwrap_err();
        assert_eq!(err, RiskError::DimensionMismatch { left: 3, right: 2 });
    }

    #[test]
    fn negative_correlation_is_labelled() {
        let x = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let y = [10.0, 8.5, 9.0, 6.0, 4.5, 5.0];
        let result = calculate_correlation(&x, &y).unwrap();
        assert!(result.pearson_r < -0.8);
        assert!(result.interpretation.starts_with("Negative"));
        assert!(result.confidence_interval.contains(result.pearson_r));
        assert!(result.confidence_interval.lower >= -1.0 && result.confidence_interval.upper <= 1.0);
    }

    #[test]
    fn known_moderate_correlation() {
        // r = 0.5 exactly for this construction: y = x + orthogonal noise of equal norm.
        let x = [1.0, -1.0, 1.0, -1.0, 0.0];
        let noise = [1.0, 1.0, -1.0, -1.0, 0.0];
        let y: Vec<f64> = x
            .iter()
            .zip(noise.iter())
            .map(|(a, b)| a + 3f64.sqrt() * b)
            .collect();
        let result = calculate_correlation(&x, &y).unwrap();
        assert!((result.pearson_r - 0.5).abs() < 1e-12, "r = {}", result.pearson_r);
        assert_eq!(result.strength, CorrelationStrength::Moderate);
        // t = 0.5·√(3/0.75) = 1.0, df = 3
        assert!((result.t_statistic - 1.0).abs() < 1e-10);
        assert!((result.p_value - 0.391_014).abs() < 1e-4, "p = {}", result.p_value);
        assert!(!result.significant);
    }

    #[test]
    fn strength_buckets() {
        assert_eq!(CorrelationStrength::classify(0.81), CorrelationStrength::VeryStrong);
        assert_eq!(CorrelationStrength::classify(-0.6), CorrelationStrength::Strong);
        assert_eq!(CorrelationStrength::classify(0.45), CorrelationStrength::Moderate);
        assert_eq!(CorrelationStrength::classify(0.2), CorrelationStrength::Weak);
        assert_eq!(CorrelationStrength::classify(0.1), CorrelationStrength::Negligible);
    }
}
