//! Linear and logistic regression.
//!
//! ## Linear
//!
//! Closed-form ordinary least squares:
//! - slope = Sxy / Sxx, intercept = ȳ − slope·x̄
//! - R² = 1 − SSres/SStot (0 when SStot = 0)
//! - standard error of the estimate = √(SSres / (n − 2))
//!
//! ## Logistic
//!
//! Batch gradient descent on the mean log-loss, starting from zero weights.
//! The sigmoid argument is clamped to [−500, 500] so `exp` never overflows.
//! AUC is computed from ranks (Mann-Whitney U) with average ranks for ties.

use crate::engine::errors::RiskError;
use crate::engine::special::student_t_two_tailed_p;
use crate::stats::descriptive::{has_no_variance, mean};
use crate::stats::{ensure_same_length, AnalysisStatus, DataPoint};

const SIGMOID_CLAMP: f64 = 500.0;
const LOG_LOSS_EPSILON: f64 = 1e-15;
const DECISION_THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct RegressionResult {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
    /// Standard error of the estimate; 0 when n ≤ 2.
    pub standard_error: f64,
    /// Two-tailed p-value for slope ≠ 0 (df = n − 2).
    pub slope_p_value: f64,
    pub sample_size: usize,
    pub status: AnalysisStatus,
}

impl RegressionResult {
    pub fn predict(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }
}

/// Fits y = intercept + slope·x by ordinary least squares.
///
/// Fewer than two points yields `InsufficientData`; a constant x yields
/// `NoVariance` with a flat line through ȳ.
pub fn linear_regression(points: &[DataPoint]) -> RegressionResult {
    let n = points.len();
    let xs: Vec<f64> = points.iter().map(|p| p.x).collect();
    let ys: Vec<f64> = points.iter().map(|p| p.y).collect();
    let x_mean = mean(&xs);
    let y_mean = mean(&ys);

    if n < 2 {
        return RegressionResult {
            slope: 0.0,
            intercept: y_mean,
            r_squared: 0.0,
            standard_error: 0.0,
            slope_p_value: 1.0,
            sample_size: n,
            status: AnalysisStatus::InsufficientData,
        };
    }
    if has_no_variance(&xs) {
        return RegressionResult {
            slope: 0.0,
            intercept: y_mean,
            r_squared: 0.0,
            standard_error: 0.0,
            slope_p_value: 1.0,
            sample_size: n,
            status: AnalysisStatus::NoVariance,
        };
    }

    let (mut sxx, mut sxy, mut ss_tot) = (0.0, 0.0, 0.0);
    for p in points {
        let dx = p.x - x_mean;
        let dy = p.y - y_mean;
        sxx += dx * dx;
        sxy += dx * dy;
        ss_tot += dy * dy;
    }
    let slope = sxy / sxx;
    let intercept = y_mean - slope * x_mean;

    let ss_res: f64 = points
        .iter()
        .map(|p| (p.y - (intercept + slope * p.x)).powi(2))
        .sum();

    let r_squared = if ss_tot == 0.0 {
        0.0
    } else {
        (1.0 - ss_res / ss_tot).clamp(0.0, 1.0)
    };

    let (standard_error, slope_p_value) = if n > 2 {
        let se = (ss_res / (n - 2) as f64).sqrt();
        let slope_se = se / sxx.sqrt();
        let p = if slope_se > 0.0 {
            student_t_two_tailed_p(slope / slope_se, (n - 2) as f64)
        } else if slope != 0.0 {
            0.0
        } else {
            1.0
        };
        (se, p)
    } else {
        (0.0, 1.0)
    };

    RegressionResult {
        slope,
        intercept,
        r_squared,
        standard_error,
        slope_p_value,
        sample_size: n,
        status: AnalysisStatus::Computed,
    }
}

/// [`linear_regression`] over parallel x and y slices.
pub fn linear_regression_xy(x: &[f64], y: &[f64]) -> Result<RegressionResult, RiskError> {
    ensure_same_length(x.len(), y.len())?;
    let points: Vec<DataPoint> = x
        .iter()
        .zip(y)
        .map(|(&x, &y)| DataPoint { x, y })
        .collect();
    Ok(linear_regression(&points))
}

/// Configuration for logistic regression.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogisticRegressionConfig {
    pub learning_rate: f64,
    pub iterations: usize,
}

impl Default for LogisticRegressionConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            iterations: 1_000,
        }
    }
}

impl LogisticRegressionConfig {
    fn validate(self) -> Result<Self, RiskError> {
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(RiskError::ValidationError(
                "logistic_regression: learning_rate must be finite and > 0".into(),
            ));
        }
        if self.iterations == 0 {
            return Err(RiskError::ValidationError(
                "logistic_regression: iterations must be > 0".into(),
            ));
        }
        Ok(self)
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct LogisticRegressionResult {
    /// One weight per feature column.
    pub coefficients: Vec<f64>,
    pub intercept: f64,
    /// Training accuracy at a 0.5 threshold.
    pub accuracy: f64,
    /// Area under the ROC curve on the training data.
    pub auc: f64,
    /// Mean log-loss after the final iteration.
    pub log_loss: f64,
    pub iterations: usize,
    pub sample_size: usize,
    pub status: AnalysisStatus,
}

impl LogisticRegressionResult {
    /// P(outcome = true | features).
    pub fn predict_probability(&self, features: &[f64]) -> f64 {
        sigmoid(linear_score(&self.coefficients, self.intercept, features))
    }

    fn empty() -> Self {
        Self {
            coefficients: Vec::new(),
            intercept: 0.0,
            accuracy: 0.0,
            auc: 0.0,
            log_loss: 0.0,
            iterations: 0,
            sample_size: 0,
            status: AnalysisStatus::InsufficientData,
        }
    }
}

/// Logistic regression with the default learning rate (0.1) and 1000 iterations.
pub fn logistic_regression(
    features: &[Vec<f64>],
    outcomes: &[bool],
) -> Result<LogisticRegressionResult, RiskError> {
    logistic_regression_with_config(features, outcomes, LogisticRegressionConfig::default())
}

/// Fits a logistic model by batch gradient descent.
///
/// Empty input yields an all-zero `InsufficientData` result. A feature row
/// count different from the outcome count, or ragged rows, is a
/// [`RiskError::DimensionMismatch`].
pub fn logistic_regression_with_config(
    features: &[Vec<f64>],
    outcomes: &[bool],
    config: LogisticRegressionConfig,
) -> Result<LogisticRegressionResult, RiskError> {
    let config = config.validate()?;
    ensure_same_length(features.len(), outcomes.len())?;
    if features.is_empty() {
        return Ok(LogisticRegressionResult::empty());
    }

    let width = features[0].len();
    for row in features {
        ensure_same_length(width, row.len())?;
    }

    let n = features.len() as f64;
    let targets: Vec<f64> = outcomes.iter().map(|&o| if o { 1.0 } else { 0.0 }).collect();
    let mut weights = vec![0.0; width];
    let mut intercept = 0.0;
    let mut gradient = vec![0.0; width];

    for _ in 0..config.iterations {
        gradient.iter_mut().for_each(|g| *g = 0.0);
        let mut intercept_gradient = 0.0;
        for (row, &target) in features.iter().zip(&targets) {
            let error = sigmoid(linear_score(&weights, intercept, row)) - target;
            for (g, &x) in gradient.iter_mut().zip(row) {
                *g += error * x;
            }
            intercept_gradient += error;
        }
        for (w, g) in weights.iter_mut().zip(&gradient) {
            *w -= config.learning_rate * g / n;
        }
        intercept -= config.learning_rate * intercept_gradient / n;
    }

    let predictions: Vec<f64> = features
        .iter()
        .map(|row| sigmoid(linear_score(&weights, intercept, row)))
        .collect();

    let correct = predictions
        .iter()
        .zip(outcomes)
        .filter(|(p, o)| (**p >= DECISION_THRESHOLD) == **o)
        .count();
    let log_loss = predictions
        .iter()
        .zip(&targets)
        .map(|(&p, &y)| {
            let p = p.clamp(LOG_LOSS_EPSILON, 1.0 - LOG_LOSS_EPSILON);
            -(y * p.ln() + (1.0 - y) * (1.0 - p).ln())
        })
        .sum::<f64>()
        / n;

    #[cfg(feature = "tracing")]
    tracing::debug!(
        "logistic regression finished {} iterations over {} samples (log-loss = {:.6})",
        config.iterations,
        features.len(),
        log_loss
    );

    Ok(LogisticRegressionResult {
        coefficients: weights,
        intercept,
        accuracy: correct as f64 / n,
        auc: rank_auc(&predictions, outcomes),
        log_loss,
        iterations: config.iterations,
        sample_size: features.len(),
        status: AnalysisStatus::Computed,
    })
}

fn linear_score(weights: &[f64], intercept: f64, row: &[f64]) -> f64 {
    intercept + weights.iter().zip(row).map(|(w, x)| w * x).sum::<f64>()
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z.clamp(-SIGMOID_CLAMP, SIGMOID_CLAMP)).exp())
}

/// Rank-based AUC. With only one outcome class present the ranking carries no
/// information and 0.5 is returned.
fn rank_auc(predictions: &[f64], outcomes: &[bool]) -> f64 {
    let n_pos = outcomes.iter().filter(|&&o| o).count();
    let n_neg = outcomes.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return 0.5;
    }

    let mut order: Vec<usize> = (0..predictions.len()).collect();
    order.sort_by(|&a, &b| predictions[a].total_cmp(&predictions[b]));

    let mut positive_rank_sum = 0.0;
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && predictions[order[j + 1]] == predictions[order[i]] {
            j += 1;
        }
        // 1-based average rank of the tie block [i, j]
        let avg_rank = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            if outcomes[idx] {
                positive_rank_sum += avg_rank;
            }
        }
        i = j + 1;
    }

    let n_pos = n_pos as f64;
    let u = positive_rank_sum - n_pos * (n_pos + 1.0) / 2.0;
    u / (n_pos * n_neg as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn points(pairs: &[(f64, f64)]) -> Vec<DataPoint> {
        pairs.iter().copied().map(DataPoint::from).collect()
    }

    #[test]
    fn exact_line_has_unit_r_squared() {
        let data: Vec<DataPoint> = (0..10)
            .map(|i| DataPoint {
                x: i as f64,
                y: 2.0 * i as f64 + 1.0,
            })
            .collect();
        let fit = linear_regression(&data);
        assert!((fit.slope - 2.0).abs() < 1e-12);
        assert!((fit.intercept - 1.0).abs() < 1e-12);
        assert!((fit.r_squared - 1.0).abs() < 1e-12);
        assert!(fit.standard_error < 1e-9);
        assert!((fit.predict(20.0) - 41.0).abs() < 1e-9);
        assert_eq!(fit.status, AnalysisStatus::Computed);
    }

    #[test]
    fn noisy_fit_matches_hand_computation() {
        // x̄ = 2, ȳ = 3; Sxx = 10, Sxy = 8.5 → slope 0.85, intercept 1.3
        let fit = linear_regression(&points(&[
            (0.0, 1.0),
            (1.0, 2.5),
            (2.0, 3.0),
            (3.0, 4.0),
            (4.0, 4.5),
        ]));
        assert!((fit.slope - 0.85).abs() < 1e-12);
        assert!((fit.intercept - 1.3).abs() < 1e-12);
        // SSres = 0.275, SStot = 7.5
        assert!((fit.r_squared - (1.0 - 0.275 / 7.5)).abs() < 1e-12);
        assert!((fit.standard_error - (0.275f64 / 3.0).sqrt()).abs() < 1e-12);
        assert!(fit.slope_p_value < 0.01);
    }

    #[test]
    fn constant_y_has_zero_r_squared() {
        let fit = linear_regression(&points(&[(1.0, 4.0), (2.0, 4.0), (3.0, 4.0)]));
        assert_eq!(fit.r_squared, 0.0);
        assert_eq!(fit.slope, 0.0);
        assert_eq!(fit.slope_p_value, 1.0);
    }

    #[test]
    fn degenerate_inputs_are_flagged() {
        assert_eq!(
            linear_regression(&points(&[(1.0, 2.0)])).status,
            AnalysisStatus::InsufficientData
        );
        let flat_x = linear_regression(&points(&[(2.0, 1.0), (2.0, 5.0)]));
        assert_eq!(flat_x.status, AnalysisStatus::NoVariance);
        assert_eq!(flat_x.intercept, 3.0);
    }

    #[test]
    fn xy_variant_checks_lengths() {
        assert!(matches!(
            linear_regression_xy(&[1.0, 2.0], &[1.0]),
            Err(RiskError::DimensionMismatch { left: 2, right: 1 })
        ));
    }

    #[test]
    fn logistic_separates_linearly_separable_data() {
        let features: Vec<Vec<f64>> = (-5..=5)
            .filter(|&i| i != 0)
            .map(|i| vec![i as f64])
            .collect();
        let outcomes: Vec<bool> = features.iter().map(|row| row[0] > 0.0).collect();
        let fit = logistic_regression(&features, &outcomes).unwrap();
        assert_eq!(fit.accuracy, 1.0);
        assert_eq!(fit.auc, 1.0);
        assert!(fit.coefficients[0] > 0.0);
        assert!(fit.predict_probability(&[4.0]) > 0.9);
        assert!(fit.predict_probability(&[-4.0]) < 0.1);
        assert!(fit.log_loss < 0.2);
    }

    #[test]
    fn logistic_empty_input_is_all_zero() {
        let fit = logistic_regression(&[], &[]).unwrap();
        assert!(fit.coefficients.is_empty());
        assert_eq!(fit.accuracy, 0.0);
        assert_eq!(fit.auc, 0.0);
        assert_eq!(fit.status, AnalysisStatus::InsufficientData);
    }

    #[test]
    fn logistic_rejects_mismatched_and_ragged_inputs() {
        assert!(logistic_regression(&[vec![1.0]], &[true, false]).is_err());
        assert!(logistic_regression(&[vec![1.0], vec![1.0, 2.0]], &[true, false]).is_err());
        let bad_config = LogisticRegressionConfig {
            learning_rate: 0.0,
            iterations: 10,
        };
        assert!(logistic_regression_with_config(&[vec![1.0]], &[true], bad_config).is_err());
    }

    #[test]
    fn sigmoid_does_not_overflow() {
        assert_eq!(sigmoid(1e6), 1.0);
        assert!(sigmoid(-1e6) >= 0.0);
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-15);
    }

    #[test]
    fn auc_handles_ties_and_single_class() {
        // One positive tied with one negative: half credit for that pair.
        let auc = rank_auc(&[0.2, 0.5, 0.5, 0.9], &[false, true, false, true]);
        assert!((auc - 0.875).abs() < 1e-12, "auc {}", auc);
        assert_eq!(rank_auc(&[0.1, 0.2], &[true, true]), 0.5);
    }
}
