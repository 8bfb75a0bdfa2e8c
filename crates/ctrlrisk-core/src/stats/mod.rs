//! Statistical toolkit for validating relationships in collected control data.
//!
//! - **descriptive**: mean, variance, standard deviation, covariance, percentiles
//! - **correlation**: Pearson r with t-test significance and Fisher-z interval
//! - **regression**: ordinary least squares and gradient-descent logistic regression
//! - **bootstrap**: percentile bootstrap confidence intervals
//! - **survival**: Kaplan-Meier product-limit estimator
//!
//! Too little data and zero variance are reported through [`AnalysisStatus`]
//! on the result rather than as errors, so a dashboard can render
//! "not enough data yet" instead of failing.

pub mod bootstrap;
pub mod correlation;
pub mod descriptive;
pub mod regression;
pub mod survival;

/// A paired (x, y) observation.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DataPoint {
    pub x: f64,
    pub y: f64,
}

impl From<(f64, f64)> for DataPoint {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

/// Two-sided interval for an estimated quantity.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConfidenceInterval {
    pub lower: f64,
    pub upper: f64,
}

impl ConfidenceInterval {
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }

    pub fn contains(&self, value: f64) -> bool {
        self.lower <= value && value <= self.upper
    }
}

/// Whether an analysis produced a meaningful estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum AnalysisStatus {
    Computed,
    /// Too few observations for the estimator.
    InsufficientData,
    /// At least one variable is constant.
    NoVariance,
}

impl AnalysisStatus {
    pub fn is_computed(&self) -> bool {
        matches!(self, AnalysisStatus::Computed)
    }
}

pub(crate) fn ensure_same_length(left: usize, right: usize) -> Result<(), crate::RiskError> {
    if left == right {
        Ok(())
    } else {
        Err(crate::RiskError::DimensionMismatch { left, right })
    }
}
