//! # Beta-Bernoulli Risk Scoring
//!
//! Turns pass/fail control-test evidence into a posterior over breach probability.
//!
//! ## Model
//!
//! - Prior: `p ~ Beta(α, β)` where `p` is the probability that the control fails
//!   in a way that leads to a breach
//! - Evidence: `k` failures and `m` passes
//! - Posterior: `Beta(α + k, β + m)`
//!
//! Failures add to α (the "breach mass"), passes add to β. The prior weight
//! `α + β` acts as a pseudo-count of observations, so `confidence_level`
//! measures how much of the posterior is driven by real evidence.
//!
//! ## Credible interval
//!
//! The 95% interval is the normal approximation `mean ± 1.96·sd`, clamped to
//! [0, 1]. It is inaccurate near 0/1 and for small evidence counts; use
//! [`Posterior::probability_exceeds`] when an exact Beta tail is needed.

use chrono::{DateTime, Utc};

use crate::engine::errors::RiskError;
use crate::engine::rng::{standard_normal, RandomSource};
use crate::engine::special::{ln_beta, regularized_incomplete_beta};

/// z-score for a two-sided 95% interval.
const Z_95: f64 = 1.96;

/// Default bound on Jöhnk rejection attempts for a single draw.
const DEFAULT_MAX_ATTEMPTS_PER_DRAW: usize = 1_000;

/// Belief about breach probability before any evidence.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Prior {
    /// Pseudo-count of failures
    pub alpha: f64,
    /// Pseudo-count of passes
    pub beta: f64,
    /// Where the prior came from (industry report, historical baseline, ...)
    #[cfg_attr(feature = "serde", serde(default))]
    pub source: String,
}

impl Prior {
    /// Creates a validated prior.
    pub fn new(alpha: f64, beta: f64, source: impl Into<String>) -> Result<Self, RiskError> {
        let prior = Self {
            alpha,
            beta,
            source: source.into(),
        };
        prior.validate()?;
        Ok(prior)
    }

    /// Beta(1, 1): every breach probability equally likely.
    pub fn uniform() -> Self {
        Self {
            alpha: 1.0,
            beta: 1.0,
            source: "uniform".into(),
        }
    }

    /// Builds a prior centred on `base_rate` worth `strength` pseudo-observations.
    ///
    /// A 6% industry breach rate held with the weight of 50 observations gives
    /// Beta(3, 47).
    pub fn from_base_rate(
        base_rate: f64,
        strength: f64,
        source: impl Into<String>,
    ) -> Result<Self, RiskError> {
        RiskError::check_probability("base_rate", base_rate)?;
        Self::new(base_rate * strength, (1.0 - base_rate) * strength, source)
    }

    /// Prior weight α + β.
    pub fn weight(&self) -> f64 {
        self.alpha + self.beta
    }

    /// Prior mean α / (α + β).
    pub fn mean(&self) -> f64 {
        self.alpha / self.weight()
    }

    pub fn validate(&self) -> Result<(), RiskError> {
        validate_shape(self.alpha, self.beta)
    }
}

fn validate_shape(alpha: f64, beta: f64) -> Result<(), RiskError> {
    if alpha > 0.0 && beta > 0.0 && alpha.is_finite() && beta.is_finite() {
        Ok(())
    } else {
        Err(RiskError::InvalidPrior { alpha, beta })
    }
}

/// Closed interval on the probability scale.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CredibleInterval {
    pub lower: f64,
    pub upper: f64,
}

impl CredibleInterval {
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }
}

/// Beta posterior over breach probability with summary statistics.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Posterior {
    pub alpha: f64,
    pub beta: f64,
    pub mean: f64,
    pub variance: f64,
    /// Posterior mode, or the mean when either shape is ≤ 1.
    pub mode: f64,
    /// Normal-approximation 95% interval, clamped to [0, 1].
    pub credible_interval: CredibleInterval,
    /// Passes + failures observed.
    pub total_evidence: u64,
    /// Share of the posterior weight contributed by evidence, in [0, 1].
    pub confidence_level: f64,
}

impl Posterior {
    pub fn standard_deviation(&self) -> f64 {
        self.variance.sqrt()
    }

    /// P(p > threshold) under the exact Beta posterior.
    pub fn probability_exceeds(&self, threshold: f64) -> f64 {
        1.0 - regularized_incomplete_beta(threshold, self.alpha, self.beta)
    }
}

/// Aggregated pass/fail counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EvidenceCounts {
    pub passes: u64,
    pub failures: u64,
}

impl EvidenceCounts {
    /// Passes plus failures, saturating at `u64::MAX`.
    pub fn total(&self) -> u64 {
        self.passes.saturating_add(self.failures)
    }

    /// Component-wise sum; overflow is a [`RiskError::ValidationError`].
    pub fn checked_add(self, other: EvidenceCounts) -> Result<Self, RiskError> {
        match (
            self.passes.checked_add(other.passes),
            self.failures.checked_add(other.failures),
        ) {
            (Some(passes), Some(failures)) => Ok(EvidenceCounts { passes, failures }),
            _ => Err(RiskError::ValidationError(
                "evidence counts overflow u64".into(),
            )),
        }
    }
}

/// Evidence as reported by a collector, one variant per payload shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "camelCase"))]
pub enum EvidencePayload {
    /// Batch of test results.
    PassFail { passes: u64, failures: u64 },
    /// A single test outcome.
    Outcome { passed: bool },
}

impl EvidencePayload {
    pub fn counts(&self) -> EvidenceCounts {
        match *self {
            EvidencePayload::PassFail { passes, failures } => EvidenceCounts { passes, failures },
            EvidencePayload::Outcome { passed: true } => EvidenceCounts {
                passes: 1,
                failures: 0,
            },
            EvidencePayload::Outcome { passed: false } => EvidenceCounts {
                passes: 0,
                failures: 1,
            },
        }
    }
}

/// Sums a batch of payloads into cumulative counts, saturating at `u64::MAX`.
pub fn aggregate_evidence(payloads: &[EvidencePayload]) -> EvidenceCounts {
    payloads
        .iter()
        .map(EvidencePayload::counts)
        .fold(EvidenceCounts::default(), |acc, c| EvidenceCounts {
            passes: acc.passes.saturating_add(c.passes),
            failures: acc.failures.saturating_add(c.failures),
        })
}

/// Test outcomes collected at one point in time.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EvidencePoint {
    pub timestamp: DateTime<Utc>,
    pub passes: u64,
    pub failures: u64,
}

impl EvidencePoint {
    pub fn from_payload(timestamp: DateTime<Utc>, payload: &EvidencePayload) -> Self {
        let counts = payload.counts();
        Self {
            timestamp,
            passes: counts.passes,
            failures: counts.failures,
        }
    }
}

/// Posterior after all evidence up to and including `timestamp`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct PosteriorTimeSeriesPoint {
    pub timestamp: DateTime<Utc>,
    pub cumulative_passes: u64,
    pub cumulative_failures: u64,
    pub posterior: Posterior,
}

/// Configuration for Beta sampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplingConfig {
    /// Rejection attempts per draw before falling back to the normal approximation.
    pub max_attempts_per_draw: usize,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            max_attempts_per_draw: DEFAULT_MAX_ATTEMPTS_PER_DRAW,
        }
    }
}

impl SamplingConfig {
    fn validate(self) -> Result<Self, RiskError> {
        if self.max_attempts_per_draw == 0 {
            return Err(RiskError::ValidationError(
                "sample_beta: max_attempts_per_draw must be > 0".into(),
            ));
        }
        Ok(self)
    }
}

/// Updates `prior` with cumulative evidence.
///
/// α' = α + failures, β' = β + passes. A total evidence count beyond
/// `u64::MAX` is a [`RiskError::ValidationError`].
pub fn calculate_posterior(
    prior: &Prior,
    total_passes: u64,
    total_failures: u64,
) -> Result<Posterior, RiskError> {
    prior.validate()?;
    let total_evidence = total_passes.checked_add(total_failures).ok_or_else(|| {
        RiskError::ValidationError(format!(
            "evidence total overflows u64: {} passes + {} failures",
            total_passes, total_failures
        ))
    })?;

    let alpha = prior.alpha + total_failures as f64;
    let beta = prior.beta + total_passes as f64;
    let sum = alpha + beta;

    let mean = alpha / sum;
    let variance = (alpha * beta) / (sum * sum * (sum + 1.0));
    let mode = if alpha > 1.0 && beta > 1.0 {
        (alpha - 1.0) / (sum - 2.0)
    } else {
        mean
    };

    let half_width = Z_95 * variance.sqrt();
    let credible_interval = CredibleInterval {
        lower: (mean - half_width).clamp(0.0, 1.0),
        upper: (mean + half_width).clamp(0.0, 1.0),
    };

    let evidence = total_evidence as f64;
    let confidence_level = evidence / (evidence + prior.weight());

    Ok(Posterior {
        alpha,
        beta,
        mean,
        variance,
        mode,
        credible_interval,
        total_evidence,
        confidence_level,
    })
}

/// Beta(α, β) density at `x`, computed in log space.
///
/// Returns 0 outside the open interval (0, 1).
pub fn beta_pdf(x: f64, alpha: f64, beta: f64) -> Result<f64, RiskError> {
    validate_shape(alpha, beta)?;
    if !(x > 0.0 && x < 1.0) {
        return Ok(0.0);
    }
    let ln_density = (alpha - 1.0) * x.ln() + (beta - 1.0) * (1.0 - x).ln() - ln_beta(alpha, beta);
    Ok(ln_density.exp())
}

/// Draws `n` samples from Beta(α, β) with the default sampling configuration.
pub fn sample_beta_distribution<R: RandomSource + ?Sized>(
    alpha: f64,
    beta: f64,
    n: usize,
    rng: &mut R,
) -> Result<Vec<f64>, RiskError> {
    sample_beta_distribution_with_config(alpha, beta, n, SamplingConfig::default(), rng)
}

/// Draws `n` samples from Beta(α, β).
///
/// With α ≥ 1 and β ≥ 1 each draw uses Jöhnk's rejection method; a draw that
/// is not accepted within `max_attempts_per_draw` tries comes from the normal
/// approximation instead. Shapes below 1 always use the normal approximation.
/// Normal-approximation draws are clamped to [0, 1].
pub fn sample_beta_distribution_with_config<R: RandomSource + ?Sized>(
    alpha: f64,
    beta: f64,
    n: usize,
    config: SamplingConfig,
    rng: &mut R,
) -> Result<Vec<f64>, RiskError> {
    validate_shape(alpha, beta)?;
    let config = config.validate()?;

    let sum = alpha + beta;
    let mean = alpha / sum;
    let std_dev = ((alpha * beta) / (sum * sum * (sum + 1.0))).sqrt();
    let use_johnk = alpha >= 1.0 && beta >= 1.0;

    let mut samples = Vec::with_capacity(n);
    let mut fallbacks = 0usize;
    for _ in 0..n {
        let draw = if use_johnk {
            johnk_draw(alpha, beta, config.max_attempts_per_draw, rng)
        } else {
            None
        };
        let value = match draw {
            Some(v) => v,
            None => {
                if use_johnk {
                    fallbacks += 1;
                }
                (mean + std_dev * standard_normal(rng)).clamp(0.0, 1.0)
            }
        };
        samples.push(value);
    }

    if fallbacks > 0 {
        #[cfg(feature = "tracing")]
        tracing::debug!(
            "Jöhnk sampling for Beta({:.3}, {:.3}) fell back to normal approximation for {} of {} draws",
            alpha,
            beta,
            fallbacks,
            n
        );
    }

    Ok(samples)
}

fn johnk_draw<R: RandomSource + ?Sized>(
    alpha: f64,
    beta: f64,
    max_attempts: usize,
    rng: &mut R,
) -> Option<f64> {
    for _ in 0..max_attempts {
        let x = rng.next_f64().powf(1.0 / alpha);
        let y = rng.next_f64().powf(1.0 / beta);
        let s = x + y;
        if s <= 1.0 && s > 0.0 {
            return Some(x / s);
        }
    }
    None
}

/// Replays evidence in chronological order, recomputing the posterior after each point.
///
/// Points are stably sorted by timestamp first; the output has one entry per input point.
pub fn generate_posterior_time_series(
    prior: &Prior,
    evidence_points: &[EvidencePoint],
) -> Result<Vec<PosteriorTimeSeriesPoint>, RiskError> {
    prior.validate()?;

    let mut ordered: Vec<&EvidencePoint> = evidence_points.iter().collect();
    ordered.sort_by_key(|p| p.timestamp);

    let mut cumulative = EvidenceCounts::default();
    let mut series = Vec::with_capacity(ordered.len());
    for point in ordered {
        cumulative = cumulative.checked_add(EvidenceCounts {
            passes: point.passes,
            failures: point.failures,
        })?;
        series.push(PosteriorTimeSeriesPoint {
            timestamp: point.timestamp,
            cumulative_passes: cumulative.passes,
            cumulative_failures: cumulative.failures,
            posterior: calculate_posterior(prior, cumulative.passes, cumulative.failures)?,
        });
    }
    Ok(series)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn assert_close(actual: f64, expected: f64, tol: f64, label: &str) {
        assert!(
            (actual - expected).abs() <= tol,
            "{} mismatch: expected {:.12}, got {:.12}",
            label,
            expected,
            actual
        );
    }

    fn industry_prior() -> Prior {
        Prior::new(3.0, 47.0, "industry baseline").expect("prior")
    }

    #[test]
    fn no_evidence_posterior_equals_prior() {
        let prior = industry_prior();
        let post = calculate_posterior(&prior, 0, 0).unwrap();
        assert_close(post.mean, 3.0 / 50.0, 1e-15, "mean");
        assert_eq!(post.total_evidence, 0);
        assert_eq!(post.confidence_level, 0.0);
    }

    #[test]
    fn posterior_matches_closed_form() {
        // Beta(3 + 6, 47 + 94) = Beta(9, 141)
        let post = calculate_posterior(&industry_prior(), 94, 6).unwrap();
        assert_close(post.alpha, 9.0, 1e-12, "alpha");
        assert_close(post.beta, 141.0, 1e-12, "beta");
        assert_close(post.mean, 0.06, 1e-12, "mean");
        assert_close(
            post.variance,
            9.0 * 141.0 / (150.0 * 150.0 * 151.0),
            1e-15,
            "variance",
        );
        assert_close(post.mode, 8.0 / 148.0, 1e-12, "mode");
        assert_close(post.confidence_level, 100.0 / 150.0, 1e-12, "confidence");
        let sd = post.standard_deviation();
        assert_close(post.credible_interval.lower, 0.06 - 1.96 * sd, 1e-12, "lower");
        assert_close(post.credible_interval.upper, 0.06 + 1.96 * sd, 1e-12, "upper");
    }

    #[test]
    fn mode_falls_back_to_mean_for_small_shapes() {
        let prior = Prior::new(0.5, 0.5, "jeffreys").unwrap();
        let post = calculate_posterior(&prior, 0, 0).unwrap();
        assert_eq!(post.mode, post.mean);
    }

    #[test]
    fn credible_interval_is_clamped() {
        // Near zero the normal approximation would go negative.
        let post = calculate_posterior(&Prior::uniform(), 3, 0).unwrap();
        assert_eq!(post.credible_interval.lower, 0.0);
        assert!(post.credible_interval.upper <= 1.0);
    }

    #[test]
    fn invalid_prior_is_rejected() {
        let bad = Prior {
            alpha: 0.0,
            beta: 1.0,
            source: "bad".into(),
        };
        assert!(matches!(
            calculate_posterior(&bad, 1, 1),
            Err(RiskError::InvalidPrior { .. })
        ));
        assert!(Prior::new(1.0, -2.0, "bad").is_err());
        assert!(beta_pdf(0.5, 1.0, 0.0).is_err());
    }

    #[test]
    fn base_rate_prior() {
        let prior = Prior::from_base_rate(0.06, 50.0, "industry").unwrap();
        assert_close(prior.alpha, 3.0, 1e-12, "alpha");
        assert_close(prior.beta, 47.0, 1e-12, "beta");
        assert!(Prior::from_base_rate(1.2, 50.0, "bad").is_err());
    }

    #[test]
    fn beta_pdf_known_values() {
        // Beta(2, 2) density is 6x(1-x)
        assert_close(beta_pdf(0.5, 2.0, 2.0).unwrap(), 1.5, 1e-10, "Beta(2,2) at 0.5");
        assert_close(beta_pdf(0.3, 1.0, 1.0).unwrap(), 1.0, 1e-10, "uniform");
        assert_eq!(beta_pdf(0.0, 2.0, 2.0).unwrap(), 0.0);
        assert_eq!(beta_pdf(1.2, 2.0, 2.0).unwrap(), 0.0);
    }

    #[test]
    fn beta_pdf_large_shapes_stay_finite() {
        let d = beta_pdf(0.3, 3_000.0, 7_000.0).unwrap();
        assert!(d.is_finite() && d > 0.0, "density {}", d);
    }

    #[test]
    fn exceedance_probability_uses_exact_tail() {
        let post = calculate_posterior(&Prior::uniform(), 0, 0).unwrap();
        assert_close(post.probability_exceeds(0.25), 0.75, 1e-10, "uniform tail");
    }

    #[test]
    fn sampling_is_reproducible_and_centred() {
        let mut a = StdRng::seed_from_u64(99);
        let mut b = StdRng::seed_from_u64(99);
        let xs = sample_beta_distribution(2.0, 5.0, 4_000, &mut a).unwrap();
        let ys = sample_beta_distribution(2.0, 5.0, 4_000, &mut b).unwrap();
        assert_eq!(xs, ys);
        assert!(xs.iter().all(|x| (0.0..=1.0).contains(x)));
        let mean = xs.iter().sum::<f64>() / xs.len() as f64;
        assert_close(mean, 2.0 / 7.0, 0.015, "sample mean");
    }

    #[test]
    fn sampling_terminates_for_large_shapes() {
        // Jöhnk acceptance is ~1e-29 here; the attempt bound forces the fallback.
        let mut rng = StdRng::seed_from_u64(5);
        let config = SamplingConfig {
            max_attempts_per_draw: 50,
        };
        let xs = sample_beta_distribution_with_config(60.0, 140.0, 500, config, &mut rng).unwrap();
        let mean = xs.iter().sum::<f64>() / xs.len() as f64;
        assert_close(mean, 0.3, 0.01, "fallback mean");
    }

    #[test]
    fn sampling_small_shapes_uses_normal_approximation() {
        let mut rng = StdRng::seed_from_u64(8);
        let xs = sample_beta_distribution(0.5, 0.5, 200, &mut rng).unwrap();
        assert_eq!(xs.len(), 200);
        assert!(xs.iter().all(|x| (0.0..=1.0).contains(x)));
    }

    #[test]
    fn time_series_accumulates_in_chronological_order() {
        let t = |day: u32| Utc.with_ymd_and_hms(2024, 3, day, 0, 0, 0).unwrap();
        let points = vec![
            EvidencePoint {
                timestamp: t(3),
                passes: 10,
                failures: 0,
            },
            EvidencePoint {
                timestamp: t(1),
                passes: 5,
                failures: 2,
            },
            EvidencePoint::from_payload(t(2), &EvidencePayload::Outcome { passed: false }),
        ];
        let series = generate_posterior_time_series(&Prior::uniform(), &points).unwrap();
        assert_eq!(series.len(), 3);
        assert_eq!(series[0].timestamp, t(1));
        assert_eq!(
            (series[1].cumulative_passes, series[1].cumulative_failures),
            (5, 3)
        );
        assert_eq!(series[2].posterior.total_evidence, 18);
        assert_close(series[2].posterior.alpha, 4.0, 1e-12, "final alpha");
    }

    #[test]
    fn aggregate_evidence_sums_payloads() {
        let counts = aggregate_evidence(&[
            EvidencePayload::PassFail {
                passes: 8,
                failures: 2,
            },
            EvidencePayload::Outcome { passed: true },
            EvidencePayload::Outcome { passed: false },
        ]);
        assert_eq!(
            counts,
            EvidenceCounts {
                passes: 9,
                failures: 3
            }
        );
        assert_eq!(counts.total(), 12);
    }

    #[test]
    fn evidence_overflow_is_rejected_not_wrapped() {
        assert!(matches!(
            calculate_posterior(&Prior::uniform(), u64::MAX, 1),
            Err(RiskError::ValidationError(_))
        ));
        let max = calculate_posterior(&Prior::uniform(), u64::MAX, 0).unwrap();
        assert_eq!(max.total_evidence, u64::MAX);

        let t = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let points = vec![
            EvidencePoint {
                timestamp: t,
                passes: u64::MAX,
                failures: 0,
            },
            EvidencePoint {
                timestamp: t,
                passes: 1,
                failures: 0,
            },
        ];
        assert!(generate_posterior_time_series(&Prior::uniform(), &points).is_err());
    }

    #[test]
    fn aggregate_evidence_saturates() {
        let counts = aggregate_evidence(&[
            EvidencePayload::PassFail {
                passes: u64::MAX,
                failures: u64::MAX,
            },
            EvidencePayload::Outcome { passed: true },
            EvidencePayload::Outcome { passed: false },
        ]);
        assert_eq!(counts.passes, u64::MAX);
        assert_eq!(counts.total(), u64::MAX);
        assert!(counts.checked_add(EvidenceCounts { passes: 0, failures: 1 }).is_err());
        assert_eq!(
            EvidenceCounts { passes: 1, failures: 2 }
                .checked_add(EvidenceCounts { passes: 3, failures: 4 })
                .unwrap(),
            EvidenceCounts { passes: 4, failures: 6 }
        );
    }
}
