//! FAIR loss exposure from a Bayesian breach posterior.
//!
//! ALE = E[p] × TEF × LM, where `p` is the posterior breach probability,
//! TEF the threat event frequency (events/year) and LM the loss magnitude.
//!
//! The ALE interval scales the posterior credible interval by TEF × LM. This is a
//! linear approximation: it carries the uncertainty in `p` only, and treats TEF
//! and LM as exact. [`crate::engine::monte_carlo`] propagates all three.

use crate::engine::beta_bernoulli::{calculate_posterior, CredibleInterval, Posterior, Prior};
use crate::engine::errors::RiskError;

/// Evidence below this count is weak.
const WEAK_EVIDENCE_LIMIT: u64 = 10;
/// Evidence below this count is moderate.
const MODERATE_EVIDENCE_LIMIT: u64 = 50;
/// Evidence below this count is strong; at or above it, very strong.
const STRONG_EVIDENCE_LIMIT: u64 = 200;

/// How much real evidence backs the posterior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum EvidenceStrength {
    Weak,
    Moderate,
    Strong,
    VeryStrong,
}

impl EvidenceStrength {
    pub fn classify(total_evidence: u64) -> Self {
        if total_evidence < WEAK_EVIDENCE_LIMIT {
            EvidenceStrength::Weak
        } else if total_evidence < MODERATE_EVIDENCE_LIMIT {
            EvidenceStrength::Moderate
        } else if total_evidence < STRONG_EVIDENCE_LIMIT {
            EvidenceStrength::Strong
        } else {
            EvidenceStrength::VeryStrong
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EvidenceStrength::Weak => "weak",
            EvidenceStrength::Moderate => "moderate",
            EvidenceStrength::Strong => "strong",
            EvidenceStrength::VeryStrong => "very_strong",
        }
    }
}

/// Posterior-weighted annualized loss exposure.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct BayesianFairResult {
    pub posterior: Posterior,
    pub threat_event_frequency: f64,
    pub loss_magnitude: f64,
    pub annualized_loss_exposure: f64,
    /// Credible interval scaled by TEF × LM.
    pub confidence_interval: CredibleInterval,
    pub evidence_strength: EvidenceStrength,
    /// Fraction of the posterior weight still attributable to the prior.
    pub prior_influence: f64,
}

/// Combines the evidence posterior with threat frequency and loss magnitude.
pub fn bayesian_fair(
    prior: &Prior,
    passes: u64,
    failures: u64,
    threat_event_frequency: f64,
    loss_magnitude: f64,
) -> Result<BayesianFairResult, RiskError> {
    check_non_negative("threat_event_frequency", threat_event_frequency)?;
    check_non_negative("loss_magnitude", loss_magnitude)?;

    let posterior = calculate_posterior(prior, passes, failures)?;
    let scale = threat_event_frequency * loss_magnitude;

    let prior_weight = prior.weight();
    let prior_influence = prior_weight / (prior_weight + posterior.total_evidence as f64);

    Ok(BayesianFairResult {
        annualized_loss_exposure: posterior.mean * scale,
        confidence_interval: CredibleInterval {
            lower: posterior.credible_interval.lower * scale,
            upper: posterior.credible_interval.upper * scale,
        },
        evidence_strength: EvidenceStrength::classify(posterior.total_evidence),
        prior_influence,
        threat_event_frequency,
        loss_magnitude,
        posterior,
    })
}

pub(crate) fn check_non_negative(field: &str, value: f64) -> Result<f64, RiskError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(RiskError::ValidationError(format!(
            "{} must be finite and >= 0, got {}",
            field, value
        )))
    }
}
