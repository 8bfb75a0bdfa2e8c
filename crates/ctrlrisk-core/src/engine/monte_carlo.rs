//! Monte Carlo annual-loss simulation.
//!
//! Each trial draws
//! - breach probability `p` from the evidence posterior Beta(α', β'),
//! - threat event frequency from N(tef_mean, tef_std_dev²) truncated at zero,
//! - loss magnitude from N(loss_mean, loss_std_dev²) truncated at zero,
//!
//! and records `p × TEF × LM`. Unlike [`crate::engine::fair::bayesian_fair`],
//! the resulting distribution reflects uncertainty in all three factors.

use crate::engine::beta_bernoulli::{
    calculate_posterior, sample_beta_distribution_with_config, Prior, SamplingConfig,
};
use crate::engine::errors::RiskError;
use crate::engine::fair::check_non_negative;
use crate::engine::rng::{normal, RandomSource};
use crate::stats::descriptive::{mean, percentile_of_sorted, standard_deviation};

const DEFAULT_ITERATIONS: usize = 10_000;

/// Uncertain frequency and magnitude inputs.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct LossScenario {
    pub tef_mean: f64,
    pub tef_std_dev: f64,
    pub loss_mean: f64,
    pub loss_std_dev: f64,
}

impl LossScenario {
    fn validate(&self) -> Result<(), RiskError> {
        check_non_negative("tef_mean", self.tef_mean)?;
        check_non_negative("tef_std_dev", self.tef_std_dev)?;
        check_non_negative("loss_mean", self.loss_mean)?;
        check_non_negative("loss_std_dev", self.loss_std_dev)?;
        Ok(())
    }
}

/// Configuration for the simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonteCarloConfig {
    pub iterations: usize,
    pub sampling: SamplingConfig,
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
            sampling: SamplingConfig::default(),
        }
    }
}

impl MonteCarloConfig {
    fn validate(self) -> Result<Self, RiskError> {
        if self.iterations == 0 {
            return Err(RiskError::ValidationError(
                "simulate_annual_loss: iterations must be > 0".into(),
            ));
        }
        Ok(self)
    }
}

/// Summary of the simulated annual-loss distribution.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct LossDistribution {
    pub iterations: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub p5: f64,
    pub p50: f64,
    pub p95: f64,
    pub max: f64,
    /// Sorted simulated losses.
    #[cfg_attr(feature = "serde", serde(skip))]
    losses: Vec<f64>,
}

impl LossDistribution {
    /// Share of simulated years whose loss exceeds `threshold`.
    pub fn exceedance_probability(&self, threshold: f64) -> f64 {
        if self.losses.is_empty() {
            return 0.0;
        }
        let at_or_below = self.losses.partition_point(|&l| l <= threshold);
        (self.losses.len() - at_or_below) as f64 / self.losses.len() as f64
    }

    /// Loss at quantile `q` of the simulated years, e.g. 0.99 for a 1-in-100 year.
    pub fn percentile(&self, q: f64) -> f64 {
        percentile_of_sorted(&self.losses, q)
    }

    pub fn losses(&self) -> &[f64] {
        &self.losses
    }
}

/// Simulates annual loss with the default configuration.
pub fn simulate_annual_loss<R: RandomSource + ?Sized>(
    prior: &Prior,
    passes: u64,
    failures: u64,
    scenario: &LossScenario,
    rng: &mut R,
) -> Result<LossDistribution, RiskError> {
    simulate_annual_loss_with_config(
        prior,
        passes,
        failures,
        scenario,
        MonteCarloConfig::default(),
        rng,
    )
}

/// Simulates annual loss with explicit configuration.
pub fn simulate_annual_loss_with_config<R: RandomSource + ?Sized>(
    prior: &Prior,
    passes: u64,
    failures: u64,
    scenario: &LossScenario,
    config: MonteCarloConfig,
    rng: &mut R,
) -> Result<LossDistribution, RiskError> {
    let config = config.validate()?;
    scenario.validate()?;
    let posterior = calculate_posterior(prior, passes, failures)?;

    let probabilities = sample_beta_distribution_with_config(
        posterior.alpha,
        posterior.beta,
        config.iterations,
        config.sampling,
        rng,
    )?;

    let mut losses: Vec<f64> = probabilities
        .into_iter()
        .map(|p| {
            let tef = normal(rng, scenario.tef_mean, scenario.tef_std_dev).max(0.0);
            let magnitude = normal(rng, scenario.loss_mean, scenario.loss_std_dev).max(0.0);
            p * tef * magnitude
        })
        .collect();

    if losses.iter().any(|l| !l.is_finite()) {
        return Err(RiskError::Numerical(
            "simulate_annual_loss: non-finite loss sample".into(),
        ));
    }
    losses.sort_by(f64::total_cmp);

    Ok(LossDistribution {
        iterations: config.iterations,
        mean: mean(&losses),
        std_dev: standard_deviation(&losses),
        p5: percentile_of_sorted(&losses, 0.05),
        p50: percentile_of_sorted(&losses, 0.50),
        p95: percentile_of_sorted(&losses, 0.95),
        max: losses.last().copied().unwrap_or(0.0),
        losses,
    })
}
