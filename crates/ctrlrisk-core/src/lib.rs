//! # ctrlrisk Core
//!
//! Numerical engines for control-risk quantification:
//!
//! - **engine::beta_bernoulli**: Beta-Bernoulli posterior scoring of pass/fail control evidence
//! - **engine::fair**: FAIR annualized loss exposure from a posterior breach probability
//! - **engine::monte_carlo**: Monte Carlo loss simulation over uncertain frequency and magnitude
//! - **engine::cascade**: dependency-graph cascade risk and what-if failure simulation
//! - **stats**: correlation, regression, bootstrap, and survival analysis
//!
//! Every entry point is pure and synchronous. Randomized operations take an
//! explicit [`engine::rng::RandomSource`] so results are reproducible under a seed.

pub mod engine;
pub mod stats;

// Re-export commonly used types
pub use engine::beta_bernoulli::{calculate_posterior, Posterior, Prior};
pub use engine::cascade::{propagate_cascade_risk, simulate_control_failure, CascadeResult};
pub use engine::errors::RiskError;
pub use engine::fair::{bayesian_fair, BayesianFairResult};
pub use engine::rng::RandomSource;
