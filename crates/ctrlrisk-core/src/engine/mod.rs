//! Risk engines.
//!
//! This module provides:
//! - **errors**: Error type shared by every engine
//! - **rng**: Injectable random source and Box-Muller normal draws
//! - **special**: Gamma, log-gamma, incomplete beta, and normal CDF primitives
//! - **beta_bernoulli**: Conjugate posterior updates over control test evidence
//! - **fair**: Posterior-weighted FAIR loss exposure
//! - **monte_carlo**: Simulated annual loss distribution
//! - **cascade**: Topological cascade-risk propagation over control dependencies

pub mod beta_bernoulli;
pub mod cascade;
pub mod errors;
pub mod fair;
pub mod monte_carlo;
pub mod rng;
pub mod special;
