//! Kaplan-Meier survival analysis.
//!
//! Product-limit estimator over the distinct observed times. At each time `t`
//! with `n` subjects at risk, `d` events and `c` censored observations:
//!
//! ```text
//! S(t) = S(t⁻) · (1 − d/n)
//! Var[S(t)] ≈ S(t)² · Σ d / (n (n − d))      (Greenwood)
//! ```
//!
//! and `n` drops by `d + c` before the next time. Greenwood terms with
//! `n = d` are skipped, since the survival estimate is already 0 there.

use crate::engine::errors::RiskError;
use crate::stats::ensure_same_length;

const Z_95: f64 = 1.96;

/// The survival curve at one distinct observed time.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct SurvivalPoint {
    pub time: f64,
    pub survival_probability: f64,
    /// Subjects at risk just before `time`.
    pub at_risk: usize,
    pub events: usize,
    pub censored: usize,
    /// Greenwood 95% band, clamped to [0, 1].
    pub lower: f64,
    pub upper: f64,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct SurvivalResult {
    /// One point per distinct time, ascending.
    pub points: Vec<SurvivalPoint>,
    /// First time at which survival is ≤ 0.5.
    pub median_survival: Option<f64>,
    pub total_events: usize,
    pub total_censored: usize,
    pub sample_size: usize,
}

impl SurvivalResult {
    /// Step-function value S(t); 1 before the first observed time.
    pub fn survival_at(&self, time: f64) -> f64 {
        self.points
            .iter()
            .take_while(|p| p.time <= time)
            .last()
            .map_or(1.0, |p| p.survival_probability)
    }
}

/// Estimates the survival curve from times and event indicators.
///
/// `event_occurred[i] == false` marks observation `i` as censored. Unequal
/// lengths are a [`RiskError::DimensionMismatch`]; non-finite times are rejected.
pub fn kaplan_meier(
    time_to_event: &[f64],
    event_occurred: &[bool],
) -> Result<SurvivalResult, RiskError> {
    ensure_same_length(time_to_event.len(), event_occurred.len())?;
    if let Some(bad) = time_to_event.iter().find(|t| !t.is_finite()) {
        return Err(RiskError::ValidationError(format!(
            "kaplan_meier: time values must be finite, got {}",
            bad
        )));
    }

    let mut order: Vec<usize> = (0..time_to_event.len()).collect();
    order.sort_by(|&a, &b| time_to_event[a].total_cmp(&time_to_event[b]));

    let mut at_risk = order.len();
    let mut survival = 1.0;
    let mut greenwood_sum = 0.0;
    let mut points = Vec::new();
    let mut median_survival = None;
    let (mut total_events, mut total_censored) = (0usize, 0usize);

    let mut i = 0;
    while i < order.len() {
        let time = time_to_event[order[i]];
        let (mut events, mut censored) = (0usize, 0usize);
        while i < order.len() && time_to_event[order[i]] == time {
            if event_occurred[order[i]] {
                events += 1;
            } else {
                censored += 1;
            }
            i += 1;
        }

        if events > 0 {
            let n = at_risk as f64;
            let d = events as f64;
            survival *= 1.0 - d / n;
            if at_risk > events {
                greenwood_sum += d / (n * (n - d));
            }
        }

        let half_width = Z_95 * survival * greenwood_sum.sqrt();
        points.push(SurvivalPoint {
            time,
            survival_probability: survival,
            at_risk,
            events,
            censored,
            lower: (survival - half_width).clamp(0.0, 1.0),
            upper: (survival + half_width).clamp(0.0, 1.0),
        });

        if median_survival.is_none() && survival <= 0.5 {
            median_survival = Some(time);
        }

        total_events += events;
        total_censored += censored;
        at_risk -= events + censored;
    }

    Ok(SurvivalResult {
        points,
        median_survival,
        total_events,
        total_censored,
        sample_size: time_to_event.len(),
    })
}
