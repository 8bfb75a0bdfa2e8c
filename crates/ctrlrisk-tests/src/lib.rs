//! Shared fixtures for the ctrlrisk integration and property tests.

use ctrlrisk_core::engine::beta_bernoulli::Prior;
use ctrlrisk_core::engine::cascade::{ControlNode, DependencyEdge};

pub fn assert_close(actual: f64, expected: f64, tol: f64, label: &str) {
    assert!(
        (actual - expected).abs() <= tol,
        "{} mismatch: expected {:.15}, got {:.15}, diff={:.3e}",
        label,
        expected,
        actual,
        (actual - expected).abs()
    );
}

/// Composite Simpson's rule over [a, b] with `n` subintervals (rounded up to even).
pub fn simpson<F: Fn(f64) -> f64>(f: F, a: f64, b: f64, n: usize) -> f64 {
    let n = if n % 2 == 0 { n } else { n + 1 };
    let h = (b - a) / n as f64;
    let interior: f64 = (1..n)
        .map(|i| {
            let weight = if i % 2 == 1 { 4.0 } else { 2.0 };
            weight * f(a + i as f64 * h)
        })
        .sum();
    (f(a) + interior + f(b)) * h / 3.0
}

/// 6% industry breach rate held with the weight of 50 observations.
pub fn industry_prior() -> Prior {
    Prior {
        alpha: 3.0,
        beta: 47.0,
        source: "industry breach report".into(),
    }
}

pub fn control(id: &str, failure_probability: f64) -> ControlNode {
    ControlNode {
        id: id.into(),
        name: format!("Control {}", id),
        pass_rate: 1.0 - failure_probability,
        failure_probability,
        category: "technical".into(),
    }
}

pub fn dependency(parent: &str, child: &str, strength: f64) -> DependencyEdge {
    DependencyEdge {
        parent_id: parent.into(),
        child_id: child.into(),
        strength,
        dependency_type: "operational".into(),
    }
}

/// A small access-management control graph:
///
/// ```text
/// IAM-1 ──0.8──> IAM-2 ──0.6──> LOG-1
///   │                              ▲
///   └──0.3──> NET-1 ──────0.5──────┘
/// BCK-1 (isolated)
/// ```
pub fn access_control_graph() -> (Vec<ControlNode>, Vec<DependencyEdge>) {
    let nodes = vec![
        control("IAM-1", 0.12),
        control("IAM-2", 0.05),
        control("NET-1", 0.08),
        control("LOG-1", 0.02),
        control("BCK-1", 0.20),
    ];
    let edges = vec![
        dependency("IAM-1", "IAM-2", 0.8),
        dependency("IAM-1", "NET-1", 0.3),
        dependency("IAM-2", "LOG-1", 0.6),
        dependency("NET-1", "LOG-1", 0.5),
    ];
    (nodes, edges)
}
