//! # Cascade Risk Propagation
//!
//! Models how one control's failure probabilistically triggers failures in the
//! controls that depend on it.
//!
//! ## Model
//!
//! Controls form a DAG of `parent → child` dependency edges, each with a
//! strength `s ∈ [0, 1]`. Processing nodes in topological order:
//!
//! ```text
//! depth(v)        = 0                                  if v has no parents
//!                 = 1 + max depth(parent)              otherwise
//! survival(v)     = Π_{u→v} (1 − s(u,v) · cascade(u))
//! cascade(v)      = 1 − (1 − p_fail(v)) · survival(v)
//! ```
//!
//! i.e. the union of "v fails on its own" and "a parent failure cascades into v",
//! treated as independent events. `cascade(v) ≥ p_fail(v)` always holds.
//!
//! ## Input validation
//!
//! - An edge naming a control absent from the node list is
//!   [`RiskError::UnknownNodeReference`].
//! - A graph Kahn's algorithm cannot fully order is [`RiskError::CycleDetected`];
//!   no cascade value is produced for cyclic input.
//! - Probabilities and strengths outside [0, 1] are
//!   [`RiskError::InvalidProbability`].

use std::collections::VecDeque;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::engine::errors::RiskError;

/// Maximum size for inline adjacency storage
const INLINE_ADJACENCY: usize = 4;

/// A compliance control as registered by the control catalogue.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct ControlNode {
    pub id: String,
    pub name: String,
    pub pass_rate: f64,
    /// Standalone probability that the control fails.
    pub failure_probability: f64,
    pub category: String,
}

/// A declared dependency: failure of `parent_id` can cascade into `child_id`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct DependencyEdge {
    pub parent_id: String,
    pub child_id: String,
    /// Probability that a parent failure propagates along this edge.
    pub strength: f64,
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub dependency_type: String,
}

/// A control after propagation.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct GraphNode {
    pub id: String,
    pub name: String,
    pub pass_rate: f64,
    pub failure_probability: f64,
    pub cascade_risk: f64,
    pub depth: usize,
    pub category: String,
}

/// A chain of controls from a root to a terminal control.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct CriticalPath {
    /// Control ids, root first.
    pub node_ids: Vec<String>,
    /// Mean cascade risk over the path.
    pub average_risk: f64,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct CascadeResult {
    /// Controls in topological order.
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<DependencyEdge>,
    /// Highest-scoring paths, descending.
    pub critical_paths: Vec<CriticalPath>,
    /// Mean cascade risk over all controls; 0 for an empty graph.
    pub aggregate_risk: f64,
    /// Control with the highest cascade risk.
    pub most_vulnerable: Option<String>,
    pub max_depth: usize,
}

impl CascadeResult {
    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }
}

/// Risk change for one control when another is forced to fail.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct ControlImpact {
    pub control_id: String,
    pub name: String,
    pub original_risk: f64,
    pub new_cascade_risk: f64,
    pub risk_increase: f64,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct WhatIfResult {
    pub failed_control_id: String,
    /// Controls whose risk rose above the noise threshold, largest increase first.
    pub impacts: Vec<ControlImpact>,
    pub total_impact: f64,
}

/// Configuration for propagation and what-if analysis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CascadeConfig {
    /// Terminal controls walked back when searching critical paths.
    pub max_terminal_candidates: usize,
    /// Critical paths reported.
    pub max_critical_paths: usize,
    /// What-if increases at or below this are dropped as noise.
    pub impact_noise_threshold: f64,
}

impl Default for CascadeConfig {
    fn default() -> Self {
        Self {
            max_terminal_candidates: 5,
            max_critical_paths: 3,
            impact_noise_threshold: 0.01,
        }
    }
}

impl CascadeConfig {
    fn validate(self) -> Result<Self, RiskError> {
        if !(self.impact_noise_threshold.is_finite() && self.impact_noise_threshold >= 0.0) {
            return Err(RiskError::ValidationError(
                "cascade: impact_noise_threshold must be finite and >= 0".into(),
            ));
        }
        Ok(self)
    }
}

/// Index-based view of a validated, topologically ordered control graph.
struct DependencyGraph<'a> {
    nodes: &'a [ControlNode],
    /// children[u] = child indices of u, one entry per edge
    children: Vec<SmallVec<[usize; INLINE_ADJACENCY]>>,
    /// parents[v] = (parent index, strength), one entry per edge
    parents: Vec<SmallVec<[(usize, f64); INLINE_ADJACENCY]>>,
    /// Node indices in topological order
    order: Vec<usize>,
}

struct Propagation {
    cascade_risk: Vec<f64>,
    depth: Vec<usize>,
}

impl<'a> DependencyGraph<'a> {
    fn build(nodes: &'a [ControlNode], edges: &[DependencyEdge]) -> Result<Self, RiskError> {
        let mut index: FxHashMap<&str, usize> = FxHashMap::default();
        index.reserve(nodes.len());
        for (i, node) in nodes.iter().enumerate() {
            RiskError::check_probability(
                &format!("{}.failure_probability", node.id),
                node.failure_probability,
            )?;
            RiskError::check_probability(&format!("{}.pass_rate", node.id), node.pass_rate)?;
            if index.insert(node.id.as_str(), i).is_some() {
                return Err(RiskError::ValidationError(format!(
                    "duplicate control id '{}'",
                    node.id
                )));
            }
        }

        let mut children = vec![SmallVec::new(); nodes.len()];
        let mut parents = vec![SmallVec::new(); nodes.len()];
        for edge in edges {
            let lookup = |id: &str| {
                index.get(id).copied().ok_or_else(|| {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(
                        "dependency {} -> {} references unknown control '{}'",
                        edge.parent_id,
                        edge.child_id,
                        id
                    );
                    RiskError::UnknownNodeReference {
                        node_id: id.to_string(),
                        context: format!("edge {} -> {}", edge.parent_id, edge.child_id),
                    }
                })
            };
            let parent = lookup(&edge.parent_id)?;
            let child = lookup(&edge.child_id)?;
            let strength = RiskError::check_probability(
                &format!("strength of {} -> {}", edge.parent_id, edge.child_id),
                edge.strength,
            )?;
            children[parent].push(child);
            parents[child].push((parent, strength));
        }

        let order = topological_order(nodes, &children)?;
        Ok(Self {
            nodes,
            children,
            parents,
            order,
        })
    }

    /// Propagates cascade risk given per-node standalone failure probabilities.
    fn propagate(&self, failure_probability: &[f64]) -> Propagation {
        let n = self.nodes.len();
        let mut cascade_risk = vec![0.0; n];
        let mut depth = vec![0usize; n];

        for &v in &self.order {
            let parents = &self.parents[v];
            if parents.is_empty() {
                cascade_risk[v] = failure_probability[v];
                continue;
            }
            let mut parent_survival = 1.0;
            let mut max_parent_depth = 0;
            for &(u, strength) in parents {
                parent_survival *= 1.0 - strength * cascade_risk[u];
                max_parent_depth = max_parent_depth.max(depth[u]);
            }
            depth[v] = max_parent_depth + 1;
            let cascade_from_parents = 1.0 - parent_survival;
            cascade_risk[v] = 1.0 - (1.0 - failure_probability[v]) * (1.0 - cascade_from_parents);
        }

        Propagation {
            cascade_risk,
            depth,
        }
    }

    fn standalone_probabilities(&self) -> Vec<f64> {
        self.nodes.iter().map(|n| n.failure_probability).collect()
    }

    /// Walks back from up to `max_terminal_candidates` terminal controls.
    ///
    /// A terminal is a control with no outgoing edge. Roots with children are
    /// never terminals; an isolated control is both root and terminal and
    /// yields a single-node path.
    fn critical_paths(&self, risk: &[f64], config: &CascadeConfig) -> Vec<CriticalPath> {
        let mut terminals: Vec<usize> = self
            .order
            .iter()
            .copied()
            .filter(|&v| self.children[v].is_empty())
            .collect();
        // Stable: ties keep topological order.
        terminals.sort_by(|&a, &b| risk[b].total_cmp(&risk[a]));
        terminals.truncate(config.max_terminal_candidates);

        let mut paths: Vec<CriticalPath> = terminals
            .into_iter()
            .map(|terminal| {
                let mut path = vec![terminal];
                let mut current = terminal;
                while let Some(&(next, _)) = self.parents[current]
                    .iter()
                    .reduce(|best, cand| if risk[cand.0] > risk[best.0] { cand } else { best })
                {
                    path.push(next);
                    current = next;
                }
                path.reverse();
                let average_risk = path.iter().map(|&i| risk[i]).sum::<f64>() / path.len() as f64;
                CriticalPath {
                    node_ids: path.iter().map(|&i| self.nodes[i].id.clone()).collect(),
                    average_risk,
                }
            })
            .collect();

        paths.sort_by(|a, b| b.average_risk.total_cmp(&a.average_risk));
        paths.truncate(config.max_critical_paths);
        paths
    }
}

/// Kahn's algorithm. Nodes left unordered when the queue drains sit on or
/// behind a cycle.
fn topological_order(
    nodes: &[ControlNode],
    children: &[SmallVec<[usize; INLINE_ADJACENCY]>],
) -> Result<Vec<usize>, RiskError> {
    let mut in_degree = vec![0usize; nodes.len()];
    for kids in children {
        for &c in kids {
            in_degree[c] += 1;
        }
    }

    let mut queue: VecDeque<usize> = (0..nodes.len()).filter(|&i| in_degree[i] == 0).collect();
    let mut sorted = Vec::with_capacity(nodes.len());
    while let Some(u) = queue.pop_front() {
        sorted.push(u);
        for &c in &children[u] {
            in_degree[c] -= 1;
            if in_degree[c] == 0 {
                queue.push_back(c);
            }
        }
    }

    if sorted.len() < nodes.len() {
        let unresolved: Vec<String> = (0..nodes.len())
            .filter(|&i| in_degree[i] > 0)
            .map(|i| nodes[i].id.clone())
            .collect();
        #[cfg(feature = "tracing")]
        tracing::warn!(
            "rejecting dependency graph: {} of {} controls are on or behind a cycle",
            unresolved.len(),
            nodes.len()
        );
        return Err(RiskError::CycleDetected { unresolved });
    }
    Ok(sorted)
}

/// Propagates cascade risk with the default configuration.
pub fn propagate_cascade_risk(
    nodes: &[ControlNode],
    edges: &[DependencyEdge],
) -> Result<CascadeResult, RiskError> {
    propagate_cascade_risk_with_config(nodes, edges, CascadeConfig::default())
}

/// Propagates cascade risk over the dependency graph.
///
/// An empty node list yields an empty, well-formed result.
pub fn propagate_cascade_risk_with_config(
    nodes: &[ControlNode],
    edges: &[DependencyEdge],
    config: CascadeConfig,
) -> Result<CascadeResult, RiskError> {
    let config = config.validate()?;
    let graph = DependencyGraph::build(nodes, edges)?;
    let Propagation {
        cascade_risk,
        depth,
    } = graph.propagate(&graph.standalone_probabilities());

    let graph_nodes: Vec<GraphNode> = graph
        .order
        .iter()
        .map(|&i| {
            let node = &nodes[i];
            GraphNode {
                id: node.id.clone(),
                name: node.name.clone(),
                pass_rate: node.pass_rate,
                failure_probability: node.failure_probability,
                cascade_risk: cascade_risk[i],
                depth: depth[i],
                category: node.category.clone(),
            }
        })
        .collect();

    let aggregate_risk = if nodes.is_empty() {
        0.0
    } else {
        cascade_risk.iter().sum::<f64>() / nodes.len() as f64
    };

    // First maximum in topological order.
    let most_vulnerable = graph_nodes
        .iter()
        .fold(None::<&GraphNode>, |best, n| match best {
            Some(b) if b.cascade_risk >= n.cascade_risk => Some(b),
            _ => Some(n),
        })
        .map(|n| n.id.clone());

    Ok(CascadeResult {
        critical_paths: graph.critical_paths(&cascade_risk, &config),
        max_depth: depth.iter().copied().max().unwrap_or(0),
        nodes: graph_nodes,
        edges: edges.to_vec(),
        aggregate_risk,
        most_vulnerable,
    })
}

/// What-if analysis with the default configuration.
pub fn simulate_control_failure(
    nodes: &[ControlNode],
    edges: &[DependencyEdge],
    failed_control_id: &str,
) -> Result<WhatIfResult, RiskError> {
    simulate_control_failure_with_config(nodes, edges, failed_control_id, CascadeConfig::default())
}

/// Forces `failed_control_id` to fail (probability 1) and reports how every
/// other control's cascade risk changes relative to the unmodified graph.
pub fn simulate_control_failure_with_config(
    nodes: &[ControlNode],
    edges: &[DependencyEdge],
    failed_control_id: &str,
    config: CascadeConfig,
) -> Result<WhatIfResult, RiskError> {
    let config = config.validate()?;
    let graph = DependencyGraph::build(nodes, edges)?;
    let target = nodes
        .iter()
        .position(|n| n.id == failed_control_id)
        .ok_or_else(|| RiskError::UnknownNodeReference {
            node_id: failed_control_id.to_string(),
            context: "what-if simulation".into(),
        })?;

    let mut probabilities = graph.standalone_probabilities();
    let baseline = graph.propagate(&probabilities);
    probabilities[target] = 1.0;
    let forced = graph.propagate(&probabilities);

    let mut impacts: Vec<ControlImpact> = graph
        .order
        .iter()
        .copied()
        .filter(|&i| i != target)
        .filter_map(|i| {
            let original_risk = baseline.cascade_risk[i];
            let new_cascade_risk = forced.cascade_risk[i];
            let risk_increase = new_cascade_risk - original_risk;
            (risk_increase > config.impact_noise_threshold).then(|| ControlImpact {
                control_id: nodes[i].id.clone(),
                name: nodes[i].name.clone(),
                original_risk,
                new_cascade_risk,
                risk_increase,
            })
        })
        .collect();
    impacts.sort_by(|a, b| b.risk_increase.total_cmp(&a.risk_increase));
    let total_impact = impacts.iter().map(|i| i.risk_increase).sum();

    #[cfg(feature = "tracing")]
    tracing::debug!(
        "what-if: failing '{}' raises risk on {} controls (total impact {:.4})",
        failed_control_id,
        impacts.len(),
        total_impact
    );

    Ok(WhatIfResult {
        failed_control_id: failed_control_id.to_string(),
        impacts,
        total_impact,
    })
}
