//! Single-source shortest-path engine.
//!
//! Best-first (Dijkstra) search over the street graph, used both for
//! point-to-point routing and for graph augmentation. Pure query: never
//! mutates the store.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};

use ordered_float::OrderedFloat;

use crate::graph::{EdgeId, NodeId, StreetGraph};

/// Traversal-cost multiplier for ridden edges under
/// [`PathQuery::penalise_ridden`], discouraging reuse of covered roads in
/// point-to-point routing.
pub const RIDDEN_PENALTY: f64 = 10.0;

/// Search configuration.
///
/// * Point-to-point routing uses [`PathQuery::routing`], which penalises
///   ridden edges so a fresh road is preferred over retracing.
/// * Augmentation (parity correction, island bridging) uses
///   [`PathQuery::augmentation`], which costs edges at their stored weight
///   because backtracking distance is what is being minimised.
#[derive(Debug, Clone, Default)]
pub struct PathQuery {
    /// Restrict traversal to these edges, e.g. to stay on a manually drawn
    /// path. `None` allows every edge.
    pub allowed_edges: Option<HashSet<EdgeId>>,
    /// Multiply ridden-edge cost by [`RIDDEN_PENALTY`].
    pub penalise_ridden: bool,
}

impl PathQuery {
    /// Query for general point-to-point routing.
    #[must_use]
    pub fn routing(allowed_edges: Option<HashSet<EdgeId>>) -> Self {
        Self {
            allowed_edges,
            penalise_ridden: true,
        }
    }

    /// Query for augmentation searches, costing edges at stored weight.
    #[must_use]
    pub fn augmentation(allowed_edges: Option<HashSet<EdgeId>>) -> Self {
        Self {
            allowed_edges,
            penalise_ridden: false,
        }
    }
}

/// One traversed edge in a reconstructed path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathStep {
    /// Node the step leaves.
    pub from: NodeId,
    /// Node the step arrives at.
    pub to: NodeId,
    /// Edge traversed.
    pub edge: EdgeId,
    /// Stored weight of the edge in metres (penalty-free).
    pub weight_m: f64,
}

/// A reconstructed shortest path to the nearest target.
#[derive(Debug, Clone, PartialEq)]
pub struct PathResult {
    /// Edge-by-edge path from the source to [`PathResult::target`].
    pub steps: Vec<PathStep>,
    /// The target that was reached first.
    pub target: NodeId,
    /// Total search cost (penalties included).
    pub cost: f64,
}

/// Best-first search from `from` to the nearest node in `targets`.
///
/// Terminates as soon as a target is settled: at that point nothing left in
/// the frontier can beat it. Returns `None` when no target is reachable or
/// `targets` contains only the source.
#[must_use]
pub fn closest_target(
    graph: &StreetGraph,
    from: NodeId,
    targets: &HashSet<NodeId>,
    query: &PathQuery,
) -> Option<PathResult> {
    if !graph.contains_node(from) {
        return None;
    }

    let mut dist: HashMap<NodeId, f64> = HashMap::from([(from, 0.0)]);
    let mut prev: HashMap<NodeId, PathStep> = HashMap::new();
    let mut frontier: BinaryHeap<Reverse<(OrderedFloat<f64>, NodeId)>> = BinaryHeap::new();
    frontier.push(Reverse((OrderedFloat(0.0), from)));

    while let Some(Reverse((OrderedFloat(cost), node))) = frontier.pop() {
        if dist.get(&node).is_some_and(|&best| cost > best) {
            continue; // stale frontier entry
        }
        if node != from && targets.contains(&node) {
            return Some(PathResult {
                steps: reconstruct(&prev, from, node),
                target: node,
                cost,
            });
        }
        for (edge_id, neighbor) in graph.neighbors(node) {
            if query
                .allowed_edges
                .as_ref()
                .is_some_and(|allowed| !allowed.contains(&edge_id))
            {
                continue;
            }
            let Some(edge) = graph.edge(edge_id) else {
                continue;
            };
            let multiplier = if query.penalise_ridden && edge.is_ridden {
                RIDDEN_PENALTY
            } else {
                1.0
            };
            let candidate = cost + edge.weight_m * multiplier;
            if dist
                .get(&neighbor)
                .is_none_or(|&known| candidate < known)
            {
                dist.insert(neighbor, candidate);
                prev.insert(
                    neighbor,
                    PathStep {
                        from: node,
                        to: neighbor,
                        edge: edge_id,
                        weight_m: edge.weight_m,
                    },
                );
                frontier.push(Reverse((OrderedFloat(candidate), neighbor)));
            }
        }
    }
    None
}

/// Single-target specialisation of [`closest_target`]. Returns an empty
/// path when `to` is unreachable, mirroring the degraded-not-fatal policy.
#[must_use]
pub fn find_path(graph: &StreetGraph, from: NodeId, to: NodeId, query: &PathQuery) -> Vec<PathStep> {
    let targets = HashSet::from([to]);
    closest_target(graph, from, &targets, query).map_or_else(Vec::new, |result| result.steps)
}

fn reconstruct(prev: &HashMap<NodeId, PathStep>, from: NodeId, target: NodeId) -> Vec<PathStep> {
    let mut steps = Vec::new();
    let mut current = target;
    while current != from {
        let Some(step) = prev.get(&current) else {
            break;
        };
        steps.push(*step);
        current = step.from;
    }
    steps.reverse();
    steps
}
