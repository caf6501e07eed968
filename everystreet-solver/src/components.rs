//! Connected-component discovery and island bridging.
//!
//! Two required edges joined only by a non-required road still belong to
//! one component, so discovery traverses *any* graph edge. Smaller
//! components ("islands") are merged into the largest by the cheapest real
//! path the shortest-path engine can find; those connector edges become
//! virtual additions to the final edge list. Bridging mileage may reuse
//! ridden or avoided roads — it is a connector, not required coverage.

use std::collections::HashSet;

use log::warn;

use everystreet_core::{EdgeId, NodeId, PathQuery, StreetGraph, closest_target};

use crate::TrailEdge;

/// At most this many island nodes are tried as bridge origins, bounding
/// the cost of connecting one island.
pub const ISLAND_SEARCH_LIMIT: usize = 1000;

/// Connected components of `seeds`, discovered by traversing any edge of
/// the graph. Each component lists the seed nodes it contains, sorted by
/// component size descending.
#[must_use]
pub fn components(graph: &StreetGraph, seeds: &HashSet<NodeId>) -> Vec<Vec<NodeId>> {
    let mut visited: HashSet<NodeId> = HashSet::new();
    let mut found: Vec<Vec<NodeId>> = Vec::new();

    let mut ordered: Vec<NodeId> = seeds.iter().copied().collect();
    ordered.sort();
    for &seed in &ordered {
        if visited.contains(&seed) {
            continue;
        }
        let mut component = Vec::new();
        let mut stack = vec![seed];
        visited.insert(seed);
        while let Some(node) = stack.pop() {
            if seeds.contains(&node) {
                component.push(node);
            }
            for (_, neighbor) in graph.neighbors(node) {
                if visited.insert(neighbor) {
                    stack.push(neighbor);
                }
            }
        }
        found.push(component);
    }
    found.sort_by_key(|component| std::cmp::Reverse(component.len()));
    found
}

/// Result of merging islands into the largest component.
#[derive(Debug)]
pub struct Bridging {
    /// Nodes reachable in the merged component (anchor plus every bridged
    /// island).
    pub reachable: HashSet<NodeId>,
    /// Virtual connector edges to append to the final edge list.
    pub bridges: Vec<TrailEdge>,
    /// Number of islands that could not be connected and were dropped.
    pub dropped_islands: usize,
}

/// Merge every island into the largest component via its least-cost
/// connection over the full graph. Unbridgeable islands are dropped with a
/// warning; their roads are omitted rather than failing the solve.
#[must_use]
pub fn bridge_islands(
    graph: &StreetGraph,
    components: Vec<Vec<NodeId>>,
    allowed: Option<&HashSet<EdgeId>>,
) -> Bridging {
    let mut iter = components.into_iter();
    let mut reachable: HashSet<NodeId> = iter.next().unwrap_or_default().into_iter().collect();
    let mut bridges = Vec::new();
    let mut dropped_islands = 0;

    let query = PathQuery::augmentation(allowed.cloned());
    for island in iter {
        let best = island
            .iter()
            .take(ISLAND_SEARCH_LIMIT)
            .filter_map(|&origin| closest_target(graph, origin, &reachable, &query))
            .min_by(|r1, r2| r1.cost.total_cmp(&r2.cost));
        match best {
            Some(connection) => {
                for step in &connection.steps {
                    bridges.push(TrailEdge::virtual_copy(step.edge, step.from, step.to));
                }
                reachable.extend(island);
            }
            None => {
                warn!(
                    "Dropping unreachable island of {} required nodes",
                    island.len()
                );
                dropped_islands += 1;
            }
        }
    }
    Bridging {
        reachable,
        bridges,
        dropped_islands,
    }
}
