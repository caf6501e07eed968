//! Odd-degree parity correction by greedy minimum-weight matching.
//!
//! An Eulerian trail needs every node even, or exactly two odd nodes as the
//! trail's ends. Odd nodes are paired greedily: each round Dijkstras a
//! bounded sample of them against the remaining odd set, keeps the globally
//! cheapest pair found, and duplicates the connecting path as virtual
//! edges. This is knowingly suboptimal — blossom matching would produce
//! shorter tours — in exchange for bounded runtime on large graphs.

use std::collections::{BTreeSet, HashMap, HashSet};

use log::warn;

use everystreet_core::{EdgeId, NodeId, PathQuery, StreetGraph, closest_target};

use crate::TrailEdge;

/// Odd nodes Dijkstra'd per matching round; bounds each round's cost.
pub const MATCH_SAMPLE_LIMIT: usize = 100;

/// Undirected degree of every node in the edge multiset.
#[must_use]
pub fn degrees(edges: &[TrailEdge]) -> HashMap<NodeId, usize> {
    let mut map: HashMap<NodeId, usize> = HashMap::new();
    for edge in edges {
        *map.entry(edge.a).or_insert(0) += 1;
        *map.entry(edge.b).or_insert(0) += 1;
    }
    map
}

/// Append virtual duplicate edges to `edges` until every node has even
/// degree, except a requested distinct start and end which are left odd
/// (a path, unlike a circuit, has exactly two odd ends).
///
/// Augmentation paths cost edges at their stored weight and may be confined
/// to `allowed` (manual-route mode). A node with no path to any other odd
/// node gets one of its existing edges force-duplicated as a last resort.
pub fn correct_parity(
    graph: &StreetGraph,
    edges: &mut Vec<TrailEdge>,
    start: Option<NodeId>,
    end: Option<NodeId>,
    allowed: Option<&HashSet<EdgeId>>,
) {
    let mut odd: BTreeSet<NodeId> = degrees(edges)
        .into_iter()
        .filter_map(|(node, degree)| (degree % 2 == 1).then_some(node))
        .collect();

    // A distinct start/end pair is exempt from strict parity: toggle their
    // membership so the matcher leaves them as the trail's two odd ends.
    if let (Some(s), Some(e)) = (start, end)
        && s != e
    {
        for node in [s, e] {
            if !odd.remove(&node) {
                odd.insert(node);
            }
        }
    }

    let query = PathQuery::augmentation(allowed.cloned());
    while odd.len() > 1 {
        let sample: Vec<NodeId> = odd.iter().copied().take(MATCH_SAMPLE_LIMIT).collect();
        let mut best: Option<(f64, NodeId, everystreet_core::PathResult)> = None;
        for &origin in &sample {
            let mut targets: HashSet<NodeId> = odd.iter().copied().collect();
            targets.remove(&origin);
            if let Some(result) = closest_target(graph, origin, &targets, &query)
                && best.as_ref().is_none_or(|(cost, _, _)| result.cost < *cost)
            {
                best = Some((result.cost, origin, result));
            }
        }

        match best {
            Some((_, origin, result)) => {
                odd.remove(&origin);
                odd.remove(&result.target);
                for step in &result.steps {
                    edges.push(TrailEdge::virtual_copy(step.edge, step.from, step.to));
                }
            }
            None => {
                // None of the sampled odd nodes can reach another one;
                // should only happen on a malformed graph. Force-duplicate
                // an existing edge so the node at least becomes even.
                let Some(&origin) = sample.first() else {
                    break;
                };
                odd.remove(&origin);
                if let Some((edge_id, neighbor)) = graph.neighbors(origin).next() {
                    warn!("Could not match odd node {origin}; doubling an incident edge");
                    edges.push(TrailEdge::virtual_copy(edge_id, origin, neighbor));
                } else {
                    warn!("Odd node {origin} has no incident edges; leaving it odd");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use everystreet_core::Edge;
    use geo::Coord;
    use rstest::rstest;

    fn edge(a: u64, b: u64, weight_m: f64) -> Edge {
        Edge {
            a: NodeId(a),
            b: NodeId(b),
            weight_m,
            way_id: 0,
            name: None,
            is_ridden: false,
            is_avoided: false,
            is_virtual: false,
            has_construction: false,
        }
    }

    fn line_graph() -> (StreetGraph, Vec<TrailEdge>) {
        let mut graph = StreetGraph::new();
        for (id, lon) in [(1, 0.0), (2, 0.001), (3, 0.002), (4, 0.003)] {
            graph.add_node(NodeId(id), Coord { x: lon, y: 0.0 });
        }
        let mut edges = Vec::new();
        for (a, b) in [(1, 2), (2, 3), (3, 4)] {
            let id = graph.add_edge(edge(a, b, 111.0));
            edges.push(TrailEdge::required(id, NodeId(a), NodeId(b)));
        }
        (graph, edges)
    }

    fn odd_nodes(edges: &[TrailEdge]) -> Vec<NodeId> {
        let mut odd: Vec<NodeId> = degrees(edges)
            .into_iter()
            .filter_map(|(node, degree)| (degree % 2 == 1).then_some(node))
            .collect();
        odd.sort();
        odd
    }

    #[rstest]
    fn line_endpoints_get_matched() {
        let (graph, mut edges) = line_graph();
        correct_parity(&graph, &mut edges, None, None, None);
        assert!(odd_nodes(&edges).is_empty());
        // The 1-4 match duplicates the three line edges.
        assert_eq!(edges.len(), 6);
        assert_eq!(edges.iter().filter(|e| e.is_virtual).count(), 3);
    }

    #[rstest]
    fn distinct_start_and_end_stay_odd() {
        let (graph, mut edges) = line_graph();
        correct_parity(&graph, &mut edges, Some(NodeId(1)), Some(NodeId(4)), None);
        // The line's two odd ends are exactly the requested ends: nothing
        // to fix.
        assert_eq!(edges.len(), 3);
        assert_eq!(odd_nodes(&edges), vec![NodeId(1), NodeId(4)]);
    }

    #[rstest]
    fn equal_start_and_end_get_no_exemption() {
        let (graph, mut edges) = line_graph();
        correct_parity(&graph, &mut edges, Some(NodeId(1)), Some(NodeId(1)), None);
        assert!(odd_nodes(&edges).is_empty());
    }

    #[rstest]
    fn even_interior_start_and_end_are_toggled_into_the_odd_set() {
        // Start/end at the even interior nodes 2 and 3: the matcher must
        // leave 2 and 3 odd and even out the line's natural ends 1 and 4.
        let (graph, mut edges) = line_graph();
        correct_parity(&graph, &mut edges, Some(NodeId(2)), Some(NodeId(3)), None);
        assert_eq!(odd_nodes(&edges), vec![NodeId(2), NodeId(3)]);
    }

    #[rstest]
    fn augmentation_uses_stored_weights_not_ridden_penalty() {
        // Odd ends 1 and 4; the direct ridden shortcut 1-4 must win over
        // tripling the line despite being ridden.
        let (mut graph, mut edges) = line_graph();
        let shortcut = graph.add_edge(Edge {
            is_ridden: true,
            ..edge(1, 4, 150.0)
        });
        correct_parity(&graph, &mut edges, None, None, None);
        assert!(edges.iter().any(|e| e.id == shortcut && e.is_virtual));
        assert_eq!(edges.len(), 4);
    }

    #[rstest]
    fn unmatchable_odd_node_forces_edge_duplication() {
        // Two disconnected segments; exempting 1 and 9 leaves odd = {2, 9}
        // with no path between them, forcing a duplication fallback.
        let mut graph = StreetGraph::new();
        for (id, lon, lat) in [(1, 0.0, 0.0), (2, 0.001, 0.0), (8, 1.0, 1.0), (9, 1.001, 1.0)] {
            graph.add_node(NodeId(id), Coord { x: lon, y: lat });
        }
        let e12 = graph.add_edge(edge(1, 2, 111.0));
        let e89 = graph.add_edge(edge(8, 9, 111.0));
        let mut edges = vec![
            TrailEdge::required(e12, NodeId(1), NodeId(2)),
            TrailEdge::required(e89, NodeId(8), NodeId(9)),
        ];
        correct_parity(&graph, &mut edges, Some(NodeId(1)), Some(NodeId(9)), None);
        assert!(edges.len() > 2, "a fallback duplication must be appended");
        assert!(edges.iter().any(|e| e.is_virtual));
    }
}
