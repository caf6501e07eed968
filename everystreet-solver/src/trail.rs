//! Eulerian-trail extraction with repair and fallback stages.
//!
//! The happy path is a single Hierholzer pass over the augmented edge
//! multiset. When that falls short — the usual symptom of an undetected
//! disconnected subgraph — the builder re-derives components of the
//! augmented set itself, bridges them, and retries. If repair fails too, a
//! greedy edge-consuming walk guarantees *some* result: a degraded route
//! is always preferred over a hard failure. The outcome is tagged so the
//! orchestration layer can log what happened instead of catching errors.

use std::collections::{HashMap, HashSet};

use log::warn;

use everystreet_core::{EdgeId, NodeId, PathQuery, StreetGraph, closest_target};

use crate::TrailEdge;
use crate::components::ISLAND_SEARCH_LIMIT;
use crate::parity::degrees;

/// An ordered walk over the graph.
///
/// `edges[i]` connects `nodes[i]` to `nodes[i + 1]`; a `None` entry marks a
/// discontinuity produced by the greedy fallback (no real edge connects the
/// pair). Both vectors are empty for an empty walk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Trail {
    /// Visited nodes in order.
    pub nodes: Vec<NodeId>,
    /// Edge taken for each consecutive node pair.
    pub edges: Vec<Option<EdgeId>>,
}

impl Trail {
    /// Number of edge traversals in the walk.
    #[must_use]
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// Whether the walk is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// How the trail was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrailOutcome {
    /// First Hierholzer attempt succeeded.
    Attempted(Trail),
    /// Succeeded after bridging components of the augmented set.
    Repaired(Trail),
    /// Greedy fallback produced a best-effort walk.
    Degraded {
        /// The best-effort walk.
        trail: Trail,
        /// Why the attempt and repair stages failed.
        reason: String,
    },
}

impl TrailOutcome {
    /// The walk, whatever stage produced it.
    #[must_use]
    pub fn into_trail(self) -> Trail {
        match self {
            Self::Attempted(trail) | Self::Repaired(trail) => trail,
            Self::Degraded { trail, .. } => trail,
        }
    }
}

/// Build a trail over the augmented edge multiset, anchored at `start` when
/// given. `allowed` confines repair bridging in manual-route mode.
#[must_use]
pub fn build_trail(
    graph: &StreetGraph,
    edges: &[TrailEdge],
    start: Option<NodeId>,
    end: Option<NodeId>,
    allowed: Option<&HashSet<EdgeId>>,
) -> TrailOutcome {
    if edges.is_empty() {
        return TrailOutcome::Attempted(Trail::default());
    }

    // A full cover is always demanded except when the caller anchored both
    // ends: there a partial trail still beats no trail.
    let require_full = start.is_none() && end.is_none();

    if let Some(trail) = attempt(edges, start, end, require_full) {
        return TrailOutcome::Attempted(normalise(trail, start));
    }

    match repair(graph, edges, allowed) {
        Some(repaired_edges) => {
            if let Some(trail) = attempt(&repaired_edges, start, end, require_full) {
                return TrailOutcome::Repaired(normalise(trail, start));
            }
            let trail = greedy_fallback(&repaired_edges, start);
            TrailOutcome::Degraded {
                trail: normalise(trail, start),
                reason: "trail construction failed after component repair".to_owned(),
            }
        }
        None => {
            let trail = greedy_fallback(edges, start);
            TrailOutcome::Degraded {
                trail: normalise(trail, start),
                reason: "augmented edge set could not be repaired".to_owned(),
            }
        }
    }
}

/// One Hierholzer pass. Returns `None` when the result is not a valid walk
/// meeting the coverage and anchoring requirements.
fn attempt(
    edges: &[TrailEdge],
    start: Option<NodeId>,
    end: Option<NodeId>,
    require_full: bool,
) -> Option<Trail> {
    let nodes = hierholzer(edges, start)?;

    // Re-walk the node sequence, consuming one multiset edge per pair; this
    // both assigns edge ids to steps and rejects invalid vertex sequences
    // (Hierholzer emits one when the odd-node count exceeds two).
    let mut available: HashMap<(NodeId, NodeId), Vec<usize>> = HashMap::new();
    for (index, edge) in edges.iter().enumerate() {
        available.entry(pair_key(edge.a, edge.b)).or_default().push(index);
    }
    let mut step_edges = Vec::with_capacity(nodes.len().saturating_sub(1));
    for pair in nodes.windows(2) {
        let slot = available.get_mut(&pair_key(pair[0], pair[1]))?;
        let index = slot.pop()?;
        step_edges.push(Some(edges[index].id));
    }

    let consumed = step_edges.len();
    if require_full && consumed < edges.len() {
        return None;
    }
    if let Some(s) = start {
        if nodes.first() != Some(&s) {
            return None;
        }
        // A closed tour must come back to its anchor.
        if end == Some(s) && nodes.last() != Some(&s) {
            return None;
        }
    }
    Some(Trail {
        nodes,
        edges: step_edges,
    })
}

/// Iterative Hierholzer vertex sequence over the multiset, starting at the
/// anchor, else at an odd node, else anywhere.
fn hierholzer(edges: &[TrailEdge], start: Option<NodeId>) -> Option<Vec<NodeId>> {
    let mut adjacency: HashMap<NodeId, Vec<usize>> = HashMap::new();
    for (index, edge) in edges.iter().enumerate() {
        adjacency.entry(edge.a).or_default().push(index);
        adjacency.entry(edge.b).or_default().push(index);
    }

    let origin = start.or_else(|| {
        degrees(edges)
            .into_iter()
            .filter(|(_, degree)| degree % 2 == 1)
            .map(|(node, _)| node)
            .min()
            .or_else(|| edges.first().map(|edge| edge.a))
    })?;

    let mut used = vec![false; edges.len()];
    let mut cursor: HashMap<NodeId, usize> = HashMap::new();
    let mut stack = vec![origin];
    let mut sequence = Vec::with_capacity(edges.len() + 1);

    while let Some(&node) = stack.last() {
        let incident = adjacency.get(&node);
        let position = cursor.entry(node).or_insert(0);
        let next = incident.and_then(|list| {
            while *position < list.len() {
                let index = list[*position];
                *position += 1;
                if !used[index] {
                    return Some(index);
                }
            }
            None
        });
        match next {
            Some(index) => {
                used[index] = true;
                let edge = edges[index];
                let other = if edge.a == node { edge.b } else { edge.a };
                stack.push(other);
            }
            None => {
                sequence.push(node);
                stack.pop();
            }
        }
    }
    sequence.reverse();
    Some(sequence)
}

/// Bridge components of the augmented multiset itself and return the
/// extended multiset, or `None` when no component can be connected.
fn repair(
    graph: &StreetGraph,
    edges: &[TrailEdge],
    allowed: Option<&HashSet<EdgeId>>,
) -> Option<Vec<TrailEdge>> {
    let comps = multiset_components(edges);
    if comps.len() <= 1 {
        return None;
    }
    warn!(
        "Augmented edge set split into {} components; bridging for repair",
        comps.len()
    );

    let mut extended = edges.to_vec();
    let mut reachable: HashSet<NodeId> = comps[0].iter().copied().collect();
    let mut bridged_any = false;
    let query = PathQuery::augmentation(allowed.cloned());
    for component in &comps[1..] {
        let best = component
            .iter()
            .take(ISLAND_SEARCH_LIMIT)
            .filter_map(|&origin| closest_target(graph, origin, &reachable, &query))
            .min_by(|r1, r2| r1.cost.total_cmp(&r2.cost));
        if let Some(connection) = best {
            // Bridges are walked out and back so component parity is
            // unchanged.
            for step in &connection.steps {
                extended.push(TrailEdge::virtual_copy(step.edge, step.from, step.to));
                extended.push(TrailEdge::virtual_copy(step.edge, step.from, step.to));
            }
            reachable.extend(component.iter().copied());
            bridged_any = true;
        } else {
            warn!(
                "Repair could not reconnect a component of {} nodes",
                component.len()
            );
        }
    }
    bridged_any.then_some(extended)
}

/// Connected components over the multiset's own edges only.
fn multiset_components(edges: &[TrailEdge]) -> Vec<Vec<NodeId>> {
    let mut adjacency: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
    for edge in edges {
        adjacency.entry(edge.a).or_default().push(edge.b);
        adjacency.entry(edge.b).or_default().push(edge.a);
    }
    let mut ordered: Vec<NodeId> = adjacency.keys().copied().collect();
    ordered.sort();

    let mut visited: HashSet<NodeId> = HashSet::new();
    let mut comps = Vec::new();
    for seed in ordered {
        if visited.contains(&seed) {
            continue;
        }
        let mut component = Vec::new();
        let mut stack = vec![seed];
        visited.insert(seed);
        while let Some(node) = stack.pop() {
            component.push(node);
            for &neighbor in adjacency.get(&node).into_iter().flatten() {
                if visited.insert(neighbor) {
                    stack.push(neighbor);
                }
            }
        }
        comps.push(component);
    }
    comps.sort_by_key(|component| std::cmp::Reverse(component.len()));
    comps
}

/// Last resort: walk from the anchor consuming any unused incident edge,
/// jumping to an arbitrary remaining edge when stuck. Produces a valid but
/// possibly discontinuous edge list rather than failing outright.
fn greedy_fallback(edges: &[TrailEdge], start: Option<NodeId>) -> Trail {
    let Some(first_edge) = edges.first() else {
        return Trail::default();
    };
    let mut adjacency: HashMap<NodeId, Vec<usize>> = HashMap::new();
    for (index, edge) in edges.iter().enumerate() {
        adjacency.entry(edge.a).or_default().push(index);
        adjacency.entry(edge.b).or_default().push(index);
    }

    let mut used = vec![false; edges.len()];
    let mut remaining = edges.len();
    let mut current = start.unwrap_or(first_edge.a);
    let mut trail = Trail {
        nodes: vec![current],
        edges: Vec::new(),
    };

    while remaining > 0 {
        let incident = adjacency
            .get(&current)
            .and_then(|list| list.iter().copied().find(|&index| !used[index]));
        match incident {
            Some(index) => {
                used[index] = true;
                remaining -= 1;
                let edge = edges[index];
                current = if edge.a == current { edge.b } else { edge.a };
                trail.edges.push(Some(edge.id));
                trail.nodes.push(current);
            }
            None => {
                // Jump: no unused edge touches the current node.
                let Some(index) = used.iter().position(|&u| !u) else {
                    break;
                };
                let edge = edges[index];
                trail.edges.push(None);
                trail.nodes.push(edge.a);
                current = edge.a;
            }
        }
    }
    trail
}

/// Rotate a closed trail, or reverse an open one, so traversal begins at
/// the requested start node. Leaves the trail untouched when neither move
/// can honour the anchor.
fn normalise(mut trail: Trail, start: Option<NodeId>) -> Trail {
    let Some(anchor) = start else {
        return trail;
    };
    if trail.nodes.first() == Some(&anchor) {
        return trail;
    }
    let closed = !trail.nodes.is_empty() && trail.nodes.first() == trail.nodes.last();
    if closed {
        if let Some(offset) = trail.nodes.iter().position(|&n| n == anchor) {
            // Treat the closed trail as a cycle and re-cut it at the anchor.
            trail.nodes.pop();
            trail.nodes.rotate_left(offset);
            trail.edges.rotate_left(offset);
            let first = trail.nodes[0];
            trail.nodes.push(first);
            return trail;
        }
    } else if trail.nodes.last() == Some(&anchor) {
        trail.nodes.reverse();
        trail.edges.reverse();
        return trail;
    }
    trail
}

fn pair_key(a: NodeId, b: NodeId) -> (NodeId, NodeId) {
    if a <= b { (a, b) } else { (b, a) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use everystreet_core::Edge;
    use geo::Coord;
    use rstest::rstest;

    fn edge(a: u64, b: u64) -> Edge {
        Edge {
            a: NodeId(a),
            b: NodeId(b),
            weight_m: 111.0,
            way_id: 0,
            name: None,
            is_ridden: false,
            is_avoided: false,
            is_virtual: false,
            has_construction: false,
        }
    }

    fn graph_with(edge_list: &[(u64, u64)], positions: &[(u64, f64, f64)]) -> (StreetGraph, Vec<TrailEdge>) {
        let mut graph = StreetGraph::new();
        for &(id, lon, lat) in positions {
            graph.add_node(NodeId(id), Coord { x: lon, y: lat });
        }
        let mut edges = Vec::new();
        for &(a, b) in edge_list {
            let id = graph.add_edge(edge(a, b));
            edges.push(TrailEdge::required(id, NodeId(a), NodeId(b)));
        }
        (graph, edges)
    }

    fn square() -> (StreetGraph, Vec<TrailEdge>) {
        graph_with(
            &[(1, 2), (2, 3), (3, 4), (4, 1)],
            &[(1, 0.0, 0.0), (2, 0.001, 0.0), (3, 0.001, 0.001), (4, 0.0, 0.001)],
        )
    }

    #[rstest]
    fn square_yields_a_closed_circuit() {
        let (graph, edges) = square();
        let outcome = build_trail(&graph, &edges, None, None, None);
        let TrailOutcome::Attempted(trail) = outcome else {
            panic!("expected a first-attempt success");
        };
        assert_eq!(trail.len(), 4);
        assert_eq!(trail.nodes.first(), trail.nodes.last());
        assert!(trail.edges.iter().all(Option::is_some));
    }

    #[rstest]
    fn anchored_circuit_is_rotated_to_the_start() {
        let (graph, edges) = square();
        let outcome = build_trail(&graph, &edges, Some(NodeId(3)), Some(NodeId(3)), None);
        let trail = outcome.into_trail();
        assert_eq!(trail.nodes.first(), Some(&NodeId(3)));
        assert_eq!(trail.nodes.last(), Some(&NodeId(3)));
        assert_eq!(trail.len(), 4);
    }

    #[rstest]
    fn open_trail_is_reversed_onto_its_anchor() {
        // A bare path 1-2-3; anchoring at 3 exercises the reversal branch
        // directly on the normaliser.
        let trail = Trail {
            nodes: vec![NodeId(1), NodeId(2), NodeId(3)],
            edges: vec![Some(EdgeId(0)), Some(EdgeId(1))],
        };
        let reversed = normalise(trail, Some(NodeId(3)));
        assert_eq!(reversed.nodes, vec![NodeId(3), NodeId(2), NodeId(1)]);
        assert_eq!(reversed.edges, vec![Some(EdgeId(1)), Some(EdgeId(0))]);
    }

    #[rstest]
    fn line_with_requested_ends_runs_start_to_end() {
        let (graph, edges) = graph_with(
            &[(1, 2), (2, 3), (3, 4)],
            &[(1, 0.0, 0.0), (2, 0.001, 0.0), (3, 0.002, 0.0), (4, 0.003, 0.0)],
        );
        let outcome = build_trail(&graph, &edges, Some(NodeId(1)), Some(NodeId(4)), None);
        let trail = outcome.into_trail();
        assert_eq!(trail.nodes.first(), Some(&NodeId(1)));
        assert_eq!(trail.nodes.last(), Some(&NodeId(4)));
        assert_eq!(trail.len(), 3);
    }

    #[rstest]
    fn disconnected_squares_are_repaired() {
        // Two squares joined only by a non-required road 3-11; the
        // augmented multiset is disconnected so the first attempt fails.
        let (mut graph, mut edges) = square();
        for (id, lon, lat) in [
            (11, 0.002, 0.001),
            (12, 0.003, 0.001),
            (13, 0.003, 0.002),
            (14, 0.002, 0.002),
        ] {
            graph.add_node(NodeId(id), Coord { x: lon, y: lat });
        }
        for (a, b) in [(11, 12), (12, 13), (13, 14), (14, 11)] {
            let id = graph.add_edge(edge(a, b));
            edges.push(TrailEdge::required(id, NodeId(a), NodeId(b)));
        }
        graph.add_edge(edge(3, 11)); // connector, not in the multiset

        let outcome = build_trail(&graph, &edges, None, None, None);
        let TrailOutcome::Repaired(trail) = outcome else {
            panic!("expected repair, got {outcome:?}");
        };
        // 8 required traversals plus the out-and-back bridge.
        assert_eq!(trail.len(), 10);
        assert_eq!(trail.nodes.first(), trail.nodes.last());
    }

    #[rstest]
    fn unrepairable_input_degrades_but_still_produces_edges() {
        // Two squares with no connecting road at all.
        let (mut graph, mut edges) = square();
        for (id, lon, lat) in [
            (11, 1.0, 1.0),
            (12, 1.001, 1.0),
            (13, 1.001, 1.001),
            (14, 1.0, 1.001),
        ] {
            graph.add_node(NodeId(id), Coord { x: lon, y: lat });
        }
        for (a, b) in [(11, 12), (12, 13), (13, 14), (14, 11)] {
            let id = graph.add_edge(edge(a, b));
            edges.push(TrailEdge::required(id, NodeId(a), NodeId(b)));
        }

        let outcome = build_trail(&graph, &edges, None, None, None);
        let TrailOutcome::Degraded { trail, .. } = outcome else {
            panic!("expected degradation, got {outcome:?}");
        };
        // Every edge is consumed; one step is a jump between the squares.
        assert_eq!(trail.len(), 9);
        assert_eq!(trail.edges.iter().filter(|e| e.is_none()).count(), 1);
    }

    #[rstest]
    fn empty_multiset_yields_an_empty_trail() {
        let graph = StreetGraph::new();
        let outcome = build_trail(&graph, &[], None, None, None);
        assert_eq!(outcome.into_trail(), Trail::default());
    }
}
