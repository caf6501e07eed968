//! Derivation of the required edge set for one solve call.
//!
//! Exactly one intent is active per call: a full-area sweep of everything
//! not yet ridden, a rectangular selection, or a manually drawn route. The
//! manual intent additionally produces an edge allow-list so augmentation
//! searches stay on the drawn path.

use std::collections::HashSet;

use geo::Coord;

use everystreet_core::{BoundingBox, EdgeId, NodeId, StreetGraph, haversine_m};

/// A node counts as lying on the manual polyline when it is within this
/// distance of the nearest polyline segment.
const MANUAL_MATCH_THRESHOLD_M: f64 = 10.0;

/// Which of the three mutually exclusive intents produced the set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequiredIntent {
    /// Cover every non-ridden, non-avoided edge in the graph.
    Sweep,
    /// Cover edges touching a user-drawn rectangle.
    Selection,
    /// Cover edges lying along a user-drawn polyline.
    Manual,
}

/// The edges one solve call must cover.
#[derive(Debug, Clone)]
pub struct RequiredEdgeSet {
    /// Required edges with their endpoints.
    pub edges: Vec<(EdgeId, NodeId, NodeId)>,
    /// Every node incident to a required edge.
    pub nodes: HashSet<NodeId>,
    /// Allow-list for augmentation searches; populated in manual mode.
    pub allowed: Option<HashSet<EdgeId>>,
    /// The intent that produced this set.
    pub intent: RequiredIntent,
}

impl RequiredEdgeSet {
    /// Whether nothing needs covering.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

/// Derive the required edge set. Precedence: manual route, then selection
/// box, then full-area sweep.
#[must_use]
pub fn derive(
    graph: &StreetGraph,
    manual_route: Option<&[Coord<f64>]>,
    selection: Option<BoundingBox>,
) -> RequiredEdgeSet {
    if let Some(polyline) = manual_route {
        return along_polyline(graph, polyline);
    }
    if let Some(bbox) = selection {
        return touching_selection(graph, bbox);
    }
    sweep(graph)
}

/// Intent (a): all non-ridden, non-avoided real edges.
fn sweep(graph: &StreetGraph) -> RequiredEdgeSet {
    collect(
        graph,
        RequiredIntent::Sweep,
        |_, edge| !edge.is_ridden && !edge.is_avoided && !edge.is_virtual,
        false,
    )
}

/// Intent (b): edges with an endpoint inside the selection rectangle. A
/// selection is an explicit instruction, so ridden and avoided edges inside
/// it are still required.
fn touching_selection(graph: &StreetGraph, bbox: BoundingBox) -> RequiredEdgeSet {
    collect(
        graph,
        RequiredIntent::Selection,
        |positions, edge| {
            !edge.is_virtual
                && positions
                    .iter()
                    .any(|&position| bbox.contains(position))
        },
        false,
    )
}

/// Intent (c): edges whose endpoints both lie on the drawn polyline.
fn along_polyline(graph: &StreetGraph, polyline: &[Coord<f64>]) -> RequiredEdgeSet {
    collect(
        graph,
        RequiredIntent::Manual,
        |positions, edge| {
            !edge.is_virtual
                && positions
                    .iter()
                    .all(|&position| distance_to_polyline_m(position, polyline) < MANUAL_MATCH_THRESHOLD_M)
        },
        true,
    )
}

fn collect<F>(
    graph: &StreetGraph,
    intent: RequiredIntent,
    mut keep: F,
    build_allow_list: bool,
) -> RequiredEdgeSet
where
    F: FnMut(&[Coord<f64>; 2], &everystreet_core::Edge) -> bool,
{
    let mut edges = Vec::new();
    let mut nodes = HashSet::new();
    for (id, edge) in graph.edges() {
        let (Some(a), Some(b)) = (graph.node(edge.a), graph.node(edge.b)) else {
            continue;
        };
        if keep(&[a.position, b.position], edge) {
            edges.push((id, edge.a, edge.b));
            nodes.insert(edge.a);
            nodes.insert(edge.b);
        }
    }
    let allowed = build_allow_list.then(|| edges.iter().map(|&(id, _, _)| id).collect());
    RequiredEdgeSet {
        edges,
        nodes,
        allowed,
        intent,
    }
}

/// Great-circle distance from a point to the nearest polyline segment,
/// using the same locally flat projection as edge snapping.
fn distance_to_polyline_m(point: Coord<f64>, polyline: &[Coord<f64>]) -> f64 {
    if polyline.is_empty() {
        return f64::INFINITY;
    }
    let mut best = f64::INFINITY;
    for pair in polyline.windows(2) {
        let candidate = closest_on_segment(point, pair[0], pair[1]);
        best = best.min(haversine_m(point, candidate));
    }
    if polyline.len() == 1 {
        best = haversine_m(point, polyline[0]);
    }
    best
}

fn closest_on_segment(p: Coord<f64>, a: Coord<f64>, b: Coord<f64>) -> Coord<f64> {
    let cos_lat = a.y.to_radians().cos();
    let dx = (b.x - a.x) * cos_lat;
    let dy = b.y - a.y;
    let rel_x = (p.x - a.x) * cos_lat;
    let rel_y = p.y - a.y;
    let length_sq = dx * dx + dy * dy;
    let t = if length_sq > 0.0 {
        ((rel_x * dx + rel_y * dy) / length_sq).clamp(0.0, 1.0)
    } else {
        0.0
    };
    Coord {
        x: a.x + (b.x - a.x) * t,
        y: a.y + (b.y - a.y) * t,
    }
}
