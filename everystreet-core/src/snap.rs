//! Nearest-node and nearest-point-on-edge queries ("snapping").
//!
//! Both queries are linear scans and read-only; callers are expected to
//! bound graph size upstream. The edge query returns the endpoints of the
//! matched edge so a follow-up [`closest_node`] can be restricted to them,
//! which stops a click near a crossing from "jumping" onto a different
//! nearby road.

use std::collections::HashSet;

use geo::Coord;

use crate::distance::haversine_m;
use crate::graph::{NodeId, StreetGraph};

/// Result of projecting a point onto the nearest graph edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeSnap {
    /// The nearest point on the edge segment.
    pub position: Coord<f64>,
    /// Great-circle distance from the query point to [`EdgeSnap::position`].
    pub distance_m: f64,
    /// First endpoint of the matched edge.
    pub node_a: NodeId,
    /// Second endpoint of the matched edge.
    pub node_b: NodeId,
}

/// Nearest graph node to `position`, optionally restricted to a candidate
/// set. Returns `None` when the graph (or the candidate set) is empty.
#[must_use]
pub fn closest_node(
    graph: &StreetGraph,
    position: Coord<f64>,
    candidates: Option<&HashSet<NodeId>>,
) -> Option<NodeId> {
    graph
        .nodes()
        .filter(|node| candidates.is_none_or(|set| set.contains(&node.id)))
        .map(|node| (node.id, haversine_m(position, node.position)))
        .min_by(|(_, d1), (_, d2)| d1.total_cmp(d2))
        .map(|(id, _)| id)
}

/// Nearest point on any graph edge to `position`.
///
/// Projection runs in a locally flat frame: longitude deltas are scaled by
/// the cosine of the first endpoint's latitude to correct for meridian
/// convergence, the projection parameter `t` is clamped to `[0, 1]`, and
/// only then is the candidate point evaluated with the haversine distance.
#[must_use]
pub fn closest_point_on_edge(graph: &StreetGraph, position: Coord<f64>) -> Option<EdgeSnap> {
    let mut best: Option<EdgeSnap> = None;
    for (_, edge) in graph.edges() {
        let (Some(a), Some(b)) = (graph.node(edge.a), graph.node(edge.b)) else {
            continue;
        };
        let candidate = project_onto_segment(position, a.position, b.position);
        let distance_m = haversine_m(position, candidate);
        if best.is_none_or(|snap| distance_m < snap.distance_m) {
            best = Some(EdgeSnap {
                position: candidate,
                distance_m,
                node_a: edge.a,
                node_b: edge.b,
            });
        }
    }
    best
}

/// Closest point to `p` on the segment `a`-`b` in the flat frame.
fn project_onto_segment(p: Coord<f64>, a: Coord<f64>, b: Coord<f64>) -> Coord<f64> {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::test_support::{edge, graph_with_nodes};
    use rstest::rstest;

    #[rstest]
    fn closest_node_on_empty_graph_is_none() {
        let graph = StreetGraph::new();
        assert!(closest_node(&graph, Coord { x: 0.0, y: 0.0 }, None).is_none());
    }

    #[rstest]
    fn closest_node_picks_the_nearest() {
        let graph = graph_with_nodes(&[(1, 0.0, 0.0), (2, 0.001, 0.0), (3, 0.01, 0.0)]);
        let found = closest_node(&graph, Coord { x: 0.0012, y: 0.0 }, None);
        assert_eq!(found, Some(NodeId(2)));
    }

    #[rstest]
    fn closest_node_honours_the_candidate_restriction() {
        let graph = graph_with_nodes(&[(1, 0.0, 0.0), (2, 0.001, 0.0)]);
        let candidates: HashSet<NodeId> = [NodeId(1)].into();
        let found = closest_node(&graph, Coord { x: 0.001, y: 0.0 }, Some(&candidates));
        assert_eq!(found, Some(NodeId(1)));
        let empty: HashSet<NodeId> = HashSet::new();
        assert!(closest_node(&graph, Coord { x: 0.0, y: 0.0 }, Some(&empty)).is_none());
    }

    #[rstest]
    fn projection_accounts_for_latitude_aspect_ratio() {
        // Diagonal segment at 45°N. A click equidistant in *degrees* from
        // both endpoints projects past the midpoint, because a degree of
        // latitude is longer on the ground than a degree of longitude.
        let mut graph = graph_with_nodes(&[]);
        graph.add_node(NodeId(1), Coord { x: -73.0, y: 45.0 });
        graph.add_node(NodeId(2), Coord { x: -72.9999, y: 45.0001 });
        graph.add_edge(edge(NodeId(1), NodeId(2), 15.0));

        let snap = closest_point_on_edge(&graph, Coord { x: -73.0, y: 45.0001 })
            .expect("graph has an edge");
        let t = (snap.position.y - 45.0) / 0.0001;
        assert!(t > 0.6 && t < 0.7, "expected t in (0.6, 0.7), got {t}");
    }

    #[rstest]
    fn projection_clamps_to_the_endpoints() {
        let mut graph = graph_with_nodes(&[(1, 0.0, 0.0), (2, 0.001, 0.0)]);
        graph.add_edge(edge(NodeId(1), NodeId(2), 111.0));
        let snap = closest_point_on_edge(&graph, Coord { x: -0.005, y: 0.0 })
            .expect("graph has an edge");
        assert_eq!(snap.position, Coord { x: 0.0, y: 0.0 });
    }

    #[rstest]
    fn edge_snap_restriction_prevents_road_jumping() {
        // Road A runs diagonally through the area; road B is a tiny stub
        // whose endpoints are much closer to the click than A's endpoints.
        let mut graph = graph_with_nodes(&[]);
        graph.add_node(NodeId(11), Coord { x: 0.0, y: 0.0 });
        graph.add_node(NodeId(12), Coord { x: 1.0, y: 1.0 });
        graph.add_edge(edge(NodeId(11), NodeId(12), 157_000.0));
        graph.add_node(NodeId(21), Coord { x: 0.4, y: 0.5 });
        graph.add_node(NodeId(22), Coord { x: 0.6, y: 0.5 });
        graph.add_edge(edge(NodeId(21), NodeId(22), 10.0));

        let click = Coord { x: 0.5, y: 0.5 };
        let snap = closest_point_on_edge(&graph, click).expect("graph has edges");
        // The click sits exactly on road A's line, so the edge snap finds A.
        assert_eq!((snap.node_a, snap.node_b), (NodeId(11), NodeId(12)));

        // An unrestricted node query jumps to the nearby stub...
        let unrestricted = closest_node(&graph, click, None);
        assert!(matches!(unrestricted, Some(NodeId(21) | NodeId(22))));
        // ...but restricting to the snapped edge's endpoints stays on A.
        let road_a: HashSet<NodeId> = [snap.node_a, snap.node_b].into();
        let restricted = closest_node(&graph, click, Some(&road_a));
        assert!(matches!(restricted, Some(NodeId(11) | NodeId(12))));
    }

    #[rstest]
    fn snap_on_empty_graph_is_none() {
        let graph = StreetGraph::new();
        assert!(closest_point_on_edge(&graph, Coord { x: 0.0, y: 0.0 }).is_none());
    }
}
