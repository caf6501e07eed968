//! End-to-end solve: from a request to an ordered list of route points.
//!
//! The pipeline is fixed: derive the required edge set, discover and bridge
//! components, correct vertex parity, extract the trail, then project the
//! walk back onto node coordinates. Each stage degrades rather than fails
//! where the road network allows it, so a solve only errors on genuinely
//! unusable input.

use geo::Coord;
use log::{debug, warn};
use thiserror::Error;

use everystreet_core::{BoundingBox, NodeId, StreetGraph, closest_node};

use crate::TrailEdge;
use crate::components::{bridge_islands, components};
use crate::parity::correct_parity;
use crate::required;
use crate::trail::{TrailOutcome, build_trail};

/// One point of the final route.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoutePoint {
    /// Geographic position (`x` is longitude, `y` is latitude).
    pub position: Coord<f64>,
    /// Whether the step leaving this point runs along a road under
    /// construction.
    pub has_construction: bool,
}

/// Parameters of one solve call.
#[derive(Debug, Clone, Default)]
pub struct SweepRequest {
    /// Preferred start position; snapped to the nearest required node.
    pub start: Option<Coord<f64>>,
    /// Preferred end position; snapped to the nearest required node.
    pub end: Option<Coord<f64>>,
    /// User-drawn polyline. Takes precedence over `selection`.
    pub manual_route: Option<Vec<Coord<f64>>>,
    /// Rectangular selection to sweep instead of the whole graph.
    pub selection: Option<BoundingBox>,
}

/// Failures a solve cannot degrade its way around.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SolveError {
    /// The requested start position has no required node to snap to.
    #[error("no required road node to anchor the requested start point")]
    StartUnsnappable,
    /// The requested end position has no required node to snap to.
    #[error("no required road node to anchor the requested end point")]
    EndUnsnappable,
    /// The extracted trail references a node absent from the graph.
    #[error("trail references node {0} missing from the graph")]
    MissingNode(NodeId),
}

/// Solve the sweep for `request` over `graph`.
///
/// Returns an empty route when nothing needs covering, which is a valid
/// outcome rather than an error.
pub fn solve(graph: &StreetGraph, request: &SweepRequest) -> Result<Vec<RoutePoint>, SolveError> {
    let required = required::derive(
        graph,
        request.manual_route.as_deref(),
        request.selection,
    );
    if required.is_empty() {
        debug!("Nothing to cover; returning an empty route");
        return Ok(Vec::new());
    }
    let allowed = required.allowed.as_ref();

    let comps = components(graph, &required.nodes);
    debug!(
        "{} required edges across {} components",
        required.edges.len(),
        comps.len()
    );
    let bridging = bridge_islands(graph, comps, allowed);
    if bridging.dropped_islands > 0 {
        warn!(
            "{} islands dropped from the required set",
            bridging.dropped_islands
        );
    }

    let mut edges: Vec<TrailEdge> = required
        .edges
        .iter()
        .filter(|(_, a, b)| bridging.reachable.contains(a) && bridging.reachable.contains(b))
        .map(|&(id, a, b)| TrailEdge::required(id, a, b))
        .collect();
    if edges.is_empty() {
        warn!("No required edges survived island bridging");
        return Ok(Vec::new());
    }
    edges.extend(bridging.bridges.iter().copied());

    let start = match request.start {
        Some(position) => Some(
            closest_node(graph, position, Some(&bridging.reachable))
                .ok_or(SolveError::StartUnsnappable)?,
        ),
        None => None,
    };
    let end = match request.end {
        Some(position) => Some(
            closest_node(graph, position, Some(&bridging.reachable))
                .ok_or(SolveError::EndUnsnappable)?,
        ),
        None => None,
    };

    correct_parity(graph, &mut edges, start, end, allowed);

    let outcome = build_trail(graph, &edges, start, end, allowed);
    if let TrailOutcome::Degraded { reason, .. } = &outcome {
        warn!("Falling back to a degraded route: {reason}");
    }
    into_route(graph, outcome)
}

/// Project the trail's node sequence onto coordinates, flagging each point
/// whose outgoing step runs on a construction road.
fn into_route(graph: &StreetGraph, outcome: TrailOutcome) -> Result<Vec<RoutePoint>, SolveError> {
    let trail = outcome.into_trail();
    let mut route = Vec::with_capacity(trail.nodes.len());
    for (index, &node) in trail.nodes.iter().enumerate() {
        let position = graph
            .node(node)
            .map(|n| n.position)
            .ok_or(SolveError::MissingNode(node))?;
        let has_construction = trail
            .edges
            .get(index)
            .copied()
            .flatten()
            .and_then(|id| graph.edge(id))
            .is_some_and(|edge| edge.has_construction);
        route.push(RoutePoint {
            position,
            has_construction,
        });
    }
    Ok(route)
}
