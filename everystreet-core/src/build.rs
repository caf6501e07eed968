//! Graph construction from map elements.
//!
//! The builder is a pure function of its inputs: it populates a
//! [`StreetGraph`] and performs no network or disk I/O. Malformed elements
//! (missing coordinates, ways of fewer than two nodes) are skipped, never
//! fatal.

use std::collections::HashMap;

use geo::Coord;
use log::debug;

use crate::RoutingOptions;
use crate::distance::haversine_m;
use crate::graph::{Edge, NodeId, StreetGraph};
use crate::osm::{OsmElement, Tags};

/// Weight multiplier applied to edges matching an avoidance preference.
/// Large enough that search only uses them when nothing else connects.
pub const AVOID_WEIGHT_MULTIPLIER: f64 = 100.0;

/// An edge counts as ridden when its midpoint lies within this distance of
/// any point of any ridden-road polyline.
const RIDDEN_THRESHOLD_M: f64 = 20.0;

/// Degrees of padding for the cheap bounding-box pre-filter in the ridden
/// test (~111 m of latitude).
const RIDDEN_BBOX_PAD_DEG: f64 = 0.001;

/// Highway classes never inserted into a cycling graph, regardless of
/// options.
const EXCLUDED_HIGHWAYS: [&str; 4] = ["motorway", "trunk", "motorway_link", "trunk_link"];

/// Classes penalised under `avoid_major_highways`.
const MAJOR_HIGHWAYS: [&str; 6] = [
    "primary",
    "primary_link",
    "secondary",
    "secondary_link",
    "tertiary",
    "tertiary_link",
];

/// Classes penalised under `avoid_trails`.
const TRAIL_HIGHWAYS: [&str; 4] = ["path", "track", "bridleway", "footway"];

/// Surfaces treated as unpaved under `avoid_gravel`.
const UNPAVED_SURFACES: [&str; 8] = [
    "gravel",
    "fine_gravel",
    "unpaved",
    "dirt",
    "ground",
    "grass",
    "sand",
    "compacted",
];

/// Build a street graph from decoded map elements.
///
/// `ridden_roads` are previously-covered polylines (`x` = longitude,
/// `y` = latitude); edges lying along them are flagged [`Edge::is_ridden`].
/// `options` influence per-edge avoidance flags at build time only.
#[must_use]
pub fn build_graph(
    elements: &[OsmElement],
    ridden_roads: Option<&[Vec<Coord<f64>>]>,
    options: &RoutingOptions,
) -> StreetGraph {
    let mut graph = StreetGraph::new();

    // First pass: index node coordinates for ways without inline geometry.
    let mut node_positions: HashMap<u64, Coord<f64>> = HashMap::new();
    for element in elements {
        if let OsmElement::Node { id, lat, lon, .. } = element {
            node_positions.insert(*id, Coord { x: *lon, y: *lat });
        }
    }

    // Second pass: add edges from ways.
    for element in elements {
        let OsmElement::Way {
            id: way_id,
            nodes,
            geometry,
            tags,
        } = element
        else {
            continue;
        };
        if nodes.len() < 2 {
            debug!("Skipped way {way_id}: fewer than two nodes");
            continue;
        }
        if is_excluded(tags) {
            continue;
        }

        let is_avoided = matches_avoidance(tags, options);
        let has_construction = is_under_construction(tags);
        let name = tags.get("name").cloned();

        for (index, pair) in nodes.windows(2).enumerate() {
            let (u, v) = (pair[0], pair[1]);
            if u == v {
                continue;
            }
            let Some(u_pos) = resolve_position(u, index, geometry.as_deref(), &node_positions)
            else {
                debug!("Skipped segment of way {way_id}: node {u} has no coordinates");
                continue;
            };
            let Some(v_pos) = resolve_position(v, index + 1, geometry.as_deref(), &node_positions)
            else {
                debug!("Skipped segment of way {way_id}: node {v} has no coordinates");
                continue;
            };

            let distance = haversine_m(u_pos, v_pos);
            let weight_m = if is_avoided {
                distance * AVOID_WEIGHT_MULTIPLIER
            } else {
                distance
            };
            let is_ridden = segment_is_ridden(u_pos, v_pos, ridden_roads);

            graph.add_node(NodeId(u), u_pos);
            graph.add_node(NodeId(v), v_pos);
            graph.add_edge(Edge {
                a: NodeId(u),
                b: NodeId(v),
                weight_m,
                way_id: *way_id,
                name: name.clone(),
                is_ridden,
                is_avoided,
                is_virtual: false,
                has_construction,
            });
        }
    }

    debug!(
        "Built graph: {} nodes, {} edges",
        graph.node_count(),
        graph.edge_count()
    );
    graph
}

/// Inline way geometry takes priority over the node lookup table.
fn resolve_position(
    node: u64,
    index: usize,
    geometry: Option<&[crate::osm::WayPoint]>,
    node_positions: &HashMap<u64, Coord<f64>>,
) -> Option<Coord<f64>> {
    geometry
        .and_then(|points| points.get(index).map(crate::osm::WayPoint::position))
        .or_else(|| node_positions.get(&node).copied())
}

fn highway_class(tags: &Tags) -> Option<&str> {
    tags.get("highway").map(String::as_str)
}

/// Motorway-class ways are never part of a cycling graph.
fn is_excluded(tags: &Tags) -> bool {
    highway_class(tags).is_some_and(|class| EXCLUDED_HIGHWAYS.contains(&class))
}

/// Whether the way matches any enabled avoidance rule.
fn matches_avoidance(tags: &Tags, options: &RoutingOptions) -> bool {
    if options.avoid_major_highways
        && highway_class(tags).is_some_and(|class| MAJOR_HIGHWAYS.contains(&class))
    {
        return true;
    }
    if options.avoid_trails
        && highway_class(tags).is_some_and(|class| TRAIL_HIGHWAYS.contains(&class))
    {
        return true;
    }
    if options.avoid_gravel && is_unpaved(tags) {
        return true;
    }
    false
}

/// Unpaved-surface heuristic: an explicit unpaved `surface` value, or a
/// `tracktype` worse than `grade1`.
fn is_unpaved(tags: &Tags) -> bool {
    if tags
        .get("surface")
        .is_some_and(|surface| UNPAVED_SURFACES.contains(&surface.as_str()))
    {
        return true;
    }
    tags.get("tracktype")
        .is_some_and(|grade| grade != "grade1")
}

/// Construction is flagged, not excluded; the caller surfaces a warning.
fn is_under_construction(tags: &Tags) -> bool {
    if highway_class(tags) == Some("construction") {
        return true;
    }
    tags.keys().any(|key| key.starts_with("construction"))
}

/// Midpoint-within-threshold test against the ridden polylines, behind a
/// padded bounding-box pre-filter so most points are rejected without a
/// haversine evaluation.
fn segment_is_ridden(
    u: Coord<f64>,
    v: Coord<f64>,
    ridden_roads: Option<&[Vec<Coord<f64>>]>,
) -> bool {
    let Some(polylines) = ridden_roads else {
        return false;
    };
    if polylines.is_empty() {
        return false;
    }

    let midpoint = Coord {
        x: (u.x + v.x) / 2.0,
        y: (u.y + v.y) / 2.0,
    };
    let min_x = u.x.min(v.x) - RIDDEN_BBOX_PAD_DEG;
    let max_x = u.x.max(v.x) + RIDDEN_BBOX_PAD_DEG;
    let min_y = u.y.min(v.y) - RIDDEN_BBOX_PAD_DEG;
    let max_y = u.y.max(v.y) + RIDDEN_BBOX_PAD_DEG;

    for polyline in polylines {
        for point in polyline {
            if point.x > min_x
                && point.x < max_x
                && point.y > min_y
                && point.y < max_y
                && haversine_m(midpoint, *point) < RIDDEN_THRESHOLD_M
            {
                return true;
            }
        }
    }
    false
}
