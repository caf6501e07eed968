//! Core graph model for the Everystreet route engine.
//!
//! The engine turns OpenStreetMap way data into a weighted undirected
//! multigraph and answers the queries the solver needs: great-circle
//! distances, nearest-node and nearest-point-on-edge snapping, and
//! single-source shortest paths. A TTL cache memoises built graphs per
//! area so repeated requests over the same bounding box reuse one build.
//!
//! Coordinates follow the workspace convention of `geo::Coord<f64>` with
//! `x = longitude` and `y = latitude` (WGS84 degrees).

#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

pub mod build;
pub mod cache;
pub mod distance;
pub mod graph;
pub mod osm;
pub mod path;
pub mod snap;

pub use build::build_graph;
pub use cache::{Clock, GraphCache, SystemClock, area_key};
pub use distance::haversine_m;
pub use graph::{Edge, EdgeId, GraphNode, NodeId, StreetGraph};
pub use osm::{OsmElement, Tags};
pub use path::{PathQuery, PathResult, PathStep, closest_target, find_path};
pub use snap::{EdgeSnap, closest_node, closest_point_on_edge};

/// Axis-aligned geographic rectangle in WGS84 degrees.
///
/// The field layout mirrors the `{north, south, east, west}` shape used by
/// upstream geodata requests. No antimeridian handling: callers with areas
/// crossing it must split the query themselves.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Maximum latitude.
    pub north: f64,
    /// Minimum latitude.
    pub south: f64,
    /// Maximum longitude.
    pub east: f64,
    /// Minimum longitude.
    pub west: f64,
}

impl BoundingBox {
    /// Whether the point lies inside the box, boundary included.
    #[must_use]
    pub fn contains(&self, position: geo::Coord<f64>) -> bool {
        position.y >= self.south
            && position.y <= self.north
            && position.x >= self.west
            && position.x <= self.east
    }
}

/// Build-time routing preferences.
///
/// These influence how the graph builder flags edges, not how the solver
/// traverses them: a matching way is still inserted, but its weight carries
/// a large penalty so search avoids it unless nothing else connects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingOptions {
    /// Penalise unpaved-surface ways (gravel, dirt, sand, ...).
    pub avoid_gravel: bool,
    /// Penalise primary/secondary/tertiary roads.
    pub avoid_major_highways: bool,
    /// Penalise path, track, bridleway and footway classes.
    pub avoid_trails: bool,
}
