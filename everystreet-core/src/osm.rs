//! Map element model consumed by the graph builder.
//!
//! Elements mirror the JSON shape of the upstream geodata service: nodes
//! carry coordinates, ways carry an ordered node-id list with optional
//! inline per-node geometry. Fetching is an external collaborator; this
//! crate only consumes already-decoded elements.

use geo::Coord;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// OSM-style string tags.
pub type Tags = HashMap<String, String>;

/// A decoded map element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OsmElement {
    /// A point with coordinates.
    Node {
        /// Source node id.
        id: u64,
        /// Latitude in degrees.
        lat: f64,
        /// Longitude in degrees.
        lon: f64,
        /// Optional tags.
        #[serde(default)]
        tags: Tags,
    },
    /// An ordered run of nodes forming a road.
    Way {
        /// Source way id.
        id: i64,
        /// Ordered node ids along the way.
        nodes: Vec<u64>,
        /// Optional inline geometry, parallel to `nodes`. Takes priority
        /// over the node lookup table when present.
        #[serde(default)]
        geometry: Option<Vec<WayPoint>>,
        /// Optional tags.
        #[serde(default)]
        tags: Tags,
    },
}

/// Inline way geometry point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WayPoint {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
}

impl WayPoint {
    /// Convert to the workspace coordinate convention.
    #[must_use]
    pub fn position(&self) -> Coord<f64> {
        Coord {
            x: self.lon,
            y: self.lat,
        }
    }
}
