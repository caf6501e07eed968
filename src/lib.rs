//! Facade crate for the Everystreet route engine.
//!
//! This crate re-exports the graph-building core and the sweep solver so
//! applications depend on a single crate.

#![forbid(unsafe_code)]

pub use everystreet_core::{
    BoundingBox, Clock, Edge, EdgeId, EdgeSnap, GraphCache, GraphNode, NodeId, OsmElement,
    PathQuery, PathResult, PathStep, RoutingOptions, StreetGraph, SystemClock, Tags, area_key,
    build_graph, closest_node, closest_point_on_edge, closest_target, find_path, haversine_m,
};

pub use everystreet_solver::{
    RequiredEdgeSet, RequiredIntent, RoutePoint, SolveError, SweepRequest, Trail, TrailOutcome,
    solve,
};
