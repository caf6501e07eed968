//! Rural-postman solver over the Everystreet graph.
//!
//! Given a built [`StreetGraph`](everystreet_core::StreetGraph), the solver
//! produces one connected walk that covers every required edge at least
//! once while keeping repeated distance low. The pipeline is: derive the
//! required edge set (full sweep, rectangular selection, or manually drawn
//! route), bridge disconnected islands, correct odd-degree parity with
//! greedy matching, then extract an Eulerian trail with a repair stage and
//! a greedy fallback so a degraded route is always preferred over an error.
//!
//! The matching and bridging heuristics are deliberately greedy rather
//! than optimal; an exact minimum-weight matching (blossom) would shorten
//! augmenting tours but is out of scope, and callers assert only bounded
//! duplication.

#![forbid(unsafe_code)]

use everystreet_core::{EdgeId, NodeId};

pub mod components;
pub mod parity;
pub mod required;
pub mod solve;
pub mod trail;

pub use required::{RequiredEdgeSet, RequiredIntent};
pub use solve::{RoutePoint, SolveError, SweepRequest, solve};
pub use trail::{Trail, TrailOutcome};

/// One traversal requirement in the augmented edge multiset.
///
/// Virtual entries duplicate an existing graph edge for backtracking or
/// bridging; they reference the same underlying [`EdgeId`], so flag lookups
/// (construction, ridden) resolve against the real edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrailEdge {
    /// Underlying graph edge.
    pub id: EdgeId,
    /// First endpoint.
    pub a: NodeId,
    /// Second endpoint.
    pub b: NodeId,
    /// Backtracking/bridging duplicate rather than new pavement.
    pub is_virtual: bool,
}

impl TrailEdge {
    /// Required (non-virtual) traversal of a graph edge.
    #[must_use]
    pub fn required(id: EdgeId, a: NodeId, b: NodeId) -> Self {
        Self {
            id,
            a,
            b,
            is_virtual: false,
        }
    }

    /// Virtual duplicate of a graph edge.
    #[must_use]
    pub fn virtual_copy(id: EdgeId, a: NodeId, b: NodeId) -> Self {
        Self {
            id,
            a,
            b,
            is_virtual: true,
        }
    }
}
