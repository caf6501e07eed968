//! Weighted undirected multigraph over street intersections.
//!
//! Nodes are OSM intersections; edges are consecutive-node segments of OSM
//! ways. An undirected edge is stored once in an arena and materialised as
//! one adjacency entry per endpoint, so the two traversal directions can
//! never fall out of sync: inserting or removing an edge updates both
//! endpoints atomically. All graph algorithms in the workspace are
//! written against [`StreetGraph::degree`] and [`StreetGraph::neighbors`]
//! only.

use std::collections::HashMap;

use geo::Coord;

/// Stable identifier of a graph node (the source OSM node id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Arena index of an edge inside a [`StreetGraph`].
///
/// Ids are not reused after removal within one graph instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId(pub usize);

/// A street intersection. Immutable once inserted; degree is derived from
/// adjacency, never stored here.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GraphNode {
    /// Stable node identity.
    pub id: NodeId,
    /// WGS84 position (`x` = longitude, `y` = latitude).
    pub position: Coord<f64>,
}

/// One undirected street segment between two nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    /// First endpoint.
    pub a: NodeId,
    /// Second endpoint.
    pub b: NodeId,
    /// Traversal weight in metres. Carries the avoidance multiplier when
    /// [`Edge::is_avoided`] is set, so it may exceed the physical length.
    pub weight_m: f64,
    /// Originating OSM way.
    pub way_id: i64,
    /// Display name of the way, when tagged.
    pub name: Option<String>,
    /// Already covered by the rider; not required in a sweep.
    pub is_ridden: bool,
    /// Matches a routing-avoidance preference.
    pub is_avoided: bool,
    /// Inserted during augmentation or bridging rather than read from map
    /// data; traversing it is backtracking, not new pavement.
    pub is_virtual: bool,
    /// The way is under construction; surfaced to callers as a warning.
    pub has_construction: bool,
}

impl Edge {
    /// The endpoint opposite `node`, or `None` if `node` is not an endpoint.
    #[must_use]
    pub fn other_endpoint(&self, node: NodeId) -> Option<NodeId> {
        if node == self.a {
            Some(self.b)
        } else if node == self.b {
            Some(self.a)
        } else {
            None
        }
    }
}

/// The street multigraph.
#[derive(Debug, Default)]
pub struct StreetGraph {
    nodes: HashMap<NodeId, GraphNode>,
    edges: Vec<Option<Edge>>,
    adjacency: HashMap<NodeId, Vec<(EdgeId, NodeId)>>,
    live_edges: usize,
}

impl StreetGraph {
    /// Create an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node. Re-inserting an existing id keeps the first position.
    pub fn add_node(&mut self, id: NodeId, position: Coord<f64>) {
        self.nodes.entry(id).or_insert(GraphNode { id, position });
    }

    /// Whether a node with this id exists.
    #[must_use]
    pub fn contains_node(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Look up a node.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&GraphNode> {
        self.nodes.get(&id)
    }

    /// Iterate all nodes in unspecified order.
    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes.values()
    }

    /// Number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Insert an undirected edge, registering an adjacency arc at each
    /// endpoint. Parallel edges between the same pair are allowed. Both
    /// endpoints must already exist.
    pub fn add_edge(&mut self, edge: Edge) -> EdgeId {
        debug_assert!(self.contains_node(edge.a) && self.contains_node(edge.b));
        let id = EdgeId(self.edges.len());
        self.adjacency.entry(edge.a).or_default().push((id, edge.b));
        self.adjacency.entry(edge.b).or_default().push((id, edge.a));
        self.edges.push(Some(edge));
        self.live_edges += 1;
        id
    }

    /// Look up an edge by id. Removed ids resolve to `None`.
    #[must_use]
    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(id.0).and_then(Option::as_ref)
    }

    /// Remove an undirected edge, dropping the adjacency arc at both
    /// endpoints, and return its payload.
    pub fn remove_edge(&mut self, id: EdgeId) -> Option<Edge> {
        let edge = self.edges.get_mut(id.0).and_then(Option::take)?;
        for endpoint in [edge.a, edge.b] {
            if let Some(arcs) = self.adjacency.get_mut(&endpoint) {
                arcs.retain(|(eid, _)| *eid != id);
            }
        }
        self.live_edges -= 1;
        Some(edge)
    }

    /// Iterate all live edges with their ids, in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = (EdgeId, &Edge)> {
        self.edges
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|e| (EdgeId(i), e)))
    }

    /// Number of live undirected edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.live_edges
    }

    /// Undirected degree of a node: incident edges counted once each, with
    /// parallel edges counted per occurrence. Unknown nodes have degree 0.
    #[must_use]
    pub fn degree(&self, node: NodeId) -> usize {
        self.adjacency.get(&node).map_or(0, Vec::len)
    }

    /// Iterate the `(edge, opposite endpoint)` pairs incident to a node.
    pub fn neighbors(&self, node: NodeId) -> impl Iterator<Item = (EdgeId, NodeId)> + '_ {
        self.adjacency
            .get(&node)
            .into_iter()
            .flat_map(|arcs| arcs.iter().copied())
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::{edge, graph_with_nodes};
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn triangle() -> StreetGraph {
        let mut graph = graph_with_nodes(&[(1, 0.0, 0.0), (2, 0.001, 0.0), (3, 0.0, 0.001)]);
        graph.add_edge(edge(NodeId(1), NodeId(2), 111.0));
        graph.add_edge(edge(NodeId(2), NodeId(3), 157.0));
        graph.add_edge(edge(NodeId(3), NodeId(1), 111.0));
        graph
    }

    #[rstest]
    fn add_edge_registers_both_arcs(triangle: StreetGraph) {
        assert_eq!(triangle.degree(NodeId(1)), 2);
        assert_eq!(triangle.degree(NodeId(2)), 2);
        assert_eq!(triangle.degree(NodeId(3)), 2);
        assert_eq!(triangle.edge_count(), 3);
    }

    #[rstest]
    fn neighbors_reports_opposite_endpoints(triangle: StreetGraph) {
        let mut opposite: Vec<NodeId> = triangle.neighbors(NodeId(1)).map(|(_, n)| n).collect();
        opposite.sort();
        assert_eq!(opposite, vec![NodeId(2), NodeId(3)]);
    }

    #[rstest]
    fn remove_edge_drops_both_arcs(mut triangle: StreetGraph) {
        let id = triangle
            .edges()
            .find(|(_, e)| e.a == NodeId(1) && e.b == NodeId(2))
            .map(|(id, _)| id)
            .expect("edge 1-2 exists");
        let removed = triangle.remove_edge(id).expect("removal succeeds");
        assert_eq!(removed.a, NodeId(1));
        assert_eq!(triangle.degree(NodeId(1)), 1);
        assert_eq!(triangle.degree(NodeId(2)), 1);
        assert_eq!(triangle.edge_count(), 2);
        assert!(triangle.edge(id).is_none());
        // Removing again is a no-op.
        assert!(triangle.remove_edge(id).is_none());
    }

    #[rstest]
    fn parallel_edges_are_distinct_and_both_count(mut triangle: StreetGraph) {
        let duplicate = edge(NodeId(1), NodeId(2), 111.0);
        triangle.add_edge(duplicate);
        assert_eq!(triangle.degree(NodeId(1)), 3);
        assert_eq!(triangle.edge_count(), 4);
    }

    #[rstest]
    fn reinserting_a_node_keeps_the_first_position() {
        let mut graph = graph_with_nodes(&[(7, 1.0, 2.0)]);
        graph.add_node(NodeId(7), Coord { x: 9.0, y: 9.0 });
        let node = graph.node(NodeId(7)).expect("node exists");
        assert_eq!(node.position, Coord { x: 1.0, y: 2.0 });
    }

    #[rstest]
    fn degree_of_unknown_node_is_zero(triangle: StreetGraph) {
        assert_eq!(triangle.degree(NodeId(99)), 0);
        assert_eq!(triangle.neighbors(NodeId(99)).count(), 0);
    }

    #[rstest]
    fn other_endpoint_resolves_or_rejects() {
        let e = edge(NodeId(1), NodeId(2), 1.0);
        assert_eq!(e.other_endpoint(NodeId(1)), Some(NodeId(2)));
        assert_eq!(e.other_endpoint(NodeId(2)), Some(NodeId(1)));
        assert_eq!(e.other_endpoint(NodeId(3)), None);
    }
}
