//! The read-only view of a road network the encoder is built against.
//!
//! [`GraphAdapter`] is a capability set, not a concrete graph: callers plug
//! in whatever storage and spatial index they already have. The core only
//! ever calls through this trait (and [`crate::VehicleProfile`](crate::profile::VehicleProfile))
//! and never assumes a particular edge or vertex representation.

pub mod dijkstra;

use std::collections::HashSet;
use std::fmt::Debug;
use std::hash::Hash;
use std::rc::Rc;

use crate::model::{Coordinate, Edge, Length};

/// The edge and its two endpoints closest to a query coordinate, together
/// with how far along the edge (from `from`) the projection landed.
#[derive(Debug, Clone, Copy)]
pub struct ClosestEdge<V, T> {
    pub from: V,
    pub to: V,
    pub edge: Edge<T>,
    pub offset: Length,
}

/// One node of a shortest-path search tree.
///
/// Forms a singly linked chain back to a search root via [`Rc`] so that
/// fan-out search (several start candidates racing each other) can share
/// common sub-paths instead of copying them.
#[derive(Debug, Clone)]
pub struct PathSegment<V, T> {
    pub vertex: V,
    /// Distance already spent reaching `vertex` from the true query
    /// coordinate that seeded this search root (zero unless this segment
    /// starts mid-edge).
    pub consumed: Length,
    /// Accumulated cost from the search root to `vertex`.
    pub cost: Length,
    /// The edge used to arrive at `vertex` from `predecessor`, if any.
    pub edge: Option<Edge<T>>,
    pub predecessor: Option<Rc<PathSegment<V, T>>>,
}

impl<V: Copy, T: Copy> PathSegment<V, T> {
    pub fn root(vertex: V, consumed: Length) -> Self {
        Self {
            vertex,
            consumed,
            cost: Length::ZERO,
            edge: None,
            predecessor: None,
        }
    }

    /// Flattens the chain from this segment back to its root into forward
    /// order: `(vertices, edges)` with `edges.len() + 1 == vertices.len()`.
    pub fn flatten(&self) -> (Vec<V>, Vec<Edge<T>>) {
        let mut vertices = vec![self.vertex];
        let mut edges = Vec::new();

        let mut current = self;
        while let Some(predecessor) = current.predecessor.as_deref() {
            if let Some(edge) = current.edge {
                edges.push(edge);
            }
            vertices.push(predecessor.vertex);
            current = predecessor;
        }

        vertices.reverse();
        edges.reverse();
        (vertices, edges)
    }
}

/// Read-only access to a road network.
pub trait GraphAdapter {
    type VertexId: Copy + Eq + Hash + Debug;
    type TagsId: Copy + Eq + Hash + Debug;
    type Error: std::error::Error + Send + Sync + 'static;

    /// Geographic coordinate of a vertex.
    fn vertex_coord(&self, vertex: Self::VertexId) -> Result<Coordinate, Self::Error>;

    /// Intermediate shape points of the edge from `from` to `to`, excluding
    /// both endpoints. Empty for a straight edge.
    fn edge_shape(
        &self,
        from: Self::VertexId,
        to: Self::VertexId,
    ) -> Result<Vec<Coordinate>, Self::Error>;

    /// Every edge leaving `vertex`, together with the vertex it leads to.
    fn outgoing_edges(
        &self,
        vertex: Self::VertexId,
    ) -> Result<Vec<(Self::VertexId, Edge<Self::TagsId>)>, Self::Error>;

    /// Whether `vertex` is a "valid" OpenLR node (typically: degree != 2).
    fn is_vertex_valid(&self, vertex: Self::VertexId) -> Result<bool, Self::Error>;

    /// Nearest traversable edge to `coord`, within `tolerance` if given.
    fn closest_edge(
        &self,
        coord: Coordinate,
        tolerance: Option<Length>,
    ) -> Result<Option<ClosestEdge<Self::VertexId, Self::TagsId>>, Self::Error>;

    /// Disambiguates the closest edge using both a start and an end
    /// coordinate, for the common case where both project onto the same
    /// edge. Returns `None` when no single edge is within `tolerance` of
    /// both points.
    fn closest_edge_pair(
        &self,
        start: Coordinate,
        end: Coordinate,
        tolerance: Length,
    ) -> Result<Option<ClosestEdge<Self::VertexId, Self::TagsId>>, Self::Error>;

    /// Cheapest path from any of `starts` to any of `ends`.
    ///
    /// `oneway_aware` asks the adapter to honor directional restrictions;
    /// implementations that only ever route forward may ignore it.
    fn shortest_path(
        &self,
        starts: &[PathSegment<Self::VertexId, Self::TagsId>],
        ends: &[Self::VertexId],
        oneway_aware: bool,
    ) -> Result<Option<PathSegment<Self::VertexId, Self::TagsId>>, Self::Error>;

    /// Searches outward from `vertex` (reached via `edge` from `neighbor`)
    /// for the closest valid vertex, excluding anything in `exclude`.
    ///
    /// The returned segment is rooted at `vertex` itself (its predecessor
    /// chain bottoms out at a [`PathSegment::root`] holding `vertex`), with
    /// its own `.vertex` the discovered valid vertex. Flattening it therefore
    /// always yields `vertex` first and the discovered vertex last:
    ///
    /// - `forward == false` (head expansion): the chain was walked against
    ///   the stored edge directions, so the caller reverses the flattened
    ///   vertices and edges (flipping each edge with [`Edge::reverse`])
    ///   before dropping the duplicate `vertex` and prepending the rest in
    ///   front of the route.
    /// - `forward == true` (tail expansion): the chain was walked with the
    ///   stored edge directions, so the caller drops the duplicate leading
    ///   `vertex` and appends the rest behind the route, edges unchanged.
    fn find_valid_vertex_for(
        &self,
        vertex: Self::VertexId,
        edge: Edge<Self::TagsId>,
        neighbor: Self::VertexId,
        exclude: &HashSet<Self::VertexId>,
        forward: bool,
    ) -> Result<Option<PathSegment<Self::VertexId, Self::TagsId>>, Self::Error>;
}
