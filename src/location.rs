//! In-memory representation of a location that has been anchored onto a
//! specific road network, plus the validation primitives
//! [`crate::validator::RouteValidator`] composes into full encode-time
//! checks.

use std::fmt::Debug;
use std::hash::Hash;

use crate::model::{Coordinate, Edge, Length, Orientation};
use crate::profile::VehicleProfile;

/// An ordered chain of vertices and the edges connecting them, together
/// with the fractional offsets that trim its first and last edge.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferencedLine<V, T> {
    pub vertices: Vec<V>,
    pub edges: Vec<Edge<T>>,
    pub edge_shapes: Vec<Vec<Coordinate>>,
    pub positive_offset_pct: f64,
    pub negative_offset_pct: f64,
}

impl<V: Copy + Eq + Hash + Debug, T: Copy + Eq + Hash + Debug> ReferencedLine<V, T> {
    pub fn new(vertices: Vec<V>, edges: Vec<Edge<T>>) -> Self {
        Self {
            vertices,
            edges,
            edge_shapes: Vec::new(),
            positive_offset_pct: 0.0,
            negative_offset_pct: 0.0,
        }
    }

    pub fn with_offsets(mut self, positive_offset_pct: f64, negative_offset_pct: f64) -> Self {
        self.positive_offset_pct = positive_offset_pct;
        self.negative_offset_pct = negative_offset_pct;
        self
    }

    pub fn path_length(&self) -> Length {
        self.edges.iter().map(|edge| edge.distance).sum()
    }

    pub fn first_vertex(&self) -> V {
        self.vertices[0]
    }

    pub fn last_vertex(&self) -> V {
        *self.vertices.last().expect("referenced line has >= 2 vertices")
    }

    pub fn first_edge(&self) -> Edge<T> {
        self.edges[0]
    }

    pub fn last_edge(&self) -> Edge<T> {
        *self.edges.last().expect("referenced line has >= 1 edge")
    }

    /// A single edge whose traversal is legal under `profile`, by
    /// comparing its stored `forward` flag against the oneway rule for its
    /// tags. `None` for tags means bidirectional.
    pub fn is_edge_traversable<P>(profile: &P, edge: Edge<T>) -> bool
    where
        P: VehicleProfile<TagsId = T>,
    {
        match profile.is_oneway(edge.tags_id) {
            None => true,
            Some(forward_only) => forward_only == edge.forward,
        }
    }

    /// Every edge in the path is legally traversable in its stored
    /// direction, and the path has the minimal shape (>= 2 vertices, one
    /// edge per consecutive pair).
    pub fn is_connected<P>(&self, profile: &P) -> bool
    where
        P: VehicleProfile<TagsId = T>,
    {
        self.vertices.len() >= 2
            && self.edges.len() + 1 == self.vertices.len()
            && self
                .edges
                .iter()
                .all(|&edge| Self::is_edge_traversable(profile, edge))
    }

    /// Offsets are within `[0, 100)`, sum to at most `100`, and the route
    /// carries enough length for them to be meaningful.
    pub fn has_valid_offsets(&self) -> bool {
        let positive_offset_pct = self.positive_offset_pct;
        let negative_offset_pct = self.negative_offset_pct;

        (0.0..100.0).contains(&positive_offset_pct)
            && (0.0..100.0).contains(&negative_offset_pct)
            && positive_offset_pct + negative_offset_pct <= 100.0
    }
}

/// A point projected onto a [`ReferencedLine`], ready to be encoded as an
/// OpenLR "point along line" location.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferencedPointAlongLine<V, T> {
    pub route: ReferencedLine<V, T>,
    pub lat: f64,
    pub lon: f64,
    pub orientation: Orientation,
}

impl<V: Copy + Eq + Hash + Debug, T: Copy + Eq + Hash + Debug> ReferencedPointAlongLine<V, T> {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lon, self.lat)
    }
}
