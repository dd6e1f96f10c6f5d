//! Turns raw coordinates into network-anchored [`ReferencedLine`] /
//! [`ReferencedPointAlongLine`] values, ready for [`crate::lrp`] to encode.
//!
//! A location that doesn't start or end exactly on a vertex is anchored by
//! projecting onto the nearest edge and letting the shortest-path search
//! pick whichever of that edge's two endpoints the rest of the route
//! actually needs; the unchosen endpoint, together with the edge itself,
//! is prepended or appended so the edge's *whole* length still appears in
//! the final path, with the true coordinate represented purely as an
//! offset into it.

use tracing::debug;

use crate::config::EncoderConfig;
use crate::error::EncodeError;
use crate::graph::{ClosestEdge, GraphAdapter, PathSegment};
use crate::location::{ReferencedLine, ReferencedPointAlongLine};
use crate::model::{Coordinate, Edge, Length, Orientation};
use crate::profile::VehicleProfile;
use crate::validator;

/// Anchors a single coordinate onto its nearest edge, returning a
/// referenced point-along-line location covering just that edge.
pub fn build_point_along_line<G, P>(
    config: &EncoderConfig,
    graph: &G,
    profile: &P,
    coord: Coordinate,
) -> Result<ReferencedPointAlongLine<G::VertexId, G::TagsId>, EncodeError<G::Error>>
where
    G: GraphAdapter,
    P: VehicleProfile<TagsId = G::TagsId>,
{
    debug!(?coord, "anchoring point-along-line location");

    let closest = graph
        .closest_edge(coord, None)?
        .ok_or(EncodeError::NoNetworkNearby)?;

    // `closest_edge` reports `from`/`to` in the edge's stored shape order,
    // not necessarily a legally traversable one; swap to the reverse edge
    // if that's the direction the profile actually allows.
    let (from, to, edge) = if ReferencedLine::<G::VertexId, G::TagsId>::is_edge_traversable(profile, closest.edge)
    {
        (closest.from, closest.to, closest.edge)
    } else {
        (closest.to, closest.from, closest.edge.reverse())
    };

    let route = build_line_location_from_parts(config, graph, vec![from, to], vec![edge], 0.0, 0.0)?;

    Ok(ReferencedPointAlongLine {
        route,
        lat: coord.lat,
        lon: coord.lon,
        orientation: Orientation::NoOrientation,
    })
}

/// Anchors a start and end coordinate onto the network and connects them
/// with the cheapest legal route, within `tolerance` of each point.
pub fn build_line_location<G, P>(
    config: &EncoderConfig,
    graph: &G,
    profile: &P,
    start_coord: Coordinate,
    end_coord: Coordinate,
    tolerance: Length,
) -> Result<ReferencedLine<G::VertexId, G::TagsId>, EncodeError<G::Error>>
where
    G: GraphAdapter,
    P: VehicleProfile<TagsId = G::TagsId>,
{
    debug!(?start_coord, ?end_coord, %tolerance, "building line location");

    let start = graph
        .closest_edge(start_coord, Some(tolerance))?
        .ok_or(EncodeError::TooFarFromNetwork { tolerance })?;
    let end = graph
        .closest_edge(end_coord, Some(tolerance))?
        .ok_or(EncodeError::TooFarFromNetwork { tolerance })?;

    let (vertices, edges) = match try_same_edge(profile, &start, &end) {
        Some(parts) => parts,
        None => stitch_via_shortest_path(config, graph, profile, &start, &end)?,
    };

    let total_length: Length = edges.iter().map(|edge| edge.distance).sum();
    let positive_offset_pct = (start_offset_on(&edges[0], &start) / total_length.meters() * 100.0)
        .clamp(0.0, 99.0);
    let negative_offset_pct =
        (end_offset_on(edges.last().unwrap(), &end) / total_length.meters() * 100.0).clamp(0.0, 99.0);

    build_line_location_from_parts(
        config,
        graph,
        vertices,
        edges,
        positive_offset_pct,
        negative_offset_pct,
    )
}

/// Remaining distance the true offset of an already-decided first edge
/// would need to be trimmed by. When the first edge came straight out of
/// `try_same_edge`/`stitch_via_shortest_path` it carries the same tags as
/// the original closest edge, so the caller's reported offset still
/// applies directly.
fn start_offset_on<V: PartialEq, T>(first_edge: &Edge<T>, start: &ClosestEdge<V, T>) -> f64 {
    if first_edge.forward == start.edge.forward {
        start.offset.meters()
    } else {
        (start.edge.distance - start.offset).meters()
    }
}

fn end_offset_on<V: PartialEq, T>(last_edge: &Edge<T>, end: &ClosestEdge<V, T>) -> f64 {
    if last_edge.forward == end.edge.forward {
        (end.edge.distance - end.offset).meters()
    } else {
        end.offset.meters()
    }
}

/// Builds a [`ReferencedLine`] from an already-anchored vertex/edge chain:
/// checks the offset preconditions, expands invalid endpoints (R4), and
/// populates the edge shapes the LRP encoder needs for bearings.
pub fn build_line_location_from_parts<G>(
    config: &EncoderConfig,
    graph: &G,
    vertices: Vec<G::VertexId>,
    edges: Vec<Edge<G::TagsId>>,
    positive_offset_pct: f64,
    negative_offset_pct: f64,
) -> Result<ReferencedLine<G::VertexId, G::TagsId>, EncodeError<G::Error>>
where
    G: GraphAdapter,
{
    if vertices.len() < 2
        || edges.len() + 1 != vertices.len()
        || !(0.0..100.0).contains(&positive_offset_pct)
        || !(0.0..100.0).contains(&negative_offset_pct)
        || positive_offset_pct + negative_offset_pct > 100.0
    {
        return Err(EncodeError::InvalidOffsets {
            positive_offset_pct,
            negative_offset_pct,
        });
    }

    let line = ReferencedLine::new(vertices, edges).with_offsets(positive_offset_pct, negative_offset_pct);
    let mut line = validator::expand_to_valid(config, graph, line)?;

    let mut edge_shapes = Vec::with_capacity(line.edges.len());
    for pair in line.vertices.windows(2) {
        edge_shapes.push(graph.edge_shape(pair[0], pair[1])?);
    }
    line.edge_shapes = edge_shapes;

    Ok(line)
}

/// Tries to resolve `start` and `end` as projections onto the very same
/// edge: if so, the direction is read straight off the two offsets and no
/// shortest-path search is needed at all.
fn try_same_edge<P, V, T>(
    profile: &P,
    start: &ClosestEdge<V, T>,
    end: &ClosestEdge<V, T>,
) -> Option<(Vec<V>, Vec<Edge<T>>)>
where
    P: VehicleProfile<TagsId = T>,
    V: Copy + PartialEq,
    T: Copy + PartialEq,
{
    if start.edge.tags_id != end.edge.tags_id {
        return None;
    }

    let (from, to, edge, start_offset, end_offset) = if start.from == end.from && start.to == end.to {
        (start.from, start.to, start.edge, start.offset, end.offset)
    } else if start.from == end.to && start.to == end.from {
        let length = start.edge.distance;
        (start.from, start.to, start.edge, start.offset, length - end.offset)
    } else {
        return None;
    };

    let (vertices, edges) = if start_offset <= end_offset {
        (vec![from, to], vec![edge])
    } else {
        (vec![to, from], vec![edge.reverse()])
    };

    if !ReferencedLine::<V, T>::is_edge_traversable(profile, edges[0]) {
        return None;
    }

    Some((vertices, edges))
}

struct StartCandidate<V, T> {
    exit_vertex: V,
    prefix_vertices: Vec<V>,
    prefix_edges: Vec<Edge<T>>,
    root: PathSegment<V, T>,
}

/// The real vertices a route could legally set out from, given the start
/// point's projection onto its nearest edge.
fn exit_candidates<P, V, T>(
    config: &EncoderConfig,
    profile: &P,
    closest: &ClosestEdge<V, T>,
) -> Vec<StartCandidate<V, T>>
where
    P: VehicleProfile<TagsId = T>,
    V: Copy,
    T: Copy + Eq + std::hash::Hash + std::fmt::Debug,
{
    let ClosestEdge { from, to, edge, offset } = *closest;
    let length = edge.distance;

    if offset <= config.epsilon {
        return vec![StartCandidate {
            exit_vertex: from,
            prefix_vertices: vec![from],
            prefix_edges: Vec::new(),
            root: PathSegment::root(from, Length::ZERO),
        }];
    }

    if length - offset <= config.epsilon {
        return vec![StartCandidate {
            exit_vertex: to,
            prefix_vertices: vec![to],
            prefix_edges: Vec::new(),
            root: PathSegment::root(to, Length::ZERO),
        }];
    }

    let mut candidates = Vec::with_capacity(2);

    if ReferencedLine::<V, T>::is_edge_traversable(profile, edge) {
        candidates.push(StartCandidate {
            exit_vertex: to,
            prefix_vertices: vec![from, to],
            prefix_edges: vec![edge],
            root: PathSegment::root(to, profile.weight(edge.tags_id, length - offset)),
        });
    }

    let reversed = edge.reverse();
    if ReferencedLine::<V, T>::is_edge_traversable(profile, reversed) {
        candidates.push(StartCandidate {
            exit_vertex: from,
            prefix_vertices: vec![to, from],
            prefix_edges: vec![reversed],
            root: PathSegment::root(from, profile.weight(edge.tags_id, offset)),
        });
    }

    candidates
}

struct EndCandidate<V, T> {
    entry_vertex: V,
    suffix_vertices: Vec<V>,
    suffix_edges: Vec<Edge<T>>,
}

/// The real vertices a route could legally arrive at, given the end
/// point's projection onto its nearest edge.
fn entry_candidates<P, V, T>(
    config: &EncoderConfig,
    profile: &P,
    closest: &ClosestEdge<V, T>,
) -> Vec<EndCandidate<V, T>>
where
    P: VehicleProfile<TagsId = T>,
    V: Copy,
    T: Copy + Eq + std::hash::Hash + std::fmt::Debug,
{
    let ClosestEdge { from, to, edge, offset } = *closest;
    let length = edge.distance;

    if offset <= config.epsilon {
        return vec![EndCandidate {
            entry_vertex: from,
            suffix_vertices: vec![from],
            suffix_edges: Vec::new(),
        }];
    }

    if length - offset <= config.epsilon {
        return vec![EndCandidate {
            entry_vertex: to,
            suffix_vertices: vec![to],
            suffix_edges: Vec::new(),
        }];
    }

    let mut candidates = Vec::with_capacity(2);

    if ReferencedLine::<V, T>::is_edge_traversable(profile, edge) {
        candidates.push(EndCandidate {
            entry_vertex: from,
            suffix_vertices: vec![from, to],
            suffix_edges: vec![edge],
        });
    }

    let reversed = edge.reverse();
    if ReferencedLine::<V, T>::is_edge_traversable(profile, reversed) {
        candidates.push(EndCandidate {
            entry_vertex: to,
            suffix_vertices: vec![to, from],
            suffix_edges: vec![reversed],
        });
    }

    candidates
}

fn stitch_via_shortest_path<G, P>(
    config: &EncoderConfig,
    graph: &G,
    profile: &P,
    start: &ClosestEdge<G::VertexId, G::TagsId>,
    end: &ClosestEdge<G::VertexId, G::TagsId>,
) -> Result<(Vec<G::VertexId>, Vec<Edge<G::TagsId>>), EncodeError<G::Error>>
where
    G: GraphAdapter,
    P: VehicleProfile<TagsId = G::TagsId>,
{
    let start_candidates = exit_candidates(config, profile, start);
    let end_candidates = entry_candidates(config, profile, end);

    if start_candidates.is_empty() || end_candidates.is_empty() {
        return Err(EncodeError::RouteNotFound);
    }

    let roots: Vec<_> = start_candidates.iter().map(|c| c.root.clone()).collect();
    let end_vertices: Vec<_> = end_candidates.iter().map(|c| c.entry_vertex).collect();

    let found = graph
        .shortest_path(&roots, &end_vertices, true)?
        .ok_or(EncodeError::RouteNotFound)?;

    let (mid_vertices, mid_edges) = found.flatten();

    let last_mid_vertex = mid_vertices.last().ok_or(EncodeError::RoutingMismatch)?;

    let start_match = start_candidates
        .iter()
        .find(|c| eq_vertex(&c.exit_vertex, &mid_vertices[0]))
        .ok_or(EncodeError::RoutingMismatch)?;
    let end_match = end_candidates
        .iter()
        .find(|c| eq_vertex(&c.entry_vertex, last_mid_vertex))
        .ok_or(EncodeError::RoutingMismatch)?;

    let mut vertices = start_match.prefix_vertices.clone();
    vertices.extend(mid_vertices.into_iter().skip(1));
    vertices.extend(end_match.suffix_vertices.iter().skip(1).copied());

    let mut edges = start_match.prefix_edges.clone();
    edges.extend(mid_edges);
    edges.extend(end_match.suffix_edges.iter().copied());

    Ok((vertices, edges))
}

fn eq_vertex<V: PartialEq>(a: &V, b: &V) -> bool {
    a == b
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::HashMap;

    use test_log::test;

    use super::*;
    use crate::model::{Frc, Fow};

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    struct TagsId(u32);

    #[derive(Debug, thiserror::Error)]
    #[error("fixture graph error")]
    struct FixtureError;

    struct FixtureGraph {
        coords: HashMap<u32, Coordinate>,
        edges: RefCell<HashMap<u32, Vec<(u32, Edge<TagsId>)>>>,
    }

    impl GraphAdapter for FixtureGraph {
        type VertexId = u32;
        type TagsId = TagsId;
        type Error = FixtureError;

        fn vertex_coord(&self, vertex: u32) -> Result<Coordinate, FixtureError> {
            self.coords.get(&vertex).copied().ok_or(FixtureError)
        }

        fn edge_shape(&self, _from: u32, _to: u32) -> Result<Vec<Coordinate>, FixtureError> {
            Ok(Vec::new())
        }

        fn outgoing_edges(&self, vertex: u32) -> Result<Vec<(u32, Edge<TagsId>)>, FixtureError> {
            Ok(self.edges.borrow().get(&vertex).cloned().unwrap_or_default())
        }

        fn is_vertex_valid(&self, _vertex: u32) -> Result<bool, FixtureError> {
            Ok(true)
        }

        fn closest_edge(
            &self,
            _coord: Coordinate,
            _tolerance: Option<Length>,
        ) -> Result<Option<ClosestEdge<u32, TagsId>>, FixtureError> {
            Ok(Some(ClosestEdge {
                from: 1,
                to: 2,
                edge: Edge::new(TagsId(1), true, Length::from_meters(100.0)),
                offset: Length::from_meters(50.0),
            }))
        }

        fn closest_edge_pair(
            &self,
            _start: Coordinate,
            _end: Coordinate,
            _tolerance: Length,
        ) -> Result<Option<ClosestEdge<u32, TagsId>>, FixtureError> {
            Ok(None)
        }

        fn shortest_path(
            &self,
            _starts: &[PathSegment<u32, TagsId>],
            _ends: &[u32],
            _oneway_aware: bool,
        ) -> Result<Option<PathSegment<u32, TagsId>>, FixtureError> {
            Ok(None)
        }

        fn find_valid_vertex_for(
            &self,
            _vertex: u32,
            _edge: Edge<TagsId>,
            _neighbor: u32,
            _exclude: &std::collections::HashSet<u32>,
            _forward: bool,
        ) -> Result<Option<PathSegment<u32, TagsId>>, FixtureError> {
            Ok(None)
        }
    }

    struct FixtureProfile;

    impl VehicleProfile for FixtureProfile {
        type TagsId = TagsId;

        fn is_oneway(&self, _tags: TagsId) -> Option<bool> {
            None
        }

        fn weight(&self, _tags: TagsId, meters: Length) -> Length {
            meters
        }

        fn classify(&self, _tags: TagsId) -> Option<(Frc, Fow)> {
            Some((Frc::Frc3, Fow::SingleCarriageway))
        }
    }

    fn fixture() -> FixtureGraph {
        let mut coords = HashMap::new();
        coords.insert(1, Coordinate::new(0.0, 0.0));
        coords.insert(2, Coordinate::new(0.0, 0.001));
        FixtureGraph { coords, edges: RefCell::new(HashMap::new()) }
    }

    #[test]
    fn point_along_line_anchors_onto_the_closest_edge() {
        let config = EncoderConfig::default();
        let graph = fixture();
        let profile = FixtureProfile;

        let point = build_point_along_line(&config, &graph, &profile, Coordinate::new(0.0, 0.0005)).unwrap();

        assert_eq!(point.route.vertices, vec![1, 2]);
        assert_eq!(point.route.edges.len(), 1);
    }

    #[test]
    fn point_along_line_reverses_an_edge_oneway_against_its_stored_direction() {
        let config = EncoderConfig::default();
        let graph = fixture();

        struct BackwardOnly;
        impl VehicleProfile for BackwardOnly {
            type TagsId = TagsId;

            fn is_oneway(&self, _tags: TagsId) -> Option<bool> {
                Some(false)
            }

            fn weight(&self, _tags: TagsId, meters: Length) -> Length {
                meters
            }

            fn classify(&self, _tags: TagsId) -> Option<(Frc, Fow)> {
                Some((Frc::Frc3, Fow::SingleCarriageway))
            }
        }

        // `fixture()`'s closest_edge always reports the stored direction
        // 1 -> 2 with `forward: true`; a backward-only profile can only
        // legally traverse it as 2 -> 1, so the builder must swap.
        let point =
            build_point_along_line(&config, &graph, &BackwardOnly, Coordinate::new(0.0, 0.0005)).unwrap();

        assert_eq!(point.route.vertices, vec![2, 1]);
        assert!(!point.route.edges[0].forward);
    }

    #[test]
    fn same_edge_reversed_collapses_without_a_shortest_path_call() {
        let profile = FixtureProfile;
        let edge = Edge::new(TagsId(1), true, Length::from_meters(100.0));

        let start = ClosestEdge { from: 1, to: 2, edge, offset: Length::from_meters(80.0) };
        let end = ClosestEdge { from: 1, to: 2, edge, offset: Length::from_meters(20.0) };

        let (vertices, edges) = try_same_edge(&profile, &start, &end).unwrap();

        assert_eq!(vertices, vec![2, 1]);
        assert!(!edges[0].forward);
    }
}
