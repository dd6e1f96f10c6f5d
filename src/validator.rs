//! Checks and repairs a [`ReferencedLine`] has to pass before it can be
//! encoded: connectivity, offset sanity, binary classifiability, and the
//! OpenLR R1/R4 distance and node-validity rules.

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::config::EncoderConfig;
use crate::error::EncodeError;
use crate::graph::{GraphAdapter, PathSegment};
use crate::location::ReferencedLine;
use crate::model::{Edge, Length};
use crate::profile::VehicleProfile;

/// Every edge is legally traversable end to end, in the shape's stored
/// direction.
pub fn validate_connected<G, P>(
    profile: &P,
    line: &ReferencedLine<G::VertexId, G::TagsId>,
) -> Result<(), EncodeError<G::Error>>
where
    G: GraphAdapter,
    P: VehicleProfile<TagsId = G::TagsId>,
{
    if line.is_connected(profile) {
        Ok(())
    } else {
        Err(EncodeError::DisconnectedRoute)
    }
}

/// Positive/negative offsets are within `[0, 100)`, sum to less than the
/// route's full length.
pub fn validate_offsets<G>(
    line: &ReferencedLine<G::VertexId, G::TagsId>,
) -> Result<(), EncodeError<G::Error>>
where
    G: GraphAdapter,
{
    let length = line.path_length().meters();
    let consumed = (line.positive_offset_pct + line.negative_offset_pct) / 100.0 * length;

    if !line.has_valid_offsets() || consumed >= length {
        return Err(EncodeError::InvalidOffsets {
            positive_offset_pct: line.positive_offset_pct,
            negative_offset_pct: line.negative_offset_pct,
        });
    }

    Ok(())
}

/// The first and last edges can both be classified into FRC/FOW: OpenLR's
/// binary format has no way to represent an unclassifiable road.
pub fn validate_binary<G, P>(
    _graph: &G,
    profile: &P,
    line: &ReferencedLine<G::VertexId, G::TagsId>,
) -> Result<(), EncodeError<G::Error>>
where
    G: GraphAdapter,
    P: VehicleProfile<TagsId = G::TagsId>,
{
    if profile.classify(line.first_edge().tags_id).is_none()
        || profile.classify(line.last_edge().tags_id).is_none()
    {
        return Err(EncodeError::ClassificationFailed);
    }

    Ok(())
}

/// Resolves R4 by extending the route past any invalid endpoint, then
/// re-checks R1 over the (possibly now longer) path.
pub fn adjust_to_valid_points<G>(
    config: &EncoderConfig,
    graph: &G,
    line: ReferencedLine<G::VertexId, G::TagsId>,
) -> Result<ReferencedLine<G::VertexId, G::TagsId>, EncodeError<G::Error>>
where
    G: GraphAdapter,
{
    expand_to_valid(config, graph, line)
}

/// Re-checks R1 without attempting any further expansion; used once the
/// endpoints are already known to be valid.
pub fn adjust_to_valid_distances<G>(
    config: &EncoderConfig,
    line: ReferencedLine<G::VertexId, G::TagsId>,
) -> Result<ReferencedLine<G::VertexId, G::TagsId>, EncodeError<G::Error>>
where
    G: GraphAdapter,
{
    if line.path_length() > config.max_lrp_distance {
        return Err(EncodeError::DistanceTooLarge);
    }

    Ok(line)
}

/// Extends the route past either endpoint that isn't a valid OpenLR node
/// (R4), then rejects the result if it now exceeds the R1 distance ceiling.
///
/// Widening the search past a vertex that turns out not to work (if the
/// discovered vertex is itself invalid, or no route to it exists) is left
/// to the [`GraphAdapter`] implementation: `find_valid_vertex_for` is
/// expected to have already searched past excluded candidates internally,
/// so the core calls it once per end.
pub fn expand_to_valid<G>(
    config: &EncoderConfig,
    graph: &G,
    mut line: ReferencedLine<G::VertexId, G::TagsId>,
) -> Result<ReferencedLine<G::VertexId, G::TagsId>, EncodeError<G::Error>>
where
    G: GraphAdapter,
{
    if line.path_length() > config.max_lrp_distance {
        return Err(EncodeError::DistanceTooLarge);
    }

    if !graph.is_vertex_valid(line.first_vertex())? {
        debug!(vertex = ?line.first_vertex(), "head vertex is invalid, expanding");
        line = expand_head(graph, line)?;
    }

    if !graph.is_vertex_valid(line.last_vertex())? {
        debug!(vertex = ?line.last_vertex(), "tail vertex is invalid, expanding");
        line = expand_tail(graph, line)?;
    }

    if line.path_length() > config.max_lrp_distance {
        warn!(length = %line.path_length(), "expansion pushed the route past the R1 distance ceiling");
        return Err(EncodeError::DistanceTooLarge);
    }

    Ok(line)
}

/// Recomputes a percentage offset after `extra` meters of path have been
/// spliced onto one end of the route: the offset's absolute distance is
/// `old_pct` of `old_length`, plus `extra` if the splice moved the anchor
/// this offset is measured from, all re-expressed as a percentage of
/// `new_length`.
fn rescale_offset_pct(old_pct: f64, old_length: Length, extra: Length, new_length: Length) -> f64 {
    if new_length.meters() <= 0.0 {
        return 0.0;
    }

    let absolute = old_pct / 100.0 * old_length.meters() + extra.meters();
    (absolute / new_length.meters() * 100.0).clamp(0.0, 99.0)
}

/// Confirms an expansion candidate actually widens the route through the
/// vertex it was looking to fix, rather than finding a valid vertex some
/// other way that bypasses it: the shortest path from `neighbor` to
/// `candidate` (ignoring oneway restrictions, since the candidate search
/// already accounted for those) must still pass through `original`.
fn widens_through<G: GraphAdapter>(
    graph: &G,
    neighbor: G::VertexId,
    candidate: G::VertexId,
    original: G::VertexId,
) -> Result<bool, G::Error> {
    let roots = [PathSegment::root(neighbor, Length::ZERO)];
    let path = graph.shortest_path(&roots, &[candidate], false)?;
    Ok(path.is_some_and(|segment| segment.flatten().0.contains(&original)))
}

fn expand_head<G: GraphAdapter>(
    graph: &G,
    line: ReferencedLine<G::VertexId, G::TagsId>,
) -> Result<ReferencedLine<G::VertexId, G::TagsId>, EncodeError<G::Error>> {
    let vertex = line.first_vertex();
    let edge = line.first_edge();
    let neighbor = line.vertices[1];
    let old_length = line.path_length();

    let mut exclude = HashSet::default();
    let found = loop {
        let candidate = graph
            .find_valid_vertex_for(vertex, edge, neighbor, &exclude, false)?
            .ok_or(EncodeError::RouteNotFound)?;

        if widens_through(graph, neighbor, candidate.vertex, vertex)? {
            break candidate;
        }

        debug!(vertex = ?candidate.vertex, "expansion candidate bypasses the original endpoint, excluding and retrying");
        exclude.insert(candidate.vertex);
    };

    let (mut path_vertices, path_edges) = found.flatten();
    path_vertices.reverse();
    let mut path_edges: Vec<_> = path_edges.into_iter().rev().map(Edge::reverse).collect();
    path_vertices.pop(); // drop the duplicate `vertex`, now last after reversing

    // The prepended prefix pushes the route's start back, so the true
    // start point (measured by `positive_offset_pct`) is now `prefix_length`
    // farther from the (new) first vertex than it used to be.
    let prefix_length: Length = path_edges.iter().map(|edge| edge.distance).sum();
    let new_length = old_length + prefix_length;

    let ReferencedLine {
        vertices,
        edges,
        edge_shapes,
        positive_offset_pct,
        negative_offset_pct,
    } = line;

    path_vertices.extend(vertices);
    path_edges.extend(edges);

    Ok(ReferencedLine {
        vertices: path_vertices,
        edges: path_edges,
        edge_shapes,
        positive_offset_pct: rescale_offset_pct(positive_offset_pct, old_length, prefix_length, new_length),
        negative_offset_pct: rescale_offset_pct(negative_offset_pct, old_length, Length::ZERO, new_length),
    })
}

fn expand_tail<G: GraphAdapter>(
    graph: &G,
    line: ReferencedLine<G::VertexId, G::TagsId>,
) -> Result<ReferencedLine<G::VertexId, G::TagsId>, EncodeError<G::Error>> {
    let vertex = line.last_vertex();
    let edge = line.last_edge().reverse();
    let neighbor = line.vertices[line.vertices.len() - 2];
    let old_length = line.path_length();

    let mut exclude = HashSet::default();
    let found = loop {
        let candidate = graph
            .find_valid_vertex_for(vertex, edge, neighbor, &exclude, true)?
            .ok_or(EncodeError::RouteNotFound)?;

        if widens_through(graph, neighbor, candidate.vertex, vertex)? {
            break candidate;
        }

        debug!(vertex = ?candidate.vertex, "expansion candidate bypasses the original endpoint, excluding and retrying");
        exclude.insert(candidate.vertex);
    };

    let (mut path_vertices, path_edges) = found.flatten();
    path_vertices.remove(0); // drop the duplicate `vertex`, still first

    // The appended suffix pushes the route's end forward, so the true end
    // point (measured by `negative_offset_pct`) is now `suffix_length`
    // farther from the (new) last vertex than it used to be.
    let suffix_length: Length = path_edges.iter().map(|edge| edge.distance).sum();
    let new_length = old_length + suffix_length;

    let ReferencedLine {
        mut vertices,
        mut edges,
        edge_shapes,
        positive_offset_pct,
        negative_offset_pct,
    } = line;

    vertices.extend(path_vertices);
    edges.extend(path_edges);

    Ok(ReferencedLine {
        vertices,
        edges,
        edge_shapes,
        positive_offset_pct: rescale_offset_pct(positive_offset_pct, old_length, Length::ZERO, new_length),
        negative_offset_pct: rescale_offset_pct(negative_offset_pct, old_length, suffix_length, new_length),
    })
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use test_log::test;

    use super::*;
    use crate::graph::ClosestEdge;
    use crate::model::Coordinate;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    struct TagsId(u32);

    #[derive(Debug, thiserror::Error)]
    #[error("fixture graph error")]
    struct FixtureError;

    /// `neighbor(1) -- invalid(10) -- widens_to(11)`, plus a decoy
    /// `neighbor(1) -- bypass(12)` that reaches a valid vertex without
    /// passing through `10` at all. `find_valid_vertex_for` offers the
    /// decoy first; only once it's excluded does it offer the vertex that
    /// actually widens the route through `10`.
    struct BypassGraph;

    fn fixture_edge() -> Edge<TagsId> {
        Edge::new(TagsId(0), true, Length::from_meters(10.0))
    }

    impl GraphAdapter for BypassGraph {
        type VertexId = u32;
        type TagsId = TagsId;
        type Error = FixtureError;

        fn vertex_coord(&self, vertex: u32) -> Result<Coordinate, FixtureError> {
            Ok(Coordinate::new(0.0, vertex as f64 * 0.001))
        }

        fn edge_shape(&self, _from: u32, _to: u32) -> Result<Vec<Coordinate>, FixtureError> {
            Ok(Vec::new())
        }

        fn outgoing_edges(&self, vertex: u32) -> Result<Vec<(u32, Edge<TagsId>)>, FixtureError> {
            Ok(match vertex {
                1 => vec![(10, fixture_edge()), (12, fixture_edge())],
                10 => vec![(1, fixture_edge().reverse()), (11, fixture_edge())],
                11 => vec![(10, fixture_edge().reverse())],
                12 => vec![(1, fixture_edge().reverse())],
                _ => Vec::new(),
            })
        }

        fn is_vertex_valid(&self, vertex: u32) -> Result<bool, FixtureError> {
            Ok(vertex != 10)
        }

        fn closest_edge(
            &self,
            _coord: Coordinate,
            _tolerance: Option<Length>,
        ) -> Result<Option<ClosestEdge<u32, TagsId>>, FixtureError> {
            Ok(None)
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
            starts: &[PathSegment<u32, TagsId>],
            ends: &[u32],
            _oneway_aware: bool,
        ) -> Result<Option<PathSegment<u32, TagsId>>, FixtureError> {
            let targets: HashSet<u32> = ends.iter().copied().collect();
            Ok(crate::graph::dijkstra::shortest_path(starts, &targets, |v| {
                self.outgoing_edges(v)
                    .unwrap_or_default()
                    .into_iter()
                    .map(|(to, edge)| (to, edge, edge.distance))
                    .collect()
            }))
        }

        fn find_valid_vertex_for(
            &self,
            vertex: u32,
            _edge: Edge<TagsId>,
            _neighbor: u32,
            exclude: &HashSet<u32>,
            _forward: bool,
        ) -> Result<Option<PathSegment<u32, TagsId>>, FixtureError> {
            let candidate = if exclude.contains(&12) { 11 } else { 12 };
            let root = PathSegment::root(vertex, Length::ZERO);
            Ok(Some(PathSegment {
                vertex: candidate,
                consumed: Length::ZERO,
                cost: fixture_edge().distance,
                edge: Some(fixture_edge()),
                predecessor: Some(Rc::new(root)),
            }))
        }
    }

    #[test]
    fn expand_head_retries_past_a_candidate_that_bypasses_the_invalid_vertex() {
        let config = EncoderConfig::default();
        let graph = BypassGraph;

        let line = ReferencedLine::new(vec![10, 1], vec![fixture_edge()]);
        let expanded = expand_to_valid(&config, &graph, line).unwrap();

        assert_eq!(expanded.vertices, vec![11, 10, 1]);
    }
}
