//! Turns a validated [`ReferencedLine`] / [`ReferencedPointAlongLine`] into
//! the OpenLR location types a framer would serialize: ordered location
//! reference points, offsets, and (for point-along-line) side of road.

use tracing::debug;

use crate::config::EncoderConfig;
use crate::error::EncodeError;
use crate::geometry;
use crate::graph::GraphAdapter;
use crate::location::{ReferencedLine, ReferencedPointAlongLine};
use crate::model::{
    Coordinate, Length, LineLocationPath, LocationReferencePoint, PointAlongLineLocation, SideOfRoad,
};
use crate::profile::VehicleProfile;
use crate::validator;

fn validate_and_expand<G, P>(
    config: &EncoderConfig,
    graph: &G,
    profile: &P,
    line: ReferencedLine<G::VertexId, G::TagsId>,
) -> Result<ReferencedLine<G::VertexId, G::TagsId>, EncodeError<G::Error>>
where
    G: GraphAdapter,
    P: VehicleProfile<TagsId = G::TagsId>,
{
    validator::validate_connected::<G, P>(profile, &line)?;
    validator::validate_offsets::<G>(&line)?;
    validator::validate_binary(graph, profile, &line)?;
    let line = validator::adjust_to_valid_points(config, graph, line)?;
    validator::adjust_to_valid_distances::<G>(config, line)
}

fn full_polyline<G: GraphAdapter>(
    graph: &G,
    line: &ReferencedLine<G::VertexId, G::TagsId>,
) -> Result<Vec<Coordinate>, G::Error> {
    let mut coords = vec![graph.vertex_coord(line.vertices[0])?];

    for pair in line.vertices.windows(2) {
        coords.extend(graph.edge_shape(pair[0], pair[1])?);
        coords.push(graph.vertex_coord(pair[1])?);
    }

    Ok(coords)
}

/// Re-expresses a percentage offset measured against the route's
/// topological length (the sum of `Edge::distance` over its edges) as a
/// percentage of the polyline actually walked to produce the LRP shapes.
/// The two lengths agree for a well-formed adapter, but only the polyline's
/// geometric length is what a decoder will reconstruct offsets against, so
/// that's what the encoded percentage must be relative to.
fn geometric_offset_pct(topological_pct: f64, topological_length: Length, geometric_length: Length) -> f32 {
    if geometric_length.meters() <= 0.0 {
        return 0.0;
    }

    let absolute = topological_pct / 100.0 * topological_length.meters();
    (absolute / geometric_length.meters() * 100.0).clamp(0.0, 99.0) as f32
}

fn first_edge_polyline<G: GraphAdapter>(
    graph: &G,
    line: &ReferencedLine<G::VertexId, G::TagsId>,
) -> Result<Vec<Coordinate>, G::Error> {
    let (v0, v1) = (line.vertices[0], line.vertices[1]);
    let mut coords = vec![graph.vertex_coord(v0)?];
    coords.extend(graph.edge_shape(v0, v1)?);
    coords.push(graph.vertex_coord(v1)?);
    Ok(coords)
}

fn last_edge_polyline_reversed<G: GraphAdapter>(
    graph: &G,
    line: &ReferencedLine<G::VertexId, G::TagsId>,
) -> Result<Vec<Coordinate>, G::Error> {
    let n = line.vertices.len();
    let (v_prev, v_last) = (line.vertices[n - 2], line.vertices[n - 1]);

    let mut shape = graph.edge_shape(v_prev, v_last)?;
    shape.reverse();

    let mut coords = vec![graph.vertex_coord(v_last)?];
    coords.extend(shape);
    coords.push(graph.vertex_coord(v_prev)?);
    Ok(coords)
}

fn first_lrp<G, P>(
    config: &EncoderConfig,
    graph: &G,
    profile: &P,
    line: &ReferencedLine<G::VertexId, G::TagsId>,
    polyline: &[Coordinate],
) -> Result<LocationReferencePoint, EncodeError<G::Error>>
where
    G: GraphAdapter,
    P: VehicleProfile<TagsId = G::TagsId>,
{
    let (frc, fow) = profile
        .classify(line.first_edge().tags_id)
        .ok_or(EncodeError::ClassificationFailed)?;

    let coordinate = graph.vertex_coord(line.first_vertex())?;
    let shape = first_edge_polyline(graph, line)?;
    let bearing = geometry::bearing_along(&shape, config.bearing_distance);
    let distance_to_next = geometry::polyline_length(polyline).round_meters();

    Ok(LocationReferencePoint {
        coordinate,
        bearing,
        frc,
        fow,
        lowest_frc_to_next: frc,
        distance_to_next: Some(distance_to_next),
    })
}

fn last_lrp<G, P>(
    config: &EncoderConfig,
    graph: &G,
    profile: &P,
    line: &ReferencedLine<G::VertexId, G::TagsId>,
) -> Result<LocationReferencePoint, EncodeError<G::Error>>
where
    G: GraphAdapter,
    P: VehicleProfile<TagsId = G::TagsId>,
{
    let (frc, fow) = profile
        .classify(line.last_edge().tags_id)
        .ok_or(EncodeError::ClassificationFailed)?;

    let coordinate = graph.vertex_coord(line.last_vertex())?;
    let shape = last_edge_polyline_reversed(graph, line)?;
    let bearing = geometry::bearing_along(&shape, config.bearing_distance);

    Ok(LocationReferencePoint {
        coordinate,
        bearing,
        frc,
        fow,
        lowest_frc_to_next: frc,
        distance_to_next: None,
    })
}

/// Encodes a plain line location: just the two endpoint LRPs and offsets.
///
/// The reference implementation this crate generalizes chains several
/// intermediate LRPs through a resolved route; this encoder instead relies
/// on [`crate::GraphAdapter::find_valid_vertex_for`] to land both endpoints
/// on valid nodes up front, so two LRPs bracketing the whole path always
/// suffice (see the R1 handling in [`crate::validator::expand_to_valid`]).
pub fn encode_line<G, P>(
    config: &EncoderConfig,
    graph: &G,
    profile: &P,
    line: ReferencedLine<G::VertexId, G::TagsId>,
) -> Result<LineLocationPath, EncodeError<G::Error>>
where
    G: GraphAdapter,
    P: VehicleProfile<TagsId = G::TagsId>,
{
    debug!(vertices = line.vertices.len(), "encoding line location");

    let line = validate_and_expand(config, graph, profile, line)?;
    let polyline = full_polyline(graph, &line)?;

    let first = first_lrp(config, graph, profile, &line, &polyline)?;
    let last = last_lrp(config, graph, profile, &line)?;

    let topological_length = line.path_length();
    let geometric_length = geometry::polyline_length(&polyline);

    Ok(LineLocationPath {
        points: vec![first, last],
        positive_offset_pct: geometric_offset_pct(line.positive_offset_pct, topological_length, geometric_length),
        negative_offset_pct: geometric_offset_pct(line.negative_offset_pct, topological_length, geometric_length),
    })
}

/// Encodes a point-along-line location: the bracketing line, plus the side
/// of road and along-line offset of the true point.
pub fn encode_point_along_line<G, P>(
    config: &EncoderConfig,
    graph: &G,
    profile: &P,
    point: ReferencedPointAlongLine<G::VertexId, G::TagsId>,
) -> Result<PointAlongLineLocation, EncodeError<G::Error>>
where
    G: GraphAdapter,
    P: VehicleProfile<TagsId = G::TagsId>,
{
    let query = point.coordinate();
    let orientation = point.orientation;

    debug!(?query, "encoding point-along-line location");

    let line = validate_and_expand(config, graph, profile, point.route)?;
    let polyline = full_polyline(graph, &line)?;

    let first = first_lrp(config, graph, profile, &line, &polyline)?;
    let last = last_lrp(config, graph, profile, &line)?;

    let projection =
        geometry::project_onto_polyline(&polyline, query).ok_or(EncodeError::ProjectionFailed)?;

    let positive_offset_pct =
        ((projection.offset.meters() / projection.total_length.meters()) * 100.0).clamp(0.0, 99.0) as f32;

    let side_of_road = if projection.distance_to_line <= config.epsilon {
        SideOfRoad::OnOrAbove
    } else if projection.left {
        SideOfRoad::Left
    } else {
        SideOfRoad::Right
    };

    Ok(PointAlongLineLocation {
        first,
        last,
        positive_offset_pct,
        orientation,
        side_of_road,
    })
}
