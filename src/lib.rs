#![doc = include_str!("../README.md")]

mod builder;
mod codec;
mod config;
mod error;
mod geometry;
mod graph;
mod location;
mod lrp;
mod model;
mod profile;
mod validator;

pub use builder::{build_line_location, build_line_location_from_parts, build_point_along_line};
pub use codec::CoordCodec;
pub use config::EncoderConfig;
pub use error::EncodeError;
pub use graph::dijkstra;
pub use graph::{ClosestEdge, GraphAdapter, PathSegment};
pub use location::{ReferencedLine, ReferencedPointAlongLine};
pub use lrp::{encode_line, encode_point_along_line};
pub use model::{
    Bearing, Coordinate, Edge, Fow, Frc, Length, LineLocationPath, LocationReferencePoint,
    Orientation, PointAlongLineLocation, SideOfRoad,
};
pub use profile::VehicleProfile;
