use std::fmt;
use std::hash::Hash;

use strum::Display;

/// A point on the earth's surface, in signed decimal degrees.
///
/// OpenLR coordinates are transmitted as signed fixed-point integers on a
/// 360 deg / 2^24 grid; this type holds the decoded (or not-yet-encoded)
/// floating-point value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    pub lon: f64,
    pub lat: f64,
}

impl Coordinate {
    pub const fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }
}

impl approx::AbsDiffEq for Coordinate {
    type Epsilon = f64;

    fn default_epsilon() -> Self::Epsilon {
        f64::default_epsilon()
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: Self::Epsilon) -> bool {
        f64::abs_diff_eq(&self.lon, &other.lon, epsilon)
            && f64::abs_diff_eq(&self.lat, &other.lat, epsilon)
    }
}

/// A length in meters.
///
/// Backed by `f64` rather than an integer: sub-meter precision matters while
/// accumulating shortest-path costs, and only the final DNP is rounded to
/// whole meters on the wire.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Length(f64);

impl Length {
    pub const ZERO: Self = Self(0.0);
    pub const MAX: Self = Self(f64::MAX);

    pub const fn from_meters(meters: f64) -> Self {
        Self(meters)
    }

    pub const fn meters(self) -> f64 {
        self.0
    }

    /// Rounds to the nearest whole meter, as required by the wire format.
    pub fn round_meters(self) -> u32 {
        self.0.round().clamp(0.0, u32::MAX as f64) as u32
    }
}

impl std::ops::Add for Length {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl std::ops::Sub for Length {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl std::ops::AddAssign for Length {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl std::iter::Sum for Length {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, |a, b| a + b)
    }
}

impl std::ops::Mul<f64> for Length {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self {
        Self(self.0 * rhs)
    }
}

impl fmt::Display for Length {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}m", self.0)
    }
}

/// A compass bearing in whole degrees, `[0, 360)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Bearing(u16);

impl Bearing {
    /// Wraps `degrees` into `[0, 360)`.
    pub fn from_degrees(degrees: f64) -> Self {
        let wrapped = degrees.rem_euclid(360.0).round() as i32;
        Self(wrapped.rem_euclid(360) as u16)
    }

    pub const fn degrees(self) -> u16 {
        self.0
    }
}

/// Functional Road Class, `0` (most important) to `7` (least important).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Display)]
pub enum Frc {
    Frc0,
    Frc1,
    Frc2,
    Frc3,
    Frc4,
    Frc5,
    Frc6,
    Frc7,
}

impl Frc {
    pub const fn from_u8(value: u8) -> Option<Self> {
        Some(match value {
            0 => Self::Frc0,
            1 => Self::Frc1,
            2 => Self::Frc2,
            3 => Self::Frc3,
            4 => Self::Frc4,
            5 => Self::Frc5,
            6 => Self::Frc6,
            7 => Self::Frc7,
            _ => return None,
        })
    }

    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Form of Way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Fow {
    Undefined,
    Motorway,
    MultipleCarriageway,
    SingleCarriageway,
    Roundabout,
    TrafficSquare,
    SlipRoad,
    Other,
}

/// Which side of a directed line a referenced point lies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum SideOfRoad {
    OnOrAbove,
    Right,
    Left,
}

/// How a referenced point's line relates to the direction of digitization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Orientation {
    NoOrientation,
    FirstToSecond,
    SecondToFirst,
    Both,
}

/// An opaque directed edge value: a handle into the caller's tag index plus
/// the bookkeeping the core needs to splice edges into paths.
///
/// `forward` records which of the edge's two traversal directions this value
/// represents; `reverse()` flips it, and `a == b.reverse()` is how the
/// encoder recognizes "the same edge, walked the other way" without the
/// graph adapter exposing a concrete edge type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Edge<TagsId> {
    pub tags_id: TagsId,
    pub forward: bool,
    pub distance: Length,
}

impl<TagsId: Copy> Edge<TagsId> {
    pub const fn new(tags_id: TagsId, forward: bool, distance: Length) -> Self {
        Self {
            tags_id,
            forward,
            distance,
        }
    }

    pub const fn reverse(self) -> Self {
        Self {
            tags_id: self.tags_id,
            forward: !self.forward,
            distance: self.distance,
        }
    }
}

/// A single anchor in the OpenLR location reference path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationReferencePoint {
    pub coordinate: Coordinate,
    pub bearing: Bearing,
    pub frc: Frc,
    pub fow: Fow,
    pub lowest_frc_to_next: Frc,
    /// Distance, in meters, to the next LRP. `None` on the last LRP.
    pub distance_to_next: Option<u32>,
}

/// A point projected onto a line location: the encoded OpenLR
/// "point along line" location type.
#[derive(Debug, Clone, PartialEq)]
pub struct PointAlongLineLocation {
    pub first: LocationReferencePoint,
    pub last: LocationReferencePoint,
    pub positive_offset_pct: f32,
    pub orientation: Orientation,
    pub side_of_road: SideOfRoad,
}

/// A plain OpenLR line location: just the ordered LRPs and offsets.
#[derive(Debug, Clone, PartialEq)]
pub struct LineLocationPath {
    pub points: Vec<LocationReferencePoint>,
    pub positive_offset_pct: f32,
    pub negative_offset_pct: f32,
}
