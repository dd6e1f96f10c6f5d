//! Tunables threaded through every encode entry point.

use crate::model::Length;

/// Knobs the OpenLR spec leaves implementation-defined.
///
/// `max_lrp_distance` defaults to the 15km ceiling OpenLR itself imposes on
/// the distance between two consecutive location reference points (rule
/// R1); unlike a routing-friendly default this one isn't meant to be
/// tightened for "nicer" references, only loosened if a caller's wire format
/// allows longer hops.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncoderConfig {
    /// Maximum distance, in meters, between two consecutive LRPs (R1).
    pub max_lrp_distance: Length,
    /// Distance walked along an LRP's shape before sampling its bearing.
    pub bearing_distance: Length,
    /// Below this distance from a vertex, a projection is treated as
    /// landing exactly on that vertex rather than mid-edge.
    pub epsilon: Length,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            max_lrp_distance: Length::from_meters(15_000.0),
            bearing_distance: Length::from_meters(20.0),
            epsilon: Length::from_meters(1.0),
        }
    }
}
