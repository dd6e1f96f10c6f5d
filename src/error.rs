use thiserror::Error;

use crate::Length;

/// Every way an encode call can fail.
///
/// Generic over the injected [`crate::GraphAdapter::Error`] so that
/// unanticipated adapter failures propagate with their original cause intact
/// instead of being stringified away.
#[derive(Debug, Error)]
pub enum EncodeError<E: std::error::Error + 'static> {
    #[error("no network found near the given coordinate")]
    NoNetworkNearby,

    #[error("no network found within {tolerance} of the given coordinate")]
    TooFarFromNetwork { tolerance: Length },

    #[error("failed to project the coordinate onto the edge geometry")]
    ProjectionFailed,

    #[error("no route could be found between the requested endpoints")]
    RouteNotFound,

    #[error("functional road class / form of way could not be classified from edge tags")]
    ClassificationFailed,

    #[error("the referenced line is not a connected, traversable path")]
    DisconnectedRoute,

    #[error("offsets must be in [0, 100) and fit within the route length, got {positive_offset_pct}/{negative_offset_pct}")]
    InvalidOffsets {
        positive_offset_pct: f64,
        negative_offset_pct: f64,
    },

    #[error("consecutive location reference points are farther apart than 15000m")]
    DistanceTooLarge,

    #[error("the edge chosen by routing does not match the edge chosen by projection")]
    RoutingMismatch,

    #[error("encoding failed")]
    EncodingFailed(#[source] E),
}

impl<E: std::error::Error + 'static> From<E> for EncodeError<E> {
    fn from(error: E) -> Self {
        Self::EncodingFailed(error)
    }
}
