//! The vehicle-specific rules a road network is interpreted under.
//!
//! Tag interpretation (what counts as oneway, how FRC/FOW is derived from
//! whatever tagging scheme the caller's map uses, what a traversal "costs")
//! is deliberately left to the caller; the core only ever calls through
//! this trait.

use std::fmt::Debug;
use std::hash::Hash;

use crate::model::{Frc, Fow, Length};

/// Interprets a tag handle ([`crate::GraphAdapter::TagsId`]) for routing and
/// classification purposes.
pub trait VehicleProfile {
    type TagsId: Copy + Eq + Hash + Debug;

    /// `None` means bidirectional; `Some(true)` means traversable only in
    /// the edge's stored (`forward`) direction; `Some(false)` means
    /// traversable only against it.
    fn is_oneway(&self, tags: Self::TagsId) -> Option<bool>;

    /// The routing cost of traversing `meters` of an edge carrying `tags`.
    /// Usually just `meters` itself, but profiles may penalize by road
    /// class, surface, or other tag-derived weighting.
    fn weight(&self, tags: Self::TagsId, meters: Length) -> Length;

    /// Functional Road Class and Form of Way for `tags`, or `None` if they
    /// cannot be classified from the available tags.
    fn classify(&self, tags: Self::TagsId) -> Option<(Frc, Fow)>;
}
