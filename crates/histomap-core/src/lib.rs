//! # Histomap Core
//!
//! Feature model for historical map layers: validated MultiPolygon features
//! flattened into rings, the ring index table handed to the plotting guest,
//! and validation of untrusted GeoJSON feature collections.
//!
//! This crate is pure; fetching and guest interaction live elsewhere.

pub mod geometry;
pub mod feature;
pub mod ring_index;
pub mod validate;

pub use geometry::{BBox, Point};
pub use feature::{Ring, ValidatedFeature, ValidatedLayer};
pub use ring_index::RingIndexTable;
pub use validate::{validate, LayerParseError};
