//! GeoJSON feature layer validation.
//!
//! Turns an untrusted, already-decoded JSON document into a
//! [`ValidatedLayer`]. Two kinds of problems are handled differently:
//!
//! - Structural violations of the top-level `FeatureCollection` (missing or
//!   wrong `type`, missing `features`) reject the whole layer with a
//!   [`LayerParseError`].
//! - Problems inside a single feature entry only exclude that entry. The
//!   remaining entries are still returned.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::feature::{Ring, ValidatedFeature, ValidatedLayer};

const COLLECTION_TAG: &str = "FeatureCollection";
const GEOMETRY_TAG: &str = "MultiPolygon";
const NAME_KEY: &str = "NAME";

// ── Errors ────────────────────────────────────────────────────────────

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LayerParseError {
    #[error("layer has no \"type\" member")]
    MissingType,

    #[error("layer type is {0}, expected \"FeatureCollection\"")]
    UnexpectedType(String),

    #[error("layer has no \"features\" member")]
    MissingFeatures,

    #[error("layer \"features\" member is not an array")]
    FeaturesNotArray,
}

/// Why a single feature entry was left out of the layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SkipReason {
    NotAnObject,
    MissingProperties,
    MissingName,
    MissingGeometry,
    NotMultiPolygon,
    EmptyCoordinates,
    MalformedCoordinates,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let msg = match self {
            SkipReason::NotAnObject => "entry is not an object",
            SkipReason::MissingProperties => "no properties",
            SkipReason::MissingName => "properties.NAME is absent or not a string",
            SkipReason::MissingGeometry => "no geometry",
            SkipReason::NotMultiPolygon => "geometry is not a MultiPolygon",
            SkipReason::EmptyCoordinates => "geometry has no coordinates",
            SkipReason::MalformedCoordinates => "coordinates are not polygon/ring/point arrays",
        };
        f.write_str(msg)
    }
}

// ── Validation ────────────────────────────────────────────────────────

/// Validate a raw feature layer.
///
/// Returns `Ok(None)` when the collection is well formed but no entry
/// survives (or there were no entries to begin with).
pub fn validate(raw: &Value) -> Result<Option<ValidatedLayer>, LayerParseError> {
    let entries = collection_entries(raw)?;

    let features: Vec<ValidatedFeature> = entries
        .iter()
        .enumerate()
        .filter_map(|(idx, entry)| match extract_feature(entry) {
            Ok(feature) => Some(feature),
            Err(reason) => {
                log::debug!("Skipping feature #{}: {}", idx, reason);
                None
            }
        })
        .collect();

    if features.is_empty() && !entries.is_empty() {
        log::warn!("All {} features were skipped", entries.len());
    }

    Ok(ValidatedLayer::new(features))
}

fn collection_entries(raw: &Value) -> Result<&[Value], LayerParseError> {
    match raw.get("type") {
        None => return Err(LayerParseError::MissingType),
        Some(Value::String(tag)) if tag == COLLECTION_TAG => {}
        Some(other) => return Err(LayerParseError::UnexpectedType(other.to_string())),
    }

    match raw.get("features") {
        None => Err(LayerParseError::MissingFeatures),
        Some(Value::Array(entries)) => Ok(entries),
        Some(_) => Err(LayerParseError::FeaturesNotArray),
    }
}

fn extract_feature(entry: &Value) -> Result<ValidatedFeature, SkipReason> {
    let entry = entry.as_object().ok_or(SkipReason::NotAnObject)?;

    let name = object_member(entry, "properties")
        .ok_or(SkipReason::MissingProperties)?
        .get(NAME_KEY)
        .and_then(Value::as_str)
        .ok_or(SkipReason::MissingName)?;

    let geometry = object_member(entry, "geometry").ok_or(SkipReason::MissingGeometry)?;

    if geometry.get("type").and_then(Value::as_str) != Some(GEOMETRY_TAG) {
        return Err(SkipReason::NotMultiPolygon);
    }

    let polygons = match geometry.get("coordinates") {
        Some(Value::Array(polygons)) if !polygons.is_empty() => polygons,
        Some(Value::Array(_)) | None | Some(Value::Null) => {
            return Err(SkipReason::EmptyCoordinates)
        }
        Some(_) => return Err(SkipReason::MalformedCoordinates),
    };

    let rings = flatten_polygons(polygons).ok_or(SkipReason::MalformedCoordinates)?;

    Ok(ValidatedFeature::new(name, rings))
}

fn object_member<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a Map<String, Value>> {
    obj.get(key).and_then(Value::as_object)
}

/// Flatten `[polygon [ring [point [x, y, ..]]]]` into one value sequence per
/// ring, keeping polygon order and ring order.
fn flatten_polygons(polygons: &[Value]) -> Option<Vec<Ring>> {
    let mut rings = Vec::new();
    for polygon in polygons {
        for ring in polygon.as_array()? {
            rings.push(flatten_ring(ring.as_array()?)?);
        }
    }
    Some(rings)
}

fn flatten_ring(points: &[Value]) -> Option<Ring> {
    let mut ring = Vec::with_capacity(points.len() * 2);
    for point in points {
        // Positions may carry altitude; only x and y are kept.
        match point.as_array()?.as_slice() {
            [x, y, ..] => {
                ring.push(x.as_f64()?);
                ring.push(y.as_f64()?);
            }
            _ => return None,
        }
    }
    Some(ring)
}
