use serde::{Deserialize, Serialize};

use crate::geometry::BBox;

/// One polygon boundary, flattened to `[x0, y0, x1, y1, ...]`.
pub type Ring = Vec<f64>;

/// A named feature whose MultiPolygon geometry has been flattened into rings.
///
/// Rings keep the order of the source document: every ring of the first
/// polygon, then every ring of the second, and so on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatedFeature {
    pub name: String,
    pub rings: Vec<Ring>,
}

impl ValidatedFeature {
    pub fn new(name: &str, rings: Vec<Ring>) -> Self {
        Self {
            name: name.to_string(),
            rings,
        }
    }

    pub fn ring_count(&self) -> usize {
        self.rings.len()
    }

    /// Total number of coordinate values (not pairs) across all rings.
    pub fn value_count(&self) -> usize {
        self.rings.iter().map(Vec::len).sum()
    }

    /// All ring values concatenated in ring order.
    pub fn flat_values(&self) -> impl Iterator<Item = f64> + '_ {
        self.rings.iter().flatten().copied()
    }

    pub fn bbox(&self) -> Option<BBox> {
        self.rings
            .iter()
            .filter_map(|r| BBox::from_flat(r))
            .reduce(|a, b| a.union(&b))
    }
}

/// A non-empty, ordered set of validated features.
///
/// An empty result never becomes a `ValidatedLayer`; the validator reports it
/// as "no data" instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatedLayer {
    features: Vec<ValidatedFeature>,
}

impl ValidatedLayer {
    /// Returns `None` when `features` is empty.
    pub fn new(features: Vec<ValidatedFeature>) -> Option<Self> {
        if features.is_empty() {
            None
        } else {
            Some(Self { features })
        }
    }

    pub fn features(&self) -> &[ValidatedFeature] {
        &self.features
    }

    pub fn feature_count(&self) -> usize {
        self.features.len()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.features.iter().map(|f| f.name.as_str())
    }

    pub fn bbox(&self) -> Option<BBox> {
        self.features
            .iter()
            .filter_map(ValidatedFeature::bbox)
            .reduce(|a, b| a.union(&b))
    }
}
