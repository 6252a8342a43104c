use serde::{Deserialize, Serialize};

use crate::viewport::{CanvasSize, ContextHandle};

/// One feature as the guest received it: rings split back out of the flat
/// point buffer using the ring index table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlottedFeature {
    pub context: ContextHandle,
    pub canvas: CanvasSize,
    /// Flat vertices per ring: [x0, y0, x1, y1, ...]
    pub rings: Vec<Vec<f32>>,
}

impl PlottedFeature {
    pub fn value_count(&self) -> usize {
        self.rings.iter().map(Vec::len).sum()
    }
}

/// A single point drawn through the legacy point-plotting entry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlottedPoint {
    pub context: ContextHandle,
    pub canvas: CanvasSize,
    pub x: f32,
    pub y: f32,
}

/// Everything drawn since the display list was last cleared.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DisplayList {
    pub features: Vec<PlottedFeature>,
    pub points: Vec<PlottedPoint>,
}

impl DisplayList {
    pub fn is_empty(&self) -> bool {
        self.features.is_empty() && self.points.is_empty()
    }
}
