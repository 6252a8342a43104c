use serde::{Deserialize, Serialize};

/// A 2D point in source coordinates (longitude, latitude for world layers).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// An axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub min: Point,
    pub max: Point,
}

impl BBox {
    pub fn new(min: Point, max: Point) -> Self {
        Self { min, max }
    }

    /// Bounding box of an interleaved `[x0, y0, x1, y1, ...]` sequence.
    /// A trailing unpaired value is ignored.
    pub fn from_flat(values: &[f64]) -> Option<Self> {
        let mut pairs = values.chunks_exact(2);
        let first = pairs.next()?;
        let mut bbox = Self::new(
            Point::new(first[0], first[1]),
            Point::new(first[0], first[1]),
        );
        for pair in pairs {
            bbox.extend(Point::new(pair[0], pair[1]));
        }
        Some(bbox)
    }

    pub fn extend(&mut self, p: Point) {
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    pub fn center(&self) -> Point {
        Point::new(
            (self.min.x + self.max.x) / 2.0,
            (self.min.y + self.max.y) / 2.0,
        )
    }

    pub fn union(&self, other: &BBox) -> Self {
        Self {
            min: Point::new(self.min.x.min(other.min.x), self.min.y.min(other.min.y)),
            max: Point::new(self.max.x.max(other.max.x), self.max.y.max(other.max.y)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bbox_from_flat() {
        let bb = BBox::from_flat(&[10.0, -5.0, -20.0, 40.0, 0.0, 0.0]).unwrap();
        assert_eq!(bb.min, Point::new(-20.0, -5.0));
        assert_eq!(bb.max, Point::new(10.0, 40.0));
        assert!((bb.width() - 30.0).abs() < 1e-10);
        assert!((bb.height() - 45.0).abs() < 1e-10);
        assert_eq!(bb.center(), Point::new(-5.0, 17.5));
    }

    #[test]
    fn test_bbox_from_flat_empty() {
        assert!(BBox::from_flat(&[]).is_none());
        assert!(BBox::from_flat(&[1.0]).is_none());
    }

    #[test]
    fn test_bbox_union() {
        let a = BBox::new(Point::new(0.0, 0.0), Point::new(10.0, 10.0));
        let b = BBox::new(Point::new(5.0, -5.0), Point::new(15.0, 5.0));
        let u = a.union(&b);
        assert_eq!(u.min, Point::new(0.0, -5.0));
        assert_eq!(u.max, Point::new(15.0, 10.0));
    }
}
