// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page geometry: points, affine matrices, path segments, and axis-aligned
// bounding boxes. All coordinates are PDF user space in points (origin at the
// bottom-left, y pointing up).

use serde::{Deserialize, Serialize};

/// A point in page space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Affine transformation matrix `[a b c d e f]` as used by the PDF `cm` and
/// `Tm` operators.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Matrix {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Default for Matrix {
    fn default() -> Self {
        Self::identity()
    }
}

impl Matrix {
    pub fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self { a, b, c, d, e, f }
    }

    pub fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, 0.0, 0.0)
    }

    pub fn translation(tx: f64, ty: f64) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    /// `self` applied first, then `other` (PDF's `M' = M × CTM` convention).
    pub fn then(&self, other: &Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    pub fn apply(&self, p: Point) -> Point {
        Point {
            x: self.a * p.x + self.c * p.y + self.e,
            y: self.b * p.x + self.d * p.y + self.f,
        }
    }

    /// Length of the transformed unit y-vector; the effective font size
    /// multiplier for text drawn through this matrix.
    pub fn vertical_scale(&self) -> f64 {
        (self.c * self.c + self.d * self.d).sqrt()
    }

    pub fn horizontal_scale(&self) -> f64 {
        (self.a * self.a + self.b * self.b).sqrt()
    }

    /// True when the matrix only scales and translates (possibly mirroring).
    pub fn is_axis_aligned(&self) -> bool {
        const EPS: f64 = 1e-6;
        self.b.abs() < EPS && self.c.abs() < EPS
    }

    /// Axis-aligned box covering the transformed unit square, which is the
    /// placement rectangle of an image XObject.
    pub fn unit_square_bbox(&self) -> BoundingBox {
        BoundingBox::from_points(&[
            self.apply(Point::new(0.0, 0.0)),
            self.apply(Point::new(1.0, 0.0)),
            self.apply(Point::new(0.0, 1.0)),
            self.apply(Point::new(1.0, 1.0)),
        ])
        .unwrap_or_default()
    }
}

/// Axis-aligned bounding box. `x0 <= x1` and `y0 <= y1` always hold for boxes
/// built through the constructors.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl BoundingBox {
    /// Build a box from two opposite corners given in any order.
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self {
            x0: x0.min(x1),
            y0: y0.min(y1),
            x1: x0.max(x1),
            y1: y0.max(y1),
        }
    }

    pub fn from_points(points: &[Point]) -> Option<Self> {
        let first = points.first()?;
        let mut bbox = Self::new(first.x, first.y, first.x, first.y);
        for p in &points[1..] {
            bbox.x0 = bbox.x0.min(p.x);
            bbox.y0 = bbox.y0.min(p.y);
            bbox.x1 = bbox.x1.max(p.x);
            bbox.y1 = bbox.y1.max(p.y);
        }
        Some(bbox)
    }

    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }

    pub fn area(&self) -> f64 {
        self.width().max(0.0) * self.height().max(0.0)
    }

    pub fn intersection(&self, other: &BoundingBox) -> Option<BoundingBox> {
        let x0 = self.x0.max(other.x0);
        let y0 = self.y0.max(other.y0);
        let x1 = self.x1.min(other.x1);
        let y1 = self.y1.min(other.y1);
        if x0 < x1 && y0 < y1 {
            Some(BoundingBox { x0, y0, x1, y1 })
        } else {
            None
        }
    }

    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.intersection(other).is_some()
    }

    /// Intersection area divided by the area of the smaller of the two boxes.
    /// Degenerate (zero-area) boxes never overlap.
    pub fn overlap_fraction(&self, other: &BoundingBox) -> f64 {
        let smaller = self.area().min(other.area());
        if smaller <= 0.0 {
            return 0.0;
        }
        self.intersection(other)
            .map(|i| i.area() / smaller)
            .unwrap_or(0.0)
    }

    /// Whether two boxes describe the same rectangle within `tolerance` points
    /// on every edge.
    pub fn approx_eq(&self, other: &BoundingBox, tolerance: f64) -> bool {
        (self.x0 - other.x0).abs() <= tolerance
            && (self.y0 - other.y0).abs() <= tolerance
            && (self.x1 - other.x1).abs() <= tolerance
            && (self.y1 - other.y1).abs() <= tolerance
    }
}

/// One segment of a path outline, already in page space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PathSegment {
    MoveTo(Point),
    LineTo(Point),
    CurveTo { c1: Point, c2: Point, to: Point },
    Close,
}

impl PathSegment {
    /// Points that bound this segment. Bezier control points are included,
    /// which over-approximates curves but never under-approximates them.
    pub fn points(&self) -> Vec<Point> {
        match self {
            Self::MoveTo(p) | Self::LineTo(p) => vec![*p],
            Self::CurveTo { c1, c2, to } => vec![*c1, *c2, *to],
            Self::Close => Vec::new(),
        }
    }
}

/// Bounding box of a segment list, or `None` for an empty outline.
pub fn segments_bbox(segments: &[PathSegment]) -> Option<BoundingBox> {
    let points: Vec<Point> = segments.iter().flat_map(|s| s.points()).collect();
    BoundingBox::from_points(&points)
}

/// Closed axis-aligned rectangle outline, as produced by the `re` operator.
pub fn rectangle(bbox: BoundingBox) -> Vec<PathSegment> {
    vec![
        PathSegment::MoveTo(Point::new(bbox.x0, bbox.y0)),
        PathSegment::LineTo(Point::new(bbox.x1, bbox.y0)),
        PathSegment::LineTo(Point::new(bbox.x1, bbox.y1)),
        PathSegment::LineTo(Point::new(bbox.x0, bbox.y1)),
        PathSegment::Close,
    ]
}
