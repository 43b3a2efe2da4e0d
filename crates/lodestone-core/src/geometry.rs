//! Geometric primitives for force layout.
//!
//! This module provides the value types the simulation and the spatial
//! index share for positions, viewport dimensions and square regions.
//!
//! # Overview
//!
//! - [`Point`] - A 2D coordinate (also used as a displacement vector)
//! - [`Size`] - Width and height of the layout viewport
//! - [`Extent`] - A square, axis-aligned region split into four quadrants
//!
//! # Coordinate System
//!
//! Lodestone uses screen coordinates, matching the renderers that consume
//! node positions:
//!
//! ```text
//!   (0,0) ────────► +X
//!     │
//!     │
//!     ▼
//!    +Y
//! ```
//!
//! Quadrant indices follow the same orientation: bit 0 is set for the right
//! half and bit 1 for the lower half.

use serde::Deserialize;

/// A 2D point in layout space.
///
/// Coordinates are `f64`; the simulation accumulates many small
/// displacements per tick and relies on the extra precision to converge.
///
/// # Examples
///
/// ```
/// # use lodestone_core::geometry::Point;
/// let p1 = Point::new(10.0, 20.0);
/// let p2 = Point::new(5.0, 5.0);
///
/// let sum = p1.add_point(p2);
/// assert_eq!(sum.x(), 15.0);
/// assert_eq!(sum.y(), 25.0);
///
/// assert_eq!(Point::new(3.0, 4.0).hypot(), 5.0);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct Point {
    x: f64,
    y: f64,
}

impl Point {
    /// Creates a new point with the specified coordinates
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Returns the x-coordinate of the point
    pub fn x(self) -> f64 {
        self.x
    }

    /// Returns the y-coordinate of the point
    pub fn y(self) -> f64 {
        self.y
    }

    /// Creates a new point with the specified x-coordinate
    pub fn with_x(mut self, x: f64) -> Self {
        self.x = x;
        self
    }

    /// Creates a new point with the specified y-coordinate
    pub fn with_y(mut self, y: f64) -> Self {
        self.y = y;
        self
    }

    /// Checks if both x and y coordinates are zero
    pub fn is_zero(self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }

    /// Returns true when both coordinates are finite (neither NaN nor infinite)
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Adds another point to this point, returning a new point
    pub fn add_point(self, other: Point) -> Self {
        Self {
            x: self.x + other.x,
            y: self.y + other.y,
        }
    }

    /// Subtracts another point from this point, returning a new point
    pub fn sub_point(self, other: Point) -> Self {
        Self {
            x: self.x - other.x,
            y: self.y - other.y,
        }
    }

    /// Calculates the midpoint between this point and another point
    pub fn midpoint(self, other: Point) -> Self {
        Self {
            x: (self.x + other.x) / 2.0,
            y: (self.y + other.y) / 2.0,
        }
    }

    /// Multiplies both coordinates by the given factor
    pub fn scale(self, factor: f64) -> Self {
        Self {
            x: self.x * factor,
            y: self.y * factor,
        }
    }

    /// Calculates the hypotenuse (Euclidean length from origin)
    pub fn hypot(self) -> f64 {
        self.x.hypot(self.y)
    }

    /// Squared Euclidean length, avoiding the square root
    pub fn length_squared(self) -> f64 {
        self.x * self.x + self.y * self.y
    }

    /// Euclidean distance to another point
    pub fn distance(self, other: Point) -> f64 {
        other.sub_point(self).hypot()
    }

    /// Manhattan (L1) distance to another point.
    ///
    /// The quadtree uses this metric to decide whether two points are
    /// coincident.
    pub fn manhattan_distance(self, other: Point) -> f64 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self::new(x, y)
    }
}

/// Dimensions of the layout viewport.
///
/// Gravity pulls nodes toward the viewport center, and nodes without a
/// usable position are seeded uniformly inside it.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(from = "[f64; 2]")]
pub struct Size {
    width: f64,
    height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Returns the width dimension of this size
    pub fn width(self) -> f64 {
        self.width
    }

    /// Returns the height dimension of this size
    pub fn height(self) -> f64 {
        self.height
    }

    /// Returns the center of a viewport of this size anchored at the origin
    pub fn center(self) -> Point {
        Point::new(self.width / 2.0, self.height / 2.0)
    }

    /// Returns true if both dimensions are finite
    pub fn is_finite(self) -> bool {
        self.width.is_finite() && self.height.is_finite()
    }
}

impl Default for Size {
    /// A unit viewport, centered at `(0.5, 0.5)`.
    fn default() -> Self {
        Self::new(1.0, 1.0)
    }
}

impl From<[f64; 2]> for Size {
    fn from([width, height]: [f64; 2]) -> Self {
        Self::new(width, height)
    }
}

/// A square, axis-aligned region `[x0, x1] x [y0, y1]`.
///
/// Extents partition into four equally sized quadrants around their
/// midpoint. A point exactly on the midpoint belongs to the right/lower
/// quadrant.
///
/// # Examples
///
/// ```
/// # use lodestone_core::geometry::{Extent, Point};
/// let extent = Extent::covering([Point::new(0.0, 0.0), Point::new(10.0, 4.0)]).unwrap();
/// assert_eq!(extent.side(), 10.0);
///
/// // Lower-right quadrant
/// assert_eq!(extent.quadrant(Point::new(7.0, 6.0)), 3);
/// let child = extent.child(3);
/// assert_eq!(child.x0(), 5.0);
/// assert_eq!(child.y0(), 5.0);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Extent {
    x0: f64,
    y0: f64,
    x1: f64,
    y1: f64,
}

impl Extent {
    /// Creates a square extent from its top-left corner and side length
    pub fn new(origin: Point, side: f64) -> Self {
        Self {
            x0: origin.x,
            y0: origin.y,
            x1: origin.x + side,
            y1: origin.y + side,
        }
    }

    /// Computes the smallest square anchored at the minimum corner that
    /// contains every finite point.
    ///
    /// The shorter axis is stretched to match the longer one. Returns `None`
    /// when no finite point is given.
    pub fn covering(points: impl IntoIterator<Item = Point>) -> Option<Self> {
        let mut min_x = f64::INFINITY;
        let mut min_y = f64::INFINITY;
        let mut max_x = f64::NEG_INFINITY;
        let mut max_y = f64::NEG_INFINITY;

        for point in points.into_iter().filter(|p| p.is_finite()) {
            min_x = min_x.min(point.x);
            min_y = min_y.min(point.y);
            max_x = max_x.max(point.x);
            max_y = max_y.max(point.y);
        }

        if min_x > max_x {
            return None;
        }

        let side = (max_x - min_x).max(max_y - min_y);
        Some(Self::new(Point::new(min_x, min_y), side))
    }

    /// Doubles the extent toward `point` until it is covered.
    ///
    /// The original extent stays one quadrant of each doubled one, so
    /// everything it contained is still contained. A zero-sized extent grows
    /// from a unit square. Non-finite points leave the extent unchanged.
    pub fn grown_to(self, point: Point) -> Self {
        if !point.is_finite() || self.contains(point) {
            return self;
        }
        if !self.center().is_finite() {
            return Self::new(point, 0.0);
        }

        let (mut x0, mut y0) = (self.x0, self.y0);
        let mut side = if self.side() > 0.0 { self.side() } else { 1.0 };
        loop {
            let extent = Self::new(Point::new(x0, y0), side);
            if extent.contains(point) || !side.is_finite() {
                return extent;
            }
            if point.x < x0 {
                x0 -= side;
            }
            if point.y < y0 {
                y0 -= side;
            }
            side *= 2.0;
        }
    }

    /// Returns the minimum x-coordinate
    pub fn x0(self) -> f64 {
        self.x0
    }

    /// Returns the minimum y-coordinate
    pub fn y0(self) -> f64 {
        self.y0
    }

    /// Returns the maximum x-coordinate
    pub fn x1(self) -> f64 {
        self.x1
    }

    /// Returns the maximum y-coordinate
    pub fn y1(self) -> f64 {
        self.y1
    }

    /// Side length of the square
    pub fn side(self) -> f64 {
        self.x1 - self.x0
    }

    /// Returns the midpoint of the extent
    pub fn center(self) -> Point {
        Point::new((self.x0 + self.x1) / 2.0, (self.y0 + self.y1) / 2.0)
    }

    /// Returns true if the point lies inside or on the boundary
    pub fn contains(self, point: Point) -> bool {
        point.x >= self.x0 && point.x <= self.x1 && point.y >= self.y0 && point.y <= self.y1
    }

    /// Quadrant index for a point: `below << 1 | right`.
    ///
    /// Points outside the extent still map to the nearest quadrant.
    pub fn quadrant(self, point: Point) -> usize {
        let center = self.center();
        let right = point.x >= center.x;
        let below = point.y >= center.y;
        (usize::from(below) << 1) | usize::from(right)
    }

    /// Extent of the given quadrant (0 = top-left, 1 = top-right,
    /// 2 = bottom-left, 3 = bottom-right).
    ///
    /// # Panics
    ///
    /// Panics if `quadrant > 3`.
    pub fn child(self, quadrant: usize) -> Self {
        assert!(quadrant < 4, "quadrant index out of range: {quadrant}");
        let center = self.center();
        let (x0, x1) = if quadrant & 1 == 1 {
            (center.x, self.x1)
        } else {
            (self.x0, center.x)
        };
        let (y0, y1) = if quadrant & 2 == 2 {
            (center.y, self.y1)
        } else {
            (self.y0, center.y)
        };
        Self { x0, y0, x1, y1 }
    }
}
