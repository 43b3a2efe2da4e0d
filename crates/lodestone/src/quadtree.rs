//! Barnes-Hut quadtree.
//!
//! The quadtree recursively partitions a square region into four quadrants
//! so that distant groups of nodes can be treated as one aggregate charge at
//! their centroid. The tree is rebuilt from scratch every tick; nothing in it
//! survives between ticks.
//!
//! Nodes live in a flat arena and refer to their children by index. A node
//! is either a leaf holding at most one point, or an internal node with
//! exactly four children. An internal node may additionally keep a
//! *resident* point when a second point arrived within [`EPSILON`] of it:
//! instead of subdividing forever, the resident stays put and the newcomer
//! continues into a child.
//!
//! # Example
//!
//! ```
//! # use rand::{SeedableRng, rngs::StdRng};
//! # use lodestone::quadtree::{Action, Quadtree};
//! # use lodestone_core::geometry::Point;
//! let points = [Point::new(0.0, 0.0), Point::new(10.0, 10.0), Point::new(-5.0, 3.0)];
//! let mut tree = Quadtree::build(&points);
//! tree.accumulate(&[1.0, 1.0, 1.0], &mut StdRng::seed_from_u64(1));
//!
//! assert_eq!(tree.root().charge(), 3.0);
//!
//! let mut seen = 0;
//! tree.visit(|node| {
//!     if node.point().is_some() {
//!         seen += 1;
//!     }
//!     Action::Descend
//! });
//! assert_eq!(seen, 3);
//! ```

use rand::Rng;

use lodestone_core::geometry::{Extent, Point};

/// Points closer than this (Manhattan distance) are treated as coincident.
///
/// Tunable; it keeps insertion finite for duplicated positions but gives no
/// accuracy guarantee for heavily clustered input.
pub const EPSILON: f64 = 0.01;

/// Width of the uniform nudge applied to coincident resident points during
/// [`Quadtree::accumulate`]. Each axis moves by a value in `[-JITTER/2, JITTER/2)`.
pub const JITTER: f64 = 1.0;

/// Traversal decision returned by [`Quadtree::visit`] callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Skip this node's children.
    Prune,
    /// Continue into this node's children.
    Descend,
}

/// A single region of the quadtree.
#[derive(Debug, Clone)]
pub struct QuadNode {
    extent: Extent,
    /// Index of the point stored at this node, if any
    point: Option<usize>,
    children: Option<[usize; 4]>,
    charge: f64,
    point_charge: f64,
    centroid: Point,
}

impl QuadNode {
    fn new(extent: Extent) -> Self {
        Self {
            extent,
            point: None,
            children: None,
            charge: 0.0,
            point_charge: 0.0,
            centroid: Point::default(),
        }
    }

    /// Region covered by this node
    pub fn extent(&self) -> Extent {
        self.extent
    }

    /// Index of the point stored at this node
    pub fn point(&self) -> Option<usize> {
        self.point
    }

    /// Arena indices of the four children, or `None` for a leaf
    pub fn children(&self) -> Option<[usize; 4]> {
        self.children
    }

    /// Returns true if this node has no children
    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    /// Total charge of every point in this subtree
    pub fn charge(&self) -> f64 {
        self.charge
    }

    /// Charge of the point stored directly at this node
    pub fn point_charge(&self) -> f64 {
        self.point_charge
    }

    /// Charge-weighted mean position of the subtree.
    ///
    /// Not finite when the subtree carries no charge.
    pub fn centroid(&self) -> Point {
        self.centroid
    }
}

/// Arena-backed quadtree over a set of indexed points.
///
/// Point indices are positions in the slice given to [`Quadtree::build`]
/// (or the order of [`Quadtree::insert`] calls), which lets callers map
/// tree points back to their own records.
#[derive(Debug, Clone)]
pub struct Quadtree {
    nodes: Vec<QuadNode>,
    points: Vec<Point>,
    /// Points moved by the coincidence jitter during the last accumulate
    jittered: Vec<usize>,
}

impl Quadtree {
    const ROOT: usize = 0;

    /// Creates an empty tree over the given extent
    pub fn new(extent: Extent) -> Self {
        Self {
            nodes: vec![QuadNode::new(extent)],
            points: Vec::new(),
            jittered: Vec::new(),
        }
    }

    /// Builds a tree over the square extent covering all finite points
    pub fn build(points: &[Point]) -> Self {
        let extent = Extent::covering(points.iter().copied()).unwrap_or_default();
        Self::build_within(points, extent)
    }

    /// Builds a tree over a caller-supplied extent.
    ///
    /// The extent is doubled toward finite points lying outside it until
    /// every one of them is covered.
    pub fn build_within(points: &[Point], extent: Extent) -> Self {
        let extent = points
            .iter()
            .fold(extent, |extent, &point| extent.grown_to(point));
        let mut tree = Self::new(extent);
        tree.points.reserve(points.len());
        tree.nodes.reserve(points.len() * 2);
        for &point in points {
            tree.insert(point);
        }
        tree
    }

    /// Inserts a point and returns its index.
    ///
    /// A point outside the root extent grows the tree to cover it, which
    /// rebuilds the arena. Non-finite points get an index but are not placed
    /// in the tree.
    pub fn insert(&mut self, point: Point) -> usize {
        let index = self.points.len();
        self.points.push(point);
        if !point.is_finite() {
            return index;
        }

        let extent = self.root().extent;
        if extent.contains(point) {
            self.insert_at(Self::ROOT, index);
        } else {
            self.regrow(extent.grown_to(point));
        }
        index
    }

    /// Replaces the arena with an empty root over `extent` and places every
    /// stored point again.
    fn regrow(&mut self, extent: Extent) {
        self.nodes.clear();
        self.nodes.push(QuadNode::new(extent));
        for index in 0..self.points.len() {
            let point = self.points[index];
            if point.is_finite() && extent.contains(point) {
                self.insert_at(Self::ROOT, index);
            }
        }
    }

    fn insert_at(&mut self, mut node: usize, index: usize) {
        let point = self.points[index];
        loop {
            if self.nodes[node].children.is_some() {
                node = self.child_for(node, point);
                continue;
            }

            let Some(resident) = self.nodes[node].point else {
                self.nodes[node].point = Some(index);
                return;
            };

            if self.points[resident].manhattan_distance(point) < EPSILON
                || !divisible(self.nodes[node].extent)
            {
                // Coincident, or too close to separate at this precision:
                // the resident stays here and the newcomer continues into a
                // child.
                self.subdivide(node);
                node = self.child_for(node, point);
                continue;
            }

            self.nodes[node].point = None;
            self.subdivide(node);
            let resident_child = self.child_for(node, self.points[resident]);
            self.insert_at(resident_child, resident);
            node = self.child_for(node, point);
        }
    }

    fn subdivide(&mut self, node: usize) {
        let extent = self.nodes[node].extent;
        let first = self.nodes.len();
        for quadrant in 0..4 {
            self.nodes.push(QuadNode::new(extent.child(quadrant)));
        }
        self.nodes[node].children = Some([first, first + 1, first + 2, first + 3]);
    }

    fn child_for(&self, node: usize, point: Point) -> usize {
        let node = &self.nodes[node];
        let children = node
            .children
            .expect("child_for is only called on internal nodes");
        children[node.extent.quadrant(point)]
    }

    /// The root node
    pub fn root(&self) -> &QuadNode {
        &self.nodes[Self::ROOT]
    }

    /// Node by arena index
    pub fn node(&self, index: usize) -> Option<&QuadNode> {
        self.nodes.get(index)
    }

    /// Number of nodes in the arena
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if no point has been placed
    pub fn is_empty(&self) -> bool {
        self.root().is_leaf() && self.root().point.is_none()
    }

    /// Position of a point as currently stored in the tree.
    ///
    /// Differs from the inserted position after [`Quadtree::accumulate`]
    /// nudged a coincident point.
    pub fn point(&self, index: usize) -> Option<Point> {
        self.points.get(index).copied()
    }

    /// Indices of points moved by the last [`Quadtree::accumulate`]
    pub fn jittered(&self) -> &[usize] {
        &self.jittered
    }

    /// Pre-order traversal from the root.
    ///
    /// Returning [`Action::Prune`] skips the children of the visited node.
    pub fn visit<F>(&self, mut callback: F)
    where
        F: FnMut(&QuadNode) -> Action,
    {
        let mut stack = vec![Self::ROOT];
        while let Some(index) = stack.pop() {
            let node = &self.nodes[index];
            if callback(node) == Action::Prune {
                continue;
            }
            if let Some(children) = node.children {
                // Reversed so quadrant 0 is visited first
                stack.extend(children.iter().rev());
            }
        }
    }

    /// Computes charges and centroids bottom-up.
    ///
    /// `charges[i]` is the charge of point `i`; missing entries count as
    /// zero. Resident points of internal nodes are first nudged by a random
    /// jitter so coincident points stop overlapping; the affected indices are
    /// available from [`Quadtree::jittered`].
    pub fn accumulate<R: Rng>(&mut self, charges: &[f64], rng: &mut R) {
        self.jittered.clear();
        for index in self.post_order() {
            let mut charge = 0.0;
            let mut cx = 0.0;
            let mut cy = 0.0;

            if let Some(children) = self.nodes[index].children {
                for child in children {
                    let child = &self.nodes[child];
                    if child.charge == 0.0 {
                        continue;
                    }
                    charge += child.charge;
                    cx += child.charge * child.centroid.x();
                    cy += child.charge * child.centroid.y();
                }
            }

            let mut point_charge = 0.0;
            if let Some(point_index) = self.nodes[index].point {
                if self.nodes[index].children.is_some() {
                    let nudge = Point::new(
                        (rng.random::<f64>() - 0.5) * JITTER,
                        (rng.random::<f64>() - 0.5) * JITTER,
                    );
                    self.points[point_index] = self.points[point_index].add_point(nudge);
                    self.jittered.push(point_index);
                }
                point_charge = charges.get(point_index).copied().unwrap_or(0.0);
                let point = self.points[point_index];
                charge += point_charge;
                cx += point_charge * point.x();
                cy += point_charge * point.y();
            }

            let node = &mut self.nodes[index];
            node.charge = charge;
            node.point_charge = point_charge;
            node.centroid = Point::new(cx / charge, cy / charge);
        }
    }

    /// Arena indices ordered so that children precede their parent
    fn post_order(&self) -> Vec<usize> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![Self::ROOT];
        while let Some(index) = stack.pop() {
            order.push(index);
            if let Some(children) = self.nodes[index].children {
                stack.extend(children);
            }
        }
        order.reverse();
        order
    }
}

/// Whether halving the extent yields strictly smaller quadrants
fn divisible(extent: Extent) -> bool {
    let center = extent.center();
    extent.x0() < center.x()
        && center.x() < extent.x1()
        && extent.y0() < center.y()
        && center.y() < extent.y1()
}
