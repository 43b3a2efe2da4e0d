//! Nodes and links of a simulated graph.
//!
//! Both carry a generic payload so hosts can attach their own records
//! without a side table. Indices are positions in the simulation's node
//! list; a [`Link`] refers to its endpoints by those indices.

use lodestone_core::{geometry::Point, pin::Pins};

/// A positioned graph node.
///
/// A node without a position (both coordinates `NaN`) is placed when the
/// simulation starts, next to its first placed neighbor or at a random spot
/// inside the viewport.
#[derive(Debug, Clone)]
pub struct Node<N = ()> {
    pub(crate) index: usize,
    pub(crate) position: Point,
    /// Position before the last integration step; `position - previous` is
    /// the node's velocity.
    pub(crate) previous: Point,
    pub(crate) weight: f64,
    pub(crate) pins: Pins,
    data: N,
}

impl Node {
    /// Creates an unplaced node without payload
    pub fn new() -> Self {
        Self::with_data(())
    }

    /// Creates a node without payload at the given position
    pub fn at(x: f64, y: f64) -> Self {
        Self::new().with_position(x, y)
    }
}

impl Default for Node {
    fn default() -> Self {
        Self::new()
    }
}

impl<N> Node<N> {
    /// Creates an unplaced node carrying `data`
    pub fn with_data(data: N) -> Self {
        Self {
            index: 0,
            position: Point::new(f64::NAN, f64::NAN),
            previous: Point::new(f64::NAN, f64::NAN),
            weight: 0.0,
            pins: Pins::empty(),
            data,
        }
    }

    /// Sets the initial position.
    ///
    /// Either coordinate may be `NaN` to let the simulation choose it.
    pub fn with_position(mut self, x: f64, y: f64) -> Self {
        self.position = Point::new(x, y);
        self
    }

    /// Sets the previous position, giving the node an initial velocity
    pub fn with_previous(mut self, x: f64, y: f64) -> Self {
        self.previous = Point::new(x, y);
        self
    }

    /// Sets the pin reasons
    pub fn with_pins(mut self, pins: Pins) -> Self {
        self.pins = pins;
        self
    }

    /// Pins or releases the node on behalf of the host
    pub fn fixed(mut self, fixed: bool) -> Self {
        self.pins.set(Pins::USER, fixed);
        self
    }

    /// Position of this node in the simulation's node list.
    ///
    /// Assigned when the simulation is built or the node is pushed.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub fn x(&self) -> f64 {
        self.position.x()
    }

    pub fn y(&self) -> f64 {
        self.position.y()
    }

    pub fn previous(&self) -> Point {
        self.previous
    }

    /// Number of link endpoints attached to this node, as of the last start
    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn pins(&self) -> Pins {
        self.pins
    }

    /// Returns true if any pin reason holds the node in place
    pub fn is_fixed(&self) -> bool {
        self.pins.is_pinned()
    }

    pub fn data(&self) -> &N {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut N {
        &mut self.data
    }

    /// Moves the node, keeping its velocity
    pub fn set_position(&mut self, x: f64, y: f64) {
        let target = Point::new(x, y);
        let velocity = self.position.sub_point(self.previous);
        self.position = target;
        self.previous = if velocity.is_finite() {
            target.sub_point(velocity)
        } else {
            target
        };
    }

    pub fn set_previous(&mut self, x: f64, y: f64) {
        self.previous = Point::new(x, y);
    }

    pub fn pin(&mut self, reason: Pins) {
        self.pins.insert(reason);
    }

    pub fn unpin(&mut self, reason: Pins) {
        self.pins.remove(reason);
    }
}

/// A spring between two nodes.
#[derive(Debug, Clone)]
pub struct Link<L = ()> {
    source: usize,
    target: usize,
    distance: Option<f64>,
    strength: Option<f64>,
    data: L,
}

impl Link {
    /// Creates a link without payload
    pub fn new(source: usize, target: usize) -> Self {
        Self::with_data(source, target, ())
    }
}

impl<L> Link<L> {
    pub fn with_data(source: usize, target: usize, data: L) -> Self {
        Self {
            source,
            target,
            distance: None,
            strength: None,
            data,
        }
    }

    /// Overrides the simulation-wide rest length for this link
    pub fn with_distance(mut self, distance: f64) -> Self {
        self.distance = Some(distance);
        self
    }

    /// Overrides the simulation-wide stiffness for this link
    pub fn with_strength(mut self, strength: f64) -> Self {
        self.strength = Some(strength);
        self
    }

    pub fn source(&self) -> usize {
        self.source
    }

    pub fn target(&self) -> usize {
        self.target
    }

    pub fn distance(&self) -> Option<f64> {
        self.distance
    }

    pub fn strength(&self) -> Option<f64> {
        self.strength
    }

    pub fn data(&self) -> &L {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_node_is_unplaced() {
        let node = Node::new();
        assert!(node.x().is_nan());
        assert!(node.y().is_nan());
        assert!(!node.is_fixed());
    }

    #[test]
    fn test_fixed_sets_user_pin() {
        let node = Node::at(1.0, 2.0).fixed(true);
        assert_eq!(node.pins(), Pins::USER);
        assert!(node.is_fixed());

        let node = node.fixed(false);
        assert!(!node.is_fixed());
    }

    #[test]
    fn test_pins_are_independent() {
        let mut node = Node::at(0.0, 0.0);
        node.pin(Pins::DRAG);
        node.pin(Pins::HOVER);
        node.unpin(Pins::DRAG);
        assert!(node.is_fixed());
        assert_eq!(node.pins(), Pins::HOVER);
    }

    #[test]
    fn test_set_position_keeps_velocity() {
        let mut node = Node::at(5.0, 5.0).with_previous(4.0, 3.0);
        node.set_position(10.0, 10.0);
        assert_eq!(node.position(), Point::new(10.0, 10.0));
        assert_eq!(node.previous(), Point::new(9.0, 8.0));
    }

    #[test]
    fn test_link_overrides() {
        let link = Link::with_data(0, 1, "edge").with_distance(40.0).with_strength(0.5);
        assert_eq!(link.distance(), Some(40.0));
        assert_eq!(link.strength(), Some(0.5));
        assert_eq!(*link.data(), "edge");
    }
}
