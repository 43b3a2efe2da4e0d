//! Force kernels applied during a tick.
//!
//! Links and gravity move positions directly. Repulsion adjusts the previous
//! position instead, which the next integration step turns into velocity.

use rand::Rng;

use lodestone_core::geometry::{Point, Size};

use crate::quadtree::{Action, Quadtree};

use super::node::{Link, Node};

/// Pulls or pushes linked nodes toward their rest distance.
///
/// Links are processed in order and each sees the positions left by the
/// previous one. The heavier endpoint moves less. Only links with a resolved
/// distance and strength take part.
pub(crate) fn apply_links<N, L>(
    nodes: &mut [Node<N>],
    links: &[Link<L>],
    distances: &[f64],
    strengths: &[f64],
    alpha: f64,
) {
    for ((link, &distance), &strength) in links.iter().zip(distances).zip(strengths) {
        let (s, t) = (link.source(), link.target());
        let source = &nodes[s];
        let target = &nodes[t];

        let delta = target.position.sub_point(source.position);
        let length_squared = delta.length_squared();
        if length_squared == 0.0 {
            continue;
        }
        let length = length_squared.sqrt();
        let l = alpha * strength * (length - distance) / length;
        let delta = delta.scale(l);

        let total = source.weight + target.weight;
        let k = if total == 0.0 {
            0.5
        } else {
            source.weight / total
        };

        let target = &mut nodes[t];
        target.position = target.position.sub_point(delta.scale(k));
        let source = &mut nodes[s];
        source.position = source.position.add_point(delta.scale(1.0 - k));
    }
}

/// Moves unfixed nodes toward the viewport center by `alpha * gravity`.
pub(crate) fn apply_gravity<N>(nodes: &mut [Node<N>], size: Size, alpha: f64, gravity: f64) {
    let k = alpha * gravity;
    if k == 0.0 {
        return;
    }
    let center = size.center();
    for node in nodes.iter_mut().filter(|node| !node.is_fixed()) {
        node.position = node
            .position
            .add_point(center.sub_point(node.position).scale(k));
    }
}

/// Barnes-Hut repulsion over all nodes.
///
/// `charges` must already be scaled by alpha.
pub(crate) fn apply_repulsion<N, R: Rng>(
    nodes: &mut [Node<N>],
    charges: &[f64],
    theta: f64,
    charge_distance: f64,
    rng: &mut R,
) {
    let points: Vec<Point> = nodes.iter().map(|node| node.position).collect();
    let mut tree = Quadtree::build(&points);
    tree.accumulate(charges, rng);

    for &index in tree.jittered() {
        let node = &mut nodes[index];
        if node.is_fixed() {
            continue;
        }
        if let Some(point) = tree.point(index) {
            node.position = point;
        }
    }

    for (index, node) in nodes.iter_mut().enumerate() {
        if node.is_fixed() {
            continue;
        }
        let force = repulsion(&tree, index, node.position, theta, charge_distance);
        node.previous = node.previous.sub_point(force);
    }
}

/// Sum of `delta * charge / |delta|²` acting on one node.
///
/// Regions whose side is small relative to their distance are taken as a
/// single charge at their centroid. Contributions from farther than
/// `charge_distance` are dropped.
pub(crate) fn repulsion(
    tree: &Quadtree,
    index: usize,
    position: Point,
    theta: f64,
    charge_distance: f64,
) -> Point {
    let theta_squared = theta * theta;
    let max_squared = charge_distance * charge_distance;
    let mut force = Point::default();

    tree.visit(|quad| {
        let charge = quad.charge();
        if charge == 0.0 || !charge.is_finite() {
            return Action::Prune;
        }
        if quad.point() == Some(index) {
            // The node's own region: only its children carry other points
            return Action::Descend;
        }

        let delta = quad.centroid().sub_point(position);
        let distance_squared = delta.length_squared();
        let side = quad.extent().side();

        // With theta == 0 this never holds, so every pair is exact
        if side * side / theta_squared < distance_squared {
            if distance_squared < max_squared {
                force = force.add_point(delta.scale(charge / distance_squared));
            }
            return Action::Prune;
        }

        if let Some(point) = quad.point().and_then(|point| tree.point(point)) {
            let delta = point.sub_point(position);
            let distance_squared = delta.length_squared();
            if distance_squared != 0.0 && distance_squared < max_squared {
                force = force.add_point(delta.scale(quad.point_charge() / distance_squared));
            }
        }
        Action::Descend
    });

    force
}

/// Verlet step: fixed nodes snap to their previous position, unfixed nodes
/// keep `friction` of their velocity.
pub(crate) fn integrate<N>(nodes: &mut [Node<N>], friction: f64) {
    for node in nodes.iter_mut() {
        if node.is_fixed() {
            node.position = node.previous;
            continue;
        }
        let current = node.position;
        let velocity = current.sub_point(node.previous);
        node.position = current.add_point(velocity.scale(friction));
        node.previous = current;
    }
}
