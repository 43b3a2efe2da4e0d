//! Simulation state and the per-tick force loop.

use std::fmt;

use log::{debug, info, trace};
use rand::{Rng, rngs::StdRng};

use lodestone_core::geometry::Point;

use crate::{
    LayoutError, LinkEndpoint,
    config::ForceConfig,
    scheduler::{TimerId, TimerStatus},
};

use super::{
    event::{Event, Listener},
    forces,
    node::{Link, Node},
    param::Param,
};

/// Cooling applied to alpha at the start of every tick.
pub const ALPHA_DECAY: f64 = 0.99;

/// Below this alpha the layout counts as converged.
pub const ALPHA_MIN: f64 = 0.005;

/// Lifecycle phase of a simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// Built but never started.
    #[default]
    Idle,
    /// Ticking on every frame.
    Running,
    /// Converged or stopped by request; `resume` restarts it.
    Stopped,
}

/// Everything a simulation owns: the graph, the force parameters and the
/// lifecycle.
///
/// Obtained through [`ForceSimulation::state`](super::ForceSimulation::state)
/// for read access. Mutation goes through the handle so timers stay in sync.
pub struct SimulationState<N = (), L = ()> {
    nodes: Vec<Node<N>>,
    links: Vec<Link<L>>,
    config: ForceConfig,
    link_distance: Option<Param<Link<L>>>,
    link_strength: Option<Param<Link<L>>>,
    charge: Option<Param<Node<N>>>,
    distances: Vec<f64>,
    strengths: Vec<f64>,
    charges: Vec<f64>,
    alpha: f64,
    phase: Phase,
    /// Set once a preparation has succeeded
    prepared: bool,
    ticks: u64,
    rng: StdRng,
    listeners: Vec<Listener<N>>,
    pub(super) timer: Option<TimerId>,
}

/// Per-link and per-node values resolved by a successful preparation.
struct Resolved {
    distances: Vec<f64>,
    strengths: Vec<f64>,
    charges: Vec<f64>,
}

pub(super) struct Parts<N, L> {
    pub nodes: Vec<Node<N>>,
    pub links: Vec<Link<L>>,
    pub config: ForceConfig,
    pub link_distance: Option<Param<Link<L>>>,
    pub link_strength: Option<Param<Link<L>>>,
    pub charge: Option<Param<Node<N>>>,
    pub listeners: Vec<Listener<N>>,
    pub rng: StdRng,
}

impl<N, L> SimulationState<N, L> {
    pub(super) fn new(parts: Parts<N, L>) -> Self {
        let mut state = Self {
            nodes: parts.nodes,
            links: parts.links,
            config: parts.config,
            link_distance: parts.link_distance,
            link_strength: parts.link_strength,
            charge: parts.charge,
            distances: Vec::new(),
            strengths: Vec::new(),
            charges: Vec::new(),
            alpha: 0.0,
            phase: Phase::Idle,
            prepared: false,
            ticks: 0,
            rng: parts.rng,
            listeners: parts.listeners,
            timer: None,
        };
        state.assign_indices();
        state
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn nodes(&self) -> &[Node<N>] {
        &self.nodes
    }

    pub fn links(&self) -> &[Link<L>] {
        &self.links
    }

    pub fn config(&self) -> &ForceConfig {
        &self.config
    }

    /// Returns true once a start has prepared the graph
    pub fn is_prepared(&self) -> bool {
        self.prepared
    }

    /// Ticks run since the last start or resume
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Resolved rest lengths, one per link, as of the last start
    pub fn distances(&self) -> &[f64] {
        &self.distances
    }

    /// Resolved link stiffness, one per link, as of the last start
    pub fn strengths(&self) -> &[f64] {
        &self.strengths
    }

    /// Resolved node charges, one per node, as of the last start
    pub fn charges(&self) -> &[f64] {
        &self.charges
    }

    pub(super) fn nodes_mut(&mut self) -> &mut [Node<N>] {
        &mut self.nodes
    }

    pub(super) fn set_config(&mut self, config: ForceConfig) {
        self.config = config;
    }

    pub(super) fn push_node(&mut self, mut node: Node<N>) -> usize {
        let index = self.nodes.len();
        node.index = index;
        self.nodes.push(node);
        index
    }

    pub(super) fn push_link(&mut self, link: Link<L>) -> Result<usize, LayoutError> {
        let index = self.links.len();
        check_link(index, &link, self.nodes.len())?;
        self.links.push(link);
        Ok(index)
    }

    pub(super) fn add_listener(&mut self, listener: Listener<N>) {
        self.listeners.push(listener);
    }

    fn assign_indices(&mut self) {
        for (index, node) in self.nodes.iter_mut().enumerate() {
            node.index = index;
        }
    }

    /// Validates the graph and resolves everything a tick needs.
    ///
    /// Either every node and resolved array is updated or, on error, none
    /// is. Leaves the lifecycle phase untouched.
    pub(super) fn prepare(&mut self) -> Result<(), LayoutError> {
        self.config.validate()?;
        let node_count = self.nodes.len();
        for (index, link) in self.links.iter().enumerate() {
            check_link(index, link, node_count)?;
        }

        let snapshot: Vec<(Point, Point, f64)> = self
            .nodes
            .iter()
            .map(|node| (node.position, node.previous, node.weight))
            .collect();
        let rng = self.rng.clone();

        let resolved = match self.resolve() {
            Ok(resolved) => resolved,
            Err(err) => {
                for (node, (position, previous, weight)) in self.nodes.iter_mut().zip(snapshot) {
                    node.position = position;
                    node.previous = previous;
                    node.weight = weight;
                }
                self.rng = rng;
                return Err(err);
            }
        };

        self.distances = resolved.distances;
        self.strengths = resolved.strengths;
        self.charges = resolved.charges;
        self.prepared = true;
        debug!(
            nodes = self.nodes.len(),
            links = self.links.len(),
            repulsive = self.charges.iter().any(|&c| c != 0.0);
            "Simulation prepared"
        );
        Ok(())
    }

    /// Counts weights, seeds positions and evaluates the force parameters.
    ///
    /// Links must already be validated.
    fn resolve(&mut self) -> Result<Resolved, LayoutError> {
        self.assign_indices();
        for node in &mut self.nodes {
            node.weight = 0.0;
        }
        for link in &self.links {
            self.nodes[link.source()].weight += 1.0;
            self.nodes[link.target()].weight += 1.0;
        }

        let reseeded = self.reseed();
        if reseeded > 0 {
            debug!(reseeded, nodes = self.nodes.len(); "Placed nodes without a position");
        }

        for node in &mut self.nodes {
            let (position, previous) = (node.position, node.previous);
            node.previous = Point::new(
                if previous.x().is_finite() { previous.x() } else { position.x() },
                if previous.y().is_finite() { previous.y() } else { position.y() },
            );
        }

        let distances = resolve_links(
            &self.links,
            self.link_distance.as_ref(),
            self.config.link_distance(),
            Link::distance,
        );
        check_finite("link_distance", &distances)?;
        let strengths = resolve_links(
            &self.links,
            self.link_strength.as_ref(),
            self.config.link_strength(),
            Link::strength,
        );
        check_finite("link_strength", &strengths)?;
        let charges = match &self.charge {
            Some(param) => param.resolve(&self.nodes),
            None => vec![self.config.charge(); self.nodes.len()],
        };
        check_finite("charge", &charges)?;

        Ok(Resolved {
            distances,
            strengths,
            charges,
        })
    }

    /// Fills non-finite coordinates, one axis at a time, from the first
    /// neighbor with a finite value on that axis, or uniformly inside the
    /// viewport. Returns the number of nodes touched.
    fn reseed(&mut self) -> usize {
        let size = self.config.size();
        let mut neighbors: Option<Vec<Vec<usize>>> = None;
        let mut reseeded = 0;

        for index in 0..self.nodes.len() {
            let position = self.nodes[index].position;
            if position.is_finite() {
                continue;
            }
            let neighbors =
                neighbors.get_or_insert_with(|| adjacency(self.nodes.len(), &self.links));

            let x = if position.x().is_finite() {
                position.x()
            } else {
                seed_axis(&self.nodes, &neighbors[index], Point::x, size.width(), &mut self.rng)
            };
            let y = if position.y().is_finite() {
                position.y()
            } else {
                seed_axis(&self.nodes, &neighbors[index], Point::y, size.height(), &mut self.rng)
            };
            trace!(node = index, x, y; "Seeded node position");
            self.nodes[index].position = Point::new(x, y);
            reseeded += 1;
        }
        reseeded
    }

    /// Enters the running phase with the given alpha.
    ///
    /// Returns false, changing nothing, when never prepared, already running
    /// or when `alpha` is not positive.
    pub(super) fn resume_with(&mut self, alpha: f64) -> bool {
        if !self.prepared || self.phase == Phase::Running || alpha.is_nan() || alpha <= 0.0 {
            return false;
        }
        self.alpha = alpha;
        self.phase = Phase::Running;
        self.ticks = 0;
        info!(alpha, nodes = self.nodes.len(); "Simulation running");
        self.emit(Event::Start { alpha });
        true
    }

    /// Drops alpha to zero and ends the running phase.
    ///
    /// Any queued tick timer removes itself the next time it fires.
    pub(super) fn stop(&mut self) {
        if self.phase != Phase::Running {
            return;
        }
        self.alpha = 0.0;
        self.phase = Phase::Stopped;
        info!(ticks = self.ticks; "Simulation stopped");
        self.emit(Event::End { alpha: 0.0 });
    }

    /// Advances the simulation by one step.
    ///
    /// Does nothing and returns [`TimerStatus::Done`] unless running.
    pub fn tick(&mut self) -> TimerStatus {
        if self.phase != Phase::Running {
            return TimerStatus::Done;
        }

        self.alpha *= ALPHA_DECAY;
        if self.alpha < ALPHA_MIN {
            self.alpha = 0.0;
            self.phase = Phase::Stopped;
            info!(ticks = self.ticks; "Simulation converged");
            self.emit(Event::End { alpha: 0.0 });
            return TimerStatus::Done;
        }
        let alpha = self.alpha;

        // Nodes and links pushed since the last start stay inert until the next one
        let nodes = &mut self.nodes[..self.charges.len()];
        forces::apply_links(nodes, &self.links, &self.distances, &self.strengths, alpha);
        forces::apply_gravity(nodes, self.config.size(), alpha, self.config.gravity());
        if self.charges.iter().any(|&charge| charge != 0.0) {
            let charges: Vec<f64> = self.charges.iter().map(|charge| charge * alpha).collect();
            forces::apply_repulsion(
                nodes,
                &charges,
                self.config.theta(),
                self.config.charge_distance(),
                &mut self.rng,
            );
        }
        forces::integrate(nodes, self.config.friction());

        self.ticks += 1;
        trace!(tick = self.ticks, alpha; "Tick");
        self.emit(Event::Tick { alpha });
        TimerStatus::Continue
    }

    fn emit(&mut self, event: Event) {
        for listener in &mut self.listeners {
            listener(&event, &self.nodes);
        }
    }
}

impl<N, L> fmt::Debug for SimulationState<N, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimulationState")
            .field("phase", &self.phase)
            .field("alpha", &self.alpha)
            .field("nodes", &self.nodes.len())
            .field("links", &self.links.len())
            .field("ticks", &self.ticks)
            .finish()
    }
}

/// Node index to neighbor indices, in link order
fn adjacency<L>(node_count: usize, links: &[Link<L>]) -> Vec<Vec<usize>> {
    let mut neighbors = vec![Vec::new(); node_count];
    for link in links {
        neighbors[link.source()].push(link.target());
        neighbors[link.target()].push(link.source());
    }
    neighbors
}

fn seed_axis<N>(
    nodes: &[Node<N>],
    neighbors: &[usize],
    axis: fn(Point) -> f64,
    extent: f64,
    rng: &mut StdRng,
) -> f64 {
    neighbors
        .iter()
        .map(|&neighbor| axis(nodes[neighbor].position))
        .find(|value| value.is_finite())
        .unwrap_or_else(|| rng.random::<f64>() * extent)
}

fn resolve_links<L>(
    links: &[Link<L>],
    param: Option<&Param<Link<L>>>,
    default: f64,
    own: fn(&Link<L>) -> Option<f64>,
) -> Vec<f64> {
    let resolved = match param {
        Some(param) => param.resolve(links),
        None => vec![default; links.len()],
    };
    links
        .iter()
        .zip(resolved)
        .map(|(link, value)| own(link).unwrap_or(value))
        .collect()
}

/// Rejects a link whose endpoints are not in `0..node_count`
fn check_link<L>(link: usize, entry: &Link<L>, node_count: usize) -> Result<(), LayoutError> {
    for (endpoint, index) in [
        (LinkEndpoint::Source, entry.source()),
        (LinkEndpoint::Target, entry.target()),
    ] {
        if index >= node_count {
            return Err(LayoutError::InvalidLink {
                link,
                endpoint,
                index,
                node_count,
            });
        }
    }
    Ok(())
}

fn check_finite(name: &'static str, values: &[f64]) -> Result<(), LayoutError> {
    match values.iter().find(|value| !value.is_finite()) {
        Some(&value) => Err(LayoutError::InvalidParameter { name, value }),
        None => Ok(()),
    }
}
