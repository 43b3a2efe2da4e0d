//! Force-directed layout simulation.
//!
//! A [`ForceSimulation`] positions the nodes of a graph by repeatedly
//! applying link springs, gravity toward the viewport center and pairwise
//! repulsion, then integrating positions with friction. Repulsion is
//! approximated with the Barnes-Hut [`Quadtree`](crate::quadtree::Quadtree).
//!
//! # Lifecycle
//!
//! ```text
//! Idle ──start() or resume()──► Running ──alpha < 0.005 or stop()──► Stopped
//!                                  ▲                                    │
//!                                  └─────────────resume()───────────────┘
//! ```
//!
//! While running, the simulation has one timer registered with its
//! [`Scheduler`]; each frame the timer runs one [`tick`](ForceSimulation::tick).
//! `alpha` cools by 1% per tick and scales every force, so motion dies down
//! on its own. Nodes can also be stepped by hand through
//! [`ForceSimulation::tick`] without a scheduler loop.
//!
//! # Submodules
//!
//! - [`Node`] / [`Link`] - Graph elements with generic payloads
//! - [`Param`] - Constant or per-item force parameters
//! - [`Event`] - Lifecycle notifications
//! - [`SimulationState`] - The state behind a simulation handle
//!
//! # Example
//!
//! ```
//! # use std::rc::Rc;
//! # use lodestone::scheduler::{ManualClock, Scheduler};
//! # use lodestone::simulation::{Link, Node, Phase, SimulationBuilder};
//! let clock = Rc::new(ManualClock::new());
//! let scheduler = Scheduler::with_clock(clock.clone());
//!
//! let simulation = SimulationBuilder::new(
//!     vec![Node::at(0.0, 0.0), Node::at(5.0, 0.0)],
//!     vec![Link::new(0, 1).with_distance(30.0)],
//! )
//! .with_seed(7)
//! .build(&scheduler);
//!
//! simulation.start().unwrap();
//! while !scheduler.is_empty() {
//!     scheduler.flush();
//!     clock.advance(16.0);
//! }
//!
//! assert_eq!(simulation.phase(), Phase::Stopped);
//! let nodes = simulation.nodes();
//! let distance = nodes[0].position().distance(nodes[1].position());
//! // Gravity and repulsion settle the pair just short of its rest length
//! assert!(distance > 28.0 && distance < 30.0);
//! ```

mod event;
mod forces;
mod node;
mod param;
mod state;

use std::{
    cell::{Ref, RefCell},
    fmt,
    rc::{Rc, Weak},
};

use log::{info, warn};
use rand::{SeedableRng, rngs::StdRng};

use crate::{
    LayoutError,
    config::ForceConfig,
    scheduler::{Scheduler, TimerStatus},
};

pub use event::{Event, Listener};
pub use node::{Link, Node};
pub use param::Param;
pub use state::{ALPHA_DECAY, ALPHA_MIN, Phase, SimulationState};

use state::Parts;

/// Collects a graph and its force parameters before creating a
/// [`ForceSimulation`].
///
/// # Examples
///
/// ```
/// # use lodestone::config::ForceConfig;
/// # use lodestone::scheduler::Scheduler;
/// # use lodestone::simulation::{Link, Node, Param, SimulationBuilder};
/// let scheduler = Scheduler::new();
/// let simulation = SimulationBuilder::new(
///     vec![Node::with_data(1u32), Node::with_data(2u32)],
///     vec![Link::new(0, 1)],
/// )
/// .with_config(ForceConfig::default().with_gravity(0.05))
/// .with_charge(Param::per_item(|node: &Node<u32>, _| -20.0 * (1.0 + node.weight())))
/// .with_link_distance(60.0)
/// .build(&scheduler);
///
/// assert_eq!(simulation.nodes().len(), 2);
/// ```
pub struct SimulationBuilder<N = (), L = ()> {
    nodes: Vec<Node<N>>,
    links: Vec<Link<L>>,
    config: ForceConfig,
    link_distance: Option<Param<Link<L>>>,
    link_strength: Option<Param<Link<L>>>,
    charge: Option<Param<Node<N>>>,
    listeners: Vec<Listener<N>>,
}

impl<N> SimulationBuilder<N, ()> {
    /// Starts a builder for a graph without links
    pub fn from_nodes(nodes: Vec<Node<N>>) -> Self {
        Self::new(nodes, Vec::new())
    }
}

impl<N, L> SimulationBuilder<N, L> {
    pub fn new(nodes: Vec<Node<N>>, links: Vec<Link<L>>) -> Self {
        Self {
            nodes,
            links,
            config: ForceConfig::default(),
            link_distance: None,
            link_strength: None,
            charge: None,
            listeners: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: ForceConfig) -> Self {
        self.config = config;
        self
    }

    /// Fixes the random seed used for placement and jitter
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.config = self.config.with_seed(seed);
        self
    }

    /// Rest length for links without their own distance
    pub fn with_link_distance(mut self, distance: impl Into<Param<Link<L>>>) -> Self {
        self.link_distance = Some(distance.into());
        self
    }

    /// Stiffness for links without their own strength
    pub fn with_link_strength(mut self, strength: impl Into<Param<Link<L>>>) -> Self {
        self.link_strength = Some(strength.into());
        self
    }

    /// Node charge. A function sees each node after its weight is known.
    pub fn with_charge(mut self, charge: impl Into<Param<Node<N>>>) -> Self {
        self.charge = Some(charge.into());
        self
    }

    pub fn with_listener<F>(mut self, listener: F) -> Self
    where
        F: FnMut(&Event, &[Node<N>]) + 'static,
    {
        self.listeners.push(Box::new(listener));
        self
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

    /// Creates the simulation. It stays idle until [`ForceSimulation::start`].
    pub fn build(self, scheduler: &Scheduler) -> ForceSimulation<N, L> {
        let rng = match self.config.seed() {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let state = SimulationState::new(Parts {
            nodes: self.nodes,
            links: self.links,
            config: self.config,
            link_distance: self.link_distance,
            link_strength: self.link_strength,
            charge: self.charge,
            listeners: self.listeners,
            rng,
        });
        ForceSimulation {
            state: Rc::new(RefCell::new(state)),
            scheduler: scheduler.clone(),
        }
    }
}

impl<N, L> fmt::Debug for SimulationBuilder<N, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimulationBuilder")
            .field("nodes", &self.nodes.len())
            .field("links", &self.links.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Shared handle to a running or idle layout.
///
/// Cloning yields another handle to the same simulation. The queued tick
/// timer only holds a weak reference, so dropping every handle ends the
/// simulation on its next frame.
///
/// Methods borrow the shared state internally. Calling them from an
/// [`Event`] listener of the same simulation panics.
pub struct ForceSimulation<N = (), L = ()> {
    state: Rc<RefCell<SimulationState<N, L>>>,
    scheduler: Scheduler,
}

impl<N, L> Clone for ForceSimulation<N, L> {
    fn clone(&self) -> Self {
        Self {
            state: Rc::clone(&self.state),
            scheduler: self.scheduler.clone(),
        }
    }
}

impl<N: 'static, L: 'static> ForceSimulation<N, L> {
    /// Prepares the graph and starts ticking.
    ///
    /// Link weights are recounted, unplaced nodes are seeded, and parameters
    /// are resolved again, so changes made since the last start take effect.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::InvalidLink`] for a link endpoint outside the
    /// node list and [`LayoutError::InvalidParameter`] for a non-finite
    /// parameter. The simulation does not enter the running phase.
    pub fn start(&self) -> Result<(), LayoutError> {
        {
            let mut state = self.state.borrow_mut();
            info!(
                nodes = state.nodes().len(),
                links = state.links().len();
                "Starting simulation"
            );
            state.prepare()?;
        }
        self.resume()
    }

    /// Restarts a stopped simulation with the configured alpha.
    ///
    /// # Errors
    ///
    /// See [`resume_with`](Self::resume_with).
    pub fn resume(&self) -> Result<(), LayoutError> {
        let alpha = self.state.borrow().config().alpha();
        self.resume_with(alpha)
    }

    /// Restarts the simulation with the given alpha.
    ///
    /// A simulation that was never started is prepared first, as by
    /// [`start`](Self::start). Does nothing while running or when `alpha` is
    /// not positive.
    ///
    /// # Errors
    ///
    /// Returns the preparation error of a never-started simulation, which
    /// then stays idle.
    pub fn resume_with(&self, alpha: f64) -> Result<(), LayoutError> {
        let needs_timer = {
            let mut state = self.state.borrow_mut();
            if !state.is_prepared() {
                state.prepare()?;
            }
            if !state.resume_with(alpha) {
                return Ok(());
            }
            state
                .timer
                .is_none_or(|timer| !self.scheduler.is_active(timer))
        };
        if !needs_timer {
            return Ok(());
        }

        let weak: Weak<RefCell<SimulationState<N, L>>> = Rc::downgrade(&self.state);
        let timer = self.scheduler.register(
            move |_elapsed| {
                let Some(strong) = weak.upgrade() else {
                    return TimerStatus::Done;
                };
                let Ok(mut state) = strong.try_borrow_mut() else {
                    warn!("Simulation busy, skipping frame");
                    return TimerStatus::Continue;
                };
                state.tick()
            },
            0.0,
        );
        self.state.borrow_mut().timer = Some(timer);
        Ok(())
    }
}

impl<N, L> ForceSimulation<N, L> {
    /// Ends the running phase. The queued timer removes itself next frame.
    pub fn stop(&self) {
        self.state.borrow_mut().stop();
    }

    /// Runs one tick immediately, outside the scheduler.
    pub fn tick(&self) -> TimerStatus {
        self.state.borrow_mut().tick()
    }

    pub fn alpha(&self) -> f64 {
        self.state.borrow().alpha()
    }

    pub fn phase(&self) -> Phase {
        self.state.borrow().phase()
    }

    /// Read access to the whole simulation state
    pub fn state(&self) -> Ref<'_, SimulationState<N, L>> {
        self.state.borrow()
    }

    pub fn nodes(&self) -> Ref<'_, [Node<N>]> {
        Ref::map(self.state.borrow(), SimulationState::nodes)
    }

    pub fn links(&self) -> Ref<'_, [Link<L>]> {
        Ref::map(self.state.borrow(), SimulationState::links)
    }

    pub fn node(&self, index: usize) -> Option<Ref<'_, Node<N>>> {
        Ref::filter_map(self.state.borrow(), |state| state.nodes().get(index)).ok()
    }

    pub fn config(&self) -> ForceConfig {
        self.state.borrow().config().clone()
    }

    /// Replaces the force parameters.
    ///
    /// Friction, gravity, theta, charge distance and size apply from the next
    /// tick; distances, strengths and charges from the next start.
    pub fn set_config(&self, config: ForceConfig) {
        self.state.borrow_mut().set_config(config);
    }

    /// Runs `f` on one node.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::UnknownNode`] if `index` is out of range.
    pub fn with_node_mut<R>(
        &self,
        index: usize,
        f: impl FnOnce(&mut Node<N>) -> R,
    ) -> Result<R, LayoutError> {
        let mut state = self.state.borrow_mut();
        let node_count = state.nodes().len();
        let node = state
            .nodes_mut()
            .get_mut(index)
            .ok_or(LayoutError::UnknownNode { index, node_count })?;
        Ok(f(node))
    }

    /// Appends a node and returns its index. It takes part in forces after
    /// the next [`start`](Self::start).
    pub fn push_node(&self, node: Node<N>) -> usize {
        self.state.borrow_mut().push_node(node)
    }

    /// Appends a link and returns its index. It takes part in forces after
    /// the next [`start`](Self::start).
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::InvalidLink`] if an endpoint is not a node
    /// index. The link is not added.
    pub fn push_link(&self, link: Link<L>) -> Result<usize, LayoutError> {
        self.state.borrow_mut().push_link(link)
    }

    /// Registers a lifecycle listener
    pub fn on<F>(&self, listener: F)
    where
        F: FnMut(&Event, &[Node<N>]) + 'static,
    {
        self.state.borrow_mut().add_listener(Box::new(listener));
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }
}

impl<N, L> fmt::Debug for ForceSimulation<N, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.state.try_borrow() {
            Ok(state) => f.debug_tuple("ForceSimulation").field(&*state).finish(),
            Err(_) => f.write_str("ForceSimulation(<busy>)"),
        }
    }
}
