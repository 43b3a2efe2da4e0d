//! Configuration types for force layouts.
//!
//! All types implement [`serde::Deserialize`] and can be loaded from TOML.
//! Missing keys fall back to the defaults of a classic force layout.
//!
//! # Overview
//!
//! - [`ForceConfig`] - Simulation-wide force parameters.
//! - [`GraphConfig`] - Force parameters plus a graph to lay out.
//! - [`NodeConfig`] / [`LinkConfig`] - Graph entries of a [`GraphConfig`].
//!
//! # Example
//!
//! ```
//! # use lodestone::config::GraphConfig;
//! let config = GraphConfig::from_toml_str(
//!     r#"
//!     size = [400.0, 300.0]
//!     charge = -60.0
//!
//!     [[nodes]]
//!     x = 10.0
//!     y = 20.0
//!     fixed = true
//!
//!     [[nodes]]
//!
//!     [[links]]
//!     source = 0
//!     target = 1
//!     distance = 50.0
//!     "#,
//! )
//! .unwrap();
//!
//! assert_eq!(config.forces().charge(), -60.0);
//! assert_eq!(config.forces().friction(), 0.9);
//! assert_eq!(config.nodes().len(), 2);
//! ```

use std::{fs, path::Path};

use log::debug;
use serde::Deserialize;

use lodestone_core::geometry::Size;

use crate::{
    LayoutError,
    simulation::{Link, Node, SimulationBuilder},
};

/// Simulation-wide force parameters.
///
/// Per-link and per-node values set on the [`SimulationBuilder`] take
/// precedence over the constants configured here.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ForceConfig {
    /// Viewport dimensions; gravity pulls toward its center.
    size: Size,

    /// Velocity retained per tick, in `[0, 1]`.
    friction: f64,

    /// Strength of the pull toward the viewport center.
    gravity: f64,

    /// Node charge; negative values repel.
    charge: f64,

    /// Pairs farther apart than this do not repel each other.
    charge_distance: f64,

    /// Barnes-Hut accuracy; `0` computes every pair exactly.
    theta: f64,

    /// Rest length of links.
    link_distance: f64,

    /// Link stiffness, in `[0, 1]`.
    link_strength: f64,

    /// Cooling parameter set when the simulation starts or resumes.
    alpha: f64,

    /// Seed for random placement and coincidence jitter.
    seed: Option<u64>,
}

impl ForceConfig {
    pub fn size(&self) -> Size {
        self.size
    }

    pub fn friction(&self) -> f64 {
        self.friction
    }

    pub fn gravity(&self) -> f64 {
        self.gravity
    }

    pub fn charge(&self) -> f64 {
        self.charge
    }

    pub fn charge_distance(&self) -> f64 {
        self.charge_distance
    }

    pub fn theta(&self) -> f64 {
        self.theta
    }

    pub fn link_distance(&self) -> f64 {
        self.link_distance
    }

    pub fn link_strength(&self) -> f64 {
        self.link_strength
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    pub fn with_size(mut self, size: Size) -> Self {
        self.size = size;
        self
    }

    pub fn with_friction(mut self, friction: f64) -> Self {
        self.friction = friction;
        self
    }

    pub fn with_gravity(mut self, gravity: f64) -> Self {
        self.gravity = gravity;
        self
    }

    pub fn with_charge(mut self, charge: f64) -> Self {
        self.charge = charge;
        self
    }

    pub fn with_charge_distance(mut self, charge_distance: f64) -> Self {
        self.charge_distance = charge_distance;
        self
    }

    pub fn with_theta(mut self, theta: f64) -> Self {
        self.theta = theta;
        self
    }

    pub fn with_link_distance(mut self, link_distance: f64) -> Self {
        self.link_distance = link_distance;
        self
    }

    pub fn with_link_strength(mut self, link_strength: f64) -> Self {
        self.link_strength = link_strength;
        self
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Checks that every parameter is usable by the simulation.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::InvalidParameter`] naming the first bad value.
    pub fn validate(&self) -> Result<(), LayoutError> {
        let checks = [
            ("size.width", self.size.width(), self.size.width().is_finite()),
            ("size.height", self.size.height(), self.size.height().is_finite()),
            ("friction", self.friction, self.friction.is_finite()),
            ("gravity", self.gravity, self.gravity.is_finite()),
            ("charge", self.charge, self.charge.is_finite()),
            (
                "charge_distance",
                self.charge_distance,
                self.charge_distance > 0.0,
            ),
            (
                "theta",
                self.theta,
                self.theta.is_finite() && self.theta >= 0.0,
            ),
            ("link_distance", self.link_distance, self.link_distance.is_finite()),
            ("link_strength", self.link_strength, self.link_strength.is_finite()),
            ("alpha", self.alpha, self.alpha.is_finite()),
        ];

        match checks.into_iter().find(|(_, _, ok)| !ok) {
            Some((name, value, _)) => Err(LayoutError::InvalidParameter { name, value }),
            None => Ok(()),
        }
    }
}

impl Default for ForceConfig {
    fn default() -> Self {
        Self {
            size: Size::default(),
            friction: 0.9,
            gravity: 0.1,
            charge: -30.0,
            charge_distance: f64::INFINITY,
            theta: 0.8,
            link_distance: 20.0,
            link_strength: 1.0,
            alpha: 0.1,
            seed: None,
        }
    }
}

/// A node entry of a [`GraphConfig`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct NodeConfig {
    /// Initial x coordinate; chosen by the simulation when absent.
    #[serde(default)]
    x: Option<f64>,

    /// Initial y coordinate; chosen by the simulation when absent.
    #[serde(default)]
    y: Option<f64>,

    /// Keeps the node at its initial position.
    #[serde(default)]
    fixed: bool,
}

impl NodeConfig {
    pub fn x(&self) -> Option<f64> {
        self.x
    }

    pub fn y(&self) -> Option<f64> {
        self.y
    }

    pub fn fixed(&self) -> bool {
        self.fixed
    }

    fn to_node(&self) -> Node {
        Node::at(self.x.unwrap_or(f64::NAN), self.y.unwrap_or(f64::NAN)).fixed(self.fixed)
    }
}

/// A link entry of a [`GraphConfig`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LinkConfig {
    source: usize,
    target: usize,

    /// Rest length override for this link.
    #[serde(default)]
    distance: Option<f64>,

    /// Stiffness override for this link.
    #[serde(default)]
    strength: Option<f64>,
}

impl LinkConfig {
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

    fn to_link(&self) -> Link {
        let mut link = Link::new(self.source, self.target);
        if let Some(distance) = self.distance {
            link = link.with_distance(distance);
        }
        if let Some(strength) = self.strength {
            link = link.with_strength(strength);
        }
        link
    }
}

/// Force parameters together with a graph to lay out.
///
/// The force keys sit at the top level of the document, next to the
/// `[[nodes]]` and `[[links]]` arrays.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GraphConfig {
    #[serde(flatten)]
    forces: ForceConfig,

    #[serde(default)]
    nodes: Vec<NodeConfig>,

    #[serde(default)]
    links: Vec<LinkConfig>,
}

impl GraphConfig {
    /// Parses a configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::Config`] if the text is not valid TOML or does
    /// not match the expected shape.
    pub fn from_toml_str(text: &str) -> Result<Self, LayoutError> {
        let config: Self = toml::from_str(text)?;
        debug!(
            nodes = config.nodes.len(),
            links = config.links.len();
            "Graph configuration parsed"
        );
        Ok(config)
    }

    /// Reads and parses a TOML configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::Io`] if the file cannot be read, or
    /// [`LayoutError::Config`] if it cannot be parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LayoutError> {
        let path = path.as_ref();
        debug!(path:? = path; "Loading graph configuration");
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn forces(&self) -> &ForceConfig {
        &self.forces
    }

    pub fn nodes(&self) -> &[NodeConfig] {
        &self.nodes
    }

    pub fn links(&self) -> &[LinkConfig] {
        &self.links
    }

    /// Creates a simulation builder for the configured graph.
    ///
    /// Link endpoints are checked when the simulation starts.
    pub fn to_builder(&self) -> SimulationBuilder {
        SimulationBuilder::new(
            self.nodes.iter().map(NodeConfig::to_node).collect(),
            self.links.iter().map(LinkConfig::to_link).collect(),
        )
        .with_config(self.forces.clone())
    }
}
