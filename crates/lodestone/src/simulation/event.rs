//! Lifecycle events.

use super::node::Node;

/// A lifecycle notification emitted by a simulation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Event {
    /// The simulation entered the running phase
    Start { alpha: f64 },
    /// One tick finished; node positions are updated
    Tick { alpha: f64 },
    /// The simulation stopped, either converged or by request
    End { alpha: f64 },
}

impl Event {
    pub fn alpha(&self) -> f64 {
        match *self {
            Self::Start { alpha } | Self::Tick { alpha } | Self::End { alpha } => alpha,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Start { .. } => "start",
            Self::Tick { .. } => "tick",
            Self::End { .. } => "end",
        }
    }
}

/// Callback receiving every lifecycle event along with the current nodes.
///
/// Listeners run while the simulation is borrowed; calling back into the
/// same simulation from a listener panics.
pub type Listener<N> = Box<dyn FnMut(&Event, &[Node<N>])>;
