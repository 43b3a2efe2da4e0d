//! Pointer gestures on a running layout.
//!
//! The [`DragController`] translates drag and hover gestures into pin
//! reasons and position overrides. Pinned nodes keep their position through
//! ticks, so a dragged node follows the pointer while the rest of the graph
//! reacts to it.
//!
//! # Example
//!
//! ```
//! # use lodestone::drag::DragController;
//! # use lodestone::scheduler::Scheduler;
//! # use lodestone::simulation::{Link, Node, SimulationBuilder};
//! let scheduler = Scheduler::new();
//! let simulation = SimulationBuilder::new(
//!     vec![Node::at(0.0, 0.0), Node::at(20.0, 0.0)],
//!     vec![Link::new(0, 1)],
//! )
//! .build(&scheduler);
//! simulation.start().unwrap();
//!
//! let mut drag = DragController::new(simulation.clone());
//! drag.drag_start(1).unwrap();
//! drag.drag(1, 50.0, 40.0).unwrap();
//! simulation.tick();
//! assert_eq!((simulation.nodes()[1].x(), simulation.nodes()[1].y()), (50.0, 40.0));
//! drag.drag_end(1).unwrap();
//! ```

use log::debug;

use lodestone_core::{geometry::Point, pin::Pins};

use crate::{LayoutError, simulation::ForceSimulation};

/// Applies pointer gestures to one simulation.
#[derive(Debug, Clone)]
pub struct DragController<N = (), L = ()> {
    simulation: ForceSimulation<N, L>,
    /// Node under an active drag gesture
    dragging: Option<usize>,
    hovering: Option<usize>,
}

impl<N: 'static, L: 'static> DragController<N, L> {
    pub fn new(simulation: ForceSimulation<N, L>) -> Self {
        Self {
            simulation,
            dragging: None,
            hovering: None,
        }
    }

    pub fn simulation(&self) -> &ForceSimulation<N, L> {
        &self.simulation
    }

    /// Node currently being dragged
    pub fn dragging(&self) -> Option<usize> {
        self.dragging
    }

    /// Node currently under the pointer
    pub fn hovering(&self) -> Option<usize> {
        self.hovering
    }

    /// Pins the node for dragging and freezes it where it is.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::UnknownNode`] if `index` is out of range.
    pub fn drag_start(&mut self, index: usize) -> Result<(), LayoutError> {
        self.simulation.with_node_mut(index, |node| {
            node.pin(Pins::DRAG);
            node.previous = node.position;
        })?;
        debug!(node = index; "Drag started");
        self.dragging = Some(index);
        Ok(())
    }

    /// Moves the node to the pointer and wakes the simulation.
    ///
    /// A simulation that was never started is prepared and started here.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::UnknownNode`] if `index` is out of range, or
    /// the preparation error of a never-started simulation.
    pub fn drag(&mut self, index: usize, x: f64, y: f64) -> Result<(), LayoutError> {
        self.simulation.with_node_mut(index, |node| {
            let pointer = Point::new(x, y);
            node.previous = pointer;
            node.position = pointer;
        })?;
        self.simulation.resume()
    }

    /// Releases the drag pin. Other pin reasons keep the node in place.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::UnknownNode`] if `index` is out of range.
    pub fn drag_end(&mut self, index: usize) -> Result<(), LayoutError> {
        self.simulation
            .with_node_mut(index, |node| node.unpin(Pins::DRAG))?;
        debug!(node = index; "Drag ended");
        if self.dragging == Some(index) {
            self.dragging = None;
        }
        Ok(())
    }

    /// Pins the node while the pointer rests on it.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::UnknownNode`] if `index` is out of range.
    pub fn hover_enter(&mut self, index: usize) -> Result<(), LayoutError> {
        self.simulation.with_node_mut(index, |node| {
            node.pin(Pins::HOVER);
            node.previous = node.position;
        })?;
        self.hovering = Some(index);
        Ok(())
    }

    /// Releases the hover pin.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::UnknownNode`] if `index` is out of range.
    pub fn hover_leave(&mut self, index: usize) -> Result<(), LayoutError> {
        self.simulation
            .with_node_mut(index, |node| node.unpin(Pins::HOVER))?;
        if self.hovering == Some(index) {
            self.hovering = None;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::{
        scheduler::{ManualClock, Scheduler},
        simulation::{Link, Node, Phase, SimulationBuilder},
    };

    fn simulation() -> (Scheduler, ForceSimulation) {
        let scheduler = Scheduler::with_clock(Rc::new(ManualClock::new()));
        let simulation = SimulationBuilder::new(
            vec![Node::at(0.0, 0.0), Node::at(20.0, 0.0), Node::at(0.0, 20.0)],
            vec![Link::new(0, 1), Link::new(0, 2)],
        )
        .with_seed(9)
        .build(&scheduler);
        (scheduler, simulation)
    }

    #[test]
    fn test_drag_start_pins_and_freezes() {
        let (_, simulation) = simulation();
        simulation
            .with_node_mut(1, |node| node.set_previous(18.0, 1.0))
            .unwrap();

        let mut drag = DragController::new(simulation.clone());
        drag.drag_start(1).unwrap();

        let node = simulation.node(1).unwrap();
        assert_eq!(node.pins(), Pins::DRAG);
        assert_eq!(node.previous(), node.position());
        assert_eq!(drag.dragging(), Some(1));
    }

    #[test]
    fn test_dragged_node_follows_pointer() {
        let (_, simulation) = simulation();
        simulation.start().unwrap();

        let mut drag = DragController::new(simulation.clone());
        drag.drag_start(2).unwrap();
        for step in 1..=5 {
            let target = (f64::from(step) * 10.0, 50.0);
            drag.drag(2, target.0, target.1).unwrap();
            simulation.tick();
            let node = simulation.node(2).unwrap();
            assert_eq!((node.x(), node.y()), target);
        }
    }

    #[test]
    fn test_drag_resumes_stopped_simulation() {
        let (scheduler, simulation) = simulation();
        simulation.start().unwrap();
        simulation.stop();
        scheduler.flush();
        assert!(scheduler.is_empty());

        let mut drag = DragController::new(simulation.clone());
        drag.drag(0, 5.0, 5.0).unwrap();

        assert_eq!(simulation.phase(), Phase::Running);
        assert_eq!(scheduler.len(), 1);
    }

    #[test]
    fn test_drag_starts_never_started_simulation() {
        let (scheduler, simulation) = simulation();
        let mut drag = DragController::new(simulation.clone());
        drag.drag_start(0).unwrap();
        drag.drag(0, 3.0, 3.0).unwrap();

        assert_eq!(simulation.phase(), Phase::Running);
        assert_eq!(simulation.state().distances(), &[20.0, 20.0]);
        scheduler.flush();
        assert_eq!(simulation.state().ticks(), 1);
        assert_eq!(simulation.node(0).unwrap().position(), Point::new(3.0, 3.0));
    }

    #[test]
    fn test_drag_end_keeps_other_pins() {
        let (_, simulation) = simulation();
        let mut drag = DragController::new(simulation.clone());

        drag.hover_enter(0).unwrap();
        drag.drag_start(0).unwrap();
        drag.drag_end(0).unwrap();

        let node = simulation.node(0).unwrap();
        assert_eq!(node.pins(), Pins::HOVER);
        assert!(node.is_fixed());
        assert_eq!(drag.dragging(), None);
        assert_eq!(drag.hovering(), Some(0));
    }

    #[test]
    fn test_drag_end_leaves_user_pin() {
        let (_, simulation) = simulation();
        simulation
            .with_node_mut(1, |node| node.pin(Pins::USER))
            .unwrap();

        let mut drag = DragController::new(simulation.clone());
        drag.drag_start(1).unwrap();
        drag.drag_end(1).unwrap();

        assert_eq!(simulation.node(1).unwrap().pins(), Pins::USER);
    }

    #[test]
    fn test_hover_leave_unpins() {
        let (_, simulation) = simulation();
        let mut drag = DragController::new(simulation.clone());
        drag.hover_enter(2).unwrap();
        drag.hover_leave(2).unwrap();

        assert!(!simulation.node(2).unwrap().is_fixed());
        assert_eq!(drag.hovering(), None);
    }

    #[test]
    fn test_unknown_node() {
        let (_, simulation) = simulation();
        let mut drag = DragController::new(simulation);

        for result in [
            drag.drag_start(3),
            drag.drag(3, 0.0, 0.0),
            drag.drag_end(3),
            drag.hover_enter(3),
            drag.hover_leave(3),
        ] {
            assert!(matches!(
                result,
                Err(LayoutError::UnknownNode {
                    index: 3,
                    node_count: 3
                })
            ));
        }
        assert_eq!(drag.dragging(), None);
    }
}
