//! Lodestone - Force-directed graph layout.
//!
//! Positions graph nodes with a damped physics simulation: links act as
//! springs, nodes repel each other through a Barnes-Hut approximation, and
//! gravity keeps the layout centered. A cooperative [`scheduler`] drives the
//! simulation one tick per frame, and the [`drag`] module feeds pointer
//! gestures back into it.
//!
//! # Example
//!
//! ```
//! use std::rc::Rc;
//!
//! use lodestone::{
//!     config::GraphConfig,
//!     scheduler::{ManualClock, Scheduler},
//!     simulation::Phase,
//! };
//!
//! let config = GraphConfig::from_toml_str(
//!     r#"
//!     size = [200.0, 200.0]
//!     seed = 3
//!
//!     [[nodes]]
//!     [[nodes]]
//!     [[nodes]]
//!
//!     [[links]]
//!     source = 0
//!     target = 1
//!
//!     [[links]]
//!     source = 1
//!     target = 2
//!     "#,
//! )?;
//!
//! let clock = Rc::new(ManualClock::new());
//! let scheduler = Scheduler::with_clock(clock.clone());
//! let simulation = config.to_builder().build(&scheduler);
//! simulation.start()?;
//!
//! while !scheduler.is_empty() {
//!     scheduler.flush();
//!     clock.advance(16.0);
//! }
//! assert_eq!(simulation.phase(), Phase::Stopped);
//! assert!(simulation.nodes().iter().all(|node| node.position().is_finite()));
//! # Ok::<(), lodestone::LayoutError>(())
//! ```

pub mod config;
pub mod drag;
pub mod quadtree;
pub mod scheduler;
pub mod simulation;

mod error;

pub use lodestone_core::{geometry, pin};

pub use error::{LayoutError, LinkEndpoint};
