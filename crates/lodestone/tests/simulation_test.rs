//! Integration tests for whole-layout behavior
//!
//! These drive simulations through the public API only, the way a host
//! application would.

use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use float_cmp::approx_eq;
use proptest::prelude::*;

use lodestone::{
    LayoutError,
    config::{ForceConfig, GraphConfig},
    drag::DragController,
    geometry::{Extent, Point},
    quadtree::{Action, Quadtree},
    scheduler::{ManualClock, Scheduler, TimerStatus, Wake},
    simulation::{
        ALPHA_MIN, Event, ForceSimulation, Link, Node, Param, Phase, SimulationBuilder,
    },
};

/// Where default gravity and repulsion balance two nodes joined by a
/// 30-unit link
const SETTLED_PAIR_DISTANCE: f64 = 28.98;

fn manual_scheduler() -> (Rc<ManualClock>, Scheduler) {
    let clock = Rc::new(ManualClock::new());
    let scheduler = Scheduler::with_clock(clock.clone());
    (clock, scheduler)
}

/// Steps frames until the queue drains, returning the number of frames
fn run_to_end(clock: &ManualClock, scheduler: &Scheduler) -> usize {
    let mut frames = 0;
    while !scheduler.is_empty() {
        scheduler.flush();
        clock.advance(16.0);
        frames += 1;
        assert!(frames < 10_000, "simulation did not converge");
    }
    frames
}

fn distance<N, L>(simulation: &ForceSimulation<N, L>, a: usize, b: usize) -> f64 {
    let nodes = simulation.nodes();
    nodes[a].position().distance(nodes[b].position())
}

fn place(start: Option<(f64, f64)>) -> Node {
    start.map_or_else(Node::new, |(x, y)| Node::at(x, y))
}

// ===================
// Two-node convergence
// ===================

fn start_strategy() -> impl Strategy<Value = Option<(f64, f64)>> {
    prop::option::of((-50.0f64..50.0, -50.0f64..50.0))
}

/// A linked pair ends at the same distance from any start, placed or not.
fn check_pair_settles(
    seed: u64,
    first: Option<(f64, f64)>,
    second: Option<(f64, f64)>,
) -> Result<(), TestCaseError> {
    let (clock, scheduler) = manual_scheduler();
    let simulation = SimulationBuilder::new(
        vec![place(first), place(second)],
        vec![Link::new(0, 1).with_distance(30.0)],
    )
    .with_seed(seed)
    .build(&scheduler);

    prop_assert!(simulation.resume_with(0.1).is_ok());
    run_to_end(&clock, &scheduler);

    prop_assert_eq!(simulation.phase(), Phase::Stopped);
    let d = distance(&simulation, 0, 1);
    prop_assert!((d - SETTLED_PAIR_DISTANCE).abs() < 0.01, "distance was {}", d);
    Ok(())
}

/// With gravity and repulsion off, the link alone sets the distance.
fn check_pair_settles_at_rest_length(
    seed: u64,
    first: (f64, f64),
    second: (f64, f64),
) -> Result<(), TestCaseError> {
    let (clock, scheduler) = manual_scheduler();
    let simulation = SimulationBuilder::new(
        vec![Node::at(first.0, first.1), Node::at(second.0, second.1)],
        vec![Link::new(0, 1).with_distance(30.0)],
    )
    .with_config(ForceConfig::default().with_gravity(0.0).with_charge(0.0))
    .with_seed(seed)
    .build(&scheduler);

    prop_assert!(simulation.start().is_ok());
    run_to_end(&clock, &scheduler);

    let d = distance(&simulation, 0, 1);
    prop_assert!((d - 30.0).abs() <= 1.0, "distance was {}", d);
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn pair_settles_from_any_start(
        seed in any::<u64>(),
        first in start_strategy(),
        second in start_strategy(),
    ) {
        check_pair_settles(seed, first, second)?;
    }

    #[test]
    fn pair_settles_at_rest_length_without_other_forces(
        seed in any::<u64>(),
        first in (-50.0f64..50.0, -50.0f64..50.0),
        second in (-50.0f64..50.0, -50.0f64..50.0),
    ) {
        prop_assume!((first.0 - second.0).hypot(first.1 - second.1) > 1.0);
        check_pair_settles_at_rest_length(seed, first, second)?;
    }
}

#[test]
fn test_manual_ticks_match_scheduled_run() {
    let build = |scheduler: &Scheduler| {
        SimulationBuilder::new(
            vec![Node::at(0.0, 0.0), Node::at(4.0, 3.0), Node::at(-2.0, 6.0)],
            vec![Link::new(0, 1), Link::new(1, 2)],
        )
        .with_seed(5)
        .build(scheduler)
    };

    let (clock, scheduler) = manual_scheduler();
    let scheduled = build(&scheduler);
    scheduled.start().unwrap();
    run_to_end(&clock, &scheduler);

    // Stepping by hand without ever driving the scheduler
    let (_, idle_scheduler) = manual_scheduler();
    let manual = build(&idle_scheduler);
    manual.start().unwrap();
    while manual.tick() == TimerStatus::Continue {}

    for (a, b) in scheduled.nodes().iter().zip(manual.nodes().iter()) {
        assert_eq!(a.position(), b.position());
    }
}

#[test]
fn test_fixed_middle_node_gives_symmetric_layout() {
    let (clock, scheduler) = manual_scheduler();
    // Exact repulsion and no gravity, so nothing but the graph breaks symmetry
    let config = ForceConfig::default()
        .with_gravity(0.0)
        .with_theta(0.0)
        .with_seed(1);
    let simulation = SimulationBuilder::new(
        vec![
            Node::at(-10.0, 0.0),
            Node::at(0.0, 0.0).fixed(true),
            Node::at(10.0, 0.0),
        ],
        vec![Link::new(0, 1), Link::new(1, 2)],
    )
    .with_config(config)
    .build(&scheduler);

    simulation.start().unwrap();
    run_to_end(&clock, &scheduler);

    let nodes = simulation.nodes();
    assert_eq!(nodes[1].position(), Point::new(0.0, 0.0));
    assert!(
        approx_eq!(f64, nodes[0].x(), -nodes[2].x(), epsilon = 0.05),
        "{} vs {}",
        nodes[0].x(),
        nodes[2].x()
    );
    assert!(nodes[0].x() < -20.0);
    assert!(approx_eq!(f64, nodes[0].y(), 0.0, epsilon = 1e-9));
    assert!(approx_eq!(f64, nodes[2].y(), 0.0, epsilon = 1e-9));
}

#[test]
fn test_alpha_decreases_until_stopped() {
    let (_, scheduler) = manual_scheduler();
    let simulation = SimulationBuilder::new(
        vec![Node::at(0.0, 0.0), Node::at(1.0, 1.0), Node::at(2.0, 0.0)],
        vec![Link::new(0, 1), Link::new(1, 2), Link::new(2, 0)],
    )
    .with_seed(8)
    .build(&scheduler);
    simulation.start().unwrap();

    let mut previous = simulation.alpha();
    loop {
        let status = simulation.tick();
        let alpha = simulation.alpha();
        if status == TimerStatus::Done {
            assert_eq!(alpha, 0.0);
            assert_eq!(simulation.phase(), Phase::Stopped);
            break;
        }
        assert!(alpha < previous);
        assert!(alpha >= ALPHA_MIN);
        assert_eq!(simulation.phase(), Phase::Running);
        previous = alpha;
    }
}

#[test]
fn test_fixed_nodes_unchanged_through_run() {
    let (clock, scheduler) = manual_scheduler();
    let simulation = SimulationBuilder::new(
        vec![
            Node::at(50.0, 50.0).fixed(true),
            Node::new(),
            Node::new(),
            Node::at(-20.0, 5.0).fixed(true),
        ],
        vec![Link::new(0, 1), Link::new(1, 2), Link::new(2, 3)],
    )
    .with_config(ForceConfig::default().with_size([100.0, 100.0].into()))
    .with_seed(77)
    .build(&scheduler);

    let positions = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&positions);
    simulation.on(move |event, nodes| {
        if let Event::Tick { .. } = event {
            sink.borrow_mut().push((nodes[0].position(), nodes[3].position()));
        }
    });

    simulation.start().unwrap();
    run_to_end(&clock, &scheduler);

    let positions = positions.borrow();
    assert!(!positions.is_empty());
    for &(first, last) in positions.iter() {
        assert_eq!(first, Point::new(50.0, 50.0));
        assert_eq!(last, Point::new(-20.0, 5.0));
    }
}

#[test]
fn test_coincident_nodes_separate() {
    let (clock, scheduler) = manual_scheduler();
    let simulation = SimulationBuilder::from_nodes(vec![Node::at(5.0, 5.0); 4])
        .with_seed(12)
        .build(&scheduler);

    simulation.start().unwrap();
    run_to_end(&clock, &scheduler);

    let nodes = simulation.nodes();
    for (i, a) in nodes.iter().enumerate() {
        assert!(a.position().is_finite());
        for b in &nodes[i + 1..] {
            assert_ne!(a.position(), b.position());
        }
    }
}

#[test]
fn test_invalid_link_rejected_at_start() {
    let (_, scheduler) = manual_scheduler();
    let config = GraphConfig::from_toml_str(
        r#"
        [[nodes]]
        [[nodes]]

        [[links]]
        source = 0
        target = 2
        "#,
    )
    .unwrap();

    let simulation = config.to_builder().build(&scheduler);
    let err = simulation.start().unwrap_err();
    assert!(matches!(err, LayoutError::InvalidLink { link: 0, index: 2, .. }));
    assert_eq!(simulation.phase(), Phase::Idle);
    assert!(scheduler.is_empty());
}

#[test]
fn test_config_drives_layout() {
    let (clock, scheduler) = manual_scheduler();
    let config = GraphConfig::from_toml_str(
        r#"
        size = [300.0, 300.0]
        charge = 0.0
        gravity = 0.0
        link_distance = 40.0
        seed = 4

        [[nodes]]
        x = 0.0
        y = 0.0
        fixed = true

        [[nodes]]
        x = 10.0
        y = 0.0
        "#,
    )
    .unwrap();

    let builder = config.to_builder();
    // Links can be added on top of a configured graph
    let simulation = SimulationBuilder::new(builder.nodes().to_vec(), vec![Link::new(0, 1)])
        .with_config(builder.config().clone())
        .build(&scheduler);

    simulation.start().unwrap();
    run_to_end(&clock, &scheduler);

    let nodes = simulation.nodes();
    assert_eq!(nodes[0].position(), Point::new(0.0, 0.0));
    assert!((nodes[1].x() - 40.0).abs() < 1.0, "x was {}", nodes[1].x());
}

#[test]
fn test_drag_moves_graph() {
    let (clock, scheduler) = manual_scheduler();
    let simulation = SimulationBuilder::new(
        vec![Node::at(0.0, 0.0), Node::at(20.0, 0.0)],
        vec![Link::new(0, 1)],
    )
    .with_seed(3)
    .build(&scheduler);
    simulation.start().unwrap();
    run_to_end(&clock, &scheduler);

    let mut drag = DragController::new(simulation.clone());
    drag.drag_start(0).unwrap();
    drag.drag(0, 500.0, 500.0).unwrap();
    assert_eq!(simulation.phase(), Phase::Running);

    run_to_end(&clock, &scheduler);
    drag.drag_end(0).unwrap();

    let nodes = simulation.nodes();
    assert_eq!(nodes[0].position(), Point::new(500.0, 500.0));
    // The linked node followed the dragged one, held back by gravity
    assert!(nodes[1].x() > 300.0 && nodes[1].y() > 300.0);
    assert!(nodes[1].position().distance(Point::new(500.0, 500.0)) < 200.0);
}

#[test]
fn test_drag_on_never_started_simulation() {
    let (clock, scheduler) = manual_scheduler();
    let simulation =
        SimulationBuilder::new(vec![Node::new(), Node::new()], vec![Link::new(0, 1)])
            .with_seed(6)
            .build(&scheduler);

    let mut drag = DragController::new(simulation.clone());
    drag.drag_start(0).unwrap();
    drag.drag(0, 3.0, 3.0).unwrap();
    assert_eq!(simulation.phase(), Phase::Running);

    run_to_end(&clock, &scheduler);
    let nodes = simulation.nodes();
    assert_eq!(nodes[0].position(), Point::new(3.0, 3.0));
    assert!(nodes[1].position().is_finite());
}

#[test]
fn test_resume_places_unplaced_nodes() {
    let (_, scheduler) = manual_scheduler();
    let simulation = SimulationBuilder::new(vec![Node::new(), Node::new()], vec![Link::new(0, 1)])
        .with_seed(10)
        .build(&scheduler);

    simulation.resume().unwrap();
    for _ in 0..5 {
        assert_eq!(simulation.tick(), TimerStatus::Continue);
    }
    assert!(simulation.nodes().iter().all(|node| node.position().is_finite()));
}

#[test]
fn test_links_pushed_while_running() {
    let (clock, scheduler) = manual_scheduler();
    let simulation = SimulationBuilder::new(
        vec![Node::at(0.0, 0.0), Node::at(10.0, 0.0), Node::at(0.0, 10.0)],
        vec![Link::new(0, 1)],
    )
    .with_config(ForceConfig::default().with_charge(0.0).with_gravity(0.0))
    .with_seed(2)
    .build(&scheduler);
    simulation.start().unwrap();
    scheduler.flush();

    simulation.push_link(Link::new(1, 2).with_distance(50.0)).unwrap();
    let err = simulation.push_link(Link::new(0, 9)).unwrap_err();
    assert!(matches!(err, LayoutError::InvalidLink { index: 9, .. }));

    // Not part of the running layout
    run_to_end(&clock, &scheduler);
    assert!((distance(&simulation, 1, 2) - 50.0).abs() > 5.0);

    simulation.start().unwrap();
    run_to_end(&clock, &scheduler);
    assert!((distance(&simulation, 1, 2) - 50.0).abs() < 1.0);
}

#[test]
fn test_failed_restart_keeps_running_layout() {
    let (clock, scheduler) = manual_scheduler();
    let broken = Rc::new(Cell::new(false));
    let flag = Rc::clone(&broken);
    let simulation = SimulationBuilder::new(
        vec![Node::at(0.0, 0.0), Node::at(10.0, 0.0), Node::at(5.0, 8.0)],
        vec![Link::new(0, 1), Link::new(1, 2)],
    )
    .with_charge(Param::per_item(move |_: &Node, _| {
        if flag.get() { f64::NAN } else { -30.0 }
    }))
    .with_seed(21)
    .build(&scheduler);

    simulation.start().unwrap();
    for _ in 0..10 {
        scheduler.flush();
        clock.advance(16.0);
    }
    let alpha = simulation.alpha();

    broken.set(true);
    let err = simulation.start().unwrap_err();
    assert!(matches!(err, LayoutError::InvalidParameter { name: "charge", .. }));
    assert_eq!(simulation.phase(), Phase::Running);
    assert_eq!(simulation.alpha(), alpha);
    assert_eq!(simulation.state().charges(), &[-30.0, -30.0, -30.0]);

    run_to_end(&clock, &scheduler);
    assert_eq!(simulation.phase(), Phase::Stopped);
    assert!(simulation.nodes().iter().all(|node| node.position().is_finite()));
}

#[test]
fn test_build_within_covers_outside_points() {
    let points = [Point::new(100.0, 100.0), Point::new(200.0, 200.0)];
    let tree = Quadtree::build_within(&points, Extent::new(Point::new(0.0, 0.0), 4.0));

    assert!(points.iter().all(|&point| tree.root().extent().contains(point)));
    let mut visits = 0;
    tree.visit(|node| {
        if node.point().is_some() {
            visits += 1;
        }
        Action::Descend
    });
    assert_eq!(visits, 2);
}

#[test]
fn test_step_wake_hints() {
    let (clock, scheduler) = manual_scheduler();
    let simulation = SimulationBuilder::from_nodes(vec![Node::at(0.0, 0.0)])
        .with_seed(1)
        .build(&scheduler);

    assert_eq!(scheduler.step(), Wake::Idle);
    simulation.start().unwrap();
    assert_eq!(scheduler.step(), Wake::Frame);

    simulation.stop();
    clock.advance(16.0);
    assert_eq!(scheduler.step(), Wake::Idle);
}
