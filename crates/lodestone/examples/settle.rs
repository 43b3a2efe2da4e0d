//! Example: Settling a graph with the timeout-driven scheduler
//!
//! Lays out the graph from a TOML file given as the first argument, or a
//! small wheel graph when none is given, and prints the final positions.
//!
//! ```text
//! RUST_LOG=debug cargo run --example settle -- graph.toml
//! ```

use std::{env, time::Duration};

use log::info;

use lodestone::{
    config::{ForceConfig, GraphConfig},
    scheduler::Scheduler,
    simulation::{Event, Link, Node, SimulationBuilder},
};

fn wheel(spokes: usize) -> SimulationBuilder {
    let nodes = (0..=spokes).map(|_| Node::new()).collect();
    let mut links = Vec::with_capacity(spokes * 2);
    for i in 1..=spokes {
        links.push(Link::new(0, i));
        links.push(Link::new(i, i % spokes + 1));
    }
    SimulationBuilder::new(nodes, links)
        .with_config(ForceConfig::default().with_size([400.0, 400.0].into()))
        .with_link_distance(60.0)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let builder = match env::args().nth(1) {
        Some(path) => GraphConfig::load(path)?.to_builder(),
        None => wheel(8),
    };

    let scheduler = Scheduler::new();
    let simulation = builder
        .with_listener(|event, _nodes| {
            if let Event::End { .. } = event {
                info!("Layout settled");
            }
        })
        .build(&scheduler);

    simulation.start()?;
    scheduler.run(Duration::from_millis(16));

    for node in simulation.nodes().iter() {
        println!("{:>3}: ({:>8.2}, {:>8.2})", node.index(), node.x(), node.y());
    }
    Ok(())
}
