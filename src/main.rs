use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::info;

use traffic_flow::simulation::{
    EdgeKey, EventKind, FleetConfig, GridGenerator, NodeId, RoadGenerator, RoadNetwork, SimConfig,
    Simulation, StrategyKind, TrafficEvent,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Strategy {
    Dijkstra,
    Astar,
}

impl From<Strategy> for StrategyKind {
    fn from(strategy: Strategy) -> Self {
        match strategy {
            Strategy::Dijkstra => StrategyKind::Dijkstra,
            Strategy::Astar => StrategyKind::AStar,
        }
    }
}

#[derive(Parser)]
#[command(name = "traffic_flow")]
#[command(about = "Headless traffic simulation on a grid road network")]
struct Cli {
    /// Number of simulation ticks to run
    #[arg(long, default_value = "1000")]
    ticks: u64,

    /// Time delta per tick in seconds
    #[arg(long, default_value = "0.1")]
    delta: f64,

    /// Routing algorithm
    #[arg(long, value_enum, default_value = "astar")]
    strategy: Strategy,

    /// Cars kept on the road
    #[arg(long, default_value = "20")]
    cars: usize,

    /// Trucks kept on the road
    #[arg(long, default_value = "5")]
    trucks: usize,

    /// Seed for trip generation
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Intersections per side of the square grid
    #[arg(long, default_value = "3")]
    grid: usize,

    /// Seconds a vehicle may stay stranded before its trip fails
    #[arg(long, default_value = "30")]
    stranded_timeout: f64,

    /// Re-route active vehicles every this many seconds
    #[arg(long)]
    reroute_interval: Option<f64>,

    /// Re-route when a vehicle enters a congested road
    #[arg(long)]
    reroute_on_congestion: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    run_headless(&cli)
}

/// Run the simulation in headless mode (no graphics)
fn run_headless(cli: &Cli) -> Result<()> {
    info!("Running traffic simulation in headless mode...");
    info!("Ticks: {}, Delta: {}s", cli.ticks, cli.delta);

    let generator = GridGenerator {
        rows: cli.grid,
        cols: cli.grid,
        ..GridGenerator::default()
    };
    let mut network = RoadNetwork::new();
    generator
        .generate(&mut network)
        .context("failed to build the grid road network")?;

    let config = SimConfig {
        tick_duration: cli.delta,
        strategy: cli.strategy.into(),
        stranded_timeout: cli.stranded_timeout,
        reroute_interval: cli.reroute_interval,
        reroute_on_congestion: cli.reroute_on_congestion,
        fleet: Some(FleetConfig {
            cars: cli.cars,
            trucks: cli.trucks,
            seed: cli.seed,
        }),
        ..SimConfig::default()
    };
    let mut sim = Simulation::new(network, config).with_events(demo_events(cli.grid));

    info!("Initial state:");
    sim.log_summary();

    // Calculate how many ticks equal 1 second of simulation time
    let ticks_per_second = (1.0 / sim.config().tick_duration).ceil().max(1.0) as u64;

    let mut tick = 0;
    while tick < cli.ticks {
        let ticks_to_run = ticks_per_second.min(cli.ticks - tick);
        for _ in 0..ticks_to_run {
            tick += 1;
            sim.step(cli.delta)
                .with_context(|| format!("simulation failed at tick {}", tick))?;
        }

        info!("--- After tick {} ({:.1}s simulated time) ---", tick, sim.time());
        sim.log_summary();
    }

    sim.log_final_report();
    Ok(())
}

/// A closure, an incident and their recovery in the middle row of the grid
fn demo_events(grid: usize) -> Vec<TrafficEvent> {
    if grid < 2 {
        return Vec::new();
    }
    let node = |row: usize, col: usize| NodeId(row * grid + col);
    let mid = grid / 2;
    let closed = EdgeKey::new(node(mid, 0), node(mid, 1));
    let slowed = EdgeKey::new(node(0, 1), node(1, 1));

    vec![
        TrafficEvent::incident(10.0, slowed, 0.3),
        TrafficEvent::close(20.0, closed),
        TrafficEvent::close(20.0, closed.reversed()),
        TrafficEvent::new(45.0, slowed, EventKind::ClearIncident),
        TrafficEvent::reopen(60.0, closed),
        TrafficEvent::reopen(60.0, closed.reversed()),
    ]
}
