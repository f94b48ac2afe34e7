//! `city_grid` — morning rush hour over a synthetic 12×12 downtown grid.
//!
//! Cars, heavy vehicles and pedestrians spawn over the first 30 ticks with a
//! strong pull towards the centre.  Every intersection with more than two
//! drivable exits gets a traffic light.  At tick 40 the central intersection
//! is closed (an incident) and reopened at tick 90; in-flight vehicles that
//! needed it reroute.  Snapshots and tick summaries go to CSV.
//!
//! Run with:
//!   cargo run -p city_grid --release
//!   cargo run -p city_grid --release -- my_run.json
//!
//! The optional JSON file overrides any subset of [`DemoConfig`]:
//!
//! ```json
//! { "sim": { "total_ticks": 300, "seed": 7 },
//!   "population": { "cars": 4000, "spawn_window_ticks": 60 },
//!   "grid": { "rows": 30, "cols": 30 } }
//! ```

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

mod network;

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use log::info;
use memory_stats::memory_stats;
use serde::Deserialize;

use mt_core::{
    BlockTarget, LightConfig, PopulationConfig, SimConfig, SpawnDistribution, Tick, TravelMode,
};
use mt_output::{CsvWriter, SimOutputObserver};
use mt_sim::{Command, RunMetrics, SimBuilder, SimObserver, TickSummary};

use network::{build_network, GridConfig};

// ── Memory helper ─────────────────────────────────────────────────────────────

fn mem_mb() -> f64 {
    memory_stats()
        .map(|s| s.physical_mem as f64 / (1024.0 * 1024.0))
        .unwrap_or(0.0)
}

// ── Configuration ─────────────────────────────────────────────────────────────

/// A blockage applied at `at` and optionally lifted at `clear_at`.
#[derive(Clone, Debug, Deserialize)]
struct Incident {
    at:       u64,
    clear_at: Option<u64>,
    target:   BlockTarget,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
struct DemoConfig {
    sim:               SimConfig,
    population:        PopulationConfig,
    lights:            LightConfig,
    grid:              GridConfig,
    initial_blockages: Vec<BlockTarget>,
    /// Empty means one incident at the grid centre from tick 40 to 90.
    incidents:         Vec<Incident>,
    output_dir:        PathBuf,
    /// Print a progress line every N ticks.
    progress_interval: u64,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            sim: SimConfig {
                total_ticks:       150,
                seed:              42,
                snapshot_interval: 5,
                await_routes:      true,
                ..SimConfig::default()
            },
            population: PopulationConfig {
                spawn:              SpawnDistribution::morning(),
                spawn_window_ticks: 30,
                ..PopulationConfig::with_vehicle_mix(800, 0.15, 200)
            },
            lights:            LightConfig::default(),
            grid:              GridConfig::default(),
            initial_blockages: Vec::new(),
            incidents:         Vec::new(),
            output_dir:        PathBuf::from("output/city_grid"),
            progress_interval: 10,
        }
    }
}

impl DemoConfig {
    fn load() -> Result<Self> {
        let Some(path) = std::env::args().nth(1) else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("reading run config {path}"))?;
        serde_json::from_str(&text).with_context(|| format!("parsing run config {path}"))
    }

    fn incidents(&self) -> Vec<Incident> {
        if !self.incidents.is_empty() {
            return self.incidents.clone();
        }
        vec![Incident {
            at:       40,
            clear_at: Some(90),
            target:   BlockTarget::NearestNode(self.grid.center()),
        }]
    }
}

// ── Progress observer ─────────────────────────────────────────────────────────

struct ProgressPrinter {
    interval: u64,
    start:    Instant,
    rejected: u64,
}

impl SimObserver for ProgressPrinter {
    fn on_command_rejected(&mut self, tick: Tick, command: &Command, reason: &str) {
        self.rejected += 1;
        println!("  {tick}  rejected {command}: {reason}");
    }

    fn on_tick_end(&mut self, s: &TickSummary) {
        if self.interval == 0 || s.tick.0 % self.interval != 0 {
            return;
        }
        println!(
            "  {:>9}  live={:>5}  pending={:>4}  moving={:>5}  stalled={:>4}  \
             arrived={:>5}  failed={:>3}  occ={:>5}  {:.2}s  mem={:.0} MB",
            s.tick,
            s.live,
            s.pending,
            s.moving,
            s.stalled,
            s.arrived,
            s.failed,
            s.occupancy,
            self.start.elapsed().as_secs_f64(),
            mem_mb(),
        );
    }

    fn on_sim_end(&mut self, final_tick: Tick, metrics: &RunMetrics) {
        println!();
        println!("Finished at {final_tick}: {metrics}");
    }
}

// ── main ──────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = DemoConfig::load()?;
    println!(
        "=== meso_traffic  city_grid  {}x{} downtown, morning peak ===",
        config.grid.rows, config.grid.cols
    );
    println!(
        "Agents: {} ({} cars, {} heavy, {} on foot)  |  Ticks: {}  |  Seed: {}",
        config.population.total(),
        config.population.cars,
        config.population.heavy_vehicles,
        config.population.pedestrians,
        config.sim.total_ticks,
        config.sim.seed,
    );
    println!("mem[startup]              {:.0} MB", mem_mb());
    println!();

    // 1. Road network.
    let t_build = Instant::now();
    let (network, nodes) = build_network(&config.grid);
    println!(
        "Road network: {} nodes, {} edges",
        network.node_count(),
        network.edge_count()
    );
    if let (Some(first), Some(last)) = (nodes.first(), nodes.last()) {
        info!("grid corners: {first} (south-west) .. {last} (north-east)");
    }

    // 2. Simulation.
    let mut sim = SimBuilder::new(config.sim.clone(), network)
        .population(config.population.clone())
        .lights(config.lights.clone())
        .initial_blockages(config.initial_blockages.clone())
        .build()?;
    println!(
        "Build: {:.2}s  ({} agents spawned at tick 0, {} lights)",
        t_build.elapsed().as_secs_f64(),
        sim.agents().len(),
        sim.lights().len(),
    );

    // 3. Incidents.
    for incident in config.incidents() {
        println!("Incident at {}: block {}", Tick(incident.at), incident.target);
        sim.schedule(Tick(incident.at), Command::Block(incident.target));
        if let Some(clear) = incident.clear_at {
            sim.schedule(Tick(clear), Command::Unblock(incident.target));
        }
    }
    println!("mem[before run]           {:.0} MB", mem_mb());
    println!();

    // 4. Run with CSV output and a progress printer side by side.
    let writer = CsvWriter::new(&config.output_dir)
        .with_context(|| format!("creating {}", config.output_dir.display()))?;
    let output = SimOutputObserver::new(writer, &config.sim)
        .modes(&[TravelMode::Drive, TravelMode::Walk]);
    let progress = ProgressPrinter {
        interval: config.progress_interval,
        start:    Instant::now(),
        rejected: 0,
    };
    let mut obs = (output, progress);
    let metrics = sim.run(&mut obs)?;
    let (mut output, progress) = obs;
    if let Some(err) = output.take_error() {
        return Err(err).context("writing simulation output");
    }

    println!();
    println!("mem[after run]            {:.0} MB", mem_mb());
    println!(
        "Routes: {} computed, {} cache hits, {} reroutes, {} worker restarts",
        metrics.routes_computed, metrics.cache_hits, metrics.reroutes, metrics.worker_restarts,
    );
    println!(
        "Traffic: {} stall ticks, {} light toggles, {} blockages, {} rejected commands",
        metrics.stall_ticks, metrics.lights_toggled, metrics.blockages_applied, progress.rejected,
    );
    println!("Memory health: {:?}", metrics.memory_health);
    println!("Output written to {}", config.output_dir.display());
    Ok(())
}
