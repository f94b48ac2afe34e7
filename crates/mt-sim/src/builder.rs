//! Fluent builder for constructing a [`Simulation`].

use std::sync::Arc;

use log::info;

use mt_core::{BlockTarget, LightConfig, PopulationConfig, SimConfig, SimRng, Tick};
use mt_network::{EdgeWeights, NetworkError, RoadNetwork};
use mt_routing::{PathService, RouterFactory};
use mt_traffic::{BarrierManager, CongestionTracker, TrafficLightController};

use crate::spawn::plan_population;
use crate::{NoopObserver, SimResult, Simulation, SpawnRequest};

/// Fluent builder for [`Simulation`].
///
/// # Required inputs
///
/// - [`SimConfig`]: tick budget, seed, sampling interval K, workers, …
/// - [`RoadNetwork`]: the immutable graph for the run
///
/// # Optional inputs (have defaults)
///
/// | Method                   | Default                                  |
/// |--------------------------|------------------------------------------|
/// | `.population(p)`         | No generated agents                      |
/// | `.agent(req)`            | No explicit agents                       |
/// | `.lights(l)`             | Auto placement, no overrides             |
/// | `.initial_blockages(v)`  | Nothing blocked                          |
/// | `.router(factory)`       | `DijkstraRouter` in every worker         |
///
/// # Example
///
/// ```rust,ignore
/// let mut sim = SimBuilder::new(config, network)
///     .population(PopulationConfig::with_vehicle_mix(800, 0.15, 200))
///     .initial_blockages(vec![BlockTarget::NearestNode(GeoPoint::new(51.5, -0.12))])
///     .build()?;
/// sim.run(&mut NoopObserver)?;
/// ```
pub struct SimBuilder {
    config:     SimConfig,
    network:    RoadNetwork,
    population: PopulationConfig,
    agents:     Vec<SpawnRequest>,
    lights:     LightConfig,
    blockages:  Vec<BlockTarget>,
    router:     Option<RouterFactory>,
}

impl SimBuilder {
    pub fn new(config: SimConfig, network: RoadNetwork) -> Self {
        Self {
            config,
            network,
            population: PopulationConfig::default(),
            agents:     Vec::new(),
            lights:     LightConfig::default(),
            blockages:  Vec::new(),
            router:     None,
        }
    }

    /// Randomly placed agents, drawn from the config seed.
    pub fn population(mut self, population: PopulationConfig) -> Self {
        self.population = population;
        self
    }

    /// One explicitly placed agent, spawned before the first tick.
    /// Explicit agents get ids before generated ones, in call order.
    pub fn agent(mut self, request: SpawnRequest) -> Self {
        self.agents.push(request);
        self
    }

    pub fn agents(mut self, requests: impl IntoIterator<Item = SpawnRequest>) -> Self {
        self.agents.extend(requests);
        self
    }

    pub fn lights(mut self, lights: LightConfig) -> Self {
        self.lights = lights;
        self
    }

    /// Targets blocked at tick 0, before any route is computed.
    pub fn initial_blockages(mut self, targets: Vec<BlockTarget>) -> Self {
        self.blockages = targets;
        self
    }

    /// Replace the path-search algorithm used by every worker.
    pub fn router(mut self, factory: RouterFactory) -> Self {
        self.router = Some(factory);
        self
    }

    /// Validate inputs, start the path service, spawn the tick-0 population
    /// and return a ready-to-run [`Simulation`].
    ///
    /// Invalid initial blockages and light overrides are errors here, unlike
    /// commands scheduled on a running simulation.  Invalid explicit agents
    /// are rejected and counted the same way spawn commands are.
    pub fn build(self) -> SimResult<Simulation> {
        self.config.validate()?;
        if self.network.is_empty() {
            return Err(NetworkError::EmptyNetwork.into());
        }
        let network = Arc::new(self.network);

        // ── Blockages and lights ──────────────────────────────────────────
        let mut weights = EdgeWeights::new(&network);
        let mut barriers = BarrierManager::new();
        for target in self.blockages {
            barriers.block(&network, &mut weights, target, Tick::ZERO)?;
        }

        let mut lights = TrafficLightController::new();
        if self.lights.auto_place {
            lights.auto_place(&network, self.config.default_toggle_period)?;
        }
        for (node, period) in self.lights.overrides {
            network.check_node(node)?;
            lights.install(node, period)?;
        }

        let tracker = CongestionTracker::new(&network, self.config.sample_interval)?;

        // ── Path service ──────────────────────────────────────────────────
        let weights = Arc::new(weights);
        let workers = self.config.resolved_worker_count();
        let paths = match self.router {
            Some(factory) => {
                PathService::with_router(Arc::clone(&network), Arc::clone(&weights), workers, factory)?
            }
            None => PathService::spawn(Arc::clone(&network), Arc::clone(&weights), workers)?,
        };

        // ── Population ────────────────────────────────────────────────────
        let mut rng = SimRng::new(self.config.seed);
        let plan = plan_population(&network, &self.population, &mut rng)?;

        let mut sim = Simulation::new(self.config, network, weights, tracker, lights, barriers, paths);
        for request in self.agents {
            sim.spawns.push(Tick::ZERO, request);
        }
        for (tick, request) in plan {
            sim.spawns.push(tick, request);
        }
        sim.apply_due_spawns(Tick::ZERO, &mut NoopObserver)?;
        sim.check_memory();

        info!(
            "simulation built: {} nodes, {} edges, {} agents spawned, {} scheduled, {} lights",
            sim.network.node_count(),
            sim.network.edge_count(),
            sim.agents.len(),
            sim.spawns.len(),
            sim.lights.len()
        );
        Ok(sim)
    }
}
