//! The `Simulation` struct and its tick loop.

use std::sync::Arc;
use std::time::Instant;

use log::{debug, info, warn};
use rustc_hash::FxHashMap;

use mt_agent::{AgentCounters, AgentManager, AgentStatus, Movement, RerouteRequest};
use mt_core::{AgentId, RequestId, SimClock, SimConfig, Tick, TickQueue};
use mt_network::{EdgeWeights, RoadNetwork};
use mt_routing::{PathService, PoolHealth, RouteCache, RouteKey, RouteOutcome};
use mt_traffic::{BarrierChange, BarrierManager, CongestionTracker, TrafficLightController, TrafficResult};

use crate::metrics::memory_usage_mb;
use crate::{Command, RunMetrics, SimObserver, SimResult, Snapshot, SpawnRequest, TickSummary};

/// Ticks between two memory readings.
const MEMORY_CHECK_INTERVAL: u64 = 10;

/// A path request that has been submitted but not yet answered.
#[derive(Copy, Clone, Debug)]
struct InFlight {
    agent: AgentId,
    key:   RouteKey,
    /// Weights version the request was searched against.
    epoch: u64,
}

// ── Simulation ────────────────────────────────────────────────────────────────

/// The main simulation runner.
///
/// `Simulation` owns all mutable run state: occupancy (through the
/// [`CongestionTracker`]), light phases, blocked flags (through the
/// [`BarrierManager`]) and agents.  Every tick runs the same fixed sequence:
///
/// 1. **Clock**: advance the tick counter.
/// 2. **Lights**: toggle every light whose period divides the tick.
/// 3. **Sample**: on `tick mod K == 0` snapshot occupancy into the edge
///    multipliers and publish the new weights to the path service.
/// 4. **Commands**: apply due block/unblock changes (rerouting affected
///    agents), spawn due agents, then collect path results and hand routes
///    to their agents.
/// 5. **Advance**: move every live agent in id order.
/// 6. **Snapshot**: every `snapshot_interval` ticks, emit one render record
///    per live agent.
///
/// Finished agents are retired after the snapshot.  Create via
/// [`SimBuilder`][crate::SimBuilder].
pub struct Simulation {
    pub(crate) config:   SimConfig,
    pub(crate) clock:    SimClock,
    pub(crate) network:  Arc<RoadNetwork>,
    pub(crate) weights:  Arc<EdgeWeights>,
    pub(crate) tracker:  CongestionTracker,
    pub(crate) lights:   TrafficLightController,
    pub(crate) barriers: BarrierManager,
    pub(crate) paths:    PathService,
    pub(crate) cache:    RouteCache,
    pub(crate) agents:   AgentManager,
    pub(crate) spawns:   TickQueue<SpawnRequest>,
    in_flight: FxHashMap<RequestId, InFlight>,
    metrics:   RunMetrics,
}

impl Simulation {
    pub(crate) fn new(
        config: SimConfig,
        network: Arc<RoadNetwork>,
        weights: Arc<EdgeWeights>,
        tracker: CongestionTracker,
        lights: TrafficLightController,
        barriers: BarrierManager,
        paths: PathService,
    ) -> Self {
        let blockages = barriers.blockages().count() as u64;
        let mut sim = Self {
            clock: SimClock::new(config.secs_per_tick),
            config,
            network,
            weights,
            tracker,
            lights,
            barriers,
            paths,
            cache: RouteCache::new(),
            agents: AgentManager::new(),
            spawns: TickQueue::new(),
            in_flight: FxHashMap::default(),
            metrics: RunMetrics::default(),
        };
        sim.metrics.blockages_applied = blockages;
        sim
    }

    // ── Public API ────────────────────────────────────────────────────────

    /// Run until [`is_finished`](Self::is_finished), calling observer hooks
    /// along the way.  Returns the final counters.
    ///
    /// Fails only if the path service becomes unavailable.
    pub fn run<O: SimObserver>(&mut self, observer: &mut O) -> SimResult<RunMetrics> {
        observer.on_sim_start(&self.network);
        info!(
            "run started: {} agents, {} lights, {} blockages, up to {} ticks",
            self.agents.len() + self.spawns.len(),
            self.lights.len(),
            self.barriers.blockages().count(),
            self.config.total_ticks
        );
        while !self.is_finished() {
            self.step(observer)?;
        }
        self.finish();
        observer.on_sim_end(self.clock.current_tick, &self.metrics);
        info!("run finished at {}: {}", self.clock, self.metrics);
        Ok(self.metrics.clone())
    }

    /// Execute exactly one tick.
    pub fn step<O: SimObserver>(&mut self, observer: &mut O) -> SimResult<TickSummary> {
        let started = Instant::now();

        // ── ① Clock ──────────────────────────────────────────────────────
        let tick = self.clock.advance();
        observer.on_tick_start(tick);
        let mut summary = TickSummary { tick, ..TickSummary::default() };

        // ── ② Lights ─────────────────────────────────────────────────────
        summary.lights_toggled = self.lights.update(tick);

        // ── ③ Congestion sample ──────────────────────────────────────────
        if self.tracker.should_sample(tick) {
            self.sample_congestion(tick);
            summary.sampled = true;
        }

        // ── ④ Commands and path results ──────────────────────────────────
        self.apply_barrier_changes(tick, observer)?;
        self.apply_due_spawns(tick, observer)?;
        self.collect_routes(tick)?;

        // ── ⑤ Advance ────────────────────────────────────────────────────
        let report = {
            let mut mv = Movement {
                network: &self.network,
                weights: &self.weights,
                tracker: &mut self.tracker,
                lights:  &self.lights,
            };
            self.agents.advance_all(tick, &mut mv)
        };
        summary.hops = report.hops;
        self.request_reroutes(report.reroutes, tick)?;

        // ── ⑥ Snapshot ───────────────────────────────────────────────────
        if tick.0.is_multiple_of(self.config.snapshot_interval) {
            let snapshot = self.snapshot();
            self.metrics.records += snapshot.len() as u64;
            observer.on_snapshot(&snapshot);
        }

        let counters = self.agents.counters();
        summary.live = self.agents.len();
        summary.pending = counters.pending;
        summary.moving = counters.moving;
        summary.stalled = counters.stalled;
        summary.arrived = (counters.arrived - self.metrics.arrived) as usize;
        summary.failed = (counters.failed - self.metrics.failed) as usize;
        summary.occupancy = self.tracker.total_occupancy();
        summary.routes_pending = self.in_flight.len();

        self.agents.retire_finished();
        if tick.0.is_multiple_of(MEMORY_CHECK_INTERVAL) {
            self.check_memory();
        }
        self.refresh_metrics(tick, counters);
        self.metrics.elapsed += started.elapsed();
        self.metrics.update_throughput();

        observer.on_tick_end(&summary);
        Ok(summary)
    }

    /// Queue `command` to take effect at `tick`.
    ///
    /// Commands for a tick that has already run are applied at the start of
    /// the next step.  Validation happens when the command is applied.
    pub fn schedule(&mut self, tick: Tick, command: Command) {
        match command {
            Command::Block(t)   => self.barriers.schedule(tick, BarrierChange::Block(t)),
            Command::Unblock(t) => self.barriers.schedule(tick, BarrierChange::Unblock(t)),
            Command::Spawn(req) => self.spawns.push(tick, req),
        }
    }

    /// Render records for every live agent at the current tick.
    pub fn snapshot(&self) -> Snapshot {
        let tick = self.clock.current_tick;
        Snapshot { tick, records: self.agents.snapshot_records(tick) }
    }

    /// Counters as of the last completed tick.
    pub fn metrics(&self) -> &RunMetrics {
        &self.metrics
    }

    /// `true` once the tick budget is spent, or every agent has arrived or
    /// failed with no spawns still scheduled.
    pub fn is_finished(&self) -> bool {
        self.clock.current_tick.0 >= self.config.total_ticks
            || (self.agents.all_finished() && self.spawns.is_empty() && self.in_flight.is_empty())
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn current_tick(&self) -> Tick {
        self.clock.current_tick
    }

    pub fn clock(&self) -> &SimClock {
        &self.clock
    }

    pub fn network(&self) -> &RoadNetwork {
        &self.network
    }

    /// Edge weights new path requests are searched against.
    pub fn weights(&self) -> &EdgeWeights {
        &self.weights
    }

    pub fn tracker(&self) -> &CongestionTracker {
        &self.tracker
    }

    pub fn lights(&self) -> &TrafficLightController {
        &self.lights
    }

    pub fn barriers(&self) -> &BarrierManager {
        &self.barriers
    }

    pub fn agents(&self) -> &AgentManager {
        &self.agents
    }

    pub fn route_cache(&self) -> &RouteCache {
        &self.cache
    }

    pub fn path_health(&self) -> PoolHealth {
        self.paths.health()
    }

    /// Path requests submitted and not yet answered.
    pub fn routes_in_flight(&self) -> usize {
        self.in_flight.len()
    }

    // ── Tick phases ───────────────────────────────────────────────────────

    fn sample_congestion(&mut self, tick: Tick) {
        self.tracker.sample(tick);
        let multipliers = self.tracker.multipliers();
        Arc::make_mut(&mut self.weights).set_congestion(&multipliers, tick);
        self.paths.publish_weights(Arc::clone(&self.weights));
        self.cache.clear();
        debug!(
            "{tick}: congestion sampled, {} units on the network",
            self.tracker.total_occupancy()
        );
    }

    fn apply_barrier_changes<O: SimObserver>(
        &mut self,
        tick: Tick,
        observer: &mut O,
    ) -> SimResult<()> {
        let changes = self.barriers.drain_due(tick);
        if changes.is_empty() {
            return Ok(());
        }
        let mut reroutes = Vec::new();
        let mut applied = 0usize;
        for change in changes {
            match self.apply_barrier_change(change, tick) {
                Ok(mut requests) => {
                    applied += 1;
                    reroutes.append(&mut requests);
                }
                Err(e) => self.reject(tick, Command::from(change), &e.to_string(), observer),
            }
        }
        if applied > 0 {
            self.paths.publish_weights(Arc::clone(&self.weights));
        }
        self.request_reroutes(reroutes, tick)
    }

    fn apply_barrier_change(
        &mut self,
        change: BarrierChange,
        tick: Tick,
    ) -> TrafficResult<Vec<RerouteRequest>> {
        let weights = Arc::make_mut(&mut self.weights);
        match change {
            BarrierChange::Block(target) => {
                let resolved = self.barriers.block(&self.network, weights, target, tick)?;
                let evicted = self.cache.invalidate_target(resolved);
                let requests = self.agents.invalidate(resolved);
                debug!(
                    "{tick}: {resolved} evicted {evicted} cached routes, rerouting {} agents",
                    requests.len()
                );
                self.metrics.blockages_applied += 1;
                Ok(requests)
            }
            BarrierChange::Unblock(target) => {
                self.barriers.unblock(&self.network, weights, target, tick)?;
                // Any cached route may now have a cheaper alternative.
                self.cache.clear();
                Ok(Vec::new())
            }
        }
    }

    pub(crate) fn apply_due_spawns<O: SimObserver>(
        &mut self,
        tick: Tick,
        observer: &mut O,
    ) -> SimResult<()> {
        let due = self.spawns.drain_due(tick);
        if due.is_empty() {
            return Ok(());
        }
        let mut spawned = 0usize;
        for req in due {
            match self.agents.spawn(&self.network, req.class, req.origin, req.destination, tick) {
                Ok(agent) => {
                    spawned += 1;
                    let key = RouteKey::new(req.origin, req.destination, req.class.mode());
                    self.request_route(agent, key, tick)?;
                }
                Err(e) => self.reject(tick, Command::Spawn(req), &e.to_string(), observer),
            }
        }
        debug!("{tick}: spawned {spawned} agents");
        Ok(())
    }

    /// Answer from the cache when possible, otherwise submit to the pool.
    fn request_route(&mut self, agent: AgentId, key: RouteKey, tick: Tick) -> SimResult<()> {
        if self.config.route_cache {
            if let Some(route) = self.cache.get(&key) {
                self.deliver(agent, RouteOutcome::Found(route), tick);
                return Ok(());
            }
        }
        let id = self.paths.submit(key.origin, key.destination, key.mode)?;
        self.in_flight.insert(id, InFlight { agent, key, epoch: self.weights.epoch() });
        Ok(())
    }

    fn request_reroutes(&mut self, requests: Vec<RerouteRequest>, tick: Tick) -> SimResult<()> {
        for r in requests {
            self.request_route(r.agent, RouteKey::new(r.origin, r.destination, r.mode), tick)?;
        }
        Ok(())
    }

    fn collect_routes(&mut self, tick: Tick) -> SimResult<()> {
        if self.in_flight.is_empty() {
            return Ok(());
        }
        let responses = if self.config.await_routes {
            self.paths.wait_all()?
        } else {
            self.paths.poll()?
        };
        let epoch = self.weights.epoch();
        for response in responses {
            let Some(pending) = self.in_flight.remove(&response.request.id) else {
                continue;
            };
            self.metrics.routes_computed += 1;
            // Routes searched against an older weights version may cross a
            // newer blockage; hand them out but never cache them.
            if self.config.route_cache && pending.epoch == epoch {
                if let RouteOutcome::Found(route) = &response.outcome {
                    self.cache.insert(pending.key, route.clone());
                }
            }
            self.deliver(pending.agent, response.outcome, tick);
        }
        Ok(())
    }

    fn deliver(&mut self, agent: AgentId, outcome: RouteOutcome, tick: Tick) {
        match self.agents.assign_route(agent, outcome, &mut self.tracker, tick) {
            Ok(AgentStatus::Failed) => debug!("{tick}: {agent} has no route to its destination"),
            Ok(_) => {}
            Err(e) => debug!("{tick}: discarded route for {agent}: {e}"),
        }
    }

    fn reject<O: SimObserver>(&mut self, tick: Tick, command: Command, reason: &str, observer: &mut O) {
        warn!("{tick}: rejected `{command}`: {reason}");
        self.metrics.rejected_commands += 1;
        observer.on_command_rejected(tick, &command, reason);
    }

    // ── Bookkeeping ───────────────────────────────────────────────────────

    fn refresh_metrics(&mut self, tick: Tick, counters: AgentCounters) {
        let m = &mut self.metrics;
        m.ticks = tick.0;
        m.spawned = counters.spawned;
        m.arrived = counters.arrived;
        m.failed = counters.failed;
        m.stalled = counters.stalled;
        m.stall_ticks = counters.stall_ticks;
        m.reroutes = counters.reroutes;
        m.cache_hits = self.cache.hits();
        m.worker_restarts = self.paths.health().restarts;
        m.lights_toggled = self.lights.toggles();
    }

    pub(crate) fn check_memory(&mut self) {
        let was_degraded = self.metrics.memory_health.is_degraded();
        self.metrics.observe_memory(memory_usage_mb(), self.config.memory_budget_mb);
        if !was_degraded && self.metrics.memory_health.is_degraded() {
            warn!("memory degraded: {:?}", self.metrics.memory_health);
        }
    }

    /// Drop unanswered requests and take final readings.
    fn finish(&mut self) {
        let outstanding = self.in_flight.len();
        for (id, _) in self.in_flight.drain() {
            self.paths.cancel(id);
        }
        if outstanding > 0 {
            debug!("discarded {outstanding} unanswered path requests");
        }
        self.check_memory();
        self.metrics.update_throughput();
    }
}
