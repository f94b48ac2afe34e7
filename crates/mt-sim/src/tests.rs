//! Integration tests for mt-sim.

use std::sync::Arc;

use mt_agent::AgentStatus;
use mt_core::{
    AgentClass, AgentId, GeoPoint, LightConfig, NodeId, PopulationConfig, SimConfig, Tick,
    TravelMode,
};
use mt_network::{RoadNetwork, RoadNetworkBuilder};

use crate::{Command, RunMetrics, SimBuilder, SimObserver, Snapshot, SpawnRequest, TickSummary};

// ── Helpers ───────────────────────────────────────────────────────────────────

fn test_config(total_ticks: u64) -> SimConfig {
    SimConfig {
        total_ticks,
        seed: 42,
        worker_count: Some(2),
        ..SimConfig::default()
    }
}

fn no_lights() -> LightConfig {
    LightConfig { auto_place: false, overrides: Vec::new() }
}

/// One-way corridor A→B→C with capacity 1 on both edges.
fn corridor() -> (RoadNetwork, [NodeId; 3]) {
    let mut b = RoadNetworkBuilder::new();
    let a = b.add_node(GeoPoint::new(0.0, 0.0));
    let bb = b.add_node(GeoPoint::new(0.0, 0.0001));
    let c = b.add_node(GeoPoint::new(0.0, 0.0002));
    b.add_edge(a, bb, 5.0, TravelMode::Drive);
    b.add_edge(bb, c, 5.0, TravelMode::Drive);
    (b.build(), [a, bb, c])
}

/// A→B→C direct (200 m) with a detour B→D→C (300 m in total).
fn detour() -> (RoadNetwork, [NodeId; 4]) {
    let mut b = RoadNetworkBuilder::new();
    let a = b.add_node(GeoPoint::new(0.0, 0.0));
    let bb = b.add_node(GeoPoint::new(0.0, 0.001));
    let c = b.add_node(GeoPoint::new(0.0, 0.002));
    let d = b.add_node(GeoPoint::new(0.001, 0.0015));
    b.add_edge(a, bb, 100.0, TravelMode::Drive);
    b.add_edge(bb, c, 100.0, TravelMode::Drive);
    b.add_edge(bb, d, 100.0, TravelMode::Drive);
    b.add_edge(d, c, 100.0, TravelMode::Drive);
    (b.build(), [a, bb, c, d])
}

/// `n` nodes in an east-west line joined by one-way 7 m edges (capacity 1).
fn line(n: usize) -> (RoadNetwork, Vec<NodeId>) {
    let mut b = RoadNetworkBuilder::new();
    let nodes: Vec<NodeId> =
        (0..n).map(|i| b.add_node(GeoPoint::new(0.0, i as f32 * 0.0001))).collect();
    for w in nodes.windows(2) {
        b.add_edge(w[0], w[1], 7.0, TravelMode::Drive);
    }
    (b.build(), nodes)
}

/// `n × n` grid, 0.001° spacing, two-way drive and walk streets.
fn grid(n: usize) -> RoadNetwork {
    let mut b = RoadNetworkBuilder::new();
    let mut ids = Vec::with_capacity(n * n);
    for row in 0..n {
        for col in 0..n {
            ids.push(b.add_node(GeoPoint::new(row as f32 * 0.001, col as f32 * 0.001)));
        }
    }
    for row in 0..n {
        for col in 0..n {
            let here = ids[row * n + col];
            let mut link = |other: NodeId| {
                b.add_road(here, other, 111.0, TravelMode::Drive);
                b.add_road(here, other, 111.0, TravelMode::Walk);
            };
            if col + 1 < n {
                link(ids[row * n + col + 1]);
            }
            if row + 1 < n {
                link(ids[(row + 1) * n + col]);
            }
        }
    }
    b.build()
}

/// Keeps everything the simulation reports.
#[derive(Default)]
struct Recorder {
    started:   bool,
    snapshots: Vec<Snapshot>,
    summaries: Vec<TickSummary>,
    rejected:  Vec<(Tick, Command)>,
    ended:     Option<(Tick, RunMetrics)>,
}

impl SimObserver for Recorder {
    fn on_sim_start(&mut self, _network: &RoadNetwork) {
        self.started = true;
    }

    fn on_command_rejected(&mut self, tick: Tick, command: &Command, _reason: &str) {
        self.rejected.push((tick, *command));
    }

    fn on_snapshot(&mut self, snapshot: &Snapshot) {
        self.snapshots.push(snapshot.clone());
    }

    fn on_tick_end(&mut self, summary: &TickSummary) {
        self.summaries.push(*summary);
    }

    fn on_sim_end(&mut self, final_tick: Tick, metrics: &RunMetrics) {
        self.ended = Some((final_tick, metrics.clone()));
    }
}

// ── SimBuilder validation ─────────────────────────────────────────────────────

#[cfg(test)]
mod builder_tests {
    use mt_core::{BlockTarget, CoreError};
    use mt_network::{BarrierTarget, NetworkError};
    use mt_traffic::TrafficError;

    use super::*;
    use crate::SimError;

    #[test]
    fn builds_with_explicit_agents() {
        let (net, [a, _, c]) = corridor();
        let sim = SimBuilder::new(test_config(10), net)
            .lights(no_lights())
            .agent(SpawnRequest::new(AgentClass::Car, a, c))
            .agent(SpawnRequest::new(AgentClass::Car, a, c))
            .build()
            .unwrap();
        assert_eq!(sim.agents().len(), 2);
        assert_eq!(sim.current_tick(), Tick::ZERO);
        assert!(sim.agents().iter().all(|ag| ag.status == AgentStatus::Pending));
        assert_eq!(sim.routes_in_flight(), 2);
        assert!(sim.path_health().is_available());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let (net, _) = corridor();
        let config = SimConfig { sample_interval: 0, ..test_config(10) };
        assert!(matches!(
            SimBuilder::new(config, net).build(),
            Err(SimError::Config(CoreError::Config(_)))
        ));
    }

    #[test]
    fn empty_network_is_rejected() {
        assert!(matches!(
            SimBuilder::new(test_config(10), RoadNetwork::empty()).build(),
            Err(SimError::Network(NetworkError::EmptyNetwork))
        ));
    }

    #[test]
    fn light_override_on_unknown_node_is_rejected() {
        let (net, _) = corridor();
        let lights = LightConfig { auto_place: false, overrides: vec![(NodeId(77), 10)] };
        assert!(matches!(
            SimBuilder::new(test_config(10), net).lights(lights).build(),
            Err(SimError::Network(NetworkError::NodeNotFound(_)))
        ));
    }

    #[test]
    fn invalid_initial_blockage_is_rejected() {
        let (net, _) = corridor();
        assert!(matches!(
            SimBuilder::new(test_config(10), net)
                .initial_blockages(vec![BlockTarget::Node(NodeId(50))])
                .build(),
            Err(SimError::Traffic(TrafficError::Network(_)))
        ));
    }

    #[test]
    fn initial_blockages_shape_first_routes() {
        let (net, [a, b, c, d]) = detour();
        let bc = net.find_edge(b, c, TravelMode::Drive).unwrap();
        let mut sim = SimBuilder::new(test_config(20), net)
            .lights(no_lights())
            .initial_blockages(vec![BlockTarget::Edge(bc)])
            .agent(SpawnRequest::new(AgentClass::Car, a, c))
            .build()
            .unwrap();
        assert!(sim.barriers().is_blocked(BarrierTarget::Edge(bc)));

        sim.step(&mut crate::NoopObserver).unwrap();
        let route = sim.agents().get(AgentId(0)).unwrap().route().unwrap();
        assert_eq!(route.nodes, vec![a, b, d, c]);
        assert_eq!(sim.metrics().blockages_applied, 1);
    }

    #[test]
    fn invalid_explicit_agent_is_counted_not_fatal() {
        let (net, [a, _, c]) = corridor();
        let mut sim = SimBuilder::new(test_config(10), net)
            .lights(no_lights())
            .agent(SpawnRequest::new(AgentClass::Car, a, NodeId(40)))
            .agent(SpawnRequest::new(AgentClass::Pedestrian, a, c))
            .agent(SpawnRequest::new(AgentClass::Car, a, c))
            .build()
            .unwrap();
        assert_eq!(sim.agents().len(), 1);
        let metrics = sim.run(&mut crate::NoopObserver).unwrap();
        assert_eq!(metrics.rejected_commands, 2);
        assert_eq!(metrics.arrived, 1);
    }
}

// ── Scenarios ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod scenarios {
    use mt_core::BlockTarget;
    use mt_network::BarrierTarget;
    use mt_traffic::Phase;

    use super::*;
    use crate::NoopObserver;

    #[test]
    fn capacity_one_stalls_the_second_vehicle() {
        let (net, [a, b, c]) = corridor();
        let ab = net.find_edge(a, b, TravelMode::Drive).unwrap();
        let bc = net.find_edge(b, c, TravelMode::Drive).unwrap();
        let mut sim = SimBuilder::new(test_config(20), net)
            .lights(no_lights())
            .agent(SpawnRequest::new(AgentClass::HeavyVehicle, a, c))
            .agent(SpawnRequest::new(AgentClass::HeavyVehicle, a, c))
            .build()
            .unwrap();
        let (first, second) = (AgentId(0), AgentId(1));

        sim.step(&mut NoopObserver).unwrap();
        let lead = sim.agents().get(first).unwrap();
        let trail = sim.agents().get(second).unwrap();
        assert_eq!(lead.occupied_edge(), Some(ab));
        assert_eq!(trail.status, AgentStatus::Stalled);
        assert_eq!(trail.current_node(), a);
        assert_eq!(trail.occupied_edge(), None);
        assert_eq!(sim.tracker().occupancy(ab), 1);

        // The lead crosses B→C and arrives, so A→B is free for the trailer.
        let summary = sim.step(&mut NoopObserver).unwrap();
        assert_eq!(summary.arrived, 1);
        assert!(sim.agents().get(first).is_none(), "retired on arrival");
        let lead = sim.agents().retired()[0];
        assert_eq!((lead.id, lead.finished_at), (first, Tick(2)));
        assert_eq!(sim.tracker().occupancy(bc), 0);
        let trail = sim.agents().get(second).unwrap();
        assert_eq!(trail.occupied_edge(), Some(ab));
        assert_eq!(trail.status, AgentStatus::Moving);
        assert_eq!(trail.stalled_ticks, 1);

        let metrics = sim.run(&mut NoopObserver).unwrap();
        assert_eq!(metrics.arrived, 2);
        assert_eq!(sim.tracker().total_occupancy(), 0);
    }

    #[test]
    fn blocking_reroutes_agent_past_the_fork_and_later_spawns_avoid_it() {
        let (net, [a, b, c, d]) = detour();
        let bc = net.find_edge(b, c, TravelMode::Drive).unwrap();
        let bd = net.find_edge(b, d, TravelMode::Drive).unwrap();
        let mut sim = SimBuilder::new(test_config(50), net)
            .lights(no_lights())
            .agent(SpawnRequest::new(AgentClass::HeavyVehicle, a, c))
            .build()
            .unwrap();
        sim.schedule(Tick(2), Command::Block(BlockTarget::Edge(bc)));
        sim.schedule(
            Tick(3),
            Command::Spawn(SpawnRequest::new(AgentClass::HeavyVehicle, a, c)),
        );

        sim.step(&mut NoopObserver).unwrap();
        let agent = sim.agents().get(AgentId(0)).unwrap();
        assert_eq!(agent.current_node(), b);
        assert!(agent.route().unwrap().traverses(BarrierTarget::Edge(bc)));

        // Block takes effect at tick 2; the reroute is answered the same tick.
        sim.step(&mut NoopObserver).unwrap();
        let agent = sim.agents().get(AgentId(0)).unwrap();
        assert_eq!(agent.reroutes, 1);
        assert!(!agent.route().unwrap().traverses(BarrierTarget::Edge(bc)));
        assert_eq!(agent.occupied_edge(), Some(bd));

        sim.step(&mut NoopObserver).unwrap();
        let late = sim.agents().get(AgentId(1)).unwrap();
        assert_eq!(late.route().unwrap().nodes, vec![a, b, d, c]);

        let metrics = sim.run(&mut NoopObserver).unwrap();
        assert_eq!(metrics.arrived, 2);
        assert_eq!(metrics.reroutes, 1);
        assert_eq!(sim.tracker().occupancy(bc), 0);
    }

    #[test]
    fn unblock_frees_the_edge_for_new_routes() {
        let (net, [a, b, c, _]) = detour();
        let bc = net.find_edge(b, c, TravelMode::Drive).unwrap();
        let mut sim = SimBuilder::new(test_config(50), net)
            .lights(no_lights())
            .initial_blockages(vec![BlockTarget::Edge(bc)])
            .build()
            .unwrap();
        sim.schedule(Tick(1), Command::Unblock(BlockTarget::Edge(bc)));
        sim.schedule(Tick(1), Command::Spawn(SpawnRequest::new(AgentClass::HeavyVehicle, a, c)));
        sim.step(&mut NoopObserver).unwrap();

        assert!(!sim.barriers().is_blocked(BarrierTarget::Edge(bc)));
        assert_eq!(sim.barriers().history().len(), 1);
        let route = sim.agents().get(AgentId(0)).unwrap().route().unwrap();
        assert_eq!(route.nodes, vec![a, b, c]);
    }

    #[test]
    fn light_with_period_ten_alternates() {
        let (net, _) = corridor();
        let node = NodeId(1);
        let lights = LightConfig { auto_place: false, overrides: vec![(node, 10)] };
        let mut sim = SimBuilder::new(test_config(30), net).lights(lights).build().unwrap();
        assert_eq!(sim.lights().phase(node), Some(Phase::AllowNorthSouth));

        let mut toggles = 0;
        for _ in 0..10 {
            toggles += sim.step(&mut NoopObserver).unwrap().lights_toggled;
        }
        assert_eq!(sim.current_tick(), Tick(10));
        assert_eq!(sim.lights().phase(node), Some(Phase::AllowEastWest));
        for _ in 0..10 {
            toggles += sim.step(&mut NoopObserver).unwrap().lights_toggled;
        }
        assert_eq!(sim.lights().phase(node), Some(Phase::AllowNorthSouth));
        assert_eq!(toggles, 2);
        assert_eq!(sim.metrics().lights_toggled, 2);
    }

    #[test]
    fn routes_at_tick_seven_use_the_tick_five_sample() {
        let (net, nodes) = line(10);
        let (origin, destination) = (nodes[0], nodes[9]);
        let e3 = net.find_edge(nodes[3], nodes[4], TravelMode::Drive).unwrap();
        let e6 = net.find_edge(nodes[6], nodes[7], TravelMode::Drive).unwrap();
        let config = SimConfig { sample_interval: 5, ..test_config(40) };
        let mut sim = SimBuilder::new(config, net)
            .lights(no_lights())
            .agent(SpawnRequest::new(AgentClass::HeavyVehicle, origin, destination))
            .build()
            .unwrap();
        sim.schedule(
            Tick(7),
            Command::Spawn(SpawnRequest::new(AgentClass::HeavyVehicle, origin, destination)),
        );

        let mut sampled = Vec::new();
        for _ in 0..7 {
            let summary = sim.step(&mut NoopObserver).unwrap();
            if summary.sampled {
                sampled.push(summary.tick);
            }
        }
        assert_eq!(sampled, vec![Tick(5)]);

        // The lead vehicle sat on e3 when the sample was taken and holds e6 now.
        assert_eq!(sim.weights().sampled_at(), Tick(5));
        assert_eq!(sim.agents().get(AgentId(0)).unwrap().occupied_edge(), Some(e6));
        assert_eq!(sim.weights().multiplier(e3), 3.0);
        assert_eq!(sim.tracker().occupancy(e3), 0);
        assert_eq!(sim.weights().multiplier(e6), 1.0);
        assert_eq!(sim.tracker().occupancy(e6), 1);

        let late = sim.agents().get(AgentId(1)).unwrap().route().unwrap();
        assert!((late.cost - (8.0 * 7.0 + 3.0 * 7.0)).abs() < 1e-3, "cost {}", late.cost);
    }
}

// ── Properties ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod properties {
    use std::collections::HashMap;

    use mt_core::{BlockTarget, EdgeId, SpawnDistribution};

    use super::*;
    use crate::NoopObserver;

    fn populated(seed: u64) -> crate::Simulation {
        let config = SimConfig { seed, sample_interval: 3, ..test_config(120) };
        let population = PopulationConfig {
            pedestrians: 20,
            cars: 40,
            heavy_vehicles: 10,
            spawn: SpawnDistribution::morning(),
            spawn_window_ticks: 10,
        };
        SimBuilder::new(config, grid(6)).population(population).build().unwrap()
    }

    #[test]
    fn same_seed_same_run() {
        let mut first = Recorder::default();
        let mut second = Recorder::default();
        let m1 = populated(7).run(&mut first).unwrap();
        let m2 = populated(7).run(&mut second).unwrap();

        assert_eq!(first.snapshots.len(), second.snapshots.len());
        for (a, b) in first.snapshots.iter().zip(&second.snapshots) {
            assert_eq!(a.records, b.records);
        }
        assert_eq!(first.summaries, second.summaries);
        assert_eq!((m1.arrived, m1.failed, m1.reroutes), (m2.arrived, m2.failed, m2.reroutes));
        assert_eq!(m1.spawned, 70);
    }

    #[test]
    fn occupancy_never_exceeds_capacity() {
        let mut sim = populated(11);
        sim.schedule(Tick(15), Command::Block(BlockTarget::Node(NodeId(14))));
        sim.schedule(Tick(40), Command::Unblock(BlockTarget::Node(NodeId(14))));
        while !sim.is_finished() {
            sim.step(&mut NoopObserver).unwrap();
            assert!(sim.tracker().within_capacity(), "at {}", sim.current_tick());
            for agent in sim.agents().iter() {
                if let Some(edge) = agent.occupied_edge() {
                    assert!(sim.tracker().occupancy(edge) >= 1);
                }
            }
        }
    }

    #[test]
    fn statuses_follow_the_lifecycle() {
        let mut recorder = Recorder::default();
        let mut sim = populated(3);
        sim.schedule(Tick(12), Command::Block(BlockTarget::Edge(EdgeId(10))));
        sim.run(&mut recorder).unwrap();

        let mut history: HashMap<AgentId, Vec<AgentStatus>> = HashMap::new();
        for snapshot in &recorder.snapshots {
            for record in &snapshot.records {
                history.entry(record.agent).or_default().push(record.status);
            }
        }
        for (agent, statuses) in history {
            let terminal = statuses.iter().position(|s| s.is_terminal());
            if let Some(i) = terminal {
                assert_eq!(i, statuses.len() - 1, "{agent} recorded after finishing");
            }
            let first_active = statuses.iter().position(|&s| s != AgentStatus::Pending);
            if let Some(i) = first_active {
                assert!(
                    statuses[i..].iter().all(|&s| s != AgentStatus::Pending),
                    "{agent} went back to pending"
                );
            }
        }
    }

    #[test]
    fn run_ends_early_once_everyone_is_done() {
        let (net, [a, _, c]) = corridor();
        let mut recorder = Recorder::default();
        let mut sim = SimBuilder::new(test_config(100), net)
            .lights(no_lights())
            .agent(SpawnRequest::new(AgentClass::Car, a, c))
            .build()
            .unwrap();
        let metrics = sim.run(&mut recorder).unwrap();

        assert!(recorder.started);
        assert!(metrics.ticks < 10);
        assert_eq!(metrics.arrived, 1);
        assert_eq!(metrics.records, recorder.snapshots.iter().map(|s| s.len() as u64).sum());
        let (final_tick, ended) = recorder.ended.unwrap();
        assert_eq!(final_tick, Tick(metrics.ticks));
        assert_eq!(ended.arrived, 1);
        assert!(sim.is_finished());
        assert_eq!(sim.agents().retired().len(), 1);
    }

    #[test]
    fn spawn_onto_another_island_is_rejected() {
        let mut b = RoadNetworkBuilder::new();
        let a = b.add_node(GeoPoint::new(0.0, 0.0));
        let x = b.add_node(GeoPoint::new(0.0, 0.001));
        let island = b.add_node(GeoPoint::new(0.01, 0.01));
        let y = b.add_node(GeoPoint::new(0.01, 0.011));
        b.add_edge(a, x, 100.0, TravelMode::Drive);
        b.add_edge(island, y, 100.0, TravelMode::Drive);
        let mut sim = SimBuilder::new(test_config(50), b.build())
            .lights(no_lights())
            .build()
            .unwrap();
        let request = SpawnRequest::new(AgentClass::Car, a, y);
        sim.schedule(Tick(1), Command::Spawn(request));
        let mut recorder = Recorder::default();
        sim.step(&mut recorder).unwrap();

        assert_eq!(recorder.rejected, vec![(Tick(1), Command::Spawn(request))]);
        let metrics = sim.metrics();
        assert_eq!((metrics.rejected_commands, metrics.spawned, metrics.failed), (1, 0, 0));
        assert!(sim.agents().is_empty());
        assert_eq!(sim.routes_in_flight(), 0);
    }

    #[test]
    fn destination_cut_off_by_a_blockage_fails_the_agent() {
        let (net, [a, b, c, _]) = detour();
        let mut recorder = Recorder::default();
        let mut sim = SimBuilder::new(test_config(50), net)
            .lights(no_lights())
            .initial_blockages(vec![BlockTarget::Node(b)])
            .agent(SpawnRequest::new(AgentClass::Car, a, c))
            .build()
            .unwrap();
        let metrics = sim.run(&mut recorder).unwrap();

        assert_eq!(metrics.rejected_commands, 0);
        assert_eq!((metrics.spawned, metrics.failed), (1, 1));
        assert_eq!(recorder.summaries[0].failed, 1);
        assert_eq!(metrics.ticks, 1);
    }

    #[test]
    fn invalid_commands_are_rejected_without_effect() {
        let (net, [a, b, c]) = corridor();
        let ab = net.find_edge(a, b, TravelMode::Drive).unwrap();
        let mut sim = SimBuilder::new(test_config(10), net).lights(no_lights()).build().unwrap();
        let epoch = sim.weights().epoch();

        sim.schedule(Tick(1), Command::Block(BlockTarget::Node(NodeId(999))));
        sim.schedule(Tick(1), Command::Unblock(BlockTarget::Edge(ab)));
        sim.schedule(Tick(1), Command::Spawn(SpawnRequest::new(AgentClass::Car, c, a)));
        let mut recorder = Recorder::default();
        sim.step(&mut recorder).unwrap();

        assert_eq!(recorder.rejected.len(), 3);
        assert_eq!(sim.metrics().rejected_commands, 3);
        assert_eq!(sim.weights().epoch(), epoch);
        assert!(sim.agents().is_empty());
        assert_eq!(sim.barriers().blockages().count(), 0);
    }

    #[test]
    fn repeated_trips_hit_the_route_cache() {
        let (net, [a, b, c, _]) = detour();
        let mut sim = SimBuilder::new(test_config(30), net)
            .lights(no_lights())
            .agent(SpawnRequest::new(AgentClass::HeavyVehicle, a, c))
            .build()
            .unwrap();
        sim.schedule(Tick(2), Command::Spawn(SpawnRequest::new(AgentClass::HeavyVehicle, a, c)));
        sim.step(&mut NoopObserver).unwrap();
        sim.step(&mut NoopObserver).unwrap();

        assert_eq!(sim.metrics().cache_hits, 1);
        assert_eq!(sim.metrics().routes_computed, 1);
        let route = sim.agents().get(AgentId(1)).unwrap().route().unwrap();
        assert_eq!(route.nodes, vec![a, b, c]);
    }

    #[test]
    fn disabled_cache_always_asks_the_pool() {
        let (net, [a, _, c, _]) = detour();
        let config = SimConfig { route_cache: false, ..test_config(30) };
        let mut sim = SimBuilder::new(config, net)
            .lights(no_lights())
            .agent(SpawnRequest::new(AgentClass::Car, a, c))
            .build()
            .unwrap();
        sim.schedule(Tick(2), Command::Spawn(SpawnRequest::new(AgentClass::Car, a, c)));
        sim.step(&mut NoopObserver).unwrap();
        sim.step(&mut NoopObserver).unwrap();

        assert_eq!(sim.metrics().cache_hits, 0);
        assert_eq!(sim.metrics().routes_computed, 2);
        assert!(sim.route_cache().is_empty());
    }

    #[test]
    fn snapshot_interval_downsamples_records() {
        let config = SimConfig { snapshot_interval: 5, ..test_config(20) };
        let (net, nodes) = line(30);
        let mut recorder = Recorder::default();
        let mut sim = SimBuilder::new(config, net)
            .lights(no_lights())
            .agent(SpawnRequest::new(AgentClass::HeavyVehicle, nodes[0], nodes[29]))
            .build()
            .unwrap();
        sim.run(&mut recorder).unwrap();

        let ticks: Vec<Tick> = recorder.snapshots.iter().map(|s| s.tick).collect();
        assert_eq!(ticks, vec![Tick(5), Tick(10), Tick(15), Tick(20)]);
        assert_eq!(recorder.summaries.len(), 20);
    }
}

// ── Worker failure ────────────────────────────────────────────────────────────

#[cfg(test)]
mod pool_failure {
    use mt_network::EdgeWeights;
    use mt_routing::{RouteOutcome, Router, RouterFactory, RoutingError, RoutingResult};

    use super::*;
    use crate::{NoopObserver, SimError};

    struct Broken;

    impl Router for Broken {
        fn route(
            &mut self,
            _: &RoadNetwork,
            _: &EdgeWeights,
            _: NodeId,
            _: NodeId,
            _: TravelMode,
        ) -> RoutingResult<RouteOutcome> {
            panic!("broken router");
        }
    }

    #[test]
    fn dead_pool_aborts_the_run() {
        let (net, [a, _, c]) = corridor();
        let factory: RouterFactory = Arc::new(|_: &RoadNetwork| Box::new(Broken) as Box<dyn Router>);
        let config = SimConfig { worker_count: Some(1), ..test_config(10) };
        let mut sim = SimBuilder::new(config, net)
            .lights(no_lights())
            .router(factory)
            .agent(SpawnRequest::new(AgentClass::Car, a, c))
            .build()
            .unwrap();
        assert!(matches!(
            sim.run(&mut NoopObserver),
            Err(SimError::Routing(RoutingError::PoolUnavailable))
        ));
        assert!(!sim.path_health().is_available());
    }
}

// ── Routes still in flight ────────────────────────────────────────────────────

#[cfg(test)]
mod backpressure {
    use std::time::Duration;

    use mt_network::EdgeWeights;
    use mt_routing::{DijkstraRouter, RouteOutcome, Router, RouterFactory, RoutingResult};

    use super::*;
    use crate::NoopObserver;

    /// Correct answers, delivered late.
    struct Slow {
        inner: DijkstraRouter,
        delay: Duration,
    }

    impl Router for Slow {
        fn route(
            &mut self,
            network: &RoadNetwork,
            weights: &EdgeWeights,
            from: NodeId,
            to: NodeId,
            mode: TravelMode,
        ) -> RoutingResult<RouteOutcome> {
            std::thread::sleep(self.delay);
            self.inner.route(network, weights, from, to, mode)
        }
    }

    #[test]
    fn agents_awaiting_a_route_stay_pending_and_hold_nothing() {
        let (net, nodes) = line(4);
        let first_edge = net.find_edge(nodes[0], nodes[1], TravelMode::Drive).unwrap();
        let factory: RouterFactory = Arc::new(|net: &RoadNetwork| {
            Box::new(Slow { inner: DijkstraRouter::new(net), delay: Duration::from_millis(300) })
                as Box<dyn Router>
        });
        let config = SimConfig { await_routes: false, worker_count: Some(1), ..test_config(1_000) };
        let mut sim = SimBuilder::new(config, net)
            .lights(no_lights())
            .router(factory)
            .agent(SpawnRequest::new(AgentClass::HeavyVehicle, nodes[0], nodes[3]))
            .build()
            .unwrap();
        assert_eq!(sim.routes_in_flight(), 1);

        let mut waited = 0;
        while sim.routes_in_flight() > 0 {
            let agent = sim.agents().get(AgentId(0)).unwrap();
            assert_eq!(agent.status, AgentStatus::Pending, "after {waited} ticks");
            assert_eq!(agent.occupied_edge(), None);
            assert_eq!(sim.tracker().total_occupancy(), 0);
            let summary = sim.step(&mut NoopObserver).unwrap();
            if sim.routes_in_flight() > 0 {
                assert_eq!((summary.pending, summary.occupancy), (1, 0));
            }
            waited += 1;
            std::thread::sleep(Duration::from_millis(5));
        }
        assert!(waited > 1, "the tick loop never blocked on the slow router");

        let agent = sim.agents().get(AgentId(0)).unwrap();
        assert_eq!(agent.status, AgentStatus::Moving);
        assert_eq!(agent.occupied_edge(), Some(first_edge));
        assert_eq!(sim.tracker().occupancy(first_edge), 1);
    }
}

// ── Population and memory ─────────────────────────────────────────────────────

#[cfg(test)]
mod population {
    use mt_core::{SimRng, SpawnDistribution};

    use super::*;
    use crate::{plan_population, MemoryHealth, SimError};

    #[test]
    fn plan_is_seeded_and_respects_the_window() {
        let net = grid(5);
        let pop = PopulationConfig {
            pedestrians: 10,
            cars: 10,
            heavy_vehicles: 5,
            spawn: SpawnDistribution::Uniform,
            spawn_window_ticks: 12,
        };
        let a = plan_population(&net, &pop, &mut SimRng::new(9)).unwrap();
        let b = plan_population(&net, &pop, &mut SimRng::new(9)).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 25);
        assert!(a.iter().all(|(t, _)| (1..=12).contains(&t.0)));
        assert!(a.iter().all(|(_, r)| r.origin != r.destination));
        assert_eq!(a.iter().filter(|(_, r)| r.class == AgentClass::Pedestrian).count(), 10);
    }

    #[test]
    fn zero_window_spawns_before_the_first_tick() {
        let pop = PopulationConfig { cars: 4, ..PopulationConfig::default() };
        let plan = plan_population(&grid(3), &pop, &mut SimRng::new(1)).unwrap();
        assert!(plan.iter().all(|(t, _)| *t == Tick::ZERO));
    }

    #[test]
    fn center_weighting_pulls_destinations_inwards() {
        let net = grid(9);
        let centre = GeoPoint::new(0.004, 0.004);
        let near = |plan: &[(Tick, SpawnRequest)]| {
            plan.iter()
                .filter(|(_, r)| net.node_pos(r.destination).deg_distance(centre) <= 0.0015)
                .count()
        };
        let count = 2_000;
        let uniform = PopulationConfig { cars: count, ..PopulationConfig::default() };
        let morning = PopulationConfig {
            cars: count,
            spawn: SpawnDistribution::CenterWeighted { radius_deg: 0.0015, factor: 8.0 },
            ..PopulationConfig::default()
        };
        let u = plan_population(&net, &uniform, &mut SimRng::new(5)).unwrap();
        let m = plan_population(&net, &morning, &mut SimRng::new(5)).unwrap();
        assert!(near(&m) > 2 * near(&u), "morning {} vs uniform {}", near(&m), near(&u));
    }

    #[test]
    fn missing_subgraph_is_a_population_error() {
        let (net, _) = corridor();
        let pop = PopulationConfig { pedestrians: 3, ..PopulationConfig::default() };
        assert!(matches!(
            plan_population(&net, &pop, &mut SimRng::new(1)),
            Err(SimError::Population { requested: 3, .. })
        ));
    }

    #[test]
    fn memory_health_thresholds() {
        assert_eq!(MemoryHealth::assess(None, Some(10)), MemoryHealth::Unknown);
        assert_eq!(MemoryHealth::assess(Some(5.0), None), MemoryHealth::Ok);
        assert_eq!(MemoryHealth::assess(Some(5.0), Some(10)), MemoryHealth::Ok);
        assert!(MemoryHealth::assess(Some(12.0), Some(10)).is_degraded());
    }

    #[test]
    fn tiny_budget_reports_degraded_memory() {
        let (net, _) = corridor();
        let config = SimConfig { memory_budget_mb: Some(0), ..test_config(5) };
        let sim = SimBuilder::new(config, net).lights(no_lights()).build().unwrap();
        if crate::memory_usage_mb().is_some() {
            assert!(sim.metrics().memory_health.is_degraded());
            assert!(sim.metrics().peak_memory_mb.is_some());
        }
    }
}
