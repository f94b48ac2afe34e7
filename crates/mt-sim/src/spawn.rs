//! Initial population planning.
//!
//! Turns a [`PopulationConfig`] into concrete `(tick, SpawnRequest)` pairs.
//! Origins are drawn uniformly from nodes that have an out-edge in the
//! class's subgraph; destinations follow the configured
//! [`SpawnDistribution`].  All draws come from one [`SimRng`] in a fixed
//! order (pedestrians, then cars, then heavy vehicles), so a seed fully
//! determines the plan.

use rand::distributions::WeightedIndex;

use mt_core::{AgentClass, GeoPoint, NodeId, PopulationConfig, SimRng, SpawnDistribution, Tick};
use mt_network::RoadNetwork;

use crate::{SimError, SimResult, SpawnRequest};

/// Draws a destination different from, and connected to, the origin at most
/// this many times before keeping the last draw.
const DESTINATION_ATTEMPTS: usize = 8;

/// Candidate nodes and destination weights for one travel mode.
struct ModeTable {
    origins:      Vec<NodeId>,
    destinations: Vec<NodeId>,
    weights:      WeightedIndex<f32>,
}

impl ModeTable {
    fn build(
        network: &RoadNetwork,
        class: AgentClass,
        requested: u32,
        spawn: SpawnDistribution,
        center: Option<GeoPoint>,
    ) -> SimResult<Self> {
        let mode = class.mode();
        let destinations = network.nodes_with_mode(mode);
        let origins: Vec<NodeId> = destinations
            .iter()
            .copied()
            .filter(|&n| network.out_degree(n, mode) > 0)
            .collect();
        if origins.is_empty() {
            return Err(SimError::Population {
                class: class.as_str(),
                requested,
                reason: format!("the network has no {mode} edges"),
            });
        }

        let weights: Vec<f32> = match (spawn, center) {
            (SpawnDistribution::CenterWeighted { radius_deg, factor }, Some(c)) => destinations
                .iter()
                .map(|&n| {
                    let base = network.out_degree(n, mode) as f32 + 1.0;
                    if network.node_pos(n).deg_distance(c) <= radius_deg {
                        base * factor
                    } else {
                        base
                    }
                })
                .collect(),
            _ => vec![1.0; destinations.len()],
        };
        let weights = WeightedIndex::new(weights).map_err(|e| SimError::Population {
            class: class.as_str(),
            requested,
            reason: format!("invalid destination weights: {e}"),
        })?;
        Ok(Self { origins, destinations, weights })
    }
}

/// Plan every agent of `population` on `network`.
///
/// With `spawn_window_ticks == 0` every request is due at tick 0; otherwise
/// each is due at a uniform tick in `1..=spawn_window_ticks`.  The result is
/// in draw order, not tick order.
pub fn plan_population(
    network: &RoadNetwork,
    population: &PopulationConfig,
    rng: &mut SimRng,
) -> SimResult<Vec<(Tick, SpawnRequest)>> {
    let center = GeoPoint::centroid(&network.node_pos);
    let mut plan = Vec::with_capacity(population.total() as usize);

    let classes = [
        (AgentClass::Pedestrian, population.pedestrians),
        (AgentClass::Car, population.cars),
        (AgentClass::HeavyVehicle, population.heavy_vehicles),
    ];
    for (class, count) in classes {
        if count == 0 {
            continue;
        }
        let table = ModeTable::build(network, class, count, population.spawn, center)?;
        for _ in 0..count {
            let tick = if population.spawn_window_ticks == 0 {
                Tick::ZERO
            } else {
                Tick(rng.gen_range(1..=population.spawn_window_ticks))
            };
            let origin = table.origins[rng.gen_range(0..table.origins.len())];
            let mut destination = origin;
            for _ in 0..DESTINATION_ATTEMPTS {
                destination = table.destinations[rng.choose_weighted_index(&table.weights)];
                if destination != origin && network.connected(origin, destination, class.mode()) {
                    break;
                }
            }
            plan.push((tick, SpawnRequest::new(class, origin, destination)));
        }
    }
    Ok(plan)
}
