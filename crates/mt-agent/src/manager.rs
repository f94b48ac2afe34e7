//! `AgentManager` — agent lifecycle and per-tick advancement.
//!
//! # Movement model
//!
//! An agent stands on the nodes of its route.  Standing on `nodes[i]`
//! (for `i > 0`) means it holds capacity on `edges[i - 1]`, the edge it
//! arrived over.  Each tick it attempts up to `class.speed()` hops; a hop
//! admits it onto `edges[i]` and only then releases `edges[i - 1]`, so an
//! agent never holds zero edges mid-route and never holds two at the end of
//! a tick.
//!
//! A hop is attempted only if the next edge is still traversable under the
//! current weights, the light at the current node allows the edge's axis
//! (drive classes only), and the congestion tracker admits the agent's
//! footprint.  A refusal leaves the agent `Stalled` on its edge; it retries
//! next tick.  An untraversable next edge triggers a reroute request instead.
//!
//! The hop that reaches the final node ends the agent's turn: it is marked
//! `Arrived` and its last edge is released in the same tick.
//!
//! Agents are processed in ascending `AgentId` order, so results are
//! reproducible for a given seed.

use std::collections::BTreeMap;

use log::{debug, trace};

use mt_core::{AgentClass, AgentId, NodeId, Tick, TravelMode};
use mt_network::{BarrierTarget, EdgeWeights, RoadNetwork};
use mt_routing::RouteOutcome;
use mt_traffic::{CongestionTracker, TrafficLightController};

use crate::{
    Agent, AgentError, AgentRecord, AgentResult, AgentStatus, AgentSummary, FailReason,
};

/// What the manager needs to move agents for one tick.  Borrowed for the
/// duration of `advance_all` only.
pub struct Movement<'a> {
    pub network: &'a RoadNetwork,
    pub weights: &'a EdgeWeights,
    pub tracker: &'a mut CongestionTracker,
    pub lights:  &'a TrafficLightController,
}

/// A path request the tick loop must submit on an agent's behalf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RerouteRequest {
    pub agent:       AgentId,
    pub origin:      NodeId,
    pub destination: NodeId,
    pub mode:        TravelMode,
}

/// Counts from one `advance_all` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdvanceReport {
    /// Hops taken across all agents.
    pub hops:     u64,
    pub moved:    usize,
    pub stalled:  usize,
    pub arrived:  usize,
    /// Agents whose next edge turned out to be blocked on first use.
    pub reroutes: Vec<RerouteRequest>,
}

/// Cumulative and current counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AgentCounters {
    pub spawned:  u64,
    pub arrived:  u64,
    pub failed:   u64,
    pub reroutes: u64,
    /// Agent-ticks spent stalled.
    pub stall_ticks: u64,
    /// Currently live (not yet retired) agents by status.
    pub pending: usize,
    pub moving:  usize,
    pub stalled: usize,
}

#[derive(Default)]
pub struct AgentManager {
    agents:   BTreeMap<AgentId, Agent>,
    retired:  Vec<AgentSummary>,
    next_id:  u32,
    counters: AgentCounters,
}

impl AgentManager {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Spawning & routes ─────────────────────────────────────────────────

    /// Create a `Pending` agent of `class` travelling `origin → destination`.
    ///
    /// Rejects unknown nodes, an origin with no out-edge in the class's
    /// subgraph, and a destination in a different piece of that subgraph.
    /// A destination cut off only by blockages is accepted; the path search
    /// reports it and the agent fails.
    pub fn spawn(
        &mut self,
        network: &RoadNetwork,
        class: AgentClass,
        origin: NodeId,
        destination: NodeId,
        tick: Tick,
    ) -> AgentResult<AgentId> {
        for node in [origin, destination] {
            if !network.contains_node(node) {
                return Err(AgentError::UnknownNode(node));
            }
        }
        let mode = class.mode();
        if origin != destination && network.out_degree(origin, mode) == 0 {
            return Err(AgentError::ModeUnavailable { node: origin, mode });
        }
        if !network.connected(origin, destination, mode) {
            return Err(AgentError::Unreachable { origin, destination, mode });
        }
        let id = AgentId(self.next_id);
        self.next_id += 1;
        self.agents.insert(
            id,
            Agent::new(id, class, origin, destination, network.node_pos(origin), tick),
        );
        self.counters.spawned += 1;
        trace!("{tick}: spawned {id} ({class}) {origin} → {destination}");
        Ok(id)
    }

    /// Deliver the outcome of the agent's outstanding path request.
    ///
    /// `NoPath` fails the agent.  A found route must start at the node the
    /// agent stands on; the agent keeps the edge it occupies and follows the
    /// new route from there.
    pub fn assign_route(
        &mut self,
        id: AgentId,
        outcome: RouteOutcome,
        tracker: &mut CongestionTracker,
        tick: Tick,
    ) -> AgentResult<AgentStatus> {
        let agent = self.agents.get_mut(&id).ok_or(AgentError::UnknownAgent(id))?;
        if agent.status.is_terminal() || !agent.awaiting_route {
            return Err(AgentError::NotAwaitingRoute(id));
        }
        let route = match outcome {
            RouteOutcome::Found(route) => route,
            RouteOutcome::NoPath => {
                self.fail(id, FailReason::NoPath, tracker, tick)?;
                return Ok(AgentStatus::Failed);
            }
        };
        if route.origin() != Some(agent.current_node()) {
            self.fail(id, FailReason::RouteMismatch, tracker, tick)?;
            return Ok(AgentStatus::Failed);
        }

        let first = agent.route.is_none();
        agent.position = route.coords[0];
        agent.route = Some(route);
        agent.index = 0;
        agent.awaiting_route = false;
        if first {
            agent.status = AgentStatus::Moving;
        } else {
            agent.reroutes += 1;
            self.counters.reroutes += 1;
        }
        Ok(agent.status)
    }

    /// Mark an agent `Failed` and release any capacity it holds.
    pub fn fail(
        &mut self,
        id: AgentId,
        reason: FailReason,
        tracker: &mut CongestionTracker,
        tick: Tick,
    ) -> AgentResult<()> {
        let agent = self.agents.get_mut(&id).ok_or(AgentError::UnknownAgent(id))?;
        if agent.status.is_terminal() {
            return Err(AgentError::AlreadyFinished(id));
        }
        if let Some(edge) = agent.occupied.take() {
            tracker.leave(edge, agent.class.footprint());
        }
        agent.status = AgentStatus::Failed;
        agent.fail_reason = Some(reason);
        agent.awaiting_route = false;
        agent.finished_at = Some(tick);
        self.counters.failed += 1;
        debug!("{tick}: {id} failed ({reason:?})");
        Ok(())
    }

    // ── Blockages ─────────────────────────────────────────────────────────

    /// Flag every agent whose untravelled route crosses `target` for
    /// rerouting from the node it stands on.  Returns the requests to
    /// submit.  Agents already on the blocked edge keep going.
    pub fn invalidate(&mut self, target: BarrierTarget) -> Vec<RerouteRequest> {
        let mut requests = Vec::new();
        for agent in self.agents.values_mut() {
            if agent.status.is_terminal()
                || agent.awaiting_route
                || !agent.remaining_route_crosses(target)
            {
                continue;
            }
            requests.push(Self::hold_for_reroute(agent));
        }
        if !requests.is_empty() {
            debug!("{target} invalidated {} agent routes", requests.len());
        }
        requests
    }

    fn hold_for_reroute(agent: &mut Agent) -> RerouteRequest {
        agent.awaiting_route = true;
        agent.status = AgentStatus::Stalled;
        RerouteRequest {
            agent:       agent.id,
            origin:      agent.current_node(),
            destination: agent.destination,
            mode:        agent.class.mode(),
        }
    }

    // ── Advancement ───────────────────────────────────────────────────────

    /// Advance every live agent once, in id order.
    pub fn advance_all(&mut self, tick: Tick, mv: &mut Movement<'_>) -> AdvanceReport {
        let mut report = AdvanceReport::default();
        for agent in self.agents.values_mut() {
            if agent.status.is_terminal() {
                continue;
            }
            agent.ticks_alive += 1;

            if agent.awaiting_route {
                if agent.status == AgentStatus::Stalled {
                    agent.stalled_ticks += 1;
                    self.counters.stall_ticks += 1;
                }
                continue;
            }

            // Trivial routes (origin == destination) finish on the first turn.
            if agent.at_destination() {
                Self::arrive(agent, mv.tracker, tick);
                self.counters.arrived += 1;
                report.arrived += 1;
                continue;
            }

            match Self::advance_one(agent, mv) {
                Step::Arrived(hops) => {
                    Self::arrive(agent, mv.tracker, tick);
                    self.counters.arrived += 1;
                    report.hops += hops as u64;
                    report.arrived += 1;
                }
                Step::Moved(hops) => {
                    agent.status = AgentStatus::Moving;
                    report.hops += hops as u64;
                    report.moved += 1;
                }
                Step::Held => {
                    agent.status = AgentStatus::Stalled;
                    agent.stalled_ticks += 1;
                    self.counters.stall_ticks += 1;
                    report.stalled += 1;
                }
                Step::Blocked => {
                    report.reroutes.push(Self::hold_for_reroute(agent));
                    agent.stalled_ticks += 1;
                    self.counters.stall_ticks += 1;
                    report.stalled += 1;
                }
            }
        }
        report
    }

    fn arrive(agent: &mut Agent, tracker: &mut CongestionTracker, tick: Tick) {
        if let Some(edge) = agent.occupied.take() {
            tracker.leave(edge, agent.class.footprint());
        }
        agent.status = AgentStatus::Arrived;
        agent.finished_at = Some(tick);
        trace!("{tick}: {} arrived at {}", agent.id, agent.destination);
    }

    /// Up to `speed` hops along the route, stopping at the final node.
    fn advance_one(agent: &mut Agent, mv: &mut Movement<'_>) -> Step {
        let Some(route) = agent.route.as_ref() else {
            return Step::Held;
        };
        let footprint = agent.class.footprint();
        let mut hops: u8 = 0;

        while hops < agent.class.speed() && agent.index + 1 < route.nodes.len() {
            let i = agent.index;
            let next = route.edges[i];

            if !mv.weights.is_traversable(mv.network, next) {
                return if hops == 0 { Step::Blocked } else { Step::Moved(hops) };
            }
            if agent.class.obeys_lights() {
                let axis = route.coords[i].axis_to(route.coords[i + 1]);
                if !mv.lights.allows(route.nodes[i], axis) {
                    break;
                }
            }
            if !mv.tracker.enter(next, footprint).is_admitted() {
                break;
            }
            if let Some(prev) = agent.occupied.replace(next) {
                mv.tracker.leave(prev, footprint);
            }
            agent.index += 1;
            agent.position = route.coords[agent.index];
            hops += 1;
            if agent.index + 1 == route.nodes.len() {
                return Step::Arrived(hops);
            }
        }

        if hops == 0 { Step::Held } else { Step::Moved(hops) }
    }

    // ── Retirement & views ────────────────────────────────────────────────

    /// Remove agents that arrived or failed, keeping a summary of each.
    /// Returns how many were retired.
    pub fn retire_finished(&mut self) -> usize {
        let before = self.agents.len();
        let retired = &mut self.retired;
        self.agents.retain(|_, a| {
            if a.status.is_terminal() {
                retired.push(AgentSummary::from(&*a));
                false
            } else {
                true
            }
        });
        before - self.agents.len()
    }

    /// Render records for every live agent, in id order.
    #[cfg(not(feature = "parallel"))]
    pub fn snapshot_records(&self, tick: Tick) -> Vec<AgentRecord> {
        self.agents.values().map(|a| record(a, tick)).collect()
    }

    /// Render records for every live agent, in id order.
    #[cfg(feature = "parallel")]
    pub fn snapshot_records(&self, tick: Tick) -> Vec<AgentRecord> {
        use rayon::prelude::*;
        self.agents.par_iter().map(|(_, a)| record(a, tick)).collect()
    }

    pub fn get(&self, id: AgentId) -> Option<&Agent> {
        self.agents.get(&id)
    }

    /// Live agents in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Agent> {
        self.agents.values()
    }

    /// Summaries of retired agents, in retirement order.
    pub fn retired(&self) -> &[AgentSummary] {
        &self.retired
    }

    /// Live (not yet retired) agents.
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// `true` if every live agent has arrived or failed.
    pub fn all_finished(&self) -> bool {
        self.agents.values().all(|a| a.status.is_terminal())
    }

    pub fn counters(&self) -> AgentCounters {
        let mut c = self.counters;
        for a in self.agents.values() {
            match a.status {
                AgentStatus::Pending => c.pending += 1,
                AgentStatus::Moving  => c.moving += 1,
                AgentStatus::Stalled => c.stalled += 1,
                AgentStatus::Arrived | AgentStatus::Failed => {}
            }
        }
        c
    }
}

enum Step {
    Moved(u8),
    /// Reached the final node on the last of these hops.
    Arrived(u8),
    /// Refused by capacity or a red light.
    Held,
    /// Next edge became untraversable after the route was computed.
    Blocked,
}

#[inline]
fn record(a: &Agent, tick: Tick) -> AgentRecord {
    AgentRecord { tick, agent: a.id, class: a.class, position: a.position, status: a.status }
}
