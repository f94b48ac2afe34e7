//! Fixed-time traffic lights.
//!
//! Each controlled intersection alternates between two phases.  A light
//! with toggle period `P` flips on every tick where `tick > 0` and
//! `tick mod P == 0`, so the phase at any tick has a closed form and
//! depends only on the starting phase.
//!
//! Lights gate movement only: while a phase forbids an axis, drive edges
//! entering the intersection along that axis are refused admission.  Path
//! search deliberately ignores phases: a phase changes every few ticks, far
//! faster than routes are recomputed, so a red light delays an agent but
//! never reroutes it.

use rustc_hash::FxHashMap;

use mt_core::{Axis, NodeId, Tick, TravelMode};
use mt_network::RoadNetwork;

use crate::{TrafficError, TrafficResult};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Phase {
    /// North-south movements may proceed.
    AllowNorthSouth,
    /// East-west movements may proceed.
    AllowEastWest,
}

impl Phase {
    #[inline]
    pub fn toggled(self) -> Self {
        match self {
            Phase::AllowNorthSouth => Phase::AllowEastWest,
            Phase::AllowEastWest   => Phase::AllowNorthSouth,
        }
    }

    #[inline]
    pub fn allows(self, axis: Axis) -> bool {
        matches!(
            (self, axis),
            (Phase::AllowNorthSouth, Axis::NorthSouth) | (Phase::AllowEastWest, Axis::EastWest)
        )
    }
}

#[derive(Clone, Debug)]
pub struct TrafficLight {
    pub node:          NodeId,
    pub phase:         Phase,
    pub toggle_period: u64,
    pub last_toggle:   Tick,
    initial:           Phase,
}

impl TrafficLight {
    pub fn new(node: NodeId, toggle_period: u64, initial: Phase) -> TrafficResult<Self> {
        if toggle_period == 0 {
            return Err(TrafficError::ZeroTogglePeriod { node });
        }
        Ok(Self { node, phase: initial, toggle_period, last_toggle: Tick::ZERO, initial })
    }

    /// Phase at `tick` without stepping the light.
    pub fn phase_at(&self, tick: Tick) -> Phase {
        if (tick.0 / self.toggle_period) % 2 == 0 {
            self.initial
        } else {
            self.initial.toggled()
        }
    }

    /// `true` if the light flips on `tick`.
    #[inline]
    pub fn toggles_at(&self, tick: Tick) -> bool {
        tick.0 > 0 && tick.is_multiple_of(self.toggle_period)
    }
}

// ── Controller ────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct TrafficLightController {
    lights: Vec<TrafficLight>,
    by_node: FxHashMap<NodeId, usize>,
    toggles: u64,
}

impl TrafficLightController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install (or replace) a light at `node`, starting in north-south phase.
    pub fn install(&mut self, node: NodeId, toggle_period: u64) -> TrafficResult<()> {
        self.install_with_phase(node, toggle_period, Phase::AllowNorthSouth)
    }

    pub fn install_with_phase(
        &mut self,
        node: NodeId,
        toggle_period: u64,
        initial: Phase,
    ) -> TrafficResult<()> {
        let light = TrafficLight::new(node, toggle_period, initial)?;
        match self.by_node.get(&node) {
            Some(&i) => self.lights[i] = light,
            None => {
                self.by_node.insert(node, self.lights.len());
                self.lights.push(light);
            }
        }
        Ok(())
    }

    /// Install a light at every intersection with more than two drivable
    /// out-edges.  Returns the number of lights installed.
    pub fn auto_place(&mut self, network: &RoadNetwork, toggle_period: u64) -> TrafficResult<usize> {
        let mut placed = 0;
        for i in 0..network.node_count() {
            let node = NodeId(i as u32);
            if network.out_degree(node, TravelMode::Drive) > 2 {
                self.install(node, toggle_period)?;
                placed += 1;
            }
        }
        Ok(placed)
    }

    /// Step every light to `tick`.  Returns how many toggled.
    pub fn update(&mut self, tick: Tick) -> usize {
        let mut toggled = 0;
        for light in &mut self.lights {
            if light.toggles_at(tick) {
                light.phase = light.phase.toggled();
                light.last_toggle = tick;
                toggled += 1;
            }
        }
        self.toggles += toggled as u64;
        toggled
    }

    /// Current phase at `node`, or `None` for an uncontrolled node.
    pub fn phase(&self, node: NodeId) -> Option<Phase> {
        self.light(node).map(|l| l.phase)
    }

    /// Phase `node` will have at `tick`.
    pub fn phase_at(&self, node: NodeId, tick: Tick) -> Option<Phase> {
        self.light(node).map(|l| l.phase_at(tick))
    }

    /// `true` if movement into `node` along `axis` is allowed now.
    /// Uncontrolled nodes allow everything.
    #[inline]
    pub fn allows(&self, node: NodeId, axis: Axis) -> bool {
        self.phase(node).is_none_or(|p| p.allows(axis))
    }

    pub fn light(&self, node: NodeId) -> Option<&TrafficLight> {
        self.by_node.get(&node).map(|&i| &self.lights[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrafficLight> {
        self.lights.iter()
    }

    pub fn len(&self) -> usize {
        self.lights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lights.is_empty()
    }

    /// Toggles performed since the run started.
    pub fn toggles(&self) -> u64 {
        self.toggles
    }
}
