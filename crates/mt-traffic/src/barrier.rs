//! `BarrierManager` — the single writer of blocked flags.
//!
//! Blocking and unblocking go through this manager, which resolves the
//! command against the network, flips the flag in [`EdgeWeights`], and keeps
//! a record of every blockage.  It returns the resolved target so the caller
//! can invalidate cached routes and flag agents for rerouting; it does not
//! touch agents itself.
//!
//! Changes can also be queued for a future tick with
//! [`schedule`](BarrierManager::schedule) and collected by the tick loop via
//! [`drain_due`](BarrierManager::drain_due).

use std::collections::BTreeMap;

use log::info;

use mt_core::{BlockTarget, Tick, TickQueue};
use mt_network::{BarrierTarget, EdgeWeights, RoadNetwork};

use crate::{TrafficError, TrafficResult};

/// A queued block or unblock command.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BarrierChange {
    Block(BlockTarget),
    Unblock(BlockTarget),
}

/// One blockage over its lifetime.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Blockage {
    pub target:         BarrierTarget,
    pub active:         bool,
    pub activated_at:   Tick,
    pub deactivated_at: Option<Tick>,
}

#[derive(Default)]
pub struct BarrierManager {
    active:    BTreeMap<BarrierTarget, Blockage>,
    cleared:   Vec<Blockage>,
    scheduled: TickQueue<BarrierChange>,
}

impl BarrierManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block `target` at `tick`.  Rejects unknown ids and targets that are
    /// already blocked without changing any state.
    pub fn block(
        &mut self,
        network: &RoadNetwork,
        weights: &mut EdgeWeights,
        target: BlockTarget,
        tick: Tick,
    ) -> TrafficResult<BarrierTarget> {
        let resolved = network.resolve_target(target)?;
        if self.active.contains_key(&resolved) {
            return Err(TrafficError::AlreadyBlocked(resolved));
        }
        weights.apply_blockage(resolved);
        self.active.insert(
            resolved,
            Blockage { target: resolved, active: true, activated_at: tick, deactivated_at: None },
        );
        info!("{tick}: blocked {resolved}");
        Ok(resolved)
    }

    /// Clear the blockage on `target` at `tick`.  Agents keep their current
    /// routes; only later path searches see the freed target.
    pub fn unblock(
        &mut self,
        network: &RoadNetwork,
        weights: &mut EdgeWeights,
        target: BlockTarget,
        tick: Tick,
    ) -> TrafficResult<BarrierTarget> {
        let resolved = network.resolve_target(target)?;
        let Some(mut record) = self.active.remove(&resolved) else {
            return Err(TrafficError::NotBlocked(resolved));
        };
        weights.clear_blockage(resolved);
        record.active = false;
        record.deactivated_at = Some(tick);
        self.cleared.push(record);
        info!("{tick}: unblocked {resolved}");
        Ok(resolved)
    }

    /// Queue `change` to be applied at `tick`.
    pub fn schedule(&mut self, tick: Tick, change: BarrierChange) {
        self.scheduled.push(tick, change);
    }

    /// Remove and return every change due at or before `tick`.
    pub fn drain_due(&mut self, tick: Tick) -> Vec<BarrierChange> {
        self.scheduled.drain_due(tick)
    }

    /// Changes still waiting for their tick.
    pub fn scheduled(&self) -> usize {
        self.scheduled.len()
    }

    pub fn is_blocked(&self, target: BarrierTarget) -> bool {
        self.active.contains_key(&target)
    }

    /// Active blockages in target order.
    pub fn blockages(&self) -> impl Iterator<Item = &Blockage> {
        self.active.values()
    }

    /// Blockages that have been lifted, in the order they were lifted.
    pub fn history(&self) -> &[Blockage] {
        &self.cleared
    }
}
