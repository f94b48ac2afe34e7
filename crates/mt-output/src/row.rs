//! Plain data row types written by output backends.

use mt_agent::AgentRecord;
use mt_core::{GeoPoint, TravelMode};
use mt_sim::TickSummary;

/// One agent's render record, flattened for tabular output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgentSnapshotRow {
    pub tick:     u64,
    pub agent_id: u32,
    pub class:    &'static str,
    pub lat:      f32,
    pub lon:      f32,
    pub status:   &'static str,
}

impl From<&AgentRecord> for AgentSnapshotRow {
    fn from(r: &AgentRecord) -> Self {
        Self {
            tick:     r.tick.0,
            agent_id: r.agent.0,
            class:    r.class.as_str(),
            lat:      r.position.lat,
            lon:      r.position.lon,
            status:   r.status.as_str(),
        }
    }
}

/// Aggregate counts for one simulation tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickSummaryRow {
    pub tick:           u64,
    /// Simulated seconds since tick 0.
    pub elapsed_secs:   u64,
    pub live:           u64,
    pub pending:        u64,
    pub moving:         u64,
    pub stalled:        u64,
    pub arrived:        u64,
    pub failed:         u64,
    pub occupancy:      u64,
    pub routes_pending: u64,
}

impl TickSummaryRow {
    pub fn new(summary: &TickSummary, secs_per_tick: u32) -> Self {
        Self {
            tick:           summary.tick.0,
            elapsed_secs:   summary.tick.0 * secs_per_tick as u64,
            live:           summary.live as u64,
            pending:        summary.pending as u64,
            moving:         summary.moving as u64,
            stalled:        summary.stalled as u64,
            arrived:        summary.arrived as u64,
            failed:         summary.failed as u64,
            occupancy:      summary.occupancy,
            routes_pending: summary.routes_pending as u64,
        }
    }
}

/// One straight road segment of the static map layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoadSegmentRow {
    pub mode: &'static str,
    pub from: GeoPoint,
    pub to:   GeoPoint,
}

impl RoadSegmentRow {
    pub fn new(mode: TravelMode, [from, to]: [GeoPoint; 2]) -> Self {
        Self { mode: mode.as_str(), from, to }
    }
}
