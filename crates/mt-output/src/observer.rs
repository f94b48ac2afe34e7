//! `SimOutputObserver<W>` — bridges `SimObserver` to an `OutputWriter`.

use log::warn;

use mt_core::{SimConfig, Tick, TravelMode};
use mt_network::RoadNetwork;
use mt_sim::{RunMetrics, SimObserver, Snapshot, TickSummary};

use crate::row::{AgentSnapshotRow, RoadSegmentRow, TickSummaryRow};
use crate::writer::OutputWriter;
use crate::{OutputError, OutputResult};

/// A [`SimObserver`] that writes the road layer, agent render records and
/// tick summaries to any [`OutputWriter`] backend.
///
/// Errors from the writer are stored internally because `SimObserver` methods
/// have no return value.  After `sim.run()` returns, check for errors with
/// [`take_error`][Self::take_error].
pub struct SimOutputObserver<W: OutputWriter> {
    writer:        W,
    secs_per_tick: u32,
    modes:         Vec<TravelMode>,
    last_error:    Option<OutputError>,
}

impl<W: OutputWriter> SimOutputObserver<W> {
    /// Create an observer backed by `writer`.  Road segments of every travel
    /// mode are written unless narrowed with [`modes`](Self::modes).
    pub fn new(writer: W, config: &SimConfig) -> Self {
        Self {
            writer,
            secs_per_tick: config.secs_per_tick,
            modes:         TravelMode::ALL.to_vec(),
            last_error:    None,
        }
    }

    /// Only export road segments of `modes`.
    pub fn modes(mut self, modes: &[TravelMode]) -> Self {
        self.modes = modes.to_vec();
        self
    }

    /// Take the stored write error (if any) after `sim.run()` returns.
    ///
    /// Returns `None` if all writes succeeded.
    pub fn take_error(&mut self) -> Option<OutputError> {
        self.last_error.take()
    }

    /// Unwrap the inner writer (e.g. to inspect files after the sim).
    pub fn into_writer(self) -> W {
        self.writer
    }

    fn store_err(&mut self, result: OutputResult<()>) {
        if let Err(e) = result {
            // Keep only the first error.
            if self.last_error.is_none() {
                warn!("output writer failed: {e}");
                self.last_error = Some(e);
            }
        }
    }
}

impl<W: OutputWriter> SimObserver for SimOutputObserver<W> {
    fn on_sim_start(&mut self, network: &RoadNetwork) {
        let rows: Vec<RoadSegmentRow> = self
            .modes
            .iter()
            .flat_map(|&mode| {
                network.segments(mode).into_iter().map(move |s| RoadSegmentRow::new(mode, s))
            })
            .collect();
        let result = self.writer.write_segments(&rows);
        self.store_err(result);
    }

    fn on_snapshot(&mut self, snapshot: &Snapshot) {
        if snapshot.is_empty() {
            return;
        }
        let rows: Vec<AgentSnapshotRow> =
            snapshot.records.iter().map(AgentSnapshotRow::from).collect();
        let result = self.writer.write_snapshots(&rows);
        self.store_err(result);
    }

    fn on_tick_end(&mut self, summary: &TickSummary) {
        let row = TickSummaryRow::new(summary, self.secs_per_tick);
        let result = self.writer.write_tick_summary(&row);
        self.store_err(result);
    }

    fn on_sim_end(&mut self, _final_tick: Tick, _metrics: &RunMetrics) {
        let result = self.writer.finish();
        self.store_err(result);
    }
}
