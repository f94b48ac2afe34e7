//! CSV output backend.
//!
//! Creates three files in the configured output directory:
//! - `road_segments.csv`
//! - `agent_snapshots.csv`
//! - `tick_summaries.csv`

use std::fs::{self, File};
use std::path::Path;

use csv::Writer;

use crate::writer::OutputWriter;
use crate::{AgentSnapshotRow, OutputResult, RoadSegmentRow, TickSummaryRow};

pub const SEGMENTS_FILE: &str = "road_segments.csv";
pub const SNAPSHOTS_FILE: &str = "agent_snapshots.csv";
pub const SUMMARIES_FILE: &str = "tick_summaries.csv";

/// Writes simulation output to three CSV files.
pub struct CsvWriter {
    segments:  Writer<File>,
    snapshots: Writer<File>,
    summaries: Writer<File>,
    finished:  bool,
}

impl CsvWriter {
    /// Create `dir` if needed, open (or truncate) the CSV files in it and
    /// write the header rows.
    pub fn new(dir: &Path) -> OutputResult<Self> {
        fs::create_dir_all(dir)?;

        let mut segments = Writer::from_path(dir.join(SEGMENTS_FILE))?;
        segments.write_record(["mode", "from_lat", "from_lon", "to_lat", "to_lon"])?;

        let mut snapshots = Writer::from_path(dir.join(SNAPSHOTS_FILE))?;
        snapshots.write_record(["tick", "agent_id", "class", "lat", "lon", "status"])?;

        let mut summaries = Writer::from_path(dir.join(SUMMARIES_FILE))?;
        summaries.write_record([
            "tick",
            "elapsed_secs",
            "live",
            "pending",
            "moving",
            "stalled",
            "arrived",
            "failed",
            "occupancy",
            "routes_pending",
        ])?;

        Ok(Self { segments, snapshots, summaries, finished: false })
    }
}

impl OutputWriter for CsvWriter {
    fn write_segments(&mut self, rows: &[RoadSegmentRow]) -> OutputResult<()> {
        for row in rows {
            self.segments.write_record(&[
                row.mode.to_string(),
                row.from.lat.to_string(),
                row.from.lon.to_string(),
                row.to.lat.to_string(),
                row.to.lon.to_string(),
            ])?;
        }
        Ok(())
    }

    fn write_snapshots(&mut self, rows: &[AgentSnapshotRow]) -> OutputResult<()> {
        for row in rows {
            self.snapshots.write_record(&[
                row.tick.to_string(),
                row.agent_id.to_string(),
                row.class.to_string(),
                row.lat.to_string(),
                row.lon.to_string(),
                row.status.to_string(),
            ])?;
        }
        Ok(())
    }

    fn write_tick_summary(&mut self, row: &TickSummaryRow) -> OutputResult<()> {
        self.summaries.write_record(&[
            row.tick.to_string(),
            row.elapsed_secs.to_string(),
            row.live.to_string(),
            row.pending.to_string(),
            row.moving.to_string(),
            row.stalled.to_string(),
            row.arrived.to_string(),
            row.failed.to_string(),
            row.occupancy.to_string(),
            row.routes_pending.to_string(),
        ])?;
        Ok(())
    }

    fn finish(&mut self) -> OutputResult<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        self.segments.flush()?;
        self.snapshots.flush()?;
        self.summaries.flush()?;
        Ok(())
    }
}
