//! `mt-output` — simulation output writers for the meso_traffic engine.
//!
//! The engine itself never persists anything; this crate is the adapter for
//! map and dashboard consumers.  The CSV backend creates:
//!
//! | File                  | Contents                                         |
//! |-----------------------|--------------------------------------------------|
//! | `road_segments.csv`   | Static road layer, one straight segment per edge |
//! | `agent_snapshots.csv` | One render record per agent per snapshot tick    |
//! | `tick_summaries.csv`  | Aggregate counts per tick                        |
//!
//! Backends implement [`OutputWriter`] and are driven by
//! [`SimOutputObserver`], which implements `mt_sim::SimObserver`.
//!
//! # Usage
//!
//! ```rust,ignore
//! use mt_output::{CsvWriter, SimOutputObserver};
//!
//! let writer = CsvWriter::new(Path::new("./output")).unwrap();
//! let mut obs = SimOutputObserver::new(writer, &config);
//! sim.run(&mut obs).unwrap();
//! obs.take_error().map(|e| eprintln!("output error: {e}"));
//! ```

pub mod csv;
pub mod error;
pub mod observer;
pub mod row;
pub mod writer;


pub use csv::CsvWriter;
pub use error::{OutputError, OutputResult};
pub use observer::SimOutputObserver;
pub use row::{AgentSnapshotRow, RoadSegmentRow, TickSummaryRow};
pub use writer::OutputWriter;
