//! Simulation observer trait for progress reporting and data collection.

use mt_core::Tick;
use mt_network::RoadNetwork;

use crate::{Command, RunMetrics, Snapshot, TickSummary};

/// Callbacks invoked by [`Simulation::step`][crate::Simulation::step] and
/// [`Simulation::run`][crate::Simulation::run] at key points in the tick
/// loop.
///
/// All methods have default no-op implementations so implementors only need to
/// override what they care about.
///
/// # Example: progress printer
///
/// ```rust,ignore
/// struct ProgressPrinter { interval: u64 }
///
/// impl SimObserver for ProgressPrinter {
///     fn on_tick_end(&mut self, summary: &TickSummary) {
///         if summary.tick.0 % self.interval == 0 {
///             println!("{}: {} live, {} stalled", summary.tick, summary.live, summary.stalled);
///         }
///     }
/// }
/// ```
pub trait SimObserver {
    /// Called once before the first tick of [`run`][crate::Simulation::run].
    ///
    /// Map consumers draw the static road layer from here
    /// (`network.segments(TravelMode::Drive)`).
    fn on_sim_start(&mut self, _network: &RoadNetwork) {}

    /// Called at the very start of each tick, after the clock advanced.
    fn on_tick_start(&mut self, _tick: Tick) {}

    /// Called when a due command is rejected.  State is unchanged.
    fn on_command_rejected(&mut self, _tick: Tick, _command: &Command, _reason: &str) {}

    /// Called every `config.snapshot_interval` ticks with one render record
    /// per live agent.
    fn on_snapshot(&mut self, _snapshot: &Snapshot) {}

    /// Called at the end of each tick.
    fn on_tick_end(&mut self, _summary: &TickSummary) {}

    /// Called once after the final tick completes.
    fn on_sim_end(&mut self, _final_tick: Tick, _metrics: &RunMetrics) {}
}

/// A [`SimObserver`] that does nothing.  Use when you need to call `run` but
/// don't want progress callbacks.
pub struct NoopObserver;

impl SimObserver for NoopObserver {}

/// Runs two observers side by side, `A` first.
///
/// ```rust,ignore
/// sim.run(&mut (csv_writer, ProgressPrinter { interval: 10 }))?;
/// ```
impl<A: SimObserver, B: SimObserver> SimObserver for (A, B) {
    fn on_sim_start(&mut self, network: &RoadNetwork) {
        self.0.on_sim_start(network);
        self.1.on_sim_start(network);
    }

    fn on_tick_start(&mut self, tick: Tick) {
        self.0.on_tick_start(tick);
        self.1.on_tick_start(tick);
    }

    fn on_command_rejected(&mut self, tick: Tick, command: &Command, reason: &str) {
        self.0.on_command_rejected(tick, command, reason);
        self.1.on_command_rejected(tick, command, reason);
    }

    fn on_snapshot(&mut self, snapshot: &Snapshot) {
        self.0.on_snapshot(snapshot);
        self.1.on_snapshot(snapshot);
    }

    fn on_tick_end(&mut self, summary: &TickSummary) {
        self.0.on_tick_end(summary);
        self.1.on_tick_end(summary);
    }

    fn on_sim_end(&mut self, final_tick: Tick, metrics: &RunMetrics) {
        self.0.on_sim_end(final_tick, metrics);
        self.1.on_sim_end(final_tick, metrics);
    }
}
