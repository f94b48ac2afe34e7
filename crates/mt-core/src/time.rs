//! Simulation time model.
//!
//! Time is a monotonically increasing `Tick` counter.  Every periodic
//! behaviour in the engine (traffic-light toggles, congestion sampling,
//! snapshot downsampling) is expressed as `tick mod period == 0`, so integer
//! ticks keep all of it exact and reproducible.
//!
//! `SimClock` optionally maps ticks to simulated seconds for human-readable
//! logging; nothing in the engine depends on that mapping.

use std::fmt;

// ── Tick ─────────────────────────────────────────────────────────────────────

/// An absolute simulation tick counter.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tick(pub u64);

impl Tick {
    pub const ZERO: Tick = Tick(0);

    /// Return the tick `n` steps after `self`.
    #[inline]
    pub fn offset(self, n: u64) -> Tick {
        Tick(self.0 + n)
    }

    /// Ticks elapsed from `earlier` to `self` (saturating at zero).
    #[inline]
    pub fn since(self, earlier: Tick) -> u64 {
        self.0.saturating_sub(earlier.0)
    }

    /// `true` when this tick falls on a multiple of `period`.  A zero period
    /// never matches.
    #[inline]
    pub fn is_multiple_of(self, period: u64) -> bool {
        period != 0 && self.0 % period == 0
    }
}

impl std::ops::Add<u64> for Tick {
    type Output = Tick;
    #[inline]
    fn add(self, rhs: u64) -> Tick {
        Tick(self.0 + rhs)
    }
}

impl std::ops::Sub for Tick {
    type Output = u64;
    #[inline]
    fn sub(self, rhs: Tick) -> u64 {
        self.0 - rhs.0
    }
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}

// ── SimClock ──────────────────────────────────────────────────────────────────

/// The authoritative tick counter of a run.
///
/// Only the tick loop advances it.  `secs_per_tick` is informational.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SimClock {
    /// The current tick, advanced by `SimClock::advance()` each iteration.
    pub current_tick: Tick,
    /// How many simulated seconds one tick represents.  Default: 1.
    pub secs_per_tick: u32,
}

impl SimClock {
    pub fn new(secs_per_tick: u32) -> Self {
        Self { current_tick: Tick::ZERO, secs_per_tick }
    }

    /// Advance the clock by one tick and return the new tick.
    #[inline]
    pub fn advance(&mut self) -> Tick {
        self.current_tick = self.current_tick.offset(1);
        self.current_tick
    }

    /// Elapsed simulated seconds since tick 0.
    #[inline]
    pub fn elapsed_secs(&self) -> u64 {
        self.current_tick.0 * self.secs_per_tick as u64
    }
}

impl Default for SimClock {
    fn default() -> Self {
        Self::new(1)
    }
}

impl fmt::Display for SimClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.elapsed_secs();
        write!(
            f,
            "{} ({:02}:{:02}:{:02})",
            self.current_tick,
            secs / 3_600,
            (secs % 3_600) / 60,
            secs % 60
        )
    }
}
