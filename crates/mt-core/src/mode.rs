//! Travel mode: which subgraph of the road network an agent may use.
//!
//! The road network is mode-partitioned.  Every directed edge belongs to
//! exactly one mode, and path search for an agent only follows edges of the
//! mode its class travels on.

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TravelMode {
    /// Drivable roads (cars, heavy vehicles).
    #[default]
    Drive,
    /// Footways and pavements (pedestrians).
    Walk,
}

impl TravelMode {
    pub const ALL: [TravelMode; 2] = [TravelMode::Drive, TravelMode::Walk];

    /// Human-readable label, useful for CSV column values.
    pub fn as_str(self) -> &'static str {
        match self {
            TravelMode::Drive => "drive",
            TravelMode::Walk  => "walk",
        }
    }
}

impl std::fmt::Display for TravelMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
