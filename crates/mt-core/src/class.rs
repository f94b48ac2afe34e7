//! Agent classes and their fixed movement constants.

use crate::TravelMode;

/// The closed set of agent kinds.
///
/// | Class          | Mode  | Speed (hops/tick) | Footprint (capacity units) |
/// |----------------|-------|-------------------|----------------------------|
/// | `Pedestrian`   | walk  | 1                 | 1                          |
/// | `Car`          | drive | 2                 | 1                          |
/// | `HeavyVehicle` | drive | 1                 | 3                          |
///
/// Footprints are passenger-car equivalents: a heavy vehicle loads an edge
/// like three cars.  Heavy vehicles are deliberately slowed to one hop per
/// tick; only cars get the double step.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AgentClass {
    Pedestrian,
    Car,
    HeavyVehicle,
}

impl AgentClass {
    pub const ALL: [AgentClass; 3] =
        [AgentClass::Pedestrian, AgentClass::Car, AgentClass::HeavyVehicle];

    /// Maximum number of path hops attempted per tick.
    #[inline]
    pub const fn speed(self) -> u8 {
        match self {
            AgentClass::Pedestrian   => 1,
            AgentClass::Car          => 2,
            AgentClass::HeavyVehicle => 1,
        }
    }

    /// Capacity units consumed on every edge the agent occupies.
    #[inline]
    pub const fn footprint(self) -> u32 {
        match self {
            AgentClass::Pedestrian   => 1,
            AgentClass::Car          => 1,
            AgentClass::HeavyVehicle => 3,
        }
    }

    /// The network subgraph this class travels on.
    #[inline]
    pub const fn mode(self) -> TravelMode {
        match self {
            AgentClass::Pedestrian => TravelMode::Walk,
            AgentClass::Car | AgentClass::HeavyVehicle => TravelMode::Drive,
        }
    }

    /// `true` for classes that must obey traffic-light phases.
    #[inline]
    pub const fn obeys_lights(self) -> bool {
        matches!(self.mode(), TravelMode::Drive)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AgentClass::Pedestrian   => "pedestrian",
            AgentClass::Car          => "car",
            AgentClass::HeavyVehicle => "heavy_vehicle",
        }
    }
}

impl std::fmt::Display for AgentClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
