//! Geographic coordinate type and spatial utilities.
//!
//! `GeoPoint` uses `f32` (single-precision) latitude/longitude.  At city
//! latitudes this keeps well under a metre of precision, which is finer than
//! the 5-decimal rounding render consumers expect, while halving the size of
//! every stored agent path compared to `f64`.

/// A WGS-84 geographic coordinate stored as single-precision floats.
#[derive(Copy, Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GeoPoint {
    pub lat: f32,
    pub lon: f32,
}

/// Dominant compass axis of a directed movement.  Traffic lights grant the
/// right of way to one axis at a time.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Axis {
    NorthSouth,
    EastWest,
}

impl GeoPoint {
    #[inline]
    pub fn new(lat: f32, lon: f32) -> Self {
        Self { lat, lon }
    }

    /// Haversine great-circle distance in metres.
    pub fn distance_m(self, other: GeoPoint) -> f32 {
        const R: f32 = 6_371_000.0; // mean Earth radius, metres

        let d_lat = (other.lat - self.lat).to_radians();
        let d_lon = (other.lon - self.lon).to_radians();

        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();

        let a = (d_lat * 0.5).sin().powi(2)
            + lat1.cos() * lat2.cos() * (d_lon * 0.5).sin().powi(2);

        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
        R * c
    }

    /// Planar distance in degrees.  Only meaningful for ranking nearby points
    /// (centre weighting, snapping), never as a physical length.
    #[inline]
    pub fn deg_distance(self, other: GeoPoint) -> f32 {
        let dlat = self.lat - other.lat;
        let dlon = self.lon - other.lon;
        (dlat * dlat + dlon * dlon).sqrt()
    }

    /// The axis a movement from `self` to `to` mostly follows.  Ties go to
    /// `NorthSouth`.
    #[inline]
    pub fn axis_to(self, to: GeoPoint) -> Axis {
        if (to.lat - self.lat).abs() >= (to.lon - self.lon).abs() {
            Axis::NorthSouth
        } else {
            Axis::EastWest
        }
    }

    /// Arithmetic mean of `points`, or `None` for an empty slice.
    pub fn centroid(points: &[GeoPoint]) -> Option<GeoPoint> {
        if points.is_empty() {
            return None;
        }
        let (lat, lon) = points
            .iter()
            .fold((0.0f64, 0.0f64), |(la, lo), p| (la + p.lat as f64, lo + p.lon as f64));
        let n = points.len() as f64;
        Some(GeoPoint::new((lat / n) as f32, (lon / n) as f32))
    }
}

impl std::fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.5}, {:.5})", self.lat, self.lon)
    }
}
