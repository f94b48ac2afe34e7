//! Synthetic downtown grid.
//!
//! `rows × cols` intersections spaced `spacing_deg` apart, south-west corner
//! at `(origin_lat, origin_lon)`.  Every street carries a two-way drive road
//! and a two-way footway.  Blocks in the central square also get a diagonal
//! footpath, so pedestrians have shortcuts that vehicles do not.

use serde::Deserialize;

use mt_core::{GeoPoint, NodeId, TravelMode};
use mt_network::{RoadNetwork, RoadNetworkBuilder};

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub rows:        usize,
    pub cols:        usize,
    pub origin_lat:  f32,
    pub origin_lon:  f32,
    /// ~110 m per 0.001° of latitude.
    pub spacing_deg: f32,
    /// Half-width (in blocks) of the central square with diagonal footpaths.
    pub plaza_radius: usize,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            rows:         12,
            cols:         12,
            origin_lat:   51.500,
            origin_lon:   -0.130,
            spacing_deg:  0.001,
            plaza_radius: 2,
        }
    }
}

impl GridConfig {
    pub fn center(&self) -> GeoPoint {
        GeoPoint::new(
            self.origin_lat + (self.rows.saturating_sub(1)) as f32 * self.spacing_deg / 2.0,
            self.origin_lon + (self.cols.saturating_sub(1)) as f32 * self.spacing_deg / 2.0,
        )
    }
}

/// Build the grid and return `(network, flat_node_array)`.
///
/// `flat_node_array[row * cols + col]` is the `NodeId` at that grid cell.
pub fn build_network(grid: &GridConfig) -> (RoadNetwork, Vec<NodeId>) {
    let (rows, cols) = (grid.rows, grid.cols);
    let mut bldr = RoadNetworkBuilder::with_capacity(rows * cols, rows * cols * 8);
    let mut nodes = Vec::with_capacity(rows * cols);

    for row in 0..rows {
        for col in 0..cols {
            let lat = grid.origin_lat + row as f32 * grid.spacing_deg;
            let lon = grid.origin_lon + col as f32 * grid.spacing_deg;
            nodes.push(bldr.add_node(GeoPoint::new(lat, lon)));
        }
    }

    let at = |row: usize, col: usize| nodes[row * cols + col];

    for row in 0..rows {
        for col in 0..cols {
            let here = at(row, col);
            if col + 1 < cols {
                bldr.add_street(here, at(row, col + 1), TravelMode::Drive);
                bldr.add_street(here, at(row, col + 1), TravelMode::Walk);
            }
            if row + 1 < rows {
                bldr.add_street(here, at(row + 1, col), TravelMode::Drive);
                bldr.add_street(here, at(row + 1, col), TravelMode::Walk);
            }
        }
    }

    // Diagonal footpaths across the plaza blocks.
    let (mid_row, mid_col) = (rows / 2, cols / 2);
    for row in mid_row.saturating_sub(grid.plaza_radius)..(mid_row + grid.plaza_radius).min(rows.saturating_sub(1)) {
        for col in mid_col.saturating_sub(grid.plaza_radius)..(mid_col + grid.plaza_radius).min(cols.saturating_sub(1)) {
            bldr.add_street(at(row, col), at(row + 1, col + 1), TravelMode::Walk);
        }
    }

    (bldr.build(), nodes)
}
