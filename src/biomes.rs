//! Biome classification
//!
//! A moisture/temperature matrix lookup with special cases for permafrost,
//! marine and wetland cells. The table itself is data, loadable from JSON to
//! reskin the world without touching the pipeline.

use serde::{Deserialize, Serialize};

use crate::regraph::Pack;
use crate::utils::rn;
use crate::world::{Grid, WorldGenError};

pub const MARINE: u8 = 0;
pub const GLACIER: u8 = 11;
pub const WETLAND: u8 = 12;

/// The full biome table: names, habitability and movement cost per biome,
/// and the 5x26 moisture-by-temperature classification matrix.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BiomesData {
    pub names: Vec<String>,
    pub colors: Vec<String>,
    pub habitability: Vec<u8>,
    pub cost: Vec<u16>,
    /// Rows are moisture bands 0-4 (dry to wet), columns temperature bands
    /// 0-25 (hot to cold)
    pub matrix: Vec<Vec<u8>>,
}

impl Default for BiomesData {
    fn default() -> Self {
        let names = [
            "Marine",
            "Hot desert",
            "Cold desert",
            "Savanna",
            "Grassland",
            "Tropical seasonal forest",
            "Temperate deciduous forest",
            "Tropical rainforest",
            "Temperate rainforest",
            "Taiga",
            "Tundra",
            "Glacier",
            "Wetland",
        ];
        let colors = [
            "#466eab", "#fbe79f", "#b5b887", "#d2d082", "#c8d68f", "#b6d95d", "#29bc56",
            "#7dcb35", "#409c43", "#4b6b32", "#96784b", "#d5e7eb", "#0b9131",
        ];
        let matrix = vec![
            vec![1, 1, 1, 1, 1, 1, 1, 1, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 10],
            vec![3, 3, 3, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 9, 9, 9, 9, 10, 10, 10],
            vec![5, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 9, 9, 9, 9, 9, 10, 10, 10],
            vec![5, 6, 6, 6, 6, 6, 6, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8, 9, 9, 9, 9, 9, 9, 10, 10, 10],
            vec![7, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8, 9, 9, 9, 9, 9, 9, 9, 10, 10],
        ];
        Self {
            names: names.iter().map(|s| s.to_string()).collect(),
            colors: colors.iter().map(|s| s.to_string()).collect(),
            habitability: vec![0, 4, 10, 22, 30, 50, 100, 80, 90, 12, 4, 0, 12],
            cost: vec![10, 200, 150, 60, 50, 70, 70, 80, 90, 200, 1000, 5000, 150],
            matrix,
        }
    }
}

impl BiomesData {
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Check a (possibly user-supplied) table for internal consistency.
    pub fn validate(&self) -> Result<(), WorldGenError> {
        let n = self.names.len();
        if n < 13 {
            return Err(WorldGenError::InvalidBiomes(format!(
                "expected at least 13 biomes, got {}",
                n
            )));
        }
        if self.habitability.len() != n || self.cost.len() != n || self.colors.len() != n {
            return Err(WorldGenError::InvalidBiomes(
                "habitability, cost and colors must match the name count".into(),
            ));
        }
        if self.matrix.len() != 5 {
            return Err(WorldGenError::InvalidBiomes(format!(
                "matrix needs 5 moisture bands, got {}",
                self.matrix.len()
            )));
        }
        for (m, row) in self.matrix.iter().enumerate() {
            if row.len() != 26 {
                return Err(WorldGenError::InvalidBiomes(format!(
                    "matrix row {} needs 26 temperature bands, got {}",
                    m,
                    row.len()
                )));
            }
            if let Some(&bad) = row.iter().find(|&&b| b as usize >= n) {
                return Err(WorldGenError::InvalidBiomes(format!(
                    "matrix row {} references unknown biome {}",
                    m, bad
                )));
            }
        }
        Ok(())
    }

    /// Classify one cell from its moisture, temperature and height.
    pub fn biome_id(&self, moisture: f64, temperature: i8, height: u8) -> u8 {
        if temperature < -5 {
            return GLACIER; // permafrost, including sea ice
        }
        if height < 20 {
            return MARINE;
        }
        if moisture > 40.0 && temperature > -2 && (height < 25 || moisture > 24.0 && height > 24) {
            return WETLAND;
        }
        let m = ((moisture / 5.0) as usize).min(4);
        let t = (20 - temperature as i32).clamp(0, 25) as usize;
        self.matrix[m][t]
    }
}

/// Assign a biome to every pack cell. Freshwater lake cells raised for the
/// river pass drop back under water here.
pub fn define_biomes(pack: &mut Pack, grid: &Grid, data: &BiomesData) {
    let n = pack.graph.cells_len();
    pack.biomes = vec![0; n];

    for i in 0..n {
        if pack.features[pack.feature_ids[i] as usize].group == "freshwater" {
            pack.heights[i] = 19;
        }
        let moisture = if pack.heights[i] < 20 {
            0.0
        } else {
            cell_moisture(pack, grid, i)
        };
        let temperature = grid.temperature[pack.grid_parent[i] as usize];
        pack.biomes[i] = data.biome_id(moisture, temperature, pack.heights[i]);
    }
}

/// Moisture is a local smoothing of precipitation over the cell and its land
/// neighbors, with a flux boost on river cells.
fn cell_moisture(pack: &Pack, grid: &Grid, i: usize) -> f64 {
    let mut moist = grid.precipitation[pack.grid_parent[i] as usize] as f64;
    if pack.river_ids[i] != 0 {
        moist += (pack.flux[i] as f64 / 20.0).max(2.0);
    }
    let mut values = vec![moist];
    for &c in &pack.graph.cells.neighbors[i] {
        let c = c as usize;
        if pack.heights[c] >= 20 {
            values.push(grid.precipitation[pack.grid_parent[c] as usize] as f64);
        }
    }
    rn(4.0 + values.iter().sum::<f64>() / values.len() as f64, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table_is_valid() {
        BiomesData::default().validate().unwrap();
    }

    #[test]
    fn test_special_biomes() {
        let data = BiomesData::default();
        assert_eq!(data.biome_id(50.0, -10, 80), GLACIER);
        assert_eq!(data.biome_id(10.0, 15, 10), MARINE);
        assert_eq!(data.biome_id(45.0, 10, 22), WETLAND);
    }

    #[test]
    fn test_matrix_lookup_bands() {
        let data = BiomesData::default();
        // hot and dry reads the top-left corner of the matrix
        assert_eq!(data.biome_id(0.0, 20, 30), 1);
        // cold and wet reads the bottom-right
        assert_eq!(data.biome_id(130.0, -5, 30), 10);
    }

    #[test]
    fn test_json_roundtrip() {
        let data = BiomesData::default();
        let json = serde_json::to_string(&data).unwrap();
        let back: BiomesData = serde_json::from_str(&json).unwrap();
        back.validate().unwrap();
        assert_eq!(back.matrix, data.matrix);
        assert_eq!(back.habitability, data.habitability);
    }

    #[test]
    fn test_truncated_table_rejected() {
        let mut data = BiomesData::default();
        data.matrix.pop();
        assert!(data.validate().is_err());
    }
}
