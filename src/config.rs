//! Generation parameters
//!
//! Everything the pipeline needs to produce a map, collected in one
//! serializable struct so a configuration can be saved and replayed.

use serde::{Deserialize, Serialize};

/// Ocean depth band selection for the deep-water markup.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OceanLayers {
    /// The standard three bands at types -6, -3, -1
    Standard,
    /// Randomized band set (doubling odds per extra band)
    Random,
    /// Explicit band types, most negative first
    Custom(Vec<i8>),
}

/// All knobs for a single map generation run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MapConfig {
    /// Map width in graph units (pixels of the reference canvas)
    pub width: f64,
    /// Map height in graph units
    pub height: f64,
    /// Cell density multiplier: the grid targets `density * 10_000` cells
    pub density: f64,
    /// Heightmap template name (case-insensitive)
    pub template: String,
    /// User-facing seed string; hashed into the per-stage sub-seeds
    pub seed: String,
    /// Temperature at the equator, degrees Celsius
    pub temperature_equator: f64,
    /// Temperature at the poles, degrees Celsius
    pub temperature_pole: f64,
    /// Exponent converting cell height to altitude for the temperature lapse
    pub height_exponent: f64,
    /// Global precipitation scale (1.0 = normal)
    pub precipitation_modifier: f64,
    /// Prevailing wind direction per 30-degree latitude tier, degrees
    pub winds: [u16; 6],
    /// Map size as a percentage of the full globe; rolled from the template
    /// when absent
    pub map_size: Option<f64>,
    /// Latitude shift percentage (0 = north pole at the top edge); rolled
    /// from the template when absent
    pub latitude_shift: Option<f64>,
    /// Ocean depth band selection
    pub ocean_layers: OceanLayers,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            width: 960.0,
            height: 540.0,
            density: 1.0,
            template: "continents".to_string(),
            seed: "1".to_string(),
            temperature_equator: 27.0,
            temperature_pole: -30.0,
            height_exponent: 2.0,
            precipitation_modifier: 1.0,
            winds: DEFAULT_WINDS,
            map_size: None,
            latitude_shift: None,
            ocean_layers: OceanLayers::Standard,
        }
    }
}

/// Default wind directions per tier, north to south.
pub const DEFAULT_WINDS: [u16; 6] = [225, 45, 225, 315, 135, 315];

impl MapConfig {
    /// Number of cells the jittered grid aims for.
    pub fn cells_desired(&self) -> f64 {
        10_000.0 * self.density
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_targets_ten_thousand_cells() {
        let config = MapConfig::default();
        assert_eq!(config.cells_desired(), 10_000.0);
    }

    #[test]
    fn test_config_json_roundtrip() {
        let mut config = MapConfig::default();
        config.seed = "gallia".to_string();
        config.ocean_layers = OceanLayers::Custom(vec![-6, -3, -1]);

        let json = serde_json::to_string(&config).unwrap();
        let back: MapConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.seed, "gallia");
        assert_eq!(back.ocean_layers, OceanLayers::Custom(vec![-6, -3, -1]));
    }
}
