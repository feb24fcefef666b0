//! Cell suitability and rural population
//!
//! A pure per-cell score over already-computed fields: biome habitability as
//! the base, river flux and coastal access as bonuses, elevation as a mild
//! penalty. Population scales the score by relative cell area.

use crate::biomes::BiomesData;
use crate::features::FeatureKind;
use crate::regraph::Pack;
use crate::utils::normalize;

/// Score every land cell. Cells in zero-habitability biomes stay at zero.
pub fn rank_cells(pack: &mut Pack, biomes: &BiomesData) {
    let n = pack.graph.cells_len();
    pack.suitability = vec![0; n];
    pack.population = vec![0.0; n];

    let fluxes: Vec<f64> = pack.flux.iter().filter(|&&f| f > 0).map(|&f| f as f64).collect();
    let confluences: Vec<f64> = pack
        .confluences
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| c as f64)
        .collect();
    let flux_median = median(&fluxes);
    let flux_max = fluxes.iter().fold(0.0f64, |a, &b| a.max(b))
        + confluences.iter().fold(0.0f64, |a, &b| a.max(b));
    let area_mean = pack.areas.iter().sum::<f64>() / pack.areas.len().max(1) as f64;

    for i in 0..n {
        if pack.heights[i] < 20 {
            continue;
        }
        let base = biomes.habitability[pack.biomes[i] as usize] as f64;
        if base == 0.0 {
            continue; // uninhabitable
        }
        let mut score = base;
        if flux_median > 0.0 {
            let flow = pack.flux[i] as f64 + pack.confluences[i] as f64;
            score += normalize(flow, flux_median, flux_max) * 250.0;
        }
        score -= (pack.heights[i] as f64 - 50.0) / 5.0;

        if pack.cell_types[i] == 1 {
            if pack.river_ids[i] != 0 {
                score += 15.0; // estuary
            }
            let haven_feature = &pack.features[pack.feature_ids[pack.haven[i] as usize] as usize];
            if haven_feature.kind == FeatureKind::Lake {
                if haven_feature.group == "freshwater" {
                    score += 30.0;
                } else if haven_feature.group != "lava" && haven_feature.group != "dry" {
                    score += 10.0;
                }
            } else {
                score += 5.0; // ocean coast
                if pack.harbor[i] == 1 {
                    score += 20.0; // safe harbor
                }
            }
        }

        let suitability = (score / 5.0).trunc() as i32;
        pack.suitability[i] = suitability;
        pack.population[i] = if suitability > 0 {
            suitability as f64 * pack.areas[i] / area_mean
        } else {
            0.0
        };
    }
}

fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Graph;
    use crate::world::Grid;
    use crate::{biomes, features, regraph};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_median_of_odd_and_even_lists() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&[4.0, 1.0, 2.0, 3.0]), 2.5);
        assert_eq!(median(&[]), 0.0);
    }

    #[test]
    fn test_temperate_island_is_inhabited() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let graph = Graph::generate(&mut rng, 300.0, 200.0, 1200.0).unwrap();
        let mut grid = Grid::new(graph);
        for i in 0..grid.graph.cells_len() {
            let [x, y] = grid.graph.points[i];
            let dx = (x - 150.0) / 110.0;
            let dy = (y - 100.0) / 75.0;
            grid.heights[i] = if dx * dx + dy * dy < 1.0 { 40 } else { 5 };
        }
        features::mark_grid_features(&mut grid);
        features::markup_ocean(&mut grid, &[-6, -3, -1]);
        grid.temperature = vec![12; grid.graph.cells_len()];
        grid.precipitation = vec![30; grid.graph.cells_len()];

        let mut pack = regraph::re_graph(&grid).unwrap();
        features::re_mark_features(&mut pack, &grid);
        let data = biomes::BiomesData::default();
        biomes::define_biomes(&mut pack, &grid, &data);
        let frozen = pack.heights.iter().position(|&h| h >= 20).unwrap();
        pack.biomes[frozen] = biomes::GLACIER;
        rank_cells(&mut pack, &data);

        assert!(pack.population.iter().any(|&p| p > 0.0));
        // zero habitability beats every hydrology bonus
        assert_eq!(pack.suitability[frozen], 0);
        assert_eq!(pack.population[frozen], 0.0);
        for i in 0..pack.graph.cells_len() {
            if pack.heights[i] < 20 {
                assert_eq!(pack.suitability[i], 0);
                assert_eq!(pack.population[i], 0.0);
            }
        }
    }
}
