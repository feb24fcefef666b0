//! Densified land graph
//!
//! The base grid resolves the whole map evenly, which wastes cells on open
//! ocean. This pass rebuilds the Voronoi graph from a filtered point set:
//! land cells and near-shore water survive, deep ocean is thinned out, and
//! coastlines get extra midpoints so the shore reads smoothly.

use crate::features::Feature;
use crate::graph::Graph;
use crate::utils::{polygon_area, rn};
use crate::world::{Grid, WorldGenError};

/// The packed cell graph and every per-cell field computed on top of it.
#[derive(Clone, Debug)]
pub struct Pack {
    pub graph: Graph,
    /// Parent grid cell each pack cell was spawned from
    pub grid_parent: Vec<u32>,
    pub heights: Vec<u8>,
    pub areas: Vec<f64>,
    pub feature_ids: Vec<u16>,
    /// Distance-to-coast markup: 1 land coast, 2 second land ring,
    /// -1 water coast, deeper negatives toward open ocean
    pub cell_types: Vec<i8>,
    /// For land coast cells, the adjacent water cell used as anchorage
    pub haven: Vec<u32>,
    /// Number of adjacent water cells
    pub harbor: Vec<u8>,
    pub flux: Vec<u16>,
    pub river_ids: Vec<u16>,
    pub confluences: Vec<u8>,
    pub biomes: Vec<u8>,
    pub suitability: Vec<i32>,
    pub population: Vec<f64>,
    pub features: Vec<Feature>,
}

/// Rebuild the Voronoi graph over the retained point set.
///
/// Deep water is dropped entirely except for a quarter of the first ocean
/// band (kept so the coast has water neighbors to drain into); lake water
/// keeps only its coast ring. Coastal cells spawn midpoints toward
/// same-type neighbors that sit at least one grid spacing away.
pub fn re_graph(grid: &Grid) -> Result<Pack, WorldGenError> {
    let n = grid.graph.cells_len();
    let spacing2 = grid.graph.spacing * grid.graph.spacing;

    let mut points: Vec<[f64; 2]> = Vec::with_capacity(n);
    let mut grid_parent: Vec<u32> = Vec::with_capacity(n);
    let mut heights: Vec<u8> = Vec::with_capacity(n);

    for i in 0..n {
        let height = grid.heights[i];
        let cell_type = grid.cell_types[i];
        if height < 20 && cell_type != -1 && cell_type != -2 {
            continue;
        }
        if cell_type == -2 {
            let feature = &grid.features[grid.feature_ids[i] as usize];
            if i % 4 == 0 || feature.kind == crate::features::FeatureKind::Lake {
                continue;
            }
        }

        let [x, y] = grid.graph.points[i];
        points.push([x, y]);
        grid_parent.push(i as u32);
        heights.push(height);

        if (cell_type == 1 || cell_type == -1) && !grid.graph.cells.border[i] {
            for &e in &grid.graph.cells.neighbors[i] {
                let e = e as usize;
                if i > e || grid.cell_types[e] != cell_type {
                    continue;
                }
                let [ex, ey] = grid.graph.points[e];
                let dist2 = (ex - x).powi(2) + (ey - y).powi(2);
                if dist2 < spacing2 {
                    continue; // neighbor too close, midpoint would clutter
                }
                points.push([rn((x + ex) / 2.0, 1), rn((y + ey) / 2.0, 1)]);
                grid_parent.push(i as u32);
                heights.push(height);
            }
        }
    }

    let graph = Graph::from_points(points, &grid.graph)?;
    let packed = graph.cells_len();
    let areas = (0..packed)
        .map(|i| polygon_area(&graph.cell_polygon(i)).abs())
        .collect();

    Ok(Pack {
        graph,
        grid_parent,
        heights,
        areas,
        feature_ids: Vec::new(),
        cell_types: Vec::new(),
        haven: vec![0; packed],
        harbor: vec![0; packed],
        flux: vec![0; packed],
        river_ids: vec![0; packed],
        confluences: vec![0; packed],
        biomes: vec![0; packed],
        suitability: vec![0; packed],
        population: vec![0.0; packed],
        features: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn marked_grid() -> Grid {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let graph = Graph::generate(&mut rng, 160.0, 120.0, 400.0).unwrap();
        let mut grid = Grid::new(graph);
        // one land blob in the middle of open water
        for i in 0..grid.graph.cells_len() {
            let [x, y] = grid.graph.points[i];
            let dx = x - 80.0;
            let dy = y - 60.0;
            grid.heights[i] = if dx * dx + dy * dy < 1600.0 { 50 } else { 5 };
        }
        features::mark_grid_features(&mut grid);
        features::markup_ocean(&mut grid, &[-6, -3, -1]);
        grid
    }

    #[test]
    fn test_regraph_keeps_all_land() {
        let grid = marked_grid();
        let pack = re_graph(&grid).unwrap();

        let grid_land = (0..grid.graph.cells_len())
            .filter(|&i| grid.heights[i] >= 20)
            .count();
        let pack_land_parents: std::collections::HashSet<u32> = pack
            .grid_parent
            .iter()
            .copied()
            .filter(|&g| grid.heights[g as usize] >= 20)
            .collect();
        assert_eq!(pack_land_parents.len(), grid_land);
    }

    #[test]
    fn test_regraph_drops_deep_ocean() {
        let grid = marked_grid();
        let pack = re_graph(&grid).unwrap();
        for &g in &pack.grid_parent {
            let t = grid.cell_types[g as usize];
            assert!(
                grid.heights[g as usize] >= 20 || t == -1 || t == -2,
                "deep water cell {} retained",
                g
            );
        }
    }

    #[test]
    fn test_regraph_heights_follow_parents() {
        let grid = marked_grid();
        let pack = re_graph(&grid).unwrap();
        assert_eq!(pack.heights.len(), pack.graph.cells_len());
        assert_eq!(pack.grid_parent.len(), pack.graph.cells_len());
        for (i, &g) in pack.grid_parent.iter().enumerate() {
            assert_eq!(pack.heights[i], grid.heights[g as usize]);
        }
    }

    #[test]
    fn test_regraph_areas_positive() {
        let grid = marked_grid();
        let pack = re_graph(&grid).unwrap();
        assert!(pack.areas.iter().all(|&a| a > 0.0));
    }
}
