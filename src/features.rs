//! Water body and island detection
//!
//! Flood-fill markup over the cell graph: every cell gets a feature id, and
//! every feature is an ocean (water touching the map border), a lake
//! (enclosed water) or an island (connected land). Coast cells are typed on
//! the way: 1 for land by water, -1 for water by land. The pack-scale pass
//! additionally records havens and harbors and names feature groups.

use rand_chacha::ChaCha8Rng;

use crate::regraph::Pack;
use crate::utils::probability;
use crate::world::Grid;

/// What a connected feature is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FeatureKind {
    Ocean,
    Lake,
    Island,
}

/// One connected group of same-side (land/water) cells.
#[derive(Clone, Debug)]
pub struct Feature {
    pub id: u16,
    pub land: bool,
    /// Feature touches the map border
    pub border: bool,
    pub kind: FeatureKind,
    /// Descriptive group: "freshwater", "salt", "sinkhole", "ocean", "gulf",
    /// "continent", "isle" and so on. Empty at grid scale.
    pub group: &'static str,
    pub cell_count: usize,
    pub first_cell: usize,
    /// Outline area, filled by coastline tracing
    pub area: f64,
    /// Outline vertex chain, filled by coastline tracing
    pub vertices: Vec<u32>,
    /// Id of the river already draining into this lake, if any
    pub river: Option<u16>,
    /// Accumulated inflow of that river
    pub inflow: f64,
}

impl Feature {
    /// Index 0 of every feature list is this unused placeholder so feature
    /// ids can index the list directly.
    pub fn placeholder() -> Self {
        Self {
            id: 0,
            land: false,
            border: false,
            kind: FeatureKind::Ocean,
            group: "",
            cell_count: 0,
            first_cell: 0,
            area: 0.0,
            vertices: Vec::new(),
            river: None,
            inflow: 0.0,
        }
    }
}

/// Flood-fill the grid into features and type the coastline cells.
pub fn mark_grid_features(grid: &mut Grid) {
    let n = grid.graph.cells_len();
    grid.feature_ids = vec![0; n];
    grid.cell_types = vec![0; n];
    grid.features = vec![Feature::placeholder()];

    let mut feature_id = 1u16;
    let mut next = Some(0usize);
    while let Some(start) = next {
        grid.feature_ids[start] = feature_id;
        let land = grid.heights[start] >= 20;
        let mut border = false;

        let mut queue = vec![start];
        while let Some(q) = queue.pop() {
            if grid.graph.cells.border[q] {
                border = true;
            }
            for &e in &grid.graph.cells.neighbors[q] {
                let e = e as usize;
                let e_land = grid.heights[e] >= 20;
                if land == e_land && grid.feature_ids[e] == 0 {
                    grid.feature_ids[e] = feature_id;
                    queue.push(e);
                }
                if land && !e_land {
                    grid.cell_types[q] = 1;
                    grid.cell_types[e] = -1;
                }
            }
        }

        let kind = if land {
            FeatureKind::Island
        } else if border {
            FeatureKind::Ocean
        } else {
            FeatureKind::Lake
        };
        grid.features.push(Feature {
            id: feature_id,
            land,
            border,
            kind,
            group: "",
            cell_count: 0,
            first_cell: start,
            area: 0.0,
            vertices: Vec::new(),
            river: None,
            inflow: 0.0,
        });

        next = grid.feature_ids.iter().position(|&f| f == 0);
        feature_id += 1;
    }
}

/// Lakes that formed next to a sea usually collect enough inflow to breach
/// the divide. Open them by sinking one low threshold cell below sea level.
/// Up to five passes; a threshold above height 50 holds.
pub fn open_near_sea_lakes(grid: &mut Grid) {
    if !grid
        .features
        .iter()
        .any(|f| f.kind == FeatureKind::Lake)
    {
        return;
    }
    const LIMIT: u8 = 50;

    for _ in 0..5 {
        let mut removed = false;

        for i in 0..grid.graph.cells_len() {
            let lake = grid.feature_ids[i] as usize;
            if grid.features[lake].kind != FeatureKind::Lake {
                continue;
            }

            'check_neighbors: for c in 0..grid.graph.cells.neighbors[i].len() {
                let c = grid.graph.cells.neighbors[i][c] as usize;
                if grid.cell_types[c] != 1 || grid.heights[c] > LIMIT {
                    continue; // water cannot breach this
                }
                for n in 0..grid.graph.cells.neighbors[c].len() {
                    let n = grid.graph.cells.neighbors[c][n] as usize;
                    let ocean = grid.feature_ids[n] as usize;
                    if grid.features[ocean].kind != FeatureKind::Ocean {
                        continue;
                    }
                    breach_lake(grid, c, lake, ocean as u16);
                    removed = true;
                    break 'check_neighbors;
                }
            }
        }

        if !removed {
            break;
        }
    }
}

fn breach_lake(grid: &mut Grid, threshold: usize, lake: usize, ocean: u16) {
    grid.heights[threshold] = 19;
    grid.cell_types[threshold] = -1;
    grid.feature_ids[threshold] = ocean;
    for i in 0..grid.graph.cells.neighbors[threshold].len() {
        let c = grid.graph.cells.neighbors[threshold][i] as usize;
        if grid.heights[c] >= 20 {
            grid.cell_types[c] = 1;
        }
    }
    grid.features[lake].kind = FeatureKind::Ocean;
}

/// Pick a random ocean band set: each deeper band is less likely, with the
/// odds resetting after every accepted band.
pub fn randomize_ocean_outline(rng: &mut ChaCha8Rng) -> Vec<i8> {
    let mut limits = Vec::new();
    let mut odds = 0.2;
    for level in -9i8..0 {
        if probability(rng, odds) {
            odds = 0.2;
            limits.push(level);
        } else {
            odds *= 2.0;
        }
    }
    if limits.is_empty() {
        limits.push(-1);
    }
    limits
}

/// Deepen ocean cell types band by band away from the coast: the -1 ring
/// seeds -2 neighbors, those seed -3 and so on, down to one band past the
/// deepest configured layer.
pub fn markup_ocean(grid: &mut Grid, limits: &[i8]) {
    let deepest = limits.first().copied().unwrap_or(-1);
    let mut j = -2i8;
    while j >= deepest - 1 {
        let band: Vec<usize> = (0..grid.graph.cells_len())
            .filter(|&i| grid.cell_types[i] == j + 1)
            .collect();
        for i in band {
            for k in 0..grid.graph.cells.neighbors[i].len() {
                let c = grid.graph.cells.neighbors[i][k] as usize;
                if grid.cell_types[c] == 0 {
                    grid.cell_types[c] = j;
                }
            }
        }
        j -= 1;
    }
}

/// Full feature markup at pack scale: features, coast types, a second inland
/// ring (type 2), havens/harbors for land coast cells, and feature groups.
pub fn re_mark_features(pack: &mut Pack, grid: &Grid) {
    let n = pack.graph.cells_len();
    let mut features = vec![Feature::placeholder()];
    pack.feature_ids = vec![0; n];
    pack.cell_types = vec![0; n];
    pack.haven = vec![0; n];
    pack.harbor = vec![0; n];

    let grid_cells = grid.graph.cells_len();
    let mut feature_id = 1u16;
    let mut next = Some(0usize);
    while let Some(start) = next {
        pack.feature_ids[start] = feature_id;
        let land = pack.heights[start] >= 20;
        let mut border = false;
        let mut cell_count = 1usize;

        let mut queue = vec![start];
        while let Some(q) = queue.pop() {
            if pack.graph.cells.border[q] {
                border = true;
            }
            for &e in &pack.graph.cells.neighbors[q] {
                let e = e as usize;
                let e_land = pack.heights[e] >= 20;
                if land && !e_land {
                    pack.cell_types[q] = 1;
                    pack.cell_types[e] = -1;
                    pack.harbor[q] = pack.harbor[q].saturating_add(1);
                    if pack.haven[q] == 0 {
                        pack.haven[q] = e as u32;
                    }
                } else if land && e_land {
                    if pack.cell_types[e] == 0 && pack.cell_types[q] == 1 {
                        pack.cell_types[e] = 2;
                    } else if pack.cell_types[q] == 0 && pack.cell_types[e] == 1 {
                        pack.cell_types[q] = 2;
                    }
                }
                if pack.feature_ids[e] == 0 && land == e_land {
                    queue.push(e);
                    pack.feature_ids[e] = feature_id;
                    cell_count += 1;
                }
            }
        }

        let kind = if land {
            FeatureKind::Island
        } else if border {
            FeatureKind::Ocean
        } else {
            FeatureKind::Lake
        };
        let group = match kind {
            FeatureKind::Lake => {
                let temp = grid.temperature[pack.grid_parent[start] as usize];
                lake_group(pack, start, cell_count, temp)
            }
            FeatureKind::Ocean => ocean_group(cell_count, grid_cells),
            FeatureKind::Island => island_group(pack, &features, start, cell_count, grid_cells),
        };
        features.push(Feature {
            id: feature_id,
            land,
            border,
            kind,
            group,
            cell_count,
            first_cell: start,
            area: 0.0,
            vertices: Vec::new(),
            river: None,
            inflow: 0.0,
        });

        next = pack.feature_ids.iter().position(|&f| f == 0);
        feature_id += 1;
    }

    pack.features = features;
}

fn lake_group(pack: &Pack, cell: usize, cell_count: usize, temp: i8) -> &'static str {
    if temp > 31 {
        return "dry";
    }
    if temp > 24 {
        return "salt";
    }
    if temp < -3 {
        return "frozen";
    }
    let height = pack.graph.cells.neighbors[cell]
        .iter()
        .map(|&c| pack.heights[c as usize])
        .max()
        .unwrap_or(0);
    if height > 69 && cell_count < 3 && cell % 5 == 0 {
        return "sinkhole";
    }
    if height > 69 && cell_count < 10 && cell % 5 == 0 {
        return "lava";
    }
    "freshwater"
}

fn ocean_group(cell_count: usize, grid_cells: usize) -> &'static str {
    if cell_count > grid_cells / 25 {
        return "ocean";
    }
    if cell_count > grid_cells / 100 {
        return "sea";
    }
    "gulf"
}

fn island_group(
    pack: &Pack,
    features: &[Feature],
    cell: usize,
    cell_count: usize,
    grid_cells: usize,
) -> &'static str {
    if cell > 0 {
        let prev_feature = pack.feature_ids[cell - 1] as usize;
        if features
            .get(prev_feature)
            .map_or(false, |f| f.kind == FeatureKind::Lake)
        {
            return "lake_island";
        }
    }
    if cell_count > grid_cells / 10 {
        return "continent";
    }
    if cell_count > grid_cells / 1000 {
        return "island";
    }
    "isle"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Graph;
    use rand::SeedableRng;

    fn grid_with_heights(fill: u8) -> Grid {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let graph = Graph::generate(&mut rng, 200.0, 100.0, 300.0).unwrap();
        let mut grid = Grid::new(graph);
        grid.heights = vec![fill; grid.graph.cells_len()];
        grid
    }

    #[test]
    fn test_all_water_is_one_ocean() {
        let mut grid = grid_with_heights(10);
        mark_grid_features(&mut grid);

        assert_eq!(grid.features.len(), 2); // placeholder + ocean
        assert_eq!(grid.features[1].kind, FeatureKind::Ocean);
        assert!(grid.feature_ids.iter().all(|&f| f == 1));
        assert!(grid.cell_types.iter().all(|&t| t == 0));
    }

    #[test]
    fn test_island_coast_typing() {
        let mut grid = grid_with_heights(10);
        // raise one interior cell and its neighbors
        let center = grid.graph.find_grid_cell(100.0, 50.0);
        grid.heights[center] = 50;
        for &c in &grid.graph.cells.neighbors[center].clone() {
            grid.heights[c as usize] = 40;
        }
        mark_grid_features(&mut grid);

        let kinds: Vec<FeatureKind> = grid.features[1..].iter().map(|f| f.kind).collect();
        assert!(kinds.contains(&FeatureKind::Ocean));
        assert!(kinds.contains(&FeatureKind::Island));

        for i in 0..grid.graph.cells_len() {
            if grid.heights[i] >= 20 {
                let water_neighbor = grid.graph.cells.neighbors[i]
                    .iter()
                    .any(|&c| grid.heights[c as usize] < 20);
                assert_eq!(grid.cell_types[i] == 1, water_neighbor);
            }
        }
    }

    #[test]
    fn test_enclosed_water_is_a_lake() {
        let mut grid = grid_with_heights(50);
        let center = grid.graph.find_grid_cell(100.0, 50.0);
        grid.heights[center] = 10;
        mark_grid_features(&mut grid);

        let lake = grid.features.iter().find(|f| f.kind == FeatureKind::Lake);
        assert!(lake.is_some(), "enclosed water cell must become a lake");
    }

    #[test]
    fn test_open_near_sea_lakes_breaches_threshold() {
        let mut grid = grid_with_heights(10);
        // land on the right half, ocean on the left
        for i in 0..grid.graph.cells_len() {
            if grid.graph.points[i][0] > 80.0 {
                grid.heights[i] = 30;
            }
        }
        mark_grid_features(&mut grid);

        // sink a land cell two steps inland into a lake
        let coast = (0..grid.graph.cells_len())
            .find(|&i| grid.cell_types[i] == 1)
            .unwrap();
        let inland = grid.graph.cells.neighbors[coast]
            .iter()
            .map(|&c| c as usize)
            .find(|&c| {
                grid.heights[c] >= 20
                    && grid.graph.cells.neighbors[c]
                        .iter()
                        .all(|&m| grid.heights[m as usize] >= 20)
            });
        let Some(lake_cell) = inland else {
            return; // graph layout gave no suitable cell, nothing to assert
        };
        grid.heights[lake_cell] = 10;
        mark_grid_features(&mut grid);
        assert!(grid.features.iter().any(|f| f.kind == FeatureKind::Lake));

        open_near_sea_lakes(&mut grid);
        assert!(
            !grid.features.iter().any(|f| f.kind == FeatureKind::Lake),
            "near-sea lake should be opened into the ocean"
        );
        assert!(grid.heights.iter().any(|&h| h == 19), "breach cell sunk to 19");
    }

    #[test]
    fn test_markup_ocean_bands_deepen_monotonically() {
        let mut grid = grid_with_heights(10);
        let center = grid.graph.find_grid_cell(100.0, 50.0);
        grid.heights[center] = 50;
        for &c in &grid.graph.cells.neighbors[center].clone() {
            grid.heights[c as usize] = 40;
        }
        mark_grid_features(&mut grid);
        markup_ocean(&mut grid, &[-6, -3, -1]);

        assert!(grid.cell_types.iter().any(|&t| t == -2));
        for i in 0..grid.graph.cells_len() {
            let t = grid.cell_types[i];
            if t < -1 {
                let has_shallower = grid.graph.cells.neighbors[i]
                    .iter()
                    .any(|&c| grid.cell_types[c as usize] == t + 1);
                assert!(has_shallower, "band {} cell {} lacks a {} neighbor", t, i, t + 1);
            }
        }
    }

    #[test]
    fn test_randomized_outline_is_sorted_and_bounded() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for _ in 0..20 {
            let limits = randomize_ocean_outline(&mut rng);
            assert!(!limits.is_empty());
            assert!(limits.windows(2).all(|w| w[0] < w[1]));
            assert!(limits.iter().all(|&l| (-9..0).contains(&l)));
        }
    }
}
