//! World container and generation pipeline
//!
//! Bundles all generated data and runs the stages in their fixed dependency
//! order. Stage order is part of the contract: each stage mutates fields the
//! next one reads, and the per-checkpoint seeding keeps late stages
//! reproducible on their own.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use thiserror::Error;

use crate::biomes::{self, BiomesData};
use crate::climate::{self, MapCoordinates};
use crate::coastline::{self, CoastlinePath, OceanLayerPath};
use crate::config::{MapConfig, OceanLayers};
use crate::features::{self, Feature};
use crate::graph::Graph;
use crate::heightmap::{self, Template};
use crate::names::NameGenerator;
use crate::population;
use crate::regraph::{self, Pack};
use crate::rivers::{self, River};
use crate::seeds::WorldSeeds;

#[derive(Debug, Error)]
pub enum WorldGenError {
    #[error("unknown heightmap template: {0}")]
    InvalidTemplate(String),
    #[error("degenerate point set: triangulation produced no triangles from {0} points")]
    DegenerateGraph(usize),
    #[error("invalid biomes data: {0}")]
    InvalidBiomes(String),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// The coarse uniform graph and its per-cell fields.
pub struct Grid {
    pub graph: Graph,
    pub heights: Vec<u8>,
    pub feature_ids: Vec<u16>,
    pub cell_types: Vec<i8>,
    pub temperature: Vec<i8>,
    pub precipitation: Vec<u8>,
    pub features: Vec<Feature>,
}

impl Grid {
    pub fn new(graph: Graph) -> Self {
        let n = graph.cells_len();
        Self {
            graph,
            heights: vec![0; n],
            feature_ids: vec![0; n],
            cell_types: vec![0; n],
            temperature: vec![0; n],
            precipitation: vec![0; n],
            features: vec![Feature::placeholder()],
        }
    }
}

/// Everything the generator produces for one seed.
pub struct World {
    pub config: MapConfig,
    pub seeds: WorldSeeds,
    pub coordinates: MapCoordinates,
    pub grid: Grid,
    pub pack: Pack,
    pub rivers: Vec<River>,
    pub coastlines: Vec<CoastlinePath>,
    pub ocean_layers: Vec<OceanLayerPath>,
    pub biomes_data: BiomesData,
}

impl World {
    pub fn seed(&self) -> u64 {
        self.seeds.master
    }
}

/// Run the whole pipeline for one configuration.
pub fn generate(config: &MapConfig) -> Result<World, WorldGenError> {
    generate_with_biomes(config, BiomesData::default())
}

/// Run the pipeline with a custom biome table.
pub fn generate_with_biomes(
    config: &MapConfig,
    biomes_data: BiomesData,
) -> Result<World, WorldGenError> {
    biomes_data.validate()?;
    let template: Template = config.template.parse()?;
    let seeds = WorldSeeds::from_str_seed(&config.seed);
    println!(
        "generating world: seed {} template {} {}x{}",
        config.seed,
        template.name(),
        config.width,
        config.height
    );

    // base graph and heightmap
    let mut grid_rng = ChaCha8Rng::seed_from_u64(seeds.grid);
    let graph = Graph::generate(
        &mut grid_rng,
        config.width,
        config.height,
        config.cells_desired(),
    )?;
    let mut grid = Grid::new(graph);
    heightmap::generate(
        &grid.graph,
        &mut grid.heights,
        &mut grid_rng,
        template,
        config.density,
    );
    println!(
        "graph: {} cells, spacing {}",
        grid.graph.cells_len(),
        grid.graph.spacing
    );

    // feature markup and globe placement
    let mut features_rng = ChaCha8Rng::seed_from_u64(seeds.features);
    features::mark_grid_features(&mut grid);
    let land_touches_border = grid.features.iter().any(|f| f.land && f.border);
    let (rolled_size, rolled_shift) =
        climate::define_map_size(&mut features_rng, template, land_touches_border);
    let size = config.map_size.unwrap_or(rolled_size);
    let shift = config.latitude_shift.unwrap_or(rolled_shift);
    let coordinates = climate::calculate_map_coordinates(size, shift, config.width, config.height);

    if template != Template::Atoll {
        features::open_near_sea_lakes(&mut grid);
    }

    // climate
    climate::calculate_temperatures(
        &mut grid,
        &coordinates,
        config.temperature_equator,
        config.temperature_pole,
        config.height_exponent,
    );
    climate::generate_precipitation(
        &mut grid,
        &mut features_rng,
        &coordinates,
        &config.winds,
        config.precipitation_modifier,
    );

    // ocean depth bands
    let limits: Vec<i8> = match &config.ocean_layers {
        OceanLayers::Standard => vec![-6, -3, -1],
        OceanLayers::Random => features::randomize_ocean_outline(&mut features_rng),
        OceanLayers::Custom(layers) => layers.clone(),
    };
    features::markup_ocean(&mut grid, &limits);
    let ocean_layers = coastline::ocean_layer_paths(&grid, &limits);

    // packed graph
    let mut pack = regraph::re_graph(&grid)?;
    features::re_mark_features(&mut pack, &grid);
    println!("pack: {} cells, {} features", pack.graph.cells_len(), pack.features.len() - 1);
    let coastlines = coastline::trace_coastlines(&mut pack);

    // hydrology
    let mut rivers_rng = ChaCha8Rng::seed_from_u64(seeds.rivers);
    if template != Template::Atoll {
        rivers::elevate_lakes(&mut pack);
    }
    let mut rivers = rivers::generate(&mut pack, &grid, &mut rivers_rng);
    println!("rivers: {}", rivers.len());

    // biomes, names, population
    biomes::define_biomes(&mut pack, &grid, &biomes_data);
    let mut names_rng = ChaCha8Rng::seed_from_u64(seeds.names);
    let names = NameGenerator::new();
    rivers::specify(&mut rivers, &names, &mut names_rng);
    population::rank_cells(&mut pack, &biomes_data);

    Ok(World {
        config: config.clone(),
        seeds,
        coordinates,
        grid,
        pack,
        rivers,
        coastlines,
        ocean_layers,
        biomes_data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config(seed: &str, template: &str) -> MapConfig {
        MapConfig {
            width: 600.0,
            height: 400.0,
            density: 1.0,
            template: template.to_string(),
            seed: seed.to_string(),
            map_size: Some(60.0),
            latitude_shift: Some(50.0),
            ..MapConfig::default()
        }
    }

    #[test]
    fn test_generation_is_deterministic() {
        let config = small_config("12345", "volcano");
        let a = generate(&config).unwrap();
        let b = generate(&config).unwrap();
        assert_eq!(a.grid.heights, b.grid.heights);
        assert_eq!(a.pack.heights, b.pack.heights);
        assert_eq!(a.grid.features.len(), b.grid.features.len());
        assert_eq!(a.rivers.len(), b.rivers.len());
        for (x, y) in a.rivers.iter().zip(&b.rivers) {
            assert_eq!(x.name, y.name);
            assert_eq!(x.kind, y.kind);
        }
    }

    #[test]
    fn test_different_seeds_differ() {
        let a = generate(&small_config("12345", "volcano")).unwrap();
        let b = generate(&small_config("54321", "volcano")).unwrap();
        assert_ne!(a.grid.heights, b.grid.heights);
    }

    #[test]
    fn test_pipeline_invariants_hold() {
        let world = generate(&small_config("777", "highIsland")).unwrap();
        let pack = &world.pack;
        let n = pack.graph.cells_len();

        // water/land split is consistent with feature markup
        for i in 0..n {
            let feature = &pack.features[pack.feature_ids[i] as usize];
            if feature.group == "freshwater" {
                assert!(pack.heights[i] < 20);
            }
            if pack.heights[i] < 20 {
                assert!(
                    pack.biomes[i] == crate::biomes::MARINE
                        || pack.biomes[i] == crate::biomes::GLACIER
                );
            }
        }

        // every river is long enough to have survived the cull
        for river in &world.rivers {
            assert!(river.points.len() >= 3);
            assert!(river.basin >= 1);
        }
    }

    #[test]
    fn test_unknown_template_fails_fast() {
        let config = small_config("1", "nosuchshape");
        assert!(matches!(
            generate(&config),
            Err(WorldGenError::InvalidTemplate(_))
        ));
    }

    #[test]
    fn test_bad_biomes_rejected() {
        let mut data = BiomesData::default();
        data.habitability.pop();
        let config = small_config("1", "volcano");
        assert!(matches!(
            generate_with_biomes(&config, data),
            Err(WorldGenError::InvalidBiomes(_))
        ));
    }
}
