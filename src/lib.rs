//! Procedural fantasy terrain generation
//!
//! A deterministic, headless pipeline: Voronoi graph, template-sculpted
//! heightmap, feature markup, climate, a densified land graph, river
//! drainage, biomes and population. See [`world::generate`] for the entry
//! point.

pub mod biomes;
pub mod climate;
pub mod coastline;
pub mod config;
pub mod export;
pub mod features;
pub mod graph;
pub mod heightmap;
pub mod names;
pub mod population;
pub mod regraph;
pub mod rivers;
pub mod seeds;
pub mod utils;
pub mod world;
