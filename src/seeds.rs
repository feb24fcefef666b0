//! Seed management for map generation
//!
//! The user supplies one seed string; every stage that rolls dice gets its
//! own sub-seed derived from it. Re-running a later stage alone (rivers,
//! river naming) therefore reproduces identical randomness regardless of how
//! often earlier stages were rerun.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Sub-seeds for each re-seeding checkpoint of the pipeline.
#[derive(Clone, Debug)]
pub struct WorldSeeds {
    /// Master seed (used for display/reference)
    pub master: u64,
    /// Point placement and heightmap sculpting
    pub grid: u64,
    /// Feature markup, map size/latitude rolls, ocean layer selection
    pub features: u64,
    /// River drainage and geometry
    pub rivers: u64,
    /// River naming and specification
    pub names: u64,
}

impl WorldSeeds {
    /// Derive all sub-seeds from a master seed.
    pub fn from_master(master: u64) -> Self {
        Self {
            master,
            grid: derive_seed(master, "grid"),
            features: derive_seed(master, "features"),
            rivers: derive_seed(master, "rivers"),
            names: derive_seed(master, "names"),
        }
    }

    /// Derive all sub-seeds from a user-facing seed string.
    pub fn from_str_seed(seed: &str) -> Self {
        let mut hasher = DefaultHasher::new();
        seed.hash(&mut hasher);
        Self::from_master(hasher.finish())
    }

    /// Create a builder for overriding individual checkpoint seeds.
    pub fn builder(master: u64) -> WorldSeedsBuilder {
        WorldSeedsBuilder::new(master)
    }
}

impl Default for WorldSeeds {
    fn default() -> Self {
        Self::from_master(rand::random())
    }
}

/// Builder for customizing individual seeds while deriving others from master
pub struct WorldSeedsBuilder {
    seeds: WorldSeeds,
}

impl WorldSeedsBuilder {
    pub fn new(master: u64) -> Self {
        Self {
            seeds: WorldSeeds::from_master(master),
        }
    }

    /// Override the grid/heightmap seed
    pub fn grid(mut self, seed: u64) -> Self {
        self.seeds.grid = seed;
        self
    }

    /// Override the feature markup seed
    pub fn features(mut self, seed: u64) -> Self {
        self.seeds.features = seed;
        self
    }

    /// Override the river seed
    pub fn rivers(mut self, seed: u64) -> Self {
        self.seeds.rivers = seed;
        self
    }

    /// Override the naming seed
    pub fn names(mut self, seed: u64) -> Self {
        self.seeds.names = seed;
        self
    }

    /// Build the final WorldSeeds
    pub fn build(self) -> WorldSeeds {
        self.seeds
    }
}

/// Derive a sub-seed from a master seed and a checkpoint name.
fn derive_seed(master: u64, checkpoint: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    master.hash(&mut hasher);
    checkpoint.hash(&mut hasher);
    hasher.finish()
}

impl std::fmt::Display for WorldSeeds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "WorldSeeds {{ master: {}, grid: {}, features: {}, rivers: {}, names: {} }}",
            self.master, self.grid, self.features, self.rivers, self.names,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic_derivation() {
        let seeds1 = WorldSeeds::from_master(12345);
        let seeds2 = WorldSeeds::from_master(12345);

        assert_eq!(seeds1.grid, seeds2.grid);
        assert_eq!(seeds1.features, seeds2.features);
        assert_eq!(seeds1.rivers, seeds2.rivers);
    }

    #[test]
    fn test_string_seed_is_stable() {
        let a = WorldSeeds::from_str_seed("azgaroth");
        let b = WorldSeeds::from_str_seed("azgaroth");
        assert_eq!(a.master, b.master);
        assert_eq!(a.names, b.names);
    }

    #[test]
    fn test_different_checkpoints_get_different_seeds() {
        let seeds = WorldSeeds::from_master(12345);

        assert_ne!(seeds.grid, seeds.features);
        assert_ne!(seeds.features, seeds.rivers);
        assert_ne!(seeds.rivers, seeds.names);
    }

    #[test]
    fn test_builder_override() {
        let seeds = WorldSeeds::builder(12345).rivers(99999).build();

        assert_eq!(seeds.rivers, 99999);

        let default_seeds = WorldSeeds::from_master(12345);
        assert_eq!(seeds.grid, default_seeds.grid);
        assert_eq!(seeds.features, default_seeds.features);
    }
}
