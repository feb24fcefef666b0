//! PNG map rendering
//!
//! Rasterizes the generated fields to images: grid-scale fields (height,
//! temperature, precipitation) sample the uniform grid directly, pack-scale
//! fields (biomes, population) go through a nearest-point index over the
//! packed cells. Rows are rendered in parallel.

use image::{ImageBuffer, Rgb, RgbImage};
use rayon::prelude::*;

use crate::regraph::Pack;
use crate::world::{World, WorldGenError};

/// Uniform-bucket nearest-point lookup over the packed cell centers.
struct PointIndex {
    buckets: Vec<Vec<u32>>,
    cols: usize,
    rows: usize,
    size: f64,
}

impl PointIndex {
    fn new(pack: &Pack) -> Self {
        let size = pack.graph.spacing.max(1.0);
        let cols = (pack.graph.width / size).ceil() as usize + 1;
        let rows = (pack.graph.height / size).ceil() as usize + 1;
        let mut buckets = vec![Vec::new(); cols * rows];
        for (i, &[x, y]) in pack.graph.points.iter().enumerate() {
            let col = ((x / size) as usize).min(cols - 1);
            let row = ((y / size) as usize).min(rows - 1);
            buckets[row * cols + col].push(i as u32);
        }
        Self {
            buckets,
            cols,
            rows,
            size,
        }
    }

    /// Nearest pack cell to a map position. Searches outward ring by ring
    /// until a candidate is found, then one extra ring to be exact enough
    /// for rendering.
    fn nearest(&self, pack: &Pack, x: f64, y: f64) -> usize {
        let col = ((x / self.size) as usize).min(self.cols - 1) as isize;
        let row = ((y / self.size) as usize).min(self.rows - 1) as isize;

        let mut best = 0usize;
        let mut best_d2 = f64::INFINITY;
        let mut found_ring: Option<isize> = None;
        let max_ring = self.cols.max(self.rows) as isize;

        for ring in 0..=max_ring {
            if found_ring.map_or(false, |fr| ring > fr + 1) {
                break;
            }
            for dr in -ring..=ring {
                for dc in -ring..=ring {
                    if dr.abs() != ring && dc.abs() != ring {
                        continue; // interior already visited
                    }
                    let r = row + dr;
                    let c = col + dc;
                    if r < 0 || c < 0 || r >= self.rows as isize || c >= self.cols as isize {
                        continue;
                    }
                    for &i in &self.buckets[r as usize * self.cols + c as usize] {
                        let [px, py] = pack.graph.points[i as usize];
                        let d2 = (px - x).powi(2) + (py - y).powi(2);
                        if d2 < best_d2 {
                            best_d2 = d2;
                            best = i as usize;
                            found_ring.get_or_insert(ring);
                        }
                    }
                }
            }
        }
        best
    }
}

fn render<F>(world: &World, scale: u32, color_of: F) -> RgbImage
where
    F: Fn(f64, f64) -> [u8; 3] + Sync,
{
    let w = (world.config.width * scale as f64) as u32;
    let h = (world.config.height * scale as f64) as u32;
    let color_of = &color_of;
    let pixels: Vec<[u8; 3]> = (0..h)
        .into_par_iter()
        .flat_map_iter(move |py| {
            let y = (py as f64 + 0.5) / scale as f64;
            (0..w).map(move |px| {
                let x = (px as f64 + 0.5) / scale as f64;
                color_of(x, y)
            })
        })
        .collect();

    let mut img: RgbImage = ImageBuffer::new(w, h);
    for (i, pixel) in pixels.into_iter().enumerate() {
        let px = i as u32 % w;
        let py = i as u32 / w;
        img.put_pixel(px, py, Rgb(pixel));
    }
    img
}

/// Height field: blue ocean bands, green-to-white land ramp.
pub fn export_heightmap(world: &World, path: &str, scale: u32) -> Result<(), WorldGenError> {
    let grid = &world.grid;
    let img = render(world, scale, |x, y| {
        let cell = grid.graph.find_grid_cell(x, y);
        height_color(grid.heights[cell])
    });
    img.save(path)?;
    Ok(())
}

fn height_color(h: u8) -> [u8; 3] {
    if h < 20 {
        let depth = (20 - h) as f64 / 20.0;
        return [
            (70.0 * (1.0 - depth)) as u8,
            (110.0 * (1.0 - depth * 0.7)) as u8,
            (171.0 - 60.0 * depth) as u8,
        ];
    }
    let t = (h - 20) as f64 / 80.0;
    if t < 0.4 {
        let k = t / 0.4;
        lerp([87, 133, 68], [196, 185, 108], k)
    } else if t < 0.75 {
        let k = (t - 0.4) / 0.35;
        lerp([196, 185, 108], [139, 106, 84], k)
    } else {
        let k = (t - 0.75) / 0.25;
        lerp([139, 106, 84], [245, 245, 245], k)
    }
}

fn lerp(a: [u8; 3], b: [u8; 3], t: f64) -> [u8; 3] {
    let t = t.clamp(0.0, 1.0);
    [
        (a[0] as f64 + (b[0] as f64 - a[0] as f64) * t) as u8,
        (a[1] as f64 + (b[1] as f64 - a[1] as f64) * t) as u8,
        (a[2] as f64 + (b[2] as f64 - a[2] as f64) * t) as u8,
    ]
}

/// Temperature: blue below freezing through white to red at the hot end.
pub fn export_temperature(world: &World, path: &str, scale: u32) -> Result<(), WorldGenError> {
    let grid = &world.grid;
    let img = render(world, scale, |x, y| {
        let cell = grid.graph.find_grid_cell(x, y);
        let t = grid.temperature[cell] as f64;
        if t < 0.0 {
            lerp([255, 255, 255], [37, 58, 133], (-t / 35.0).min(1.0))
        } else {
            lerp([255, 255, 255], [181, 36, 24], (t / 35.0).min(1.0))
        }
    });
    img.save(path)?;
    Ok(())
}

/// Precipitation: dry sand through saturated blue.
pub fn export_precipitation(world: &World, path: &str, scale: u32) -> Result<(), WorldGenError> {
    let grid = &world.grid;
    let max = grid.precipitation.iter().copied().max().unwrap_or(1).max(1) as f64;
    let img = render(world, scale, |x, y| {
        let cell = grid.graph.find_grid_cell(x, y);
        let p = grid.precipitation[cell] as f64 / max;
        lerp([231, 217, 179], [28, 89, 174], p)
    });
    img.save(path)?;
    Ok(())
}

/// Biomes, using the color table from the biomes data.
pub fn export_biomes(world: &World, path: &str, scale: u32) -> Result<(), WorldGenError> {
    let pack = &world.pack;
    let index = PointIndex::new(pack);
    let colors: Vec<[u8; 3]> = world
        .biomes_data
        .colors
        .iter()
        .map(|c| parse_hex(c))
        .collect();
    let img = render(world, scale, |x, y| {
        let cell = index.nearest(pack, x, y);
        colors
            .get(pack.biomes[cell] as usize)
            .copied()
            .unwrap_or([0, 0, 0])
    });
    img.save(path)?;
    Ok(())
}

/// Population density: dark for empty land, bright warm tones for dense
/// cells, flat blue water.
pub fn export_population(world: &World, path: &str, scale: u32) -> Result<(), WorldGenError> {
    let pack = &world.pack;
    let index = PointIndex::new(pack);
    let max = pack
        .population
        .iter()
        .fold(0.0f64, |a, &b| a.max(b))
        .max(1.0);
    let img = render(world, scale, |x, y| {
        let cell = index.nearest(pack, x, y);
        if pack.heights[cell] < 20 {
            return [40, 62, 112];
        }
        let p = (pack.population[cell] / max).powf(0.5);
        lerp([30, 30, 30], [255, 196, 80], p)
    });
    img.save(path)?;
    Ok(())
}

fn parse_hex(color: &str) -> [u8; 3] {
    let hex = color.trim_start_matches('#');
    if hex.len() != 6 {
        return [0, 0, 0];
    }
    let parse = |s: &str| u8::from_str_radix(s, 16).unwrap_or(0);
    [parse(&hex[0..2]), parse(&hex[2..4]), parse(&hex[4..6])]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features;
    use crate::graph::Graph;
    use crate::regraph;
    use crate::world::Grid;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_parse_hex_colors() {
        assert_eq!(parse_hex("#466eab"), [0x46, 0x6e, 0xab]);
        assert_eq!(parse_hex("29bc56"), [0x29, 0xbc, 0x56]);
        assert_eq!(parse_hex("bad"), [0, 0, 0]);
    }

    #[test]
    fn test_height_color_distinguishes_water_from_land() {
        let water = height_color(10);
        let land = height_color(40);
        assert!(water[2] > water[0], "water should read blue: {:?}", water);
        assert!(land[1] >= land[2], "lowland should read green: {:?}", land);
    }

    #[test]
    fn test_render_matches_requested_dimensions() {
        let config = crate::config::MapConfig {
            width: 120.0,
            height: 80.0,
            density: 0.05,
            template: "volcano".to_string(),
            seed: "export".to_string(),
            ..Default::default()
        };
        let world = crate::world::generate(&config).unwrap();

        let img = render(&world, 2, |_, _| [0, 0, 0]);
        assert_eq!(img.dimensions(), (240, 160));

        let path = std::env::temp_dir().join("map_generator_render_test.png");
        export_heightmap(&world, path.to_str().unwrap(), 1).unwrap();
        let saved = image::open(&path).unwrap().to_rgb8();
        assert_eq!(saved.width(), 120);
        assert_eq!(saved.height(), 80);
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_point_index_finds_containing_cell() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let graph = Graph::generate(&mut rng, 100.0, 100.0, 300.0).unwrap();
        let mut grid = Grid::new(graph);
        grid.heights = vec![50; grid.graph.cells_len()];
        features::mark_grid_features(&mut grid);
        let pack = regraph::re_graph(&grid).unwrap();
        let index = PointIndex::new(&pack);

        for i in (0..pack.graph.cells_len()).step_by(7) {
            let [x, y] = pack.graph.points[i];
            let found = index.nearest(&pack, x, y);
            let [fx, fy] = pack.graph.points[found];
            // exact center must resolve to itself (or a coincident point)
            assert!((fx - x).abs() < 1e-9 && (fy - y).abs() < 1e-9);
        }
    }
}
