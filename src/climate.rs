//! Climate model: globe placement, temperature, precipitation
//!
//! The map is a window onto a globe. Its latitude extent drives a simple
//! temperature interpolation between equator and pole values with an
//! altitude lapse, and a one-pass wind transport model that picks up
//! humidity over water and drops it against rising terrain.

use rand_chacha::ChaCha8Rng;

use crate::heightmap::Template;
use crate::utils::{ease_poly_in_out, gauss, probability, rand_range, rn};
use crate::world::Grid;

/// Latitude/longitude window the map covers on the globe.
#[derive(Clone, Copy, Debug)]
pub struct MapCoordinates {
    /// Total latitude extent in degrees
    pub lat_t: f64,
    /// Northern edge latitude
    pub lat_n: f64,
    /// Southern edge latitude
    pub lat_s: f64,
    /// Total longitude extent
    pub lon_t: f64,
    pub lon_w: f64,
    pub lon_e: f64,
}

/// Wetness multiplier per 5-degree latitude band, equator to pole: the
/// rising-air zones (equatorial, temperate) are wet, the sinking-air zones
/// (horse latitudes, polar) dry.
const LATITUDE_MODIFIER: [f64; 18] = [
    4.0, 2.0, 2.0, 2.0, 1.0, 1.0, 2.0, 2.0, 2.0, 2.0, 3.0, 3.0, 2.0, 2.0, 1.0, 1.0, 1.0, 0.5,
];

const MAX_PASSABLE_HEIGHT: u8 = 85;

/// Roll map size percent and latitude shift for a template. Templates that
/// read as whole-world maps sometimes take the full globe; maps whose land
/// runs over the border stay partial.
pub fn define_map_size(
    rng: &mut ChaCha8Rng,
    template: Template,
    land_touches_border: bool,
) -> (f64, f64) {
    let part = land_touches_border;
    let max = if part { 85.0 } else { 100.0 };
    let lat = if part {
        let center = if probability(rng, 0.5) { 30.0 } else { 70.0 };
        gauss(rng, center, 15.0, 20.0, 80.0, 0)
    } else {
        gauss(rng, 50.0, 20.0, 15.0, 85.0, 0)
    };

    if !part {
        let whole_world = match template {
            Template::Pangea => true,
            Template::Shattered => probability(rng, 0.7),
            Template::Continents => probability(rng, 0.5),
            Template::Archipelago => probability(rng, 0.35),
            Template::HighIsland => probability(rng, 0.25),
            Template::LowIsland => probability(rng, 0.1),
            _ => false,
        };
        if whole_world {
            return (100.0, 50.0);
        }
    }

    let size = match template {
        Template::Pangea => gauss(rng, 75.0, 20.0, 30.0, max, 0),
        Template::Volcano => gauss(rng, 30.0, 20.0, 10.0, max, 0),
        Template::Mediterranean => gauss(rng, 30.0, 30.0, 15.0, 80.0, 0),
        Template::Peninsula => gauss(rng, 15.0, 15.0, 5.0, 80.0, 0),
        Template::Isthmus => gauss(rng, 20.0, 20.0, 3.0, 80.0, 0),
        Template::Atoll => gauss(rng, 10.0, 10.0, 2.0, max, 0),
        _ => gauss(rng, 40.0, 20.0, 15.0, max, 0),
    };
    (size, lat)
}

/// Position the map window on the globe from its size percent and latitude
/// shift percent.
pub fn calculate_map_coordinates(size: f64, lat_shift: f64, width: f64, height: f64) -> MapCoordinates {
    let lat_t = size / 100.0 * 180.0;
    let lat_n = 90.0 - (180.0 - lat_t) * lat_shift / 100.0;
    let lat_s = lat_n - lat_t;

    let lon = (width / height * lat_t / 2.0).min(180.0);
    MapCoordinates {
        lat_t,
        lat_n,
        lat_s,
        lon_t: lon * 2.0,
        lon_w: -lon,
        lon_e: lon,
    }
}

/// Interpolate sea-level temperature by latitude and subtract an altitude
/// lapse of 6.5 degrees per simulated kilometer.
pub fn calculate_temperatures(
    grid: &mut Grid,
    coords: &MapCoordinates,
    t_eq: f64,
    t_pole: f64,
    height_exponent: f64,
) {
    let n = grid.graph.cells_len();
    grid.temperature = vec![0; n];
    let t_delta = t_eq - t_pole;
    let cells_x = grid.graph.cells_x;

    for row_start in (0..n).step_by(cells_x) {
        let y = grid.graph.points[row_start][1];
        let lat = (coords.lat_n - y / grid.graph.height * coords.lat_t).abs();
        let init_temp = t_eq - ease_poly_in_out(lat / 90.0, 0.5) * t_delta;
        for i in row_start..(row_start + cells_x).min(n) {
            let temp = init_temp - height_lapse(grid.heights[i], height_exponent);
            grid.temperature[i] = temp.clamp(-128.0, 127.0).trunc() as i8;
        }
    }
}

fn height_lapse(h: u8, exponent: f64) -> f64 {
    if h < 20 {
        return 0.0;
    }
    let altitude = ((h - 18) as f64).powf(exponent);
    rn(altitude / 1000.0 * 6.5, 0)
}

/// Simple one-pass precipitation model: rows in the westerlies sweep east,
/// rows in the easterlies sweep west, plus meridional passes when the
/// prevailing winds have a north/south component. Humidity rises over water
/// and rains out over land, harder against rising terrain.
pub fn generate_precipitation(
    grid: &mut Grid,
    rng: &mut ChaCha8Rng,
    coords: &MapCoordinates,
    winds: &[u16; 6],
    modifier: f64,
) {
    let n = grid.graph.cells_len();
    grid.precipitation = vec![0; n];
    let cells_x = grid.graph.cells_x;
    let cells_y = grid.graph.cells_y;

    let mut westerly: Vec<(usize, f64)> = Vec::new();
    let mut easterly: Vec<(usize, f64)> = Vec::new();
    let mut northerly = 0u32;
    let mut southerly = 0u32;

    for (row, row_start) in (0..n).step_by(cells_x).enumerate() {
        let lat = coords.lat_n - row as f64 / cells_y as f64 * coords.lat_t;
        let lat_mod = LATITUDE_MODIFIER[band_index(lat)];
        let tier = (((lat - 89.0).abs() / 30.0) as usize).min(5);
        let wind = winds[tier];
        if wind > 40 && wind < 140 {
            westerly.push((row_start, lat_mod));
        } else if wind > 220 && wind < 320 {
            easterly.push((row_start + cells_x - 1, lat_mod));
        }
        if wind > 100 && wind < 260 {
            northerly += 1;
        } else if wind > 280 || wind < 80 {
            southerly += 1;
        }
    }

    if !westerly.is_empty() {
        pass_wind(grid, rng, &westerly, 120.0 * modifier, 1, cells_x, modifier, true);
    }
    if !easterly.is_empty() {
        pass_wind(grid, rng, &easterly, 120.0 * modifier, -1, cells_x, modifier, true);
    }

    let vert_total = (northerly + southerly) as f64;
    let mean_modifier = LATITUDE_MODIFIER.iter().sum::<f64>() / LATITUDE_MODIFIER.len() as f64;
    if northerly > 0 {
        let lat_mod = if coords.lat_t > 60.0 {
            mean_modifier
        } else {
            LATITUDE_MODIFIER[band_index(coords.lat_n)]
        };
        let max_prec = northerly as f64 / vert_total * 60.0 * modifier * lat_mod;
        let source: Vec<(usize, f64)> = (0..cells_x).map(|c| (c, 1.0)).collect();
        pass_wind(grid, rng, &source, max_prec, cells_x as isize, cells_y, modifier, false);
    }
    if southerly > 0 {
        let lat_mod = if coords.lat_t > 60.0 {
            mean_modifier
        } else {
            LATITUDE_MODIFIER[band_index(coords.lat_s)]
        };
        let max_prec = southerly as f64 / vert_total * 60.0 * modifier * lat_mod;
        let source: Vec<(usize, f64)> = (n - cells_x..n).map(|c| (c, 1.0)).collect();
        pass_wind(grid, rng, &source, max_prec, -(cells_x as isize), cells_y, modifier, false);
    }
}

fn band_index(lat: f64) -> usize {
    (((lat.abs() - 1.0) / 5.0) as i64).clamp(0, 17) as usize
}

#[allow(clippy::too_many_arguments)]
fn pass_wind(
    grid: &mut Grid,
    rng: &mut ChaCha8Rng,
    sources: &[(usize, f64)],
    max_prec_init: f64,
    next: isize,
    steps: usize,
    modifier: f64,
    scale_by_band: bool,
) {
    let n = grid.graph.cells_len();

    for &(first, lat_mod) in sources {
        let max_prec = if scale_by_band {
            (max_prec_init * lat_mod).min(255.0)
        } else {
            max_prec_init
        };
        let mut humidity = max_prec - grid.heights[first] as f64;
        if humidity <= 0.0 {
            continue; // wind starts dry over high terrain
        }

        let mut current = first as isize;
        for _ in 0..steps {
            let cur = current as usize;
            if cur >= n {
                break;
            }
            let next_idx = current + next;
            let next_height = if next_idx >= 0 && (next_idx as usize) < n {
                Some(grid.heights[next_idx as usize])
            } else {
                None
            };
            current += next;

            if grid.temperature[cur] < -5 {
                continue; // no flux on permafrost
            }

            if grid.heights[cur] < 20 {
                // water cell
                if next_height.map_or(false, |nh| nh >= 20) {
                    // coastal precipitation on the first land cell
                    let deposit = (humidity / rand_range(rng, 10, 20) as f64).max(1.0);
                    add_prec(grid, next_idx as usize, deposit);
                } else {
                    humidity = (humidity + 5.0 * modifier).min(max_prec);
                    add_prec(grid, cur, 5.0 * modifier);
                }
                continue;
            }

            // land cell
            let precipitation = land_precipitation(grid, humidity, cur, next_height, modifier);
            add_prec(grid, cur, precipitation);
            let evaporation = if precipitation > 1.5 { 1.0 } else { 0.0 };
            humidity = (humidity - precipitation + evaporation).clamp(0.0, max_prec);
        }
    }
}

fn land_precipitation(
    grid: &Grid,
    humidity: f64,
    i: usize,
    next_height: Option<u8>,
    modifier: f64,
) -> f64 {
    let normal_loss = (humidity / (10.0 * modifier)).max(1.0);
    let Some(nh) = next_height else {
        return normal_loss.max(1.0).min(humidity);
    };
    if nh > MAX_PASSABLE_HEIGHT {
        return humidity; // the wind dumps everything against a wall
    }
    let diff = (nh as f64 - grid.heights[i] as f64).max(0.0);
    let orographic = (nh as f64 / 70.0).powi(2);
    (normal_loss + diff * orographic).max(1.0).min(humidity)
}

/// Accumulate into the u8 precipitation field, truncating and saturating.
fn add_prec(grid: &mut Grid, i: usize, amount: f64) {
    let sum = grid.precipitation[i] as f64 + amount;
    grid.precipitation[i] = sum.trunc().clamp(0.0, 255.0) as u8;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_WINDS;
    use crate::graph::Graph;
    use rand::SeedableRng;

    fn flat_grid(height: u8) -> Grid {
        let mut rng = ChaCha8Rng::seed_from_u64(21);
        let graph = Graph::generate(&mut rng, 200.0, 100.0, 300.0).unwrap();
        let mut grid = Grid::new(graph);
        grid.heights = vec![height; grid.graph.cells_len()];
        grid
    }

    #[test]
    fn test_full_size_map_covers_the_globe() {
        let coords = calculate_map_coordinates(100.0, 50.0, 960.0, 540.0);
        assert_eq!(coords.lat_t, 180.0);
        assert_eq!(coords.lat_n, 90.0);
        assert_eq!(coords.lat_s, -90.0);
    }

    #[test]
    fn test_half_size_map_is_shifted_by_latitude() {
        let coords = calculate_map_coordinates(50.0, 0.0, 960.0, 540.0);
        assert_eq!(coords.lat_n, 90.0);
        assert_eq!(coords.lat_s, 0.0);
    }

    #[test]
    fn test_temperature_drops_toward_poles() {
        let mut grid = flat_grid(0);
        let coords = calculate_map_coordinates(100.0, 50.0, 200.0, 100.0);
        calculate_temperatures(&mut grid, &coords, 27.0, -30.0, 2.0);

        let top = grid.temperature[0];
        let mid_row = grid.graph.cells_y / 2;
        let middle = grid.temperature[mid_row * grid.graph.cells_x];
        assert!(top < middle, "polar row {} should be colder than equator {}", top, middle);
    }

    #[test]
    fn test_altitude_lapse_cools_land() {
        let mut low = flat_grid(20);
        let mut high = flat_grid(80);
        let coords = calculate_map_coordinates(100.0, 50.0, 200.0, 100.0);
        calculate_temperatures(&mut low, &coords, 27.0, -30.0, 2.0);
        calculate_temperatures(&mut high, &coords, 27.0, -30.0, 2.0);
        for i in 0..low.graph.cells_len() {
            assert!(high.temperature[i] < low.temperature[i]);
        }
    }

    #[test]
    fn test_flat_sea_gets_only_baseline_deposits() {
        let mut grid = flat_grid(0);
        grid.temperature = vec![10; grid.graph.cells_len()];
        let coords = calculate_map_coordinates(100.0, 50.0, 200.0, 100.0);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        generate_precipitation(&mut grid, &mut rng, &coords, &DEFAULT_WINDS, 1.0);

        assert!(grid.precipitation.iter().any(|&p| p > 0));
        // every deposit over open water is the flat 5-per-pass replenishment
        assert!(grid.precipitation.iter().all(|&p| p <= 15));
    }

    #[test]
    fn test_permafrost_blocks_precipitation() {
        let mut grid = flat_grid(0);
        grid.temperature = vec![-10; grid.graph.cells_len()];
        let coords = calculate_map_coordinates(100.0, 50.0, 200.0, 100.0);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        generate_precipitation(&mut grid, &mut rng, &coords, &DEFAULT_WINDS, 1.0);
        assert!(grid.precipitation.iter().all(|&p| p == 0));
    }

    #[test]
    fn test_map_size_within_template_bounds() {
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        for _ in 0..30 {
            let (size, lat) = define_map_size(&mut rng, Template::Volcano, false);
            assert!((10.0..=100.0).contains(&size));
            assert!((15.0..=85.0).contains(&lat));
        }
        let (size, lat) = define_map_size(&mut rng, Template::Pangea, false);
        assert_eq!((size, lat), (100.0, 50.0));
    }
}
