//! River drainage
//!
//! Water flux accumulates downhill over the packed graph, cell by cell from
//! the highest land down. Enough flux proclaims a river; rivers merge at
//! confluences where the weaker stream becomes a tributary, pour off the map
//! edge near borders, and traverse lakes (one river per lake). Surviving
//! rivers get meandered centerlines and bank polygons that widen with
//! accumulated length.

use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::names::NameGenerator;
use crate::regraph::Pack;
use crate::utils::{probability, rn, weighted_choice};
use crate::world::Grid;

/// Minimum flux for a cell to carry a proclaimed river.
const MIN_RIVER_FLUX: u16 = 30;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RiverPoint {
    pub x: f64,
    pub y: f64,
    /// Merged flux at a confluence, widens the channel locally
    pub confluence: u8,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RiverKind {
    River,
    Creek,
    Brook,
    Stream,
    Fork,
    Branch,
}

impl RiverKind {
    pub fn label(self) -> &'static str {
        match self {
            RiverKind::River => "River",
            RiverKind::Creek => "Creek",
            RiverKind::Brook => "Brook",
            RiverKind::Stream => "Stream",
            RiverKind::Fork => "Fork",
            RiverKind::Branch => "Branch",
        }
    }
}

#[derive(Clone, Debug)]
pub struct River {
    pub id: u16,
    /// Dominant river this one is a tributary of
    pub parent: Option<u16>,
    pub source_cell: usize,
    pub mouth_cell: usize,
    /// Meandered centerline length in map units
    pub length: f64,
    /// Channel width modifier
    pub width: f64,
    /// Bed widening modifier, scales how fast the channel grows downstream
    pub widening: f64,
    /// Root of the tributary chain
    pub basin: u16,
    pub name: String,
    pub kind: RiverKind,
    /// Meandered centerline with confluence flux per point
    pub points: Vec<RiverPoint>,
    /// Closed bank outline: right bank source to mouth, then left bank back
    pub polygon: Vec<[f64; 2]>,
}

struct Segment {
    river: u16,
    cell: usize,
    x: f64,
    y: f64,
}

/// Small freshwater lakes get temporarily raised to sea level so rivers can
/// flow across them; the biome stage drops them back under water. Big lakes
/// stay closed (endorheic).
pub fn elevate_lakes(pack: &mut Pack) {
    let max_cells = pack.graph.cells_len() / 100;
    for i in 0..pack.graph.cells_len() {
        if pack.heights[i] >= 20 {
            continue;
        }
        let feature = &pack.features[pack.feature_ids[i] as usize];
        if feature.group == "freshwater" && feature.cell_count <= max_cells {
            pack.heights[i] = 20;
        }
    }
}

/// Run the full drainage simulation and return the rivers table. Resolves
/// depressions on a slightly tilted copy of the height field and writes the
/// resolved heights back to the pack.
pub fn generate(pack: &mut Pack, grid: &Grid, rng: &mut ChaCha8Rng) -> Vec<River> {
    let n = pack.graph.cells_len();
    markup_land(pack);

    // tilt the interior ever so slightly toward the coast so drainage
    // does not stall on large flats
    let mut h: Vec<f64> = (0..n)
        .map(|i| {
            let base = pack.heights[i] as f64;
            if pack.heights[i] < 20 || pack.cell_types[i] < 1 {
                return base;
            }
            let neighbors = &pack.graph.cells.neighbors[i];
            let mean_t = neighbors
                .iter()
                .map(|&c| pack.cell_types[c as usize] as f64)
                .sum::<f64>()
                / neighbors.len().max(1) as f64;
            base + pack.cell_types[i] as f64 / 100.0 + mean_t / 10_000.0
        })
        .collect();

    resolve_depressions(pack, &mut h);
    for feature in &mut pack.features {
        feature.river = None;
        feature.inflow = 0.0;
    }

    pack.flux = vec![0; n];
    pack.river_ids = vec![0; n];
    pack.confluences = vec![0; n];

    let mut segments: Vec<Segment> = Vec::new();
    let mut parent_of: Vec<u16> = vec![0; 1]; // river ids start at 1
    drain_water(pack, grid, &h, &mut segments, &mut parent_of);

    let rivers = define_rivers(pack, &segments, &parent_of, rng);

    for i in 0..n {
        pack.heights[i] = h[i].trunc().clamp(0.0, 100.0) as u8;
    }
    rivers
}

/// Extend the coast distance field inland: ring 2 is set by feature markup,
/// each further ring gets the next distance value.
fn markup_land(pack: &mut Pack) {
    let mut k: i8 = 2;
    loop {
        let queue: Vec<usize> = (0..pack.graph.cells_len())
            .filter(|&i| pack.cell_types[i] == k)
            .collect();
        if queue.is_empty() {
            break;
        }
        for i in queue {
            for j in 0..pack.graph.cells.neighbors[i].len() {
                let c = pack.graph.cells.neighbors[i][j] as usize;
                if pack.cell_types[c] == 0 {
                    pack.cell_types[c] = k + 1;
                }
            }
        }
        k += 1;
    }
}

/// Raise every landlocked pit until it has a downhill neighbor. The pass
/// order is fixed up front (highest first) and the whole sweep repeats until
/// clean or the iteration cap is hit.
pub fn resolve_depressions(pack: &Pack, h: &mut [f64]) -> bool {
    let mut land: Vec<usize> = (0..pack.graph.cells_len())
        .filter(|&i| h[i] >= 20.0 && h[i] < 100.0 && !pack.graph.cells.border[i])
        .collect();
    land.sort_by(|&a, &b| h[b].partial_cmp(&h[a]).unwrap());
    let mut depressed = false;

    for _ in 0..100 {
        let mut depressions = 0usize;
        for &i in &land {
            let min_height = pack.graph.cells.neighbors[i]
                .iter()
                .map(|&c| h[c as usize])
                .fold(f64::INFINITY, f64::min);
            if min_height >= 100.0 {
                continue;
            }
            if h[i] <= min_height {
                h[i] = (min_height + 1.0).min(100.0);
                depressions += 1;
                depressed = true;
            }
        }
        if depressions == 0 {
            break;
        }
    }
    depressed
}

fn drain_water(
    pack: &mut Pack,
    grid: &Grid,
    h: &[f64],
    segments: &mut Vec<Segment>,
    parent_of: &mut Vec<u16>,
) {
    let width = pack.graph.width;
    let height = pack.graph.height;
    let mut land: Vec<usize> = (0..pack.graph.cells_len())
        .filter(|&i| h[i] >= 20.0)
        .collect();
    land.sort_by(|&a, &b| h[b].partial_cmp(&h[a]).unwrap());

    let mut river_next: u16 = 1;

    for i in land {
        let prec = grid.precipitation[pack.grid_parent[i] as usize];
        pack.flux[i] = pack.flux[i].saturating_add(prec as u16);
        let [x, y] = pack.graph.points[i];

        // near-border cell: pour out of the map toward the nearest edge
        if pack.graph.cells.border[i] {
            if pack.river_ids[i] != 0 {
                let min = y.min(height - y).min(x).min(width - x);
                let (tx, ty) = if min == y {
                    (x, 0.0)
                } else if min == height - y {
                    (x, height)
                } else if min == x {
                    (0.0, y)
                } else {
                    (width, y)
                };
                segments.push(Segment {
                    river: pack.river_ids[i],
                    cell: i,
                    x: tx,
                    y: ty,
                });
            }
            continue;
        }

        let min = pack.graph.cells.neighbors[i]
            .iter()
            .copied()
            .min_by(|&a, &b| h[a as usize].partial_cmp(&h[b as usize]).unwrap())
            .map(|c| c as usize)
            .unwrap_or(i);

        // only one river may flow through a lake
        let feature = &pack.features[pack.feature_ids[i] as usize];
        if let Some(lake_river) = feature.river {
            if lake_river != pack.river_ids[i] {
                pack.flux[i] = 0;
            }
        }

        if pack.flux[i] < MIN_RIVER_FLUX {
            if h[min] >= 20.0 {
                pack.flux[min] = pack.flux[min].saturating_add(pack.flux[i]);
            }
            continue;
        }

        if pack.river_ids[i] == 0 {
            pack.river_ids[i] = river_next;
            parent_of.push(0);
            segments.push(Segment {
                river: river_next,
                cell: i,
                x,
                y,
            });
            river_next += 1;
        }
        let river = pack.river_ids[i];

        if pack.river_ids[min] != 0 {
            let other = pack.river_ids[min];
            if pack.flux[min] < pack.flux[i] {
                // the downhill river carries less water: it becomes ours
                pack.confluences[min] = pack.flux[min].min(255) as u8;
                if h[min] >= 20.0 {
                    parent_of[other as usize] = river;
                }
                pack.river_ids[min] = river;
            } else {
                pack.confluences[min] =
                    pack.confluences[min].saturating_add(pack.flux[i].min(255) as u8);
                if h[min] >= 20.0 {
                    parent_of[river as usize] = other;
                }
            }
        } else {
            pack.river_ids[min] = river;
        }

        let [nx, ny] = pack.graph.points[min];
        if h[min] < 20.0 {
            // mouth: attach the final segment to the haven cell
            segments.push(Segment {
                river,
                cell: pack.haven[i] as usize,
                x: nx,
                y: ny,
            });
        } else {
            let min_feature = pack.feature_ids[min] as usize;
            if pack.features[min_feature].kind == crate::features::FeatureKind::Lake {
                let f = &mut pack.features[min_feature];
                if f.river.is_none() || (pack.flux[i] as f64) > f.inflow {
                    f.river = Some(river);
                    f.inflow = pack.flux[i] as f64;
                }
            }
            pack.flux[min] = pack.flux[min].saturating_add(pack.flux[i]);
            segments.push(Segment {
                river,
                cell: min,
                x: nx,
                y: ny,
            });
        }
    }
}

fn define_rivers(
    pack: &mut Pack,
    segments: &[Segment],
    parent_of: &[u16],
    rng: &mut ChaCha8Rng,
) -> Vec<River> {
    let mut rivers = Vec::new();
    let river_count = parent_of.len() as u16;

    for id in 1..river_count {
        let river_segments: Vec<&Segment> = segments.iter().filter(|s| s.river == id).collect();

        if river_segments.len() > 2 {
            let points = add_meandering(pack, &river_segments, rng, 0.3);
            let width = rn(0.8 + rng.gen::<f64>() * 0.4, 1);
            let increment = rn(0.8 + rng.gen::<f64>() * 0.6, 1);
            let length = rn(polyline_length(&points), 2);
            let widening = rn((1000.0 + length * 30.0) * increment, 0);
            let polygon = bank_polygon(&points, width, widening, length);

            let source = river_segments[0];
            let mouth = river_segments[river_segments.len() - 2];
            let parent = match parent_of[id as usize] {
                0 => None,
                p => Some(p),
            };
            rivers.push(River {
                id,
                parent,
                source_cell: source.cell,
                mouth_cell: mouth.cell,
                length,
                width,
                widening,
                basin: id,
                name: String::new(),
                kind: RiverKind::River,
                points,
                polygon,
            });
        } else {
            // too short to matter
            for s in &river_segments {
                if pack.river_ids[s.cell] == id {
                    pack.river_ids[s.cell] = 0;
                }
            }
        }
    }
    rivers
}

/// Inject extra control points into each segment, offset perpendicular to
/// the flow by a serpentine factor that shrinks downstream, so rivers
/// meander near the source and straighten toward the mouth.
fn add_meandering(
    pack: &Pack,
    segments: &[&Segment],
    rng: &mut ChaCha8Rng,
    rnd_factor: f64,
) -> Vec<RiverPoint> {
    let mut enhanced = Vec::new();
    let mut side = 1.0f64;

    for s in 0..segments.len() {
        let sx = segments[s].x;
        let sy = segments[s].y;
        let confluence = pack.confluences[segments[s].cell];
        enhanced.push(RiverPoint {
            x: sx,
            y: sy,
            confluence,
        });
        if s + 1 == segments.len() {
            break;
        }

        let ex = segments[s + 1].x;
        let ey = segments[s + 1].y;
        let angle = (ey - sy).atan2(ex - sx);
        let (sin, cos) = angle.sin_cos();
        let serpentine = 1.0 / (s + 1) as f64 + 0.3;
        let meander = serpentine + rng.gen::<f64>() * rnd_factor;
        if probability(rng, 0.5) {
            side *= -1.0;
        }
        let dist2 = (ex - sx).powi(2) + (ey - sy).powi(2);
        if dist2 > 64.0 || (dist2 > 16.0 && segments.len() < 6) {
            let p1x = (sx * 2.0 + ex) / 3.0 + side * -sin * meander;
            let p1y = (sy * 2.0 + ey) / 3.0 + side * cos * meander;
            if probability(rng, 0.2) {
                side *= -1.0;
            }
            let p2x = (sx + ex * 2.0) / 3.0 + side * sin * meander;
            let p2y = (sy + ey * 2.0) / 3.0 + side * cos * meander;
            enhanced.push(RiverPoint { x: p1x, y: p1y, confluence: 0 });
            enhanced.push(RiverPoint { x: p2x, y: p2y, confluence: 0 });
        } else if dist2 > 16.0 || segments.len() < 6 {
            let px = (sx + ex) / 2.0 + side * -sin * meander;
            let py = (sy + ey) / 2.0 + side * cos * meander;
            enhanced.push(RiverPoint { x: px, y: py, confluence: 0 });
        }
    }
    enhanced
}

fn polyline_length(points: &[RiverPoint]) -> f64 {
    points
        .windows(2)
        .map(|w| ((w[1].x - w[0].x).powi(2) + (w[1].y - w[0].y).powi(2)).sqrt())
        .sum()
}

/// Offset the centerline to both sides to build a closed bank outline. The
/// channel grows downstream through an arctangent of the distance from the
/// source, and confluences add a permanent extra width.
fn bank_polygon(points: &[RiverPoint], width: f64, widening: f64, length: f64) -> Vec<[f64; 2]> {
    if points.len() < 2 {
        return Vec::new();
    }
    let mut left: Vec<[f64; 2]> = Vec::with_capacity(points.len());
    let mut right: Vec<[f64; 2]> = Vec::with_capacity(points.len());
    let last = points.len() - 1;
    let factor = length / points.len() as f64;
    let mut extra_offset = 0.1;
    let mut offset = extra_offset;

    let angle = (points[0].y - points[1].y).atan2(points[0].x - points[1].x);
    let (sin, cos) = angle.sin_cos();
    left.push([points[0].x - sin * extra_offset, points[0].y + cos * extra_offset]);
    right.push([points[0].x + sin * extra_offset, points[0].y - cos * extra_offset]);

    for p in 1..last {
        let RiverPoint { x, y, confluence } = points[p];
        let angle = (points[p - 1].y - points[p + 1].y).atan2(points[p - 1].x - points[p + 1].x);
        let (sin, cos) = angle.sin_cos();
        offset = ((p as f64 * factor).powi(2) / widening).atan() / 2.0 * width + extra_offset;
        let conf_offset = (confluence as f64 * 5.0 / widening).atan();
        extra_offset += conf_offset;
        left.push([x - sin * offset, y + cos * (offset + conf_offset)]);
        right.push([x + sin * offset, y - cos * offset]);
    }

    let RiverPoint { x, y, confluence } = points[last];
    if confluence > 0 {
        // estuary widening at a final confluence
        offset += (confluence as f64 * 10.0 / widening).atan();
    }
    let angle = (points[last - 1].y - y).atan2(points[last - 1].x - x);
    let (sin, cos) = angle.sin_cos();
    left.push([x - sin * offset, y + cos * offset]);
    right.push([x + sin * offset, y - cos * offset]);

    right.into_iter().chain(left.into_iter().rev()).collect()
}

/// Classify and name the generated rivers. Rivers under the 15th length
/// percentile get small-stream names; every sixth tributary id reads as a
/// fork or branch of its parent.
pub fn specify(rivers: &mut [River], names: &NameGenerator, rng: &mut ChaCha8Rng) {
    if rivers.is_empty() {
        return;
    }
    let mut lengths: Vec<f64> = rivers.iter().map(|r| r.length).collect();
    lengths.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let idx = (rivers.len() as f64 * 0.15).ceil() as usize;
    let small_threshold = lengths.get(idx).copied();

    const SMALL_KINDS: [(RiverKind, u32); 4] = [
        (RiverKind::Creek, 9),
        (RiverKind::River, 3),
        (RiverKind::Brook, 3),
        (RiverKind::Stream, 1),
    ];

    let parents: Vec<(u16, Option<u16>)> = rivers.iter().map(|r| (r.id, r.parent)).collect();
    for river in rivers.iter_mut() {
        river.basin = basin_of(&parents, river.id);
        river.name = names.culture_name(rng, 0);
        let small = small_threshold.map_or(false, |t| river.length < t);
        river.kind = if river.parent.is_some() && river.id % 6 == 0 {
            if small {
                RiverKind::Branch
            } else {
                RiverKind::Fork
            }
        } else if small {
            *weighted_choice(rng, &SMALL_KINDS)
        } else {
            RiverKind::River
        };
    }
}

fn basin_of(parents: &[(u16, Option<u16>)], id: u16) -> u16 {
    let mut current = id;
    loop {
        let parent = parents
            .iter()
            .find(|&&(r, _)| r == current)
            .and_then(|&(_, p)| p);
        match parent {
            Some(p) if p != current => {
                if parents.iter().all(|&(r, _)| r != p) {
                    return current;
                }
                current = p;
            }
            _ => return current,
        }
    }
}

/// Remove a river and every tributary draining into it, restoring base flux
/// on the affected cells.
pub fn remove(pack: &mut Pack, grid: &Grid, rivers: &mut Vec<River>, id: u16) {
    let parents: Vec<(u16, Option<u16>)> = rivers.iter().map(|r| (r.id, r.parent)).collect();
    let removed: Vec<u16> = rivers
        .iter()
        .map(|r| r.id)
        .filter(|&r| r == id || drains_through(&parents, r, id))
        .collect();

    for i in 0..pack.graph.cells_len() {
        let r = pack.river_ids[i];
        if r == 0 || !removed.contains(&r) {
            continue;
        }
        pack.river_ids[i] = 0;
        pack.flux[i] = grid.precipitation[pack.grid_parent[i] as usize] as u16;
        pack.confluences[i] = 0;
    }
    rivers.retain(|r| !removed.contains(&r.id));
}

fn drains_through(parents: &[(u16, Option<u16>)], mut current: u16, target: u16) -> bool {
    loop {
        if current == target {
            return true;
        }
        let parent = parents
            .iter()
            .find(|&&(r, _)| r == current)
            .and_then(|&(_, p)| p);
        match parent {
            Some(p) if p != current => current = p,
            _ => return false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features;
    use crate::graph::Graph;
    use crate::regraph;
    use rand::SeedableRng;

    fn island_world() -> (Grid, Pack) {
        let mut rng = ChaCha8Rng::seed_from_u64(77);
        let graph = Graph::generate(&mut rng, 300.0, 200.0, 1500.0).unwrap();
        let mut grid = Grid::new(graph);
        for i in 0..grid.graph.cells_len() {
            let [x, y] = grid.graph.points[i];
            let dx = (x - 150.0) / 120.0;
            let dy = (y - 100.0) / 80.0;
            let r2 = dx * dx + dy * dy;
            grid.heights[i] = if r2 < 1.0 {
                (20.0 + (1.0 - r2) * 60.0) as u8
            } else {
                5
            };
        }
        features::mark_grid_features(&mut grid);
        features::markup_ocean(&mut grid, &[-6, -3, -1]);
        grid.temperature = vec![15; grid.graph.cells_len()];
        grid.precipitation = vec![40; grid.graph.cells_len()];

        let mut pack = regraph::re_graph(&grid).unwrap();
        features::re_mark_features(&mut pack, &grid);
        (grid, pack)
    }

    #[test]
    fn test_resolve_depressions_leaves_no_pits() {
        let (_, pack) = island_world();
        let mut h: Vec<f64> = pack.heights.iter().map(|&v| v as f64).collect();
        resolve_depressions(&pack, &mut h);

        for i in 0..pack.graph.cells_len() {
            if h[i] < 20.0 || h[i] >= 100.0 || pack.graph.cells.border[i] {
                continue;
            }
            let min = pack.graph.cells.neighbors[i]
                .iter()
                .map(|&c| h[c as usize])
                .fold(f64::INFINITY, f64::min);
            assert!(h[i] > min, "cell {} has no downhill neighbor", i);
        }
    }

    #[test]
    fn test_drainage_produces_rivers_on_a_wet_island() {
        let (grid, mut pack) = island_world();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let rivers = generate(&mut pack, &grid, &mut rng);
        assert!(!rivers.is_empty(), "wet island should drain somewhere");
        for river in &rivers {
            assert!(river.points.len() >= 3);
            assert!(river.length > 0.0);
            assert!(!river.polygon.is_empty());
            // flux only accumulates downstream
            assert!(pack.flux[river.mouth_cell] >= pack.flux[river.source_cell]);
        }
    }

    #[test]
    fn test_river_cells_carry_min_flux() {
        let (grid, mut pack) = island_world();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let rivers = generate(&mut pack, &grid, &mut rng);
        let kept: Vec<u16> = rivers.iter().map(|r| r.id).collect();
        for i in 0..pack.graph.cells_len() {
            let r = pack.river_ids[i];
            if r != 0 && kept.contains(&r) {
                assert!(pack.flux[i] >= MIN_RIVER_FLUX || pack.heights[i] < 20);
            }
        }
    }

    #[test]
    fn test_tributary_chains_are_acyclic() {
        let (grid, mut pack) = island_world();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut rivers = generate(&mut pack, &grid, &mut rng);
        let names = NameGenerator::new();
        let mut names_rng = ChaCha8Rng::seed_from_u64(9);
        specify(&mut rivers, &names, &mut names_rng);

        let parents: Vec<(u16, Option<u16>)> = rivers.iter().map(|r| (r.id, r.parent)).collect();
        for river in &rivers {
            let mut seen = vec![river.id];
            let mut current = river.id;
            loop {
                let parent = parents
                    .iter()
                    .find(|&&(r, _)| r == current)
                    .and_then(|&(_, p)| p);
                match parent {
                    Some(p) if p != current => {
                        assert!(!seen.contains(&p), "cycle through river {}", p);
                        seen.push(p);
                        if parents.iter().all(|&(r, _)| r != p) {
                            break;
                        }
                        current = p;
                    }
                    _ => break,
                }
            }
            assert!(!river.name.is_empty());
        }
    }

    #[test]
    fn test_remove_clears_cells_and_tributaries() {
        let (grid, mut pack) = island_world();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut rivers = generate(&mut pack, &grid, &mut rng);
        if rivers.is_empty() {
            return;
        }
        let id = rivers[0].id;
        remove(&mut pack, &grid, &mut rivers, id);
        assert!(rivers.iter().all(|r| r.id != id));
        for i in 0..pack.graph.cells_len() {
            assert_ne!(pack.river_ids[i], id);
        }
    }

    #[test]
    fn test_meandered_line_is_longer_than_straight() {
        let (grid, mut pack) = island_world();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let rivers = generate(&mut pack, &grid, &mut rng);
        for river in &rivers {
            let straight = {
                let a = &river.points[0];
                let b = &river.points[river.points.len() - 1];
                ((b.x - a.x).powi(2) + (b.y - a.y).powi(2)).sqrt()
            };
            assert!(river.length >= straight * 0.99);
        }
    }
}
