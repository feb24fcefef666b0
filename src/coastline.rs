//! Boundary tracing over the Voronoi dual
//!
//! One walk serves every outline in the generator: starting from a vertex on
//! a class boundary, move to whichever neighboring vertex still separates
//! "inside" cells from "outside" ones, where inside is an arbitrary per-cell
//! predicate. Coastlines, lake shores and ocean depth contours all reduce to
//! that predicate.

use crate::features::FeatureKind;
use crate::graph::{Graph, INVALID};
use crate::regraph::Pack;
use crate::utils::polygon_area;
use crate::world::Grid;

/// Walk the vertex chain separating cells matching `same_class` from the
/// rest. Stops when the walk returns to `start`, stalls, or exceeds
/// `max_iter` steps (a stall is logged and yields the partial chain).
pub fn connect_vertices(
    graph: &Graph,
    start: u32,
    max_iter: usize,
    same_class: impl Fn(u32) -> bool,
) -> Vec<u32> {
    let mut chain: Vec<u32> = Vec::new();
    let mut current = start;
    let mut i = 0;
    while i == 0 || (current != start && i < max_iter) {
        let prev = chain.last().copied().unwrap_or(INVALID);
        chain.push(current);

        let c = graph.vertices.cells[current as usize];
        let v = graph.vertices.neighbors[current as usize];
        let c0 = same_class(c[0]);
        let c1 = same_class(c[1]);
        let c2 = same_class(c[2]);

        if v[0] != INVALID && v[0] != prev && c0 != c1 {
            current = v[0];
        } else if v[1] != INVALID && v[1] != prev && c1 != c2 {
            current = v[1];
        } else if v[2] != INVALID && v[2] != prev && c0 != c2 {
            current = v[2];
        }

        if current == *chain.last().unwrap() {
            eprintln!("boundary trace stalled at vertex {}", current);
            break;
        }
        i += 1;
    }
    chain
}

/// A traced shoreline.
#[derive(Clone, Debug)]
pub struct CoastlinePath {
    pub feature: u16,
    pub kind: FeatureKind,
    pub points: Vec<[f64; 2]>,
}

/// An ocean depth contour for one band level.
#[derive(Clone, Debug)]
pub struct OceanLayerPath {
    pub level: i8,
    pub points: Vec<[f64; 2]>,
}

/// Trace every island and lake outline at pack scale. Assigns outline area
/// and vertex chain to the features; lake chains are relaxed by pulling
/// crowded vertices toward their chain neighbors.
pub fn trace_coastlines(pack: &mut Pack) -> Vec<CoastlinePath> {
    let n = pack.graph.cells_len();
    let mut used = vec![false; pack.features.len()];
    let mut paths = Vec::new();

    for i in 0..n {
        let f = pack.feature_ids[i] as usize;
        if used[f] {
            continue;
        }
        let is_lake = pack.features[f].kind == FeatureKind::Lake;
        let is_coast = pack.heights[i] >= 20
            && pack.graph.cells.neighbors[i]
                .iter()
                .any(|&c| pack.heights[c as usize] < 20);
        if !is_coast && !is_lake {
            continue;
        }

        // lakes are walked from the water side against the land coast ring,
        // islands from the land side against the water coast ring
        let target: i8 = if is_lake { 1 } else { -1 };
        let Some(start) = find_start(pack, i, target) else {
            continue;
        };
        used[f] = true;

        let types = &pack.cell_types;
        let mut chain = connect_vertices(&pack.graph, start, 50_000, |c| {
            c as usize >= n || types[c as usize] == target
        });
        if is_lake {
            relax_chain(&mut pack.graph, &chain, 1.2);
        }

        let mut points = clip_poly(
            chain
                .iter()
                .map(|&v| pack.graph.vertices.positions[v as usize])
                .collect(),
            pack.graph.width,
            pack.graph.height,
        );
        let area = polygon_area(&points);
        if area > 0.0 && is_lake {
            points.reverse();
            chain.reverse();
        }

        pack.features[f].area = area.abs();
        pack.features[f].vertices = chain;
        paths.push(CoastlinePath {
            feature: f as u16,
            kind: pack.features[f].kind,
            points,
        });
    }

    paths
}

/// Vertex to begin the outline walk from a given cell.
fn find_start(pack: &Pack, cell: usize, target: i8) -> Option<u32> {
    let n = pack.graph.cells_len();
    if target == -1 && pack.graph.cells.border[cell] {
        // map border cell: start at a vertex touching the boundary ring
        return pack.graph.cells.vertices[cell]
            .iter()
            .copied()
            .find(|&v| {
                pack.graph.vertices.cells[v as usize]
                    .iter()
                    .any(|&c| c as usize >= n)
            });
    }
    let min_neighbor = pack.graph.cells.neighbors[cell]
        .iter()
        .copied()
        .filter(|&c| pack.cell_types[c as usize] == target)
        .min()?;
    let index = pack.graph.cells.neighbors[cell]
        .iter()
        .position(|&c| c == min_neighbor)?;
    pack.graph.cells.vertices[cell].get(index).copied()
}

/// Pull chain vertices closer than `r` to an already placed point onto the
/// midpoint of their chain neighbors. Smooths jagged lake shores.
fn relax_chain(graph: &mut Graph, chain: &[u32], r: f64) {
    let r2 = r * r;
    let mut placed: Vec<[f64; 2]> = Vec::with_capacity(chain.len());
    for i in 0..chain.len() {
        let v = chain[i] as usize;
        let mut p = graph.vertices.positions[v];
        if i > 0 && i + 1 < chain.len() {
            let crowded = placed
                .iter()
                .any(|q| (q[0] - p[0]).powi(2) + (q[1] - p[1]).powi(2) < r2);
            if crowded {
                let p1 = graph.vertices.positions[chain[i - 1] as usize];
                let p2 = graph.vertices.positions[chain[i + 1] as usize];
                p = [(p1[0] + p2[0]) / 2.0, (p1[1] + p2[1]) / 2.0];
                graph.vertices.positions[v] = p;
            }
        }
        placed.push(p);
    }
}

/// Trace closed depth contours for each requested ocean band on the grid.
/// Chains are thinned (every n-th vertex, more for deeper bands) before
/// clipping; degenerate chains are dropped.
pub fn ocean_layer_paths(grid: &Grid, limits: &[i8]) -> Vec<OceanLayerPath> {
    let n = grid.graph.cells_len();
    let mut used = vec![false; n];
    let mut paths = Vec::new();

    for i in 0..n {
        let t = grid.cell_types[i];
        if t > 0 || used[i] || !limits.contains(&t) {
            continue;
        }
        let Some(start) = ocean_find_start(grid, i) else {
            continue;
        };
        used[i] = true;

        let types = &grid.cell_types;
        let mut chain = connect_vertices(&grid.graph, start, 10_000, |c| {
            let c = c as usize;
            c >= n || types[c] == 0 || types[c] == t - 1
        });
        for &v in &chain {
            for &c in &grid.graph.vertices.cells[v as usize] {
                if (c as usize) < n && types[c as usize] == t {
                    used[c as usize] = true;
                }
            }
        }
        if chain.len() < 4 {
            continue;
        }
        if let Some(&first) = chain.first() {
            chain.push(first);
        }

        // keep every n-th vertex, denser near the map border
        let keep_every = (1 + t as i32 * -2) as usize;
        let thinned: Vec<u32> = chain
            .iter()
            .enumerate()
            .filter(|&(idx, &v)| {
                idx % keep_every == 0
                    || grid.graph.vertices.cells[v as usize]
                        .iter()
                        .any(|&c| c as usize >= n)
            })
            .map(|(_, &v)| v)
            .collect();
        if thinned.len() < 4 {
            continue;
        }

        let points = clip_poly(
            thinned
                .iter()
                .map(|&v| grid.graph.vertices.positions[v as usize])
                .collect(),
            grid.graph.width,
            grid.graph.height,
        );
        paths.push(OceanLayerPath { level: t, points });
    }

    paths
}

fn ocean_find_start(grid: &Grid, cell: usize) -> Option<u32> {
    let n = grid.graph.cells_len();
    if grid.graph.cells.border[cell] {
        return grid.graph.cells.vertices[cell]
            .iter()
            .copied()
            .find(|&v| {
                grid.graph.vertices.cells[v as usize]
                    .iter()
                    .any(|&c| c as usize >= n)
            });
    }
    let t = grid.cell_types[cell];
    let index = grid.graph.cells.neighbors[cell]
        .iter()
        .position(|&c| grid.cell_types[c as usize] < t || grid.cell_types[c as usize] == 0)?;
    grid.graph.cells.vertices[cell].get(index).copied()
}

/// Sutherland-Hodgman clip of a polygon to the map rectangle.
fn clip_poly(points: Vec<[f64; 2]>, width: f64, height: f64) -> Vec<[f64; 2]> {
    // edges as (inside test, intersection)
    type Edge = (
        Box<dyn Fn(&[f64; 2]) -> bool>,
        Box<dyn Fn(&[f64; 2], &[f64; 2]) -> [f64; 2]>,
    );
    let edges: [Edge; 4] = [
        (
            Box::new(|p| p[0] >= 0.0),
            Box::new(|a, b| intersect_x(a, b, 0.0)),
        ),
        (
            Box::new(move |p| p[0] <= width),
            Box::new(move |a, b| intersect_x(a, b, width)),
        ),
        (
            Box::new(|p| p[1] >= 0.0),
            Box::new(|a, b| intersect_y(a, b, 0.0)),
        ),
        (
            Box::new(move |p| p[1] <= height),
            Box::new(move |a, b| intersect_y(a, b, height)),
        ),
    ];

    let mut output = points;
    for (inside, intersect) in &edges {
        if output.is_empty() {
            break;
        }
        let input = std::mem::take(&mut output);
        for i in 0..input.len() {
            let current = input[i];
            let prev = input[(i + input.len() - 1) % input.len()];
            let cur_in = inside(&current);
            let prev_in = inside(&prev);
            if cur_in {
                if !prev_in {
                    output.push(intersect(&prev, &current));
                }
                output.push(current);
            } else if prev_in {
                output.push(intersect(&prev, &current));
            }
        }
    }
    output
}

fn intersect_x(a: &[f64; 2], b: &[f64; 2], x: f64) -> [f64; 2] {
    let t = (x - a[0]) / (b[0] - a[0]);
    [x, a[1] + t * (b[1] - a[1])]
}

fn intersect_y(a: &[f64; 2], b: &[f64; 2], y: f64) -> [f64; 2] {
    let t = (y - a[1]) / (b[1] - a[1]);
    [a[0] + t * (b[0] - a[0]), y]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clip_poly_keeps_interior() {
        let square = vec![[10.0, 10.0], [20.0, 10.0], [20.0, 20.0], [10.0, 20.0]];
        let clipped = clip_poly(square.clone(), 100.0, 100.0);
        assert_eq!(clipped, square);
    }

    #[test]
    fn test_clip_poly_cuts_overhang() {
        let square = vec![[-10.0, 10.0], [20.0, 10.0], [20.0, 20.0], [-10.0, 20.0]];
        let clipped = clip_poly(square, 100.0, 100.0);
        assert!(clipped.iter().all(|p| p[0] >= 0.0));
        assert!(clipped.iter().any(|p| p[0] == 0.0));
    }

    #[test]
    fn test_clip_poly_fully_outside_is_empty() {
        let square = vec![[-20.0, -20.0], [-10.0, -20.0], [-10.0, -10.0], [-20.0, -10.0]];
        assert!(clip_poly(square, 100.0, 100.0).is_empty());
    }
}
