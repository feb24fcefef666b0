//! Voronoi graph construction
//!
//! Both map scales share one graph shape: a Delaunay triangulation over
//! jittered points plus a synthetic boundary ring, with the Voronoi dual
//! derived from the half-edge arrays. Cells store ordered neighbor and
//! vertex lists; vertices store their three adjacent cells and up to three
//! neighboring vertices. Cell ids at or past the interior point count are
//! boundary points and count as "outside" everywhere downstream.

use delaunator::{triangulate, Point, Triangulation, EMPTY};
use rand_chacha::ChaCha8Rng;

use crate::utils::{rand_float, rn};
use crate::world::WorldGenError;

/// Sentinel for a missing vertex neighbor (outer hull of the boundary ring).
pub const INVALID: u32 = u32::MAX;

/// Per-cell adjacency, struct-of-arrays.
#[derive(Clone, Debug, Default)]
pub struct CellGraph {
    /// Ordered ids of adjacent interior cells
    pub neighbors: Vec<Vec<u32>>,
    /// Ordered Voronoi polygon vertex ids
    pub vertices: Vec<Vec<u32>>,
    /// True when the cell touches the synthetic boundary ring
    pub border: Vec<bool>,
}

/// Per-vertex adjacency, struct-of-arrays.
#[derive(Clone, Debug, Default)]
pub struct VertexGraph {
    /// Vertex coordinates (triangle circumcenters, floored)
    pub positions: Vec<[f64; 2]>,
    /// Up to three adjacent vertices, `INVALID` when missing
    pub neighbors: Vec<[u32; 3]>,
    /// The three cells meeting at this vertex (may include boundary ids)
    pub cells: Vec<[u32; 3]>,
}

/// A complete Voronoi graph over one set of points.
#[derive(Clone, Debug)]
pub struct Graph {
    pub width: f64,
    pub height: f64,
    pub spacing: f64,
    pub cells_x: usize,
    pub cells_y: usize,
    /// Interior seed points, row-major for the initial square grid
    pub points: Vec<[f64; 2]>,
    /// Synthetic ring enclosing the map, excluded from cells
    pub boundary: Vec<[f64; 2]>,
    pub cells: CellGraph,
    pub vertices: VertexGraph,
}

impl Graph {
    /// Build the base grid graph: jittered square lattice plus boundary ring.
    pub fn generate(
        rng: &mut ChaCha8Rng,
        width: f64,
        height: f64,
        cells_desired: f64,
    ) -> Result<Self, WorldGenError> {
        let spacing = rn((width * height / cells_desired).sqrt(), 2);
        let boundary = boundary_points(width, height, spacing);
        let points = jittered_points(rng, width, height, spacing);
        let cells_x = ((width + 0.5 * spacing - 1e-10) / spacing).floor() as usize;
        let cells_y = ((height + 0.5 * spacing - 1e-10) / spacing).floor() as usize;

        let (cells, vertices) = compute_voronoi(&points, &boundary)?;
        Ok(Self {
            width,
            height,
            spacing,
            cells_x,
            cells_y,
            points,
            boundary,
            cells,
            vertices,
        })
    }

    /// Build a graph over caller-supplied points, reusing an existing
    /// boundary ring and metrics (the densified pack pass).
    pub fn from_points(
        points: Vec<[f64; 2]>,
        template: &Graph,
    ) -> Result<Self, WorldGenError> {
        let (cells, vertices) = compute_voronoi(&points, &template.boundary)?;
        Ok(Self {
            width: template.width,
            height: template.height,
            spacing: template.spacing,
            cells_x: template.cells_x,
            cells_y: template.cells_y,
            points,
            boundary: template.boundary.clone(),
            cells,
            vertices,
        })
    }

    /// Number of interior cells.
    pub fn cells_len(&self) -> usize {
        self.points.len()
    }

    /// Map a coordinate to its square-lattice grid cell. Only meaningful on
    /// the base grid, where points are row-major.
    pub fn find_grid_cell(&self, x: f64, y: f64) -> usize {
        let col = ((x / self.spacing).floor() as usize).min(self.cells_x - 1);
        let row = ((y / self.spacing).floor() as usize).min(self.cells_y - 1);
        row * self.cells_x + col
    }

    /// The Voronoi polygon of a cell as vertex coordinates.
    pub fn cell_polygon(&self, cell: usize) -> Vec<[f64; 2]> {
        self.cells.vertices[cell]
            .iter()
            .map(|&v| self.vertices.positions[v as usize])
            .collect()
    }
}

/// Evenly spaced points just outside the map edge. These pseudo-clip the
/// voronoi diagram: every interior cell polygon closes without touching
/// infinity.
fn boundary_points(width: f64, height: f64, spacing: f64) -> Vec<[f64; 2]> {
    let offset = rn(-1.0 * spacing, 0);
    let b_spacing = spacing * 2.0;
    let w = width - offset * 2.0;
    let h = height - offset * 2.0;
    let number_x = (w / b_spacing).ceil() - 1.0;
    let number_y = (h / b_spacing).ceil() - 1.0;

    let mut points = Vec::new();
    let mut i = 0.5;
    while i < number_x {
        let x = ((w * i) / number_x + offset).ceil();
        points.push([x, offset]);
        points.push([x, h + offset]);
        i += 1.0;
    }
    let mut i = 0.5;
    while i < number_y {
        let y = ((h * i) / number_y + offset).ceil();
        points.push([offset, y]);
        points.push([w + offset, y]);
        i += 1.0;
    }
    points
}

/// Square lattice jittered by up to 90% of the cell radius.
fn jittered_points(
    rng: &mut ChaCha8Rng,
    width: f64,
    height: f64,
    spacing: f64,
) -> Vec<[f64; 2]> {
    let radius = spacing / 2.0;
    let jittering = radius * 0.9;
    let mut points = Vec::new();

    let mut y = radius;
    while y < height {
        let mut x = radius;
        while x < width {
            let xj = rn(x + rand_float(rng, -jittering, jittering), 2).min(width);
            let yj = rn(y + rand_float(rng, -jittering, jittering), 2).min(height);
            points.push([xj, yj]);
            x += spacing;
        }
        y += spacing;
    }
    points
}

/// Triangulate interior + boundary points and derive the dual graph for the
/// interior cells.
fn compute_voronoi(
    points: &[[f64; 2]],
    boundary: &[[f64; 2]],
) -> Result<(CellGraph, VertexGraph), WorldGenError> {
    let points_n = points.len();
    let all: Vec<Point> = points
        .iter()
        .chain(boundary.iter())
        .map(|p| Point { x: p[0], y: p[1] })
        .collect();

    let tri = triangulate(&all);
    if tri.triangles.is_empty() {
        return Err(WorldGenError::DegenerateGraph(points_n));
    }

    let triangles_n = tri.triangles.len() / 3;
    let mut cells = CellGraph {
        neighbors: vec![Vec::new(); points_n],
        vertices: vec![Vec::new(); points_n],
        border: vec![false; points_n],
    };
    let mut vertices = VertexGraph {
        positions: vec![[0.0, 0.0]; triangles_n],
        neighbors: vec![[INVALID; 3]; triangles_n],
        cells: vec![[0; 3]; triangles_n],
    };
    let mut cell_seen = vec![false; points_n];
    let mut vertex_seen = vec![false; triangles_n];

    for e in 0..tri.triangles.len() {
        let p = tri.triangles[next_halfedge(e)];
        if p < points_n && !cell_seen[p] {
            cell_seen[p] = true;
            let edges = edges_around_point(&tri, e);
            cells.vertices[p] = edges.iter().map(|&e| (e / 3) as u32).collect();
            let neighbors: Vec<u32> = edges
                .iter()
                .map(|&e| tri.triangles[e])
                .filter(|&c| c < points_n)
                .map(|c| c as u32)
                .collect();
            cells.border[p] = edges.len() > neighbors.len();
            cells.neighbors[p] = neighbors;
        }

        let t = e / 3;
        if !vertex_seen[t] {
            vertex_seen[t] = true;
            let [a, b, c] = points_of_triangle(&tri, t);
            vertices.positions[t] = circumcenter(&all[a], &all[b], &all[c]);
            vertices.neighbors[t] = triangles_adjacent(&tri, t);
            vertices.cells[t] = [a as u32, b as u32, c as u32];
        }
    }

    Ok((cells, vertices))
}

fn next_halfedge(e: usize) -> usize {
    if e % 3 == 2 {
        e - 2
    } else {
        e + 1
    }
}

/// All half-edges pointing into the same point as `start`, walking around it.
/// Capped at 20 in case of a malformed fan.
fn edges_around_point(tri: &Triangulation, start: usize) -> Vec<usize> {
    let mut result = Vec::new();
    let mut incoming = start;
    loop {
        result.push(incoming);
        let outgoing = next_halfedge(incoming);
        incoming = tri.halfedges[outgoing];
        if incoming == EMPTY || incoming == start || result.len() >= 20 {
            break;
        }
    }
    result
}

fn points_of_triangle(tri: &Triangulation, t: usize) -> [usize; 3] {
    [
        tri.triangles[3 * t],
        tri.triangles[3 * t + 1],
        tri.triangles[3 * t + 2],
    ]
}

fn triangles_adjacent(tri: &Triangulation, t: usize) -> [u32; 3] {
    let mut out = [INVALID; 3];
    for (i, e) in (3 * t..3 * t + 3).enumerate() {
        let opposite = tri.halfedges[e];
        if opposite != EMPTY {
            out[i] = (opposite / 3) as u32;
        }
    }
    out
}

/// Triangle circumcenter, floored to whole units to keep vertex positions
/// stable across scales.
fn circumcenter(a: &Point, b: &Point, c: &Point) -> [f64; 2] {
    let ad = a.x * a.x + a.y * a.y;
    let bd = b.x * b.x + b.y * b.y;
    let cd = c.x * c.x + c.y * c.y;
    let d = 2.0 * (a.x * (b.y - c.y) + b.x * (c.y - a.y) + c.x * (a.y - b.y));
    let x = (ad * (b.y - c.y) + bd * (c.y - a.y) + cd * (a.y - b.y)) / d;
    let y = (ad * (c.x - b.x) + bd * (a.x - c.x) + cd * (b.x - a.x)) / d;
    [x.floor(), y.floor()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn small_graph() -> Graph {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        Graph::generate(&mut rng, 200.0, 100.0, 200.0).unwrap()
    }

    #[test]
    fn test_generate_produces_cells() {
        let graph = small_graph();
        assert!(graph.cells_len() > 100);
        assert_eq!(graph.cells.neighbors.len(), graph.cells_len());
        assert_eq!(graph.cells.vertices.len(), graph.cells_len());
        assert!(!graph.boundary.is_empty());
    }

    #[test]
    fn test_neighbor_symmetry() {
        let graph = small_graph();
        for i in 0..graph.cells_len() {
            for &n in &graph.cells.neighbors[i] {
                assert!(
                    graph.cells.neighbors[n as usize].contains(&(i as u32)),
                    "cell {} lists {} but not vice versa",
                    i,
                    n
                );
            }
        }
    }

    #[test]
    fn test_border_cells_on_edges_only() {
        let graph = small_graph();
        let border_count = graph.cells.border.iter().filter(|&&b| b).count();
        assert!(border_count > 0);
        // interior cells well away from the edges are never border cells
        for i in 0..graph.cells_len() {
            let [x, y] = graph.points[i];
            let margin = graph.spacing * 2.0;
            if x > margin && x < graph.width - margin && y > margin && y < graph.height - margin
            {
                assert!(!graph.cells.border[i], "interior cell {} flagged border", i);
            }
        }
    }

    #[test]
    fn test_vertices_reference_their_cells() {
        let graph = small_graph();
        for i in 0..graph.cells_len() {
            for &v in &graph.cells.vertices[i] {
                let adjacent = graph.vertices.cells[v as usize];
                assert!(
                    adjacent.contains(&(i as u32)),
                    "vertex {} does not list cell {}",
                    v,
                    i
                );
            }
        }
    }

    #[test]
    fn test_find_grid_cell_corners() {
        let graph = small_graph();
        assert_eq!(graph.find_grid_cell(0.0, 0.0), 0);
        let last = graph.find_grid_cell(graph.width, graph.height);
        assert_eq!(last, graph.cells_x * graph.cells_y - 1);
    }

    #[test]
    fn test_determinism() {
        let mut rng1 = ChaCha8Rng::seed_from_u64(9);
        let mut rng2 = ChaCha8Rng::seed_from_u64(9);
        let a = Graph::generate(&mut rng1, 300.0, 150.0, 400.0).unwrap();
        let b = Graph::generate(&mut rng2, 300.0, 150.0, 400.0).unwrap();
        assert_eq!(a.points, b.points);
        assert_eq!(a.cells.neighbors, b.cells.neighbors);
        assert_eq!(a.vertices.positions, b.vertices.positions);
    }
}
