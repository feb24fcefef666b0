//! Template-driven heightmap sculpting
//!
//! Heights live in 0..=100 with 20 as sea level. A template is an ordered
//! list of sculpting steps:
//! 1. Hill/Pit - blob raised or carved with exponential decay outward
//! 2. Range/Trough - a greedy ridge walk with a decaying halo and prominences
//! 3. Strait - a corridor eroded toward sea level
//! 4. Add/Multiply - band-limited arithmetic with a sea-level pivot for land
//! 5. Smooth - blend each cell with its neighborhood mean
//!
//! Decay rates depend on cell density so blobs cover a similar map share at
//! any resolution.

use std::collections::VecDeque;
use std::str::FromStr;

use rand_chacha::ChaCha8Rng;

use crate::graph::Graph;
use crate::utils::{lim, number_in_range, probability, rand_float, rand_range};
use crate::world::WorldGenError;

/// Blob decay exponent per density step (1..=10).
const BLOB_POWER: [f64; 10] = [
    0.98, 0.985, 0.987, 0.9892, 0.9911, 0.9921, 0.9934, 0.9942, 0.9946, 0.995,
];

/// Ridge decay exponent per density step (1..=10).
const LINE_POWER: [f64; 10] = [
    0.81, 0.82, 0.83, 0.84, 0.855, 0.87, 0.885, 0.91, 0.92, 0.93,
];

/// Named heightmap archetypes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Template {
    Volcano,
    HighIsland,
    LowIsland,
    Continents,
    Archipelago,
    Atoll,
    Mediterranean,
    Peninsula,
    Pangea,
    Isthmus,
    Shattered,
}

impl FromStr for Template {
    type Err = WorldGenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
            .collect::<String>()
            .to_lowercase();
        match key.as_str() {
            "volcano" => Ok(Self::Volcano),
            "highisland" => Ok(Self::HighIsland),
            "lowisland" => Ok(Self::LowIsland),
            "continents" => Ok(Self::Continents),
            "archipelago" => Ok(Self::Archipelago),
            "atoll" => Ok(Self::Atoll),
            "mediterranean" => Ok(Self::Mediterranean),
            "peninsula" => Ok(Self::Peninsula),
            "pangea" => Ok(Self::Pangea),
            "isthmus" => Ok(Self::Isthmus),
            "shattered" => Ok(Self::Shattered),
            _ => Err(WorldGenError::InvalidTemplate(s.to_string())),
        }
    }
}

impl Template {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Volcano => "Volcano",
            Self::HighIsland => "High Island",
            Self::LowIsland => "Low Island",
            Self::Continents => "Continents",
            Self::Archipelago => "Archipelago",
            Self::Atoll => "Atoll",
            Self::Mediterranean => "Mediterranean",
            Self::Peninsula => "Peninsula",
            Self::Pangea => "Pangea",
            Self::Isthmus => "Isthmus",
            Self::Shattered => "Shattered",
        }
    }
}

fn density_index(density: f64) -> usize {
    (density.round() as i64).clamp(1, 10) as usize - 1
}

/// Sculpt the grid heightmap in place according to `template`.
pub fn generate(
    graph: &Graph,
    heights: &mut [u8],
    rng: &mut ChaCha8Rng,
    template: Template,
    density: f64,
) {
    heights.fill(0);
    let mut sculptor = Sculptor {
        graph,
        heights,
        rng,
        blob_power: BLOB_POWER[density_index(density)],
        line_power: LINE_POWER[density_index(density)],
    };
    sculptor.run(template);
}

struct Sculptor<'a> {
    graph: &'a Graph,
    heights: &'a mut [u8],
    rng: &'a mut ChaCha8Rng,
    blob_power: f64,
    line_power: f64,
}

impl<'a> Sculptor<'a> {
    fn run(&mut self, template: Template) {
        match template {
            Template::Volcano => {
                self.hill("1", "90-100", "44-56", "40-60");
                self.multiply("50-100", 0.8);
                self.range("1.5", "30-55", "45-55", "40-60");
                self.smooth(2.0);
                self.hill("1.5", "25-35", "25-30", "20-75");
                self.hill("1", "25-35", "75-80", "25-75");
                self.hill("0.5", "20-25", "10-15", "20-25");
            }
            Template::HighIsland => {
                self.hill("1", "90-100", "65-75", "47-53");
                self.add("all", 5.0);
                self.hill("6", "20-23", "25-55", "45-55");
                self.range("1", "40-50", "45-55", "45-55");
                self.smooth(2.0);
                self.trough("2-3", "20-30", "20-30", "20-30");
                self.trough("2-3", "20-30", "60-80", "70-80");
                self.hill("1", "10-15", "60-60", "50-50");
                self.hill("1.5", "13-16", "15-20", "20-75");
                self.multiply("20-100", 0.8);
                self.range("1.5", "30-40", "15-85", "30-40");
                self.range("1.5", "30-40", "15-85", "60-70");
                self.pit("2-3", "10-15", "15-85", "20-80");
            }
            Template::LowIsland => {
                self.hill("1", "90-99", "60-80", "45-55");
                self.hill("4-5", "25-35", "20-65", "40-60");
                self.range("1", "40-50", "45-55", "45-55");
                self.smooth(3.0);
                self.trough("1.5", "20-30", "15-85", "20-30");
                self.trough("1.5", "20-30", "15-85", "70-80");
                self.hill("1.5", "10-15", "5-15", "20-80");
                self.hill("1", "10-15", "85-95", "70-80");
                self.pit("3-5", "10-15", "15-85", "20-80");
                self.multiply("20-100", 0.4);
            }
            Template::Continents => {
                self.hill("1", "80-85", "75-80", "40-60");
                self.hill("1", "80-85", "20-25", "40-60");
                self.multiply("20-100", 0.22);
                self.hill("5-6", "15-20", "25-75", "20-82");
                self.range(".8", "30-60", "5-15", "20-45");
                self.range(".8", "30-60", "5-15", "55-80");
                self.range("0-3", "30-60", "80-90", "20-80");
                self.trough("3-4", "15-20", "15-85", "20-80");
                self.strait("2", true);
                self.smooth(2.0);
                self.trough("1-2", "5-10", "45-55", "45-55");
                self.pit("3-4", "10-15", "15-85", "20-80");
                self.hill("1", "5-10", "40-60", "40-60");
            }
            Template::Archipelago => {
                self.add("all", 11.0);
                self.range("2-3", "40-60", "20-80", "20-80");
                self.hill("5", "15-20", "10-90", "30-70");
                self.hill("2", "10-15", "10-30", "20-80");
                self.hill("2", "10-15", "60-90", "20-80");
                self.smooth(3.0);
                self.trough("10", "20-30", "5-95", "5-95");
                self.strait("2", true);
                self.strait("2", false);
            }
            Template::Atoll => {
                self.hill("1", "75-80", "50-60", "45-55");
                self.hill("1.5", "30-50", "25-75", "30-70");
                self.hill(".5", "30-50", "25-35", "30-70");
                self.smooth(1.0);
                self.multiply("25-100", 0.2);
                self.hill(".5", "10-20", "50-55", "48-52");
            }
            Template::Mediterranean => {
                self.range("3-4", "30-50", "0-100", "0-10");
                self.range("3-4", "30-50", "0-100", "90-100");
                self.hill("5-6", "30-70", "0-100", "0-5");
                self.hill("5-6", "30-70", "0-100", "95-100");
                self.smooth(1.0);
                self.hill("2-3", "30-70", "0-5", "20-80");
                self.hill("2-3", "30-70", "95-100", "20-80");
                self.multiply("land", 0.8);
                self.trough("3-5", "40-50", "0-100", "0-10");
                self.trough("3-5", "40-50", "0-100", "90-100");
            }
            Template::Peninsula => {
                self.range("2-3", "20-35", "40-50", "0-15");
                self.add("all", 5.0);
                self.hill("1", "90-100", "10-90", "0-5");
                self.add("all", 13.0);
                self.hill("3-4", "3-5", "5-95", "80-100");
                self.hill("1-2", "3-5", "5-95", "40-60");
                self.trough("5-6", "10-25", "5-95", "5-95");
                self.smooth(3.0);
            }
            Template::Pangea => {
                self.hill("1-2", "25-40", "15-50", "0-10");
                self.hill("1-2", "5-40", "50-85", "0-10");
                self.hill("1-2", "25-40", "50-85", "90-100");
                self.hill("1-2", "5-40", "15-50", "90-100");
                self.hill("8-12", "20-40", "20-80", "48-52");
                self.smooth(2.0);
                self.multiply("land", 0.7);
                self.trough("3-4", "25-35", "5-95", "10-20");
                self.trough("3-4", "25-35", "5-95", "80-90");
                self.range("5-6", "30-40", "10-90", "35-65");
            }
            Template::Isthmus => {
                self.hill("5-10", "15-30", "0-30", "0-20");
                self.hill("5-10", "15-30", "10-50", "20-40");
                self.hill("5-10", "15-30", "30-70", "40-60");
                self.hill("5-10", "15-30", "50-90", "60-80");
                self.hill("5-10", "15-30", "70-100", "80-100");
                self.smooth(2.0);
                self.trough("4-8", "15-30", "0-30", "0-20");
                self.trough("4-8", "15-30", "10-50", "20-40");
                self.trough("4-8", "15-30", "30-70", "40-60");
                self.trough("4-8", "15-30", "50-90", "60-80");
                self.trough("4-8", "15-30", "70-100", "80-100");
            }
            Template::Shattered => {
                self.hill("8", "35-40", "15-85", "30-70");
                self.trough("10-20", "40-50", "5-95", "5-95");
                self.range("5-7", "30-40", "10-90", "20-80");
                self.pit("12-20", "30-40", "15-85", "20-80");
            }
        }
    }

    /// Random point on an axis within a "min-max" percentage window.
    fn point_in_range(&mut self, range: &str, length: f64) -> f64 {
        let (a, b) = range.split_once('-').unwrap_or((range, ""));
        let min = a.parse::<f64>().map(|v| v / 100.0).unwrap_or(0.0);
        let mut max = b.parse::<f64>().map(|v| v / 100.0).unwrap_or(100.0);
        if max == 0.0 {
            max = 100.0;
        }
        rand_range(self.rng, (min * length) as i32, (max * length) as i32) as f64
    }

    fn hill(&mut self, count: &str, height: &str, range_x: &str, range_y: &str) {
        let mut count = number_in_range(self.rng, count);
        while count > 0 {
            self.add_one_hill(height, range_x, range_y);
            count -= 1;
        }
    }

    fn add_one_hill(&mut self, height: &str, range_x: &str, range_y: &str) {
        let graph = self.graph;
        let n = graph.cells_len();
        let mut change = vec![0u8; n];
        let h = lim(number_in_range(self.rng, height) as f64) as u8;

        // reject seeds that would stack above 90
        let mut start;
        let mut tries = 0;
        loop {
            let x = self.point_in_range(range_x, graph.width);
            let y = self.point_in_range(range_y, graph.height);
            start = graph.find_grid_cell(x, y);
            tries += 1;
            if (self.heights[start] as u16 + h as u16) <= 90 || tries >= 50 {
                break;
            }
        }

        change[start] = h;
        let mut queue = VecDeque::from([start]);
        while let Some(q) = queue.pop_front() {
            for &c in &graph.cells.neighbors[q] {
                let c = c as usize;
                if change[c] != 0 {
                    continue;
                }
                let decayed =
                    (change[q] as f64).powf(self.blob_power) * rand_float(self.rng, 0.9, 1.1);
                change[c] = decayed.min(255.0) as u8;
                if change[c] > 1 {
                    queue.push_back(c);
                }
            }
        }

        for i in 0..n {
            self.heights[i] = lim(self.heights[i] as f64 + change[i] as f64) as u8;
        }
    }

    fn pit(&mut self, count: &str, height: &str, range_x: &str, range_y: &str) {
        let mut count = number_in_range(self.rng, count);
        while count > 0 {
            self.add_one_pit(height, range_x, range_y);
            count -= 1;
        }
    }

    fn add_one_pit(&mut self, height: &str, range_x: &str, range_y: &str) {
        let graph = self.graph;
        let mut used = vec![false; graph.cells_len()];
        let mut h = lim(number_in_range(self.rng, height) as f64);

        // prefer a land seed
        let mut start;
        let mut tries = 0;
        loop {
            let x = self.point_in_range(range_x, graph.width);
            let y = self.point_in_range(range_y, graph.height);
            start = graph.find_grid_cell(x, y);
            tries += 1;
            if self.heights[start] >= 20 || tries >= 50 {
                break;
            }
        }

        let mut queue = VecDeque::from([start]);
        while let Some(q) = queue.pop_front() {
            h = h.powf(self.blob_power) * rand_float(self.rng, 0.9, 1.1);
            if h < 1.0 {
                return;
            }
            for &c in &graph.cells.neighbors[q] {
                let c = c as usize;
                if used[c] {
                    continue;
                }
                self.heights[c] =
                    lim(self.heights[c] as f64 - h * rand_float(self.rng, 0.9, 1.1)) as u8;
                used[c] = true;
                queue.push_back(c);
            }
        }
    }

    fn range(&mut self, count: &str, height: &str, range_x: &str, range_y: &str) {
        let mut count = number_in_range(self.rng, count);
        while count > 0 {
            self.add_one_line(true, height, range_x, range_y);
            count -= 1;
        }
    }

    fn trough(&mut self, count: &str, height: &str, range_x: &str, range_y: &str) {
        let mut count = number_in_range(self.rng, count);
        while count > 0 {
            self.add_one_line(false, height, range_x, range_y);
            count -= 1;
        }
    }

    /// Shared ridge sculptor: `raise` adds a mountain range, otherwise the
    /// same walk carves a trough.
    fn add_one_line(&mut self, raise: bool, height: &str, range_x: &str, range_y: &str) {
        let graph = self.graph;
        let mut used = vec![false; graph.cells_len()];
        let mut h = lim(number_in_range(self.rng, height) as f64).trunc();

        // start point; troughs retry for a land seed
        let (start_x, start_y, start) = if raise {
            let x = self.point_in_range(range_x, graph.width);
            let y = self.point_in_range(range_y, graph.height);
            (x, y, graph.find_grid_cell(x, y))
        } else {
            let mut tries = 0;
            loop {
                let x = self.point_in_range(range_x, graph.width);
                let y = self.point_in_range(range_y, graph.height);
                let cell = graph.find_grid_cell(x, y);
                tries += 1;
                if self.heights[cell] >= 20 || tries >= 50 {
                    break (x, y, cell);
                }
            }
        };

        // end point at a plausible ridge length
        let max_dist = if raise {
            graph.width / 3.0
        } else {
            graph.width / 2.0
        };
        let mut end_x;
        let mut end_y;
        let mut tries = 0;
        loop {
            end_x = rand_float(self.rng, 0.0, 1.0) * graph.width * 0.8 + graph.width * 0.1;
            end_y = rand_float(self.rng, 0.0, 1.0) * graph.height * 0.7 + graph.height * 0.15;
            let dist = (end_y - start_y).abs() + (end_x - start_x).abs();
            tries += 1;
            if (dist >= graph.width / 8.0 && dist <= max_dist) || tries >= 50 {
                break;
            }
        }
        let end = graph.find_grid_cell(end_x, end_y);

        let halve_p = if raise { 0.15 } else { 0.2 };
        let ridge = self.get_ridge(start, end, &mut used, halve_p);

        // sculpt the ridge and a decaying halo around it
        let mut queue: Vec<usize> = ridge.clone();
        let mut waves = 0;
        while !queue.is_empty() {
            let frontier = std::mem::take(&mut queue);
            waves += 1;
            for &i in &frontier {
                let delta = h * rand_float(self.rng, 0.85, 1.15);
                let next = if raise {
                    self.heights[i] as f64 + delta
                } else {
                    self.heights[i] as f64 - delta
                };
                self.heights[i] = lim(next) as u8;
            }
            h = (h.powf(self.line_power) - 1.0).trunc();
            if h < 2.0 {
                break;
            }
            for &f in &frontier {
                for &c in &graph.cells.neighbors[f] {
                    let c = c as usize;
                    if !used[c] {
                        queue.push(c);
                        used[c] = true;
                    }
                }
            }
        }

        // prominences running downhill from every 6th ridge cell
        for (d, &ridge_cell) in ridge.iter().enumerate() {
            if d % 6 != 0 {
                continue;
            }
            let mut cur = ridge_cell;
            for _ in 0..waves {
                let Some(&min) = graph.cells.neighbors[cur]
                    .iter()
                    .min_by_key(|&&c| self.heights[c as usize])
                else {
                    break;
                };
                let min = min as usize;
                self.heights[min] =
                    ((self.heights[cur] as u16 * 2 + self.heights[min] as u16) / 3) as u8;
                cur = min;
            }
        }
    }

    /// Greedy walk toward `end` by squared distance, with random halving
    /// jitter so ridges wander. `used` cells are never revisited, which also
    /// bounds the walk.
    fn get_ridge(
        &mut self,
        start: usize,
        end: usize,
        used: &mut [bool],
        halve_p: f64,
    ) -> Vec<usize> {
        let graph = self.graph;
        let mut ridge = vec![start];
        used[start] = true;
        let mut cur = start;

        while cur != end {
            let mut min = f64::INFINITY;
            let mut next = cur;
            for &e in &graph.cells.neighbors[cur] {
                let e = e as usize;
                if used[e] {
                    continue;
                }
                let mut diff = (graph.points[end][0] - graph.points[e][0]).powi(2)
                    + (graph.points[end][1] - graph.points[e][1]).powi(2);
                if probability(self.rng, halve_p) {
                    diff /= 2.0;
                }
                if diff < min {
                    min = diff;
                    next = e;
                }
            }
            if min.is_infinite() {
                return ridge;
            }
            cur = next;
            ridge.push(cur);
            used[cur] = true;
        }
        ridge
    }

    fn strait(&mut self, width: &str, vertical: bool) {
        let graph = self.graph;
        let mut width = (number_in_range(self.rng, width) as f64).min(graph.cells_x as f64 / 3.0);
        if width < 1.0 && probability(self.rng, width) {
            return;
        }

        let mut used = vec![false; graph.cells_len()];
        let (w, hgt) = (graph.width, graph.height);
        let (start_x, start_y, end_x, end_y) = if vertical {
            let sx = (rand_float(self.rng, 0.0, 1.0) * w * 0.4 + w * 0.3).floor();
            let ex = ((w - sx) - w * 0.1 + rand_float(self.rng, 0.0, 1.0) * w * 0.2).floor();
            (sx, 5.0, ex, hgt - 5.0)
        } else {
            let sy = (rand_float(self.rng, 0.0, 1.0) * hgt * 0.4 + hgt * 0.3).floor();
            let ey = ((hgt - sy) - hgt * 0.1 + rand_float(self.rng, 0.0, 1.0) * hgt * 0.2).floor();
            (5.0, sy, w - 5.0, ey)
        };

        let start = graph.find_grid_cell(start_x, start_y);
        let end = graph.find_grid_cell(end_x, end_y);

        // unconstrained greedy walk; bail out if it fails to converge
        let mut range = Vec::new();
        let mut cur = start;
        while cur != end {
            if range.len() > graph.cells_len() {
                eprintln!("strait path failed to converge, carving partial corridor");
                break;
            }
            let mut min = f64::INFINITY;
            let mut next = cur;
            for &e in &graph.cells.neighbors[cur] {
                let e = e as usize;
                let mut diff = (graph.points[end][0] - graph.points[e][0]).powi(2)
                    + (graph.points[end][1] - graph.points[e][1]).powi(2);
                if probability(self.rng, 0.2) {
                    diff /= 2.0;
                }
                if diff < min {
                    min = diff;
                    next = e;
                }
            }
            cur = next;
            range.push(cur);
        }

        let step = 0.1 / width;
        let mut query = Vec::new();
        while width > 0.0 {
            let exp = 0.9 - step * width;
            for &r in &range {
                for &e in &graph.cells.neighbors[r] {
                    let e = e as usize;
                    if used[e] {
                        continue;
                    }
                    used[e] = true;
                    query.push(e);
                    self.heights[e] = (self.heights[e] as f64).powf(exp) as u8;
                }
            }
            range = query.clone();
            width -= 1.0;
        }
    }

    fn add(&mut self, range: &str, value: f64) {
        self.modify(range, value, 1.0, 0.0);
    }

    fn multiply(&mut self, range: &str, factor: f64) {
        self.modify(range, 0.0, factor, 0.0);
    }

    /// Band-limited arithmetic. When the band starts at sea level ("land"),
    /// multiply and power pivot around 20 so coastlines stay put.
    fn modify(&mut self, range: &str, add: f64, mult: f64, power: f64) {
        let (min, max) = match range {
            "land" => (20.0, 100.0),
            "all" => (0.0, 100.0),
            _ => {
                let (a, b) = range.split_once('-').unwrap_or((range, "100"));
                (a.parse().unwrap_or(0.0), b.parse().unwrap_or(100.0))
            }
        };
        let pivot = min == 20.0;

        for h in self.heights.iter_mut() {
            if (*h as f64) < min || (*h as f64) > max {
                continue;
            }
            let mut v = *h as f64;
            if add != 0.0 {
                v = if pivot { (v + add).max(20.0) } else { v + add };
            }
            if mult != 1.0 {
                v = if pivot {
                    ((v - 20.0) * mult + 20.0).trunc()
                } else {
                    (v * mult).trunc()
                };
            }
            if power != 0.0 {
                v = if pivot {
                    ((v - 20.0).powf(power) + 20.0).trunc()
                } else {
                    v.powf(power).trunc()
                };
            }
            *h = lim(v) as u8;
        }
    }

    fn smooth(&mut self, factor: f64) {
        let graph = self.graph;
        let smoothed: Vec<u8> = (0..graph.cells_len())
            .map(|i| {
                let mut sum = self.heights[i] as f64;
                let mut count = 1.0;
                for &c in &graph.cells.neighbors[i] {
                    sum += self.heights[c as usize] as f64;
                    count += 1.0;
                }
                let mean = sum / count;
                lim((self.heights[i] as f64 * (factor - 1.0) + mean) / factor).trunc() as u8
            })
            .collect();
        self.heights.copy_from_slice(&smoothed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn setup() -> (Graph, Vec<u8>, ChaCha8Rng) {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let graph = Graph::generate(&mut rng, 300.0, 150.0, 450.0).unwrap();
        let heights = vec![0u8; graph.cells_len()];
        (graph, heights, rng)
    }

    fn sculptor<'a>(
        graph: &'a Graph,
        heights: &'a mut [u8],
        rng: &'a mut ChaCha8Rng,
    ) -> Sculptor<'a> {
        Sculptor {
            graph,
            heights,
            rng,
            blob_power: BLOB_POWER[0],
            line_power: LINE_POWER[0],
        }
    }

    #[test]
    fn test_template_parsing() {
        assert_eq!("High Island".parse::<Template>().unwrap(), Template::HighIsland);
        assert_eq!("high_island".parse::<Template>().unwrap(), Template::HighIsland);
        assert_eq!("volcano".parse::<Template>().unwrap(), Template::Volcano);
        assert!("lemuria".parse::<Template>().is_err());
    }

    #[test]
    fn test_hill_spreads_and_peaks_at_seed() {
        let (graph, mut heights, mut rng) = setup();
        let mut s = sculptor(&graph, &mut heights, &mut rng);
        s.hill("1", "50", "40-60", "40-60");

        let max = *heights.iter().max().unwrap();
        assert_eq!(max, 50, "seed cell keeps the full hill height");
        let raised = heights.iter().filter(|&&h| h > 0).count();
        assert!(raised > 10, "hill should spread beyond the seed, got {}", raised);
    }

    #[test]
    fn test_pit_lowers_terrain() {
        let (graph, mut heights, mut rng) = setup();
        heights.fill(50);
        let mut s = sculptor(&graph, &mut heights, &mut rng);
        s.pit("1", "30", "40-60", "40-60");
        assert!(heights.iter().any(|&h| h < 50));
        assert!(heights.iter().all(|&h| h <= 50));
    }

    #[test]
    fn test_add_applies_everywhere() {
        let (graph, mut heights, mut rng) = setup();
        heights.fill(10);
        let mut s = sculptor(&graph, &mut heights, &mut rng);
        s.add("all", 15.0);
        assert!(heights.iter().all(|&h| h == 25));
    }

    #[test]
    fn test_multiply_land_pivots_at_sea_level() {
        let (graph, mut heights, mut rng) = setup();
        heights.fill(60);
        heights[0] = 10;
        let mut s = sculptor(&graph, &mut heights, &mut rng);
        s.multiply("land", 0.5);
        // (60 - 20) * 0.5 + 20 = 40; water cell untouched
        assert_eq!(heights[1], 40);
        assert_eq!(heights[0], 10);
    }

    #[test]
    fn test_smooth_contracts_extremes() {
        let (graph, mut heights, mut rng) = setup();
        for (i, h) in heights.iter_mut().enumerate() {
            *h = if i % 2 == 0 { 80 } else { 0 };
        }
        let mut s = sculptor(&graph, &mut heights, &mut rng);
        s.smooth(2.0);
        let max = *heights.iter().max().unwrap();
        let min = *heights.iter().min().unwrap();
        assert!(max - min < 80, "smoothing must reduce the spread");
    }

    #[test]
    fn test_volcano_template_creates_land_and_sea() {
        let (graph, mut heights, mut rng) = setup();
        generate(&graph, &mut heights, &mut rng, Template::Volcano, 1.0);
        assert!(heights.iter().any(|&h| h >= 20), "volcano must raise land");
        assert!(heights.iter().any(|&h| h < 20), "volcano keeps open water");
        assert!(heights.iter().all(|&h| h <= 100));
    }

    #[test]
    fn test_generation_is_deterministic() {
        let (graph, mut h1, _) = setup();
        let mut h2 = h1.clone();
        let mut rng1 = ChaCha8Rng::seed_from_u64(77);
        let mut rng2 = ChaCha8Rng::seed_from_u64(77);
        generate(&graph, &mut h1, &mut rng1, Template::Continents, 1.0);
        generate(&graph, &mut h2, &mut rng2, Template::Continents, 1.0);
        assert_eq!(h1, h2);
    }
}
