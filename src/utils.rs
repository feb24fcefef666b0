//! Shared numeric and randomness helpers
//!
//! Thin wrappers over `rand` used throughout the pipeline: inclusive integer
//! ranges, probability rolls, "n-m" range strings from templates, gaussian
//! samples and a few small geometry utilities.

use rand::Rng;
use rand_chacha::ChaCha8Rng;

/// Round to `digits` decimal places.
pub fn rn(value: f64, digits: u32) -> f64 {
    let m = 10f64.powi(digits as i32);
    (value * m).round() / m
}

/// Clamp a height value into the working 0..=100 range.
pub fn lim(value: f64) -> f64 {
    value.clamp(0.0, 100.0)
}

/// Inclusive integer range, matching dice-style `rand(min, max)` semantics.
pub fn rand_range(rng: &mut ChaCha8Rng, min: i32, max: i32) -> i32 {
    if min >= max {
        return min;
    }
    rng.gen_range(min..=max)
}

/// Uniform float in `[min, max)`.
pub fn rand_float(rng: &mut ChaCha8Rng, min: f64, max: f64) -> f64 {
    if min >= max {
        return min;
    }
    rng.gen_range(min..max)
}

/// Probability roll. Values >= 1 always pass, <= 0 never do.
pub fn probability(rng: &mut ChaCha8Rng, p: f64) -> bool {
    if p >= 1.0 {
        return true;
    }
    if p <= 0.0 {
        return false;
    }
    rng.gen::<f64>() < p
}

/// Resolve a template count string to an integer.
///
/// Accepts plain numbers (`"5"`), fractional numbers where the fraction is a
/// probability of one extra (`"1.5"` gives 1 or 2), and ranges (`"2-7"`,
/// `"-1-3"` where the leading minus signs the lower bound).
pub fn number_in_range(rng: &mut ChaCha8Rng, raw: &str) -> i32 {
    if let Ok(v) = raw.parse::<f64>() {
        let whole = v.trunc() as i32;
        let frac = v - v.trunc();
        return whole + probability(rng, frac.abs()) as i32;
    }

    let sign = if raw.starts_with('-') { -1 } else { 1 };
    let body = raw.strip_prefix('-').unwrap_or(raw);
    if let Some((lo, hi)) = body.split_once('-') {
        let lo: f64 = lo.parse().unwrap_or(0.0);
        let hi: f64 = hi.parse().unwrap_or(0.0);
        return rand_range(rng, (lo * sign as f64) as i32, hi as i32);
    }
    0
}

/// Gaussian sample (Box-Muller), clamped and rounded.
pub fn gauss(
    rng: &mut ChaCha8Rng,
    expected: f64,
    deviation: f64,
    min: f64,
    max: f64,
    digits: u32,
) -> f64 {
    let u1: f64 = rng.gen::<f64>().max(f64::MIN_POSITIVE);
    let u2: f64 = rng.gen();
    let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
    rn((expected + z * deviation).clamp(min, max), digits)
}

/// Weighted random pick from `(item, weight)` pairs.
pub fn weighted_choice<'a, T>(rng: &mut ChaCha8Rng, table: &'a [(T, u32)]) -> &'a T {
    let total: u32 = table.iter().map(|(_, w)| w).sum();
    let mut roll = rng.gen_range(0..total.max(1));
    for (item, weight) in table {
        if roll < *weight {
            return item;
        }
        roll -= weight;
    }
    &table[table.len() - 1].0
}

/// Normalize `value` into [0, 1] against an expected min and max.
pub fn normalize(value: f64, min: f64, max: f64) -> f64 {
    ((value - min) / (max - min)).clamp(0.0, 1.0)
}

/// Shoelace polygon area (signed; callers take the absolute value).
pub fn polygon_area(points: &[[f64; 2]]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..points.len() {
        let [x1, y1] = points[i];
        let [x2, y2] = points[(i + 1) % points.len()];
        sum += x1 * y2 - x2 * y1;
    }
    sum / 2.0
}

/// Symmetric polynomial ease-in-out with configurable exponent.
pub fn ease_poly_in_out(t: f64, exponent: f64) -> f64 {
    let t = t.clamp(0.0, 1.0) * 2.0;
    if t <= 1.0 {
        t.powf(exponent) / 2.0
    } else {
        (2.0 - (2.0 - t).powf(exponent)) / 2.0
    }
}
