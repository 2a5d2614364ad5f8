//! Small statistics helpers: the normal reference shape, Pearson
//! correlation and sample variance.

use crate::types::{Tier, TIER_COUNT, TIER_MIN};

/// Normal probability density at `x`.
pub fn normal_pdf(x: f64, mean: f64, std_dev: f64) -> f64 {
    let z = (x - mean) / std_dev;
    (-0.5 * z * z).exp() / (std_dev * (2.0 * std::f64::consts::PI).sqrt())
}

/// Ideal histogram over tiers 1..=30; index 0 is tier 1.
pub fn reference_shape(mean: f64, std_dev: f64) -> [f64; TIER_COUNT] {
    let mut shape = [0.0; TIER_COUNT];
    for (i, slot) in shape.iter_mut().enumerate() {
        *slot = normal_pdf((i + TIER_MIN as usize) as f64, mean, std_dev);
    }
    shape
}

/// Density weight for a single tier.
pub fn tier_weight(tier: Tier, mean: f64, std_dev: f64) -> f64 {
    normal_pdf(tier as f64, mean, std_dev)
}

/// Pearson correlation. 0 when either side has no spread.
pub fn pearson(xs: &[f64], ys: &[f64]) -> f64 {
    let n = xs.len().min(ys.len());
    if n == 0 {
        return 0.0;
    }
    let mean_x = xs[..n].iter().sum::<f64>() / n as f64;
    let mean_y = ys[..n].iter().sum::<f64>() / n as f64;

    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (x, y) in xs[..n].iter().zip(&ys[..n]) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    if var_x <= 0.0 || var_y <= 0.0 {
        return 0.0;
    }
    cov / (var_x.sqrt() * var_y.sqrt())
}

/// Sample variance (n − 1 denominator). `None` below two values.
pub fn sample_variance(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let squares: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
    Some(squares / (values.len() - 1) as f64)
}
