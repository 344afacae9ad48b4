//! Branch tangent estimation

use nalgebra::{Point3, Vector3};

/// Half width of the orientation smoothing window.
const WINDOW_HALF_WIDTH: usize = 2;

fn normalize_or_keep(v: Vector3<f64>) -> Vector3<f64> {
    let norm = v.norm();
    if norm > 0.0 {
        v / norm
    } else {
        v
    }
}

/// Normalised forward differences; the last tangent repeats the previous one.
///
/// Coincident consecutive positions produce a zero tangent.
pub fn compute_orientations(positions: &[Point3<f64>]) -> Vec<Vector3<f64>> {
    let n = positions.len();
    match n {
        0 => Vec::new(),
        1 => vec![Vector3::zeros()],
        _ => {
            let mut out: Vec<Vector3<f64>> = positions
                .windows(2)
                .map(|w| normalize_or_keep(w[1] - w[0]))
                .collect();
            out.push(out[n - 2]);
            out
        }
    }
}

/// Mean of the tangents in `[i - 2, i + 2]` (clamped), renormalised.
///
/// A mean of zero length is returned as is.
pub fn smooth_orientations(orientations: &[Vector3<f64>]) -> Vec<Vector3<f64>> {
    let n = orientations.len();
    (0..n)
        .map(|i| {
            let lo = i.saturating_sub(WINDOW_HALF_WIDTH);
            let hi = (i + WINDOW_HALF_WIDTH).min(n - 1);
            let window = &orientations[lo..=hi];
            let sum = window.iter().fold(Vector3::zeros(), |acc, o| acc + o);
            normalize_or_keep(sum / window.len() as f64)
        })
        .collect()
}
