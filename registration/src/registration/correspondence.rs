//! Combined position/orientation correspondence search
//!
//! A sample is matched to the model point minimising `D = P + α·O`, with `P`
//! the Euclidean position distance and `O` the distance between the two
//! orientations after each component of their difference is wrapped by a
//! truncated remainder of 2 (so opposite axis directions compare as close).
//! `α` is recomputed per sample as `sqrt(mean(P/O))` over every model point.

use airnav_core::{OrientedPoints, PointIndex};
use nalgebra::Vector3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Correspondence {
    pub sample: usize,
    pub model: usize,
    /// Wrapped orientation distance of the pair
    pub orientation_deviation: f64,
}

/// Orientation distance with every difference component wrapped mod 2.
pub fn wrapped_orientation_distance(a: &Vector3<f64>, b: &Vector3<f64>) -> f64 {
    (a - b).map(|c| c % 2.0).norm()
}

/// Per-sample weight of the orientation term.
///
/// Candidates whose `P/O` ratio is undefined enter the mean with `O` set to
/// `fallback`. Returns 0 when the mean is not a number.
pub fn orientation_weight(
    position: &nalgebra::Point3<f64>,
    orientation: &Vector3<f64>,
    model: &OrientedPoints,
    fallback: f64,
) -> f64 {
    if model.is_empty() {
        return 0.0;
    }
    let mut sum = 0.0;
    for (p, o) in model.positions.iter().zip(&model.orientations) {
        let pos = (p - position).norm();
        let ori = wrapped_orientation_distance(orientation, o);
        let ratio = pos / ori;
        sum += if ratio.is_finite() { ratio } else { pos / fallback };
    }
    let alpha = (sum / model.len() as f64).sqrt();
    if alpha.is_nan() {
        0.0
    } else {
        alpha
    }
}

/// Best model match for every sample.
///
/// `index` must be built over `model.positions`. Candidates are visited in
/// increasing position distance and the walk stops once `P` alone exceeds
/// the best combined distance. Ties go to the lower model index.
pub fn find_correspondences(
    samples: &OrientedPoints,
    model: &OrientedPoints,
    index: &PointIndex,
    fallback: f64,
) -> Vec<Correspondence> {
    let mut pairs = Vec::with_capacity(samples.len());
    for (i, (position, orientation)) in samples.positions.iter().zip(&samples.orientations).enumerate() {
        let alpha = orientation_weight(position, orientation, model, fallback);

        let mut best: Option<(usize, f64, f64)> = None;
        for (j, pos) in index.nearest_iter(position) {
            if let Some((_, best_d, _)) = best {
                if pos > best_d {
                    break;
                }
            }
            let mut ori = wrapped_orientation_distance(orientation, &model.orientations[j]);
            if !ori.is_finite() {
                ori = fallback;
            }
            let d = pos + alpha * ori;
            let better = match best {
                None => true,
                Some((best_j, best_d, _)) => d < best_d || (d == best_d && j < best_j),
            };
            if better {
                best = Some((j, d, ori));
            }
        }

        if let Some((j, _, ori)) = best {
            pairs.push(Correspondence {
                sample: i,
                model: j,
                orientation_deviation: ori,
            });
        }
    }
    pairs
}

/// Keep the `floor(n · fraction)` pairs with the smallest orientation
/// deviation.
pub fn retain_inliers(pairs: &mut Vec<Correspondence>, fraction: f64) {
    let keep = (pairs.len() as f64 * fraction).floor() as usize;
    pairs.sort_by(|a, b| a.orientation_deviation.total_cmp(&b.orientation_deviation));
    pairs.truncate(keep);
}
