//! Closed-form rigid alignment of paired point sets (Kabsch / Umeyama
//! without scale).

use airnav_core::geometry::rigid_transform;
use nalgebra::{Matrix3, Matrix4, Point3};

/// Rigid transform minimising `Σ |T·source[i] - target[i]|²`.
///
/// Returns `None` for fewer than three pairs, mismatched inputs or a failed
/// decomposition. The rotation is reflection-corrected (determinant +1).
pub fn solve_absolute_orientation(source: &[Point3<f64>], target: &[Point3<f64>]) -> Option<Matrix4<f64>> {
    if source.len() < 3 || source.len() != target.len() {
        return None;
    }
    let n = source.len() as f64;

    let source_centroid = source.iter().fold(Point3::origin(), |acc, p| acc + p.coords) / n;
    let target_centroid = target.iter().fold(Point3::origin(), |acc, p| acc + p.coords) / n;

    let mut covariance = Matrix3::<f64>::zeros();
    for (s, t) in source.iter().zip(target) {
        let src = s - source_centroid;
        let tgt = t - target_centroid;
        covariance += tgt * src.transpose();
    }

    let svd = covariance.svd(true, true);
    let u = svd.u?;
    let vt = svd.v_t?;

    let mut rotation = u * vt;
    if rotation.determinant() < 0.0 {
        let mut u_corrected = u;
        u_corrected.set_column(2, &(u.column(2) * -1.0));
        rotation = u_corrected * vt;
    }

    let translation = target_centroid.coords - rotation * source_centroid.coords;
    Some(rigid_transform(&rotation, &translation))
}
