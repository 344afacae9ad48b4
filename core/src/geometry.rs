//! Rigid transform helpers
//!
//! All transforms are homogeneous 4×4 matrices in millimetres. Only rigid
//! motions (rotation + translation) are produced by this workspace, so the
//! helpers here read the upper-left 3×3 block as a rotation.

use nalgebra::{Matrix3, Matrix4, Point3, Vector3};

/// Build a homogeneous transform from a rotation and a translation.
pub fn rigid_transform(rotation: &Matrix3<f64>, translation: &Vector3<f64>) -> Matrix4<f64> {
    let mut m = Matrix4::identity();
    m.fixed_view_mut::<3, 3>(0, 0).copy_from(rotation);
    m.fixed_view_mut::<3, 1>(0, 3).copy_from(translation);
    m
}

/// Pure translation
pub fn translation_matrix(translation: &Vector3<f64>) -> Matrix4<f64> {
    rigid_transform(&Matrix3::identity(), translation)
}

pub fn rotation_part(transform: &Matrix4<f64>) -> Matrix3<f64> {
    Matrix3::from(transform.fixed_view::<3, 3>(0, 0))
}

pub fn translation_part(transform: &Matrix4<f64>) -> Vector3<f64> {
    Vector3::from(transform.fixed_view::<3, 1>(0, 3))
}

/// Apply a transform to a position.
pub fn transform_point(transform: &Matrix4<f64>, point: &Point3<f64>) -> Point3<f64> {
    Point3::from(rotation_part(transform) * point.coords + translation_part(transform))
}

/// Apply only the rotation of a transform to a direction vector.
pub fn transform_vector(transform: &Matrix4<f64>, vector: &Vector3<f64>) -> Vector3<f64> {
    rotation_part(transform) * vector
}

/// Inverse of a rigid transform (transpose rotation, counter-rotate translation).
pub fn rigid_inverse(transform: &Matrix4<f64>) -> Matrix4<f64> {
    let r_inv = rotation_part(transform).transpose();
    let t_inv = -(r_inv * translation_part(transform));
    rigid_transform(&r_inv, &t_inv)
}

/// True when no entry is NaN or infinite.
pub fn is_finite_transform(transform: &Matrix4<f64>) -> bool {
    transform.iter().all(|v| v.is_finite())
}

/// Sum of absolute translation components, the ICP convergence signal.
pub fn translation_l1(transform: &Matrix4<f64>) -> f64 {
    translation_part(transform).abs().sum()
}

/// Rotation angle (radians) of the rotation block, from its trace.
pub fn rotation_angle(transform: &Matrix4<f64>) -> f64 {
    let cos = ((rotation_part(transform).trace() - 1.0) / 2.0).clamp(-1.0, 1.0);
    cos.acos()
}

/// Rotation of `angle` radians about `axis`, expressed as a 4×4 transform
/// that keeps `center` fixed.
pub fn rotation_about(axis: &Vector3<f64>, angle: f64, center: &Point3<f64>) -> Matrix4<f64> {
    let rotation = nalgebra::Rotation3::from_axis_angle(&nalgebra::Unit::new_normalize(*axis), angle);
    let r = *rotation.matrix();
    let t = center.coords - r * center.coords;
    rigid_transform(&r, &t)
}
