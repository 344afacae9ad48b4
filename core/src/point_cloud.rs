use nalgebra::{Matrix4, Point3, Vector3};

use crate::geometry::{transform_point, transform_vector};

/// Positions with a direction attached to each of them.
///
/// This is the flattened form of both sides of a registration: a branch tree
/// contributes its centerline positions and tangents, a tracking session
/// contributes instrument tip positions and forward axes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrientedPoints {
    pub positions: Vec<Point3<f64>>,
    pub orientations: Vec<Vector3<f64>>,
}

impl OrientedPoints {
    pub fn new(positions: Vec<Point3<f64>>, orientations: Vec<Vector3<f64>>) -> crate::Result<Self> {
        if positions.len() != orientations.len() {
            return Err(crate::Error::InvalidInput(format!(
                "Orientation count {} does not match position count {}",
                orientations.len(),
                positions.len()
            )));
        }
        Ok(Self {
            positions,
            orientations,
        })
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            positions: Vec::with_capacity(capacity),
            orientations: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, position: Point3<f64>, orientation: Vector3<f64>) {
        self.positions.push(position);
        self.orientations.push(orientation);
    }

    pub fn extend_from(&mut self, positions: &[Point3<f64>], orientations: &[Vector3<f64>]) {
        self.positions.extend_from_slice(positions);
        self.orientations.extend_from_slice(orientations);
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Drop every entry whose position or orientation is unusable.
    ///
    /// Returns the number of removed entries.
    pub fn retain_valid(&mut self) -> usize {
        let before = self.len();
        let (positions, orientations): (Vec<_>, Vec<_>) = self
            .positions
            .iter()
            .zip(self.orientations.iter())
            .filter(|(p, o)| is_valid_vector(&p.coords) && is_valid_vector(o))
            .map(|(p, o)| (*p, *o))
            .unzip();
        self.positions = positions;
        self.orientations = orientations;
        before - self.len()
    }

    /// Apply a rigid transform in place: positions as points, orientations
    /// through the rotation only.
    pub fn transform(&mut self, transform: &Matrix4<f64>) {
        for p in self.positions.iter_mut() {
            *p = transform_point(transform, p);
        }
        for o in self.orientations.iter_mut() {
            *o = transform_vector(transform, o);
        }
    }

    pub fn transformed(&self, transform: &Matrix4<f64>) -> Self {
        let mut out = self.clone();
        out.transform(transform);
        out
    }
}

/// A vector is valid when every component is finite and it is not exactly
/// zero. The zero vector marks an invalid capture.
pub fn is_valid_vector(v: &Vector3<f64>) -> bool {
    v.iter().all(|c| c.is_finite()) && !(v.x == 0.0 && v.y == 0.0 && v.z == 0.0)
}
