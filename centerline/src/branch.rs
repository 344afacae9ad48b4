use nalgebra::{Point3, Vector3};

use crate::orientation::{compute_orientations, smooth_orientations};

/// Arena id of a branch inside a [`crate::BranchList`].
///
/// Ids of deleted branches never resolve to a different branch later.
pub type BranchId = generational_arena::Index;

/// Expected lumen radius (mm) for a branch generation, root = 1.
pub fn radius_for_generation(generation: usize) -> f64 {
    const RADII: [f64; 5] = [6.0, 4.0, 3.0, 2.5, 2.0];
    match generation {
        0 | 1 => RADII[0],
        g if g <= RADII.len() => RADII[g - 1],
        _ => 2.0,
    }
}

/// One tubular segment of the centerline tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Branch {
    positions: Vec<Point3<f64>>,
    orientations: Vec<Vector3<f64>>,
    pub(crate) parent: Option<BranchId>,
    pub(crate) children: Vec<BranchId>,
}

impl Branch {
    /// New unattached branch; tangents are computed from the positions.
    pub fn new(positions: Vec<Point3<f64>>) -> Self {
        let orientations = compute_orientations(&positions);
        Self {
            positions,
            orientations,
            parent: None,
            children: Vec::new(),
        }
    }

    /// Branch with externally supplied orientations.
    pub fn from_parts(
        positions: Vec<Point3<f64>>,
        orientations: Vec<Vector3<f64>>,
    ) -> airnav_core::Result<Self> {
        if positions.len() != orientations.len() {
            return Err(airnav_core::Error::InvalidInput(format!(
                "Orientation count {} does not match position count {}",
                orientations.len(),
                positions.len()
            )));
        }
        Ok(Self {
            positions,
            orientations,
            parent: None,
            children: Vec::new(),
        })
    }

    pub fn positions(&self) -> &[Point3<f64>] {
        &self.positions
    }

    pub fn orientations(&self) -> &[Vector3<f64>] {
        &self.orientations
    }

    pub fn parent(&self) -> Option<BranchId> {
        self.parent
    }

    pub fn children(&self) -> &[BranchId] {
        &self.children
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn arc_length(&self) -> f64 {
        self.positions
            .windows(2)
            .map(|w| (w[1] - w[0]).norm())
            .sum()
    }

    /// Index of the position nearest to `point` (first one on ties).
    pub fn nearest_index(&self, point: &Point3<f64>) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (i, p) in self.positions.iter().enumerate() {
            let d = (p - point).norm_squared();
            if best.map_or(true, |(_, bd)| d < bd) {
                best = Some((i, d));
            }
        }
        best.map(|(i, _)| i)
    }

    /// Recompute tangents by forward differences.
    pub fn compute_orientations(&mut self) {
        self.orientations = compute_orientations(&self.positions);
    }

    /// Replace every tangent by its windowed mean.
    pub fn smooth_orientations(&mut self) {
        self.orientations = smooth_orientations(&self.orientations);
    }

    /// Wholesale position replacement; tangents follow the new positions.
    pub(crate) fn replace_positions(&mut self, positions: Vec<Point3<f64>>) {
        self.positions = positions;
        self.compute_orientations();
    }

    /// Keep the entries for which `keep` holds, orientations untouched.
    pub(crate) fn retain_positions<F>(&mut self, mut keep: F)
    where
        F: FnMut(&Point3<f64>) -> bool,
    {
        let (positions, orientations): (Vec<_>, Vec<_>) = self
            .positions
            .iter()
            .zip(self.orientations.iter())
            .filter(|(p, _)| keep(p))
            .map(|(p, o)| (*p, *o))
            .unzip();
        self.positions = positions;
        self.orientations = orientations;
    }

    /// Cut off `positions[at..]` into a new unattached branch.
    pub(crate) fn split_off(&mut self, at: usize) -> Branch {
        let tail = Branch::new(self.positions.split_off(at));
        self.orientations.truncate(at);
        self.compute_orientations();
        tail
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(n: usize) -> Vec<Point3<f64>> {
        (0..n).map(|i| Point3::new(0.0, 0.0, 50.0 - i as f64)).collect()
    }

    #[test]
    fn test_radius_table() {
        assert_eq!(radius_for_generation(1), 6.0);
        assert_eq!(radius_for_generation(2), 4.0);
        assert_eq!(radius_for_generation(3), 3.0);
        assert_eq!(radius_for_generation(4), 2.5);
        assert_eq!(radius_for_generation(5), 2.0);
        assert_eq!(radius_for_generation(6), 2.0);
        assert_eq!(radius_for_generation(23), 2.0);
    }

    #[test]
    fn test_new_branch_has_parallel_unit_orientations() {
        let branch = Branch::new(line(8));
        assert_eq!(branch.orientations().len(), 8);
        for o in branch.orientations() {
            assert!((o - Vector3::new(0.0, 0.0, -1.0)).norm() < 1e-12);
        }
        assert!((branch.arc_length() - 7.0).abs() < 1e-12);
    }

    #[test]
    fn test_split_off_keeps_both_parts_consistent() {
        let mut head = Branch::new(line(12));
        let tail = head.split_off(7);
        assert_eq!(head.len(), 7);
        assert_eq!(head.orientations().len(), 7);
        assert_eq!(tail.len(), 5);
        assert_eq!(tail.positions()[0], Point3::new(0.0, 0.0, 43.0));
    }

    #[test]
    fn test_from_parts_rejects_length_mismatch() {
        assert!(Branch::from_parts(line(3), vec![Vector3::z(); 2]).is_err());
    }

    #[test]
    fn test_nearest_index_prefers_first_on_ties() {
        let branch = Branch::new(vec![
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(-1.0, 0.0, 0.0),
            Point3::new(5.0, 0.0, 0.0),
        ]);
        assert_eq!(branch.nearest_index(&Point3::origin()), Some(0));
        assert_eq!(Branch::new(vec![]).nearest_index(&Point3::origin()), None);
    }
}
