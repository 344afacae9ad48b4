//! Spline smoothing of branch positions
//!
//! Two strategies share the same spline (parameter = point index):
//! fixed control-point spacing along the arc, and lumen-constrained
//! refinement, which starts from two control points and inserts more where
//! the curve leaves the expected airway radius. In both, the first control
//! point of a child branch is pinned to its parent's junction point so
//! smoothed children stay connected.

use airnav_core::{Error, Result};
use nalgebra::Point3;
use tracing::{debug, instrument, trace};

use crate::branch::BranchId;
use crate::branch_list::BranchList;
use crate::spline::CubicSpline3;

/// Fixed-spacing spline through `positions`, evaluated at every index.
///
/// `anchor` replaces the value of the first control point.
pub fn smooth_positions_fixed(
    positions: &[Point3<f64>],
    control_point_spacing: f64,
    anchor: Option<Point3<f64>>,
) -> Vec<Point3<f64>> {
    let n = positions.len();
    if n < 2 {
        return positions.to_vec();
    }
    let arc_length: f64 = positions.windows(2).map(|w| (w[1] - w[0]).norm()).sum();
    let count = if control_point_spacing > 0.0 && arc_length.is_finite() {
        ((arc_length / control_point_spacing).ceil() as usize).max(2)
    } else {
        2
    };

    let mut controls: Vec<usize> = (0..count).map(|j| (j * n) / count).collect();
    controls.push(n - 1);
    controls.sort_unstable();
    controls.dedup();

    match fit(positions, &controls, anchor) {
        Some(spline) => (0..n).map(|i| spline.evaluate(i as f64)).collect(),
        None => positions.to_vec(),
    }
}

/// Lumen-constrained spline over `positions[..=start_index]`.
///
/// Control points are added at the index of largest deviation from the
/// original polyline until every sample lies within `tolerance` of it or
/// every index is a control point. Later indices are copied unchanged.
pub fn smooth_positions_lumen(
    positions: &[Point3<f64>],
    start_index: usize,
    tolerance: f64,
    anchor: Option<Point3<f64>>,
) -> Vec<Point3<f64>> {
    let n = positions.len();
    if n < 2 {
        return positions.to_vec();
    }
    let end = start_index.min(n - 1);
    if end == 0 {
        return positions.to_vec();
    }

    let mut controls = vec![0, end];
    let mut smoothed = positions.to_vec();
    loop {
        let spline = match fit(positions, &controls, anchor) {
            Some(spline) => spline,
            None => return positions.to_vec(),
        };
        for (i, p) in smoothed.iter_mut().enumerate().take(end + 1) {
            *p = spline.evaluate(i as f64);
        }
        if controls.len() >= end + 1 {
            break;
        }

        let mut worst: Option<(usize, f64)> = None;
        for i in 0..=end {
            if controls.binary_search(&i).is_ok() {
                continue;
            }
            let d = distance_to_polyline(&smoothed[i], positions);
            if worst.map_or(true, |(_, wd)| d > wd) {
                worst = Some((i, d));
            }
        }
        match worst {
            Some((i, d)) if d > tolerance => {
                trace!(index = i, deviation = d, "Adding control point");
                if let Err(pos) = controls.binary_search(&i) {
                    controls.insert(pos, i);
                }
            }
            _ => break,
        }
    }
    smoothed
}

fn fit(positions: &[Point3<f64>], controls: &[usize], anchor: Option<Point3<f64>>) -> Option<CubicSpline3> {
    let knots: Vec<(f64, Point3<f64>)> = controls
        .iter()
        .map(|&i| {
            let value = match (i, anchor) {
                (0, Some(a)) => a,
                _ => positions[i],
            };
            (i as f64, value)
        })
        .collect();
    CubicSpline3::new(&knots)
}

/// Shortest distance from `point` to the polyline through `vertices`.
pub fn distance_to_polyline(point: &Point3<f64>, vertices: &[Point3<f64>]) -> f64 {
    match vertices {
        [] => f64::INFINITY,
        [only] => (point - only).norm(),
        _ => vertices
            .windows(2)
            .map(|w| distance_to_segment(point, &w[0], &w[1]))
            .fold(f64::INFINITY, f64::min),
    }
}

fn distance_to_segment(point: &Point3<f64>, a: &Point3<f64>, b: &Point3<f64>) -> f64 {
    let ab = b - a;
    let len2 = ab.norm_squared();
    if len2 == 0.0 {
        return (point - a).norm();
    }
    let t = ((point - a).dot(&ab) / len2).clamp(0.0, 1.0);
    (point - (a + ab * t)).norm()
}

impl BranchList {
    /// Parent point nearest to the first position of `id`.
    pub fn junction_point(&self, id: BranchId) -> Option<Point3<f64>> {
        let first = *self.get(id)?.positions().first()?;
        let parent = self.get(self.parent(id)?)?;
        parent.nearest_index(&first).map(|i| parent.positions()[i])
    }

    /// Fixed-spacing spline smoothing of every branch, parents first.
    #[instrument(level = "debug", skip(self), fields(branches = self.len()))]
    pub fn smooth_branch_positions(&mut self, control_point_spacing: f64) {
        for id in self.preorder() {
            let anchor = self.junction_point(id);
            if let Some(branch) = self.get(id) {
                let smoothed = smooth_positions_fixed(branch.positions(), control_point_spacing, anchor);
                self.replace_positions_unchecked(id, smoothed);
            }
        }
    }

    /// Lumen-constrained smoothing of `positions[..=start_index]` of one
    /// branch, with the tolerance taken from its generation radius.
    pub fn smooth_branch(&mut self, id: BranchId, start_index: usize) -> Result<()> {
        let branch = self
            .get(id)
            .ok_or_else(|| Error::InvalidInput(format!("Unknown branch {id:?}")))?;
        if start_index >= branch.len() {
            return Err(Error::InvalidInput(format!(
                "Start index {start_index} outside branch of length {}",
                branch.len()
            )));
        }
        let tolerance = self.radius(id).unwrap_or_else(|| crate::radius_for_generation(1));
        let anchor = self.junction_point(id).or_else(|| branch.positions().first().copied());
        let smoothed = smooth_positions_lumen(branch.positions(), start_index, tolerance, anchor);
        self.replace_positions_unchecked(id, smoothed);
        Ok(())
    }

    /// Lumen-constrained smoothing of every branch over its full length,
    /// parents first.
    #[instrument(level = "debug", skip(self), fields(branches = self.len()))]
    pub fn smooth_lumen_constrained(&mut self) {
        for id in self.preorder() {
            let last = match self.get(id) {
                Some(branch) if !branch.is_empty() => branch.len() - 1,
                _ => continue,
            };
            if let Err(err) = self.smooth_branch(id, last) {
                debug!(%err, "Skipping branch during lumen-constrained smoothing");
            }
        }
    }
}
