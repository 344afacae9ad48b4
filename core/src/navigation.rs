//! Tracked instrument samples
//!
//! The tracking subsystem delivers time-ordered 4×4 poses. Registration only
//! needs the tip position and the forward axis of each pose, so the stream is
//! reduced to [`NavigationSample`]s once at the boundary.

use nalgebra::{Matrix4, Point3, Vector3};

use crate::geometry::{rotation_part, translation_part};
use crate::point_cloud::{is_valid_vector, OrientedPoints};

/// One timestamped instrument pose.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NavigationSample {
    pub timestamp: f64,
    pub position: Point3<f64>,
    /// Forward axis of the instrument (z axis of the pose)
    pub orientation: Vector3<f64>,
}

impl NavigationSample {
    pub fn new(timestamp: f64, position: Point3<f64>, orientation: Vector3<f64>) -> Self {
        Self {
            timestamp,
            position,
            orientation,
        }
    }

    pub fn from_pose(timestamp: f64, pose: &Matrix4<f64>) -> Self {
        let forward = rotation_part(pose).column(2).into_owned();
        Self {
            timestamp,
            position: Point3::from(translation_part(pose)),
            orientation: forward,
        }
    }

    pub fn is_valid(&self) -> bool {
        is_valid_vector(&self.position.coords) && is_valid_vector(&self.orientation)
    }
}

/// Convert a time-ordered pose stream into navigation samples.
pub fn samples_from_poses(poses: &[(f64, Matrix4<f64>)]) -> Vec<NavigationSample> {
    poses
        .iter()
        .map(|(timestamp, pose)| NavigationSample::from_pose(*timestamp, pose))
        .collect()
}

/// Keep the first valid sample and then only valid samples farther than
/// `min_distance` from the last kept one.
///
/// A sample is valid when both its position and its orientation pass
/// [`is_valid_vector`]. Invalid samples are dropped here so that a single
/// corrupt capture can never become the reference every later distance is
/// measured against.
pub fn thin_by_distance(samples: &[NavigationSample], min_distance: f64) -> Vec<NavigationSample> {
    let mut kept: Vec<NavigationSample> = Vec::with_capacity(samples.len());
    for sample in samples.iter().filter(|s| s.is_valid()) {
        match kept.last() {
            None => kept.push(*sample),
            Some(last) => {
                if (sample.position - last.position).norm() > min_distance {
                    kept.push(*sample);
                }
            }
        }
    }
    kept
}

pub fn to_oriented_points(samples: &[NavigationSample]) -> OrientedPoints {
    let mut out = OrientedPoints::with_capacity(samples.len());
    for s in samples {
        out.push(s.position, s.orientation);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{rigid_transform, rotation_about};

    #[test]
    fn test_from_pose_uses_translation_and_z_axis() {
        let pose = rotation_about(&Vector3::x(), std::f64::consts::FRAC_PI_2, &Point3::origin());
        let pose = rigid_transform(&rotation_part(&pose), &Vector3::new(3.0, 4.0, 5.0));
        let sample = NavigationSample::from_pose(1.5, &pose);

        assert_eq!(sample.timestamp, 1.5);
        assert!((sample.position - Point3::new(3.0, 4.0, 5.0)).norm() < 1e-12);
        // z rotated 90° about x points along -y
        assert!((sample.orientation - Vector3::new(0.0, -1.0, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn test_thinning_is_relative_to_last_kept_sample() {
        let samples: Vec<_> = (0..10)
            .map(|i| NavigationSample::new(i as f64, Point3::new(i as f64 * 0.4, 0.0, 1.0), Vector3::x()))
            .collect();

        let kept = thin_by_distance(&samples, 1.0);
        // 0.0, 1.2, 2.4, 3.6 -> steps of three samples
        let xs: Vec<f64> = kept.iter().map(|s| s.position.x).collect();
        assert_eq!(xs.len(), 4);
        assert!((xs[1] - 1.2).abs() < 1e-9);
        assert!((xs[3] - 3.6).abs() < 1e-9);
    }

    #[test]
    fn test_thinning_keeps_single_and_empty_inputs() {
        assert!(thin_by_distance(&[], 1.0).is_empty());
        let one = [NavigationSample::new(0.0, Point3::new(1.0, 1.0, 1.0), Vector3::z())];
        assert_eq!(thin_by_distance(&one, 1.0).len(), 1);
    }

    #[test]
    fn test_thinning_skips_invalid_reference_samples() {
        let mut samples: Vec<_> = (0..10)
            .map(|i| NavigationSample::new(i as f64, Point3::new(i as f64 * 0.4, 0.0, 1.0), Vector3::x()))
            .collect();
        let clean = thin_by_distance(&samples, 1.0);

        samples[0].position.x = f64::NAN;
        samples[3].position.y = f64::INFINITY;
        samples[5].orientation = Vector3::zeros();
        let kept = thin_by_distance(&samples, 1.0);

        assert!(kept.iter().all(NavigationSample::is_valid));
        // the NaN head is skipped, so distances are measured from 0.4
        let xs: Vec<f64> = kept.iter().map(|s| s.position.x).collect();
        assert_eq!(xs.len(), 3);
        assert!((xs[0] - 0.4).abs() < 1e-9);
        assert!((xs[1] - 1.6).abs() < 1e-9);
        assert!((xs[2] - 2.8).abs() < 1e-9);
        assert_eq!(clean.len(), 4);
    }

    #[test]
    fn test_samples_from_poses_preserves_order() {
        let poses: Vec<_> = (0..3)
            .map(|i| (i as f64, crate::geometry::translation_matrix(&Vector3::new(0.0, 0.0, i as f64))))
            .collect();
        let samples = samples_from_poses(&poses);
        assert_eq!(samples.len(), 3);
        assert_eq!(samples[2].position.z, 2.0);
        assert_eq!(samples[2].orientation, Vector3::z());
    }
}
