use airnav_centerline::{Branch, BranchList};
use airnav_core::geometry::{rigid_inverse, rigid_transform, rotation_about, transform_point, translation_matrix};
use airnav_core::{samples_from_poses, IcpOptions, NavigationSample};
use airnav_registration::{register_with_local_refinement, try_register_tracking_to_model};
use nalgebra::{Matrix4, Point3, Rotation3, Unit, Vector3};

fn top() -> Point3<f64> {
    Point3::new(-30.0, 40.0, 210.0)
}

fn line(start: Point3<f64>, dir: Vector3<f64>, from: usize, n: usize) -> Vec<Point3<f64>> {
    let dir = dir.normalize();
    (from..from + n).map(|k| start + dir * k as f64).collect()
}

fn airway() -> BranchList {
    let mut list = BranchList::new();
    let trunk = line(top(), Vector3::new(0.05, 0.0, -1.0), 0, 70);
    let fork = trunk[69];
    let trunk = list.add_branch(Branch::new(trunk), None).unwrap();
    list.add_branch(Branch::new(line(fork, Vector3::new(-0.7, 0.2, -0.7), 1, 50)), Some(trunk))
        .unwrap();
    list.add_branch(Branch::new(line(fork, Vector3::new(0.4, -0.6, -0.7), 1, 50)), Some(trunk))
        .unwrap();
    list
}

/// Poses along the first `branches` branches of `model`, seen from a tracker
/// frame that `truth` maps onto the model. The pose z axis follows the
/// branch tangent.
fn tracked_poses(model: &BranchList, branches: usize, truth: &Matrix4<f64>) -> Vec<(f64, Matrix4<f64>)> {
    let inverse = rigid_inverse(truth);
    let mut poses = Vec::new();
    for (_, branch) in model.iter().take(branches) {
        for i in (0..branch.len()).step_by(2) {
            let tangent = branch.orientations()[i];
            let align = Rotation3::rotation_between(&Vector3::z(), &tangent)
                .unwrap_or_else(|| Rotation3::from_axis_angle(&Unit::new_normalize(Vector3::x()), std::f64::consts::PI));
            let pose = inverse * rigid_transform(align.matrix(), &branch.positions()[i].coords);
            poses.push((poses.len() as f64 * 0.04, pose));
        }
    }
    poses
}

fn motion() -> Matrix4<f64> {
    translation_matrix(&Vector3::new(-4.0, 2.5, 3.0)) * rotation_about(&Vector3::new(0.2, 1.0, 0.1), 2.5f64.to_radians(), &top())
}

fn max_error(samples: &[NavigationSample], a: &Matrix4<f64>, b: &Matrix4<f64>) -> f64 {
    samples
        .iter()
        .map(|s| (transform_point(a, &s.position) - transform_point(b, &s.position)).norm())
        .fold(0.0, f64::max)
}

fn tight() -> IcpOptions {
    IcpOptions {
        max_iterations: 200,
        translation_tolerance: 1e-6,
        ..IcpOptions::tracking()
    }
}

#[test]
fn test_pose_stream_registration() {
    let model = airway();
    let truth = motion();
    let samples = samples_from_poses(&tracked_poses(&model, 3, &truth));

    let outcome = try_register_tracking_to_model(&samples, &model, &Matrix4::identity(), &tight()).unwrap();
    assert!(outcome.converged);
    assert!(max_error(&samples, &outcome.transform, &truth) < 0.05);
}

#[test]
fn test_nan_contamination_matches_clean_result() {
    let model = airway();
    let truth = motion();
    let clean = samples_from_poses(&tracked_poses(&model, 3, &truth));
    let clean_outcome = try_register_tracking_to_model(&clean, &model, &Matrix4::identity(), &tight()).unwrap();

    let mut dirty = clean.clone();
    for i in [5, 17, 33, 48] {
        dirty[i].position.x = f64::NAN;
    }
    for i in [9, 26] {
        dirty[i].orientation = Vector3::new(f64::INFINITY, 0.0, 1.0);
    }
    dirty[40].orientation = Vector3::zeros();

    let mut dirty_model = model.clone();
    let bad = Branch::from_parts(
        vec![Point3::new(f64::NAN, 1.0, 2.0); 6],
        vec![Vector3::new(0.0, 0.0, 1.0); 6],
    )
    .unwrap();
    dirty_model.add_branch(bad, None).unwrap();

    let dirty_outcome =
        try_register_tracking_to_model(&dirty, &dirty_model, &Matrix4::identity(), &tight()).unwrap();
    assert!(dirty_outcome.samples_used < clean_outcome.samples_used);
    assert_eq!(dirty_outcome.model_points_used, clean_outcome.model_points_used);
    assert!(max_error(&clean, &dirty_outcome.transform, &clean_outcome.transform) < 0.05);
}

#[test]
fn test_corrupt_first_capture_does_not_discard_session() {
    let model = airway();
    let truth = motion();
    let clean = samples_from_poses(&tracked_poses(&model, 3, &truth));
    let clean_outcome = try_register_tracking_to_model(&clean, &model, &Matrix4::identity(), &tight()).unwrap();

    let mut dirty = clean.clone();
    dirty[0].position.x = f64::NAN;
    let dirty_outcome =
        try_register_tracking_to_model(&dirty, &model, &Matrix4::identity(), &tight()).unwrap();
    assert_eq!(dirty_outcome.samples_used, clean_outcome.samples_used - 1);
    assert!(max_error(&clean, &dirty_outcome.transform, &clean_outcome.transform) < 0.05);

    let mut dirty = clean.clone();
    dirty[0].position.z = f64::INFINITY;
    let dirty_outcome =
        try_register_tracking_to_model(&dirty, &model, &Matrix4::identity(), &tight()).unwrap();
    assert_eq!(dirty_outcome.samples_used, clean_outcome.samples_used - 1);
}

#[test]
fn test_local_refinement_on_partial_path() {
    let model = airway();
    let truth = motion();
    // trunk and left bronchus only
    let samples = samples_from_poses(&tracked_poses(&model, 2, &truth));

    let outcome = register_with_local_refinement(&samples, &model, &Matrix4::identity(), 10.0, &tight()).unwrap();
    assert!(outcome.converged);
    assert!(outcome.model_points_used < model.total_points());
    assert!(max_error(&samples, &outcome.transform, &truth) < 0.05);
}

#[test]
fn test_local_refinement_disabled_matches_single_pass() {
    let model = airway();
    let samples = samples_from_poses(&tracked_poses(&model, 3, &motion()));

    let single = try_register_tracking_to_model(&samples, &model, &Matrix4::identity(), &IcpOptions::tracking()).unwrap();
    let two_pass =
        register_with_local_refinement(&samples, &model, &Matrix4::identity(), 0.0, &IcpOptions::tracking()).unwrap();
    assert_eq!(single, two_pass);
}
