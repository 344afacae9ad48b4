use airnav_centerline::{build_tree, process_centerline, BranchList};
use airnav_core::geometry::{rigid_transform, transform_point};
use airnav_core::{BuilderOptions, CenterlineOptions, SmoothingMethod};
use nalgebra::{Matrix4, Point3, Rotation3, Vector3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Trunk from z = 200 down to a fork at z = 100, then two 45° arms, 1 mm spacing.
fn y_centerline() -> Vec<Point3<f64>> {
    let fork = Point3::new(0.0, 0.0, 100.0);
    let s = std::f64::consts::FRAC_1_SQRT_2;
    let mut points = Vec::with_capacity(300);
    for k in 1..=100 {
        let k = k as f64;
        points.push(fork + Vector3::new(0.0, 0.0, k));
        points.push(fork + Vector3::new(-s, 0.0, -s) * k);
        points.push(fork + Vector3::new(s, 0.0, -s) * k);
    }
    points
}

/// Y plus a second-level fork on the right arm.
fn two_level_centerline() -> Vec<Point3<f64>> {
    let mut points = y_centerline();
    let s = std::f64::consts::FRAC_1_SQRT_2;
    let sub_fork = Point3::new(0.0, 0.0, 100.0) + Vector3::new(s, 0.0, -s) * 50.0;
    for k in 1..=40 {
        points.push(sub_fork + Vector3::new(0.0, 1.0, 0.0) * (k as f64 + 1.0));
    }
    points
}

fn assert_unit_or_zero(list: &BranchList) {
    for (_, branch) in list.iter() {
        assert_eq!(branch.orientations().len(), branch.len());
        for o in branch.orientations() {
            let n = o.norm();
            assert!(n == 0.0 || (n - 1.0).abs() < 1e-9, "tangent norm {n}");
        }
    }
}

#[test]
fn test_y_centerline_splits_into_three() {
    let list = build_tree(&y_centerline(), &BuilderOptions::default());
    let mut lengths: Vec<usize> = list.iter().map(|(_, b)| b.len()).collect();
    lengths.sort_unstable();
    assert_eq!(lengths, vec![100, 100, 100]);
    assert_eq!(list.roots().len(), 1);
}

#[test]
fn test_two_level_tree_generations() {
    let list = build_tree(&two_level_centerline(), &BuilderOptions::default());
    let max_generation = list.ids().iter().filter_map(|&id| list.generation(id)).max();
    assert_eq!(max_generation, Some(3));
    assert_eq!(list.total_points(), 340);

    let mut pruned = list.clone();
    let removed = pruned.prune_generations(2);
    assert!(removed > 0);
    assert!(pruned.ids().iter().all(|&id| pruned.generation(id).unwrap() <= 2));
}

#[test]
fn test_process_centerline_maps_into_reference_frame() {
    let rotation = Rotation3::from_euler_angles(0.1, -0.05, 0.3);
    let data_to_reference = rigid_transform(rotation.matrix(), &Vector3::new(10.0, -20.0, 5.0));

    let options = CenterlineOptions::default();
    let in_data = process_centerline(&y_centerline(), &Matrix4::identity(), &options);
    let in_reference = process_centerline(&y_centerline(), &data_to_reference, &options);

    assert_eq!(in_data.len(), in_reference.len());
    assert_eq!(in_data.total_points(), in_reference.total_points());
    let a = in_data.flatten();
    let b = in_reference.flatten();
    // the same trunk top is found first in both frames
    let mapped = transform_point(&data_to_reference, &a.positions[0]);
    assert!((mapped - b.positions[0]).norm() < 1e-6);
    assert_unit_or_zero(&in_reference);
}

#[test]
fn test_process_centerline_lumen_constrained() {
    let mut rng = StdRng::seed_from_u64(3);
    let clean = two_level_centerline();
    let noisy: Vec<Point3<f64>> = clean
        .iter()
        .map(|p| p + Vector3::new(rng.gen_range(-0.2..0.2), rng.gen_range(-0.2..0.2), rng.gen_range(-0.2..0.2)))
        .collect();

    let options = CenterlineOptions {
        smoothing: SmoothingMethod::LumenConstrained,
        max_generations: Some(2),
        ..Default::default()
    };
    let list = process_centerline(&noisy, &Matrix4::identity(), &options);
    assert!(!list.is_empty());
    assert!(list.ids().iter().all(|&id| list.generation(id).unwrap() <= 2));
    assert_unit_or_zero(&list);

    // every smoothed point stays within the generation radius of the input
    for (id, branch) in list.iter() {
        let radius = list.radius(id).unwrap();
        for p in &branch.positions()[1..] {
            let nearest = noisy.iter().map(|q| (p - q).norm()).fold(f64::INFINITY, f64::min);
            assert!(nearest <= radius + 1.5, "point {p:?} drifted {nearest}");
        }
    }
}

#[test]
fn test_invalid_options_give_empty_tree() {
    let options = CenterlineOptions {
        smoothing: SmoothingMethod::FixedSpacing {
            control_point_spacing: 0.0,
        },
        ..Default::default()
    };
    let list = process_centerline(&y_centerline(), &Matrix4::identity(), &options);
    assert!(list.is_empty());
}
