use airnav_core::geometry::transform_point;
use airnav_core::{CenterlineOptions, SmoothingMethod};
use nalgebra::{Matrix4, Point3};
use tracing::{info, instrument, warn};

use crate::branch_list::BranchList;
use crate::builder::build_tree;

/// Raw centerline points to a smoothed branch tree in reference space.
///
/// Points are mapped through `data_to_reference`, assembled into branches,
/// pruned to `max_generations`, smoothed with the configured method and
/// given fresh smoothed tangents.
///
/// # Arguments
///
/// * `points` - Unordered centerline points in data space
/// * `data_to_reference` - Rigid transform into the reference frame
/// * `options` - Builder, pruning and smoothing settings
///
/// # Returns
///
/// The smoothed tree, or an empty tree when `options` fail validation.
#[instrument(skip_all, fields(points = points.len()))]
pub fn process_centerline(
    points: &[Point3<f64>],
    data_to_reference: &Matrix4<f64>,
    options: &CenterlineOptions,
) -> BranchList {
    if let Err(err) = options.validate() {
        warn!(%err, "Rejecting centerline options");
        return BranchList::new();
    }

    let reference: Vec<Point3<f64>> = points
        .iter()
        .map(|p| transform_point(data_to_reference, p))
        .collect();
    let mut list = build_tree(&reference, &options.builder);

    let pruned = match options.max_generations {
        Some(max_generation) => list.prune_generations(max_generation),
        None => 0,
    };

    list.calculate_orientations();
    list.smooth_orientations();
    match options.smoothing {
        SmoothingMethod::FixedSpacing {
            control_point_spacing,
        } => list.smooth_branch_positions(control_point_spacing),
        SmoothingMethod::LumenConstrained => list.smooth_lumen_constrained(),
    }
    list.calculate_orientations();
    list.smooth_orientations();

    info!(
        branches = list.len(),
        points = list.total_points(),
        pruned,
        "Processed centerline"
    );
    list
}
