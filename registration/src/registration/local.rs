//! Neighbourhood restriction and two-pass local refinement

use airnav_centerline::BranchList;
use airnav_core::geometry::transform_point;
use airnav_core::navigation::{thin_by_distance, to_oriented_points};
use airnav_core::{IcpOptions, NavigationSample, PointIndex, Result};
use nalgebra::{Matrix4, Point3};
use tracing::{debug, instrument, warn};

use super::{prepare, run_icp, try_register_tracking_to_model, RegistrationOutcome};

/// Copy of `model` keeping only points within `max_distance` of some sample
/// position. Branches left empty are removed and their children re-attached.
pub fn restrict_to_neighborhood(model: &BranchList, samples: &[Point3<f64>], max_distance: f64) -> BranchList {
    let index = PointIndex::from_indexed(
        samples
            .iter()
            .enumerate()
            .filter(|(_, p)| p.coords.iter().all(|c| c.is_finite()))
            .map(|(i, p)| (i, *p)),
    );
    let mut local = model.clone();
    local.retain_points(|p| index.nearest(p).map_or(false, |(_, d)| d <= max_distance));
    debug!(
        branches = local.len(),
        points = local.total_points(),
        max_distance,
        "Restricted model to sample neighbourhood"
    );
    local
}

/// Tracking registration followed by a second pass against the part of the
/// tree near the registered samples.
///
/// The second pass starts from the first-pass transform without coarse
/// re-centring. When it fails, the first-pass outcome is returned.
///
/// # Arguments
///
/// * `samples` - Time-ordered instrument samples in tracker space
/// * `model` - Full centerline tree
/// * `initial_guess` - Passed to the first pass unchanged
/// * `max_local_distance` - Neighbourhood radius in mm; zero or less skips the second pass
/// * `options` - ICP settings shared by both passes
///
/// # Returns
///
/// Errors only when the first pass fails.
#[instrument(skip_all, fields(samples = samples.len(), max_local_distance = max_local_distance))]
pub fn register_with_local_refinement(
    samples: &[NavigationSample],
    model: &BranchList,
    initial_guess: &Matrix4<f64>,
    max_local_distance: f64,
    options: &IcpOptions,
) -> Result<RegistrationOutcome> {
    let first = try_register_tracking_to_model(samples, model, initial_guess, options)?;
    if !(max_local_distance > 0.0) {
        return Ok(first);
    }

    let registered: Vec<Point3<f64>> = samples
        .iter()
        .map(|s| transform_point(&first.transform, &s.position))
        .collect();
    let local = restrict_to_neighborhood(model, &registered, max_local_distance);

    match refine(samples, &local, &first.transform, options) {
        Ok(second) => Ok(second),
        Err(err) => {
            warn!(%err, "Local refinement failed, keeping first-pass registration");
            Ok(first)
        }
    }
}

fn refine(
    samples: &[NavigationSample],
    local: &BranchList,
    seed: &Matrix4<f64>,
    options: &IcpOptions,
) -> Result<RegistrationOutcome> {
    let thinned = thin_by_distance(samples, options.thinning_distance);
    let (mut moving, model_points) = prepare(to_oriented_points(&thinned), local.flatten(), options)?;
    moving.transform(seed);
    run_icp(moving, &model_points, *seed, options)
}
