//! Registration Module
//!
//! Orientation-aware ICP between oriented point sets:
//! - Tracking samples to a centerline branch tree
//! - Branch tree to branch tree
//! - Restriction of a tree to a neighbourhood, and two-pass local refinement
//!
//! Every entry point comes in two flavours. `try_*` functions return a
//! [`RegistrationOutcome`] or an error; the plain functions never fail and
//! return the identity transform after logging a warning.

pub mod absolute_orientation;
pub mod correspondence;
pub mod local;

pub use absolute_orientation::solve_absolute_orientation;
pub use airnav_core::{Error, Result};
pub use correspondence::{find_correspondences, retain_inliers, Correspondence};
pub use local::{register_with_local_refinement, restrict_to_neighborhood};

use airnav_centerline::BranchList;
use airnav_core::geometry::{is_finite_transform, translation_l1, translation_matrix};
use airnav_core::navigation::{thin_by_distance, to_oriented_points};
use airnav_core::{IcpOptions, NavigationSample, OrientedPoints, PointIndex};
use nalgebra::{Matrix4, Point3, Vector3};
use tracing::{debug, info, instrument, warn};

/// Detailed result of one registration run.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistrationOutcome {
    /// Rigid transform taking the moving side into the model frame
    pub transform: Matrix4<f64>,
    /// ICP iterations performed
    pub iterations: usize,
    /// Whether the last increment fell below the translation tolerance.
    /// False when the loop hit the iteration cap or ran out of usable pairs.
    pub converged: bool,
    pub samples_used: usize,
    pub model_points_used: usize,
}

/// Register a tracked instrument path to a centerline tree.
///
/// Returns identity on any failure.
pub fn register_tracking_to_model(
    samples: &[NavigationSample],
    model: &BranchList,
    initial_guess: &Matrix4<f64>,
) -> Matrix4<f64> {
    match try_register_tracking_to_model(samples, model, initial_guess, &IcpOptions::tracking()) {
        Ok(outcome) => outcome.transform,
        Err(err) => {
            warn!(%err, "Tracking registration failed, falling back to identity");
            Matrix4::identity()
        }
    }
}

/// Register a tracked instrument path to a centerline tree.
///
/// # Algorithm
///
/// 1. Thin the samples by distance, skipping invalid captures
/// 2. Drop invalid entries on the model side and check both counts
/// 3. Move the samples by `initial_guess`
/// 4. Translate so the sample highest along the primary axis lands on the
///    first model point
/// 5. Refine with orientation-weighted ICP until the translation step falls
///    below the tolerance or the iteration cap is reached
///
/// # Arguments
///
/// * `samples` - Time-ordered instrument samples in tracker space
/// * `model` - Centerline tree with computed tangents
/// * `initial_guess` - Tracker-to-model transform applied before the coarse step
/// * `options` - ICP settings, validated before use
///
/// # Returns
///
/// * `Ok(RegistrationOutcome)` - Tracker-to-model transform and run statistics
/// * `Err(Error::InvalidInput)` - Options failed validation
/// * `Err(Error::InsufficientData)` - Fewer than `min_valid_points` on either side
/// * `Err(Error::NumericDegeneracy)` - Non-finite guess or transform
#[instrument(skip_all, fields(samples = samples.len(), branches = model.len()))]
pub fn try_register_tracking_to_model(
    samples: &[NavigationSample],
    model: &BranchList,
    initial_guess: &Matrix4<f64>,
    options: &IcpOptions,
) -> Result<RegistrationOutcome> {
    options.validate()?;
    if !is_finite_transform(initial_guess) {
        return Err(Error::NumericDegeneracy("Initial guess contains non-finite entries".into()));
    }
    let thinned = thin_by_distance(samples, options.thinning_distance);
    let (mut moving, model_points) = prepare(to_oriented_points(&thinned), model.flatten(), options)?;

    moving.transform(initial_guess);
    let axis = options.primary_axis;
    let top = moving
        .positions
        .iter()
        .max_by(|a, b| axis.coordinate(a).total_cmp(&axis.coordinate(b)))
        .copied()
        .ok_or(Error::InsufficientData {
            what: "navigation samples",
            found: 0,
            required: options.min_valid_points,
        })?;
    let anchor = model_points.positions.first().copied().ok_or(Error::InsufficientData {
        what: "model points",
        found: 0,
        required: options.min_valid_points,
    })?;
    let coarse = translation_matrix(&(anchor - top));
    moving.transform(&coarse);

    run_icp(moving, &model_points, coarse * initial_guess, options)
}

/// Register one centerline tree onto another; the result maps `moving`
/// into the frame of `fixed`.
///
/// Returns identity on any failure.
pub fn register_model_to_model(fixed: &BranchList, moving: &BranchList) -> Matrix4<f64> {
    match try_register_model_to_model(fixed, moving, &IcpOptions::model_to_model()) {
        Ok(outcome) => outcome.transform,
        Err(err) => {
            warn!(%err, "Model registration failed, falling back to identity");
            Matrix4::identity()
        }
    }
}

/// Model-to-model ICP, initialised by aligning the per-axis medians of the
/// two position sets.
///
/// # Arguments
///
/// * `fixed` - Tree defining the target frame
/// * `moving` - Tree to be moved onto `fixed`
/// * `options` - ICP settings, validated before use
///
/// # Returns
///
/// * `Ok(RegistrationOutcome)` - Transform mapping `moving` into the frame of `fixed`
/// * `Err(_)` - Invalid options, too few valid points or a non-finite result
#[instrument(skip_all, fields(fixed = fixed.len(), moving = moving.len()))]
pub fn try_register_model_to_model(
    fixed: &BranchList,
    moving: &BranchList,
    options: &IcpOptions,
) -> Result<RegistrationOutcome> {
    options.validate()?;
    let (mut moving_points, fixed_points) = prepare(moving.flatten(), fixed.flatten(), options)?;

    let coarse = translation_matrix(&(median(&fixed_points.positions) - median(&moving_points.positions)));
    moving_points.transform(&coarse);

    run_icp(moving_points, &fixed_points, coarse, options)
}

/// Drop invalid entries on both sides and enforce the minimum count.
pub(crate) fn prepare(
    mut moving: OrientedPoints,
    mut model: OrientedPoints,
    options: &IcpOptions,
) -> Result<(OrientedPoints, OrientedPoints)> {
    let dropped_moving = moving.retain_valid();
    let dropped_model = model.retain_valid();
    if dropped_moving > 0 || dropped_model > 0 {
        debug!(dropped_moving, dropped_model, "Removed invalid entries");
    }
    if moving.len() < options.min_valid_points {
        return Err(Error::InsufficientData {
            what: "samples",
            found: moving.len(),
            required: options.min_valid_points,
        });
    }
    if model.len() < options.min_valid_points {
        return Err(Error::InsufficientData {
            what: "model points",
            found: model.len(),
            required: options.min_valid_points,
        });
    }
    Ok((moving, model))
}

/// Iterate correspondence, inlier selection and closed-form alignment.
///
/// `moving` must already be expressed through `initial`; the returned
/// transform is every increment composed onto `initial`.
pub(crate) fn run_icp(
    mut moving: OrientedPoints,
    model: &OrientedPoints,
    initial: Matrix4<f64>,
    options: &IcpOptions,
) -> Result<RegistrationOutcome> {
    if !is_finite_transform(&initial) || moving.positions.iter().any(|p| !p.coords.iter().all(|c| c.is_finite())) {
        return Err(Error::NumericDegeneracy("Non-finite initial alignment".into()));
    }
    let index = PointIndex::new(&model.positions);
    let mut transform = initial;
    let mut iterations = 0;
    let mut converged = false;

    while iterations < options.max_iterations {
        iterations += 1;
        let mut pairs = find_correspondences(&moving, model, &index, options.orientation_fallback);
        retain_inliers(&mut pairs, options.inlier_fraction);

        let source: Vec<Point3<f64>> = pairs.iter().map(|c| moving.positions[c.sample]).collect();
        let target: Vec<Point3<f64>> = pairs.iter().map(|c| model.positions[c.model]).collect();
        let Some(increment) = solve_absolute_orientation(&source, &target) else {
            warn!(iteration = iterations, pairs = pairs.len(), "No alignment from the retained pairs, stopping");
            break;
        };

        transform = increment * transform;
        moving.transform(&increment);
        let step = translation_l1(&increment);
        debug!(iteration = iterations, pairs = pairs.len(), step, "ICP iteration");

        if !is_finite_transform(&transform) {
            return Err(Error::NumericDegeneracy(format!(
                "Non-finite transform after iteration {iterations}"
            )));
        }
        if step < options.translation_tolerance {
            converged = true;
            break;
        }
    }

    if !is_finite_transform(&transform) {
        return Err(Error::NumericDegeneracy("Non-finite registration transform".into()));
    }
    if converged {
        info!(iterations, samples = moving.len(), model_points = model.len(), "ICP converged");
    } else if iterations >= options.max_iterations {
        warn!(
            iterations,
            tolerance = options.translation_tolerance,
            "ICP reached the iteration limit without converging"
        );
    }

    Ok(RegistrationOutcome {
        transform,
        iterations,
        converged,
        samples_used: moving.len(),
        model_points_used: model.len(),
    })
}

/// Per-axis median; the mean of the two middle values for even counts.
pub(crate) fn median(points: &[Point3<f64>]) -> Point3<f64> {
    let axis_median = |axis: usize| {
        let mut values: Vec<f64> = points.iter().map(|p| p[axis]).collect();
        values.sort_by(f64::total_cmp);
        let n = values.len();
        match n {
            0 => 0.0,
            _ if n % 2 == 1 => values[n / 2],
            _ => 0.5 * (values[n / 2 - 1] + values[n / 2]),
        }
    };
    Point3::from(Vector3::new(axis_median(0), axis_median(1), axis_median(2)))
}
