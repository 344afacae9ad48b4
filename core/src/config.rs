//! Algorithm configuration
//!
//! Every stage takes a plain options struct. All of them deserialize with
//! `#[serde(default)]`, so a host configuration layer only has to spell out
//! the values it wants to change.

use nalgebra::Point3;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Axis used to order raw centerline points and to pick the initial
/// alignment point (superior-inferior in patient space).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimaryAxis {
    X,
    Y,
    #[default]
    Z,
}

impl PrimaryAxis {
    pub fn coordinate(&self, p: &Point3<f64>) -> f64 {
        match self {
            PrimaryAxis::X => p.x,
            PrimaryAxis::Y => p.y,
            PrimaryAxis::Z => p.z,
        }
    }
}

/// Branch-tree builder parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderOptions {
    pub primary_axis: PrimaryAxis,
    /// A chain stops growing when the nearest unused point is farther than this (mm).
    pub max_gap: f64,
    /// Shorter chains are discarded.
    pub min_branch_length: usize,
    /// The seed search stops as soon as a candidate closer than this is found (mm).
    pub early_exit_distance: f64,
    /// Split indices this close to either end attach instead of splitting.
    pub junction_margin: usize,
}

impl Default for BuilderOptions {
    fn default() -> Self {
        Self {
            primary_axis: PrimaryAxis::Z,
            max_gap: 3.0,
            min_branch_length: 5,
            early_exit_distance: 2.0,
            junction_margin: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum SmoothingMethod {
    /// Evenly spaced spline control points.
    FixedSpacing { control_point_spacing: f64 },
    /// Add control points until the curve stays inside the lumen.
    LumenConstrained,
}

impl Default for SmoothingMethod {
    fn default() -> Self {
        SmoothingMethod::FixedSpacing {
            control_point_spacing: 40.0,
        }
    }
}

/// Centerline processing pipeline parameters
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CenterlineOptions {
    pub builder: BuilderOptions,
    /// Branches deeper than this generation are removed after building.
    pub max_generations: Option<usize>,
    pub smoothing: SmoothingMethod,
}

/// ICP parameters shared by the tracking and model-to-model registrations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IcpOptions {
    pub max_iterations: usize,
    /// Stop once an increment translates less than this (sum of |t|, mm).
    pub translation_tolerance: f64,
    /// Fraction of correspondences kept after orientation ranking.
    pub inlier_fraction: f64,
    /// Minimum spacing between consecutive kept navigation samples (mm).
    pub thinning_distance: f64,
    pub min_valid_points: usize,
    pub primary_axis: PrimaryAxis,
    /// Orientation distance used when the position/orientation ratio is undefined.
    pub orientation_fallback: f64,
}

impl Default for IcpOptions {
    fn default() -> Self {
        Self::tracking()
    }
}

impl IcpOptions {
    pub fn tracking() -> Self {
        Self {
            max_iterations: 50,
            translation_tolerance: 1.0,
            inlier_fraction: 0.7,
            thinning_distance: 1.0,
            min_valid_points: 10,
            primary_axis: PrimaryAxis::Z,
            orientation_fallback: 4.0,
        }
    }

    pub fn model_to_model() -> Self {
        Self {
            max_iterations: 200,
            translation_tolerance: 0.5,
            ..Self::tracking()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(Error::InvalidInput("max_iterations must be positive".into()));
        }
        if !(self.translation_tolerance > 0.0) {
            return Err(Error::InvalidInput(format!(
                "translation_tolerance must be positive, got {}",
                self.translation_tolerance
            )));
        }
        if !(self.inlier_fraction > 0.0 && self.inlier_fraction <= 1.0) {
            return Err(Error::InvalidInput(format!(
                "inlier_fraction must lie in (0, 1], got {}",
                self.inlier_fraction
            )));
        }
        if self.min_valid_points < 3 {
            return Err(Error::InvalidInput(format!(
                "min_valid_points must be at least 3, got {}",
                self.min_valid_points
            )));
        }
        if self.thinning_distance < 0.0 || !self.thinning_distance.is_finite() {
            return Err(Error::InvalidInput(format!(
                "thinning_distance must be a non-negative distance, got {}",
                self.thinning_distance
            )));
        }
        Ok(())
    }
}

impl BuilderOptions {
    pub fn validate(&self) -> Result<()> {
        if !(self.max_gap > 0.0) {
            return Err(Error::InvalidInput(format!("max_gap must be positive, got {}", self.max_gap)));
        }
        if self.min_branch_length < 2 {
            return Err(Error::InvalidInput(format!(
                "min_branch_length must be at least 2, got {}",
                self.min_branch_length
            )));
        }
        Ok(())
    }
}

impl CenterlineOptions {
    pub fn validate(&self) -> Result<()> {
        self.builder.validate()?;
        if let SmoothingMethod::FixedSpacing {
            control_point_spacing,
        } = self.smoothing
        {
            if !(control_point_spacing > 0.0) {
                return Err(Error::InvalidInput(format!(
                    "control_point_spacing must be positive, got {control_point_spacing}"
                )));
            }
        }
        if self.max_generations == Some(0) {
            return Err(Error::InvalidInput("max_generations must be at least 1".into()));
        }
        Ok(())
    }
}

/// Complete configuration as a host application would store it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavConfig {
    pub centerline: CenterlineOptions,
    pub tracking_icp: IcpOptions,
    pub model_icp: IcpOptions,
}

impl Default for NavConfig {
    fn default() -> Self {
        Self {
            centerline: CenterlineOptions::default(),
            tracking_icp: IcpOptions::tracking(),
            model_icp: IcpOptions::model_to_model(),
        }
    }
}

impl NavConfig {
    /// Parse and validate a JSON document; missing fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: NavConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.centerline.validate()?;
        self.tracking_icp.validate()?;
        self.model_icp.validate()
    }
}
