//! Shared building blocks for airway navigation
//!
//! This crate provides the types every other airnav crate speaks:
//! - Error / Result used across the workspace
//! - Rigid transform helpers on `Matrix4<f64>`
//! - Oriented point sets (positions with a per-point direction)
//! - Navigation samples produced by an external tracking system
//! - An R*-tree backed point index for nearest-neighbour queries
//! - Serde-driven configuration for every algorithm stage

pub mod config;
pub mod error;
pub mod geometry;
pub mod navigation;
pub mod point_cloud;
pub mod spatial;

pub use config::{
    BuilderOptions, CenterlineOptions, IcpOptions, NavConfig, PrimaryAxis, SmoothingMethod,
};
pub use error::{Error, Result};
pub use navigation::{samples_from_poses, NavigationSample};
pub use point_cloud::OrientedPoints;
pub use spatial::PointIndex;
