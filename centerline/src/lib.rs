//! Airway centerline branch trees
//!
//! Turns an unordered centerline point cloud into a forest of branches and
//! prepares it for registration:
//! - Greedy chain-growth tree builder with split detection
//! - Per-branch tangent estimation and windowed smoothing
//! - Natural cubic spline smoothing, fixed spacing or lumen constrained
//! - Generation pruning, flattening and polyline export

pub mod branch;
pub mod branch_list;
pub mod builder;
pub mod export;
pub mod orientation;
pub mod pipeline;
pub mod smoothing;
pub mod spline;

pub use branch::{radius_for_generation, Branch, BranchId};
pub use branch_list::BranchList;
pub use builder::build_tree;
pub use export::Polyline;
pub use pipeline::process_centerline;
pub use spline::CubicSpline3;
