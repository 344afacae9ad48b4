//! Airway centerline branch trees and navigation-to-model registration.
//!
//! Umbrella crate re-exporting the workspace members.

pub use airnav_centerline as centerline;
pub use airnav_core as core;
pub use airnav_registration as registration;

pub use airnav_centerline::{process_centerline, BranchList};
pub use airnav_core::{Error, NavConfig, NavigationSample, Result};
pub use airnav_registration::{
    register_model_to_model, register_tracking_to_model, RegistrationOutcome,
};
