//! Navigation-to-model registration
//!
//! This crate aligns tracked instrument paths with airway centerline trees:
//! - Orientation-aware ICP (tracking samples to a branch tree)
//! - Model-to-model ICP between two branch trees
//! - Neighbourhood restriction of a tree and two-pass local refinement

pub mod registration;

pub use registration::{
    register_model_to_model, register_tracking_to_model, register_with_local_refinement,
    restrict_to_neighborhood, try_register_model_to_model, try_register_tracking_to_model,
    RegistrationOutcome,
};
