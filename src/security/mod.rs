// src/security/mod.rs

//! Security policy and the gate that evaluates commands against it.
//!
//! - [`policy`] holds the [`SecurityPolicy`] configuration value.
//! - [`gate`] owns the current policy and answers "is this dangerous",
//!   "does this need confirmation" and "is this allowed at all".
//!
//! The gate never blocks execution by itself; callers decide what to do
//! with a failed [`crate::types::SecurityAssessment`].

pub mod gate;
pub mod policy;

pub use gate::{sanitize_arguments, SecurityGate, SHELL_METACHARACTERS};
pub use policy::SecurityPolicy;
