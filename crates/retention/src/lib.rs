//! Sluice - Retention
//!
//! Alias rotation for time-rotated collections, plus pruning of rotations
//! that fell out of the retention window.
//!
//! # Overview
//!
//! Collections are written as rotations of a logical name: `logs-9`,
//! `logs-10`, ... Readers query the alias `logs`. After a new rotation is
//! filled, [`RetentionPolicy::update_aliases`] swaps the alias over in one
//! atomic request and, when enabled, runs the retention pass.
//!
//! The retention pass deletes rotations whose ordinal is more than `diff`
//! behind the new one, but never leaves fewer than `mintokeep` older
//! rotations. Deletion is cleanup: failures are reported in
//! [`RetentionOutcome`], not as errors.

mod candidate;
mod error;
mod plan;
mod policy;

pub use candidate::{RetentionCandidate, trailing_ordinal};
pub use error::{RetentionError, Result};
pub use plan::{RetentionPlan, SkipReason, plan_retention};
pub use policy::{AliasUpdate, RetentionOutcome, RetentionPolicy};
