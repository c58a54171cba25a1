#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Ensemble scenario reduction.
//!
//! Per-member severity rows are summed per member, the members with the
//! lowest and highest total population severity are picked as the low and
//! high scenarios, and the probability-weighted `E_*` tile columns supply
//! the expected column.

pub mod expected;
pub mod members;
pub mod reduce;
pub mod tracks;

use storm_impact_forecast_models::MemberId;
use thiserror::Error;

pub use expected::expected_totals;
pub use members::member_options;
pub use reduce::{MemberTotals, member_totals, reduce_scenarios};
pub use tracks::track_lines;

/// Errors that can occur while reducing a scenario.
#[derive(Debug, Error)]
pub enum ScenarioError {
    /// A track row carries a negative severity.
    #[error("Member {member} has a negative '{column}' value: {value}")]
    NegativeSeverity {
        /// Member the row belongs to.
        member: MemberId,
        /// Track column carrying the negative severity.
        column: &'static str,
        /// The offending value.
        value: f64,
    },

    /// A tile carries a non-numeric expectation value.
    #[error("Tile {index} has a non-numeric '{column}' value: {value}")]
    NonNumericExpectation {
        /// Tile property that was summed.
        column: &'static str,
        /// Position of the offending feature in the batch.
        index: usize,
        /// The offending value.
        value: String,
    },
}
