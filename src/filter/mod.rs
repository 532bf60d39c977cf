//! Token filtering module
//!
//! Eligibility gating (ordered predicate chain) and priority scoring over
//! a compiled, immutable [`Criteria`].

pub mod criteria;
pub mod scoring;
pub mod token_filter;

pub use criteria::{Criteria, Theme};
pub use scoring::{PriorityScorer, ScoreBreakdown};
pub use token_filter::{EligibilityFilter, FilterReason, FilterResult};
