//! Core domain types and rules for the picks contest

pub mod catalog;
pub mod collection;
pub mod progress;
pub mod scoring;
pub mod types;
pub mod validation;

#[cfg(test)]
pub mod test_fixtures;

pub use catalog::{ExpandedBet, LineCatalog};
pub use collection::CollectionTags;
pub use progress::{derive_progress, CategoryProgress, PickCategory, ProgressReport};
pub use scoring::{
    build_standings, redact_standings, PickStatus, ScoredBet, Standing, UserSummary,
};
pub use types::*;
pub use validation::{
    plan_replacement, validate_display_name, PickScope, PickValidationError, ReplacementPlan,
};
