//! Core domain logic for choregen: automatic task generation for households.
//!
//! The pipeline, leaves first:
//!
//! - [`recurrence`] -- pure calendar arithmetic: next occurrence(s) of a
//!   recurrence rule, previews, human-readable labels.
//! - [`catalog`] -- the immutable, age/period-scoped template catalog with
//!   filter and statistics operations.
//! - [`milestones`] -- age-linked milestones (vaccinations, registrations),
//!   queryable by age window.
//! - [`planner`] -- combines a child's age with the catalog, milestones, and
//!   household overrides to produce deterministic generation candidates.
//! - [`materialize`] -- turns accepted candidates into persisted task rows
//!   plus ledger entries, at most once per generation key.
//!
//! Everything above `materialize` is side-effect free and safe to call from
//! any number of threads.

pub mod catalog;
pub mod materialize;
pub mod milestones;
pub mod planner;
pub mod recurrence;
