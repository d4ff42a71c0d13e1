//! PostgreSQL persistence for choregen.
//!
//! The central table is `generated_tasks` -- the generation ledger. Its
//! unique index on `generation_key` is the mechanism that makes repeated or
//! concurrent generation sweeps safe: inserting an already-generated key is
//! detected as a conflict and reported as "already generated", never as an
//! error. See [`queries::ledger::insert_if_absent`].

pub mod config;
pub mod models;
pub mod pool;
pub mod queries;
