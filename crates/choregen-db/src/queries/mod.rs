//! Query functions, one module per table group.

pub mod children;
pub mod ledger;
pub mod settings;
pub mod tasks;
