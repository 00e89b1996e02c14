//! Subcommand implementations

pub mod categories;
pub mod health;
pub mod stream;
