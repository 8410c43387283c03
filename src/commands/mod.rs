//! Subcommand implementations for the `flight-loadgen` binary.

pub mod health;
pub mod loadtest;
pub mod query;
