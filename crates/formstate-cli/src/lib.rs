//! Command-line host for formstate configurations.

pub mod cli;
pub mod commands;
pub mod logging;
pub mod summary;
pub mod types;
