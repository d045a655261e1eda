//! Shared building blocks for the view statistics refresher.
//!
//! - `config`: environment settings and the statistics YAML loader
//! - `errors`: the workspace error type
//! - `models`: configuration, statistics and query row models
//! - `utils`: run IDs and SQL placeholder helpers

pub mod config;
pub mod errors;
pub mod models;
pub mod utils;
