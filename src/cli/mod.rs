//! CLI-specific functionality for rpcheckup
//!
//! This module contains argument parsing and configuration discovery.

pub mod args;
pub mod config;

pub use args::{Args, RunOptions};
pub use config::{ConfigDiscovery, OutputOptions, RunConfig};
