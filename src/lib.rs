//! # rpcheckup
//!
//! Audits an AWS account for resources whose resource policies or sharing
//! attributes grant access to the public or to other accounts.
//!
//! A run provisions two throwaway containers: Postgres, and the introspector
//! tool that imports the account's resources into it. It then queries the
//! imported data, classifies every resource by who can reach it, and writes
//! the result as CSV and HTML.
//!
//! ## Architecture Overview
//!
//! - **[`container`]**: runtime session, generic service lifecycle, health
//!   polling and command execution over bollard
//! - **[`services`]**: the Postgres and introspector services built on that lifecycle
//! - **[`report`]**: bundled SQL, access classification and ordering
//! - **[`output`]**: CSV, HTML and stdout rendering
//! - **[`orchestrator`]**: the run sequence tying these together
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rpcheckup::cli::{Args, ConfigDiscovery};
//! use rpcheckup::services::SupportTable;
//! use clap::Parser;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = Args::parse();
//!     let options = args.resolve(ConfigDiscovery::load(args.config.as_deref())?);
//!
//!     let paths = rpcheckup::orchestrator::run(&options, &SupportTable::default()).await?;
//!     println!("Report written to {}", paths.html.display());
//!     Ok(())
//! }
//! ```

/// Container orchestration over the Docker API.
///
/// Provides the runtime session, one parametrized service lifecycle, health
/// polling, and command execution with streamed output and cancellation.
pub mod container;

/// Postgres and introspector services.
pub mod services;

/// Report generation from the imported dataset.
pub mod report;

/// Report rendering to files and stdout.
pub mod output;

/// AWS credential loading for the import.
pub mod credentials;

/// The end-to-end audit run.
pub mod orchestrator;

/// Environment constants and path utilities.
///
/// Centralizes container names, images, environment variable names and
/// file names used throughout the application.
pub mod env;

// CLI module for command-line interface
pub mod cli;

#[cfg(test)]
mod testing;

// Re-export main container types
pub use container::{ContainerError, RuntimeSession};

// Re-export service types
pub use services::{Credential, DatabaseService, SupportTable, ToolService};

// Re-export report types
pub use report::{AccessLevel, Report, ReportError, ReportPipeline, Row};
