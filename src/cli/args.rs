//! Command line argument parsing
//!
//! Flags select which stages run and how; everything else comes from the
//! configuration file. Flags win over the file.

use crate::cli::config::RunConfig;
use crate::container::OutputMode;
use crate::services::{DatabaseOptions, ToolOptions};
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "rpcheckup")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Find AWS resources whose policies allow public or cross-account access")]
#[command(long_about = None)]
pub struct Args {
    /// Skip running an import, use existing data
    #[arg(long = "skip-introspector")]
    pub skip_introspector: bool,

    /// Skip pulling the introspector image. Allows for using a local image
    #[arg(long = "skip-introspector-pull")]
    pub skip_introspector_pull: bool,

    /// Override the introspector image to use
    #[arg(long = "introspector-ref", value_name = "IMAGE")]
    pub introspector_ref: Option<String>,

    /// Leave postgres running in a container
    #[arg(long = "leave-postgres")]
    pub leave_postgres: bool,

    /// Reuse an existing postgres container, if there is one
    #[arg(long = "reuse-postgres")]
    pub reuse_postgres: bool,

    /// Pass through logs from the introspector
    #[arg(long = "log-introspector")]
    pub log_introspector: bool,

    /// Print report results to stdout
    #[arg(long = "print-to-stdout")]
    pub print_to_stdout: bool,

    /// Directory for output [default: output]
    #[arg(long = "output", value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Configuration file (defaults to ./rpcheckup.toml if present)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

/// Everything a run needs, after merging flags over the config file.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub database: DatabaseOptions,
    pub introspector: ToolOptions,
    pub output_dir: PathBuf,
    pub skip_introspector: bool,
    pub pull_introspector: bool,
    pub introspector_output: OutputMode,
    pub leave_postgres: bool,
    pub reuse_postgres: bool,
    pub print_to_stdout: bool,
}

impl Args {
    /// Merge these flags over `config`.
    pub fn resolve(&self, config: RunConfig) -> RunOptions {
        let mut introspector = config.introspector;
        if let Some(image) = &self.introspector_ref {
            introspector.image = image.clone();
        }

        RunOptions {
            database: config.database,
            introspector,
            output_dir: self
                .output
                .clone()
                .unwrap_or(config.output.directory),
            skip_introspector: self.skip_introspector,
            pull_introspector: !self.skip_introspector_pull,
            introspector_output: if self.log_introspector {
                OutputMode::Passthrough
            } else {
                OutputMode::Discard
            },
            leave_postgres: self.leave_postgres,
            reuse_postgres: self.reuse_postgres,
            print_to_stdout: self.print_to_stdout,
        }
    }

    /// Default tracing filter directive.
    pub fn log_filter(&self) -> &'static str {
        if self.verbose {
            "rpcheckup=debug,introspector=info"
        } else {
            "rpcheckup=info,introspector=info"
        }
    }
}
