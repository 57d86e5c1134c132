//! Environment constants for rpcheckup.
//!
//! This module centralizes the container names, images, environment variable
//! names and file names used throughout the application.

use std::path::{Path, PathBuf};

/// Configuration file looked up in the working directory
pub const CONFIG_FILE_NAME: &str = "rpcheckup.toml";

/// Default directory reports are written to
pub const DEFAULT_OUTPUT_DIR: &str = "output";

/// Database container constants
pub mod database {
    /// Logical container name
    pub const CONTAINER_NAME: &str = "rpCheckup-db";

    /// Default Postgres image
    pub const IMAGE: &str = "postgres:13-alpine";

    /// Port Postgres listens on inside the container
    pub const CONTAINER_PORT: u16 = 5432;

    /// Database created by the image on first start
    pub const BOOTSTRAP_DB: &str = "postgres";

    /// Database the introspector imports into
    pub const IMPORT_DB: &str = "introspector";

    /// Container health check command
    pub const HEALTH_CHECK_CMD: &str = "pg_isready";

    pub const ENV_DB: &str = "POSTGRES_DB";
    pub const ENV_USER: &str = "POSTGRES_USER";
    pub const ENV_PASSWORD: &str = "POSTGRES_PASSWORD";
}

/// Introspector container constants
pub mod introspector {
    /// Logical container name
    pub const CONTAINER_NAME: &str = "introspector";

    /// Default introspector image
    pub const IMAGE: &str = "goldfig/introspector:v1";

    /// Entry point every introspector command runs through
    pub const ENTRYPOINT: [&str; 2] = ["python", "introspector.py"];

    pub const ENV_SU_DB_USER: &str = "INTROSPECTOR_SU_DB_USER";
    pub const ENV_SU_DB_PASSWORD: &str = "INTROSPECTOR_SU_DB_PASSWORD";
    pub const ENV_DB_HOST: &str = "INTROSPECTOR_DB_HOST";
    pub const ENV_DB_PORT: &str = "INTROSPECTOR_DB_PORT";
}

/// Report file names
pub mod output {
    pub const CSV_FILE_NAME: &str = "report.csv";
    pub const HTML_FILE_NAME: &str = "index.html";
}

/// Path of the CSV report within an output directory
pub fn csv_report_path(output_dir: &Path) -> PathBuf {
    output_dir.join(output::CSV_FILE_NAME)
}

/// Path of the HTML report within an output directory
pub fn html_report_path(output_dir: &Path) -> PathBuf {
    output_dir.join(output::HTML_FILE_NAME)
}
