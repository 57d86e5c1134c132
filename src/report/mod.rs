//! Access report generation.
//!
//! Queries the introspector's database for resources whose policies or
//! sharing attributes grant access beyond the owning account, and classifies
//! each into an [`AccessLevel`].
//!
//! # Example
//!
//! ```rust,no_run
//! use rpcheckup::report::ReportPipeline;
//!
//! # async fn example() -> rpcheckup::report::Result<()> {
//! let dsn = "host=127.0.0.1 port=5432 user=postgres password=pw dbname=introspector sslmode=disable";
//! let report = ReportPipeline::default().generate(dsn).await?;
//! println!("{} rows for {}", report.rows.len(), report.metadata.account_id);
//! # Ok(())
//! # }
//! ```

pub mod metadata;
pub mod pipeline;
pub mod postgres;
pub mod queries;
pub mod row;
pub mod store;

pub use metadata::{ImportRecord, Metadata, NO_ORGANIZATION, account_from_arn};
pub use pipeline::ReportPipeline;
pub use postgres::PgReportStore;
pub use queries::{AuxiliaryQuery, NamedQuery};
pub use row::{AccessLevel, Row, sort_rows};
pub use store::{AuxiliaryRow, ReportStore};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Database connection failed: {0}")]
    Connection(String),

    #[error("No import data found")]
    NoImportData,

    #[error("Query {query} failed: {source}")]
    Query {
        query: &'static str,
        #[source]
        source: sqlx::Error,
    },

    #[error("Invalid import metadata: {0}")]
    Metadata(String),
}

pub type Result<T> = std::result::Result<T, ReportError>;

/// A generated report: metadata plus rows ordered by access level, then ARN.
#[derive(Debug, Clone)]
pub struct Report {
    pub metadata: Metadata,
    pub rows: Vec<Row>,
}

impl Report {
    /// Rows at one access level, in report order.
    pub fn rows_at(&self, level: AccessLevel) -> impl Iterator<Item = &Row> {
        self.rows.iter().filter(move |row| row.access() == level)
    }

    /// Number of rows at each level, in [`AccessLevel::ALL`] order.
    pub fn counts(&self) -> [(AccessLevel, usize); 4] {
        AccessLevel::ALL.map(|level| (level, self.rows_at(level).count()))
    }
}
