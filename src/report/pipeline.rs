//! Report generation.

use crate::report::postgres::PgReportStore;
use crate::report::queries::{
    AUXILIARY_QUERIES, AuxiliaryQuery, FUNCTIONS, MOST_RECENT_IMPORT, RESOURCE_POLICY_EXPOSURE,
};
use crate::report::{Metadata, Report, ReportError, ReportStore, Result, sort_rows};
use chrono::{DateTime, Local};
use tracing::{debug, info, warn};

/// Runs the bundled queries against an imported database and builds a [`Report`].
#[derive(Debug, Clone)]
pub struct ReportPipeline {
    auxiliaries: Vec<AuxiliaryQuery>,
}

impl Default for ReportPipeline {
    fn default() -> Self {
        Self::new(AUXILIARY_QUERIES.to_vec())
    }
}

impl ReportPipeline {
    pub fn new(auxiliaries: Vec<AuxiliaryQuery>) -> Self {
        Self { auxiliaries }
    }

    /// Connect to the database and generate a report from its latest import.
    ///
    /// # Errors
    ///
    /// See [`ReportPipeline::run`]; also fails if the connection cannot be opened.
    pub async fn generate(&self, connection_string: &str) -> Result<Report> {
        let mut store = PgReportStore::connect(connection_string).await?;
        let report = self.run(&mut store, Local::now()).await;
        if let Err(e) = store.close().await {
            warn!("Failed to close report connection: {}", e);
        }
        report
    }

    /// Generate a report using an open store.
    ///
    /// Installs the helper functions, reads the latest import's metadata,
    /// then collects the primary and auxiliary rows for that account. Rows
    /// are sorted by access level, then ARN.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::NoImportData`] if nothing has been imported,
    /// and any query or metadata error.
    pub async fn run<S>(&self, store: &mut S, generated_at: DateTime<Local>) -> Result<Report>
    where
        S: ReportStore + ?Sized,
    {
        store.execute_script(&FUNCTIONS).await?;

        let record = store
            .most_recent_import(&MOST_RECENT_IMPORT)
            .await?
            .ok_or(ReportError::NoImportData)?;
        let metadata = Metadata::from_import(record, generated_at)?;
        info!(
            "Reporting on account {} (organization {})",
            metadata.account_id,
            metadata.organization_label()
        );

        let mut rows = store
            .exposure_rows(&RESOURCE_POLICY_EXPOSURE, &metadata.account_id)
            .await?;
        debug!("{} resource policy rows", rows.len());

        for aux in &self.auxiliaries {
            let extra = store
                .auxiliary_rows(&aux.query, &metadata.account_id)
                .await?;
            debug!("{} rows from {}", extra.len(), aux.query.name);
            rows.extend(
                extra
                    .into_iter()
                    .map(|row| row.into_row(aux.service, aux.provider_type)),
            );
        }

        sort_rows(&mut rows);
        Ok(Report { metadata, rows })
    }
}
