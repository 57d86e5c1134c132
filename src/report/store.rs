//! Query execution seam.
//!
//! [`ReportStore`] is what the pipeline talks to. The Postgres implementation
//! lives in [`crate::report::postgres`]; tests use an in-memory store.

use crate::report::{ImportRecord, NamedQuery, Result, Row};

/// A row from an auxiliary query, before its service and type are attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuxiliaryRow {
    pub arn: String,
    pub is_public: bool,
    pub in_org_accounts: Vec<String>,
    pub external_accounts: Vec<String>,
}

impl AuxiliaryRow {
    pub fn into_row(self, service: &str, provider_type: &str) -> Row {
        Row {
            arn: self.arn,
            service: service.to_string(),
            provider_type: provider_type.to_string(),
            in_org_accounts: self.in_org_accounts,
            external_accounts: self.external_accounts,
            is_public: self.is_public,
        }
    }
}

/// Source of report data.
#[async_trait::async_trait]
pub trait ReportStore: Send {
    /// Run a multi-statement script, discarding any results.
    async fn execute_script(&mut self, query: &NamedQuery) -> Result<()>;

    /// The most recent import, if any.
    async fn most_recent_import(&mut self, query: &NamedQuery) -> Result<Option<ImportRecord>>;

    /// Rows of the primary exposure query for an account.
    async fn exposure_rows(&mut self, query: &NamedQuery, account_id: &str) -> Result<Vec<Row>>;

    /// Rows of an auxiliary query for an account.
    async fn auxiliary_rows(
        &mut self,
        query: &NamedQuery,
        account_id: &str,
    ) -> Result<Vec<AuxiliaryRow>>;
}
