//! Run metadata loaded from the most recent import job.

use crate::report::{ReportError, Result};
use chrono::{DateTime, Local, Utc};

/// Organization ID prefix the introspector uses when an account has no organization.
const PLACEHOLDER_ORGANIZATION_PREFIX: &str = "OrgDummy";

/// Rendered in place of a missing organization.
pub const NO_ORGANIZATION: &str = "<NONE>";

/// Raw row returned by the most-recent-import query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRecord {
    pub end_date: DateTime<Utc>,
    pub organization: Option<String>,
    /// An ARN from the imported account
    pub arn: String,
}

/// When the data was imported and the report generated, and for which account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    pub imported_at: DateTime<Local>,
    pub generated_at: DateTime<Local>,
    pub account_id: String,
    pub organization: Option<String>,
}

impl Metadata {
    /// Build metadata from an import record.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Metadata`] if the record's ARN has no account segment.
    pub fn from_import(record: ImportRecord, generated_at: DateTime<Local>) -> Result<Self> {
        let account_id = account_from_arn(&record.arn)
            .ok_or_else(|| {
                ReportError::Metadata(format!("no account ID in ARN {:?}", record.arn))
            })?
            .to_string();

        Ok(Self {
            imported_at: record.end_date.with_timezone(&generated_at.timezone()),
            generated_at,
            account_id,
            organization: normalize_organization(record.organization),
        })
    }

    /// Organization ID, or [`NO_ORGANIZATION`].
    pub fn organization_label(&self) -> &str {
        self.organization.as_deref().unwrap_or(NO_ORGANIZATION)
    }
}

/// Account ID from an ARN: its fifth colon-separated segment.
pub fn account_from_arn(arn: &str) -> Option<&str> {
    arn.split(':').nth(4).filter(|account| !account.is_empty())
}

/// Treat the introspector's placeholder organization as no organization.
pub fn normalize_organization(organization: Option<String>) -> Option<String> {
    organization.filter(|org| {
        !org.is_empty() && !org.starts_with(PLACEHOLDER_ORGANIZATION_PREFIX)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_account_from_arn() {
        assert_eq!(
            account_from_arn("arn:aws:iam::123456789012:role/Foo"),
            Some("123456789012")
        );
        assert_eq!(
            account_from_arn("arn:aws:ec2:us-east-1:111:snapshot/snap-1"),
            Some("111")
        );
        assert_eq!(account_from_arn("arn:aws:s3:::bucket"), None);
        assert_eq!(account_from_arn("not-an-arn"), None);
    }

    #[test]
    fn test_placeholder_organization_is_none() {
        assert_eq!(normalize_organization(Some("OrgDummy-test".to_string())), None);
        assert_eq!(normalize_organization(Some(String::new())), None);
        assert_eq!(normalize_organization(None), None);
        assert_eq!(
            normalize_organization(Some("o-abc123".to_string())),
            Some("o-abc123".to_string())
        );
    }

    #[test]
    fn test_from_import() {
        let generated_at = Local.with_ymd_and_hms(2024, 3, 2, 12, 0, 0).unwrap();
        let end_date = Utc.with_ymd_and_hms(2024, 3, 1, 8, 30, 0).unwrap();
        let record = ImportRecord {
            end_date,
            organization: Some("OrgDummy-test".to_string()),
            arn: "arn:aws:iam::123456789012:role/Foo".to_string(),
        };

        let metadata = Metadata::from_import(record, generated_at).unwrap();

        assert_eq!(metadata.account_id, "123456789012");
        assert_eq!(metadata.organization, None);
        assert_eq!(metadata.organization_label(), NO_ORGANIZATION);
        assert_eq!(metadata.imported_at, end_date);
        assert_eq!(metadata.generated_at, generated_at);
    }

    #[test]
    fn test_from_import_rejects_arn_without_account() {
        let record = ImportRecord {
            end_date: Utc::now(),
            organization: None,
            arn: "arn:aws:s3:::bucket".to_string(),
        };

        let err = Metadata::from_import(record, Local::now()).unwrap_err();
        assert!(matches!(err, ReportError::Metadata(_)));
    }
}
