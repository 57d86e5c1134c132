//! Report rows and access classification.

use serde::Serialize;
use std::fmt;

/// Who a resource's policy lets in, most exposed first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum AccessLevel {
    Public,
    ExternalAccounts,
    InOrgAccounts,
    Private,
}

impl AccessLevel {
    /// Every level, in report order.
    pub const ALL: [AccessLevel; 4] = [
        AccessLevel::Public,
        AccessLevel::ExternalAccounts,
        AccessLevel::InOrgAccounts,
        AccessLevel::Private,
    ];

    /// Label used in rendered reports.
    pub fn label(self) -> &'static str {
        match self {
            AccessLevel::Public => "Public",
            AccessLevel::ExternalAccounts => "External Accounts",
            AccessLevel::InOrgAccounts => "In-Org Accounts",
            AccessLevel::Private => "Private",
        }
    }

    /// Highlight color for the HTML report.
    pub fn color(self) -> &'static str {
        match self {
            AccessLevel::Public => "red",
            AccessLevel::ExternalAccounts => "orange",
            AccessLevel::InOrgAccounts => "yellow",
            AccessLevel::Private => "green",
        }
    }

    /// Classify a resource from its exposure fields.
    ///
    /// Public wins over external accounts, which win over in-org accounts.
    pub fn classify(is_public: bool, external_accounts: &[String], in_org_accounts: &[String]) -> Self {
        if is_public {
            AccessLevel::Public
        } else if !external_accounts.is_empty() {
            AccessLevel::ExternalAccounts
        } else if !in_org_accounts.is_empty() {
            AccessLevel::InOrgAccounts
        } else {
            AccessLevel::Private
        }
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One resource with a resource policy, and who that policy admits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Row {
    pub arn: String,
    pub service: String,
    pub provider_type: String,
    pub in_org_accounts: Vec<String>,
    pub external_accounts: Vec<String>,
    pub is_public: bool,
}

impl Row {
    pub fn access(&self) -> AccessLevel {
        AccessLevel::classify(self.is_public, &self.external_accounts, &self.in_org_accounts)
    }
}

/// Order rows by access level, then ARN. Stable: rows equal on both keep
/// their input order.
pub fn sort_rows(rows: &mut [Row]) {
    rows.sort_by(|a, b| {
        a.access()
            .cmp(&b.access())
            .then_with(|| a.arn.cmp(&b.arn))
    });
}
