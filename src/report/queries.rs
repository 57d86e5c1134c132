//! Bundled SQL resources.
//!
//! Query text ships inside the binary. The functions script must run before
//! any other query, since they call the helpers it defines.

/// A SQL resource and the name it is referred to by in logs and errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NamedQuery {
    pub name: &'static str,
    pub sql: &'static str,
}

/// Helper functions the other queries depend on. Idempotent.
pub const FUNCTIONS: NamedQuery = NamedQuery {
    name: "functions",
    sql: include_str!("../../queries/functions.sql"),
};

/// End date, organization, and an ARN from the most recent completed import.
pub const MOST_RECENT_IMPORT: NamedQuery = NamedQuery {
    name: "most_recent_import",
    sql: include_str!("../../queries/most_recent_import.sql"),
};

/// One row per resource with a resource policy, for account `$1`.
pub const RESOURCE_POLICY_EXPOSURE: NamedQuery = NamedQuery {
    name: "resource_policy_exposure",
    sql: include_str!("../../queries/resource_policy_exposure.sql"),
};

/// A query covering resources shared through attributes instead of policies.
///
/// Its rows carry no service or type columns, so those are attached from here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuxiliaryQuery {
    pub query: NamedQuery,
    pub service: &'static str,
    pub provider_type: &'static str,
}

/// Auxiliary queries, in the order their rows are appended to a report.
pub const AUXILIARY_QUERIES: [AuxiliaryQuery; 4] = [
    AuxiliaryQuery {
        query: NamedQuery {
            name: "public_ec2_snapshots",
            sql: include_str!("../../queries/public_ec2_snapshots.sql"),
        },
        service: "ec2",
        provider_type: "Snapshot",
    },
    AuxiliaryQuery {
        query: NamedQuery {
            name: "public_ec2_images",
            sql: include_str!("../../queries/public_ec2_images.sql"),
        },
        service: "ec2",
        provider_type: "Image",
    },
    AuxiliaryQuery {
        query: NamedQuery {
            name: "public_rds_snapshots",
            sql: include_str!("../../queries/public_rds_snapshots.sql"),
        },
        service: "rds",
        provider_type: "DBSnapshot",
    },
    AuxiliaryQuery {
        query: NamedQuery {
            name: "public_rds_cluster_snapshots",
            sql: include_str!("../../queries/public_rds_cluster_snapshots.sql"),
        },
        service: "rds",
        provider_type: "DBClusterSnapshot",
    },
];
