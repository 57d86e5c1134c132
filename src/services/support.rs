//! Services and resource types handed to the introspector's import.

use std::fmt;

/// Ordered map of AWS service to the resource types imported for it.
///
/// A service with no type list is imported in full.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupportTable {
    entries: Vec<(String, Option<Vec<String>>)>,
}

impl Default for SupportTable {
    fn default() -> Self {
        Self::empty()
            .resources("iam", ["role"])
            .resources("glacier", ["Vault"])
            .resources("efs", ["FileSystem"])
            .service("organizations")
            .resources("kms", ["Key"])
            .resources("apigateway", ["RestApi"])
            .resources("ecr", ["Repository"])
            .resources("es", ["Domain"])
            .resources("ec2", ["Images", "Snapshots"])
            .resources("lambda", ["Alias", "Function", "LayerVersion"])
            .resources("rds", ["DBSnapshot", "DBClusterSnapshot"])
            .resources("s3", ["Bucket"])
            .resources("secretsmanager", ["Secret"])
            .resources("ses", ["Identity"])
            .resources("sns", ["Topic"])
            .resources("sqs", ["Queue"])
    }
}

impl SupportTable {
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Import every resource type of `service`.
    pub fn service(mut self, service: impl Into<String>) -> Self {
        self.entries.push((service.into(), None));
        self
    }

    /// Import only the listed resource types of `service`.
    pub fn resources<I, S>(mut self, service: impl Into<String>, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let types: Vec<String> = types.into_iter().map(Into::into).collect();
        let types = (!types.is_empty()).then_some(types);
        self.entries.push((service.into(), types));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Render as `service=Type,Type;service;...`, in insertion order.
    pub fn service_spec(&self) -> String {
        self.entries
            .iter()
            .map(|(service, types)| match types {
                Some(types) => format!("{}={}", service, types.join(",")),
                None => service.clone(),
            })
            .collect::<Vec<_>>()
            .join(";")
    }
}

impl fmt::Display for SupportTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.service_spec())
    }
}
