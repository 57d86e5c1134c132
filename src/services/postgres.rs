//! Postgres database service.
//!
//! Runs Postgres in a container with its port published on a free loopback
//! port, and waits for the container health check to pass.

use crate::container::lifecycle::{self, ReadinessPolicy, ServiceDefinition};
use crate::container::{
    ContainerError, ContainerHandle, HealthCheck, HealthPolicy, NetworkPolicy, Result,
    RuntimeSession, ServiceAddress,
};
use crate::env::database;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::info;

/// Database login.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub username: String,
    pub password: String,
}

impl Credential {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// The Postgres superuser the container is initialized with.
    pub fn superuser() -> Self {
        Self::new("postgres", "postgres")
    }

    /// The role the introspector creates for itself during `init`.
    pub fn importer() -> Self {
        Self::new("introspector", "introspector")
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Database service settings; the `[database]` config section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseOptions {
    pub image: String,
    pub container_name: String,
    pub superuser: Credential,
    pub importer: Credential,
    pub health: HealthPolicy,
}

impl Default for DatabaseOptions {
    fn default() -> Self {
        Self {
            image: database::IMAGE.to_string(),
            container_name: database::CONTAINER_NAME.to_string(),
            superuser: Credential::superuser(),
            importer: Credential::importer(),
            health: HealthPolicy::default(),
        }
    }
}

impl DatabaseOptions {
    /// Lifecycle definition for the database container.
    pub fn definition(&self, reuse_existing: bool) -> ServiceDefinition {
        ServiceDefinition::new(&self.container_name, &self.image)
            .env(database::ENV_DB, database::BOOTSTRAP_DB)
            .env(database::ENV_USER, &self.superuser.username)
            .env(database::ENV_PASSWORD, &self.superuser.password)
            .network(NetworkPolicy::published_tcp(database::CONTAINER_PORT))
            .health_check(HealthCheck::cmd([database::HEALTH_CHECK_CMD]))
            .readiness(ReadinessPolicy::HealthPoll(self.health))
            .reuse_existing(reuse_existing)
    }
}

/// A running, healthy Postgres container.
#[derive(Debug)]
pub struct DatabaseService {
    handle: ContainerHandle,
    address: ServiceAddress,
    superuser: Credential,
    adopted: bool,
}

impl DatabaseService {
    /// Bring the database up, adopting an existing container if `reuse_existing`.
    ///
    /// # Errors
    ///
    /// Returns any lifecycle error; [`ContainerError::Config`] if the
    /// container ends up without a published address.
    pub async fn start(
        session: &Arc<RuntimeSession>,
        options: &DatabaseOptions,
        reuse_existing: bool,
    ) -> Result<Self> {
        let definition = options.definition(reuse_existing);
        let instance = lifecycle::bring_up(session, &definition).await?;

        let address = instance.address.ok_or_else(|| {
            ContainerError::Config(format!(
                "Database container {} has no published address",
                definition.name
            ))
        })?;
        info!("Postgres is available at {}", address);

        Ok(Self {
            handle: instance.handle,
            address,
            superuser: options.superuser.clone(),
            adopted: instance.adopted,
        })
    }

    pub fn address(&self) -> &ServiceAddress {
        &self.address
    }

    pub fn superuser_credential(&self) -> &Credential {
        &self.superuser
    }

    pub fn handle(&self) -> &ContainerHandle {
        &self.handle
    }

    /// Whether an existing container was reused.
    pub fn was_adopted(&self) -> bool {
        self.adopted
    }

    /// libpq-style connection string for the import database.
    pub fn connection_string(&self, credential: &Credential) -> String {
        connection_string(&self.address, credential)
    }

    /// Stop and remove the container.
    pub async fn shut_down(self) -> Result<()> {
        info!("Shutting down Postgres");
        self.handle.shut_down().await
    }
}

/// `host=.. port=.. user=.. password=.. dbname=introspector sslmode=disable`
///
/// User and password are quoted when they contain whitespace, quotes or
/// backslashes.
pub fn connection_string(address: &ServiceAddress, credential: &Credential) -> String {
    format!(
        "host={} port={} user={} password={} dbname={} sslmode=disable",
        address.host_ip,
        address.host_port,
        quote_value(&credential.username),
        quote_value(&credential.password),
        database::IMPORT_DB
    )
}

/// Quote a connection string value the way libpq reads it back.
fn quote_value(value: &str) -> String {
    let plain = !value.is_empty()
        && !value
            .chars()
            .any(|c| c.is_whitespace() || c == '\'' || c == '\\');
    if plain {
        return value.to_string();
    }

    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('\'');
    for c in value.chars() {
        if c == '\'' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('\'');
    quoted
}
