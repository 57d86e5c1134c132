//! Introspector tool service.
//!
//! The introspector runs on the host network next to the database container
//! and is driven entirely through exec'd commands.

use crate::container::executor::{self, ExecConfig, OutputMode};
use crate::container::lifecycle::{self, ServiceDefinition};
use crate::container::{ContainerError, ContainerHandle, NetworkPolicy, Result, RuntimeSession};
use crate::env::introspector;
use crate::services::DatabaseService;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// Introspector settings; the `[introspector]` config section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolOptions {
    pub image: String,
    pub container_name: String,
}

impl Default for ToolOptions {
    fn default() -> Self {
        Self {
            image: introspector::IMAGE.to_string(),
            container_name: introspector::CONTAINER_NAME.to_string(),
        }
    }
}

impl ToolOptions {
    /// Lifecycle definition for the tool container, wired to `database`.
    ///
    /// The tool never reuses an existing container.
    pub fn definition(&self, database: &DatabaseService, pull_image: bool) -> ServiceDefinition {
        let credential = database.superuser_credential();
        let address = database.address();

        ServiceDefinition::new(&self.container_name, &self.image)
            .env(introspector::ENV_SU_DB_USER, &credential.username)
            .env(introspector::ENV_SU_DB_PASSWORD, &credential.password)
            .env(introspector::ENV_DB_HOST, &address.host_ip)
            .env(introspector::ENV_DB_PORT, address.host_port.to_string())
            .network(NetworkPolicy::HostNetwork)
            .reuse_existing(false)
            .pull_image(pull_image)
    }
}

/// A running introspector container.
#[derive(Debug)]
pub struct ToolService {
    handle: ContainerHandle,
    output: OutputMode,
}

impl ToolService {
    /// Create and start the tool container, replacing any existing one.
    ///
    /// With `pull_image` false the image must already exist locally.
    pub async fn start(
        session: &Arc<RuntimeSession>,
        options: &ToolOptions,
        database: &DatabaseService,
        pull_image: bool,
        output: OutputMode,
    ) -> Result<Self> {
        info!("Checking for introspector image {}", options.image);
        let definition = options.definition(database, pull_image);
        debug!(
            "Introspector database at {}:{}",
            database.address().host_ip,
            database.address().host_port
        );

        let instance = lifecycle::bring_up(session, &definition).await?;
        Ok(Self {
            handle: instance.handle,
            output,
        })
    }

    pub fn handle(&self) -> &ContainerHandle {
        &self.handle
    }

    /// Run `introspector.py init`.
    pub async fn initialize(&self) -> Result<()> {
        info!("Initializing introspector");
        self.run_command(&["init"], &[]).await
    }

    /// Import AWS resources for the services in `service_spec`.
    ///
    /// `env_overrides` are set for this command only; `service_spec` is passed
    /// as a single argument.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::ImportCommand`] if the import cannot be run,
    /// exits non-zero, or finishes without an exit code.
    pub async fn run_import(
        &self,
        env_overrides: &[(String, String)],
        service_spec: &str,
    ) -> Result<()> {
        self.run_command(
            &[
                "account",
                "aws",
                "import",
                "--force",
                "--service",
                service_spec,
            ],
            env_overrides,
        )
        .await
    }

    async fn run_command(&self, args: &[&str], env: &[(String, String)]) -> Result<()> {
        let config = command(args, env);
        let outcome =
            executor::execute(self.handle.session(), self.handle.id(), &config, self.output)
                .await
                .map_err(|e| match e {
                    ContainerError::Cancelled | ContainerError::ImportCommand { .. } => e,
                    other => ContainerError::ImportCommand {
                        command: config.display_cmd(),
                        message: other.to_string(),
                    },
                })?;

        if outcome.success() {
            return Ok(());
        }
        Err(ContainerError::ImportCommand {
            command: config.display_cmd(),
            message: match outcome.exit_code {
                Some(code) => format!("exited with code {}", code),
                None => "no exit code reported".to_string(),
            },
        })
    }

    /// Stop and remove the container.
    pub async fn shut_down(self) -> Result<()> {
        info!("Shutting down introspector");
        self.handle.shut_down().await
    }
}

fn command(args: &[&str], env: &[(String, String)]) -> ExecConfig {
    ExecConfig::builder()
        .cmd(introspector::ENTRYPOINT.iter().chain(args.iter()).copied())
        .envs(env)
        .attach_stdin(true)
        .build()
}
