//! Service container lifecycle.
//!
//! One routine brings up every service container:
//!
//! 1. look up an existing container by the service's logical name
//! 2. adopt it if reuse was requested, reading back its published address
//! 3. otherwise stop and remove it
//! 4. create a fresh container from the [`ServiceDefinition`]
//! 5. start it
//! 6. block until ready, if the definition has a readiness policy
//!
//! Adoption trusts the name: the adopted container's image and environment
//! are not compared against the definition.

use crate::container::health::wait_until_healthy;
use crate::container::{
    ContainerConfig, ContainerDescriptor, ContainerError, ContainerHandle, HealthCheck,
    HealthPolicy, NetworkPolicy, Result, RuntimeSession, ServiceAddress,
};
use std::sync::Arc;
use tracing::{debug, info};

/// Label marking containers created by this tool.
pub const MANAGED_LABEL: &str = "rpcheckup.managed";

/// When a started service counts as ready.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadinessPolicy {
    /// Ready as soon as it is started
    None,
    /// Ready once its health check reports healthy
    HealthPoll(HealthPolicy),
}

/// Everything the lifecycle needs to know about one service.
#[derive(Debug, Clone)]
pub struct ServiceDefinition {
    /// Logical container name; unique per runtime
    pub name: String,
    pub image: String,
    pub env: Vec<(String, String)>,
    pub network: NetworkPolicy,
    pub health_check: Option<HealthCheck>,
    pub readiness: ReadinessPolicy,
    /// Adopt an existing container of the same name instead of replacing it
    pub reuse_existing: bool,
    /// Pull the image if it is not present locally
    pub pull_image: bool,
}

impl ServiceDefinition {
    pub fn new(name: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            image: image.into(),
            env: Vec::new(),
            network: NetworkPolicy::HostNetwork,
            health_check: None,
            readiness: ReadinessPolicy::None,
            reuse_existing: false,
            pull_image: true,
        }
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn network(mut self, network: NetworkPolicy) -> Self {
        self.network = network;
        self
    }

    pub fn health_check(mut self, check: HealthCheck) -> Self {
        self.health_check = Some(check);
        self
    }

    pub fn readiness(mut self, readiness: ReadinessPolicy) -> Self {
        self.readiness = readiness;
        self
    }

    pub fn reuse_existing(mut self, reuse: bool) -> Self {
        self.reuse_existing = reuse;
        self
    }

    pub fn pull_image(mut self, pull: bool) -> Self {
        self.pull_image = pull;
        self
    }

    /// Container configuration for a fresh container, plus the host address
    /// allocated for it when the network policy publishes a port.
    pub fn container_config(&self) -> Result<(ContainerConfig, Option<ServiceAddress>)> {
        let mut builder = ContainerConfig::builder()
            .image(&self.image)
            .envs(self.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .label(MANAGED_LABEL, "true");

        if let Some(check) = &self.health_check {
            builder = builder.health_check(check.clone());
        }

        let (builder, address) = self.network.apply(builder)?;
        Ok((builder.build()?, address))
    }
}

/// A running service container.
#[derive(Debug, Clone)]
pub struct ServiceInstance {
    pub handle: ContainerHandle,
    /// Published address, for services with a published port
    pub address: Option<ServiceAddress>,
    /// Whether an existing container was adopted rather than created
    pub adopted: bool,
}

/// Bring a service up according to its definition.
///
/// # Errors
///
/// Fails on a name conflict, image pull failure, any create/start error, or
/// a readiness timeout. Nothing is cleaned up on failure.
pub async fn bring_up(
    session: &Arc<RuntimeSession>,
    definition: &ServiceDefinition,
) -> Result<ServiceInstance> {
    if definition.pull_image {
        session.ensure_image_present(&definition.image).await?;
    }

    let existing = session.find_container(&definition.name).await?;

    let instance = match existing {
        Some(container) if definition.reuse_existing => {
            info!(
                "Reusing existing container {} ({})",
                definition.name, container.id
            );
            adopt(session, definition, container).await?
        }
        Some(container) => {
            info!(
                "Replacing existing container {} ({})",
                definition.name, container.id
            );
            session.stop_and_remove(&container.id).await?;
            create(session, definition).await?
        }
        None => create(session, definition).await?,
    };

    if let ReadinessPolicy::HealthPoll(policy) = &definition.readiness {
        info!("Waiting for {} to be healthy", definition.name);
        wait_until_healthy(session, instance.handle.id(), policy).await?;
    }

    Ok(instance)
}

async fn create(
    session: &Arc<RuntimeSession>,
    definition: &ServiceDefinition,
) -> Result<ServiceInstance> {
    session.check_cancelled()?;

    let (config, address) = definition.container_config()?;
    let container_id = session
        .runtime()
        .create_container(&definition.name, &config)
        .await?;
    session.runtime().start_container(&container_id).await?;

    info!(
        "Started {} container {}",
        definition.name,
        container_id.get(..12).unwrap_or(&container_id)
    );

    Ok(ServiceInstance {
        handle: ContainerHandle::new(container_id, session.clone()),
        address,
        adopted: false,
    })
}

async fn adopt(
    session: &Arc<RuntimeSession>,
    definition: &ServiceDefinition,
    container: ContainerDescriptor,
) -> Result<ServiceInstance> {
    let address = match &definition.network {
        NetworkPolicy::PublishedPort { container_port, .. } => {
            let details = session.runtime().inspect_container(&container.id).await?;
            let address = details
                .port_bindings
                .get(container_port)
                .and_then(|bindings| bindings.first().cloned())
                .ok_or_else(|| {
                    ContainerError::Config(format!(
                        "Existing container {} does not publish {}",
                        definition.name, container_port
                    ))
                })?;
            Some(address)
        }
        NetworkPolicy::HostNetwork => None,
    };

    if !container.is_running() {
        debug!("Starting stopped container {}", container.id);
        session.runtime().start_container(&container.id).await?;
    }

    Ok(ServiceInstance {
        handle: ContainerHandle::new(container.id, session.clone()),
        address,
        adopted: true,
    })
}
