//! Docker/Podman client.
//!
//! [`DockerRuntime`] implements [`ContainerRuntime`] over the bollard Docker
//! API, connecting from the ambient environment with API version negotiation.

use crate::container::{
    ContainerConfig, ContainerDescriptor, ContainerDetails, ContainerError, ContainerRuntime,
    ExecAttachment, ExecConfig, ExecState, HealthStatus, OutputChunk, Result,
    ServiceAddress,
};
use bollard::Docker;
use bollard::container::LogOutput;
use bollard::exec::{CreateExecOptions, StartExecResults};
use bollard::models::HealthStatusEnum;
use futures::future;
use futures::stream::StreamExt;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Seconds the runtime waits for a container to stop before killing it.
const STOP_TIMEOUT_SECS: i64 = 10;

/// Docker/Podman API client.
#[derive(Clone)]
pub struct DockerRuntime {
    docker: Arc<Docker>,
}

impl DockerRuntime {
    /// Connect to the runtime named by the environment (`DOCKER_HOST` or the
    /// platform's local socket) and negotiate the API version.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::Environment`] if no runtime answers.
    pub async fn connect() -> Result<Self> {
        debug!("Attempting to connect to container runtime...");

        let docker = Docker::connect_with_defaults()
            .map_err(|e| ContainerError::Environment(format!("Failed to create docker client: {}", e)))?
            .negotiate_version()
            .await
            .map_err(|e| {
                ContainerError::Environment(format!("Failed to negotiate API version: {}", e))
            })?;

        let runtime = Self {
            docker: Arc::new(docker),
        };
        runtime.ping().await?;

        info!("Connected to container runtime");
        Ok(runtime)
    }

    /// Ping the container runtime to verify connectivity.
    ///
    /// # Errors
    ///
    /// Returns error if ping fails.
    pub async fn ping(&self) -> Result<()> {
        self.docker.ping().await.map_err(|e| {
            ContainerError::Environment(format!("Failed to ping container runtime: {}", e))
        })?;
        debug!("Container runtime ping successful");
        Ok(())
    }
}

fn health_status(status: Option<HealthStatusEnum>) -> HealthStatus {
    match status {
        Some(HealthStatusEnum::HEALTHY) => HealthStatus::Healthy,
        Some(HealthStatusEnum::UNHEALTHY) => HealthStatus::Unhealthy,
        Some(HealthStatusEnum::STARTING) => HealthStatus::Starting,
        _ => HealthStatus::None,
    }
}

fn output_chunk(log: LogOutput) -> Option<OutputChunk> {
    match log {
        LogOutput::StdOut { message } | LogOutput::Console { message } => Some(
            OutputChunk::Stdout(String::from_utf8_lossy(&message).into_owned()),
        ),
        LogOutput::StdErr { message } => Some(OutputChunk::Stderr(
            String::from_utf8_lossy(&message).into_owned(),
        )),
        LogOutput::StdIn { .. } => None,
    }
}

#[async_trait::async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn list_containers_named(&self, name: &str) -> Result<Vec<ContainerDescriptor>> {
        let mut filters = HashMap::new();
        filters.insert("name".to_string(), vec![format!("/{}", name)]);

        let containers = self
            .docker
            .list_containers(Some(bollard::container::ListContainersOptions {
                all: true,
                filters,
                ..Default::default()
            }))
            .await?;

        Ok(containers
            .into_iter()
            .map(|c| ContainerDescriptor {
                id: c.id.unwrap_or_default(),
                names: c.names.unwrap_or_default(),
                image: c.image.unwrap_or_default(),
                state: c.state.map(|s| s.to_string()).unwrap_or_default(),
            })
            .collect())
    }

    async fn inspect_container(&self, id: &str) -> Result<ContainerDetails> {
        let inspect = self
            .docker
            .inspect_container(id, None::<bollard::query_parameters::InspectContainerOptions>)
            .await?;

        let health = health_status(
            inspect
                .state
                .and_then(|state| state.health)
                .and_then(|health| health.status),
        );

        let port_bindings = inspect
            .host_config
            .and_then(|host| host.port_bindings)
            .unwrap_or_default()
            .into_iter()
            .map(|(port, bindings)| {
                let addresses = bindings
                    .unwrap_or_default()
                    .into_iter()
                    .filter_map(|b| {
                        let host_port = b.host_port?.parse().ok()?;
                        Some(ServiceAddress::new(b.host_ip.unwrap_or_default(), host_port))
                    })
                    .collect();
                (port, addresses)
            })
            .collect();

        Ok(ContainerDetails {
            id: inspect.id.unwrap_or_else(|| id.to_string()),
            health,
            port_bindings,
        })
    }

    async fn create_container(&self, name: &str, config: &ContainerConfig) -> Result<String> {
        use bollard::container::Config as BollardConfig;

        let options = bollard::container::CreateContainerOptions {
            name,
            ..Default::default()
        };

        let exposed_ports = if config.exposed_ports.is_empty() {
            None
        } else {
            Some(
                config
                    .exposed_ports
                    .iter()
                    .map(|port| (port.clone(), HashMap::new()))
                    .collect(),
            )
        };

        let bollard_config = BollardConfig {
            image: Some(config.image.clone()),
            env: config.env.clone(),
            labels: config.labels.clone(),
            exposed_ports,
            healthcheck: config.health_check.as_ref().map(|h| h.to_bollard()),
            host_config: Some(config.host_config.clone()),
            ..Default::default()
        };

        let response = self
            .docker
            .create_container(Some(options), bollard_config)
            .await?;

        info!("Created container: {} ({})", name, response.id);
        Ok(response.id)
    }

    async fn start_container(&self, id: &str) -> Result<()> {
        self.docker
            .start_container(id, None::<bollard::container::StartContainerOptions<String>>)
            .await?;
        debug!("Started container: {}", id);
        Ok(())
    }

    async fn stop_container(&self, id: &str) -> Result<()> {
        self.docker
            .stop_container(
                id,
                Some(bollard::container::StopContainerOptions {
                    t: STOP_TIMEOUT_SECS,
                }),
            )
            .await?;
        debug!("Stopped container: {}", id);
        Ok(())
    }

    async fn remove_container(&self, id: &str) -> Result<()> {
        self.docker
            .remove_container(
                id,
                Some(bollard::container::RemoveContainerOptions {
                    v: false,
                    ..Default::default()
                }),
            )
            .await?;
        debug!("Removed container: {}", id);
        Ok(())
    }

    async fn list_images(&self, reference: &str) -> Result<Vec<String>> {
        let mut filters = HashMap::new();
        filters.insert("reference".to_string(), vec![reference.to_string()]);

        let images = self
            .docker
            .list_images(Some(bollard::image::ListImagesOptions::<String> {
                filters,
                ..Default::default()
            }))
            .await?;

        Ok(images.into_iter().map(|img| img.id).collect())
    }

    async fn pull_image(&self, reference: &str) -> Result<()> {
        let mut stream = self.docker.create_image(
            Some(bollard::image::CreateImageOptions {
                from_image: reference,
                ..Default::default()
            }),
            None,
            None,
        );

        while let Some(result) = stream.next().await {
            let info = result?;
            if let Some(error) = info.error {
                return Err(ContainerError::ImagePull {
                    image: reference.to_string(),
                    message: error,
                });
            }
            if let Some(status) = info.status {
                debug!("Pull status: {}", status);
            }
            if let Some(progress) = info.progress {
                debug!("Pull progress: {}", progress);
            }
        }

        Ok(())
    }

    async fn start_exec(&self, container_id: &str, config: &ExecConfig) -> Result<ExecAttachment> {
        let exec_options = CreateExecOptions {
            cmd: Some(config.cmd().to_vec()),
            env: if config.env().is_empty() {
                None
            } else {
                Some(config.env().to_vec())
            },
            attach_stdin: Some(config.attaches_stdin()),
            attach_stdout: Some(true),
            attach_stderr: Some(true),
            ..Default::default()
        };

        let exec = self.docker.create_exec(container_id, exec_options).await?;

        match self.docker.start_exec(&exec.id, None).await? {
            StartExecResults::Attached { output, .. } => {
                let output = output
                    .filter_map(|item| {
                        future::ready(match item {
                            Ok(log) => output_chunk(log).map(Ok),
                            Err(e) => Some(Err(ContainerError::Api(e))),
                        })
                    })
                    .boxed();
                Ok(ExecAttachment {
                    exec_id: exec.id,
                    output,
                })
            }
            StartExecResults::Detached => Err(ContainerError::ImportCommand {
                command: config.cmd().join(" "),
                message: "Unexpected detached execution".to_string(),
            }),
        }
    }

    async fn inspect_exec(&self, exec_id: &str) -> Result<ExecState> {
        let inspect = self.docker.inspect_exec(exec_id).await?;
        Ok(ExecState {
            running: inspect.running.unwrap_or(false),
            exit_code: inspect.exit_code,
        })
    }
}
