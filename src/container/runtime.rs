//! The container runtime seam.
//!
//! [`ContainerRuntime`] is the narrow slice of the Docker API the audit needs.
//! [`DockerRuntime`](super::DockerRuntime) implements it over bollard; tests
//! substitute a scripted runtime.

use crate::container::{ContainerConfig, ExecConfig, Result};
use futures::stream::BoxStream;
use std::collections::HashMap;
use std::fmt;

/// A container as reported by a list call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerDescriptor {
    /// Container ID
    pub id: String,
    /// Container names, as reported by the runtime (usually with a leading `/`)
    pub names: Vec<String>,
    /// Image reference the container was created from
    pub image: String,
    /// Runtime state (`running`, `exited`, ...)
    pub state: String,
}

impl ContainerDescriptor {
    /// Whether one of this container's names is exactly `name`.
    pub fn has_name(&self, name: &str) -> bool {
        self.names
            .iter()
            .any(|n| n.strip_prefix('/').unwrap_or(n) == name)
    }

    /// Whether the runtime reports the container as running.
    pub fn is_running(&self) -> bool {
        self.state.eq_ignore_ascii_case("running")
    }
}

/// Health status of a container with a health check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    /// The container defines no health check
    None,
    /// Health check has not passed yet
    Starting,
    /// Health check passing
    Healthy,
    /// Health check failing
    Unhealthy,
}

/// The parts of a container inspection the lifecycle reads back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerDetails {
    pub id: String,
    pub health: HealthStatus,
    /// Published ports keyed by `<port>/<proto>`
    pub port_bindings: HashMap<String, Vec<ServiceAddress>>,
}

/// Host-side address of a published container port.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServiceAddress {
    pub host_ip: String,
    pub host_port: u16,
}

impl ServiceAddress {
    pub fn new(host_ip: impl Into<String>, host_port: u16) -> Self {
        Self {
            host_ip: host_ip.into(),
            host_port,
        }
    }
}

impl fmt::Display for ServiceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host_ip, self.host_port)
    }
}

/// One demultiplexed chunk of exec output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputChunk {
    Stdout(String),
    Stderr(String),
}

/// Output of an attached exec. Ends when the command's streams close.
pub type OutputStream = BoxStream<'static, Result<OutputChunk>>;

/// A started exec with its attached output.
pub struct ExecAttachment {
    pub exec_id: String,
    pub output: OutputStream,
}

/// Completion state of an exec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecState {
    pub running: bool,
    pub exit_code: Option<i64>,
}

/// Control-plane operations used by the lifecycle and executor.
#[async_trait::async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// List containers, running or not, whose name matches `name`.
    ///
    /// The match may be fuzzy (Docker's name filter is a substring match);
    /// callers narrow it down with [`ContainerDescriptor::has_name`].
    async fn list_containers_named(&self, name: &str) -> Result<Vec<ContainerDescriptor>>;

    async fn inspect_container(&self, id: &str) -> Result<ContainerDetails>;

    /// Create a container and return its ID.
    async fn create_container(&self, name: &str, config: &ContainerConfig) -> Result<String>;

    async fn start_container(&self, id: &str) -> Result<()>;

    async fn stop_container(&self, id: &str) -> Result<()>;

    /// Remove a container, keeping its volumes.
    async fn remove_container(&self, id: &str) -> Result<()>;

    /// IDs of local images matching `reference`.
    async fn list_images(&self, reference: &str) -> Result<Vec<String>>;

    /// Pull an image, returning once the progress stream is fully drained.
    async fn pull_image(&self, reference: &str) -> Result<()>;

    /// Create and start an exec, attached to its output.
    async fn start_exec(&self, container_id: &str, config: &ExecConfig) -> Result<ExecAttachment>;

    /// Whether an exec is still running, and its exit code once it is not.
    async fn inspect_exec(&self, exec_id: &str) -> Result<ExecState>;
}
