//! Container orchestration layer.
//!
//! Brings the audit's helper services up as named Docker/Podman containers
//! via the bollard API and tears them down again. Everything here runs on a
//! single [`RuntimeSession`] per process.
//!
//! ## Architecture
//!
//! - [`runtime`]: the [`ContainerRuntime`] seam and the data it exchanges
//! - [`client`]: bollard-backed [`DockerRuntime`]
//! - [`session`]: [`RuntimeSession`] and [`ContainerHandle`]
//! - [`config`]: container configuration builder
//! - [`network`]: network policies and host port allocation
//! - [`health`]: fixed-interval health polling
//! - [`lifecycle`]: the discover → reuse-or-replace → create → start → ready routine
//! - [`executor`]: command execution with streamed output and cancellation
//!
//! ## Usage
//!
//! ```rust,no_run
//! use rpcheckup::container::{
//!     lifecycle, NetworkPolicy, ReadinessPolicy, RuntimeSession, ServiceDefinition,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let session = RuntimeSession::open().await?;
//!
//!     let definition = ServiceDefinition::new("scratch", "alpine:3.20")
//!         .network(NetworkPolicy::HostNetwork)
//!         .readiness(ReadinessPolicy::None);
//!
//!     let service = lifecycle::bring_up(&session, &definition).await?;
//!     service.handle.shut_down().await?;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod executor;
pub mod health;
pub mod lifecycle;
pub mod network;
pub mod runtime;
pub mod session;

pub use client::DockerRuntime;
pub use config::{ContainerConfig, ContainerConfigBuilder, HealthCheck};
pub use executor::{ExecConfig, ExecOutcome, OutputMode};
pub use health::HealthPolicy;
pub use lifecycle::{ReadinessPolicy, ServiceDefinition, ServiceInstance};
pub use network::NetworkPolicy;
pub use runtime::{
    ContainerDescriptor, ContainerDetails, ContainerRuntime, ExecAttachment, ExecState,
    HealthStatus, OutputChunk, OutputStream, ServiceAddress,
};
pub use session::{ContainerHandle, RuntimeSession};

/// Container runtime errors.
#[derive(Debug, thiserror::Error)]
pub enum ContainerError {
    /// No container runtime reachable, or the client could not be built
    #[error("Container runtime unavailable: {0}")]
    Environment(String),

    /// More than one container carries the same logical name
    #[error("More than one container found with name {name} ({count} matches)")]
    Conflict { name: String, count: usize },

    /// Image could not be listed or pulled
    #[error("Failed to pull image {image}: {message}")]
    ImagePull { image: String, message: String },

    /// Health check never reported healthy before the deadline
    #[error("Container {container} did not become healthy within {timeout_secs}s")]
    ReadinessTimeout { container: String, timeout_secs: u64 },

    /// The introspector exited non-zero or its exec could not be driven
    #[error("Command `{command}` failed: {message}")]
    ImportCommand { command: String, message: String },

    /// Container removal failed
    #[error("Failed to remove container {container}: {message}")]
    Teardown { container: String, message: String },

    /// The session's cancellation token fired
    #[error("Operation cancelled")]
    Cancelled,

    /// Container configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Docker/Podman API error
    #[error("Container API error: {0}")]
    Api(#[from] bollard::errors::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for container operations.
pub type Result<T> = std::result::Result<T, ContainerError>;
