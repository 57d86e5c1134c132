//! Runtime session and container handles.
//!
//! A [`RuntimeSession`] pairs the runtime client with the run's cancellation
//! token. It is opened once per process and shared by every service.

use crate::container::{
    ContainerDescriptor, ContainerError, ContainerRuntime, DockerRuntime, Result,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Handle to the container runtime plus the run's cancellation token.
pub struct RuntimeSession {
    runtime: Arc<dyn ContainerRuntime>,
    cancel: CancellationToken,
}

impl RuntimeSession {
    /// Open a session against the ambient Docker/Podman environment.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::Environment`] if no runtime is reachable.
    pub async fn open() -> Result<Arc<Self>> {
        let runtime = DockerRuntime::connect().await?;
        Ok(Arc::new(Self::with_runtime(
            Arc::new(runtime),
            CancellationToken::new(),
        )))
    }

    /// Build a session over an existing runtime.
    pub fn with_runtime(runtime: Arc<dyn ContainerRuntime>, cancel: CancellationToken) -> Self {
        Self { runtime, cancel }
    }

    pub fn runtime(&self) -> &dyn ContainerRuntime {
        self.runtime.as_ref()
    }

    /// Token cancelling every blocking operation of this session.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Fail fast if the session has been cancelled.
    pub fn check_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(ContainerError::Cancelled);
        }
        Ok(())
    }

    /// Find the container named exactly `name`, running or not.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::Conflict`] if more than one container has the name.
    pub async fn find_container(&self, name: &str) -> Result<Option<ContainerDescriptor>> {
        self.check_cancelled()?;

        let mut matches: Vec<ContainerDescriptor> = self
            .runtime
            .list_containers_named(name)
            .await?
            .into_iter()
            .filter(|c| c.has_name(name))
            .collect();

        match matches.len() {
            0 => Ok(None),
            1 => Ok(matches.pop()),
            count => Err(ContainerError::Conflict {
                name: name.to_string(),
                count,
            }),
        }
    }

    /// Make sure `reference` is available locally, pulling it if not.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::ImagePull`] if listing or pulling fails.
    pub async fn ensure_image_present(&self, reference: &str) -> Result<()> {
        self.check_cancelled()?;

        let pull_error = |e: ContainerError| match e {
            ContainerError::ImagePull { .. } | ContainerError::Cancelled => e,
            other => ContainerError::ImagePull {
                image: reference.to_string(),
                message: other.to_string(),
            },
        };

        let images = self
            .runtime
            .list_images(reference)
            .await
            .map_err(pull_error)?;
        if !images.is_empty() {
            debug!("Image {} already exists locally", reference);
            return Ok(());
        }

        info!("Image {} not found, pulling", reference);
        tokio::select! {
            result = self.runtime.pull_image(reference) => result.map_err(pull_error)?,
            _ = self.cancel.cancelled() => return Err(ContainerError::Cancelled),
        }
        info!("Successfully pulled image: {}", reference);
        Ok(())
    }

    /// Stop a container (best effort) and remove it, keeping its volumes.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::Teardown`] if removal fails.
    pub async fn stop_and_remove(&self, container_id: &str) -> Result<()> {
        if let Err(e) = self.runtime.stop_container(container_id).await {
            warn!("Failed to stop container {}: {}", container_id, e);
        }

        self.runtime
            .remove_container(container_id)
            .await
            .map_err(|e| ContainerError::Teardown {
                container: container_id.to_string(),
                message: e.to_string(),
            })?;

        info!("Removed container: {}", container_id);
        Ok(())
    }
}

/// A container owned by this run, removable through its session.
#[derive(Clone)]
pub struct ContainerHandle {
    container_id: String,
    session: Arc<RuntimeSession>,
}

impl ContainerHandle {
    pub fn new(container_id: impl Into<String>, session: Arc<RuntimeSession>) -> Self {
        Self {
            container_id: container_id.into(),
            session,
        }
    }

    pub fn id(&self) -> &str {
        &self.container_id
    }

    pub fn session(&self) -> &Arc<RuntimeSession> {
        &self.session
    }

    /// Stop and remove the container.
    pub async fn shut_down(self) -> Result<()> {
        self.session.stop_and_remove(&self.container_id).await
    }
}

impl std::fmt::Debug for ContainerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContainerHandle")
            .field("container_id", &self.container_id)
            .finish()
    }
}
