//! Container configuration builders.
//!
//! Provides a fluent API for building the create-time configuration of a
//! service container: image, environment, exposed ports, network mode and
//! health check.

use crate::container::{ContainerError, Result, ServiceAddress};
use bollard::models::{HealthConfig, HostConfig, PortBinding};
use std::collections::HashMap;
use std::time::Duration;

/// Container-level health check run by the runtime itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthCheck {
    /// Test command in Docker form, e.g. `["CMD", "pg_isready"]`
    pub test: Vec<String>,
    pub timeout: Duration,
    pub retries: u32,
}

impl HealthCheck {
    /// Health check running `cmd` directly (the `CMD` form).
    pub fn cmd<I, S>(cmd: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut test = vec!["CMD".to_string()];
        test.extend(cmd.into_iter().map(Into::into));
        Self {
            test,
            timeout: Duration::from_secs(5),
            retries: 3,
        }
    }

    pub(crate) fn to_bollard(&self) -> HealthConfig {
        HealthConfig {
            test: Some(self.test.clone()),
            timeout: Some(self.timeout.as_nanos() as i64),
            retries: Some(i64::from(self.retries)),
            ..Default::default()
        }
    }
}

/// Container configuration builder.
pub struct ContainerConfigBuilder {
    image: Option<String>,
    env: Vec<String>,
    labels: HashMap<String, String>,
    network_mode: Option<String>,
    exposed_ports: Vec<String>,
    port_bindings: HashMap<String, Option<Vec<PortBinding>>>,
    health_check: Option<HealthCheck>,
}

impl Default for ContainerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ContainerConfigBuilder {
    /// Create a new container configuration builder.
    pub fn new() -> Self {
        Self {
            image: None,
            env: Vec::new(),
            labels: HashMap::new(),
            network_mode: None,
            exposed_ports: Vec::new(),
            port_bindings: HashMap::new(),
            health_check: None,
        }
    }

    /// Set the container image.
    pub fn image<S: Into<String>>(mut self, image: S) -> Self {
        self.image = Some(image.into());
        self
    }

    /// Add an environment variable.
    pub fn env<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.env.push(format!("{}={}", key.into(), value.into()));
        self
    }

    /// Add multiple environment variables.
    pub fn envs<I, K, V>(mut self, envs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (k, v) in envs {
            self.env.push(format!("{}={}", k.into(), v.into()));
        }
        self
    }

    /// Add a label to the container.
    pub fn label<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Set network mode (e.g., "bridge", "host", "none").
    pub fn network_mode<S: Into<String>>(mut self, mode: S) -> Self {
        self.network_mode = Some(mode.into());
        self
    }

    /// Expose a container port and publish it on `address`.
    ///
    /// `container_port` is in `<port>/<proto>` form.
    pub fn publish<S: Into<String>>(mut self, container_port: S, address: &ServiceAddress) -> Self {
        let port = container_port.into();
        self.exposed_ports.push(port.clone());
        self.port_bindings.insert(
            port,
            Some(vec![PortBinding {
                host_ip: Some(address.host_ip.clone()),
                host_port: Some(address.host_port.to_string()),
            }]),
        );
        self
    }

    /// Attach a runtime health check.
    pub fn health_check(mut self, check: HealthCheck) -> Self {
        self.health_check = Some(check);
        self
    }

    /// Build the container configuration.
    ///
    /// # Errors
    ///
    /// Returns error if required fields are missing or invalid.
    pub fn build(self) -> Result<ContainerConfig> {
        let image = self
            .image
            .filter(|i| !i.trim().is_empty())
            .ok_or_else(|| ContainerError::Config("Image is required".to_string()))?;

        if self.network_mode.as_deref() == Some("host") && !self.port_bindings.is_empty() {
            return Err(ContainerError::Config(
                "Port bindings are not allowed with host networking".to_string(),
            ));
        }

        let host_config = HostConfig {
            network_mode: self.network_mode,
            port_bindings: if self.port_bindings.is_empty() {
                None
            } else {
                Some(self.port_bindings)
            },
            ..Default::default()
        };

        Ok(ContainerConfig {
            image,
            env: if self.env.is_empty() {
                None
            } else {
                Some(self.env)
            },
            labels: if self.labels.is_empty() {
                None
            } else {
                Some(self.labels)
            },
            exposed_ports: self.exposed_ports,
            health_check: self.health_check,
            host_config,
        })
    }
}

/// Container configuration.
#[derive(Debug, Clone)]
pub struct ContainerConfig {
    /// Image name
    pub image: String,
    /// Environment variables in `KEY=value` form
    pub env: Option<Vec<String>>,
    /// Labels
    pub labels: Option<HashMap<String, String>>,
    /// Exposed ports in `<port>/<proto>` form
    pub exposed_ports: Vec<String>,
    /// Runtime health check
    pub health_check: Option<HealthCheck>,
    /// Host configuration
    pub host_config: HostConfig,
}

impl ContainerConfig {
    /// Create a new configuration builder.
    pub fn builder() -> ContainerConfigBuilder {
        ContainerConfigBuilder::new()
    }

    /// Get the image name.
    pub fn image(&self) -> &str {
        &self.image
    }

    /// Look up an environment variable by key.
    pub fn env_value(&self, key: &str) -> Option<&str> {
        self.env.as_ref()?.iter().find_map(|entry| {
            entry
                .split_once('=')
                .filter(|(k, _)| *k == key)
                .map(|(_, v)| v)
        })
    }

    /// Host address bound to `container_port`, if published.
    pub fn published_address(&self, container_port: &str) -> Option<ServiceAddress> {
        let binding = self
            .host_config
            .port_bindings
            .as_ref()?
            .get(container_port)?
            .as_ref()?
            .first()?;
        Some(ServiceAddress::new(
            binding.host_ip.clone().unwrap_or_default(),
            binding.host_port.as_deref()?.parse().ok()?,
        ))
    }
}
