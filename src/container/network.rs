//! Network policies for service containers.
//!
//! A service either publishes one container port on a freshly allocated host
//! port, or joins the host network and publishes nothing.

use crate::container::{ContainerConfigBuilder, Result, ServiceAddress};
use std::net::{Ipv4Addr, TcpListener};
use tracing::debug;

/// Host IP published database ports bind to.
pub const LOOPBACK: &str = "127.0.0.1";

/// How a service container is reached from the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkPolicy {
    /// Publish `container_port` (`<port>/<proto>`) on a free port of `host_ip`
    PublishedPort {
        container_port: String,
        host_ip: String,
    },
    /// Share the host's network namespace
    HostNetwork,
}

impl NetworkPolicy {
    /// Publish a TCP port on the loopback interface.
    pub fn published_tcp(port: u16) -> Self {
        NetworkPolicy::PublishedPort {
            container_port: format!("{}/tcp", port),
            host_ip: LOOPBACK.to_string(),
        }
    }

    /// Apply this policy to a container being built.
    ///
    /// Returns the host address allocated for a published port.
    pub fn apply(
        &self,
        builder: ContainerConfigBuilder,
    ) -> Result<(ContainerConfigBuilder, Option<ServiceAddress>)> {
        match self {
            NetworkPolicy::PublishedPort {
                container_port,
                host_ip,
            } => {
                let address = ServiceAddress::new(host_ip.clone(), allocate_free_port()?);
                debug!("Publishing {} on {}", container_port, address);
                Ok((builder.publish(container_port.clone(), &address), Some(address)))
            }
            NetworkPolicy::HostNetwork => Ok((builder.network_mode("host"), None)),
        }
    }
}

/// Ask the OS for an unused TCP port on the loopback interface.
///
/// The listener is dropped before returning, so the port is free but not
/// reserved.
pub fn allocate_free_port() -> Result<u16> {
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0))?;
    Ok(listener.local_addr()?.port())
}
