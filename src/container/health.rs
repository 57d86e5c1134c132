//! Fixed-interval health polling.
//!
//! Polls a container's inspected health status until it reports healthy or a
//! deadline passes. The first probe runs immediately; there is no backoff.

use crate::container::{ContainerError, HealthStatus, Result, RuntimeSession};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

/// Shortest interval the poll loop will sleep between probes.
pub const MIN_INTERVAL: Duration = Duration::from_secs(1);

/// Interval and deadline for health polling.
///
/// Both are whole seconds in config; a zero interval is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthPolicy {
    #[serde(serialize_with = "secs::serialize", deserialize_with = "secs::deserialize_nonzero")]
    pub interval: Duration,
    #[serde(with = "secs")]
    pub timeout: Duration,
}

impl Default for HealthPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            timeout: Duration::from_secs(60),
        }
    }
}

/// Wait until `container_id` reports healthy.
///
/// Returns within `timeout + interval` (plus one inspect call). Intervals
/// shorter than [`MIN_INTERVAL`] are raised to it.
///
/// # Errors
///
/// - [`ContainerError::ReadinessTimeout`] if the deadline passes
/// - [`ContainerError::Cancelled`] if the session is cancelled while waiting
/// - any inspect error, immediately
pub async fn wait_until_healthy(
    session: &RuntimeSession,
    container_id: &str,
    policy: &HealthPolicy,
) -> Result<()> {
    let start = Instant::now();
    let interval = policy.interval.max(MIN_INTERVAL);
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        session.check_cancelled()?;

        let details = session.runtime().inspect_container(container_id).await?;
        if details.health == HealthStatus::Healthy {
            info!(container = %container_id, attempts, "Container is healthy");
            return Ok(());
        }

        if start.elapsed() >= policy.timeout {
            return Err(ContainerError::ReadinessTimeout {
                container: container_id.to_string(),
                timeout_secs: policy.timeout.as_secs(),
            });
        }

        debug!(
            container = %container_id,
            attempt = attempts,
            status = ?details.health,
            "Container not healthy yet"
        );

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = session.cancellation().cancelled() => return Err(ContainerError::Cancelled),
        }
    }
}

mod secs {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }

    pub fn deserialize_nonzero<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Duration, D::Error> {
        match u64::deserialize(deserializer)? {
            0 => Err(D::Error::custom("must be at least 1 second")),
            secs => Ok(Duration::from_secs(secs)),
        }
    }
}
