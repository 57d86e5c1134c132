//! Container command execution.
//!
//! Runs a command in a running container with its output attached. A spawned
//! task drains the demultiplexed output while the caller waits on whichever
//! finishes first: that task, or the session's cancellation token.

use crate::container::{ContainerError, OutputChunk, OutputStream, Result, RuntimeSession};
use futures::stream::StreamExt;
use std::time::Duration;
use tokio::time::Instant;
use tracing::instrument::WithSubscriber;
use tracing::{debug, error, info, trace, warn};

/// How often a finished stream's exec is inspected for its exit code.
const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// How long an exec may keep reporting `running` after its output closed.
const EXIT_WAIT_TIMEOUT: Duration = Duration::from_secs(10);

/// Execution configuration builder.
pub struct ExecConfigBuilder {
    cmd: Vec<String>,
    env: Vec<String>,
    attach_stdin: bool,
}

impl Default for ExecConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecConfigBuilder {
    /// Create a new execution configuration builder.
    pub fn new() -> Self {
        Self {
            cmd: Vec::new(),
            env: Vec::new(),
            attach_stdin: true,
        }
    }

    /// Set the command to execute.
    pub fn cmd<I, S>(mut self, cmd: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cmd = cmd.into_iter().map(|s| s.into()).collect();
        self
    }

    /// Add an environment variable.
    pub fn env<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.env.push(format!("{}={}", key.into(), value.into()));
        self
    }

    /// Add multiple environment variables.
    pub fn envs<'a, I>(mut self, envs: I) -> Self
    where
        I: IntoIterator<Item = &'a (String, String)>,
    {
        for (k, v) in envs {
            self.env.push(format!("{}={}", k, v));
        }
        self
    }

    /// Attach to stdin.
    pub fn attach_stdin(mut self, attach: bool) -> Self {
        self.attach_stdin = attach;
        self
    }

    /// Build the execution configuration.
    pub fn build(self) -> ExecConfig {
        ExecConfig {
            cmd: self.cmd,
            env: self.env,
            attach_stdin: self.attach_stdin,
        }
    }
}

/// Container execution configuration.
///
/// Stdout and stderr are always attached.
#[derive(Debug, Clone)]
pub struct ExecConfig {
    cmd: Vec<String>,
    env: Vec<String>,
    attach_stdin: bool,
}

impl ExecConfig {
    /// Create a new execution configuration builder.
    pub fn builder() -> ExecConfigBuilder {
        ExecConfigBuilder::new()
    }

    /// Get the command.
    pub fn cmd(&self) -> &[String] {
        &self.cmd
    }

    /// Environment in `KEY=value` form.
    pub fn env(&self) -> &[String] {
        &self.env
    }

    pub fn attaches_stdin(&self) -> bool {
        self.attach_stdin
    }

    /// Command line for log and error messages.
    pub fn display_cmd(&self) -> String {
        self.cmd.join(" ")
    }
}

/// What happens to a command's output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Log stdout at info and stderr at error
    Passthrough,
    /// Drain and drop
    Discard,
}

/// Result of a finished command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecOutcome {
    /// Exit code (None if the runtime never reported one)
    pub exit_code: Option<i64>,
}

impl ExecOutcome {
    /// A command succeeds only with a reported exit code of zero.
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Execute a command in a running container and wait for it to finish.
///
/// The output stream is always drained to completion by a background task,
/// whatever the [`OutputMode`]. If the session is cancelled first, the drain
/// task is aborted and this returns [`ContainerError::Cancelled`].
///
/// Once the stream closes the exec is inspected until the runtime stops
/// reporting it as running, for at most [`EXIT_WAIT_TIMEOUT`].
///
/// # Errors
///
/// Returns error if the exec cannot be started, its output stream fails, or
/// the session is cancelled.
pub async fn execute(
    session: &RuntimeSession,
    container_id: &str,
    config: &ExecConfig,
    mode: OutputMode,
) -> Result<ExecOutcome> {
    session.check_cancelled()?;
    debug!(
        "Executing command in container {}: {:?}",
        container_id, config.cmd
    );

    let attachment = session.runtime().start_exec(container_id, config).await?;
    let exec_id = attachment.exec_id;

    let mut drain = tokio::spawn(drain_output(attachment.output, mode).with_current_subscriber());

    tokio::select! {
        joined = &mut drain => {
            joined.map_err(|e| ContainerError::ImportCommand {
                command: config.display_cmd(),
                message: format!("Output task failed: {}", e),
            })??;
        }
        _ = session.cancellation().cancelled() => {
            drain.abort();
            return Err(ContainerError::Cancelled);
        }
    }

    let exit_code = wait_for_exit(session, &exec_id).await?;
    debug!("Command executed with exit code: {:?}", exit_code);

    Ok(ExecOutcome { exit_code })
}

async fn wait_for_exit(session: &RuntimeSession, exec_id: &str) -> Result<Option<i64>> {
    let start = Instant::now();

    loop {
        let state = session.runtime().inspect_exec(exec_id).await?;
        if !state.running {
            return Ok(state.exit_code);
        }

        if start.elapsed() >= EXIT_WAIT_TIMEOUT {
            warn!(exec = %exec_id, "Exec still running after its output closed");
            return Ok(None);
        }

        tokio::select! {
            _ = tokio::time::sleep(EXIT_POLL_INTERVAL) => {}
            _ = session.cancellation().cancelled() => return Err(ContainerError::Cancelled),
        }
    }
}

async fn drain_output(mut output: OutputStream, mode: OutputMode) -> Result<()> {
    while let Some(chunk) = output.next().await {
        match (chunk?, mode) {
            (OutputChunk::Stdout(text), OutputMode::Passthrough) => {
                for line in text.lines().filter(|l| !l.trim().is_empty()) {
                    info!(target: "introspector", "{}", line);
                }
            }
            (OutputChunk::Stderr(text), OutputMode::Passthrough) => {
                for line in text.lines().filter(|l| !l.trim().is_empty()) {
                    error!(target: "introspector", "{}", line);
                }
            }
            (chunk, OutputMode::Discard) => trace!("Discarding output: {:?}", chunk),
        }
    }
    Ok(())
}
