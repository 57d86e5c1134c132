//! Scripted fakes for unit tests.
//!
//! [`FakeRuntime`] stands in for the Docker API and [`FakeStore`] for the
//! report database, so lifecycle and pipeline behaviour can be tested
//! without either.

use crate::container::{
    ContainerConfig, ContainerDescriptor, ContainerDetails, ContainerError, ContainerRuntime,
    ExecAttachment, ExecConfig, ExecState, HealthStatus, OutputChunk, Result,
};
use crate::report::{
    AuxiliaryRow, ImportRecord, NamedQuery, ReportError, ReportStore, Row,
};
use futures::stream::{self, StreamExt};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

struct FakeContainer {
    id: String,
    name: String,
    image: String,
    config: Option<ContainerConfig>,
    running: bool,
    inspects: usize,
    healthy_after: Option<usize>,
}

/// A scripted exec: the output it produces and how it ends.
pub struct FakeExec {
    chunks: Vec<OutputChunk>,
    exit_code: Option<i64>,
    running_for: usize,
    ending: ExecEnding,
}

enum ExecEnding {
    Closes,
    Hangs,
    Breaks,
}

impl FakeExec {
    /// Emits `chunks`, closes, and reports `exit_code`.
    pub fn finished(chunks: Vec<OutputChunk>, exit_code: i64) -> Self {
        Self {
            chunks,
            exit_code: Some(exit_code),
            running_for: 0,
            ending: ExecEnding::Closes,
        }
    }

    /// Emits `chunks`, closes, and never reports an exit code.
    pub fn without_exit_code(chunks: Vec<OutputChunk>) -> Self {
        Self {
            exit_code: None,
            ..Self::finished(chunks, 0)
        }
    }

    /// Never produces output and never closes.
    pub fn hanging() -> Self {
        Self {
            ending: ExecEnding::Hangs,
            ..Self::finished(Vec::new(), 0)
        }
    }

    /// Output stream fails immediately.
    pub fn broken() -> Self {
        Self {
            ending: ExecEnding::Breaks,
            ..Self::finished(Vec::new(), 0)
        }
    }

    /// Report the exec as running for the first `inspections` inspections
    /// after its output closes.
    pub fn running_for(mut self, inspections: usize) -> Self {
        self.running_for = inspections;
        self
    }
}

struct ExecRecord {
    running_for: usize,
    exit_code: Option<i64>,
    inspects: usize,
}

#[derive(Default)]
struct RuntimeState {
    next_id: usize,
    containers: Vec<FakeContainer>,
    images: HashSet<String>,
    pulls: usize,
    created: usize,
    fail_pulls: bool,
    fail_stops: bool,
    fail_exec_starts: bool,
    health_after_creation: Option<usize>,
    execs: VecDeque<FakeExec>,
    exec_commands: Vec<Vec<String>>,
    exec_envs: Vec<Vec<String>>,
    exec_records: HashMap<String, ExecRecord>,
}

/// In-memory container runtime.
#[derive(Default)]
pub struct FakeRuntime {
    state: Mutex<RuntimeState>,
    consumed: Arc<AtomicUsize>,
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, RuntimeState> {
        self.state.lock().expect("fake runtime state poisoned")
    }

    fn next_id(state: &mut RuntimeState) -> String {
        state.next_id += 1;
        format!("{:064x}", state.next_id)
    }

    /// Register a running, healthy container created outside the lifecycle.
    pub fn add_container(&self, name: &str, image: &str) -> String {
        let mut state = self.state();
        let id = Self::next_id(&mut state);
        state.containers.push(FakeContainer {
            id: id.clone(),
            name: name.to_string(),
            image: image.to_string(),
            config: None,
            running: true,
            inspects: 0,
            healthy_after: Some(0),
        });
        id
    }

    pub fn add_image(&self, reference: &str) {
        self.state().images.insert(reference.to_string());
    }

    pub fn has_image(&self, reference: &str) -> bool {
        self.state().images.contains(reference)
    }

    pub fn fail_pulls(&self) {
        self.state().fail_pulls = true;
    }

    pub fn fail_stops(&self) {
        self.state().fail_stops = true;
    }

    pub fn fail_exec_starts(&self) {
        self.state().fail_exec_starts = true;
    }

    /// Containers created from now on report healthy after `unhealthy` inspections.
    pub fn health_after_creation(&self, unhealthy: usize) {
        self.state().health_after_creation = Some(unhealthy);
    }

    pub fn set_health_after(&self, id: &str, unhealthy: usize) {
        if let Some(c) = self.state().containers.iter_mut().find(|c| c.id == id) {
            c.healthy_after = Some(unhealthy);
        }
    }

    pub fn set_running(&self, id: &str, running: bool) {
        if let Some(c) = self.state().containers.iter_mut().find(|c| c.id == id) {
            c.running = running;
        }
    }

    pub fn is_running(&self, id: &str) -> bool {
        self.state()
            .containers
            .iter()
            .any(|c| c.id == id && c.running)
    }

    pub fn push_exec(&self, exec: FakeExec) {
        self.state().execs.push_back(exec);
    }

    pub fn pull_count(&self) -> usize {
        self.state().pulls
    }

    pub fn created_count(&self) -> usize {
        self.state().created
    }

    pub fn container_count(&self) -> usize {
        self.state().containers.len()
    }

    pub fn inspect_count(&self, id: &str) -> usize {
        self.state()
            .containers
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.inspects)
            .unwrap_or(0)
    }

    pub fn config_of(&self, id: &str) -> Option<ContainerConfig> {
        self.state()
            .containers
            .iter()
            .find(|c| c.id == id)
            .and_then(|c| c.config.clone())
    }

    pub fn exec_commands(&self) -> Vec<Vec<String>> {
        self.state().exec_commands.clone()
    }

    pub fn exec_envs(&self) -> Vec<Vec<String>> {
        self.state().exec_envs.clone()
    }

    /// Times `inspect_exec` was called for `exec_id`.
    pub fn exec_inspect_count(&self, exec_id: &str) -> usize {
        self.state()
            .exec_records
            .get(exec_id)
            .map(|r| r.inspects)
            .unwrap_or(0)
    }

    /// Output chunks pulled off exec streams so far.
    pub fn chunks_consumed(&self) -> usize {
        self.consumed.load(Ordering::SeqCst)
    }
}

fn not_found(id: &str) -> ContainerError {
    ContainerError::Config(format!("No such container: {}", id))
}

#[async_trait::async_trait]
impl ContainerRuntime for FakeRuntime {
    async fn list_containers_named(&self, name: &str) -> Result<Vec<ContainerDescriptor>> {
        Ok(self
            .state()
            .containers
            .iter()
            .filter(|c| c.name.contains(name))
            .map(|c| ContainerDescriptor {
                id: c.id.clone(),
                names: vec![format!("/{}", c.name)],
                image: c.image.clone(),
                state: if c.running { "running" } else { "exited" }.to_string(),
            })
            .collect())
    }

    async fn inspect_container(&self, id: &str) -> Result<ContainerDetails> {
        let mut state = self.state();
        let container = state
            .containers
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| not_found(id))?;

        container.inspects += 1;
        let healthy = container
            .healthy_after
            .is_some_and(|unhealthy| container.inspects > unhealthy);

        let port_bindings = container
            .config
            .as_ref()
            .map(|config| {
                config
                    .exposed_ports
                    .iter()
                    .filter_map(|port| {
                        config
                            .published_address(port)
                            .map(|address| (port.clone(), vec![address]))
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(ContainerDetails {
            id: container.id.clone(),
            health: if healthy {
                HealthStatus::Healthy
            } else {
                HealthStatus::Starting
            },
            port_bindings,
        })
    }

    async fn create_container(&self, name: &str, config: &ContainerConfig) -> Result<String> {
        let mut state = self.state();
        let id = Self::next_id(&mut state);
        let healthy_after = state.health_after_creation;
        state.created += 1;
        state.containers.push(FakeContainer {
            id: id.clone(),
            name: name.to_string(),
            image: config.image.clone(),
            config: Some(config.clone()),
            running: false,
            inspects: 0,
            healthy_after,
        });
        Ok(id)
    }

    async fn start_container(&self, id: &str) -> Result<()> {
        let mut state = self.state();
        let container = state
            .containers
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| not_found(id))?;
        container.running = true;
        Ok(())
    }

    async fn stop_container(&self, id: &str) -> Result<()> {
        let mut state = self.state();
        if state.fail_stops {
            return Err(ContainerError::Config("stop refused".to_string()));
        }
        let container = state
            .containers
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| not_found(id))?;
        container.running = false;
        Ok(())
    }

    async fn remove_container(&self, id: &str) -> Result<()> {
        let mut state = self.state();
        let before = state.containers.len();
        state.containers.retain(|c| c.id != id);
        if state.containers.len() == before {
            return Err(not_found(id));
        }
        Ok(())
    }

    async fn list_images(&self, reference: &str) -> Result<Vec<String>> {
        Ok(self
            .state()
            .images
            .iter()
            .filter(|image| image.as_str() == reference)
            .map(|image| format!("sha256:{}", image))
            .collect())
    }

    async fn pull_image(&self, reference: &str) -> Result<()> {
        let mut state = self.state();
        state.pulls += 1;
        if state.fail_pulls {
            return Err(ContainerError::ImagePull {
                image: reference.to_string(),
                message: "manifest unknown".to_string(),
            });
        }
        state.images.insert(reference.to_string());
        Ok(())
    }

    async fn start_exec(&self, _container_id: &str, config: &ExecConfig) -> Result<ExecAttachment> {
        let mut state = self.state();
        if state.fail_exec_starts {
            return Err(ContainerError::Config("exec create refused".to_string()));
        }
        state.exec_commands.push(config.cmd().to_vec());
        state.exec_envs.push(config.env().to_vec());

        let exec = state
            .execs
            .pop_front()
            .unwrap_or_else(|| FakeExec::finished(Vec::new(), 0));
        let exec_id = format!("exec-{}", state.exec_commands.len());
        state.exec_records.insert(
            exec_id.clone(),
            ExecRecord {
                running_for: exec.running_for,
                exit_code: exec.exit_code,
                inspects: 0,
            },
        );

        let consumed = self.consumed.clone();
        let output = match exec.ending {
            ExecEnding::Closes => stream::iter(exec.chunks.into_iter().map(Ok))
                .inspect(move |_| {
                    consumed.fetch_add(1, Ordering::SeqCst);
                })
                .boxed(),
            ExecEnding::Hangs => stream::pending().boxed(),
            ExecEnding::Breaks => stream::iter(vec![Err(ContainerError::Config(
                "attach stream reset".to_string(),
            ))])
            .boxed(),
        };

        Ok(ExecAttachment { exec_id, output })
    }

    async fn inspect_exec(&self, exec_id: &str) -> Result<ExecState> {
        let mut state = self.state();
        let record = state
            .exec_records
            .get_mut(exec_id)
            .ok_or_else(|| ContainerError::Config(format!("No such exec: {}", exec_id)))?;

        record.inspects += 1;
        if record.inspects <= record.running_for {
            return Ok(ExecState {
                running: true,
                exit_code: None,
            });
        }
        Ok(ExecState {
            running: false,
            exit_code: record.exit_code,
        })
    }
}

/// In-memory report store keyed by query name.
#[derive(Default)]
pub struct FakeStore {
    import: Option<ImportRecord>,
    exposure: Vec<Row>,
    auxiliary: HashMap<&'static str, Vec<AuxiliaryRow>>,
    failing: HashSet<&'static str>,
    scripts: Vec<&'static str>,
    accounts: Vec<String>,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_import(mut self, record: ImportRecord) -> Self {
        self.import = Some(record);
        self
    }

    pub fn with_exposure(mut self, rows: Vec<Row>) -> Self {
        self.exposure = rows;
        self
    }

    pub fn with_auxiliary(mut self, query: &'static str, rows: Vec<AuxiliaryRow>) -> Self {
        self.auxiliary.insert(query, rows);
        self
    }

    /// Make the named query fail.
    pub fn failing(mut self, query: &'static str) -> Self {
        self.failing.insert(query);
        self
    }

    pub fn scripts_run(&self) -> Vec<&'static str> {
        self.scripts.clone()
    }

    /// Account IDs passed to account-scoped queries, in call order.
    pub fn accounts_queried(&self) -> Vec<String> {
        self.accounts.clone()
    }

    fn check(&self, query: &NamedQuery) -> std::result::Result<(), ReportError> {
        if self.failing.contains(query.name) {
            return Err(ReportError::Query {
                query: query.name,
                source: sqlx::Error::Protocol("scripted failure".to_string()),
            });
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl ReportStore for FakeStore {
    async fn execute_script(&mut self, query: &NamedQuery) -> crate::report::Result<()> {
        self.check(query)?;
        self.scripts.push(query.name);
        Ok(())
    }

    async fn most_recent_import(
        &mut self,
        query: &NamedQuery,
    ) -> crate::report::Result<Option<ImportRecord>> {
        self.check(query)?;
        Ok(self.import.clone())
    }

    async fn exposure_rows(
        &mut self,
        query: &NamedQuery,
        account_id: &str,
    ) -> crate::report::Result<Vec<Row>> {
        self.check(query)?;
        self.accounts.push(account_id.to_string());
        Ok(self.exposure.clone())
    }

    async fn auxiliary_rows(
        &mut self,
        query: &NamedQuery,
        account_id: &str,
    ) -> crate::report::Result<Vec<AuxiliaryRow>> {
        self.check(query)?;
        self.accounts.push(account_id.to_string());
        Ok(self.auxiliary.get(query.name).cloned().unwrap_or_default())
    }
}
