//! Configurable in-memory implementations of the platform capabilities.
//!
//! Builder-style: `MockClient::new().with_project(..).with_services(..)`.
//! Mutating operations synthesize deterministic `proc-<action>-<id>`
//! processes so tests can assert on them without wiring every call.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::core::client::{
    Client, LocalDeployer, LogFetcher, MountState, Mounter, PlatformResult, SshDeployer,
};
use crate::core::error::{PlatformError, codes};
use crate::core::types::{
    AppVersionEvent, AutoscalingParams, EnvVar, ImportResult, LogAccess, LogEntry, LogFetchParams,
    Process, ProcessEvent, Project, ServiceStack, ServiceStackRef, ServiceStackType, UserInfo,
};

#[derive(Default)]
struct MockState {
    user_info: Option<UserInfo>,
    projects: Vec<Project>,
    project: Option<Project>,
    services: Vec<ServiceStack>,
    service: Option<ServiceStack>,
    processes: HashMap<String, Process>,
    env_vars: HashMap<String, Vec<EnvVar>>,
    project_env: Vec<EnvVar>,
    log_access: Option<LogAccess>,
    import_result: Option<ImportResult>,
    autoscaling_process: Option<Process>,
    process_events: Vec<ProcessEvent>,
    app_version_events: Vec<AppVersionEvent>,
    stack_types: Vec<ServiceStackType>,
    errors: HashMap<String, PlatformError>,
}

/// Configurable mock for the platform [`Client`].
#[derive(Default)]
pub struct MockClient {
    state: RwLock<MockState>,
}

impl MockClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user_info(self, info: UserInfo) -> Self {
        self.state.write().expect("mock lock").user_info = Some(info);
        self
    }

    pub fn with_projects(self, projects: Vec<Project>) -> Self {
        self.state.write().expect("mock lock").projects = projects;
        self
    }

    pub fn with_project(self, project: Project) -> Self {
        self.state.write().expect("mock lock").project = Some(project);
        self
    }

    pub fn with_services(self, services: Vec<ServiceStack>) -> Self {
        self.state.write().expect("mock lock").services = services;
        self
    }

    pub fn with_service(self, service: ServiceStack) -> Self {
        self.state.write().expect("mock lock").service = Some(service);
        self
    }

    pub fn with_process(self, process: Process) -> Self {
        self.state
            .write()
            .expect("mock lock")
            .processes
            .insert(process.id.clone(), process);
        self
    }

    pub fn with_service_env(self, service_id: &str, vars: Vec<EnvVar>) -> Self {
        self.state
            .write()
            .expect("mock lock")
            .env_vars
            .insert(service_id.to_string(), vars);
        self
    }

    pub fn with_project_env(self, vars: Vec<EnvVar>) -> Self {
        self.state.write().expect("mock lock").project_env = vars;
        self
    }

    pub fn with_log_access(self, access: LogAccess) -> Self {
        self.state.write().expect("mock lock").log_access = Some(access);
        self
    }

    pub fn with_import_result(self, result: ImportResult) -> Self {
        self.state.write().expect("mock lock").import_result = Some(result);
        self
    }

    pub fn with_autoscaling_process(self, process: Process) -> Self {
        self.state.write().expect("mock lock").autoscaling_process = Some(process);
        self
    }

    pub fn with_process_events(self, events: Vec<ProcessEvent>) -> Self {
        self.state.write().expect("mock lock").process_events = events;
        self
    }

    pub fn with_app_version_events(self, events: Vec<AppVersionEvent>) -> Self {
        self.state.write().expect("mock lock").app_version_events = events;
        self
    }

    pub fn with_stack_types(self, types: Vec<ServiceStackType>) -> Self {
        self.state.write().expect("mock lock").stack_types = types;
        self
    }

    /// Injects an error for a specific method (by trait method name).
    pub fn with_error(self, method: &str, err: PlatformError) -> Self {
        self.state
            .write()
            .expect("mock lock")
            .errors
            .insert(method.to_string(), err);
        self
    }

    fn check_error(&self, method: &str) -> PlatformResult<()> {
        match self.state.read().expect("mock lock").errors.get(method) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn not_configured(what: &str) -> PlatformError {
        PlatformError::new(
            codes::API_ERROR,
            format!("mock: no {} configured", what),
            "",
        )
    }

    fn synth_process(action: &str, service_id: &str) -> Process {
        Process {
            id: format!("proc-{}-{}", action, service_id),
            action_name: action.to_string(),
            status: "PENDING".to_string(),
            service_stacks: vec![ServiceStackRef {
                id: service_id.to_string(),
                name: String::new(),
            }],
            created: String::new(),
            started: None,
            finished: None,
            fail_reason: None,
        }
    }
}

impl Client for MockClient {
    fn get_user_info(&self) -> PlatformResult<UserInfo> {
        self.check_error("get_user_info")?;
        self.state
            .read()
            .expect("mock lock")
            .user_info
            .clone()
            .ok_or_else(|| Self::not_configured("user info"))
    }

    fn list_projects(&self, _client_id: &str) -> PlatformResult<Vec<Project>> {
        self.check_error("list_projects")?;
        Ok(self.state.read().expect("mock lock").projects.clone())
    }

    fn get_project(&self, _project_id: &str) -> PlatformResult<Project> {
        self.check_error("get_project")?;
        self.state
            .read()
            .expect("mock lock")
            .project
            .clone()
            .ok_or_else(|| Self::not_configured("project"))
    }

    fn list_services(&self, _project_id: &str) -> PlatformResult<Vec<ServiceStack>> {
        self.check_error("list_services")?;
        Ok(self.state.read().expect("mock lock").services.clone())
    }

    fn get_service(&self, service_id: &str) -> PlatformResult<ServiceStack> {
        self.check_error("get_service")?;
        let state = self.state.read().expect("mock lock");
        if let Some(svc) = &state.service {
            return Ok(svc.clone());
        }
        state
            .services
            .iter()
            .find(|s| s.id == service_id)
            .cloned()
            .ok_or_else(|| {
                PlatformError::new(
                    codes::SERVICE_NOT_FOUND,
                    format!("mock: service {} not found", service_id),
                    "",
                )
            })
    }

    fn get_service_env(&self, service_id: &str) -> PlatformResult<Vec<EnvVar>> {
        self.check_error("get_service_env")?;
        Ok(self
            .state
            .read()
            .expect("mock lock")
            .env_vars
            .get(service_id)
            .cloned()
            .unwrap_or_default())
    }

    fn set_service_env_file(&self, service_id: &str, _content: &str) -> PlatformResult<Process> {
        self.check_error("set_service_env_file")?;
        Ok(Self::synth_process("envSet", service_id))
    }

    fn get_project_env(&self, _project_id: &str) -> PlatformResult<Vec<EnvVar>> {
        self.check_error("get_project_env")?;
        Ok(self.state.read().expect("mock lock").project_env.clone())
    }

    fn list_service_stack_types(&self) -> PlatformResult<Vec<ServiceStackType>> {
        self.check_error("list_service_stack_types")?;
        Ok(self.state.read().expect("mock lock").stack_types.clone())
    }

    fn import_services(&self, _project_id: &str, _yaml: &str) -> PlatformResult<ImportResult> {
        self.check_error("import_services")?;
        self.state
            .read()
            .expect("mock lock")
            .import_result
            .clone()
            .ok_or_else(|| Self::not_configured("import result"))
    }

    fn delete_service(&self, service_id: &str) -> PlatformResult<Process> {
        self.check_error("delete_service")?;
        Ok(Self::synth_process("delete", service_id))
    }

    fn start_service(&self, service_id: &str) -> PlatformResult<Process> {
        self.check_error("start_service")?;
        Ok(Self::synth_process("start", service_id))
    }

    fn stop_service(&self, service_id: &str) -> PlatformResult<Process> {
        self.check_error("stop_service")?;
        Ok(Self::synth_process("stop", service_id))
    }

    fn restart_service(&self, service_id: &str) -> PlatformResult<Process> {
        self.check_error("restart_service")?;
        Ok(Self::synth_process("restart", service_id))
    }

    fn reload_service(&self, service_id: &str) -> PlatformResult<Process> {
        self.check_error("reload_service")?;
        Ok(Self::synth_process("reload", service_id))
    }

    fn connect_shared_storage(
        &self,
        service_id: &str,
        _storage_id: &str,
    ) -> PlatformResult<Process> {
        self.check_error("connect_shared_storage")?;
        Ok(Self::synth_process("connectSharedStorage", service_id))
    }

    fn disconnect_shared_storage(
        &self,
        service_id: &str,
        _storage_id: &str,
    ) -> PlatformResult<Process> {
        self.check_error("disconnect_shared_storage")?;
        Ok(Self::synth_process("disconnectSharedStorage", service_id))
    }

    fn set_autoscaling(
        &self,
        _service_id: &str,
        _params: &AutoscalingParams,
    ) -> PlatformResult<Option<Process>> {
        self.check_error("set_autoscaling")?;
        Ok(self
            .state
            .read()
            .expect("mock lock")
            .autoscaling_process
            .clone())
    }

    fn get_process(&self, process_id: &str) -> PlatformResult<Process> {
        self.check_error("get_process")?;
        self.state
            .read()
            .expect("mock lock")
            .processes
            .get(process_id)
            .cloned()
            .ok_or_else(|| {
                PlatformError::new(
                    codes::PROCESS_NOT_FOUND,
                    format!("mock: process {} not found", process_id),
                    "",
                )
            })
    }

    fn enable_subdomain(&self, service_id: &str) -> PlatformResult<Process> {
        self.check_error("enable_subdomain")?;
        Ok(Self::synth_process("enableSubdomain", service_id))
    }

    fn disable_subdomain(&self, service_id: &str) -> PlatformResult<Process> {
        self.check_error("disable_subdomain")?;
        Ok(Self::synth_process("disableSubdomain", service_id))
    }

    fn get_project_log(&self, _project_id: &str) -> PlatformResult<LogAccess> {
        self.check_error("get_project_log")?;
        self.state
            .read()
            .expect("mock lock")
            .log_access
            .clone()
            .ok_or_else(|| Self::not_configured("log access"))
    }

    fn search_processes(
        &self,
        _project_id: &str,
        _limit: usize,
    ) -> PlatformResult<Vec<ProcessEvent>> {
        self.check_error("search_processes")?;
        Ok(self.state.read().expect("mock lock").process_events.clone())
    }

    fn search_app_versions(
        &self,
        _project_id: &str,
        _service_id: Option<&str>,
        _limit: usize,
    ) -> PlatformResult<Vec<AppVersionEvent>> {
        self.check_error("search_app_versions")?;
        Ok(self
            .state
            .read()
            .expect("mock lock")
            .app_version_events
            .clone())
    }
}

/// In-memory log fetcher returning pre-seeded entries.
#[derive(Default)]
pub struct MockLogFetcher {
    entries: RwLock<Vec<LogEntry>>,
    error: RwLock<Option<PlatformError>>,
}

impl MockLogFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries(self, entries: Vec<LogEntry>) -> Self {
        *self.entries.write().expect("mock lock") = entries;
        self
    }

    pub fn with_error(self, err: PlatformError) -> Self {
        *self.error.write().expect("mock lock") = Some(err);
        self
    }
}

impl LogFetcher for MockLogFetcher {
    fn fetch_logs(
        &self,
        _access: &LogAccess,
        params: &LogFetchParams,
    ) -> PlatformResult<Vec<LogEntry>> {
        if let Some(err) = self.error.read().expect("mock lock").clone() {
            return Err(err);
        }
        let entries = self.entries.read().expect("mock lock");
        let mut out: Vec<LogEntry> = entries
            .iter()
            .filter(|e| {
                params.severity.is_empty()
                    || params.severity == "all"
                    || e.severity == params.severity
            })
            .cloned()
            .collect();
        if params.limit > 0 && out.len() > params.limit {
            out.truncate(params.limit);
        }
        Ok(out)
    }
}

/// Local deployer that records zcli invocations and reports success.
#[derive(Default)]
pub struct MockLocalDeployer {
    calls: RwLock<Vec<Vec<String>>>,
    error: RwLock<Option<PlatformError>>,
}

impl MockLocalDeployer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_error(self, err: PlatformError) -> Self {
        *self.error.write().expect("mock lock") = Some(err);
        self
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.read().expect("mock lock").clone()
    }
}

impl LocalDeployer for MockLocalDeployer {
    fn exec_zcli(&self, args: &[&str]) -> PlatformResult<String> {
        self.calls
            .write()
            .expect("mock lock")
            .push(args.iter().map(|s| s.to_string()).collect());
        if let Some(err) = self.error.read().expect("mock lock").clone() {
            return Err(err);
        }
        Ok("mock zcli ok".to_string())
    }
}

/// SSH deployer that records remote commands and reports success.
#[derive(Default)]
pub struct MockSshDeployer {
    calls: RwLock<Vec<(String, String)>>,
    error: RwLock<Option<PlatformError>>,
}

impl MockSshDeployer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_error(self, err: PlatformError) -> Self {
        *self.error.write().expect("mock lock") = Some(err);
        self
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.read().expect("mock lock").clone()
    }
}

impl SshDeployer for MockSshDeployer {
    fn exec_ssh(&self, hostname: &str, command: &str) -> PlatformResult<String> {
        self.calls
            .write()
            .expect("mock lock")
            .push((hostname.to_string(), command.to_string()));
        if let Some(err) = self.error.read().expect("mock lock").clone() {
            return Err(err);
        }
        Ok("mock ssh ok".to_string())
    }
}

/// Mounter tracking mount state per path in memory.
#[derive(Default)]
pub struct MockMounter {
    states: RwLock<HashMap<String, MountState>>,
    writable: RwLock<bool>,
    dirs: RwLock<Vec<String>>,
    ops: RwLock<Vec<String>>,
}

impl MockMounter {
    pub fn new() -> Self {
        let m = Self::default();
        *m.writable.write().expect("mock lock") = true;
        m
    }

    pub fn with_state(self, path: &str, state: MountState) -> Self {
        self.states
            .write()
            .expect("mock lock")
            .insert(path.to_string(), state);
        self
    }

    pub fn with_writable(self, writable: bool) -> Self {
        *self.writable.write().expect("mock lock") = writable;
        self
    }

    pub fn with_dirs(self, dirs: Vec<String>) -> Self {
        *self.dirs.write().expect("mock lock") = dirs;
        self
    }

    /// Recorded operations in call order, e.g. `mount app`.
    pub fn ops(&self) -> Vec<String> {
        self.ops.read().expect("mock lock").clone()
    }

    fn record(&self, op: String) {
        self.ops.write().expect("mock lock").push(op);
    }
}

impl Mounter for MockMounter {
    fn check_mount(&self, path: &str) -> PlatformResult<MountState> {
        Ok(self
            .states
            .read()
            .expect("mock lock")
            .get(path)
            .copied()
            .unwrap_or(MountState::NotMounted))
    }

    fn mount(&self, hostname: &str, local_path: &str) -> PlatformResult<()> {
        self.record(format!("mount {}", hostname));
        self.states
            .write()
            .expect("mock lock")
            .insert(local_path.to_string(), MountState::Mounted);
        Ok(())
    }

    fn unmount(&self, hostname: &str, path: &str) -> PlatformResult<()> {
        self.record(format!("unmount {}", hostname));
        self.states
            .write()
            .expect("mock lock")
            .insert(path.to_string(), MountState::NotMounted);
        Ok(())
    }

    fn force_unmount(&self, hostname: &str, path: &str) -> PlatformResult<()> {
        self.record(format!("force_unmount {}", hostname));
        self.states
            .write()
            .expect("mock lock")
            .insert(path.to_string(), MountState::NotMounted);
        Ok(())
    }

    fn is_writable(&self, _path: &str) -> PlatformResult<bool> {
        Ok(*self.writable.read().expect("mock lock"))
    }

    fn list_mount_dirs(&self, _base_path: &str) -> PlatformResult<Vec<String>> {
        Ok(self.dirs.read().expect("mock lock").clone())
    }
}
