//! Capability traits over the Zerops platform.
//!
//! `Client` is the API facade every tool calls through; `LogFetcher`,
//! `Mounter`, `LocalDeployer` and `SshDeployer` are the narrower
//! capabilities some tools need. Each has a production implementation and
//! an in-memory test one; tools never know which they hold.

use crate::core::error::PlatformError;
use crate::core::types::{
    AppVersionEvent, AutoscalingParams, EnvVar, ImportResult, LogAccess, LogEntry, LogFetchParams,
    Process, ProcessEvent, Project, ServiceStack, ServiceStackType, UserInfo,
};

pub type PlatformResult<T> = Result<T, PlatformError>;

/// Typed facade over the Zerops HTTP API. Safe for concurrent use.
pub trait Client: Send + Sync {
    fn get_user_info(&self) -> PlatformResult<UserInfo>;
    fn list_projects(&self, client_id: &str) -> PlatformResult<Vec<Project>>;
    fn get_project(&self, project_id: &str) -> PlatformResult<Project>;

    fn list_services(&self, project_id: &str) -> PlatformResult<Vec<ServiceStack>>;
    fn get_service(&self, service_id: &str) -> PlatformResult<ServiceStack>;
    fn get_service_env(&self, service_id: &str) -> PlatformResult<Vec<EnvVar>>;
    /// Replaces the service's user env with the given dotenv-format content.
    fn set_service_env_file(&self, service_id: &str, content: &str) -> PlatformResult<Process>;
    fn get_project_env(&self, project_id: &str) -> PlatformResult<Vec<EnvVar>>;

    /// The live service-type catalog.
    fn list_service_stack_types(&self) -> PlatformResult<Vec<ServiceStackType>>;

    fn import_services(&self, project_id: &str, yaml: &str) -> PlatformResult<ImportResult>;
    fn delete_service(&self, service_id: &str) -> PlatformResult<Process>;

    fn start_service(&self, service_id: &str) -> PlatformResult<Process>;
    fn stop_service(&self, service_id: &str) -> PlatformResult<Process>;
    fn restart_service(&self, service_id: &str) -> PlatformResult<Process>;
    fn reload_service(&self, service_id: &str) -> PlatformResult<Process>;

    fn connect_shared_storage(
        &self,
        service_id: &str,
        storage_id: &str,
    ) -> PlatformResult<Process>;
    fn disconnect_shared_storage(
        &self,
        service_id: &str,
        storage_id: &str,
    ) -> PlatformResult<Process>;

    /// `None` means the platform applied the change synchronously.
    fn set_autoscaling(
        &self,
        service_id: &str,
        params: &AutoscalingParams,
    ) -> PlatformResult<Option<Process>>;

    fn get_process(&self, process_id: &str) -> PlatformResult<Process>;

    fn enable_subdomain(&self, service_id: &str) -> PlatformResult<Process>;
    fn disable_subdomain(&self, service_id: &str) -> PlatformResult<Process>;

    fn get_project_log(&self, project_id: &str) -> PlatformResult<LogAccess>;
    fn search_processes(&self, project_id: &str, limit: usize)
    -> PlatformResult<Vec<ProcessEvent>>;
    fn search_app_versions(
        &self,
        project_id: &str,
        service_id: Option<&str>,
        limit: usize,
    ) -> PlatformResult<Vec<AppVersionEvent>>;
}

/// Fetches log entries from the log backend using temporary access
/// credentials obtained via [`Client::get_project_log`].
pub trait LogFetcher: Send + Sync {
    fn fetch_logs(
        &self,
        access: &LogAccess,
        params: &LogFetchParams,
    ) -> PlatformResult<Vec<LogEntry>>;
}

/// Mount state as reported by [`Mounter::check_mount`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountState {
    NotMounted,
    Mounted,
    /// Mountpoint exists but the transport is dead; needs force unmount.
    Stale,
}

/// SSHFS mount control for dev containers. Only available when ZCP itself
/// runs inside a Zerops container.
pub trait Mounter: Send + Sync {
    fn check_mount(&self, path: &str) -> PlatformResult<MountState>;
    fn mount(&self, hostname: &str, local_path: &str) -> PlatformResult<()>;
    fn unmount(&self, hostname: &str, path: &str) -> PlatformResult<()>;
    fn force_unmount(&self, hostname: &str, path: &str) -> PlatformResult<()>;
    fn is_writable(&self, path: &str) -> PlatformResult<bool>;
    fn list_mount_dirs(&self, base_path: &str) -> PlatformResult<Vec<String>>;
}

/// Runs zcli commands on the local machine. Combined output is returned
/// so callers can surface build progress lines.
pub trait LocalDeployer: Send + Sync {
    fn exec_zcli(&self, args: &[&str]) -> PlatformResult<String>;
}

/// Runs commands on sibling Zerops containers over key-based SSH.
pub trait SshDeployer: Send + Sync {
    fn exec_ssh(&self, hostname: &str, command: &str) -> PlatformResult<String>;
}
