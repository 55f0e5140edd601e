//! Platform data model: the typed shapes flowing between ZCP and the Zerops
//! API. Field names mirror the API's JSON casing.

use serde::{Deserialize, Serialize};

/// Global timeout for each API call, in seconds.
pub const DEFAULT_API_TIMEOUT_SECS: u64 = 30;

/// User details from the auth/info endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: String,
    #[serde(rename = "fullName")]
    pub full_name: String,
    pub email: String,
}

/// A Zerops project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub status: String,
    /// Project slug used inside generated subdomain URLs.
    #[serde(rename = "subdomainHost", default)]
    pub subdomain_host: String,
}

/// A Zerops service stack. `name` is the hostname.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceStack {
    pub id: String,
    pub name: String,
    #[serde(rename = "projectId")]
    pub project_id: String,
    #[serde(rename = "serviceStackTypeInfo")]
    pub type_info: ServiceTypeInfo,
    pub status: String,
    /// HA or NON_HA.
    #[serde(default)]
    pub mode: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<Port>,
    /// Whether the public `*.zerops.app` subdomain is enabled.
    #[serde(rename = "subdomainAccess", default)]
    pub subdomain_access: bool,
    #[serde(rename = "customAutoscaling", default, skip_serializing_if = "Option::is_none")]
    pub custom_autoscaling: Option<Autoscaling>,
    #[serde(rename = "currentAutoscaling", default, skip_serializing_if = "Option::is_none")]
    pub current_autoscaling: Option<Autoscaling>,
    #[serde(default)]
    pub created: String,
    #[serde(rename = "lastUpdate", default, skip_serializing_if = "String::is_empty")]
    pub last_update: String,
}

/// Service type details.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceTypeInfo {
    /// e.g. `nodejs@22`.
    #[serde(rename = "serviceStackTypeVersionName")]
    pub version_name: String,
    /// e.g. `USER`, `CORE`, `BUILD`.
    #[serde(rename = "serviceStackTypeCategoryName")]
    pub category_name: String,
}

/// Internal categories hidden from user-facing listings.
pub const SYSTEM_CATEGORIES: [&str; 5] = [
    "CORE",
    "BUILD",
    "INTERNAL",
    "PREPARE_RUNTIME",
    "HTTP_L7_BALANCER",
];

impl ServiceStack {
    /// True when the service belongs to a system/internal category.
    pub fn is_system(&self) -> bool {
        SYSTEM_CATEGORIES.contains(&self.type_info.category_name.as_str())
    }
}

/// A service port.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Port {
    pub port: u16,
    pub protocol: String,
    #[serde(default)]
    pub public: bool,
}

/// Scaling configuration as reported by the API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Autoscaling {
    #[serde(rename = "horizontalMinCount", default)]
    pub horizontal_min_count: i32,
    #[serde(rename = "horizontalMaxCount", default)]
    pub horizontal_max_count: i32,
    /// SHARED or DEDICATED.
    #[serde(rename = "cpuMode", default)]
    pub cpu_mode: String,
    #[serde(rename = "minCpu", default)]
    pub min_cpu: i32,
    #[serde(rename = "maxCpu", default)]
    pub max_cpu: i32,
    #[serde(rename = "minRam", default)]
    pub min_ram: f64,
    #[serde(rename = "maxRam", default)]
    pub max_ram: f64,
    #[serde(rename = "minDisk", default)]
    pub min_disk: f64,
    #[serde(rename = "maxDisk", default)]
    pub max_disk: f64,
}

/// Scaling update parameters as accepted from the scale tool. The current
/// HA/NON_HA mode must ride along or the API rejects the update.
#[derive(Debug, Clone, Default)]
pub struct AutoscalingParams {
    pub service_mode: String,
    pub horizontal_min_count: Option<i32>,
    pub horizontal_max_count: Option<i32>,
    pub cpu_mode: Option<String>,
    pub min_cpu: Option<i32>,
    pub max_cpu: Option<i32>,
    pub min_ram: Option<f64>,
    pub max_ram: Option<f64>,
    pub min_disk: Option<f64>,
    pub max_disk: Option<f64>,
}

impl AutoscalingParams {
    /// True when no scaling field is set.
    pub fn is_empty(&self) -> bool {
        self.horizontal_min_count.is_none()
            && self.horizontal_max_count.is_none()
            && self.cpu_mode.is_none()
            && self.min_cpu.is_none()
            && self.max_cpu.is_none()
            && self.min_ram.is_none()
            && self.max_ram.is_none()
            && self.min_disk.is_none()
            && self.max_disk.is_none()
    }
}

/// An async platform operation with a polled lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Process {
    pub id: String,
    #[serde(rename = "actionName")]
    pub action_name: String,
    /// PENDING, RUNNING, FINISHED, FAILED, CANCELED.
    pub status: String,
    #[serde(rename = "serviceStacks", default, skip_serializing_if = "Vec::is_empty")]
    pub service_stacks: Vec<ServiceStackRef>,
    #[serde(default)]
    pub created: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished: Option<String>,
    #[serde(rename = "failReason", default, skip_serializing_if = "Option::is_none")]
    pub fail_reason: Option<String>,
}

impl Process {
    pub fn is_terminal(&self) -> bool {
        matches!(self.status.as_str(), "FINISHED" | "FAILED" | "CANCELED")
    }
}

/// Lightweight service reference inside a process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceStackRef {
    pub id: String,
    pub name: String,
}

/// An environment variable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvVar {
    pub id: String,
    pub key: String,
    pub content: String,
}

/// Result of an import operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportResult {
    #[serde(rename = "projectId")]
    pub project_id: String,
    #[serde(rename = "projectName")]
    pub project_name: String,
    #[serde(rename = "serviceStacks", default)]
    pub service_stacks: Vec<ImportedServiceStack>,
}

/// One imported service and its pending processes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportedServiceStack {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub processes: Vec<Process>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiErrorBody>,
}

/// Error payload embedded in API responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

/// Temporary credentials for log backend access.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogAccess {
    #[serde(rename = "accessToken")]
    pub access_token: String,
    #[serde(default)]
    pub expiration: String,
    pub url: String,
}

/// Parameters for fetching logs from the backend.
#[derive(Debug, Clone, Default)]
pub struct LogFetchParams {
    pub service_id: String,
    /// error, warning, info, debug, all.
    pub severity: String,
    /// RFC3339 lower bound.
    pub since: String,
    pub limit: usize,
    pub search: String,
}

/// A single log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub timestamp: String,
    pub severity: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub container: String,
}

/// A process from the search API (activity timeline).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessEvent {
    pub id: String,
    #[serde(rename = "projectId", default)]
    pub project_id: String,
    #[serde(rename = "serviceStacks", default, skip_serializing_if = "Vec::is_empty")]
    pub service_stacks: Vec<ServiceStackRef>,
    #[serde(rename = "actionName")]
    pub action_name: String,
    pub status: String,
    pub created: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished: Option<String>,
    #[serde(rename = "createdBySystem", default)]
    pub created_by_system: bool,
}

/// A build/deploy event from the search API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppVersionEvent {
    pub id: String,
    #[serde(rename = "projectId", default)]
    pub project_id: String,
    #[serde(rename = "serviceStackId", default)]
    pub service_stack_id: String,
    #[serde(default)]
    pub source: String,
    pub status: String,
    #[serde(default)]
    pub sequence: i64,
    pub created: String,
    #[serde(rename = "lastUpdate", default)]
    pub last_update: String,
}

/// An available service stack type from the live catalog
/// (e.g. "Node.js", "PostgreSQL").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceStackType {
    pub name: String,
    pub category: String,
    pub versions: Vec<ServiceStackTypeVersion>,
}

/// A specific version of a service stack type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceStackTypeVersion {
    /// e.g. `nodejs@22`.
    pub name: String,
    #[serde(rename = "isBuild", default)]
    pub is_build: bool,
    /// ACTIVE, DEPRECATED, DISABLED.
    pub status: String,
}
