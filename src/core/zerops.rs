//! Live platform client speaking the Zerops public REST API.
//!
//! Search endpoints take an elasticsearch-style filter body and return
//! `{ items: [...] }`. Detail endpoints return the entity directly.
//! The API reports autoscaling in a nested shape; [`parse_raw_autoscaling`]
//! flattens it into [`Autoscaling`].

use std::sync::RwLock;
use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::{Client as HttpClient, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::core::client::{Client, LogFetcher, PlatformResult};
use crate::core::error::{PlatformError, codes};
use crate::core::types::{
    ApiErrorBody, AppVersionEvent, Autoscaling, AutoscalingParams, DEFAULT_API_TIMEOUT_SECS,
    EnvVar, ImportResult, ImportedServiceStack, LogAccess, LogEntry, LogFetchParams, Process,
    ProcessEvent, Project, ServiceStack, ServiceStackRef, ServiceStackType, UserInfo,
};

const API_PREFIX: &str = "api/rest/public";
const DEFAULT_LOG_TAIL: usize = 100;

pub struct ZeropsClient {
    http: HttpClient,
    endpoint: String,
    token: String,
    client_id: RwLock<Option<String>>,
}

impl ZeropsClient {
    pub fn new(token: &str, api_host: &str) -> PlatformResult<Self> {
        let mut endpoint = api_host.to_string();
        if !endpoint.starts_with("http") {
            endpoint = format!("https://{}", endpoint);
        }
        if !endpoint.ends_with('/') {
            endpoint.push('/');
        }

        let http = HttpClient::builder()
            .timeout(Duration::from_secs(DEFAULT_API_TIMEOUT_SECS))
            .build()
            .map_err(|e| {
                PlatformError::new(codes::API_ERROR, format!("build http client: {}", e), "")
            })?;

        Ok(Self {
            http,
            endpoint,
            token: token.to_string(),
            client_id: RwLock::new(None),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}/{}", self.endpoint, API_PREFIX, path)
    }

    fn send<T: DeserializeOwned>(&self, req: RequestBuilder, entity: &str) -> PlatformResult<T> {
        let text = self.send_raw(req, entity)?;
        serde_json::from_str(&text).map_err(decode_err)
    }

    fn send_raw(&self, req: RequestBuilder, entity: &str) -> PlatformResult<String> {
        let resp = req
            .bearer_auth(&self.token)
            .header("Accept", "application/json")
            .send()
            .map_err(|e| map_transport_error(&e))?;

        let status = resp.status();
        let text = resp.text().map_err(|e| {
            PlatformError::new(codes::API_ERROR, format!("read response: {}", e), "")
        })?;

        if status.is_success() {
            return Ok(text);
        }
        Err(map_api_error(status, &text, entity))
    }

    /// Resolves and caches the clientId behind the token.
    fn client_id(&self) -> PlatformResult<String> {
        let cached = self
            .client_id
            .read()
            .map_err(|_| PlatformError::new(codes::API_ERROR, "client id lock poisoned", ""))?
            .clone();
        if let Some(id) = cached {
            return Ok(id);
        }

        let info = self.get_user_info()?;
        *self
            .client_id
            .write()
            .map_err(|_| PlatformError::new(codes::API_ERROR, "client id lock poisoned", ""))? =
            Some(info.id.clone());
        Ok(info.id)
    }
}

impl Client for ZeropsClient {
    fn get_user_info(&self) -> PlatformResult<UserInfo> {
        let resp: UserInfoResponse = self.send(self.http.get(self.url("user/info")), "auth")?;
        let id = resp
            .client_user_list
            .first()
            .map(|c| c.client_id.clone())
            .unwrap_or_default();
        Ok(UserInfo {
            id,
            email: resp.email,
            full_name: resp.full_name,
        })
    }

    fn list_projects(&self, client_id: &str) -> PlatformResult<Vec<Project>> {
        let resp: EsResponse<EsProjectItem> = self.send(
            self.http
                .post(self.url("project/search"))
                .json(&client_filter(client_id)),
            "project",
        )?;
        Ok(resp.items.into_iter().map(|i| i.project).collect())
    }

    fn get_project(&self, project_id: &str) -> PlatformResult<Project> {
        self.send(
            self.http.get(self.url(&format!("project/{}", project_id))),
            "project",
        )
    }

    fn list_services(&self, project_id: &str) -> PlatformResult<Vec<ServiceStack>> {
        let client_id = self.client_id()?;
        let resp: EsResponse<ServiceStack> = self.send(
            self.http
                .post(self.url("service-stack/search"))
                .json(&client_filter(&client_id)),
            "service",
        )?;
        Ok(resp
            .items
            .into_iter()
            .filter(|s| s.project_id == project_id)
            .collect())
    }

    fn get_service(&self, service_id: &str) -> PlatformResult<ServiceStack> {
        let body = self.send_raw(
            self.http
                .get(self.url(&format!("service-stack/{}", service_id))),
            "service",
        )?;
        let mut svc: ServiceStack = serde_json::from_str(&body).map_err(decode_err)?;
        // The flat decode misses the nested autoscaling shape; map it in a
        // second pass over the same body.
        if svc.current_autoscaling.is_none() {
            svc.current_autoscaling = parse_raw_autoscaling(&body);
        }
        Ok(svc)
    }

    fn get_service_env(&self, service_id: &str) -> PlatformResult<Vec<EnvVar>> {
        let resp: EsResponse<EnvVar> = self.send(
            self.http
                .get(self.url(&format!("service-stack/{}/env", service_id))),
            "service",
        )?;
        Ok(resp.items)
    }

    fn set_service_env_file(&self, service_id: &str, content: &str) -> PlatformResult<Process> {
        let raw: RawProcess = self.send(
            self.http
                .put(self.url(&format!(
                    "service-stack/{}/user-data/env-file",
                    service_id
                )))
                .json(&serde_json::json!({ "envFile": content })),
            "service",
        )?;
        Ok(raw.into_process())
    }

    fn get_project_env(&self, project_id: &str) -> PlatformResult<Vec<EnvVar>> {
        let client_id = self.client_id()?;
        let mut filter = client_filter(&client_id);
        filter.search.push(EsSearchItem {
            name: "id",
            operator: "eq",
            value: project_id.to_string(),
        });

        let resp: EsResponse<EsProjectItem> = self.send(
            self.http.post(self.url("project/search")).json(&filter),
            "project",
        )?;
        let item = resp.items.into_iter().next().ok_or_else(|| {
            PlatformError::new(codes::SERVICE_NOT_FOUND, "project not found", "Check projectId")
        })?;
        Ok(item.env_list)
    }

    fn list_service_stack_types(&self) -> PlatformResult<Vec<ServiceStackType>> {
        let resp: EsResponse<EsStackTypeItem> = self.send(
            self.http
                .post(self.url("service-stack-type/search"))
                .json(&EsFilter::default()),
            "service",
        )?;
        Ok(resp
            .items
            .into_iter()
            .map(|i| ServiceStackType {
                name: i.name,
                category: i.category,
                versions: i.versions,
            })
            .collect())
    }

    fn import_services(&self, project_id: &str, yaml: &str) -> PlatformResult<ImportResult> {
        let raw: RawImportResult = self.send(
            self.http
                .post(self.url("service-stack/import"))
                .json(&serde_json::json!({ "projectId": project_id, "yaml": yaml })),
            "service",
        )?;
        Ok(ImportResult {
            project_id: raw.project_id,
            project_name: raw.project_name,
            service_stacks: raw
                .service_stacks
                .into_iter()
                .map(|s| ImportedServiceStack {
                    id: s.id,
                    name: s.name,
                    error: s.error,
                    processes: s.processes.into_iter().map(RawProcess::into_process).collect(),
                })
                .collect(),
        })
    }

    fn delete_service(&self, service_id: &str) -> PlatformResult<Process> {
        let raw: RawProcess = self.send(
            self.http
                .delete(self.url(&format!("service-stack/{}", service_id))),
            "service",
        )?;
        Ok(raw.into_process())
    }

    fn start_service(&self, service_id: &str) -> PlatformResult<Process> {
        self.lifecycle(service_id, "start")
    }

    fn stop_service(&self, service_id: &str) -> PlatformResult<Process> {
        self.lifecycle(service_id, "stop")
    }

    fn restart_service(&self, service_id: &str) -> PlatformResult<Process> {
        self.lifecycle(service_id, "restart")
    }

    fn reload_service(&self, service_id: &str) -> PlatformResult<Process> {
        self.lifecycle(service_id, "reload")
    }

    fn connect_shared_storage(
        &self,
        service_id: &str,
        storage_id: &str,
    ) -> PlatformResult<Process> {
        self.shared_storage(service_id, storage_id, "connect-shared-storage")
    }

    fn disconnect_shared_storage(
        &self,
        service_id: &str,
        storage_id: &str,
    ) -> PlatformResult<Process> {
        self.shared_storage(service_id, storage_id, "disconnect-shared-storage")
    }

    fn set_autoscaling(
        &self,
        service_id: &str,
        params: &AutoscalingParams,
    ) -> PlatformResult<Option<Process>> {
        let body = build_autoscaling_body(params);
        let resp: AutoscalingResponse = self.send(
            self.http
                .put(self.url(&format!("service-stack/{}/autoscaling", service_id)))
                .json(&body),
            "service",
        )?;
        Ok(resp.process.map(RawProcess::into_process))
    }

    fn get_process(&self, process_id: &str) -> PlatformResult<Process> {
        let raw: RawProcess = self.send(
            self.http.get(self.url(&format!("process/{}", process_id))),
            "process",
        )?;
        Ok(raw.into_process())
    }

    fn enable_subdomain(&self, service_id: &str) -> PlatformResult<Process> {
        self.lifecycle(service_id, "enable-subdomain-access")
    }

    fn disable_subdomain(&self, service_id: &str) -> PlatformResult<Process> {
        self.lifecycle(service_id, "disable-subdomain-access")
    }

    fn get_project_log(&self, project_id: &str) -> PlatformResult<LogAccess> {
        let mut access: LogAccess = self.send(
            self.http.get(self.url(&format!("project/{}/log", project_id))),
            "project",
        )?;
        access.url = normalize_log_url(&access.url);
        Ok(access)
    }

    fn search_processes(&self, project_id: &str, limit: usize) -> PlatformResult<Vec<ProcessEvent>> {
        let client_id = self.client_id()?;
        let resp: EsResponse<ProcessEvent> = self.send(
            self.http
                .post(self.url("process/search"))
                .json(&recent_filter(&client_id, limit)),
            "process",
        )?;
        let mut events: Vec<ProcessEvent> = resp
            .items
            .into_iter()
            .filter(|e| e.project_id == project_id)
            .collect();
        for e in &mut events {
            e.status = normalize_status(&e.status);
        }
        Ok(events)
    }

    fn search_app_versions(
        &self,
        project_id: &str,
        service_id: Option<&str>,
        limit: usize,
    ) -> PlatformResult<Vec<AppVersionEvent>> {
        let client_id = self.client_id()?;
        let resp: EsResponse<AppVersionEvent> = self.send(
            self.http
                .post(self.url("app-version/search"))
                .json(&recent_filter(&client_id, limit)),
            "service",
        )?;
        Ok(resp
            .items
            .into_iter()
            .filter(|av| av.project_id == project_id)
            .filter(|av| service_id.is_none_or(|id| av.service_stack_id == id))
            .collect())
    }
}

impl ZeropsClient {
    fn lifecycle(&self, service_id: &str, verb: &str) -> PlatformResult<Process> {
        let raw: RawProcess = self.send(
            self.http
                .put(self.url(&format!("service-stack/{}/{}", service_id, verb))),
            "service",
        )?;
        Ok(raw.into_process())
    }

    fn shared_storage(
        &self,
        service_id: &str,
        storage_id: &str,
        verb: &str,
    ) -> PlatformResult<Process> {
        let raw: RawProcess = self.send(
            self.http
                .put(self.url(&format!("service-stack/{}/{}", service_id, verb)))
                .json(&serde_json::json!({ "sharedStorageId": storage_id })),
            "service",
        )?;
        Ok(raw.into_process())
    }
}

// ---------------------------------------------------------------------------
// Search filter bodies
// ---------------------------------------------------------------------------

#[derive(Serialize, Default)]
struct EsFilter {
    search: Vec<EsSearchItem>,
    sort: Vec<EsSortItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    limit: Option<usize>,
}

#[derive(Serialize)]
struct EsSearchItem {
    name: &'static str,
    operator: &'static str,
    value: String,
}

#[derive(Serialize)]
struct EsSortItem {
    name: &'static str,
    ascending: bool,
}

fn client_filter(client_id: &str) -> EsFilter {
    EsFilter {
        search: vec![EsSearchItem {
            name: "clientId",
            operator: "eq",
            value: client_id.to_string(),
        }],
        sort: vec![],
        limit: None,
    }
}

fn recent_filter(client_id: &str, limit: usize) -> EsFilter {
    let mut filter = client_filter(client_id);
    filter.sort.push(EsSortItem {
        name: "created",
        ascending: false,
    });
    filter.limit = Some(limit);
    filter
}

// ---------------------------------------------------------------------------
// Response shapes
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct EsResponse<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

#[derive(Deserialize)]
struct UserInfoResponse {
    #[serde(default)]
    email: String,
    #[serde(rename = "fullName", default)]
    full_name: String,
    #[serde(rename = "clientUserList", default)]
    client_user_list: Vec<ClientUser>,
}

#[derive(Deserialize)]
struct ClientUser {
    #[serde(rename = "clientId")]
    client_id: String,
}

#[derive(Deserialize)]
struct EsProjectItem {
    #[serde(flatten)]
    project: Project,
    #[serde(rename = "envList", default)]
    env_list: Vec<EnvVar>,
}

#[derive(Deserialize)]
struct EsStackTypeItem {
    name: String,
    #[serde(default)]
    category: String,
    #[serde(rename = "serviceStackTypeVersionList", default)]
    versions: Vec<crate::core::types::ServiceStackTypeVersion>,
}

#[derive(Deserialize)]
struct RawProcess {
    id: String,
    #[serde(rename = "actionName", default)]
    action_name: String,
    #[serde(default)]
    status: String,
    #[serde(rename = "serviceStacks", default)]
    service_stacks: Vec<ServiceStackRef>,
    #[serde(default)]
    created: String,
    #[serde(default)]
    started: Option<String>,
    #[serde(default)]
    finished: Option<String>,
    #[serde(rename = "publicMeta", default)]
    public_meta: Option<serde_json::Value>,
}

impl RawProcess {
    fn into_process(self) -> Process {
        let fail_reason = self
            .public_meta
            .as_ref()
            .and_then(|m| m.get("failReason"))
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .map(String::from);
        Process {
            id: self.id,
            action_name: self.action_name,
            status: normalize_status(&self.status),
            service_stacks: self.service_stacks,
            created: self.created,
            started: self.started,
            finished: self.finished,
            fail_reason,
        }
    }
}

#[derive(Deserialize)]
struct AutoscalingResponse {
    #[serde(default)]
    process: Option<RawProcess>,
}

#[derive(Deserialize)]
struct RawImportResult {
    #[serde(rename = "projectId", default)]
    project_id: String,
    #[serde(rename = "projectName", default)]
    project_name: String,
    #[serde(rename = "serviceStacks", default)]
    service_stacks: Vec<RawImportedStack>,
}

#[derive(Deserialize)]
struct RawImportedStack {
    #[serde(default)]
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    error: Option<ApiErrorBody>,
    #[serde(default)]
    processes: Vec<RawProcess>,
}

/// The API reports DONE/CANCELLED; internally we use FINISHED/CANCELED.
fn normalize_status(status: &str) -> String {
    match status {
        "DONE" => "FINISHED".to_string(),
        "CANCELLED" => "CANCELED".to_string(),
        other => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Autoscaling wire shapes
// ---------------------------------------------------------------------------

#[derive(Serialize, Default)]
struct AutoscalingBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    mode: Option<String>,
    #[serde(rename = "customAutoscaling", skip_serializing_if = "Option::is_none")]
    custom_autoscaling: Option<CustomAutoscalingBody>,
}

#[derive(Serialize, Default)]
struct CustomAutoscalingBody {
    #[serde(rename = "verticalAutoscaling", skip_serializing_if = "Option::is_none")]
    vertical: Option<VerticalBody>,
    #[serde(rename = "horizontalAutoscaling", skip_serializing_if = "Option::is_none")]
    horizontal: Option<HorizontalBody>,
}

#[derive(Serialize, Default)]
struct VerticalBody {
    #[serde(rename = "cpuMode", skip_serializing_if = "Option::is_none")]
    cpu_mode: Option<String>,
    #[serde(rename = "minResource", skip_serializing_if = "Option::is_none")]
    min_resource: Option<ResourceBody>,
    #[serde(rename = "maxResource", skip_serializing_if = "Option::is_none")]
    max_resource: Option<ResourceBody>,
}

#[derive(Serialize, Default)]
struct ResourceBody {
    #[serde(rename = "cpuCoreCount", skip_serializing_if = "Option::is_none")]
    cpu_core_count: Option<i32>,
    #[serde(rename = "memoryGBytes", skip_serializing_if = "Option::is_none")]
    memory_g_bytes: Option<f64>,
    #[serde(rename = "diskGBytes", skip_serializing_if = "Option::is_none")]
    disk_g_bytes: Option<f64>,
}

#[derive(Serialize, Default)]
struct HorizontalBody {
    #[serde(rename = "minContainerCount", skip_serializing_if = "Option::is_none")]
    min_container_count: Option<i32>,
    #[serde(rename = "maxContainerCount", skip_serializing_if = "Option::is_none")]
    max_container_count: Option<i32>,
}

/// Builds the PUT body. The current HA/NON_HA mode rides along when known
/// since a missing mode makes the API reject the update.
fn build_autoscaling_body(params: &AutoscalingParams) -> AutoscalingBody {
    let mut body = AutoscalingBody::default();
    if !params.service_mode.is_empty() {
        body.mode = Some(params.service_mode.clone());
    }

    let needs_vertical = params.cpu_mode.is_some()
        || params.min_cpu.is_some()
        || params.max_cpu.is_some()
        || params.min_ram.is_some()
        || params.max_ram.is_some()
        || params.min_disk.is_some()
        || params.max_disk.is_some();
    let vertical = needs_vertical.then(|| {
        let min_resource = (params.min_cpu.is_some()
            || params.min_ram.is_some()
            || params.min_disk.is_some())
        .then(|| ResourceBody {
            cpu_core_count: params.min_cpu,
            memory_g_bytes: params.min_ram,
            disk_g_bytes: params.min_disk,
        });
        let max_resource = (params.max_cpu.is_some()
            || params.max_ram.is_some()
            || params.max_disk.is_some())
        .then(|| ResourceBody {
            cpu_core_count: params.max_cpu,
            memory_g_bytes: params.max_ram,
            disk_g_bytes: params.max_disk,
        });
        VerticalBody {
            cpu_mode: params.cpu_mode.clone(),
            min_resource,
            max_resource,
        }
    });

    let horizontal = (params.horizontal_min_count.is_some()
        || params.horizontal_max_count.is_some())
    .then(|| HorizontalBody {
        min_container_count: params.horizontal_min_count,
        max_container_count: params.horizontal_max_count,
    });

    if vertical.is_some() || horizontal.is_some() {
        body.custom_autoscaling = Some(CustomAutoscalingBody {
            vertical,
            horizontal,
        });
    }
    body
}

#[derive(Deserialize, Default)]
struct RawAutoscalingWrapper {
    #[serde(rename = "currentAutoscaling", default)]
    current: Option<RawAutoscaling>,
    #[serde(rename = "customAutoscaling", default)]
    custom: Option<RawAutoscaling>,
}

#[derive(Deserialize, Default, Clone)]
struct RawAutoscaling {
    #[serde(rename = "verticalAutoscaling", default)]
    vertical: Option<RawVertical>,
    #[serde(rename = "horizontalAutoscaling", default)]
    horizontal: Option<RawHorizontal>,
}

#[derive(Deserialize, Default, Clone)]
struct RawVertical {
    #[serde(rename = "cpuMode", default)]
    cpu_mode: Option<String>,
    #[serde(rename = "minResource", default)]
    min_resource: Option<RawResource>,
    #[serde(rename = "maxResource", default)]
    max_resource: Option<RawResource>,
}

#[derive(Deserialize, Default, Clone)]
struct RawResource {
    #[serde(rename = "cpuCoreCount", default)]
    cpu_core_count: Option<f64>,
    #[serde(rename = "memoryGBytes", default)]
    memory_g_bytes: Option<f64>,
    #[serde(rename = "diskGBytes", default)]
    disk_g_bytes: Option<f64>,
}

#[derive(Deserialize, Default, Clone)]
struct RawHorizontal {
    #[serde(rename = "minContainerCount", default)]
    min_container_count: Option<f64>,
    #[serde(rename = "maxContainerCount", default)]
    max_container_count: Option<f64>,
}

/// Flattens nested autoscaling JSON, preferring `currentAutoscaling` (what
/// the platform is actually using) over `customAutoscaling` overrides.
fn parse_raw_autoscaling(body: &str) -> Option<Autoscaling> {
    let wrapper: RawAutoscalingWrapper = serde_json::from_str(body).ok()?;
    let (primary, fallback) = match (wrapper.current, wrapper.custom) {
        (Some(p), f) => (p, f),
        (None, Some(f)) => (f, None),
        (None, None) => return None,
    };

    let vertical = primary
        .vertical
        .or_else(|| fallback.as_ref().and_then(|f| f.vertical.clone()));
    let horizontal = primary
        .horizontal
        .or_else(|| fallback.and_then(|f| f.horizontal));

    let mut out = Autoscaling::default();
    if let Some(v) = vertical {
        if let Some(mode) = v.cpu_mode {
            out.cpu_mode = mode;
        }
        if let Some(min) = v.min_resource {
            out.min_cpu = min.cpu_core_count.unwrap_or_default() as i32;
            out.min_ram = min.memory_g_bytes.unwrap_or_default();
            out.min_disk = min.disk_g_bytes.unwrap_or_default();
        }
        if let Some(max) = v.max_resource {
            out.max_cpu = max.cpu_core_count.unwrap_or_default() as i32;
            out.max_ram = max.memory_g_bytes.unwrap_or_default();
            out.max_disk = max.disk_g_bytes.unwrap_or_default();
        }
    }
    if let Some(h) = horizontal {
        out.horizontal_min_count = h.min_container_count.unwrap_or_default() as i32;
        out.horizontal_max_count = h.max_container_count.unwrap_or_default() as i32;
    }

    if out == Autoscaling::default() {
        return None;
    }
    Some(out)
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

#[derive(Deserialize, Default)]
struct ApiErrorEnvelope {
    #[serde(default)]
    error: Option<ApiErrorBody>,
}

fn decode_err(e: serde_json::Error) -> PlatformError {
    PlatformError::new(codes::API_ERROR, format!("decode response: {}", e), "")
}

fn map_transport_error(err: &reqwest::Error) -> PlatformError {
    if err.is_timeout() {
        return PlatformError::new(
            codes::API_TIMEOUT,
            "API request timed out",
            "Retry the operation",
        );
    }
    if err.is_connect() {
        return PlatformError::new(
            codes::NETWORK_ERROR,
            err.to_string(),
            "Check API host and network",
        );
    }
    PlatformError::new(codes::API_ERROR, err.to_string(), "")
}

fn map_api_error(status: StatusCode, body: &str, entity: &str) -> PlatformError {
    let parsed: ApiErrorEnvelope = serde_json::from_str(body).unwrap_or_default();
    let (err_code, message) = match parsed.error {
        Some(e) if !e.message.is_empty() => (e.code, e.message),
        Some(e) => (e.code, body.to_string()),
        None => (String::new(), body.to_string()),
    };

    match status.as_u16() {
        401 => PlatformError::new(codes::AUTH_TOKEN_EXPIRED, message, "Check token validity"),
        403 => PlatformError::new(codes::PERMISSION_DENIED, message, "Check token permissions"),
        404 if entity == "process" => {
            PlatformError::new(codes::PROCESS_NOT_FOUND, message, "Check process ID")
        }
        404 => PlatformError::new(codes::SERVICE_NOT_FOUND, message, "Check service hostname"),
        429 => PlatformError::new(codes::API_RATE_LIMITED, message, "Wait and retry"),
        _ => {
            let lc = err_code.to_ascii_lowercase();
            if lc.contains("subdomainaccessalreadyenabled") {
                return PlatformError::new(codes::SUBDOMAIN_ALREADY_ENABLED, message, "");
            }
            if lc.contains("subdomainaccessalreadydisabled") {
                return PlatformError::new(codes::SUBDOMAIN_ALREADY_DISABLED, message, "");
            }
            if status.is_server_error() {
                return PlatformError::new(codes::API_ERROR, message, "Retry later");
            }
            PlatformError::new(codes::API_ERROR, message, "")
        }
    }
}

// ---------------------------------------------------------------------------
// Log backend
// ---------------------------------------------------------------------------

/// Fetches logs from the Zerops log backend, a separate HTTP service
/// addressed by a short-lived URL + token from [`Client::get_project_log`].
pub struct ZeropsLogFetcher {
    http: HttpClient,
}

impl ZeropsLogFetcher {
    pub fn new() -> PlatformResult<Self> {
        let http = HttpClient::builder()
            .timeout(Duration::from_secs(DEFAULT_API_TIMEOUT_SECS))
            .build()
            .map_err(|e| {
                PlatformError::new(codes::API_ERROR, format!("build http client: {}", e), "")
            })?;
        Ok(Self { http })
    }
}

impl LogFetcher for ZeropsLogFetcher {
    fn fetch_logs(
        &self,
        access: &LogAccess,
        params: &LogFetchParams,
    ) -> PlatformResult<Vec<LogEntry>> {
        let url = normalize_log_url(&access.url);

        let mut query: Vec<(&str, String)> = Vec::new();
        if !params.service_id.is_empty() {
            query.push(("serviceStackId", params.service_id.clone()));
        }
        let tail = if params.limit > 0 {
            params.limit
        } else {
            DEFAULT_LOG_TAIL
        };
        query.push(("tail", tail.to_string()));
        if !params.since.is_empty() {
            query.push(("since", params.since.clone()));
        }
        if !params.severity.is_empty() && params.severity != "all" {
            query.push(("severity", params.severity.clone()));
        }
        if !params.search.is_empty() {
            query.push(("search", params.search.clone()));
        }

        let resp = self
            .http
            .get(&url)
            .query(&query)
            .bearer_auth(&access.access_token)
            .header("Accept", "application/json")
            .send()
            .map_err(|e| map_transport_error(&e))?;

        let status = resp.status();
        let text = resp.text().map_err(|e| {
            PlatformError::new(codes::API_ERROR, format!("read log response: {}", e), "")
        })?;
        if !status.is_success() {
            return Err(PlatformError::new(
                codes::API_ERROR,
                format!("log backend returned HTTP {}: {}", status.as_u16(), text),
                "",
            ));
        }

        let mut entries = parse_log_response(&text)?;
        entries.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        if params.limit > 0 && entries.len() > params.limit {
            entries.drain(..entries.len() - params.limit);
        }
        Ok(entries)
    }
}

#[derive(Deserialize)]
struct LogApiResponse {
    #[serde(default)]
    items: Vec<LogApiItem>,
}

#[derive(Deserialize)]
struct LogApiItem {
    #[serde(default)]
    id: String,
    #[serde(default)]
    timestamp: String,
    #[serde(default)]
    hostname: String,
    #[serde(default)]
    message: String,
    #[serde(rename = "severityLabel", default)]
    severity_label: String,
}

fn parse_log_response(body: &str) -> PlatformResult<Vec<LogEntry>> {
    let resp: LogApiResponse = serde_json::from_str(body).map_err(|e| {
        PlatformError::new(codes::API_ERROR, format!("parse log response: {}", e), "")
    })?;
    Ok(resp
        .items
        .into_iter()
        .map(|item| LogEntry {
            id: item.id,
            timestamp: item.timestamp,
            severity: item.severity_label,
            message: item.message,
            container: item.hostname,
        })
        .collect())
}

/// The API hands back log URLs like `GET logs.zerops.dev/...`; strip the
/// verb and default the scheme.
fn normalize_log_url(raw: &str) -> String {
    let trimmed = raw.strip_prefix("GET ").unwrap_or(raw).trim();
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    }
}
