//! `zerops_verify` - health verification battery.
//!
//! Runtime services get up to six checks (status, logs, startup
//! marker, HTTP probes); managed services only the status check, since
//! the platform supervises them. Log and HTTP problems degrade the
//! verdict, a non-running service makes it unhealthy outright.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::core::client::{LogFetcher, PlatformResult};
use crate::core::error::ZcpError;
use crate::core::helpers::resolve_service;
use crate::core::plan::is_managed_type;
use crate::core::types::{LogAccess, LogFetchParams, ServiceStack};

use super::subdomain::build_subdomain_url;
use super::{Annotations, Deps, Outcome, Registry, Tool, error_result, json_result, parse_input};

const HEALTHY: &str = "healthy";
const DEGRADED: &str = "degraded";
const UNHEALTHY: &str = "unhealthy";

const PASS: &str = "pass";
const FAIL: &str = "fail";
const SKIP: &str = "skip";

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct VerifyInput {
    service_hostname: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VerifyResult {
    hostname: String,
    #[serde(rename = "type")]
    kind: &'static str,
    status: &'static str,
    checks: Vec<CheckResult>,
}

#[derive(Debug, Serialize)]
struct CheckResult {
    name: &'static str,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
    #[serde(rename = "httpStatus", skip_serializing_if = "Option::is_none")]
    http_status: Option<u16>,
}

impl CheckResult {
    fn pass(name: &'static str) -> Self {
        Self {
            name,
            status: PASS,
            detail: None,
            http_status: None,
        }
    }

    fn fail(name: &'static str, detail: impl Into<String>) -> Self {
        Self {
            name,
            status: FAIL,
            detail: Some(detail.into()),
            http_status: None,
        }
    }

    fn skip(name: &'static str, detail: impl Into<String>) -> Self {
        Self {
            name,
            status: SKIP,
            detail: Some(detail.into()),
            http_status: None,
        }
    }
}

/// The /status endpoint contract: either a top-level `status: ok` or a
/// `connections` map whose every entry reports `status: ok`.
#[derive(Deserialize)]
struct StatusBody {
    #[serde(default)]
    status: String,
    #[serde(default)]
    connections: BTreeMap<String, ConnectionStatus>,
}

#[derive(Deserialize)]
struct ConnectionStatus {
    #[serde(default)]
    status: String,
}

pub fn register(reg: &mut Registry) {
    reg.add(Tool {
        name: "zerops_verify",
        title: "Verify service health",
        description: "Run health verification checks on a service. Returns structured check \
                      results: service status, error logs, startup detection, HTTP health, and \
                      /status endpoint connectivity. For runtime services: 6 checks. For managed \
                      services (DB, cache): 1 check (service_running only).",
        annotations: Annotations::read_only(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "serviceHostname": {
                    "type": "string",
                    "description": "Hostname of the service to verify"
                }
            },
            "required": ["serviceHostname"],
            "additionalProperties": false
        }),
        handler: Box::new(|deps, args| {
            run(deps, args).unwrap_or_else(|e| error_result(&e))
        }),
    });
}

fn run(deps: &Deps, args: Value) -> Result<Outcome, ZcpError> {
    let input: VerifyInput = parse_input(args)?;
    let services = deps.client.list_services(&deps.auth.project_id)?;
    let svc = resolve_service(&services, &input.service_hostname)?;

    let managed = is_managed_type(&svc.type_info.version_name);
    let mut checks = vec![check_service_running(svc)];

    if managed {
        return Ok(finish(&input.service_hostname, "managed", checks));
    }

    if checks[0].status != PASS {
        for name in [
            "no_error_logs",
            "startup_detected",
            "no_recent_errors",
            "http_health",
            "http_status",
        ] {
            checks.push(CheckResult::skip(name, "service not running"));
        }
        return Ok(finish(&input.service_hostname, "runtime", checks));
    }

    // One log-access grant, reused by all three log checks.
    let log_access = deps.client.get_project_log(&deps.auth.project_id);
    let fetcher = deps.log_fetcher.as_ref();

    checks.push(check_error_logs(fetcher, &log_access, &svc.id, 5 * 60, "no_error_logs"));
    checks.push(check_startup_detected(fetcher, &log_access, &svc.id));
    checks.push(check_error_logs(fetcher, &log_access, &svc.id, 2 * 60, "no_recent_errors"));

    match resolve_subdomain_url(deps, svc) {
        Some(base) => match reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
        {
            Ok(http) => {
                checks.push(check_http_health(&http, &format!("{}/health", base)));
                checks.push(check_http_status(&http, &format!("{}/status", base)));
            }
            Err(e) => {
                let detail = format!("request failed: {}", e);
                checks.push(CheckResult::fail("http_health", detail.clone()));
                checks.push(CheckResult::fail("http_status", detail));
            }
        },
        None => {
            let detail = if svc.subdomain_access {
                "cannot resolve subdomain URL"
            } else {
                "subdomain not enabled — call zerops_subdomain action=enable first"
            };
            checks.push(CheckResult::skip("http_health", detail));
            checks.push(CheckResult::skip("http_status", detail));
        }
    }

    Ok(finish(&input.service_hostname, "runtime", checks))
}

fn finish(hostname: &str, kind: &'static str, checks: Vec<CheckResult>) -> Outcome {
    json_result(&VerifyResult {
        hostname: hostname.to_string(),
        kind,
        status: aggregate_status(&checks),
        checks,
    })
}

fn check_service_running(svc: &ServiceStack) -> CheckResult {
    if svc.status == "RUNNING" || svc.status == "ACTIVE" {
        return CheckResult::pass("service_running");
    }
    CheckResult::fail("service_running", format!("service status: {}", svc.status))
}

fn check_error_logs(
    fetcher: &dyn LogFetcher,
    access: &PlatformResult<LogAccess>,
    service_id: &str,
    window_secs: i64,
    name: &'static str,
) -> CheckResult {
    let access = match access {
        Ok(a) => a,
        Err(e) => return CheckResult::skip(name, format!("log backend unavailable: {}", e)),
    };
    let params = LogFetchParams {
        service_id: service_id.to_string(),
        severity: "error".into(),
        since: (Utc::now() - chrono::Duration::seconds(window_secs)).to_rfc3339(),
        limit: 1,
        search: String::new(),
    };
    match fetcher.fetch_logs(access, &params) {
        Err(e) => CheckResult::skip(name, format!("log backend unavailable: {}", e)),
        Ok(entries) => match entries.first() {
            Some(entry) => CheckResult::fail(name, entry.message.clone()),
            None => CheckResult::pass(name),
        },
    }
}

fn check_startup_detected(
    fetcher: &dyn LogFetcher,
    access: &PlatformResult<LogAccess>,
    service_id: &str,
) -> CheckResult {
    let name = "startup_detected";
    let access = match access {
        Ok(a) => a,
        Err(e) => return CheckResult::skip(name, format!("log backend unavailable: {}", e)),
    };
    let params = LogFetchParams {
        service_id: service_id.to_string(),
        severity: String::new(),
        since: (Utc::now() - chrono::Duration::minutes(5)).to_rfc3339(),
        limit: 1,
        search: "listening|started|ready".into(),
    };
    match fetcher.fetch_logs(access, &params) {
        Err(e) => CheckResult::skip(name, format!("log backend unavailable: {}", e)),
        Ok(entries) if entries.is_empty() => {
            CheckResult::fail(name, "no startup message found in last 5m")
        }
        Ok(_) => CheckResult::pass(name),
    }
}

fn check_http_health(http: &reqwest::blocking::Client, url: &str) -> CheckResult {
    let name = "http_health";
    let resp = match http.get(url).timeout(Duration::from_secs(5)).send() {
        Ok(r) => r,
        Err(e) => return CheckResult::fail(name, format!("request failed: {}", e)),
    };
    let code = resp.status().as_u16();
    let body = resp.text().unwrap_or_default();

    if (200..300).contains(&code) {
        return CheckResult {
            name,
            status: PASS,
            detail: None,
            http_status: Some(code),
        };
    }
    let mut detail = format!("HTTP {}", code);
    if !body.is_empty() {
        detail.push_str(": ");
        detail.push_str(&truncate_body(&body, 200));
    }
    CheckResult {
        name,
        status: FAIL,
        detail: Some(detail),
        http_status: Some(code),
    }
}

fn check_http_status(http: &reqwest::blocking::Client, url: &str) -> CheckResult {
    let resp = match http.get(url).timeout(Duration::from_secs(10)).send() {
        Ok(r) => r,
        Err(e) => return CheckResult::fail("http_status", format!("request failed: {}", e)),
    };
    let code = resp.status().as_u16();
    let body = match resp.text() {
        Ok(b) => b,
        Err(e) => return CheckResult::fail("http_status", format!("read body: {}", e)),
    };
    evaluate_status_body(code, &body)
}

/// Pure part of the /status check, split out so the response contract
/// can be tested without a live endpoint.
fn evaluate_status_body(code: u16, body: &str) -> CheckResult {
    let name = "http_status";
    if !(200..300).contains(&code) {
        let mut detail = format!("HTTP {}", code);
        if !body.is_empty() {
            detail.push_str(": ");
            detail.push_str(&truncate_body(body, 200));
        }
        return CheckResult {
            name,
            status: FAIL,
            detail: Some(detail),
            http_status: Some(code),
        };
    }

    let parsed: StatusBody = match serde_json::from_str(body) {
        Ok(p) => p,
        Err(_) => {
            return CheckResult {
                name,
                status: FAIL,
                detail: Some(format!(
                    "response not JSON (HTTP {}): {}",
                    code,
                    truncate_body(body, 200)
                )),
                http_status: Some(code),
            };
        }
    };

    if !parsed.connections.is_empty() {
        for (conn_name, conn) in &parsed.connections {
            if conn.status != "ok" {
                return CheckResult::fail(
                    name,
                    format!("connection '{}': {}", conn_name, conn.status),
                );
            }
        }
        return CheckResult::pass(name);
    }

    if parsed.status == "ok" {
        return CheckResult::pass(name);
    }
    CheckResult::fail(name, format!("status: {}", parsed.status))
}

fn truncate_body(s: &str, limit: usize) -> String {
    if s.len() <= limit {
        return s.to_string();
    }
    let mut end = limit;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &s[..end])
}

fn resolve_subdomain_url(deps: &Deps, svc: &ServiceStack) -> Option<String> {
    if !svc.subdomain_access {
        return None;
    }
    let port = svc.ports.first()?.port;
    let project = deps.client.get_project(&deps.auth.project_id).ok()?;
    build_subdomain_url(&svc.name, &project.subdomain_host, port)
}

fn aggregate_status(checks: &[CheckResult]) -> &'static str {
    let mut has_fail = false;
    for c in checks {
        if c.status == FAIL {
            if c.name == "service_running" {
                return UNHEALTHY;
            }
            has_fail = true;
        }
    }
    if has_fail { DEGRADED } else { HEALTHY }
}
