//! `zerops_logs` - runtime log retrieval.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::core::error::{ZcpError, codes};
use crate::core::helpers::{parse_since, resolve_service};
use crate::core::types::{LogEntry, LogFetchParams};

use super::{Annotations, Deps, Outcome, Registry, Tool, error_result, json_result, parse_input};

const DEFAULT_LOG_LIMIT: usize = 100;
const SEVERITIES: [&str; 5] = ["error", "warning", "info", "debug", "all"];

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct LogsInput {
    service_hostname: String,
    severity: String,
    since: String,
    limit: usize,
    search: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LogsResult {
    service_hostname: String,
    count: usize,
    entries: Vec<LogEntry>,
    /// More entries exist beyond the limit window.
    has_more: bool,
}

pub fn register(reg: &mut Registry) {
    reg.add(Tool {
        name: "zerops_logs",
        title: "Service logs",
        description: "Fetch runtime logs for a service. Filter by severity \
                      (error|warning|info|debug|all), time window (since=30m/1h/7d or RFC3339, \
                      default 1h) and a search term.",
        annotations: Annotations::read_only(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "serviceHostname": {
                    "type": "string",
                    "description": "Service to read logs from"
                },
                "severity": {
                    "type": "string",
                    "enum": SEVERITIES,
                    "description": "Minimum severity to include (default all)"
                },
                "since": {
                    "type": "string",
                    "description": "Window start: 30m, 1h, 7d or an RFC 3339 timestamp"
                },
                "limit": {
                    "type": "integer",
                    "description": "Maximum entries (default 100)"
                },
                "search": {
                    "type": "string",
                    "description": "Only entries containing this text"
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
    let input: LogsInput = parse_input(args)?;
    let services = deps.client.list_services(&deps.auth.project_id)?;
    let svc = resolve_service(&services, &input.service_hostname)?;

    let severity = input.severity.to_lowercase();
    if !severity.is_empty() && !SEVERITIES.contains(&severity.as_str()) {
        return Err(ZcpError::platform(
            codes::INVALID_PARAMETER,
            format!("Invalid severity '{}'", input.severity),
            "Use error, warning, info, debug or all",
        ));
    }

    let since = parse_since(&input.since).map_err(|e| {
        ZcpError::platform(
            codes::INVALID_PARAMETER,
            format!("Invalid since value: {}", e.message),
            "Use formats like 30m, 1h, 7d, or ISO 8601 (RFC3339)",
        )
    })?;

    let limit = if input.limit == 0 {
        DEFAULT_LOG_LIMIT
    } else {
        input.limit
    };

    let access = deps.client.get_project_log(&deps.auth.project_id)?;
    let entries = deps.log_fetcher.fetch_logs(&access, &LogFetchParams {
        service_id: svc.id.clone(),
        severity,
        since: since.to_rfc3339(),
        limit,
        search: input.search,
    })?;

    let has_more = entries.len() >= limit;
    Ok(json_result(&LogsResult {
        service_hostname: svc.name.clone(),
        count: entries.len(),
        entries,
        has_more,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::client::LogFetcher;
    use crate::core::mock::{MockClient, MockLogFetcher};
    use crate::core::types::{LogAccess, ServiceStack, ServiceTypeInfo};
    use crate::tools::tests::test_deps;
    use std::sync::Arc;

    fn service(id: &str, name: &str) -> ServiceStack {
        ServiceStack {
            id: id.into(),
            name: name.into(),
            project_id: "p1".into(),
            type_info: ServiceTypeInfo {
                version_name: "nodejs@22".into(),
                category_name: "USER".into(),
            },
            status: "RUNNING".into(),
            mode: "NON_HA".into(),
            ports: vec![],
            subdomain_access: false,
            custom_autoscaling: None,
            current_autoscaling: None,
            created: String::new(),
            last_update: String::new(),
        }
    }

    fn entry(severity: &str, message: &str) -> LogEntry {
        LogEntry {
            id: String::new(),
            timestamp: "2025-06-01T00:00:00Z".into(),
            severity: severity.into(),
            message: message.into(),
            container: "app".into(),
        }
    }

    fn deps_with_entries(entries: Vec<LogEntry>) -> crate::tools::Deps {
        let mut deps = test_deps(
            MockClient::new()
                .with_services(vec![service("s1", "app")])
                .with_log_access(LogAccess {
                    access_token: "tok".into(),
                    expiration: String::new(),
                    url: "https://logs.example".into(),
                }),
        );
        deps.log_fetcher =
            Arc::new(MockLogFetcher::new().with_entries(entries)) as Arc<dyn LogFetcher>;
        deps
    }

    #[test]
    fn test_fetches_and_counts() {
        let deps = deps_with_entries(vec![
            entry("info", "listening on 3000"),
            entry("error", "boom"),
        ]);
        let out = run(&deps, json!({"serviceHostname": "app"})).expect("logs");
        let v: Value = serde_json::from_str(&out.text).expect("json");
        assert_eq!(v["count"], 2);
        assert_eq!(v["hasMore"], false);
        assert_eq!(v["serviceHostname"], "app");
    }

    #[test]
    fn test_severity_filter_passes_through() {
        let deps = deps_with_entries(vec![
            entry("info", "listening"),
            entry("error", "boom"),
        ]);
        let out =
            run(&deps, json!({"serviceHostname": "app", "severity": "error"})).expect("logs");
        let v: Value = serde_json::from_str(&out.text).expect("json");
        assert_eq!(v["count"], 1);
        assert_eq!(v["entries"][0]["message"], "boom");
    }

    #[test]
    fn test_invalid_since_is_rejected() {
        let deps = deps_with_entries(vec![]);
        let err = run(&deps, json!({"serviceHostname": "app", "since": "yesterday"}))
            .expect_err("bad since");
        assert_eq!(err.code(), codes::INVALID_PARAMETER);
        assert!(err.to_string().contains("Invalid since value"));
    }

    #[test]
    fn test_invalid_severity_is_rejected() {
        let deps = deps_with_entries(vec![]);
        let err = run(&deps, json!({"serviceHostname": "app", "severity": "loud"}))
            .expect_err("bad severity");
        assert_eq!(err.code(), codes::INVALID_PARAMETER);
    }
}
