//! `zerops_events` - merged project activity timeline.
//!
//! Processes (start/stop/import/scale/..) and build-deploy pipeline
//! events are fetched separately by the platform API; this tool merges
//! them into one descending timeline so an agent can answer "what just
//! happened" with a single call.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::core::error::ZcpError;
use crate::core::types::{AppVersionEvent, ProcessEvent};

use super::{Annotations, Deps, Outcome, Registry, Tool, error_result, json_result, parse_input};

const DEFAULT_EVENTS_LIMIT: usize = 50;

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct EventsInput {
    service_hostname: String,
    limit: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EventsResult {
    project_id: String,
    events: Vec<TimelineEvent>,
    summary: EventsSummary,
}

#[derive(Debug, Serialize)]
struct EventsSummary {
    total: usize,
    processes: usize,
    deploys: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TimelineEvent {
    timestamp: String,
    #[serde(rename = "type")]
    kind: &'static str,
    action: String,
    status: String,
    service: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    triggered_by: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    process_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    hint: Option<&'static str>,
}

pub fn register(reg: &mut Registry) {
    reg.add(Tool {
        name: "zerops_events",
        title: "Activity timeline",
        description: "Fetch project activity timeline. Aggregates processes and build/deploy \
                      events sorted by time.",
        annotations: Annotations::read_only(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "serviceHostname": {
                    "type": "string",
                    "description": "Only events touching this service"
                },
                "limit": {
                    "type": "integer",
                    "description": "Maximum events (default 50)"
                }
            },
            "additionalProperties": false
        }),
        handler: Box::new(|deps, args| {
            run(deps, args).unwrap_or_else(|e| error_result(&e))
        }),
    });
}

fn run(deps: &Deps, args: Value) -> Result<Outcome, ZcpError> {
    let input: EventsInput = parse_input(args)?;
    let limit = if input.limit == 0 {
        DEFAULT_EVENTS_LIMIT
    } else {
        input.limit
    };

    let project_id = &deps.auth.project_id;
    let processes = deps.client.search_processes(project_id, limit)?;
    let app_versions = deps.client.search_app_versions(project_id, None, limit)?;
    let services = deps.client.list_services(project_id)?;

    let mut events = Vec::with_capacity(processes.len() + app_versions.len());
    let process_count = processes.len();
    let deploy_count = app_versions.len();

    let hostname_of = |service_id: &str| -> String {
        services
            .iter()
            .find(|s| s.id == service_id)
            .map(|s| s.name.clone())
            .unwrap_or_default()
    };

    for p in &processes {
        events.push(process_event(p, &hostname_of));
    }
    for av in &app_versions {
        events.push(app_version_event(av, &hostname_of));
    }

    if !input.service_hostname.is_empty() {
        events.retain(|e| e.service == input.service_hostname);
    }

    // RFC 3339 timestamps sort correctly as strings.
    events.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    events.truncate(limit);

    let total = events.len();
    Ok(json_result(&EventsResult {
        project_id: project_id.clone(),
        events,
        summary: EventsSummary {
            total,
            processes: process_count,
            deploys: deploy_count,
        },
    }))
}

fn process_event(p: &ProcessEvent, hostname_of: &dyn Fn(&str) -> String) -> TimelineEvent {
    let service = p
        .service_stacks
        .first()
        .map(|s| {
            let name = hostname_of(&s.id);
            if name.is_empty() { s.name.clone() } else { name }
        })
        .unwrap_or_default();

    TimelineEvent {
        timestamp: p.created.clone(),
        kind: "process",
        action: map_action_name(&p.action_name).to_string(),
        status: p.status.clone(),
        service,
        duration: calc_duration(p.started.as_deref(), p.finished.as_deref()),
        triggered_by: if p.created_by_system {
            Some("system")
        } else {
            None
        },
        process_id: Some(p.id.clone()),
        hint: process_hint(&p.status),
    }
}

fn app_version_event(av: &AppVersionEvent, hostname_of: &dyn Fn(&str) -> String) -> TimelineEvent {
    let kind = match av.status.to_ascii_uppercase().as_str() {
        "BUILDING" | "BUILD_FAILED" => "build",
        _ => "deploy",
    };
    // The pipeline is terminal once the version is active or failed;
    // created -> lastUpdate then spans the whole build+deploy run.
    let duration = match av.status.to_ascii_uppercase().as_str() {
        "ACTIVE" | "BUILD_FAILED" => calc_duration(Some(&av.created), Some(&av.last_update)),
        _ => None,
    };

    TimelineEvent {
        timestamp: av.created.clone(),
        kind,
        action: kind.to_string(),
        status: av.status.clone(),
        service: hostname_of(&av.service_stack_id),
        duration,
        triggered_by: None,
        process_id: None,
        hint: app_version_hint(&av.status),
    }
}

/// Normalizes raw platform action names to the short forms agents see
/// elsewhere in tool output. Unknown actions pass through unchanged.
fn map_action_name(name: &str) -> &str {
    match name {
        "serviceStackStart" => "start",
        "serviceStackStop" => "stop",
        "serviceStackRestart" => "restart",
        "serviceStackAutoscaling" => "scale",
        "serviceStackImport" => "import",
        "serviceStackDelete" => "delete",
        "serviceStackUserDataFile" => "env-update",
        "serviceStackEnableSubdomainAccess" => "subdomain-enable",
        "serviceStackDisableSubdomainAccess" => "subdomain-disable",
        other => other,
    }
}

fn process_hint(status: &str) -> Option<&'static str> {
    match status.to_ascii_uppercase().as_str() {
        "FINISHED" => Some("COMPLETE: Process finished successfully."),
        "RUNNING" => Some("IN_PROGRESS: Process still running."),
        "PENDING" => Some("IN_PROGRESS: Process queued."),
        "FAILED" => Some("FAILED: Process failed."),
        _ => None,
    }
}

fn app_version_hint(status: &str) -> Option<&'static str> {
    match status.to_ascii_uppercase().as_str() {
        "ACTIVE" => Some(
            "DEPLOYED: App version is deployed and running. Build pipeline complete. \
             No further polling needed.",
        ),
        "BUILDING" => Some("IN_PROGRESS: Build is running. Continue polling."),
        "DEPLOYING" => Some("IN_PROGRESS: Deploy is running. Continue polling."),
        "BUILD_FAILED" => Some("FAILED: Build failed. Check build logs with zerops_logs severity=error."),
        _ => None,
    }
}

pub(crate) fn calc_duration(started: Option<&str>, finished: Option<&str>) -> Option<String> {
    let started = chrono::DateTime::parse_from_rfc3339(started?).ok()?;
    let finished = chrono::DateTime::parse_from_rfc3339(finished?).ok()?;
    let secs = (finished - started).num_seconds();
    if secs < 0 {
        return None;
    }
    Some(format_duration(secs))
}

fn format_duration(secs: i64) -> String {
    if secs < 60 {
        return format!("{}s", secs);
    }
    if secs < 3600 {
        let (m, s) = (secs / 60, secs % 60);
        if s > 0 {
            return format!("{}m{}s", m, s);
        }
        return format!("{}m", m);
    }
    let (h, m) = (secs / 3600, (secs % 3600) / 60);
    if m > 0 {
        return format!("{}h{}m", h, m);
    }
    format!("{}h", h)
}
