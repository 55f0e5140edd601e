//! `zerops_import` - create or reconfigure services from import YAML.

use std::thread;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

use crate::core::client::{Client, PlatformResult};
use crate::core::error::{PlatformError, ZcpError, codes};
use crate::core::helpers::is_valid_hostname;
use crate::core::poll::{PollConfig, poll_process};
use crate::knowledge::versions::{ImportService, validate_service_types};

use super::{
    Annotations, Deps, Outcome, Registry, Tool, error_result, json_result, next_actions,
    parse_input, require_workflow,
};

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct ImportInput {
    content: String,
    file_path: String,
    dry_run: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImportOutput {
    project_id: String,
    project_name: String,
    processes: Vec<ImportProcessOutput>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    next_actions: Option<&'static str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImportProcessOutput {
    process_id: String,
    action_name: String,
    status: String,
    service: String,
    service_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    fail_reason: Option<String>,
}

#[derive(Debug, Serialize)]
struct DryRunOutput {
    valid: bool,
    services: Vec<DryRunService>,
    warnings: Vec<String>,
}

#[derive(Debug, Serialize)]
struct DryRunService {
    hostname: String,
    #[serde(rename = "type")]
    service_type: String,
}

pub fn register(reg: &mut Registry) {
    reg.add(Tool {
        name: "zerops_import",
        title: "Import services from YAML",
        description: "REQUIRES active workflow session - call zerops_workflow action=\"start\" \
                      first. Import services from YAML into the current project. Validates \
                      service types before calling the API; set dryRun=true to validate without \
                      creating anything. Blocks until all processes complete - returns final \
                      statuses (FINISHED/FAILED). NOTE: enableSubdomainAccess=true in import \
                      YAML pre-configures routing but does NOT activate it. You MUST call \
                      zerops_subdomain action=\"enable\" after the first successful deploy to \
                      activate routing and get subdomain URLs.",
        annotations: Annotations::destructive(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "content": {
                    "type": "string",
                    "description": "Inline import YAML. Provide either content or filePath."
                },
                "filePath": {
                    "type": "string",
                    "description": "Path to an import YAML file. Provide either filePath or content."
                },
                "dryRun": {
                    "type": "boolean",
                    "description": "Validate only, skip the platform call"
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
    require_workflow(deps)?;
    let input: ImportInput = parse_input(args)?;
    let yaml = resolve_input(&input.content, &input.file_path)?;

    let doc: serde_yaml::Mapping = serde_yaml::from_str(&yaml).map_err(|e| {
        PlatformError::new(
            codes::INVALID_IMPORT_YML,
            format!("invalid YAML: {}", e),
            "Check YAML syntax",
        )
    })?;

    if doc.get("project").is_some() {
        return Err(PlatformError::new(
            codes::IMPORT_HAS_PROJECT,
            "import YAML must not contain a 'project:' section",
            "Remove the 'project:' section. Import works within an existing project.",
        )
        .into());
    }

    let services = extract_services(&doc);
    check_hostnames(&services)?;

    let live_types = deps.cache.get(deps.client.as_ref());
    let warnings = validate_service_types(&services, &live_types);

    if input.dry_run {
        return Ok(json_result(&DryRunOutput {
            valid: true,
            services: services
                .into_iter()
                .map(|s| DryRunService {
                    hostname: s.hostname,
                    service_type: s.service_type,
                })
                .collect(),
            warnings,
        }));
    }

    let hostnames: Vec<&str> = services
        .iter()
        .filter(|s| !s.hostname.is_empty())
        .map(|s| s.hostname.as_str())
        .collect();
    wait_for_deleting(
        deps.client.as_ref(),
        &deps.auth.project_id,
        &hostnames,
        PollConfig::default(),
    )?;

    let result = deps.client.import_services(&deps.auth.project_id, &yaml)?;

    let mut processes = Vec::new();
    for ss in &result.service_stacks {
        for p in &ss.processes {
            processes.push(ImportProcessOutput {
                process_id: p.id.clone(),
                action_name: p.action_name.clone(),
                status: p.status.clone(),
                service: ss.name.clone(),
                service_id: ss.id.clone(),
                fail_reason: p.fail_reason.clone(),
            });
        }
    }

    let (summary, next) = poll_import_processes(deps.client.as_ref(), &mut processes);

    Ok(json_result(&ImportOutput {
        project_id: result.project_id,
        project_name: result.project_name,
        processes,
        warnings,
        summary,
        next_actions: next,
    }))
}

/// Polls every import process to a terminal status, updating the outputs
/// in place. Poll errors keep the original status; the summary reflects
/// whatever completed.
fn poll_import_processes(
    client: &dyn Client,
    processes: &mut [ImportProcessOutput],
) -> (String, Option<&'static str>) {
    let mut finished = 0usize;
    let mut failed = 0usize;
    for proc in processes.iter_mut() {
        if proc.process_id.is_empty() {
            continue;
        }
        let Ok(final_proc) = poll_process(client, &proc.process_id) else {
            continue;
        };
        proc.status = final_proc.status;
        proc.fail_reason = final_proc.fail_reason;
        match proc.status.as_str() {
            "FINISHED" => finished += 1,
            "FAILED" => failed += 1,
            _ => {}
        }
    }

    let total = processes.len();
    if total == 0 {
        return (String::new(), None);
    }
    if failed > 0 {
        (
            format!("{}/{} processes completed, {} failed", finished, total, failed),
            Some(next_actions::IMPORT_PARTIAL),
        )
    } else {
        (
            format!("All {} processes completed successfully", total),
            Some(next_actions::IMPORT_SUCCESS),
        )
    }
}

/// Parses the service list out of the import document. Entries that are
/// not mappings are skipped, matching the lenient platform parser.
fn extract_services(doc: &serde_yaml::Mapping) -> Vec<ImportService> {
    let Some(list) = doc.get("services").and_then(serde_yaml::Value::as_sequence) else {
        return Vec::new();
    };
    list.iter()
        .filter_map(serde_yaml::Value::as_mapping)
        .map(|m| ImportService {
            hostname: m
                .get("hostname")
                .and_then(serde_yaml::Value::as_str)
                .unwrap_or_default()
                .to_string(),
            service_type: m
                .get("type")
                .and_then(serde_yaml::Value::as_str)
                .unwrap_or_default()
                .to_string(),
            has_mode: m.get("mode").is_some(),
        })
        .collect()
}

fn check_hostnames(services: &[ImportService]) -> Result<(), ZcpError> {
    for svc in services {
        if !svc.hostname.is_empty() && !is_valid_hostname(&svc.hostname) {
            return Err(PlatformError::new(
                codes::INVALID_HOSTNAME,
                format!("Invalid hostname format: {}", svc.hostname),
                "Hostname must start with a lowercase letter and contain only lowercase letters and digits (max 25 chars)",
            )
            .into());
        }
    }
    Ok(())
}

/// Blocks while any requested hostname belongs to a service still in
/// DELETING. Importing over a half-deleted hostname fails server-side.
fn wait_for_deleting(
    client: &dyn Client,
    project_id: &str,
    hostnames: &[&str],
    cfg: PollConfig,
) -> PlatformResult<()> {
    if hostnames.is_empty() {
        return Ok(());
    }

    let mut conflicts: Vec<String> = Vec::new();
    for attempt in 1..=cfg.max_attempts {
        let services = client.list_services(project_id)?;
        conflicts = services
            .iter()
            .filter(|s| s.status == "DELETING" && hostnames.contains(&s.name.as_str()))
            .map(|s| s.name.clone())
            .collect();
        if conflicts.is_empty() {
            return Ok(());
        }
        debug!(?conflicts, attempt, "waiting for DELETING services");
        if attempt < cfg.max_attempts {
            thread::sleep(cfg.interval);
        }
    }

    Err(PlatformError::new(
        codes::API_TIMEOUT,
        format!(
            "timed out waiting for DELETING services to finish: {}",
            conflicts.join(", ")
        ),
        "Services are still being deleted. Wait and retry, or use a different hostname.",
    ))
}

fn resolve_input(content: &str, file_path: &str) -> Result<String, ZcpError> {
    match (content.is_empty(), file_path.is_empty()) {
        (false, false) => Err(PlatformError::new(
            codes::INVALID_USAGE,
            "provide either content or filePath, not both",
            "Use content for inline YAML or filePath for a file",
        )
        .into()),
        (true, true) => Err(PlatformError::new(
            codes::INVALID_USAGE,
            "provide either content or filePath",
            "Use content for inline YAML or filePath for a file",
        )
        .into()),
        (true, false) => match std::fs::read_to_string(file_path) {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(PlatformError::new(
                codes::FILE_NOT_FOUND,
                format!("file not found: {}", file_path),
                "Check the file path",
            )
            .into()),
            Err(e) => Err(PlatformError::new(
                codes::FILE_NOT_FOUND,
                format!("read file: {}", e),
                "Check file permissions",
            )
            .into()),
        },
        (false, true) => Ok(content.to_string()),
    }
}
