//! `zerops_discover` - project and service state.

use serde::Deserialize;
use serde_json::{Map, Value, json};

use crate::core::error::ZcpError;
use crate::core::helpers::{env_vars_to_json, resolve_service};
use crate::core::types::{Autoscaling, ServiceStack};

use super::{Annotations, Deps, Outcome, Registry, Tool, error_result, json_result, parse_input};

const REFERENCE_NOTE: &str = "Values showing ${...} are cross-service references — resolved inside the running container, not in the API. Do not restart to resolve them.";

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct DiscoverInput {
    service: String,
    include_envs: bool,
}

pub fn register(reg: &mut Registry) {
    reg.add(Tool {
        name: "zerops_discover",
        title: "Discover project",
        description: "List the project and its services: hostnames, types, statuses, ports and \
                      autoscaling. Pass service=<hostname> for one service in full detail, \
                      includeEnvs=true to include environment variables.",
        annotations: Annotations::read_only(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "service": {
                    "type": "string",
                    "description": "Limit output to this service hostname"
                },
                "includeEnvs": {
                    "type": "boolean",
                    "description": "Include project and per-service environment variables"
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
    let input: DiscoverInput = parse_input(args)?;
    let services = deps.client.list_services(&deps.auth.project_id)?;

    if !input.service.is_empty() {
        return single_service(deps, &services, &input);
    }

    let project = deps.client.get_project(&deps.auth.project_id)?;
    let mut project_json = json!({
        "id": project.id,
        "name": project.name,
        "status": project.status,
    });
    let mut has_reference = false;

    if input.include_envs {
        let envs = deps.client.get_project_env(&deps.auth.project_id)?;
        let envs = env_vars_to_json(&envs);
        has_reference |= any_reference(&envs);
        project_json["envs"] = Value::Array(envs);
    }

    let mut service_list = Vec::new();
    for svc in services.iter().filter(|s| !s.is_system()) {
        let mut entry = service_summary(svc);
        if input.include_envs {
            let envs = deps.client.get_service_env(&svc.id)?;
            let envs = env_vars_to_json(&envs);
            has_reference |= any_reference(&envs);
            entry["envs"] = Value::Array(envs);
        }
        service_list.push(entry);
    }

    let mut result = json!({
        "project": project_json,
        "services": service_list,
    });
    if has_reference {
        result["note"] = json!(REFERENCE_NOTE);
    }
    Ok(json_result(&result))
}

/// Full detail for one service, fetched fresh so autoscaling is present.
fn single_service(
    deps: &Deps,
    services: &[ServiceStack],
    input: &DiscoverInput,
) -> Result<Outcome, ZcpError> {
    let svc = resolve_service(services, &input.service)?;
    let detail = deps.client.get_service(&svc.id)?;

    let mut entry = service_summary(&detail);
    entry["serviceId"] = json!(detail.id);
    if !detail.created.is_empty() {
        entry["created"] = json!(detail.created);
    }

    let mut has_reference = false;
    if input.include_envs {
        let envs = deps.client.get_service_env(&detail.id)?;
        let envs = env_vars_to_json(&envs);
        has_reference = any_reference(&envs);
        entry["envs"] = Value::Array(envs);
    }

    let mut result = json!({ "service": entry });
    if has_reference {
        result["note"] = json!(REFERENCE_NOTE);
    }
    Ok(json_result(&result))
}

fn service_summary(svc: &ServiceStack) -> Value {
    let mut entry = json!({
        "hostname": svc.name,
        "type": svc.type_info.version_name,
        "status": svc.status,
    });
    if !svc.mode.is_empty() {
        entry["mode"] = json!(svc.mode);
    }
    if !svc.ports.is_empty() {
        entry["ports"] = json!(svc.ports);
    }
    let autoscaling = svc
        .current_autoscaling
        .as_ref()
        .or(svc.custom_autoscaling.as_ref());
    if let Some(a) = autoscaling {
        let compact = autoscaling_json(a);
        if !compact.as_object().is_none_or(Map::is_empty) {
            entry["autoscaling"] = compact;
        }
    }
    entry
}

/// Compact autoscaling view with zero-valued fields omitted.
fn autoscaling_json(a: &Autoscaling) -> Value {
    let mut m = Map::new();
    if !a.cpu_mode.is_empty() {
        m.insert("cpuMode".into(), json!(a.cpu_mode));
    }
    if a.min_cpu > 0 {
        m.insert("minCpu".into(), json!(a.min_cpu));
    }
    if a.max_cpu > 0 {
        m.insert("maxCpu".into(), json!(a.max_cpu));
    }
    if a.min_ram > 0.0 {
        m.insert("minRam".into(), json!(a.min_ram));
    }
    if a.max_ram > 0.0 {
        m.insert("maxRam".into(), json!(a.max_ram));
    }
    if a.min_disk > 0.0 {
        m.insert("minDisk".into(), json!(a.min_disk));
    }
    if a.max_disk > 0.0 {
        m.insert("maxDisk".into(), json!(a.max_disk));
    }
    if a.horizontal_min_count > 0 {
        m.insert("minContainers".into(), json!(a.horizontal_min_count));
    }
    if a.horizontal_max_count > 0 {
        m.insert("maxContainers".into(), json!(a.horizontal_max_count));
    }
    Value::Object(m)
}

fn any_reference(envs: &[Value]) -> bool {
    envs.iter()
        .any(|e| e.get("isReference").is_some_and(|v| v == &json!(true)))
}
