//! `zerops_env` - service environment variables.
//!
//! The platform stores user variables as one dotenv file per service,
//! and the write endpoint replaces the whole file. `set` therefore
//! merges the requested pairs into the current variables before
//! writing back, so unrelated keys survive.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::core::error::{PlatformError, ZcpError, codes};
use crate::core::helpers::{
    env_vars_to_json, is_injected_env_key, parse_env_pairs, resolve_service, validate_hostname,
};
use crate::core::poll::poll_process;
use crate::core::types::{EnvVar, Process};

use super::{
    Annotations, Deps, Outcome, Registry, Tool, error_result, json_result, next_actions,
    parse_input,
};

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct EnvInput {
    action: String,
    service_hostname: String,
    variables: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EnvGetResult {
    scope: &'static str,
    service_hostname: String,
    vars: Vec<Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EnvSetResult {
    scope: &'static str,
    service_hostname: String,
    /// Variable count after the merge.
    count: usize,
    process: Process,
    next_actions: &'static str,
}

pub fn register(reg: &mut Registry) {
    reg.add(Tool {
        name: "zerops_env",
        title: "Service environment variables",
        description: "Read or set environment variables on a service. action=get lists current \
                      variables; action=set merges KEY=value pairs into the service env file and \
                      blocks until the change is applied. Changed variables need zerops_manage \
                      action=reload to reach the running process.",
        annotations: Annotations::mutating(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "action": {
                    "type": "string",
                    "enum": ["get", "set"],
                    "description": "get or set"
                },
                "serviceHostname": {
                    "type": "string",
                    "description": "Service whose variables to read or change"
                },
                "variables": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "KEY=value strings, required for action=set"
                }
            },
            "required": ["action", "serviceHostname"],
            "additionalProperties": false
        }),
        handler: Box::new(|deps, args| {
            run(deps, args).unwrap_or_else(|e| error_result(&e))
        }),
    });
}

fn run(deps: &Deps, args: Value) -> Result<Outcome, ZcpError> {
    let input: EnvInput = parse_input(args)?;
    validate_hostname(&input.service_hostname)?;

    let services = deps.client.list_services(&deps.auth.project_id)?;
    let svc = resolve_service(&services, &input.service_hostname)?;

    match input.action.as_str() {
        "get" => {
            let envs = deps.client.get_service_env(&svc.id)?;
            Ok(json_result(&EnvGetResult {
                scope: "service",
                service_hostname: input.service_hostname,
                vars: env_vars_to_json(&envs),
            }))
        }
        "set" => {
            if input.variables.is_empty() {
                return Err(PlatformError::new(
                    codes::INVALID_PARAMETER,
                    "No variables provided",
                    "Pass variables as [\"KEY=value\", ...]",
                )
                .into());
            }
            let pairs = parse_env_pairs(&input.variables)?;
            let current = deps.client.get_service_env(&svc.id)?;
            let merged = merge_env(&current, pairs);
            let content = build_env_file(&merged);

            let proc = deps.client.set_service_env_file(&svc.id, &content)?;
            let final_proc = poll_process(deps.client.as_ref(), &proc.id)?;

            Ok(json_result(&EnvSetResult {
                scope: "service",
                service_hostname: input.service_hostname,
                count: merged.len(),
                process: final_proc,
                next_actions: next_actions::ENV_SET_SUCCESS,
            }))
        }
        other => Err(PlatformError::new(
            codes::INVALID_PARAMETER,
            format!("Invalid action '{}'", other),
            "Use action='get' or action='set'",
        )
        .into()),
    }
}

/// Existing variables keep their position, overridden keys take the
/// new value in place, brand-new keys append in input order.
fn merge_env(current: &[EnvVar], pairs: Vec<(String, String)>) -> Vec<(String, String)> {
    let mut merged: Vec<(String, String)> = Vec::with_capacity(current.len() + pairs.len());
    let mut pending = pairs;

    for env in current {
        if is_injected_env_key(&env.key) {
            continue;
        }
        match pending.iter().position(|(k, _)| *k == env.key) {
            Some(idx) => {
                let (key, value) = pending.remove(idx);
                merged.push((key, value));
            }
            None => merged.push((env.key.clone(), env.content.clone())),
        }
    }
    merged.extend(pending);
    merged
}

fn build_env_file(pairs: &[(String, String)]) -> String {
    let mut out = String::new();
    for (key, value) in pairs {
        out.push_str(key);
        out.push('=');
        out.push_str(value);
        out.push('\n');
    }
    out
}
