//! `zerops_manage` - service lifecycle actions.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::core::error::{PlatformError, ZcpError, codes};
use crate::core::helpers::{resolve_service, validate_hostname};
use crate::core::poll::poll_process;
use crate::core::types::Process;

use super::{
    Annotations, Deps, Outcome, Registry, Tool, error_result, json_result, next_actions,
    parse_input,
};

const ACTION_SUGGESTION: &str =
    "Use start, stop, restart, reload, connect-storage, or disconnect-storage";

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct ManageInput {
    action: String,
    service_hostname: String,
    storage_hostname: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ManageResult {
    service_hostname: String,
    service_id: String,
    action: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    storage_hostname: String,
    process: Process,
    next_actions: &'static str,
}

pub fn register(reg: &mut Registry) {
    reg.add(Tool {
        name: "zerops_manage",
        title: "Manage service lifecycle",
        description: "Manage service lifecycle: start, stop, restart, or reload a service, or \
                      connect/disconnect a shared-storage volume. reload applies env var changes \
                      in ~4s without a full restart. Blocks until the action completes.",
        annotations: Annotations::destructive(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "action": {
                    "type": "string",
                    "enum": [
                        "start", "stop", "restart", "reload",
                        "connect-storage", "disconnect-storage"
                    ],
                    "description": "Lifecycle action to run"
                },
                "serviceHostname": {
                    "type": "string",
                    "description": "Service to act on"
                },
                "storageHostname": {
                    "type": "string",
                    "description": "Shared-storage service, required for the storage actions"
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
    let input: ManageInput = parse_input(args)?;
    if input.action.is_empty() {
        return Err(PlatformError::new(
            codes::INVALID_PARAMETER,
            "Action is required",
            ACTION_SUGGESTION,
        )
        .into());
    }
    validate_hostname(&input.service_hostname)?;

    let services = deps.client.list_services(&deps.auth.project_id)?;
    let svc = resolve_service(&services, &input.service_hostname)?;

    let (proc, next) = match input.action.as_str() {
        "start" => (
            deps.client.start_service(&svc.id)?,
            next_actions::MANAGE_START,
        ),
        "stop" => (
            deps.client.stop_service(&svc.id)?,
            next_actions::MANAGE_STOP,
        ),
        "restart" => (
            deps.client.restart_service(&svc.id)?,
            next_actions::MANAGE_RESTART,
        ),
        "reload" => (
            deps.client.reload_service(&svc.id)?,
            next_actions::MANAGE_RELOAD,
        ),
        "connect-storage" => {
            let storage = resolve_storage(&services, &input.storage_hostname)?;
            (
                deps.client.connect_shared_storage(&svc.id, &storage)?,
                next_actions::MANAGE_CONNECT,
            )
        }
        "disconnect-storage" => {
            let storage = resolve_storage(&services, &input.storage_hostname)?;
            (
                deps.client.disconnect_shared_storage(&svc.id, &storage)?,
                next_actions::MANAGE_DISCONNECT,
            )
        }
        other => {
            return Err(PlatformError::new(
                codes::INVALID_PARAMETER,
                format!("Invalid action '{}'", other),
                ACTION_SUGGESTION,
            )
            .into());
        }
    };

    let final_proc = poll_process(deps.client.as_ref(), &proc.id)?;

    Ok(json_result(&ManageResult {
        service_hostname: input.service_hostname,
        service_id: svc.id.clone(),
        action: input.action,
        storage_hostname: input.storage_hostname,
        process: final_proc,
        next_actions: next,
    }))
}

fn resolve_storage(
    services: &[crate::core::types::ServiceStack],
    storage_hostname: &str,
) -> Result<String, ZcpError> {
    if storage_hostname.is_empty() {
        return Err(PlatformError::new(
            codes::SERVICE_REQUIRED,
            "Storage hostname is required",
            "Provide storageHostname parameter",
        )
        .into());
    }
    Ok(resolve_service(services, storage_hostname)?.id.clone())
}
