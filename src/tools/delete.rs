//! `zerops_delete` - confirm-gated service deletion.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::core::error::{PlatformError, ZcpError, codes};
use crate::core::helpers::{resolve_service, validate_hostname};
use crate::core::poll::poll_process;
use crate::core::types::Process;

use super::{Annotations, Deps, Outcome, Registry, Tool, error_result, json_result, parse_input};

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct DeleteInput {
    service_hostname: String,
    confirm: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DeleteResult {
    service_hostname: String,
    service_id: String,
    process: Process,
}

pub fn register(reg: &mut Registry) {
    reg.add(Tool {
        name: "zerops_delete",
        title: "Delete a service",
        description: "Delete a service. Requires confirm=true. This is destructive and \
                      permanent. Blocks until the deletion completes.",
        annotations: Annotations::destructive(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "serviceHostname": {
                    "type": "string",
                    "description": "Hostname of the service to delete"
                },
                "confirm": {
                    "type": "boolean",
                    "description": "Must be true to confirm deletion"
                }
            },
            "required": ["serviceHostname", "confirm"],
            "additionalProperties": false
        }),
        handler: Box::new(|deps, args| {
            run(deps, args).unwrap_or_else(|e| error_result(&e))
        }),
    });
}

fn run(deps: &Deps, args: Value) -> Result<Outcome, ZcpError> {
    let input: DeleteInput = parse_input(args)?;
    // The confirm gate comes before any other validation.
    if !input.confirm {
        return Err(PlatformError::new(
            codes::CONFIRM_REQUIRED,
            "Deletion requires confirmation",
            "Set confirm=true to proceed with deletion",
        )
        .into());
    }
    validate_hostname(&input.service_hostname)?;

    let services = deps.client.list_services(&deps.auth.project_id)?;
    let svc = resolve_service(&services, &input.service_hostname)?;

    let proc = deps.client.delete_service(&svc.id)?;
    let final_proc = poll_process(deps.client.as_ref(), &proc.id)?;

    Ok(json_result(&DeleteResult {
        service_hostname: input.service_hostname,
        service_id: svc.id.clone(),
        process: final_proc,
    }))
}
