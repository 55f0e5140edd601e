//! `zerops_process` - async operation status.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::core::error::{ZcpError, codes};

use super::{Annotations, Deps, Outcome, Registry, Tool, error_result, json_result, parse_input};

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct ProcessInput {
    process_id: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProcessStatusResult {
    process_id: String,
    action_name: String,
    status: String,
    created: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    started: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    finished: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    fail_reason: Option<String>,
}

pub fn register(reg: &mut Registry) {
    reg.add(Tool {
        name: "zerops_process",
        title: "Process status",
        description: "Check the status of an async operation by process ID. Terminal statuses \
                      are FINISHED, FAILED and CANCELED.",
        annotations: Annotations::read_only(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "processId": {
                    "type": "string",
                    "description": "Process ID returned by a mutating tool"
                }
            },
            "required": ["processId"],
            "additionalProperties": false
        }),
        handler: Box::new(|deps, args| {
            run(deps, args).unwrap_or_else(|e| error_result(&e))
        }),
    });
}

fn run(deps: &Deps, args: Value) -> Result<Outcome, ZcpError> {
    let input: ProcessInput = parse_input(args)?;
    if input.process_id.is_empty() {
        return Err(ZcpError::platform(
            codes::INVALID_PARAMETER,
            "processId is required",
            "Pass the process ID returned by the mutating tool",
        ));
    }

    let process = deps.client.get_process(&input.process_id).map_err(|e| {
        if e.code == codes::PROCESS_NOT_FOUND {
            ZcpError::platform(
                codes::PROCESS_NOT_FOUND,
                format!("Process '{}' not found", input.process_id),
                "Check the process ID",
            )
        } else {
            e.into()
        }
    })?;

    Ok(json_result(&ProcessStatusResult {
        process_id: process.id,
        action_name: process.action_name,
        status: process.status,
        created: process.created,
        started: process.started,
        finished: process.finished,
        fail_reason: process.fail_reason,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::mock::MockClient;
    use crate::core::types::Process;
    use crate::tools::tests::test_deps;

    #[test]
    fn test_reports_process_status() {
        let deps = test_deps(MockClient::new().with_process(Process {
            id: "proc-1".into(),
            action_name: "stack.deploy".into(),
            status: "RUNNING".into(),
            service_stacks: vec![],
            created: "2025-06-01T00:00:00Z".into(),
            started: Some("2025-06-01T00:00:05Z".into()),
            finished: None,
            fail_reason: None,
        }));
        let out = run(&deps, json!({"processId": "proc-1"})).expect("status");
        let v: Value = serde_json::from_str(&out.text).expect("json");
        assert_eq!(v["status"], "RUNNING");
        assert_eq!(v["actionName"], "stack.deploy");
        assert!(v.get("finished").is_none());
    }

    #[test]
    fn test_missing_process() {
        let deps = test_deps(MockClient::new());
        let err = run(&deps, json!({"processId": "ghost"})).expect_err("missing");
        assert_eq!(err.code(), codes::PROCESS_NOT_FOUND);
        assert!(err.to_string().contains("'ghost' not found"));
    }
}
