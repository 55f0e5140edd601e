//! `zerops_scale` - autoscaling parameter updates.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::core::client::PlatformResult;
use crate::core::error::{PlatformError, ZcpError, codes};
use crate::core::helpers::{resolve_service, validate_hostname};
use crate::core::poll::poll_process;
use crate::core::types::{AutoscalingParams, Process};

use super::{
    Annotations, Deps, Outcome, Registry, Tool, error_result, json_result, next_actions,
    parse_input,
};

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct ScaleInput {
    service_hostname: String,
    cpu_mode: Option<String>,
    min_cpu: Option<i32>,
    max_cpu: Option<i32>,
    min_ram: Option<f64>,
    max_ram: Option<f64>,
    min_disk: Option<f64>,
    max_disk: Option<f64>,
    min_containers: Option<i32>,
    max_containers: Option<i32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ScaleResult {
    service_hostname: String,
    service_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    process: Option<Process>,
    #[serde(skip_serializing_if = "String::is_empty")]
    message: String,
    next_actions: &'static str,
}

pub fn register(reg: &mut Registry) {
    reg.add(Tool {
        name: "zerops_scale",
        title: "Scale a service",
        description: "Scale a service: adjust CPU, RAM, disk, and container autoscaling \
                      parameters. Blocks until the scaling process completes - returns final \
                      status (FINISHED/FAILED).",
        annotations: Annotations {
            read_only_hint: false,
            destructive_hint: true,
            idempotent_hint: true,
        },
        input_schema: json!({
            "type": "object",
            "properties": {
                "serviceHostname": {
                    "type": "string",
                    "description": "Hostname of the service to scale"
                },
                "cpuMode": {
                    "type": "string",
                    "enum": ["SHARED", "DEDICATED"],
                    "description": "CPU scaling mode"
                },
                "minCpu": { "type": "integer", "description": "Minimum CPU cores" },
                "maxCpu": { "type": "integer", "description": "Maximum CPU cores" },
                "minRam": { "type": "number", "description": "Minimum RAM in GB" },
                "maxRam": { "type": "number", "description": "Maximum RAM in GB" },
                "minDisk": { "type": "number", "description": "Minimum disk in GB" },
                "maxDisk": { "type": "number", "description": "Maximum disk in GB" },
                "minContainers": {
                    "type": "integer",
                    "description": "Minimum container count (horizontal autoscaling)"
                },
                "maxContainers": {
                    "type": "integer",
                    "description": "Maximum container count (horizontal autoscaling)"
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
    let input: ScaleInput = parse_input(args)?;
    validate_hostname(&input.service_hostname)?;
    validate_scale_input(&input)?;

    let services = deps.client.list_services(&deps.auth.project_id)?;
    let svc = resolve_service(&services, &input.service_hostname)?;

    let mut params = build_autoscaling_params(&input);
    params.service_mode = svc.mode.clone();

    let mut result = ScaleResult {
        service_hostname: svc.name.clone(),
        service_id: svc.id.clone(),
        process: None,
        message: String::new(),
        next_actions: next_actions::SCALE_SUCCESS,
    };

    match deps.client.set_autoscaling(&svc.id, &params)? {
        Some(proc) => result.process = Some(poll_process(deps.client.as_ref(), &proc.id)?),
        // The API applies some updates synchronously without a process.
        None => result.message = "Scaling parameters updated".into(),
    }

    Ok(json_result(&result))
}

fn validate_scale_input(input: &ScaleInput) -> PlatformResult<()> {
    let has_any = input.cpu_mode.is_some()
        || input.min_cpu.is_some()
        || input.max_cpu.is_some()
        || input.min_ram.is_some()
        || input.max_ram.is_some()
        || input.min_disk.is_some()
        || input.max_disk.is_some()
        || input.min_containers.is_some()
        || input.max_containers.is_some();
    if !has_any {
        return Err(PlatformError::new(
            codes::INVALID_SCALING,
            "At least one scaling parameter must be provided",
            "Provide cpuMode, minCpu/maxCpu, minRam/maxRam, minDisk/maxDisk, or \
             minContainers/maxContainers",
        ));
    }

    if let Some(mode) = &input.cpu_mode
        && mode != "SHARED"
        && mode != "DEDICATED"
    {
        return Err(PlatformError::new(
            codes::INVALID_SCALING,
            format!("Invalid cpuMode '{}'", mode),
            "Use SHARED or DEDICATED",
        ));
    }

    check_bounds(input.min_cpu, input.max_cpu, "minCpu must be <= maxCpu")?;
    check_bounds(input.min_ram, input.max_ram, "minRam must be <= maxRam")?;
    check_bounds(input.min_disk, input.max_disk, "minDisk must be <= maxDisk")?;
    check_bounds(
        input.min_containers,
        input.max_containers,
        "minContainers must be <= maxContainers",
    )?;
    Ok(())
}

fn check_bounds<T: PartialOrd>(min: Option<T>, max: Option<T>, msg: &str) -> PlatformResult<()> {
    if let (Some(lo), Some(hi)) = (min, max)
        && lo > hi
    {
        return Err(PlatformError::new(codes::INVALID_SCALING, msg, ""));
    }
    Ok(())
}

fn build_autoscaling_params(input: &ScaleInput) -> AutoscalingParams {
    AutoscalingParams {
        service_mode: String::new(),
        horizontal_min_count: input.min_containers,
        horizontal_max_count: input.max_containers,
        cpu_mode: input.cpu_mode.clone(),
        min_cpu: input.min_cpu,
        max_cpu: input.max_cpu,
        min_ram: input.min_ram,
        max_ram: input.max_ram,
        min_disk: input.min_disk,
        max_disk: input.max_disk,
    }
}
