//! `zerops_workflow` - guided sessions and the bootstrap conductor.
//!
//! With no arguments the tool describes itself: available workflows,
//! modes and the step catalogue. Actions drive the conductor; each
//! successful action returns the bootstrap payload decorated with
//! step-dependent support data (project classification, live stack
//! digest, briefing pointers).

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::core::conductor::{BootstrapResponse, build_response, step_catalogue};
use crate::core::engine::Engine;
use crate::core::error::{ZcpError, codes};
use crate::core::plan::{detect_project_state, is_managed_type};
use crate::core::state::{PlannedService, WorkflowMode, WorkflowState};
use crate::knowledge::expand_query;
use crate::knowledge::sections::is_runtime_base;
use crate::knowledge::versions::format_stack_list;

use super::{
    Annotations, Deps, Outcome, Registry, Tool, error_result, json_result, parse_input,
    text_result,
};

const PLAN_HINT: &str = "Provide valid plan: [{hostname, type, mode?}]. Hostnames: lowercase a-z0-9, max 25 chars. Managed services default to mode: NON_HA. Specify HA explicitly for production.";

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct WorkflowInput {
    action: String,
    workflow: String,
    mode: String,
    intent: String,
    step: String,
    attestation: String,
    reason: String,
    services: Vec<PlannedService>,
}

#[derive(Serialize)]
struct CatalogView {
    workflows: [&'static str; 1],
    modes: [&'static str; 4],
    steps: Vec<CatalogStep>,
    message: &'static str,
}

#[derive(Serialize)]
struct CatalogStep {
    name: &'static str,
    category: &'static str,
    skippable: bool,
}

pub fn register(reg: &mut Registry) {
    reg.add(Tool {
        name: "zerops_workflow",
        title: "Guided workflows",
        description: "Guided workflow sessions for multi-step operations. Call with no \
                      arguments to list workflows, modes and the bootstrap step catalogue. \
                      Actions: start (begins a bootstrap session; optional mode and intent), \
                      status, complete (step + attestation; step=\"plan\" accepts a typed \
                      services array instead), skip (step + reason), reset. Bootstrap walks 11 \
                      steps from detect to report; finishing the last step records evidence \
                      and closes the phase sequence. Mutating tools require an active session.",
        annotations: Annotations::mutating(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "action": {
                    "type": "string",
                    "enum": ["start", "complete", "complete-plan", "skip", "status", "reset"],
                    "description": "Conductor action; omit together with workflow for the catalogue"
                },
                "workflow": {
                    "type": "string",
                    "description": "Workflow to start; only \"bootstrap\" exists"
                },
                "mode": {
                    "type": "string",
                    "enum": ["full", "dev_only", "hotfix", "quick"],
                    "description": "Phase sequence for start (default full)"
                },
                "intent": {
                    "type": "string",
                    "description": "What is being built, e.g. \"bun api with postgres\""
                },
                "step": {
                    "type": "string",
                    "description": "Step name for complete/skip, e.g. \"detect\""
                },
                "attestation": {
                    "type": "string",
                    "description": "What was actually done in the step (min 10 chars)"
                },
                "reason": {
                    "type": "string",
                    "description": "Why a skippable step is being skipped"
                },
                "services": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "hostname": {"type": "string"},
                            "type": {"type": "string"},
                            "mode": {"type": "string", "enum": ["HA", "NON_HA"]}
                        },
                        "required": ["hostname", "type"]
                    },
                    "description": "Typed service plan for step=\"plan\""
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
    let input: WorkflowInput = parse_input(args)?;

    if input.action.is_empty() {
        if input.workflow.is_empty() {
            return Ok(json_result(&catalog_view()));
        }
        return Err(ZcpError::platform(
            codes::INVALID_PARAMETER,
            "Action is required",
            "Start the workflow with action=\"start\" workflow=\"bootstrap\"",
        ));
    }

    let engine = require_engine(deps)?;
    match input.action.as_str() {
        "start" => start_session(deps, engine, &input),
        "status" => status(deps, engine),
        "complete" => complete(deps, engine, &input),
        "complete-plan" => complete_plan(deps, engine, &input),
        "skip" => skip(deps, engine, &input),
        "reset" => {
            engine.reset()?;
            Ok(text_result("Session reset successfully."))
        }
        other => Err(ZcpError::platform(
            codes::INVALID_PARAMETER,
            format!("Unknown action '{}'", other),
            "Valid actions: start, complete, complete-plan, skip, status, reset",
        )),
    }
}

fn require_engine(deps: &Deps) -> Result<&Engine, ZcpError> {
    deps.engine.as_ref().ok_or_else(|| {
        ZcpError::platform(
            codes::NOT_IMPLEMENTED,
            "Workflow engine not initialized",
            "Ensure ZCP is configured with a state directory",
        )
    })
}

fn catalog_view() -> CatalogView {
    CatalogView {
        workflows: ["bootstrap"],
        modes: ["full", "dev_only", "hotfix", "quick"],
        steps: step_catalogue()
            .iter()
            .map(|d| CatalogStep {
                name: d.name,
                category: d.category.as_str(),
                skippable: d.skippable,
            })
            .collect(),
        message: "Start the guided flow: zerops_workflow action=\"start\" workflow=\"bootstrap\" intent=\"<what you are building>\". Mutating tools unlock once a session is active.",
    }
}

fn start_session(deps: &Deps, engine: &Engine, input: &WorkflowInput) -> Result<Outcome, ZcpError> {
    if !input.workflow.is_empty() && input.workflow != "bootstrap" {
        return Err(ZcpError::platform(
            codes::INVALID_PARAMETER,
            format!("Unknown workflow '{}'", input.workflow),
            "Only the bootstrap workflow is available",
        ));
    }

    let mode = if input.mode.is_empty() {
        WorkflowMode::default()
    } else {
        WorkflowMode::parse(&input.mode).ok_or_else(|| {
            ZcpError::platform(
                codes::INVALID_PARAMETER,
                format!("Unknown mode '{}'", input.mode),
                "Use full, dev_only, hotfix, or quick",
            )
        })?
    };

    let state = engine
        .bootstrap_start(&deps.auth.project_id, mode, &input.intent)
        .map_err(|e| {
            ZcpError::platform(
                codes::WORKFLOW_ERROR,
                format!("Start failed: {}", detail(&e)),
                "Reset the existing session first: zerops_workflow action=\"reset\"",
            )
        })?;
    respond(deps, &state)
}

fn status(deps: &Deps, engine: &Engine) -> Result<Outcome, ZcpError> {
    let mut resp = engine
        .bootstrap_status()
        .map_err(|e| not_active("Bootstrap status failed", &e))?;
    decorate(deps, &mut resp);
    Ok(json_result(&resp))
}

fn complete(deps: &Deps, engine: &Engine, input: &WorkflowInput) -> Result<Outcome, ZcpError> {
    if input.step.is_empty() {
        return Err(ZcpError::platform(
            codes::INVALID_PARAMETER,
            "Step is required for complete action",
            "Specify step name (e.g., step=\"detect\")",
        ));
    }

    // Typed plan routing for the plan step.
    if input.step == "plan" && !input.services.is_empty() {
        return complete_plan(deps, engine, input);
    }

    if input.attestation.is_empty() {
        return Err(ZcpError::platform(
            codes::INVALID_PARAMETER,
            "Attestation is required for complete action",
            "Describe what was accomplished in this step",
        ));
    }

    let state = engine
        .bootstrap_complete(&input.step, &input.attestation)
        .map_err(|e| {
            // Gate failures surface on the last step; the evidence is
            // recoverable, so point at a retry rather than a restart.
            if matches!(e, ZcpError::Gate(_)) {
                return ZcpError::platform(
                    codes::WORKFLOW_ERROR,
                    format!("Complete step failed: {}", detail(&e)),
                    "Record the missing evidence and retry this step",
                );
            }
            not_active("Complete step failed", &e)
        })?;
    respond(deps, &state)
}

fn complete_plan(deps: &Deps, engine: &Engine, input: &WorkflowInput) -> Result<Outcome, ZcpError> {
    if input.services.is_empty() {
        return Err(ZcpError::platform(
            codes::INVALID_PARAMETER,
            "Services are required for complete-plan",
            PLAN_HINT,
        ));
    }

    let live_types = deps.cache.get(deps.client.as_ref());
    let state = engine
        .bootstrap_complete_plan(input.services.clone(), &live_types)
        .map_err(|e| {
            ZcpError::platform(
                codes::INVALID_PARAMETER,
                format!("Plan validation failed: {}", detail(&e)),
                PLAN_HINT,
            )
        })?;
    respond(deps, &state)
}

fn skip(deps: &Deps, engine: &Engine, input: &WorkflowInput) -> Result<Outcome, ZcpError> {
    if input.step.is_empty() {
        return Err(ZcpError::platform(
            codes::INVALID_PARAMETER,
            "Step is required for skip action",
            "Specify step name (e.g., step=\"mount-dev\")",
        ));
    }

    let reason = if input.reason.is_empty() {
        "skipped by user"
    } else {
        input.reason.as_str()
    };

    let state = engine.bootstrap_skip(&input.step, reason).map_err(|e| {
        ZcpError::platform(
            codes::WORKFLOW_ERROR,
            format!("Skip step failed: {}", detail(&e)),
            "Only mount-dev, discover-envs, generate-code and deploy can be skipped, each with a reason",
        )
    })?;
    respond(deps, &state)
}

fn respond(deps: &Deps, state: &WorkflowState) -> Result<Outcome, ZcpError> {
    let mut resp = build_response(state)?;
    decorate(deps, &mut resp);
    Ok(json_result(&resp))
}

/// Attaches support data the current step benefits from. Failures to
/// gather it are swallowed; decorations are advisory.
fn decorate(deps: &Deps, resp: &mut BootstrapResponse) {
    let Some(step) = resp.current.as_ref().map(|c| c.name.clone()) else {
        return;
    };
    match step.as_str() {
        "detect" => {
            if let Ok(services) = deps.client.list_services(&deps.auth.project_id) {
                resp.project_state = Some(detect_project_state(&services).as_str().to_string());
            }
        }
        "plan" | "generate-import" => {
            let types = deps.cache.get(deps.client.as_ref());
            let digest = format_stack_list(&types);
            if !digest.is_empty() {
                resp.available_stacks = Some(digest);
            }
        }
        "load-knowledge" => {
            if deps.tracker.is_loaded() {
                if let Some(current) = resp.current.as_mut() {
                    current.guidance = format!(
                        "Knowledge already loaded ({}).\nComplete this step with: zerops_workflow action=\"complete\" step=\"load-knowledge\" attestation=\"Already loaded\"",
                        deps.tracker.summary()
                    );
                }
            } else {
                resp.knowledge_hint = Some(knowledge_hint(&resp.intent));
            }
        }
        _ => {}
    }
}

/// Builds a briefing pointer from whatever technologies the session
/// intent names. Alias expansion catches the common shorthands
/// (postgres, node, js) before the token scan.
fn knowledge_hint(intent: &str) -> String {
    let expanded = expand_query(intent);
    let mut runtime: Option<&str> = None;
    let mut services: Vec<&str> = Vec::new();
    for raw in expanded.split_whitespace() {
        let token = raw.trim_matches(|c: char| !c.is_alphanumeric() && c != '-');
        if token.is_empty() {
            continue;
        }
        if runtime.is_none() && is_runtime_base(token) {
            runtime = Some(token);
        } else if is_managed_type(token) && !services.contains(&token) {
            services.push(token);
        }
    }

    match runtime {
        Some(rt) if !services.is_empty() => format!(
            "Load the briefing before writing YAML or code: zerops_knowledge runtime=\"{}\" services=\"{}\", then the platform reference: zerops_knowledge scope=\"infrastructure\".",
            rt,
            services.join(",")
        ),
        Some(rt) => format!(
            "Load the briefing before writing YAML or code: zerops_knowledge runtime=\"{}\", then the platform reference: zerops_knowledge scope=\"infrastructure\".",
            rt
        ),
        None => "Load the briefing for the planned stack before writing YAML or code: zerops_knowledge runtime=<type> services=<types>, then the platform reference: zerops_knowledge scope=\"infrastructure\".".to_string(),
    }
}

fn not_active(context: &str, err: &ZcpError) -> ZcpError {
    ZcpError::platform(
        codes::WORKFLOW_ERROR,
        format!("{}: {}", context, detail(err)),
        "Start bootstrap first with action=\"start\" workflow=\"bootstrap\"",
    )
}

/// Engine errors already carry a clean message; strip the enum prefix
/// before embedding them in platform errors.
fn detail(err: &ZcpError) -> String {
    match err {
        ZcpError::Workflow(msg) | ZcpError::Validation(msg) | ZcpError::Gate(msg) => msg.clone(),
        other => other.to_string(),
    }
}
