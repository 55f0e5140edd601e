//! MCP tool surface.
//!
//! Every tool is a `{name, title, description, inputSchema, handler}`
//! tuple collected into a [`Registry`]. Registration is split into one
//! `register` function per module so the server (and tests) can wire
//! subsets; capability-gated tools only register when their capability
//! is present. Handlers produce a single text content block, JSON for
//! structured results, with `is_error` set for failures.

pub mod context;
pub mod delete;
pub mod deploy;
pub mod discover;
pub mod env;
pub mod events;
pub mod import;
pub mod knowledge;
pub mod logs;
pub mod manage;
pub mod mount;
pub mod process;
pub mod scale;
pub mod subdomain;
pub mod verify;
pub mod workflow;

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::core::auth::AuthInfo;
use crate::core::cache::StackTypeCache;
use crate::core::client::{Client, LocalDeployer, LogFetcher, Mounter, SshDeployer};
use crate::core::engine::Engine;
use crate::core::error::{PlatformError, ZcpError, codes};
use crate::core::runtime::RuntimeInfo;

pub use knowledge::KnowledgeTracker;

/// Follow-up instructions attached to mutating results so the agent
/// knows the next sensible call.
pub(crate) mod next_actions {
    pub const DEPLOY_SUCCESS: &str = "Enable subdomain: zerops_subdomain action=enable. Check logs: zerops_logs severity=ERROR since=5m.";
    pub const DEPLOY_BUILD_FAIL: &str =
        "Check build logs: zerops_logs severity=ERROR. Fix and redeploy.";
    pub const IMPORT_SUCCESS: &str = "Verify services: zerops_discover. Continue workflow: mount dev, discover env vars, write code, then deploy.";
    pub const IMPORT_PARTIAL: &str =
        "Check failed processes: zerops_events. Fix and re-import via zerops_workflow.";
    pub const ENV_SET_SUCCESS: &str =
        "Reload service: zerops_manage action=reload (~4s, faster than restart).";
    pub const MANAGE_START: &str = "Verify service is running: zerops_discover.";
    pub const MANAGE_STOP: &str = "Service stopped. Start with: zerops_manage action=start.";
    pub const MANAGE_RESTART: &str = "Verify health: zerops_logs severity=ERROR since=1m.";
    pub const MANAGE_RELOAD: &str = "Verify health: zerops_logs severity=ERROR since=1m.";
    pub const MANAGE_CONNECT: &str = "Verify storage mount: zerops_discover.";
    pub const MANAGE_DISCONNECT: &str = "Storage disconnected. Verify: zerops_discover.";
    pub const SCALE_SUCCESS: &str = "Verify scaling: zerops_discover.";
    pub const SUBDOMAIN_ENABLE: &str = "Test subdomain URL. If 502: zerops_logs severity=ERROR.";
}

/// Everything a handler may need, wired once at startup. Optional
/// fields are capabilities that depend on where the process runs.
pub struct Deps {
    pub client: Arc<dyn Client>,
    pub log_fetcher: Arc<dyn LogFetcher>,
    pub auth: AuthInfo,
    pub runtime: RuntimeInfo,
    pub cache: StackTypeCache,
    /// Workflow engine; absent when running with `--no-workflow`.
    pub engine: Option<Engine>,
    pub tracker: KnowledgeTracker,
    pub local_deployer: Option<Arc<dyn LocalDeployer>>,
    pub ssh_deployer: Option<Arc<dyn SshDeployer>>,
    pub mounter: Option<Arc<dyn Mounter>>,
}

/// MCP tool behavior hints, serialized into `tools/list`.
#[derive(Debug, Clone, Copy, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotations {
    pub read_only_hint: bool,
    pub destructive_hint: bool,
    pub idempotent_hint: bool,
}

impl Annotations {
    pub fn read_only() -> Self {
        Self {
            read_only_hint: true,
            destructive_hint: false,
            idempotent_hint: true,
        }
    }

    pub fn mutating() -> Self {
        Self {
            read_only_hint: false,
            destructive_hint: false,
            idempotent_hint: false,
        }
    }

    pub fn idempotent() -> Self {
        Self {
            read_only_hint: false,
            destructive_hint: false,
            idempotent_hint: true,
        }
    }

    pub fn destructive() -> Self {
        Self {
            read_only_hint: false,
            destructive_hint: true,
            idempotent_hint: false,
        }
    }
}

type Handler = Box<dyn Fn(&Deps, Value) -> Outcome + Send + Sync>;

/// One registered tool.
pub struct Tool {
    pub name: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub annotations: Annotations,
    pub input_schema: Value,
    pub handler: Handler,
}

/// What a handler produced: one text block, error-flagged or not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub text: String,
    pub is_error: bool,
}

/// Serializes a result into a success outcome.
pub fn json_result<T: Serialize>(v: &T) -> Outcome {
    match serde_json::to_string(v) {
        Ok(text) => Outcome {
            text,
            is_error: false,
        },
        Err(err) => Outcome {
            text: format!("marshal error: {}", err),
            is_error: true,
        },
    }
}

pub fn text_result(text: impl Into<String>) -> Outcome {
    Outcome {
        text: text.into(),
        is_error: false,
    }
}

/// Serializes an error as `{code, error, suggestion?}` with the error
/// flag set, so agents can always branch on `code`.
pub fn error_result(err: &ZcpError) -> Outcome {
    #[derive(Serialize)]
    struct Body<'a> {
        code: &'a str,
        error: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        suggestion: Option<&'a str>,
    }

    let message = match err {
        ZcpError::Platform(pe) => pe.message.clone(),
        other => other.to_string(),
    };
    let body = Body {
        code: err.code(),
        error: message,
        suggestion: err.suggestion(),
    };
    Outcome {
        text: serde_json::to_string(&body).unwrap_or_else(|e| format!("marshal error: {}", e)),
        is_error: true,
    }
}

/// Decodes tool arguments; `null`/missing arguments decode as defaults.
pub(crate) fn parse_input<T: DeserializeOwned + Default>(args: Value) -> Result<T, ZcpError> {
    if args.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(args).map_err(|e| {
        ZcpError::platform(
            codes::INVALID_PARAMETER,
            format!("Invalid arguments: {}", e),
            "Check the tool input schema",
        )
    })
}

/// Mutating tools that belong to the guided flow refuse to run outside
/// a workflow session. A missing engine disables the check entirely.
pub(crate) fn require_workflow(deps: &Deps) -> Result<(), ZcpError> {
    let Some(engine) = &deps.engine else {
        return Ok(());
    };
    if engine.has_session() {
        return Ok(());
    }
    Err(ZcpError::Platform(PlatformError::new(
        codes::WORKFLOW_REQUIRED,
        "No active workflow session. This tool requires a workflow session.",
        "Start a workflow first: zerops_workflow action=\"start\" workflow=\"bootstrap\"",
    )))
}

/// Ordered tool collection served over MCP.
#[derive(Default)]
pub struct Registry {
    tools: Vec<Tool>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, tool: Tool) {
        self.tools.push(tool);
    }

    pub fn get(&self, name: &str) -> Option<&Tool> {
        self.tools.iter().find(|t| t.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tool> {
        self.tools.iter()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Dispatches a call by tool name. Unknown names report an error
    /// outcome rather than a transport fault, per MCP semantics.
    pub fn call(&self, deps: &Deps, name: &str, args: Value) -> Outcome {
        let Some(tool) = self.get(name) else {
            return error_result(&ZcpError::platform(
                codes::INVALID_PARAMETER,
                format!("Unknown tool '{}'", name),
                "List available tools with tools/list",
            ));
        };

        let start = Instant::now();
        let outcome = (tool.handler)(deps, args);
        if outcome.is_error {
            warn!(tool = name, elapsed = ?start.elapsed(), "tool call failed");
        } else {
            debug!(tool = name, elapsed = ?start.elapsed(), "tool call served");
        }
        outcome
    }
}

/// Registers the full tool set supported by the given capabilities.
pub fn register_all(reg: &mut Registry, deps: &Deps) {
    context::register(reg);
    discover::register(reg);
    knowledge::register(reg);
    logs::register(reg);
    events::register(reg);
    process::register(reg);
    verify::register(reg);
    workflow::register(reg);
    import::register(reg);
    if deps.local_deployer.is_some() || deps.ssh_deployer.is_some() {
        deploy::register(reg);
    }
    subdomain::register(reg);
    scale::register(reg);
    env::register(reg);
    manage::register(reg);
    delete::register(reg);
    if deps.mounter.is_some() {
        mount::register(reg);
    }
}
