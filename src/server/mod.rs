//! MCP host over stdio.
//!
//! Wires the tool registry and the knowledge corpus into a JSON-RPC
//! loop reading newline-delimited messages from stdin and answering on
//! stdout. Logging goes to stderr; stdout belongs to the protocol.

pub mod rpc;

use std::io::{BufRead, Write};

use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::core::error::ZcpError;
use crate::core::runtime::RuntimeInfo;
use crate::knowledge;
use crate::tools::{Deps, Registry, register_all};

use rpc::{Request, Response, codes};

/// Latest MCP revision the host speaks; clients asking for another
/// revision get theirs echoed back.
pub const PROTOCOL_VERSION: &str = "2025-06-18";

const INSTRUCTIONS: &str = "ZCP provides tools for managing Zerops PaaS infrastructure: services, deployment, configuration, and debugging. Call zerops_context to load platform knowledge when working with Zerops. For multi-step operations (bootstrap, deploy, debug), call zerops_workflow first. Call zerops_knowledge before generating any YAML (import.yml or zerops.yml). Read zerops://themes/... and zerops://recipes/... resources for detailed documentation on specific topics.";

/// Builds the instruction block injected into the agent's system
/// prompt. Inside a Zerops container the agent needs to know which
/// service it is operating from, so a sentence naming it goes first.
pub fn build_instructions(runtime: &RuntimeInfo) -> String {
    if runtime.in_container && !runtime.service_name.is_empty() {
        return format!(
            "This MCP server runs inside the Zerops container of service '{}'; local paths and commands execute there. {}",
            runtime.service_name, INSTRUCTIONS
        );
    }
    INSTRUCTIONS.to_string()
}

#[derive(Debug, Deserialize)]
struct CallParams {
    #[serde(default)]
    name: String,
    #[serde(default)]
    arguments: Value,
}

pub struct Server {
    deps: Deps,
    registry: Registry,
    instructions: String,
}

impl Server {
    /// Registers every tool the given capabilities support.
    pub fn new(deps: Deps) -> Self {
        let mut registry = Registry::new();
        register_all(&mut registry, &deps);
        let instructions = build_instructions(&deps.runtime);
        Self {
            deps,
            registry,
            instructions,
        }
    }

    /// Serves until stdin closes. One message per line; notifications
    /// produce no reply.
    pub fn run(&self) -> Result<(), ZcpError> {
        let stdin = std::io::stdin();
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        info!(tools = self.registry.len(), "zcp listening on stdio");

        for line in stdin.lock().lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            if let Some(resp) = self.handle_line(&line) {
                serde_json::to_writer(&mut out, &resp)?;
                out.write_all(b"\n")?;
                out.flush()?;
            }
        }
        info!("stdin closed, shutting down");
        Ok(())
    }

    /// Handles one raw message line. Returns the response to write,
    /// or `None` when the line was a notification.
    pub fn handle_line(&self, line: &str) -> Option<Response> {
        let req: Request = match serde_json::from_str(line) {
            Ok(req) => req,
            Err(err) => {
                warn!(%err, "unparseable message");
                return Some(Response::failure(
                    Value::Null,
                    codes::PARSE_ERROR,
                    format!("parse error: {}", err),
                ));
            }
        };

        if req.is_notification() {
            self.handle_notification(&req);
            return None;
        }
        let id = req.id.clone().unwrap_or(Value::Null);
        Some(self.handle_request(id, &req))
    }

    fn handle_notification(&self, req: &Request) {
        match req.method.as_str() {
            "notifications/initialized" => debug!("client initialized"),
            other => debug!(method = other, "notification ignored"),
        }
    }

    fn handle_request(&self, id: Value, req: &Request) -> Response {
        match req.method.as_str() {
            "initialize" => self.initialize(id, &req.params),
            "ping" => Response::success(id, json!({})),
            "tools/list" => self.tools_list(id),
            "tools/call" => self.tools_call(id, &req.params),
            "resources/list" => self.resources_list(id),
            "resources/read" => self.resources_read(id, &req.params),
            other => Response::failure(
                id,
                codes::METHOD_NOT_FOUND,
                format!("method not found: {}", other),
            ),
        }
    }

    fn initialize(&self, id: Value, params: &Value) -> Response {
        let requested = params
            .get("protocolVersion")
            .and_then(Value::as_str)
            .unwrap_or(PROTOCOL_VERSION);
        debug!(protocol = requested, "initialize");
        Response::success(
            id,
            json!({
                "protocolVersion": requested,
                "capabilities": {
                    "tools": {},
                    "resources": {}
                },
                "serverInfo": {
                    "name": "zcp",
                    "version": env!("CARGO_PKG_VERSION")
                },
                "instructions": self.instructions,
            }),
        )
    }

    fn tools_list(&self, id: Value) -> Response {
        let tools: Vec<Value> = self
            .registry
            .iter()
            .map(|t| {
                json!({
                    "name": t.name,
                    "title": t.title,
                    "description": t.description,
                    "inputSchema": t.input_schema,
                    "annotations": t.annotations,
                })
            })
            .collect();
        Response::success(id, json!({ "tools": tools }))
    }

    fn tools_call(&self, id: Value, params: &Value) -> Response {
        let call: CallParams = match serde_json::from_value(params.clone()) {
            Ok(call) => call,
            Err(err) => {
                return Response::failure(
                    id,
                    codes::INVALID_PARAMS,
                    format!("invalid tools/call params: {}", err),
                );
            }
        };
        let outcome = self.registry.call(&self.deps, &call.name, call.arguments);
        Response::success(
            id,
            json!({
                "content": [{"type": "text", "text": outcome.text}],
                "isError": outcome.is_error,
            }),
        )
    }

    fn resources_list(&self, id: Value) -> Response {
        match knowledge::store() {
            Ok(store) => Response::success(id, json!({ "resources": store.list() })),
            Err(err) => Response::failure(id, codes::INTERNAL_ERROR, err.to_string()),
        }
    }

    fn resources_read(&self, id: Value, params: &Value) -> Response {
        let Some(uri) = params.get("uri").and_then(Value::as_str) else {
            return Response::failure(id, codes::INVALID_PARAMS, "missing resource uri");
        };
        let store = match knowledge::store() {
            Ok(store) => store,
            Err(err) => return Response::failure(id, codes::INTERNAL_ERROR, err.to_string()),
        };
        match store.get(uri) {
            Ok(doc) => Response::success(
                id,
                json!({
                    "contents": [{
                        "uri": uri,
                        "mimeType": "text/markdown",
                        "text": doc.content,
                    }]
                }),
            ),
            Err(_) => Response::failure(
                id,
                codes::RESOURCE_NOT_FOUND,
                format!("resource not found: {}", uri),
            ),
        }
    }
}
