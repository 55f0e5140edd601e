//! `zerops_knowledge` - search, briefings, recipes and the core scope.
//!
//! Exactly one mode per call: `query` searches the corpus, `runtime`/
//! `services` assemble a briefing, `scope` loads the core reference,
//! `recipe` loads one recipe. The tracker remembers what was loaded so
//! the bootstrap flow can skip redundant loads.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::core::error::{ZcpError, codes};
use crate::knowledge::{SearchResult, store};

use super::{
    Annotations, Deps, Outcome, Registry, Tool, error_result, json_result, parse_input,
    text_result,
};

const DEFAULT_SEARCH_LIMIT: usize = 5;

/// Records which knowledge the agent has loaded this process. Used by
/// the bootstrap `load-knowledge` step to short-circuit repeat loads.
#[derive(Default)]
pub struct KnowledgeTracker {
    inner: Mutex<TrackerState>,
}

#[derive(Default)]
struct TrackerState {
    briefing_calls: Vec<String>,
    scope_loaded: bool,
}

impl KnowledgeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_briefing(&self, runtime: &str, services: &[String]) {
        let mut entry = runtime.to_string();
        if !services.is_empty() {
            if !entry.is_empty() {
                entry.push('+');
            }
            entry.push_str(&services.join(","));
        }
        if entry.is_empty() {
            return;
        }
        let mut state = self.inner.lock().expect("tracker lock");
        if !state.briefing_calls.contains(&entry) {
            state.briefing_calls.push(entry);
        }
    }

    pub fn record_scope(&self) {
        self.inner.lock().expect("tracker lock").scope_loaded = true;
    }

    /// Both a briefing and the core scope must be loaded to count.
    pub fn is_loaded(&self) -> bool {
        let state = self.inner.lock().expect("tracker lock");
        !state.briefing_calls.is_empty() && state.scope_loaded
    }

    pub fn summary(&self) -> String {
        let state = self.inner.lock().expect("tracker lock");
        if state.briefing_calls.is_empty() && !state.scope_loaded {
            return "No knowledge loaded".into();
        }
        let briefing = if state.briefing_calls.is_empty() {
            "none".to_string()
        } else {
            state.briefing_calls.join("; ")
        };
        let scope = if state.scope_loaded {
            "infrastructure"
        } else {
            "not loaded"
        };
        format!("Briefing: {} | Scope: {}", briefing, scope)
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct KnowledgeInput {
    query: String,
    limit: usize,
    runtime: String,
    /// Comma-separated service types, e.g. `postgresql@17,valkey@7.2`.
    services: String,
    recipe: String,
    scope: String,
}

#[derive(Serialize)]
struct SearchResponse<'a> {
    query: &'a str,
    results: &'a [SearchResult],
    #[serde(skip_serializing_if = "Vec::is_empty")]
    suggestions: Vec<String>,
}

pub fn register(reg: &mut Registry) {
    reg.add(Tool {
        name: "zerops_knowledge",
        title: "Platform knowledge",
        description: "Zerops knowledge in four modes: query=<terms> searches the docs; \
                      runtime=<type> with services=<types> assembles the stack briefing to read \
                      before writing any YAML; scope=\"infrastructure\" loads the core platform \
                      reference; recipe=<name> loads a complete example project.",
        annotations: Annotations::read_only(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Search terms, e.g. 'postgres connection' or 'zerops.yml'"
                },
                "limit": {
                    "type": "integer",
                    "description": "Maximum search results (default 5)"
                },
                "runtime": {
                    "type": "string",
                    "description": "Runtime type for a briefing, e.g. nodejs@22"
                },
                "services": {
                    "type": "string",
                    "description": "Comma-separated managed services, e.g. postgresql@17,valkey@7.2"
                },
                "recipe": {
                    "type": "string",
                    "description": "Recipe name to load, e.g. bun-hono"
                },
                "scope": {
                    "type": "string",
                    "description": "Knowledge scope to load; only \"infrastructure\" exists"
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
    let input: KnowledgeInput = parse_input(args)?;

    let briefing_mode = !input.runtime.is_empty() || !input.services.is_empty();
    let mode_count = [
        !input.query.is_empty(),
        briefing_mode,
        !input.scope.is_empty(),
        !input.recipe.is_empty(),
    ]
    .iter()
    .filter(|&&m| m)
    .count();

    if mode_count == 0 {
        return Err(ZcpError::platform(
            codes::INVALID_PARAMETER,
            "Must provide at least one of: query, runtime/services, scope, or recipe",
            "Example: zerops_knowledge runtime=\"nodejs@22\" services=\"postgresql@17\"",
        ));
    }
    if mode_count > 1 {
        return Err(ZcpError::platform(
            codes::INVALID_PARAMETER,
            "Cannot mix query, briefing, scope, and recipe modes",
            "Make one call per mode",
        ));
    }

    if !input.scope.is_empty() {
        return scope_mode(deps, &input.scope);
    }
    if !input.query.is_empty() {
        return query_mode(&input);
    }
    if !input.recipe.is_empty() {
        return recipe_mode(&input.recipe);
    }
    briefing_mode_run(deps, &input)
}

fn scope_mode(deps: &Deps, scope: &str) -> Result<Outcome, ZcpError> {
    if scope != "infrastructure" {
        return Err(ZcpError::platform(
            codes::INVALID_PARAMETER,
            format!("Unknown scope '{}'", scope),
            "Use scope=\"infrastructure\"",
        ));
    }
    let core = store()?.get("zerops://themes/core")?;
    deps.tracker.record_scope();
    Ok(text_result(core.content.clone()))
}

fn query_mode(input: &KnowledgeInput) -> Result<Outcome, ZcpError> {
    let limit = if input.limit == 0 {
        DEFAULT_SEARCH_LIMIT
    } else {
        input.limit
    };
    let store = store()?;
    let results = store.search(&input.query, limit);
    let suggestions = store.suggestions(&input.query, &results);
    Ok(json_result(&SearchResponse {
        query: &input.query,
        results: &results,
        suggestions,
    }))
}

fn recipe_mode(name: &str) -> Result<Outcome, ZcpError> {
    match store()?.recipe(name) {
        Ok(content) => Ok(text_result(content)),
        Err(err) => Err(ZcpError::platform(
            codes::INVALID_PARAMETER,
            err.to_string(),
            "Pick a name from the available recipes",
        )),
    }
}

fn briefing_mode_run(deps: &Deps, input: &KnowledgeInput) -> Result<Outcome, ZcpError> {
    let services: Vec<String> = input
        .services
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    let live_types = deps.cache.get(deps.client.as_ref());
    let text = store()?.briefing(&input.runtime, &services, &live_types)?;
    deps.tracker.record_briefing(&input.runtime, &services);
    Ok(text_result(text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::mock::MockClient;
    use crate::tools::tests::test_deps;

    #[test]
    fn test_mode_exclusivity() {
        let deps = test_deps(MockClient::new());
        let err = run(&deps, json!({})).expect_err("no mode");
        assert!(err.to_string().contains("at least one"));

        let err = run(&deps, json!({"query": "x", "recipe": "bun"})).expect_err("two modes");
        assert!(err.to_string().contains("Cannot mix"));
    }

    #[test]
    fn test_scope_accepts_only_infrastructure() {
        let deps = test_deps(MockClient::new());
        let err = run(&deps, json!({"scope": "everything"})).expect_err("unknown scope");
        assert!(err.to_string().contains("Unknown scope"));

        let out = run(&deps, json!({"scope": "infrastructure"})).expect("core scope");
        assert!(!out.is_error);
        assert!(deps.tracker.summary().contains("infrastructure"));
    }

    #[test]
    fn test_query_returns_ranked_results() {
        let deps = test_deps(MockClient::new());
        let out = run(&deps, json!({"query": "postgresql"})).expect("search");
        let v: Value = serde_json::from_str(&out.text).expect("json");
        assert_eq!(v["query"], "postgresql");
        assert!(!v["results"].as_array().expect("results").is_empty());
    }

    #[test]
    fn test_briefing_records_tracker() {
        let deps = test_deps(MockClient::new());
        let out = run(
            &deps,
            json!({"runtime": "nodejs@22", "services": "postgresql@17"}),
        )
        .expect("briefing");
        assert!(!out.is_error);
        assert!(out.text.contains("---"));
        assert!(deps.tracker.summary().contains("nodejs@22+postgresql@17"));
        assert!(!deps.tracker.is_loaded(), "scope still missing");
        deps.tracker.record_scope();
        assert!(deps.tracker.is_loaded());
    }

    #[test]
    fn test_unknown_recipe_names_available() {
        let deps = test_deps(MockClient::new());
        let err = run(&deps, json!({"recipe": "nope"})).expect_err("unknown recipe");
        assert!(err.to_string().contains("available"));
    }
}
