//! Layered briefing assembly.
//!
//! The briefing is the one document the agent reads before generating
//! YAML, so it is assembled from the stack actually requested: core
//! reference first, then the live catalog digest, runtime delta,
//! matching recipes, service cards, wiring templates, decision hints,
//! and a version check. Blocks are separated with `---` rules.

use crate::core::error::ZcpError;
use crate::core::types::ServiceStackType;

use super::sections::{is_runtime_base, parse_h2_sections, runtime_section_name, service_card_name};
use super::versions::{format_service_stacks, format_version_check};
use super::Store;

const CORE_URI: &str = "zerops://themes/core";
const RUNTIME_DELTAS_URI: &str = "zerops://themes/runtime-deltas";
const SERVICE_CARDS_URI: &str = "zerops://themes/service-cards";
const WIRING_URI: &str = "zerops://themes/wiring";

/// Recipe name prefixes worth surfacing for a runtime base.
const RECIPE_PREFIXES: [(&str, &[&str]); 15] = [
    ("bun", &["bun"]),
    ("nodejs", &["node", "nuxt", "express"]),
    ("deno", &["deno"]),
    ("python", &["python", "django", "flask", "fastapi"]),
    ("go", &["go-"]),
    ("rust", &["rust"]),
    ("php", &["php", "laravel", "symfony"]),
    ("php-nginx", &["php", "laravel", "symfony"]),
    ("php-apache", &["php", "laravel", "symfony"]),
    ("static", &["svelte-static", "astro-static", "static"]),
    ("java", &["java", "spring"]),
    ("dotnet", &["dotnet"]),
    ("elixir", &["elixir", "phoenix"]),
    ("gleam", &["gleam"]),
    ("ruby", &["ruby", "rails"]),
];

/// Service bases mapped to the decision doc that compares them with
/// their alternatives.
const DECISION_DOCS: [(&str, &str); 13] = [
    ("postgresql", "zerops://themes/decide-database"),
    ("mariadb", "zerops://themes/decide-database"),
    ("valkey", "zerops://themes/decide-cache"),
    ("keydb", "zerops://themes/decide-cache"),
    ("object-storage", "zerops://themes/decide-storage"),
    ("shared-storage", "zerops://themes/decide-storage"),
    ("elasticsearch", "zerops://themes/decide-search"),
    ("meilisearch", "zerops://themes/decide-search"),
    ("qdrant", "zerops://themes/decide-search"),
    ("typesense", "zerops://themes/decide-search"),
    ("kafka", "zerops://themes/decide-messaging"),
    ("nats", "zerops://themes/decide-messaging"),
    ("rabbitmq", "zerops://themes/decide-messaging"),
];

impl Store {
    /// Assembles the briefing for a `(runtime, services, liveTypes)`
    /// triple. An empty runtime is promoted from the first service
    /// whose base names a runtime; pass an empty `live_types` slice to
    /// skip the catalog digest and version check.
    pub fn briefing(
        &self,
        runtime: &str,
        services: &[String],
        live_types: &[ServiceStackType],
    ) -> Result<String, ZcpError> {
        let mut runtime = runtime.to_string();
        let mut services: Vec<String> = services.to_vec();

        if runtime.is_empty()
            && let Some(idx) = services.iter().position(|s| is_runtime_base(s))
        {
            runtime = services.remove(idx);
        }

        let mut blocks: Vec<String> = Vec::new();

        let core = self.get(CORE_URI)?;
        blocks.push(core.content.trim_end().to_string());

        if !live_types.is_empty() {
            let digest = format_service_stacks(live_types);
            if !digest.is_empty() {
                blocks.push(format!(
                    "<!-- STACKS:BEGIN -->\n{digest}<!-- STACKS:END -->"
                ));
            }
        }

        if !runtime.is_empty()
            && let Some(name) = runtime_section_name(&runtime)
            && let Some(section) = self.runtime_delta(name)
        {
            blocks.push(format!("## Runtime-Specific: {name}\n\n{section}"));
        }

        let runtime_base = runtime.split('@').next().unwrap_or("");
        if !runtime_base.is_empty() {
            let recipes = self.matching_recipes(runtime_base);
            if !recipes.is_empty() {
                let mut block = String::from(
                    "## Matching Recipes\n\nAvailable recipes for this runtime (use `zerops_knowledge recipe=\"name\"` to load):\n",
                );
                for r in &recipes {
                    block.push_str(&format!("- `{r}`\n"));
                }
                blocks.push(block.trim_end().to_string());
            }
        }

        if !services.is_empty() {
            let mut cards = String::from("## Service Cards\n");
            for svc in &services {
                let name = service_card_name(svc);
                if let Some(card) = self.service_card(&name) {
                    cards.push_str(&format!("\n### {name}\n\n{card}\n"));
                }
            }
            blocks.push(cards.trim_end().to_string());

            let mut wiring = String::new();
            if let Some(syntax) = self.wiring_section("Syntax Rules") {
                wiring.push_str(&format!("## Wiring Patterns\n\n{syntax}"));
            }
            for svc in &services {
                let name = service_card_name(svc);
                if let Some(section) = self.wiring_section(&name) {
                    if !wiring.is_empty() {
                        wiring.push_str("\n\n");
                    }
                    wiring.push_str(&format!("### Wiring: {name}\n\n{section}"));
                }
            }
            if !wiring.is_empty() {
                blocks.push(wiring.trim_end().to_string());
            }
        }

        let hints = self.decision_hints(&services);
        if !hints.is_empty() {
            blocks.push(format!("## Decision Hints\n\n{hints}"));
        }

        let check = format_version_check(&runtime, &services, live_types);
        if !check.is_empty() {
            blocks.push(check.trim_end().to_string());
        }

        let mut out = blocks.join("\n\n---\n\n");
        out.push_str(
            "\n\nNext: Generate import.yml and zerops.yml using the rules above. Use only validated versions. Then validate with zerops_import dryRun=true.",
        );
        Ok(out)
    }

    fn runtime_delta(&self, name: &str) -> Option<String> {
        let doc = self.get(RUNTIME_DELTAS_URI).ok()?;
        parse_h2_sections(&doc.content).remove(name)
    }

    fn service_card(&self, name: &str) -> Option<String> {
        let doc = self.get(SERVICE_CARDS_URI).ok()?;
        parse_h2_sections(&doc.content).remove(name)
    }

    fn wiring_section(&self, name: &str) -> Option<String> {
        let doc = self.get(WIRING_URI).ok()?;
        parse_h2_sections(&doc.content).remove(name)
    }

    fn matching_recipes(&self, base: &str) -> Vec<String> {
        let Some((_, prefixes)) = RECIPE_PREFIXES.iter().find(|(k, _)| *k == base) else {
            return Vec::new();
        };
        self.list_recipes()
            .into_iter()
            .filter(|r| prefixes.iter().any(|p| r.starts_with(p)))
            .collect()
    }

    fn decision_hints(&self, services: &[String]) -> String {
        let mut seen: Vec<&str> = Vec::new();
        let mut hints = Vec::new();
        for svc in services {
            let base = svc.split('@').next().unwrap_or(svc);
            let Some((_, uri)) = DECISION_DOCS.iter().find(|(k, _)| *k == base) else {
                continue;
            };
            if seen.contains(uri) {
                continue;
            }
            seen.push(uri);
            if let Ok(doc) = self.get(uri)
                && !doc.tldr.is_empty()
            {
                hints.push(format!("- **{}**: {}", doc.title, doc.tldr));
            }
        }
        hints.join("\n")
    }
}
