//! Embedded knowledge corpus.
//!
//! Themes and recipes are markdown files compiled into the binary;
//! the store parses them once per process and serves lookups, lexical
//! search, and briefing assembly. Documents are addressed by
//! `zerops://` URIs derived from their paths.

pub mod briefing;
pub mod documents;
pub mod search;
pub mod sections;
pub mod versions;

pub use documents::Document;
pub use search::{SearchResult, expand_query};
pub use versions::ImportService;

use std::sync::OnceLock;

use rust_embed::RustEmbed;
use rustc_hash::FxHashMap;
use serde::Serialize;
use tracing::debug;

use crate::core::error::ZcpError;
use documents::parse_document;
use search::SearchIndex;

#[derive(RustEmbed)]
#[folder = "knowledge/"]
#[include = "**/*.md"]
struct Corpus;

/// One corpus document as exposed through MCP resource listing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub uri: String,
    pub name: String,
    pub description: String,
    pub mime_type: String,
}

pub struct Store {
    docs: FxHashMap<String, Document>,
    index: SearchIndex,
}

impl Store {
    fn from_embedded() -> Result<Self, ZcpError> {
        let mut docs: FxHashMap<String, Document> = FxHashMap::default();
        for path in Corpus::iter() {
            let Some(file) = Corpus::get(&path) else {
                continue;
            };
            let content = String::from_utf8_lossy(&file.data);
            let doc = parse_document(&path, &content);
            docs.insert(doc.uri.clone(), doc);
        }
        if docs.is_empty() {
            return Err(ZcpError::NotFound(
                "embedded knowledge corpus is empty".into(),
            ));
        }
        let index = SearchIndex::build(&docs);
        debug!(documents = docs.len(), "knowledge store initialised");
        Ok(Self { docs, index })
    }

    pub fn get(&self, uri: &str) -> Result<&Document, ZcpError> {
        self.docs
            .get(uri)
            .ok_or_else(|| ZcpError::NotFound(format!("document not found: {uri}")))
    }

    /// All documents as MCP resources, sorted by URI.
    pub fn list(&self) -> Vec<Resource> {
        let mut resources: Vec<Resource> = self
            .docs
            .values()
            .map(|doc| Resource {
                uri: doc.uri.clone(),
                name: doc.title.clone(),
                description: doc.description.clone(),
                mime_type: "text/markdown".into(),
            })
            .collect();
        resources.sort_by(|a, b| a.uri.cmp(&b.uri));
        resources
    }

    pub fn search(&self, query: &str, limit: usize) -> Vec<SearchResult> {
        self.index.search(query, limit)
    }

    /// Suggestions need the top hit's content for See Also links, so
    /// they are produced here rather than in the search module.
    pub fn suggestions(&self, query: &str, results: &[SearchResult]) -> Vec<String> {
        let top = results
            .first()
            .and_then(|r| self.docs.get(&r.uri))
            .map(|d| d.content.as_str());
        search::suggestions(query, results, top)
    }

    /// Recipe names without the URI prefix, sorted.
    pub fn list_recipes(&self) -> Vec<String> {
        let mut recipes: Vec<String> = self
            .docs
            .keys()
            .filter_map(|uri| uri.strip_prefix("zerops://recipes/"))
            .map(str::to_string)
            .collect();
        recipes.sort_unstable();
        recipes
    }

    pub fn recipe(&self, name: &str) -> Result<String, ZcpError> {
        let uri = format!("zerops://recipes/{name}");
        match self.docs.get(&uri) {
            Some(doc) => Ok(doc.content.clone()),
            None => Err(ZcpError::NotFound(format!(
                "recipe '{}' not found (available: {})",
                name,
                self.list_recipes().join(", ")
            ))),
        }
    }

    pub fn document_count(&self) -> usize {
        self.docs.len()
    }

    fn step_guide(&self, step: &str) -> String {
        match self.get("zerops://themes/bootstrap") {
            Ok(doc) => sections::named_section(&doc.content, step).unwrap_or_default(),
            Err(_) => String::new(),
        }
    }
}

static STORE: OnceLock<Result<Store, String>> = OnceLock::new();

/// Process-wide store; the corpus is parsed and indexed on first use.
pub fn store() -> Result<&'static Store, ZcpError> {
    match STORE.get_or_init(|| Store::from_embedded().map_err(|e| e.to_string())) {
        Ok(s) => Ok(s),
        Err(msg) => Err(ZcpError::NotFound(msg.clone())),
    }
}

/// Detailed guide for a bootstrap step, extracted from the bootstrap
/// theme's `<section name="...">` blocks. Missing corpus or section
/// yields an empty guide, never an error.
pub fn bootstrap_guide(step: &str) -> String {
    match store() {
        Ok(s) => s.step_guide(step),
        Err(_) => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_loads_embedded_corpus() {
        let s = store().expect("embedded store");
        assert!(s.document_count() >= 10, "corpus: {}", s.document_count());
        let core = s.get("zerops://themes/core").expect("core doc");
        assert_eq!(core.title, "Zerops Core Reference");
        assert!(s.get("zerops://themes/missing").is_err());
    }

    #[test]
    fn test_resources_sorted_with_markdown_mime() {
        let s = store().expect("embedded store");
        let resources = s.list();
        assert!(resources.len() >= 10);
        assert!(resources.windows(2).all(|w| w[0].uri < w[1].uri));
        assert!(resources.iter().all(|r| r.mime_type == "text/markdown"));
        assert!(resources.iter().all(|r| r.uri.starts_with("zerops://")));
    }

    #[test]
    fn test_recipe_lookup_and_listing() {
        let s = store().expect("embedded store");
        let recipes = s.list_recipes();
        assert!(recipes.iter().any(|r| r == "bun-hono"), "{recipes:?}");
        assert!(s.recipe("bun-hono").is_ok());

        let err = s.recipe("cobol-cics").expect_err("unknown recipe");
        assert!(err.to_string().contains("available:"), "{err}");
    }

    #[test]
    fn test_search_end_to_end() {
        let s = store().expect("embedded store");
        let hits = s.search("postgres connection", 0);
        assert!(!hits.is_empty());
        assert!(hits.len() <= 5, "default limit");
        assert!(hits[0].score > 0.0);
        assert!(!hits[0].snippet.is_empty());
    }

    #[test]
    fn test_suggestions_for_unsupported_tech() {
        let s = store().expect("embedded store");
        let hits = s.search("mongodb", 0);
        let tips = s.suggestions("mongodb", &hits);
        assert!(
            tips.iter().any(|t| t.contains("MongoDB")),
            "unsupported note expected: {tips:?}"
        );
    }

    #[test]
    fn test_bootstrap_guides_resolve() {
        let guide = bootstrap_guide("detect");
        assert!(!guide.is_empty(), "detect step has a guide");
        assert_eq!(bootstrap_guide("no-such-step"), "");
    }
}
