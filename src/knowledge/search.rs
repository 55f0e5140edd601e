//! Lexical retrieval over the embedded corpus.
//!
//! Scoring is weighted term-occurrence counting over title, keywords,
//! and content. Queries are expanded through a fixed alias table first
//! so common alternative names (postgres, redis, node) reach the
//! Zerops terms the corpus actually uses.

use std::sync::OnceLock;

use rayon::prelude::*;
use rustc_hash::FxHashMap;
use serde::Serialize;

use super::documents::Document;

const DEFAULT_LIMIT: usize = 5;
const SNIPPET_LEN: usize = 300;
const SUGGESTION_CAP: usize = 5;

const TITLE_WEIGHT: f64 = 2.0;
const KEYWORD_WEIGHT: f64 = 1.5;
const CONTENT_WEIGHT: f64 = 1.0;

/// One ranked hit, serialized into the `zerops_knowledge` payload.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub uri: String,
    pub title: String,
    pub score: f64,
    pub snippet: String,
}

/// Common alternative terms mapped to their Zerops equivalents. The
/// replacement keeps the original word so exact matches still count.
const QUERY_ALIASES: [(&str, &str); 25] = [
    ("postgres", "postgres postgresql"),
    ("redis", "redis valkey"),
    ("mysql", "mysql mariadb"),
    ("node", "node nodejs"),
    ("db", "db database"),
    ("ssl", "ssl tls"),
    ("env", "env environment variable"),
    ("cert", "cert certificate ssl tls"),
    ("ha", "ha high-availability mode"),
    ("k8s", "k8s kubernetes"),
    ("mongo", "mongo mongodb"),
    ("docker", "docker dockerfile"),
    ("pg", "pg postgresql postgres"),
    ("js", "js nodejs javascript"),
    ("ts", "ts nodejs typescript"),
    ("s3", "s3 object-storage"),
    ("cron", "cron crontab schedule"),
    ("log", "log logging logs"),
    ("logs", "logs logging log"),
    ("dns", "dns domain networking"),
    ("ci", "ci ci-cd continuous integration"),
    ("cd", "cd ci-cd continuous deployment"),
    ("dotnet", "dotnet .net csharp"),
    ("csharp", "csharp dotnet .net"),
    ("memcached", "memcached valkey cache"),
];

fn alias_table() -> &'static FxHashMap<&'static str, &'static str> {
    static TABLE: OnceLock<FxHashMap<&'static str, &'static str>> = OnceLock::new();
    TABLE.get_or_init(|| QUERY_ALIASES.iter().copied().collect())
}

pub fn expand_query(query: &str) -> String {
    let aliases = alias_table();
    let lowered = query.to_lowercase();
    let mut parts: Vec<&str> = Vec::new();
    for word in lowered.split_whitespace() {
        parts.push(aliases.get(word).copied().unwrap_or(word));
    }
    parts.join(" ")
}

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split_whitespace().filter_map(|raw| {
        let trimmed = raw.trim_matches(|c: char| !c.is_alphanumeric());
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_lowercase())
        }
    })
}

fn term_counts(text: &str) -> FxHashMap<String, u32> {
    let mut counts: FxHashMap<String, u32> = FxHashMap::default();
    for token in tokens(text) {
        *counts.entry(token).or_insert(0) += 1;
    }
    counts
}

struct IndexedDoc {
    uri: String,
    title: String,
    content: String,
    title_terms: FxHashMap<String, u32>,
    keyword_terms: FxHashMap<String, u32>,
    content_terms: FxHashMap<String, u32>,
}

impl IndexedDoc {
    fn score(&self, terms: &[String]) -> f64 {
        let mut score = 0.0;
        for term in terms {
            let title = self.title_terms.get(term).copied().unwrap_or(0);
            let keywords = self.keyword_terms.get(term).copied().unwrap_or(0);
            let content = self.content_terms.get(term).copied().unwrap_or(0);
            score += TITLE_WEIGHT * f64::from(title)
                + KEYWORD_WEIGHT * f64::from(keywords)
                + CONTENT_WEIGHT * f64::from(content);
        }
        score
    }
}

/// Pre-tokenized view of the corpus, built once at store construction.
pub(crate) struct SearchIndex {
    entries: Vec<IndexedDoc>,
}

impl SearchIndex {
    pub(crate) fn build(docs: &FxHashMap<String, Document>) -> Self {
        let entries = docs
            .values()
            .map(|doc| IndexedDoc {
                uri: doc.uri.clone(),
                title: doc.title.clone(),
                content: doc.content.clone(),
                title_terms: term_counts(&doc.title),
                keyword_terms: term_counts(&doc.keywords.join(" ")),
                content_terms: term_counts(&doc.content),
            })
            .collect();
        Self { entries }
    }

    /// Ranked by score descending, URI ascending on ties.
    pub(crate) fn search(&self, query: &str, limit: usize) -> Vec<SearchResult> {
        let limit = if limit == 0 { DEFAULT_LIMIT } else { limit };
        let terms: Vec<String> = tokens(&expand_query(query)).collect();
        if terms.is_empty() {
            return Vec::new();
        }

        let mut hits: Vec<SearchResult> = self
            .entries
            .par_iter()
            .filter_map(|doc| {
                let score = doc.score(&terms);
                (score > 0.0).then(|| SearchResult {
                    uri: doc.uri.clone(),
                    title: doc.title.clone(),
                    score,
                    snippet: extract_snippet(&doc.content, query, SNIPPET_LEN),
                })
            })
            .collect();

        hits.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.uri.cmp(&b.uri)));
        hits.truncate(limit);
        hits
    }
}

fn clamp_boundary(s: &str, mut idx: usize) -> usize {
    if idx >= s.len() {
        return s.len();
    }
    while !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

/// Window of up to `max_len` chars around the first query term found
/// in the content, elided at word boundaries. Falls back to the
/// document's leading paragraph when nothing matches.
fn extract_snippet(content: &str, query: &str, max_len: usize) -> String {
    let lower = content.to_lowercase();
    let query_lower = query.to_lowercase();

    let mut best_pos: Option<usize> = None;
    for word in query_lower.split_whitespace() {
        if let Some(pos) = lower.find(word)
            && best_pos.is_none_or(|best| pos < best)
        {
            best_pos = Some(pos);
        }
    }

    let Some(best) = best_pos else {
        return leading_paragraph(content, max_len);
    };

    let start = clamp_boundary(content, best.saturating_sub(max_len / 3));
    let end = clamp_boundary(content, (start + max_len).min(content.len()));
    let mut snippet = content[start..end].to_string();

    if start > 0
        && let Some(idx) = snippet.find(' ')
    {
        snippet = format!("\u{2026}{}", &snippet[idx + 1..]);
    }
    if end < content.len()
        && let Some(idx) = snippet.rfind(' ')
    {
        snippet.truncate(idx);
        snippet.push('\u{2026}');
    }

    snippet
}

fn leading_paragraph(content: &str, max_len: usize) -> String {
    let mut lines = Vec::new();
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            if lines.is_empty() {
                continue;
            }
            break;
        }
        lines.push(trimmed);
    }
    let paragraph = lines.join(" ");
    if paragraph.chars().count() <= max_len {
        return paragraph;
    }
    let cut = paragraph
        .char_indices()
        .nth(max_len)
        .map_or(paragraph.len(), |(i, _)| i);
    format!("{}\u{2026}", &paragraph[..cut])
}

/// Notes for technologies Zerops does not host, keyed by query word.
const UNSUPPORTED_SERVICES: [(&str, &str); 8] = [
    (
        "mongodb",
        "Zerops does not support MongoDB. Available databases: postgresql, mariadb",
    ),
    (
        "mongo",
        "Zerops does not support MongoDB. Available databases: postgresql, mariadb",
    ),
    (
        "dynamodb",
        "Zerops does not support DynamoDB. Available databases: postgresql, mariadb",
    ),
    ("mysql", "Zerops uses MariaDB (MySQL-compatible). Try: 'mariadb'"),
    (
        "memcached",
        "Zerops uses Valkey (Redis-compatible) for caching. Try: 'valkey'",
    ),
    (
        "sqlite",
        "SQLite runs within your app container. For managed DB: 'postgresql' or 'mariadb'",
    ),
    (
        "kubernetes",
        "Zerops is a PaaS, not Kubernetes. Try: 'deploy' or 'import.yml'",
    ),
    ("k8s", "Zerops is a PaaS, not Kubernetes. Try: 'deploy' or 'import.yml'"),
];

/// Guidance attached to search responses: unsupported-technology
/// notes, a broaden-your-query hint when nothing matched, and related
/// links pulled from the top hit's See Also section.
pub fn suggestions(
    query: &str,
    results: &[SearchResult],
    top_doc_content: Option<&str>,
) -> Vec<String> {
    let mut out = Vec::new();

    let lowered = query.to_lowercase();
    for word in lowered.split_whitespace() {
        if let Some((_, msg)) = UNSUPPORTED_SERVICES.iter().find(|(k, _)| *k == word) {
            out.push((*msg).to_string());
        }
    }

    if results.is_empty() {
        if out.is_empty() {
            out.push(format!(
                "No results for '{}'. Try broader terms: service name, 'zerops.yml', 'import.yml', 'gotchas'",
                query
            ));
        }
        out.truncate(SUGGESTION_CAP);
        return out;
    }

    if let Some(content) = top_doc_content {
        out.extend(see_also_links(content));
    }
    out.truncate(SUGGESTION_CAP);
    out
}

fn see_also_links(content: &str) -> Vec<String> {
    let mut links = Vec::new();
    let mut in_see_also = false;
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed == "## See Also" {
            in_see_also = true;
            continue;
        }
        if in_see_also {
            if trimmed.starts_with("##") {
                break;
            }
            if let Some(uri) = trimmed.strip_prefix("- ")
                && uri.starts_with("zerops://")
            {
                links.push(format!("Related: {}", uri));
            }
        }
    }
    links
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::documents::parse_document;

    fn corpus() -> FxHashMap<String, Document> {
        let sources = [
            (
                "themes/postgresql.md",
                "# PostgreSQL on Zerops\n\n## Keywords\n\npostgresql, database, sql\n\n## TL;DR\n\nManaged PostgreSQL with automatic credentials.\n\n## Connection\n\nUse ${db_hostname} and ${db_password} to wire services.\n\n## See Also\n\n- zerops://themes/wiring\n",
            ),
            (
                "themes/valkey.md",
                "# Valkey Cache\n\n## Keywords\n\nvalkey, cache\n\n## TL;DR\n\nRedis-compatible cache without authentication.\n\nValkey listens on port 6379.\n",
            ),
            (
                "recipes/nuxt.md",
                "# Nuxt Recipe\n\n## Keywords\n\nnodejs, nuxt, frontend\n\n## TL;DR\n\nNuxt app on nodejs runtime.\n\nA postgresql backing store works well here.\n",
            ),
        ];
        sources
            .iter()
            .map(|(path, md)| {
                let doc = parse_document(path, md);
                (doc.uri.clone(), doc)
            })
            .collect()
    }

    #[test]
    fn test_expand_query_aliases() {
        assert_eq!(expand_query("Postgres SSL"), "postgres postgresql ssl tls");
        assert_eq!(expand_query("node deploy"), "node nodejs deploy");
        assert_eq!(expand_query("deploy"), "deploy");
    }

    #[test]
    fn test_search_ranks_title_hits_first() {
        let docs = corpus();
        let index = SearchIndex::build(&docs);
        let hits = index.search("postgresql", 0);
        assert!(hits.len() >= 2, "{hits:?}");
        assert_eq!(hits[0].uri, "zerops://themes/postgresql");
        assert!(hits[0].score > hits[1].score);
    }

    #[test]
    fn test_search_expands_aliases() {
        let docs = corpus();
        let index = SearchIndex::build(&docs);
        let hits = index.search("redis", 0);
        assert!(
            hits.iter().any(|h| h.uri == "zerops://themes/valkey"),
            "redis should reach the valkey doc: {hits:?}"
        );
    }

    #[test]
    fn test_search_limit_and_empty() {
        let docs = corpus();
        let index = SearchIndex::build(&docs);
        assert_eq!(index.search("postgresql", 1).len(), 1);
        assert!(index.search("quantum blockchain", 0).is_empty());
        assert!(index.search("", 0).is_empty());
    }

    #[test]
    fn test_snippet_window_elided() {
        let padding = "lorem ipsum dolor sit amet ".repeat(30);
        let content = format!("{padding}the needle sits here {padding}");
        let snippet = extract_snippet(&content, "needle", 300);
        assert!(snippet.contains("needle"), "{snippet}");
        assert!(snippet.starts_with('\u{2026}'), "{snippet}");
        assert!(snippet.ends_with('\u{2026}'), "{snippet}");
        assert!(snippet.chars().count() <= 302, "{}", snippet.chars().count());
    }

    #[test]
    fn test_snippet_falls_back_to_leading_paragraph() {
        let content = "# Title\n\nFirst paragraph here.\nStill first.\n\nSecond paragraph.\n";
        let snippet = extract_snippet(content, "zzzznomatch", 300);
        assert_eq!(snippet, "First paragraph here. Still first.");
    }

    #[test]
    fn test_suggestions_unsupported_and_no_results() {
        let out = suggestions("mongodb setup", &[], None);
        assert_eq!(out.len(), 1);
        assert!(out[0].contains("MongoDB"));

        let out = suggestions("xyzzy", &[], None);
        assert_eq!(out.len(), 1);
        assert!(out[0].contains("No results for 'xyzzy'"), "{}", out[0]);
    }

    #[test]
    fn test_suggestions_see_also_capped() {
        let content = "# Doc\n\nBody.\n\n## See Also\n\n- zerops://a\n- zerops://b\n- zerops://c\n- zerops://d\n- zerops://e\n- zerops://f\n- zerops://g\n";
        let hit = SearchResult {
            uri: "zerops://doc".into(),
            title: "Doc".into(),
            score: 1.0,
            snippet: String::new(),
        };
        let out = suggestions("doc", &[hit], Some(content));
        assert_eq!(out.len(), 5);
        assert_eq!(out[0], "Related: zerops://a");
    }
}
