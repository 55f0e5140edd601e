//! Section slicing and name normalisation for briefing assembly.

use rustc_hash::FxHashMap;

/// Splits markdown by H2 headers, fence-aware so `## ` inside ``` code
/// blocks never starts a section. Content before the first H2 is
/// discarded.
pub fn parse_h2_sections(content: &str) -> FxHashMap<String, String> {
    let mut sections = FxHashMap::default();
    let mut current: Option<String> = None;
    let mut buf = String::new();
    let mut in_code_block = false;

    for line in content.lines() {
        let trimmed = line.trim();

        if trimmed.starts_with("```") {
            in_code_block = !in_code_block;
            if current.is_some() {
                buf.push_str(line);
                buf.push('\n');
            }
            continue;
        }

        if !in_code_block && let Some(name) = trimmed.strip_prefix("## ") {
            if let Some(prev) = current.take() {
                sections.insert(prev, buf.trim().to_string());
            }
            current = Some(name.to_string());
            buf.clear();
            continue;
        }

        if current.is_some() {
            buf.push_str(line);
            buf.push('\n');
        }
    }

    if let Some(prev) = current {
        sections.insert(prev, buf.trim().to_string());
    }
    sections
}

/// Extracts a `<section name="{name}">...</section>` block; used for
/// the per-step bootstrap guides.
pub fn named_section(content: &str, name: &str) -> Option<String> {
    let open = format!("<section name=\"{}\">", name);
    let start = content.find(&open)? + open.len();
    let end = content[start..].find("</section>")?;
    Some(content[start..start + end].trim().to_string())
}

const RUNTIME_SECTIONS: [(&str, &str); 17] = [
    ("php", "PHP"),
    ("php-nginx", "PHP"),
    ("php-apache", "PHP"),
    ("nodejs", "Node.js"),
    ("bun", "Bun"),
    ("deno", "Deno"),
    ("python", "Python"),
    ("go", "Go"),
    ("java", "Java"),
    ("dotnet", ".NET"),
    ("rust", "Rust"),
    ("ruby", "Ruby"),
    ("elixir", "Elixir"),
    ("gleam", "Gleam"),
    ("static", "Static"),
    ("alpine", "Alpine"),
    ("ubuntu", "Ubuntu"),
];

/// `php-nginx@8.4` -> `PHP`; unknown runtimes yield `None` rather than
/// an error so the briefing degrades to the shared layers.
pub fn runtime_section_name(runtime: &str) -> Option<&'static str> {
    let base = runtime.split('@').next().unwrap_or(runtime);
    RUNTIME_SECTIONS
        .iter()
        .find(|(k, _)| *k == base)
        .map(|(_, v)| *v)
}

/// Whether the base of a versioned type names a runtime at all; drives
/// the briefing's runtime auto-promotion.
pub fn is_runtime_base(service_type: &str) -> bool {
    runtime_section_name(service_type).is_some()
}

const SERVICE_SECTIONS: [(&str, &str); 14] = [
    ("postgresql", "PostgreSQL"),
    ("mariadb", "MariaDB"),
    ("valkey", "Valkey"),
    ("keydb", "KeyDB"),
    ("elasticsearch", "Elasticsearch"),
    ("meilisearch", "Meilisearch"),
    ("clickhouse", "ClickHouse"),
    ("qdrant", "Qdrant"),
    ("typesense", "Typesense"),
    ("kafka", "Kafka"),
    ("nats", "NATS"),
    ("rabbitmq", "RabbitMQ"),
    ("object-storage", "Object Storage"),
    ("shared-storage", "Shared Storage"),
];

/// `postgresql@16` -> `PostgreSQL`; unknown services fall back to
/// title-casing each dash-separated word.
pub fn service_card_name(service: &str) -> String {
    let base = service.split('@').next().unwrap_or(service);
    if let Some((_, name)) = SERVICE_SECTIONS.iter().find(|(k, _)| *k == base) {
        return name.to_string();
    }
    base.split('-')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_h2_sections_respect_code_fences() {
        let md = "\
intro ignored

## First

body one

```yaml
## not a header
key: value
```

## Second

body two
";
        let sections = parse_h2_sections(md);
        assert_eq!(sections.len(), 2);
        assert!(sections["First"].contains("## not a header"));
        assert_eq!(sections["Second"], "body two");
    }

    #[test]
    fn test_named_section_extraction() {
        let md = "prefix\n<section name=\"detect\">\nCall discover first.\n</section>\n<section name=\"plan\">\nPlan it.\n</section>\n";
        assert_eq!(
            named_section(md, "detect").as_deref(),
            Some("Call discover first.")
        );
        assert_eq!(named_section(md, "plan").as_deref(), Some("Plan it."));
        assert!(named_section(md, "deploy").is_none());
    }

    #[test]
    fn test_runtime_normalisation() {
        assert_eq!(runtime_section_name("php-nginx@8.4"), Some("PHP"));
        assert_eq!(runtime_section_name("nodejs@22"), Some("Node.js"));
        assert_eq!(runtime_section_name("bun"), Some("Bun"));
        assert_eq!(runtime_section_name("cobol@85"), None);
    }

    #[test]
    fn test_service_normalisation() {
        assert_eq!(service_card_name("postgresql@16"), "PostgreSQL");
        assert_eq!(service_card_name("object-storage"), "Object Storage");
        assert_eq!(service_card_name("keydb@6"), "KeyDB");
        assert_eq!(service_card_name("unknown-service@1"), "Unknown-Service");
    }
}
