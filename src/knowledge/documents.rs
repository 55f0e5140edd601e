//! Markdown document parsing for the embedded knowledge corpus.
//!
//! Conventions the corpus follows: an H1 title, an optional
//! `## Keywords` line (comma-separated), an optional `## TL;DR`
//! paragraph, and an optional `## See Also` section of URIs.

/// A parsed knowledge document.
#[derive(Debug, Clone)]
pub struct Document {
    /// Path inside the embedded corpus, e.g. `themes/core.md`.
    pub path: String,
    /// `zerops://themes/core`
    pub uri: String,
    pub title: String,
    pub keywords: Vec<String>,
    pub tldr: String,
    pub content: String,
    /// TL;DR when present, otherwise the leading paragraph.
    pub description: String,
}

pub fn parse_document(path: &str, content: &str) -> Document {
    let tldr = extract_tldr(content);
    let description = if tldr.is_empty() {
        extract_first_paragraph(content)
    } else {
        tldr.clone()
    };

    Document {
        path: path.to_string(),
        uri: path_to_uri(path),
        title: extract_title(content),
        keywords: extract_keywords(content),
        tldr,
        content: content.to_string(),
        description,
    }
}

/// `themes/core.md` -> `zerops://themes/core`
pub fn path_to_uri(path: &str) -> String {
    let rel = path.strip_suffix(".md").unwrap_or(path);
    format!("zerops://{}", rel)
}

fn extract_title(content: &str) -> String {
    for line in content.lines() {
        if let Some(rest) = line.trim().strip_prefix("# ") {
            return rest.to_string();
        }
    }
    String::new()
}

fn extract_keywords(content: &str) -> Vec<String> {
    let mut in_keywords = false;
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed == "## Keywords" {
            in_keywords = true;
            continue;
        }
        if in_keywords {
            if trimmed.is_empty() || trimmed.starts_with("##") {
                break;
            }
            return trimmed
                .split(',')
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect();
        }
    }
    Vec::new()
}

fn extract_tldr(content: &str) -> String {
    let mut in_tldr = false;
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed == "## TL;DR" {
            in_tldr = true;
            continue;
        }
        if in_tldr {
            if trimmed.is_empty() {
                continue;
            }
            if trimmed.starts_with("##") {
                break;
            }
            return trimmed.to_string();
        }
    }
    String::new()
}

/// First paragraph after the H1, joined to one line and capped at
/// 200 chars.
pub fn extract_first_paragraph(content: &str) -> String {
    let mut para: Vec<&str> = Vec::new();
    let mut past_title = false;
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("# ") {
            past_title = true;
            continue;
        }
        if !past_title {
            continue;
        }
        if trimmed.is_empty() && !para.is_empty() {
            break;
        }
        if !trimmed.is_empty() && !trimmed.starts_with("##") {
            para.push(trimmed);
        }
    }
    truncate_chars(&para.join(" "), 200)
}

pub(crate) fn truncate_chars(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &s[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
# PostgreSQL on Zerops

Relational database with automatic credentials.

## Keywords
postgresql, postgres, sql, Database

## TL;DR

Managed PostgreSQL; connection string comes from generated env vars.

## Setup

Some setup text.
";

    #[test]
    fn test_parse_document_fields() {
        let doc = parse_document("themes/postgresql.md", SAMPLE);
        assert_eq!(doc.uri, "zerops://themes/postgresql");
        assert_eq!(doc.title, "PostgreSQL on Zerops");
        assert_eq!(doc.keywords, vec!["postgresql", "postgres", "sql", "database"]);
        assert!(doc.tldr.starts_with("Managed PostgreSQL"));
        assert_eq!(doc.description, doc.tldr);
    }

    #[test]
    fn test_description_falls_back_to_first_paragraph() {
        let doc = parse_document(
            "recipes/min.md",
            "# Minimal\n\nJust one paragraph here.\n\n## Other\n",
        );
        assert_eq!(doc.tldr, "");
        assert_eq!(doc.description, "Just one paragraph here.");
    }

    #[test]
    fn test_first_paragraph_capped() {
        let long = format!("# T\n\n{}\n", "word ".repeat(100));
        let doc = parse_document("themes/t.md", &long);
        assert!(doc.description.len() <= 203);
        assert!(doc.description.ends_with("..."));
    }

    #[test]
    fn test_missing_sections_are_empty() {
        let doc = parse_document("themes/bare.md", "no title at all\n");
        assert_eq!(doc.title, "");
        assert!(doc.keywords.is_empty());
        assert_eq!(doc.tldr, "");
    }
}
