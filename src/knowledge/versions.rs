//! Live-catalog digests and version validation.
//!
//! Everything here degrades to empty output when no live types are
//! available; the briefing and import paths treat that as "skip the
//! check", never as an error.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::core::types::ServiceStackType;

pub const VERSION_STATUS_ACTIVE: &str = "ACTIVE";

const HIDDEN_CATEGORIES: [&str; 5] = [
    "CORE",
    "INTERNAL",
    "BUILD",
    "PREPARE_RUNTIME",
    "HTTP_L7_BALANCER",
];

const CATEGORY_ORDER: [&str; 4] = ["USER", "STANDARD", "SHARED_STORAGE", "OBJECT_STORAGE"];

const MANAGED_CATEGORIES: [&str; 3] = ["STANDARD", "SHARED_STORAGE", "OBJECT_STORAGE"];

pub fn is_hidden_category(category: &str) -> bool {
    HIDDEN_CATEGORIES.contains(&category)
}

pub fn is_managed_category(category: &str) -> bool {
    MANAGED_CATEGORIES.contains(&category)
}

fn category_display_name(category: &str) -> &str {
    match category {
        "USER" => "Runtime",
        "STANDARD" => "Managed",
        "SHARED_STORAGE" => "Shared storage",
        "OBJECT_STORAGE" => "Object storage",
        other => other,
    }
}

/// Managed service base names derived from the live catalog
/// (`postgresql`, `valkey`, ...). Empty when no types were passed;
/// callers fall back to the static prefix list.
pub fn managed_base_names(types: &[ServiceStackType]) -> FxHashSet<String> {
    let mut result = FxHashSet::default();
    for st in types {
        if !is_managed_category(&st.category) {
            continue;
        }
        for v in &st.versions {
            if v.status != VERSION_STATUS_ACTIVE {
                continue;
            }
            let base = v.name.split('@').next().unwrap_or(&v.name);
            result.insert(base.to_string());
        }
    }
    result
}

fn active_versions(st: &ServiceStackType) -> Vec<String> {
    st.versions
        .iter()
        .filter(|v| v.status == VERSION_STATUS_ACTIVE)
        .map(|v| v.name.clone())
        .collect()
}

/// `["nodejs@18", "nodejs@20"]` -> `nodejs@{18,20}`; falls back to a
/// comma join when bases differ or a name has no version.
fn compact_version_group(versions: &[String]) -> String {
    if versions.len() == 1 {
        return versions[0].clone();
    }
    let mut prefix = "";
    let mut suffixes = Vec::with_capacity(versions.len());
    for (i, v) in versions.iter().enumerate() {
        let Some((base, suffix)) = v.split_once('@') else {
            return versions.join(", ");
        };
        if i == 0 {
            prefix = base;
        } else if base != prefix {
            return versions.join(", ");
        }
        suffixes.push(suffix);
    }
    format!("{}@{{{}}}", prefix, suffixes.join(","))
}

fn group_visible<'a>(
    types: &'a [ServiceStackType],
) -> FxHashMap<&'a str, Vec<&'a ServiceStackType>> {
    let mut grouped: FxHashMap<&str, Vec<&ServiceStackType>> = FxHashMap::default();
    for st in types {
        if is_hidden_category(&st.category) {
            continue;
        }
        grouped.entry(st.category.as_str()).or_default().push(st);
    }
    grouped
}

/// Compact one-line-per-category digest for workflow payload embedding.
pub fn format_stack_list(types: &[ServiceStackType]) -> String {
    if types.is_empty() {
        return String::new();
    }
    let grouped = group_visible(types);
    if grouped.is_empty() {
        return String::new();
    }

    let mut out = String::from("## Available Service Stacks (live)\n");
    for cat in CATEGORY_ORDER {
        let Some(stacks) = grouped.get(cat) else {
            continue;
        };
        let entries: Vec<String> = stacks
            .iter()
            .map(|st| active_versions(st))
            .filter(|v| !v.is_empty())
            .map(|v| compact_version_group(&v))
            .collect();
        if entries.is_empty() {
            continue;
        }
        out.push_str(category_display_name(cat));
        out.push_str(": ");
        out.push_str(&entries.join(" | "));
        out.push('\n');
    }
    out
}

/// Rich digest for briefing injection: `[B]` marks runtimes that are
/// also usable as a build base, and a trailing `Build-only` line lists
/// build bases without a visible run counterpart.
pub fn format_service_stacks(types: &[ServiceStackType]) -> String {
    if types.is_empty() {
        return String::new();
    }

    let mut build_versions: FxHashSet<&str> = FxHashSet::default();
    for st in types {
        for v in &st.versions {
            if v.status != VERSION_STATUS_ACTIVE {
                continue;
            }
            if st.category == "BUILD" || v.is_build {
                build_versions.insert(v.name.as_str());
            }
        }
    }

    let grouped = group_visible(types);
    if grouped.is_empty() {
        return String::new();
    }

    let mut matched_build: FxHashSet<String> = FxHashSet::default();
    let mut out = String::from(
        "## Service Stacks (live)\n[B]=also usable as build.base in zerops.yml\n",
    );

    let mut write_category = |out: &mut String,
                              matched_build: &mut FxHashSet<String>,
                              cat: &str,
                              stacks: &[&ServiceStackType]| {
        let mut entries = Vec::new();
        for st in stacks {
            let versions = active_versions(st);
            if versions.is_empty() {
                continue;
            }
            let mut has_build = false;
            for vn in &versions {
                if build_versions.contains(vn.as_str()) {
                    has_build = true;
                    matched_build.insert(vn.clone());
                }
            }
            let mut entry = compact_version_group(&versions);
            if has_build {
                entry.push_str(" [B]");
            }
            entries.push(entry);
        }
        if entries.is_empty() {
            return;
        }
        out.push('\n');
        out.push_str(category_display_name(cat));
        out.push_str(": ");
        out.push_str(&entries.join(" | "));
    };

    for cat in CATEGORY_ORDER {
        if let Some(stacks) = grouped.get(cat) {
            write_category(&mut out, &mut matched_build, cat, stacks);
        }
    }
    let mut remaining: Vec<&str> = grouped
        .keys()
        .copied()
        .filter(|c| !CATEGORY_ORDER.contains(c))
        .collect();
    remaining.sort_unstable();
    for cat in remaining {
        write_category(&mut out, &mut matched_build, cat, &grouped[cat]);
    }

    let mut build_only = Vec::new();
    for st in types {
        if st.category != "BUILD" || !st.name.starts_with("zbuild") {
            continue;
        }
        let unmatched: Vec<String> = st
            .versions
            .iter()
            .filter(|v| v.status == VERSION_STATUS_ACTIVE && !matched_build.contains(&v.name))
            .map(|v| v.name.clone())
            .collect();
        if !unmatched.is_empty() {
            build_only.push(compact_version_group(&unmatched));
        }
    }
    if !build_only.is_empty() {
        out.push_str("\nBuild-only: ");
        out.push_str(&build_only.join(" | "));
    }

    out.push('\n');
    out
}

fn active_lookup(
    types: &[ServiceStackType],
) -> (FxHashSet<String>, FxHashMap<String, Vec<String>>) {
    let mut active: FxHashSet<String> = FxHashSet::default();
    let mut by_base: FxHashMap<String, Vec<String>> = FxHashMap::default();
    for st in types {
        if is_hidden_category(&st.category) {
            continue;
        }
        for v in &st.versions {
            if v.status != VERSION_STATUS_ACTIVE {
                continue;
            }
            active.insert(v.name.clone());
            let base = v.name.split('@').next().unwrap_or(&v.name);
            by_base.entry(base.to_string()).or_default().push(v.name.clone());
        }
    }
    (active, by_base)
}

/// Markdown check section for the requested runtime and services:
/// `✓` per exactly-matching ACTIVE version, `⚠` with the available
/// versions (or an unknown-type note) otherwise.
pub fn format_version_check(
    runtime: &str,
    services: &[String],
    types: &[ServiceStackType],
) -> String {
    if types.is_empty() {
        return String::new();
    }
    let (active, by_base) = active_lookup(types);

    let mut out = String::from("## Version Check\n\n");
    if !runtime.is_empty() {
        write_version_line(&mut out, &normalize_version_input(runtime, &by_base), &active, &by_base);
    }
    for svc in services {
        write_version_line(&mut out, &normalize_version_input(svc, &by_base), &active, &by_base);
    }
    out
}

/// Bare base names resolve to the first ACTIVE version of that base.
fn normalize_version_input(input: &str, by_base: &FxHashMap<String, Vec<String>>) -> String {
    if input.is_empty() || input.contains('@') {
        return input.to_string();
    }
    match by_base.get(input).and_then(|v| v.first()) {
        Some(first) => first.clone(),
        None => input.to_string(),
    }
}

fn write_version_line(
    out: &mut String,
    requested: &str,
    active: &FxHashSet<String>,
    by_base: &FxHashMap<String, Vec<String>>,
) {
    if active.contains(requested) {
        out.push_str(&format!("- \u{2713} `{}`\n", requested));
        return;
    }
    let base = requested.split('@').next().unwrap_or(requested);
    match by_base.get(base) {
        Some(available) if !available.is_empty() => {
            out.push_str(&format!(
                "- \u{26a0} `{}` not found. Available: {}\n",
                requested,
                available.join(", ")
            ));
        }
        _ => out.push_str(&format!("- \u{26a0} `{}` unknown type\n", requested)),
    }
}

/// One service entry from parsed import YAML, reduced to what version
/// validation needs.
#[derive(Debug, Clone)]
pub struct ImportService {
    pub hostname: String,
    pub service_type: String,
    pub has_mode: bool,
}

/// Warnings for import entries checked against the live catalog:
/// unknown types, inactive versions, and managed services missing a
/// mode. Empty when no live types are available.
pub fn validate_service_types(
    services: &[ImportService],
    types: &[ServiceStackType],
) -> Vec<String> {
    if types.is_empty() {
        return Vec::new();
    }
    let (active, by_base) = active_lookup(types);
    let mut managed_bases: FxHashSet<&str> = FxHashSet::default();
    for st in types {
        if st.category != "STANDARD" {
            continue;
        }
        for v in &st.versions {
            if v.status == VERSION_STATUS_ACTIVE {
                managed_bases.insert(v.name.split('@').next().unwrap_or(&v.name));
            }
        }
    }

    let mut warnings = Vec::new();
    for svc in services {
        if svc.service_type.is_empty() {
            continue;
        }
        let base = svc.service_type.split('@').next().unwrap_or(&svc.service_type);

        if !active.contains(&svc.service_type) {
            match by_base.get(base) {
                Some(available) if !available.is_empty() => warnings.push(format!(
                    "service '{}': type '{}' not found, available: {}",
                    svc.hostname,
                    svc.service_type,
                    available.join(", ")
                )),
                _ => warnings.push(format!(
                    "service '{}': unknown type '{}'",
                    svc.hostname, svc.service_type
                )),
            }
        }

        if managed_bases.contains(base) && !svc.has_mode {
            warnings.push(format!(
                "service '{}': managed type '{}' requires 'mode: NON_HA' or 'mode: HA'",
                svc.hostname, svc.service_type
            ));
        }
    }
    warnings
}
