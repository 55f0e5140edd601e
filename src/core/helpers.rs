//! Validation and conversion helpers shared across tools.

use std::sync::OnceLock;

use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use serde_json::{Value, json};

use crate::core::client::PlatformResult;
use crate::core::error::{PlatformError, codes};
use crate::core::types::{EnvVar, ServiceStack};

/// Hostnames are lowercase alphanumeric, must start with a letter,
/// max 25 chars. This is the import-grammar rule, stricter than what
/// the platform tolerates for existing services.
fn hostname_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z][a-z0-9]{0,24}$").expect("static regex"))
}

fn duration_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d+)(m|h|d)$").expect("static regex"))
}

fn cross_ref_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$\{[a-zA-Z_][a-zA-Z0-9_]*\}").expect("static regex"))
}

pub fn validate_hostname(hostname: &str) -> PlatformResult<()> {
    if hostname.is_empty() {
        return Err(PlatformError::new(
            codes::SERVICE_REQUIRED,
            "Service hostname is required",
            "Provide serviceHostname parameter",
        ));
    }
    if !hostname_regex().is_match(hostname) {
        return Err(PlatformError::new(
            codes::INVALID_HOSTNAME,
            format!("Invalid hostname format: {}", hostname),
            "Hostname must start with a lowercase letter and contain only lowercase letters and digits (max 25 chars)",
        ));
    }
    Ok(())
}

pub fn is_valid_hostname(hostname: &str) -> bool {
    hostname_regex().is_match(hostname)
}

/// Resolves a hostname against a pre-fetched service list, avoiding
/// repeated API calls.
pub fn resolve_service<'a>(
    services: &'a [ServiceStack],
    hostname: &str,
) -> PlatformResult<&'a ServiceStack> {
    services
        .iter()
        .find(|s| s.name == hostname)
        .ok_or_else(|| {
            PlatformError::new(
                codes::SERVICE_NOT_FOUND,
                format!("Service '{}' not found", hostname),
                format!("Available services: {}", list_hostnames(services)),
            )
        })
}

pub fn list_hostnames(services: &[ServiceStack]) -> String {
    if services.is_empty() {
        return "(none)".to_string();
    }
    services
        .iter()
        .map(|s| s.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Converts user-friendly time strings to an absolute timestamp.
/// Supports "30m", "1h", "24h", "7d" and RFC3339; empty means 1h ago.
pub fn parse_since(s: &str) -> PlatformResult<DateTime<Utc>> {
    if s.is_empty() {
        return Ok(Utc::now() - Duration::hours(1));
    }

    if let Some(caps) = duration_regex().captures(s) {
        let n: i64 = caps[1].parse().map_err(|_| {
            PlatformError::new(
                codes::INVALID_PARAMETER,
                format!("invalid duration number: {}", s),
                "Use formats like 30m, 1h, 7d",
            )
        })?;
        return match &caps[2] {
            "m" if (1..=1440).contains(&n) => Ok(Utc::now() - Duration::minutes(n)),
            "m" => Err(since_range_error("minutes must be 1-1440")),
            "h" if (1..=168).contains(&n) => Ok(Utc::now() - Duration::hours(n)),
            "h" => Err(since_range_error("hours must be 1-168")),
            "d" if (1..=30).contains(&n) => Ok(Utc::now() - Duration::days(n)),
            _ => Err(since_range_error("days must be 1-30")),
        };
    }

    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| {
            PlatformError::new(
                codes::INVALID_PARAMETER,
                format!("invalid since format: {}", s),
                "Use formats like 30m, 1h, 7d or RFC3339",
            )
        })
}

fn since_range_error(msg: &str) -> PlatformError {
    PlatformError::new(codes::INVALID_PARAMETER, msg, "Use formats like 30m, 1h, 7d")
}

/// Splits "KEY=value" strings on the first '=' only; values may contain '='.
pub fn parse_env_pairs(vars: &[String]) -> PlatformResult<Vec<(String, String)>> {
    let mut pairs = Vec::with_capacity(vars.len());
    for v in vars {
        let (key, value) = v.split_once('=').ok_or_else(|| {
            PlatformError::new(
                codes::INVALID_ENV_FORMAT,
                format!("Invalid format '{}', expected KEY=value", v),
                "Format: KEY=value (split on first '=')",
            )
        })?;
        if key.is_empty() {
            return Err(PlatformError::new(
                codes::INVALID_ENV_FORMAT,
                "Empty key in env var",
                "Format: KEY=value",
            ));
        }
        pairs.push((key.to_string(), value.to_string()));
    }
    Ok(pairs)
}

/// Platform-injected keys hidden from discover output. Subdomain URLs
/// come from the subdomain tool instead.
const FILTERED_ENV_KEYS: [&str; 1] = ["zeropsSubdomain"];

/// Platform-injected keys must not be written back through the
/// env-file endpoint.
pub fn is_injected_env_key(key: &str) -> bool {
    FILTERED_ENV_KEYS.contains(&key)
}

/// Converts env vars to JSON objects; `${...}` cross-service references
/// get an `isReference` marker.
pub fn env_vars_to_json(envs: &[EnvVar]) -> Vec<Value> {
    envs.iter()
        .filter(|e| !FILTERED_ENV_KEYS.contains(&e.key.as_str()))
        .map(|e| {
            let mut m = json!({ "key": e.key, "value": e.content });
            if cross_ref_regex().is_match(&e.content) {
                m["isReference"] = json!(true);
            }
            m
        })
        .collect()
}

pub fn find_env_id_by_key<'a>(envs: &'a [EnvVar], key: &str) -> Option<&'a str> {
    envs.iter()
        .find(|e| e.key == key)
        .map(|e| e.id.as_str())
}
