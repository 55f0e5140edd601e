//! Detects whether ZCP is running inside a Zerops container.
//!
//! Resolved once at startup and passed down by value.

use std::env;

#[derive(Debug, Clone, Default)]
pub struct RuntimeInfo {
    pub in_container: bool,
    /// Hostname of the service this process runs as (container only).
    pub service_name: String,
    pub service_id: String,
    pub project_id: String,
}

/// Reads Zerops container env vars. The `serviceId` var is injected into
/// every container; its presence is the definitive signal.
pub fn detect() -> RuntimeInfo {
    detect_from(|key| env::var(key).ok())
}

fn detect_from(get: impl Fn(&str) -> Option<String>) -> RuntimeInfo {
    let service_id = get("serviceId").unwrap_or_default();
    if service_id.is_empty() {
        return RuntimeInfo::default();
    }
    RuntimeInfo {
        in_container: true,
        service_name: get("hostname").unwrap_or_default(),
        service_id,
        project_id: get("projectId").unwrap_or_default(),
    }
}
