//! Service-plan validation and project-state detection for bootstrap.

use rustc_hash::FxHashSet;

use crate::core::error::ZcpError;
use crate::core::helpers;
use crate::core::state::{PlannedService, ProjectState};
use crate::core::types::{ServiceStack, ServiceStackType};
use crate::knowledge::versions::managed_base_names;

/// Static fallback for managed-service classification when the live
/// catalog is unavailable. Deliberately excludes technologies Zerops
/// does not host (mysql, mongodb, redis).
pub const MANAGED_SERVICE_PREFIXES: [&str; 14] = [
    "postgresql",
    "mariadb",
    "valkey",
    "keydb",
    "elasticsearch",
    "meilisearch",
    "rabbitmq",
    "kafka",
    "nats",
    "clickhouse",
    "qdrant",
    "typesense",
    "object-storage",
    "shared-storage",
];

/// Whether a service type (`postgresql@16`, `valkey`) names a managed
/// service per the static prefix table.
pub fn is_managed_type(service_type: &str) -> bool {
    let lower = service_type.to_lowercase();
    MANAGED_SERVICE_PREFIXES
        .iter()
        .any(|p| lower.starts_with(p))
}

fn is_managed_with_live(service_type: &str, live_managed: &FxHashSet<String>) -> bool {
    let base = service_type.split('@').next().unwrap_or(service_type);
    if !live_managed.is_empty() {
        return live_managed.contains(base);
    }
    is_managed_type(service_type)
}

/// Validates planned services in batch, collecting every error before
/// reporting. Managed entries without a mode are defaulted to NON_HA;
/// the returned list names the defaulted hostnames. `live_types` may be
/// empty, which skips catalog checks.
pub fn validate_service_plan(
    services: &mut [PlannedService],
    live_types: &[ServiceStackType],
) -> Result<Vec<String>, ZcpError> {
    if services.is_empty() {
        return Err(ZcpError::Validation(
            "plan must contain at least one service".into(),
        ));
    }

    let live_managed = managed_base_names(live_types);

    let mut errs: Vec<String> = Vec::new();
    let mut defaulted: Vec<String> = Vec::new();
    let mut seen: FxHashSet<String> = FxHashSet::default();

    for svc in services.iter_mut() {
        if let Err(err) = helpers::validate_hostname(&svc.hostname) {
            errs.push(format!("service '{}': {}", svc.hostname, err.message));
            continue;
        }
        if !seen.insert(svc.hostname.clone()) {
            errs.push(format!("duplicate hostname '{}'", svc.hostname));
            continue;
        }

        if svc.service_type.is_empty() {
            errs.push(format!("service '{}' has empty type", svc.hostname));
            continue;
        }

        if !live_types.is_empty() && !type_exists(&svc.service_type, live_types) {
            errs.push(format!(
                "service '{}' type '{}' not found in available service types",
                svc.hostname, svc.service_type
            ));
            continue;
        }

        if is_managed_with_live(&svc.service_type, &live_managed) {
            if svc.mode.is_empty() {
                svc.mode = "NON_HA".into();
                defaulted.push(svc.hostname.clone());
            } else if svc.mode != "HA" && svc.mode != "NON_HA" {
                errs.push(format!(
                    "service '{}' mode '{}' must be HA or NON_HA",
                    svc.hostname, svc.mode
                ));
            }
        }
    }

    match errs.len() {
        0 => Ok(defaulted),
        1 => Err(ZcpError::Validation(errs.remove(0))),
        n => Err(ZcpError::Validation(format!(
            "{} validation errors:\n- {}",
            n,
            errs.join("\n- ")
        ))),
    }
}

/// Whether a requested type names an ACTIVE catalog version. Full
/// `base@version` forms must match a version exactly; bare forms match
/// any version of that base.
fn type_exists(requested: &str, types: &[ServiceStackType]) -> bool {
    let mut active = types
        .iter()
        .flat_map(|st| st.versions.iter())
        .filter(|v| v.status == "ACTIVE");

    if requested.contains('@') {
        active.any(|v| v.name == requested)
    } else {
        active.any(|v| v.name.split('@').next() == Some(requested))
    }
}

/// Attestation text composed for a validated plan, e.g.
/// `Planned services: appdev (bun@1.2), db (postgresql@16, NON_HA [defaulted])`.
pub fn plan_attestation(services: &[PlannedService], defaulted: &[String]) -> String {
    let parts: Vec<String> = services
        .iter()
        .map(|svc| {
            let mut entry = format!("{} ({}", svc.hostname, svc.service_type);
            if !svc.mode.is_empty() {
                entry.push_str(", ");
                entry.push_str(&svc.mode);
                if defaulted.iter().any(|h| h == &svc.hostname) {
                    entry.push_str(" [defaulted]");
                }
            }
            entry.push(')');
            entry
        })
        .collect();
    format!("Planned services: {}", parts.join(", "))
}

/// Classifies a project for the bootstrap `detect` route. System
/// stacks (load balancers etc.) never count as runtime services.
pub fn detect_project_state(services: &[ServiceStack]) -> ProjectState {
    let runtime: Vec<&ServiceStack> = services
        .iter()
        .filter(|s| !s.is_system() && !is_managed_type(&s.type_info.version_name))
        .collect();

    if runtime.is_empty() {
        return ProjectState::Fresh;
    }
    if has_dev_stage_pattern(&runtime) {
        return ProjectState::Conformant;
    }
    ProjectState::NonConformant
}

/// True when any `<base>dev` hostname has a `<base>stage` counterpart.
fn has_dev_stage_pattern(services: &[&ServiceStack]) -> bool {
    let names: FxHashSet<&str> = services.iter().map(|s| s.name.as_str()).collect();
    names.iter().any(|name| {
        name.strip_suffix("dev")
            .is_some_and(|base| names.contains(format!("{base}stage").as_str()))
    })
}
