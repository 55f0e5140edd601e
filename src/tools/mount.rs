//! `zerops_mount` - SSHFS mounts of service filesystems under `/var/www`.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::core::client::{Client, Mounter, MountState};
use crate::core::error::{PlatformError, ZcpError, codes};
use crate::core::helpers::{resolve_service, validate_hostname};

use super::{Annotations, Deps, Outcome, Registry, Tool, error_result, json_result, parse_input};

const MOUNT_BASE: &str = "/var/www";

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct MountInput {
    action: String,
    service_hostname: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MountResult {
    status: &'static str,
    hostname: String,
    mount_path: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    writable: bool,
    message: String,
}

#[derive(Debug, Serialize)]
struct MountStatusResult {
    mounts: Vec<MountInfo>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MountInfo {
    hostname: String,
    mount_path: String,
    mounted: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stale: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    writable: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    orphan: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    message: String,
}

pub fn register(reg: &mut Registry) {
    reg.add(Tool {
        name: "zerops_mount",
        title: "Mount/unmount service filesystems",
        description: "Mount/unmount service filesystems via SSHFS. Actions: mount, unmount, \
                      status.",
        annotations: Annotations::idempotent(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "action": {
                    "type": "string",
                    "enum": ["mount", "unmount", "status"],
                    "description": "Action to perform"
                },
                "serviceHostname": {
                    "type": "string",
                    "description": "Service to mount/unmount. Required for mount and unmount."
                }
            },
            "required": ["action"],
            "additionalProperties": false
        }),
        handler: Box::new(|deps, args| {
            run(deps, args).unwrap_or_else(|e| error_result(&e))
        }),
    });
}

fn run(deps: &Deps, args: Value) -> Result<Outcome, ZcpError> {
    let Some(mounter) = &deps.mounter else {
        return Err(PlatformError::new(
            codes::NOT_IMPLEMENTED,
            "Mount is only available inside a Zerops container",
            "zerops_mount requires SSHFS (available in Zerops containers)",
        )
        .into());
    };
    let input: MountInput = parse_input(args)?;

    match input.action.as_str() {
        "mount" => {
            let result = mount_service(
                deps.client.as_ref(),
                &deps.auth.project_id,
                mounter.as_ref(),
                &input.service_hostname,
            )?;
            Ok(json_result(&result))
        }
        "unmount" => {
            let result = unmount_service(
                deps.client.as_ref(),
                &deps.auth.project_id,
                mounter.as_ref(),
                &input.service_hostname,
            )?;
            Ok(json_result(&result))
        }
        "status" => {
            let result = mount_status(
                deps.client.as_ref(),
                &deps.auth.project_id,
                mounter.as_ref(),
                &input.service_hostname,
            )?;
            Ok(json_result(&result))
        }
        "" => Err(PlatformError::new(
            codes::INVALID_PARAMETER,
            "Action is required",
            "Use mount, unmount, or status",
        )
        .into()),
        other => Err(PlatformError::new(
            codes::INVALID_PARAMETER,
            format!("Invalid action '{}'", other),
            "Use mount, unmount, or status",
        )
        .into()),
    }
}

fn mount_path_for(hostname: &str) -> String {
    format!("{}/{}", MOUNT_BASE, hostname)
}

/// Mounts a service's `/var/www` over SSHFS. Idempotent: an active mount
/// reports ALREADY_MOUNTED, a stale one is force-cleared and remounted.
fn mount_service(
    client: &dyn Client,
    project_id: &str,
    mounter: &dyn Mounter,
    hostname: &str,
) -> Result<MountResult, ZcpError> {
    validate_hostname(hostname)?;

    let services = client.list_services(project_id)?;
    resolve_service(&services, hostname)?;

    let mount_path = mount_path_for(hostname);
    let state = mounter.check_mount(&mount_path).map_err(|e| {
        PlatformError::new(
            codes::MOUNT_FAILED,
            format!("Failed to check mount status for {}: {}", hostname, e.message),
            "Check if the service is accessible",
        )
    })?;

    match state {
        MountState::Mounted => {
            let writable = mounter.is_writable(&mount_path).unwrap_or(false);
            return Ok(MountResult {
                status: "ALREADY_MOUNTED",
                hostname: hostname.to_string(),
                mount_path: mount_path.clone(),
                writable,
                message: format!("Service {} is already mounted at {}", hostname, mount_path),
            });
        }
        MountState::Stale => {
            mounter.force_unmount(hostname, &mount_path).map_err(|e| {
                PlatformError::new(
                    codes::MOUNT_FAILED,
                    format!("Failed to clear stale mount for {}: {}", hostname, e.message),
                    "Try fusermount -uz manually",
                )
            })?;
            let _ = std::fs::remove_dir(Path::new(&mount_path));
        }
        MountState::NotMounted => {}
    }

    mounter.mount(hostname, &mount_path).map_err(|e| {
        PlatformError::new(
            codes::MOUNT_FAILED,
            format!("Failed to mount {}: {}", hostname, e.message),
            "Verify SSHFS is available and the service is running",
        )
    })?;

    let writable = mounter.is_writable(&mount_path).unwrap_or(false);
    Ok(MountResult {
        status: "MOUNTED",
        hostname: hostname.to_string(),
        mount_path: mount_path.clone(),
        writable,
        message: format!("Mounted {} at {}", hostname, mount_path),
    })
}

/// Unmounts a service's SSHFS mount. Idempotent, and works even when the
/// service no longer exists (stale or orphaned mounts).
fn unmount_service(
    client: &dyn Client,
    project_id: &str,
    mounter: &dyn Mounter,
    hostname: &str,
) -> Result<MountResult, ZcpError> {
    validate_hostname(hostname)?;

    let mount_path = mount_path_for(hostname);

    // Mount state first; the API lookup comes later so deleted services
    // can still be unmounted.
    let state = mounter.check_mount(&mount_path).map_err(|e| {
        PlatformError::new(
            codes::UNMOUNT_FAILED,
            format!("Failed to check mount status for {}: {}", hostname, e.message),
            "Check mount state manually",
        )
    })?;

    match state {
        MountState::NotMounted => Ok(MountResult {
            status: "NOT_MOUNTED",
            hostname: hostname.to_string(),
            mount_path: mount_path.clone(),
            writable: false,
            message: format!("Service {} is not mounted", hostname),
        }),
        MountState::Stale => {
            mounter.force_unmount(hostname, &mount_path).map_err(|e| {
                PlatformError::new(
                    codes::UNMOUNT_FAILED,
                    format!("Failed to force unmount stale {}: {}", hostname, e.message),
                    "Try fusermount -uz manually",
                )
            })?;
            let _ = std::fs::remove_dir(Path::new(&mount_path));
            Ok(MountResult {
                status: "UNMOUNTED",
                hostname: hostname.to_string(),
                mount_path: mount_path.clone(),
                writable: false,
                message: format!("Force unmounted stale {} from {}", hostname, mount_path),
            })
        }
        MountState::Mounted => {
            let services = client.list_services(project_id)?;
            if let Err(resolve_err) = resolve_service(&services, hostname) {
                if resolve_err.code != codes::SERVICE_NOT_FOUND {
                    return Err(resolve_err.into());
                }
                // Service deleted but the mount is still live.
                mounter.force_unmount(hostname, &mount_path).map_err(|e| {
                    PlatformError::new(
                        codes::UNMOUNT_FAILED,
                        format!("Failed to force unmount {}: {}", hostname, e.message),
                        "Try fusermount -uz manually",
                    )
                })?;
                let _ = std::fs::remove_dir(Path::new(&mount_path));
                return Ok(MountResult {
                    status: "UNMOUNTED",
                    hostname: hostname.to_string(),
                    mount_path: mount_path.clone(),
                    writable: false,
                    message: format!(
                        "Force unmounted {} (service deleted) from {}",
                        hostname, mount_path
                    ),
                });
            }

            mounter.unmount(hostname, &mount_path).map_err(|e| {
                PlatformError::new(
                    codes::UNMOUNT_FAILED,
                    format!("Failed to unmount {}: {}", hostname, e.message),
                    "Try fusermount -u manually",
                )
            })?;
            let _ = std::fs::remove_dir(Path::new(&mount_path));
            Ok(MountResult {
                status: "UNMOUNTED",
                hostname: hostname.to_string(),
                mount_path: mount_path.clone(),
                writable: false,
                message: format!("Unmounted {} from {}", hostname, mount_path),
            })
        }
    }
}

/// Reports mount state for one or all services, plus orphan mounts left
/// behind by deleted services.
fn mount_status(
    client: &dyn Client,
    project_id: &str,
    mounter: &dyn Mounter,
    hostname: &str,
) -> Result<MountStatusResult, ZcpError> {
    let services = client.list_services(project_id)?;

    if !hostname.is_empty() {
        validate_hostname(hostname)?;
        let svc = resolve_service(&services, hostname)?;
        let info = check_mount_info(mounter, &svc.name, false);
        return Ok(MountStatusResult { mounts: vec![info] });
    }

    let mut mounts: Vec<MountInfo> = services
        .iter()
        .map(|svc| check_mount_info(mounter, &svc.name, false))
        .collect();

    // Orphan detection: dirs under the mount base with no matching
    // service. Plain directories are skipped; only live or stale SSHFS
    // mounts are reported.
    if let Ok(dirs) = mounter.list_mount_dirs(MOUNT_BASE) {
        for dir in dirs {
            if services.iter().any(|s| s.name == dir) {
                continue;
            }
            let info = check_mount_info(mounter, &dir, true);
            if info.mounted || info.stale {
                mounts.push(info);
            }
        }
    }

    Ok(MountStatusResult { mounts })
}

fn check_mount_info(mounter: &dyn Mounter, hostname: &str, orphan: bool) -> MountInfo {
    let mount_path = mount_path_for(hostname);
    let mut info = MountInfo {
        hostname: hostname.to_string(),
        mount_path: mount_path.clone(),
        mounted: false,
        stale: false,
        writable: false,
        orphan,
        message: String::new(),
    };
    let Ok(state) = mounter.check_mount(&mount_path) else {
        return info;
    };
    match state {
        MountState::Mounted => {
            info.mounted = true;
            info.writable = mounter.is_writable(&mount_path).unwrap_or(false);
        }
        MountState::Stale => {
            info.stale = true;
            info.message = if orphan {
                "Service was deleted but mount is stale. Use unmount to clean up.".to_string()
            } else {
                "Mount is stale (transport disconnected). Will auto-reconnect when service is running. If service is stopped, start it first."
                    .to_string()
            };
        }
        MountState::NotMounted => {}
    }
    info
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::core::mock::{MockClient, MockMounter};
    use crate::core::types::{ServiceStack, ServiceTypeInfo};
    use crate::tools::tests::test_deps;

    fn service(id: &str, name: &str) -> ServiceStack {
        ServiceStack {
            id: id.into(),
            name: name.into(),
            project_id: "p1".into(),
            type_info: ServiceTypeInfo {
                version_name: "nodejs@22".into(),
                category_name: "USER".into(),
            },
            status: "RUNNING".into(),
            mode: "NON_HA".into(),
            ports: vec![],
            subdomain_access: false,
            custom_autoscaling: None,
            current_autoscaling: None,
            created: String::new(),
            last_update: String::new(),
        }
    }

    fn deps_with_mounter(client: MockClient, mounter: MockMounter) -> (Deps, Arc<MockMounter>) {
        let mounter = Arc::new(mounter);
        let mut deps = test_deps(client);
        deps.mounter = Some(mounter.clone());
        (deps, mounter)
    }

    #[test]
    fn test_mount_then_already_mounted() {
        let (deps, mounter) = deps_with_mounter(
            MockClient::new().with_services(vec![service("s1", "appdev")]),
            MockMounter::new(),
        );

        let out = run(&deps, json!({"action": "mount", "serviceHostname": "appdev"}))
            .expect("mount");
        let v: Value = serde_json::from_str(&out.text).expect("json");
        assert_eq!(v["status"], "MOUNTED");
        assert_eq!(v["mountPath"], "/var/www/appdev");
        assert_eq!(v["writable"], true);
        assert_eq!(mounter.ops(), vec!["mount appdev"]);

        let out = run(&deps, json!({"action": "mount", "serviceHostname": "appdev"}))
            .expect("second mount");
        let v: Value = serde_json::from_str(&out.text).expect("json");
        assert_eq!(v["status"], "ALREADY_MOUNTED");
        // No second mount call.
        assert_eq!(mounter.ops(), vec!["mount appdev"]);
    }

    #[test]
    fn test_stale_mount_is_cleared_before_remount() {
        let (deps, mounter) = deps_with_mounter(
            MockClient::new().with_services(vec![service("s1", "appdev")]),
            MockMounter::new().with_state("/var/www/appdev", MountState::Stale),
        );

        let out = run(&deps, json!({"action": "mount", "serviceHostname": "appdev"}))
            .expect("mount");
        let v: Value = serde_json::from_str(&out.text).expect("json");
        assert_eq!(v["status"], "MOUNTED");
        assert_eq!(mounter.ops(), vec!["force_unmount appdev", "mount appdev"]);
    }

    #[test]
    fn test_unmount_variants() {
        let (deps, mounter) = deps_with_mounter(
            MockClient::new().with_services(vec![service("s1", "appdev")]),
            MockMounter::new().with_state("/var/www/appdev", MountState::Mounted),
        );

        let out = run(&deps, json!({"action": "unmount", "serviceHostname": "appdev"}))
            .expect("unmount");
        let v: Value = serde_json::from_str(&out.text).expect("json");
        assert_eq!(v["status"], "UNMOUNTED");
        assert_eq!(mounter.ops(), vec!["unmount appdev"]);

        let out = run(&deps, json!({"action": "unmount", "serviceHostname": "appdev"}))
            .expect("second unmount");
        let v: Value = serde_json::from_str(&out.text).expect("json");
        assert_eq!(v["status"], "NOT_MOUNTED");
    }

    #[test]
    fn test_unmount_of_deleted_service_forces() {
        // Mount exists but the service is gone from the project.
        let (deps, mounter) = deps_with_mounter(
            MockClient::new().with_services(vec![]),
            MockMounter::new().with_state("/var/www/olddev", MountState::Mounted),
        );

        let out = run(&deps, json!({"action": "unmount", "serviceHostname": "olddev"}))
            .expect("unmount");
        let v: Value = serde_json::from_str(&out.text).expect("json");
        assert_eq!(v["status"], "UNMOUNTED");
        assert!(
            v["message"]
                .as_str()
                .expect("message")
                .contains("service deleted")
        );
        assert_eq!(mounter.ops(), vec!["force_unmount olddev"]);
    }

    #[test]
    fn test_status_lists_services_and_orphans() {
        let (deps, _mounter) = deps_with_mounter(
            MockClient::new().with_services(vec![service("s1", "appdev")]),
            MockMounter::new()
                .with_state("/var/www/appdev", MountState::Mounted)
                .with_state("/var/www/ghost", MountState::Stale)
                .with_dirs(vec!["appdev".into(), "ghost".into(), "plaindir".into()]),
        );

        let out = run(&deps, json!({"action": "status"})).expect("status");
        let v: Value = serde_json::from_str(&out.text).expect("json");
        let mounts = v["mounts"].as_array().expect("mounts");
        assert_eq!(mounts.len(), 2);
        assert_eq!(mounts[0]["hostname"], "appdev");
        assert_eq!(mounts[0]["mounted"], true);
        assert_eq!(mounts[1]["hostname"], "ghost");
        assert_eq!(mounts[1]["stale"], true);
        assert_eq!(mounts[1]["orphan"], true);
        assert!(
            mounts[1]["message"]
                .as_str()
                .expect("message")
                .contains("deleted")
        );
        // plaindir is not a mount, so it is not reported.
    }

    #[test]
    fn test_stale_status_message_for_live_service() {
        let (deps, _mounter) = deps_with_mounter(
            MockClient::new().with_services(vec![service("s1", "appdev")]),
            MockMounter::new().with_state("/var/www/appdev", MountState::Stale),
        );

        let out = run(&deps, json!({"action": "status", "serviceHostname": "appdev"}))
            .expect("status");
        let v: Value = serde_json::from_str(&out.text).expect("json");
        assert!(
            v["mounts"][0]["message"]
                .as_str()
                .expect("message")
                .contains("auto-reconnect")
        );
    }

    #[test]
    fn test_rejects_unknown_or_missing_action() {
        let (deps, _mounter) =
            deps_with_mounter(MockClient::new(), MockMounter::new());
        let err = run(&deps, json!({"action": "remount"})).expect_err("bad action");
        assert!(err.to_string().contains("Invalid action 'remount'"));

        let err = run(&deps, json!({})).expect_err("no action");
        assert!(err.to_string().contains("Action is required"));
    }

    #[test]
    fn test_requires_mounter_capability() {
        let deps = test_deps(MockClient::new());
        let err = run(&deps, json!({"action": "status"})).expect_err("no mounter");
        assert!(err.to_string().contains("only available inside a Zerops container"));
    }
}
