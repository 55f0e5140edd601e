//! `zerops_deploy` - push code to a service and watch the build pipeline.
//!
//! Inside a Zerops container the push runs over SSH from this process's
//! own container (where the workspace and any mounted dev trees live).
//! Outside, it shells out to a local `zcli push`.

use std::path::Path;
use std::process::Command;
use std::thread;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

use crate::core::auth::AuthInfo;
use crate::core::client::Client;
use crate::core::error::{PlatformError, ZcpError, codes};
use crate::core::helpers::resolve_service;
use crate::core::poll::PollConfig;
use crate::core::types::AppVersionEvent;
use crate::tools::events::calc_duration;

use super::{
    Annotations, Deps, Outcome, Registry, Tool, error_result, json_result, next_actions,
    parse_input, require_workflow,
};

const DEFAULT_WORKING_DIR: &str = "/var/www";

const STATUS_TRIGGERED: &str = "BUILD_TRIGGERED";
const STATUS_DEPLOYED: &str = "DEPLOYED";
const STATUS_ACTIVE: &str = "ACTIVE";
const STATUS_BUILD_FAILED: &str = "BUILD_FAILED";

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct DeployInput {
    target_service: String,
    working_dir: String,
    setup: String,
    fresh_git: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DeployResult {
    status: String,
    mode: &'static str,
    target_service: String,
    target_service_id: String,
    message: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    monitor_hint: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    build_status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    build_duration: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    suggestion: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    next_actions: Option<&'static str>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    timed_out: bool,
}

pub fn register(reg: &mut Registry) {
    reg.add(Tool {
        name: "zerops_deploy",
        title: "Deploy code to a service",
        description: "REQUIRES active workflow session - call zerops_workflow action=\"start\" \
                      first. Deploy code to a Zerops service. Inside a Zerops container the push \
                      runs over SSH from this container; otherwise local zcli is used. Blocks \
                      until the build pipeline completes - returns final status (DEPLOYED or \
                      BUILD_FAILED) with build duration. Git initialization is handled \
                      automatically - use freshGit=true when the working directory has no valid \
                      git repo (common for first deploys or shared storage). SSH mode requires \
                      zerops.yml in workingDir (default /var/www). After deploy, /var/www only \
                      contains deployFiles artifacts - dev services must use deployFiles: [.] so \
                      zerops.yml survives later deploys.",
        annotations: Annotations::destructive(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "targetService": {
                    "type": "string",
                    "description": "Hostname of the service to deploy code to"
                },
                "workingDir": {
                    "type": "string",
                    "description": "Directory containing the code. SSH mode default: /var/www. Local mode: path on this machine."
                },
                "setup": {
                    "type": "string",
                    "description": "SSH mode only: shell command to run before the push (e.g. npm install)"
                },
                "freshGit": {
                    "type": "boolean",
                    "description": "Remove any existing .git and reinitialize before the push. Avoids ownership and identity errors on first deploys."
                }
            },
            "required": ["targetService"],
            "additionalProperties": false
        }),
        handler: Box::new(|deps, args| {
            run(deps, args).unwrap_or_else(|e| error_result(&e))
        }),
    });
}

fn run(deps: &Deps, args: Value) -> Result<Outcome, ZcpError> {
    run_with(deps, args, PollConfig::default())
}

fn run_with(deps: &Deps, args: Value, poll_cfg: PollConfig) -> Result<Outcome, ZcpError> {
    require_workflow(deps)?;
    let input: DeployInput = parse_input(args)?;
    if input.target_service.is_empty() {
        return Err(PlatformError::new(
            codes::INVALID_PARAMETER,
            "targetService is required",
            "Provide targetService: the hostname of the service to deploy to",
        )
        .into());
    }

    let services = deps.client.list_services(&deps.auth.project_id)?;
    let target = resolve_service(&services, &input.target_service)?;
    let target_id = target.id.clone();

    let mut result = if deps.runtime.in_container {
        deploy_ssh(deps, &input, &target_id)?
    } else {
        deploy_local(deps, &input, &target_id)?
    };

    match poll_build(deps.client.as_ref(), &deps.auth.project_id, &target_id, poll_cfg) {
        Some(ev) if ev.status == STATUS_ACTIVE => {
            result.status = STATUS_DEPLOYED.into();
            result.build_status = ev.status.clone();
            result.build_duration = calc_duration(Some(&ev.created), Some(&ev.last_update));
            result.monitor_hint.clear();
            result.message = format!("Successfully deployed to {}", input.target_service);
            result.next_actions = Some(next_actions::DEPLOY_SUCCESS);
        }
        Some(ev) => {
            result.status = STATUS_BUILD_FAILED.into();
            result.build_status = ev.status.clone();
            result.build_duration = calc_duration(Some(&ev.created), Some(&ev.last_update));
            result.suggestion = "Check build logs with zerops_logs for details".into();
            result.next_actions = Some(next_actions::DEPLOY_BUILD_FAIL);
        }
        None => result.timed_out = true,
    }

    Ok(json_result(&result))
}

fn deploy_ssh(
    deps: &Deps,
    input: &DeployInput,
    target_id: &str,
) -> Result<DeployResult, ZcpError> {
    let Some(ssh) = &deps.ssh_deployer else {
        return Err(PlatformError::new(
            codes::NOT_IMPLEMENTED,
            "SSH deploy is not available (deployer not configured)",
            "SSH deploy requires a running Zerops container with SSH access",
        )
        .into());
    };

    let source = deps.runtime.service_name.as_str();
    let working_dir = if input.working_dir.is_empty() {
        DEFAULT_WORKING_DIR
    } else {
        input.working_dir.as_str()
    };
    let cmd = build_ssh_command(&deps.auth, target_id, &input.setup, working_dir, input.fresh_git);

    match ssh.exec_ssh(source, &cmd) {
        Ok(_) => {}
        // Exit 255 after a successful submit is a dropped SSH connection,
        // not a failed deploy.
        Err(err) if is_ssh_build_triggered(&err.message) => {
            debug!(source, "ssh connection dropped after build submit");
        }
        Err(err) => {
            return Err(classify_ssh_error(&err, source, &input.target_service).into());
        }
    }

    Ok(DeployResult {
        status: STATUS_TRIGGERED.into(),
        mode: "ssh",
        target_service: input.target_service.clone(),
        target_service_id: target_id.to_string(),
        message: format!("Build triggered for {} via SSH from {}", input.target_service, source),
        monitor_hint: "Build runs asynchronously. Poll zerops_events for build/deploy FINISHED status.".into(),
        build_status: String::new(),
        build_duration: None,
        warnings: Vec::new(),
        suggestion: String::new(),
        next_actions: None,
        timed_out: false,
    })
}

fn deploy_local(
    deps: &Deps,
    input: &DeployInput,
    target_id: &str,
) -> Result<DeployResult, ZcpError> {
    let Some(local) = &deps.local_deployer else {
        return Err(PlatformError::new(
            codes::NOT_IMPLEMENTED,
            "Local deploy is not available (deployer not configured)",
            "Local deploy requires zcli to be installed",
        )
        .into());
    };

    let mut warnings = Vec::new();
    if !input.working_dir.is_empty() {
        warnings = validate_zerops_yml(&input.working_dir, &input.target_service);
        // zcli push requires a git repo.
        if Path::new(&input.working_dir).is_dir() {
            prepare_git_repo(&input.working_dir, input.fresh_git)?;
        }
    }

    let mut args = vec!["push", "--serviceId", target_id];
    if !input.working_dir.is_empty() {
        args.push("--workingDir");
        args.push(&input.working_dir);
    }
    local.exec_zcli(&args)?;

    Ok(DeployResult {
        status: STATUS_TRIGGERED.into(),
        mode: "local",
        target_service: input.target_service.clone(),
        target_service_id: target_id.to_string(),
        message: format!("Build triggered for {} via local zcli", input.target_service),
        monitor_hint: "Build runs asynchronously. Poll zerops_events for build/deploy FINISHED status.".into(),
        build_status: String::new(),
        build_duration: None,
        warnings,
        suggestion: String::new(),
        next_actions: None,
        timed_out: false,
    })
}

/// Waits for the newest app version of the target service to reach a
/// terminal pipeline status. `zcli push` returns only after the upload
/// registered a new app version, so the newest event is this deploy's.
fn poll_build(
    client: &dyn Client,
    project_id: &str,
    service_id: &str,
    cfg: PollConfig,
) -> Option<AppVersionEvent> {
    for attempt in 1..=cfg.max_attempts {
        if let Ok(events) = client.search_app_versions(project_id, Some(service_id), 1)
            && let Some(ev) = events.into_iter().next()
            && matches!(ev.status.as_str(), STATUS_ACTIVE | STATUS_BUILD_FAILED)
        {
            return Some(ev);
        }
        debug!(service_id, attempt, "waiting for build pipeline");
        if attempt < cfg.max_attempts {
            thread::sleep(cfg.interval);
        }
    }
    None
}

fn build_ssh_command(
    auth: &AuthInfo,
    target_id: &str,
    setup: &str,
    working_dir: &str,
    fresh_git: bool,
) -> String {
    let mut parts = vec![format!(
        "zcli login {} --zeropsRegion {}",
        auth.token, auth.region
    )];
    if !setup.is_empty() {
        parts.push(setup.to_string());
    }
    let git_guard = if fresh_git {
        "rm -rf .git && git init -q && git add -A && git commit -q -m 'deploy'"
    } else {
        "(test -d .git || (git init -q && git add -A && git commit -q -m 'deploy'))"
    };
    parts.push(format!(
        "cd {} && {} && zcli push --serviceId {}",
        working_dir, git_guard, target_id
    ));
    parts.join(" && ")
}

/// SSH output markers showing the build was submitted before the
/// connection dropped (common exit 255).
fn is_ssh_build_triggered(output: &str) -> bool {
    output.contains("BUILD ARTEFACTS READY TO DEPLOY") || output.contains("Deploying service")
}

fn classify_ssh_error(err: &PlatformError, source: &str, target: &str) -> PlatformError {
    let msg = &err.message;
    if msg.contains("signal: killed") || msg.contains("OOM") || msg.contains("out of memory") {
        return PlatformError::new(
            codes::SSH_DEPLOY_FAILED,
            format!("SSH deploy from {} to {} killed (likely OOM)", source, target),
            format!(
                "Process killed, likely insufficient RAM. Scale up the source service: zerops_scale serviceHostname={} minRam=2",
                source
            ),
        );
    }
    if msg.contains("zerops.yml") || msg.contains("zerops.yaml") {
        return PlatformError::new(
            codes::SSH_DEPLOY_FAILED,
            format!("SSH deploy from {} to {} failed: zerops.yml not found", source, target),
            "zerops.yml must be present in workingDir. After deploy, /var/www only contains deployFiles artifacts — dev services must use deployFiles: [.] so zerops.yml survives for SSH cross-service deploys.",
        );
    }
    if msg.contains("connection refused") || msg.contains("no route to host") {
        return PlatformError::new(
            codes::SSH_DEPLOY_FAILED,
            format!(
                "SSH deploy from {} to {} failed: cannot reach source service",
                source, target
            ),
            format!(
                "Cannot reach source service. Verify it's RUNNING: zerops_discover service={}",
                source
            ),
        );
    }
    if msg.contains("command not found") {
        return PlatformError::new(
            codes::SSH_DEPLOY_FAILED,
            format!("SSH deploy from {} to {} failed: command not found", source, target),
            "zcli not available on source container. Verify the source service type supports zcli.",
        );
    }
    PlatformError::new(
        codes::SSH_DEPLOY_FAILED,
        format!("SSH deploy from {} to {} failed: {}", source, target, msg),
        "Check the full error output above for diagnosis.",
    )
}

fn prepare_git_repo(working_dir: &str, fresh_git: bool) -> Result<(), PlatformError> {
    let git_dir = Path::new(working_dir).join(".git");
    if git_dir.exists() {
        if !fresh_git {
            return Ok(());
        }
        std::fs::remove_dir_all(&git_dir).map_err(|e| {
            PlatformError::new(codes::API_ERROR, format!("remove .git: {}", e), "")
        })?;
    }

    let steps: [&[&str]; 3] = [
        &["init", "-q"],
        &["add", "-A"],
        &["commit", "-q", "-m", "deploy", "--allow-empty"],
    ];
    for args in steps {
        let out = Command::new("git")
            .args(args)
            .current_dir(working_dir)
            .output()
            .map_err(|e| {
                PlatformError::new(
                    codes::API_ERROR,
                    format!("git {}: {}", args.join(" "), e),
                    "",
                )
            })?;
        if !out.status.success() {
            return Err(PlatformError::new(
                codes::API_ERROR,
                format!(
                    "git {} failed: {}",
                    args.join(" "),
                    String::from_utf8_lossy(&out.stderr).trim()
                ),
                "",
            ));
        }
    }
    Ok(())
}

/// Pre-flight checks on zerops.yml before a local deploy. Warnings only;
/// the push proceeds regardless.
fn validate_zerops_yml(working_dir: &str, target_hostname: &str) -> Vec<String> {
    let path = Path::new(working_dir).join("zerops.yml");
    let Ok(data) = std::fs::read_to_string(&path) else {
        return vec![format!("zerops.yml not found at {}", path.display())];
    };

    let doc: ZeropsYmlDoc = match serde_yaml::from_str(&data) {
        Ok(doc) => doc,
        Err(e) => return vec![format!("zerops.yml invalid YAML: {}", e)],
    };
    if doc.zerops.is_empty() {
        return vec!["zerops.yml has no setup entries under 'zerops:' key".to_string()];
    }

    let Some(entry) = doc.zerops.iter().find(|e| e.setup == target_hostname) else {
        return vec![format!(
            "no setup entry for hostname \"{}\" in zerops.yml",
            target_hostname
        )];
    };

    let mut warnings = Vec::new();
    if entry.run.start.is_empty() {
        warnings.push("run.start is empty — app will not start after deploy".to_string());
    }
    if entry.run.ports.is_empty() {
        warnings
            .push("run.ports is empty — no ports exposed, HTTP checks will fail".to_string());
    }
    if entry.build.deploy_files.is_empty() {
        warnings.push(
            "build.deployFiles is empty — nothing will be deployed to run container".to_string(),
        );
    }
    if target_hostname.contains("dev")
        && !entry.build.deploy_files.is_empty()
        && !entry.build.deploy_files.iter().any(|f| f == ".")
    {
        warnings.push(
            "dev service should use deployFiles: [.] — ensures source files persist across deploys for continued iteration"
                .to_string(),
        );
    }
    warnings
}

#[derive(Debug, Default, Deserialize)]
struct ZeropsYmlDoc {
    #[serde(default)]
    zerops: Vec<ZeropsYmlEntry>,
}

#[derive(Debug, Default, Deserialize)]
struct ZeropsYmlEntry {
    #[serde(default)]
    setup: String,
    #[serde(default)]
    build: ZeropsYmlBuild,
    #[serde(default)]
    run: ZeropsYmlRun,
}

#[derive(Debug, Default, Deserialize)]
struct ZeropsYmlBuild {
    #[serde(rename = "deployFiles", default)]
    deploy_files: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ZeropsYmlRun {
    #[serde(default)]
    start: String,
    #[serde(default)]
    ports: Vec<ZeropsYmlPort>,
}

#[derive(Debug, Default, Deserialize)]
struct ZeropsYmlPort {
    #[serde(default)]
    port: u16,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use crate::core::mock::{MockClient, MockLocalDeployer, MockSshDeployer};
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
            created: "2025-06-01T00:00:00Z".into(),
            last_update: String::new(),
        }
    }

    fn app_version(status: &str) -> AppVersionEvent {
        AppVersionEvent {
            id: "av-1".into(),
            project_id: "p1".into(),
            service_stack_id: "s1".into(),
            source: "GIT".into(),
            status: status.into(),
            sequence: 7,
            created: "2025-06-01T10:00:00Z".into(),
            last_update: "2025-06-01T10:01:30Z".into(),
        }
    }

    #[test]
    fn test_local_mode_pushes_via_zcli() {
        let local = Arc::new(MockLocalDeployer::new());
        let mut deps = test_deps(
            MockClient::new()
                .with_services(vec![service("s1", "app")])
                .with_app_version_events(vec![app_version("ACTIVE")]),
        );
        deps.local_deployer = Some(local.clone());

        let out = run(&deps, json!({"targetService": "app"})).expect("deploy");
        let v: Value = serde_json::from_str(&out.text).expect("json");
        assert_eq!(v["status"], "DEPLOYED");
        assert_eq!(v["mode"], "local");
        assert_eq!(v["buildStatus"], "ACTIVE");
        assert_eq!(v["buildDuration"], "1m30s");
        assert_eq!(v["message"], "Successfully deployed to app");
        assert!(v.get("monitorHint").is_none());

        assert_eq!(local.calls(), vec![vec!["push", "--serviceId", "s1"]]);
    }

    #[test]
    fn test_ssh_mode_runs_push_from_own_container() {
        let ssh = Arc::new(MockSshDeployer::new());
        let mut deps = test_deps(
            MockClient::new()
                .with_services(vec![service("s1", "app")])
                .with_app_version_events(vec![app_version("ACTIVE")]),
        );
        deps.runtime.in_container = true;
        deps.runtime.service_name = "appdev".into();
        deps.ssh_deployer = Some(ssh.clone());

        let out = run(&deps, json!({"targetService": "app"})).expect("deploy");
        let v: Value = serde_json::from_str(&out.text).expect("json");
        assert_eq!(v["mode"], "ssh");
        assert_eq!(v["status"], "DEPLOYED");

        let calls = ssh.calls();
        assert_eq!(calls[0].0, "appdev");
        let cmd = &calls[0].1;
        assert!(cmd.starts_with("zcli login t --zeropsRegion prg1"));
        assert!(cmd.contains("cd /var/www"));
        assert!(cmd.contains("test -d .git"));
        assert!(cmd.ends_with("zcli push --serviceId s1"));
    }

    #[test]
    fn test_build_failure_reports_logs_hint() {
        let local = Arc::new(MockLocalDeployer::new());
        let mut deps = test_deps(
            MockClient::new()
                .with_services(vec![service("s1", "app")])
                .with_app_version_events(vec![app_version("BUILD_FAILED")]),
        );
        deps.local_deployer = Some(local);

        let out = run(&deps, json!({"targetService": "app"})).expect("deploy");
        let v: Value = serde_json::from_str(&out.text).expect("json");
        assert_eq!(v["status"], "BUILD_FAILED");
        assert_eq!(v["suggestion"], "Check build logs with zerops_logs for details");
        assert!(
            v["nextActions"]
                .as_str()
                .expect("next")
                .contains("zerops_logs")
        );
    }

    #[test]
    fn test_poll_timeout_keeps_triggered_status() {
        let local = Arc::new(MockLocalDeployer::new());
        let mut deps = test_deps(MockClient::new().with_services(vec![service("s1", "app")]));
        deps.local_deployer = Some(local);

        let cfg = PollConfig {
            interval: Duration::ZERO,
            max_attempts: 2,
        };
        let out = run_with(&deps, json!({"targetService": "app"}), cfg).expect("deploy");
        let v: Value = serde_json::from_str(&out.text).expect("json");
        assert_eq!(v["status"], "BUILD_TRIGGERED");
        assert_eq!(v["timedOut"], true);
        assert!(
            v["monitorHint"]
                .as_str()
                .expect("hint")
                .contains("zerops_events")
        );
    }

    #[test]
    fn test_missing_deployer_and_target() {
        let deps = test_deps(MockClient::new().with_services(vec![service("s1", "app")]));
        let err = run(&deps, json!({"targetService": "app"})).expect_err("no deployer");
        assert!(err.to_string().contains("Local deploy is not available"));

        let err = run(&deps, json!({})).expect_err("no target");
        assert!(err.to_string().contains("targetService is required"));
    }

    #[test]
    fn test_dropped_ssh_connection_after_submit_is_not_an_error() {
        let ssh = Arc::new(MockSshDeployer::new().with_error(PlatformError::new(
            codes::API_ERROR,
            "ssh exited 255\nDeploying service\nconnection closed",
            "",
        )));
        let mut deps = test_deps(
            MockClient::new()
                .with_services(vec![service("s1", "app")])
                .with_app_version_events(vec![app_version("ACTIVE")]),
        );
        deps.runtime.in_container = true;
        deps.runtime.service_name = "appdev".into();
        deps.ssh_deployer = Some(ssh);

        let out = run(&deps, json!({"targetService": "app"})).expect("deploy");
        let v: Value = serde_json::from_str(&out.text).expect("json");
        assert_eq!(v["status"], "DEPLOYED");
    }

    #[test]
    fn test_classify_ssh_errors() {
        let oom = classify_ssh_error(
            &PlatformError::new(codes::API_ERROR, "process wait: signal: killed", ""),
            "appdev",
            "app",
        );
        assert_eq!(oom.code, codes::SSH_DEPLOY_FAILED);
        assert!(oom.message.contains("killed (likely OOM)"));
        assert!(oom.suggestion.contains("zerops_scale serviceHostname=appdev minRam=2"));

        let yml = classify_ssh_error(
            &PlatformError::new(codes::API_ERROR, "zerops.yml not found in /var/www", ""),
            "appdev",
            "app",
        );
        assert!(yml.message.contains("zerops.yml not found"));
        assert!(yml.suggestion.contains("deployFiles: [.]"));

        let refused = classify_ssh_error(
            &PlatformError::new(codes::API_ERROR, "dial: connection refused", ""),
            "appdev",
            "app",
        );
        assert!(refused.suggestion.contains("zerops_discover service=appdev"));

        let nocli = classify_ssh_error(
            &PlatformError::new(codes::API_ERROR, "bash: zcli: command not found", ""),
            "appdev",
            "app",
        );
        assert!(nocli.suggestion.contains("zcli not available"));

        let other = classify_ssh_error(
            &PlatformError::new(codes::API_ERROR, "mystery failure", ""),
            "appdev",
            "app",
        );
        assert!(other.message.contains("mystery failure"));
    }

    #[test]
    fn test_fresh_git_replaces_repo_guard() {
        let auth = AuthInfo {
            token: "tok".into(),
            api_host: "h".into(),
            region: "prg1".into(),
            client_id: "c".into(),
            project_id: "p1".into(),
            project_name: "demo".into(),
        };
        let keep = build_ssh_command(&auth, "s1", "", "/var/www", false);
        assert!(keep.contains("test -d .git"));
        assert!(!keep.contains("rm -rf .git"));

        let fresh = build_ssh_command(&auth, "s1", "npm install", "/var/www", true);
        assert!(fresh.contains("rm -rf .git && git init -q"));
        assert!(fresh.contains("npm install && cd /var/www"));
    }

    #[test]
    fn test_validate_zerops_yml_warnings() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = validate_zerops_yml(&dir.path().to_string_lossy(), "app");
        assert!(missing[0].starts_with("zerops.yml not found at"));

        std::fs::write(
            dir.path().join("zerops.yml"),
            "zerops:\n  - setup: app\n    build:\n      deployFiles: [dist]\n    run:\n      ports:\n        - port: 3000\n",
        )
        .expect("write");
        let warnings = validate_zerops_yml(&dir.path().to_string_lossy(), "app");
        assert_eq!(warnings, vec!["run.start is empty — app will not start after deploy"]);

        let warnings = validate_zerops_yml(&dir.path().to_string_lossy(), "api");
        assert_eq!(warnings, vec!["no setup entry for hostname \"api\" in zerops.yml"]);

        std::fs::write(
            dir.path().join("zerops.yml"),
            "zerops:\n  - setup: appdev\n    build:\n      deployFiles: [dist]\n    run:\n      start: npm start\n      ports:\n        - port: 3000\n",
        )
        .expect("write");
        let warnings = validate_zerops_yml(&dir.path().to_string_lossy(), "appdev");
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("deployFiles: [.]"));
    }
}
