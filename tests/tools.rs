use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};
use tempfile::tempdir;
use zcp::core::auth::AuthInfo;
use zcp::core::cache::StackTypeCache;
use zcp::core::engine::Engine;
use zcp::core::mock::{MockClient, MockLocalDeployer, MockLogFetcher, MockMounter};
use zcp::core::runtime::RuntimeInfo;
use zcp::core::state::WorkflowMode;
use zcp::core::types::{Process, Project, ServiceStack, ServiceTypeInfo};
use zcp::tools::knowledge::KnowledgeTracker;
use zcp::tools::{Deps, Registry, register_all};

fn deps(client: MockClient) -> Deps {
    Deps {
        client: Arc::new(client),
        log_fetcher: Arc::new(MockLogFetcher::new()),
        auth: AuthInfo {
            token: "t".into(),
            api_host: "api.app-prg1.zerops.io".into(),
            region: "prg1".into(),
            client_id: "c1".into(),
            project_id: "p1".into(),
            project_name: "demo".into(),
        },
        runtime: RuntimeInfo::default(),
        cache: StackTypeCache::new(Duration::from_secs(600)),
        engine: None,
        tracker: KnowledgeTracker::new(),
        local_deployer: None,
        ssh_deployer: None,
        mounter: None,
    }
}

fn registry(deps: &Deps) -> Registry {
    let mut reg = Registry::new();
    register_all(&mut reg, deps);
    reg
}

fn project() -> Project {
    Project {
        id: "p1".into(),
        name: "demo".into(),
        status: "ACTIVE".into(),
        subdomain_host: "demo-abc".into(),
    }
}

fn service(id: &str, name: &str, category: &str) -> ServiceStack {
    ServiceStack {
        id: id.into(),
        name: name.into(),
        project_id: "p1".into(),
        type_info: ServiceTypeInfo {
            version_name: "nodejs@22".into(),
            category_name: category.into(),
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

fn finished(id: &str, action: &str) -> Process {
    Process {
        id: id.into(),
        action_name: action.into(),
        status: "FINISHED".into(),
        service_stacks: vec![],
        created: String::new(),
        started: None,
        finished: None,
        fail_reason: None,
    }
}

fn body(text: &str) -> Value {
    serde_json::from_str(text).expect("tool output is json")
}

#[test]
fn discover_then_scale_round_trip() {
    let deps = deps(
        MockClient::new()
            .with_project(project())
            .with_services(vec![
                service("s1", "app", "USER"),
                service("s2", "db", "STANDARD"),
            ])
            .with_autoscaling_process(finished("proc-as", "autoscaling"))
            .with_process(finished("proc-as", "autoscaling")),
    );
    let reg = registry(&deps);

    let out = reg.call(&deps, "zerops_discover", Value::Null);
    assert!(!out.is_error, "{}", out.text);
    let v = body(&out.text);
    let services = v["services"].as_array().expect("services");
    assert_eq!(services.len(), 2);
    let hostnames: Vec<&str> = services
        .iter()
        .map(|s| s["hostname"].as_str().expect("hostname"))
        .collect();
    assert!(hostnames.contains(&"app"));
    assert!(hostnames.contains(&"db"));

    let out = reg.call(
        &deps,
        "zerops_scale",
        json!({"serviceHostname": "app", "minContainers": 1, "maxContainers": 3}),
    );
    assert!(!out.is_error, "{}", out.text);
    let v = body(&out.text);
    assert_eq!(v["serviceHostname"], "app");
    assert_eq!(v["serviceId"], "s1");
    assert_eq!(v["process"]["status"], "FINISHED");
}

#[test]
fn delete_needs_explicit_confirmation() {
    let deps = deps(
        MockClient::new()
            .with_services(vec![service("s1", "app", "USER")])
            .with_process(finished("proc-delete-s1", "delete")),
    );
    let reg = registry(&deps);

    let out = reg.call(
        &deps,
        "zerops_delete",
        json!({"serviceHostname": "app", "confirm": false}),
    );
    assert!(out.is_error);
    let v = body(&out.text);
    assert_eq!(v["code"], "CONFIRM_REQUIRED");
    assert!(
        v["suggestion"]
            .as_str()
            .expect("suggestion")
            .contains("confirm=true")
    );

    let out = reg.call(
        &deps,
        "zerops_delete",
        json!({"serviceHostname": "app", "confirm": true}),
    );
    assert!(!out.is_error, "{}", out.text);
    let v = body(&out.text);
    assert_eq!(v["process"]["actionName"], "delete");
    assert_eq!(v["serviceId"], "s1");
}

#[test]
fn hostname_validation_runs_before_any_api_call() {
    // No services configured: a request that reached the client would
    // come back empty-handed, not with INVALID_HOSTNAME.
    let deps = deps(MockClient::new());
    let reg = registry(&deps);

    for bad in ["My-App", "3app", "app_x", "abcdefghijklmnopqrstuvwxyz"] {
        let out = reg.call(&deps, "zerops_scale", json!({"serviceHostname": bad, "minCpu": 1}));
        assert!(out.is_error, "hostname {bad} accepted");
        let v = body(&out.text);
        assert_eq!(v["code"], "INVALID_HOSTNAME", "hostname {bad}");
    }

    let out = reg.call(&deps, "zerops_scale", json!({"minCpu": 1}));
    let v = body(&out.text);
    assert_eq!(v["code"], "SERVICE_REQUIRED");
}

#[test]
fn error_envelope_carries_code_message_and_suggestion() {
    let deps = deps(MockClient::new().with_services(vec![service("s1", "app", "USER")]));
    let reg = registry(&deps);

    let out = reg.call(
        &deps,
        "zerops_scale",
        json!({"serviceHostname": "ghost", "minCpu": 1}),
    );
    assert!(out.is_error);
    let v = body(&out.text);
    assert_eq!(v["code"], "SERVICE_NOT_FOUND");
    assert!(v["error"].as_str().expect("error").contains("ghost"));
    assert!(v["suggestion"].is_string());
    let keys: Vec<&String> = v.as_object().expect("object").keys().collect();
    assert_eq!(keys.len(), 3, "envelope stays minimal: {keys:?}");
}

#[test]
fn unknown_tool_is_reported_in_the_same_envelope() {
    let deps = deps(MockClient::new());
    let reg = registry(&deps);
    let out = reg.call(&deps, "zerops_teleport", Value::Null);
    assert!(out.is_error);
    let v = body(&out.text);
    assert_eq!(v["code"], "INVALID_PARAMETER");
    assert!(v["error"].as_str().expect("error").contains("zerops_teleport"));
}

#[test]
fn mutating_tools_wait_for_a_workflow_session() {
    let tmp = tempdir().expect("tempdir");
    let mut deps = deps(MockClient::new().with_services(vec![service("s1", "app", "USER")]));
    deps.engine = Some(Engine::new(tmp.path()));
    let reg = registry(&deps);

    let out = reg.call(&deps, "zerops_import", json!({"content": "services: []"}));
    assert!(out.is_error);
    let v = body(&out.text);
    assert_eq!(v["code"], "WORKFLOW_REQUIRED");
    assert!(
        v["suggestion"]
            .as_str()
            .expect("suggestion")
            .contains("zerops_workflow")
    );

    // Read-only tools stay usable without a session.
    let out = reg.call(&deps, "zerops_discover", Value::Null);
    assert!(!out.is_error, "{}", out.text);

    deps.engine
        .as_ref()
        .expect("engine")
        .start("p1", "deploy", WorkflowMode::Quick, "test run")
        .expect("start");
    let out = reg.call(&deps, "zerops_import", json!({"content": "services: []"}));
    let v = body(&out.text);
    assert_ne!(v["code"], "WORKFLOW_REQUIRED", "{}", out.text);
}

#[test]
fn capability_gating_controls_which_tools_exist() {
    let plain = deps(MockClient::new());
    let reg = registry(&plain);
    let names: Vec<&str> = reg.iter().map(|t| t.name).collect();
    assert!(names.contains(&"zerops_discover"));
    assert!(names.contains(&"zerops_delete"));
    assert!(
        !names.contains(&"zerops_deploy"),
        "no deployer wired, no deploy tool"
    );
    assert!(!names.contains(&"zerops_mount"), "no mounter, no mount tool");

    let mut capable = deps(MockClient::new());
    capable.local_deployer = Some(Arc::new(MockLocalDeployer::new()));
    capable.mounter = Some(Arc::new(MockMounter::new()));
    let reg = registry(&capable);
    let names: Vec<&str> = reg.iter().map(|t| t.name).collect();
    assert!(names.contains(&"zerops_deploy"));
    assert!(names.contains(&"zerops_mount"));
}

#[test]
fn tool_listing_is_stable_and_well_formed() {
    let deps = deps(MockClient::new());
    let reg = registry(&deps);

    let names: Vec<&str> = reg.iter().map(|t| t.name).collect();
    assert_eq!(names[0], "zerops_context", "orientation tool comes first");
    for tool in reg.iter() {
        assert!(tool.name.starts_with("zerops_"), "{}", tool.name);
        assert!(!tool.description.is_empty(), "{}", tool.name);
        assert_eq!(tool.input_schema["type"], "object", "{}", tool.name);
    }

    let destructive: Vec<&str> = reg
        .iter()
        .filter(|t| t.annotations.destructive_hint)
        .map(|t| t.name)
        .collect();
    assert!(destructive.contains(&"zerops_delete"));
}
