//! `zerops_subdomain` - public `*.zerops.app` routing toggle.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::core::error::{PlatformError, ZcpError, codes};
use crate::core::helpers::resolve_service;
use crate::core::types::Process;

use super::{
    Annotations, Deps, Outcome, Registry, Tool, error_result, json_result, next_actions,
    parse_input,
};

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct SubdomainInput {
    service_hostname: String,
    action: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SubdomainResult {
    service_hostname: String,
    service_id: String,
    action: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    status: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    subdomain_urls: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    process: Option<Process>,
    #[serde(skip_serializing_if = "String::is_empty")]
    next_actions: String,
}

pub fn register(reg: &mut Registry) {
    reg.add(Tool {
        name: "zerops_subdomain",
        title: "Enable or disable subdomain",
        description: "Enable or disable zerops.app subdomain for a service. Returns \
                      subdomainUrls in the response - this is the ONLY source for subdomain URLs \
                      (zerops_discover does not include them). Idempotent - safe to call even if \
                      already enabled (returns already_enabled). NOTE: If you set \
                      enableSubdomainAccess=true in import YAML, the subdomain URL is \
                      pre-configured but routing is NOT active. You MUST call this tool with \
                      action=\"enable\" after the first successful deploy to activate L7 balancer \
                      routing. Without this call, the subdomain returns 502 even if the app is \
                      running internally.",
        annotations: Annotations::idempotent(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "serviceHostname": {
                    "type": "string",
                    "description": "Hostname of the service to enable/disable subdomain for"
                },
                "action": {
                    "type": "string",
                    "enum": ["enable", "disable"],
                    "description": "Must call enable after first deploy to activate routing"
                }
            },
            "required": ["serviceHostname", "action"],
            "additionalProperties": false
        }),
        handler: Box::new(|deps, args| {
            run(deps, args).unwrap_or_else(|e| error_result(&e))
        }),
    });
}

fn run(deps: &Deps, args: Value) -> Result<Outcome, ZcpError> {
    let input: SubdomainInput = parse_input(args)?;
    if input.action != "enable" && input.action != "disable" {
        return Err(PlatformError::new(
            codes::INVALID_PARAMETER,
            "action must be 'enable' or 'disable'",
            "Use action='enable' or action='disable'",
        )
        .into());
    }

    let services = deps.client.list_services(&deps.auth.project_id)?;
    let svc = resolve_service(&services, &input.service_hostname)?;

    let mut result = SubdomainResult {
        service_hostname: input.service_hostname.clone(),
        service_id: svc.id.clone(),
        action: input.action.clone(),
        status: String::new(),
        subdomain_urls: Vec::new(),
        process: None,
        next_actions: String::new(),
    };

    if input.action == "enable" {
        match deps.client.enable_subdomain(&svc.id) {
            Ok(proc) => result.process = Some(proc),
            Err(e) if e.code == codes::SUBDOMAIN_ALREADY_ENABLED => {
                result.status = "already_enabled".into();
            }
            Err(e) => return Err(e.into()),
        }
        result.subdomain_urls = collect_subdomain_urls(deps, &svc.id, &input.service_hostname);
        result.next_actions = next_actions::SUBDOMAIN_ENABLE.into();
    } else {
        match deps.client.disable_subdomain(&svc.id) {
            Ok(proc) => result.process = Some(proc),
            Err(e) if e.code == codes::SUBDOMAIN_ALREADY_DISABLED => {
                result.status = "already_disabled".into();
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(json_result(&result))
}

/// Computes the expected URLs from project slug and service ports.
/// Best effort: lookup failures just leave the list empty, the routing
/// change itself has already been applied.
fn collect_subdomain_urls(deps: &Deps, service_id: &str, hostname: &str) -> Vec<String> {
    let Ok(project) = deps.client.get_project(&deps.auth.project_id) else {
        return Vec::new();
    };
    if project.subdomain_host.is_empty() {
        return Vec::new();
    }
    let Ok(detail) = deps.client.get_service(service_id) else {
        return Vec::new();
    };
    detail
        .ports
        .iter()
        .filter_map(|p| build_subdomain_url(hostname, &project.subdomain_host, p.port))
        .collect()
}

/// `https://{hostname}-{port}-{slug}.zerops.app`, port 80 omitted.
/// The slug is the project prefix of `subdomainHost`.
pub(crate) fn build_subdomain_url(
    hostname: &str,
    subdomain_host: &str,
    port: u16,
) -> Option<String> {
    let slug = subdomain_host.split('.').next().unwrap_or_default();
    if slug.is_empty() {
        return None;
    }
    if port == 80 {
        return Some(format!("https://{}-{}.zerops.app", hostname, slug));
    }
    Some(format!("https://{}-{}-{}.zerops.app", hostname, port, slug))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::mock::MockClient;
    use crate::core::types::{Port, Project, ServiceStack, ServiceTypeInfo};
    use crate::tools::tests::test_deps;

    fn project() -> Project {
        Project {
            id: "p1".into(),
            name: "demo".into(),
            status: "ACTIVE".into(),
            subdomain_host: "1df2.prg1.zerops.app".into(),
        }
    }

    fn service(ports: Vec<u16>) -> ServiceStack {
        ServiceStack {
            id: "s1".into(),
            name: "app".into(),
            project_id: "p1".into(),
            type_info: ServiceTypeInfo {
                version_name: "nodejs@22".into(),
                category_name: "USER".into(),
            },
            status: "RUNNING".into(),
            mode: "NON_HA".into(),
            ports: ports
                .into_iter()
                .map(|port| Port {
                    port,
                    protocol: "tcp".into(),
                    public: false,
                })
                .collect(),
            subdomain_access: false,
            custom_autoscaling: None,
            current_autoscaling: None,
            created: "2025-06-01T00:00:00Z".into(),
            last_update: String::new(),
        }
    }

    #[test]
    fn test_url_shape() {
        assert_eq!(
            build_subdomain_url("app", "1df2.prg1.zerops.app", 3000).as_deref(),
            Some("https://app-3000-1df2.zerops.app")
        );
        assert_eq!(
            build_subdomain_url("web", "1df2", 80).as_deref(),
            Some("https://web-1df2.zerops.app")
        );
        assert_eq!(build_subdomain_url("app", "", 3000), None);
    }

    #[test]
    fn test_enable_returns_urls_and_process() {
        let deps = test_deps(
            MockClient::new()
                .with_project(project())
                .with_services(vec![service(vec![3000, 80])]),
        );
        let out = run(&deps, json!({"serviceHostname": "app", "action": "enable"}))
            .expect("subdomain");
        let v: Value = serde_json::from_str(&out.text).expect("json");
        assert_eq!(v["action"], "enable");
        assert!(v["process"]["id"].as_str().expect("process id").starts_with("proc-"));
        let urls = v["subdomainUrls"].as_array().expect("urls");
        assert_eq!(urls.len(), 2);
        assert_eq!(urls[0], "https://app-3000-1df2.zerops.app");
        assert_eq!(urls[1], "https://app-1df2.zerops.app");
        assert_eq!(
            v["nextActions"],
            "Test subdomain URL. If 502: zerops_logs severity=ERROR."
        );
        assert!(v.get("status").is_none());
    }

    #[test]
    fn test_already_enabled_is_not_an_error() {
        let deps = test_deps(
            MockClient::new()
                .with_project(project())
                .with_services(vec![service(vec![3000])])
                .with_error(
                    "enable_subdomain",
                    PlatformError::new(
                        codes::SUBDOMAIN_ALREADY_ENABLED,
                        "subdomain access is already enabled",
                        "",
                    ),
                ),
        );
        let out = run(&deps, json!({"serviceHostname": "app", "action": "enable"}))
            .expect("subdomain");
        assert!(!out.is_error);
        let v: Value = serde_json::from_str(&out.text).expect("json");
        assert_eq!(v["status"], "already_enabled");
        assert_eq!(
            v["subdomainUrls"][0],
            "https://app-3000-1df2.zerops.app"
        );
        assert!(v.get("process").is_none());
    }

    #[test]
    fn test_disable_skips_url_lookup() {
        let deps = test_deps(
            MockClient::new()
                .with_project(project())
                .with_services(vec![service(vec![3000])]),
        );
        let out = run(&deps, json!({"serviceHostname": "app", "action": "disable"}))
            .expect("subdomain");
        let v: Value = serde_json::from_str(&out.text).expect("json");
        assert!(v.get("subdomainUrls").is_none());
        assert!(v.get("nextActions").is_none());
        assert!(v["process"]["id"].as_str().expect("process id").contains("disable"));
    }

    #[test]
    fn test_rejects_unknown_action() {
        let deps = test_deps(MockClient::new().with_services(vec![service(vec![3000])]));
        let err = run(&deps, json!({"serviceHostname": "app", "action": "toggle"}))
            .expect_err("must reject");
        let msg = err.to_string();
        assert!(msg.contains("action must be 'enable' or 'disable'"));
    }
}
