//! `zerops_context` - compact system briefing.

use serde_json::{Value, json};

use crate::core::plan::detect_project_state;
use crate::knowledge::versions::format_stack_list;

use super::{Annotations, Deps, Outcome, Registry, Tool, text_result};

pub fn register(reg: &mut Registry) {
    reg.add(Tool {
        name: "zerops_context",
        title: "Platform context",
        description: "Get the current Zerops context: project, region, workflow session and \
                      available service types. Call this first to orient yourself.",
        annotations: Annotations::read_only(),
        input_schema: json!({
            "type": "object",
            "properties": {},
            "additionalProperties": false
        }),
        handler: Box::new(|deps, _args: Value| run(deps)),
    });
}

fn run(deps: &Deps) -> Outcome {
    let mut out = String::from("# Zerops Context\n\n");
    out.push_str(&format!(
        "Project: {} ({})\n",
        deps.auth.project_name, deps.auth.project_id
    ));
    out.push_str(&format!("Region: {}\n", deps.auth.region));

    if deps.runtime.in_container {
        out.push_str(&format!(
            "Running inside a Zerops container as service '{}'\n",
            deps.runtime.service_name
        ));
    }

    match deps.engine.as_ref().and_then(|e| e.state().ok()) {
        Some(state) => out.push_str(&format!(
            "Workflow session: {} (phase {}, iteration {})\n",
            state.session_id, state.phase, state.iteration
        )),
        None => out.push_str(
            "Workflow session: none. Start one with zerops_workflow action=\"start\" workflow=\"bootstrap\"\n",
        ),
    }

    if let Ok(services) = deps.client.list_services(&deps.auth.project_id) {
        out.push_str(&format!(
            "Project state: {}\n",
            detect_project_state(&services).as_str()
        ));
    }

    let types = deps.cache.get(deps.client.as_ref());
    if types.is_empty() {
        out.push_str("\nLive service catalog unavailable right now.\n");
    } else {
        out.push_str("\n## Available Service Types\n\n");
        out.push_str(&format_stack_list(&types));
    }

    out.push_str("\nConsult zerops_knowledge before generating any YAML.");
    text_result(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::mock::MockClient;
    use crate::core::types::{ServiceStack, ServiceTypeInfo};
    use crate::tools::tests::test_deps;

    fn service(name: &str, type_version: &str) -> ServiceStack {
        ServiceStack {
            id: format!("id-{name}"),
            name: name.into(),
            project_id: "p1".into(),
            type_info: ServiceTypeInfo {
                version_name: type_version.into(),
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

    #[test]
    fn test_context_names_project_and_region() {
        let deps = test_deps(MockClient::new());
        let out = run(&deps);
        assert!(!out.is_error);
        assert!(out.text.contains("demo (p1)"));
        assert!(out.text.contains("Region: prg1"));
        assert!(out.text.contains("Workflow session: none"));
        assert!(out.text.contains("Project state: FRESH"));
    }

    #[test]
    fn test_context_classifies_dev_stage_projects() {
        let deps = test_deps(MockClient::new().with_services(vec![
            service("appdev", "bun@1.2"),
            service("appstage", "bun@1.2"),
        ]));
        let out = run(&deps);
        assert!(out.text.contains("Project state: CONFORMANT"));
    }
}
