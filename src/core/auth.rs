//! Credential resolution: `ZCP_API_KEY` env var first, then the
//! `cli.data` file maintained by zcli in the OS config directory.

use std::env;
use std::fs;
use std::path::PathBuf;

use serde::Deserialize;

use crate::core::client::{Client, PlatformResult};
use crate::core::error::{PlatformError, codes};

const DEFAULT_API_HOST: &str = "api.app-prg1.zerops.io";
const DEFAULT_REGION: &str = "prg1";
const CLI_DATA_FILE: &str = "cli.data";

/// Raw connection info needed to construct a platform client.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub token: String,
    pub api_host: String,
    pub region: String,
    pub scope_project_id: Option<String>,
}

/// Resolved authentication and project context.
#[derive(Debug, Clone)]
pub struct AuthInfo {
    pub token: String,
    pub api_host: String,
    pub region: String,
    pub client_id: String,
    pub project_id: String,
    pub project_name: String,
}

#[derive(Deserialize)]
struct CliData {
    #[serde(rename = "Token", default)]
    token: String,
    #[serde(rename = "RegionData", default)]
    region_data: CliRegion,
    #[serde(rename = "ScopeProjectId", default)]
    scope_project_id: Option<String>,
}

#[derive(Deserialize, Default)]
struct CliRegion {
    #[serde(default)]
    name: String,
    #[serde(default)]
    address: String,
}

/// Reads token and connection info from env vars or cli.data without
/// contacting the API.
pub fn resolve_credentials() -> PlatformResult<Credentials> {
    if let Ok(token) = env::var("ZCP_API_KEY")
        && !token.is_empty()
    {
        return Ok(Credentials {
            token,
            api_host: env_or_default("ZCP_API_HOST", DEFAULT_API_HOST),
            region: env_or_default("ZCP_REGION", DEFAULT_REGION),
            scope_project_id: None,
        });
    }

    let data = read_cli_data().map_err(|_| {
        PlatformError::new(
            codes::AUTH_REQUIRED,
            "No authentication found: set ZCP_API_KEY or log in with zcli",
            "Export ZCP_API_KEY=<your-token> or run: zcli login <token>",
        )
    })?;

    if data.token.is_empty() {
        return Err(PlatformError::new(
            codes::AUTH_REQUIRED,
            "cli.data found but token is empty",
            "Run: zcli login <token>",
        ));
    }

    let mut api_host = env_or_default("ZCP_API_HOST", &data.region_data.address);
    if api_host.is_empty() {
        api_host = DEFAULT_API_HOST.to_string();
    }
    let mut region = env_or_default("ZCP_REGION", &data.region_data.name);
    if region.is_empty() {
        region = DEFAULT_REGION.to_string();
    }

    Ok(Credentials {
        token: data.token,
        api_host,
        region,
        scope_project_id: data.scope_project_id.filter(|id| !id.is_empty()),
    })
}

/// Validates the token via GetUserInfo and discovers the active project.
pub fn resolve(client: &dyn Client, creds: &Credentials) -> PlatformResult<AuthInfo> {
    let user = client.get_user_info()?;
    let (project_id, project_name) =
        discover_project(client, &user.id, creds.scope_project_id.as_deref())?;
    Ok(AuthInfo {
        token: creds.token.clone(),
        api_host: creds.api_host.clone(),
        region: creds.region.clone(),
        client_id: user.id,
        project_id,
        project_name,
    })
}

/// Finds the active project. A zcli-scoped project wins; otherwise the
/// token must see exactly one project.
fn discover_project(
    client: &dyn Client,
    client_id: &str,
    scope_project_id: Option<&str>,
) -> PlatformResult<(String, String)> {
    if let Some(id) = scope_project_id {
        let proj = client.get_project(id)?;
        return Ok((proj.id, proj.name));
    }

    let projects = client.list_projects(client_id)?;
    match projects.len() {
        0 => Err(PlatformError::new(
            codes::TOKEN_NO_PROJECT,
            "Token has no project access",
            "Use a project-scoped token or grant project access",
        )),
        1 => Ok((projects[0].id.clone(), projects[0].name.clone())),
        n => Err(PlatformError::new(
            codes::TOKEN_MULTI_PROJECT,
            format!("Token accesses {} projects; use project-scoped token", n),
            "Create a project-scoped token in Zerops GUI or set project via zcli scope",
        )),
    }
}

fn read_cli_data() -> PlatformResult<CliData> {
    let path = cli_data_path()?;
    let raw = fs::read_to_string(&path).map_err(|e| {
        PlatformError::new(
            codes::AUTH_REQUIRED,
            format!("read {}: {}", path.display(), e),
            "",
        )
    })?;
    serde_json::from_str(&raw).map_err(|e| {
        PlatformError::new(codes::AUTH_REQUIRED, format!("parse cli.data: {}", e), "")
    })
}

/// OS-specific path to zcli's cli.data. `ZCP_ZCLI_DATA_DIR` overrides
/// for tests.
fn cli_data_path() -> PlatformResult<PathBuf> {
    if let Ok(dir) = env::var("ZCP_ZCLI_DATA_DIR")
        && !dir.is_empty()
    {
        return Ok(PathBuf::from(dir).join("zerops").join(CLI_DATA_FILE));
    }

    if cfg!(target_os = "macos") {
        return Ok(home_dir()?
            .join("Library")
            .join("Application Support")
            .join("zerops")
            .join(CLI_DATA_FILE));
    }

    let config_dir = match env::var("XDG_CONFIG_HOME") {
        Ok(v) if !v.is_empty() => PathBuf::from(v),
        _ => home_dir()?.join(".config"),
    };
    Ok(config_dir.join("zerops").join(CLI_DATA_FILE))
}

fn home_dir() -> PlatformResult<PathBuf> {
    env::var_os("HOME").map(PathBuf::from).ok_or_else(|| {
        PlatformError::new(
            codes::AUTH_REQUIRED,
            "cannot resolve home directory",
            "Set HOME or use ZCP_API_KEY",
        )
    })
}

fn env_or_default(key: &str, fallback: &str) -> String {
    match env::var(key) {
        Ok(v) if !v.is_empty() => v,
        _ => fallback.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::mock::MockClient;
    use crate::core::types::{Project, UserInfo};

    fn creds(scope: Option<&str>) -> Credentials {
        Credentials {
            token: "t".into(),
            api_host: DEFAULT_API_HOST.into(),
            region: DEFAULT_REGION.into(),
            scope_project_id: scope.map(String::from),
        }
    }

    fn project(id: &str, name: &str) -> Project {
        Project {
            id: id.into(),
            name: name.into(),
            status: "ACTIVE".into(),
            subdomain_host: String::new(),
        }
    }

    #[test]
    fn test_single_project_discovered() {
        let mock = MockClient::new()
            .with_user_info(UserInfo {
                id: "u1".into(),
                email: "a@b.c".into(),
                full_name: String::new(),
            })
            .with_projects(vec![project("p1", "myapp")]);
        let info = resolve(&mock, &creds(None)).expect("resolve");
        assert_eq!(info.project_id, "p1");
        assert_eq!(info.project_name, "myapp");
        assert_eq!(info.client_id, "u1");
    }

    #[test]
    fn test_multi_project_rejected() {
        let mock = MockClient::new()
            .with_user_info(UserInfo {
                id: "u1".into(),
                email: String::new(),
                full_name: String::new(),
            })
            .with_projects(vec![project("p1", "a"), project("p2", "b")]);
        let err = resolve(&mock, &creds(None)).expect_err("should fail");
        assert_eq!(err.code, codes::TOKEN_MULTI_PROJECT);
    }

    #[test]
    fn test_no_project_rejected() {
        let mock = MockClient::new().with_user_info(UserInfo {
            id: "u1".into(),
            email: String::new(),
            full_name: String::new(),
        });
        let err = resolve(&mock, &creds(None)).expect_err("should fail");
        assert_eq!(err.code, codes::TOKEN_NO_PROJECT);
    }

    #[test]
    fn test_scoped_project_wins() {
        let mock = MockClient::new()
            .with_user_info(UserInfo {
                id: "u1".into(),
                email: String::new(),
                full_name: String::new(),
            })
            .with_project(project("p9", "scoped"))
            .with_projects(vec![project("p1", "a"), project("p2", "b")]);
        let info = resolve(&mock, &creds(Some("p9"))).expect("resolve");
        assert_eq!(info.project_id, "p9");
    }
}
