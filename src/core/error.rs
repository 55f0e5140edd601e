use std::io;
use thiserror::Error;

/// Error codes surfaced to agents in tool error bodies.
pub mod codes {
    pub const AUTH_REQUIRED: &str = "AUTH_REQUIRED";
    pub const AUTH_INVALID_TOKEN: &str = "AUTH_INVALID_TOKEN";
    pub const AUTH_TOKEN_EXPIRED: &str = "AUTH_TOKEN_EXPIRED";
    pub const AUTH_API_ERROR: &str = "AUTH_API_ERROR";
    pub const TOKEN_NO_PROJECT: &str = "TOKEN_NO_PROJECT";
    pub const TOKEN_MULTI_PROJECT: &str = "TOKEN_MULTI_PROJECT";
    pub const SERVICE_NOT_FOUND: &str = "SERVICE_NOT_FOUND";
    pub const SERVICE_REQUIRED: &str = "SERVICE_REQUIRED";
    pub const CONFIRM_REQUIRED: &str = "CONFIRM_REQUIRED";
    pub const FILE_NOT_FOUND: &str = "FILE_NOT_FOUND";
    pub const INVALID_IMPORT_YML: &str = "INVALID_IMPORT_YML";
    pub const IMPORT_HAS_PROJECT: &str = "IMPORT_HAS_PROJECT";
    pub const INVALID_SCALING: &str = "INVALID_SCALING";
    pub const INVALID_PARAMETER: &str = "INVALID_PARAMETER";
    pub const INVALID_ENV_FORMAT: &str = "INVALID_ENV_FORMAT";
    pub const INVALID_HOSTNAME: &str = "INVALID_HOSTNAME";
    pub const UNKNOWN_TYPE: &str = "UNKNOWN_TYPE";
    pub const PROCESS_NOT_FOUND: &str = "PROCESS_NOT_FOUND";
    pub const PERMISSION_DENIED: &str = "PERMISSION_DENIED";
    pub const API_ERROR: &str = "API_ERROR";
    pub const API_TIMEOUT: &str = "API_TIMEOUT";
    pub const API_RATE_LIMITED: &str = "API_RATE_LIMITED";
    pub const NETWORK_ERROR: &str = "NETWORK_ERROR";
    pub const INVALID_USAGE: &str = "INVALID_USAGE";
    pub const MOUNT_FAILED: &str = "MOUNT_FAILED";
    pub const UNMOUNT_FAILED: &str = "UNMOUNT_FAILED";
    pub const SSH_DEPLOY_FAILED: &str = "SSH_DEPLOY_FAILED";
    pub const NOT_IMPLEMENTED: &str = "NOT_IMPLEMENTED";
    pub const SUBDOMAIN_ALREADY_ENABLED: &str = "SUBDOMAIN_ALREADY_ENABLED";
    pub const SUBDOMAIN_ALREADY_DISABLED: &str = "SUBDOMAIN_ALREADY_DISABLED";
    pub const WORKFLOW_ERROR: &str = "WORKFLOW_ERROR";
    pub const WORKFLOW_REQUIRED: &str = "WORKFLOW_REQUIRED";
}

/// Platform-facing error: a stable code, a human message, and a recovery
/// suggestion. Tools serialize this as `{code, error, suggestion}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformError {
    pub code: String,
    pub message: String,
    pub suggestion: String,
}

impl PlatformError {
    pub fn new(
        code: impl Into<String>,
        message: impl Into<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }
}

impl std::fmt::Display for PlatformError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

#[derive(Error, Debug)]
pub enum ZcpError {
    #[error("{0}")]
    Platform(PlatformError),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Workflow error: {0}")]
    Workflow(String),
    #[error("Gate blocked: {0}")]
    Gate(String),
    #[error("Not found: {0}")]
    NotFound(String),
}

impl From<PlatformError> for ZcpError {
    fn from(err: PlatformError) -> Self {
        ZcpError::Platform(err)
    }
}

impl ZcpError {
    /// Shorthand for a platform error with code/message/suggestion.
    pub fn platform(
        code: impl Into<String>,
        message: impl Into<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        ZcpError::Platform(PlatformError::new(code, message, suggestion))
    }

    /// The agent-visible error code for this failure. Non-platform errors
    /// collapse into a small fixed set so clients can always branch on code.
    pub fn code(&self) -> &str {
        match self {
            ZcpError::Platform(pe) => &pe.code,
            ZcpError::Validation(_) => codes::INVALID_PARAMETER,
            ZcpError::Workflow(_) | ZcpError::Gate(_) => codes::WORKFLOW_ERROR,
            ZcpError::NotFound(_) => codes::SERVICE_NOT_FOUND,
            ZcpError::Io(_) | ZcpError::Json(_) => codes::API_ERROR,
        }
    }

    /// Recovery hint, if one exists for this failure.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            ZcpError::Platform(pe) if !pe.suggestion.is_empty() => Some(&pe.suggestion),
            _ => None,
        }
    }
}
