//! Workflow state model: phases, modes, persistent session state, and
//! the bootstrap subflow state embedded in it.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

pub const STATE_VERSION: &str = "1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Phase {
    Init,
    Discover,
    Develop,
    Deploy,
    Verify,
    Done,
}

impl Phase {
    pub fn parse(s: &str) -> Option<Phase> {
        match s {
            "INIT" => Some(Phase::Init),
            "DISCOVER" => Some(Phase::Discover),
            "DEVELOP" => Some(Phase::Develop),
            "DEPLOY" => Some(Phase::Deploy),
            "VERIFY" => Some(Phase::Verify),
            "DONE" => Some(Phase::Done),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Init => "INIT",
            Phase::Discover => "DISCOVER",
            Phase::Develop => "DEVELOP",
            Phase::Deploy => "DEPLOY",
            Phase::Verify => "VERIFY",
            Phase::Done => "DONE",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowMode {
    #[default]
    Full,
    DevOnly,
    Hotfix,
    Quick,
}

impl WorkflowMode {
    pub fn parse(s: &str) -> Option<WorkflowMode> {
        match s {
            "full" => Some(WorkflowMode::Full),
            "dev_only" => Some(WorkflowMode::DevOnly),
            "hotfix" => Some(WorkflowMode::Hotfix),
            "quick" => Some(WorkflowMode::Quick),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowMode::Full => "full",
            WorkflowMode::DevOnly => "dev_only",
            WorkflowMode::Hotfix => "hotfix",
            WorkflowMode::Quick => "quick",
        }
    }
}

impl fmt::Display for WorkflowMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification of an existing project, used by the bootstrap
/// `detect` step to pick a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectState {
    Fresh,
    Conformant,
    NonConformant,
}

impl ProjectState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectState::Fresh => "FRESH",
            ProjectState::Conformant => "CONFORMANT",
            ProjectState::NonConformant => "NON_CONFORMANT",
        }
    }
}

/// Persistent session state at `<stateDir>/zcp_state.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowState {
    pub version: String,
    pub session_id: String,
    pub project_id: String,
    pub workflow: String,
    pub mode: WorkflowMode,
    pub phase: Phase,
    pub iteration: u32,
    pub intent: String,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub services: BTreeMap<String, ServiceRef>,
    pub history: Vec<PhaseTransition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bootstrap: Option<BootstrapState>,
}

/// Lightweight service reference kept in workflow state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceRef {
    pub id: String,
    pub hostname: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseTransition {
    pub from: Phase,
    pub to: Phase,
    pub at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    InProgress,
    Complete,
    Skipped,
}

impl StepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepStatus::Pending => "pending",
            StepStatus::InProgress => "in_progress",
            StepStatus::Complete => "complete",
            StepStatus::Skipped => "skipped",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BootstrapStep {
    pub name: String,
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attestation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<String>,
}

/// Bootstrap subflow state, embedded in [`WorkflowState`] when
/// `workflow == "bootstrap"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BootstrapState {
    pub active: bool,
    pub current_step: usize,
    pub steps: Vec<BootstrapStep>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<ServicePlan>,
}

/// Structured plan attached after the bootstrap `plan` step.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServicePlan {
    pub services: Vec<PlannedService>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedService {
    pub hostname: String,
    #[serde(rename = "type")]
    pub service_type: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub mode: String,
}

const SEQ_FULL: [Phase; 6] = [
    Phase::Init,
    Phase::Discover,
    Phase::Develop,
    Phase::Deploy,
    Phase::Verify,
    Phase::Done,
];
const SEQ_DEV_ONLY: [Phase; 4] = [Phase::Init, Phase::Discover, Phase::Develop, Phase::Done];
const SEQ_SHORT: [Phase; 5] = [
    Phase::Init,
    Phase::Develop,
    Phase::Deploy,
    Phase::Verify,
    Phase::Done,
];

/// Ordered phase sequence for a mode. Hotfix and quick share a
/// sequence; quick additionally runs ungated.
pub fn phase_sequence(mode: WorkflowMode) -> &'static [Phase] {
    match mode {
        WorkflowMode::Full => &SEQ_FULL,
        WorkflowMode::DevOnly => &SEQ_DEV_ONLY,
        WorkflowMode::Hotfix | WorkflowMode::Quick => &SEQ_SHORT,
    }
}

/// The single legal successor of `current` in the mode's sequence,
/// or `None` when terminal.
pub fn valid_next_phase(current: Phase, mode: WorkflowMode) -> Option<Phase> {
    let seq = phase_sequence(mode);
    seq.iter()
        .position(|p| *p == current)
        .and_then(|i| seq.get(i + 1))
        .copied()
}

pub fn is_valid_transition(from: Phase, to: Phase, mode: WorkflowMode) -> bool {
    valid_next_phase(from, mode) == Some(to)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_sequences_per_mode() {
        assert_eq!(phase_sequence(WorkflowMode::Full).len(), 6);
        assert_eq!(phase_sequence(WorkflowMode::DevOnly).len(), 4);
        assert_eq!(
            phase_sequence(WorkflowMode::Hotfix)[1],
            Phase::Develop,
            "hotfix skips DISCOVER"
        );
    }

    #[test]
    fn test_valid_transitions() {
        assert!(is_valid_transition(
            Phase::Init,
            Phase::Discover,
            WorkflowMode::Full
        ));
        assert!(!is_valid_transition(
            Phase::Init,
            Phase::Develop,
            WorkflowMode::Full
        ));
        assert!(is_valid_transition(
            Phase::Init,
            Phase::Develop,
            WorkflowMode::Hotfix
        ));
        assert!(is_valid_transition(
            Phase::Develop,
            Phase::Done,
            WorkflowMode::DevOnly
        ));
        assert_eq!(valid_next_phase(Phase::Done, WorkflowMode::Full), None);
    }

    #[test]
    fn test_phase_serde_uppercase() {
        assert_eq!(
            serde_json::to_string(&Phase::Discover).expect("json"),
            "\"DISCOVER\""
        );
        assert_eq!(Phase::parse("DEPLOY"), Some(Phase::Deploy));
        assert_eq!(Phase::parse("deploy"), None);
    }

    #[test]
    fn test_mode_serde_snake_case() {
        assert_eq!(
            serde_json::to_string(&WorkflowMode::DevOnly).expect("json"),
            "\"dev_only\""
        );
        assert_eq!(WorkflowMode::parse("hotfix"), Some(WorkflowMode::Hotfix));
    }

    #[test]
    fn test_state_json_field_names() {
        let state = WorkflowState {
            version: STATE_VERSION.into(),
            session_id: "abc123".into(),
            project_id: "p1".into(),
            workflow: "bootstrap".into(),
            mode: WorkflowMode::Full,
            phase: Phase::Init,
            iteration: 0,
            intent: "bun + postgres".into(),
            created_at: "2026-01-01T00:00:00Z".into(),
            updated_at: "2026-01-01T00:00:00Z".into(),
            services: BTreeMap::new(),
            history: vec![],
            bootstrap: None,
        };
        let json = serde_json::to_value(&state).expect("json");
        assert_eq!(json["sessionId"], "abc123");
        assert_eq!(json["phase"], "INIT");
        assert_eq!(json["mode"], "full");
        assert!(json.get("bootstrap").is_none());
        assert!(json.get("services").is_none());
    }
}
