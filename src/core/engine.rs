//! Workflow engine: session lifecycle, evidence store, and the
//! evidence gates guarding phase transitions.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use ulid::Ulid;

use crate::core::error::ZcpError;
use crate::core::state::{
    Phase, PhaseTransition, STATE_VERSION, WorkflowMode, WorkflowState, is_valid_transition,
};
use crate::core::time;

const STATE_FILE: &str = "zcp_state.json";

pub const EVIDENCE_TYPES: [&str; 5] = [
    "recipe_review",
    "discovery",
    "dev_verify",
    "deploy_evidence",
    "stage_verify",
];

/// Attestation evidence backing gate checks, one file per
/// `(sessionId, type)` at `evidence/<sessionId>/<type>.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Evidence {
    pub session_id: String,
    pub timestamp: String,
    pub verification_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    pub attestation: String,
    #[serde(rename = "type")]
    pub evidence_type: String,
    pub passed: u32,
    pub failed: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub service_results: Vec<ServiceResult>,
}

/// Per-service verification outcome within evidence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceResult {
    pub hostname: String,
    /// pass, fail or skip.
    pub status: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub detail: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct GateResult {
    pub passed: bool,
    pub gate: String,
    pub missing: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<String>,
}

impl GateResult {
    fn pass(gate: &str) -> Self {
        Self {
            passed: true,
            gate: gate.to_string(),
            missing: vec![],
            failures: vec![],
        }
    }
}

struct GateDef {
    name: &'static str,
    from: Phase,
    to: Phase,
    required: &'static str,
    /// 0 disables the freshness check (G0 relies on the discovery
    /// bypass instead).
    fresh_hours: i64,
}

const GATES: [GateDef; 5] = [
    GateDef {
        name: "G0",
        from: Phase::Init,
        to: Phase::Discover,
        required: "recipe_review",
        fresh_hours: 0,
    },
    GateDef {
        name: "G1",
        from: Phase::Discover,
        to: Phase::Develop,
        required: "discovery",
        fresh_hours: 24,
    },
    GateDef {
        name: "G2",
        from: Phase::Develop,
        to: Phase::Deploy,
        required: "dev_verify",
        fresh_hours: 24,
    },
    GateDef {
        name: "G3",
        from: Phase::Deploy,
        to: Phase::Verify,
        required: "deploy_evidence",
        fresh_hours: 24,
    },
    GateDef {
        name: "G4",
        from: Phase::Verify,
        to: Phase::Done,
        required: "stage_verify",
        fresh_hours: 24,
    },
];

const DISCOVERY_FRESH_HOURS: i64 = 24;

/// The gate name guarding a transition, or empty when ungated.
pub fn gate_name(from: Phase, to: Phase) -> &'static str {
    GATES
        .iter()
        .find(|g| g.from == from && g.to == to)
        .map(|g| g.name)
        .unwrap_or("")
}

/// Checks whether a phase transition is allowed based on stored
/// evidence. Quick mode runs ungated; transitions outside the gate
/// table pass unconditionally.
pub fn check_gate(
    from: Phase,
    to: Phase,
    mode: WorkflowMode,
    evidence_dir: &Path,
    session_id: &str,
) -> Result<GateResult, ZcpError> {
    if mode == WorkflowMode::Quick {
        return Ok(GateResult::pass(""));
    }
    if !is_valid_transition(from, to, mode) {
        return Err(ZcpError::Workflow(format!(
            "invalid transition {} -> {} in mode {}",
            from, to, mode
        )));
    }

    let Some(gate) = GATES.iter().find(|g| g.from == from && g.to == to) else {
        return Ok(GateResult::pass(""));
    };

    // Returning agents with a fresh discovery skip the recipe review.
    if gate.name == "G0" && is_discovery_fresh(evidence_dir, session_id) {
        return Ok(GateResult::pass("G0"));
    }

    let mut missing = Vec::new();
    let mut failures = Vec::new();

    match load_evidence(evidence_dir, session_id, gate.required) {
        Err(_) => missing.push(gate.required.to_string()),
        Ok(ev) => {
            if !ev.session_id.is_empty() && ev.session_id != session_id {
                failures.push(format!(
                    "{}: session mismatch (want {}, got {})",
                    gate.required, session_id, ev.session_id
                ));
            } else if gate.fresh_hours > 0
                && !ev.timestamp.is_empty()
                && !time::is_fresh(&ev.timestamp, gate.fresh_hours)
            {
                failures.push(format!(
                    "{}: stale (age {}, max {}h)",
                    gate.required,
                    time::age_of(&ev.timestamp),
                    gate.fresh_hours
                ));
            } else {
                validate_gate_evidence(&ev, &mut failures);
            }
        }
    }

    Ok(GateResult {
        passed: missing.is_empty() && failures.is_empty(),
        gate: gate.name.to_string(),
        missing,
        failures,
    })
}

fn validate_gate_evidence(ev: &Evidence, failures: &mut Vec<String>) {
    if ev.failed > 0 {
        failures.push(format!(
            "evidence {}: has {} failure(s)",
            ev.evidence_type, ev.failed
        ));
        return;
    }
    if ev.attestation.is_empty() {
        failures.push(format!("evidence {}: empty attestation", ev.evidence_type));
        return;
    }
    if ev.passed == 0 {
        failures.push(format!(
            "evidence {}: nothing passed yet",
            ev.evidence_type
        ));
        return;
    }
    for sr in &ev.service_results {
        if sr.status == "fail" {
            let detail = if sr.detail.is_empty() {
                "failed"
            } else {
                sr.detail.as_str()
            };
            failures.push(format!(
                "evidence {} service {}: {}",
                ev.evidence_type, sr.hostname, detail
            ));
        }
    }
}

fn is_discovery_fresh(evidence_dir: &Path, session_id: &str) -> bool {
    match load_evidence(evidence_dir, session_id, "discovery") {
        Ok(ev) => time::is_fresh(&ev.timestamp, DISCOVERY_FRESH_HOURS),
        Err(_) => false,
    }
}

/// Atomically writes `data` to `dir/name` via a uniquely-suffixed temp
/// file in the same directory.
fn write_atomic(dir: &Path, name: &str, data: &[u8]) -> Result<(), ZcpError> {
    fs::create_dir_all(dir)?;
    let tmp = dir.join(format!(".{}-{}.tmp", name, Ulid::new()));
    fs::write(&tmp, data)?;
    if let Err(err) = fs::rename(&tmp, dir.join(name)) {
        let _ = fs::remove_file(&tmp);
        return Err(err.into());
    }
    Ok(())
}

pub fn save_evidence(dir: &Path, session_id: &str, ev: &Evidence) -> Result<(), ZcpError> {
    let data = serde_json::to_vec_pretty(ev)?;
    write_atomic(
        &dir.join(session_id),
        &format!("{}.json", ev.evidence_type),
        &data,
    )
}

pub fn load_evidence(dir: &Path, session_id: &str, evidence_type: &str) -> Result<Evidence, ZcpError> {
    let path = dir.join(session_id).join(format!("{}.json", evidence_type));
    let data = fs::read(path)?;
    Ok(serde_json::from_slice(&data)?)
}

/// All parseable evidence files for a session; corrupt files are
/// skipped.
pub fn list_evidence(dir: &Path, session_id: &str) -> Result<Vec<Evidence>, ZcpError> {
    let sess_dir = dir.join(session_id);
    let entries = match fs::read_dir(&sess_dir) {
        Ok(e) => e,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(vec![]),
        Err(err) => return Err(err.into()),
    };

    let mut result = Vec::new();
    for entry in entries {
        let entry = entry?;
        let name = entry.file_name();
        let Some(ty) = name.to_str().and_then(|n| n.strip_suffix(".json")) else {
            continue;
        };
        if entry.path().is_dir() {
            continue;
        }
        if let Ok(ev) = load_evidence(dir, session_id, ty) {
            result.push(ev);
        }
    }
    Ok(result)
}

/// Moves every evidence file for a session under `iterations/{n}/`.
pub fn archive_evidence(dir: &Path, session_id: &str, iteration: u32) -> Result<(), ZcpError> {
    let sess_dir = dir.join(session_id);
    let entries = match fs::read_dir(&sess_dir) {
        Ok(e) => e,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(err) => return Err(err.into()),
    };

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry?;
        if entry.path().is_dir() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str()
            && name.ends_with(".json")
        {
            files.push(name.to_string());
        }
    }
    if files.is_empty() {
        return Ok(());
    }

    let archive_dir = sess_dir.join("iterations").join(iteration.to_string());
    fs::create_dir_all(&archive_dir)?;
    for name in files {
        fs::rename(sess_dir.join(&name), archive_dir.join(&name))?;
    }
    Ok(())
}

/// Orchestrates the workflow lifecycle over one state directory.
pub struct Engine {
    state_dir: PathBuf,
    evidence_dir: PathBuf,
}

impl Engine {
    /// State lands at `base/zcp_state.json`, evidence under
    /// `base/evidence/`.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        let base = base_dir.into();
        Self {
            evidence_dir: base.join("evidence"),
            state_dir: base,
        }
    }

    pub fn evidence_dir(&self) -> &Path {
        &self.evidence_dir
    }

    /// Loads the active session, or a workflow error when none exists.
    pub fn state(&self) -> Result<WorkflowState, ZcpError> {
        let path = self.state_dir.join(STATE_FILE);
        let data = match fs::read(&path) {
            Ok(d) => d,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(ZcpError::Workflow(
                    "no active workflow session; start one first".into(),
                ));
            }
            Err(err) => return Err(err.into()),
        };
        Ok(serde_json::from_slice(&data)?)
    }

    pub fn has_session(&self) -> bool {
        self.state_dir.join(STATE_FILE).exists()
    }

    /// Creates a new session at `phase=INIT, iteration=0`. Fails while
    /// a session exists; callers reset first.
    pub fn start(
        &self,
        project_id: &str,
        workflow: &str,
        mode: WorkflowMode,
        intent: &str,
    ) -> Result<WorkflowState, ZcpError> {
        if self.has_session() {
            return Err(ZcpError::Workflow(
                "active session exists; reset it before starting a new one".into(),
            ));
        }

        let now = time::now_rfc3339();
        let state = WorkflowState {
            version: STATE_VERSION.into(),
            session_id: generate_session_id(),
            project_id: project_id.into(),
            workflow: workflow.into(),
            mode,
            phase: Phase::Init,
            iteration: 0,
            intent: intent.into(),
            created_at: now.clone(),
            updated_at: now,
            services: Default::default(),
            history: vec![],
            bootstrap: None,
        };
        self.persist(&state)?;
        info!(session_id = %state.session_id, %mode, "workflow session started");
        Ok(state)
    }

    /// Moves to the next phase after its gate passes.
    pub fn transition(&self, next: Phase) -> Result<WorkflowState, ZcpError> {
        let mut state = self.state()?;

        if !is_valid_transition(state.phase, next, state.mode) {
            return Err(ZcpError::Workflow(format!(
                "invalid transition {} -> {} in mode {}",
                state.phase, next, state.mode
            )));
        }

        let result = check_gate(
            state.phase,
            next,
            state.mode,
            &self.evidence_dir,
            &state.session_id,
        )?;
        if !result.passed {
            return Err(gate_error(&result));
        }

        let now = time::now_rfc3339();
        state.history.push(PhaseTransition {
            from: state.phase,
            to: next,
            at: now.clone(),
        });
        state.phase = next;
        state.updated_at = now;
        self.persist(&state)?;
        debug!(phase = %next, "workflow transitioned");
        Ok(state)
    }

    /// Stores evidence for the current session, stamping it with the
    /// session id. Evidence of failure is refused; fix and re-verify
    /// instead of recording a failing state as proof.
    pub fn record_evidence(&self, mut ev: Evidence) -> Result<Evidence, ZcpError> {
        if !EVIDENCE_TYPES.contains(&ev.evidence_type.as_str()) {
            return Err(ZcpError::Validation(format!(
                "unknown evidence type '{}', expected one of: {}",
                ev.evidence_type,
                EVIDENCE_TYPES.join(", ")
            )));
        }
        if ev.failed > 0 {
            return Err(ZcpError::Validation(format!(
                "evidence {} has {} failure(s); gates only accept passing evidence",
                ev.evidence_type, ev.failed
            )));
        }
        if ev.attestation.is_empty() {
            return Err(ZcpError::Validation(format!(
                "evidence {} has an empty attestation",
                ev.evidence_type
            )));
        }

        let state = self.state()?;
        ev.session_id = state.session_id.clone();
        if ev.timestamp.is_empty() {
            ev.timestamp = time::now_rfc3339();
        }
        if ev.verification_type.is_empty() {
            ev.verification_type = "attestation".into();
        }
        save_evidence(&self.evidence_dir, &state.session_id, &ev)?;
        Ok(ev)
    }

    /// Archives current evidence under `iterations/{n+1}/`, bumps the
    /// iteration counter and rewinds the phase to DEVELOP.
    pub fn iterate(&self) -> Result<WorkflowState, ZcpError> {
        let mut state = self.state()?;
        let next_iter = state.iteration + 1;

        archive_evidence(&self.evidence_dir, &state.session_id, next_iter)?;

        let now = time::now_rfc3339();
        state.history.push(PhaseTransition {
            from: state.phase,
            to: Phase::Develop,
            at: now.clone(),
        });
        state.phase = Phase::Develop;
        state.iteration = next_iter;
        state.updated_at = now;
        self.persist(&state)?;
        info!(iteration = next_iter, "workflow iterated");
        Ok(state)
    }

    /// Removes the state file. Evidence stays on disk.
    pub fn reset(&self) -> Result<(), ZcpError> {
        match fs::remove_file(self.state_dir.join(STATE_FILE)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    pub(crate) fn persist(&self, state: &WorkflowState) -> Result<(), ZcpError> {
        let data = serde_json::to_vec_pretty(state)?;
        write_atomic(&self.state_dir, STATE_FILE, &data)
    }
}

pub(crate) fn gate_error(result: &GateResult) -> ZcpError {
    let mut parts = Vec::new();
    if !result.missing.is_empty() {
        parts.push(format!("missing evidence: {}", result.missing.join(", ")));
    }
    if !result.failures.is_empty() {
        parts.push(result.failures.join("; "));
    }
    ZcpError::Gate(format!("gate {} failed: {}", result.gate, parts.join("; ")))
}

fn generate_session_id() -> String {
    let bytes: [u8; 8] = rand::random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, SecondsFormat, Utc};
    use tempfile::tempdir;

    fn evidence(ty: &str, passed: u32) -> Evidence {
        Evidence {
            session_id: String::new(),
            timestamp: String::new(),
            verification_type: String::new(),
            service: None,
            attestation: "verified by hand in the test suite".into(),
            evidence_type: ty.into(),
            passed,
            failed: 0,
            service_results: vec![],
        }
    }

    #[test]
    fn test_start_creates_session() {
        let dir = tempdir().expect("tempdir");
        let engine = Engine::new(dir.path());

        let state = engine
            .start("p1", "deploy", WorkflowMode::Full, "ship it")
            .expect("start");
        assert_eq!(state.phase, Phase::Init);
        assert_eq!(state.iteration, 0);
        assert_eq!(state.session_id.len(), 16, "8 random bytes as hex");
        assert!(state.session_id.chars().all(|c| c.is_ascii_hexdigit()));

        let err = engine
            .start("p1", "deploy", WorkflowMode::Full, "again")
            .expect_err("double start");
        assert!(err.to_string().contains("active session exists"));
    }

    #[test]
    fn test_transition_blocked_without_evidence() {
        let dir = tempdir().expect("tempdir");
        let engine = Engine::new(dir.path());
        engine
            .start("p1", "deploy", WorkflowMode::Full, "x")
            .expect("start");

        let err = engine.transition(Phase::Discover).expect_err("gate block");
        assert!(err.to_string().contains("recipe_review"), "{}", err);
    }

    #[test]
    fn test_transition_passes_with_evidence() {
        let dir = tempdir().expect("tempdir");
        let engine = Engine::new(dir.path());
        engine
            .start("p1", "deploy", WorkflowMode::Full, "x")
            .expect("start");
        engine
            .record_evidence(evidence("recipe_review", 1))
            .expect("record");

        let state = engine.transition(Phase::Discover).expect("transition");
        assert_eq!(state.phase, Phase::Discover);
        assert_eq!(state.history.len(), 1);
        assert_eq!(state.history[0].from, Phase::Init);
        assert_eq!(state.history[0].to, Phase::Discover);
    }

    #[test]
    fn test_invalid_transition_rejected() {
        let dir = tempdir().expect("tempdir");
        let engine = Engine::new(dir.path());
        engine
            .start("p1", "deploy", WorkflowMode::Full, "x")
            .expect("start");

        let err = engine.transition(Phase::Deploy).expect_err("skip phases");
        assert!(err.to_string().contains("invalid transition"));
    }

    #[test]
    fn test_g0_fresh_discovery_bypass() {
        let dir = tempdir().expect("tempdir");
        let engine = Engine::new(dir.path());
        engine
            .start("p1", "deploy", WorkflowMode::Full, "x")
            .expect("start");
        engine
            .record_evidence(evidence("discovery", 1))
            .expect("record");

        // No recipe_review, but a fresh discovery exists.
        let state = engine.transition(Phase::Discover).expect("bypass");
        assert_eq!(state.phase, Phase::Discover);
    }

    #[test]
    fn test_record_evidence_rejections() {
        let dir = tempdir().expect("tempdir");
        let engine = Engine::new(dir.path());
        engine
            .start("p1", "deploy", WorkflowMode::Full, "x")
            .expect("start");

        let err = engine
            .record_evidence(evidence("vibes", 1))
            .expect_err("unknown type");
        assert!(err.to_string().contains("unknown evidence type"));

        let mut failing = evidence("dev_verify", 1);
        failing.failed = 2;
        let err = engine.record_evidence(failing).expect_err("failures");
        assert!(err.to_string().contains("failure"));

        let mut blank = evidence("dev_verify", 1);
        blank.attestation = String::new();
        assert!(engine.record_evidence(blank).is_err());
    }

    #[test]
    fn test_gate_rejects_stale_evidence() {
        let dir = tempdir().expect("tempdir");
        let engine = Engine::new(dir.path());
        let state = engine
            .start("p1", "deploy", WorkflowMode::Full, "x")
            .expect("start");

        let mut ev = evidence("discovery", 1);
        ev.session_id = state.session_id.clone();
        ev.timestamp = (Utc::now() - Duration::hours(30)).to_rfc3339_opts(SecondsFormat::Secs, true);
        save_evidence(engine.evidence_dir(), &state.session_id, &ev).expect("save");

        let result = check_gate(
            Phase::Discover,
            Phase::Develop,
            WorkflowMode::Full,
            engine.evidence_dir(),
            &state.session_id,
        )
        .expect("check");
        assert!(!result.passed);
        assert!(result.failures[0].contains("stale"), "{:?}", result.failures);
    }

    #[test]
    fn test_gate_rejects_foreign_session_and_zero_passed() {
        let dir = tempdir().expect("tempdir");
        let engine = Engine::new(dir.path());
        let state = engine
            .start("p1", "deploy", WorkflowMode::Full, "x")
            .expect("start");

        let mut foreign = evidence("discovery", 1);
        foreign.session_id = "deadbeefdeadbeef".into();
        foreign.timestamp = time::now_rfc3339();
        save_evidence(engine.evidence_dir(), &state.session_id, &foreign).expect("save");

        let result = check_gate(
            Phase::Discover,
            Phase::Develop,
            WorkflowMode::Full,
            engine.evidence_dir(),
            &state.session_id,
        )
        .expect("check");
        assert!(!result.passed);
        assert!(result.failures[0].contains("session mismatch"));

        let mut vacuous = evidence("discovery", 0);
        vacuous.session_id = state.session_id.clone();
        vacuous.timestamp = time::now_rfc3339();
        save_evidence(engine.evidence_dir(), &state.session_id, &vacuous).expect("save");
        let result = check_gate(
            Phase::Discover,
            Phase::Develop,
            WorkflowMode::Full,
            engine.evidence_dir(),
            &state.session_id,
        )
        .expect("check");
        assert!(!result.passed);
    }

    #[test]
    fn test_gate_reports_failing_service_results() {
        let dir = tempdir().expect("tempdir");
        let engine = Engine::new(dir.path());
        let state = engine
            .start("p1", "deploy", WorkflowMode::Full, "x")
            .expect("start");

        let mut ev = evidence("stage_verify", 2);
        ev.session_id = state.session_id.clone();
        ev.timestamp = time::now_rfc3339();
        ev.service_results = vec![
            ServiceResult {
                hostname: "app".into(),
                status: "pass".into(),
                detail: String::new(),
            },
            ServiceResult {
                hostname: "api".into(),
                status: "fail".into(),
                detail: "health check 500".into(),
            },
        ];
        save_evidence(engine.evidence_dir(), &state.session_id, &ev).expect("save");

        let result = check_gate(
            Phase::Verify,
            Phase::Done,
            WorkflowMode::Full,
            engine.evidence_dir(),
            &state.session_id,
        )
        .expect("check");
        assert!(!result.passed);
        assert!(result.failures[0].contains("api"));
        assert!(result.failures[0].contains("health check 500"));
    }

    #[test]
    fn test_quick_mode_ungated() {
        let dir = tempdir().expect("tempdir");
        let engine = Engine::new(dir.path());
        engine
            .start("p1", "deploy", WorkflowMode::Quick, "hotpatch")
            .expect("start");

        let state = engine.transition(Phase::Develop).expect("no gates");
        assert_eq!(state.phase, Phase::Develop);
    }

    #[test]
    fn test_dev_only_final_transition_ungated() {
        let dir = tempdir().expect("tempdir");
        let engine = Engine::new(dir.path());
        engine
            .start("p1", "deploy", WorkflowMode::DevOnly, "x")
            .expect("start");
        engine
            .record_evidence(evidence("recipe_review", 1))
            .expect("record");
        engine.transition(Phase::Discover).expect("g0");
        engine
            .record_evidence(evidence("discovery", 1))
            .expect("record");
        engine.transition(Phase::Develop).expect("g1");

        // DEVELOP -> DONE has no gate entry in dev_only.
        let state = engine.transition(Phase::Done).expect("ungated");
        assert_eq!(state.phase, Phase::Done);
    }

    #[test]
    fn test_iterate_archives_and_rewinds() {
        let dir = tempdir().expect("tempdir");
        let engine = Engine::new(dir.path());
        let started = engine
            .start("p1", "deploy", WorkflowMode::Full, "x")
            .expect("start");
        engine
            .record_evidence(evidence("recipe_review", 1))
            .expect("record");
        engine
            .record_evidence(evidence("discovery", 1))
            .expect("record");

        let state = engine.iterate().expect("iterate");
        assert_eq!(state.phase, Phase::Develop);
        assert_eq!(state.iteration, 1);

        let sess_dir = engine.evidence_dir().join(&started.session_id);
        assert!(sess_dir.join("iterations/1/recipe_review.json").exists());
        assert!(sess_dir.join("iterations/1/discovery.json").exists());
        assert!(!sess_dir.join("recipe_review.json").exists());
        assert!(
            list_evidence(engine.evidence_dir(), &started.session_id)
                .expect("list")
                .is_empty()
        );
    }

    #[test]
    fn test_reset_removes_state() {
        let dir = tempdir().expect("tempdir");
        let engine = Engine::new(dir.path());
        engine
            .start("p1", "deploy", WorkflowMode::Full, "x")
            .expect("start");
        engine.reset().expect("reset");
        assert!(engine.state().is_err());
        engine.reset().expect("reset is idempotent");
    }

    #[test]
    fn test_state_file_is_pretty_json() {
        let dir = tempdir().expect("tempdir");
        let engine = Engine::new(dir.path());
        engine
            .start("p1", "bootstrap", WorkflowMode::Full, "x")
            .expect("start");
        let raw = fs::read_to_string(dir.path().join(STATE_FILE)).expect("read");
        assert!(raw.contains("\"sessionId\""));
        assert!(raw.contains('\n'), "indented for human inspection");
    }
}
