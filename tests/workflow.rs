use std::fs;

use tempfile::tempdir;
use zcp::core::engine::{Engine, Evidence, ServiceResult, list_evidence, load_evidence};
use zcp::core::error::ZcpError;
use zcp::core::state::{Phase, WorkflowMode};

fn evidence(ty: &str) -> Evidence {
    Evidence {
        session_id: String::new(),
        timestamp: String::new(),
        verification_type: String::new(),
        service: None,
        attestation: format!("{} checked by hand against the running stack", ty),
        evidence_type: ty.into(),
        passed: 1,
        failed: 0,
        service_results: vec![],
    }
}

#[test]
fn full_mode_walks_every_gate_to_done() {
    let tmp = tempdir().expect("tempdir");
    let engine = Engine::new(tmp.path());

    let state = engine
        .start("proj-1", "deploy", WorkflowMode::Full, "ship the api")
        .expect("start");
    assert_eq!(state.phase, Phase::Init);

    let walk = [
        ("recipe_review", Phase::Discover),
        ("discovery", Phase::Develop),
        ("dev_verify", Phase::Deploy),
        ("deploy_evidence", Phase::Verify),
        ("stage_verify", Phase::Done),
    ];
    for (ty, next) in walk {
        engine.record_evidence(evidence(ty)).expect("record");
        let state = engine.transition(next).expect("transition");
        assert_eq!(state.phase, next);
    }

    let state = engine.state().expect("state");
    assert_eq!(state.phase, Phase::Done);
    assert_eq!(state.history.len(), 5);
    // History forms an unbroken chain through the full sequence.
    for pair in state.history.windows(2) {
        assert_eq!(pair[0].to, pair[1].from);
    }
    assert_eq!(state.history[0].from, Phase::Init);
    assert_eq!(state.history[4].to, Phase::Done);

    let stored = list_evidence(engine.evidence_dir(), &state.session_id).expect("list");
    assert_eq!(stored.len(), 5);
    for ev in &stored {
        assert_eq!(ev.session_id, state.session_id, "evidence is stamped");
        assert!(!ev.timestamp.is_empty());
        assert_eq!(ev.verification_type, "attestation");
    }
}

#[test]
fn gate_refuses_transition_until_evidence_lands() {
    let tmp = tempdir().expect("tempdir");
    let engine = Engine::new(tmp.path());
    engine
        .start("proj-1", "deploy", WorkflowMode::Full, "ship it")
        .expect("start");

    let err = engine.transition(Phase::Discover).expect_err("gated");
    match err {
        ZcpError::Gate(msg) => {
            assert!(msg.contains("G0"), "names the gate: {msg}");
            assert!(msg.contains("recipe_review"), "names the evidence: {msg}");
        }
        other => panic!("expected gate error, got {other:?}"),
    }

    engine
        .record_evidence(evidence("recipe_review"))
        .expect("record");
    let state = engine.transition(Phase::Discover).expect("transition");
    assert_eq!(state.phase, Phase::Discover);
}

#[test]
fn evidence_with_failing_service_blocks_the_gate() {
    let tmp = tempdir().expect("tempdir");
    let engine = Engine::new(tmp.path());
    engine
        .start("proj-1", "deploy", WorkflowMode::Full, "ship it")
        .expect("start");
    engine
        .record_evidence(evidence("recipe_review"))
        .expect("record");
    engine.transition(Phase::Discover).expect("to discover");

    // A per-service failure slips past the top-level counters but the
    // gate still reads serviceResults.
    let mut ev = evidence("discovery");
    ev.passed = 2;
    ev.service_results = vec![
        ServiceResult {
            hostname: "appdev".into(),
            status: "pass".into(),
            detail: String::new(),
        },
        ServiceResult {
            hostname: "db".into(),
            status: "fail".into(),
            detail: "connection refused".into(),
        },
    ];
    engine.record_evidence(ev).expect("record");

    let err = engine.transition(Phase::Develop).expect_err("gated");
    let msg = err.to_string();
    assert!(msg.contains("db"), "names the failing service: {msg}");
    assert!(msg.contains("connection refused"), "carries detail: {msg}");
}

#[test]
fn iterate_rewinds_to_develop_and_archives_evidence() {
    let tmp = tempdir().expect("tempdir");
    let engine = Engine::new(tmp.path());
    engine
        .start("proj-1", "deploy", WorkflowMode::Full, "ship it")
        .expect("start");
    engine
        .record_evidence(evidence("recipe_review"))
        .expect("record");
    engine.transition(Phase::Discover).expect("to discover");
    engine
        .record_evidence(evidence("discovery"))
        .expect("record");
    engine.transition(Phase::Develop).expect("to develop");
    engine
        .record_evidence(evidence("dev_verify"))
        .expect("record");
    engine.transition(Phase::Deploy).expect("to deploy");

    let state = engine.iterate().expect("iterate");
    assert_eq!(state.phase, Phase::Develop);
    assert_eq!(state.iteration, 1);

    // Evidence moved wholesale under iterations/1; the working set is
    // empty again.
    let session_dir = engine.evidence_dir().join(&state.session_id);
    let archive = session_dir.join("iterations").join("1");
    assert!(archive.join("recipe_review.json").exists());
    assert!(archive.join("discovery.json").exists());
    assert!(archive.join("dev_verify.json").exists());
    let live = list_evidence(engine.evidence_dir(), &state.session_id).expect("list");
    assert!(live.is_empty());

    // The rewound phase needs fresh verification before deploying
    // again.
    let err = engine.transition(Phase::Deploy).expect_err("gated");
    assert!(err.to_string().contains("dev_verify"));
    engine
        .record_evidence(evidence("dev_verify"))
        .expect("record");
    engine.transition(Phase::Deploy).expect("to deploy again");
}

#[test]
fn state_survives_process_restart() {
    let tmp = tempdir().expect("tempdir");
    let session_id;
    {
        let engine = Engine::new(tmp.path());
        let state = engine
            .start("proj-1", "deploy", WorkflowMode::Hotfix, "patch prod")
            .expect("start");
        session_id = state.session_id;
        engine
            .record_evidence(evidence("recipe_review"))
            .expect("record");
        engine.transition(Phase::Develop).expect("hotfix skips discover");
    }

    let engine = Engine::new(tmp.path());
    let state = engine.state().expect("reload");
    assert_eq!(state.session_id, session_id);
    assert_eq!(state.phase, Phase::Develop);
    assert_eq!(state.mode, WorkflowMode::Hotfix);
    let ev = load_evidence(engine.evidence_dir(), &session_id, "recipe_review")
        .expect("evidence survives");
    assert_eq!(ev.session_id, session_id);
}

#[test]
fn reset_clears_session_but_keeps_evidence() {
    let tmp = tempdir().expect("tempdir");
    let engine = Engine::new(tmp.path());
    let first = engine
        .start("proj-1", "deploy", WorkflowMode::Full, "ship it")
        .expect("start");
    engine
        .record_evidence(evidence("recipe_review"))
        .expect("record");

    engine.reset().expect("reset");
    assert!(!engine.has_session());
    assert!(engine.state().is_err());
    let path = engine
        .evidence_dir()
        .join(&first.session_id)
        .join("recipe_review.json");
    assert!(path.exists(), "reset leaves evidence on disk");

    let second = engine
        .start("proj-1", "deploy", WorkflowMode::Full, "try again")
        .expect("restart");
    assert_ne!(second.session_id, first.session_id);
    assert_eq!(second.phase, Phase::Init);
}

#[test]
fn quick_mode_walks_without_evidence() {
    let tmp = tempdir().expect("tempdir");
    let engine = Engine::new(tmp.path());
    engine
        .start("proj-1", "deploy", WorkflowMode::Quick, "prototype")
        .expect("start");

    for next in [
        Phase::Discover,
        Phase::Develop,
        Phase::Deploy,
        Phase::Verify,
        Phase::Done,
    ] {
        let state = engine.transition(next).expect("ungated");
        assert_eq!(state.phase, next);
    }
    assert!(fs::read_dir(engine.evidence_dir()).is_err(), "no evidence written");
}

#[test]
fn second_session_cannot_start_over_an_active_one() {
    let tmp = tempdir().expect("tempdir");
    let engine = Engine::new(tmp.path());
    engine
        .start("proj-1", "deploy", WorkflowMode::Full, "first")
        .expect("start");

    let err = engine
        .start("proj-1", "deploy", WorkflowMode::Full, "second")
        .expect_err("refused");
    assert!(err.to_string().contains("active session exists"));
}
