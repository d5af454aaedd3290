//! Scripted sessions driven through the engine.
//!
//! Exercises: SimulationEngine → Spawner → threat lane → tick → outcome
//! → debrief request. Pure in-process, no rendering, no network.

use glucoguard_core::debrief::{
    request_debrief, DebriefError, DebriefService, FALLBACK_SERVER, FALLBACK_TRANSPORT,
};
use glucoguard_core::prelude::*;
use glucoguard_logic::debrief::{DebriefRequest, DebriefResponse};
use glucoguard_logic::decisions::ToggleAction;
use glucoguard_logic::patient::{
    ADHERENCE_MAX, ADHERENCE_MIN, EGFR_MAX, EGFR_MIN, HBA1C_MAX, HBA1C_MIN, HYPO_RISK_MAX,
    HYPO_RISK_MIN,
};
use glucoguard_logic::toggle::BlockReason;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

// ── Helpers ────────────────────────────────────────────────────────────

const DT: f32 = 0.1;

fn session(level: u8, seed: u64, drugs: &[Drug]) -> SimulationEngine {
    let mut engine = SimulationEngine::for_level(level, seed).unwrap();
    for &drug in drugs {
        assert!(engine.toggle_drug(drug, true).changed_state(), "{drug} refused");
    }
    engine
}

/// Step until the session ends or `max_seconds` pass.
fn run_to_end(engine: &mut SimulationEngine, max_seconds: f32) -> Option<Outcome> {
    let steps = (max_seconds / DT).round() as usize;
    for _ in 0..steps {
        engine.update(DT);
        if engine.outcome().is_some() {
            break;
        }
    }
    engine.outcome()
}

fn assert_in_bounds(engine: &SimulationEngine) {
    let p = engine.patient();
    assert!((HBA1C_MIN..=HBA1C_MAX).contains(&p.hba1c), "HbA1c {}", p.hba1c);
    assert!((EGFR_MIN..=EGFR_MAX).contains(&p.egfr), "eGFR {}", p.egfr);
    assert!((HYPO_RISK_MIN..=HYPO_RISK_MAX).contains(&p.hypo_risk), "hypo {}", p.hypo_risk);
    assert!((ADHERENCE_MIN..=ADHERENCE_MAX).contains(&p.adherence), "adherence {}", p.adherence);
}

// ── Level scenarios ────────────────────────────────────────────────────

#[test]
fn level_one_metformin_stabilizes_without_hypoglycemia() {
    let mut engine = session(1, 7, &[Drug::Metformin]);
    let start = engine.patient().hba1c;

    run_to_end(&mut engine, 10.0);
    assert!(engine.patient().hba1c < start, "HbA1c should trend down");

    assert_eq!(run_to_end(&mut engine, 120.0), Some(Outcome::Stabilized));
    assert_eq!(engine.hypo_events(), 0);
    let notices = engine.drain_notices();
    assert!(!notices.iter().any(|n| matches!(n, Notice::HypoScheduled(_))));
    assert_eq!(notices.last(), Some(&Notice::SessionOver(Outcome::Stabilized)));
}

#[test]
fn level_one_untreated_ends_in_crisis() {
    let mut engine = session(1, 7, &[]);
    assert_eq!(run_to_end(&mut engine, 60.0), Some(Outcome::HyperglycemicCrisis));
    assert!(engine.patient().hba1c >= 10.0);
}

#[test]
fn level_two_renal_decay_without_sglt2() {
    let mut engine = session(2, 7, &[Drug::Metformin]);
    let mut last = engine.patient().egfr;
    // No kidney threat lands before 7.5 s + travel
    for _ in 0..50 {
        assert!(engine.patient().hba1c > 7.5);
        engine.update(DT);
        let egfr = engine.patient().egfr;
        assert!(egfr <= last);
        last = egfr;
    }
    assert!((engine.patient().egfr - (52.0 - 0.08 * 5.0)).abs() < 1e-3);
}

#[test]
fn level_two_metformin_alone_is_forced_off_then_lost() {
    let mut engine = session(2, 7, &[Drug::Metformin]);
    let outcome = run_to_end(&mut engine, 120.0).unwrap();
    assert!(outcome.is_loss());
    assert!(engine.patient().egfr < 30.0);

    assert!(!engine.patient().is_active(Drug::Metformin));
    let forced: Vec<_> = engine
        .decision_log()
        .entries()
        .iter()
        .filter(|e| e.forced)
        .collect();
    assert_eq!(forced.len(), 1);
    assert_eq!(forced[0].drug, Drug::Metformin);
    assert_eq!(forced[0].action, ToggleAction::Off);
    assert!(forced[0].vitals.egfr < 30.0);

    let notices = engine.drain_notices();
    assert!(notices
        .iter()
        .any(|n| matches!(n, Notice::ForcedStop { drug: Drug::Metformin, .. })));

    // Re-activation at eGFR < 30 is refused
    engine.restart(7);
    engine.toggle_drug(Drug::Metformin, true);
    while engine.patient().is_active(Drug::Metformin) {
        engine.update(DT);
    }
    assert!(matches!(
        engine.toggle_drug(Drug::Metformin, true),
        ToggleOutcome::Blocked(BlockReason::Contraindicated { .. })
    ));
    assert!(!engine.patient().is_active(Drug::Metformin));
}

#[test]
fn level_two_metformin_and_sglt2_stabilize() {
    let mut engine = session(2, 7, &[Drug::Metformin, Drug::Sglt2Inhibitor]);
    assert_eq!(run_to_end(&mut engine, 120.0), Some(Outcome::Stabilized));
    assert!(engine.patient().egfr > 30.0);
}

#[test]
fn sglt2_initiation_dips_egfr_once() {
    let mut engine = session(2, 7, &[]);
    let before = engine.patient().egfr;
    engine.toggle_drug(Drug::Sglt2Inhibitor, true);
    assert_eq!(engine.patient().egfr, before - 3.0);

    // Logged vitals are from before the dip
    let entry = &engine.decision_log().entries()[0];
    assert_eq!(entry.vitals.egfr, before);

    engine.toggle_drug(Drug::Sglt2Inhibitor, false);
    engine.toggle_drug(Drug::Sglt2Inhibitor, true);
    assert_eq!(engine.patient().egfr, before - 6.0);
}

#[test]
fn level_four_rewards_a_two_drug_regimen() {
    let mut engine = session(4, 7, &[Drug::Metformin, Drug::Sglt2Inhibitor]);
    assert_eq!(
        engine.toggle_drug(Drug::Glp1Agonist, true),
        ToggleOutcome::Blocked(BlockReason::CoverageDenied(Drug::Glp1Agonist))
    );
    assert_eq!(run_to_end(&mut engine, 120.0), Some(Outcome::Stabilized));
    assert_eq!(engine.patient().adherence, 100.0);

    let req = engine.debrief_request().unwrap();
    assert!(req.win);
    assert!(req.adherence.is_some());
}

#[test]
fn level_four_polypharmacy_erodes_adherence() {
    let mut engine = session(4, 7, &[Drug::Metformin, Drug::Sglt2Inhibitor]);
    match engine.toggle_drug(Drug::Dpp4Inhibitor, true) {
        ToggleOutcome::Activated { advisories } => assert!(!advisories.is_empty()),
        other => panic!("unexpected {other:?}"),
    }
    for _ in 0..100 {
        engine.update(DT);
    }
    assert!(engine.patient().adherence < 70.0);
}

// ── Invariants ─────────────────────────────────────────────────────────

#[test]
fn random_play_stays_in_bounds() {
    let mut chooser = StdRng::seed_from_u64(99);
    for level in 1..=4u8 {
        for seed in 0..5u64 {
            let mut engine = SimulationEngine::for_level(level, seed).unwrap();
            for _ in 0..2000 {
                if chooser.gen::<f32>() < 0.05 {
                    let drug = Drug::all()[chooser.gen_range(0..Drug::all().len())];
                    engine.toggle_drug(drug, chooser.gen());
                }
                engine.update(DT);
                assert_in_bounds(&engine);
                if engine.patient().egfr < 30.0 {
                    assert!(!engine.patient().is_active(Drug::Metformin));
                }
                if engine.outcome().is_some() {
                    break;
                }
            }
        }
    }
}

#[test]
fn same_seed_replays_identically() {
    let drugs = [Drug::Insulin, Drug::Sulfonylurea, Drug::Glp1Agonist];
    let mut a = session(3, 1234, &drugs);
    let mut b = session(3, 1234, &drugs);
    for _ in 0..600 {
        a.update(DT);
        b.update(DT);
        assert_eq!(a.patient(), b.patient());
        assert_eq!(a.drain_notices(), b.drain_notices());
    }
    assert_eq!(a.outcome(), b.outcome());
    assert_eq!(a.hypo_events(), b.hypo_events());
}

#[test]
fn insulin_and_sulfonylurea_cause_hypoglycemia() {
    let mut total = 0;
    for seed in 0..10 {
        let mut engine = session(1, seed, &[Drug::Insulin, Drug::Sulfonylurea]);
        run_to_end(&mut engine, 60.0);
        total += engine.hypo_events();
    }
    assert!(total > 0);
}

#[test]
fn pause_is_a_no_op() {
    let mut engine = session(3, 5, &[Drug::Metformin]);
    for _ in 0..20 {
        engine.update(DT);
    }
    engine.drain_notices();
    engine.pause();
    let patient = engine.patient().clone();
    let threats = engine.threats();
    for _ in 0..100 {
        engine.update(DT);
    }
    assert_eq!(engine.patient(), &patient);
    assert_eq!(engine.threats(), threats);
    assert!(engine.drain_notices().is_empty());
}

// ── Debrief handoff ────────────────────────────────────────────────────

struct Offline;

impl DebriefService for Offline {
    fn request(&self, _req: &DebriefRequest) -> Result<DebriefResponse, DebriefError> {
        Err(DebriefError::Transport("network unreachable".into()))
    }
}

struct Failing;

impl DebriefService for Failing {
    fn request(&self, _req: &DebriefRequest) -> Result<DebriefResponse, DebriefError> {
        Err(DebriefError::Server {
            status: 500,
            text: None,
        })
    }
}

#[test]
fn debrief_falls_back_when_service_fails() {
    let mut engine = session(2, 7, &[Drug::Metformin]);
    run_to_end(&mut engine, 120.0);
    let req = engine.debrief_request().unwrap();
    assert_eq!(req.decision_history.len(), 2);
    assert_eq!(request_debrief(&Offline, &req), FALLBACK_TRANSPORT);
    assert_eq!(request_debrief(&Failing, &req), FALLBACK_SERVER);
}
