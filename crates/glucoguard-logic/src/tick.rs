//! Per-tick patient physiology.
//!
//! [`tick_patient`] advances a [`Patient`] by one time slice. Rules run in a
//! fixed order:
//!
//! 1. Background HbA1c drift
//! 2. eGFR decay (level 2+), softened or suppressed by an SGLT2 inhibitor
//! 3. Adherence drift and efficacy multiplier (level 4)
//! 4. GI side-effect check while a GLP-1 RA is active
//! 5. Drug effects: glucose lowering and hypoglycemia rolls
//! 6. Passive hypo-risk recovery when no hypoglycemic drug is active
//! 7. Clamp
//!
//! Rolls come from the caller's RNG so a seeded session replays exactly.

use rand::Rng;

use crate::drugs::{any_hypoglycemic, effective_efficacy, effective_hypo_chance, Drug};
use crate::level::LevelConfig;
use crate::patient::Patient;

/// HbA1c rise per second with no treatment.
pub const HBA1C_DRIFT_PER_SEC: f32 = 0.01;

/// eGFR loss per second while glycemia is uncontrolled.
pub const EGFR_DECAY_PER_SEC: f32 = 0.08;
/// HbA1c above which eGFR decays.
pub const EGFR_DECAY_HBA1C: f32 = 7.5;
/// Decay multiplier while an SGLT2 inhibitor is active.
pub const SGLT2_DECAY_MULT: f32 = 0.15;
/// With an SGLT2 inhibitor, decay stops entirely below this HbA1c.
pub const SGLT2_SHIELD_HBA1C: f32 = 7.0;

/// Adherence loss per second with more than [`ADHERENCE_MAX_DRUGS`] drugs.
pub const ADHERENCE_DECAY_PER_SEC: f32 = 4.0;
/// Adherence recovery per second otherwise.
pub const ADHERENCE_RECOVERY_PER_SEC: f32 = 2.0;
pub const ADHERENCE_MAX_DRUGS: usize = 2;

/// Chance per second of GI distress while a GLP-1 RA is active.
pub const GI_CHANCE_PER_SEC: f32 = 0.03;
/// Length of a GI-distress window, seconds.
pub const GI_WINDOW_SECS: f32 = 5.0;
/// Efficacy multiplier during a GI-distress window.
pub const GI_EFFICACY_MULT: f32 = 0.7;

/// Hypo-risk recovery per second with no hypoglycemic drug active.
pub const HYPO_RECOVERY_PER_SEC: f32 = 1.0;

/// What happened during one tick besides the state change itself.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    /// Drugs whose hypoglycemia roll succeeded; one event each.
    pub hypo_events: Vec<Drug>,
    /// A new GI-distress window started this tick.
    pub gi_triggered: bool,
    /// Total HbA1c removed by drugs this tick.
    pub glucose_lowered: f32,
    /// Efficacy multiplier applied this tick (adherence × GI).
    pub efficacy_mult: f32,
}

/// Adherence efficacy multiplier: 0.2 below 30 %, 0.5 below 60 %, else 1.0.
pub fn adherence_multiplier(adherence: f32) -> f32 {
    if adherence < 30.0 {
        0.2
    } else if adherence < 60.0 {
        0.5
    } else {
        1.0
    }
}

/// Per-tick probability from a per-second chance.
pub fn tick_probability(chance_per_sec: f32, dt: f32) -> f32 {
    (chance_per_sec * dt).clamp(0.0, 1.0)
}

/// eGFR lost this tick from uncontrolled glycemia.
pub fn egfr_decay(patient: &Patient, dt: f32) -> f32 {
    let mut decay = if patient.hba1c > EGFR_DECAY_HBA1C {
        EGFR_DECAY_PER_SEC * dt
    } else {
        0.0
    };
    if patient.is_active(Drug::Sglt2Inhibitor) {
        if patient.hba1c < SGLT2_SHIELD_HBA1C {
            decay = 0.0;
        } else {
            decay *= SGLT2_DECAY_MULT;
        }
    }
    decay
}

/// Advance `patient` by `dt` seconds.
pub fn tick_patient(
    patient: &mut Patient,
    config: &LevelConfig,
    dt: f32,
    rng: &mut impl Rng,
) -> TickReport {
    let mut report = TickReport::default();
    if !dt.is_finite() || dt <= 0.0 {
        report.efficacy_mult = 1.0;
        return report;
    }

    // 1. Drift
    patient.hba1c += HBA1C_DRIFT_PER_SEC * dt;

    // 2. Renal decay
    if config.has_kidney_model() {
        patient.egfr -= egfr_decay(patient, dt);
    }

    // 3. Adherence
    let mut mult = 1.0;
    if config.has_adherence_model() {
        if patient.active_drugs.len() > ADHERENCE_MAX_DRUGS {
            patient.adherence -= ADHERENCE_DECAY_PER_SEC * dt;
        } else {
            patient.adherence += ADHERENCE_RECOVERY_PER_SEC * dt;
        }
        patient.adherence = patient.adherence.clamp(0.0, 100.0);
        mult *= adherence_multiplier(patient.adherence);
    }

    // 4. GI side effects
    if patient.in_gi_distress() {
        patient.gi_distress_remaining = (patient.gi_distress_remaining - dt).max(0.0);
    } else if patient.is_active(Drug::Glp1Agonist)
        && rng.gen::<f32>() < tick_probability(GI_CHANCE_PER_SEC, dt)
    {
        patient.gi_distress_remaining = GI_WINDOW_SECS;
        report.gi_triggered = true;
    }
    if patient.in_gi_distress() {
        mult *= GI_EFFICACY_MULT;
    }
    report.efficacy_mult = mult;

    // 5. Drug effects, in stable drug order so rolls replay
    for &drug in &patient.active_drugs {
        let efficacy = effective_efficacy(drug, &patient.active_drugs, patient.egfr);
        report.glucose_lowered += efficacy * mult * dt;

        let chance = effective_hypo_chance(drug, &patient.active_drugs, config.level);
        if chance > 0.0 && rng.gen::<f32>() < tick_probability(chance, dt) {
            report.hypo_events.push(drug);
        }
    }
    patient.hba1c -= report.glucose_lowered;

    // 6. Hypo-risk recovery
    if !any_hypoglycemic(&patient.active_drugs) {
        patient.hypo_risk -= HYPO_RECOVERY_PER_SEC * dt;
    }

    // 7. Clamp
    patient.clamp();

    report
}
