//! Drug toggles - activation guards, advisories, and forced stops.
//!
//! Activation passes through guards in order (formulary, insurance coverage,
//! renal contraindication). A failed guard blocks the action and leaves the
//! patient untouched. Dangerous or redundant combinations are allowed but
//! produce [`Advisory`] warnings. Deactivation always succeeds.

use std::fmt;

use crate::decisions::{DecisionLog, DecisionLogEntry, ToggleAction};
use crate::drugs::{Drug, RENAL_EFFICACY_EGFR};
use crate::level::LevelConfig;
use crate::patient::Patient;
use crate::tick::ADHERENCE_MAX_DRUGS;

/// eGFR lost on SGLT2 inhibitor initiation (hemodynamic dip).
pub const SGLT2_INITIATION_DIP: f32 = 3.0;

/// Why an activation was refused.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BlockReason {
    /// Not offered at this level.
    NotOnFormulary(Drug),
    /// Offered but not covered by the patient's insurance.
    CoverageDenied(Drug),
    /// Kidney function too low for this drug.
    Contraindicated { drug: Drug, egfr: f32, min_egfr: f32 },
}

impl fmt::Display for BlockReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockReason::NotOnFormulary(d) => write!(f, "{d} is not available at this level"),
            BlockReason::CoverageDenied(d) => {
                write!(f, "Insurance denied: {d} is not covered for this patient")
            }
            BlockReason::Contraindicated {
                drug,
                egfr,
                min_egfr,
            } => write!(
                f,
                "Contraindicated: {drug} requires eGFR >= {min_egfr:.0} (current {egfr:.1})"
            ),
        }
    }
}

/// Non-blocking warning raised on activation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Advisory {
    /// GLP-1 RA and DPP-4 inhibitor share the incretin pathway.
    IncretinRedundancy,
    /// Sulfonylurea with insulin doubles hypoglycemia risk.
    AmplifiedHypoglycemia,
    /// Sulfonylurea with irregular meals triples hypoglycemia risk.
    FoodInsecurity,
    /// More drugs than the patient can reliably take.
    Polypharmacy { count: usize },
    /// Metformin needs a dose reduction at this eGFR.
    RenalDoseReduction { egfr: f32 },
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Advisory::IncretinRedundancy => {
                write!(f, "Redundant: GLP-1 RA and DPP-4i act on the same incretin pathway")
            }
            Advisory::AmplifiedHypoglycemia => {
                write!(f, "Danger: Sulfonylurea + Insulin doubles hypoglycemia risk")
            }
            Advisory::FoodInsecurity => {
                write!(f, "Food insecurity: irregular meals triple Sulfonylurea hypo risk")
            }
            Advisory::Polypharmacy { count } => {
                write!(f, "Polypharmacy: {count} drugs will erode adherence")
            }
            Advisory::RenalDoseReduction { egfr } => {
                write!(f, "eGFR {egfr:.1} < 45: reduce Metformin dose")
            }
        }
    }
}

/// Result of a toggle request.
#[derive(Debug, Clone, PartialEq)]
pub enum ToggleOutcome {
    Activated { advisories: Vec<Advisory> },
    Deactivated,
    /// Already in the requested state; nothing logged.
    Unchanged,
    Blocked(BlockReason),
    /// Session paused or over.
    Ignored,
}

impl ToggleOutcome {
    pub fn changed_state(&self) -> bool {
        matches!(self, Self::Activated { .. } | Self::Deactivated)
    }
}

/// Run the activation guards in order.
pub fn check_activation(drug: Drug, patient: &Patient, config: &LevelConfig) -> Result<(), BlockReason> {
    if !config.offers(drug) {
        return Err(BlockReason::NotOnFormulary(drug));
    }
    if config.coverage_denied == Some(drug) {
        return Err(BlockReason::CoverageDenied(drug));
    }
    if let Some(min_egfr) = drug.spec().min_egfr {
        if patient.egfr < min_egfr {
            return Err(BlockReason::Contraindicated {
                drug,
                egfr: patient.egfr,
                min_egfr,
            });
        }
    }
    Ok(())
}

/// Warnings for the regimen that results from activating `drug`.
/// `patient.active_drugs` must already contain it.
pub fn activation_advisories(drug: Drug, patient: &Patient, config: &LevelConfig) -> Vec<Advisory> {
    let active = &patient.active_drugs;
    let mut advisories = Vec::new();

    let incretin_pair = active.contains(&Drug::Glp1Agonist) && active.contains(&Drug::Dpp4Inhibitor);
    if incretin_pair && matches!(drug, Drug::Glp1Agonist | Drug::Dpp4Inhibitor) {
        advisories.push(Advisory::IncretinRedundancy);
    }

    let su_insulin = active.contains(&Drug::Sulfonylurea) && active.contains(&Drug::Insulin);
    if su_insulin && matches!(drug, Drug::Sulfonylurea | Drug::Insulin) {
        advisories.push(Advisory::AmplifiedHypoglycemia);
    }

    if drug == Drug::Sulfonylurea && config.has_food_insecurity() {
        advisories.push(Advisory::FoodInsecurity);
    }

    if config.has_adherence_model() && active.len() > ADHERENCE_MAX_DRUGS {
        advisories.push(Advisory::Polypharmacy {
            count: active.len(),
        });
    }

    if drug == Drug::Metformin && patient.egfr < RENAL_EFFICACY_EGFR {
        advisories.push(Advisory::RenalDoseReduction { egfr: patient.egfr });
    }

    advisories
}

fn log_entry(
    patient: &Patient,
    config: &LevelConfig,
    drug: Drug,
    action: ToggleAction,
    forced: bool,
    time_seconds: f64,
) -> DecisionLogEntry {
    DecisionLogEntry {
        time_seconds,
        drug,
        action,
        forced,
        vitals: patient.vitals(),
        adherence: config.has_adherence_model().then_some(patient.adherence),
    }
}

/// Apply a player toggle. Logs the decision when state changes.
pub fn toggle_drug(
    patient: &mut Patient,
    config: &LevelConfig,
    log: &mut DecisionLog,
    drug: Drug,
    on: bool,
    time_seconds: f64,
) -> ToggleOutcome {
    if on == patient.is_active(drug) {
        return ToggleOutcome::Unchanged;
    }

    if !on {
        log.record(log_entry(patient, config, drug, ToggleAction::Off, false, time_seconds));
        patient.active_drugs.remove(&drug);
        return ToggleOutcome::Deactivated;
    }

    if let Err(reason) = check_activation(drug, patient, config) {
        return ToggleOutcome::Blocked(reason);
    }

    log.record(log_entry(patient, config, drug, ToggleAction::On, false, time_seconds));
    patient.active_drugs.insert(drug);
    if drug == Drug::Sglt2Inhibitor {
        patient.egfr -= SGLT2_INITIATION_DIP;
        patient.clamp();
    }

    ToggleOutcome::Activated {
        advisories: activation_advisories(drug, patient, config),
    }
}

/// Stop every active drug whose eGFR floor is no longer met. Returns the
/// drugs stopped; each is logged as a forced stop.
pub fn enforce_contraindications(
    patient: &mut Patient,
    config: &LevelConfig,
    log: &mut DecisionLog,
    time_seconds: f64,
) -> Vec<Drug> {
    let stopped: Vec<Drug> = patient
        .active_drugs
        .iter()
        .copied()
        .filter(|d| d.spec().min_egfr.is_some_and(|min| patient.egfr < min))
        .collect();

    for &drug in &stopped {
        log.record(log_entry(patient, config, drug, ToggleAction::Off, true, time_seconds));
        patient.active_drugs.remove(&drug);
    }
    stopped
}
