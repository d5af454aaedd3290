//! Patient state - the clinical variables every other module reads or mutates.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::drugs::Drug;

pub const HBA1C_MIN: f32 = 4.0;
pub const HBA1C_MAX: f32 = 15.0;
pub const EGFR_MIN: f32 = 0.0;
pub const EGFR_MAX: f32 = 120.0;
pub const HYPO_RISK_MIN: f32 = 0.0;
pub const HYPO_RISK_MAX: f32 = 100.0;
pub const ADHERENCE_MIN: f32 = 0.0;
pub const ADHERENCE_MAX: f32 = 100.0;

/// Mutable clinical record for one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    /// Glycated hemoglobin, percent. Clamped to [4.0, 15.0].
    pub hba1c: f32,
    /// Estimated glomerular filtration rate. Clamped to [0, 120].
    pub egfr: f32,
    /// Hypoglycemia risk, percent. Clamped to [0, 100].
    pub hypo_risk: f32,
    /// Medication adherence, percent. Only simulated on level 4.
    pub adherence: f32,
    pub active_drugs: BTreeSet<Drug>,
    /// Consecutive seconds the stabilization condition has held.
    pub stable_seconds: f32,
    /// Flavor only; never read by the rules.
    pub weight_kg: f32,
    /// Remaining seconds of the current GI-distress window.
    pub gi_distress_remaining: f32,
}

impl Patient {
    pub fn new(hba1c: f32, egfr: f32) -> Self {
        let mut patient = Self {
            hba1c,
            egfr,
            hypo_risk: 5.0,
            adherence: ADHERENCE_MAX,
            active_drugs: BTreeSet::new(),
            stable_seconds: 0.0,
            weight_kg: 102.0,
            gi_distress_remaining: 0.0,
        };
        patient.clamp();
        patient
    }

    /// Force every bounded field back into range.
    pub fn clamp(&mut self) {
        self.hba1c = self.hba1c.clamp(HBA1C_MIN, HBA1C_MAX);
        self.egfr = self.egfr.clamp(EGFR_MIN, EGFR_MAX);
        self.hypo_risk = self.hypo_risk.clamp(HYPO_RISK_MIN, HYPO_RISK_MAX);
        self.adherence = self.adherence.clamp(ADHERENCE_MIN, ADHERENCE_MAX);
        self.stable_seconds = self.stable_seconds.max(0.0);
        self.gi_distress_remaining = self.gi_distress_remaining.max(0.0);
    }

    pub fn is_active(&self, drug: Drug) -> bool {
        self.active_drugs.contains(&drug)
    }

    pub fn in_gi_distress(&self) -> bool {
        self.gi_distress_remaining > 0.0
    }

    pub fn vitals(&self) -> Vitals {
        Vitals {
            hba1c: self.hba1c,
            egfr: self.egfr,
            hypo_risk: self.hypo_risk,
            adherence: self.adherence,
        }
    }

    /// Whether every bounded field is inside its documented range.
    pub fn in_bounds(&self) -> bool {
        (HBA1C_MIN..=HBA1C_MAX).contains(&self.hba1c)
            && (EGFR_MIN..=EGFR_MAX).contains(&self.egfr)
            && (HYPO_RISK_MIN..=HYPO_RISK_MAX).contains(&self.hypo_risk)
            && (ADHERENCE_MIN..=ADHERENCE_MAX).contains(&self.adherence)
    }
}

/// Point-in-time copy of the key vitals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vitals {
    pub hba1c: f32,
    pub egfr: f32,
    pub hypo_risk: f32,
    pub adherence: f32,
}
