//! Threat streams and their arrival effects.
//!
//! Three kinds of threat perturb the patient: a recurring glucose threat, a
//! recurring kidney threat from level 2, and one-shot hypoglycemia threats
//! raised by the tick updater's rolls. The [`Spawner`] decides *when* a threat
//! is released; [`apply_arrival`] decides *what* it does once it reaches the
//! patient.

use serde::{Deserialize, Serialize};

use crate::drugs::Drug;
use crate::level::LevelConfig;
use crate::patient::Patient;
use crate::scheduler::Scheduler;

/// HbA1c added by a glucose threat.
pub const GLUCOSE_HIT: f32 = 0.5;
/// eGFR removed by an unshielded kidney threat.
pub const KIDNEY_HIT: f32 = 7.0;
/// eGFR removed by a kidney threat while the SGLT2 shield holds.
pub const KIDNEY_HIT_SHIELDED: f32 = 2.0;
/// The SGLT2 shield needs at least this much kidney function.
pub const SGLT2_SHIELD_MIN_EGFR: f32 = 20.0;
/// Hypoglycemia risk added by a hypoglycemia threat.
pub const HYPO_HIT: f32 = 25.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreatKind {
    Glucose,
    Kidney,
    Hypoglycemia,
}

impl ThreatKind {
    pub fn label(self) -> &'static str {
        match self {
            ThreatKind::Glucose => "glucose",
            ThreatKind::Kidney => "CKD",
            ThreatKind::Hypoglycemia => "hypo",
        }
    }
}

/// Whether an active SGLT2 inhibitor currently blunts kidney threats.
pub fn kidney_shielded(patient: &Patient) -> bool {
    patient.is_active(Drug::Sglt2Inhibitor) && patient.egfr >= SGLT2_SHIELD_MIN_EGFR
}

/// Apply a threat's one-shot effect and clamp.
pub fn apply_arrival(kind: ThreatKind, patient: &mut Patient) {
    match kind {
        ThreatKind::Glucose => patient.hba1c += GLUCOSE_HIT,
        ThreatKind::Kidney => {
            patient.egfr -= if kidney_shielded(patient) {
                KIDNEY_HIT_SHIELDED
            } else {
                KIDNEY_HIT
            };
        }
        ThreatKind::Hypoglycemia => patient.hypo_risk += HYPO_HIT,
    }
    patient.clamp();
}

/// Releases threats on the level's timetable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Spawner {
    scheduler: Scheduler<ThreatKind>,
}

impl Spawner {
    /// Periodic glucose threats (plus one released immediately), and periodic
    /// kidney threats from level 2.
    pub fn for_level(config: &LevelConfig) -> Self {
        let mut scheduler = Scheduler::new();
        scheduler.register_once(0.0, ThreatKind::Glucose);
        scheduler.register_periodic(config.glucose_period as f64, ThreatKind::Glucose);
        if config.has_kidney_model() {
            scheduler.register_periodic(config.kidney_period as f64, ThreatKind::Kidney);
        }
        Self { scheduler }
    }

    /// Queue a one-shot hypoglycemia threat for the next advance.
    pub fn schedule_hypo(&mut self) {
        self.scheduler.register_once(0.0, ThreatKind::Hypoglycemia);
    }

    /// Advance the timetable, returning threats released during `dt`.
    pub fn advance(&mut self, dt: f32) -> Vec<ThreatKind> {
        self.scheduler.advance(dt as f64)
    }

    pub fn now(&self) -> f64 {
        self.scheduler.now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count(threats: &[ThreatKind], kind: ThreatKind) -> usize {
        threats.iter().filter(|t| **t == kind).count()
    }

    #[test]
    fn test_glucose_arrival() {
        let mut p = Patient::new(8.0, 90.0);
        apply_arrival(ThreatKind::Glucose, &mut p);
        assert!((p.hba1c - 8.5).abs() < 1e-6);
    }

    #[test]
    fn test_kidney_arrival_unshielded() {
        let mut p = Patient::new(8.0, 50.0);
        apply_arrival(ThreatKind::Kidney, &mut p);
        assert_eq!(p.egfr, 43.0);
    }

    #[test]
    fn test_kidney_arrival_shielded() {
        let mut p = Patient::new(8.0, 50.0);
        p.active_drugs.insert(Drug::Sglt2Inhibitor);
        apply_arrival(ThreatKind::Kidney, &mut p);
        assert_eq!(p.egfr, 48.0);
    }

    #[test]
    fn test_shield_fails_with_poor_kidney_function() {
        let mut p = Patient::new(8.0, 19.0);
        p.active_drugs.insert(Drug::Sglt2Inhibitor);
        assert!(!kidney_shielded(&p));
        apply_arrival(ThreatKind::Kidney, &mut p);
        assert_eq!(p.egfr, 12.0);
    }

    #[test]
    fn test_hypo_arrival_clamps() {
        let mut p = Patient::new(8.0, 90.0);
        p.hypo_risk = 90.0;
        apply_arrival(ThreatKind::Hypoglycemia, &mut p);
        assert_eq!(p.hypo_risk, 100.0);
    }

    #[test]
    fn test_level_one_glucose_only() {
        let mut s = Spawner::for_level(&LevelConfig::for_level(1).unwrap());
        let released = s.advance(20.0);
        // immediate + every 4 s
        assert_eq!(count(&released, ThreatKind::Glucose), 6);
        assert_eq!(count(&released, ThreatKind::Kidney), 0);
    }

    #[test]
    fn test_level_two_adds_kidney() {
        let mut s = Spawner::for_level(&LevelConfig::for_level(2).unwrap());
        let released = s.advance(15.0);
        assert_eq!(count(&released, ThreatKind::Kidney), 2);
        // immediate + 3.5, 7, 10.5, 14
        assert_eq!(count(&released, ThreatKind::Glucose), 5);
    }

    #[test]
    fn test_hypo_is_one_shot() {
        let mut s = Spawner::for_level(&LevelConfig::for_level(1).unwrap());
        s.advance(0.5);
        s.schedule_hypo();
        assert_eq!(s.advance(0.1), vec![ThreatKind::Hypoglycemia]);
        assert!(s.advance(0.1).is_empty());
    }
}
