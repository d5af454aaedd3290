//! Win/loss evaluation.
//!
//! Checked once per tick after every mutation. Losses take priority over the
//! win, in order: hypoglycemic coma, hyperglycemic crisis, kidney failure.
//! The win needs the stabilization condition to hold without interruption for
//! a level-specific duration.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::level::LevelConfig;
use crate::patient::Patient;

pub const COMA_HYPO_RISK: f32 = 100.0;
pub const CRISIS_HBA1C: f32 = 10.0;
pub const KIDNEY_FAILURE_EGFR: f32 = 14.0;

/// Stabilization needs HbA1c below this.
pub const TARGET_HBA1C: f32 = 7.0;
/// From level 2, stabilization also needs eGFR above this.
pub const STABLE_MIN_EGFR: f32 = 30.0;
/// On level 4, stabilization also needs adherence at or above this.
pub const STABLE_MIN_ADHERENCE: f32 = 50.0;

/// Terminal result of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    HypoglycemicComa,
    HyperglycemicCrisis,
    KidneyFailure,
    Stabilized,
}

impl Outcome {
    pub fn is_win(self) -> bool {
        self == Outcome::Stabilized
    }

    pub fn is_loss(self) -> bool {
        !self.is_win()
    }

    pub fn description(self) -> &'static str {
        match self {
            Outcome::HypoglycemicComa => "Hypoglycemic coma",
            Outcome::HyperglycemicCrisis => "Hyperglycemic crisis",
            Outcome::KidneyFailure => "Kidney failure",
            Outcome::Stabilized => "Patient stabilized",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Seconds of uninterrupted stabilization needed to win.
pub fn required_stable_seconds(level: u8) -> f32 {
    if level == 4 {
        25.0
    } else {
        20.0
    }
}

/// Whether the level's stabilization condition holds right now.
///
/// Level 1 only gates on HbA1c. Levels 2+ add the eGFR gate, and level 4
/// adds the adherence gate.
pub fn is_stabilizing(patient: &Patient, level: u8) -> bool {
    if patient.hba1c >= TARGET_HBA1C {
        return false;
    }
    if level > 1 && patient.egfr <= STABLE_MIN_EGFR {
        return false;
    }
    if level == 4 && patient.adherence < STABLE_MIN_ADHERENCE {
        return false;
    }
    true
}

/// Check terminal conditions and advance the stable-time accumulator.
pub fn evaluate(patient: &mut Patient, config: &LevelConfig, dt: f32) -> Option<Outcome> {
    if patient.hypo_risk >= COMA_HYPO_RISK {
        return Some(Outcome::HypoglycemicComa);
    }
    if patient.hba1c >= CRISIS_HBA1C {
        return Some(Outcome::HyperglycemicCrisis);
    }
    if config.has_kidney_model() && patient.egfr <= KIDNEY_FAILURE_EGFR {
        return Some(Outcome::KidneyFailure);
    }

    if is_stabilizing(patient, config.level) {
        patient.stable_seconds += dt.max(0.0);
    } else {
        patient.stable_seconds = 0.0;
    }

    if patient.stable_seconds >= required_stable_seconds(config.level) {
        return Some(Outcome::Stabilized);
    }
    None
}
