//! Drug catalog - static per-drug pharmacology and the interaction rules
//! that adjust it for the current regimen.
//!
//! The catalog is read-only reference data. Interaction adjustments are pure
//! functions of the active set, eGFR and level, so the tick updater and the
//! toggle guards share one source of truth.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Drug identifiers offered across all levels.
///
/// Ordering is stable (`Ord`) so iteration over an active set, and therefore
/// the sequence of random rolls in a tick, is reproducible for a given seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Drug {
    Metformin = 0,
    Insulin = 1,
    Sulfonylurea = 2,
    Sglt2Inhibitor = 3,
    Glp1Agonist = 4,
    Dpp4Inhibitor = 5,
}

impl Drug {
    pub fn all() -> &'static [Drug] {
        &[
            Drug::Metformin,
            Drug::Insulin,
            Drug::Sulfonylurea,
            Drug::Sglt2Inhibitor,
            Drug::Glp1Agonist,
            Drug::Dpp4Inhibitor,
        ]
    }

    pub fn spec(self) -> DrugSpec {
        match self {
            Drug::Metformin => DrugSpec {
                display_name: "Metformin",
                base_efficacy: 0.22,
                base_hypo_chance: 0.0,
                min_egfr: Some(METFORMIN_MIN_EGFR),
                flags: DrugFlags::NONE,
            },
            Drug::Insulin => DrugSpec {
                display_name: "Insulin",
                base_efficacy: 0.35,
                base_hypo_chance: 0.02,
                min_egfr: None,
                flags: DrugFlags {
                    hypoglycemic: true,
                    ..DrugFlags::NONE
                },
            },
            Drug::Sulfonylurea => DrugSpec {
                display_name: "Sulfonylurea",
                base_efficacy: 0.25,
                base_hypo_chance: 0.015,
                min_egfr: None,
                flags: DrugFlags {
                    hypoglycemic: true,
                    ..DrugFlags::NONE
                },
            },
            Drug::Sglt2Inhibitor => DrugSpec {
                display_name: "SGLT2 inhibitor",
                base_efficacy: 0.15,
                base_hypo_chance: 0.0,
                min_egfr: None,
                flags: DrugFlags {
                    renal_sensitive: true,
                    kidney_shield: true,
                    ..DrugFlags::NONE
                },
            },
            Drug::Glp1Agonist => DrugSpec {
                display_name: "GLP-1 RA",
                base_efficacy: 0.25,
                base_hypo_chance: 0.0,
                min_egfr: None,
                flags: DrugFlags {
                    incretin: true,
                    gi_side_effects: true,
                    ..DrugFlags::NONE
                },
            },
            Drug::Dpp4Inhibitor => DrugSpec {
                display_name: "DPP-4 inhibitor",
                base_efficacy: 0.10,
                base_hypo_chance: 0.0,
                min_egfr: None,
                flags: DrugFlags {
                    incretin: true,
                    renal_sensitive: true,
                    ..DrugFlags::NONE
                },
            },
        }
    }

    pub fn name(self) -> &'static str {
        self.spec().display_name
    }
}

impl fmt::Display for Drug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Interaction-relevant properties of a drug.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DrugFlags {
    /// Carries an intrinsic hypoglycemia risk; blocks passive hypo-risk recovery.
    pub hypoglycemic: bool,
    /// Acts on the incretin pathway.
    pub incretin: bool,
    /// Glucose-lowering efficacy drops at low eGFR.
    pub renal_sensitive: bool,
    /// Softens kidney threats and eGFR decay.
    pub kidney_shield: bool,
    /// Can trigger a gastrointestinal distress window.
    pub gi_side_effects: bool,
}

impl DrugFlags {
    pub const NONE: DrugFlags = DrugFlags {
        hypoglycemic: false,
        incretin: false,
        renal_sensitive: false,
        kidney_shield: false,
        gi_side_effects: false,
    };
}

/// Static pharmacology for one drug.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrugSpec {
    pub display_name: &'static str,
    /// HbA1c reduction per second at full adherence.
    pub base_efficacy: f32,
    /// Chance per second of scheduling a hypoglycemia event.
    pub base_hypo_chance: f32,
    /// Activation requires eGFR at or above this value.
    pub min_egfr: Option<f32>,
    pub flags: DrugFlags,
}

/// Metformin is contraindicated below this eGFR.
pub const METFORMIN_MIN_EGFR: f32 = 30.0;

/// Below this eGFR renal-sensitive drugs lose glucose-lowering efficacy.
pub const RENAL_EFFICACY_EGFR: f32 = 45.0;

/// Efficacy multiplier for renal-sensitive drugs below [`RENAL_EFFICACY_EGFR`].
pub const RENAL_EFFICACY_MULT: f32 = 0.5;

/// Hypo-chance multiplier when sulfonylurea and insulin are both active.
pub const SU_INSULIN_HYPO_MULT: f32 = 2.0;

/// Sulfonylurea hypo-chance multiplier under food insecurity (level 4).
pub const FOOD_INSECURITY_HYPO_MULT: f32 = 3.0;

/// Efficacy of `drug` after interaction adjustments, before adherence and GI
/// scaling.
pub fn effective_efficacy(drug: Drug, active: &BTreeSet<Drug>, egfr: f32) -> f32 {
    let spec = drug.spec();

    // Same incretin pathway: DPP-4 adds nothing on top of GLP-1
    if drug == Drug::Dpp4Inhibitor && active.contains(&Drug::Glp1Agonist) {
        return 0.0;
    }

    let mut efficacy = spec.base_efficacy;
    if spec.flags.renal_sensitive && egfr < RENAL_EFFICACY_EGFR {
        efficacy *= RENAL_EFFICACY_MULT;
    }
    efficacy
}

/// Per-second hypoglycemia chance of `drug` after interaction adjustments.
pub fn effective_hypo_chance(drug: Drug, active: &BTreeSet<Drug>, level: u8) -> f32 {
    let mut chance = drug.spec().base_hypo_chance;

    if active.contains(&Drug::Sulfonylurea) && active.contains(&Drug::Insulin) {
        chance *= SU_INSULIN_HYPO_MULT;
    }
    if drug == Drug::Sulfonylurea && level == 4 {
        chance *= FOOD_INSECURITY_HYPO_MULT;
    }
    chance
}

/// Whether any active drug carries intrinsic hypoglycemia risk.
pub fn any_hypoglycemic(active: &BTreeSet<Drug>) -> bool {
    active.iter().any(|d| d.spec().flags.hypoglycemic)
}
