//! Level configuration - starting patient, pharmacy, and threat pacing.
//!
//! Each of the four levels is a scenario: a patient profile, a formulary of
//! drugs the player may prescribe, and how fast threats arrive. Configs are
//! plain serde data so a level can be loaded from JSON and validated before a
//! session starts.
//!
//! ```
//! use glucoguard_logic::level::{validate_config, LevelConfig};
//!
//! let config = LevelConfig::for_level(2).unwrap();
//! assert!(validate_config(&config).is_empty());
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::drugs::Drug;
use crate::patient::{EGFR_MAX, EGFR_MIN, HBA1C_MAX, HBA1C_MIN};

pub const MIN_LEVEL: u8 = 1;
pub const MAX_LEVEL: u8 = 4;

/// Who the player is treating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientProfile {
    pub name: String,
    pub history: String,
}

/// Tunables for one level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelConfig {
    /// Level number, 1–4. Drives the level-specific rules (eGFR decay,
    /// adherence, win gates).
    pub level: u8,
    pub title: String,
    pub profile: PatientProfile,
    pub start_hba1c: f32,
    pub start_egfr: f32,
    /// Seconds between glucose threats.
    pub glucose_period: f32,
    /// Seconds between kidney threats (level 2 and up).
    pub kidney_period: f32,
    /// Distance a threat travels before reaching the patient.
    pub lane_length: f32,
    /// Threat travel speed, lane units per second.
    pub threat_speed: f32,
    /// Drugs offered at this level.
    pub formulary: Vec<Drug>,
    /// Drug on the formulary that insurance refuses to cover.
    pub coverage_denied: Option<Drug>,
}

impl LevelConfig {
    /// Built-in configuration for `level`, or `None` outside 1–4.
    pub fn for_level(level: u8) -> Option<Self> {
        let all = Drug::all().to_vec();
        let config = match level {
            1 => Self {
                level,
                title: "Glycemic Basics".into(),
                profile: PatientProfile {
                    name: "Mr. Alvarez".into(),
                    history: "New-onset T2DM, no complications".into(),
                },
                start_hba1c: 8.5,
                start_egfr: 90.0,
                glucose_period: 4.0,
                kidney_period: 7.5,
                formulary: vec![Drug::Metformin, Drug::Insulin, Drug::Sulfonylurea],
                coverage_denied: None,
                ..Self::base()
            },
            2 => Self {
                level,
                title: "The Kidney Gate".into(),
                profile: PatientProfile {
                    name: "Mrs. Okafor".into(),
                    history: "T2DM with stage 3a CKD".into(),
                },
                start_hba1c: 8.8,
                start_egfr: 52.0,
                glucose_period: 3.5,
                kidney_period: 7.5,
                formulary: vec![Drug::Metformin, Drug::Insulin, Drug::Sglt2Inhibitor],
                coverage_denied: None,
                ..Self::base()
            },
            3 => Self {
                level,
                title: "Full Pharmacy".into(),
                profile: PatientProfile {
                    name: "Mr. Lindqvist".into(),
                    history: "Long-standing T2DM, CKD stage 3a, obesity".into(),
                },
                start_hba1c: 9.2,
                start_egfr: 48.0,
                glucose_period: 3.0,
                kidney_period: 7.5,
                formulary: all,
                coverage_denied: None,
                ..Self::base()
            },
            4 => Self {
                level,
                title: "The Real Patient".into(),
                profile: PatientProfile {
                    name: "Ms. Nguyen".into(),
                    history: "T2DM; recent immigrant, no drug coverage, food insecurity, \
                              limited English"
                        .into(),
                },
                start_hba1c: 9.0,
                start_egfr: 60.0,
                glucose_period: 3.0,
                kidney_period: 7.5,
                formulary: all,
                coverage_denied: Some(Drug::Glp1Agonist),
                ..Self::base()
            },
            _ => return None,
        };
        Some(config)
    }

    fn base() -> Self {
        Self {
            level: MIN_LEVEL,
            title: String::new(),
            profile: PatientProfile {
                name: String::new(),
                history: String::new(),
            },
            start_hba1c: 8.5,
            start_egfr: 90.0,
            glucose_period: 4.0,
            kidney_period: 7.5,
            lane_length: 800.0,
            threat_speed: 500.0,
            formulary: Vec::new(),
            coverage_denied: None,
        }
    }

    /// Kidney threats and eGFR decay only exist from level 2.
    pub fn has_kidney_model(&self) -> bool {
        self.level >= 2
    }

    /// Adherence is only simulated on level 4.
    pub fn has_adherence_model(&self) -> bool {
        self.level == 4
    }

    /// Food insecurity amplifies sulfonylurea hypoglycemia on level 4.
    pub fn has_food_insecurity(&self) -> bool {
        self.level == 4
    }

    pub fn offers(&self, drug: Drug) -> bool {
        self.formulary.contains(&drug)
    }

    /// Seconds a threat spends in the lane before arriving.
    pub fn travel_time(&self) -> f32 {
        self.lane_length / self.threat_speed
    }
}

impl Default for LevelConfig {
    fn default() -> Self {
        // Level 1 always exists
        Self::for_level(MIN_LEVEL).unwrap_or_else(Self::base)
    }
}

/// Level configuration problems.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Level number outside 1–4.
    InvalidLevel(u8),
    /// Starting HbA1c outside the clamped range.
    StartHba1cOutOfRange(f32),
    /// Starting eGFR outside the clamped range.
    StartEgfrOutOfRange(f32),
    /// Glucose spawn period must be positive.
    InvalidGlucosePeriod(f32),
    /// Kidney spawn period must be positive.
    InvalidKidneyPeriod(f32),
    /// Lane length and threat speed must both be positive.
    InvalidLane { length: f32, speed: f32 },
    /// Formulary has no drugs.
    EmptyFormulary,
    /// Coverage-denied drug is not on the formulary.
    DeniedDrugNotOffered(Drug),
    EmptyPatientName,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidLevel(l) => {
                write!(f, "level {l} is not between {MIN_LEVEL} and {MAX_LEVEL}")
            }
            ConfigError::StartHba1cOutOfRange(v) => {
                write!(f, "starting HbA1c {v} outside {HBA1C_MIN}..={HBA1C_MAX}")
            }
            ConfigError::StartEgfrOutOfRange(v) => {
                write!(f, "starting eGFR {v} outside {EGFR_MIN}..={EGFR_MAX}")
            }
            ConfigError::InvalidGlucosePeriod(v) => write!(f, "glucose period {v} must be > 0"),
            ConfigError::InvalidKidneyPeriod(v) => write!(f, "kidney period {v} must be > 0"),
            ConfigError::InvalidLane { length, speed } => {
                write!(f, "lane length {length} and speed {speed} must be > 0")
            }
            ConfigError::EmptyFormulary => write!(f, "formulary is empty"),
            ConfigError::DeniedDrugNotOffered(d) => {
                write!(f, "coverage-denied drug {d} is not on the formulary")
            }
            ConfigError::EmptyPatientName => write!(f, "patient name is empty"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Validate a level configuration. Returns every problem found.
pub fn validate_config(config: &LevelConfig) -> Vec<ConfigError> {
    let mut errors = Vec::new();

    if !(MIN_LEVEL..=MAX_LEVEL).contains(&config.level) {
        errors.push(ConfigError::InvalidLevel(config.level));
    }
    if !(HBA1C_MIN..=HBA1C_MAX).contains(&config.start_hba1c) {
        errors.push(ConfigError::StartHba1cOutOfRange(config.start_hba1c));
    }
    if !(EGFR_MIN..=EGFR_MAX).contains(&config.start_egfr) {
        errors.push(ConfigError::StartEgfrOutOfRange(config.start_egfr));
    }
    if !(config.glucose_period > 0.0) {
        errors.push(ConfigError::InvalidGlucosePeriod(config.glucose_period));
    }
    if config.has_kidney_model() && !(config.kidney_period > 0.0) {
        errors.push(ConfigError::InvalidKidneyPeriod(config.kidney_period));
    }
    if !(config.lane_length > 0.0) || !(config.threat_speed > 0.0) {
        errors.push(ConfigError::InvalidLane {
            length: config.lane_length,
            speed: config.threat_speed,
        });
    }
    if config.formulary.is_empty() {
        errors.push(ConfigError::EmptyFormulary);
    }
    if let Some(denied) = config.coverage_denied {
        if !config.offers(denied) {
            errors.push(ConfigError::DeniedDrugNotOffered(denied));
        }
    }
    if config.profile.name.trim().is_empty() {
        errors.push(ConfigError::EmptyPatientName);
    }

    errors
}

/// Validate and return the first problem, for callers that need a usable config.
pub fn check_config(config: &LevelConfig) -> Result<(), ConfigError> {
    match validate_config(config).into_iter().next() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
