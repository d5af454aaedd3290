//! Threat entities travelling the lane toward the patient.

use glucoguard_logic::spawner::ThreatKind;
use serde::{Deserialize, Serialize};

/// What a threat does on arrival and when it was released.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Threat {
    pub kind: ThreatKind,
    /// Session seconds at release.
    pub spawned_at: f64,
}

/// Distance travelled along the lane, starting at 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LanePosition {
    pub x: f32,
}

/// Lane units per second.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Velocity {
    pub speed: f32,
}
