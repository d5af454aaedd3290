//! Append-only log of prescribing decisions, read once at session end.

use serde::{Deserialize, Serialize};

use crate::drugs::Drug;
use crate::patient::Vitals;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToggleAction {
    On,
    Off,
}

/// One start or stop, with the vitals at that moment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionLogEntry {
    /// Session seconds when the decision was made.
    pub time_seconds: f64,
    pub drug: Drug,
    pub action: ToggleAction,
    /// Stopped by the system rather than the player.
    pub forced: bool,
    pub vitals: Vitals,
    /// Only recorded where adherence is simulated.
    pub adherence: Option<f32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecisionLog {
    entries: Vec<DecisionLogEntry>,
}

impl DecisionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, entry: DecisionLogEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[DecisionLogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
