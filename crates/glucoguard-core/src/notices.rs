//! Player-facing messages queued by the engine and drained by the UI.

use std::fmt;

use glucoguard_logic::drugs::Drug;
use glucoguard_logic::outcome::Outcome;
use glucoguard_logic::spawner::ThreatKind;
use glucoguard_logic::toggle::{Advisory, BlockReason};

#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    /// Activation went through with a warning.
    Advisory { drug: Drug, advisory: Advisory },
    /// Activation refused.
    Blocked(BlockReason),
    /// Drug stopped by the system because eGFR fell below its floor.
    ForcedStop { drug: Drug, egfr: f32 },
    /// A GI-distress window started.
    GiDistress,
    /// A hypoglycemia threat was released because of this drug.
    HypoScheduled(Drug),
    ThreatArrived(ThreatKind),
    SessionOver(Outcome),
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::Advisory { advisory, .. } => write!(f, "{advisory}"),
            Notice::Blocked(reason) => write!(f, "{reason}"),
            Notice::ForcedStop { drug, egfr } => {
                write!(f, "FORCED STOP: {drug} contraindicated at eGFR {egfr:.1}")
            }
            Notice::GiDistress => write!(f, "GI distress: nausea is reducing drug efficacy"),
            Notice::HypoScheduled(drug) => write!(f, "Hypoglycemia episode ({drug})"),
            Notice::ThreatArrived(kind) => write!(f, "{} hit", kind.label()),
            Notice::SessionOver(outcome) => write!(f, "{outcome}"),
        }
    }
}
