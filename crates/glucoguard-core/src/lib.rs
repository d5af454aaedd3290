//! GlucoGuard Core - Session Engine
//!
//! Runs one level of the diabetes-management simulation: the patient model
//! from `glucoguard-logic`, a seeded RNG, the threat spawner, and player
//! drug toggles, all advanced by a single `update(dt)` call.
//!
//! # Architecture
//!
//! Threats in flight live in an ECS world via `hecs`:
//! - **Entities**: threats travelling the lane toward the patient
//! - **Components**: `Threat`, `LanePosition`, `Velocity`
//! - **Systems**: movement along the lane and arrival detection
//!
//! Everything else (patient state, rules, outcome) is plain data owned by
//! [`engine::SimulationEngine`].
//!
//! # Example
//!
//! ```rust,no_run
//! use glucoguard_core::prelude::*;
//!
//! let mut engine = SimulationEngine::for_level(1, 42).unwrap();
//! engine.toggle_drug(Drug::Metformin, true);
//!
//! while engine.outcome().is_none() {
//!     engine.update(1.0 / 60.0); // 60 FPS
//!     for notice in engine.drain_notices() {
//!         println!("{notice}");
//!     }
//! }
//! ```

pub mod components;
pub mod debrief;
pub mod engine;
pub mod notices;
pub mod systems;

/// Commonly used types for convenient importing
pub mod prelude {
    pub use crate::components::*;
    pub use crate::debrief::{request_debrief, DebriefError, DebriefService};
    pub use crate::engine::SimulationEngine;
    pub use crate::notices::Notice;
    pub use glucoguard_logic::drugs::Drug;
    pub use glucoguard_logic::level::LevelConfig;
    pub use glucoguard_logic::outcome::Outcome;
    pub use glucoguard_logic::toggle::ToggleOutcome;
}
