//! Pure simulation rules for GlucoGuard.
//!
//! This crate holds the patient-physiology model behind the type-2 diabetes
//! pharmacology game, independent of any engine, renderer or network. Functions
//! take plain data (and a caller-owned RNG where rolls are involved) and mutate
//! or return it, so every rule is unit-testable and replays exactly under a
//! fixed seed.
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`debrief`] | End-of-session payload and preceptor prompt rendering |
//! | [`decisions`] | Append-only log of prescribing decisions |
//! | [`drugs`] | Drug catalog and interaction adjustments |
//! | [`guidelines`] | Per-level ADA/EASD 2022 teaching context |
//! | [`level`] | Level configuration and validation |
//! | [`outcome`] | Win/loss thresholds and the stable-time accumulator |
//! | [`patient`] | Clamped clinical state |
//! | [`scheduler`] | Periodic and one-shot timers advanced by `dt` |
//! | [`spawner`] | Threat timetable and arrival effects |
//! | [`tick`] | Per-tick drift, decay, adherence, GI and drug effects |
//! | [`toggle`] | Activation guards, advisories, forced stops |

pub mod debrief;
pub mod decisions;
pub mod drugs;
pub mod guidelines;
pub mod level;
pub mod outcome;
pub mod patient;
pub mod scheduler;
pub mod spawner;
pub mod tick;
pub mod toggle;
