//! Systems - logic that operates on components

mod threats;

pub use threats::*;
