//! Rule tables for the coalition wargame engine.
//!
//! Scenario files describe factions, unit types, the territory graph,
//! starting setup and victory presets. [`Rules`] is the validated form the
//! simulation consumes.

pub mod adjacency;
pub mod defines;
pub mod error;
pub mod rules;
pub mod scenario;
pub mod types;

pub use adjacency::AdjacencyGraph;
pub use error::RulesError;
pub use rules::Rules;
pub use types::*;
