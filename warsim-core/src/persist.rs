//! Save and restore the full world state, dice included.

use crate::invariants::{check_invariants, InvariantViolation};
use crate::state::WorldState;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use wardata::{defines, Rules};

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("Save data is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Unsupported save format version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },
    #[error("Save is for scenario '{save}', rules are '{rules}'")]
    ScenarioMismatch { save: String, rules: String },
    #[error("Saved state is inconsistent: {0}")]
    Invalid(InvariantViolation),
}

#[derive(Serialize)]
struct SaveGameRef<'a> {
    format_version: u32,
    scenario: &'a str,
    state: &'a WorldState,
}

#[derive(Deserialize)]
struct SaveGame {
    format_version: u32,
    scenario: String,
    state: WorldState,
}

/// Serialize a world state into a versioned save blob.
pub fn save_state(state: &WorldState) -> Result<Vec<u8>, PersistError> {
    let save = SaveGameRef {
        format_version: defines::save::FORMAT_VERSION,
        scenario: &state.scenario,
        state,
    };
    Ok(serde_json::to_vec(&save)?)
}

/// Restore a world state saved by [`save_state`], checking it against the
/// rules it will be played with.
pub fn load_state(rules: &Rules, bytes: &[u8]) -> Result<WorldState, PersistError> {
    let save: SaveGame = serde_json::from_slice(bytes)?;
    if save.format_version != defines::save::FORMAT_VERSION {
        return Err(PersistError::UnsupportedVersion {
            found: save.format_version,
            expected: defines::save::FORMAT_VERSION,
        });
    }
    if save.scenario != rules.name() || save.state.scenario != rules.name() {
        return Err(PersistError::ScenarioMismatch {
            save: save.scenario,
            rules: rules.name().to_string(),
        });
    }
    if let Some(violation) = check_invariants(&save.state, rules).into_iter().next() {
        return Err(PersistError::Invalid(violation));
    }
    log::info!(
        "Loaded '{}' round {} ({} units, {} dice drawn)",
        save.scenario,
        save.state.round,
        save.state.units.len(),
        save.state.rng.draws()
    );
    Ok(save.state)
}
