use serde::{Deserialize, Serialize};
use wardata::defines;

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Rounds fought before a battle is declared a stalemate.
    pub max_battle_rounds: u32,
    /// Run the world invariant checker after every successful command.
    ///
    /// A violation halts the game. Turning this off only saves the scan; it
    /// never changes an outcome.
    pub check_invariants: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            max_battle_rounds: defines::combat::MAX_ROUNDS,
            check_invariants: true,
        }
    }
}
