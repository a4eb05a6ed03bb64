use crate::state::UnitId;
use serde::{Deserialize, Serialize};
use wardata::{FactionId, TerritoryId, UnitTypeId};

/// Player commands. One JSON object per command in scripts:
///
/// ```json
/// {"command":"move_units","units":[4,5],"from":"RedField","to":"BlueField"}
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    // Movement
    MoveUnits {
        units: Vec<UnitId>,
        from: TerritoryId,
        to: TerritoryId,
    },
    LoadCargo {
        land: TerritoryId,
        sea: TerritoryId,
        units: Vec<UnitId>,
    },
    UnloadCargo {
        sea: TerritoryId,
        land: TerritoryId,
    },

    // Economy
    Purchase {
        faction: FactionId,
        unit_type: UnitTypeId,
        count: u32,
    },
    ClearPurchases {
        faction: FactionId,
    },
    PlacePurchase {
        faction: FactionId,
        territory: TerritoryId,
    },

    // Combat
    ResolveBattles {
        #[serde(default = "default_auto")]
        auto_casualties: bool,
    },
    ResolveBattle {
        territory: TerritoryId,
        #[serde(default = "default_auto")]
        auto_casualties: bool,
    },

    // Flow
    EndPhase,

    // Meta
    SetVictoryRule {
        rule: String,
    },
    SetVictoryPoints {
        enabled: bool,
    },
}

fn default_auto() -> bool {
    true
}

impl Command {
    /// Short name used in phase errors and logs.
    pub fn name(&self) -> &'static str {
        match self {
            Command::MoveUnits { .. } => "move_units",
            Command::LoadCargo { .. } => "load_cargo",
            Command::UnloadCargo { .. } => "unload_cargo",
            Command::Purchase { .. } => "purchase",
            Command::ClearPurchases { .. } => "clear_purchases",
            Command::PlacePurchase { .. } => "place_purchase",
            Command::ResolveBattles { .. } => "resolve_battles",
            Command::ResolveBattle { .. } => "resolve_battle",
            Command::EndPhase => "end_phase",
            Command::SetVictoryRule { .. } => "set_victory_rule",
            Command::SetVictoryPoints { .. } => "set_victory_points",
        }
    }
}
