use crate::config::SimConfig;
use crate::input::Command;
use crate::observer::GameEvent;
use crate::state::{Phase, UnitId, WorldState};
use crate::systems::{self, combat::CasualtySelector};
use thiserror::Error;
use tracing::instrument;
use wardata::{FactionId, Rules, TerritoryId, TerritoryKind, UnitTypeId};

/// A command was refused. The state it was issued against is unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ActionError {
    #[error("Unknown territory '{0}'")]
    UnknownTerritory(TerritoryId),
    #[error("Unknown unit {0}")]
    UnknownUnit(UnitId),
    #[error("Unknown unit type '{0}'")]
    UnknownUnitType(UnitTypeId),
    #[error("Unknown faction '{0}'")]
    UnknownFaction(FactionId),
    #[error("Unknown victory rule '{0}'")]
    UnknownVictoryRule(String),
    #[error("Unit {unit} is not in {territory}")]
    UnitNotInTerritory { unit: UnitId, territory: TerritoryId },
    #[error("Unit {0} listed more than once")]
    DuplicateUnit(UnitId),
    #[error("No units given")]
    NoUnits,
    #[error("{from} is not adjacent to {to}")]
    NotAdjacent { from: TerritoryId, to: TerritoryId },
    #[error("Unit {0} has no movement left")]
    NoMovementLeft(UnitId),
    #[error("Unit {unit} cannot enter {territory}")]
    DomainMismatch { unit: UnitId, territory: TerritoryId },
    #[error("{territory} is not a {expected:?} territory")]
    WrongTerritoryKind {
        territory: TerritoryId,
        expected: TerritoryKind,
    },
    #[error("'{command}' is not allowed during {phase}")]
    WrongPhase { command: &'static str, phase: Phase },
    #[error("It is not {0}'s turn")]
    NotActiveFaction(FactionId),
    #[error("Unit {0} cannot be moved by the active faction in this phase")]
    NotControllable(UnitId),
    #[error("Cannot enter hostile {0} outside combat move")]
    HostileDestination(TerritoryId),
    #[error("Unit {0} is committed to a battle")]
    AlreadyCommitted(UnitId),
    #[error("Enemy units present in {0}")]
    EnemyUnitsPresent(TerritoryId),
    #[error("Unit {0} cannot be carried")]
    NotCargo(UnitId),
    #[error("No friendly transport in {0}")]
    NoTransport(TerritoryId),
    #[error("Insufficient transport capacity: requested {requested}, available {available}")]
    InsufficientCapacity { requested: usize, available: usize },
    #[error("No cargo to unload in {0}")]
    NoCargo(TerritoryId),
    #[error("Count must be at least 1")]
    InvalidCount,
    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: u32, available: u32 },
    #[error("Purchase queue for {0} is too large")]
    QueueOverflow(String),
    #[error("{0} has no factory")]
    NotAFactory(TerritoryId),
    #[error("{territory} is not owned by {faction}")]
    NotOwned {
        territory: TerritoryId,
        faction: FactionId,
    },
    #[error("{0} has nothing queued")]
    NothingToPlace(FactionId),
    #[error("No free sea zone next to {0} for ships")]
    NoSeaZone(TerritoryId),
    #[error("No pending battle in {0}")]
    BattleNotFound(TerritoryId),
    #[error("The game is over")]
    GameOver,
    #[error("This scenario has no victory point track")]
    VictoryPointsUnavailable,
}

/// Run one command against `state`.
///
/// Events describing the changes are appended to `events`. On error the
/// state may be partially modified; callers that need all-or-nothing
/// semantics run commands against a clone (see [`crate::Game`]).
///
/// Manual casualty selection applies only when `auto_casualties` is off and
/// a selector is supplied.
#[instrument(skip_all, name = "command", fields(cmd = cmd.name()))]
pub fn execute_command(
    state: &mut WorldState,
    rules: &Rules,
    config: &SimConfig,
    cmd: &Command,
    selector: Option<&mut dyn CasualtySelector>,
    events: &mut Vec<GameEvent>,
) -> Result<(), ActionError> {
    if state.winner.is_some() {
        return Err(ActionError::GameOver);
    }
    log::debug!(
        "{} [{} {}]: {:?}",
        state.active_faction(rules),
        state.round,
        state.phase,
        cmd
    );

    match cmd {
        Command::MoveUnits { units, from, to } => {
            systems::movement::move_units(state, rules, units, from, to, events)
        }
        Command::LoadCargo { land, sea, units } => {
            systems::movement::load_cargo(state, rules, land, sea, units, events)
        }
        Command::UnloadCargo { sea, land } => {
            systems::movement::unload_cargo(state, rules, sea, land, events)
        }
        Command::Purchase {
            faction,
            unit_type,
            count,
        } => systems::economy::purchase(state, rules, faction, unit_type, *count, events),
        Command::ClearPurchases { faction } => {
            systems::economy::clear_purchases(state, rules, faction, events)
        }
        Command::PlacePurchase { faction, territory } => {
            systems::economy::place_purchase(state, rules, faction, territory, events)
        }
        Command::ResolveBattles { auto_casualties } => {
            let mut auto = systems::combat::AutoCasualties;
            let selector = pick_selector(*auto_casualties, selector, &mut auto);
            systems::combat::resolve_all_battles(state, rules, config, selector, events)
                .map(|_| ())
        }
        Command::ResolveBattle {
            territory,
            auto_casualties,
        } => {
            let mut auto = systems::combat::AutoCasualties;
            let selector = pick_selector(*auto_casualties, selector, &mut auto);
            systems::combat::resolve_single(state, rules, config, territory, selector, events)
                .map(|_| ())
        }
        Command::EndPhase => systems::turn::end_phase(state, rules, config, events),
        Command::SetVictoryRule { rule } => {
            systems::victory::set_victory_rule(state, rules, rule, events)
        }
        Command::SetVictoryPoints { enabled } => {
            systems::victory::set_victory_points(state, rules, *enabled, events)
        }
    }
}

fn pick_selector<'a, 'b>(
    auto_casualties: bool,
    manual: Option<&'a mut (dyn CasualtySelector + 'b)>,
    auto: &'a mut systems::combat::AutoCasualties,
) -> &'a mut (dyn CasualtySelector + 'b) {
    match manual {
        Some(selector) if !auto_casualties => selector,
        None if !auto_casualties => {
            log::debug!("Manual casualties requested without a selector; using automatic choice");
            auto
        }
        _ => auto,
    }
}

/// Reject a command unless the game is in `phase`.
pub(crate) fn require_phase(
    state: &WorldState,
    command: &'static str,
    phase: Phase,
) -> Result<(), ActionError> {
    if state.phase != phase {
        return Err(ActionError::WrongPhase {
            command,
            phase: state.phase,
        });
    }
    Ok(())
}

/// Reject a command naming a faction other than the one whose turn it is.
pub(crate) fn require_active(
    state: &WorldState,
    rules: &Rules,
    faction: &str,
) -> Result<(), ActionError> {
    if rules.faction(faction).is_none() {
        return Err(ActionError::UnknownFaction(faction.to_string()));
    }
    if state.active_faction(rules) != faction {
        return Err(ActionError::NotActiveFaction(faction.to_string()));
    }
    Ok(())
}

#[cfg(test)]
#[path = "step_tests.rs"]
mod tests;
