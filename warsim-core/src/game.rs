//! The `Game` facade: one scenario, one world state, one command at a time.
//!
//! Commands run against a copy of the state; the copy replaces the live
//! state only if the command succeeds and the invariants still hold. Events
//! go to observers after the commit.

use crate::config::SimConfig;
use crate::input::Command;
use crate::invariants::{check_invariants, InvariantViolation};
use crate::observer::{GameEvent, LoggedEvent, ObserverRegistry, SimObserver};
use crate::persist::{self, PersistError};
use crate::state::{PendingBattle, Phase, PurchaseEntry, Unit, UnitId, Victory, WorldState};
use crate::step::{execute_command, ActionError};
use crate::systems::combat::CasualtySelector;
use thiserror::Error;
use wardata::{FactionId, Rules, TerritoryId, UnitTypeId};

#[derive(Debug, Error)]
pub enum CommandError {
    /// Illegal command; nothing changed.
    #[error(transparent)]
    Rejected(#[from] ActionError),
    /// The command broke a world invariant. The game is halted.
    #[error("{0}")]
    Invariant(InvariantViolation),
    /// An earlier command broke an invariant.
    #[error("Game halted: {0}")]
    Halted(InvariantViolation),
}

/// Owner and units of one territory at a point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct TerritoryView {
    pub id: TerritoryId,
    pub owner: Option<FactionId>,
    /// Stack order; units carried by transports are listed in their
    /// transport's `cargo`.
    pub units: Vec<Unit>,
}

pub struct Game {
    rules: Rules,
    config: SimConfig,
    state: WorldState,
    observers: ObserverRegistry,
    selector: Option<Box<dyn CasualtySelector + Send>>,
    halted: Option<InvariantViolation>,
}

impl Game {
    /// Start a scenario from its setup.
    pub fn new(rules: Rules, config: SimConfig, seed: u64) -> Self {
        let state = WorldState::from_rules(&rules, seed);
        Self::from_state(rules, config, state)
    }

    /// Wrap an existing state. The caller vouches for its consistency.
    pub fn from_state(rules: Rules, config: SimConfig, state: WorldState) -> Self {
        Self {
            rules,
            config,
            state,
            observers: ObserverRegistry::new(),
            selector: None,
            halted: None,
        }
    }

    /// Restore a game from [`Game::serialize`] output.
    pub fn deserialize(rules: Rules, config: SimConfig, blob: &[u8]) -> Result<Self, PersistError> {
        let state = persist::load_state(&rules, blob)?;
        Ok(Self::from_state(rules, config, state))
    }

    pub fn serialize(&self) -> Result<Vec<u8>, PersistError> {
        persist::save_state(&self.state)
    }

    pub fn register_observer(&mut self, observer: Box<dyn SimObserver>) {
        self.observers.register(observer);
    }

    /// Casualty chooser used when a battle command asks for manual casualties.
    pub fn set_casualty_selector(&mut self, selector: Box<dyn CasualtySelector + Send>) {
        self.selector = Some(selector);
    }

    /// Run one command. On success returns the events it produced.
    pub fn apply(&mut self, cmd: &Command) -> Result<Vec<LoggedEvent>, CommandError> {
        if let Some(violation) = &self.halted {
            return Err(CommandError::Halted(violation.clone()));
        }

        let round = self.state.round;
        let faction = self.state.active_faction(&self.rules).clone();
        let phase = self.state.phase;

        let mut next = self.state.clone();
        let mut events: Vec<GameEvent> = Vec::new();
        let selector = self
            .selector
            .as_mut()
            .map(|s| s.as_mut() as &mut dyn CasualtySelector);
        if let Err(e) = execute_command(
            &mut next,
            &self.rules,
            &self.config,
            cmd,
            selector,
            &mut events,
        ) {
            log::debug!("Rejected {}: {}", cmd.name(), e);
            return Err(e.into());
        }

        if self.config.check_invariants {
            if let Some(violation) = check_invariants(&next, &self.rules).into_iter().next() {
                log::error!("{} broke the world: {}", cmd.name(), violation);
                self.halted = Some(violation.clone());
                return Err(CommandError::Invariant(violation));
            }
        }

        self.state = next;
        let logged: Vec<LoggedEvent> = events
            .into_iter()
            .map(|event| LoggedEvent {
                round,
                faction: faction.clone(),
                phase,
                event,
            })
            .collect();
        self.observers.notify(&logged);
        Ok(logged)
    }

    pub fn move_units(
        &mut self,
        units: &[UnitId],
        from: &str,
        to: &str,
    ) -> Result<Vec<LoggedEvent>, CommandError> {
        self.apply(&Command::MoveUnits {
            units: units.to_vec(),
            from: from.to_string(),
            to: to.to_string(),
        })
    }

    pub fn load_cargo(
        &mut self,
        land: &str,
        sea: &str,
        units: &[UnitId],
    ) -> Result<Vec<LoggedEvent>, CommandError> {
        self.apply(&Command::LoadCargo {
            land: land.to_string(),
            sea: sea.to_string(),
            units: units.to_vec(),
        })
    }

    pub fn unload_cargo(
        &mut self,
        sea: &str,
        land: &str,
    ) -> Result<Vec<LoggedEvent>, CommandError> {
        self.apply(&Command::UnloadCargo {
            sea: sea.to_string(),
            land: land.to_string(),
        })
    }

    pub fn purchase(
        &mut self,
        faction: &str,
        unit_type: &str,
        count: u32,
    ) -> Result<Vec<LoggedEvent>, CommandError> {
        self.apply(&Command::Purchase {
            faction: faction.to_string(),
            unit_type: UnitTypeId::from(unit_type),
            count,
        })
    }

    pub fn clear_purchases(&mut self, faction: &str) -> Result<Vec<LoggedEvent>, CommandError> {
        self.apply(&Command::ClearPurchases {
            faction: faction.to_string(),
        })
    }

    pub fn place_purchase(
        &mut self,
        faction: &str,
        territory: &str,
    ) -> Result<Vec<LoggedEvent>, CommandError> {
        self.apply(&Command::PlacePurchase {
            faction: faction.to_string(),
            territory: territory.to_string(),
        })
    }

    /// Advance one phase. When this reaches a victory the phase stays at
    /// Collect Income and every later command is rejected.
    pub fn end_phase(&mut self) -> Result<Vec<LoggedEvent>, CommandError> {
        self.apply(&Command::EndPhase)
    }

    pub fn resolve_battles(
        &mut self,
        auto_casualties: bool,
    ) -> Result<Vec<LoggedEvent>, CommandError> {
        self.apply(&Command::ResolveBattles { auto_casualties })
    }

    pub fn resolve_battle(
        &mut self,
        territory: &str,
        auto_casualties: bool,
    ) -> Result<Vec<LoggedEvent>, CommandError> {
        self.apply(&Command::ResolveBattle {
            territory: territory.to_string(),
            auto_casualties,
        })
    }

    pub fn set_victory_rule(&mut self, rule: &str) -> Result<Vec<LoggedEvent>, CommandError> {
        self.apply(&Command::SetVictoryRule {
            rule: rule.to_string(),
        })
    }

    pub fn set_victory_points(&mut self, enabled: bool) -> Result<Vec<LoggedEvent>, CommandError> {
        self.apply(&Command::SetVictoryPoints { enabled })
    }

    // Queries

    pub fn rules(&self) -> &Rules {
        &self.rules
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn state(&self) -> &WorldState {
        &self.state
    }

    pub fn current_faction(&self) -> &FactionId {
        self.state.active_faction(&self.rules)
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn round(&self) -> u32 {
        self.state.round
    }

    pub fn territory(&self, id: &str) -> Option<TerritoryView> {
        let t = self.state.territories.get(id)?;
        Some(TerritoryView {
            id: id.to_string(),
            owner: t.owner.clone(),
            units: self.state.stack(id).cloned().collect(),
        })
    }

    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.state.units.get(&id)
    }

    pub fn treasury(&self, faction: &str) -> u32 {
        self.state.treasury_of(faction)
    }

    pub fn pending_battles(&self) -> &[PendingBattle] {
        &self.state.battles
    }

    pub fn purchase_queue(&self, faction: &str) -> &[PurchaseEntry] {
        self.state
            .purchases
            .get(faction)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Income the faction would collect right now.
    pub fn income_preview(&self, faction: &str) -> u32 {
        self.state.income_of(&self.rules, faction)
    }

    pub fn winner(&self) -> Option<&Victory> {
        self.state.winner.as_ref()
    }

    pub fn checksum(&self) -> u64 {
        self.state.checksum()
    }

    pub fn is_halted(&self) -> bool {
        self.halted.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::systems::combat::{CasualtyCandidate, Side};
    use crate::testing::{skirmish_rules, WorldStateBuilder};

    fn game_with(state: WorldState) -> Game {
        Game::from_state(skirmish_rules(), SimConfig::default(), state)
    }

    #[test]
    fn test_rejected_command_leaves_state() {
        let rules = skirmish_rules();
        let state = WorldStateBuilder::new(&rules)
            .turn("Red", Phase::CombatMove)
            .with_units("RedHome", "Red", "inf", 1)
            .build();
        let mut game = game_with(state);
        let before = game.checksum();

        let err = game.move_units(&[1], "RedHome", "WestSea").unwrap_err();

        assert!(matches!(
            err,
            CommandError::Rejected(ActionError::DomainMismatch { .. })
        ));
        assert_eq!(game.checksum(), before);
        assert!(!game.is_halted());
    }

    #[test]
    fn test_events_are_stamped_with_issuing_context() {
        let rules = skirmish_rules();
        let state = WorldStateBuilder::new(&rules)
            .turn("Red", Phase::CollectIncome)
            .build();
        let mut game = game_with(state);

        let events = game.end_phase().unwrap();

        assert!(events
            .iter()
            .all(|e| e.phase == Phase::CollectIncome && e.faction == "Red" && e.round == 1));
        assert_eq!(game.current_faction(), "Blue");
        assert_eq!(game.phase(), Phase::Purchase);
    }

    #[test]
    fn test_game_over_rejects_commands() {
        let rules = skirmish_rules();
        let state = WorldStateBuilder::new(&rules)
            .turn("Red", Phase::CollectIncome)
            .owner("BlueHome", Some("Red"))
            .build();
        let mut game = game_with(state);
        game.end_phase().unwrap();
        assert_eq!(game.winner().map(|w| w.coalition.as_str()), Some("East"));
        assert!(matches!(
            game.end_phase(),
            Err(CommandError::Rejected(ActionError::GameOver))
        ));
    }

    #[test]
    fn test_invariant_violation_halts() {
        let rules = skirmish_rules();
        let mut state = WorldStateBuilder::new(&rules).build();
        // Corrupt the state behind the engine's back.
        state.territories.get_mut("MidSea").unwrap().owner = Some("Blue".into());
        let mut game = game_with(state);

        assert!(matches!(
            game.set_victory_rule("cities"),
            Err(CommandError::Invariant(_))
        ));
        assert!(game.is_halted());
        assert!(matches!(game.end_phase(), Err(CommandError::Halted(_))));
    }

    #[test]
    fn test_manual_casualties_through_selector() {
        struct Newest;
        impl CasualtySelector for Newest {
            fn select(
                &mut self,
                _: &str,
                _: Side,
                hits: u32,
                pool: &[CasualtyCandidate],
            ) -> Vec<UnitId> {
                pool.iter().rev().take(hits as usize).map(|c| c.unit).collect()
            }
        }

        let rules = skirmish_rules();
        let mut state = WorldStateBuilder::new(&rules)
            .seed(8)
            .turn("Red", Phase::ConductCombat)
            .with_units("BlueField", "Blue", "inf", 3)
            .with_units("BlueField", "Red", "inf", 4)
            .build();
        for id in 4..=7 {
            state.units.get_mut(&id).unwrap().committed = true;
        }
        state.battles.push(PendingBattle {
            territory: "BlueField".into(),
            attacker: "Red".into(),
            amphibious_from: None,
        });
        let mut game = game_with(state);
        game.set_casualty_selector(Box::new(Newest));

        game.resolve_battle("BlueField", false).unwrap();

        // Same dice as the automatic run, but the newest attacker fell first.
        let survivors: Vec<UnitId> = game
            .territory("BlueField")
            .unwrap()
            .units
            .iter()
            .map(|u| u.id)
            .collect();
        assert_eq!(survivors, vec![4, 5, 6]);
    }

    #[test]
    fn test_queries() {
        let game = Game::new(wardata::scenario::lite().unwrap(), SimConfig::default(), 3);
        assert_eq!(game.round(), 1);
        assert_eq!(game.current_faction(), "USSR");
        assert_eq!(game.income_preview("UK"), 17);
        assert_eq!(game.treasury("Germany"), 8);
        assert!(game.pending_battles().is_empty());
        assert!(game.purchase_queue("USA").is_empty());
        assert!(game.winner().is_none());
        let moscow = game.territory("MOS").unwrap();
        assert_eq!(moscow.owner.as_deref(), Some("USSR"));
        assert_eq!(moscow.units.len(), 9);
        assert!(game.territory("ATLANTIS").is_none());
    }
}
