//! Movement, transport loading and unloading.
//!
//! One hop between adjacent spaces costs one movement point. Validation is
//! split from execution: [`propose_move`] never mutates, [`apply_move`] only
//! runs on an accepted move.

use crate::observer::GameEvent;
use crate::state::{unit_def, unit_domain, PendingBattle, Phase, Unit, UnitId, WorldState};
use crate::step::ActionError;
use std::collections::BTreeSet;
use wardata::{Domain, Rules, TerritoryKind};

/// How an accepted move enters its destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveKind {
    Normal,
    /// Combat-move entry into a hostile space; the unit becomes committed.
    HostileEntry,
}

/// May the active faction move this unit in the current phase?
///
/// Combat move: only the active faction's own units. Noncombat move: any
/// unit of the active faction's coalition.
fn controllable(state: &WorldState, rules: &Rules, unit: &Unit) -> bool {
    let active = state.active_faction(rules);
    match state.phase {
        Phase::CombatMove => &unit.owner == active,
        Phase::NoncombatMove => rules.are_allied(&unit.owner, active),
        _ => false,
    }
}

fn require_movement_phase(state: &WorldState, command: &'static str) -> Result<(), ActionError> {
    if !state.phase.is_movement() {
        return Err(ActionError::WrongPhase {
            command,
            phase: state.phase,
        });
    }
    Ok(())
}

fn require_kind(
    rules: &Rules,
    territory: &str,
    expected: TerritoryKind,
) -> Result<(), ActionError> {
    let def = rules
        .territory(territory)
        .ok_or_else(|| ActionError::UnknownTerritory(territory.to_string()))?;
    if def.kind != expected {
        return Err(ActionError::WrongTerritoryKind {
            territory: territory.to_string(),
            expected,
        });
    }
    Ok(())
}

fn reject_duplicates(units: &[UnitId]) -> Result<(), ActionError> {
    if units.is_empty() {
        return Err(ActionError::NoUnits);
    }
    let mut seen = BTreeSet::new();
    for &id in units {
        if !seen.insert(id) {
            return Err(ActionError::DuplicateUnit(id));
        }
    }
    Ok(())
}

/// Validate a single-hop move without touching the state.
pub fn propose_move(
    state: &WorldState,
    rules: &Rules,
    unit_id: UnitId,
    from: &str,
    to: &str,
) -> Result<MoveKind, ActionError> {
    // (a) existence and location
    if rules.territory(from).is_none() {
        return Err(ActionError::UnknownTerritory(from.to_string()));
    }
    let to_def = rules
        .territory(to)
        .ok_or_else(|| ActionError::UnknownTerritory(to.to_string()))?;
    let unit = state
        .units
        .get(&unit_id)
        .ok_or(ActionError::UnknownUnit(unit_id))?;
    let in_stack = state
        .territories
        .get(from)
        .is_some_and(|t| t.units.contains(&unit_id));
    if !in_stack {
        return Err(ActionError::UnitNotInTerritory {
            unit: unit_id,
            territory: from.to_string(),
        });
    }

    // (b) adjacency
    if !rules.are_adjacent(from, to) {
        return Err(ActionError::NotAdjacent {
            from: from.to_string(),
            to: to.to_string(),
        });
    }

    // (c) budget
    if unit.moves_left == 0 {
        return Err(ActionError::NoMovementLeft(unit_id));
    }

    // (d) domain; land reaches the sea only by loading
    if !unit_domain(rules, unit).can_rest_in(to_def.kind) {
        return Err(ActionError::DomainMismatch {
            unit: unit_id,
            territory: to.to_string(),
        });
    }

    // (e) phase
    let hostile = state.is_hostile(rules, to, &unit.owner);
    let kind = match state.phase {
        Phase::CombatMove => {
            if !controllable(state, rules, unit) {
                return Err(ActionError::NotControllable(unit_id));
            }
            if unit.committed {
                return Err(ActionError::AlreadyCommitted(unit_id));
            }
            if hostile {
                MoveKind::HostileEntry
            } else {
                MoveKind::Normal
            }
        }
        Phase::NoncombatMove => {
            if !controllable(state, rules, unit) {
                return Err(ActionError::NotControllable(unit_id));
            }
            if hostile {
                return Err(ActionError::HostileDestination(to.to_string()));
            }
            MoveKind::Normal
        }
        phase => {
            return Err(ActionError::WrongPhase {
                command: "move_units",
                phase,
            })
        }
    };

    // (f) stacking
    if kind == MoveKind::Normal && state.has_enemy_units(rules, to, &unit.owner) {
        return Err(ActionError::EnemyUnitsPresent(to.to_string()));
    }

    Ok(kind)
}

/// Execute a move that [`propose_move`] accepted.
pub fn apply_move(
    state: &mut WorldState,
    rules: &Rules,
    unit_id: UnitId,
    from: &str,
    to: &str,
    kind: MoveKind,
    events: &mut Vec<GameEvent>,
) {
    if let Some(t) = state.territories.get_mut(from) {
        t.units.retain(|&u| u != unit_id);
    }
    state
        .territories
        .entry(to.to_string())
        .or_default()
        .units
        .push(unit_id);

    let combat = state.phase == Phase::CombatMove;
    let Some(unit) = state.units.get_mut(&unit_id) else {
        return;
    };
    unit.moves_left = unit.moves_left.saturating_sub(1);
    if combat {
        unit.origin = Some(from.to_string());
        if kind == MoveKind::HostileEntry {
            unit.committed = true;
        }
    }
    log::trace!("Unit {} moved {} -> {}", unit_id, from, to);
    events.push(GameEvent::UnitMoved {
        unit: unit_id,
        unit_type: unit.unit_type.clone(),
        owner: unit.owner.clone(),
        from: from.to_string(),
        to: to.to_string(),
        moves_left: unit.moves_left,
        committed: unit.committed,
    });
    let owner = unit.owner.clone();

    if combat && state.is_contested(rules, to) {
        queue_battle(state, to, &owner, None, events);
    }
}

/// Create or update the pending battle for a territory.
pub(crate) fn queue_battle(
    state: &mut WorldState,
    territory: &str,
    attacker: &str,
    amphibious_from: Option<&str>,
    events: &mut Vec<GameEvent>,
) {
    if let Some(existing) = state.battles.iter_mut().find(|b| b.territory == territory) {
        existing.attacker = attacker.to_string();
        if let Some(sea) = amphibious_from {
            existing.amphibious_from = Some(sea.to_string());
        }
        return;
    }
    log::debug!("Battle queued in {} (attacker {})", territory, attacker);
    state.battles.push(PendingBattle {
        territory: territory.to_string(),
        attacker: attacker.to_string(),
        amphibious_from: amphibious_from.map(str::to_string),
    });
    events.push(GameEvent::BattleQueued {
        territory: territory.to_string(),
        attacker: attacker.to_string(),
        amphibious_from: amphibious_from.map(str::to_string),
    });
}

/// Move several units one hop together. Every unit is validated before any
/// of them moves.
pub fn move_units(
    state: &mut WorldState,
    rules: &Rules,
    units: &[UnitId],
    from: &str,
    to: &str,
    events: &mut Vec<GameEvent>,
) -> Result<(), ActionError> {
    require_movement_phase(state, "move_units")?;
    reject_duplicates(units)?;

    let kinds = units
        .iter()
        .map(|&id| propose_move(state, rules, id, from, to))
        .collect::<Result<Vec<_>, _>>()?;

    for (&id, kind) in units.iter().zip(kinds) {
        apply_move(state, rules, id, from, to, kind, events);
    }
    Ok(())
}

/// Board land units onto friendly transports in an adjacent sea zone.
///
/// Cargo fills transports in stack order. The whole command fails if the
/// zone's spare capacity is short.
pub fn load_cargo(
    state: &mut WorldState,
    rules: &Rules,
    land: &str,
    sea: &str,
    units: &[UnitId],
    events: &mut Vec<GameEvent>,
) -> Result<(), ActionError> {
    require_movement_phase(state, "load_cargo")?;
    require_kind(rules, land, TerritoryKind::Land)?;
    require_kind(rules, sea, TerritoryKind::Sea)?;
    if !rules.are_adjacent(land, sea) {
        return Err(ActionError::NotAdjacent {
            from: land.to_string(),
            to: sea.to_string(),
        });
    }
    reject_duplicates(units)?;

    let active = state.active_faction(rules).clone();
    if state.has_enemy_units(rules, sea, &active) {
        return Err(ActionError::EnemyUnitsPresent(sea.to_string()));
    }

    for &id in units {
        let unit = state.units.get(&id).ok_or(ActionError::UnknownUnit(id))?;
        let in_stack = state
            .territories
            .get(land)
            .is_some_and(|t| t.units.contains(&id));
        if !in_stack {
            return Err(ActionError::UnitNotInTerritory {
                unit: id,
                territory: land.to_string(),
            });
        }
        if unit_domain(rules, unit) != Domain::Land {
            return Err(ActionError::NotCargo(id));
        }
        if !controllable(state, rules, unit) {
            return Err(ActionError::NotControllable(id));
        }
        if unit.committed {
            return Err(ActionError::AlreadyCommitted(id));
        }
        if unit.moves_left == 0 {
            return Err(ActionError::NoMovementLeft(id));
        }
    }

    // (transport, spare berths) in stack order
    let transports: Vec<(UnitId, usize)> = state
        .stack(sea)
        .filter(|u| rules.are_allied(&u.owner, &active))
        .filter_map(|u| {
            let capacity = unit_def(rules, u)?.capacity as usize;
            (capacity > 0).then(|| (u.id, capacity.saturating_sub(u.cargo.len())))
        })
        .collect();
    if transports.is_empty() {
        return Err(ActionError::NoTransport(sea.to_string()));
    }
    let available: usize = transports.iter().map(|(_, spare)| spare).sum();
    if available < units.len() {
        return Err(ActionError::InsufficientCapacity {
            requested: units.len(),
            available,
        });
    }

    let mut remaining = units.iter().copied();
    for (transport, spare) in transports {
        let boarding: Vec<UnitId> = remaining.by_ref().take(spare).collect();
        if boarding.is_empty() {
            break;
        }
        if let Some(t) = state.territories.get_mut(land) {
            t.units.retain(|u| !boarding.contains(u));
        }
        for &id in &boarding {
            if let Some(u) = state.units.get_mut(&id) {
                u.embarked_on = Some(transport);
                u.moves_left = u.moves_left.saturating_sub(1);
            }
        }
        if let Some(t) = state.units.get_mut(&transport) {
            t.cargo.extend_from_slice(&boarding);
        }
        log::trace!("Loaded {:?} onto transport {} in {}", boarding, transport, sea);
        events.push(GameEvent::CargoLoaded {
            transport,
            units: boarding,
            from: land.to_string(),
            sea: sea.to_string(),
        });
    }
    Ok(())
}

/// Put every controllable unit riding in friendly transports in `sea` ashore
/// in `land`. Unloaded units have no movement left.
pub fn unload_cargo(
    state: &mut WorldState,
    rules: &Rules,
    sea: &str,
    land: &str,
    events: &mut Vec<GameEvent>,
) -> Result<(), ActionError> {
    require_movement_phase(state, "unload_cargo")?;
    require_kind(rules, sea, TerritoryKind::Sea)?;
    require_kind(rules, land, TerritoryKind::Land)?;
    if !rules.are_adjacent(sea, land) {
        return Err(ActionError::NotAdjacent {
            from: sea.to_string(),
            to: land.to_string(),
        });
    }

    let active = state.active_faction(rules).clone();
    if state.has_enemy_units(rules, sea, &active) {
        return Err(ActionError::EnemyUnitsPresent(sea.to_string()));
    }

    let manifests: Vec<(UnitId, Vec<UnitId>)> = state
        .stack(sea)
        .filter(|t| rules.are_allied(&t.owner, &active) && !t.cargo.is_empty())
        .map(|t| {
            let ids = t
                .cargo
                .iter()
                .filter(|c| {
                    state
                        .units
                        .get(*c)
                        .is_some_and(|u| controllable(state, rules, u))
                })
                .copied()
                .collect::<Vec<_>>();
            (t.id, ids)
        })
        .filter(|(_, ids)| !ids.is_empty())
        .collect();
    if manifests.is_empty() {
        return Err(ActionError::NoCargo(sea.to_string()));
    }

    let hostile = state.is_enemy_land(rules, land, &active)
        || state.has_enemy_units(rules, land, &active);
    let combat = state.phase == Phase::CombatMove;
    if hostile && !combat {
        return Err(ActionError::HostileDestination(land.to_string()));
    }

    for (transport, ids) in manifests {
        if let Some(t) = state.units.get_mut(&transport) {
            t.cargo.retain(|c| !ids.contains(c));
        }
        for &id in &ids {
            if let Some(u) = state.units.get_mut(&id) {
                u.embarked_on = None;
                u.moves_left = 0;
                if combat {
                    u.origin = Some(sea.to_string());
                    u.committed = hostile;
                }
            }
        }
        state
            .territories
            .entry(land.to_string())
            .or_default()
            .units
            .extend_from_slice(&ids);
        log::trace!("Unloaded {:?} from transport {} into {}", ids, transport, land);
        events.push(GameEvent::CargoUnloaded {
            transport,
            units: ids,
            sea: sea.to_string(),
            to: land.to_string(),
        });
    }

    if combat && state.is_contested(rules, land) {
        queue_battle(state, land, &active, Some(sea), events);
    }
    Ok(())
}

/// Restore full movement and clear combat markers for a faction's units,
/// including units riding as cargo.
pub fn reset_movement(state: &mut WorldState, rules: &Rules, faction: &str) {
    let mut count = 0;
    for unit in state.units.values_mut().filter(|u| u.owner == faction) {
        unit.moves_left = rules.unit_type(&unit.unit_type).map_or(0, |d| d.movement);
        unit.committed = false;
        unit.origin = None;
        count += 1;
    }
    log::debug!("Reset movement for {} units of {}", count, faction);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{skirmish_rules, WorldStateBuilder};

    #[test]
    fn test_simple_move() {
        let rules = skirmish_rules();
        let mut state = WorldStateBuilder::new(&rules)
            .turn("Red", Phase::NoncombatMove)
            .with_units("RedHome", "Red", "tank", 1)
            .build();
        let mut events = Vec::new();

        move_units(&mut state, &rules, &[1], "RedHome", "RedField", &mut events).unwrap();

        assert_eq!(state.territories["RedField"].units, vec![1]);
        assert!(state.territories["RedHome"].units.is_empty());
        assert_eq!(state.units[&1].moves_left, 1);
        assert!(state.units[&1].origin.is_none());
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_land_unit_cannot_walk_into_sea() {
        let rules = skirmish_rules();
        let state = WorldStateBuilder::new(&rules)
            .turn("Red", Phase::CombatMove)
            .with_units("RedHome", "Red", "inf", 1)
            .build();
        assert_eq!(
            propose_move(&state, &rules, 1, "RedHome", "WestSea"),
            Err(ActionError::DomainMismatch {
                unit: 1,
                territory: "WestSea".into()
            })
        );
    }

    #[test]
    fn test_check_order_adjacency_before_budget() {
        let rules = skirmish_rules();
        let mut state = WorldStateBuilder::new(&rules)
            .turn("Red", Phase::CombatMove)
            .with_units("RedHome", "Red", "inf", 1)
            .build();
        state.units.get_mut(&1).unwrap().moves_left = 0;
        assert!(matches!(
            propose_move(&state, &rules, 1, "RedHome", "BlueHome"),
            Err(ActionError::NotAdjacent { .. })
        ));
        assert_eq!(
            propose_move(&state, &rules, 1, "RedHome", "RedField"),
            Err(ActionError::NoMovementLeft(1))
        );
    }

    #[test]
    fn test_combat_move_commits_on_hostile_entry() {
        let rules = skirmish_rules();
        let mut state = WorldStateBuilder::new(&rules)
            .turn("Red", Phase::CombatMove)
            .with_units("RedField", "Red", "tank", 2)
            .with_units("BlueField", "Blue", "inf", 1)
            .build();
        let mut events = Vec::new();

        move_units(&mut state, &rules, &[1, 2], "RedField", "BlueField", &mut events).unwrap();

        for id in [1, 2] {
            let unit = &state.units[&id];
            assert!(unit.committed);
            assert_eq!(unit.origin.as_deref(), Some("RedField"));
        }
        assert_eq!(state.battles.len(), 1);
        assert_eq!(state.battles[0].territory, "BlueField");
        assert_eq!(state.battles[0].attacker, "Red");
        // Two moves, one battle queued
        assert_eq!(events.len(), 3);

        // Committed units stay put
        assert_eq!(
            propose_move(&state, &rules, 1, "BlueField", "BlueHome"),
            Err(ActionError::AlreadyCommitted(1))
        );
    }

    #[test]
    fn test_noncombat_rejects_hostile() {
        let rules = skirmish_rules();
        let state = WorldStateBuilder::new(&rules)
            .turn("Red", Phase::NoncombatMove)
            .with_units("RedField", "Red", "inf", 1)
            .build();
        assert_eq!(
            propose_move(&state, &rules, 1, "RedField", "BlueField"),
            Err(ActionError::HostileDestination("BlueField".into()))
        );
    }

    #[test]
    fn test_noncombat_allows_allied_units() {
        let rules = skirmish_rules();
        let state = WorldStateBuilder::new(&rules)
            .turn("Red", Phase::NoncombatMove)
            .with_units("PinkHome", "Pink", "inf", 1)
            .build();
        assert_eq!(
            propose_move(&state, &rules, 1, "PinkHome", "RedHome"),
            Ok(MoveKind::Normal)
        );
    }

    #[test]
    fn test_combat_move_only_own_units() {
        let rules = skirmish_rules();
        let state = WorldStateBuilder::new(&rules)
            .turn("Red", Phase::CombatMove)
            .with_units("PinkHome", "Pink", "inf", 1)
            .build();
        assert_eq!(
            propose_move(&state, &rules, 1, "PinkHome", "RedHome"),
            Err(ActionError::NotControllable(1))
        );
    }

    #[test]
    fn test_move_outside_movement_phase() {
        let rules = skirmish_rules();
        let mut state = WorldStateBuilder::new(&rules)
            .turn("Red", Phase::Purchase)
            .with_units("RedHome", "Red", "inf", 1)
            .build();
        let err = move_units(&mut state, &rules, &[1], "RedHome", "RedField", &mut Vec::new());
        assert_eq!(
            err,
            Err(ActionError::WrongPhase {
                command: "move_units",
                phase: Phase::Purchase
            })
        );
    }

    #[test]
    fn test_multi_move_is_all_or_nothing() {
        let rules = skirmish_rules();
        let mut state = WorldStateBuilder::new(&rules)
            .turn("Red", Phase::CombatMove)
            .with_units("RedHome", "Red", "inf", 2)
            .build();
        state.units.get_mut(&2).unwrap().moves_left = 0;
        let before = state.clone();
        let mut events = Vec::new();

        let err = move_units(&mut state, &rules, &[1, 2], "RedHome", "RedField", &mut events);

        assert_eq!(err, Err(ActionError::NoMovementLeft(2)));
        assert_eq!(state, before);
        assert!(events.is_empty());

        assert_eq!(
            move_units(&mut state, &rules, &[1, 1], "RedHome", "RedField", &mut events),
            Err(ActionError::DuplicateUnit(1))
        );
    }

    #[test]
    fn test_noncombat_rejects_enemy_fleet() {
        let rules = skirmish_rules();
        let state = WorldStateBuilder::new(&rules)
            .turn("Red", Phase::NoncombatMove)
            .with_units("WestSea", "Red", "dd", 1)
            .with_units("MidSea", "Blue", "dd", 1)
            .build();
        assert_eq!(
            propose_move(&state, &rules, 1, "WestSea", "MidSea"),
            Err(ActionError::HostileDestination("MidSea".into()))
        );
    }

    #[test]
    fn test_load_two_then_capacity_error() {
        let rules = skirmish_rules();
        let mut state = WorldStateBuilder::new(&rules)
            .turn("Red", Phase::CombatMove)
            .with_units("RedHome", "Red", "inf", 3)
            .with_units("WestSea", "Red", "trn", 1)
            .build();
        let mut events = Vec::new();

        load_cargo(&mut state, &rules, "RedHome", "WestSea", &[1, 2], &mut events).unwrap();
        assert_eq!(state.units[&4].cargo, vec![1, 2]);
        assert_eq!(state.units[&1].embarked_on, Some(4));
        assert_eq!(state.units[&1].moves_left, 0);
        assert_eq!(state.territories["RedHome"].units, vec![3]);

        assert_eq!(
            load_cargo(&mut state, &rules, "RedHome", "WestSea", &[3], &mut events),
            Err(ActionError::InsufficientCapacity {
                requested: 1,
                available: 0
            })
        );
    }

    #[test]
    fn test_load_spreads_over_transports() {
        let rules = skirmish_rules();
        let mut state = WorldStateBuilder::new(&rules)
            .turn("Red", Phase::NoncombatMove)
            .with_units("RedHome", "Red", "inf", 3)
            .with_units("WestSea", "Red", "trn", 2)
            .build();
        let mut events = Vec::new();

        load_cargo(&mut state, &rules, "RedHome", "WestSea", &[1, 2, 3], &mut events).unwrap();

        assert_eq!(state.units[&4].cargo, vec![1, 2]);
        assert_eq!(state.units[&5].cargo, vec![3]);
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn test_load_requires_transport_and_land_units() {
        let rules = skirmish_rules();
        let mut state = WorldStateBuilder::new(&rules)
            .turn("Red", Phase::CombatMove)
            .with_units("RedHome", "Red", "inf", 1)
            .with_units("RedHome", "Red", "ftr", 1)
            .build();
        let mut events = Vec::new();
        assert_eq!(
            load_cargo(&mut state, &rules, "RedHome", "WestSea", &[1], &mut events),
            Err(ActionError::NoTransport("WestSea".into()))
        );
        assert_eq!(
            load_cargo(&mut state, &rules, "RedHome", "WestSea", &[2], &mut events),
            Err(ActionError::NotCargo(2))
        );
        assert!(matches!(
            load_cargo(&mut state, &rules, "RedHome", "MidSea", &[1], &mut events),
            Err(ActionError::NotAdjacent { .. })
        ));
    }

    #[test]
    fn test_cargo_rides_with_transport() {
        let rules = skirmish_rules();
        let mut state = WorldStateBuilder::new(&rules)
            .turn("Red", Phase::NoncombatMove)
            .with_units("WestSea", "Red", "trn", 1)
            .with_units("RedHome", "Red", "inf", 1)
            .embark(1, &[2])
            .build();
        let mut events = Vec::new();

        move_units(&mut state, &rules, &[1], "WestSea", "MidSea", &mut events).unwrap();

        assert_eq!(state.territory_of(2).map(String::as_str), Some("MidSea"));
        assert_eq!(state.units[&2].moves_left, 1);
    }

    #[test]
    fn test_unload_noncombat() {
        let rules = skirmish_rules();
        let mut state = WorldStateBuilder::new(&rules)
            .turn("Red", Phase::NoncombatMove)
            .with_units("MidSea", "Red", "trn", 1)
            .with_units("RedHome", "Red", "inf", 2)
            .embark(1, &[2, 3])
            .build();
        let mut events = Vec::new();

        assert_eq!(
            unload_cargo(&mut state, &rules, "MidSea", "BlueField", &mut events),
            Err(ActionError::HostileDestination("BlueField".into()))
        );

        unload_cargo(&mut state, &rules, "MidSea", "RedField", &mut events).unwrap();
        assert_eq!(state.territories["RedField"].units, vec![2, 3]);
        assert!(state.units[&1].cargo.is_empty());
        assert_eq!(state.units[&2].moves_left, 0);
        assert!(!state.units[&2].committed);

        assert_eq!(
            unload_cargo(&mut state, &rules, "MidSea", "RedField", &mut events),
            Err(ActionError::NoCargo("MidSea".into()))
        );
    }

    #[test]
    fn test_amphibious_assault_queues_battle() {
        let rules = skirmish_rules();
        let mut state = WorldStateBuilder::new(&rules)
            .turn("Red", Phase::CombatMove)
            .with_units("MidSea", "Red", "trn", 1)
            .with_units("RedHome", "Red", "inf", 2)
            .embark(1, &[2, 3])
            .with_units("BlueField", "Blue", "inf", 1)
            .build();
        let mut events = Vec::new();

        unload_cargo(&mut state, &rules, "MidSea", "BlueField", &mut events).unwrap();

        let unit = &state.units[&2];
        assert!(unit.committed);
        assert_eq!(unit.origin.as_deref(), Some("MidSea"));
        assert_eq!(state.battles.len(), 1);
        assert_eq!(state.battles[0].amphibious_from.as_deref(), Some("MidSea"));
    }

    #[test]
    fn test_reset_movement_includes_cargo() {
        let rules = skirmish_rules();
        let mut state = WorldStateBuilder::new(&rules)
            .with_units("WestSea", "Red", "trn", 1)
            .with_units("RedHome", "Red", "inf", 1)
            .with_units("BlueHome", "Blue", "inf", 1)
            .embark(1, &[2])
            .build();
        for unit in state.units.values_mut() {
            unit.moves_left = 0;
            unit.committed = true;
        }

        reset_movement(&mut state, &rules, "Red");

        assert_eq!(state.units[&1].moves_left, 2);
        assert_eq!(state.units[&2].moves_left, 1);
        assert!(!state.units[&2].committed);
        assert_eq!(state.units[&3].moves_left, 0);
    }
}
