//! Dice battles.
//!
//! Each round every attacker rolls one die against its attack value, then
//! every defender against its defense value; a roll at or under the value is
//! a hit. Hits land simultaneously after both sides have rolled.

use crate::config::SimConfig;
use crate::observer::{DestroyCause, DieRoll, GameEvent};
use crate::state::{unit_def, unit_domain, PendingBattle, Phase, UnitId, WorldState};
use crate::step::{require_phase, ActionError};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use tracing::instrument;
use wardata::{Domain, FactionId, Rules, TerritoryId, TerritoryKind, UnitTypeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BattleResult {
    AttackerWon,
    DefenderHeld,
    MutualDestruction,
    /// Round cap reached with both sides standing.
    Stalemate,
    /// One side was already empty; no dice were rolled.
    NoBattle,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleOutcome {
    pub territory: TerritoryId,
    pub winner: Option<FactionId>,
    pub result: BattleResult,
    pub captured: bool,
    pub rounds: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Attacker,
    Defender,
}

/// A unit that can absorb hits, as offered to a [`CasualtySelector`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CasualtyCandidate {
    pub unit: UnitId,
    pub unit_type: UnitTypeId,
    pub owner: FactionId,
    pub hit_points: u8,
    pub cost: u32,
    /// Neither attacks nor defends (transports).
    pub noncombatant: bool,
}

/// Chooses which units take the hits a side suffered.
///
/// Returns one unit id per hit to apply; a unit may be named up to its
/// remaining hit points. When fewer hit points remain than hits were scored,
/// every remaining hit point must be named. Anything else is rejected and the
/// automatic rule is used instead.
pub trait CasualtySelector {
    fn select(
        &mut self,
        territory: &str,
        side: Side,
        hits: u32,
        candidates: &[CasualtyCandidate],
    ) -> Vec<UnitId>;
}

/// The automatic casualty rule as a selector.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoCasualties;

impl CasualtySelector for AutoCasualties {
    fn select(
        &mut self,
        _territory: &str,
        _side: Side,
        hits: u32,
        candidates: &[CasualtyCandidate],
    ) -> Vec<UnitId> {
        auto_casualties(candidates, hits)
    }
}

/// Apply hits one at a time to the living candidate with the smallest key:
/// noncombatants first, then lowest cost, then most remaining hit points,
/// then stack order. Excess hits are dropped.
pub fn auto_casualties(candidates: &[CasualtyCandidate], hits: u32) -> Vec<UnitId> {
    let mut remaining: Vec<u8> = candidates.iter().map(|c| c.hit_points).collect();
    let mut picks = Vec::new();
    for _ in 0..hits {
        let next = candidates
            .iter()
            .enumerate()
            .filter(|(i, _)| remaining[*i] > 0)
            .min_by_key(|(i, c)| (!c.noncombatant, c.cost, Reverse(remaining[*i]), *i));
        let Some((i, c)) = next else {
            break;
        };
        remaining[i] -= 1;
        picks.push(c.unit);
    }
    picks
}

fn picks_are_valid(picks: &[UnitId], candidates: &[CasualtyCandidate], hits: u32) -> bool {
    let pool: u32 = candidates.iter().map(|c| u32::from(c.hit_points)).sum();
    if picks.len() as u32 != hits.min(pool) {
        return false;
    }
    let mut taken: FxHashMap<UnitId, u8> = FxHashMap::default();
    for &id in picks {
        let Some(candidate) = candidates.iter().find(|c| c.unit == id) else {
            return false;
        };
        let n = taken.entry(id).or_insert(0);
        *n += 1;
        if *n > candidate.hit_points {
            return false;
        }
    }
    true
}

fn choose_casualties(
    selector: &mut dyn CasualtySelector,
    territory: &str,
    side: Side,
    hits: u32,
    candidates: &[CasualtyCandidate],
) -> Vec<UnitId> {
    if hits == 0 || candidates.is_empty() {
        return Vec::new();
    }
    let picks = selector.select(territory, side, hits, candidates);
    if picks_are_valid(&picks, candidates, hits) {
        picks
    } else {
        log::warn!(
            "Invalid casualty choice {:?} for {:?} in {} ({} hits); using automatic rule",
            picks,
            side,
            territory,
            hits
        );
        auto_casualties(candidates, hits)
    }
}

fn candidates(state: &WorldState, rules: &Rules, units: &[UnitId]) -> Vec<CasualtyCandidate> {
    units
        .iter()
        .filter_map(|id| state.units.get(id))
        .map(|u| {
            let def = unit_def(rules, u);
            CasualtyCandidate {
                unit: u.id,
                unit_type: u.unit_type.clone(),
                owner: u.owner.clone(),
                hit_points: u.hit_points,
                cost: def.map_or(0, |d| d.cost),
                noncombatant: def.is_some_and(|d| d.is_noncombatant()),
            }
        })
        .collect()
}

/// Roll one die per unit in order.
fn roll_side(state: &mut WorldState, rules: &Rules, units: &[UnitId], side: Side) -> Vec<DieRoll> {
    let shooters: Vec<(UnitId, UnitTypeId, u8)> = units
        .iter()
        .filter_map(|id| state.units.get(id))
        .map(|u| {
            let target = unit_def(rules, u).map_or(0, |d| match side {
                Side::Attacker => d.attack,
                Side::Defender => d.defense,
            });
            (u.id, u.unit_type.clone(), target)
        })
        .collect();
    shooters
        .into_iter()
        .map(|(unit, unit_type, target)| {
            let roll = state.rng.roll_die();
            DieRoll {
                unit,
                unit_type,
                roll,
                target,
                hit: roll <= target,
            }
        })
        .collect()
}

/// Remove a unit (and its cargo) from play, reporting each loss.
pub(crate) fn destroy_unit(
    state: &mut WorldState,
    id: UnitId,
    territory: &str,
    cause: DestroyCause,
    events: &mut Vec<GameEvent>,
) {
    for (i, unit) in state.remove_unit(id).into_iter().enumerate() {
        let cause = if i == 0 {
            cause
        } else {
            DestroyCause::SunkWithTransport
        };
        log::debug!(
            "{} {} {} destroyed in {} ({:?})",
            unit.owner,
            unit.unit_type,
            unit.id,
            territory,
            cause
        );
        events.push(GameEvent::UnitDestroyed {
            unit: unit.id,
            unit_type: unit.unit_type,
            owner: unit.owner,
            territory: territory.to_string(),
            cause,
        });
    }
}

fn apply_hits(
    state: &mut WorldState,
    territory: &str,
    picks: &[UnitId],
    events: &mut Vec<GameEvent>,
) {
    for &id in picks {
        let Some(unit) = state.units.get_mut(&id) else {
            continue;
        };
        unit.hit_points = unit.hit_points.saturating_sub(1);
        if unit.hit_points == 0 {
            destroy_unit(state, id, territory, DestroyCause::Combat, events);
        } else {
            events.push(GameEvent::UnitDamaged {
                unit: id,
                unit_type: unit.unit_type.clone(),
                owner: unit.owner.clone(),
                hit_points: unit.hit_points,
            });
        }
    }
}

fn attackers(state: &WorldState, battle: &PendingBattle) -> Vec<UnitId> {
    state
        .stack(&battle.territory)
        .filter(|u| u.owner == battle.attacker && u.committed)
        .map(|u| u.id)
        .collect()
}

fn defenders(state: &WorldState, rules: &Rules, battle: &PendingBattle) -> Vec<UnitId> {
    state
        .stack(&battle.territory)
        .filter(|u| !rules.are_allied(&u.owner, &battle.attacker))
        .map(|u| u.id)
        .collect()
}

/// Surviving attackers fall back to where they came from, or are lost.
fn retreat_or_destroy(
    state: &mut WorldState,
    rules: &Rules,
    battle: &PendingBattle,
    events: &mut Vec<GameEvent>,
) {
    for id in attackers(state, battle) {
        let Some(unit) = state.units.get(&id) else {
            continue;
        };
        let domain = unit_domain(rules, unit);
        let target = unit.origin.clone().filter(|origin| {
            rules
                .territory(origin)
                .is_some_and(|t| domain.can_rest_in(t.kind))
                && !state.is_hostile(rules, origin, &unit.owner)
                && !state.has_enemy_units(rules, origin, &unit.owner)
        });
        match target {
            Some(origin) => {
                if let Some(t) = state.territories.get_mut(&battle.territory) {
                    t.units.retain(|&u| u != id);
                }
                state
                    .territories
                    .entry(origin.clone())
                    .or_default()
                    .units
                    .push(id);
                events.push(GameEvent::UnitRetreated {
                    unit: id,
                    from: battle.territory.clone(),
                    to: origin,
                });
            }
            None => destroy_unit(
                state,
                id,
                &battle.territory,
                DestroyCause::RetreatBlocked,
                events,
            ),
        }
    }
}

/// Fight a battle to its conclusion.
///
/// Consumes exactly one die per living unit per round, attackers first.
#[instrument(skip_all, name = "battle", fields(territory = %battle.territory))]
pub fn resolve_battle(
    state: &mut WorldState,
    rules: &Rules,
    battle: &PendingBattle,
    selector: &mut dyn CasualtySelector,
    max_rounds: u32,
    events: &mut Vec<GameEvent>,
) -> BattleOutcome {
    let territory = battle.territory.as_str();
    let attacking = attackers(state, battle);
    let defending = defenders(state, rules, battle);
    let defending_faction = state
        .owner_of(territory)
        .filter(|o| !rules.are_allied(o, &battle.attacker))
        .cloned()
        .or_else(|| {
            defending
                .first()
                .and_then(|id| state.units.get(id))
                .map(|u| u.owner.clone())
        });

    if attacking.is_empty() || defending.is_empty() {
        log::debug!("No battle in {}: one side is empty", territory);
        clear_commitments(state, battle);
        let outcome = BattleOutcome {
            territory: territory.to_string(),
            winner: None,
            result: BattleResult::NoBattle,
            captured: false,
            rounds: 0,
        };
        events.push(ended_event(battle, &outcome));
        return outcome;
    }

    events.push(GameEvent::BattleStarted {
        territory: territory.to_string(),
        attacker: battle.attacker.clone(),
        attackers: attacking.len(),
        defenders: defending.len(),
    });

    let mut rounds = 0;
    while rounds < max_rounds {
        let attacking = attackers(state, battle);
        let defending = defenders(state, rules, battle);
        if attacking.is_empty() || defending.is_empty() {
            break;
        }
        rounds += 1;

        let attacker_rolls = roll_side(state, rules, &attacking, Side::Attacker);
        let defender_rolls = roll_side(state, rules, &defending, Side::Defender);
        let attacker_hits = attacker_rolls.iter().filter(|r| r.hit).count() as u32;
        let defender_hits = defender_rolls.iter().filter(|r| r.hit).count() as u32;
        log::trace!(
            "{} round {}: attacker hits {}, defender hits {}",
            territory,
            rounds,
            attacker_hits,
            defender_hits
        );
        events.push(GameEvent::BattleRound {
            territory: territory.to_string(),
            round: rounds,
            attacker_rolls,
            defender_rolls,
            attacker_hits,
            defender_hits,
        });

        // Both sides choose before either loses anything.
        let defender_pool = candidates(state, rules, &defending);
        let attacker_pool = candidates(state, rules, &attacking);
        let defender_losses = choose_casualties(
            selector,
            territory,
            Side::Defender,
            attacker_hits,
            &defender_pool,
        );
        let attacker_losses = choose_casualties(
            selector,
            territory,
            Side::Attacker,
            defender_hits,
            &attacker_pool,
        );
        apply_hits(state, territory, &defender_losses, events);
        apply_hits(state, territory, &attacker_losses, events);
    }

    let surviving_attackers = attackers(state, battle);
    let attackers_left = !surviving_attackers.is_empty();
    let defenders_left = !defenders(state, rules, battle).is_empty();

    let (result, winner) = match (attackers_left, defenders_left) {
        (true, false) => (BattleResult::AttackerWon, Some(battle.attacker.clone())),
        (false, true) => (BattleResult::DefenderHeld, defending_faction),
        (false, false) => (BattleResult::MutualDestruction, None),
        (true, true) => (BattleResult::Stalemate, None),
    };

    let mut captured = false;
    match result {
        BattleResult::AttackerWon => {
            let is_land = rules
                .territory(territory)
                .is_some_and(|t| t.kind == TerritoryKind::Land);
            let land_survivor = surviving_attackers.iter().any(|id| {
                state
                    .units
                    .get(id)
                    .is_some_and(|u| unit_domain(rules, u) == Domain::Land)
            });
            if is_land && land_survivor {
                capture(state, territory, &battle.attacker, false, events);
                captured = true;
            }
        }
        BattleResult::Stalemate => retreat_or_destroy(state, rules, battle, events),
        _ => {}
    }
    clear_commitments(state, battle);

    let outcome = BattleOutcome {
        territory: territory.to_string(),
        winner,
        result,
        captured,
        rounds,
    };
    log::info!(
        "Battle in {}: {:?} after {} rounds (attacker {})",
        territory,
        result,
        rounds,
        battle.attacker
    );
    events.push(ended_event(battle, &outcome));
    outcome
}

fn ended_event(battle: &PendingBattle, outcome: &BattleOutcome) -> GameEvent {
    GameEvent::BattleEnded {
        territory: outcome.territory.clone(),
        attacker: battle.attacker.clone(),
        result: outcome.result,
        winner: outcome.winner.clone(),
        captured: outcome.captured,
        rounds: outcome.rounds,
    }
}

fn clear_commitments(state: &mut WorldState, battle: &PendingBattle) {
    let ids: Vec<UnitId> = state
        .stack(&battle.territory)
        .filter(|u| u.owner == battle.attacker)
        .map(|u| u.id)
        .collect();
    for id in ids {
        if let Some(u) = state.units.get_mut(&id) {
            u.committed = false;
        }
    }
}

fn capture(
    state: &mut WorldState,
    territory: &str,
    faction: &str,
    unopposed: bool,
    events: &mut Vec<GameEvent>,
) {
    let Some(t) = state.territories.get_mut(territory) else {
        return;
    };
    let from = t.owner.replace(faction.to_string());
    log::info!(
        "{} captured {} from {}",
        faction,
        territory,
        from.as_deref().unwrap_or("nobody")
    );
    events.push(GameEvent::TerritoryCaptured {
        territory: territory.to_string(),
        from,
        to: faction.to_string(),
        unopposed,
    });
}

/// Rebuild the pending battle list from the map: one battle per territory
/// holding both coalitions, in territory definition order. Amphibious origins
/// recorded during the phase are kept.
pub fn rebuild_pending_battles(state: &mut WorldState, rules: &Rules, events: &mut Vec<GameEvent>) {
    let attacker = state.active_faction(rules).clone();
    let previous = std::mem::take(&mut state.battles);
    for t in rules.territories() {
        if !state.is_contested(rules, &t.id) {
            continue;
        }
        let known = previous.iter().find(|b| b.territory == t.id);
        let battle = PendingBattle {
            territory: t.id.clone(),
            attacker: attacker.clone(),
            amphibious_from: known.and_then(|b| b.amphibious_from.clone()),
        };
        if known.is_none() {
            events.push(GameEvent::BattleQueued {
                territory: battle.territory.clone(),
                attacker: battle.attacker.clone(),
                amphibious_from: battle.amphibious_from.clone(),
            });
        }
        state.battles.push(battle);
    }
    log::debug!("{} battles pending", state.battles.len());
}

/// Enemy land holding the faction's land units and no enemy units changes
/// hands without dice.
pub fn apply_unopposed_captures(
    state: &mut WorldState,
    rules: &Rules,
    faction: &str,
    events: &mut Vec<GameEvent>,
) {
    let taken: Vec<TerritoryId> = rules
        .territories()
        .iter()
        .filter(|t| t.kind == TerritoryKind::Land)
        .filter(|t| state.is_enemy_land(rules, &t.id, faction))
        .filter(|t| !state.has_enemy_units(rules, &t.id, faction))
        .filter(|t| {
            state
                .stack(&t.id)
                .any(|u| u.owner == faction && unit_domain(rules, u) == Domain::Land)
        })
        .map(|t| t.id.clone())
        .collect();
    for territory in taken {
        capture(state, &territory, faction, true, events);
        clear_commitments(
            state,
            &PendingBattle {
                territory,
                attacker: faction.to_string(),
                amphibious_from: None,
            },
        );
    }
}

/// Resolve every pending battle in queue order. An empty queue is a no-op.
pub fn resolve_all_battles(
    state: &mut WorldState,
    rules: &Rules,
    config: &SimConfig,
    selector: &mut dyn CasualtySelector,
    events: &mut Vec<GameEvent>,
) -> Result<Vec<BattleOutcome>, ActionError> {
    require_phase(state, "resolve_battles", Phase::ConductCombat)?;
    let battles = std::mem::take(&mut state.battles);
    let mut outcomes = Vec::with_capacity(battles.len());
    for battle in &battles {
        outcomes.push(resolve_battle(
            state,
            rules,
            battle,
            selector,
            config.max_battle_rounds,
            events,
        ));
    }
    Ok(outcomes)
}

/// Resolve the pending battle in one territory.
pub fn resolve_single(
    state: &mut WorldState,
    rules: &Rules,
    config: &SimConfig,
    territory: &str,
    selector: &mut dyn CasualtySelector,
    events: &mut Vec<GameEvent>,
) -> Result<BattleOutcome, ActionError> {
    require_phase(state, "resolve_battle", Phase::ConductCombat)?;
    let index = state
        .battles
        .iter()
        .position(|b| b.territory == territory)
        .ok_or_else(|| ActionError::BattleNotFound(territory.to_string()))?;
    let battle = state.battles.remove(index);
    Ok(resolve_battle(
        state,
        rules,
        &battle,
        selector,
        config.max_battle_rounds,
        events,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{skirmish_rules, WorldStateBuilder};

    fn candidate(unit: UnitId, cost: u32, hit_points: u8, noncombatant: bool) -> CasualtyCandidate {
        CasualtyCandidate {
            unit,
            unit_type: "x".into(),
            owner: "Blue".into(),
            hit_points,
            cost,
            noncombatant,
        }
    }

    /// Four Red infantry committed against three Blue infantry in BlueField.
    fn infantry_clash(seed: u64) -> (Rules, WorldState) {
        let rules = skirmish_rules();
        let mut state = WorldStateBuilder::new(&rules)
            .seed(seed)
            .turn("Red", Phase::ConductCombat)
            .with_units("BlueField", "Blue", "inf", 3)
            .with_units("BlueField", "Red", "inf", 4)
            .build();
        for id in 4..=7 {
            let unit = state.units.get_mut(&id).unwrap();
            unit.committed = true;
            unit.origin = Some("RedField".into());
        }
        state.battles.push(battle("BlueField"));
        (rules, state)
    }

    fn battle(territory: &str) -> PendingBattle {
        PendingBattle {
            territory: territory.into(),
            attacker: "Red".into(),
            amphibious_from: None,
        }
    }

    #[test]
    fn test_auto_casualties_order() {
        let pool = [
            candidate(1, 10, 1, false),
            candidate(2, 3, 1, false),
            candidate(3, 7, 1, true),
            candidate(4, 3, 1, false),
        ];
        assert_eq!(auto_casualties(&pool, 3), vec![3, 2, 4]);
        // Excess hits are dropped
        assert_eq!(auto_casualties(&pool, 9), vec![3, 2, 4, 1]);
        assert!(auto_casualties(&pool, 0).is_empty());
    }

    #[test]
    fn test_auto_casualties_multi_hit_point_absorbs_first() {
        let pool = [
            candidate(1, 20, 1, false),
            candidate(2, 20, 2, false),
            candidate(3, 20, 1, false),
        ];
        // The healthy battleship soaks one hit, then stack order decides.
        assert_eq!(auto_casualties(&pool, 3), vec![2, 1, 2]);
    }

    #[test]
    fn test_invalid_manual_pick_falls_back() {
        struct Stubborn;
        impl CasualtySelector for Stubborn {
            fn select(&mut self, _: &str, _: Side, _: u32, _: &[CasualtyCandidate]) -> Vec<UnitId> {
                vec![99]
            }
        }
        let pool = [candidate(1, 3, 1, false), candidate(2, 3, 1, false)];
        let picks = choose_casualties(&mut Stubborn, "X", Side::Defender, 1, &pool);
        assert_eq!(picks, vec![1]);
    }

    #[test]
    fn test_manual_pick_honoured() {
        struct Last;
        impl CasualtySelector for Last {
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
        let pool = [candidate(1, 3, 1, false), candidate(2, 3, 1, false)];
        assert_eq!(choose_casualties(&mut Last, "X", Side::Attacker, 1, &pool), vec![2]);
        // Too few picks for the hits scored
        assert!(!picks_are_valid(&[2], &pool, 2));
        // Naming a one-hit unit twice
        assert!(!picks_are_valid(&[2, 2], &pool, 2));
    }

    #[test]
    fn test_attacker_wins_and_captures() {
        let (rules, mut state) = infantry_clash(8);
        let mut events = Vec::new();

        let outcomes = resolve_all_battles(
            &mut state,
            &rules,
            &SimConfig::default(),
            &mut AutoCasualties,
            &mut events,
        )
        .unwrap();

        assert_eq!(outcomes.len(), 1);
        let outcome = &outcomes[0];
        assert_eq!(outcome.result, BattleResult::AttackerWon);
        assert_eq!(outcome.winner.as_deref(), Some("Red"));
        assert!(outcome.captured);
        assert_eq!(outcome.rounds, 3);
        assert_eq!(state.owner_of("BlueField").map(String::as_str), Some("Red"));
        assert_eq!(state.territories["BlueField"].units, vec![5, 6, 7]);
        assert!(state.units.values().all(|u| !u.committed));
        assert!(state.battles.is_empty());
        assert_eq!(state.rng.draws(), 18);
    }

    #[test]
    fn test_mutual_destruction() {
        let (rules, mut state) = infantry_clash(10);
        let b = state.battles.remove(0);
        let outcome = resolve_battle(
            &mut state,
            &rules,
            &b,
            &mut AutoCasualties,
            20,
            &mut Vec::new(),
        );
        assert_eq!(outcome.result, BattleResult::MutualDestruction);
        assert_eq!(outcome.winner, None);
        assert_eq!(outcome.rounds, 7);
        assert!(!outcome.captured);
        // Nobody left, ownership unchanged
        assert_eq!(state.owner_of("BlueField").map(String::as_str), Some("Blue"));
        assert!(state.territories["BlueField"].units.is_empty());
    }

    #[test]
    fn test_defender_holds() {
        let (rules, mut state) = infantry_clash(3);
        let b = state.battles.remove(0);
        let outcome = resolve_battle(
            &mut state,
            &rules,
            &b,
            &mut AutoCasualties,
            20,
            &mut Vec::new(),
        );
        assert_eq!(outcome.result, BattleResult::DefenderHeld);
        assert_eq!(outcome.winner.as_deref(), Some("Blue"));
        assert_eq!(state.territories["BlueField"].units, vec![1, 2, 3]);
    }

    #[test]
    fn test_stalemate_retreats_to_origin() {
        // Seed 10 opens with a round in which nobody hits.
        let (rules, mut state) = infantry_clash(10);
        let b = state.battles.remove(0);
        let mut events = Vec::new();
        let outcome = resolve_battle(&mut state, &rules, &b, &mut AutoCasualties, 1, &mut events);

        assert_eq!(outcome.result, BattleResult::Stalemate);
        assert_eq!(outcome.rounds, 1);
        assert_eq!(state.territories["RedField"].units, vec![4, 5, 6, 7]);
        assert_eq!(state.territories["BlueField"].units, vec![1, 2, 3]);
        let retreats = events
            .iter()
            .filter(|e| matches!(e, GameEvent::UnitRetreated { .. }))
            .count();
        assert_eq!(retreats, 4);
    }

    #[test]
    fn test_stalemate_without_legal_origin_destroys() {
        let (rules, mut state) = infantry_clash(10);
        for id in 4..=7 {
            // Came ashore from the sea: land units cannot fall back there.
            state.units.get_mut(&id).unwrap().origin = Some("MidSea".into());
        }
        let b = state.battles.remove(0);
        let mut events = Vec::new();
        resolve_battle(&mut state, &rules, &b, &mut AutoCasualties, 1, &mut events);

        assert_eq!(state.units.len(), 3);
        assert!(events.iter().any(|e| matches!(
            e,
            GameEvent::UnitDestroyed {
                cause: DestroyCause::RetreatBlocked,
                ..
            }
        )));
    }

    #[test]
    fn test_no_battle_when_side_empty() {
        let rules = skirmish_rules();
        let mut state = WorldStateBuilder::new(&rules)
            .turn("Red", Phase::ConductCombat)
            .with_units("MidSea", "Red", "dd", 1)
            .build();
        state.units.get_mut(&1).unwrap().committed = true;
        let before_draws = state.rng.draws();
        let outcome = resolve_battle(
            &mut state,
            &rules,
            &PendingBattle {
                territory: "MidSea".into(),
                attacker: "Red".into(),
                amphibious_from: None,
            },
            &mut AutoCasualties,
            20,
            &mut Vec::new(),
        );
        assert_eq!(outcome.result, BattleResult::NoBattle);
        assert!(!outcome.captured);
        assert_eq!(state.rng.draws(), before_draws);
        assert!(!state.units[&1].committed);
    }

    #[test]
    fn test_sunk_transport_takes_cargo() {
        let rules = skirmish_rules();
        let mut state = WorldStateBuilder::new(&rules)
            .turn("Red", Phase::ConductCombat)
            .with_units("MidSea", "Blue", "trn", 1)
            .with_units("BlueField", "Blue", "inf", 2)
            .embark(1, &[2, 3])
            .with_units("MidSea", "Red", "dd", 1)
            .build();
        state.units.get_mut(&4).unwrap().committed = true;
        let mut events = Vec::new();

        let outcome = resolve_battle(
            &mut state,
            &rules,
            &battle("MidSea"),
            &mut AutoCasualties,
            20,
            &mut events,
        );

        // Seed 0: destroyer rolls 2 (hit), transport rolls 1 against 0.
        assert_eq!(outcome.result, BattleResult::AttackerWon);
        assert_eq!(outcome.rounds, 1);
        assert!(!outcome.captured);
        assert_eq!(state.owner_of("MidSea"), None);
        assert_eq!(state.units.len(), 1);
        let sunk = events
            .iter()
            .filter(|e| matches!(
                e,
                GameEvent::UnitDestroyed {
                    cause: DestroyCause::SunkWithTransport,
                    ..
                }
            ))
            .count();
        assert_eq!(sunk, 2);
    }

    #[test]
    fn test_capture_requires_land_survivor() {
        let rules = skirmish_rules();
        // Bombers alone cannot take ground even after clearing it.
        let mut state = WorldStateBuilder::new(&rules)
            .seed(3)
            .turn("Red", Phase::ConductCombat)
            .with_units("BlueField", "Red", "bmb", 1)
            .with_units("BlueField", "Blue", "inf", 1)
            .build();
        state.units.get_mut(&1).unwrap().committed = true;

        let outcome = resolve_battle(
            &mut state,
            &rules,
            &battle("BlueField"),
            &mut AutoCasualties,
            20,
            &mut Vec::new(),
        );

        // Bomber rolls 4 (hit), infantry rolls 4 (miss).
        assert_eq!(outcome.result, BattleResult::AttackerWon);
        assert_eq!(outcome.rounds, 1);
        assert!(!outcome.captured);
        assert_eq!(state.owner_of("BlueField").map(String::as_str), Some("Blue"));
    }

    #[test]
    fn test_rebuild_and_unopposed_capture() {
        let rules = skirmish_rules();
        let mut state = WorldStateBuilder::new(&rules)
            .turn("Red", Phase::CombatMove)
            .with_units("BlueField", "Red", "inf", 1)
            .with_units("Isle", "Red", "inf", 1)
            .with_units("Isle", "Blue", "inf", 1)
            .build();
        state.units.get_mut(&1).unwrap().committed = true;
        state.units.get_mut(&2).unwrap().committed = true;
        state.battles.push(PendingBattle {
            territory: "Isle".into(),
            attacker: "Red".into(),
            amphibious_from: Some("MidSea".into()),
        });
        let draws = state.rng.draws();
        let mut events = Vec::new();

        rebuild_pending_battles(&mut state, &rules, &mut events);
        apply_unopposed_captures(&mut state, &rules, "Red", &mut events);

        assert_eq!(state.battles.len(), 1);
        assert_eq!(state.battles[0].amphibious_from.as_deref(), Some("MidSea"));
        assert_eq!(state.owner_of("BlueField").map(String::as_str), Some("Red"));
        assert!(!state.units[&1].committed);
        assert_eq!(state.owner_of("Isle").map(String::as_str), Some("Blue"));
        assert_eq!(state.rng.draws(), draws);
    }

    #[test]
    fn test_resolve_requires_phase_and_battle() {
        let rules = skirmish_rules();
        let mut state = WorldStateBuilder::new(&rules).turn("Red", Phase::CombatMove).build();
        let config = SimConfig::default();
        assert!(matches!(
            resolve_all_battles(&mut state, &rules, &config, &mut AutoCasualties, &mut Vec::new()),
            Err(ActionError::WrongPhase { .. })
        ));
        state.phase = Phase::ConductCombat;
        assert_eq!(
            resolve_single(
                &mut state,
                &rules,
                &config,
                "Isle",
                &mut AutoCasualties,
                &mut Vec::new()
            ),
            Err(ActionError::BattleNotFound("Isle".into()))
        );
        // Empty queue is a no-op
        let before = state.clone();
        let outcomes =
            resolve_all_battles(&mut state, &rules, &config, &mut AutoCasualties, &mut Vec::new())
                .unwrap();
        assert!(outcomes.is_empty());
        assert_eq!(state, before);
    }
}
