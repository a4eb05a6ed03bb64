//! World invariants: consistency checks that detect engine bugs.
//!
//! None of these should ever fire after a command the engine accepted. A
//! violation means the state can no longer be trusted.

use crate::state::{unit_def, unit_domain, Phase, UnitId, WorldState};
use rustc_hash::FxHashMap;
use thiserror::Error;
use wardata::{Domain, Rules, TerritoryKind};

/// Invariant violation error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invariant violation: {message}")]
pub struct InvariantViolation {
    /// Description of the violated invariant.
    pub message: String,
}

impl InvariantViolation {
    fn new(message: String) -> Self {
        Self { message }
    }
}

/// Check all world invariants.
///
/// Returns every violation found; empty when the state is consistent.
#[must_use]
pub fn check_invariants(state: &WorldState, rules: &Rules) -> Vec<InvariantViolation> {
    let mut violations = Vec::new();
    let mut v = |message: String| violations.push(InvariantViolation::new(message));

    let order_len = rules.turn_order().len();
    if state.turn_index >= order_len {
        v(format!(
            "turn index {} outside turn order of {}",
            state.turn_index, order_len
        ));
    }

    // Every unit sits in exactly one place.
    let mut placements: FxHashMap<UnitId, u32> = FxHashMap::default();
    for (tid, territory) in &state.territories {
        let Some(def) = rules.territory(tid) else {
            v(format!("unknown territory {} in state", tid));
            continue;
        };
        match (def.kind, &territory.owner) {
            (TerritoryKind::Sea, Some(owner)) => {
                v(format!("sea zone {} owned by {}", tid, owner));
            }
            (TerritoryKind::Land, Some(owner)) if rules.faction(owner).is_none() => {
                v(format!("{} owned by unknown faction {}", tid, owner));
            }
            _ => {}
        }

        for &id in &territory.units {
            *placements.entry(id).or_insert(0) += 1;
            let Some(unit) = state.units.get(&id) else {
                v(format!("{} lists missing unit {}", tid, id));
                continue;
            };
            if unit.embarked_on.is_some() {
                v(format!("unit {} is in {} and embarked", id, tid));
            }
            let domain = unit_domain(rules, unit);
            if domain != Domain::Air && !domain.can_rest_in(def.kind) {
                v(format!("{:?} unit {} rests in {:?} {}", domain, id, def.kind, tid));
            }
        }

        let in_combat = matches!(state.phase, Phase::CombatMove | Phase::ConductCombat);
        if !in_combat && state.is_contested(rules, tid) {
            v(format!("opposing coalitions share {} during {}", tid, state.phase));
        }
    }

    for (&id, unit) in &state.units {
        if id != unit.id {
            v(format!("unit keyed {} has id {}", id, unit.id));
        }
        if id >= state.next_unit_id {
            v(format!("unit {} not below next id {}", id, state.next_unit_id));
        }
        if rules.faction(&unit.owner).is_none() {
            v(format!("unit {} owned by unknown faction {}", id, unit.owner));
        }
        let Some(def) = unit_def(rules, unit) else {
            v(format!("unit {} has unknown type {}", id, unit.unit_type));
            continue;
        };
        if unit.moves_left > def.movement {
            v(format!(
                "unit {} has {} moves left, allowance {}",
                id, unit.moves_left, def.movement
            ));
        }
        if unit.hit_points == 0 || unit.hit_points > def.hit_points {
            v(format!(
                "unit {} has {} hit points, max {}",
                id, unit.hit_points, def.hit_points
            ));
        }

        if unit.cargo.len() > def.capacity as usize {
            v(format!(
                "transport {} carries {} over capacity {}",
                id,
                unit.cargo.len(),
                def.capacity
            ));
        }
        for &c in &unit.cargo {
            *placements.entry(c).or_insert(0) += 1;
            match state.units.get(&c) {
                None => v(format!("transport {} carries missing unit {}", id, c)),
                Some(cargo) => {
                    if cargo.embarked_on != Some(id) {
                        v(format!(
                            "unit {} in cargo of {} but embarked on {:?}",
                            c, id, cargo.embarked_on
                        ));
                    }
                    if unit_domain(rules, cargo) != Domain::Land {
                        v(format!("non-land unit {} carried by {}", c, id));
                    }
                    if !cargo.cargo.is_empty() {
                        v(format!("carried unit {} carries cargo itself", c));
                    }
                }
            }
        }
        if let Some(carrier) = unit.embarked_on {
            let listed = state
                .units
                .get(&carrier)
                .is_some_and(|t| t.cargo.contains(&id));
            if !listed {
                v(format!("unit {} embarked on {} but not in its cargo", id, carrier));
            }
        }
    }

    for id in state.units.keys() {
        match placements.get(id).copied().unwrap_or(0) {
            1 => {}
            n => v(format!("unit {} placed {} times", id, n)),
        }
    }

    violations
}
