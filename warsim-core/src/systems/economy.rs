//! Purchasing, mobilization and income.

use crate::observer::GameEvent;
use crate::state::{Phase, PurchaseEntry, UnitId, WorldState};
use crate::step::{require_active, require_phase, ActionError};
use wardata::{Domain, Rules, TerritoryId, TerritoryKind};

/// Buy `count` units for the active faction. Same-type entries merge.
pub fn purchase(
    state: &mut WorldState,
    rules: &Rules,
    faction: &str,
    unit_type: &str,
    count: u32,
    events: &mut Vec<GameEvent>,
) -> Result<(), ActionError> {
    require_phase(state, "purchase", Phase::Purchase)?;
    require_active(state, rules, faction)?;
    let def = rules
        .unit_type(unit_type)
        .ok_or_else(|| ActionError::UnknownUnitType(unit_type.to_string()))?;
    if count == 0 {
        return Err(ActionError::InvalidCount);
    }
    let available = state.treasury_of(faction);
    let required = def.cost.checked_mul(count).unwrap_or(u32::MAX);
    if required > available {
        return Err(ActionError::InsufficientFunds {
            required,
            available,
        });
    }

    let queued = state
        .purchases
        .get(faction)
        .and_then(|q| q.iter().find(|e| e.unit_type == unit_type))
        .map_or(0, |e| e.count);
    let merged = queued
        .checked_add(count)
        .ok_or_else(|| ActionError::QueueOverflow(unit_type.to_string()))?;

    let treasury = available - required;
    state.treasury.insert(faction.to_string(), treasury);
    let queue = state.purchases.entry(faction.to_string()).or_default();
    match queue.iter_mut().find(|e| e.unit_type == unit_type) {
        Some(entry) => entry.count = merged,
        None => queue.push(PurchaseEntry {
            unit_type: unit_type.to_string(),
            count,
        }),
    }
    log::debug!("{} bought {} x {} for {}", faction, count, unit_type, required);
    events.push(GameEvent::PurchaseQueued {
        faction: faction.to_string(),
        unit_type: unit_type.to_string(),
        count,
        cost: required,
        treasury,
    });
    Ok(())
}

/// Empty the active faction's queue and refund it.
pub fn clear_purchases(
    state: &mut WorldState,
    rules: &Rules,
    faction: &str,
    events: &mut Vec<GameEvent>,
) -> Result<(), ActionError> {
    require_phase(state, "clear_purchases", Phase::Purchase)?;
    require_active(state, rules, faction)?;

    let overflow = || ActionError::QueueOverflow(faction.to_string());
    let queue = state.purchases.get(faction).map(Vec::as_slice).unwrap_or(&[]);
    let mut refund: u32 = 0;
    for entry in queue {
        let cost = rules.unit_type(&entry.unit_type).map_or(0, |d| d.cost);
        refund = cost
            .checked_mul(entry.count)
            .and_then(|c| refund.checked_add(c))
            .ok_or_else(overflow)?;
    }
    let treasury = state
        .treasury_of(faction)
        .checked_add(refund)
        .ok_or_else(overflow)?;
    state.purchases.insert(faction.to_string(), Vec::new());
    state.treasury.insert(faction.to_string(), treasury);
    events.push(GameEvent::PurchasesCleared {
        faction: faction.to_string(),
        refund,
        treasury,
    });
    Ok(())
}

/// First sea zone next to `territory` (id order) holding no enemy units.
fn launch_zone(
    state: &WorldState,
    rules: &Rules,
    territory: &str,
    faction: &str,
) -> Option<TerritoryId> {
    rules
        .neighbors(territory)
        .filter(|n| rules.territory(n).is_some_and(|t| t.kind == TerritoryKind::Sea))
        .find(|n| !state.has_enemy_units(rules, n, faction))
        .cloned()
}

/// Place as much of the queue as possible at a factory. Ships go to the
/// adjacent launch zone; entries that cannot be placed stay queued.
///
/// Returns the units created.
fn place_at(
    state: &mut WorldState,
    rules: &Rules,
    faction: &str,
    factory: &str,
    events: &mut Vec<GameEvent>,
) -> Vec<UnitId> {
    let queue = state.purchases.remove(faction).unwrap_or_default();
    let zone = launch_zone(state, rules, factory, faction);
    let mut placed: Vec<UnitId> = Vec::new();
    let mut ships: Vec<UnitId> = Vec::new();
    let mut kept = Vec::new();

    for entry in queue {
        let Some(def) = rules.unit_type(&entry.unit_type) else {
            kept.push(entry);
            continue;
        };
        let target = match (def.domain, &zone) {
            (Domain::Sea, Some(zone)) => zone.clone(),
            (Domain::Sea, None) => {
                kept.push(entry);
                continue;
            }
            _ => factory.to_string(),
        };
        for _ in 0..entry.count {
            let id = state.spawn_unit(def, faction, &target);
            if def.domain == Domain::Sea {
                ships.push(id);
            } else {
                placed.push(id);
            }
        }
    }

    if !placed.is_empty() {
        events.push(GameEvent::PurchasePlaced {
            faction: faction.to_string(),
            territory: factory.to_string(),
            units: placed.clone(),
        });
    }
    if let (Some(zone), false) = (&zone, ships.is_empty()) {
        events.push(GameEvent::PurchasePlaced {
            faction: faction.to_string(),
            territory: zone.clone(),
            units: ships.clone(),
        });
    }
    if !kept.is_empty() {
        events.push(GameEvent::PurchaseDeferred {
            faction: faction.to_string(),
            reason: format!("no free sea zone next to {}", factory),
        });
    }
    state.purchases.insert(faction.to_string(), kept);
    placed.extend(ships);
    log::debug!("{} placed {} units at {}", faction, placed.len(), factory);
    placed
}

/// Place the active faction's queue at one of its factories.
pub fn place_purchase(
    state: &mut WorldState,
    rules: &Rules,
    faction: &str,
    territory: &str,
    events: &mut Vec<GameEvent>,
) -> Result<(), ActionError> {
    require_phase(state, "place_purchase", Phase::Mobilize)?;
    require_active(state, rules, faction)?;
    let def = rules
        .territory(territory)
        .ok_or_else(|| ActionError::UnknownTerritory(territory.to_string()))?;
    if !def.factory {
        return Err(ActionError::NotAFactory(territory.to_string()));
    }
    if state.owner_of(territory).is_none_or(|o| o != faction) {
        return Err(ActionError::NotOwned {
            territory: territory.to_string(),
            faction: faction.to_string(),
        });
    }
    if state.purchases.get(faction).is_none_or(|q| q.is_empty()) {
        return Err(ActionError::NothingToPlace(faction.to_string()));
    }
    if place_at(state, rules, faction, territory, events).is_empty() {
        return Err(ActionError::NoSeaZone(territory.to_string()));
    }
    Ok(())
}

/// End-of-mobilize placement: whatever is still queued goes to the first
/// factory the faction owns, in rule order. With no factory it stays queued.
pub fn mobilize(state: &mut WorldState, rules: &Rules, faction: &str, events: &mut Vec<GameEvent>) {
    if state.purchases.get(faction).is_none_or(|q| q.is_empty()) {
        return;
    }
    let factory = rules
        .factories()
        .find(|t| state.owner_of(&t.id).is_some_and(|o| o == faction))
        .map(|t| t.id.clone());
    match factory {
        Some(factory) => {
            place_at(state, rules, faction, &factory, events);
        }
        None => {
            log::info!("{} owns no factory; purchases stay queued", faction);
            events.push(GameEvent::PurchaseDeferred {
                faction: faction.to_string(),
                reason: "no factory".to_string(),
            });
        }
    }
}

/// Add the income of everything the faction owns to its treasury.
pub fn collect_income(
    state: &mut WorldState,
    rules: &Rules,
    faction: &str,
    events: &mut Vec<GameEvent>,
) -> u32 {
    let amount = state.income_of(rules, faction);
    let treasury = state.treasury_of(faction).saturating_add(amount);
    state.treasury.insert(faction.to_string(), treasury);
    log::info!("{} collects {} (treasury {})", faction, amount, treasury);
    events.push(GameEvent::IncomeCollected {
        faction: faction.to_string(),
        amount,
        treasury,
    });
    amount
}
