//! End-of-noncombat landing check for air units.

use crate::observer::{DestroyCause, GameEvent};
use crate::state::{unit_def, unit_domain, UnitId, WorldState};
use crate::systems::combat::destroy_unit;
use tracing::instrument;
use wardata::{Domain, Rules, TerritoryKind};

/// Destroy the active coalition's air units with nowhere to land.
///
/// Air on enemy-owned land is lost. At sea, only carrier-landable air may
/// stay, up to the spare air capacity of the coalition's carriers in that
/// zone; the excess goes cheapest first, then earliest in the stack.
#[instrument(skip_all, name = "landing")]
pub fn enforce_landing(state: &mut WorldState, rules: &Rules, events: &mut Vec<GameEvent>) {
    let active = state.active_faction(rules).clone();
    let mut doomed: Vec<(UnitId, String)> = Vec::new();

    for territory in rules.territories() {
        let air: Vec<(usize, UnitId, u32, bool)> = state
            .stack(&territory.id)
            .filter(|u| rules.are_allied(&u.owner, &active))
            .filter(|u| unit_domain(rules, u) == Domain::Air)
            .enumerate()
            .map(|(i, u)| {
                let def = unit_def(rules, u);
                (
                    i,
                    u.id,
                    def.map_or(0, |d| d.cost),
                    def.is_some_and(|d| d.carrier_landable),
                )
            })
            .collect();
        if air.is_empty() {
            continue;
        }

        match territory.kind {
            TerritoryKind::Land => {
                if state.is_enemy_land(rules, &territory.id, &active) {
                    doomed.extend(air.iter().map(|&(_, id, _, _)| (id, territory.id.clone())));
                }
            }
            TerritoryKind::Sea => {
                let deck_space: usize = state
                    .stack(&territory.id)
                    .filter(|u| rules.are_allied(&u.owner, &active))
                    .filter_map(|u| unit_def(rules, u))
                    .map(|d| d.air_capacity as usize)
                    .sum();
                let (mut landable, stranded): (Vec<_>, Vec<_>) =
                    air.into_iter().partition(|&(_, _, _, landable)| landable);
                doomed.extend(stranded.iter().map(|&(_, id, _, _)| (id, territory.id.clone())));
                let excess = landable.len().saturating_sub(deck_space);
                landable.sort_by_key(|&(index, _, cost, _)| (cost, index));
                doomed.extend(
                    landable
                        .iter()
                        .take(excess)
                        .map(|&(_, id, _, _)| (id, territory.id.clone())),
                );
            }
        }
    }

    if !doomed.is_empty() {
        log::info!("{} air units of {}'s coalition failed to land", doomed.len(), active);
    }
    for (id, territory) in doomed {
        destroy_unit(state, id, &territory, DestroyCause::Stranded, events);
    }
}
