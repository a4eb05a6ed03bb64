//! Phase and turn progression.

use crate::config::SimConfig;
use crate::observer::GameEvent;
use crate::state::{Phase, WorldState};
use crate::step::ActionError;
use crate::systems::{combat, economy, landing, movement, victory};
use tracing::instrument;
use wardata::Rules;

/// Finish the current phase and advance exactly one step.
///
/// Leaving a phase runs its closing action; leaving Collect Income hands the
/// turn to the next faction (a new round after the last).
///
/// The one exception to advancing: a victory found at a checkpoint ends the
/// game with the phase left at Collect Income.
#[instrument(skip_all, name = "end_phase")]
pub fn end_phase(
    state: &mut WorldState,
    rules: &Rules,
    config: &SimConfig,
    events: &mut Vec<GameEvent>,
) -> Result<(), ActionError> {
    let faction = state.active_faction(rules).clone();
    let from = state.phase;

    match from {
        Phase::Purchase => {}
        Phase::CombatMove => {
            combat::rebuild_pending_battles(state, rules, events);
            combat::apply_unopposed_captures(state, rules, &faction, events);
        }
        Phase::ConductCombat => {
            let battles = std::mem::take(&mut state.battles);
            for battle in &battles {
                combat::resolve_battle(
                    state,
                    rules,
                    battle,
                    &mut combat::AutoCasualties,
                    config.max_battle_rounds,
                    events,
                );
            }
            // Air that struck empty land is released for noncombat moves.
            for unit in state.units.values_mut().filter(|u| u.owner == faction) {
                unit.committed = false;
            }
        }
        Phase::NoncombatMove => landing::enforce_landing(state, rules, events),
        Phase::Mobilize => economy::mobilize(state, rules, &faction, events),
        Phase::CollectIncome => {
            economy::collect_income(state, rules, &faction, events);
            victory::apply_victory_points(state, rules, &faction, events);
            if let Some(won) = victory::evaluate(state, rules, &faction) {
                log::info!("{} win: {}", won.coalition, won.reason);
                events.push(GameEvent::VictoryReached {
                    coalition: won.coalition.clone(),
                    reason: won.reason.clone(),
                });
                state.winner = Some(won);
                return Ok(());
            }
        }
    }

    let to = from.next();
    if from == Phase::CollectIncome {
        state.turn_index = (state.turn_index + 1) % rules.turn_order().len();
        if state.turn_index == 0 {
            state.round += 1;
        }
    }
    state.phase = to;
    let now_active = state.active_faction(rules).clone();
    if to == Phase::CombatMove {
        movement::reset_movement(state, rules, &now_active);
    }

    log::debug!("{}: {} -> {} (round {})", now_active, from, to, state.round);
    events.push(GameEvent::PhaseChanged {
        from,
        to,
        faction: now_active,
        round: state.round,
    });
    Ok(())
}
