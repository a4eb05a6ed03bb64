//! Victory conditions and the victory point track.

use crate::observer::GameEvent;
use crate::state::{Phase, Victory, WorldState};
use crate::step::{require_phase, ActionError};
use wardata::{Rules, VictoryCondition};

fn held<'a>(
    state: &WorldState,
    rules: &Rules,
    coalition: &str,
    territories: &'a [String],
) -> Vec<&'a str> {
    territories
        .iter()
        .filter(|t| state.coalition_holds(rules, coalition, t))
        .map(String::as_str)
        .collect()
}

fn check_condition(
    state: &WorldState,
    rules: &Rules,
    coalition: &str,
    condition: &VictoryCondition,
) -> Option<String> {
    match condition {
        VictoryCondition::HoldAll { territories } => {
            let held = held(state, rules, coalition, territories);
            (held.len() == territories.len())
                .then(|| format!("{} hold {}", coalition, territories.join(", ")))
        }
        VictoryCondition::HoldAny { territories, count } => {
            let held = held(state, rules, coalition, territories);
            (held.len() >= *count as usize)
                .then(|| format!("{} hold {}", coalition, held.join(", ")))
        }
        VictoryCondition::VictoryTerritories { threshold } => {
            let count = rules
                .victory_territories()
                .filter(|t| state.coalition_holds(rules, coalition, &t.id))
                .count();
            (count >= *threshold as usize)
                .then(|| format!("{} hold {} victory territories", coalition, count))
        }
    }
}

/// Decide whether the game is won as of `checkpoint`'s income collection.
///
/// Checks of the selected rule run in order, skipping those tied to another
/// checkpoint faction; the victory point track comes last.
pub fn evaluate(state: &WorldState, rules: &Rules, checkpoint: &str) -> Option<Victory> {
    let rule = rules
        .victory_rule(&state.victory_rule)
        .or_else(|| rules.victory_rule(rules.default_victory_rule()))?;

    for check in &rule.checks {
        if check.checkpoint.as_deref().is_some_and(|c| c != checkpoint) {
            continue;
        }
        if let Some(reason) = check_condition(state, rules, &check.coalition, &check.condition) {
            return Some(Victory {
                coalition: check.coalition.clone(),
                reason,
            });
        }
    }

    let track = rules.victory_points()?;
    if !state.victory_points.enabled || track.faction != checkpoint {
        return None;
    }
    let coalition = rules.coalition_of(&track.faction)?;
    if state.victory_points.points >= track.target {
        return Some(Victory {
            coalition: coalition.clone(),
            reason: format!(
                "{} reached {} victory points",
                track.faction, state.victory_points.points
            ),
        });
    }
    if track.zero_gain_loses && state.victory_points.last_gain == Some(0) {
        return Some(Victory {
            coalition: rules.other_coalition(coalition).clone(),
            reason: format!("{} gained no victory points", track.faction),
        });
    }
    None
}

/// Award victory points to the tracked faction at its income collection.
pub fn apply_victory_points(
    state: &mut WorldState,
    rules: &Rules,
    faction: &str,
    events: &mut Vec<GameEvent>,
) {
    let Some(track) = rules.victory_points() else {
        return;
    };
    if !state.victory_points.enabled || track.faction != faction {
        return;
    }
    let gained = state.income_of(rules, faction) / track.income_divisor;
    let vp = &mut state.victory_points;
    vp.points += gained;
    vp.last_gain = Some(gained);
    log::info!("{} gains {} victory points ({})", faction, gained, vp.points);
    events.push(GameEvent::VictoryPointsGained {
        faction: faction.to_string(),
        gained,
        total: vp.points,
    });
}

/// Choose the victory preset. Only during a purchase phase.
pub fn set_victory_rule(
    state: &mut WorldState,
    rules: &Rules,
    rule: &str,
    events: &mut Vec<GameEvent>,
) -> Result<(), ActionError> {
    require_phase(state, "set_victory_rule", Phase::Purchase)?;
    if rules.victory_rule(rule).is_none() {
        return Err(ActionError::UnknownVictoryRule(rule.to_string()));
    }
    state.victory_rule = rule.to_string();
    events.push(GameEvent::VictoryRuleChanged {
        rule: rule.to_string(),
    });
    Ok(())
}

/// Switch the victory point track on or off. Points already earned are kept.
pub fn set_victory_points(
    state: &mut WorldState,
    rules: &Rules,
    enabled: bool,
    events: &mut Vec<GameEvent>,
) -> Result<(), ActionError> {
    if rules.victory_points().is_none() {
        return Err(ActionError::VictoryPointsUnavailable);
    }
    state.victory_points.enabled = enabled;
    events.push(GameEvent::VictoryPointsToggled { enabled });
    Ok(())
}
