//! Compiled, validated rule tables.
//!
//! A [`ScenarioDef`] is whatever the JSON said; a [`Rules`] is a scenario that
//! passed validation and has its lookups indexed. The engine only ever sees
//! `Rules`, so it can treat every id reference inside as resolvable.

use crate::adjacency::AdjacencyGraph;
use crate::error::RulesError;
use crate::types::*;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone)]
pub struct Rules {
    name: String,
    factions: Vec<FactionDef>,
    faction_index: BTreeMap<FactionId, usize>,
    coalitions: [CoalitionId; 2],
    turn_order: Vec<FactionId>,
    unit_types: Vec<UnitTypeDef>,
    unit_index: BTreeMap<UnitTypeId, usize>,
    territories: Vec<TerritoryDef>,
    territory_index: BTreeMap<TerritoryId, usize>,
    adjacency: AdjacencyGraph,
    setup: Setup,
    victory_rules: Vec<VictoryRuleDef>,
    default_victory_rule: String,
    victory_points: Option<VictoryPointTrack>,
}

fn index_ids<'a, I>(kind: &'static str, ids: I) -> Result<BTreeMap<String, usize>, RulesError>
where
    I: IntoIterator<Item = &'a String>,
{
    let mut index = BTreeMap::new();
    for (i, id) in ids.into_iter().enumerate() {
        if index.insert(id.clone(), i).is_some() {
            return Err(RulesError::DuplicateId {
                kind,
                id: id.clone(),
            });
        }
    }
    Ok(index)
}

fn unknown(context: impl Into<String>, kind: &'static str, id: &str) -> RulesError {
    RulesError::UnknownReference {
        context: context.into(),
        kind,
        id: id.to_string(),
    }
}

impl Rules {
    /// Validate a scenario definition and index it.
    pub fn from_definition(def: ScenarioDef) -> Result<Self, RulesError> {
        let faction_index = index_ids("faction", def.factions.iter().map(|f| &f.id))?;
        let unit_index = index_ids("unit type", def.unit_types.iter().map(|u| &u.id))?;
        let territory_index = index_ids("territory", def.territories.iter().map(|t| &t.id))?;
        index_ids("victory rule", def.victory_rules.iter().map(|r| &r.id))?;

        let mut coalitions: Vec<CoalitionId> = Vec::new();
        for f in &def.factions {
            if !coalitions.contains(&f.coalition) {
                coalitions.push(f.coalition.clone());
            }
        }
        let coalitions: [CoalitionId; 2] = match <[CoalitionId; 2]>::try_from(coalitions) {
            Ok(pair) => pair,
            Err(found) => return Err(RulesError::CoalitionCount(found.len())),
        };

        validate_turn_order(&def.turn_order, &faction_index)?;

        for u in &def.unit_types {
            validate_unit_type(u)?;
        }

        let mut adjacency = AdjacencyGraph::new();
        for t in &def.territories {
            if t.kind == TerritoryKind::Sea {
                if t.income > 0 {
                    return Err(RulesError::InvalidSea {
                        id: t.id.clone(),
                        reason: "sea zones produce no income",
                    });
                }
                if t.factory {
                    return Err(RulesError::InvalidSea {
                        id: t.id.clone(),
                        reason: "sea zones cannot hold a factory",
                    });
                }
                if t.capital_of.is_some() {
                    return Err(RulesError::InvalidSea {
                        id: t.id.clone(),
                        reason: "sea zones cannot be a capital",
                    });
                }
            }
            if let Some(cap) = &t.capital_of {
                if !faction_index.contains_key(cap) {
                    return Err(unknown(format!("Capital {}", t.id), "faction", cap));
                }
            }
            for n in &t.neighbors {
                if n == &t.id {
                    return Err(RulesError::SelfAdjacency(t.id.clone()));
                }
                if !territory_index.contains_key(n) {
                    return Err(unknown(
                        format!("Neighbors of {}", t.id),
                        "territory",
                        n,
                    ));
                }
                match def.adjacency {
                    AdjacencyMode::Symmetric => adjacency.add_adjacency(&t.id, n),
                    AdjacencyMode::Directed => adjacency.add_edge(&t.id, n),
                }
            }
        }

        let rules = Self {
            name: def.name,
            factions: def.factions,
            faction_index,
            coalitions,
            turn_order: def.turn_order,
            unit_types: def.unit_types,
            unit_index,
            territories: def.territories,
            territory_index,
            adjacency,
            setup: def.setup,
            victory_rules: def.victory_rules,
            default_victory_rule: def.default_victory_rule,
            victory_points: def.victory_points,
        };
        rules.validate_setup()?;
        rules.validate_victory()?;

        log::debug!(
            "Compiled scenario '{}': {} factions, {} unit types, {} territories, {} victory rules",
            rules.name,
            rules.factions.len(),
            rules.unit_types.len(),
            rules.territories.len(),
            rules.victory_rules.len()
        );
        Ok(rules)
    }

    fn validate_setup(&self) -> Result<(), RulesError> {
        for (tid, owner) in &self.setup.owners {
            let t = self
                .territory(tid)
                .ok_or_else(|| unknown("Setup owners", "territory", tid))?;
            if t.kind == TerritoryKind::Sea {
                return Err(RulesError::Setup(format!("sea zone {tid} cannot be owned")));
            }
            if self.faction(owner).is_none() {
                return Err(unknown(format!("Owner of {tid}"), "faction", owner));
            }
        }

        let mut present: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        for stack in &self.setup.stacks {
            let t = self
                .territory(&stack.territory)
                .ok_or_else(|| unknown("Setup stack", "territory", &stack.territory))?;
            let coalition = self
                .coalition_of(&stack.faction)
                .ok_or_else(|| unknown(format!("Stack at {}", t.id), "faction", &stack.faction))?;
            for entry in &stack.units {
                let ut = self.unit_type(&entry.unit_type).ok_or_else(|| {
                    unknown(format!("Stack at {}", t.id), "unit type", &entry.unit_type)
                })?;
                if !ut.domain.can_rest_in(t.kind) {
                    return Err(RulesError::Setup(format!(
                        "{} cannot start in {}",
                        ut.id, t.id
                    )));
                }
            }
            present
                .entry(t.id.as_str())
                .or_default()
                .insert(coalition.as_str());
        }
        if let Some((tid, _)) = present.iter().find(|(_, sides)| sides.len() > 1) {
            return Err(RulesError::Setup(format!(
                "both coalitions start in {tid}"
            )));
        }
        Ok(())
    }

    fn validate_victory(&self) -> Result<(), RulesError> {
        if self.victory_rule(&self.default_victory_rule).is_none() {
            return Err(unknown(
                "Default victory rule",
                "victory rule",
                &self.default_victory_rule,
            ));
        }
        for rule in &self.victory_rules {
            let bad = |reason: String| RulesError::VictoryRule {
                rule: rule.id.clone(),
                reason,
            };
            if rule.checks.is_empty() {
                return Err(bad("no checks".to_string()));
            }
            for check in &rule.checks {
                if !self.coalitions.contains(&check.coalition) {
                    return Err(bad(format!("unknown coalition {}", check.coalition)));
                }
                if let Some(cp) = &check.checkpoint {
                    if self.faction(cp).is_none() {
                        return Err(bad(format!("unknown checkpoint faction {cp}")));
                    }
                }
                match &check.condition {
                    VictoryCondition::HoldAll { territories } => {
                        self.validate_victory_territories(territories, &bad)?;
                        if territories.is_empty() {
                            return Err(bad("hold_all lists no territories".to_string()));
                        }
                    }
                    VictoryCondition::HoldAny { territories, count } => {
                        self.validate_victory_territories(territories, &bad)?;
                        if *count == 0 || *count as usize > territories.len() {
                            return Err(bad(format!(
                                "hold_any count {count} out of range for {} territories",
                                territories.len()
                            )));
                        }
                    }
                    VictoryCondition::VictoryTerritories { threshold } => {
                        let available = self.victory_territories().count();
                        if *threshold == 0 || *threshold as usize > available {
                            return Err(bad(format!(
                                "threshold {threshold} not in 1..={available} victory territories"
                            )));
                        }
                    }
                }
            }
        }
        if let Some(vp) = &self.victory_points {
            if self.faction(&vp.faction).is_none() {
                return Err(unknown("Victory point track", "faction", &vp.faction));
            }
            if vp.income_divisor == 0 {
                return Err(RulesError::VictoryRule {
                    rule: "victory_points".to_string(),
                    reason: "income divisor must be positive".to_string(),
                });
            }
        }
        Ok(())
    }

    fn validate_victory_territories(
        &self,
        territories: &[TerritoryId],
        bad: &impl Fn(String) -> RulesError,
    ) -> Result<(), RulesError> {
        for tid in territories {
            match self.territory(tid) {
                None => return Err(bad(format!("unknown territory {tid}"))),
                Some(t) if t.kind == TerritoryKind::Sea => {
                    return Err(bad(format!("sea zone {tid} cannot be held")));
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn factions(&self) -> &[FactionDef] {
        &self.factions
    }

    pub fn faction(&self, id: &str) -> Option<&FactionDef> {
        self.faction_index.get(id).map(|&i| &self.factions[i])
    }

    pub fn coalition_of(&self, faction: &str) -> Option<&CoalitionId> {
        self.faction(faction).map(|f| &f.coalition)
    }

    /// Both factions known and in the same coalition.
    pub fn are_allied(&self, a: &str, b: &str) -> bool {
        match (self.coalition_of(a), self.coalition_of(b)) {
            (Some(ca), Some(cb)) => ca == cb,
            _ => false,
        }
    }

    pub fn coalitions(&self) -> &[CoalitionId; 2] {
        &self.coalitions
    }

    pub fn other_coalition(&self, coalition: &str) -> &CoalitionId {
        if self.coalitions[0] == coalition {
            &self.coalitions[1]
        } else {
            &self.coalitions[0]
        }
    }

    pub fn turn_order(&self) -> &[FactionId] {
        &self.turn_order
    }

    pub fn unit_types(&self) -> &[UnitTypeDef] {
        &self.unit_types
    }

    pub fn unit_type(&self, id: &str) -> Option<&UnitTypeDef> {
        self.unit_index.get(id).map(|&i| &self.unit_types[i])
    }

    /// Territories in definition order.
    pub fn territories(&self) -> &[TerritoryDef] {
        &self.territories
    }

    pub fn territory(&self, id: &str) -> Option<&TerritoryDef> {
        self.territory_index.get(id).map(|&i| &self.territories[i])
    }

    pub fn victory_territories(&self) -> impl Iterator<Item = &TerritoryDef> {
        self.territories.iter().filter(|t| t.victory_territory)
    }

    /// Factory territories in definition order.
    pub fn factories(&self) -> impl Iterator<Item = &TerritoryDef> {
        self.territories.iter().filter(|t| t.factory)
    }

    pub fn adjacency(&self) -> &AdjacencyGraph {
        &self.adjacency
    }

    pub fn are_adjacent(&self, from: &str, to: &str) -> bool {
        self.adjacency.are_adjacent(from, to)
    }

    pub fn neighbors(&self, territory: &str) -> impl Iterator<Item = &TerritoryId> {
        self.adjacency.neighbors(territory)
    }

    pub fn setup(&self) -> &Setup {
        &self.setup
    }

    pub fn victory_rules(&self) -> &[VictoryRuleDef] {
        &self.victory_rules
    }

    pub fn victory_rule(&self, id: &str) -> Option<&VictoryRuleDef> {
        self.victory_rules.iter().find(|r| r.id == id)
    }

    pub fn default_victory_rule(&self) -> &str {
        &self.default_victory_rule
    }

    pub fn victory_points(&self) -> Option<&VictoryPointTrack> {
        self.victory_points.as_ref()
    }
}

fn validate_turn_order(
    order: &[FactionId],
    factions: &BTreeMap<FactionId, usize>,
) -> Result<(), RulesError> {
    let mut seen = BTreeSet::new();
    for f in order {
        if !factions.contains_key(f) {
            return Err(unknown("Turn order", "faction", f));
        }
        if !seen.insert(f) {
            return Err(RulesError::TurnOrder(format!("{f} appears twice")));
        }
    }
    if seen.len() != factions.len() {
        return Err(RulesError::TurnOrder(format!(
            "{} of {} factions have a turn",
            seen.len(),
            factions.len()
        )));
    }
    Ok(())
}

fn validate_unit_type(u: &UnitTypeDef) -> Result<(), RulesError> {
    let bad = |reason| RulesError::InvalidUnitType {
        id: u.id.clone(),
        reason,
    };
    if u.hit_points == 0 {
        return Err(bad("hit points must be at least 1"));
    }
    if u.cost == 0 {
        return Err(bad("cost must be at least 1"));
    }
    if u.capacity > 0 && u.domain != Domain::Sea {
        return Err(bad("only sea units can carry cargo"));
    }
    if u.air_capacity > 0 && u.domain != Domain::Sea {
        return Err(bad("only sea units can host aircraft"));
    }
    if u.carrier_landable && u.domain != Domain::Air {
        return Err(bad("only air units can land on carriers"));
    }
    if u.attack > crate::defines::dice::SIDES || u.defense > crate::defines::dice::SIDES {
        return Err(bad("combat values exceed die faces"));
    }
    Ok(())
}

#[cfg(test)]
#[path = "rules_tests.rs"]
mod tests;
