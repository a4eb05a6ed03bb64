use crate::rng::DiceRng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use wardata::{
    CoalitionId, Domain, FactionId, Rules, TerritoryId, TerritoryKind, UnitTypeDef, UnitTypeId,
};

pub type UnitId = u32;

/// Phases of a faction's turn, in play order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Purchase,
    CombatMove,
    ConductCombat,
    NoncombatMove,
    Mobilize,
    CollectIncome,
}

impl Phase {
    pub const ALL: [Phase; 6] = [
        Phase::Purchase,
        Phase::CombatMove,
        Phase::ConductCombat,
        Phase::NoncombatMove,
        Phase::Mobilize,
        Phase::CollectIncome,
    ];

    /// Following phase; wraps from CollectIncome to Purchase.
    pub fn next(self) -> Phase {
        match self {
            Phase::Purchase => Phase::CombatMove,
            Phase::CombatMove => Phase::ConductCombat,
            Phase::ConductCombat => Phase::NoncombatMove,
            Phase::NoncombatMove => Phase::Mobilize,
            Phase::Mobilize => Phase::CollectIncome,
            Phase::CollectIncome => Phase::Purchase,
        }
    }

    pub fn is_movement(self) -> bool {
        matches!(self, Phase::CombatMove | Phase::NoncombatMove)
    }

    pub fn name(self) -> &'static str {
        match self {
            Phase::Purchase => "Purchase",
            Phase::CombatMove => "Combat Move",
            Phase::ConductCombat => "Conduct Combat",
            Phase::NoncombatMove => "Noncombat Move",
            Phase::Mobilize => "Mobilize",
            Phase::CollectIncome => "Collect Income",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Unit {
    pub id: UnitId,
    pub unit_type: UnitTypeId,
    pub owner: FactionId,
    pub hit_points: u8,
    pub moves_left: u32,
    /// Entered a hostile space this combat-move phase; cannot move again and
    /// fights as an attacker there.
    pub committed: bool,
    /// Territory last moved from during combat move (retreat target).
    pub origin: Option<TerritoryId>,
    /// Land units riding in this transport.
    pub cargo: Vec<UnitId>,
    /// Transport carrying this unit.
    pub embarked_on: Option<UnitId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TerritoryState {
    pub owner: Option<FactionId>,
    /// Stack in arrival order. Embarked cargo is not listed here.
    pub units: Vec<UnitId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PendingBattle {
    pub territory: TerritoryId,
    pub attacker: FactionId,
    /// Sea zone the attacking land units were unloaded from.
    pub amphibious_from: Option<TerritoryId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PurchaseEntry {
    pub unit_type: UnitTypeId,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Victory {
    pub coalition: CoalitionId,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct VictoryPointState {
    pub enabled: bool,
    pub points: u32,
    /// Gain at the tracked faction's most recent collection.
    pub last_gain: Option<u32>,
}

/// Complete game state. Every map is ordered so serialization is stable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldState {
    pub scenario: String,
    pub round: u32,
    /// Index into the turn order of the faction whose turn it is.
    pub turn_index: usize,
    pub phase: Phase,
    pub territories: BTreeMap<TerritoryId, TerritoryState>,
    pub units: BTreeMap<UnitId, Unit>,
    pub next_unit_id: UnitId,
    pub treasury: BTreeMap<FactionId, u32>,
    pub purchases: BTreeMap<FactionId, Vec<PurchaseEntry>>,
    pub battles: Vec<PendingBattle>,
    pub rng: DiceRng,
    pub victory_rule: String,
    pub victory_points: VictoryPointState,
    pub winner: Option<Victory>,
}

impl WorldState {
    /// Empty board for a scenario: every territory present, nobody owns
    /// anything, no units, empty treasuries.
    pub fn empty(rules: &Rules, seed: u64) -> Self {
        let territories = rules
            .territories()
            .iter()
            .map(|t| (t.id.clone(), TerritoryState::default()))
            .collect();
        let treasury = rules
            .factions()
            .iter()
            .map(|f| (f.id.clone(), 0))
            .collect();
        let purchases = rules
            .factions()
            .iter()
            .map(|f| (f.id.clone(), Vec::new()))
            .collect();
        Self {
            scenario: rules.name().to_string(),
            round: 1,
            turn_index: 0,
            phase: Phase::Purchase,
            territories,
            units: BTreeMap::new(),
            next_unit_id: 1,
            treasury,
            purchases,
            battles: Vec::new(),
            rng: DiceRng::new(seed),
            victory_rule: rules.default_victory_rule().to_string(),
            victory_points: VictoryPointState::default(),
            winner: None,
        }
    }

    /// Starting position of a scenario.
    pub fn from_rules(rules: &Rules, seed: u64) -> Self {
        let mut state = Self::empty(rules, seed);
        let setup = rules.setup();
        for (tid, owner) in &setup.owners {
            if let Some(t) = state.territories.get_mut(tid) {
                t.owner = Some(owner.clone());
            }
        }
        for stack in &setup.stacks {
            for entry in &stack.units {
                let Some(def) = rules.unit_type(&entry.unit_type) else {
                    continue;
                };
                for _ in 0..entry.count {
                    state.spawn_unit(def, &stack.faction, &stack.territory);
                }
            }
        }
        for faction in rules.factions() {
            let balance = faction
                .starting_treasury
                .unwrap_or_else(|| state.income_of(rules, &faction.id));
            state.treasury.insert(faction.id.clone(), balance);
        }
        log::info!(
            "New game '{}' (seed {}): {} units on {} territories",
            state.scenario,
            seed,
            state.units.len(),
            state.territories.len()
        );
        state
    }

    pub fn active_faction<'r>(&self, rules: &'r Rules) -> &'r FactionId {
        let order = rules.turn_order();
        &order[self.turn_index % order.len()]
    }

    /// Create a unit with full hit points and movement at the end of a stack.
    pub fn spawn_unit(&mut self, def: &UnitTypeDef, owner: &str, territory: &str) -> UnitId {
        let id = self.next_unit_id;
        self.next_unit_id += 1;
        self.units.insert(
            id,
            Unit {
                id,
                unit_type: def.id.clone(),
                owner: owner.to_string(),
                hit_points: def.hit_points,
                moves_left: def.movement,
                committed: false,
                origin: None,
                cargo: Vec::new(),
                embarked_on: None,
            },
        );
        self.territories
            .entry(territory.to_string())
            .or_default()
            .units
            .push(id);
        id
    }

    /// Remove a unit from the arena together with anything it carries.
    ///
    /// Returns the removed units, carrier first.
    pub fn remove_unit(&mut self, id: UnitId) -> Vec<Unit> {
        let Some(unit) = self.units.remove(&id) else {
            return Vec::new();
        };
        match unit.embarked_on {
            Some(carrier) => {
                if let Some(c) = self.units.get_mut(&carrier) {
                    c.cargo.retain(|&u| u != id);
                }
            }
            None => {
                for t in self.territories.values_mut() {
                    t.units.retain(|&u| u != id);
                }
            }
        }
        let mut removed = Vec::with_capacity(1 + unit.cargo.len());
        let cargo = unit.cargo.clone();
        removed.push(unit);
        for c in cargo {
            if let Some(mut u) = self.units.remove(&c) {
                u.embarked_on = None;
                removed.push(u);
            }
        }
        removed
    }

    /// Territory a unit is in; embarked units report their transport's.
    pub fn territory_of(&self, id: UnitId) -> Option<&TerritoryId> {
        let unit = self.units.get(&id)?;
        let on_map = unit.embarked_on.unwrap_or(id);
        self.territories
            .iter()
            .find(|(_, t)| t.units.contains(&on_map))
            .map(|(tid, _)| tid)
    }

    /// Units of a stack in order, skipping dangling ids.
    pub fn stack(&self, territory: &str) -> impl Iterator<Item = &Unit> {
        self.territories
            .get(territory)
            .into_iter()
            .flat_map(|t| t.units.iter())
            .filter_map(|id| self.units.get(id))
    }

    pub fn owner_of(&self, territory: &str) -> Option<&FactionId> {
        self.territories.get(territory)?.owner.as_ref()
    }

    /// Land owned by a faction of the other coalition.
    pub fn is_enemy_land(&self, rules: &Rules, territory: &str, faction: &str) -> bool {
        let is_land = rules
            .territory(territory)
            .is_some_and(|t| t.kind == TerritoryKind::Land);
        is_land
            && self
                .owner_of(territory)
                .is_some_and(|owner| !rules.are_allied(owner, faction))
    }

    /// Any unit in the stack belongs to the other coalition.
    pub fn has_enemy_units(&self, rules: &Rules, territory: &str, faction: &str) -> bool {
        self.stack(territory)
            .any(|u| !rules.are_allied(&u.owner, faction))
    }

    /// Enemy-owned land, or a sea zone holding enemy units.
    pub fn is_hostile(&self, rules: &Rules, territory: &str, faction: &str) -> bool {
        if self.is_enemy_land(rules, territory, faction) {
            return true;
        }
        let is_sea = rules
            .territory(territory)
            .is_some_and(|t| t.kind == TerritoryKind::Sea);
        is_sea && self.has_enemy_units(rules, territory, faction)
    }

    /// Stack holds units of both coalitions.
    pub fn is_contested(&self, rules: &Rules, territory: &str) -> bool {
        let mut owners = self.stack(territory).map(|u| u.owner.as_str());
        match owners.next() {
            Some(first) => owners.any(|o| !rules.are_allied(first, o)),
            None => false,
        }
    }

    /// Income of all land a faction currently owns.
    pub fn income_of(&self, rules: &Rules, faction: &str) -> u32 {
        rules
            .territories()
            .iter()
            .filter(|t| t.kind == TerritoryKind::Land)
            .filter(|t| self.owner_of(&t.id).is_some_and(|o| o == faction))
            .map(|t| t.income)
            .sum()
    }

    /// Territory is owned by a member of the coalition.
    pub fn coalition_holds(&self, rules: &Rules, coalition: &str, territory: &str) -> bool {
        self.owner_of(territory)
            .and_then(|o| rules.coalition_of(o))
            .is_some_and(|c| c == coalition)
    }

    pub fn treasury_of(&self, faction: &str) -> u32 {
        self.treasury.get(faction).copied().unwrap_or(0)
    }

    /// Compute a deterministic checksum of the world state.
    ///
    /// Identical states produce identical checksums; used to compare replays
    /// and restored saves.
    pub fn checksum(&self) -> u64 {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();

        self.round.hash(&mut hasher);
        self.turn_index.hash(&mut hasher);
        self.phase.hash(&mut hasher);
        self.rng.hash(&mut hasher);

        // BTreeMap iteration is already sorted by key
        for (tid, t) in &self.territories {
            tid.hash(&mut hasher);
            t.owner.hash(&mut hasher);
            t.units.hash(&mut hasher);
        }
        for (id, u) in &self.units {
            id.hash(&mut hasher);
            u.hash(&mut hasher);
        }
        self.next_unit_id.hash(&mut hasher);
        for (f, balance) in &self.treasury {
            f.hash(&mut hasher);
            balance.hash(&mut hasher);
        }
        for (f, queue) in &self.purchases {
            f.hash(&mut hasher);
            queue.hash(&mut hasher);
        }
        self.battles.hash(&mut hasher);
        self.victory_rule.hash(&mut hasher);
        self.victory_points.hash(&mut hasher);
        self.winner.hash(&mut hasher);

        hasher.finish()
    }
}

/// Definition of a unit's type.
pub fn unit_def<'r>(rules: &'r Rules, unit: &Unit) -> Option<&'r UnitTypeDef> {
    rules.unit_type(&unit.unit_type)
}

/// Domain of a unit's type; unknown types count as land.
pub fn unit_domain(rules: &Rules, unit: &Unit) -> Domain {
    unit_def(rules, unit).map_or(Domain::Land, |d| d.domain)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{skirmish_rules, WorldStateBuilder};

    #[test]
    fn test_phase_cycle() {
        let mut phase = Phase::Purchase;
        for expected in Phase::ALL.iter().skip(1) {
            phase = phase.next();
            assert_eq!(phase, *expected);
        }
        assert_eq!(phase.next(), Phase::Purchase);
        assert_eq!(Phase::NoncombatMove.to_string(), "Noncombat Move");
    }

    #[test]
    fn test_from_rules_lite() {
        let rules = wardata::scenario::lite().unwrap();
        let state = WorldState::from_rules(&rules, 1);
        assert_eq!(state.round, 1);
        assert_eq!(state.phase, Phase::Purchase);
        assert_eq!(state.active_faction(&rules), "USSR");
        // Starting treasury defaults to starting income.
        assert_eq!(state.treasury_of("USSR"), 13);
        assert_eq!(state.treasury_of("Germany"), 8);
        assert_eq!(state.treasury_of("UK"), 17);
        assert_eq!(state.treasury_of("Japan"), 12);
        assert_eq!(state.treasury_of("USA"), 12);
        assert_eq!(state.owner_of("NPAC"), None);
        assert_eq!(state.stack("MOS").count(), 9);
        assert_eq!(state.units.len(), 63);
    }

    #[test]
    fn test_hostility() {
        let rules = skirmish_rules();
        let state = WorldStateBuilder::new(&rules)
            .with_units("MidSea", "Blue", "dd", 1)
            .build();
        assert!(state.is_enemy_land(&rules, "BlueField", "Red"));
        assert!(!state.is_enemy_land(&rules, "PinkHome", "Red"));
        assert!(state.is_hostile(&rules, "MidSea", "Red"));
        assert!(!state.is_hostile(&rules, "MidSea", "Blue"));
        assert!(!state.is_hostile(&rules, "WestSea", "Red"));
    }

    #[test]
    fn test_remove_unit_takes_cargo() {
        let rules = skirmish_rules();
        let mut state = WorldStateBuilder::new(&rules)
            .with_units("WestSea", "Red", "trn", 1)
            .with_units("RedHome", "Red", "inf", 1)
            .build();
        let (trn, inf) = (1, 2);
        state.territories.get_mut("RedHome").unwrap().units.clear();
        state.units.get_mut(&trn).unwrap().cargo.push(inf);
        state.units.get_mut(&inf).unwrap().embarked_on = Some(trn);

        assert_eq!(state.territory_of(inf).map(String::as_str), Some("WestSea"));
        let removed = state.remove_unit(trn);
        assert_eq!(removed.len(), 2);
        assert!(state.units.is_empty());
        assert!(state.territories["WestSea"].units.is_empty());
    }

    #[test]
    fn test_checksum_determinism() {
        let rules = skirmish_rules();
        let a = WorldStateBuilder::new(&rules)
            .with_units("RedField", "Red", "inf", 2)
            .build();
        let b = a.clone();
        assert_eq!(a.checksum(), b.checksum());
    }

    #[test]
    fn test_checksum_sensitivity() {
        let rules = skirmish_rules();
        let a = WorldStateBuilder::new(&rules).build();
        let mut b = a.clone();
        b.rng.roll_die();
        assert_ne!(a.checksum(), b.checksum());
        let mut c = a.clone();
        c.territories.get_mut("Isle").unwrap().owner = Some("Red".to_string());
        assert_ne!(a.checksum(), c.checksum());
    }
}
