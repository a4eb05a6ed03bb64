//! Fixtures shared by unit tests, integration tests and the CLI tests.
//!
//! The skirmish map:
//!
//! ```text
//!   PinkHome ── RedHome ── RedField ── BlueField ── BlueHome
//!        \        |      /        \        /         |
//!         WestSea ──── MidSea ──────── EastSea ──────┘
//!                        |
//!                       Isle
//! ```
//!
//! Red and Pink are allied (East), Blue stands alone (West). Turn order is
//! Red, Blue, Pink.

use crate::state::{Phase, UnitId, WorldState};
use wardata::*;

fn unit(
    id: &str,
    cost: u32,
    attack: u8,
    defense: u8,
    movement: u32,
    domain: Domain,
) -> UnitTypeDef {
    UnitTypeDef {
        id: id.to_string(),
        name: id.to_string(),
        cost,
        attack,
        defense,
        movement,
        domain,
        capacity: 0,
        air_capacity: 0,
        hit_points: 1,
        carrier_landable: false,
    }
}

fn territory(
    id: &str,
    kind: TerritoryKind,
    income: u32,
    neighbors: &[&str],
) -> TerritoryDef {
    TerritoryDef {
        id: id.to_string(),
        name: id.to_string(),
        kind,
        income,
        capital_of: None,
        factory: false,
        victory_territory: false,
        neighbors: neighbors.iter().map(|s| s.to_string()).collect(),
        presentation: None,
    }
}

fn capital(mut t: TerritoryDef, faction: &str) -> TerritoryDef {
    t.capital_of = Some(faction.to_string());
    t.factory = true;
    t.victory_territory = true;
    t
}

/// Raw definition of the skirmish scenario (no starting units).
pub fn skirmish_definition() -> ScenarioDef {
    use wardata::Domain::*;
    use wardata::TerritoryKind::{Land as L, Sea as S};

    let mut trn = unit("trn", 7, 0, 0, 2, Sea);
    trn.capacity = 2;
    let mut cv = unit("cv", 14, 3, 3, 2, Sea);
    cv.air_capacity = 2;
    let mut bb = unit("bb", 20, 4, 4, 2, Sea);
    bb.hit_points = 2;
    let mut ftr = unit("ftr", 10, 3, 4, 4, Air);
    ftr.carrier_landable = true;

    let faction = |id: &str, coalition: &str| FactionDef {
        id: id.to_string(),
        name: id.to_string(),
        coalition: coalition.to_string(),
        starting_treasury: None,
    };

    let owners = [
        ("RedHome", "Red"),
        ("RedField", "Red"),
        ("PinkHome", "Pink"),
        ("BlueField", "Blue"),
        ("BlueHome", "Blue"),
        ("Isle", "Blue"),
    ]
    .into_iter()
    .map(|(t, f)| (t.to_string(), f.to_string()))
    .collect();

    let check = |coalition: &str, checkpoint: Option<&str>, condition: VictoryCondition| {
        VictoryCheck {
            coalition: coalition.to_string(),
            checkpoint: checkpoint.map(str::to_string),
            condition,
        }
    };

    ScenarioDef {
        name: "skirmish".to_string(),
        adjacency: AdjacencyMode::Symmetric,
        factions: vec![
            faction("Red", "East"),
            faction("Blue", "West"),
            faction("Pink", "East"),
        ],
        turn_order: vec!["Red".into(), "Blue".into(), "Pink".into()],
        unit_types: vec![
            unit("inf", 3, 1, 2, 1, Land),
            unit("tank", 5, 3, 3, 2, Land),
            ftr,
            unit("bmb", 12, 4, 1, 6, Air),
            unit("dd", 8, 3, 3, 2, Sea),
            trn,
            cv,
            bb,
        ],
        territories: vec![
            capital(territory("RedHome", L, 10, &["PinkHome", "RedField", "WestSea"]), "Red"),
            territory("RedField", L, 2, &["BlueField", "WestSea", "MidSea"]),
            territory("BlueField", L, 2, &["BlueHome", "MidSea", "EastSea"]),
            capital(territory("BlueHome", L, 10, &["EastSea"]), "Blue"),
            capital(territory("PinkHome", L, 6, &["WestSea"]), "Pink"),
            territory("Isle", L, 1, &["MidSea"]),
            territory("WestSea", S, 0, &["MidSea"]),
            territory("MidSea", S, 0, &["EastSea"]),
            territory("EastSea", S, 0, &[]),
        ],
        setup: Setup {
            owners,
            stacks: Vec::new(),
        },
        victory_rules: vec![
            VictoryRuleDef {
                id: "capitals".to_string(),
                name: "Take the enemy capital".to_string(),
                checks: vec![
                    check(
                        "East",
                        Some("Red"),
                        VictoryCondition::HoldAll {
                            territories: vec!["BlueHome".into()],
                        },
                    ),
                    check(
                        "West",
                        Some("Blue"),
                        VictoryCondition::HoldAny {
                            territories: vec!["RedHome".into(), "PinkHome".into()],
                            count: 1,
                        },
                    ),
                ],
            },
            VictoryRuleDef {
                id: "cities".to_string(),
                name: "Hold two victory cities".to_string(),
                checks: vec![
                    check("East", None, VictoryCondition::VictoryTerritories { threshold: 3 }),
                    check("West", None, VictoryCondition::VictoryTerritories { threshold: 2 }),
                ],
            },
        ],
        default_victory_rule: "capitals".to_string(),
        victory_points: Some(VictoryPointTrack {
            faction: "Red".to_string(),
            income_divisor: 5,
            target: 6,
            zero_gain_loses: true,
        }),
    }
}

/// Compiled skirmish scenario.
pub fn skirmish_rules() -> Rules {
    match Rules::from_definition(skirmish_definition()) {
        Ok(rules) => rules,
        Err(e) => panic!("skirmish scenario is invalid: {e}"),
    }
}

/// Builds a [`WorldState`] for tests on top of a scenario's starting position.
pub struct WorldStateBuilder<'r> {
    rules: &'r Rules,
    state: WorldState,
}

impl<'r> WorldStateBuilder<'r> {
    pub fn new(rules: &'r Rules) -> Self {
        Self {
            rules,
            state: WorldState::from_rules(rules, 0),
        }
    }

    /// Reseed the dice.
    pub fn seed(mut self, seed: u64) -> Self {
        self.state.rng = crate::rng::DiceRng::new(seed);
        self
    }

    /// Jump to a faction's turn and phase without running phase transitions.
    pub fn turn(mut self, faction: &str, phase: Phase) -> Self {
        if let Some(i) = self.rules.turn_order().iter().position(|f| f == faction) {
            self.state.turn_index = i;
        }
        self.state.phase = phase;
        self
    }

    pub fn owner(mut self, territory: &str, faction: Option<&str>) -> Self {
        if let Some(t) = self.state.territories.get_mut(territory) {
            t.owner = faction.map(str::to_string);
        }
        self
    }

    pub fn treasury(mut self, faction: &str, amount: u32) -> Self {
        self.state.treasury.insert(faction.to_string(), amount);
        self
    }

    /// Append `count` units to a stack. Ids are assigned sequentially from 1.
    pub fn with_units(
        mut self,
        territory: &str,
        faction: &str,
        unit_type: &str,
        count: u32,
    ) -> Self {
        if let Some(def) = self.rules.unit_type(unit_type) {
            for _ in 0..count {
                self.state.spawn_unit(def, faction, territory);
            }
        }
        self
    }

    /// Put `cargo` aboard `transport` (ids as assigned by `with_units`).
    pub fn embark(mut self, transport: UnitId, cargo: &[UnitId]) -> Self {
        for &c in cargo {
            for t in self.state.territories.values_mut() {
                t.units.retain(|&u| u != c);
            }
            if let Some(u) = self.state.units.get_mut(&c) {
                u.embarked_on = Some(transport);
            }
        }
        if let Some(t) = self.state.units.get_mut(&transport) {
            t.cargo.extend_from_slice(cargo);
        }
        self
    }

    pub fn build(self) -> WorldState {
        self.state
    }
}
