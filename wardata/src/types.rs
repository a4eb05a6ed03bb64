//! Scenario definition types, as they appear in scenario JSON files.

use crate::defines;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type FactionId = String;
pub type CoalitionId = String;
pub type TerritoryId = String;
pub type UnitTypeId = String;

/// Terrain class a unit type operates in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Land,
    Sea,
    Air,
}

/// Kind of map space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerritoryKind {
    Land,
    Sea,
}

impl Domain {
    /// Whether a unit of this domain may rest in a space of `kind`.
    pub fn can_rest_in(self, kind: TerritoryKind) -> bool {
        match self {
            Domain::Land => kind == TerritoryKind::Land,
            Domain::Sea => kind == TerritoryKind::Sea,
            Domain::Air => true,
        }
    }
}

/// How neighbor lists are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjacencyMode {
    /// Every listed edge is usable in both directions.
    #[default]
    Symmetric,
    /// Edges are one-way as listed.
    Directed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactionDef {
    pub id: FactionId,
    #[serde(default)]
    pub name: String,
    pub coalition: CoalitionId,
    /// Starting balance. When absent the faction starts with the income of
    /// its starting territories.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starting_treasury: Option<u32>,
}

fn default_hit_points() -> u8 {
    defines::unit::DEFAULT_HIT_POINTS
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitTypeDef {
    pub id: UnitTypeId,
    #[serde(default)]
    pub name: String,
    pub cost: u32,
    pub attack: u8,
    pub defense: u8,
    pub movement: u32,
    pub domain: Domain,
    /// Land units this unit can carry as cargo.
    #[serde(default)]
    pub capacity: u32,
    /// Carrier-landable air units this unit can host at sea.
    #[serde(default)]
    pub air_capacity: u32,
    #[serde(default = "default_hit_points")]
    pub hit_points: u8,
    /// Air units only: may end the noncombat phase on a friendly carrier.
    #[serde(default)]
    pub carrier_landable: bool,
}

impl UnitTypeDef {
    pub fn is_transport(&self) -> bool {
        self.capacity > 0
    }

    /// Units that contribute no dice at all are taken as casualties first.
    pub fn is_noncombatant(&self) -> bool {
        self.attack == 0 && self.defense == 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerritoryDef {
    pub id: TerritoryId,
    #[serde(default)]
    pub name: String,
    pub kind: TerritoryKind,
    #[serde(default)]
    pub income: u32,
    /// Faction whose capital this is.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capital_of: Option<FactionId>,
    #[serde(default)]
    pub factory: bool,
    #[serde(default)]
    pub victory_territory: bool,
    #[serde(default)]
    pub neighbors: Vec<TerritoryId>,
    /// Rendering data owned by the presentation layer; carried, never read.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presentation: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitCount {
    pub unit_type: UnitTypeId,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartingStack {
    pub territory: TerritoryId,
    pub faction: FactionId,
    pub units: Vec<UnitCount>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Setup {
    /// Starting owner of each land territory (absent = unowned).
    #[serde(default)]
    pub owners: BTreeMap<TerritoryId, FactionId>,
    #[serde(default)]
    pub stacks: Vec<StartingStack>,
}

/// Shape of a single victory condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VictoryCondition {
    /// Coalition must hold every listed territory.
    HoldAll { territories: Vec<TerritoryId> },
    /// Coalition must hold at least `count` of the listed territories.
    HoldAny {
        territories: Vec<TerritoryId>,
        count: u32,
    },
    /// Coalition must hold at least `threshold` victory territories.
    VictoryTerritories { threshold: u32 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VictoryCheck {
    pub coalition: CoalitionId,
    /// Evaluated after this faction collects income; `None` = after every
    /// faction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkpoint: Option<FactionId>,
    pub condition: VictoryCondition,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VictoryRuleDef {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub checks: Vec<VictoryCheck>,
}

/// Optional victory-point race for a single faction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VictoryPointTrack {
    pub faction: FactionId,
    /// Points gained per collection = income / divisor (rounded down).
    pub income_divisor: u32,
    pub target: u32,
    /// A collection that gains nothing hands the win to the other coalition.
    #[serde(default)]
    pub zero_gain_loses: bool,
}

/// Complete, uncompiled scenario file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioDef {
    pub name: String,
    #[serde(default)]
    pub adjacency: AdjacencyMode,
    pub factions: Vec<FactionDef>,
    pub turn_order: Vec<FactionId>,
    pub unit_types: Vec<UnitTypeDef>,
    pub territories: Vec<TerritoryDef>,
    #[serde(default)]
    pub setup: Setup,
    pub victory_rules: Vec<VictoryRuleDef>,
    pub default_victory_rule: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub victory_points: Option<VictoryPointTrack>,
}
