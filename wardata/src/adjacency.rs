use crate::types::TerritoryId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Graph of territory adjacencies.
///
/// Ordered sets keep neighbor iteration stable, which matters for the
/// deterministic placement rules (e.g. "first adjacent sea zone").
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjacencyGraph {
    adjacencies: BTreeMap<TerritoryId, BTreeSet<TerritoryId>>,
}

impl AdjacencyGraph {
    /// Create a new empty adjacency graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a bidirectional adjacency between two territories.
    pub fn add_adjacency(&mut self, a: &str, b: &str) {
        self.add_edge(a, b);
        self.add_edge(b, a);
    }

    /// Add a one-way edge.
    pub fn add_edge(&mut self, from: &str, to: &str) {
        self.adjacencies
            .entry(from.to_string())
            .or_default()
            .insert(to.to_string());
        self.adjacencies.entry(to.to_string()).or_default();
    }

    /// Neighbors of a territory in id order.
    pub fn neighbors(&self, territory: &str) -> impl Iterator<Item = &TerritoryId> {
        self.adjacencies.get(territory).into_iter().flatten()
    }

    /// Check if `to` can be reached from `from` in one hop.
    pub fn are_adjacent(&self, from: &str, to: &str) -> bool {
        self.adjacencies
            .get(from)
            .map(|set| set.contains(to))
            .unwrap_or(false)
    }

    /// Edges whose reverse edge is missing.
    pub fn one_way_edges(&self) -> Vec<(&TerritoryId, &TerritoryId)> {
        self.adjacencies
            .iter()
            .flat_map(|(from, set)| set.iter().map(move |to| (from, to)))
            .filter(|(from, to)| !self.are_adjacent(to, from))
            .collect()
    }

    /// Number of territories known to the graph.
    pub fn territory_count(&self) -> usize {
        self.adjacencies.len()
    }
}
