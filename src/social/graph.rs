//! Relationship graph and family groups
//!
//! Edges are undirected and keyed by the ordered pair of agent ids. Agents
//! never hold references to each other; everything here is id-keyed so that
//! removing an agent is a matter of dropping its entries.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::core::types::{AgentId, FamilyId, Tick};

/// Unordered agent pair, stored smallest id first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EdgeKey(AgentId, AgentId);

impl EdgeKey {
    pub fn new(a: AgentId, b: AgentId) -> Self {
        if a <= b {
            Self(a, b)
        } else {
            Self(b, a)
        }
    }

    pub fn agents(&self) -> (AgentId, AgentId) {
        (self.0, self.1)
    }

    pub fn other(&self, agent: AgentId) -> AgentId {
        if self.0 == agent {
            self.1
        } else {
            self.0
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelationshipKind {
    Acquaintance,
    /// Parent and child
    Kin,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionRecord {
    pub tick: Tick,
    pub change: f32,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub kind: RelationshipKind,
    /// -1.0 (hostile) to 1.0 (devoted)
    pub strength: f32,
    /// Interactions since the last decay pass
    pub interactions: u32,
    pub total_interactions: u64,
    pub log: Vec<InteractionRecord>,
}

impl Relationship {
    fn new(kind: RelationshipKind, strength: f32) -> Self {
        Self {
            kind,
            strength: strength.clamp(-1.0, 1.0),
            interactions: 0,
            total_interactions: 0,
            log: Vec::new(),
        }
    }

    fn push_record(&mut self, record: InteractionRecord, capacity: usize) {
        if capacity == 0 {
            return;
        }
        if self.log.len() >= capacity {
            self.log.remove(0);
        }
        self.log.push(record);
    }
}

#[derive(Debug, Clone, Default)]
pub struct SocialGraph {
    edges: BTreeMap<EdgeKey, Relationship>,
    adjacency: BTreeMap<AgentId, BTreeSet<AgentId>>,
    families: BTreeMap<FamilyId, BTreeSet<AgentId>>,
    family_of: BTreeMap<AgentId, FamilyId>,
    next_family: u64,
}

impl SocialGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a graph from its persisted parts
    pub fn from_parts(
        edges: impl IntoIterator<Item = (EdgeKey, Relationship)>,
        families: impl IntoIterator<Item = (FamilyId, Vec<AgentId>)>,
        next_family: u64,
    ) -> Self {
        let mut graph = Self {
            next_family,
            ..Self::default()
        };
        for (key, relationship) in edges {
            let (a, b) = key.agents();
            graph.adjacency.entry(a).or_default().insert(b);
            graph.adjacency.entry(b).or_default().insert(a);
            graph.edges.insert(key, relationship);
        }
        for (family, members) in families {
            for agent in members {
                graph.join_family(agent, family);
            }
        }
        graph
    }

    pub fn edges(&self) -> impl Iterator<Item = (EdgeKey, &Relationship)> + '_ {
        self.edges.iter().map(|(&k, r)| (k, r))
    }

    pub fn families(&self) -> impl Iterator<Item = (FamilyId, &BTreeSet<AgentId>)> + '_ {
        self.families.iter().map(|(&f, m)| (f, m))
    }

    pub fn next_family(&self) -> u64 {
        self.next_family
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn family_count(&self) -> usize {
        self.families.len()
    }

    pub fn relationship(&self, a: AgentId, b: AgentId) -> Option<&Relationship> {
        self.edges.get(&EdgeKey::new(a, b))
    }

    /// 0 when the two have never interacted
    pub fn strength(&self, a: AgentId, b: AgentId) -> f32 {
        self.relationship(a, b).map(|r| r.strength).unwrap_or(0.0)
    }

    pub fn neighbors(&self, agent: AgentId) -> impl Iterator<Item = AgentId> + '_ {
        self.adjacency.get(&agent).into_iter().flatten().copied()
    }

    pub fn degree(&self, agent: AgentId) -> usize {
        self.adjacency.get(&agent).map(BTreeSet::len).unwrap_or(0)
    }

    fn edge_entry(&mut self, a: AgentId, b: AgentId, kind: RelationshipKind) -> &mut Relationship {
        let key = EdgeKey::new(a, b);
        if !self.edges.contains_key(&key) {
            self.adjacency.entry(a).or_default().insert(b);
            self.adjacency.entry(b).or_default().insert(a);
        }
        self.edges
            .entry(key)
            .or_insert_with(|| Relationship::new(kind, 0.0))
    }

    /// Record one interaction, creating the edge if needed
    ///
    /// Returns the new strength. Self-interaction is ignored.
    pub fn record_interaction(
        &mut self,
        a: AgentId,
        b: AgentId,
        tick: Tick,
        change: f32,
        reason: impl Into<String>,
        log_capacity: usize,
    ) -> f32 {
        if a == b {
            return 0.0;
        }
        let relationship = self.edge_entry(a, b, RelationshipKind::Acquaintance);
        relationship.interactions += 1;
        relationship.total_interactions += 1;
        relationship.strength = (relationship.strength + change).clamp(-1.0, 1.0);
        relationship.push_record(
            InteractionRecord {
                tick,
                change,
                reason: reason.into(),
            },
            log_capacity,
        );
        relationship.strength
    }

    /// Bind parent and child with a full-strength kin edge
    pub fn add_kin(&mut self, parent: AgentId, child: AgentId) {
        if parent == child {
            return;
        }
        let relationship = self.edge_entry(parent, child, RelationshipKind::Kin);
        relationship.kind = RelationshipKind::Kin;
        relationship.strength = 1.0;
    }

    /// End-of-tick pass: idle edges decay, every counter resets
    pub fn decay_all(&mut self, factor: f32) {
        for relationship in self.edges.values_mut() {
            if relationship.interactions == 0 {
                relationship.strength = (relationship.strength * factor).clamp(-1.0, 1.0);
            }
            relationship.interactions = 0;
        }
    }

    /// Non-kin pairs strong enough to have children, in key order
    pub fn couples_above(&self, threshold: f32) -> Vec<(AgentId, AgentId)> {
        self.edges
            .iter()
            .filter(|(_, r)| r.kind != RelationshipKind::Kin && r.strength > threshold)
            .map(|(key, _)| key.agents())
            .collect()
    }

    pub fn family_of(&self, agent: AgentId) -> Option<FamilyId> {
        self.family_of.get(&agent).copied()
    }

    pub fn family_members(&self, family: FamilyId) -> Option<&BTreeSet<AgentId>> {
        self.families.get(&family)
    }

    pub fn create_family(&mut self) -> FamilyId {
        let family = FamilyId(self.next_family);
        self.next_family += 1;
        self.families.insert(family, BTreeSet::new());
        family
    }

    /// Move `agent` into `family`, leaving any previous family
    pub fn join_family(&mut self, agent: AgentId, family: FamilyId) {
        if let Some(previous) = self.family_of.insert(agent, family) {
            if previous != family {
                if let Some(members) = self.families.get_mut(&previous) {
                    members.remove(&agent);
                }
            }
        }
        self.families.entry(family).or_default().insert(agent);
        self.next_family = self.next_family.max(family.0 + 1);
    }

    /// Place a newborn in its parents' family
    ///
    /// The first parent's family wins, then the second's; a new family is
    /// created when neither has one. Parents without a family join it.
    pub fn register_child(&mut self, child: AgentId, parent_a: AgentId, parent_b: AgentId) -> FamilyId {
        let family = match (self.family_of(parent_a), self.family_of(parent_b)) {
            (Some(f), _) | (None, Some(f)) => f,
            (None, None) => self.create_family(),
        };
        for parent in [parent_a, parent_b] {
            if self.family_of(parent).is_none() {
                self.join_family(parent, family);
            }
        }
        self.join_family(child, family);
        family
    }

    pub fn prune_families(&mut self) -> usize {
        let before = self.families.len();
        self.families.retain(|_, members| !members.is_empty());
        before - self.families.len()
    }

    /// Drop every edge and family membership of `agent`
    ///
    /// Returns the agent's former neighbours.
    pub fn remove_agent(&mut self, agent: AgentId) -> Vec<AgentId> {
        let neighbors: Vec<AgentId> = self
            .adjacency
            .remove(&agent)
            .map(|set| set.into_iter().collect())
            .unwrap_or_default();

        for &other in &neighbors {
            self.edges.remove(&EdgeKey::new(agent, other));
            if let Some(set) = self.adjacency.get_mut(&other) {
                set.remove(&agent);
                if set.is_empty() {
                    self.adjacency.remove(&other);
                }
            }
        }

        if let Some(family) = self.family_of.remove(&agent) {
            if let Some(members) = self.families.get_mut(&family) {
                members.remove(&agent);
            }
        }
        self.prune_families();
        neighbors
    }
}
