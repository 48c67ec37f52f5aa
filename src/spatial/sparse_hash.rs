//! Sparse hash grid for neighbour queries over agent positions

use std::collections::BTreeSet;

use ahash::AHashMap;

use crate::core::types::{AgentId, GridPos};

/// Uniform grid keyed by `(x div cell_size, y div cell_size)`
///
/// The index holds no positions of its own. Callers must report every move
/// before the next query; the registry does so inside `move_agent`.
#[derive(Debug, Clone)]
pub struct SpatialIndex {
    cell_size: i32,
    cells: AHashMap<(i32, i32), BTreeSet<AgentId>>,
    len: usize,
}

impl SpatialIndex {
    pub fn new(cell_size: i32) -> Self {
        Self {
            cell_size: cell_size.max(1),
            cells: AHashMap::new(),
            len: 0,
        }
    }

    pub fn cell_size(&self) -> i32 {
        self.cell_size
    }

    #[inline]
    fn cell_coord(&self, pos: GridPos) -> (i32, i32) {
        (pos.x.div_euclid(self.cell_size), pos.y.div_euclid(self.cell_size))
    }

    pub fn clear(&mut self) {
        self.cells.clear();
        self.len = 0;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn insert(&mut self, agent: AgentId, pos: GridPos) {
        let coord = self.cell_coord(pos);
        if self.cells.entry(coord).or_default().insert(agent) {
            self.len += 1;
        }
    }

    /// Returns false when the agent was not filed under `pos`
    pub fn remove(&mut self, agent: AgentId, pos: GridPos) -> bool {
        let coord = self.cell_coord(pos);
        let Some(cell) = self.cells.get_mut(&coord) else {
            return false;
        };
        let removed = cell.remove(&agent);
        if cell.is_empty() {
            self.cells.remove(&coord);
        }
        if removed {
            self.len -= 1;
        }
        removed
    }

    pub fn move_agent(&mut self, agent: AgentId, old: GridPos, new: GridPos) {
        if self.cell_coord(old) == self.cell_coord(new) {
            return;
        }
        self.remove(agent, old);
        self.insert(agent, new);
    }

    pub fn contains(&self, agent: AgentId, pos: GridPos) -> bool {
        self.cells
            .get(&self.cell_coord(pos))
            .is_some_and(|cell| cell.contains(&agent))
    }

    /// Every agent in a cell overlapping the radius's bounding box
    ///
    /// Membership is by cell only, so nothing inside the radius is missed but
    /// false positives can sit up to `(reach + 1) * cell_size - 1` away on each
    /// axis, where `reach = ceil(radius / cell_size)`.
    pub fn query_radius(&self, center: GridPos, radius: i32) -> BTreeSet<AgentId> {
        let (cx, cy) = self.cell_coord(center);
        let reach = (radius.max(0) + self.cell_size - 1) / self.cell_size;

        let mut found = BTreeSet::new();
        for dx in -reach..=reach {
            for dy in -reach..=reach {
                if let Some(cell) = self.cells.get(&(cx + dx, cy + dy)) {
                    found.extend(cell.iter().copied());
                }
            }
        }
        found
    }

    /// Agents whose exact position lies within `radius` of `center`
    pub fn query_within<F>(&self, center: GridPos, radius: i32, lookup: F) -> BTreeSet<AgentId>
    where
        F: Fn(AgentId) -> Option<GridPos>,
    {
        let radius_sq = radius as i64 * radius as i64;
        self.query_radius(center, radius)
            .into_iter()
            .filter(|&agent| {
                lookup(agent)
                    .map(|pos| pos.distance_sq(&center) <= radius_sq)
                    .unwrap_or(false)
            })
            .collect()
    }

    /// Rebuild grid from positions
    pub fn rebuild(&mut self, agents: impl Iterator<Item = (AgentId, GridPos)>) {
        self.clear();
        for (agent, pos) in agents {
            self.insert(agent, pos);
        }
    }
}
