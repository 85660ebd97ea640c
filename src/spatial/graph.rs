//! Zone adjacency graph.
//!
//! Built once per validated definition from the zones' declared neighbor
//! lists:
//!
//! - one-directional declarations are mirrored (warning)
//! - repeated neighbors are collapsed (warning)
//! - self-loops and references to undeclared zones are contract errors
//! - neighbor lists are sorted, so every traversal is deterministic

use std::collections::VecDeque;

use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

use crate::core::{ContractError, SpatialError, ZoneId};
use crate::def::ZoneDef;

/// Non-fatal normalization performed while building the graph.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GraphWarning {
    /// `from` listed `to`, but not the reverse; the reverse edge was added.
    Symmetrized { from: ZoneId, to: ZoneId },
    /// `zone` listed `neighbor` more than once.
    DuplicateNeighbor { zone: ZoneId, neighbor: ZoneId },
}

impl GraphWarning {
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            GraphWarning::Symmetrized { .. } => "ADJACENCY_SYMMETRIZED",
            GraphWarning::DuplicateNeighbor { .. } => "ADJACENCY_DUPLICATE",
        }
    }
}

type Neighbors = SmallVec<[ZoneId; 6]>;

/// Immutable, symmetric zone-neighbor graph.
#[derive(Clone, Debug, Default)]
pub struct AdjacencyGraph {
    neighbors: FxHashMap<ZoneId, Neighbors>,
    directions: FxHashMap<ZoneId, Vec<(String, ZoneId)>>,
}

impl AdjacencyGraph {
    /// Normalize the declared edges.
    pub fn build(zones: &[ZoneDef]) -> Result<(Self, Vec<GraphWarning>), Vec<ContractError>> {
        let known: FxHashSet<&ZoneId> = zones.iter().map(|z| &z.id).collect();
        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        let mut graph = Self::default();

        for zone in zones {
            graph.neighbors.entry(zone.id.clone()).or_default();
        }

        for zone in zones {
            for decl in &zone.adjacent {
                if decl.to == zone.id {
                    errors.push(ContractError::AdjacencySelfLoop {
                        zone: zone.id.clone(),
                    });
                    continue;
                }
                if !known.contains(&decl.to) {
                    errors.push(ContractError::AdjacencyDangling {
                        zone: zone.id.clone(),
                        neighbor: decl.to.clone(),
                    });
                    continue;
                }
                let list = graph.neighbors.entry(zone.id.clone()).or_default();
                if list.contains(&decl.to) {
                    warnings.push(GraphWarning::DuplicateNeighbor {
                        zone: zone.id.clone(),
                        neighbor: decl.to.clone(),
                    });
                } else {
                    list.push(decl.to.clone());
                }
                if let Some(direction) = &decl.direction {
                    graph
                        .directions
                        .entry(zone.id.clone())
                        .or_default()
                        .push((direction.clone(), decl.to.clone()));
                }
            }
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        // Mirror one-directional edges, in declaration order for stable warnings.
        for zone in zones {
            let forward: Neighbors = graph.neighbors[&zone.id].clone();
            for to in forward {
                let back = graph.neighbors.entry(to.clone()).or_default();
                if !back.contains(&zone.id) {
                    back.push(zone.id.clone());
                    warnings.push(GraphWarning::Symmetrized {
                        from: zone.id.clone(),
                        to,
                    });
                }
            }
        }

        for list in graph.neighbors.values_mut() {
            list.sort();
        }
        Ok((graph, warnings))
    }

    /// Sorted neighbors of a zone.
    pub fn neighbors(&self, zone: &ZoneId) -> Result<&[ZoneId], SpatialError> {
        self.neighbors
            .get(zone)
            .map(|n| n.as_slice())
            .ok_or_else(|| SpatialError::UnknownZone(zone.clone()))
    }

    /// Direct adjacency test.
    pub fn is_adjacent(&self, a: &ZoneId, b: &ZoneId) -> Result<bool, SpatialError> {
        Ok(self.neighbors(a)?.binary_search(b).is_ok())
    }

    /// The neighbor reached by a declared direction label.
    #[must_use]
    pub fn neighbor_in_direction(&self, zone: &ZoneId, direction: &str) -> Option<&ZoneId> {
        self.directions
            .get(zone)?
            .iter()
            .find(|(label, _)| label == direction)
            .map(|(_, to)| to)
    }

    /// Breadth-first reachability from `start`.
    ///
    /// A zone is expanded only if `via` accepts it; zones `via` rejects are
    /// still reported as reached but paths do not continue through them.
    /// `max_depth` bounds the number of edges walked. Results are in BFS
    /// order with neighbors visited in sorted order.
    pub fn reachable<E, F>(
        &self,
        start: &ZoneId,
        max_depth: Option<u32>,
        include_start: bool,
        mut via: F,
    ) -> Result<Vec<ZoneId>, E>
    where
        E: From<SpatialError>,
        F: FnMut(&ZoneId) -> Result<bool, E>,
    {
        self.neighbors(start)?;
        let mut seen: FxHashSet<&ZoneId> = FxHashSet::default();
        let mut queue: VecDeque<(&ZoneId, u32)> = VecDeque::new();
        let mut out = Vec::new();

        seen.insert(start);
        queue.push_back((start, 0));
        if include_start {
            out.push(start.clone());
        }

        while let Some((zone, depth)) = queue.pop_front() {
            if max_depth.is_some_and(|max| depth >= max) {
                continue;
            }
            for next in self.neighbors(zone)? {
                if !seen.insert(next) {
                    continue;
                }
                out.push(next.clone());
                if via(next)? {
                    queue.push_back((next, depth + 1));
                }
            }
        }
        Ok(out)
    }

    /// Whether `to` is reachable from `from` through zones `via` accepts.
    pub fn connected<E, F>(
        &self,
        from: &ZoneId,
        to: &ZoneId,
        max_depth: Option<u32>,
        via: F,
    ) -> Result<bool, E>
    where
        E: From<SpatialError>,
        F: FnMut(&ZoneId) -> Result<bool, E>,
    {
        self.neighbors(to)?;
        if from == to {
            return Ok(true);
        }
        Ok(self.reachable(from, max_depth, false, via)?.contains(to))
    }

    /// All zones in the graph, sorted.
    #[must_use]
    pub fn zones(&self) -> Vec<&ZoneId> {
        let mut zones: Vec<_> = self.neighbors.keys().collect();
        zones.sort();
        zones
    }
}
