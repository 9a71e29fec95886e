use crate::catalog::ResourceId;
use log::debug;
use petgraph::algo::tarjan_scc;
use petgraph::graphmap::DiGraphMap;
use petgraph::Direction;
use std::fmt;

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct WaitEdge {
    pub waiter: String,
    pub holder: String,
    pub resource: ResourceId,
}

impl fmt::Display for WaitEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} waits for {} on {}",
            self.waiter, self.holder, self.resource
        )
    }
}

/// Waits-for graph: an edge `a -> b` means `a` is blocked on a lock `b`
/// holds. A cycle between nodes is a deadlock.
#[derive(Debug, Default, Clone)]
pub struct DeadLockDetector<'a> {
    lock_graph: DiGraphMap<&'a str, ResourceId>,
}

impl<'a> DeadLockDetector<'a> {
    pub fn new() -> Self {
        Self {
            lock_graph: DiGraphMap::new(),
        }
    }

    /// A waiter is blocked on one resource at a time, so any previous edge
    /// out of `waiter` is replaced.
    pub fn link_node(&mut self, waiter: &'a str, holder: &'a str, rid: ResourceId) {
        self.unlink(waiter);
        debug!("waits-for {} -> {} on {}", waiter, holder, rid);
        self.lock_graph.add_edge(waiter, holder, rid);
    }

    pub fn unlink(&mut self, waiter: &'a str) {
        let targets: Vec<&str> = self
            .lock_graph
            .neighbors_directed(waiter, Direction::Outgoing)
            .collect();
        for holder in targets {
            self.lock_graph.remove_edge(waiter, holder);
        }
    }

    pub fn edges(&self) -> Vec<WaitEdge> {
        self.lock_graph
            .all_edges()
            .map(|(waiter, holder, rid)| WaitEdge {
                waiter: waiter.to_string(),
                holder: holder.to_string(),
                resource: rid.clone(),
            })
            .collect()
    }

    /// Edges of the first cycle found, in insertion order.
    pub fn find_cycle(&self) -> Option<Vec<WaitEdge>> {
        let component = tarjan_scc(&self.lock_graph).into_iter().find(|scc| {
            scc.len() > 1 || scc.iter().any(|n| self.lock_graph.contains_edge(*n, *n))
        })?;
        let cycle = self
            .edges()
            .into_iter()
            .filter(|edge| {
                component.contains(&edge.waiter.as_str())
                    && component.contains(&edge.holder.as_str())
            })
            .collect();
        Some(cycle)
    }
}
