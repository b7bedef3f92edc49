use petgraph::{
    algo::has_path_connecting,
    stable_graph::{NodeIndex, StableDiGraph},
    visit::{EdgeRef, IntoEdgeReferences},
    Direction,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use thiserror::Error;

use crate::{
    properties::ResolvedIdentifier,
    topicgraph::node::{CurationEdge, CurationOrigin, TopicGraphNode},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
pub enum TopicGraphError {
    #[error("No topic graph node for {0}")]
    UnknownNode(ResolvedIdentifier),
    #[error("{0} cannot curate itself")]
    SelfEdge(ResolvedIdentifier),
    #[error("Curating {target} under {curator} would create a cycle")]
    WouldCreateCycle {
        curator: ResolvedIdentifier,
        target: ResolvedIdentifier,
    },
}

/// Return value of a [TopicGraph::traverse_breadth_first] visitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Traversal {
    Continue,
    SkipChildren,
    Stop,
}

/// Directed "is curated under" graph over resolved identities.
///
/// Edges point from the curating page to the curated one. A node may have several parents;
/// nodes may only be reached through the graph once they were added with
/// [TopicGraph::add_node], except for edges added with [TopicGraph::unsafely_add_edge], whose
/// target may still be unconfirmed (see [TopicGraph::dangling_edges]).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TopicGraph {
    graph: StableDiGraph<ResolvedIdentifier, CurationEdge>,
    indices: BTreeMap<ResolvedIdentifier, NodeIndex>,
    nodes: BTreeMap<ResolvedIdentifier, TopicGraphNode>,
    next_sequence: u64,
}

impl TopicGraph {
    pub fn new() -> TopicGraph {
        TopicGraph::default()
    }

    fn index_for(&mut self, reference: ResolvedIdentifier) -> NodeIndex {
        if let Some(index) = self.indices.get(&reference) {
            return *index;
        }
        let index = self.graph.add_node(reference);
        self.indices.insert(reference, index);
        index
    }

    /// Adds `node`, or replaces the data of an existing node with the same reference. Edges are
    /// kept either way. Returns the replaced data.
    pub fn add_node(&mut self, node: TopicGraphNode) -> Option<TopicGraphNode> {
        self.index_for(node.reference);
        self.nodes.insert(node.reference, node)
    }

    pub fn node(&self, reference: &ResolvedIdentifier) -> Option<&TopicGraphNode> {
        self.nodes.get(reference)
    }

    pub fn contains(&self, reference: &ResolvedIdentifier) -> bool {
        self.nodes.contains_key(reference)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &TopicGraphNode> {
        self.nodes.values()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Adds a curation edge between two known nodes. Returns `Ok(false)` when the edge already
    /// exists with the same or a stronger origin.
    pub fn add_edge(
        &mut self,
        source: ResolvedIdentifier,
        target: ResolvedIdentifier,
        origin: CurationOrigin,
    ) -> Result<bool, TopicGraphError> {
        for reference in [source, target] {
            if !self.nodes.contains_key(&reference) {
                return Err(TopicGraphError::UnknownNode(reference));
            }
        }
        if source == target {
            return Err(TopicGraphError::SelfEdge(source));
        }
        if self.has_path(target, source) {
            return Err(TopicGraphError::WouldCreateCycle {
                curator: source,
                target,
            });
        }
        Ok(self.unsafely_add_edge(source, target, origin))
    }

    /// Adds a curation edge without checking either endpoint. Used while crawling, when the
    /// target may not be confirmed yet.
    pub fn unsafely_add_edge(
        &mut self,
        source: ResolvedIdentifier,
        target: ResolvedIdentifier,
        origin: CurationOrigin,
    ) -> bool {
        let source_idx = self.index_for(source);
        let target_idx = self.index_for(target);
        if let Some(edge) = self.graph.find_edge(source_idx, target_idx) {
            // Authoring an edge that auto-curation already added makes it manual.
            return match self.graph.edge_weight_mut(edge) {
                Some(weight)
                    if origin == CurationOrigin::Manual
                        && weight.origin == CurationOrigin::Automatic =>
                {
                    weight.origin = CurationOrigin::Manual;
                    true
                }
                _ => false,
            };
        }
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.graph
            .add_edge(source_idx, target_idx, CurationEdge { origin, sequence });
        true
    }

    pub fn remove_edge(&mut self, source: ResolvedIdentifier, target: ResolvedIdentifier) -> bool {
        let (Some(source_idx), Some(target_idx)) =
            (self.indices.get(&source), self.indices.get(&target))
        else {
            return false;
        };
        match self.graph.find_edge(*source_idx, *target_idx) {
            Some(edge) => self.graph.remove_edge(edge).is_some(),
            None => false,
        }
    }

    pub fn edge_origin(
        &self,
        source: ResolvedIdentifier,
        target: ResolvedIdentifier,
    ) -> Option<CurationOrigin> {
        let source_idx = self.indices.get(&source)?;
        let target_idx = self.indices.get(&target)?;
        self.graph
            .find_edge(*source_idx, *target_idx)
            .and_then(|edge| self.graph.edge_weight(edge))
            .map(|weight| weight.origin)
    }

    fn directed(
        &self,
        reference: ResolvedIdentifier,
        direction: Direction,
    ) -> Vec<(ResolvedIdentifier, CurationEdge)> {
        let Some(index) = self.indices.get(&reference) else {
            return Vec::new();
        };
        let mut edges = self
            .graph
            .edges_directed(*index, direction)
            .map(|edge| {
                let other = match direction {
                    Direction::Outgoing => edge.target(),
                    Direction::Incoming => edge.source(),
                };
                (self.graph[other], *edge.weight())
            })
            .collect::<Vec<_>>();
        edges.sort_by_key(|(_, weight)| weight.sequence);
        edges
    }

    /// Pages curated by `reference`, in curation order.
    pub fn edges(&self, reference: ResolvedIdentifier) -> Vec<ResolvedIdentifier> {
        self.directed(reference, Direction::Outgoing)
            .into_iter()
            .map(|(child, _)| child)
            .collect()
    }

    /// Pages curating `reference`, in curation order.
    pub fn reverse_edges(&self, reference: ResolvedIdentifier) -> Vec<ResolvedIdentifier> {
        self.directed(reference, Direction::Incoming)
            .into_iter()
            .map(|(parent, _)| parent)
            .collect()
    }

    /// Parents that curate `reference` through a manual edge.
    pub fn manual_parents(&self, reference: ResolvedIdentifier) -> Vec<ResolvedIdentifier> {
        self.directed(reference, Direction::Incoming)
            .into_iter()
            .filter(|(_, weight)| weight.origin == CurationOrigin::Manual)
            .map(|(parent, _)| parent)
            .collect()
    }

    pub fn has_path(&self, from: ResolvedIdentifier, to: ResolvedIdentifier) -> bool {
        match (self.indices.get(&from), self.indices.get(&to)) {
            (Some(from), Some(to)) => has_path_connecting(&self.graph, *from, *to, None),
            _ => false,
        }
    }

    /// Visits every node reachable from `start` once, nearest first.
    pub fn traverse_breadth_first<F>(&self, start: ResolvedIdentifier, mut visitor: F)
    where
        F: FnMut(&TopicGraphNode) -> Traversal,
    {
        let mut seen = BTreeSet::new();
        let mut queue = VecDeque::from([start]);
        seen.insert(start);
        while let Some(reference) = queue.pop_front() {
            let Some(node) = self.nodes.get(&reference) else {
                continue;
            };
            match visitor(node) {
                Traversal::Stop => return,
                Traversal::SkipChildren => continue,
                Traversal::Continue => {}
            }
            for child in self.edges(reference) {
                if seen.insert(child) {
                    queue.push_back(child);
                }
            }
        }
    }

    /// Everything reachable from `start`, `start` included, in breadth-first order.
    pub fn breadth_first(&self, start: ResolvedIdentifier) -> Vec<ResolvedIdentifier> {
        let mut visited = Vec::new();
        self.traverse_breadth_first(start, |node| {
            visited.push(node.reference);
            Traversal::Continue
        });
        visited
    }

    /// Swaps in new data for `old` while keeping every edge attached. When `replacement` carries a
    /// different reference the node is re-keyed in place.
    pub fn replace_node(
        &mut self,
        old: ResolvedIdentifier,
        replacement: TopicGraphNode,
    ) -> Result<TopicGraphNode, TopicGraphError> {
        let index = *self
            .indices
            .get(&old)
            .ok_or(TopicGraphError::UnknownNode(old))?;
        let previous = self
            .nodes
            .remove(&old)
            .ok_or(TopicGraphError::UnknownNode(old))?;
        let reference = replacement.reference;
        if reference != old {
            self.indices.remove(&old);
            self.indices.insert(reference, index);
            self.graph[index] = reference;
        }
        self.nodes.insert(reference, replacement);
        Ok(previous)
    }

    /// Edges with an endpoint that never received node data.
    pub fn dangling_edges(&self) -> Vec<(ResolvedIdentifier, ResolvedIdentifier)> {
        let mut dangling = IntoEdgeReferences::edge_references(&self.graph)
            .map(|edge| (self.graph[edge.source()], self.graph[edge.target()]))
            .filter(|(source, target)| {
                !self.nodes.contains_key(source) || !self.nodes.contains_key(target)
            })
            .collect::<Vec<_>>();
        dangling.sort();
        dangling
    }

    /// Nodes nothing curates.
    pub fn roots(&self) -> Vec<ResolvedIdentifier> {
        self.nodes
            .keys()
            .copied()
            .filter(|reference| {
                self.indices
                    .get(reference)
                    .map(|index| {
                        self.graph
                            .neighbors_directed(*index, Direction::Incoming)
                            .next()
                            .is_none()
                    })
                    .unwrap_or(true)
            })
            .collect()
    }
}
