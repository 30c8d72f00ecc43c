//! Graph reconstruction.
//!
//! The runtime dumps every propagation graph in fragments, and a node's full
//! predecessor chain may only be known from a fragment dumped under a different
//! graph id. Reconstruction therefore runs in stages:
//!
//! 1. [`close_graphs`] completes each graph's fragment list against the global
//!    [`FragmentCache`].
//! 2. [`ParcelSplicer`] inlines graphs that crossed a parcel or file boundary.
//! 3. [`FlowGraph::build`] turns each spliced fragment list into an adjacency
//!    and [`FlowGraph::partition`] cuts it into one subgraph per source instance.

mod closure;
mod flow;
mod fragment;
mod node;
mod parcel;

use std::{collections::HashMap, sync::Arc};

pub use closure::{close_graph, close_graphs};
pub use flow::{FlowGraph, Subgraph};
pub use fragment::{Fragment, FragmentCache};
pub use node::{Interner, Node, PARCEL_MARKER, ROOT_STATEMENT};
pub use parcel::{ParcelSplicer, SpliceStats};

/// Identifier of one dumped propagation graph (`DumpTaint-<id>`).
pub type GraphId = u64;

/// Fragment lists keyed by graph id, iterated in first-seen order.
#[derive(Debug, Default, Clone)]
pub struct GraphSet {
    order: Vec<GraphId>,
    graphs: HashMap<GraphId, Vec<Arc<Fragment>>>,
}

impl GraphSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `fragment` to the list of `graph`, registering the id on first use.
    pub fn push(&mut self, graph: GraphId, fragment: Arc<Fragment>) {
        self.entry(graph).push(fragment);
    }

    /// Replaces the whole fragment list of `graph`.
    pub fn insert(&mut self, graph: GraphId, fragments: Vec<Arc<Fragment>>) {
        *self.entry(graph) = fragments;
    }

    fn entry(&mut self, graph: GraphId) -> &mut Vec<Arc<Fragment>> {
        if !self.graphs.contains_key(&graph) {
            self.order.push(graph);
        }
        self.graphs.entry(graph).or_default()
    }

    /// Fragment list of `graph`.
    #[must_use]
    pub fn get(&self, graph: GraphId) -> Option<&[Arc<Fragment>]> {
        self.graphs.get(&graph).map(Vec::as_slice)
    }

    /// Returns `true` if `graph` is part of the set.
    #[must_use]
    pub fn contains(&self, graph: GraphId) -> bool {
        self.graphs.contains_key(&graph)
    }

    /// Removes `graph`, returning its fragments.
    pub fn remove(&mut self, graph: GraphId) -> Option<Vec<Arc<Fragment>>> {
        let removed = self.graphs.remove(&graph)?;
        self.order.retain(|id| *id != graph);
        Some(removed)
    }

    /// Graph ids in first-seen order.
    #[must_use]
    pub fn ids(&self) -> &[GraphId] {
        &self.order
    }

    /// Iterates over `(id, fragments)` in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (GraphId, &[Arc<Fragment>])> {
        self.order
            .iter()
            .filter_map(|id| self.graphs.get(id).map(|lines| (*id, lines.as_slice())))
    }

    /// Number of graphs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns `true` if the set holds no graph.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Total number of fragments over all graphs.
    #[must_use]
    pub fn fragment_count(&self) -> usize {
        self.graphs.values().map(Vec::len).sum()
    }
}

impl IntoIterator for GraphSet {
    type Item = (GraphId, Vec<Arc<Fragment>>);
    type IntoIter = std::vec::IntoIter<(GraphId, Vec<Arc<Fragment>>)>;

    fn into_iter(mut self) -> Self::IntoIter {
        let ordered: Vec<_> = self
            .order
            .iter()
            .filter_map(|id| self.graphs.remove(id).map(|lines| (*id, lines)))
            .collect();
        ordered.into_iter()
    }
}

impl FromIterator<(GraphId, Vec<Arc<Fragment>>)> for GraphSet {
    fn from_iter<T: IntoIterator<Item = (GraphId, Vec<Arc<Fragment>>)>>(iter: T) -> Self {
        let mut set = GraphSet::new();
        for (id, lines) in iter {
            set.insert(id, lines);
        }
        set
    }
}
