//! Flow adjacency and per-source partitions.
//!
//! [`FlowGraph`] stores edges in the direction taint travelled: a fragment
//! `node <- left` becomes the edge `left -> node`. A [`Subgraph`] is the part of a
//! flow graph reachable from one source instance, stored with predecessor sets
//! (`derived -> {predecessors}`).

use std::{
    collections::{BTreeMap, BTreeSet, HashMap, HashSet},
    sync::Arc,
};

use crate::{
    binding::TaintBindings,
    graph::{Fragment, Node},
    utils::DotWriter,
    ExtractConfig,
};

/// Forward adjacency of one spliced graph.
#[derive(Debug, Default)]
pub struct FlowGraph {
    successors: HashMap<Node, BTreeSet<Node>>,
    sources: BTreeSet<Node>,
    dropped_edges: usize,
}

impl FlowGraph {
    /// Builds the adjacency of one fragment list.
    ///
    /// Edges from `STARTPATH`, edges touching a parcel-boundary node and self loops
    /// are left out. Any node whose logical time was announced by an origin
    /// record becomes a source, whether it appears as a fragment's node or only as
    /// a predecessor.
    #[must_use]
    pub fn build(lines: &[Arc<Fragment>], bindings: &TaintBindings, config: &ExtractConfig) -> Self {
        let mut graph = FlowGraph::default();
        let mut previous_left: Option<&Node> = None;

        for line in lines {
            let mut node = &line.node;
            if config.repair_framework_links {
                if let Some(previous) = previous_left {
                    if previous.statement != node.statement
                        && config.is_framework(&previous.statement)
                        && config.is_framework(&node.statement)
                    {
                        node = previous;
                    }
                }
            }

            graph.note_source(node, bindings);
            for pred in line.predecessors() {
                graph.note_source(pred, bindings);
                graph.add_edge(pred, node);
            }
            previous_left = Some(&line.left);
        }

        graph
    }

    fn note_source(&mut self, node: &Node, bindings: &TaintBindings) {
        if !node.is_root() && !node.is_parcel() && bindings.is_source(node.time) {
            self.sources.insert(node.clone());
        }
    }

    fn add_edge(&mut self, from: &Node, to: &Node) {
        if from.is_root() {
            return;
        }
        if from.is_parcel() || to.is_parcel() || from == to {
            self.dropped_edges += 1;
            return;
        }
        self.successors
            .entry(from.clone())
            .or_default()
            .insert(to.clone());
    }

    /// Instances derived directly from `node`.
    #[must_use]
    pub fn successors(&self, node: &Node) -> Option<&BTreeSet<Node>> {
        self.successors.get(node)
    }

    /// Returns `true` if `node` has at least one outgoing edge.
    #[must_use]
    pub fn contains(&self, node: &Node) -> bool {
        self.successors.contains_key(node)
    }

    /// Source instances found in this graph, ordered by logical time.
    #[must_use]
    pub fn sources(&self) -> &BTreeSet<Node> {
        &self.sources
    }

    /// Number of nodes with outgoing edges.
    #[must_use]
    pub fn len(&self) -> usize {
        self.successors.len()
    }

    /// Returns `true` if the graph has no edge.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.successors.is_empty()
    }

    /// Edges left out because they touched a boundary node or looped on themselves.
    #[must_use]
    pub fn dropped_edges(&self) -> usize {
        self.dropped_edges
    }

    /// The part of the graph reachable from `source`.
    ///
    /// Returns `None` if `source` has no outgoing edge in this graph.
    #[must_use]
    pub fn partition(&self, source: &Node) -> Option<Subgraph> {
        if !self.contains(source) {
            return None;
        }

        let mut predecessors: BTreeMap<Node, BTreeSet<Node>> = BTreeMap::new();
        let mut visited: HashSet<&Node> = HashSet::new();
        let mut stack = vec![source];

        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }
            let Some(next) = self.successors.get(current) else {
                continue;
            };
            for derived in next {
                predecessors
                    .entry(derived.clone())
                    .or_default()
                    .insert(current.clone());
                stack.push(derived);
            }
        }

        Some(Subgraph {
            source: source.clone(),
            predecessors,
        })
    }
}

/// Nodes reachable from one source instance, keyed by derived node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subgraph {
    source: Node,
    predecessors: BTreeMap<Node, BTreeSet<Node>>,
}

impl Subgraph {
    /// Creates a subgraph from explicit predecessor sets.
    #[must_use]
    pub fn new(source: Node, predecessors: BTreeMap<Node, BTreeSet<Node>>) -> Self {
        Subgraph {
            source,
            predecessors,
        }
    }

    /// The root source instance.
    #[must_use]
    pub fn source(&self) -> &Node {
        &self.source
    }

    /// Predecessor sets keyed by derived node.
    #[must_use]
    pub fn predecessors(&self) -> &BTreeMap<Node, BTreeSet<Node>> {
        &self.predecessors
    }

    /// Number of derived nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.predecessors.len()
    }

    /// Returns `true` if nothing is reachable from the source.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.predecessors.is_empty()
    }

    /// Edges re-reversed into derivation order (`pred -> [derived]`).
    #[must_use]
    pub fn forward(&self) -> BTreeMap<&Node, Vec<&Node>> {
        let mut forward: BTreeMap<&Node, Vec<&Node>> = BTreeMap::new();
        for (derived, preds) in &self.predecessors {
            for pred in preds {
                forward.entry(pred).or_default().push(derived);
            }
        }
        forward
    }

    /// Derived nodes from which nothing else derives, in logical-time order.
    #[must_use]
    pub fn terminals(&self) -> Vec<&Node> {
        let inner: HashSet<&Node> = self.predecessors.values().flatten().collect();
        self.predecessors
            .keys()
            .filter(|node| !inner.contains(node))
            .collect()
    }

    /// Renders the subgraph in Graphviz DOT format.
    #[must_use]
    pub fn to_dot(&self, title: &str) -> String {
        let mut ids: HashMap<&Node, usize> = HashMap::new();
        let mut dot = DotWriter::new(title);

        let nodes = std::iter::once(&self.source)
            .chain(self.predecessors.keys())
            .chain(self.predecessors.values().flatten());
        for node in nodes {
            if ids.contains_key(node) {
                continue;
            }
            let id = ids.len();
            ids.insert(node, id);
            dot.node(id, &node.to_string());
        }

        for (derived, preds) in &self.predecessors {
            for pred in preds {
                dot.edge(ids[pred], ids[derived]);
            }
        }
        dot.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(time: i64, statement: &str) -> Node {
        Node::new(time, Arc::from(statement))
    }

    fn line(n: &Node, left: &Node, right: Option<&Node>) -> Arc<Fragment> {
        Arc::new(Fragment::new(n.clone(), left.clone(), right.cloned()))
    }

    fn bindings_with_sources(times: &[i64]) -> TaintBindings {
        let mut b = TaintBindings::new();
        for t in times {
            b.observe_source(Arc::from("x"), None, Some(*t));
        }
        b
    }

    #[test]
    fn edges_follow_taint_direction() {
        let x = node(10, "La;->x()V(0)");
        let i = node(11, "La;->i()V(1)");
        let y = node(12, "La;->y()V(2)");
        let lines = vec![
            line(&y, &i, None),
            line(&i, &x, None),
            line(&x, &node(10, "STARTPATH"), None),
        ];
        let graph = FlowGraph::build(&lines, &bindings_with_sources(&[10]), &ExtractConfig::default());

        assert!(graph.successors(&x).unwrap().contains(&i));
        assert!(graph.successors(&i).unwrap().contains(&y));
        assert!(graph.successors(&y).is_none());
        assert_eq!(graph.sources().iter().next(), Some(&x));
        assert_eq!(graph.len(), 2);
    }

    #[test]
    fn parcel_edges_and_self_loops_are_dropped() {
        let x = node(10, "La;->x()V(0)");
        let p = node(9, "7(-2)");
        let lines = vec![line(&x, &p, None), line(&x, &x, None)];
        let graph = FlowGraph::build(&lines, &TaintBindings::new(), &ExtractConfig::default());
        assert!(graph.is_empty());
        assert_eq!(graph.dropped_edges(), 2);
    }

    #[test]
    fn framework_link_repair() {
        let app = node(1, "Lcom/app/A;->a()V(0)");
        let fw_left = node(2, "Ljava/lang/StringBuilder;->append(Ljava/lang/String;)Ljava/lang/StringBuilder;(0)");
        let fw_node = node(3, "Ljava/lang/AbstractStringBuilder;->append0()V(4)");
        let pred = node(4, "Lcom/app/A;->b()V(1)");
        let lines = vec![line(&app, &fw_left, None), line(&fw_node, &pred, None)];

        let repaired = FlowGraph::build(&lines, &TaintBindings::new(), &ExtractConfig::default());
        assert!(repaired.successors(&pred).unwrap().contains(&fw_left));

        let config = ExtractConfig {
            repair_framework_links: false,
            ..ExtractConfig::default()
        };
        let raw = FlowGraph::build(&lines, &TaintBindings::new(), &config);
        assert!(raw.successors(&pred).unwrap().contains(&fw_node));
    }

    #[test]
    fn partition_collects_reachable_part_only() {
        let a = node(1, "La;->a()V(0)");
        let b = node(2, "La;->b()V(0)");
        let c = node(3, "La;->c()V(0)");
        let unrelated = node(4, "La;->u()V(0)");
        let lines = vec![
            line(&c, &b, Some(&unrelated)),
            line(&b, &a, None),
        ];
        let graph = FlowGraph::build(&lines, &bindings_with_sources(&[1]), &ExtractConfig::default());

        let sub = graph.partition(&a).unwrap();
        assert_eq!(sub.source(), &a);
        assert_eq!(sub.len(), 2);
        assert!(sub.predecessors()[&c].contains(&b));
        assert!(!sub.predecessors()[&c].contains(&unrelated));
        assert_eq!(sub.terminals(), vec![&c]);
        assert!(graph.partition(&c).is_none());
    }

    #[test]
    fn partition_survives_cycles() {
        let a = node(1, "La;->a()V(0)");
        let b = node(2, "La;->b()V(0)");
        let lines = vec![line(&b, &a, None), line(&a, &b, None)];
        let graph = FlowGraph::build(&lines, &TaintBindings::new(), &ExtractConfig::default());
        let sub = graph.partition(&a).unwrap();
        assert_eq!(sub.len(), 2);
        assert!(sub.terminals().is_empty());
    }

    #[test]
    fn dot_rendering() {
        let a = node(1, "La;->a()V(0)");
        let b = node(2, "La;->b()V(0)");
        let graph = FlowGraph::build(&[line(&b, &a, None)], &TaintBindings::new(), &ExtractConfig::default());
        let dot = graph.partition(&a).unwrap().to_dot("graph 5");
        assert!(dot.starts_with("digraph \"graph 5\" {"));
        assert!(dot.contains("n0 -> n1;"));
        assert!(dot.contains("La;-\\>a()V(0)id(1)"));
    }
}
