//! Linearization of a per-source subgraph into a source-to-sink path.

use std::{
    collections::{HashMap, HashSet, VecDeque},
    sync::Arc,
};

use crate::{
    binding::SinkRecord,
    graph::{GraphId, Node, Subgraph},
    paths::{FlowPath, PathStep},
    SinkSelection,
};

/// Outcome of synthesizing one (source, sink) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Synthesis {
    /// A path was found.
    Path(FlowPath),
    /// The sink is not reachable from the source.
    Unreachable,
    /// The traversal met an instance older than the source; the pair is rejected.
    CausalViolation {
        /// The offending instance.
        at: Node,
    },
}

/// Picks the sink instance of a subgraph.
///
/// Candidates are terminal nodes. The first one produced by the bound sink's class
/// and method wins; otherwise `fallback` picks the earliest or latest terminal.
#[must_use]
pub fn select_sink<'a>(
    subgraph: &'a Subgraph,
    recorded: Option<&SinkRecord>,
    fallback: SinkSelection,
) -> Option<&'a Node> {
    let terminals = subgraph.terminals();

    if let Some(recorded) = recorded {
        if let Some(found) = terminals.iter().find(|node| recorded.matches(node)) {
            return Some(found);
        }
    }

    match fallback {
        SinkSelection::First => terminals.first().copied(),
        SinkSelection::Last => terminals.last().copied(),
    }
}

/// Linearizes the flow from the subgraph's source to `sink`.
///
/// Breadth-first from the source over derivation edges; every statement keeps the
/// smallest logical time it was reached at. Expansion stops at the sink but the
/// queue is drained. Statements are ordered by that time and cut after the sink's
/// statement.
#[must_use]
pub fn synthesize(graph: GraphId, subgraph: &Subgraph, sink: &Node) -> Synthesis {
    let source = subgraph.source();
    let forward = subgraph.forward();
    if !forward.contains_key(source) {
        return Synthesis::Unreachable;
    }

    let predecessors = subgraph.predecessors();
    let mut first_seen: HashMap<&Arc<str>, i64> = HashMap::new();
    let mut seen_times: HashSet<i64> = HashSet::from([source.time]);
    let mut queue: VecDeque<&Node> = VecDeque::from([source]);
    let mut divergent = false;

    while let Some(current) = queue.pop_front() {
        first_seen
            .entry(&current.statement)
            .and_modify(|time| *time = (*time).min(current.time))
            .or_insert(current.time);

        if predecessors.get(current).is_some_and(|preds| preds.len() > 1) {
            divergent = true;
        }
        if current == sink {
            continue;
        }

        let Some(next) = forward.get(current) else {
            continue;
        };
        for derived in next {
            if derived.time < source.time {
                return Synthesis::CausalViolation {
                    at: (*derived).clone(),
                };
            }
            if seen_times.insert(derived.time) {
                queue.push_back(*derived);
            }
        }
    }

    if !first_seen.contains_key(&sink.statement) {
        return Synthesis::Unreachable;
    }

    let mut ordered: Vec<(&Arc<str>, i64)> = first_seen.into_iter().collect();
    ordered.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)));

    let mut steps = Vec::with_capacity(ordered.len());
    for (statement, time) in ordered {
        steps.push(PathStep {
            statement: Arc::clone(statement),
            time,
        });
        if *statement == sink.statement {
            break;
        }
    }

    Synthesis::Path(FlowPath {
        graph,
        source: source.clone(),
        sink: sink.clone(),
        steps,
        divergent,
    })
}
