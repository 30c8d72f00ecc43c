//! Splicing of graphs that crossed a parcel or file boundary.
//!
//! When taint is written into a `Parcel` or a file, the runtime ends the writer's
//! graph with a boundary node whose statement lists the graph ids dumped on the
//! other side (`<g1>-<g2>(-2)`). Splicing replaces that node by the referenced
//! graphs, bridged to the instance that consumed the boundary.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use crate::graph::{Fragment, GraphId, GraphSet, Node};

/// Counters of one splicing run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SpliceStats {
    /// Boundary references that were inlined.
    pub inlined: usize,
    /// Boundary references to graph ids that were never dumped.
    pub unknown: usize,
    /// Boundary references that would have re-entered a graph being spliced.
    pub cyclic: usize,
    /// Graph ids removed from the top level because they were parcel targets.
    pub removed: usize,
}

enum Task {
    Enter(GraphId),
    Build(GraphId),
}

/// Inlines nested parcel graphs into their parents.
///
/// Spliced results are memoized per graph id, so a graph nested by several parents
/// is resolved once. Nesting is resolved with an explicit worklist, which keeps
/// deeply nested parcels off the call stack.
pub struct ParcelSplicer {
    raw: GraphSet,
    spliced: HashMap<GraphId, Vec<Arc<Fragment>>>,
    stats: SpliceStats,
}

impl ParcelSplicer {
    /// Creates a splicer over closed graphs.
    #[must_use]
    pub fn new(closed: GraphSet) -> Self {
        ParcelSplicer {
            raw: closed,
            spliced: HashMap::new(),
            stats: SpliceStats::default(),
        }
    }

    /// Splices `graph` and every graph it nests, memoizing each result.
    ///
    /// Returns the spliced lines of `graph`, or `None` if it was never dumped.
    pub fn splice(&mut self, graph: GraphId) -> Option<&[Arc<Fragment>]> {
        let mut stack = vec![Task::Enter(graph)];
        let mut in_progress: HashSet<GraphId> = HashSet::new();

        while let Some(task) = stack.pop() {
            match task {
                Task::Enter(id) => {
                    if self.spliced.contains_key(&id) || in_progress.contains(&id) {
                        continue;
                    }
                    let Some(lines) = self.raw.get(id) else {
                        continue;
                    };

                    in_progress.insert(id);
                    stack.push(Task::Build(id));

                    let nested: Vec<GraphId> = lines
                        .iter()
                        .filter(|line| line.node.is_parcel())
                        .flat_map(|line| line.node.parcel_targets())
                        .collect();
                    for target in nested.into_iter().rev() {
                        if !self.spliced.contains_key(&target) && self.raw.contains(target) {
                            stack.push(Task::Enter(target));
                        }
                    }
                }
                Task::Build(id) => {
                    let lines = self.raw.remove(id).unwrap_or_default();
                    let built = self.build(id, &lines);
                    self.spliced.insert(id, built);
                    in_progress.remove(&id);
                }
            }
        }

        self.spliced.get(&graph).map(Vec::as_slice)
    }

    /// Splices every graph and drops the ids listed in `parcels` from the top level.
    ///
    /// The result keeps the first-seen order of `order`.
    pub fn splice_all(mut self, order: &[GraphId], parcels: &[GraphId]) -> (GraphSet, SpliceStats) {
        for id in order {
            self.splice(*id);
        }

        let parcels: HashSet<GraphId> = parcels.iter().copied().collect();
        let mut result = GraphSet::new();
        for id in order {
            let Some(lines) = self.spliced.remove(id) else {
                continue;
            };
            if parcels.contains(id) {
                self.stats.removed += 1;
                continue;
            }
            result.insert(*id, lines);
        }

        log::debug!(
            "parcel splicing inlined {} references, removed {} parcel graphs",
            self.stats.inlined,
            self.stats.removed
        );
        (result, self.stats)
    }

    /// Counters accumulated so far.
    #[must_use]
    pub fn stats(&self) -> SpliceStats {
        self.stats
    }

    fn build(&mut self, id: GraphId, lines: &[Arc<Fragment>]) -> Vec<Arc<Fragment>> {
        let mut out = Vec::with_capacity(lines.len());
        let mut last: Option<&Arc<Fragment>> = None;

        for line in lines {
            if line.node.is_parcel() {
                for target in line.node.parcel_targets() {
                    let Some(nested) = self.spliced.get(&target).filter(|n| !n.is_empty()) else {
                        if target == id || self.raw.contains(target) {
                            log::warn!("graph {id}: parcel reference to {target} forms a cycle");
                            self.stats.cyclic += 1;
                        } else {
                            self.stats.unknown += 1;
                        }
                        continue;
                    };

                    if let Some(previous) = last {
                        out.push(Arc::new(Fragment::new(
                            consumer_of(previous),
                            nested[0].node.clone(),
                            None,
                        )));
                    }
                    out.extend(nested.iter().cloned());
                    self.stats.inlined += 1;
                }
            } else {
                out.push(Arc::clone(line));
            }
            last = Some(line);
        }

        out
    }
}

/// The instance that consumed a boundary, judged from the line preceding the
/// boundary node: its left predecessor unless that is itself a boundary or a
/// root, then its right predecessor, then the line's own node.
fn consumer_of(previous: &Fragment) -> Node {
    if !previous.left.is_parcel() && !previous.left.is_root() {
        return previous.left.clone();
    }

    match &previous.right {
        Some(right) => right.clone(),
        None => previous.node.clone(),
    }
}
