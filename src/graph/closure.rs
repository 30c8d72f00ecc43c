//! Fragment-cache closure of per-graph fragment lists.

use std::{
    collections::{HashSet, VecDeque},
    sync::Arc,
};

use rayon::prelude::*;

use crate::graph::{Fragment, FragmentCache, GraphId, GraphSet, Node};

/// Completes one graph's fragment list against the global cache.
///
/// Every fragment of `lines` is kept once, in order. After each kept fragment, its
/// predecessors are looked up in `cache` breadth-first and the cached fragments
/// not yet part of the result are appended. Each node is looked up at most once,
/// so a reference cycle inside the cache terminates. A node missing from the cache
/// is a leaf.
#[must_use]
pub fn close_graph(lines: &[Arc<Fragment>], cache: &FragmentCache) -> Vec<Arc<Fragment>> {
    let mut closed = Vec::with_capacity(lines.len());
    let mut included: HashSet<Arc<Fragment>> = HashSet::with_capacity(lines.len());
    let mut looked_up: HashSet<Node> = HashSet::new();
    let mut queue: VecDeque<Node> = VecDeque::new();

    for line in lines {
        if !included.insert(Arc::clone(line)) {
            continue;
        }
        closed.push(Arc::clone(line));
        queue.extend(line.predecessors().cloned());

        while let Some(next) = queue.pop_front() {
            let Some(cached) = cache.get(&next) else {
                continue;
            };
            if !looked_up.insert(next) {
                continue;
            }
            if included.insert(Arc::clone(cached)) {
                closed.push(Arc::clone(cached));
                queue.extend(cached.predecessors().cloned());
            }
        }
    }

    closed
}

/// Closes every graph of `graphs`, consuming the raw fragment lists.
///
/// Each raw list is released as soon as its closure has been computed. With
/// `parallel`, graphs are closed on the rayon pool; the cache is only read.
#[must_use]
pub fn close_graphs(graphs: GraphSet, cache: &FragmentCache, parallel: bool) -> GraphSet {
    let close = |(id, lines): (GraphId, Vec<Arc<Fragment>>)| {
        let closed = close_graph(&lines, cache);
        log::debug!(
            "graph {} had {} lines and now has {} lines",
            id,
            lines.len(),
            closed.len()
        );
        (id, closed)
    };

    let raw: Vec<_> = graphs.into_iter().collect();
    if parallel {
        raw.into_par_iter().map(close).collect::<Vec<_>>().into_iter().collect()
    } else {
        raw.into_iter().map(close).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(time: i64, statement: &str) -> Node {
        Node::new(time, Arc::from(statement))
    }

    fn line(n: Node, left: Node, right: Option<Node>) -> Arc<Fragment> {
        Arc::new(Fragment::new(n, left, right))
    }

    fn cache_of(lines: &[Arc<Fragment>]) -> FragmentCache {
        let mut cache = FragmentCache::new();
        for l in lines {
            cache.record(Arc::clone(l));
        }
        cache
    }

    #[test]
    fn pulls_in_fragments_from_other_graphs() {
        let a = node(10, "La;->a()V(0)");
        let b = node(11, "La;->b()V(0)");
        let c = node(12, "La;->c()V(0)");
        let root = node(9, "STARTPATH");

        let own = vec![line(c.clone(), b.clone(), None)];
        let foreign = vec![line(b.clone(), a.clone(), None), line(a.clone(), root, None)];
        let mut all = own.clone();
        all.extend(foreign.iter().cloned());

        let closed = close_graph(&own, &cache_of(&all));
        let nodes: Vec<i64> = closed.iter().map(|f| f.node.time).collect();
        assert_eq!(nodes, vec![12, 11, 10]);
    }

    #[test]
    fn duplicate_lines_are_kept_once() {
        let a = node(10, "La;->a()V(0)");
        let root = node(9, "STARTPATH");
        let l = line(a, root, None);
        let closed = close_graph(&[Arc::clone(&l), Arc::clone(&l)], &cache_of(&[l]));
        assert_eq!(closed.len(), 1);
    }

    #[test]
    fn cache_cycle_terminates() {
        let a = node(1, "La;->a()V(0)");
        let b = node(2, "La;->b()V(0)");
        let lines = vec![line(a.clone(), b.clone(), None), line(b, a, None)];
        let closed = close_graph(&lines[..1], &cache_of(&lines));
        assert_eq!(closed.len(), 2);
    }

    #[test]
    fn closure_is_idempotent() {
        let a = node(10, "La;->a()V(0)");
        let b = node(11, "La;->b()V(0)");
        let c = node(12, "La;->c()V(0)");
        let d = node(13, "La;->d()V(0)");
        let root = node(9, "STARTPATH");
        let all = vec![
            line(d.clone(), c.clone(), Some(b.clone())),
            line(c.clone(), a.clone(), None),
            line(b, a.clone(), None),
            line(a, root, None),
        ];
        let cache = cache_of(&all);

        let once = close_graph(&all[..1], &cache);
        let twice = close_graph(&once, &cache);
        assert_eq!(once, twice);
    }

    #[test]
    fn parallel_and_sequential_agree() {
        let a = node(10, "La;->a()V(0)");
        let b = node(11, "La;->b()V(0)");
        let root = node(9, "STARTPATH");
        let mut graphs = GraphSet::new();
        graphs.push(1, line(b.clone(), a.clone(), None));
        graphs.push(2, line(a.clone(), root.clone(), None));
        let cache = cache_of(&[line(b, a.clone(), None), line(a, root, None)]);

        let sequential = close_graphs(graphs.clone(), &cache, false);
        let parallel = close_graphs(graphs, &cache, true);
        assert_eq!(sequential.ids(), parallel.ids());
        for (id, lines) in sequential.iter() {
            assert_eq!(lines, parallel.get(id).unwrap());
        }
        assert_eq!(sequential.get(1).unwrap().len(), 2);
    }
}
