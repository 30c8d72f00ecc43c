//! Dump fragments and the global fragment cache.

use std::{collections::HashMap, fmt, sync::Arc};

use crate::graph::Node;

/// One dumped propagation record: `node` was derived from `left` and, for binary
/// operations, from `right` as well.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Fragment {
    /// The derived taint instance.
    pub node: Node,
    /// First predecessor; `STARTPATH` if `node` is an origin.
    pub left: Node,
    /// Second predecessor, if any.
    pub right: Option<Node>,
}

impl Fragment {
    /// Creates a fragment.
    #[must_use]
    pub fn new(node: Node, left: Node, right: Option<Node>) -> Self {
        Fragment { node, left, right }
    }

    /// Predecessors in recording order.
    pub fn predecessors(&self) -> impl Iterator<Item = &Node> {
        std::iter::once(&self.left).chain(self.right.iter())
    }
}

impl fmt::Debug for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <- {}", self.node, self.left)?;
        if let Some(right) = &self.right {
            write!(f, ", {right}")?;
        }
        Ok(())
    }
}

/// Last recorded fragment per node, across all graph ids of a log.
///
/// Successive dumps of the same instance can carry more complete predecessor
/// information, so a later record replaces an earlier one.
#[derive(Debug, Default)]
pub struct FragmentCache {
    entries: HashMap<Node, Arc<Fragment>>,
}

impl FragmentCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `fragment` as the latest knowledge about its node.
    pub fn record(&mut self, fragment: Arc<Fragment>) {
        self.entries.insert(fragment.node.clone(), fragment);
    }

    /// Latest fragment recorded for `node`.
    #[must_use]
    pub fn get(&self, node: &Node) -> Option<&Arc<Fragment>> {
        self.entries.get(node)
    }

    /// Number of distinct nodes recorded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
