//! Taint instance identity.
//!
//! A [`Node`] is one recorded taint instance: the logical time at which the
//! runtime created it and the statement that created it. Statements repeat
//! millions of times in a large log, so their text is interned per file through
//! an [`Interner`] and shared by reference count.

use std::{collections::HashSet, fmt, sync::Arc};

use crate::graph::GraphId;

/// Statement text of a graph root.
pub const ROOT_STATEMENT: &str = "STARTPATH";

/// Marker embedded in the statement of a parcel-boundary node.
pub const PARCEL_MARKER: &str = "(-2)";

/// Identity of one taint instance.
///
/// Ordering is by logical time first, which is the order the runtime created the
/// instances in.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Node {
    /// Logical time (instance id) assigned by the runtime.
    pub time: i64,
    /// Statement that produced the instance, e.g. `Lcom/app/Main;->leak()V(12)`.
    pub statement: Arc<str>,
}

impl Node {
    /// Creates a node from its parts.
    #[must_use]
    pub fn new(time: i64, statement: Arc<str>) -> Self {
        Node { time, statement }
    }

    /// Returns `true` for the `STARTPATH` sentinel that terminates a predecessor chain.
    #[must_use]
    pub fn is_root(&self) -> bool {
        &*self.statement == ROOT_STATEMENT
    }

    /// Returns `true` if the node stands for a parcel or file boundary.
    #[must_use]
    pub fn is_parcel(&self) -> bool {
        self.statement.contains(PARCEL_MARKER)
    }

    /// Graph ids referenced by a parcel-boundary node.
    ///
    /// The statement of such a node has the shape `<g1>-<g2>-…(-2)`. Ids that do not
    /// parse are skipped; a non-parcel node yields nothing.
    #[must_use]
    pub fn parcel_targets(&self) -> Vec<GraphId> {
        if !self.is_parcel() {
            return Vec::new();
        }

        let head = self.statement.split('(').next().unwrap_or_default();
        head.split('-')
            .filter_map(|id| id.trim().parse::<GraphId>().ok())
            .collect()
    }

    /// Class part of the statement, e.g. `Lcom/app/Main;`.
    #[must_use]
    pub fn class_name(&self) -> Option<&str> {
        self.statement.split_once("->").map(|(class, _)| class)
    }

    /// Method name of the statement without its descriptor, e.g. `leak`.
    #[must_use]
    pub fn method_name(&self) -> Option<&str> {
        let (_, rest) = self.statement.split_once("->")?;
        rest.split('(').next()
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            write!(f, "{}({})", ROOT_STATEMENT, self.time)
        } else {
            write!(f, "{}id({})", self.statement, self.time)
        }
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Deduplicating store for statement text.
///
/// Lives for the processing of a single log file; dropping it releases nothing
/// that nodes still reference.
#[derive(Debug, Default)]
pub struct Interner {
    strings: HashSet<Arc<str>>,
}

impl Interner {
    /// Creates an empty interner.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the shared copy of `text`, inserting it on first use.
    pub fn intern(&mut self, text: &str) -> Arc<str> {
        if let Some(existing) = self.strings.get(text) {
            return Arc::clone(existing);
        }

        let shared: Arc<str> = Arc::from(text);
        self.strings.insert(Arc::clone(&shared));
        shared
    }

    /// Number of distinct strings held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    /// Returns `true` if nothing was interned yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(time: i64, statement: &str) -> Node {
        Node::new(time, Arc::from(statement))
    }

    #[test]
    fn root_and_parcel_detection() {
        assert!(node(3, "STARTPATH").is_root());
        assert!(!node(3, "La/B;->c()V(1)").is_root());
        assert!(node(5, "7(-2)").is_parcel());
        assert!(!node(5, "La/B;->c()V(-1)").is_parcel());
    }

    #[test]
    fn parcel_targets() {
        assert_eq!(node(5, "7(-2)").parcel_targets(), vec![7]);
        assert_eq!(node(5, "7-12-3(-2)").parcel_targets(), vec![7, 12, 3]);
        assert_eq!(node(5, "x-4(-2)").parcel_targets(), vec![4]);
        assert!(node(5, "La/B;->c()V(1)").parcel_targets().is_empty());
    }

    #[test]
    fn class_and_method() {
        let n = node(1, "Lcom/app/Main;->leak(Ljava/lang/String;)V(12)");
        assert_eq!(n.class_name(), Some("Lcom/app/Main;"));
        assert_eq!(n.method_name(), Some("leak"));
        assert_eq!(node(1, "STARTPATH").class_name(), None);
    }

    #[test]
    fn ordering_is_by_time_first() {
        let early = node(1, "Z;->z()V(0)");
        let late = node(2, "A;->a()V(0)");
        assert!(early < late);
    }

    #[test]
    fn display() {
        assert_eq!(node(10, "La/B;->c()V(1)").to_string(), "La/B;->c()V(1)id(10)");
        assert_eq!(node(4, "STARTPATH").to_string(), "STARTPATH(4)");
    }

    #[test]
    fn interner_shares_text() {
        let mut interner = Interner::new();
        let a = interner.intern("La/B;->c()V(1)");
        let b = interner.intern("La/B;->c()V(1)");
        let c = interner.intern("La/B;->d()V(1)");
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(interner.len(), 2);
    }
}
