//! Path synthesis and deduplication.

mod dedup;
mod synth;

use std::sync::Arc;

use serde::Serialize;

use crate::graph::{GraphId, Node};

pub use dedup::deduplicate;
pub use synth::{select_sink, synthesize, Synthesis};

/// One statement of a synthesized path with the logical time it first occurred at.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct PathStep {
    /// Statement identity, e.g. `Lcom/app/Main;->leak()V(7)`.
    #[serde(serialize_with = "serialize_arc_str")]
    pub statement: Arc<str>,
    /// Smallest logical time at which the statement was reached.
    pub time: i64,
}

/// A linearized flow from one source instance to one sink instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowPath {
    /// Graph id the path was reconstructed from.
    pub graph: GraphId,
    /// Source instance.
    pub source: Node,
    /// Sink instance.
    pub sink: Node,
    /// Statements in source-to-sink order.
    pub steps: Vec<PathStep>,
    /// `true` if at least one node on the way derives from more than one flow.
    pub divergent: bool,
}

impl FlowPath {
    /// Number of statements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns `true` if the path has no statement.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// First statement of the path.
    #[must_use]
    pub fn first_statement(&self) -> Option<&str> {
        self.steps.first().map(|step| &*step.statement)
    }

    /// Iterates over the statements in path order.
    pub fn statements(&self) -> impl Iterator<Item = &str> {
        self.steps.iter().map(|step| &*step.statement)
    }
}

fn serialize_arc_str<S: serde::Serializer>(value: &Arc<str>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(value)
}
