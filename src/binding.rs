//! Source and sink bindings.
//!
//! The runtime prints a `SinkFound` record right before dumping the graph that
//! reached the sink, and a `SourceFound` record whenever a source creates a new
//! taint instance. [`TaintBindings`] replays that protocol: every graph id binds
//! to the most recent sink record seen before its first dump line, and every
//! instance-bearing source record marks its logical time as a true origin.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use crate::graph::{GraphId, Node};

/// The sink a graph was dumped for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkRecord {
    /// Statement that called the sink, e.g. `Lcom/app/Main;->leak()V(7)`.
    pub statement: Arc<str>,
    /// Signature of the called sink API.
    pub detail: String,
}

impl SinkRecord {
    /// Class and method name of the sink statement, normalized to descriptor form
    /// (`Lcom/app/Main;`, `leak`).
    #[must_use]
    pub fn class_and_method(&self) -> Option<(String, &str)> {
        let (class, rest) = self.statement.split_once("->")?;
        let method = rest.split('(').next()?;
        let class = if class.starts_with('L') && class.ends_with(';') {
            class.to_string()
        } else {
            format!("L{};", class.replace('.', "/"))
        };
        Some((class, method))
    }

    /// Returns `true` if `node` was produced by the sink statement's method.
    #[must_use]
    pub fn matches(&self, node: &Node) -> bool {
        match (self.class_and_method(), node.class_name(), node.method_name()) {
            (Some((class, method)), Some(node_class), Some(node_method)) => {
                class == node_class && method == node_method
            }
            _ => false,
        }
    }
}

/// Source and sink knowledge accumulated over one log.
#[derive(Debug, Default)]
pub struct TaintBindings {
    sinks: HashMap<GraphId, SinkRecord>,
    source_times: HashSet<i64>,
    source_details: HashMap<Arc<str>, String>,
    reflective: HashMap<String, String>,
    pending_sink: Option<SinkRecord>,
    pending_source_detail: Option<String>,
}

impl TaintBindings {
    /// Creates empty bindings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a sink hit; it binds to the graph ids dumped next.
    pub fn observe_sink(&mut self, statement: Arc<str>, detail: String) {
        self.pending_sink = Some(SinkRecord { statement, detail });
    }

    /// Records a source hit.
    ///
    /// A detail record is remembered and attached to the next origin record's
    /// statement; an origin record marks `instance` as a true source.
    pub fn observe_source(&mut self, statement: Arc<str>, detail: Option<String>, instance: Option<i64>) {
        if let Some(detail) = detail {
            self.pending_source_detail = Some(detail);
        }

        if let Some(time) = instance {
            self.source_times.insert(time);
            if let Some(detail) = &self.pending_source_detail {
                self.source_details.insert(statement, detail.clone());
            }
        }
    }

    /// Records the target of a reflective source invoked from `class_name`.
    pub fn observe_reflective(&mut self, class_name: String, target: String) {
        self.reflective.insert(class_name, target);
    }

    /// Called for every dump line; binds `graph` to the pending sink once.
    pub fn observe_dump(&mut self, graph: GraphId) {
        if self.sinks.contains_key(&graph) {
            return;
        }
        if let Some(sink) = &self.pending_sink {
            self.sinks.insert(graph, sink.clone());
        }
    }

    /// Sink bound to `graph`.
    #[must_use]
    pub fn sink(&self, graph: GraphId) -> Option<&SinkRecord> {
        self.sinks.get(&graph)
    }

    /// Returns `true` if `time` was announced by an origin record.
    #[must_use]
    pub fn is_source(&self, time: i64) -> bool {
        self.source_times.contains(&time)
    }

    /// Source API recorded for a source statement.
    #[must_use]
    pub fn source_detail(&self, statement: &str) -> Option<&str> {
        self.source_details.get(statement).map(String::as_str)
    }

    /// Reflective source target recorded for a dotted class name.
    #[must_use]
    pub fn reflective_target(&self, class_name: &str) -> Option<&str> {
        self.reflective.get(class_name).map(String::as_str)
    }

    /// Number of graph ids with a bound sink.
    #[must_use]
    pub fn bound_graphs(&self) -> usize {
        self.sinks.len()
    }

    /// Number of distinct origin instances.
    #[must_use]
    pub fn source_count(&self) -> usize {
        self.source_times.len()
    }
}
