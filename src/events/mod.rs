//! Event extraction from taint logs.
//!
//! [`parse_line`] classifies a single log line; [`TaintLog`] folds a whole log
//! into per-graph fragment lists, the global fragment cache and the source/sink
//! bindings. Lines that do not parse are counted and skipped, a damaged line
//! never aborts extraction.

mod collect;
mod parser;

use std::sync::Arc;

use crate::graph::{Fragment, GraphId};

pub use collect::{ParseStats, TaintLog};
pub use parser::{parse_descriptor, parse_line};

/// One typed record of the taint log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A source was hit. Instance-bearing records (`…id(<time>)`) mark a true origin;
    /// detail records carry the source API that the next origin came from.
    SourceFound {
        /// Statement that created the source taint.
        statement: Arc<str>,
        /// Source API description, present on detail records.
        detail: Option<String>,
        /// Logical time of the created instance, present on origin records.
        instance: Option<i64>,
    },
    /// A reflective `Method.invoke` was recognized as a source.
    ReflectiveSource {
        /// Dotted name of the class that performed the reflective call.
        class_name: String,
        /// Signature of the reflectively invoked source method.
        target: String,
    },
    /// A sink was hit.
    SinkFound {
        /// Statement that called the sink.
        statement: Arc<str>,
        /// Signature of the called sink API.
        detail: String,
    },
    /// One record of a dumped propagation graph.
    DumpNode {
        /// Graph id from the `DumpTaint-<id>` marker.
        graph: GraphId,
        /// The recorded node and its predecessors.
        fragment: Fragment,
    },
    /// A graph id that was dumped on the far side of a parcel or file boundary.
    ParcelMarker(GraphId),
}

/// Result of parsing one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parsed {
    /// The line carried an event.
    Event(Event),
    /// The line is unrelated to taint tracking.
    Ignored,
    /// The line carried a marker but could not be decoded.
    Malformed(&'static str),
}
