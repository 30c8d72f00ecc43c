//! Folding a whole log into reconstruction inputs.

use std::{path::Path, sync::Arc};

use serde::Serialize;

use crate::{
    binding::TaintBindings,
    events::{parse_line, Event, Parsed},
    file::LogFile,
    graph::{FragmentCache, GraphId, GraphSet, Interner},
    Result,
};

/// Line counters of one parse.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ParseStats {
    /// Lines read.
    pub lines: usize,
    /// Lines that carried an event.
    pub events: usize,
    /// Lines that carried a marker but could not be decoded.
    pub malformed: usize,
    /// Dump records.
    pub dump_lines: usize,
}

/// Everything extracted from one taint log.
#[derive(Debug, Default)]
pub struct TaintLog {
    /// Statement interner shared by every node of this log.
    pub interner: Interner,
    /// Raw fragment lists per graph id, in recording order.
    pub graphs: GraphSet,
    /// Latest fragment per node across all graph ids.
    pub cache: FragmentCache,
    /// Graph ids announced as parcel or file boundary targets.
    pub parcels: Vec<GraphId>,
    /// Source and sink bindings.
    pub bindings: TaintBindings,
    /// Line counters.
    pub stats: ParseStats,
}

impl TaintLog {
    /// Parses the log at `path`.
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if the log cannot be read.
    pub fn from_file(path: &Path) -> Result<TaintLog> {
        let file = LogFile::from_file(path)?;
        Ok(Self::from_lines(file.lines()))
    }

    /// Parses a sequence of log lines.
    pub fn from_lines<I, S>(lines: I) -> TaintLog
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut log = TaintLog::default();
        for line in lines {
            log.push_line(line.as_ref());
        }

        log::info!(
            "parsed {} lines: {} events, {} malformed, {} graphs, {} cached nodes",
            log.stats.lines,
            log.stats.events,
            log.stats.malformed,
            log.graphs.len(),
            log.cache.len()
        );
        log
    }

    /// Feeds one line.
    pub fn push_line(&mut self, line: &str) {
        self.stats.lines += 1;
        match parse_line(line, &mut self.interner) {
            Parsed::Event(event) => {
                self.stats.events += 1;
                self.apply(event);
            }
            Parsed::Malformed(reason) => {
                self.stats.malformed += 1;
                log::debug!("ignored malformed line ({reason}): {line}");
            }
            Parsed::Ignored => {}
        }
    }

    fn apply(&mut self, event: Event) {
        match event {
            Event::SourceFound {
                statement,
                detail,
                instance,
            } => self.bindings.observe_source(statement, detail, instance),
            Event::ReflectiveSource { class_name, target } => {
                self.bindings.observe_reflective(class_name, target);
            }
            Event::SinkFound { statement, detail } => self.bindings.observe_sink(statement, detail),
            Event::DumpNode { graph, fragment } => {
                self.stats.dump_lines += 1;
                self.bindings.observe_dump(graph);
                let fragment = Arc::new(fragment);
                self.cache.record(Arc::clone(&fragment));
                self.graphs.push(graph, fragment);
            }
            Event::ParcelMarker(graph) => self.parcels.push(graph),
        }
    }
}
