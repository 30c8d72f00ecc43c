//! Configuration for one extraction run.
//!
//! [`ExtractConfig`] controls the graph-level heuristics (framework link repair,
//! sink fallback, path deduplication) and the execution strategy of a
//! [`crate::PathExtractor`]. Instruction table locations are configured on the
//! [`crate::dalvik::InstructionResolver`] instead.

use strum::{Display, EnumString};

/// Statement prefixes that identify framework (non-application) code.
pub const DEFAULT_FRAMEWORK_PREFIXES: [&str; 5] =
    ["Ljava", "Landroid", "Lcom/google", "Lcom/android", "Lkotlin"];

/// Which terminal node stands in for the sink when none matches the bound sink
/// statement's class and method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum SinkSelection {
    /// The terminal node with the smallest logical time.
    #[default]
    First,
    /// The terminal node with the largest logical time.
    Last,
}

/// Configuration for the path extractor.
#[derive(Debug, Clone)]
pub struct ExtractConfig {
    /// Statement prefixes recognized as framework code (default: [`DEFAULT_FRAMEWORK_PREFIXES`]).
    pub framework_prefixes: Vec<String>,

    /// Replace a framework node by its predecessor's framework left successor when the
    /// two disagree (default: true).
    ///
    /// The runtime logs some framework-internal hops under the caller's identity; the
    /// repair stitches those hops back together.
    pub repair_framework_links: bool,

    /// Terminal fallback when no terminal node matches the bound sink (default: first).
    pub sink_selection: SinkSelection,

    /// Keep only the first path for each distinct starting statement (default: true).
    ///
    /// Disabling this keeps alternate routes from one source statement to different
    /// sinks.
    pub one_path_per_start: bool,

    /// Run per-graph closure and per-partition synthesis on the rayon pool (default: true).
    pub parallel: bool,

    /// Write one DOT rendering per source partition under `graphs/` (default: false).
    pub dump_graphs: bool,

    /// Leave bare `return` instructions out of emitted paths (default: true).
    pub skip_void_returns: bool,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            framework_prefixes: DEFAULT_FRAMEWORK_PREFIXES
                .iter()
                .map(|p| (*p).to_string())
                .collect(),
            repair_framework_links: true,
            sink_selection: SinkSelection::First,
            one_path_per_start: true,
            parallel: true,
            dump_graphs: false,
            skip_void_returns: true,
        }
    }
}

impl ExtractConfig {
    /// Returns `true` if `statement` belongs to framework code.
    #[must_use]
    pub fn is_framework(&self, statement: &str) -> bool {
        self.framework_prefixes
            .iter()
            .any(|prefix| statement.starts_with(prefix.as_str()))
    }
}
