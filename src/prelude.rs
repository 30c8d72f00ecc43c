//! # taintpath Prelude
//!
//! Convenient re-exports of the types most programs need to run an extraction
//! and inspect its results.
//!
//! ```rust,no_run
//! use taintpath::prelude::*;
//!
//! let log = TaintLog::from_file(std::path::Path::new("log.txt"))?;
//! let extractor = PathExtractor::new(ExtractConfig::default());
//! let paths = extractor.paths(&extractor.reconstruct(log));
//! # Ok::<(), Error>(())
//! ```

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all taintpath operations
pub use crate::Error;

/// The result type used throughout taintpath
pub use crate::Result;

// ================================================================================================
// Main Entry Points
// ================================================================================================

/// Extraction driver, its configuration and report
pub use crate::{ExtractConfig, ExtractionReport, PathExtractor, Reconstruction, SinkSelection};

/// Parsed taint log
pub use crate::events::TaintLog;

// ================================================================================================
// Graphs and Paths
// ================================================================================================

/// Node identity and graph containers
pub use crate::graph::{FlowGraph, Fragment, GraphId, GraphSet, Node, Subgraph};

/// Source and sink bindings
pub use crate::binding::{SinkRecord, TaintBindings};

/// Synthesized paths
pub use crate::paths::{FlowPath, PathStep, Synthesis};

// ================================================================================================
// Instructions
// ================================================================================================

/// Instruction resolution and lowering
pub use crate::dalvik::{translate, InstructionRecord, InstructionResolver, ThreeAddress};
