// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![warn(missing_docs)]
// - 'file/physical.rs' uses mmap to map a log file into memory

//! # taintpath
//!
//! Reconstruction of taint-flow paths from the logs of an on-device dynamic
//! taint tracker (ViaLin-style `DumpTaint` records).
//!
//! The instrumented runtime dumps, for every sink hit, a fragmentary
//! propagation graph: one line per taint instance naming the instance and up
//! to two predecessor instances. `taintpath` parses those lines, closes every
//! graph against a global fragment cache, splices graphs that crossed a
//! parcel or file boundary, partitions each graph per source instance and
//! linearizes each partition into a source-to-sink path. Paths are then
//! deduplicated, resolved against per-class Dalvik instruction tables, and
//! lowered into a readable three-address form.
//!
//! ## Pipeline
//!
//! ```text
//! log lines ─► events::parse_line ─► TaintLog (fragments, cache, bindings)
//!           ─► graph::close_graphs ─► graph::ParcelSplicer
//!           ─► graph::FlowGraph ─► partitions ─► paths::synthesize
//!           ─► paths::deduplicate ─► dalvik::InstructionResolver
//!           ─► dalvik::translate ─► emit::PathEmitter
//! ```
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use taintpath::{ExtractConfig, PathExtractor};
//! use taintpath::dalvik::InstructionResolver;
//! use std::path::Path;
//!
//! let resolver = InstructionResolver::new("classes")
//!     .with_framework_dir("framework_classes");
//! let extractor = PathExtractor::new(ExtractConfig::default());
//! let report = extractor.run(Path::new("log.txt"), &resolver, Path::new("out"))?;
//! println!("{} paths emitted", report.paths);
//! # Ok::<(), taintpath::Error>(())
//! ```
//!
//! ## Error handling
//!
//! Malformed log lines, missing table entries, causally impossible paths and
//! unsupported instructions are recovered locally and only counted in the
//! [`ExtractionReport`]. [`Error`] is reserved for I/O failures, corrupt
//! instruction tables and output write failures.

#[macro_use]
pub(crate) mod error;

/// Input backends for reading log files.
pub mod file;

/// Convenient re-exports of the most commonly used types.
pub mod prelude;

/// Log line parsing and per-file event collection.
pub mod events;

/// Node identity, fragment cache, closure, parcel splicing and adjacency.
pub mod graph;

/// Binding of recorded sources and sinks to graph ids and nodes.
pub mod binding;

/// Path synthesis and path deduplication.
pub mod paths;

/// Dalvik instruction tables, type descriptors and three-address lowering.
pub mod dalvik;

/// CSV output of translated paths and the source/sink summary.
pub mod emit;

/// Shared helpers.
pub mod utils;

mod config;
mod pipeline;

/// `taintpath` Result type
///
/// A type alias for `std::result::Result<T, Error>` where the error type is always [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `taintpath` Error type
///
/// See [`error::Error`](crate::Error) for the full list of variants.
pub use error::Error;

/// Tuning knobs for one extraction run.
pub use config::{ExtractConfig, SinkSelection, DEFAULT_FRAMEWORK_PREFIXES};

/// End-to-end driver and its run report.
pub use pipeline::{ExtractionReport, PathExtractor, Reconstruction};
