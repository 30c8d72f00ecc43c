//! End-to-end extraction: parse, reconstruct, synthesize, rank, resolve, emit.

use std::{path::Path, sync::Arc};

use rayon::prelude::*;
use serde::Serialize;

use crate::{
    binding::TaintBindings,
    dalvik::{InstructionRecord, InstructionResolver},
    emit::{lower_path, path_name, summary_row, PathEmitter},
    events::{ParseStats, TaintLog},
    graph::{close_graphs, FlowGraph, Fragment, GraphId, GraphSet, ParcelSplicer, SpliceStats},
    paths::{deduplicate, select_sink, synthesize, FlowPath, Synthesis},
    ExtractConfig, Result,
};

/// Counters of one extraction run.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractionReport {
    /// Log lines read.
    pub lines: usize,
    /// Lines with a known marker that did not decode.
    pub malformed_lines: usize,
    /// Graphs left after parcel splicing.
    pub graphs: usize,
    /// Graphs with a bound sink.
    pub bound_graphs: usize,
    /// Parcel references inlined into their parents.
    pub parcels_inlined: usize,
    /// Parcel references that could not be inlined (unknown target or cycle).
    pub parcels_unresolved: usize,
    /// Edges dropped while building adjacency.
    pub dropped_edges: usize,
    /// Per-source partitions.
    pub partitions: usize,
    /// Paths synthesized before deduplication.
    pub candidate_paths: usize,
    /// Partitions aborted because an instance predates its source.
    pub causal_violations: usize,
    /// Partitions whose sink could not be reached.
    pub unreachable: usize,
    /// Paths emitted.
    pub paths: usize,
    /// Emitted paths containing a merge.
    pub divergent_paths: usize,
    /// Statements absent from the instruction tables.
    pub dropped_statements: usize,
    /// Emitted rows without a three-address form.
    pub unsupported_instructions: usize,
}

impl ExtractionReport {
    fn from_parse(stats: &ParseStats) -> Self {
        ExtractionReport {
            lines: stats.lines,
            malformed_lines: stats.malformed,
            ..ExtractionReport::default()
        }
    }
}

/// Closed and spliced graphs of one log, ready for synthesis.
#[derive(Debug)]
pub struct Reconstruction {
    /// Spliced fragment lists per top-level graph id.
    pub graphs: GraphSet,
    /// Source and sink bindings of the log.
    pub bindings: TaintBindings,
    /// Parse counters.
    pub parse: ParseStats,
    /// Splice counters.
    pub splice: SpliceStats,
}

#[derive(Default)]
struct GraphOutcome {
    paths: Vec<FlowPath>,
    partitions: usize,
    causal_violations: usize,
    unreachable: usize,
    dropped_edges: usize,
    renderings: Vec<(String, String)>,
}

/// Drives one extraction.
///
/// ```rust,no_run
/// use taintpath::{ExtractConfig, PathExtractor};
/// use taintpath::events::TaintLog;
///
/// let log = TaintLog::from_file(std::path::Path::new("log.txt"))?;
/// let extractor = PathExtractor::new(ExtractConfig::default());
/// let reconstruction = extractor.reconstruct(log);
/// for path in extractor.paths(&reconstruction) {
///     println!("{} -> {} ({} steps)", path.source, path.sink, path.len());
/// }
/// # Ok::<(), taintpath::Error>(())
/// ```
#[derive(Debug, Default)]
pub struct PathExtractor {
    config: ExtractConfig,
}

impl PathExtractor {
    /// Creates an extractor.
    #[must_use]
    pub fn new(config: ExtractConfig) -> Self {
        PathExtractor { config }
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &ExtractConfig {
        &self.config
    }

    /// Closes every graph over the fragment cache and splices parcel graphs.
    ///
    /// The raw fragment lists and the cache are released here.
    #[must_use]
    pub fn reconstruct(&self, log: TaintLog) -> Reconstruction {
        let TaintLog {
            graphs,
            cache,
            parcels,
            bindings,
            stats,
            ..
        } = log;

        let order = graphs.ids().to_vec();
        let closed = close_graphs(graphs, &cache, self.config.parallel);
        drop(cache);

        let (graphs, splice) = ParcelSplicer::new(closed).splice_all(&order, &parcels);
        log::info!(
            "reconstructed {} graphs ({} parcel references inlined, {} unknown, {} cyclic)",
            graphs.len(),
            splice.inlined,
            splice.unknown,
            splice.cyclic
        );

        Reconstruction {
            graphs,
            bindings,
            parse: stats,
            splice,
        }
    }

    /// Synthesizes, deduplicates and ranks the paths of a reconstruction.
    #[must_use]
    pub fn paths(&self, reconstruction: &Reconstruction) -> Vec<FlowPath> {
        let mut report = ExtractionReport::default();
        self.rank_paths(reconstruction, &mut report).0
    }

    fn rank_paths(
        &self,
        reconstruction: &Reconstruction,
        report: &mut ExtractionReport,
    ) -> (Vec<FlowPath>, Vec<(String, String)>) {
        let bindings = &reconstruction.bindings;
        let bound: Vec<(GraphId, &[Arc<Fragment>])> = reconstruction
            .graphs
            .iter()
            .filter(|(id, _)| bindings.sink(*id).is_some())
            .collect();

        report.graphs = reconstruction.graphs.len();
        report.bound_graphs = bound.len();
        report.parcels_inlined = reconstruction.splice.inlined;
        report.parcels_unresolved = reconstruction.splice.unknown + reconstruction.splice.cyclic;

        let outcomes: Vec<GraphOutcome> = if self.config.parallel {
            bound
                .par_iter()
                .map(|(id, lines)| self.graph_outcome(*id, lines, bindings))
                .collect()
        } else {
            bound
                .iter()
                .map(|(id, lines)| self.graph_outcome(*id, lines, bindings))
                .collect()
        };

        let mut candidates = Vec::new();
        let mut renderings = Vec::new();
        for outcome in outcomes {
            report.partitions += outcome.partitions;
            report.causal_violations += outcome.causal_violations;
            report.unreachable += outcome.unreachable;
            report.dropped_edges += outcome.dropped_edges;
            candidates.extend(outcome.paths);
            renderings.extend(outcome.renderings);
        }
        report.candidate_paths = candidates.len();

        let ranked = deduplicate(candidates, self.config.one_path_per_start);
        report.paths = ranked.len();
        report.divergent_paths = ranked.iter().filter(|path| path.divergent).count();

        log::info!(
            "{} candidate paths from {} partitions, {} kept",
            report.candidate_paths,
            report.partitions,
            report.paths
        );
        (ranked, renderings)
    }

    fn graph_outcome(
        &self,
        graph: GraphId,
        lines: &[Arc<Fragment>],
        bindings: &TaintBindings,
    ) -> GraphOutcome {
        let mut outcome = GraphOutcome::default();
        let recorded = bindings.sink(graph);
        let flow = FlowGraph::build(lines, bindings, &self.config);
        outcome.dropped_edges = flow.dropped_edges();

        for source in flow.sources() {
            let Some(subgraph) = flow.partition(source) else {
                continue;
            };
            outcome.partitions += 1;

            if self.config.dump_graphs {
                outcome.renderings.push((
                    format!("{}_{}", graph, source.time),
                    subgraph.to_dot(&format!("graph {graph} from {source}")),
                ));
            }

            let Some(sink) = select_sink(&subgraph, recorded, self.config.sink_selection) else {
                outcome.unreachable += 1;
                continue;
            };

            match synthesize(graph, &subgraph, sink) {
                Synthesis::Path(path) => outcome.paths.push(path),
                Synthesis::Unreachable => outcome.unreachable += 1,
                Synthesis::CausalViolation { at } => {
                    log::debug!("graph {}: {} predates source {}", graph, at, source);
                    outcome.causal_violations += 1;
                }
            }
        }

        outcome
    }

    /// Parses the log at `log_path` and runs [`PathExtractor::run_log`].
    ///
    /// # Errors
    /// Returns an error if the log cannot be read, an instruction table is corrupt
    /// or an output file cannot be written.
    pub fn run(
        &self,
        log_path: &Path,
        resolver: &InstructionResolver,
        out_dir: &Path,
    ) -> Result<ExtractionReport> {
        let log = TaintLog::from_file(log_path)?;
        self.run_log(log, resolver, out_dir)
    }

    /// Reconstructs, synthesizes and ranks the paths of `log`, resolves their
    /// statements and writes path files and the summary below `out_dir`.
    ///
    /// # Errors
    /// Returns an error if an instruction table is corrupt or an output file
    /// cannot be written.
    pub fn run_log(
        &self,
        log: TaintLog,
        resolver: &InstructionResolver,
        out_dir: &Path,
    ) -> Result<ExtractionReport> {
        let mut report = ExtractionReport::from_parse(&log.stats);
        let reconstruction = self.reconstruct(log);
        let (paths, renderings) = self.rank_paths(&reconstruction, &mut report);

        let emitter = PathEmitter::create(out_dir)?;
        for (name, dot) in &renderings {
            emitter.write_graph(name, dot)?;
        }

        let resolve = |path: &FlowPath| -> Result<(Vec<InstructionRecord>, usize)> {
            let mut records = Vec::with_capacity(path.len());
            let mut dropped = 0;
            for statement in path.statements() {
                match resolver.resolve(statement)? {
                    Some(record) => records.push(record),
                    None => {
                        log::debug!("no instruction for {}", statement);
                        dropped += 1;
                    }
                }
            }
            Ok((records, dropped))
        };

        let resolved: Vec<(Vec<InstructionRecord>, usize)> = if self.config.parallel {
            paths.par_iter().map(resolve).collect::<Result<_>>()?
        } else {
            paths.iter().map(resolve).collect::<Result<_>>()?
        };

        let bindings = &reconstruction.bindings;
        let mut summary = Vec::with_capacity(paths.len());
        for (i, (path, (records, dropped))) in paths.iter().zip(resolved).enumerate() {
            let rank = i + 1;
            let lowered = lower_path(&records, bindings, self.config.skip_void_returns);
            report.dropped_statements += dropped;
            report.unsupported_instructions += lowered.unsupported;

            emitter.write_path(&path_name(rank, path), &lowered)?;
            summary.push(summary_row(rank, path, bindings));
        }
        emitter.write_summary(&summary)?;

        log::info!(
            "wrote {} paths to {} ({} statements unresolved, {} unsupported instructions)",
            report.paths,
            out_dir.display(),
            report.dropped_statements,
            report.unsupported_instructions
        );
        Ok(report)
    }
}
