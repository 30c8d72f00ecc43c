use std::path::{Path, PathBuf};

use anyhow::Context;
use taintpath::{dalvik::InstructionResolver, ExtractConfig, PathExtractor, SinkSelection};

use crate::{
    app::GlobalOptions,
    output::{print_output, Align, TabWriter},
};

pub struct ExtractOptions<'a> {
    pub classes: &'a Path,
    pub framework_classes: Option<&'a Path>,
    pub preload: &'a [PathBuf],
    pub out: &'a Path,
    pub sink: &'a str,
    pub keep_alternate_routes: bool,
    pub dump_graphs: bool,
    pub sequential: bool,
    pub global: &'a GlobalOptions,
}

fn build_config(opts: &ExtractOptions) -> anyhow::Result<ExtractConfig> {
    let sink_selection: SinkSelection = opts
        .sink
        .parse()
        .map_err(|_| anyhow::anyhow!("unknown sink selection '{}' (expected first or last)", opts.sink))?;

    Ok(ExtractConfig {
        sink_selection,
        one_path_per_start: !opts.keep_alternate_routes,
        parallel: !opts.sequential,
        dump_graphs: opts.dump_graphs,
        ..ExtractConfig::default()
    })
}

pub fn run(log: &Path, opts: &ExtractOptions) -> anyhow::Result<()> {
    let config = build_config(opts)?;

    let mut resolver = InstructionResolver::new(opts.classes);
    if let Some(dir) = opts.framework_classes {
        resolver = resolver.with_framework_dir(dir);
    }
    for dir in opts.preload {
        resolver
            .preload_dir(dir)
            .with_context(|| format!("failed to preload tables: {}", dir.display()))?;
    }

    let report = PathExtractor::new(config)
        .run(log, &resolver, opts.out)
        .with_context(|| format!("extraction failed: {}", log.display()))?;

    print_output(&report, opts.global, |report| {
        println!("Output:          {}", opts.out.display());
        println!("Paths:           {}", report.paths);
        println!();

        let mut tw = TabWriter::new(vec![("Stage", Align::Left), ("Count", Align::Right)]).indent("  ");
        let rows = [
            ("lines", report.lines),
            ("malformed lines", report.malformed_lines),
            ("graphs", report.graphs),
            ("bound graphs", report.bound_graphs),
            ("parcels inlined", report.parcels_inlined),
            ("parcels unresolved", report.parcels_unresolved),
            ("dropped edges", report.dropped_edges),
            ("partitions", report.partitions),
            ("candidate paths", report.candidate_paths),
            ("causal violations", report.causal_violations),
            ("unreachable sinks", report.unreachable),
            ("divergent paths", report.divergent_paths),
            ("unresolved statements", report.dropped_statements),
            ("unsupported instructions", report.unsupported_instructions),
        ];
        for (name, count) in rows {
            tw.row(vec![name.to_string(), count.to_string()]);
        }
        tw.print();
    })
}
