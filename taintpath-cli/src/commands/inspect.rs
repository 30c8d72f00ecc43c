use std::path::Path;

use anyhow::Context;
use serde::Serialize;
use taintpath::events::{ParseStats, TaintLog};

use crate::{
    app::GlobalOptions,
    output::{print_output, Align, TabWriter},
};

#[derive(Debug, Serialize)]
pub struct LogSummary {
    pub stats: ParseStats,
    pub sources: usize,
    pub cached_nodes: usize,
    pub distinct_statements: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parcels: Vec<u64>,
    pub graphs: Vec<GraphInfo>,
}

#[derive(Debug, Serialize)]
pub struct GraphInfo {
    pub id: u64,
    pub lines: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sink: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sink_detail: Option<String>,
}

pub fn run(path: &Path, bound_only: bool, opts: &GlobalOptions) -> anyhow::Result<()> {
    let log = TaintLog::from_file(path)
        .with_context(|| format!("failed to read log: {}", path.display()))?;

    let graphs: Vec<GraphInfo> = log
        .graphs
        .iter()
        .filter_map(|(id, lines)| {
            let sink = log.bindings.sink(id);
            if bound_only && sink.is_none() {
                return None;
            }
            Some(GraphInfo {
                id,
                lines: lines.len(),
                sink: sink.map(|s| s.statement.to_string()),
                sink_detail: sink.map(|s| s.detail.clone()),
            })
        })
        .collect();

    let summary = LogSummary {
        stats: log.stats,
        sources: log.bindings.source_count(),
        cached_nodes: log.cache.len(),
        distinct_statements: log.interner.len(),
        parcels: log.parcels.clone(),
        graphs,
    };

    print_output(&summary, opts, |summary| {
        println!("Lines:           {}", summary.stats.lines);
        println!("Events:          {}", summary.stats.events);
        println!("Malformed:       {}", summary.stats.malformed);
        println!("Dump lines:      {}", summary.stats.dump_lines);
        println!("Sources:         {}", summary.sources);
        println!("Cached nodes:    {}", summary.cached_nodes);
        println!("Statements:      {}", summary.distinct_statements);
        if !summary.parcels.is_empty() {
            let ids: Vec<String> = summary.parcels.iter().map(ToString::to_string).collect();
            println!("Parcel graphs:   {}", ids.join(", "));
        }

        if !summary.graphs.is_empty() {
            println!("\nGraphs:");
            let mut tw = TabWriter::new(vec![
                ("Id", Align::Right),
                ("Lines", Align::Right),
                ("Sink", Align::Left),
            ])
            .indent("  ");
            for g in &summary.graphs {
                tw.row(vec![
                    g.id.to_string(),
                    g.lines.to_string(),
                    g.sink.clone().unwrap_or_else(|| "-".to_string()),
                ]);
            }
            tw.print();
        }
    })
}
