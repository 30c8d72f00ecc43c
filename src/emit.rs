//! Path files and the source/sink summary.
//!
//! Output layout under the run's output directory:
//!
//! ```text
//! paths/path_<rank>_<graph>_<srcTime>_<sinkTime>.csv           index,method,line,statement
//! paths_bytecode/path_<rank>_<graph>_<srcTime>_<sinkTime>.csv  index,class,method,line,instruction
//! graphs/<graph>_<srcTime>.dot                                  optional partition renderings
//! sources_sinks.csv                                             one row per emitted path
//! ```

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::Serialize;

use crate::{
    binding::TaintBindings,
    dalvik::{translate, InstructionRecord, MethodRef, ThreeAddress, TypeDescriptor},
    paths::FlowPath,
    Result,
};

/// Directory of translated path files.
pub const PATHS_DIR: &str = "paths";
/// Directory of raw instruction path files.
pub const BYTECODE_DIR: &str = "paths_bytecode";
/// Directory of partition renderings.
pub const GRAPHS_DIR: &str = "graphs";
/// Summary file name.
pub const SUMMARY_FILE: &str = "sources_sinks.csv";

const PATH_HEADER: [&str; 4] = ["index", "method", "line", "statement"];
const BYTECODE_HEADER: [&str; 5] = ["index", "class", "method", "line", "instruction"];
const SUMMARY_HEADER: [&str; 8] = [
    "path",
    "source_stmt",
    "source_detail",
    "sink_stmt",
    "sink_detail",
    "src_instance",
    "sink_instance",
    "length",
];

/// One translated row of a path file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathRow {
    /// Sequential position after collapsing.
    pub index: usize,
    /// `<pkg.Cls: ret name(params)>`
    pub method: String,
    /// Instruction line within the method.
    pub line: i64,
    /// Three-address statement.
    pub statement: String,
}

/// One raw instruction row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BytecodeRow {
    /// Position in the resolved path.
    pub index: usize,
    /// Class descriptor.
    pub class: String,
    /// Method with signature.
    pub method: String,
    /// Instruction line within the method.
    pub line: i64,
    /// Instruction text.
    pub instruction: String,
}

/// One row of the source/sink summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryRow {
    /// Path file stem.
    pub path: String,
    /// Source statement.
    pub source_stmt: String,
    /// Detail recorded with the source, empty if none.
    pub source_detail: String,
    /// Sink statement recorded for the graph.
    pub sink_stmt: String,
    /// Detail recorded with the sink.
    pub sink_detail: String,
    /// Logical time of the source instance.
    pub src_instance: i64,
    /// Logical time of the sink instance.
    pub sink_instance: i64,
    /// Number of statements in the path.
    pub length: usize,
}

/// A path lowered to output rows.
#[derive(Debug, Clone, Default)]
pub struct LoweredPath {
    /// Translated rows, collapsed and renumbered.
    pub rows: Vec<PathRow>,
    /// Resolved instructions in path order.
    pub bytecode: Vec<BytecodeRow>,
    /// Rows whose instruction had no three-address form.
    pub unsupported: usize,
}

/// File stem of the path ranked `rank` (1-based).
#[must_use]
pub fn path_name(rank: usize, path: &FlowPath) -> String {
    format!(
        "path_{}_{}_{}_{}",
        rank, path.graph, path.source.time, path.sink.time
    )
}

/// Lowers resolved instructions, source first, into path rows.
///
/// Consecutive rows with equal method and statement collapse into one. If the
/// first instruction is a reflective `Method.invoke` and a reflective target was
/// recorded for its class, the row shows a static call of that target instead.
#[must_use]
pub fn lower_path(
    records: &[InstructionRecord],
    bindings: &TaintBindings,
    skip_void_returns: bool,
) -> LoweredPath {
    let mut lowered = LoweredPath::default();

    for (i, record) in records.iter().enumerate() {
        lowered.bytecode.push(BytecodeRow {
            index: i,
            class: record.class.clone(),
            method: record.method.clone(),
            line: record.line,
            instruction: record.text.clone(),
        });

        let mut statement = translate(&record.text);
        if i == 0 {
            if let Some(substitute) = reflective_substitute(record, bindings) {
                statement = substitute;
            }
        }

        if skip_void_returns && statement.statement() == Some("return") {
            continue;
        }
        if statement.is_unsupported() {
            lowered.unsupported += 1;
        }

        let method = display_method(record);
        let statement = statement.to_string();
        if lowered
            .rows
            .last()
            .is_some_and(|last| last.method == method && last.statement == statement)
        {
            continue;
        }

        lowered.rows.push(PathRow {
            index: lowered.rows.len(),
            method,
            line: record.line,
            statement,
        });
    }

    lowered
}

fn reflective_substitute(record: &InstructionRecord, bindings: &TaintBindings) -> Option<ThreeAddress> {
    let (_, reference) = record.text.rsplit_once("}, ")?;
    if !MethodRef::parse(reference).ok()?.is_reflective_invoke() {
        return None;
    }

    let class = TypeDescriptor::parse(&record.class).ok()?.to_string();
    let target = bindings.reflective_target(&class)?;
    Some(translate(&format!("invoke-static {{v0}}, {target}")))
}

fn display_method(record: &InstructionRecord) -> String {
    MethodRef::from_parts(&record.class, &record.method)
        .map(|method| method.to_string())
        .unwrap_or_else(|_| format!("{}->{}", record.class, record.method))
}

/// Builds the summary row of one ranked path.
#[must_use]
pub fn summary_row(rank: usize, path: &FlowPath, bindings: &TaintBindings) -> SummaryRow {
    let (sink_stmt, sink_detail) = match bindings.sink(path.graph) {
        Some(sink) => (sink.statement.to_string(), sink.detail.clone()),
        None => (path.sink.statement.to_string(), String::new()),
    };

    SummaryRow {
        path: path_name(rank, path),
        source_stmt: path.source.statement.to_string(),
        source_detail: bindings
            .source_detail(&path.source.statement)
            .unwrap_or_default()
            .to_string(),
        sink_stmt,
        sink_detail,
        src_instance: path.source.time,
        sink_instance: path.sink.time,
        length: path.len(),
    }
}

/// Writes path files, graph renderings and the summary below one directory.
#[derive(Debug)]
pub struct PathEmitter {
    root: PathBuf,
}

impl PathEmitter {
    /// Prepares the output directory. Existing path directories are replaced.
    ///
    /// # Errors
    /// Returns an error if the directories cannot be removed or created.
    pub fn create(root: &Path) -> Result<Self> {
        for dir in [PATHS_DIR, BYTECODE_DIR] {
            let dir = root.join(dir);
            if dir.exists() {
                fs::remove_dir_all(&dir)?;
            }
            fs::create_dir_all(&dir)?;
        }

        Ok(PathEmitter {
            root: root.to_path_buf(),
        })
    }

    /// Output root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Writes both files of one path.
    ///
    /// # Errors
    /// Returns an error if a file cannot be written.
    pub fn write_path(&self, name: &str, path: &LoweredPath) -> Result<()> {
        let file = format!("{name}.csv");
        write_csv(&self.root.join(PATHS_DIR).join(&file), &PATH_HEADER, &path.rows)?;
        write_csv(
            &self.root.join(BYTECODE_DIR).join(&file),
            &BYTECODE_HEADER,
            &path.bytecode,
        )
    }

    /// Writes the summary; the header is written even without rows.
    ///
    /// # Errors
    /// Returns an error if the file cannot be written.
    pub fn write_summary(&self, rows: &[SummaryRow]) -> Result<()> {
        write_csv(&self.root.join(SUMMARY_FILE), &SUMMARY_HEADER, rows)
    }

    /// Writes one DOT rendering under `graphs/`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be written.
    pub fn write_graph(&self, name: &str, dot: &str) -> Result<()> {
        let dir = self.root.join(GRAPHS_DIR);
        fs::create_dir_all(&dir)?;
        fs::write(dir.join(format!("{name}.dot")), dot)?;
        Ok(())
    }
}

fn write_csv<T: Serialize>(path: &Path, header: &[&str], rows: &[T]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)?;
    writer.write_record(header)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}
