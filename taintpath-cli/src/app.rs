use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// taintpath - taint-flow reconstruction and path extraction for Android taint logs
#[derive(Debug, Parser)]
#[command(name = "taintpath", version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOptions,

    #[command(subcommand)]
    pub command: Command,
}

/// Options shared across all subcommands.
#[derive(Debug, Parser)]
pub struct GlobalOptions {
    /// Emit output as JSON instead of human-readable text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable verbose (debug-level) logging output.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Reconstruct flows from a taint log and write translated paths.
    Extract {
        /// Path to the taint log.
        #[arg(value_name = "LOG")]
        log: PathBuf,

        /// Directory of application instruction tables.
        #[arg(long, value_name = "DIR")]
        classes: PathBuf,

        /// Directory of framework instruction tables, searched after --classes.
        #[arg(long, value_name = "DIR")]
        framework_classes: Option<PathBuf>,

        /// Extra table directories loaded eagerly (repeatable).
        #[arg(long, value_name = "DIR")]
        preload: Vec<PathBuf>,

        /// Output directory for paths/, paths_bytecode/ and the summary.
        #[arg(short, long, value_name = "DIR")]
        out: PathBuf,

        /// Terminal picked when no terminal matches the recorded sink: first or last.
        #[arg(long, default_value = "first")]
        sink: String,

        /// Keep alternate routes that share a starting statement.
        #[arg(long)]
        keep_alternate_routes: bool,

        /// Write one DOT file per source partition under graphs/.
        #[arg(long)]
        dump_graphs: bool,

        /// Run every stage on the calling thread.
        #[arg(long)]
        sequential: bool,
    },

    /// Parse a taint log and list its graphs and bound sinks.
    Inspect {
        /// Path to the taint log.
        #[arg(value_name = "LOG")]
        log: PathBuf,

        /// Show only graphs with a bound sink.
        #[arg(long)]
        bound_only: bool,
    },

    /// Lower raw Dalvik instructions to three-address statements.
    Translate {
        /// Instructions, e.g. "add-int/2addr v0, v1".
        #[arg(value_name = "INSN", required = true)]
        instructions: Vec<String>,
    },
}
