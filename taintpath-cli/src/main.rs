mod app;
mod commands;
mod output;

use clap::Parser;

use crate::app::{Cli, Command};

fn main() -> anyhow::Result<()> {
    ctrlc::set_handler(|| {
        eprintln!("\nCancelled.");
        std::process::exit(130);
    })
    .expect("failed to set Ctrl+C handler");

    let cli = Cli::parse();

    // taintpath info+ on stderr unless --json; --verbose enables debug; RUST_LOG overrides
    if !cli.global.json {
        let level = if cli.global.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        };
        env_logger::Builder::new()
            .filter_module("taintpath", level)
            .parse_default_env()
            .target(env_logger::Target::Stderr)
            .format_timestamp(None)
            .format_module_path(false)
            .format_target(false)
            .init();
    }

    match &cli.command {
        Command::Extract {
            log,
            classes,
            framework_classes,
            preload,
            out,
            sink,
            keep_alternate_routes,
            dump_graphs,
            sequential,
        } => commands::extract::run(
            log,
            &commands::extract::ExtractOptions {
                classes,
                framework_classes: framework_classes.as_deref(),
                preload,
                out,
                sink,
                keep_alternate_routes: *keep_alternate_routes,
                dump_graphs: *dump_graphs,
                sequential: *sequential,
                global: &cli.global,
            },
        ),
        Command::Inspect { log, bound_only } => commands::inspect::run(log, *bound_only, &cli.global),
        Command::Translate { instructions } => commands::translate::run(instructions, &cli.global),
    }
}
