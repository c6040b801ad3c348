use clap::Parser;
use eyre::Result;
use firefox_bookmarks_export::RunContext;
use firefox_bookmarks_export::export;
use firefox_bookmarks_export::options::{Cli, ExportOptions, load_file_config};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn init_logging(verbose: bool, quiet: bool) {
    let default_level = if verbose {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    // One clock reading for the whole run.
    let ctx = RunContext::now();
    if !cli.quiet {
        println!("\n{}\n", ctx.app_title());
    }

    // 1. Load config file (CLI path > default path)
    let file_cfg = load_file_config(cli.config.as_deref())?;

    // 2. Resolve source, outputs and host (CLI > Config > Defaults)
    let options = ExportOptions::resolve(cli, file_cfg, &ctx)?;

    // 3. Run the Business Logic
    export::exit_code(export::execute(&options, &ctx))
}
