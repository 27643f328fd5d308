use anyhow::Result;
use clap::Parser;
use jsonpot::cli::{AppContext, Cli, Commands};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr; JSONPOT_LOG=debug shows every document's path through the pipeline
    let filter = EnvFilter::try_from_env("JSONPOT_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(!cli.no_color)
        .try_init();

    // Build a context once, pass everywhere
    let ctx = AppContext {
        quiet: cli.quiet,
        no_color: cli.no_color,
        dry_run: cli.dry_run,
    };

    match cli.command {
        Commands::Run(args) => jsonpot::core::run(args, &ctx),
        Commands::Init(args) => jsonpot::infra::config::init(args, &ctx),
        Commands::Completions(args) => jsonpot::completion::run(args, &ctx),
    }
}
