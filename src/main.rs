//! Forma CLI: compile, resolve and serve declarative feature specifications.

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "forma",
    version,
    about = "Declarative feature specifications: compile once, resolve mappings, dispatch through hooks"
)]
struct Cli {
    /// Log level (error, warn, info, debug, trace); RUST_LOG takes precedence
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: forma::cli::Commands,
}

fn main() {
    let cli = Cli::parse();
    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| forma::cli::configured_log_level(&cli.command));
    forma::cli::init_logging(&level);

    if let Err(e) = forma::cli::dispatch(cli.command) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
