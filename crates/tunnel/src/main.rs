mod cli;
mod commands;
mod error;
mod prompt;

use clap::Parser;
use cli::{Cli, Command};
use error::CliError;
use std::io::IsTerminal;
use tunnel_settings::ConfigLoader;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    setup_tracing(cli.verbose);

    let result = dispatch(cli).await;
    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn dispatch(cli: Cli) -> Result<(), CliError> {
    let config_path = match cli.config {
        Some(path) => path,
        None => ConfigLoader::config_path()?,
    };
    match cli.command.unwrap_or_default() {
        Command::Run(args) => commands::run::run(args, config_path).await,
        Command::Config(args) => commands::config::config(args, config_path).await,
    }
}

fn setup_tracing(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let filter = std::env::var("TUNNEL_LOG").unwrap_or_else(|_| level.to_string());

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .init();
}
