use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(
    name = "tunnel",
    about = "Forward a local TCP port to a remote address through a SOCKS5 proxy"
)]
pub struct Cli {
    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Use this config file instead of the one in the user config directory
    #[arg(long = "config", value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Defaults to `run` when omitted
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the tunnel (prompts for addresses unless --no-prompt)
    Run(RunArgs),
    /// Manage the saved configuration
    Config(ConfigArgs),
}

impl Default for Command {
    fn default() -> Self {
        Command::Run(RunArgs::default())
    }
}

#[derive(Args, Default)]
pub struct RunArgs {
    /// Local listen address (host:port)
    #[arg(long, value_name = "ADDR")]
    pub local: Option<String>,

    /// Remote target address (host:port)
    #[arg(long, value_name = "ADDR")]
    pub remote: Option<String>,

    /// SOCKS5 proxy address (host:port)
    #[arg(long, value_name = "ADDR")]
    pub socks: Option<String>,

    /// Upstream dial timeout in seconds (at least 1)
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub connect_timeout: Option<u64>,

    /// Do not ask for addresses; use saved values and flags
    #[arg(long)]
    pub no_prompt: bool,

    /// Do not write the final addresses back to the config file
    #[arg(long)]
    pub no_save: bool,
}

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub subcommand: ConfigSubcommand,
}

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Write the factory defaults to the config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the effective configuration
    Show {
        #[arg(long, value_enum, default_value = "json")]
        format: OutputFormat,
    },
    /// Print the config file path
    Path,
}

#[derive(ValueEnum, Clone, Copy)]
pub enum OutputFormat {
    Json,
    Toml,
}
