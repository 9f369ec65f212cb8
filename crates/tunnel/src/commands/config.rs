use std::path::{Path, PathBuf};

use tunnel_settings::{ConfigLoader, TunnelSettings};

use crate::cli::{ConfigSubcommand, OutputFormat};
use crate::error::CliError;

pub async fn config(args: crate::cli::ConfigArgs, path: PathBuf) -> Result<(), CliError> {
    match args.subcommand {
        ConfigSubcommand::Init { force } => init(force, &path).await,
        ConfigSubcommand::Show { format } => show(format, &path).await,
        ConfigSubcommand::Path => {
            println!("{}", path.display());
            Ok(())
        }
    }
}

async fn init(force: bool, path: &Path) -> Result<(), CliError> {
    if path.exists() && !force {
        return Err(CliError::Other(format!(
            "Config file already exists: {} (use --force to overwrite)",
            path.display()
        )));
    }

    TunnelSettings::default().save(path)?;
    println!("Created config: {}", path.display());
    Ok(())
}

async fn show(format: OutputFormat, path: &Path) -> Result<(), CliError> {
    let settings = ConfigLoader::load_or_default(path);
    match format {
        OutputFormat::Json => println!("{}", settings.to_json()?),
        OutputFormat::Toml => print!("{}", settings.to_toml()?),
    }
    Ok(())
}
