use std::path::{Path, PathBuf};
use std::time::Duration;

use tunnel_proxy::{TunnelConfig, TunnelServer};
use tunnel_settings::{ConfigLoader, TunnelSettings};

use crate::cli::RunArgs;
use crate::error::CliError;
use crate::prompt::prompt_settings;

pub async fn run(args: RunArgs, config_path: PathBuf) -> Result<(), CliError> {
    // 1. Saved settings, then CLI overrides.
    let mut settings = ConfigLoader::load_or_default(&config_path);
    apply_overrides(&mut settings, &args);

    // 2. Let the user confirm or change each address.
    if !args.no_prompt {
        settings = prompt_on_terminal(settings).await?;
    }

    // 3. Remember the answers for next time. Not fatal.
    if !args.no_save {
        save_settings(&settings, &config_path);
    }

    // 4. Serve until SIGINT/SIGTERM, then drain.
    tracing::info!("Configuration confirmed, starting tunnel");
    let server = TunnelServer::new(build_tunnel_config(&settings))?;
    server.run().await?;
    tracing::info!("Tunnel stopped");
    Ok(())
}

/// Run the blocking stdin prompts off the async workers.
async fn prompt_on_terminal(mut settings: TunnelSettings) -> Result<TunnelSettings, CliError> {
    let answered = tokio::task::spawn_blocking(move || {
        let stdin = std::io::stdin();
        let mut input = stdin.lock();
        let mut output = std::io::stdout();
        prompt_settings(&mut input, &mut output, &mut settings).map(|()| settings)
    })
    .await
    .map_err(|e| CliError::Other(format!("Prompt task failed: {e}")))?;

    answered.map_err(|e| CliError::Other(format!("Failed to read input: {e}")))
}

fn apply_overrides(settings: &mut TunnelSettings, args: &RunArgs) {
    if let Some(local) = &args.local {
        settings.local_addr = local.clone();
    }
    if let Some(remote) = &args.remote {
        settings.remote_addr = remote.clone();
    }
    if let Some(socks) = &args.socks {
        settings.socks_addr = socks.clone();
    }
    if let Some(secs) = args.connect_timeout {
        settings.connect_timeout_secs = Some(secs);
    }
}

fn save_settings(settings: &TunnelSettings, path: &Path) {
    match settings.save(path) {
        Ok(()) => tracing::info!(path = %path.display(), "Saved config"),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to save config");
        }
    }
}

fn build_tunnel_config(settings: &TunnelSettings) -> TunnelConfig {
    let mut config = TunnelConfig::new(
        settings.local_addr.clone(),
        settings.remote_addr.clone(),
        settings.socks_addr.clone(),
    );
    // Zero would fail every dial; treat it like an absent value.
    if let Some(secs) = settings.connect_timeout_secs.filter(|secs| *secs > 0) {
        config.connect_timeout = Duration::from_secs(secs);
    }
    config
}
