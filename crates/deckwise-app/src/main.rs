// Deckwise entry point.
//
// Startup sequence:
// 1. Initialize tracing (log to file, not the terminal)
// 2. Load config
// 3. Build the HTTP remote
// 4. Create mpsc channels
// 5. Spawn app logic task
// 6. Run the line front end until the user quits
// 7. Cleanup on exit

use std::sync::Arc;

use deckwise_app::app;
use deckwise_app::config;
use deckwise_app::frontend;
use deckwise_remote::HttpRemote;

use anyhow::Context;
use tokio::sync::mpsc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize tracing
    init_tracing()?;
    info!("Deckwise starting up");

    // 2. Load config
    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: remote={}, timeout={}s, preload_catalog={}",
        config.remote.base_url, config.remote.timeout_secs, config.preload_catalog
    );

    // 3. Build the HTTP remote
    let remote = HttpRemote::new(
        &config.remote.base_url,
        config.remote.timeout(),
        config.credentials.api_token.clone(),
    )
    .context("failed to build HTTP client")?;
    if config.credentials.api_token.is_some() {
        info!("API token configured");
    }

    // 4. Create mpsc channels
    let (remote_tx, remote_rx) = mpsc::channel(64);
    let (cmd_tx, cmd_rx) = mpsc::channel(64);
    let (ui_tx, ui_rx) = mpsc::channel(256);

    let app_state = app::AppState::new(config, Arc::new(remote), remote_tx);

    // 5. Spawn app logic task
    let app_handle = tokio::spawn(async move {
        if let Err(e) = app::run(cmd_rx, remote_rx, ui_tx, app_state).await {
            error!("Application loop error: {}", e);
        }
    });

    // 6. Front end (blocks until the user quits or stdin closes)
    if let Err(e) = frontend::run(ui_rx, cmd_tx).await {
        error!("Front end error: {}", e);
    }

    // 7. Cleanup: wait for app task to finish (with timeout)
    let _ = tokio::time::timeout(std::time::Duration::from_secs(5), async {
        let _ = app_handle.await;
    })
    .await;

    info!("Deckwise shut down cleanly");
    Ok(())
}

/// Initialize tracing to log to a file (stdout belongs to the front end).
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("deckwise.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("deckwise=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
