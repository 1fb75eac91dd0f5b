use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use obualert_client::config::{default_preferences_path, load_preferences};
use obualert_client::{AlertClient, AlertListener, Cli, ClientConfig, ClientError, JsonLinesSurface, LogSurface};
use obualert_core::preferences::AlertPreferences;
use tokio_graceful_shutdown::{SubsystemBuilder, SubsystemHandle, Toplevel};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    env_logger::Builder::new()
        .filter_level(args.verbose.log_level_filter())
        .parse_default_env()
        .init();

    let config = ClientConfig::try_from(&args)?;
    let preferences = match args.preferences.clone().or_else(default_preferences_path) {
        Some(path) => load_preferences(&path)
            .with_context(|| format!("loading preferences from {}", path.display()))?,
        None => AlertPreferences::default(),
    };
    let listener: Arc<dyn AlertListener> = if args.output {
        Arc::new(JsonLinesSurface::stdout())
    } else {
        Arc::new(LogSurface)
    };

    log::info!("obualert {} starting: {:?}", env!("CARGO_PKG_VERSION"), config.transport);

    Toplevel::new(move |s| async move {
        s.start(SubsystemBuilder::new("Client", move |subsys| {
            run_client(subsys, config, listener, preferences)
        }));
    })
    .catch_signals()
    .handle_shutdown_requests(Duration::from_millis(5000))
    .await
    .map_err(Into::into)
}

async fn run_client(
    subsys: SubsystemHandle,
    config: ClientConfig,
    listener: Arc<dyn AlertListener>,
    preferences: AlertPreferences,
) -> Result<(), ClientError> {
    let client = AlertClient::connect(&config, listener, Box::new(preferences));

    tokio::select! {
        _ = subsys.on_shutdown_requested() => {
            log::debug!("Client: shutdown requested");
            client.stop().await;
            Ok(())
        }
        r = client.closed() => {
            subsys.request_shutdown();
            r
        }
    }
}
