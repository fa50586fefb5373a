use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use kudos_core::config::{AppConfig, ConfigError, LoadOptions};
use kudos_slack::api::SlackWebClient;
use kudos_slack::events::{EventDispatcher, SlashCommandHandler};
use kudos_slack::service::PraiseService;
use kudos_slack::socket::{NoopSocketTransport, ReconnectPolicy, SocketModeRunner};
use kudos_store::{LedgerHandle, SnapshotStore};

pub struct Application {
    pub config: AppConfig,
    pub store: SnapshotStore,
    pub ledger: LedgerHandle,
    pub service: Arc<PraiseService>,
    pub socket_runner: SocketModeRunner,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let store = SnapshotStore::new(&config.storage.snapshot_path);

    // Probe the snapshot once so a corrupt file is visible at startup; the
    // store itself fails open, so this never blocks the boot.
    match store.try_load().await {
        Ok(ledgers) => info!(
            event_name = "system.bootstrap.snapshot_loaded",
            correlation_id = "bootstrap",
            path = %store.path().display(),
            users = ledgers.len(),
            "praise snapshot loaded"
        ),
        Err(error) => warn!(
            event_name = "system.bootstrap.snapshot_unreadable",
            correlation_id = "bootstrap",
            path = %store.path().display(),
            error = %error,
            "praise snapshot unreadable; starting with empty ledgers"
        ),
    }

    let ledger = LedgerHandle::spawn(store.clone());

    let web_client = Arc::new(SlackWebClient::new(config.slack.bot_token.clone()));
    let service = Arc::new(PraiseService::new(
        ledger.clone(),
        web_client.clone(),
        web_client.clone(),
        config.praise.weekly_limit,
    ));

    let mut dispatcher = EventDispatcher::new();
    dispatcher.register(SlashCommandHandler::new(service.clone(), web_client.clone()));

    let socket_runner = SocketModeRunner::new(
        Arc::new(NoopSocketTransport),
        dispatcher,
        ReconnectPolicy::default(),
    );

    info!(
        event_name = "system.bootstrap.ready",
        correlation_id = "bootstrap",
        weekly_limit = config.praise.weekly_limit,
        leaderboard_channel = %config.leaderboard.channel_name,
        "application wired"
    );

    Ok(Application { config, store, ledger, service, socket_runner })
}
