// SPDX-FileCopyrightText: 2026 Kirim Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `kirim serve` command implementation.
//!
//! Wires SQLite storage, the event bus, the session registry, the
//! per-session dispatch scheduler, the provider factory, the alert
//! notifier, the webhook ingestion server, and the recurring campaign tick
//! into one process, then runs until interrupted.

use std::sync::Arc;
use std::time::Duration;

use kirim_bus::EventBus;
use kirim_campaign::CampaignProcessor;
use kirim_config::KirimConfig;
use kirim_core::KirimError;
use kirim_dispatch::{DispatchScheduler, SessionRegistry};
use kirim_ingest::IngestPipeline;
use kirim_notify::AlertNotifier;
use kirim_provider::{ProviderFactory, SocketGatewayClient};
use kirim_storage::{Database, SqliteStore};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Run the gateway server.
pub async fn run_serve(config: KirimConfig) -> Result<(), KirimError> {
    init_tracing(&config.server.log_level);
    info!("starting kirim serve");

    let db = Database::open(&config.storage.database_path).await?;
    let store = Arc::new(SqliteStore::new(db));

    let bus = EventBus::new();
    let registry = Arc::new(SessionRegistry::new(
        bus.clone(),
        Duration::from_secs(config.dispatch.reconnect_delay_secs),
    ));
    let scheduler = Arc::new(DispatchScheduler::new(Duration::from_millis(
        config.dispatch.send_delay_ms,
    )));

    let socket_client = Arc::new(SocketGatewayClient::new(
        &config.socket_gateway,
        store.clone(),
    )?);
    let factory = Arc::new(ProviderFactory::new(
        Arc::clone(&socket_client),
        config.cloud_api.clone(),
    ));

    let notifier = Arc::new(AlertNotifier::new(
        store.clone(),
        Arc::clone(&scheduler),
        Arc::new(Arc::clone(&socket_client)),
        config.alerts.clone(),
        config.identity.country_prefix.clone(),
    ));

    let pipeline = Arc::new(
        IngestPipeline::new(
            store.clone(),
            bus.clone(),
            Arc::clone(&registry),
            &config.identity.country_prefix,
        )
        .with_notifier(notifier)
        .with_socket_client(Arc::clone(&socket_client)),
    );

    let processor = Arc::new(CampaignProcessor::new(
        store.clone(),
        factory,
        config.campaign.clone(),
        config.identity.country_prefix.clone(),
    ));
    let tick_interval = Duration::from_secs(config.campaign.tick_interval_secs);
    let campaign_loop = tokio::spawn(async move {
        let mut interval = tokio::time::interval(tick_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            let processed = processor.tick().await;
            if processed > 0 {
                info!(processed, "campaign tick finished");
            }
        }
    });

    let app = kirim_ingest::router(pipeline);
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| KirimError::provider(format!("failed to bind {addr}"), e))?;
    info!(%addr, "webhook server listening");

    axum_serve(listener, app).await?;

    campaign_loop.abort();
    info!("kirim serve stopped");
    Ok(())
}

async fn axum_serve(
    listener: tokio::net::TcpListener,
    app: axum::Router,
) -> Result<(), KirimError> {
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| KirimError::provider("webhook server error", e))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to install shutdown handler");
    }
    info!("shutdown signal received");
}

fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
