use anyhow::Result;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::info;

use handoff_router::config::Settings;
use handoff_router::services::ConversationStore;
use handoff_router::{build_router, logging, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let settings = Settings::load()?;

    // Initialize logging
    logging::init(&settings.logging);

    info!("🚀 Starting handoff router...");
    info!(
        "✅ Configuration loaded (pbx={}, phone_number_id={})",
        settings.pbx.base_url, settings.channel.phone_number_id
    );
    if settings.app_secret().is_none() {
        info!("Webhook signature check disabled (no channel.app_secret)");
    }

    let state = AppState::from_settings(&settings);

    spawn_sweeper(
        state.store.clone(),
        Duration::from_secs(settings.conversation.idle_ttl_seconds),
        Duration::from_secs(settings.conversation.sweep_interval_seconds.max(1)),
    );
    info!("✅ Conversation sweeper started");

    let app = build_router(state);

    // Server address
    let addr = SocketAddr::from((
        settings.server.host.parse::<std::net::IpAddr>()?,
        settings.server.port,
    ));

    info!("🎯 Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Periodically drop conversations idle longer than `idle_ttl`
fn spawn_sweeper(store: ConversationStore, idle_ttl: Duration, every: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            store.sweep_idle(idle_ttl);
        }
    });
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}
