use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use reelrelay_core::models::settings::RelaySettings;
use tracing_subscriber::EnvFilter;

use crate::core::http_client::{build_clients, HttpClients};
use crate::platforms::instagram::InstagramResolver;
use crate::platforms::tiktok::TikTokClient;
use crate::platforms::traits::PostResolver;

pub mod core;
pub mod platforms;
pub mod routes;
pub mod storage;

#[cfg(test)]
mod test_support;

const DEFAULT_LOG_FILTER: &str = "reelrelay=info,reelrelay_lib=info,tower_http=info";

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<RelaySettings>,
    pub clients: HttpClients,
    pub tiktok: TikTokClient,
    pub instagram: Arc<dyn PostResolver>,
}

impl AppState {
    pub fn new(settings: RelaySettings) -> anyhow::Result<Self> {
        let clients = build_clients(&settings.upstream, &settings.proxy)?;
        let tiktok = TikTokClient::new(clients.api.clone(), settings.upstream.tiktok_api_base.clone());
        let instagram = InstagramResolver::new(
            Duration::from_secs(settings.upstream.request_timeout_secs),
            Duration::from_secs(settings.upstream.connect_timeout_secs),
            &settings.proxy,
        )?;

        Ok(Self {
            settings: Arc::new(settings),
            clients,
            tiktok,
            instagram: Arc::new(instagram),
        })
    }

    pub fn with_post_resolver(mut self, resolver: Arc<dyn PostResolver>) -> Self {
        self.instagram = resolver;
        self
    }

    pub fn stream_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.settings.upstream.stream_idle_timeout_secs)
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Could not listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}

pub async fn run() -> anyhow::Result<()> {
    init_tracing();

    let settings = storage::config::load_settings();
    let addr = settings.server.bind_addr();
    let state = AppState::new(settings)?;
    let app = routes::router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("could not bind {}", addr))?;

    tracing::info!("Relay listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    Ok(())
}
