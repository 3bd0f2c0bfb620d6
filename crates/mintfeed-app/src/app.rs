//! Main application logic.

use crate::config::AppConfig;
use crate::error::AppResult;
use mintfeed_core::ConnectionState;
use mintfeed_dashboard::{run_server, DashboardState};
use mintfeed_feed::{FeedClient, FeedStore};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Interval for the periodic feed summary.
const SUMMARY_INTERVAL: Duration = Duration::from_secs(60);

/// Main application.
pub struct Application {
    config: AppConfig,
    client: FeedClient,
}

impl Application {
    /// Create a new application.
    ///
    /// Validates the configuration and preloads the seed entries.
    pub fn new(config: AppConfig) -> AppResult<Self> {
        config.validate()?;

        let store = FeedStore::new(config.feed.store_config());
        for entry in &config.feed.seed {
            let outcome = store.insert(entry.clone());
            info!(mint = %entry.mint, ?outcome, "Seed entry loaded");
        }

        let client = FeedClient::with_store(config.client_config(), store);
        Ok(Self { config, client })
    }

    /// The feed client driven by this application.
    pub fn client(&self) -> &FeedClient {
        &self.client
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Run until Ctrl-C.
    pub async fn run(&self) -> AppResult<()> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Failed to listen for Ctrl-C");
            }
        })
        .await
    }

    /// Run until `shutdown` completes, then stop the connection.
    pub async fn run_until<F>(&self, shutdown: F) -> AppResult<()>
    where
        F: Future<Output = ()>,
    {
        info!(endpoint = %self.config.ws.endpoint, "Starting application");

        let mut entries = self.client.subscribe_entries();
        let mut status = self.client.subscribe_status();

        let dashboard_token = CancellationToken::new();
        let dashboard_handle = if self.config.dashboard.enabled {
            let state = DashboardState::new(self.client.reader(), self.client.status());
            let config = self.config.dashboard.clone();
            let token = dashboard_token.clone();
            Some(tokio::spawn(async move {
                if let Err(e) = run_server(state, config, token).await {
                    error!(error = %e, "Dashboard server failed");
                }
            }))
        } else {
            None
        };

        if let Err(e) = self.client.start(&self.config.ws.endpoint) {
            dashboard_token.cancel();
            return Err(e.into());
        }

        info!("Entering main event loop");
        let mut new_entries = 0u64;
        let mut summary_interval = tokio::time::interval(SUMMARY_INTERVAL);
        summary_interval.tick().await;
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                Some(update) = entries.recv() => {
                    new_entries += 1;
                    info!(
                        mint = %update.entry.mint,
                        name = %update.entry.name,
                        symbol = %update.entry.symbol,
                        uri = %update.entry.uri,
                        feed_len = update.len,
                        "New listing"
                    );
                }

                Some(state) = status.recv() => {
                    match state {
                        ConnectionState::Error => warn!(
                            reconnect_count = self.client.reconnect_count(),
                            "Feed connection error"
                        ),
                        ConnectionState::Open => info!("Feed live"),
                        _ => {}
                    }
                }

                _ = summary_interval.tick() => {
                    let stats = self.client.decode_stats();
                    info!(
                        state = %self.client.state(),
                        feed_len = self.client.snapshot().len(),
                        accepted = stats.accepted(),
                        rejected = stats.rejected(),
                        "Feed summary"
                    );
                }

                () = &mut shutdown => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        info!(new_entries, "Shutting down");
        self.client.stop().await;

        dashboard_token.cancel();
        if let Some(handle) = dashboard_handle {
            if let Err(e) = handle.await {
                error!(error = %e, "Dashboard task ended abnormally");
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use mintfeed_core::Entry;

    fn seeded_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.feed.seed = vec![
            Entry {
                name: "Example Token".to_string(),
                symbol: "EXT".to_string(),
                uri: "https://example.com/token-metadata.json".to_string(),
                mint: "Mint1".to_string(),
            },
            Entry {
                name: "Second".to_string(),
                symbol: "SND".to_string(),
                uri: String::new(),
                mint: "Mint2".to_string(),
            },
        ];
        config
    }

    #[tokio::test]
    async fn test_seed_entries_preloaded_in_order() {
        let app = Application::new(seeded_config()).unwrap();

        let snapshot = app.client().snapshot();
        assert_eq!(snapshot.mints(), vec!["Mint2", "Mint1"]);
        assert_eq!(app.client().state(), ConnectionState::Closed);
    }

    #[tokio::test]
    async fn test_invalid_config_rejected() {
        let mut config = AppConfig::default();
        config.ws.endpoint = "ftp://example.com".to_string();

        assert!(matches!(
            Application::new(config),
            Err(AppError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_run_until_immediate_shutdown() {
        let mut config = AppConfig::default();
        // Nothing listens on port 1.
        config.ws.endpoint = "ws://127.0.0.1:1".to_string();
        config.ws.reconnect_initial_delay_ms = 10;
        let app = Application::new(config).unwrap();

        app.run_until(async {}).await.unwrap();

        assert_eq!(app.client().state(), ConnectionState::Closed);
        assert!(!app.client().is_running());
    }
}
