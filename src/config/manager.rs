#![allow(dead_code)]
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::{broadcast, RwLock};
use tracing::info;

use super::runtime::{AppConfig, VenueCredentials};
use crate::types::Venue;

#[derive(Debug, Clone)]
pub enum ConfigChangeEvent {
    FullConfigUpdated,
}

pub struct AppConfigManager {
    config: Arc<RwLock<AppConfig>>,
    change_tx: broadcast::Sender<ConfigChangeEvent>,
}

impl AppConfigManager {
    pub fn new(initial: AppConfig) -> Self {
        let (change_tx, _) = broadcast::channel(32);
        Self {
            config: Arc::new(RwLock::new(initial)),
            change_tx,
        }
    }

    pub async fn get_config(&self) -> AppConfig {
        self.config.read().await.clone()
    }

    pub async fn update_full(&self, new_config: AppConfig) -> Result<(), String> {
        if let Err(errors) = new_config.validate() {
            return Err(errors.join(", "));
        }
        let mut config = self.config.write().await;
        *config = new_config;
        info!("configuration reloaded");
        let _ = self.change_tx.send(ConfigChangeEvent::FullConfigUpdated);
        Ok(())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ConfigChangeEvent> {
        self.change_tx.subscribe()
    }

    pub fn config_arc(&self) -> Arc<RwLock<AppConfig>> {
        Arc::clone(&self.config)
    }
}

impl Clone for AppConfigManager {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            change_tx: self.change_tx.clone(),
        }
    }
}

fn split_csv(s: &str) -> Vec<String> {
    s.split(',').map(|x| x.trim().to_string()).filter(|x| !x.is_empty()).collect()
}

/// Loads a TOML base config (if present), then layers environment variables
/// on top — credentials always come from the environment and are never
/// written back to the file.
pub fn load_app_config(toml_path: &str) -> Result<AppConfig> {
    let _ = dotenvy::dotenv();

    let mut config = if Path::new(toml_path).exists() {
        let raw = std::fs::read_to_string(toml_path).with_context(|| format!("reading {toml_path}"))?;
        toml::from_str(&raw).with_context(|| format!("parsing {toml_path}"))?
    } else {
        AppConfig::default()
    };

    if let Ok(symbols) = std::env::var("SYMBOLS") {
        config.symbols = split_csv(&symbols);
    }
    if let Ok(primary) = std::env::var("PRIMARY_EXCHANGE") {
        config.primary_exchange = primary.parse::<Venue>().map_err(anyhow::Error::msg)?;
    }
    if let Ok(interval) = std::env::var("SCAN_INTERVAL_SEC") {
        config.scan_interval_sec = interval.parse().context("SCAN_INTERVAL_SEC must be an integer")?;
    }

    let mut credentials: HashMap<String, VenueCredentials> = config.credentials;
    credentials.entry("binance".to_string()).or_default().api_key = std::env::var("BINANCE_API_KEY").unwrap_or_default();
    credentials.entry("binance".to_string()).or_default().api_secret = std::env::var("BINANCE_API_SECRET").unwrap_or_default();
    credentials.entry("kucoin".to_string()).or_default().api_key = std::env::var("KUCOIN_API_KEY").unwrap_or_default();
    credentials.entry("kucoin".to_string()).or_default().api_secret = std::env::var("KUCOIN_API_SECRET").unwrap_or_default();
    credentials.entry("kucoin".to_string()).or_default().api_passphrase = std::env::var("KUCOIN_API_PASSPHRASE").unwrap_or_default();
    config.credentials = credentials;

    config.validate().map_err(|errors| anyhow::anyhow!(errors.join(", ")))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn manager_rejects_invalid_update_and_keeps_old_config() {
        let manager = AppConfigManager::new(AppConfig::default());
        let mut bad = manager.get_config().await;
        bad.symbols.clear();
        let result = manager.update_full(bad).await;
        assert!(result.is_err());
        assert_eq!(manager.get_config().await.symbols, AppConfig::default().symbols);
    }
}
