#![allow(dead_code)]
use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;

use crate::exchange::ExchangeClient;
use crate::types::{Candle, Derivatives1H, TimeFrame};

const BASE_URL: &str = "https://api-futures.kucoin.com";

/// Fallback-only client: only `ping` hits a real endpoint. Symbol mapping
/// (`BTCUSDT` -> `XBTUSDTM`) and the market-data endpoints are not wired up
/// yet, so every other call degrades to an empty/unknown result rather than
/// erroring, matching the router's fail-open fallback contract.
#[derive(Debug, Clone)]
pub struct KucoinFuturesClient {
    client: Client,
    base_url: String,
}

impl Default for KucoinFuturesClient {
    fn default() -> Self {
        Self::new()
    }
}

impl KucoinFuturesClient {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            base_url: BASE_URL.to_string(),
        }
    }
}

#[async_trait]
impl ExchangeClient for KucoinFuturesClient {
    fn name(&self) -> &'static str {
        "kucoin"
    }

    async fn ping(&self) -> bool {
        let url = format!("{}/api/v1/timestamp", self.base_url);
        matches!(
            self.client.get(&url).timeout(std::time::Duration::from_secs(5)).send().await,
            Ok(resp) if resp.status().is_success()
        )
    }

    async fn fetch_ohlcv(&self, _symbol: &str, _interval: TimeFrame, _limit: u32) -> Result<Vec<Candle>> {
        Ok(Vec::new())
    }

    async fn fetch_mark_price(&self, _symbol: &str) -> Option<Decimal> {
        None
    }

    async fn fetch_top_of_book(&self, _symbol: &str) -> Option<(Decimal, Decimal)> {
        None
    }

    async fn fetch_spread_bps(&self, _symbol: &str) -> Option<Decimal> {
        None
    }

    async fn fetch_derivatives_1h(&self, _symbol: &str) -> Derivatives1H {
        let mut meta = HashMap::new();
        meta.insert("source".to_string(), "kucoin".to_string());
        meta.insert("note".to_string(), "fallback placeholder, symbol mapping not implemented".to_string());
        Derivatives1H {
            funding_rate: None,
            open_interest: None,
            ratio_long_pct: None,
            meta,
        }
    }
}
