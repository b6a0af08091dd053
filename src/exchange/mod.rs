#![allow(dead_code)]
pub mod binance;
pub mod kucoin;

use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::types::{Candle, Derivatives1H, TimeFrame, Venue};
pub use binance::BinanceFuturesClient;
pub use kucoin::KucoinFuturesClient;

/// Capability set the core pipeline needs from a venue. Every fetch returns
/// a best-effort `Option`/`Result`, never panics: a missing data point is
/// represented, not hidden.
#[async_trait]
pub trait ExchangeClient: Send + Sync {
    fn name(&self) -> &'static str;
    async fn ping(&self) -> bool;
    /// Chronological ascending klines. The last element may be the forming
    /// bar still being built by the exchange; callers trim it before passing
    /// the series to any analyzer.
    async fn fetch_ohlcv(&self, symbol: &str, interval: TimeFrame, limit: u32) -> Result<Vec<Candle>>;
    async fn fetch_mark_price(&self, symbol: &str) -> Option<Decimal>;
    async fn fetch_top_of_book(&self, symbol: &str) -> Option<(Decimal, Decimal)>;
    async fn fetch_spread_bps(&self, symbol: &str) -> Option<Decimal>;
    async fn fetch_derivatives_1h(&self, symbol: &str) -> Derivatives1H;
}

fn build_client(venue: Venue) -> Arc<dyn ExchangeClient> {
    match venue {
        Venue::Binance => Arc::new(BinanceFuturesClient::new()),
        Venue::Kucoin => Arc::new(KucoinFuturesClient::new()),
    }
}

/// Ping-based primary/fallback routing: the primary venue is used if it
/// answers, otherwise the fallback; if neither answers the tick is fatal.
pub struct ExchangeRouter {
    primary: Arc<dyn ExchangeClient>,
    fallback: Arc<dyn ExchangeClient>,
}

impl ExchangeRouter {
    pub fn new(primary_venue: Venue) -> Self {
        let fallback_venue = match primary_venue {
            Venue::Binance => Venue::Kucoin,
            Venue::Kucoin => Venue::Binance,
        };
        Self {
            primary: build_client(primary_venue),
            fallback: build_client(fallback_venue),
        }
    }

    pub async fn active_client(&self) -> Result<Arc<dyn ExchangeClient>> {
        if self.primary.ping().await {
            return Ok(self.primary.clone());
        }
        if self.fallback.ping().await {
            return Ok(self.fallback.clone());
        }
        Err(anyhow!("no exchange available: both primary and fallback ping failed"))
    }
}
