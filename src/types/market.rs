use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Candle;

/// Per-tick derivatives observation for a single (venue, symbol). `open_interest`
/// is already USD-notional (contracts x mark, converted by the exchange
/// adapter); `None` means the conversion was not possible (mark unavailable).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Derivatives1H {
    pub funding_rate: Option<Decimal>,
    pub open_interest: Option<Decimal>,
    pub ratio_long_pct: Option<Decimal>,
    pub meta: HashMap<String, String>,
}

impl Derivatives1H {
    pub fn unknown() -> Self {
        Self {
            funding_rate: None,
            open_interest: None,
            ratio_long_pct: None,
            meta: HashMap::new(),
        }
    }
}

/// Per-symbol bundle fetched once per tick. Candle sequences are chronological
/// ascending and closed-only: `fetch_snapshot` drops the forming bar the
/// exchange returns as the last element before building this struct, so
/// `.last()` is always the last closed bar here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub symbol: String,
    pub candles_15m: Vec<Candle>,
    pub candles_1h: Vec<Candle>,
    pub candles_4h: Vec<Candle>,
    pub deriv_1h: Derivatives1H,
    pub mark_price: Option<Decimal>,
    pub bid: Option<Decimal>,
    pub ask: Option<Decimal>,
    pub spread_pct: Option<Decimal>,
}

/// Symbol tiers shared by Gate 1's spread filter and the planner's execution
/// leeway; keeping one table avoids the two drifting apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoinGroup {
    Core,
    Major,
    AltLowPrice,
    Alt,
}

impl CoinGroup {
    pub fn for_symbol(symbol: &str) -> Self {
        match symbol.to_ascii_uppercase().as_str() {
            "BTCUSDT" | "ETHUSDT" => CoinGroup::Core,
            "BNBUSDT" | "SOLUSDT" => CoinGroup::Major,
            "ARBUSDT" | "NEARUSDT" => CoinGroup::AltLowPrice,
            _ => CoinGroup::Alt,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CoinGroup::Core => "core",
            CoinGroup::Major => "major",
            CoinGroup::AltLowPrice => "alt_low_price",
            CoinGroup::Alt => "alt",
        }
    }
}

impl MarketSnapshot {
    /// Best-effort current price: mark, else mid of bid/ask, else last 15m close.
    pub fn mark(&self) -> Option<Decimal> {
        if let Some(m) = self.mark_price {
            if m > Decimal::ZERO {
                return Some(m);
            }
        }
        if let (Some(bid), Some(ask)) = (self.bid, self.ask) {
            return Some((bid + ask) / Decimal::TWO);
        }
        self.candles_15m.last().map(|c| c.close)
    }
}
