use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single OHLCV bar. All downstream analytics assume closed bars: the
/// orchestrator's fetch step drops the forming (in-progress) candle an
/// exchange always returns as the last element before anything sees the
/// slice, so every analyzer can safely treat `.last()` as the last closed bar.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Candle {
    pub ts: i64,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

impl Candle {
    pub fn body_size(&self) -> Decimal {
        (self.close - self.open).abs()
    }

    pub fn range(&self) -> Decimal {
        self.high - self.low
    }

    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }

    pub fn true_range(&self, prev_close: Decimal) -> Decimal {
        let a = self.high - self.low;
        let b = (self.high - prev_close).abs();
        let c = (self.low - prev_close).abs();
        a.max(b).max(c)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeFrame {
    M15,
    H1,
    H4,
}

impl TimeFrame {
    pub fn as_interval_str(&self) -> &'static str {
        match self {
            TimeFrame::M15 => "15m",
            TimeFrame::H1 => "1h",
            TimeFrame::H4 => "4h",
        }
    }

    pub fn seconds(&self) -> i64 {
        match self {
            TimeFrame::M15 => 15 * 60,
            TimeFrame::H1 => 3600,
            TimeFrame::H4 => 4 * 3600,
        }
    }
}

impl std::fmt::Display for TimeFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_interval_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Venue {
    Binance,
    Kucoin,
}

impl Venue {
    pub fn as_str(&self) -> &'static str {
        match self {
            Venue::Binance => "binance",
            Venue::Kucoin => "kucoin",
        }
    }
}

impl std::fmt::Display for Venue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Venue {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "binance" => Ok(Venue::Binance),
            "kucoin" => Ok(Venue::Kucoin),
            other => Err(format!("unsupported exchange: {other}")),
        }
    }
}

/// Instrument identifier, e.g. `BTCUSDT`. Kept as an owned string rather
/// than an interned type: the symbol set is config-driven and small.
pub type Symbol = String;
