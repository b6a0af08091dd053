use std::collections::HashMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::scorer::Tier;
use crate::types::Venue;

/// Recognized options per the core's configuration surface: symbols, venue
/// routing, scan cadence, per-venue credentials (opaque, never logged), and
/// the planner/scorer thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub symbols: Vec<String>,
    pub primary_exchange: Venue,
    pub scan_interval_sec: u64,
    pub credentials: HashMap<String, VenueCredentials>,
    pub min_rr_tp2: Decimal,
    pub a_rr_min: Decimal,
    pub b_rr_min: Decimal,
    pub a_score_min: i32,
    pub b_score_min: i32,
    pub only_trade_tiers: Vec<TierName>,
}

/// Opaque per-venue secrets. Public exchange endpoints don't require them
/// today, but the shape is kept so a future authenticated client has
/// somewhere to read from without a config format change.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct VenueCredentials {
    pub api_key: String,
    pub api_secret: String,
    pub api_passphrase: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TierName {
    A,
    B,
    C,
}

impl TierName {
    pub fn to_tier(self) -> Tier {
        match self {
            TierName::A => Tier::A,
            TierName::B => Tier::B,
            TierName::C => Tier::C,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            symbols: vec!["BTCUSDT".to_string(), "ETHUSDT".to_string()],
            primary_exchange: Venue::Binance,
            scan_interval_sec: 900,
            credentials: HashMap::new(),
            min_rr_tp2: dec!(2.5),
            a_rr_min: dec!(3.0),
            b_rr_min: dec!(2.0),
            a_score_min: 80,
            b_score_min: 60,
            only_trade_tiers: vec![TierName::A, TierName::B],
        }
    }
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.symbols.is_empty() {
            errors.push("symbols must not be empty".to_string());
        }
        if self.scan_interval_sec == 0 {
            errors.push("scan_interval_sec must be > 0".to_string());
        }
        if self.min_rr_tp2 <= Decimal::ZERO {
            errors.push("min_rr_tp2 must be > 0".to_string());
        }
        if self.a_rr_min < self.b_rr_min {
            errors.push("a_rr_min must be >= b_rr_min".to_string());
        }
        if self.a_score_min < self.b_score_min {
            errors.push("a_score_min must be >= b_score_min".to_string());
        }
        if !(0..=100).contains(&self.a_score_min) {
            errors.push("a_score_min must be within 0..=100".to_string());
        }
        if !(0..=100).contains(&self.b_score_min) {
            errors.push("b_score_min must be within 0..=100".to_string());
        }
        if self.only_trade_tiers.is_empty() {
            errors.push("only_trade_tiers must not be empty".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    pub fn scorer_config(&self) -> crate::scorer::ScorerConfig {
        crate::scorer::ScorerConfig {
            a_rr_min: self.a_rr_min,
            a_score_min: self.a_score_min,
            b_rr_min: self.b_rr_min,
            b_score_min: self.b_score_min,
            only_trade_tiers: self.only_trade_tiers.iter().map(|t| t.to_tier()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn empty_symbols_is_rejected() {
        let mut cfg = AppConfig::default();
        cfg.symbols.clear();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn inverted_rr_thresholds_are_rejected() {
        let mut cfg = AppConfig::default();
        cfg.a_rr_min = dec!(1.0);
        cfg.b_rr_min = dec!(2.0);
        assert!(cfg.validate().is_err());
    }
}
