#![allow(dead_code)]
use std::collections::HashMap;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde_json::Value;

use crate::exchange::ExchangeClient;
use crate::types::{Candle, Derivatives1H, TimeFrame};

const BASE_URL: &str = "https://fapi.binance.com";

#[derive(Debug, Clone)]
pub struct BinanceFuturesClient {
    client: Client,
    base_url: String,
}

impl Default for BinanceFuturesClient {
    fn default() -> Self {
        Self::new()
    }
}

impl BinanceFuturesClient {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            base_url: BASE_URL.to_string(),
        }
    }

    #[cfg(test)]
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
        }
    }

    async fn get_json(&self, path: &str, query: &[(&str, String)], timeout_secs: u64) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .client
            .get(&url)
            .query(query)
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .send()
            .await?
            .error_for_status()?;
        Ok(resp.json().await?)
    }
}

/// Binance reports the long-account share either as a 0-1 fraction or as a
/// 0-100 percent depending on the endpoint variant; `longShortRatio` (a bare
/// ratio of the two sides) cannot be converted to a percent without both legs.
fn normalize_long_pct(raw: Option<f64>, kind: &str, meta: &mut HashMap<String, String>) -> Option<Decimal> {
    let raw = raw?;
    if kind == "longAccount" {
        let pct = if raw > 1.5 { raw } else { raw * 100.0 };
        meta.insert("ratio_scale".to_string(), if raw > 1.5 { "0-100" } else { "0-1" }.to_string());
        Decimal::from_str(&format!("{:.2}", pct.clamp(0.0, 100.0))).ok()
    } else {
        meta.insert("ratio_scale".to_string(), "ls_ratio".to_string());
        None
    }
}

#[async_trait]
impl ExchangeClient for BinanceFuturesClient {
    fn name(&self) -> &'static str {
        "binance"
    }

    async fn ping(&self) -> bool {
        let url = format!("{}/fapi/v1/ping", self.base_url);
        matches!(
            self.client.get(&url).timeout(std::time::Duration::from_secs(5)).send().await,
            Ok(resp) if resp.status().is_success()
        )
    }

    async fn fetch_ohlcv(&self, symbol: &str, interval: TimeFrame, limit: u32) -> Result<Vec<Candle>> {
        let rows = self
            .get_json(
                "/fapi/v1/klines",
                &[
                    ("symbol", symbol.to_string()),
                    ("interval", interval.as_interval_str().to_string()),
                    ("limit", limit.to_string()),
                ],
                10,
            )
            .await?;
        let rows = rows.as_array().ok_or_else(|| anyhow!("unexpected klines response shape"))?;

        rows.iter()
            .map(|row| {
                let row = row.as_array().ok_or_else(|| anyhow!("unexpected kline row shape"))?;
                let open_ms = row.first().and_then(Value::as_i64).ok_or_else(|| anyhow!("missing open_time"))?;
                let get = |i: usize| row.get(i).and_then(Value::as_str).unwrap_or("0");
                Ok(Candle {
                    ts: open_ms / 1000,
                    open: Decimal::from_str(get(1))?,
                    high: Decimal::from_str(get(2))?,
                    low: Decimal::from_str(get(3))?,
                    close: Decimal::from_str(get(4))?,
                    volume: Decimal::from_str(get(5))?,
                })
            })
            .collect()
    }

    async fn fetch_mark_price(&self, symbol: &str) -> Option<Decimal> {
        let resp = self.get_json("/fapi/v1/premiumIndex", &[("symbol", symbol.to_string())], 8).await.ok()?;
        resp.get("markPrice")?.as_str().and_then(|s| Decimal::from_str(s).ok())
    }

    async fn fetch_top_of_book(&self, symbol: &str) -> Option<(Decimal, Decimal)> {
        let resp = self
            .get_json("/fapi/v1/ticker/bookTicker", &[("symbol", symbol.to_string())], 8)
            .await
            .ok()?;
        let bid = resp.get("bidPrice")?.as_str().and_then(|s| Decimal::from_str(s).ok())?;
        let ask = resp.get("askPrice")?.as_str().and_then(|s| Decimal::from_str(s).ok())?;
        Some((bid, ask))
    }

    async fn fetch_spread_bps(&self, symbol: &str) -> Option<Decimal> {
        let (bid, ask) = self.fetch_top_of_book(symbol).await?;
        let mid = (bid + ask) / Decimal::TWO;
        if mid <= Decimal::ZERO {
            return None;
        }
        Some((ask - bid) / mid * Decimal::from(10_000))
    }

    async fn fetch_derivatives_1h(&self, symbol: &str) -> Derivatives1H {
        let mut meta = HashMap::new();
        meta.insert("source".to_string(), "binance".to_string());

        let funding = match self
            .get_json("/fapi/v1/fundingRate", &[("symbol", symbol.to_string()), ("limit", "1".to_string())], 10)
            .await
        {
            Ok(Value::Array(arr)) => arr
                .first()
                .and_then(|row| row.get("fundingRate"))
                .and_then(Value::as_str)
                .and_then(|s| Decimal::from_str(s).ok()),
            Ok(_) => None,
            Err(err) => {
                meta.insert("funding_err".to_string(), err.to_string());
                None
            }
        };

        let oi_contracts = match self.get_json("/fapi/v1/openInterest", &[("symbol", symbol.to_string())], 10).await {
            Ok(v) => v.get("openInterest").and_then(Value::as_str).and_then(|s| Decimal::from_str(s).ok()),
            Err(err) => {
                meta.insert("oi_err".to_string(), err.to_string());
                None
            }
        };

        let mark = self.fetch_mark_price(symbol).await;
        let open_interest = match (oi_contracts, mark) {
            (Some(contracts), Some(mark)) if mark > Decimal::ZERO => {
                meta.insert("oi_kind".to_string(), "contracts".to_string());
                meta.insert("oi_contracts".to_string(), contracts.to_string());
                meta.insert("oi_notional_ccy".to_string(), "USDT".to_string());
                meta.insert("oi_mark_used".to_string(), mark.to_string());
                Some(contracts * mark)
            }
            (Some(_), _) => {
                meta.insert("oi_notional_err".to_string(), "mark_unavailable".to_string());
                None
            }
            (None, _) => None,
        };

        let ratio_resp = self
            .get_json(
                "/futures/data/globalLongShortAccountRatio",
                &[("symbol", symbol.to_string()), ("period", "1h".to_string()), ("limit", "1".to_string())],
                10,
            )
            .await;
        let (raw_ratio, ratio_kind) = match ratio_resp {
            Ok(Value::Array(arr)) => match arr.first() {
                Some(row) => {
                    if let Some(long_acc) = row.get("longAccount").and_then(Value::as_str).and_then(|s| s.parse::<f64>().ok()) {
                        (Some(long_acc), "longAccount")
                    } else if let Some(lsr) = row.get("longShortRatio").and_then(Value::as_str).and_then(|s| s.parse::<f64>().ok()) {
                        (Some(lsr), "longShortRatio")
                    } else {
                        (None, "")
                    }
                }
                None => (None, ""),
            },
            Ok(_) => (None, ""),
            Err(err) => {
                meta.insert("ratio_err".to_string(), err.to_string());
                (None, "")
            }
        };
        if !ratio_kind.is_empty() {
            meta.insert("ratio_kind".to_string(), ratio_kind.to_string());
        }
        let ratio_long_pct = normalize_long_pct(raw_ratio, ratio_kind, &mut meta);

        Derivatives1H {
            funding_rate: funding,
            open_interest,
            ratio_long_pct,
            meta,
        }
    }
}
