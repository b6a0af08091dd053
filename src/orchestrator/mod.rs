use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::config::{AppConfig, AppConfigManager};
use crate::derivatives::{DerivativesEngine, TtlCache};
use crate::error::PipelineError;
use crate::exchange::{ExchangeClient, ExchangeRouter};
use crate::gates::gate1::gate1_htf_clarity;
use crate::gates::gate2::gate2_derivatives_regime;
use crate::gates::gate3::gate3_structure_confirmation;
use crate::planner::{build_plan, TradePlan};
use crate::scorer::{score_signal, ScoreResult};
use crate::types::{Candle, Derivatives1H, MarketSnapshot, TimeFrame, Venue};

const DERIV_TTL: Duration = Duration::from_secs(30);

/// Drops the forming (in-progress) bar the exchange always returns as the
/// last element of a kline response, mirroring the original's
/// `_last_closed_bar`: the series is left with index `len - 2` as its new
/// last element, or the single bar unchanged if there's only one.
fn drop_forming_bar(mut candles: Vec<Candle>) -> Vec<Candle> {
    if candles.len() >= 2 {
        candles.pop();
    }
    candles
}

/// One record per pipeline stage a symbol passed through this tick.
/// `tick_seq` gives every event from the same tick a shared, monotonically
/// increasing ordinal, mirroring the original's sequenced log lines.
#[derive(Debug, Clone)]
pub struct JournalEntry {
    pub tick_seq: u64,
    pub symbol: String,
    pub stage: &'static str,
    pub reason: String,
    pub context: HashMap<String, String>,
}

impl JournalEntry {
    fn new(tick_seq: u64, symbol: &str, stage: &'static str, reason: impl Into<String>) -> Self {
        Self {
            tick_seq,
            symbol: symbol.to_string(),
            stage,
            reason: reason.into(),
            context: HashMap::new(),
        }
    }

    fn emit(&self) {
        info!(tick_seq = self.tick_seq, symbol = %self.symbol, stage = self.stage, reason = %self.reason, "pipeline stage");
    }
}

#[derive(Debug, Clone)]
pub struct Candidate {
    pub plan: TradePlan,
    pub score: ScoreResult,
}

#[derive(Debug, Default)]
pub struct TickOutcome {
    pub candidates: Vec<Candidate>,
    pub journal: Vec<JournalEntry>,
}

/// Fetches one symbol's full snapshot. The derivatives leg is TTL-cached
/// (30s) so back-to-back ticks or an `analyze` run right after a `scan`
/// tick don't double up on the funding/OI/ratio HTTP calls.
async fn fetch_snapshot(client: &dyn ExchangeClient, deriv_cache: &TtlCache<Derivatives1H>, symbol: &str) -> MarketSnapshot {
    let candles_15m = drop_forming_bar(client.fetch_ohlcv(symbol, TimeFrame::M15, 300).await.unwrap_or_default());
    let candles_1h = drop_forming_bar(client.fetch_ohlcv(symbol, TimeFrame::H1, 300).await.unwrap_or_default());
    let candles_4h = drop_forming_bar(client.fetch_ohlcv(symbol, TimeFrame::H4, 150).await.unwrap_or_default());
    let mark_price = client.fetch_mark_price(symbol).await;
    let (bid, ask) = client.fetch_top_of_book(symbol).await.map(|(b, a)| (Some(b), Some(a))).unwrap_or((None, None));
    let spread_pct = client.fetch_spread_bps(symbol).await.map(|bps| bps / Decimal::from(100));

    let deriv_1h = match deriv_cache.get(symbol).await {
        Some(cached) => cached,
        None => {
            let fresh = client.fetch_derivatives_1h(symbol).await;
            deriv_cache.set(symbol.to_string(), fresh.clone(), DERIV_TTL).await;
            fresh
        }
    };

    MarketSnapshot {
        symbol: symbol.to_string(),
        candles_15m,
        candles_1h,
        candles_4h,
        deriv_1h,
        mark_price,
        bid,
        ask,
        spread_pct,
    }
}

/// Runs the full gate/planner/scorer cascade for one symbol and returns the
/// journal trail plus a candidate if the signal survived scoring. No I/O
/// happens past `fetch_snapshot`; everything downstream is a pure function.
#[allow(clippy::too_many_arguments)]
pub async fn run_symbol_tick(
    client: &dyn ExchangeClient,
    deriv_cache: &TtlCache<Derivatives1H>,
    engine: &DerivativesEngine,
    venue: Venue,
    config: &AppConfig,
    symbol: &str,
    now_unix: i64,
    tick_seq: u64,
) -> (Option<Candidate>, Vec<JournalEntry>) {
    let mut journal = Vec::new();
    let snapshot = fetch_snapshot(client, deriv_cache, symbol).await;

    let ctx = engine.observe(venue, symbol, now_unix, &snapshot.deriv_1h).await;

    let g1 = gate1_htf_clarity(&snapshot);
    journal.push(JournalEntry::new(tick_seq, symbol, "gate1", g1.reason.clone()));
    if !g1.passed {
        return (None, journal);
    }

    let g2 = gate2_derivatives_regime(&snapshot.deriv_1h, &ctx);
    journal.push(JournalEntry::new(tick_seq, symbol, "gate2", g2.reason));
    if !g2.passed || g2.alert_only {
        return (None, journal);
    }

    let g3 = gate3_structure_confirmation(&snapshot, &g1, &g2);
    journal.push(JournalEntry::new(tick_seq, symbol, "gate3", g3.reason.clone()));
    if !g3.passed {
        return (None, journal);
    }

    let plan = match build_plan(&snapshot, &g1, &g3, config.min_rr_tp2) {
        Ok(plan) => plan,
        Err(rejection) => {
            journal.push(JournalEntry::new(tick_seq, symbol, "planner", rejection.reason));
            return (None, journal);
        }
    };
    journal.push(JournalEntry::new(tick_seq, symbol, "planner", "pass"));

    let score = score_signal(&g1, &g2, &g3, &plan, &config.scorer_config());
    journal.push(JournalEntry::new(tick_seq, symbol, "scorer", if score.passed { "pass" } else { "below_trade_tier" }));

    if score.passed {
        (Some(Candidate { plan, score }), journal)
    } else {
        (None, journal)
    }
}

/// Single-threaded cooperative scan loop: one tick iterates every configured
/// symbol sequentially against a shared rolling-derivatives map. A fetch
/// fault (no exchange reachable at all) aborts the tick; per-symbol
/// rejections never do.
pub struct Orchestrator {
    config_manager: AppConfigManager,
    engine: Arc<DerivativesEngine>,
    deriv_cache: Arc<TtlCache<Derivatives1H>>,
    running: AtomicBool,
    tick_seq: AtomicU64,
}

impl Orchestrator {
    pub fn new(config_manager: AppConfigManager) -> Self {
        Self {
            config_manager,
            engine: Arc::new(DerivativesEngine::default()),
            deriv_cache: Arc::new(TtlCache::new()),
            running: AtomicBool::new(false),
            tick_seq: AtomicU64::new(0),
        }
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
    }

    pub async fn run_tick(&self, now_unix: i64) -> Result<TickOutcome, PipelineError> {
        let config = self.config_manager.get_config().await;
        let router = ExchangeRouter::new(config.primary_exchange);
        let client = router.active_client().await.map_err(|err| PipelineError::FetchError(err.to_string()))?;
        let tick_seq = self.tick_seq.fetch_add(1, Ordering::Relaxed);

        let mut outcome = TickOutcome::default();
        for symbol in &config.symbols {
            let (candidate, journal) = run_symbol_tick(
                client.as_ref(),
                &self.deriv_cache,
                &self.engine,
                config.primary_exchange,
                &config,
                symbol,
                now_unix,
                tick_seq,
            )
            .await;
            for entry in &journal {
                entry.emit();
            }
            outcome.journal.extend(journal);
            if let Some(candidate) = candidate {
                outcome.candidates.push(candidate);
            }
        }
        Ok(outcome)
    }

    /// Runs until `stop()` is called. Any fetch fault backs off 10s and
    /// retries the same tick boundary rather than crashing the process.
    pub async fn run_forever(&self) {
        self.running.store(true, Ordering::Release);
        while self.running.load(Ordering::Acquire) {
            let now = crate::orchestrator::unix_now();
            match self.run_tick(now).await {
                Ok(outcome) => {
                    info!(candidates = outcome.candidates.len(), "tick complete");
                }
                Err(err) => {
                    warn!(error = %err, "tick failed, backing off 10s");
                    tokio::time::sleep(tokio::time::Duration::from_secs(10)).await;
                    continue;
                }
            }
            let interval = self.config_manager.get_config().await.scan_interval_sec;
            tokio::time::sleep(tokio::time::Duration::from_secs(interval)).await;
        }
    }
}

fn unix_now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rust_decimal_macros::dec;

    use crate::types::Candle;

    struct EmptyClient;

    #[async_trait]
    impl ExchangeClient for EmptyClient {
        fn name(&self) -> &'static str {
            "empty"
        }
        async fn ping(&self) -> bool {
            true
        }
        async fn fetch_ohlcv(&self, _symbol: &str, _interval: TimeFrame, _limit: u32) -> anyhow::Result<Vec<Candle>> {
            Ok(Vec::new())
        }
        async fn fetch_mark_price(&self, _symbol: &str) -> Option<Decimal> {
            Some(dec!(100))
        }
        async fn fetch_top_of_book(&self, _symbol: &str) -> Option<(Decimal, Decimal)> {
            None
        }
        async fn fetch_spread_bps(&self, _symbol: &str) -> Option<Decimal> {
            None
        }
        async fn fetch_derivatives_1h(&self, _symbol: &str) -> Derivatives1H {
            Derivatives1H::unknown()
        }
    }

    #[test]
    fn drop_forming_bar_keeps_last_closed() {
        let candles: Vec<Candle> = (0..5)
            .map(|i| Candle {
                ts: i,
                open: dec!(1),
                high: dec!(1),
                low: dec!(1),
                close: Decimal::from(i),
                volume: dec!(1),
            })
            .collect();
        let trimmed = drop_forming_bar(candles);
        assert_eq!(trimmed.len(), 4);
        assert_eq!(trimmed.last().unwrap().close, Decimal::from(3));
    }

    #[test]
    fn drop_forming_bar_keeps_lone_bar() {
        let candles = vec![Candle {
            ts: 0,
            open: dec!(1),
            high: dec!(1),
            low: dec!(1),
            close: dec!(1),
            volume: dec!(1),
        }];
        assert_eq!(drop_forming_bar(candles).len(), 1);
    }

    #[tokio::test]
    async fn insufficient_candles_short_circuits_at_gate1() {
        let client = EmptyClient;
        let engine = DerivativesEngine::default();
        let deriv_cache = TtlCache::new();
        let config = AppConfig::default();
        let (candidate, journal) = run_symbol_tick(&client, &deriv_cache, &engine, Venue::Binance, &config, "BTCUSDT", 0, 0).await;
        assert!(candidate.is_none());
        assert_eq!(journal.len(), 1);
        assert_eq!(journal[0].stage, "gate1");
        assert_eq!(journal[0].tick_seq, 0);
    }
}
