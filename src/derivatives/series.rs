use std::collections::{HashMap, VecDeque};

use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;
use tokio::sync::Mutex;

use crate::types::{Derivatives1H, Venue};

const BUCKET_SECONDS: i64 = 3600;
const Z_WINDOW: usize = 24;
const RING_CAPACITY: usize = 72;

#[derive(Debug, Clone)]
struct DerivPoint {
    bucket_ts: i64,
    oi: Option<Decimal>,
    funding: Option<Decimal>,
    ratio_long_pct: Option<Decimal>,
}

/// Per-(venue, symbol) rolling window of hourly derivatives points, deduped
/// by bucket so repeated ticks within the same hour replace in place rather
/// than padding the series with duplicates.
struct RollingSeries {
    points: VecDeque<DerivPoint>,
}

impl RollingSeries {
    fn new() -> Self {
        Self {
            points: VecDeque::with_capacity(RING_CAPACITY),
        }
    }

    fn push(&mut self, point: DerivPoint) {
        if let Some(last) = self.points.back_mut() {
            if last.bucket_ts == point.bucket_ts {
                *last = point;
                return;
            }
        }
        if self.points.len() == RING_CAPACITY {
            self.points.pop_front();
        }
        self.points.push_back(point);
    }
}

/// Snapshot of everything Gate 2 and the orchestrator need out of the rolling
/// series for one symbol at the current tick.
#[derive(Debug, Clone)]
pub struct Gate2Context {
    pub ts: i64,
    pub bucket_ts: i64,
    pub oi_delta: Option<Decimal>,
    pub oi_delta_pct: Option<Decimal>,
    pub oi_spike_z: Option<Decimal>,
    pub funding_z: Option<Decimal>,
    pub funding_mean: Option<Decimal>,
    pub funding_std: Option<Decimal>,
    pub ratio_dev: Option<Decimal>,
    pub oi_slope_4h_pct: Option<Decimal>,
    pub confirm4h: bool,
    pub confirm4h_reason: &'static str,
    pub ready: bool,
    pub history_len: usize,
}

fn bucket_ts(now_unix: i64) -> i64 {
    (now_unix / BUCKET_SECONDS) * BUCKET_SECONDS
}

fn min_z_samples(window: usize) -> usize {
    (window / 2).min(12).max(8)
}

fn readiness_threshold(window: usize) -> usize {
    window.min(18).max(12)
}

fn z_score(values: &[Decimal], sample: Decimal) -> Option<(Decimal, Decimal, Decimal)> {
    let min_samples = min_z_samples(Z_WINDOW);
    if values.len() < min_samples {
        return None;
    }
    let n = Decimal::from(values.len() as u32);
    let mean = values.iter().sum::<Decimal>() / n;
    let denom = Decimal::from((values.len() - 1).max(1) as u32);
    let variance = values.iter().map(|v| (*v - mean) * (*v - mean)).sum::<Decimal>() / denom;
    let std = variance.sqrt().unwrap_or(Decimal::ZERO);
    let z = if std > dec!(0.000000000001) {
        (sample - mean) / std
    } else {
        Decimal::ZERO
    };
    Some((z, mean, std))
}

/// Rolling derivatives engine: one ring per (venue, symbol), keyed by a
/// qualified string so distinct symbols never share a deque even if a
/// future cache implementation flattens tuple keys.
pub struct DerivativesEngine {
    series: Mutex<HashMap<String, RollingSeries>>,
}

impl DerivativesEngine {
    pub fn new() -> Self {
        Self {
            series: Mutex::new(HashMap::new()),
        }
    }

    fn key(venue: Venue, symbol: &str) -> String {
        format!("deriv_series_1h:{venue}:{symbol}")
    }

    /// Records the latest point for this tick and recomputes the Gate 2
    /// context from the bucket-deduplicated view of the ring.
    pub async fn observe(&self, venue: Venue, symbol: &str, now_unix: i64, point: &Derivatives1H) -> Gate2Context {
        let key = Self::key(venue, symbol);
        let mut guard = self.series.lock().await;
        let ring = guard.entry(key).or_insert_with(RollingSeries::new);
        let bucket = bucket_ts(now_unix);

        ring.push(DerivPoint {
            bucket_ts: bucket,
            oi: point.open_interest,
            funding: point.funding_rate,
            ratio_long_pct: point.ratio_long_pct,
        });

        Self::compute(ring, now_unix, bucket)
    }

    fn compute(ring: &RollingSeries, now_unix: i64, bucket_ts: i64) -> Gate2Context {
        let pts: Vec<&DerivPoint> = ring.points.iter().collect();
        let history_len = pts.len();

        let (oi_delta, oi_delta_pct) = if pts.len() >= 2 {
            match (pts[pts.len() - 2].oi, pts[pts.len() - 1].oi) {
                (Some(prev), Some(cur)) if prev != Decimal::ZERO => {
                    let delta = cur - prev;
                    (Some(delta), Some(delta / prev * Decimal::from(100)))
                }
                (Some(prev), Some(cur)) => (Some(cur - prev), None),
                _ => (None, None),
            }
        } else {
            (None, None)
        };

        let tail: Vec<&DerivPoint> = pts[pts.len().saturating_sub(Z_WINDOW + 1)..].to_vec();
        let mut oi_deltas = Vec::new();
        for w in tail.windows(2) {
            if let (Some(p), Some(c)) = (w[0].oi, w[1].oi) {
                if p != Decimal::ZERO {
                    oi_deltas.push(c - p);
                }
            }
        }
        let oi_spike_z = oi_delta.and_then(|d| z_score(&oi_deltas, d).map(|(z, _, _)| z));

        let funding_tail: Vec<&DerivPoint> = pts[pts.len().saturating_sub(Z_WINDOW)..].to_vec();
        let fvals: Vec<Decimal> = funding_tail.iter().filter_map(|p| p.funding).collect();
        let cur_funding = pts.last().and_then(|p| p.funding);
        let funding_stats = cur_funding.and_then(|cur| z_score(&fvals, cur));
        let funding_z = funding_stats.map(|(z, _, _)| z);
        let funding_mean = funding_stats.map(|(_, mean, _)| mean);
        let funding_std = funding_stats.map(|(_, _, std)| std);

        let ratio_dev = pts
            .last()
            .and_then(|p| p.ratio_long_pct)
            .map(|r| (r - Decimal::from(50)).abs());

        let oi_slope_4h_pct = if pts.len() >= 5 {
            let now_oi = pts.last().and_then(|p| p.oi);
            let ago_oi = pts[pts.len() - 5].oi;
            match (now_oi, ago_oi) {
                (Some(now), Some(ago)) if ago != Decimal::ZERO => Some((now - ago) / ago * Decimal::from(100)),
                _ => None,
            }
        } else {
            None
        };

        let (confirm4h, confirm4h_reason) = {
            let window = &pts[pts.len().saturating_sub(4)..];
            let ratio_hits = window
                .iter()
                .filter(|p| matches!(p.ratio_long_pct, Some(r) if r >= dec!(67.5) || r <= dec!(32.5)))
                .count();
            let funding_hits = window
                .iter()
                .filter(|p| matches!(p.funding, Some(f) if f.abs() >= dec!(0.00015)))
                .count();
            if ratio_hits >= 2 && funding_hits >= 2 {
                (true, "ratio_and_funding_extreme_4h")
            } else if ratio_hits >= 2 {
                (true, "ratio_extreme_4h")
            } else if funding_hits >= 2 {
                (true, "funding_extreme_4h")
            } else {
                (false, "no_4h_confirmation")
            }
        };

        let ready = history_len >= readiness_threshold(Z_WINDOW);

        Gate2Context {
            ts: now_unix,
            bucket_ts,
            oi_delta,
            oi_delta_pct,
            oi_spike_z,
            funding_z,
            funding_mean,
            funding_std,
            ratio_dev,
            oi_slope_4h_pct,
            confirm4h,
            confirm4h_reason,
            ready,
            history_len,
        }
    }
}

impl Default for DerivativesEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap as StdHashMap;

    fn point(oi: i64, funding: &str) -> Derivatives1H {
        Derivatives1H {
            funding_rate: Some(funding.parse().unwrap()),
            open_interest: Some(Decimal::from(oi)),
            ratio_long_pct: Some(dec!(50)),
            meta: StdHashMap::new(),
        }
    }

    #[tokio::test]
    async fn warms_up_not_ready_then_becomes_ready() {
        let engine = DerivativesEngine::new();
        let mut ctx = None;
        for i in 0..20 {
            ctx = Some(
                engine
                    .observe(Venue::Binance, "BTCUSDT", i * 3600, &point(1_000_000 + i * 1000, "0.0001"))
                    .await,
            );
        }
        let ctx = ctx.unwrap();
        assert!(ctx.ready);
        assert_eq!(ctx.history_len, 20);
    }

    #[tokio::test]
    async fn same_bucket_replaces_in_place() {
        let engine = DerivativesEngine::new();
        engine.observe(Venue::Binance, "ETHUSDT", 0, &point(1_000, "0.0001")).await;
        let ctx = engine.observe(Venue::Binance, "ETHUSDT", 10, &point(2_000, "0.0002")).await;
        assert_eq!(ctx.history_len, 1);
    }

    #[tokio::test]
    async fn distinct_symbols_never_share_a_ring() {
        let engine = DerivativesEngine::new();
        engine.observe(Venue::Binance, "BTCUSDT", 0, &point(1_000, "0.0001")).await;
        let ctx = engine.observe(Venue::Binance, "ETHUSDT", 0, &point(2_000, "0.0002")).await;
        assert_eq!(ctx.history_len, 1);
    }
}
