use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::types::{Candle, TimeFrame};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneKind {
    FvgBull,
    FvgBear,
}

#[derive(Debug, Clone)]
pub struct Zone {
    pub kind: ZoneKind,
    pub tf: TimeFrame,
    pub top: Decimal,
    pub bottom: Decimal,
    pub created_ts: i64,
    pub touched: bool,
    pub fill_pct: Decimal,
    pub score: Decimal,
    pub reason: &'static str,
}

fn clamp01(x: Decimal) -> Decimal {
    x.clamp(Decimal::ZERO, Decimal::ONE)
}

/// Fair-value-gap zones on 15m candles over the last `lookback` bars.
/// Bullish gap at `i`: `high[i-1] < low[i+1]`. Bearish: `low[i-1] > high[i+1]`.
pub fn find_fvg_15m(candles_15m: &[Candle], lookback: usize) -> Vec<Zone> {
    if candles_15m.len() < 10 {
        return Vec::new();
    }
    let c = if candles_15m.len() > lookback {
        &candles_15m[candles_15m.len() - lookback..]
    } else {
        candles_15m
    };

    let mut zones = Vec::new();
    for i in 1..c.len() - 1 {
        let a = &c[i - 1];
        let b = &c[i];
        let d = &c[i + 1];

        if a.high < d.low {
            zones.push(zone_from_gap(ZoneKind::FvgBull, d.low, a.high, c, b.ts));
        }
        if a.low > d.high {
            zones.push(zone_from_gap(ZoneKind::FvgBear, a.low, d.high, c, b.ts));
        }
    }

    zones.sort_by(|x, y| {
        y.score
            .cmp(&x.score)
            .then_with(|| y.created_ts.cmp(&x.created_ts))
    });
    zones
}

fn zone_from_gap(kind: ZoneKind, top: Decimal, bottom: Decimal, candles: &[Candle], created_ts: i64) -> Zone {
    let (top, bottom) = if top < bottom { (bottom, top) } else { (top, bottom) };

    let post: Vec<&Candle> = candles.iter().filter(|x| x.ts >= created_ts).collect();
    if post.len() < 3 {
        return Zone {
            kind,
            tf: TimeFrame::M15,
            top,
            bottom,
            created_ts,
            touched: false,
            fill_pct: Decimal::ZERO,
            score: Decimal::ZERO,
            reason: "too_few_post_candles",
        };
    }

    let height = (top - bottom).max(dec!(0.000000000001));
    let mut touched = false;
    let mut fill_pct = Decimal::ZERO;

    match kind {
        ZoneKind::FvgBull => {
            let min_low = post.iter().map(|x| x.low).min().unwrap();
            if min_low <= top {
                touched = true;
                let depth = top - min_low.max(bottom);
                fill_pct = clamp01(depth / height);
            }
        }
        ZoneKind::FvgBear => {
            let max_high = post.iter().map(|x| x.high).max().unwrap();
            if max_high >= bottom {
                touched = true;
                let depth = max_high.min(top) - bottom;
                fill_pct = clamp01(depth / height);
            }
        }
    }

    let unfilled = Decimal::ONE - fill_pct;
    let recency_bonus = dec!(0.1);
    let score = unfilled + recency_bonus;

    let reason = if !touched {
        "fresh"
    } else if fill_pct <= dec!(0.33) {
        "light_fill"
    } else if fill_pct <= dec!(0.66) {
        "mid_fill"
    } else {
        "deep_fill"
    };

    Zone {
        kind,
        tf: TimeFrame::M15,
        top,
        bottom,
        created_ts,
        touched,
        fill_pct,
        score,
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn candle(ts: i64, h: i64, l: i64) -> Candle {
        Candle {
            ts,
            open: Decimal::from(h),
            high: Decimal::from(h),
            low: Decimal::from(l),
            close: Decimal::from((h + l) / 2),
            volume: dec!(1),
        }
    }

    #[test]
    fn detects_bullish_gap() {
        let candles = vec![
            candle(0, 100, 95),
            candle(1, 101, 96),
            candle(2, 105, 104),
            candle(3, 120, 110),
            candle(4, 121, 111),
            candle(5, 122, 112),
            candle(6, 123, 113),
        ];
        let zones = find_fvg_15m(&candles, 120);
        assert!(zones.iter().any(|z| z.kind == ZoneKind::FvgBull));
    }

    #[test]
    fn too_short_history_yields_no_zones() {
        let candles = vec![candle(0, 100, 95), candle(1, 101, 96)];
        assert!(find_fvg_15m(&candles, 120).is_empty());
    }

    #[test]
    fn untouched_zone_has_zero_fill() {
        let candles = vec![
            candle(0, 100, 95),
            candle(1, 101, 96),
            candle(2, 105, 104),
            candle(3, 120, 110),
            candle(4, 121, 115),
            candle(5, 122, 116),
            candle(6, 123, 117),
        ];
        let zones = find_fvg_15m(&candles, 120);
        let bull = zones.iter().find(|z| z.kind == ZoneKind::FvgBull).unwrap();
        assert_eq!(bull.fill_pct, Decimal::ZERO);
        assert!(!bull.touched);
    }
}
