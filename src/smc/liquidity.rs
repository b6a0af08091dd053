use rust_decimal::Decimal;

use crate::indicators::swings::{fractal_swings, SwingKind};
use crate::types::Candle;

#[derive(Debug, Clone)]
pub struct LiquidityTargets {
    pub above: Option<Decimal>,
    pub below: Option<Decimal>,
    pub swing_highs: Vec<Decimal>,
    pub swing_lows: Vec<Decimal>,
}

/// Nearest pivot-high above and pivot-low below the last close, using
/// `left=right=2` pivots over the last `lookback` 4H bars.
pub fn compute_liquidity_targets(candles_4h: &[Candle], lookback: usize) -> LiquidityTargets {
    let recent = if candles_4h.len() >= lookback {
        &candles_4h[candles_4h.len() - lookback..]
    } else {
        candles_4h
    };

    let swings = fractal_swings(recent, 2, 2);
    let mut swing_highs: Vec<Decimal> = swings
        .iter()
        .filter(|s| s.kind == SwingKind::High)
        .map(|s| s.price)
        .collect();
    let mut swing_lows: Vec<Decimal> = swings
        .iter()
        .filter(|s| s.kind == SwingKind::Low)
        .map(|s| s.price)
        .collect();

    let last_price = match recent.last() {
        Some(c) => c.close,
        None => {
            return LiquidityTargets {
                above: None,
                below: None,
                swing_highs: Vec::new(),
                swing_lows: Vec::new(),
            }
        }
    };

    let mut sorted_highs = swing_highs.clone();
    sorted_highs.sort();
    let above = sorted_highs.into_iter().find(|h| *h > last_price);

    let mut sorted_lows = swing_lows.clone();
    sorted_lows.sort_by(|a, b| b.cmp(a));
    let below = sorted_lows.into_iter().find(|l| *l < last_price);

    let hi_tail_start = swing_highs.len().saturating_sub(10);
    swing_highs.drain(0..hi_tail_start);
    let lo_tail_start = swing_lows.len().saturating_sub(10);
    swing_lows.drain(0..lo_tail_start);

    LiquidityTargets {
        above,
        below,
        swing_highs,
        swing_lows,
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
    fn finds_nearest_above_and_below() {
        let candles = vec![
            candle(0, 100, 90),
            candle(1, 105, 92),
            candle(2, 120, 85),
            candle(3, 104, 93),
            candle(4, 101, 80),
            candle(5, 103, 88),
            candle(6, 98, 75),
            candle(7, 100, 90),
        ];
        let targets = compute_liquidity_targets(&candles, 80);
        assert!(targets.above.is_some() || targets.below.is_some());
    }

    #[test]
    fn short_history_uses_whole_slice() {
        let candles = vec![candle(0, 100, 90), candle(1, 101, 91), candle(2, 102, 92)];
        let targets = compute_liquidity_targets(&candles, 80);
        assert!(targets.swing_highs.is_empty());
    }
}
