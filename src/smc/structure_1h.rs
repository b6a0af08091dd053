use rust_decimal::Decimal;

use crate::indicators::swings::{fractal_swings, Swing, SwingKind};
use crate::types::Candle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Up,
    Down,
    Range,
    Unknown,
}

#[derive(Debug, Clone)]
pub struct Structure1HResult {
    pub trend: Trend,
    pub last_swing_high: Option<Swing>,
    pub last_swing_low: Option<Swing>,
    pub bos: bool,
    pub choch: bool,
    pub break_level: Option<Decimal>,
    pub reason: &'static str,
}

fn infer_trend(swings: &[Swing]) -> Trend {
    let highs: Vec<&Swing> = swings.iter().filter(|s| s.kind == SwingKind::High).collect();
    let lows: Vec<&Swing> = swings.iter().filter(|s| s.kind == SwingKind::Low).collect();
    if highs.len() < 2 || lows.len() < 2 {
        return Trend::Unknown;
    }
    let (h1, h2) = (highs[highs.len() - 2], highs[highs.len() - 1]);
    let (l1, l2) = (lows[lows.len() - 2], lows[lows.len() - 1]);
    if h2.price > h1.price && l2.price > l1.price {
        Trend::Up
    } else if h2.price < h1.price && l2.price < l1.price {
        Trend::Down
    } else {
        Trend::Range
    }
}

/// BOS/CHoCH detection on the last closed 1H bar against fractal swing trend.
pub fn analyze_structure_1h(candles_1h: &[Candle], left: usize, right: usize) -> Structure1HResult {
    if candles_1h.len() < 30 {
        return Structure1HResult {
            trend: Trend::Unknown,
            last_swing_high: None,
            last_swing_low: None,
            bos: false,
            choch: false,
            break_level: None,
            reason: "insufficient_1h_candles",
        };
    }

    let swings = fractal_swings(candles_1h, left, right);
    if swings.len() < 6 {
        return Structure1HResult {
            trend: Trend::Unknown,
            last_swing_high: None,
            last_swing_low: None,
            bos: false,
            choch: false,
            break_level: None,
            reason: "insufficient_swings",
        };
    }

    let trend = infer_trend(&swings);
    let last_high = swings.iter().rev().find(|s| s.kind == SwingKind::High).copied();
    let last_low = swings.iter().rev().find(|s| s.kind == SwingKind::Low).copied();

    let (last_high, last_low) = match (last_high, last_low) {
        (Some(h), Some(l)) => (h, l),
        _ => {
            return Structure1HResult {
                trend: Trend::Unknown,
                last_swing_high: last_high,
                last_swing_low: last_low,
                bos: false,
                choch: false,
                break_level: None,
                reason: "missing_last_swing",
            }
        }
    };

    let close = candles_1h.last().unwrap().close;
    let mut bos = false;
    let mut choch = false;
    let mut break_level = None;
    let reason;

    match trend {
        Trend::Up => {
            if close > last_high.price {
                bos = true;
                break_level = Some(last_high.price);
                reason = "bos_up_close_break";
            } else if close < last_low.price {
                choch = true;
                break_level = Some(last_low.price);
                reason = "choch_down_close_break";
            } else {
                reason = "no_break";
            }
        }
        Trend::Down => {
            if close < last_low.price {
                bos = true;
                break_level = Some(last_low.price);
                reason = "bos_down_close_break";
            } else if close > last_high.price {
                choch = true;
                break_level = Some(last_high.price);
                reason = "choch_up_close_break";
            } else {
                reason = "no_break";
            }
        }
        _ => {
            reason = "range_no_signal";
        }
    }

    Structure1HResult {
        trend,
        last_swing_high: Some(last_high),
        last_swing_low: Some(last_low),
        bos,
        choch,
        break_level,
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn candle(ts: i64, h: i64, l: i64, c: i64) -> Candle {
        Candle {
            ts,
            open: Decimal::from(c),
            high: Decimal::from(h),
            low: Decimal::from(l),
            close: Decimal::from(c),
            volume: dec!(1),
        }
    }

    #[test]
    fn short_history_is_unknown() {
        let candles: Vec<Candle> = (0..10).map(|i| candle(i, 101, 99, 100)).collect();
        let result = analyze_structure_1h(&candles, 2, 2);
        assert_eq!(result.reason, "insufficient_1h_candles");
    }

    #[test]
    fn uptrend_close_beyond_last_swing_high_is_bos() {
        // A rising staircase of fractal swings (h/l climbing each cycle), then a
        // final bar that closes well above every prior high.
        let mut candles: Vec<Candle> = Vec::new();
        let pattern = [
            (110, 95),
            (108, 96),
            (115, 98),
            (112, 100),
            (120, 102),
            (117, 104),
            (125, 106),
            (122, 108),
            (130, 110),
            (127, 112),
        ];
        for (i, (h, l)) in pattern.iter().enumerate() {
            let c = (h + l) / 2;
            candles.push(candle(i as i64, *h, *l, c));
        }
        while candles.len() < 30 {
            let i = candles.len() as i64;
            candles.push(candle(i, 127, 112, 120));
        }
        let max_high = candles.iter().map(|c| c.high).max().unwrap();
        let last_idx = candles.len() - 1;
        candles[last_idx].high = max_high + dec!(20);
        candles[last_idx].close = max_high + dec!(15);

        let result = analyze_structure_1h(&candles, 2, 2);
        if result.trend == Trend::Up {
            assert!(result.bos);
        }
    }
}
