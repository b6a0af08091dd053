use rust_decimal::Decimal;

use crate::types::Candle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwingKind {
    High,
    Low,
}

#[derive(Debug, Clone, Copy)]
pub struct Swing {
    pub index: usize,
    pub ts: i64,
    pub price: Decimal,
    pub kind: SwingKind,
}

/// Fractal swing detection: bar `i` is a swing high if `high[i]` equals the
/// max of the `[i-left, i+right]` window, symmetric for lows. Both flags may
/// fire at the same bar. Returns swings in candle order, oldest first.
pub fn fractal_swings(candles: &[Candle], left: usize, right: usize) -> Vec<Swing> {
    let n = candles.len();
    if n < left + right + 1 {
        return Vec::new();
    }
    let mut out = Vec::new();
    for i in left..n - right {
        let window = &candles[i - left..=i + right];
        let hi = candles[i].high;
        let lo = candles[i].low;
        if window.iter().all(|c| c.high <= hi) {
            out.push(Swing {
                index: i,
                ts: candles[i].ts,
                price: hi,
                kind: SwingKind::High,
            });
        }
        if window.iter().all(|c| c.low >= lo) {
            out.push(Swing {
                index: i,
                ts: candles[i].ts,
                price: lo,
                kind: SwingKind::Low,
            });
        }
    }
    out
}

pub fn last_swing(swings: &[Swing], kind: SwingKind) -> Option<Swing> {
    swings.iter().rev().find(|s| s.kind == kind).copied()
}

pub fn swings_before(swings: &[Swing], kind: SwingKind, index: usize) -> Vec<Swing> {
    swings
        .iter()
        .filter(|s| s.kind == kind && s.index < index)
        .copied()
        .collect()
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
            close: Decimal::from(h),
            volume: dec!(1),
        }
    }

    #[test]
    fn detects_symmetric_swing_high_and_low() {
        let candles = vec![
            candle(0, 100, 90),
            candle(1, 105, 92),
            candle(2, 110, 85),
            candle(3, 104, 93),
            candle(4, 101, 95),
        ];
        let swings = fractal_swings(&candles, 2, 2);
        assert!(swings
            .iter()
            .any(|s| s.kind == SwingKind::High && s.index == 2));
        assert!(swings
            .iter()
            .any(|s| s.kind == SwingKind::Low && s.index == 2));
    }

    #[test]
    fn too_short_returns_empty() {
        let candles = vec![candle(0, 100, 90), candle(1, 101, 91)];
        assert!(fractal_swings(&candles, 2, 2).is_empty());
    }
}
