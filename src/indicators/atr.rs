use rust_decimal::Decimal;

use crate::types::Candle;

/// Average True Range over the last `period` closed bars. Needs `period + 2`
/// candles so the true-range of the oldest included bar has a previous close
/// to compare against; returns `None` otherwise.
pub fn atr(candles: &[Candle], period: usize) -> Option<Decimal> {
    if candles.len() < period + 2 {
        return None;
    }
    let n = candles.len();
    let mut sum = Decimal::ZERO;
    for i in n - period..n {
        sum += candles[i].true_range(candles[i - 1].close);
    }
    Some(sum / Decimal::from(period as u32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn candle(ts: i64, o: i64, h: i64, l: i64, c: i64) -> Candle {
        Candle {
            ts,
            open: Decimal::from(o),
            high: Decimal::from(h),
            low: Decimal::from(l),
            close: Decimal::from(c),
            volume: dec!(1),
        }
    }

    #[test]
    fn atr_needs_period_plus_two_candles() {
        let candles: Vec<Candle> = (0..15).map(|i| candle(i, 100, 101, 99, 100)).collect();
        assert!(atr(&candles, 14).is_none());
        let candles: Vec<Candle> = (0..16).map(|i| candle(i, 100, 101, 99, 100)).collect();
        assert!(atr(&candles, 14).is_some());
    }

    #[test]
    fn atr_of_flat_range_equals_the_range() {
        let candles: Vec<Candle> = (0..20).map(|i| candle(i, 100, 102, 98, 100)).collect();
        let v = atr(&candles, 14).unwrap();
        assert_eq!(v, dec!(4));
    }
}
