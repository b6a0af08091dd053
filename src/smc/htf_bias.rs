use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::indicators::{ema, ema_slope};
use crate::types::Candle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bias {
    Up,
    Down,
    Range,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    Discount,
    Mid,
    Premium,
}

#[derive(Debug, Clone)]
pub struct HtfBias {
    pub bias: Bias,
    pub location: Location,
    pub pos_pct: Decimal,
    pub range_high: Decimal,
    pub range_low: Decimal,
    pub ema20: Option<Decimal>,
    pub ema50: Option<Decimal>,
    pub ema50_slope: Option<Decimal>,
}

/// 4H directional bias over a `window`-bar range, requiring at least
/// `max(80, window)` candles so the EMA(50) tail has enough history.
pub fn compute_htf_bias(candles_4h: &[Candle], window: usize) -> Option<HtfBias> {
    if candles_4h.len() < 80.max(window) {
        return None;
    }

    let recent = &candles_4h[candles_4h.len() - window..];
    let range_high = recent.iter().map(|c| c.high).max()?;
    let range_low = recent.iter().map(|c| c.low).min()?;
    let last_close = recent.last()?.close;

    let range = range_high - range_low;
    if range <= Decimal::ZERO {
        return None;
    }

    let pos_pct = (last_close - range_low) / range;
    let location = if pos_pct <= dec!(0.30) {
        Location::Discount
    } else if pos_pct >= dec!(0.70) {
        Location::Premium
    } else {
        Location::Mid
    };

    let tail: Vec<Decimal> = candles_4h[candles_4h.len() - 80..]
        .iter()
        .map(|c| c.close)
        .collect();
    let ema20 = ema(&tail, 20);
    let ema50 = ema(&tail, 50);
    let ema50_slope = ema_slope(&tail, 50, 3);

    let bias = match (ema20, ema50, ema50_slope) {
        (Some(e20), Some(e50), Some(slope)) => {
            if e20 > e50 && slope > Decimal::ZERO {
                Bias::Up
            } else if e20 < e50 && slope < Decimal::ZERO {
                Bias::Down
            } else {
                Bias::Range
            }
        }
        _ => Bias::Range,
    };

    Some(HtfBias {
        bias,
        location,
        pos_pct,
        range_high,
        range_low,
        ema20,
        ema50,
        ema50_slope,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

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
    fn too_few_candles_yields_none() {
        let candles: Vec<Candle> = (0..50).map(|i| candle(i, 100, 90, 95)).collect();
        assert!(compute_htf_bias(&candles, 60).is_none());
    }

    #[test]
    fn rising_closes_bias_up() {
        let candles: Vec<Candle> = (0..130)
            .map(|i| {
                let c = 100 + i;
                candle(i, c + 2, c - 2, c)
            })
            .collect();
        let bias = compute_htf_bias(&candles, 60).unwrap();
        assert_eq!(bias.bias, Bias::Up);
    }

    #[test]
    fn extreme_high_close_is_premium() {
        let mut candles: Vec<Candle> = (0..130).map(|i| candle(i, 110, 90, 100)).collect();
        let last = candles.len() as i64;
        candles.push(candle(last, 200, 100, 199));
        let bias = compute_htf_bias(&candles, 60).unwrap();
        assert_eq!(bias.location, Location::Premium);
    }
}
