use rust_decimal::Decimal;

/// Conventional Wilder RSI(period) over a slice of closes. `None` if fewer
/// than `period + 1` closes are available. Used only in optional guard logic
/// elsewhere in the pipeline, never in a gate's pass/fail decision directly.
pub fn rsi(closes: &[Decimal], period: usize) -> Option<Decimal> {
    if closes.len() < period + 1 {
        return None;
    }
    let mut gains = Decimal::ZERO;
    let mut losses = Decimal::ZERO;
    for w in closes[..=period].windows(2) {
        let change = w[1] - w[0];
        if change > Decimal::ZERO {
            gains += change;
        } else {
            losses += -change;
        }
    }
    let period_dec = Decimal::from(period as u32);
    let mut avg_gain = gains / period_dec;
    let mut avg_loss = losses / period_dec;

    for i in period + 1..closes.len() {
        let change = closes[i] - closes[i - 1];
        let gain = if change > Decimal::ZERO { change } else { Decimal::ZERO };
        let loss = if change < Decimal::ZERO { -change } else { Decimal::ZERO };
        avg_gain = (avg_gain * (period_dec - Decimal::ONE) + gain) / period_dec;
        avg_loss = (avg_loss * (period_dec - Decimal::ONE) + loss) / period_dec;
    }

    if avg_loss.is_zero() {
        return Some(Decimal::from(100));
    }
    let rs = avg_gain / avg_loss;
    Some(Decimal::from(100) - Decimal::from(100) / (Decimal::ONE + rs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn monotonically_rising_series_is_overbought() {
        let closes: Vec<Decimal> = (1..=30).map(Decimal::from).collect();
        let v = rsi(&closes, 14).unwrap();
        assert!(v > dec!(90));
    }

    #[test]
    fn insufficient_closes_yields_none() {
        let closes = vec![dec!(1), dec!(2), dec!(3)];
        assert!(rsi(&closes, 14).is_none());
    }
}
