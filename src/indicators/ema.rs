use rust_decimal::Decimal;

/// Standard recursive EMA, `k = 2/(period+1)`, seeded with the first value.
/// Returns `None` if fewer than `period` values are given.
pub fn ema(values: &[Decimal], period: usize) -> Option<Decimal> {
    if values.len() < period || period == 0 {
        return None;
    }
    let k = Decimal::TWO / Decimal::from(period as u32 + 1);
    let mut acc = values[0];
    for v in &values[1..] {
        acc = (*v - acc) * k + acc;
    }
    Some(acc)
}

/// Full EMA series (same length as `values`), useful for slope estimation.
/// The first element is seeded with `values[0]` the same way `ema` is.
pub fn ema_series(values: &[Decimal], period: usize) -> Vec<Decimal> {
    if values.is_empty() || period == 0 {
        return Vec::new();
    }
    let k = Decimal::TWO / Decimal::from(period as u32 + 1);
    let mut acc = values[0];
    let mut out = Vec::with_capacity(values.len());
    out.push(acc);
    for v in &values[1..] {
        acc = (*v - acc) * k + acc;
        out.push(acc);
    }
    out
}

/// EMA computed only over the tail `period`-length recursion but keeping
/// `lookback` prior values seeded into the recursion, returning the slope
/// between the latest value and the one `back` iterations earlier.
pub fn ema_slope(values: &[Decimal], period: usize, back: usize) -> Option<Decimal> {
    let series = ema_series(values, period);
    if series.len() <= back {
        return None;
    }
    let last = *series.last()?;
    let prior = series[series.len() - 1 - back];
    Some(last - prior)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn ema_requires_full_period() {
        let values = vec![dec!(1), dec!(2)];
        assert!(ema(&values, 3).is_none());
    }

    #[test]
    fn ema_of_constant_series_equals_constant() {
        let values = vec![dec!(10); 30];
        let v = ema(&values, 20).unwrap();
        assert_eq!(v, dec!(10));
    }

    #[test]
    fn ema_slope_detects_rising_series() {
        let values: Vec<Decimal> = (1..=100).map(|i| Decimal::from(i)).collect();
        let slope = ema_slope(&values, 50, 3).unwrap();
        assert!(slope > Decimal::ZERO);
    }
}
