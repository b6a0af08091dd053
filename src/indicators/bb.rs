use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Conventional Bollinger Band width over the last `period` closes: the SMA
/// plus/minus `k` standard deviations, expressed as a fraction of the SMA.
/// `None` if fewer than `period` closes are available or the SMA is zero.
pub fn bb_width(closes: &[Decimal], period: usize, k: Decimal) -> Option<Decimal> {
    if closes.len() < period {
        return None;
    }
    let window = &closes[closes.len() - period..];
    let period_dec = Decimal::from(period as u32);
    let sma = window.iter().sum::<Decimal>() / period_dec;
    if sma.is_zero() {
        return None;
    }
    let variance = window.iter().map(|c| (*c - sma) * (*c - sma)).sum::<Decimal>() / period_dec;
    let std_dev = variance.sqrt()?;
    let upper = sma + k * std_dev;
    let lower = sma - k * std_dev;
    Some((upper - lower) / sma)
}

pub fn bb_width_20(closes: &[Decimal]) -> Option<Decimal> {
    bb_width(closes, 20, dec!(2))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_series_has_zero_width() {
        let closes = vec![dec!(100); 20];
        let v = bb_width_20(&closes).unwrap();
        assert_eq!(v, Decimal::ZERO);
    }

    #[test]
    fn insufficient_closes_yields_none() {
        let closes = vec![dec!(100); 5];
        assert!(bb_width_20(&closes).is_none());
    }

    #[test]
    fn wider_dispersion_widens_the_band() {
        let tight: Vec<Decimal> = (0..20).map(|i| dec!(100) + Decimal::from(i % 2)).collect();
        let wide: Vec<Decimal> = (0..20).map(|i| dec!(100) + Decimal::from((i % 2) * 10)).collect();
        let w_tight = bb_width_20(&tight).unwrap();
        let w_wide = bb_width_20(&wide).unwrap();
        assert!(w_wide > w_tight);
    }
}
