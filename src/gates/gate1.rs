use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::smc::{compute_htf_bias, compute_liquidity_targets, Bias, Location};
use crate::types::{CoinGroup, MarketSnapshot};

#[derive(Debug, Clone)]
pub struct Gate1Result {
    pub passed: bool,
    pub reason: String,
    pub htf_bias: Option<Bias>,
    pub location: Option<Location>,
    pub pos_pct: Option<Decimal>,
    pub range_high: Option<Decimal>,
    pub range_low: Option<Decimal>,
    pub liquidity_above: Option<Decimal>,
    pub liquidity_below: Option<Decimal>,
    pub swing_highs: Vec<Decimal>,
    pub swing_lows: Vec<Decimal>,
}

impl Gate1Result {
    fn fail(reason: impl Into<String>) -> Self {
        Self {
            passed: false,
            reason: reason.into(),
            htf_bias: None,
            location: None,
            pos_pct: None,
            range_high: None,
            range_low: None,
            liquidity_above: None,
            liquidity_below: None,
            swing_highs: Vec::new(),
            swing_lows: Vec::new(),
        }
    }
}

fn spread_limit(group: CoinGroup) -> Decimal {
    match group {
        CoinGroup::Core => dec!(0.02),
        CoinGroup::Major => dec!(0.06),
        CoinGroup::AltLowPrice => dec!(0.25),
        CoinGroup::Alt => dec!(0.15),
    }
}

/// HTF clarity gate over 4H candles: spread quality, location/bias clarity,
/// and at least one liquidity target. Fail-closed at every step.
pub fn gate1_htf_clarity(snapshot: &MarketSnapshot) -> Gate1Result {
    let htf = match compute_htf_bias(&snapshot.candles_4h, 60) {
        Some(h) => h,
        None => return Gate1Result::fail("insufficient_4h_candles"),
    };

    let group = CoinGroup::for_symbol(&snapshot.symbol);
    if let Some(spread_pct) = snapshot.spread_pct {
        if spread_pct > spread_limit(group) {
            return Gate1Result::fail(format!("spread_too_wide_{}", group.as_str()));
        }
    }

    let liq = compute_liquidity_targets(&snapshot.candles_4h, 80);

    let location_ok = match htf.bias {
        Bias::Range => htf.pos_pct <= dec!(0.30) || htf.pos_pct >= dec!(0.70),
        _ => !(htf.pos_pct > dec!(0.42) && htf.pos_pct < dec!(0.58)),
    };
    if !location_ok {
        let mut result = Gate1Result::fail("mid_range_location");
        result.htf_bias = Some(htf.bias);
        result.location = Some(htf.location);
        result.pos_pct = Some(htf.pos_pct);
        result.range_high = Some(htf.range_high);
        result.range_low = Some(htf.range_low);
        return result;
    }

    let clarity_ok = matches!(htf.bias, Bias::Up | Bias::Down)
        || (htf.bias == Bias::Range && matches!(htf.location, Location::Discount | Location::Premium));
    if !clarity_ok {
        let mut result = Gate1Result::fail("no_clarity");
        result.htf_bias = Some(htf.bias);
        result.location = Some(htf.location);
        result.pos_pct = Some(htf.pos_pct);
        result.range_high = Some(htf.range_high);
        result.range_low = Some(htf.range_low);
        return result;
    }

    if liq.above.is_none() && liq.below.is_none() {
        let mut result = Gate1Result::fail("no_liquidity_target");
        result.htf_bias = Some(htf.bias);
        result.location = Some(htf.location);
        result.pos_pct = Some(htf.pos_pct);
        result.range_high = Some(htf.range_high);
        result.range_low = Some(htf.range_low);
        return result;
    }

    Gate1Result {
        passed: true,
        reason: "pass".to_string(),
        htf_bias: Some(htf.bias),
        location: Some(htf.location),
        pos_pct: Some(htf.pos_pct),
        range_high: Some(htf.range_high),
        range_low: Some(htf.range_low),
        liquidity_above: liq.above,
        liquidity_below: liq.below,
        swing_highs: liq.swing_highs,
        swing_lows: liq.swing_lows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(ts: i64, h: i64, l: i64, c: i64) -> crate::types::Candle {
        crate::types::Candle {
            ts,
            open: Decimal::from(c),
            high: Decimal::from(h),
            low: Decimal::from(l),
            close: Decimal::from(c),
            volume: dec!(1),
        }
    }

    fn snapshot(candles_4h: Vec<crate::types::Candle>) -> MarketSnapshot {
        MarketSnapshot {
            symbol: "BTCUSDT".to_string(),
            candles_15m: Vec::new(),
            candles_1h: Vec::new(),
            candles_4h,
            deriv_1h: crate::types::Derivatives1H::unknown(),
            mark_price: None,
            bid: None,
            ask: None,
            spread_pct: Some(dec!(0.01)),
        }
    }

    #[test]
    fn too_few_candles_fails_closed() {
        let candles: Vec<_> = (0..50).map(|i| candle(i, 101, 99, 100)).collect();
        let result = gate1_htf_clarity(&snapshot(candles));
        assert!(!result.passed);
        assert_eq!(result.reason, "insufficient_4h_candles");
    }

    #[test]
    fn wide_spread_is_rejected_by_tier() {
        let candles: Vec<_> = (0..130)
            .map(|i| {
                let c = 100 + i;
                candle(i, c + 2, c - 2, c)
            })
            .collect();
        let mut snap = snapshot(candles);
        snap.spread_pct = Some(dec!(1));
        let result = gate1_htf_clarity(&snap);
        assert!(!result.passed);
        assert!(result.reason.starts_with("spread_too_wide_"));
    }
}
