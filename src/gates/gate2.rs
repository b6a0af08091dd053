use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::derivatives::Gate2Context;
use crate::types::Derivatives1H;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Regime {
    HealthyTrend,
    CrowdedSqueeze,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confidence {
    Low,
    Med,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Long,
    Short,
}

#[derive(Debug, Clone)]
pub struct Gate2Result {
    pub passed: bool,
    pub reason: &'static str,
    pub regime: Regime,
    pub directional_bias_hint: &'static str,
    pub confidence: Confidence,
    pub alert_only: bool,
    pub ratio_skew: Option<Side>,
    pub funding_extreme: bool,
    pub oi_spike: bool,
    pub ratio_long_pct: Option<Decimal>,
    pub funding: Option<Decimal>,
    pub funding_z: Option<Decimal>,
    pub oi_delta_pct: Option<Decimal>,
    pub oi_spike_z: Option<Decimal>,
}

fn ratio_skew_of(ratio_long_pct: Option<Decimal>) -> Option<Side> {
    let r = ratio_long_pct?;
    if r >= dec!(50) {
        Some(Side::Long)
    } else {
        Some(Side::Short)
    }
}

/// HIGH requires ready plus all three rolling stats defined; downgraded to
/// MED when the 4H persistence check hasn't confirmed.
fn compute_confidence(ctx: &Gate2Context, ratio_long_pct: Option<Decimal>) -> Confidence {
    if !ctx.ready {
        return Confidence::Low;
    }
    let all_defined = ratio_long_pct.is_some() && ctx.funding_z.is_some() && ctx.oi_spike_z.is_some();
    let some_defined = ratio_long_pct.is_some() || ctx.funding_z.is_some() || ctx.oi_spike_z.is_some();
    let confidence = if all_defined {
        Confidence::High
    } else if some_defined {
        Confidence::Med
    } else {
        Confidence::Low
    };
    if confidence == Confidence::High && !ctx.confirm4h {
        Confidence::Med
    } else {
        confidence
    }
}

/// Two-layer classifier: hard guards work regardless of readiness (alert-only
/// until the rolling series has enough history); soft classification refines
/// the regime and directional hint once `ctx.ready`.
pub fn gate2_derivatives_regime(last: &Derivatives1H, ctx: &Gate2Context) -> Gate2Result {
    let ratio_long_pct = last.ratio_long_pct;
    let funding = last.funding_rate;

    let hard_ratio = ratio_long_pct.map(|r| r >= dec!(70) || r <= dec!(30)).unwrap_or(false);
    let hard_funding = funding.map(|f| f.abs() >= dec!(0.00020)).unwrap_or(false);
    let hard_oi = ctx.oi_spike_z.map(|z| z >= dec!(3.0)).unwrap_or(false);
    let hard_hits = [hard_ratio, hard_funding, hard_oi].iter().filter(|x| **x).count();

    if hard_hits >= 2 {
        let skew = ratio_skew_of(ratio_long_pct);
        let hint = match skew {
            Some(Side::Long) => "reversal_or_flush_risk",
            Some(Side::Short) => "reversal_or_squeeze_up_risk",
            None => "squeeze_risk",
        };
        if !ctx.ready {
            return Gate2Result {
                passed: false,
                reason: "hard_guard_alert_only",
                regime: Regime::CrowdedSqueeze,
                directional_bias_hint: hint,
                confidence: Confidence::Low,
                alert_only: true,
                ratio_skew: skew,
                funding_extreme: hard_funding,
                oi_spike: hard_oi,
                ratio_long_pct,
                funding,
                funding_z: ctx.funding_z,
                oi_delta_pct: ctx.oi_delta_pct,
                oi_spike_z: ctx.oi_spike_z,
            };
        }
        let confidence = compute_confidence(ctx, ratio_long_pct);
        return Gate2Result {
            passed: true,
            reason: "hard_guard_crowded_squeeze",
            regime: Regime::CrowdedSqueeze,
            directional_bias_hint: hint,
            confidence,
            alert_only: false,
            ratio_skew: skew,
            funding_extreme: hard_funding,
            oi_spike: hard_oi,
            ratio_long_pct,
            funding,
            funding_z: ctx.funding_z,
            oi_delta_pct: ctx.oi_delta_pct,
            oi_spike_z: ctx.oi_spike_z,
        };
    }

    if !ctx.ready {
        return Gate2Result {
            passed: false,
            reason: "insufficient_history",
            regime: Regime::Neutral,
            directional_bias_hint: "no_trade",
            confidence: Confidence::Low,
            alert_only: true,
            ratio_skew: None,
            funding_extreme: false,
            oi_spike: false,
            ratio_long_pct,
            funding,
            funding_z: ctx.funding_z,
            oi_delta_pct: ctx.oi_delta_pct,
            oi_spike_z: ctx.oi_spike_z,
        };
    }

    let crowded_ratio = ratio_long_pct.map(|r| r >= dec!(67.5) || r <= dec!(32.5)).unwrap_or(false);
    let extreme_funding = match ctx.funding_z {
        Some(z) => z.abs() >= dec!(2.0),
        None => funding.map(|f| f.abs() >= dec!(0.00015)).unwrap_or(false),
    };
    let oi_spike = ctx.oi_spike_z.map(|z| z >= dec!(2.5)).unwrap_or(false);
    let soft_hits = [crowded_ratio, extreme_funding, oi_spike].iter().filter(|x| **x).count();

    let confidence = compute_confidence(ctx, ratio_long_pct);

    if soft_hits >= 2 && (ctx.confirm4h || soft_hits == 3) {
        let skew = ratio_skew_of(ratio_long_pct);
        let hint = match skew {
            Some(Side::Long) => "reversal_or_flush_risk",
            Some(Side::Short) => "reversal_or_squeeze_up_risk",
            None => "squeeze_risk",
        };
        return Gate2Result {
            passed: true,
            reason: "crowded_squeeze",
            regime: Regime::CrowdedSqueeze,
            directional_bias_hint: hint,
            confidence,
            alert_only: false,
            ratio_skew: skew,
            funding_extreme: extreme_funding,
            oi_spike,
            ratio_long_pct,
            funding,
            funding_z: ctx.funding_z,
            oi_delta_pct: ctx.oi_delta_pct,
            oi_spike_z: ctx.oi_spike_z,
        };
    }

    let ratio_healthy = ratio_long_pct.map(|r| (dec!(35)..=dec!(65)).contains(&r)).unwrap_or(true);
    let funding_healthy = ctx.funding_z.map(|z| z.abs() <= dec!(1.5)).unwrap_or(true);
    let oi_healthy = ctx.oi_spike_z.map(|z| z < dec!(2.0)).unwrap_or(true);

    if ratio_healthy && funding_healthy && oi_healthy {
        return Gate2Result {
            passed: true,
            reason: "pass",
            regime: Regime::HealthyTrend,
            directional_bias_hint: "continuation_preferred",
            confidence,
            alert_only: false,
            ratio_skew: None,
            funding_extreme: extreme_funding,
            oi_spike,
            ratio_long_pct,
            funding,
            funding_z: ctx.funding_z,
            oi_delta_pct: ctx.oi_delta_pct,
            oi_spike_z: ctx.oi_spike_z,
        };
    }

    Gate2Result {
        passed: true,
        reason: "neutral",
        regime: Regime::Neutral,
        directional_bias_hint: "no_trade",
        confidence,
        alert_only: false,
        ratio_skew: None,
        funding_extreme: extreme_funding,
        oi_spike,
        ratio_long_pct,
        funding,
        funding_z: ctx.funding_z,
        oi_delta_pct: ctx.oi_delta_pct,
        oi_spike_z: ctx.oi_spike_z,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(ready: bool, confirm4h: bool, oi_spike_z: Option<Decimal>, funding_z: Option<Decimal>) -> Gate2Context {
        Gate2Context {
            ts: 0,
            bucket_ts: 0,
            oi_delta: None,
            oi_delta_pct: None,
            oi_spike_z,
            funding_z,
            funding_mean: None,
            funding_std: None,
            ratio_dev: None,
            oi_slope_4h_pct: None,
            confirm4h,
            confirm4h_reason: if confirm4h { "ratio_extreme_4h" } else { "no_4h_confirmation" },
            ready,
            history_len: if ready { 20 } else { 3 },
        }
    }

    #[test]
    fn not_ready_is_alert_only_when_no_hard_guard() {
        let last = Derivatives1H {
            funding_rate: Some(dec!(0.0001)),
            open_interest: None,
            ratio_long_pct: Some(dec!(50)),
            meta: Default::default(),
        };
        let result = gate2_derivatives_regime(&last, &ctx(false, false, None, None));
        assert!(!result.passed);
        assert!(result.alert_only);
    }

    #[test]
    fn healthy_ratio_and_funding_is_healthy_trend() {
        let last = Derivatives1H {
            funding_rate: Some(dec!(0.00002)),
            open_interest: None,
            ratio_long_pct: Some(dec!(50)),
            meta: Default::default(),
        };
        let result = gate2_derivatives_regime(&last, &ctx(true, true, Some(dec!(0.1)), Some(dec!(0.1))));
        assert_eq!(result.regime, Regime::HealthyTrend);
        assert!(result.passed);
    }

    #[test]
    fn extreme_ratio_is_crowded_squeeze() {
        let last = Derivatives1H {
            funding_rate: Some(dec!(0.0001)),
            open_interest: None,
            ratio_long_pct: Some(dec!(75)),
            meta: Default::default(),
        };
        let result = gate2_derivatives_regime(&last, &ctx(true, true, Some(dec!(0.1)), Some(dec!(0.1))));
        assert_eq!(result.regime, Regime::CrowdedSqueeze);
    }
}
