use std::collections::HashMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::gates::gate1::Gate1Result;
use crate::gates::gate2::{Confidence, Gate2Result, Regime};
use crate::gates::gate3::Gate3Result;
use crate::planner::TradePlan;
use crate::smc::Location;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    A,
    B,
    C,
    Skip,
}

impl Tier {
    pub fn risk_mult(&self) -> Decimal {
        match self {
            Tier::A => dec!(1.0),
            Tier::B => dec!(0.5),
            Tier::C | Tier::Skip => dec!(0.0),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScorerConfig {
    pub a_rr_min: Decimal,
    pub a_score_min: i32,
    pub b_rr_min: Decimal,
    pub b_score_min: i32,
    pub only_trade_tiers: Vec<Tier>,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            a_rr_min: dec!(3.0),
            a_score_min: 80,
            b_rr_min: dec!(2.0),
            b_score_min: 60,
            only_trade_tiers: vec![Tier::A, Tier::B],
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScoreResult {
    pub passed: bool,
    pub tier: Tier,
    pub risk_mult: Decimal,
    pub score_0_100: i32,
    pub rr_tp2: Option<Decimal>,
    pub reasons: Vec<String>,
    pub checks: HashMap<String, String>,
}

fn fail(reason: impl Into<String>) -> ScoreResult {
    ScoreResult {
        passed: false,
        tier: Tier::Skip,
        risk_mult: Decimal::ZERO,
        score_0_100: 0,
        rr_tp2: None,
        reasons: vec![reason.into()],
        checks: HashMap::new(),
    }
}

/// Additive 0-100 scorer: eligibility is fail-closed (any missing upstream
/// result is a hard reject), then deltas accumulate from a base of 50.
pub fn score_signal(g1: &Gate1Result, g2: &Gate2Result, g3: &Gate3Result, plan: &TradePlan, config: &ScorerConfig) -> ScoreResult {
    if !g1.passed || !g3.passed {
        return fail("upstream_gate_not_passed");
    }
    if !g2.passed || g2.alert_only {
        return fail("gate2_not_trade_eligible");
    }

    let rr = match (plan.rr_tp2, plan.rr_tp2_entry2) {
        (Some(a), Some(b)) => a.max(b),
        (Some(a), None) => a,
        (None, Some(b)) => b,
        (None, None) => return fail("no_rr"),
    };

    let mut score: i32 = 50;
    let mut reasons = Vec::new();
    let mut checks = HashMap::new();

    let location_extreme = matches!(g1.location, Some(Location::Discount) | Some(Location::Premium));
    if location_extreme {
        score += 12;
        reasons.push("htf_location_extreme".to_string());
    } else {
        score -= 8;
        reasons.push("htf_location_not_extreme".to_string());
    }
    checks.insert("htf_location".to_string(), format!("{:?}", g1.location));

    match g2.regime {
        Regime::HealthyTrend => {
            score += 10;
            reasons.push("regime_healthy_trend".to_string());
        }
        Regime::CrowdedSqueeze => {
            score += 4;
            reasons.push("regime_crowded_squeeze".to_string());
        }
        Regime::Neutral => {
            score -= 12;
            reasons.push("regime_neutral".to_string());
        }
    }
    match g2.confidence {
        Confidence::High => {
            score += 4;
            reasons.push("confidence_high".to_string());
        }
        Confidence::Low => {
            score -= 4;
            reasons.push("confidence_low".to_string());
        }
        Confidence::Med => {}
    }
    checks.insert("regime".to_string(), format!("{:?}", g2.regime));
    checks.insert("confidence".to_string(), format!("{:?}", g2.confidence));

    let (bos, choch) = (g3.structure.bos, g3.structure.choch);
    if bos && choch {
        score += 6;
        reasons.push("structure_bos_and_choch".to_string());
    } else if choch {
        score += 10;
        reasons.push("structure_choch_only".to_string());
    } else if bos {
        score += 8;
        reasons.push("structure_bos_only".to_string());
    } else {
        score -= 20;
        reasons.push("structure_no_break".to_string());
    }
    checks.insert("bos".to_string(), bos.to_string());
    checks.insert("choch".to_string(), choch.to_string());

    if let Some(zone) = &g3.zone {
        if zone.fill_pct <= dec!(0.25) {
            score += 10;
            reasons.push("zone_fresh".to_string());
        } else if zone.fill_pct <= dec!(0.55) {
            score += 5;
            reasons.push("zone_partially_filled".to_string());
        } else {
            score -= 10;
            reasons.push("zone_overfilled".to_string());
        }
        checks.insert("zone_fill_pct".to_string(), zone.fill_pct.to_string());
    } else {
        score -= 10;
        reasons.push("zone_missing".to_string());
    }

    if rr >= dec!(3.0) {
        score += 12;
        reasons.push("rr_excellent".to_string());
    } else if rr >= dec!(2.0) {
        score += 6;
        reasons.push("rr_good".to_string());
    } else if rr >= dec!(1.5) {
        score -= 4;
        reasons.push("rr_marginal".to_string());
    } else {
        score -= 15;
        reasons.push("rr_poor".to_string());
    }
    checks.insert("rr_tp2".to_string(), rr.to_string());

    score = score.clamp(0, 100);

    let tier = if rr >= config.a_rr_min && score >= config.a_score_min {
        Tier::A
    } else if rr >= config.b_rr_min && score >= config.b_score_min {
        Tier::B
    } else {
        Tier::C
    };

    let passed = config.only_trade_tiers.contains(&tier);
    let final_tier = if passed { tier } else { Tier::Skip };

    ScoreResult {
        passed,
        tier: final_tier,
        risk_mult: final_tier.risk_mult(),
        score_0_100: score,
        rr_tp2: Some(rr),
        reasons,
        checks,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gates::gate3::Mode;
    use crate::smc::{Structure1HResult, Trend, Zone, ZoneKind};
    use crate::types::TimeFrame;

    fn plan_with_rr(rr: Decimal) -> TradePlan {
        TradePlan {
            symbol: "BTCUSDT".to_string(),
            intent: crate::gates::gate2::Side::Long,
            entry1: dec!(100),
            entry2: Some(dec!(98)),
            sl: dec!(95),
            sl_reason: "zone_edge_padded",
            tps: vec![],
            rr_tp2: Some(rr),
            rr_tp2_entry2: Some(rr),
            risk_per_unit: dec!(5),
            leeway_price: dec!(1),
            leeway_reason: "atr15_mult",
            meta: HashMap::new(),
        }
    }

    fn passing_gates() -> (Gate1Result, Gate2Result, Gate3Result) {
        let g1 = Gate1Result {
            passed: true,
            reason: "pass".to_string(),
            htf_bias: None,
            location: Some(Location::Discount),
            pos_pct: None,
            range_high: None,
            range_low: None,
            liquidity_above: None,
            liquidity_below: None,
            swing_highs: vec![],
            swing_lows: vec![],
        };
        let g2 = Gate2Result {
            passed: true,
            reason: "pass",
            regime: Regime::HealthyTrend,
            directional_bias_hint: "continuation_preferred",
            confidence: Confidence::High,
            alert_only: false,
            ratio_skew: None,
            funding_extreme: false,
            oi_spike: false,
            ratio_long_pct: Some(dec!(50)),
            funding: Some(dec!(0.0001)),
            funding_z: Some(dec!(0.1)),
            oi_delta_pct: Some(dec!(0.1)),
            oi_spike_z: Some(dec!(0.1)),
        };
        let g3 = Gate3Result {
            passed: true,
            reason: "pass".to_string(),
            intent: Some(crate::gates::gate2::Side::Long),
            structure: Structure1HResult {
                trend: Trend::Up,
                last_swing_high: None,
                last_swing_low: None,
                bos: true,
                choch: false,
                break_level: None,
                reason: "pass",
            },
            zone: Some(Zone {
                kind: ZoneKind::FvgBull,
                tf: TimeFrame::M15,
                top: dec!(102),
                bottom: dec!(98),
                created_ts: 0,
                touched: false,
                fill_pct: dec!(0.1),
                score: dec!(1.1),
                reason: "pass",
            }),
            tp2_candidate: Some(dec!(120)),
            notes: HashMap::new(),
        };
        let _ = Mode::Trend;
        (g1, g2, g3)
    }

    #[test]
    fn strong_signal_scores_tier_a() {
        let (g1, g2, g3) = passing_gates();
        let plan = plan_with_rr(dec!(3.5));
        let result = score_signal(&g1, &g2, &g3, &plan, &ScorerConfig::default());
        assert_eq!(result.tier, Tier::A);
        assert!(result.passed);
        assert_eq!(result.risk_mult, dec!(1.0));
    }

    #[test]
    fn weak_rr_demotes_to_c_and_skips() {
        let (g1, g2, g3) = passing_gates();
        let plan = plan_with_rr(dec!(1.0));
        let result = score_signal(&g1, &g2, &g3, &plan, &ScorerConfig::default());
        assert_eq!(result.tier, Tier::Skip);
        assert!(!result.passed);
        assert_eq!(result.risk_mult, Decimal::ZERO);
    }

    #[test]
    fn alert_only_gate2_is_rejected_outright() {
        let (g1, mut g2, g3) = passing_gates();
        g2.alert_only = true;
        let plan = plan_with_rr(dec!(4.0));
        let result = score_signal(&g1, &g2, &g3, &plan, &ScorerConfig::default());
        assert!(!result.passed);
        assert_eq!(result.reasons[0], "gate2_not_trade_eligible");
    }
}
