use std::collections::HashMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::gates::gate1::Gate1Result;
use crate::gates::gate2::{Gate2Result, Regime, Side};
use crate::indicators::{atr, fractal_swings, SwingKind};
use crate::smc::{analyze_structure_1h, find_fvg_15m, Structure1HResult, Trend, Zone, ZoneKind};
use crate::types::{Candle, MarketSnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Trend,
    Squeeze,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MicroMode {
    Mode1,
    Mode2,
}

#[derive(Debug, Clone)]
pub struct Gate3Result {
    pub passed: bool,
    pub reason: String,
    pub intent: Option<Side>,
    pub structure: Structure1HResult,
    pub zone: Option<Zone>,
    pub tp2_candidate: Option<Decimal>,
    pub notes: HashMap<String, String>,
}

fn confirm_mode(g2: &Gate2Result) -> Mode {
    if g2.regime == Regime::CrowdedSqueeze {
        Mode::Squeeze
    } else {
        Mode::Trend
    }
}

/// Practical directional intent from HTF bias/location: fail-closed (no
/// intent) outside the up+discount / down+premium combinations, including
/// mid location and range bias.
fn pick_intent(g1: &Gate1Result) -> Option<Side> {
    use crate::smc::{Bias, Location};
    if g1.location == Some(Location::Mid) {
        return None;
    }
    match (g1.htf_bias, g1.location) {
        (Some(Bias::Up), Some(Location::Discount)) => Some(Side::Long),
        (Some(Bias::Down), Some(Location::Premium)) => Some(Side::Short),
        _ => None,
    }
}

fn has_displacement(candles_1h: &[Candle], atr_mult: Decimal) -> bool {
    let a = match atr(candles_1h, 14) {
        Some(a) if a > Decimal::ZERO => a,
        _ => return false,
    };
    let last = match candles_1h.last() {
        Some(c) => c,
        None => return false,
    };
    last.body_size() >= atr_mult * a
}

fn displacement_against_crowd(candles_1h: &[Candle], skew: Option<Side>, atr_mult: Decimal) -> bool {
    if candles_1h.len() < 20 {
        return false;
    }
    let a = match atr(candles_1h, 14) {
        Some(a) if a > Decimal::ZERO => a,
        _ => return false,
    };
    let last = match candles_1h.last() {
        Some(c) => c,
        None => return false,
    };
    if last.body_size() < atr_mult * a {
        return false;
    }
    match skew {
        Some(Side::Long) => last.is_bearish(),
        Some(Side::Short) => last.is_bullish(),
        None => false,
    }
}

#[derive(Clone, Copy)]
enum SweepSide {
    Above,
    Below,
}

fn sweep_external(candles_1h: &[Candle], level: Option<Decimal>, side: SweepSide) -> bool {
    let level = match level {
        Some(l) => l,
        None => return false,
    };
    let last = match candles_1h.last() {
        Some(c) => c,
        None => return false,
    };
    match side {
        SweepSide::Above => last.high > level && last.close < level,
        SweepSide::Below => last.low < level && last.close > level,
    }
}

fn pick_zone(zones: &[Zone], intent: Side) -> Option<Zone> {
    let want = if intent == Side::Long { ZoneKind::FvgBull } else { ZoneKind::FvgBear };
    zones
        .iter()
        .find(|z| z.kind == want && z.top != z.bottom && z.fill_pct <= dec!(0.55))
        .cloned()
}

fn pick_micro_mode(hint: &str, mode: Mode) -> MicroMode {
    if mode == Mode::Squeeze {
        return MicroMode::Mode1;
    }
    if hint.contains("continu") {
        MicroMode::Mode2
    } else {
        MicroMode::Mode1
    }
}

fn micro_confirm_sweep_choch(candles_15m: &[Candle], intent: Side, lookback: usize, min_break_atr_mult: Decimal) -> (bool, &'static str) {
    if candles_15m.len() < 80 {
        return (false, "insufficient_15m_candles");
    }
    let c = if candles_15m.len() > lookback {
        &candles_15m[candles_15m.len() - lookback..]
    } else {
        candles_15m
    };
    let atr15 = atr(c, 14);
    let buf = atr15.filter(|a| *a > Decimal::ZERO).map(|a| a * min_break_atr_mult).unwrap_or(Decimal::ZERO);

    let swings = fractal_swings(c, 2, 2);
    let highs: Vec<_> = swings.iter().filter(|s| s.kind == SwingKind::High).collect();
    let lows: Vec<_> = swings.iter().filter(|s| s.kind == SwingKind::Low).collect();
    if highs.len() < 2 || lows.len() < 2 {
        return (false, "insufficient_15m_swings");
    }

    if intent == Side::Long {
        let last_low = lows.last().unwrap();
        let sweep_idx = (last_low.index..c.len()).find(|&i| c[i].low < last_low.price && c[i].close > last_low.price + buf);
        let sweep_idx = match sweep_idx {
            Some(i) => i,
            None => return (false, "no_sweep_15m"),
        };
        let prev_high = highs.iter().filter(|h| h.index < sweep_idx).last();
        let prev_high = match prev_high {
            Some(h) => h,
            None => return (false, "no_prev_swing_high"),
        };
        for j in sweep_idx + 1..c.len() {
            if c[j].close > prev_high.price + buf {
                return (true, "micro_sweep_choch_up");
            }
        }
        (false, "no_choch_15m")
    } else {
        let last_high = highs.last().unwrap();
        let sweep_idx = (last_high.index..c.len()).find(|&i| c[i].high > last_high.price && c[i].close < last_high.price - buf);
        let sweep_idx = match sweep_idx {
            Some(i) => i,
            None => return (false, "no_sweep_15m"),
        };
        let prev_low = lows.iter().filter(|l| l.index < sweep_idx).last();
        let prev_low = match prev_low {
            Some(l) => l,
            None => return (false, "no_prev_swing_low"),
        };
        for j in sweep_idx + 1..c.len() {
            if c[j].close < prev_low.price - buf {
                return (true, "micro_sweep_choch_down");
            }
        }
        (false, "no_choch_15m")
    }
}

#[allow(clippy::too_many_arguments)]
fn micro_confirm_pullback_break(
    candles_15m: &[Candle],
    intent: Side,
    zone: &Zone,
    lookback: usize,
    min_break_atr_mult: Decimal,
    strong_disp: bool,
) -> (bool, &'static str) {
    if candles_15m.len() < 120 {
        return (false, "insufficient_15m_candles");
    }
    if zone.fill_pct > dec!(0.55) {
        return (false, "zone_too_filled_for_continuation");
    }

    let c = if candles_15m.len() > lookback {
        &candles_15m[candles_15m.len() - lookback..]
    } else {
        candles_15m
    };
    let atr15 = atr(c, 14);
    let buf = atr15.filter(|a| *a > Decimal::ZERO).map(|a| a * min_break_atr_mult).unwrap_or(Decimal::ZERO);

    let (top, bottom) = if zone.top < zone.bottom { (zone.bottom, zone.top) } else { (zone.top, zone.bottom) };
    let mid = (top + bottom) / Decimal::TWO;

    let mut touch_idx = None;
    for (i, candle) in c.iter().enumerate() {
        let hit = if intent == Side::Long {
            candle.low <= top && candle.low >= bottom
        } else {
            candle.high >= bottom && candle.high <= top
        };
        if hit {
            touch_idx = Some(i);
            break;
        }
    }
    let mut touch_idx = match touch_idx {
        Some(i) => i,
        None => return (false, "no_pullback_into_zone"),
    };
    let pre_touch_idx = touch_idx;

    let accept_lookahead = 16usize;
    let mut needed = 2usize;
    if strong_disp && needed > 1 {
        needed = 1;
    }
    if needed > 0 {
        let mut acc = 0usize;
        let end = (touch_idx + 1 + accept_lookahead).min(c.len());
        let mut accepted_at = None;
        for i in touch_idx + 1..end {
            let ok = if intent == Side::Long { c[i].close >= mid } else { c[i].close <= mid };
            if ok {
                acc += 1;
                if acc >= needed {
                    accepted_at = Some(i);
                    break;
                }
            } else {
                acc = 0;
            }
        }
        match accepted_at {
            Some(i) => touch_idx = i,
            None => return (false, "no_acceptance_closes"),
        }
    }

    let swings = fractal_swings(c, 2, 2);
    let highs: Vec<_> = swings.iter().filter(|s| s.kind == SwingKind::High).collect();
    let lows: Vec<_> = swings.iter().filter(|s| s.kind == SwingKind::Low).collect();
    if highs.len() < 2 || lows.len() < 2 {
        return (false, "insufficient_15m_swings");
    }
    let prev_high = highs.iter().filter(|h| h.index < pre_touch_idx).last();
    let prev_low = lows.iter().filter(|l| l.index < pre_touch_idx).last();
    let (prev_high, prev_low) = match (prev_high, prev_low) {
        (Some(h), Some(l)) => (h, l),
        _ => return (false, "no_reference_swings"),
    };

    if intent == Side::Long {
        for j in touch_idx + 1..c.len() {
            if c[j].close > prev_high.price + buf {
                return (true, "micro_pullback_break_up");
            }
        }
        (false, "no_internal_break_up")
    } else {
        for j in touch_idx + 1..c.len() {
            if c[j].close < prev_low.price - buf {
                return (true, "micro_pullback_break_down");
            }
        }
        (false, "no_internal_break_down")
    }
}

fn tp2_from_gate1(g1: &Gate1Result, intent: Side) -> Option<Decimal> {
    if intent == Side::Long {
        g1.liquidity_above
    } else {
        g1.liquidity_below
    }
}

fn fail(reason: impl Into<String>, structure: Structure1HResult, intent: Option<Side>, notes: HashMap<String, String>) -> Gate3Result {
    Gate3Result {
        passed: false,
        reason: reason.into(),
        intent,
        structure,
        zone: None,
        tp2_candidate: None,
        notes,
    }
}

/// Structural confirmation gate: requires Gate 1 passed, Gate 2 passed and
/// not alert-only, a mode-specific 1H trigger, a usable 15m FVG zone in the
/// intent direction, and a 15m micro-confirmation.
pub fn gate3_structure_confirmation(snapshot: &MarketSnapshot, g1: &Gate1Result, g2: &Gate2Result) -> Gate3Result {
    let structure = analyze_structure_1h(&snapshot.candles_1h, 2, 2);

    if !g1.passed {
        return fail("gate1_fail", structure, None, HashMap::new());
    }
    if !g2.passed || g2.alert_only {
        let mut notes = HashMap::new();
        notes.insert("g2_regime".to_string(), format!("{:?}", g2.regime));
        notes.insert("g2_reason".to_string(), g2.reason.to_string());
        return fail("gate2_not_trade_eligible", structure, None, notes);
    }

    let mode = confirm_mode(g2);
    let intent = match pick_intent(g1) {
        Some(intent) => intent,
        None => return fail("no_clear_intent_htf", structure, None, HashMap::new()),
    };

    let trigger: &'static str;
    if mode == Mode::Trend {
        if !(structure.bos || structure.choch) {
            let mut notes = HashMap::new();
            notes.insert("trend".to_string(), format!("{:?}", structure.trend));
            return fail(format!("struct_no_break_{}", structure.reason), structure, Some(intent), notes);
        }
        if !has_displacement(&snapshot.candles_1h, dec!(0.8)) {
            return fail("no_displacement_1h", structure, Some(intent), HashMap::new());
        }
        trigger = "bos_or_choch+disp";
    } else {
        let (liq_above, liq_below) = (g1.liquidity_above, g1.liquidity_below);
        let sweep_ok = match g2.ratio_skew {
            Some(Side::Long) => sweep_external(&snapshot.candles_1h, liq_above, SweepSide::Above),
            Some(Side::Short) => sweep_external(&snapshot.candles_1h, liq_below, SweepSide::Below),
            None => false,
        };
        let disp_against = displacement_against_crowd(&snapshot.candles_1h, g2.ratio_skew, dec!(0.8));
        let disp_any = has_displacement(&snapshot.candles_1h, dec!(0.8));

        if structure.choch && disp_any {
            trigger = "choch+disp";
        } else if sweep_ok && disp_against {
            trigger = "sweep_external+disp_against_crowd";
        } else {
            let mut notes = HashMap::new();
            notes.insert("sweep_ok".to_string(), sweep_ok.to_string());
            notes.insert("disp_against".to_string(), disp_against.to_string());
            return fail("squeeze_no_trigger", structure, Some(intent), notes);
        }
    }

    let strong_disp = has_displacement(&snapshot.candles_1h, dec!(1.2));

    let zones = find_fvg_15m(&snapshot.candles_15m, 120);
    let zone = match pick_zone(&zones, intent) {
        Some(z) => z,
        None => {
            let mut notes = HashMap::new();
            notes.insert("zone_count".to_string(), zones.len().to_string());
            notes.insert("trigger".to_string(), trigger.to_string());
            return fail("no_valid_zone_15m_directional", structure, Some(intent), notes);
        }
    };

    let micro_mode = pick_micro_mode(g2.directional_bias_hint, mode);
    let (micro_ok, micro_reason) = match micro_mode {
        MicroMode::Mode2 => micro_confirm_pullback_break(&snapshot.candles_15m, intent, &zone, 64, dec!(0.10), strong_disp),
        MicroMode::Mode1 => {
            let buf = if mode == Mode::Squeeze { dec!(0.12) } else { dec!(0.10) };
            micro_confirm_sweep_choch(&snapshot.candles_15m, intent, 48, buf)
        }
    };
    if !micro_ok {
        let mut notes = HashMap::new();
        notes.insert("micro_reason".to_string(), micro_reason.to_string());
        notes.insert("trigger".to_string(), trigger.to_string());
        return fail("micro_confirm_fail", structure, Some(intent), notes);
    }

    let tp2_candidate = tp2_from_gate1(g1, intent).or_else(|| match intent {
        Side::Long => structure.last_swing_high.map(|s| s.price),
        Side::Short => structure.last_swing_low.map(|s| s.price),
    });

    let mut notes = HashMap::new();
    notes.insert("trend".to_string(), format!("{:?}", structure.trend));
    notes.insert("trigger".to_string(), trigger.to_string());
    notes.insert("micro_reason".to_string(), micro_reason.to_string());
    notes.insert("micro_mode".to_string(), format!("{:?}", micro_mode));
    notes.insert("g2_regime".to_string(), format!("{:?}", g2.regime));

    Gate3Result {
        passed: true,
        reason: "pass".to_string(),
        intent: Some(intent),
        structure,
        zone: Some(zone),
        tp2_candidate,
        notes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gates::gate2::Confidence;

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

    fn gate1_passing() -> Gate1Result {
        Gate1Result {
            passed: true,
            reason: "pass".to_string(),
            htf_bias: Some(crate::smc::Bias::Up),
            location: Some(crate::smc::Location::Discount),
            pos_pct: Some(dec!(0.2)),
            range_high: Some(dec!(110)),
            range_low: Some(dec!(90)),
            liquidity_above: Some(dec!(120)),
            liquidity_below: Some(dec!(80)),
            swing_highs: vec![],
            swing_lows: vec![],
        }
    }

    fn gate2_passing() -> Gate2Result {
        Gate2Result {
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
        }
    }

    #[test]
    fn gate1_fail_short_circuits() {
        let mut g1 = gate1_passing();
        g1.passed = false;
        let snapshot = MarketSnapshot {
            symbol: "BTCUSDT".to_string(),
            candles_15m: vec![],
            candles_1h: vec![],
            candles_4h: vec![],
            deriv_1h: crate::types::Derivatives1H::unknown(),
            mark_price: None,
            bid: None,
            ask: None,
            spread_pct: None,
        };
        let result = gate3_structure_confirmation(&snapshot, &g1, &gate2_passing());
        assert!(!result.passed);
        assert_eq!(result.reason, "gate1_fail");
    }

    #[test]
    fn alert_only_gate2_short_circuits() {
        let mut g2 = gate2_passing();
        g2.alert_only = true;
        let snapshot = MarketSnapshot {
            symbol: "BTCUSDT".to_string(),
            candles_15m: vec![],
            candles_1h: vec![],
            candles_4h: vec![],
            deriv_1h: crate::types::Derivatives1H::unknown(),
            mark_price: None,
            bid: None,
            ask: None,
            spread_pct: None,
        };
        let result = gate3_structure_confirmation(&snapshot, &gate1_passing(), &g2);
        assert!(!result.passed);
        assert_eq!(result.reason, "gate2_not_trade_eligible");
    }

    #[test]
    fn no_intent_when_location_is_mid() {
        let mut g1 = gate1_passing();
        g1.location = Some(crate::smc::Location::Mid);
        let snapshot = MarketSnapshot {
            symbol: "BTCUSDT".to_string(),
            candles_15m: vec![],
            candles_1h: vec![],
            candles_4h: vec![],
            deriv_1h: crate::types::Derivatives1H::unknown(),
            mark_price: None,
            bid: None,
            ask: None,
            spread_pct: None,
        };
        let result = gate3_structure_confirmation(&snapshot, &g1, &gate2_passing());
        assert_eq!(result.reason, "no_clear_intent_htf");
    }

    #[test]
    fn atr_and_displacement_smoke() {
        let candles: Vec<Candle> = (0..20).map(|i| candle(i, 100, 102, 98, 101)).collect();
        assert!(!has_displacement(&candles, dec!(0.8)));
    }
}
