use std::collections::HashMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::gates::gate1::Gate1Result;
use crate::gates::gate2::Side;
use crate::gates::gate3::Gate3Result;
use crate::indicators::atr;
use crate::types::{CoinGroup, MarketSnapshot};

const MIN_RISK: Decimal = dec!(0.000000000001);
const SL_PAD_ZONE_MULT: Decimal = dec!(0.15);
const SL_PAD_ATR_MULT: Decimal = dec!(0.25);
const DEFAULT_MIN_RR_TP2: Decimal = dec!(2.5);

#[derive(Debug, Clone)]
pub struct TpLevel {
    pub name: &'static str,
    pub price: Decimal,
    pub reason: &'static str,
}

#[derive(Debug, Clone)]
pub struct TradePlan {
    pub symbol: String,
    pub intent: Side,
    pub entry1: Decimal,
    pub entry2: Option<Decimal>,
    pub sl: Decimal,
    pub sl_reason: &'static str,
    pub tps: Vec<TpLevel>,
    pub rr_tp2: Option<Decimal>,
    pub rr_tp2_entry2: Option<Decimal>,
    pub risk_per_unit: Decimal,
    pub leeway_price: Decimal,
    pub leeway_reason: &'static str,
    pub meta: HashMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct PlanRejection {
    pub reason: String,
}

fn leeway_mult(group: CoinGroup) -> (Decimal, Decimal) {
    match group {
        CoinGroup::Core => (dec!(0.10), dec!(3.0)),
        CoinGroup::Major => (dec!(0.14), dec!(5.0)),
        CoinGroup::AltLowPrice => (dec!(0.22), dec!(12.0)),
        CoinGroup::Alt => (dec!(0.18), dec!(10.0)),
    }
}

fn execution_leeway(snapshot: &MarketSnapshot, atr15: Option<Decimal>) -> (Decimal, &'static str) {
    let group = CoinGroup::for_symbol(&snapshot.symbol);
    let (mult, bps) = leeway_mult(group);
    if let Some(a) = atr15.filter(|a| *a > Decimal::ZERO) {
        return (a * mult, "atr15_mult");
    }
    if let Some(mark) = snapshot.mark() {
        return (mark * bps / dec!(10000), "bps_fallback");
    }
    (Decimal::ZERO, "no_reference_price")
}

/// Next liquidity levels strictly beyond `reference` in the direction of travel,
/// nearest first, deduplicated.
fn next_liq_levels(levels: &[Decimal], reference: Decimal, intent: Side, k: usize) -> Vec<Decimal> {
    let mut filtered: Vec<Decimal> = levels
        .iter()
        .copied()
        .filter(|l| if intent == Side::Long { *l > reference } else { *l < reference })
        .collect();
    filtered.sort();
    filtered.dedup();
    if intent == Side::Long {
        filtered.into_iter().take(k).collect()
    } else {
        filtered.into_iter().rev().take(k).collect()
    }
}

fn rr(entry: Decimal, tp: Decimal, risk: Decimal) -> Decimal {
    if risk <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    (tp - entry).abs() / risk
}

fn beyond(intent: Side, price: Decimal, reference: Decimal) -> bool {
    if intent == Side::Long {
        price > reference
    } else {
        price < reference
    }
}

/// Builds the entry/SL/TP ladder and execution leeway for a confirmed
/// candidate. Pure function of its inputs: identical inputs produce
/// identical plans.
pub fn build_plan(snapshot: &MarketSnapshot, g1: &Gate1Result, g3: &Gate3Result, min_rr_tp2: Decimal) -> Result<TradePlan, PlanRejection> {
    let intent = g3.intent.ok_or_else(|| PlanRejection { reason: "no_intent".to_string() })?;
    let zone = g3.zone.as_ref().ok_or_else(|| PlanRejection { reason: "no_zone".to_string() })?;

    let (top, bottom) = if zone.top >= zone.bottom { (zone.top, zone.bottom) } else { (zone.bottom, zone.top) };
    let mid = (top + bottom) / Decimal::TWO;
    let zone_height = (top - bottom).max(MIN_RISK);

    let entry1 = mid;
    let entry2 = if intent == Side::Long { bottom } else { top };

    let atr15 = atr(&snapshot.candles_15m, 14);
    let atr15_component = atr15.unwrap_or(Decimal::ZERO) * SL_PAD_ATR_MULT;
    let pad = (zone_height * SL_PAD_ZONE_MULT).max(atr15_component).max(MIN_RISK);

    let sl = if intent == Side::Long { bottom - pad } else { top + pad };
    let risk = (entry1 - sl).abs();
    if risk <= MIN_RISK {
        return Err(PlanRejection { reason: "risk_too_small".to_string() });
    }

    let tp2 = g3
        .tp2_candidate
        .ok_or_else(|| PlanRejection { reason: "no_tp2_candidate".to_string() })?;

    let swing_ref = match intent {
        Side::Long => g1.swing_highs.last().copied(),
        Side::Short => g1.swing_lows.last().copied(),
    };
    let mut tp1_price = swing_ref.filter(|p| beyond(intent, *p, entry1));
    let mut tp1_reason = "structure_swing";
    if tp1_price.is_none() {
        if let Some(bl) = g3.structure.break_level.filter(|p| beyond(intent, *p, entry1)) {
            tp1_price = Some(bl);
            tp1_reason = "break_level";
        }
    }
    if tp1_price.is_none() {
        tp1_price = Some(if intent == Side::Long { entry1 + risk } else { entry1 - risk });
        tp1_reason = "one_r_fallback";
    }
    let mut tp1 = tp1_price.unwrap();
    // Ladder monotonicity: TP1 must sit strictly between entry1 and TP2.
    if !beyond(intent, tp2, tp1) || tp1 == tp2 {
        tp1 = if intent == Side::Long { entry1 + risk } else { entry1 - risk };
        tp1_reason = "one_r_fallback_monotonic";
    }

    let liq_levels: &[Decimal] = match intent {
        Side::Long => &g1.swing_highs,
        Side::Short => &g1.swing_lows,
    };
    let mut tail = next_liq_levels(liq_levels, tp2, intent, 3);
    let mut r_mult = 2u32;
    while tail.len() < 3 {
        let candidate = if intent == Side::Long {
            entry1 + risk * Decimal::from(r_mult)
        } else {
            entry1 - risk * Decimal::from(r_mult)
        };
        if beyond(intent, candidate, tp2) && !tail.contains(&candidate) {
            tail.push(candidate);
        }
        r_mult += 1;
        if r_mult > 20 {
            break;
        }
    }
    tail.sort();
    if intent == Side::Short {
        tail.reverse();
    }
    tail.truncate(3);

    let mut tps = vec![
        TpLevel { name: "TP1", price: tp1, reason: tp1_reason },
        TpLevel { name: "TP2", price: tp2, reason: "gate3_candidate" },
    ];
    let names = ["TP3", "TP4", "TP5"];
    for (i, name) in names.iter().enumerate() {
        let price = tail.get(i).copied().unwrap_or_else(|| {
            let mult = Decimal::from(3 + i as u32);
            if intent == Side::Long { entry1 + risk * mult } else { entry1 - risk * mult }
        });
        let reason = if i < tail.len() { "liquidity_ladder" } else { "r_multiple_fallback" };
        tps.push(TpLevel { name, price, reason });
    }

    let rr_tp2 = rr(entry1, tp2, risk);
    let rr_tp2_entry2 = rr(entry2, tp2, risk);
    if rr_tp2 < min_rr_tp2 && rr_tp2_entry2 < min_rr_tp2 {
        return Err(PlanRejection { reason: format!("rr_below_floor_{}", min_rr_tp2) });
    }

    let (leeway_price, leeway_reason) = execution_leeway(snapshot, atr15);

    let mut meta = HashMap::new();
    meta.insert("zone_kind".to_string(), format!("{:?}", zone.kind));
    meta.insert("zone_fill_pct".to_string(), zone.fill_pct.to_string());
    meta.insert("atr15".to_string(), atr15.map(|a| a.to_string()).unwrap_or_default());

    Ok(TradePlan {
        symbol: snapshot.symbol.clone(),
        intent,
        entry1,
        entry2: Some(entry2),
        sl,
        sl_reason: "zone_edge_padded",
        tps,
        rr_tp2: Some(rr_tp2),
        rr_tp2_entry2: Some(rr_tp2_entry2),
        risk_per_unit: risk,
        leeway_price,
        leeway_reason,
        meta,
    })
}

pub fn default_min_rr_tp2() -> Decimal {
    DEFAULT_MIN_RR_TP2
}
