//! MA50 + breakout checklist over daily chart rows.
//!
//! Five conditions must hold: price above MA50, MA50 sloping up, a clear resistance level,
//! a close above it, and breakout volume above the recent average. When they do, the trade is
//! sized so that hitting the stop loses at most [`RISK_PER_TRADE`] of capital.

use crate::chart::{self, ChartPoint};
use serde::Serialize;

pub const MA_WINDOW: usize = 50;
const SLOPE_POINTS: usize = 10;

pub const RESISTANCE_LOOKBACK: usize = 60;
const MIN_RESISTANCE_LOOKBACK: usize = 20;
const RESISTANCE_TOLERANCE: f64 = 0.02;
const MIN_RESISTANCE_TOUCHES: usize = 2;

pub const SWING_LOOKBACK: usize = 20;
const MIN_SWING_LOOKBACK: usize = 5;

const BREAKOUT_VOLUME_WINDOW: usize = 10;

/// Stop sits 1% under the swing low.
pub const STOP_LOSS_BUFFER: f64 = 0.99;
/// Target at 2R.
pub const TARGET_MULTIPLIER: f64 = 2.0;
pub const RISK_PER_TRADE: f64 = 0.01;
pub const DEFAULT_CAPITAL: f64 = 100_000.0;

/// Compares the mean of the three newest against the three oldest of the last ten moving
/// averages. The newest close is left out of every window.
pub fn ma_slope_up(closes: &[f64], window: usize) -> Option<bool> {
    if window == 0 || closes.len() < window + SLOPE_POINTS {
        return None;
    }

    let n = closes.len();
    let ma: Vec<f64> = (0..SLOPE_POINTS)
        .map(|i| chart::simple_moving_average(&closes[..n - SLOPE_POINTS + i], window))
        .collect::<Option<_>>()?;

    let older = ma[..3].iter().sum::<f64>() / 3.0;
    let recent = ma[SLOPE_POINTS - 3..].iter().sum::<f64>() / 3.0;
    Some(recent > older)
}

/// Highest high of the lookback, if it was touched (within 2%) at least twice.
pub fn resistance_level(highs: &[f64], lookback: usize) -> Option<f64> {
    let lookback = lookback.min(highs.len());
    if lookback < MIN_RESISTANCE_LOOKBACK {
        return None;
    }

    let recent = &highs[highs.len() - lookback..];
    let max_high = recent.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let tolerance = max_high * RESISTANCE_TOLERANCE;
    let touches = recent
        .iter()
        .filter(|h| (**h - max_high).abs() <= tolerance)
        .count();

    (touches >= MIN_RESISTANCE_TOUCHES).then_some(max_high)
}

/// Lowest recent low that is still under the current price.
pub fn swing_low(lows: &[f64], current_price: f64, lookback: usize) -> Option<f64> {
    let lookback = lookback.min(lows.len());
    if lookback < MIN_SWING_LOOKBACK {
        return None;
    }

    lows[lows.len() - lookback..]
        .iter()
        .copied()
        .filter(|low| *low < current_price)
        .reduce(f64::min)
}

/// Last bar's volume against the mean of the nine bars before it.
pub fn breakout_volume_confirmed(volumes: &[f64]) -> bool {
    let n = volumes.len();
    if n < BREAKOUT_VOLUME_WINDOW {
        return false;
    }

    let prior = &volumes[n - BREAKOUT_VOLUME_WINDOW..n - 1];
    let avg = prior.iter().sum::<f64>() / prior.len() as f64;
    volumes[n - 1] > avg
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SetupInputs {
    pub current_price: Option<f64>,
    pub ma50: Option<f64>,
    pub ma50_uptrend: Option<bool>,
    pub resistance: Option<f64>,
    pub breakout_confirmed: Option<bool>,
    pub swing_low: Option<f64>,
}

impl SetupInputs {
    /// Derives every input from daily rows, oldest first. Resistance is measured on the bars
    /// before the newest one so that the newest close can break it.
    pub fn from_chart(points: &[ChartPoint]) -> Self {
        let closes = chart::closes(points);
        let highs = chart::highs(points);
        let lows = chart::lows(points);
        let volumes = chart::volumes(points);

        let current_price = closes.last().copied();
        let resistance = highs
            .split_last()
            .and_then(|(_, prior)| resistance_level(prior, RESISTANCE_LOOKBACK));

        Self {
            current_price,
            ma50: chart::simple_moving_average(&closes, MA_WINDOW),
            ma50_uptrend: ma_slope_up(&closes, MA_WINDOW),
            resistance,
            breakout_confirmed: (!volumes.is_empty())
                .then(|| breakout_volume_confirmed(&volumes)),
            swing_low: current_price.and_then(|p| swing_low(&lows, p, SWING_LOOKBACK)),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.current_price.is_some()
            && self.ma50.is_some()
            && self.ma50_uptrend.is_some()
            && self.resistance.is_some()
            && self.breakout_confirmed.is_some()
            && self.swing_low.is_some()
    }

    /// Fields set here win; gaps are filled from `fallback`.
    pub fn or(self, fallback: SetupInputs) -> Self {
        Self {
            current_price: self.current_price.or(fallback.current_price),
            ma50: self.ma50.or(fallback.ma50),
            ma50_uptrend: self.ma50_uptrend.or(fallback.ma50_uptrend),
            resistance: self.resistance.or(fallback.resistance),
            breakout_confirmed: self.breakout_confirmed.or(fallback.breakout_confirmed),
            swing_low: self.swing_low.or(fallback.swing_low),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Verdict {
    #[serde(rename = "VALID TRADE")]
    ValidTrade,
    #[serde(rename = "SKIP")]
    Skip,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Conditions {
    pub price_above_ma50: bool,
    pub ma50_uptrend: bool,
    pub clear_resistance: bool,
    pub breakout_close: bool,
    pub volume_confirmation: bool,
}

impl Conditions {
    fn failures(&self) -> Vec<&'static str> {
        [
            (self.price_above_ma50, "Price not above MA50"),
            (self.ma50_uptrend, "MA50 not sloping up"),
            (self.clear_resistance, "No clear resistance"),
            (self.breakout_close, "No breakout above resistance"),
            (self.volume_confirmation, "No volume confirmation"),
        ]
        .into_iter()
        .filter(|(ok, _)| !ok)
        .map(|(_, label)| label)
        .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Prices {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ma50: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resistance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub swing_low: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_per_share: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Position {
    pub capital: f64,
    pub risk_amount: f64,
    pub shares: u64,
    pub value: f64,
    pub actual_risk: f64,
    pub potential_profit: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Analysis {
    pub symbol: String,
    pub setup_valid: bool,
    pub conditions: Option<Conditions>,
    pub prices: Prices,
    pub position: Option<Position>,
    pub verdict: Verdict,
    pub reason: String,
}

impl Analysis {
    fn skip(
        symbol: &str,
        conditions: Option<Conditions>,
        prices: Prices,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            symbol: symbol.to_string(),
            setup_valid: false,
            conditions,
            prices,
            position: None,
            verdict: Verdict::Skip,
            reason: reason.into(),
        }
    }
}

/// Runs the checklist. A missing uptrend answer counts as "no"; any other missing input
/// skips the trade before the conditions are evaluated.
pub fn analyze_setup(symbol: &str, inputs: &SetupInputs, capital: f64) -> Analysis {
    let missing = |reason: &str| Analysis::skip(symbol, None, Prices::default(), reason);

    let Some(current) = inputs.current_price else {
        return missing("Missing current price data");
    };
    let Some(ma50) = inputs.ma50 else {
        return missing("Missing MA50 data");
    };
    let Some(resistance) = inputs.resistance else {
        return missing("Missing resistance level");
    };
    let Some(breakout_confirmed) = inputs.breakout_confirmed else {
        return missing("Missing breakout confirmation");
    };
    let Some(swing) = inputs.swing_low else {
        return missing("Missing swing low data");
    };

    let mut prices = Prices {
        current: Some(current),
        ma50: Some(ma50),
        resistance: Some(resistance),
        swing_low: Some(swing),
        ..Default::default()
    };

    let conditions = Conditions {
        price_above_ma50: current > ma50,
        ma50_uptrend: inputs.ma50_uptrend.unwrap_or(false),
        clear_resistance: resistance > 0.0,
        breakout_close: current > resistance,
        volume_confirmation: breakout_confirmed,
    };

    let failures = conditions.failures();
    if !failures.is_empty() {
        let reason = format!("Failed conditions: {}", failures.join(", "));
        return Analysis::skip(symbol, Some(conditions), prices, reason);
    }

    let entry = current.max(resistance);
    let stop = swing * STOP_LOSS_BUFFER;
    let risk_per_share = entry - stop;
    if risk_per_share <= 0.0 {
        return Analysis::skip(
            symbol,
            Some(conditions),
            prices,
            format!("Stop {stop:.2} is not below entry {entry:.2}"),
        );
    }
    let target = entry + TARGET_MULTIPLIER * risk_per_share;

    prices.entry = Some(entry);
    prices.stop = Some(stop);
    prices.risk_per_share = Some(risk_per_share);
    prices.target = Some(target);

    let risk_amount = capital * RISK_PER_TRADE;
    let shares = (risk_amount / risk_per_share).floor().max(0.0) as u64;
    let position = Position {
        capital,
        risk_amount,
        shares,
        value: shares as f64 * entry,
        actual_risk: shares as f64 * risk_per_share,
        potential_profit: shares as f64 * TARGET_MULTIPLIER * risk_per_share,
    };

    tracing::debug!(%symbol, entry, stop, target, shares, "setup valid");

    Analysis {
        symbol: symbol.to_string(),
        setup_valid: true,
        conditions: Some(conditions),
        prices,
        position: Some(position),
        verdict: Verdict::ValidTrade,
        reason: "All conditions met".to_string(),
    }
}
