//! Trading signal levels drawn on top of the price series.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::domain::market_data::Timestamp;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr, Serialize, Deserialize,
)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    #[serde(alias = "long", alias = "Long", alias = "BUY", alias = "buy")]
    Long,
    #[serde(alias = "short", alias = "Short", alias = "SELL", alias = "sell")]
    Short,
}

/// Kind of horizontal level a signal defines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
pub enum LevelKind {
    #[strum(serialize = "TP1")]
    TakeProfit1,
    #[strum(serialize = "TP2")]
    TakeProfit2,
    #[strum(serialize = "TP3")]
    TakeProfit3,
    #[strum(serialize = "SL")]
    StopLoss,
}

impl LevelKind {
    pub fn is_take_profit(&self) -> bool {
        !matches!(self, LevelKind::StopLoss)
    }
}

/// Price levels of one trading signal. Read-only for the lifetime of a chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalLevels {
    pub side: Side,
    #[serde(alias = "entryMin")]
    pub entry_min: f64,
    #[serde(alias = "entryMax")]
    pub entry_max: f64,
    pub tp1: f64,
    pub tp2: f64,
    #[serde(default)]
    pub tp3: Option<f64>,
    pub sl: f64,
    #[serde(alias = "postedAt")]
    pub posted_at: Timestamp,
}

fn usable(price: f64) -> Option<f64> {
    (price.is_finite() && price != 0.0).then_some(price)
}

impl SignalLevels {
    /// Entry zone bounds ordered low..high
    pub fn entry_zone(&self) -> Option<(f64, f64)> {
        let lo = usable(self.entry_min)?;
        let hi = usable(self.entry_max)?;
        Some((lo.min(hi), lo.max(hi)))
    }

    pub fn entry_mid(&self) -> Option<f64> {
        self.entry_zone().map(|(lo, hi)| (lo + hi) / 2.0)
    }

    /// Horizontal levels, skipping empty or zero fields
    pub fn levels(&self) -> Vec<(LevelKind, f64)> {
        [
            (LevelKind::TakeProfit1, Some(self.tp1)),
            (LevelKind::TakeProfit2, Some(self.tp2)),
            (LevelKind::TakeProfit3, self.tp3),
            (LevelKind::StopLoss, Some(self.sl)),
        ]
        .into_iter()
        .filter_map(|(kind, price)| price.and_then(usable).map(|p| (kind, p)))
        .collect()
    }

    /// Every non-empty price this signal contributes to the visible range
    pub fn price_levels(&self) -> Vec<f64> {
        let mut prices: Vec<f64> =
            [usable(self.entry_min), usable(self.entry_max)].into_iter().flatten().collect();
        prices.extend(self.levels().into_iter().map(|(_, p)| p));
        prices
    }

    /// Reward to first target over risk to the stop, measured from the entry midpoint
    pub fn risk_reward(&self) -> Option<f64> {
        let mid = self.entry_mid()?;
        let risk = (mid - usable(self.sl)?).abs();
        let reward = (usable(self.tp1)? - mid).abs();
        (risk > 0.0).then(|| reward / risk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn levels() -> SignalLevels {
        SignalLevels {
            side: Side::Long,
            entry_min: 100.0,
            entry_max: 102.0,
            tp1: 105.0,
            tp2: 110.0,
            tp3: None,
            sl: 96.0,
            posted_at: Timestamp::from_secs(0),
        }
    }

    #[test]
    fn price_levels_skip_missing_and_zero() {
        let mut signal = levels();
        signal.tp2 = 0.0;
        assert_eq!(signal.price_levels(), vec![100.0, 102.0, 105.0, 96.0]);
    }

    #[test]
    fn risk_reward_from_mid() {
        let rr = levels().risk_reward().unwrap();
        assert!((rr - 4.0 / 5.0).abs() < 1e-9);
    }

    #[test]
    fn deserializes_snake_and_camel_case() {
        let snake = r#"{"side":"LONG","entry_min":1,"entry_max":2,"tp1":3,"tp2":4,"sl":0.5,"posted_at":10}"#;
        let camel = r#"{"side":"short","entryMin":1,"entryMax":2,"tp1":3,"tp2":4,"tp3":5,"sl":0.5,"postedAt":10}"#;
        let a: SignalLevels = serde_json::from_str(snake).unwrap();
        let b: SignalLevels = serde_json::from_str(camel).unwrap();
        assert_eq!(a.side, Side::Long);
        assert_eq!(b.side, Side::Short);
        assert_eq!(b.tp3, Some(5.0));
        assert_eq!(a.posted_at.value(), 10);
    }
}
