use derive_more::{Constructor, Deref, Display, From, Into};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use strum::{AsRefStr, Display as StrumDisplay, EnumIter, EnumString};

use crate::domain::errors::{ChartError, ChartResult};

/// Value Object - price level
#[derive(Debug, Clone, Copy, PartialEq, From, Into, Deref, Constructor, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(f64);

impl Price {
    pub fn value(&self) -> f64 {
        self.0
    }
}

impl PartialOrd for Price {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.0.partial_cmp(&other.0)
    }
}

/// Value Object - traded volume
#[derive(Debug, Clone, Copy, PartialEq, From, Into, Deref, Constructor, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Volume(f64);

impl Volume {
    pub fn value(&self) -> f64 {
        self.0
    }
}

/// Value Object - timestamp in whole seconds since the Unix epoch
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    From,
    Into,
    Deref,
    Constructor,
    Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    pub fn from_secs(secs: i64) -> Self {
        Self(secs)
    }

    /// Convert a millisecond epoch value, truncating towards the start of the second
    pub fn from_millis(millis: i64) -> Self {
        Self(millis.div_euclid(1000))
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn as_f64(&self) -> f64 {
        self.0 as f64
    }

    pub fn offset(&self, secs: i64) -> Self {
        Self(self.0.saturating_add(secs))
    }
}

/// Value Object - OHLCV data
#[derive(Debug, Clone, Copy, PartialEq, Constructor, Serialize, Deserialize)]
pub struct OHLCV {
    pub open: Price,
    pub high: Price,
    pub low: Price,
    pub close: Price,
    pub volume: Volume,
}

impl OHLCV {
    /// `low <= min(open, close) <= max(open, close) <= high`, finite, volume non-negative
    pub fn is_valid(&self) -> bool {
        let values = [self.open.value(), self.high.value(), self.low.value(), self.close.value()];
        if values.iter().any(|v| !v.is_finite()) {
            return false;
        }
        self.low <= self.open
            && self.low <= self.close
            && self.high >= self.open
            && self.high >= self.close
            && self.volume.value().is_finite()
            && self.volume.value() >= 0.0
    }
}

/// Value Object - identifier of the trading signal a chart is bound to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deref, Display, Serialize, Deserialize)]
#[display(fmt = "{}", _0)]
#[serde(transparent)]
pub struct SignalId(String);

impl SignalId {
    pub fn new(id: impl Into<String>) -> ChartResult<Self> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(ChartError::Validation("signal id cannot be empty".to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn value(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SignalId {
    fn from(value: &str) -> Self {
        Self(value.trim().to_string())
    }
}

/// Value Object - candle bucket size understood by the market-data service
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    StrumDisplay,
    EnumIter,
    EnumString,
    AsRefStr,
    Serialize,
    Deserialize,
)]
pub enum TimeInterval {
    #[strum(serialize = "1s")]
    #[serde(rename = "1s")]
    OneSecond,

    #[strum(serialize = "1m")]
    #[serde(rename = "1m")]
    OneMinute,

    #[strum(serialize = "3m")]
    #[serde(rename = "3m")]
    ThreeMinutes,

    #[strum(serialize = "5m")]
    #[serde(rename = "5m")]
    FiveMinutes,

    #[strum(serialize = "15m")]
    #[serde(rename = "15m")]
    FifteenMinutes,

    #[strum(serialize = "30m")]
    #[serde(rename = "30m")]
    ThirtyMinutes,

    #[default]
    #[strum(serialize = "1h")]
    #[serde(rename = "1h")]
    OneHour,

    #[strum(serialize = "2h")]
    #[serde(rename = "2h")]
    TwoHours,

    #[strum(serialize = "4h")]
    #[serde(rename = "4h")]
    FourHours,

    #[strum(serialize = "1d")]
    #[serde(rename = "1d")]
    OneDay,
}

impl TimeInterval {
    pub fn duration_secs(&self) -> i64 {
        match self {
            Self::OneSecond => 1,
            Self::OneMinute => 60,
            Self::ThreeMinutes => 3 * 60,
            Self::FiveMinutes => 5 * 60,
            Self::FifteenMinutes => 15 * 60,
            Self::ThirtyMinutes => 30 * 60,
            Self::OneHour => 60 * 60,
            Self::TwoHours => 2 * 60 * 60,
            Self::FourHours => 4 * 60 * 60,
            Self::OneDay => 24 * 60 * 60,
        }
    }

    /// Start of the bucket containing `ts`
    pub fn align(&self, ts: Timestamp) -> Timestamp {
        let step = self.duration_secs();
        Timestamp::from_secs(ts.value().div_euclid(step) * step)
    }

    pub fn parse(value: &str) -> ChartResult<Self> {
        value
            .parse::<Self>()
            .map_err(|_| ChartError::Validation(format!("unsupported interval: {value}")))
    }
}
