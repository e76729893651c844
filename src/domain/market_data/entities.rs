pub use super::value_objects::{OHLCV, Price, Timestamp, Volume};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Domain entity - Candle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: Timestamp,
    pub ohlcv: OHLCV,
}

impl Candle {
    pub fn new(timestamp: Timestamp, ohlcv: OHLCV) -> Self {
        Self { timestamp, ohlcv }
    }

    /// Build a candle from plain numbers (seconds, open, high, low, close, volume)
    pub fn from_values(ts: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self::new(
            Timestamp::from_secs(ts),
            OHLCV::new(
                Price::from(open),
                Price::from(high),
                Price::from(low),
                Price::from(close),
                Volume::from(volume),
            ),
        )
    }

    pub fn is_bullish(&self) -> bool {
        self.ohlcv.close > self.ohlcv.open
    }

    pub fn is_bearish(&self) -> bool {
        self.ohlcv.close < self.ohlcv.open
    }

    pub fn body_top(&self) -> f64 {
        self.ohlcv.open.value().max(self.ohlcv.close.value())
    }

    pub fn body_bottom(&self) -> f64 {
        self.ohlcv.open.value().min(self.ohlcv.close.value())
    }
}

/// Result of merging live candles into a series
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    pub replaced: usize,
    pub appended: usize,
    pub ignored: usize,
    pub evicted: usize,
}

impl MergeOutcome {
    pub fn changed(&self) -> bool {
        self.replaced > 0 || self.appended > 0
    }
}

pub const DEFAULT_MAX_CANDLES: usize = 500;

/// Domain entity - ordered, capped candle series
///
/// Candles are kept ascending by timestamp without duplicates. Once the cap is
/// exceeded the oldest entries are dropped.
#[derive(Debug, Clone)]
pub struct CandleSeries {
    candles: VecDeque<Candle>,
    max_size: usize,
}

impl CandleSeries {
    pub fn new(max_size: usize) -> Self {
        let max_size = max_size.max(1);
        Self { candles: VecDeque::with_capacity(max_size.min(4096)), max_size }
    }

    /// Replace the whole series with an authoritative snapshot.
    ///
    /// The input is sorted and de-duplicated (last write for a timestamp wins)
    /// before the cap is applied.
    pub fn replace_all(&mut self, mut candles: Vec<Candle>) -> usize {
        candles.sort_by_key(|c| c.timestamp);

        let mut deduped: VecDeque<Candle> = VecDeque::with_capacity(candles.len());
        for candle in candles {
            match deduped.back_mut() {
                Some(last) if last.timestamp == candle.timestamp => *last = candle,
                _ => deduped.push_back(candle),
            }
        }

        let evicted = deduped.len().saturating_sub(self.max_size);
        deduped.drain(..evicted);
        self.candles = deduped;
        evicted
    }

    /// Merge streamed candles: same timestamp as the tail replaces it, strictly
    /// newer ones are appended, anything older is ignored.
    pub fn merge_live<I>(&mut self, candles: I) -> MergeOutcome
    where
        I: IntoIterator<Item = Candle>,
    {
        let mut outcome = MergeOutcome::default();

        for candle in candles {
            match self.candles.back_mut() {
                Some(last) if last.timestamp == candle.timestamp => {
                    *last = candle;
                    outcome.replaced += 1;
                }
                Some(last) if candle.timestamp < last.timestamp => {
                    outcome.ignored += 1;
                }
                _ => {
                    self.candles.push_back(candle);
                    outcome.appended += 1;
                }
            }
        }

        outcome.evicted = self.trim();
        outcome
    }

    fn trim(&mut self) -> usize {
        let excess = self.candles.len().saturating_sub(self.max_size);
        self.candles.drain(..excess);
        excess
    }

    pub fn clear(&mut self) {
        self.candles.clear();
    }

    pub fn get_candles(&self) -> &VecDeque<Candle> {
        &self.candles
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Candle> + ExactSizeIterator {
        self.candles.iter()
    }

    pub fn to_vec(&self) -> Vec<Candle> {
        self.candles.iter().cloned().collect()
    }

    pub fn first(&self) -> Option<&Candle> {
        self.candles.front()
    }

    pub fn latest(&self) -> Option<&Candle> {
        self.candles.back()
    }

    pub fn count(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    /// Maximum number of candles kept
    pub fn capacity(&self) -> usize {
        self.max_size
    }

    pub fn get_latest_price(&self) -> Option<Price> {
        self.candles.back().map(|candle| candle.ohlcv.close)
    }

    pub fn max_volume(&self) -> f64 {
        self.candles.iter().map(|c| c.ohlcv.volume.value()).fold(0.0, f64::max)
    }

    /// Percentage move from the first open to the latest close
    pub fn change_pct(&self) -> f64 {
        match (self.candles.front(), self.candles.back()) {
            (Some(first), Some(last)) if first.ohlcv.open.value() != 0.0 => {
                let open = first.ohlcv.open.value();
                (last.ohlcv.close.value() - open) / open * 100.0
            }
            _ => 0.0,
        }
    }
}

impl Default for CandleSeries {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CANDLES)
    }
}
