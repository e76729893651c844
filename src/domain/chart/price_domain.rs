use crate::domain::logging::LogComponent;
use crate::domain::market_data::{Candle, Timestamp};
use crate::domain::signal::SignalLevels;
use crate::log_debug;

/// Raw price range used when neither candles nor levels contribute a price
pub const DEFAULT_PRICE_RANGE: (f64, f64) = (0.0, 100.0);
/// Time window used for an empty series, ending now
pub const EMPTY_TIME_WINDOW_SECS: i64 = 3_600;
/// Lower bound of the injected padding when the price range collapses
pub const MIN_ABSOLUTE_PADDING: f64 = 1e-6;
pub const MIN_PADDING_RATIO: f64 = 0.05;
pub const MAX_PADDING_RATIO: f64 = 0.10;

/// Visible price/time ranges before pixel mapping.
///
/// After the calculator runs `price_max > price_min` and `time_max >= time_min`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceDomain {
    pub price_min: f64,
    pub price_max: f64,
    pub time_min: Timestamp,
    pub time_max: Timestamp,
}

impl PriceDomain {
    pub fn price_span(&self) -> f64 {
        self.price_max - self.price_min
    }

    pub fn time_span(&self) -> i64 {
        self.time_max.value() - self.time_min.value()
    }

    pub fn contains_price(&self, price: f64) -> bool {
        price >= self.price_min && price <= self.price_max
    }
}

/// Derives the visible domain from candles and signal levels
#[derive(Debug, Clone, Copy)]
pub struct DomainCalculator {
    padding_ratio: f64,
}

impl Default for DomainCalculator {
    fn default() -> Self {
        Self { padding_ratio: MIN_PADDING_RATIO }
    }
}

impl DomainCalculator {
    /// `padding_ratio` is clamped to `0.05..=0.10`
    pub fn new(padding_ratio: f64) -> Self {
        let padding_ratio = if padding_ratio.is_finite() {
            padding_ratio.clamp(MIN_PADDING_RATIO, MAX_PADDING_RATIO)
        } else {
            MIN_PADDING_RATIO
        };
        Self { padding_ratio }
    }

    pub fn padding_ratio(&self) -> f64 {
        self.padding_ratio
    }

    pub fn compute<'a, I>(&self, candles: I, levels: Option<&SignalLevels>, now: Timestamp) -> PriceDomain
    where
        I: IntoIterator<Item = &'a Candle>,
    {
        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        let mut time_bounds: Option<(Timestamp, Timestamp)> = None;

        let mut include = |price: f64| {
            if price.is_finite() {
                lo = lo.min(price);
                hi = hi.max(price);
            }
        };

        for candle in candles {
            let o = &candle.ohlcv;
            for price in [o.high.value(), o.low.value(), o.open.value(), o.close.value()] {
                include(price);
            }
            time_bounds = Some(match time_bounds {
                None => (candle.timestamp, candle.timestamp),
                Some((start, end)) => (start.min(candle.timestamp), end.max(candle.timestamp)),
            });
        }

        if let Some(levels) = levels {
            for price in levels.price_levels() {
                include(price);
            }
        }

        if lo > hi {
            (lo, hi) = DEFAULT_PRICE_RANGE;
        }

        let (price_min, price_max) = self.pad(lo, hi);
        let (time_min, time_max) =
            time_bounds.unwrap_or_else(|| (now.offset(-EMPTY_TIME_WINDOW_SECS), now));

        PriceDomain { price_min, price_max, time_min, time_max }
    }

    fn pad(&self, lo: f64, hi: f64) -> (f64, f64) {
        let padding = (hi - lo) * self.padding_ratio;
        let (min, max) = (lo - padding, hi + padding);
        if padding > 0.0 && max > min {
            return (min, max);
        }

        let fallback = (hi.abs() * 0.001).max(MIN_ABSOLUTE_PADDING);
        log_debug!(
            LogComponent::Domain("DomainCalculator"),
            "Degenerate price range at {}, injecting ±{} padding",
            hi,
            fallback
        );
        (lo - fallback, hi + fallback)
    }
}
