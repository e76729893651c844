use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::domain::market_data::{Candle, TimeInterval, Timestamp};

/// Base price used when nothing better is known
pub const DEFAULT_BASE_PRICE: f64 = 100.0;

/// Seeded random-walk generator for placeholder candles.
///
/// Each step moves the close by `±volatility` plus `trend` (both relative to the
/// current price); wicks extend up to half the volatility beyond the body.
#[derive(Debug, Clone)]
pub struct SyntheticCandleGenerator {
    rng: StdRng,
    base_price: f64,
    volatility: f64,
    trend: f64,
    volume_range: (f64, f64),
}

impl SyntheticCandleGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            base_price: DEFAULT_BASE_PRICE,
            volatility: 0.004,
            trend: 0.0002,
            volume_range: (100.0, 1_000.0),
        }
    }

    pub fn with_base_price(mut self, base_price: f64) -> Self {
        if base_price.is_finite() && base_price > 0.0 {
            self.base_price = base_price;
        }
        self
    }

    /// `count` candles, one per interval bucket, the last one in the bucket containing `end`
    pub fn generate(&mut self, count: usize, interval: TimeInterval, end: Timestamp) -> Vec<Candle> {
        let step = interval.duration_secs();
        let last_bucket = interval.align(end).value();
        let floor = self.base_price * 0.01;

        let mut price = self.base_price;
        let mut candles = Vec::with_capacity(count);

        for i in 0..count {
            let ts = last_bucket - (count - 1 - i) as i64 * step;
            let open = price;
            let drift = self.rng.random_range(-self.volatility..self.volatility) + self.trend;
            let close = (open * (1.0 + drift)).max(floor);

            let upper = self.rng.random_range(0.0..1.0) * self.volatility * 0.5 * open;
            let lower = self.rng.random_range(0.0..1.0) * self.volatility * 0.5 * open;
            let high = open.max(close) + upper;
            let low = (open.min(close) - lower).max(floor.min(open.min(close)));

            let volume = self.rng.random_range(self.volume_range.0..self.volume_range.1);

            candles.push(Candle::from_values(ts, open, high, low, close, volume));
            price = close;
        }

        candles
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::market_data::services::DataValidationService;

    #[test]
    fn same_seed_same_series() {
        let end = Timestamp::from_secs(1_700_000_000);
        let a = SyntheticCandleGenerator::new(7).generate(50, TimeInterval::OneMinute, end);
        let b = SyntheticCandleGenerator::new(7).generate(50, TimeInterval::OneMinute, end);
        let c = SyntheticCandleGenerator::new(8).generate(50, TimeInterval::OneMinute, end);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn generated_candles_are_valid_and_ordered() {
        let end = Timestamp::from_secs(1_700_000_123);
        let candles = SyntheticCandleGenerator::new(42)
            .with_base_price(25_000.0)
            .generate(200, TimeInterval::FiveMinutes, end);

        let validator = DataValidationService::new();
        assert_eq!(candles.len(), 200);
        assert!(validator.validate_candle_sequence(&candles).is_ok());
        for c in &candles {
            assert!(validator.validate_candle(c).is_ok(), "{c:?}");
        }
        assert_eq!(candles.last().unwrap().timestamp, TimeInterval::FiveMinutes.align(end));
        assert_eq!(candles[0].ohlcv.open.value(), 25_000.0);
    }

    #[test]
    fn zero_count_is_empty() {
        let candles = SyntheticCandleGenerator::new(1).generate(0, TimeInterval::OneHour, Timestamp::from_secs(0));
        assert!(candles.is_empty());
    }
}
