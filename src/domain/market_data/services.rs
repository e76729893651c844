use crate::domain::errors::{ChartError, ChartResult};
use crate::domain::logging::LogComponent;
use crate::domain::market_data::Candle;
use crate::log_warn;

/// Domain service for validating incoming candles
#[derive(Debug, Clone, Default)]
pub struct DataValidationService;

impl DataValidationService {
    pub fn new() -> Self {
        Self
    }

    /// Validate a single candle with a descriptive error
    pub fn validate_candle(&self, candle: &Candle) -> ChartResult<()> {
        let o = candle.ohlcv.open.value();
        let h = candle.ohlcv.high.value();
        let l = candle.ohlcv.low.value();
        let c = candle.ohlcv.close.value();
        let v = candle.ohlcv.volume.value();

        if ![o, h, l, c, v].iter().all(|x| x.is_finite()) {
            return Err(ChartError::Validation(format!(
                "candle {} has non-finite values",
                candle.timestamp.value()
            )));
        }
        if h < l {
            return Err(ChartError::Validation("High price cannot be lower than low price".into()));
        }
        if h < o.max(c) {
            return Err(ChartError::Validation("High price must cover open and close".into()));
        }
        if l > o.min(c) {
            return Err(ChartError::Validation("Low price must cover open and close".into()));
        }
        if v < 0.0 {
            return Err(ChartError::Validation("Volume cannot be negative".into()));
        }

        Ok(())
    }

    /// Strictly ascending timestamps
    pub fn validate_candle_sequence(&self, candles: &[Candle]) -> ChartResult<()> {
        for (i, pair) in candles.windows(2).enumerate() {
            if pair[1].timestamp <= pair[0].timestamp {
                return Err(ChartError::Validation(format!(
                    "Candles are not in chronological order at index {}",
                    i + 1
                )));
            }
        }
        Ok(())
    }

    /// Drop candles that break the OHLC invariant; ordering is left to the series
    pub fn sanitize(&self, candles: Vec<Candle>) -> Vec<Candle> {
        let before = candles.len();
        let valid: Vec<Candle> =
            candles.into_iter().filter(|c| self.validate_candle(c).is_ok()).collect();

        let dropped = before - valid.len();
        if dropped > 0 {
            log_warn!(
                LogComponent::Domain("DataValidation"),
                "Dropped {} invalid candles out of {}",
                dropped,
                before
            );
        }

        valid
    }
}
