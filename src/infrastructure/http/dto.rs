use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::domain::errors::{ChartError, ChartResult};
use crate::domain::logging::LogComponent;
use crate::domain::market_data::{Candle, MarketDataPayload, Timestamp};
use crate::domain::signal::SignalLevels;
use crate::log_warn;

/// Timestamps above this are treated as milliseconds
pub const MILLIS_THRESHOLD: f64 = 1e12;

/// Numeric field that may arrive as a JSON number or a decimal string
fn flexible_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(value) => Ok(value),
        Raw::Text(text) => text.trim().parse::<f64>().map_err(serde::de::Error::custom),
    }
}

fn flexible_volume<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Value>::deserialize(deserializer)?
        .map(|value| flexible_f64(value).map_err(serde::de::Error::custom))
        .unwrap_or(Ok(0.0))
}

/// One candle as sent by the market-data service
#[derive(Debug, Clone, Deserialize)]
pub struct CandleDto {
    #[serde(alias = "time", alias = "t", deserialize_with = "flexible_f64")]
    pub timestamp: f64,
    #[serde(alias = "o", deserialize_with = "flexible_f64")]
    pub open: f64,
    #[serde(alias = "h", deserialize_with = "flexible_f64")]
    pub high: f64,
    #[serde(alias = "l", deserialize_with = "flexible_f64")]
    pub low: f64,
    #[serde(alias = "c", deserialize_with = "flexible_f64")]
    pub close: f64,
    #[serde(default, alias = "v", deserialize_with = "flexible_volume")]
    pub volume: f64,
}

impl CandleDto {
    pub fn timestamp(&self) -> ChartResult<Timestamp> {
        if !self.timestamp.is_finite() || self.timestamp < 0.0 {
            return Err(ChartError::MalformedResponse(format!("invalid timestamp {}", self.timestamp)));
        }
        let ts = self.timestamp as i64;
        Ok(if self.timestamp > MILLIS_THRESHOLD { Timestamp::from_millis(ts) } else { Timestamp::from_secs(ts) })
    }

    pub fn to_candle(&self) -> ChartResult<Candle> {
        let ts = self.timestamp()?;
        Ok(Candle::from_values(ts.value(), self.open, self.high, self.low, self.close, self.volume))
    }
}

/// `{ candles, signal?, source?, error? }`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CandleResponseDto {
    #[serde(default)]
    pub candles: Option<Vec<CandleDto>>,
    #[serde(default)]
    pub signal: Option<Value>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl CandleResponseDto {
    pub fn into_payload(self) -> ChartResult<MarketDataPayload> {
        let candles = match (self.candles, self.error) {
            (Some(candles), Some(error)) if !candles.is_empty() => {
                log_warn!(
                    LogComponent::Infrastructure("CandleResponse"),
                    "Response carries error '{}' next to {} candles, using the candles",
                    error,
                    candles.len()
                );
                candles
            }
            (_, Some(error)) => return Err(ChartError::Network(format!("market data service error: {error}"))),
            (None, None) => return Err(ChartError::MalformedResponse("missing candles".to_string())),
            (Some(candles), None) if candles.is_empty() => return Err(ChartError::EmptySeries),
            (Some(candles), None) => candles,
        };

        let candles = candles.iter().map(CandleDto::to_candle).collect::<ChartResult<Vec<_>>>()?;
        let signal = self.signal.and_then(|value| match serde_json::from_value::<SignalLevels>(value) {
            Ok(signal) => Some(signal),
            Err(e) => {
                log_warn!(LogComponent::Infrastructure("CandleResponse"), "Ignoring malformed signal: {}", e);
                None
            }
        });

        Ok(MarketDataPayload { candles, signal, source: self.source })
    }
}

/// Parse a `/candles` response body
pub fn parse_candle_response(body: &str) -> ChartResult<MarketDataPayload> {
    let dto: CandleResponseDto = serde_json::from_str(body)?;
    dto.into_payload()
}
