use serde::{Deserialize, Serialize};

use crate::domain::chart::{Dimensions, MAX_PADDING_RATIO, MIN_PADDING_RATIO};
use crate::domain::errors::{ChartError, ChartResult};
use crate::domain::market_data::{DEFAULT_MAX_CANDLES, SignalId, TimeInterval};
use crate::domain::signal::SignalLevels;

pub const DEFAULT_REFRESH_INTERVAL_MS: u32 = 15_000;
pub const MIN_REFRESH_INTERVAL_MS: u32 = 1_000;
pub const MIN_CANDLES: usize = 100;
pub const MAX_CANDLES: usize = 2_000;
pub const DEFAULT_AXIS_LABEL_COUNT: usize = 5;
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/api/";

fn enabled() -> bool {
    true
}

/// Per-layer visibility flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerToggles {
    #[serde(default = "enabled")]
    pub grid: bool,
    #[serde(default = "enabled")]
    pub axes: bool,
    #[serde(default = "enabled")]
    pub candles: bool,
    #[serde(default = "enabled")]
    pub predictions: bool,
    #[serde(default = "enabled")]
    pub signals: bool,
}

impl Default for LayerToggles {
    fn default() -> Self {
        Self { grid: true, axes: true, candles: true, predictions: true, signals: true }
    }
}

/// Configuration surface of one chart instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartConfig {
    pub signal_id: SignalId,
    #[serde(default)]
    pub signal_data: Option<SignalLevels>,
    #[serde(default)]
    pub layer_toggles: LayerToggles,
    #[serde(default)]
    pub timeframe: TimeInterval,
    #[serde(default = "default_refresh_interval_ms")]
    pub refresh_interval_ms: u32,
    #[serde(default)]
    pub dimensions: Option<Dimensions>,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_max_candles")]
    pub max_candles: usize,
    #[serde(default = "default_padding_ratio")]
    pub price_padding_ratio: f64,
    #[serde(default = "default_axis_label_count")]
    pub axis_label_count: usize,
    #[serde(default)]
    pub fallback_seed: Option<u64>,
}

fn default_refresh_interval_ms() -> u32 {
    DEFAULT_REFRESH_INTERVAL_MS
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_max_candles() -> usize {
    DEFAULT_MAX_CANDLES
}

fn default_padding_ratio() -> f64 {
    MIN_PADDING_RATIO
}

fn default_axis_label_count() -> usize {
    DEFAULT_AXIS_LABEL_COUNT
}

impl ChartConfig {
    pub fn new(signal_id: SignalId) -> Self {
        Self {
            signal_id,
            signal_data: None,
            layer_toggles: LayerToggles::default(),
            timeframe: TimeInterval::default(),
            refresh_interval_ms: DEFAULT_REFRESH_INTERVAL_MS,
            dimensions: None,
            base_url: default_base_url(),
            max_candles: DEFAULT_MAX_CANDLES,
            price_padding_ratio: MIN_PADDING_RATIO,
            axis_label_count: DEFAULT_AXIS_LABEL_COUNT,
            fallback_seed: None,
        }
    }

    /// Parse and normalize a JSON configuration
    pub fn from_json(json: &str) -> ChartResult<Self> {
        let config: ChartConfig =
            serde_json::from_str(json).map_err(|e| ChartError::Validation(format!("invalid chart config: {e}")))?;
        config.validated()
    }

    /// Reject unusable values and clamp the tunable ones into range
    pub fn validated(mut self) -> ChartResult<Self> {
        self.signal_id = SignalId::new(self.signal_id.value())?;
        if self.base_url.trim().is_empty() {
            return Err(ChartError::Validation("base url cannot be empty".to_string()));
        }

        self.max_candles = self.max_candles.clamp(MIN_CANDLES, MAX_CANDLES);
        self.refresh_interval_ms = self.refresh_interval_ms.max(MIN_REFRESH_INTERVAL_MS);
        self.axis_label_count = self.axis_label_count.max(2);
        self.price_padding_ratio = if self.price_padding_ratio.is_finite() {
            self.price_padding_ratio.clamp(MIN_PADDING_RATIO, MAX_PADDING_RATIO)
        } else {
            MIN_PADDING_RATIO
        };
        Ok(self)
    }

    pub fn with_timeframe(mut self, timeframe: TimeInterval) -> Self {
        self.timeframe = timeframe;
        self
    }

    pub fn with_signal(mut self, signal: SignalLevels) -> Self {
        self.signal_data = Some(signal);
        self
    }

    pub fn with_fallback_seed(mut self, seed: u64) -> Self {
        self.fallback_seed = Some(seed);
        self
    }
}
