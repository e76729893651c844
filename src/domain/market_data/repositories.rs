use std::future::Future;

use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::domain::errors::ChartResult;
use crate::domain::market_data::{Candle, SignalId, TimeInterval};
use crate::domain::signal::SignalLevels;

/// Selection key a candle series is loaded for
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[display(fmt = "{}@{}", signal_id, interval)]
pub struct SeriesKey {
    pub signal_id: SignalId,
    pub interval: TimeInterval,
}

impl SeriesKey {
    pub fn new(signal_id: SignalId, interval: TimeInterval) -> Self {
        Self { signal_id, interval }
    }
}

/// Successful response of the market-data collaborator
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarketDataPayload {
    pub candles: Vec<Candle>,
    pub signal: Option<SignalLevels>,
    pub source: Option<String>,
}

/// Interface for fetching candles for a signal
pub trait MarketDataSource {
    fn fetch_candles(&self, key: &SeriesKey) -> impl Future<Output = ChartResult<MarketDataPayload>>;
}

impl<T: MarketDataSource> MarketDataSource for std::rc::Rc<T> {
    fn fetch_candles(&self, key: &SeriesKey) -> impl Future<Output = ChartResult<MarketDataPayload>> {
        (**self).fetch_candles(key)
    }
}
