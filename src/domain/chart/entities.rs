use std::rc::Rc;

use super::coordinates::CoordinateMapper;
use super::price_domain::{DomainCalculator, PriceDomain};
use super::value_objects::PredictionPoint;
use super::viewport::{PlotLayout, Viewport, ZoomController};
use crate::domain::events::{ChartSnapshot, DataSource};
use crate::domain::logging;
use crate::domain::market_data::{CandleSeries, TimeInterval, Timestamp};
use crate::domain::signal::SignalLevels;

/// Aggregate root - everything one chart instance owns.
///
/// The domain is never cached; it is derived from the series and the
/// signal on every call.
#[derive(Debug, Clone)]
pub struct ChartState {
    pub series: CandleSeries,
    pub signal: Option<Rc<SignalLevels>>,
    pub predictions: Vec<PredictionPoint>,
    pub layout: PlotLayout,
    pub zoom: ZoomController,
    pub interval: TimeInterval,
    pub data_source: Option<DataSource>,
    pub loading: bool,
    calculator: DomainCalculator,
}

impl ChartState {
    pub fn new(max_candles: usize, calculator: DomainCalculator) -> Self {
        Self {
            series: CandleSeries::new(max_candles),
            signal: None,
            predictions: Vec::new(),
            layout: PlotLayout::default(),
            zoom: ZoomController::default(),
            interval: TimeInterval::default(),
            data_source: None,
            loading: false,
            calculator,
        }
    }

    pub fn calculator(&self) -> &DomainCalculator {
        &self.calculator
    }

    pub fn has_data(&self) -> bool {
        !self.series.is_empty()
    }

    /// Domain for the current series and signal; `now` anchors the empty-series window
    pub fn domain_at(&self, now: Timestamp) -> PriceDomain {
        self.calculator.compute(self.series.iter(), self.signal.as_deref(), now)
    }

    pub fn domain(&self) -> PriceDomain {
        self.domain_at(logging::now())
    }

    pub fn viewport(&self) -> Viewport {
        self.zoom.viewport(self.layout)
    }

    pub fn mapper_at(&self, now: Timestamp) -> CoordinateMapper {
        CoordinateMapper::new(self.domain_at(now), self.viewport())
    }

    pub fn mapper(&self) -> CoordinateMapper {
        CoordinateMapper::new(self.domain(), self.viewport())
    }

    pub fn snapshot(&self) -> ChartSnapshot {
        ChartSnapshot::from_series(&self.series, self.loading, self.data_source)
    }

    /// Drop everything tied to the previous selection
    pub fn reset_series(&mut self) {
        self.series.clear();
        self.data_source = None;
    }
}

impl Default for ChartState {
    fn default() -> Self {
        Self::new(crate::domain::market_data::DEFAULT_MAX_CANDLES, DomainCalculator::default())
    }
}
