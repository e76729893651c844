use std::cell::{Cell, RefCell};
use std::fmt::Debug;

use serde::Serialize;
use strum::{AsRefStr, Display};

use crate::domain::market_data::{Candle, CandleSeries, SeriesKey};

/// Where the current candles came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    Api,
    Mock,
}

/// Observable state the page shell renders around the chart
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartSnapshot {
    pub candles: Vec<Candle>,
    pub current_price: Option<f64>,
    pub price_change_pct: f64,
    pub loading: bool,
    pub data_source: Option<DataSource>,
}

impl ChartSnapshot {
    pub fn from_series(series: &CandleSeries, loading: bool, data_source: Option<DataSource>) -> Self {
        Self {
            candles: series.to_vec(),
            current_price: series.get_latest_price().map(|p| p.value()),
            price_change_pct: series.change_pct(),
            loading,
            data_source,
        }
    }
}

/// Base trait for all domain events
pub trait DomainEvent: Debug + Clone {
    fn event_type(&self) -> &'static str;
}

/// Events emitted by one chart instance
#[derive(Debug, Clone, PartialEq)]
pub enum ChartEvent {
    SnapshotUpdated(ChartSnapshot),
    StaleResponseDiscarded { key: SeriesKey },
    ViewportChanged { zoom: f64, pan_x: f64 },
    LayoutChanged { width: f64, height: f64 },
}

impl DomainEvent for ChartEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ChartEvent::SnapshotUpdated(_) => "SnapshotUpdated",
            ChartEvent::StaleResponseDiscarded { .. } => "StaleResponseDiscarded",
            ChartEvent::ViewportChanged { .. } => "ViewportChanged",
            ChartEvent::LayoutChanged { .. } => "LayoutChanged",
        }
    }
}

/// Event dispatcher for publishing events
pub trait EventDispatcher {
    fn publish_chart_event(&self, event: ChartEvent);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type ChartHandler = Box<dyn Fn(&ChartEvent)>;

/// Single-threaded in-memory dispatcher owned by one chart instance.
///
/// Handlers must not subscribe or unsubscribe while being invoked.
#[derive(Default)]
pub struct InMemoryEventDispatcher {
    chart_handlers: RefCell<Vec<(SubscriptionId, ChartHandler)>>,
    next_id: Cell<u64>,
}

impl InMemoryEventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe_to_chart_events<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&ChartEvent) + 'static,
    {
        let id = SubscriptionId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.chart_handlers.borrow_mut().push((id, Box::new(handler)));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut handlers = self.chart_handlers.borrow_mut();
        let before = handlers.len();
        handlers.retain(|(existing, _)| *existing != id);
        handlers.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.chart_handlers.borrow().len()
    }
}

impl EventDispatcher for InMemoryEventDispatcher {
    fn publish_chart_event(&self, event: ChartEvent) {
        for (_, handler) in self.chart_handlers.borrow().iter() {
            handler(&event);
        }
    }
}
