use std::cell::{Ref, RefCell};
use std::rc::Rc;

use super::candle_store::{CandleStore, LoadOutcome};
use super::config::{ChartConfig, LayerToggles};
use super::live_refresh::{self, RefreshHandle, RefreshScheduler};
use crate::domain::chart::{
    ChartState, CoordinateMapper, DomainCalculator, LayoutResolver, PlotLayout, PredictionPoint, PriceDomain, Viewport,
};
use crate::domain::errors::ChartResult;
use crate::domain::events::{ChartEvent, ChartSnapshot, EventDispatcher, InMemoryEventDispatcher, SubscriptionId};
use crate::domain::logging::{self, LogComponent};
use crate::domain::market_data::{Candle, MarketDataSource, MergeOutcome, SeriesKey, SignalId, TimeInterval};
use crate::domain::signal::SignalLevels;
use crate::infrastructure::rendering::{LayerCompositor, Scene};
use crate::{log_debug, log_info};

/// Width assumed until the host reports a measurement
pub const DEFAULT_AVAILABLE_WIDTH: f64 = 800.0;

/// One chart instance: configuration, state, refresh subscription and rendering.
///
/// The engine is the single owner of its [`ChartState`]; instances never share
/// state. Dropping the engine stops the refresh loop and discards any
/// response still in flight.
pub struct ChartEngine<S: MarketDataSource + 'static> {
    config: ChartConfig,
    state: Rc<RefCell<ChartState>>,
    dispatcher: Rc<InMemoryEventDispatcher>,
    store: Rc<CandleStore<S>>,
    scheduler: Rc<dyn RefreshScheduler>,
    refresh: Option<RefreshHandle>,
    resolver: LayoutResolver,
    compositor: LayerCompositor,
    available_width: f64,
}

impl<S: MarketDataSource + 'static> ChartEngine<S> {
    pub fn new(config: ChartConfig, source: S, scheduler: Rc<dyn RefreshScheduler>) -> ChartResult<Self> {
        let config = config.validated()?;
        let resolver = LayoutResolver::new();

        let mut state = ChartState::new(config.max_candles, DomainCalculator::new(config.price_padding_ratio));
        state.layout = resolver.resolve(DEFAULT_AVAILABLE_WIDTH, config.dimensions);
        let state = Rc::new(RefCell::new(state));
        let dispatcher = Rc::new(InMemoryEventDispatcher::new());

        let key = SeriesKey::new(config.signal_id.clone(), config.timeframe);
        let store = Rc::new(CandleStore::new(
            source,
            key,
            Rc::clone(&state),
            Rc::clone(&dispatcher),
            config.fallback_seed,
        ));
        store.set_signal(config.signal_data.clone());

        log_info!(
            LogComponent::Application("ChartEngine"),
            "Chart created for {}@{} ({} candles max)",
            config.signal_id,
            config.timeframe,
            config.max_candles
        );

        Ok(Self {
            compositor: LayerCompositor::new(config.axis_label_count),
            config,
            state,
            dispatcher,
            store,
            scheduler,
            refresh: None,
            resolver,
            available_width: DEFAULT_AVAILABLE_WIDTH,
        })
    }

    pub fn config(&self) -> &ChartConfig {
        &self.config
    }

    pub fn key(&self) -> SeriesKey {
        self.store.current_key()
    }

    pub fn store(&self) -> &Rc<CandleStore<S>> {
        &self.store
    }

    pub fn state(&self) -> Ref<'_, ChartState> {
        self.state.borrow()
    }

    // ---- live refresh ----

    /// Start the refresh loop for the current selection, replacing any running one
    pub fn start(&mut self) {
        self.stop();
        let handle = live_refresh::start(
            Rc::clone(&self.store),
            &*self.scheduler,
            self.store.current_key(),
            self.config.refresh_interval_ms,
        );
        self.refresh = Some(handle);
    }

    pub fn stop(&mut self) {
        if let Some(handle) = self.refresh.take() {
            handle.stop();
        }
    }

    pub fn is_running(&self) -> bool {
        self.refresh.as_ref().is_some_and(|handle| !handle.is_stopped())
    }

    /// Fetch the current selection once, outside the refresh loop
    pub async fn load_now(&self) -> LoadOutcome {
        self.store.refresh_current().await
    }

    /// Switch signal and/or interval. A running refresh loop is restarted for
    /// the new key; responses for the old key are discarded.
    pub fn set_selection(&mut self, signal_id: SignalId, interval: TimeInterval) -> bool {
        let key = SeriesKey::new(signal_id, interval);
        if key == self.store.current_key() {
            return false;
        }

        let was_running = self.refresh.is_some();
        self.stop();
        self.config.signal_id = key.signal_id.clone();
        self.config.timeframe = key.interval;
        self.store.select(key);
        if was_running {
            self.start();
        }
        true
    }

    pub fn set_signal(&mut self, signal: Option<SignalLevels>) {
        self.config.signal_data = signal.clone();
        self.store.set_signal(signal);
    }

    pub fn set_layer_toggles(&mut self, toggles: LayerToggles) {
        self.config.layer_toggles = toggles;
    }

    pub fn ingest_live(&self, candles: Vec<Candle>) -> MergeOutcome {
        self.store.push_live(candles)
    }

    pub fn set_predictions(&self, mut points: Vec<PredictionPoint>) {
        points.sort_by_key(|point| point.timestamp);
        self.state.borrow_mut().predictions = points;
    }

    // ---- viewport ----

    pub fn zoom_in(&self) -> bool {
        self.update_zoom(|zoom, anchor| zoom.zoom_in(anchor))
    }

    pub fn zoom_out(&self) -> bool {
        self.update_zoom(|zoom, anchor| zoom.zoom_out(anchor))
    }

    pub fn reset_zoom(&self) {
        self.update_zoom(|zoom, _| {
            zoom.reset();
            true
        });
    }

    pub fn pan_by(&self, dx: f64) {
        self.update_zoom(|zoom, _| {
            zoom.pan_by(dx);
            true
        });
    }

    /// Apply a zoom change anchored at the horizontal plot center
    fn update_zoom<F>(&self, change: F) -> bool
    where
        F: FnOnce(&mut crate::domain::chart::ZoomController, f64) -> bool,
    {
        let event = {
            let mut state = self.state.borrow_mut();
            let anchor = state.layout.center_x();
            if !change(&mut state.zoom, anchor) {
                return false;
            }
            ChartEvent::ViewportChanged { zoom: state.zoom.zoom(), pan_x: state.zoom.pan_offset().x }
        };
        log_debug!(LogComponent::Application("ChartEngine"), "{:?}", event);
        self.dispatcher.publish_chart_event(event);
        true
    }

    /// Recompute the layout for a new available width
    pub fn resize(&mut self, available_width: f64) -> PlotLayout {
        self.available_width = available_width;
        let layout = self.resolver.resolve(available_width, self.config.dimensions);
        let changed = {
            let mut state = self.state.borrow_mut();
            std::mem::replace(&mut state.layout, layout) != layout
        };
        if changed {
            log_debug!(
                LogComponent::Application("ChartEngine"),
                "Layout {}x{} for available width {}",
                layout.width,
                layout.height,
                available_width
            );
            self.dispatcher.publish_chart_event(ChartEvent::LayoutChanged { width: layout.width, height: layout.height });
        }
        layout
    }

    pub fn available_width(&self) -> f64 {
        self.available_width
    }

    pub fn layout(&self) -> PlotLayout {
        self.state.borrow().layout
    }

    // ---- derived views ----

    pub fn snapshot(&self) -> ChartSnapshot {
        self.store.snapshot()
    }

    pub fn domain(&self) -> PriceDomain {
        self.state.borrow().domain()
    }

    pub fn viewport(&self) -> Viewport {
        self.state.borrow().viewport()
    }

    pub fn mapper(&self) -> CoordinateMapper {
        self.state.borrow().mapper()
    }

    /// Compose the current frame
    pub fn render(&self) -> Scene {
        self.compositor.compose(&self.state.borrow(), &self.config.layer_toggles, logging::now())
    }

    pub fn compositor(&self) -> &LayerCompositor {
        &self.compositor
    }

    pub fn subscribe<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&ChartEvent) + 'static,
    {
        self.dispatcher.subscribe_to_chart_events(handler)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.dispatcher.unsubscribe(id)
    }
}

impl<S: MarketDataSource + 'static> Drop for ChartEngine<S> {
    fn drop(&mut self) {
        self.stop();
        self.store.detach();
        log_debug!(LogComponent::Application("ChartEngine"), "Chart for {} dropped", self.store.current_key());
    }
}
