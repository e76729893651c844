use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::domain::chart::ChartState;
use crate::domain::errors::{ChartError, ChartResult};
use crate::domain::events::{ChartEvent, ChartSnapshot, DataSource, EventDispatcher, InMemoryEventDispatcher};
use crate::domain::logging::{self, LogComponent};
use crate::domain::market_data::{
    Candle, DEFAULT_BASE_PRICE, DataValidationService, MarketDataPayload, MarketDataSource, MergeOutcome, SeriesKey,
    SyntheticCandleGenerator,
};
use crate::domain::signal::SignalLevels;
use crate::{log_debug, log_info, log_warn};

/// Number of candles generated when the collaborator cannot deliver any
pub const FALLBACK_CANDLES: usize = 100;

/// Identifies one in-flight request.
///
/// The epoch grows with every selection change, so a response for an older
/// selection is discarded even if the same key was selected again since.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTicket {
    pub key: SeriesKey,
    pub epoch: u64,
    pub id: u64,
}

/// What a finished load did to the chart state
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    /// Series replaced with the collaborator's candles
    Loaded { candles: usize },
    /// Series replaced with synthetic candles after `reason`
    Fallback { candles: usize, reason: ChartError },
    /// Refresh failed but the previous series for this key was kept
    KeptExisting { reason: ChartError },
    /// Response belonged to a superseded selection and was dropped
    Stale,
}

impl LoadOutcome {
    pub fn is_stale(&self) -> bool {
        matches!(self, LoadOutcome::Stale)
    }
}

/// Candle store and live merger.
///
/// Owns the selection key and the stale-response guard; the chart state
/// itself is shared with the engine facade. No `RefCell` borrow is held
/// across an await point.
pub struct CandleStore<S> {
    source: S,
    state: Rc<RefCell<ChartState>>,
    dispatcher: Rc<InMemoryEventDispatcher>,
    validator: DataValidationService,
    current: RefCell<SeriesKey>,
    epoch: Cell<u64>,
    next_ticket: Cell<u64>,
    /// Tickets of the current epoch still waiting for a response
    pending: RefCell<Vec<u64>>,
    pinned_signal: Cell<bool>,
    detached: Cell<bool>,
    fallback_seed: Option<u64>,
}

impl<S: MarketDataSource> CandleStore<S> {
    pub fn new(
        source: S,
        key: SeriesKey,
        state: Rc<RefCell<ChartState>>,
        dispatcher: Rc<InMemoryEventDispatcher>,
        fallback_seed: Option<u64>,
    ) -> Self {
        state.borrow_mut().interval = key.interval;
        Self {
            source,
            state,
            dispatcher,
            validator: DataValidationService::new(),
            current: RefCell::new(key),
            epoch: Cell::new(0),
            next_ticket: Cell::new(0),
            pending: RefCell::new(Vec::new()),
            pinned_signal: Cell::new(false),
            detached: Cell::new(false),
            fallback_seed,
        }
    }

    pub fn current_key(&self) -> SeriesKey {
        self.current.borrow().clone()
    }

    pub fn epoch(&self) -> u64 {
        self.epoch.get()
    }

    pub fn state(&self) -> &Rc<RefCell<ChartState>> {
        &self.state
    }

    pub fn is_detached(&self) -> bool {
        self.detached.get()
    }

    /// Signal supplied by the caller; it is never replaced by one from a response
    pub fn set_signal(&self, signal: Option<SignalLevels>) {
        self.pinned_signal.set(signal.is_some());
        self.state.borrow_mut().signal = signal.map(Rc::new);
    }

    /// Switch to `key`. Returns whether the selection changed.
    ///
    /// A change invalidates every in-flight request and clears the series,
    /// so nothing drawn belongs to the previous selection.
    pub fn select(&self, key: SeriesKey) -> bool {
        let previous = self.current.replace(key.clone());
        if previous == key {
            return false;
        }
        self.epoch.set(self.epoch.get() + 1);
        self.pending.borrow_mut().clear();

        {
            let mut state = self.state.borrow_mut();
            state.reset_series();
            state.loading = false;
            state.interval = key.interval;
            if previous.signal_id != key.signal_id && !self.pinned_signal.get() {
                state.signal = None;
            }
        }

        log_info!(
            LogComponent::Application("CandleStore"),
            "Selection changed {} -> {} (epoch {})",
            previous,
            key,
            self.epoch.get()
        );
        self.publish_snapshot();
        true
    }

    /// Select `key` and load it
    pub async fn load(&self, key: SeriesKey) -> LoadOutcome {
        self.select(key);
        self.refresh_current().await
    }

    /// Reload `key` only while it is still the current selection
    pub async fn refresh(&self, key: &SeriesKey) -> LoadOutcome {
        if !self.is_current(key) {
            return LoadOutcome::Stale;
        }
        self.refresh_current().await
    }

    /// Fetch and apply the current selection.
    ///
    /// Dropping the returned future before it resolves abandons its ticket.
    pub async fn refresh_current(&self) -> LoadOutcome {
        let ticket = self.begin();
        let pending = PendingLoad { store: self, ticket: Some(ticket.clone()) };
        let result = self.fetch(&ticket.key).await;
        pending.settle();
        self.complete(ticket, result)
    }

    /// Whether `key` is the live selection of an attached store
    pub fn is_current(&self, key: &SeriesKey) -> bool {
        !self.detached.get() && *self.current.borrow() == *key
    }

    /// Ask the collaborator for `key` without touching the chart state
    pub async fn fetch(&self, key: &SeriesKey) -> ChartResult<MarketDataPayload> {
        self.source.fetch_candles(key).await
    }

    /// Issue a ticket for the current selection and mark the state loading
    pub fn begin(&self) -> LoadTicket {
        let id = self.next_ticket.get();
        self.next_ticket.set(id + 1);
        let ticket = LoadTicket { key: self.current_key(), epoch: self.epoch.get(), id };
        self.pending.borrow_mut().push(id);
        let changed = {
            let mut state = self.state.borrow_mut();
            !std::mem::replace(&mut state.loading, true)
        };
        log_debug!(LogComponent::Application("CandleStore"), "Fetching candles for {}", ticket.key);
        if changed {
            self.publish_snapshot();
        }
        ticket
    }

    /// Apply a response, unless its ticket no longer matches the selection
    pub fn complete(&self, ticket: LoadTicket, result: ChartResult<MarketDataPayload>) -> LoadOutcome {
        if self.detached.get() {
            return LoadOutcome::Stale;
        }
        if ticket.epoch != self.epoch.get() || ticket.key != *self.current.borrow() {
            log_debug!(
                LogComponent::Application("CandleStore"),
                "Discarding stale response for {} (epoch {}, current {})",
                ticket.key,
                ticket.epoch,
                self.epoch.get()
            );
            self.dispatcher.publish_chart_event(ChartEvent::StaleResponseDiscarded { key: ticket.key });
            return LoadOutcome::Stale;
        }

        let outcome = match result.and_then(|payload| self.accept(payload)) {
            Ok(candles) => LoadOutcome::Loaded { candles },
            Err(reason) => self.recover(&ticket.key, reason),
        };

        let still_loading = self.release(&ticket);
        self.state.borrow_mut().loading = still_loading;
        self.publish_snapshot();
        outcome
    }

    /// Give up on `ticket` without applying anything.
    ///
    /// Clears the loading flag once no other request of the current epoch is
    /// outstanding. Abandoning a ticket twice, or one from an older epoch, is a
    /// no-op.
    pub fn abandon(&self, ticket: &LoadTicket) {
        if self.detached.get() || ticket.epoch != self.epoch.get() {
            return;
        }
        if !self.pending.borrow().contains(&ticket.id) {
            return;
        }
        log_debug!(LogComponent::Application("CandleStore"), "Abandoned request for {}", ticket.key);
        let still_loading = self.release(ticket);
        let changed = {
            let mut state = self.state.borrow_mut();
            std::mem::replace(&mut state.loading, still_loading) != still_loading
        };
        if changed {
            self.publish_snapshot();
        }
    }

    /// Drop `ticket` from the pending set; returns whether others remain
    fn release(&self, ticket: &LoadTicket) -> bool {
        let mut pending = self.pending.borrow_mut();
        pending.retain(|id| *id != ticket.id);
        !pending.is_empty()
    }

    /// Merge streamed candles into the tail of the series
    pub fn push_live(&self, candles: Vec<Candle>) -> MergeOutcome {
        if self.detached.get() {
            return MergeOutcome::default();
        }
        let candles = self.validator.sanitize(candles);
        let outcome = self.state.borrow_mut().series.merge_live(candles);
        if outcome.ignored > 0 {
            log_debug!(
                LogComponent::Application("CandleStore"),
                "Ignored {} out-of-order live candles",
                outcome.ignored
            );
        }
        if outcome.changed() {
            self.publish_snapshot();
        }
        outcome
    }

    /// Stop accepting responses; used when the owning chart goes away
    pub fn detach(&self) {
        self.detached.set(true);
        self.epoch.set(self.epoch.get() + 1);
        self.pending.borrow_mut().clear();
        self.state.borrow_mut().loading = false;
    }

    pub fn snapshot(&self) -> ChartSnapshot {
        self.state.borrow().snapshot()
    }

    fn accept(&self, payload: MarketDataPayload) -> ChartResult<usize> {
        let candles = self.validator.sanitize(payload.candles);
        if candles.is_empty() {
            return Err(ChartError::EmptySeries);
        }

        let mut state = self.state.borrow_mut();
        let evicted = state.series.replace_all(candles);
        state.data_source = Some(DataSource::Api);
        if state.signal.is_none() {
            state.signal = payload.signal.map(Rc::new);
        }
        let count = state.series.count();
        drop(state);

        log_info!(
            LogComponent::Application("CandleStore"),
            "Loaded {} candles from {} ({} evicted)",
            count,
            payload.source.as_deref().unwrap_or("api"),
            evicted
        );
        Ok(count)
    }

    fn recover(&self, key: &SeriesKey, reason: ChartError) -> LoadOutcome {
        let mut state = self.state.borrow_mut();
        if state.has_data() {
            log_warn!(
                LogComponent::Application("CandleStore"),
                "Refresh for {} failed ({}), keeping {} candles",
                key,
                reason,
                state.series.count()
            );
            return LoadOutcome::KeptExisting { reason };
        }

        let base_price = state.signal.as_ref().and_then(|s| s.entry_mid()).unwrap_or(DEFAULT_BASE_PRICE);
        let count = FALLBACK_CANDLES.min(state.series.capacity());
        let seed = self.fallback_seed.unwrap_or_else(|| logging::get_time_provider().current_timestamp());
        let candles = SyntheticCandleGenerator::new(seed)
            .with_base_price(base_price)
            .generate(count, key.interval, logging::now());

        state.series.replace_all(candles);
        state.data_source = Some(DataSource::Mock);
        let generated = state.series.count();

        log_warn!(
            LogComponent::Application("CandleStore"),
            "Falling back to {} synthetic candles for {}: {}",
            generated,
            key,
            reason
        );
        LoadOutcome::Fallback { candles: generated, reason }
    }

    fn publish_snapshot(&self) {
        let snapshot = self.state.borrow().snapshot();
        self.dispatcher.publish_chart_event(ChartEvent::SnapshotUpdated(snapshot));
    }
}

/// Abandons its ticket if dropped before the response arrives
struct PendingLoad<'a, S: MarketDataSource> {
    store: &'a CandleStore<S>,
    ticket: Option<LoadTicket>,
}

impl<S: MarketDataSource> PendingLoad<'_, S> {
    fn settle(mut self) {
        self.ticket = None;
    }
}

impl<S: MarketDataSource> Drop for PendingLoad<'_, S> {
    fn drop(&mut self) {
        if let Some(ticket) = self.ticket.take() {
            self.store.abandon(&ticket);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::market_data::{SignalId, TimeInterval};
    use futures::executor::block_on;
    use std::future::Future;

    struct FailingSource;

    impl MarketDataSource for FailingSource {
        async fn fetch_candles(&self, _key: &SeriesKey) -> ChartResult<MarketDataPayload> {
            Err(ChartError::Network("offline".to_string()))
        }
    }

    fn key(id: &str) -> SeriesKey {
        SeriesKey::new(SignalId::from(id), TimeInterval::OneMinute)
    }

    fn store<S: MarketDataSource>(source: S) -> CandleStore<S> {
        CandleStore::new(
            source,
            key("A"),
            Rc::new(RefCell::new(ChartState::default())),
            Rc::new(InMemoryEventDispatcher::new()),
            Some(7),
        )
    }

    #[test]
    fn select_bumps_epoch_only_on_change() {
        let store = store(FailingSource);
        assert!(!store.select(key("A")));
        assert_eq!(store.epoch(), 0);
        assert!(store.select(key("B")));
        assert_eq!(store.epoch(), 1);
    }

    #[test]
    fn ticket_from_previous_epoch_is_stale_even_for_same_key() {
        let store = store(FailingSource);
        let ticket = store.begin();
        store.select(key("B"));
        store.select(key("A"));
        let outcome = store.complete(ticket, Ok(MarketDataPayload::default()));
        assert!(outcome.is_stale());
        assert!(!store.state().borrow().has_data());
    }

    #[test]
    fn failed_refresh_keeps_existing_series() {
        let store = store(FailingSource);
        let ticket = store.begin();
        let payload = MarketDataPayload {
            candles: vec![Candle::from_values(60, 1.0, 2.0, 0.5, 1.5, 3.0)],
            ..Default::default()
        };
        assert_eq!(store.complete(ticket, Ok(payload)), LoadOutcome::Loaded { candles: 1 });

        let outcome = block_on(store.refresh_current());
        assert!(matches!(outcome, LoadOutcome::KeptExisting { .. }));
        let state = store.state().borrow();
        assert_eq!(state.series.count(), 1);
        assert_eq!(state.data_source, Some(DataSource::Api));
        assert!(!state.loading);
    }

    #[test]
    fn selection_change_clears_loading_of_the_old_epoch() {
        let store = store(FailingSource);
        let ticket = store.begin();
        assert!(store.state().borrow().loading);

        store.select(key("B"));
        assert!(!store.state().borrow().loading);
        assert!(store.complete(ticket, Err(ChartError::EmptySeries)).is_stale());
        assert!(!store.state().borrow().loading);
    }

    #[test]
    fn loading_stays_set_while_another_request_is_pending() {
        let store = store(FailingSource);
        let first = store.begin();
        let second = store.begin();

        store.abandon(&first);
        store.abandon(&first);
        assert!(store.state().borrow().loading);

        let payload = MarketDataPayload {
            candles: vec![Candle::from_values(60, 1.0, 2.0, 0.5, 1.5, 3.0)],
            ..Default::default()
        };
        store.complete(second, Ok(payload));
        assert!(!store.state().borrow().loading);
    }

    #[test]
    fn dropped_refresh_future_abandons_its_ticket() {
        struct StalledSource;

        impl MarketDataSource for StalledSource {
            async fn fetch_candles(&self, _key: &SeriesKey) -> ChartResult<MarketDataPayload> {
                futures::future::pending().await
            }
        }

        let store = store(StalledSource);
        {
            let mut load = Box::pin(store.refresh_current());
            let waker = futures::task::noop_waker();
            let mut cx = std::task::Context::from_waker(&waker);
            assert!(load.as_mut().poll(&mut cx).is_pending());
            assert!(store.state().borrow().loading);
        }
        assert!(!store.state().borrow().loading);
    }

    #[test]
    fn detached_store_ignores_everything() {
        let store = store(FailingSource);
        let ticket = store.begin();
        store.detach();
        assert!(store.complete(ticket, Err(ChartError::EmptySeries)).is_stale());
        assert!(block_on(store.refresh(&key("A"))).is_stale());
        assert!(!store.push_live(vec![Candle::from_values(0, 1.0, 1.0, 1.0, 1.0, 1.0)]).changed());
    }
}
