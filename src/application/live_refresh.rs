use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use futures::future::{AbortHandle, Abortable, LocalBoxFuture};
use futures::stream::LocalBoxStream;
use futures::{FutureExt, StreamExt};

use super::candle_store::{CandleStore, LoadOutcome, LoadTicket};
use crate::domain::logging::LogComponent;
use crate::domain::market_data::{MarketDataSource, SeriesKey};
use crate::{log_debug, log_info};

/// Timer and task spawning used by the refresh loop
pub trait RefreshScheduler {
    /// Stream yielding once per `period_ms`
    fn ticks(&self, period_ms: u32) -> LocalBoxStream<'static, ()>;
    fn spawn(&self, task: LocalBoxFuture<'static, ()>);
}

impl<T: RefreshScheduler + ?Sized> RefreshScheduler for Rc<T> {
    fn ticks(&self, period_ms: u32) -> LocalBoxStream<'static, ()> {
        (**self).ticks(period_ms)
    }

    fn spawn(&self, task: LocalBoxFuture<'static, ()>) {
        (**self).spawn(task)
    }
}

/// Live-refresh subscription for one selection key.
///
/// Dropping the handle cancels the loop, including a fetch that is still in
/// flight; its response is never applied and its loading flag is cleared.
pub struct RefreshHandle {
    key: SeriesKey,
    abort: AbortHandle,
    abandon: Option<Box<dyn FnOnce()>>,
}

impl fmt::Debug for RefreshHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshHandle").field("key", &self.key).field("abort", &self.abort).finish()
    }
}

impl RefreshHandle {
    pub fn key(&self) -> &SeriesKey {
        &self.key
    }

    pub fn is_stopped(&self) -> bool {
        self.abort.is_aborted()
    }

    pub fn stop(self) {
        drop(self);
    }
}

impl Drop for RefreshHandle {
    fn drop(&mut self) {
        if !self.abort.is_aborted() {
            log_debug!(LogComponent::Application("LiveRefresh"), "Stopping refresh loop for {}", self.key);
            self.abort.abort();
        }
        if let Some(abandon) = self.abandon.take() {
            abandon();
        }
    }
}

/// One refresh of `key`, with its ticket visible in `in_flight` until the
/// response is applied
async fn refresh_once<S: MarketDataSource>(
    store: &CandleStore<S>,
    key: &SeriesKey,
    in_flight: &RefCell<Option<LoadTicket>>,
) -> LoadOutcome {
    if !store.is_current(key) {
        return LoadOutcome::Stale;
    }
    let ticket = store.begin();
    in_flight.replace(Some(ticket.clone()));
    let result = store.fetch(&ticket.key).await;
    in_flight.take();
    store.complete(ticket, result)
}

/// Load `key` right away and then once per tick until the handle is dropped
pub fn start<S, R>(store: Rc<CandleStore<S>>, scheduler: &R, key: SeriesKey, period_ms: u32) -> RefreshHandle
where
    S: MarketDataSource + 'static,
    R: RefreshScheduler + ?Sized,
{
    let (abort, registration) = AbortHandle::new_pair();
    let mut ticks = scheduler.ticks(period_ms);
    let loop_key = key.clone();
    let in_flight = Rc::new(RefCell::new(None::<LoadTicket>));

    let abandon = {
        let store = Rc::clone(&store);
        let in_flight = Rc::clone(&in_flight);
        move || {
            if let Some(ticket) = in_flight.take() {
                store.abandon(&ticket);
            }
        }
    };

    let task = async move {
        refresh_once(&store, &loop_key, &in_flight).await;
        while ticks.next().await.is_some() {
            if refresh_once(&store, &loop_key, &in_flight).await.is_stale() {
                break;
            }
        }
    };

    scheduler.spawn(Abortable::new(task, registration).map(|_| ()).boxed_local());
    log_info!(LogComponent::Application("LiveRefresh"), "Refreshing {} every {} ms", key, period_ms);

    RefreshHandle { key, abort, abandon: Some(Box::new(abandon)) }
}

/// Browser scheduler backed by `setInterval` and the microtask queue
#[cfg(target_arch = "wasm32")]
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserScheduler;

#[cfg(target_arch = "wasm32")]
impl RefreshScheduler for BrowserScheduler {
    fn ticks(&self, period_ms: u32) -> LocalBoxStream<'static, ()> {
        gloo_timers::future::IntervalStream::new(period_ms).boxed_local()
    }

    fn spawn(&self, task: LocalBoxFuture<'static, ()>) {
        wasm_bindgen_futures::spawn_local(task);
    }
}
