use std::cell::{Cell, RefCell};
use std::rc::Rc;

use futures::channel::mpsc;
use futures::executor::{LocalPool, LocalSpawner};
use futures::future::LocalBoxFuture;
use futures::stream::{LocalBoxStream, StreamExt};
use futures::task::LocalSpawnExt;
use signal_chart_wasm::application::{ChartConfig, ChartEngine, RefreshScheduler};
use signal_chart_wasm::domain::errors::ChartResult;
use signal_chart_wasm::domain::market_data::{
    Candle, MarketDataPayload, MarketDataSource, SeriesKey, SignalId, TimeInterval,
};

/// Ticks on demand and runs tasks on a local pool
struct ManualScheduler {
    spawner: LocalSpawner,
    senders: RefCell<Vec<mpsc::UnboundedSender<()>>>,
    periods: RefCell<Vec<u32>>,
}

impl ManualScheduler {
    fn new(spawner: LocalSpawner) -> Self {
        Self { spawner, senders: RefCell::default(), periods: RefCell::default() }
    }

    fn tick(&self) {
        self.senders.borrow_mut().retain(|tx| tx.unbounded_send(()).is_ok());
    }
}

impl RefreshScheduler for ManualScheduler {
    fn ticks(&self, period_ms: u32) -> LocalBoxStream<'static, ()> {
        let (tx, rx) = mpsc::unbounded();
        self.senders.borrow_mut().push(tx);
        self.periods.borrow_mut().push(period_ms);
        rx.boxed_local()
    }

    fn spawn(&self, task: LocalBoxFuture<'static, ()>) {
        self.spawner.spawn_local(task).unwrap();
    }
}

/// Returns one more candle on every call and records the keys it was asked for
#[derive(Default)]
struct GrowingSource {
    calls: Cell<usize>,
    keys: RefCell<Vec<SeriesKey>>,
}

impl MarketDataSource for GrowingSource {
    async fn fetch_candles(&self, key: &SeriesKey) -> ChartResult<MarketDataPayload> {
        let n = self.calls.get() + 1;
        self.calls.set(n);
        self.keys.borrow_mut().push(key.clone());
        let step = key.interval.duration_secs();
        let candles = (0..n as i64)
            .map(|i| Candle::from_values(i * step, 10.0, 11.0, 9.0, 10.5, 1.0))
            .collect();
        Ok(MarketDataPayload { candles, ..Default::default() })
    }
}

/// Never answers, so every fetch stays in flight
struct StalledSource;

impl MarketDataSource for StalledSource {
    async fn fetch_candles(&self, _key: &SeriesKey) -> ChartResult<MarketDataPayload> {
        futures::future::pending().await
    }
}

struct Harness {
    pool: LocalPool,
    scheduler: Rc<ManualScheduler>,
    source: Rc<GrowingSource>,
    engine: ChartEngine<Rc<GrowingSource>>,
}

impl Harness {
    fn new() -> Self {
        let pool = LocalPool::new();
        let scheduler = Rc::new(ManualScheduler::new(pool.spawner()));
        let source = Rc::new(GrowingSource::default());
        let mut config = ChartConfig::new(SignalId::from("sig-1")).with_timeframe(TimeInterval::OneMinute);
        config.refresh_interval_ms = 5_000;
        let engine = ChartEngine::new(config, Rc::clone(&source), scheduler.clone()).unwrap();
        Self { pool, scheduler, source, engine }
    }

    fn tick(&mut self) {
        self.scheduler.tick();
        self.pool.run_until_stalled();
    }
}

#[test]
fn loads_immediately_then_once_per_tick() {
    let mut h = Harness::new();
    h.engine.start();
    h.pool.run_until_stalled();
    assert!(h.engine.is_running());
    assert_eq!(h.source.calls.get(), 1);
    assert_eq!(*h.scheduler.periods.borrow(), vec![5_000]);

    h.tick();
    h.tick();
    assert_eq!(h.source.calls.get(), 3);
    assert_eq!(h.engine.snapshot().candles.len(), 3);
}

#[test]
fn stop_cancels_further_refreshes() {
    let mut h = Harness::new();
    h.engine.start();
    h.pool.run_until_stalled();

    h.engine.stop();
    assert!(!h.engine.is_running());
    h.tick();
    h.tick();
    assert_eq!(h.source.calls.get(), 1);
}

#[test]
fn selection_change_restarts_the_loop_for_the_new_key() {
    let mut h = Harness::new();
    h.engine.start();
    h.pool.run_until_stalled();

    assert!(h.engine.set_selection(SignalId::from("sig-2"), TimeInterval::FiveMinutes));
    h.pool.run_until_stalled();
    h.tick();

    let keys = h.source.keys.borrow();
    let expected = SeriesKey::new(SignalId::from("sig-2"), TimeInterval::FiveMinutes);
    assert_eq!(keys.len(), 3);
    assert!(keys[1..].iter().all(|key| *key == expected));
    assert!(h.engine.is_running());
}

#[test]
fn dropping_the_engine_ends_the_loop() {
    let mut h = Harness::new();
    h.engine.start();
    h.pool.run_until_stalled();

    let Harness { mut pool, scheduler, source, engine } = h;
    drop(engine);
    scheduler.tick();
    pool.run_until_stalled();
    assert_eq!(source.calls.get(), 1);
}

#[test]
fn stopping_mid_fetch_clears_loading() {
    let mut pool = LocalPool::new();
    let scheduler = Rc::new(ManualScheduler::new(pool.spawner()));
    let mut engine =
        ChartEngine::new(ChartConfig::new(SignalId::from("sig-1")), StalledSource, scheduler.clone()).unwrap();

    engine.start();
    pool.run_until_stalled();
    assert!(engine.snapshot().loading);

    engine.stop();
    assert!(!engine.snapshot().loading);

    engine.start();
    pool.run_until_stalled();
    assert!(engine.snapshot().loading);
    drop(engine);
    pool.run_until_stalled();
}

#[test]
fn restart_after_stop_reports_fresh_loading_state() {
    let mut h = Harness::new();
    h.engine.start();
    h.pool.run_until_stalled();
    h.engine.stop();

    h.engine.start();
    h.pool.run_until_stalled();
    let snapshot = h.engine.snapshot();
    assert!(!snapshot.loading);
    assert_eq!(snapshot.candles.len(), 2);
}
