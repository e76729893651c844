use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use futures::channel::oneshot;
use futures::executor::LocalPool;
use futures::task::LocalSpawnExt;
use signal_chart_wasm::application::{CandleStore, LoadOutcome};
use signal_chart_wasm::domain::chart::ChartState;
use signal_chart_wasm::domain::errors::{ChartError, ChartResult};
use signal_chart_wasm::domain::events::{ChartEvent, DataSource, InMemoryEventDispatcher};
use signal_chart_wasm::domain::market_data::{
    Candle, MarketDataPayload, MarketDataSource, SeriesKey, SignalId, TimeInterval,
};

type Reply = ChartResult<MarketDataPayload>;

/// Source whose responses are released by the test, one gate per request
#[derive(Default)]
struct GatedSource {
    gates: RefCell<HashMap<String, VecDeque<oneshot::Receiver<Reply>>>>,
}

impl GatedSource {
    fn gate(&self, signal_id: &str) -> oneshot::Sender<Reply> {
        let (tx, rx) = oneshot::channel();
        self.gates.borrow_mut().entry(signal_id.to_string()).or_default().push_back(rx);
        tx
    }
}

impl MarketDataSource for GatedSource {
    async fn fetch_candles(&self, key: &SeriesKey) -> ChartResult<MarketDataPayload> {
        let gate = self.gates.borrow_mut().get_mut(key.signal_id.value()).and_then(VecDeque::pop_front);
        match gate {
            Some(rx) => rx.await.unwrap_or_else(|_| Err(ChartError::Network("gate dropped".to_string()))),
            None => Err(ChartError::Network(format!("no gate for {key}"))),
        }
    }
}

fn key(id: &str) -> SeriesKey {
    SeriesKey::new(SignalId::from(id), TimeInterval::OneMinute)
}

fn payload(price: f64) -> Reply {
    Ok(MarketDataPayload {
        candles: vec![
            Candle::from_values(0, price, price + 1.0, price - 1.0, price, 10.0),
            Candle::from_values(60, price, price + 2.0, price - 1.0, price + 1.0, 12.0),
        ],
        ..Default::default()
    })
}

struct Harness {
    pool: LocalPool,
    source: Rc<GatedSource>,
    store: Rc<CandleStore<Rc<GatedSource>>>,
    dispatcher: Rc<InMemoryEventDispatcher>,
    outcomes: Rc<RefCell<Vec<(String, LoadOutcome)>>>,
}

impl Harness {
    fn new() -> Self {
        let source = Rc::new(GatedSource::default());
        let dispatcher = Rc::new(InMemoryEventDispatcher::new());
        let store = Rc::new(CandleStore::new(
            Rc::clone(&source),
            key("A"),
            Rc::new(RefCell::new(ChartState::default())),
            Rc::clone(&dispatcher),
            Some(1),
        ));
        Self { pool: LocalPool::new(), source, store, dispatcher, outcomes: Rc::default() }
    }

    /// Select `id` and start loading it in the background
    fn load(&mut self, id: &'static str) {
        let store = Rc::clone(&self.store);
        let outcomes = Rc::clone(&self.outcomes);
        self.pool
            .spawner()
            .spawn_local(async move {
                let outcome = store.load(key(id)).await;
                outcomes.borrow_mut().push((id.to_string(), outcome));
            })
            .unwrap();
        self.pool.run_until_stalled();
    }

    fn latest_close(&self) -> Option<f64> {
        self.store.state().borrow().series.get_latest_price().map(|p| p.value())
    }
}

#[test]
fn response_for_previous_selection_is_dropped() {
    let mut h = Harness::new();
    let gate_a = h.source.gate("A");
    let gate_b = h.source.gate("B");
    let discarded = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&discarded);
    h.dispatcher.subscribe_to_chart_events(move |event| {
        if let ChartEvent::StaleResponseDiscarded { key } = event {
            sink.borrow_mut().push(key.clone());
        }
    });

    h.load("A");
    h.load("B");
    assert_eq!(h.store.current_key(), key("B"));

    gate_a.send(payload(100.0)).unwrap();
    h.pool.run_until_stalled();
    assert_eq!(h.outcomes.borrow()[0], ("A".to_string(), LoadOutcome::Stale));
    assert_eq!(h.latest_close(), None);
    assert_eq!(*discarded.borrow(), vec![key("A")]);

    gate_b.send(payload(200.0)).unwrap();
    h.pool.run_until_stalled();
    assert_eq!(h.outcomes.borrow()[1], ("B".to_string(), LoadOutcome::Loaded { candles: 2 }));
    assert_eq!(h.latest_close(), Some(201.0));
    assert_eq!(h.store.snapshot().data_source, Some(DataSource::Api));
}

#[test]
fn switching_back_does_not_revive_the_old_request() {
    let mut h = Harness::new();
    let first_a = h.source.gate("A");
    let gate_b = h.source.gate("B");
    let second_a = h.source.gate("A");

    h.load("A");
    h.load("B");
    h.load("A");
    assert_eq!(h.store.epoch(), 2);

    first_a.send(payload(1.0)).unwrap();
    h.pool.run_until_stalled();
    assert_eq!(h.latest_close(), None);

    gate_b.send(payload(2.0)).unwrap();
    second_a.send(payload(3.0)).unwrap();
    h.pool.run_until_stalled();
    assert_eq!(h.latest_close(), Some(4.0));

    let outcomes = h.outcomes.borrow();
    let stale = outcomes.iter().filter(|(_, outcome)| outcome.is_stale()).count();
    assert_eq!(stale, 2);
}

#[test]
fn loading_flag_tracks_the_current_request() {
    let mut h = Harness::new();
    let gate_a = h.source.gate("A");

    h.load("A");
    assert!(h.store.snapshot().loading);

    gate_a.send(payload(10.0)).unwrap();
    h.pool.run_until_stalled();
    let snapshot = h.store.snapshot();
    assert!(!snapshot.loading);
    assert_eq!(snapshot.candles.len(), 2);
    assert_eq!(snapshot.current_price, Some(11.0));
}

#[test]
fn switching_away_mid_load_does_not_leave_loading_set() {
    let mut h = Harness::new();
    let gate_a = h.source.gate("A");
    let loading_seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&loading_seen);
    h.dispatcher.subscribe_to_chart_events(move |event| {
        if let ChartEvent::SnapshotUpdated(snapshot) = event {
            sink.borrow_mut().push(snapshot.loading);
        }
    });

    let store = Rc::clone(&h.store);
    h.pool
        .spawner()
        .spawn_local(async move {
            store.refresh_current().await;
        })
        .unwrap();
    h.pool.run_until_stalled();
    assert!(h.store.snapshot().loading);

    assert!(h.store.select(key("B")));
    assert!(!h.store.snapshot().loading);
    assert_eq!(loading_seen.borrow().last(), Some(&false));

    gate_a.send(payload(10.0)).unwrap();
    h.pool.run_until_stalled();
    let snapshot = h.store.snapshot();
    assert!(!snapshot.loading);
    assert!(snapshot.candles.is_empty());
}
