use std::cell::RefCell;
use std::rc::{Rc, Weak};

use gloo::utils::format::JsValueSerdeExt;
use wasm_bindgen::prelude::*;

use crate::application::{BrowserScheduler, ChartConfig, ChartEngine, LayerToggles};
use crate::domain::chart::PredictionPoint;
use crate::domain::errors::ChartError;
use crate::domain::events::ChartEvent;
use crate::domain::logging::LogComponent;
use crate::domain::market_data::{Candle, SignalId, TimeInterval};
use crate::domain::signal::SignalLevels;
use crate::infrastructure::http::CandleDto;
use crate::infrastructure::rendering::CanvasRenderer;
use crate::infrastructure::resize::{ResizeSubscription, measure_available_width};
use crate::infrastructure::MarketDataHttpClient;
use crate::{log_error, log_info};

type Engine = ChartEngine<MarketDataHttpClient>;

fn to_js(error: ChartError) -> JsValue {
    JsValue::from_str(&error.to_string())
}

fn from_js<T: serde::de::DeserializeOwned>(value: &JsValue, what: &str) -> Result<T, JsValue> {
    value
        .into_serde::<T>()
        .map_err(|e| to_js(ChartError::Validation(format!("invalid {what}: {e}"))))
}

fn redraw(engine: &Engine, renderer: &CanvasRenderer) {
    if let Err(e) = renderer.render(&engine.render()) {
        log_error!(LogComponent::Presentation("SignalChart"), "Render failed: {}", e);
    }
}

/// Chart handle for the page shell.
///
/// Thin bridge: every call is forwarded to the application layer and followed
/// by a redraw.
#[wasm_bindgen]
pub struct SignalChart {
    engine: Rc<RefCell<Engine>>,
    renderer: Rc<CanvasRenderer>,
    resize: Option<ResizeSubscription>,
}

#[wasm_bindgen]
impl SignalChart {
    /// `config` is either a JSON string or a plain object in the `ChartConfig` shape
    #[wasm_bindgen(constructor)]
    pub fn new(canvas_id: String, config: JsValue) -> Result<SignalChart, JsValue> {
        let config = match config.as_string() {
            Some(json) => ChartConfig::from_json(&json).map_err(to_js)?,
            None => from_js::<ChartConfig>(&config, "chart config")?.validated().map_err(to_js)?,
        };
        let client = MarketDataHttpClient::new(&config.base_url).map_err(to_js)?;
        let mut engine = ChartEngine::new(config, client, Rc::new(BrowserScheduler)).map_err(to_js)?;
        if let Some(width) = measure_available_width(&canvas_id) {
            engine.resize(width);
        }

        let engine = Rc::new(RefCell::new(engine));
        let renderer = Rc::new(CanvasRenderer::new(canvas_id));
        Self::redraw_on_snapshot(&engine, &renderer);

        log_info!(LogComponent::Presentation("SignalChart"), "Chart bound to #{}", renderer.canvas_id());
        Ok(Self { engine, renderer, resize: None })
    }

    /// Redraw whenever new candles land. Skipped while the engine is busy;
    /// the call holding it redraws on its own.
    fn redraw_on_snapshot(engine: &Rc<RefCell<Engine>>, renderer: &Rc<CanvasRenderer>) {
        let weak: Weak<RefCell<Engine>> = Rc::downgrade(engine);
        let renderer = Rc::clone(renderer);
        engine.borrow().subscribe(move |event| {
            if let ChartEvent::SnapshotUpdated(_) = event {
                if let Some(engine) = weak.upgrade() {
                    if let Ok(engine) = engine.try_borrow() {
                        redraw(&engine, &renderer);
                    }
                }
            }
        });
    }

    fn redraw(&self) {
        redraw(&self.engine.borrow(), &self.renderer);
    }

    /// Start live refresh and follow window resizes
    pub fn start(&mut self) -> Result<(), JsValue> {
        self.engine.borrow_mut().start();
        if self.resize.is_none() {
            let weak = Rc::downgrade(&self.engine);
            let renderer = Rc::clone(&self.renderer);
            let subscription = ResizeSubscription::new(self.renderer.canvas_id(), move |width| {
                if let Some(engine) = weak.upgrade() {
                    if let Ok(mut engine) = engine.try_borrow_mut() {
                        engine.resize(width);
                        redraw(&engine, &renderer);
                    }
                }
            })
            .map_err(to_js)?;
            self.resize = Some(subscription);
        }
        self.redraw();
        Ok(())
    }

    /// Stop live refresh and resize tracking
    pub fn stop(&mut self) {
        self.engine.borrow_mut().stop();
        self.resize = None;
    }

    #[wasm_bindgen(js_name = setSelection)]
    pub fn set_selection(&mut self, signal_id: String, interval: String) -> Result<bool, JsValue> {
        let signal_id = SignalId::new(signal_id).map_err(to_js)?;
        let interval = TimeInterval::parse(&interval).map_err(to_js)?;
        let changed = self.engine.borrow_mut().set_selection(signal_id, interval);
        self.redraw();
        Ok(changed)
    }

    #[wasm_bindgen(js_name = setSignal)]
    pub fn set_signal(&mut self, signal: JsValue) -> Result<(), JsValue> {
        let signal = if signal.is_null() || signal.is_undefined() {
            None
        } else {
            Some(from_js::<SignalLevels>(&signal, "signal")?)
        };
        self.engine.borrow_mut().set_signal(signal);
        self.redraw();
        Ok(())
    }

    #[wasm_bindgen(js_name = setLayerToggles)]
    pub fn set_layer_toggles(&mut self, toggles: JsValue) -> Result<(), JsValue> {
        let toggles = from_js::<LayerToggles>(&toggles, "layer toggles")?;
        self.engine.borrow_mut().set_layer_toggles(toggles);
        self.redraw();
        Ok(())
    }

    #[wasm_bindgen(js_name = ingestCandles)]
    pub fn ingest_candles(&self, candles: JsValue) -> Result<usize, JsValue> {
        let candles = from_js::<Vec<CandleDto>>(&candles, "candles")?
            .iter()
            .map(CandleDto::to_candle)
            .collect::<Result<Vec<Candle>, _>>()
            .map_err(to_js)?;
        let outcome = self.engine.borrow().ingest_live(candles);
        self.redraw();
        Ok(outcome.replaced + outcome.appended)
    }

    #[wasm_bindgen(js_name = setPredictions)]
    pub fn set_predictions(&self, points: JsValue) -> Result<(), JsValue> {
        let points = from_js::<Vec<PredictionPoint>>(&points, "predictions")?;
        self.engine.borrow().set_predictions(points);
        self.redraw();
        Ok(())
    }

    #[wasm_bindgen(js_name = zoomIn)]
    pub fn zoom_in(&self) -> bool {
        let changed = self.engine.borrow().zoom_in();
        self.redraw();
        changed
    }

    #[wasm_bindgen(js_name = zoomOut)]
    pub fn zoom_out(&self) -> bool {
        let changed = self.engine.borrow().zoom_out();
        self.redraw();
        changed
    }

    #[wasm_bindgen(js_name = resetZoom)]
    pub fn reset_zoom(&self) {
        self.engine.borrow().reset_zoom();
        self.redraw();
    }

    #[wasm_bindgen(js_name = panBy)]
    pub fn pan_by(&self, dx: f64) {
        self.engine.borrow().pan_by(dx);
        self.redraw();
    }

    pub fn resize(&self, available_width: f64) {
        self.engine.borrow_mut().resize(available_width);
        self.redraw();
    }

    pub fn render(&self) -> Result<(), JsValue> {
        self.renderer.render(&self.engine.borrow().render()).map_err(to_js)
    }

    /// `{ candles, currentPrice, priceChangePct, loading, dataSource }`
    pub fn snapshot(&self) -> Result<JsValue, JsValue> {
        JsValue::from_serde(&self.engine.borrow().snapshot())
            .map_err(|e| to_js(ChartError::Rendering(format!("snapshot serialization failed: {e}"))))
    }

    /// Call `callback(snapshot)` after every load or live merge
    #[wasm_bindgen(js_name = onSnapshot)]
    pub fn on_snapshot(&self, callback: js_sys::Function) {
        self.engine.borrow().subscribe(move |event| {
            if let ChartEvent::SnapshotUpdated(snapshot) = event {
                match JsValue::from_serde(snapshot) {
                    Ok(value) => {
                        if let Err(e) = callback.call1(&JsValue::NULL, &value) {
                            log_error!(LogComponent::Presentation("SignalChart"), "Snapshot callback threw: {:?}", e);
                        }
                    }
                    Err(e) => {
                        log_error!(LogComponent::Presentation("SignalChart"), "Snapshot serialization failed: {}", e);
                    }
                }
            }
        });
    }
}
