use super::scene::{DashStyle, DrawCommand, LayerKind, Scene, SceneLayer, Stroke, TextAlign};
use crate::application::config::LayerToggles;
use crate::domain::chart::{ChartState, Color, CoordinateMapper, PlotRect};
use crate::domain::logging::LogComponent;
use crate::domain::market_data::{Candle, Timestamp};
use crate::domain::signal::{LevelKind, SignalLevels};
use crate::log_trace;
use crate::time_utils::{format_price, format_time_label};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Share of the plot height the tallest volume bar may take
pub const VOLUME_HEIGHT_RATIO: f64 = 0.2;
const BODY_WIDTH_RATIO: f64 = 0.7;
const MIN_BODY_WIDTH: f64 = 1.0;
const MAX_BODY_WIDTH: f64 = 40.0;
const LABEL_GAP: f64 = 6.0;
/// Candle count from which geometry is built on the rayon pool
#[cfg(feature = "parallel")]
const PARALLEL_THRESHOLD: usize = 256;

/// Fixed chart colors
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Palette {
    pub background: Color,
    pub grid: Color,
    pub text: Color,
    pub bullish: Color,
    pub bearish: Color,
    pub current_price: Color,
    pub prediction: Color,
    pub entry_zone: Color,
    pub take_profit: Color,
    pub stop_loss: Color,
    pub posted_marker: Color,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            background: Color::from_hex(0x131722),
            grid: Color::from_hex(0x2a2e39),
            text: Color::from_hex(0xb2b5be),
            bullish: Color::from_hex(0x26a69a),
            bearish: Color::from_hex(0xef5350),
            current_price: Color::from_hex(0x90a4ae),
            prediction: Color::from_hex(0xab47bc).with_alpha(0.5),
            entry_zone: Color::from_hex(0x2196f3).with_alpha(0.15),
            take_profit: Color::from_hex(0x4caf50),
            stop_loss: Color::from_hex(0xf44336),
            posted_marker: Color::from_hex(0xffb300),
        }
    }
}

/// Builds the layered scene for one chart state.
///
/// Geometry comes exclusively from [`CoordinateMapper`]; the compositor never
/// mutates the state it renders.
#[derive(Debug, Clone)]
pub struct LayerCompositor {
    palette: Palette,
    axis_label_count: usize,
}

impl Default for LayerCompositor {
    fn default() -> Self {
        Self::new(5)
    }
}

impl LayerCompositor {
    pub fn new(axis_label_count: usize) -> Self {
        Self { palette: Palette::default(), axis_label_count: axis_label_count.max(2) }
    }

    pub fn with_palette(mut self, palette: Palette) -> Self {
        self.palette = palette;
        self
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn compose(&self, state: &ChartState, toggles: &LayerToggles, now: Timestamp) -> Scene {
        let layout = state.layout;
        let rect = layout.plot_rect();
        let mut scene = Scene::new(layout.width, layout.height);

        let mut background = SceneLayer::clipped(LayerKind::Background, rect);
        background.push(DrawCommand::FillRect {
            x: rect.left,
            y: rect.top,
            width: rect.width(),
            height: rect.height(),
            color: self.palette.background,
        });
        scene.push_layer(background);

        if !state.has_data() {
            scene.push_layer(self.no_data_layer(rect));
            return scene;
        }

        let mapper = state.mapper_at(now);

        if toggles.grid {
            scene.push_layer(self.grid_layer(&mapper));
        }
        if toggles.axes {
            scene.push_layer(self.axes_layer(&mapper, state));
        }
        if toggles.candles {
            scene.push_layer(self.candle_layer(&mapper, state));
        }
        if toggles.predictions && !state.predictions.is_empty() {
            scene.push_layer(self.prediction_layer(&mapper, state));
        }
        if toggles.signals {
            if let Some(signal) = state.signal.as_deref() {
                scene.push_layer(self.signal_layer(&mapper, signal));
            }
        }

        log_trace!(
            LogComponent::Infrastructure("LayerCompositor"),
            "Composed {} layers, {} commands",
            scene.layers.len(),
            scene.command_count()
        );
        scene
    }

    fn no_data_layer(&self, rect: PlotRect) -> SceneLayer {
        let mut layer = SceneLayer::clipped(LayerKind::NoData, rect);
        layer.push(DrawCommand::Text {
            x: rect.left + rect.width() / 2.0,
            y: rect.top + rect.height() / 2.0,
            text: "No data".to_string(),
            color: self.palette.text,
            align: TextAlign::Center,
        });
        layer
    }

    /// Evenly spaced prices across the domain, bottom to top
    fn price_ticks(&self, mapper: &CoordinateMapper) -> Vec<f64> {
        let domain = mapper.domain();
        let steps = (self.axis_label_count - 1) as f64;
        (0..self.axis_label_count)
            .map(|i| domain.price_min + domain.price_span() * i as f64 / steps)
            .collect()
    }

    /// Evenly spaced pixel columns across the plot
    fn time_ticks(&self, rect: &PlotRect) -> Vec<f64> {
        let steps = (self.axis_label_count - 1) as f64;
        (0..self.axis_label_count).map(|i| rect.left + rect.width() * i as f64 / steps).collect()
    }

    fn grid_layer(&self, mapper: &CoordinateMapper) -> SceneLayer {
        let rect = mapper.plot_rect();
        let stroke = Stroke::solid(self.palette.grid, 1.0);
        let mut layer = SceneLayer::clipped(LayerKind::Grid, rect);

        for price in self.price_ticks(mapper) {
            let y = mapper.price_to_y(price);
            layer.push(DrawCommand::Line { x1: rect.left, y1: y, x2: rect.right, y2: y, stroke });
        }
        for x in self.time_ticks(&rect) {
            layer.push(DrawCommand::Line { x1: x, y1: rect.top, x2: x, y2: rect.bottom, stroke });
        }
        layer
    }

    fn axes_layer(&self, mapper: &CoordinateMapper, state: &ChartState) -> SceneLayer {
        let rect = mapper.plot_rect();
        let mut layer = SceneLayer::unclipped(LayerKind::Axes);

        for price in self.price_ticks(mapper) {
            layer.push(DrawCommand::Text {
                x: rect.right + LABEL_GAP,
                y: mapper.price_to_y(price),
                text: format_price(price),
                color: self.palette.text,
                align: TextAlign::Left,
            });
        }
        for x in self.time_ticks(&rect) {
            layer.push(DrawCommand::Text {
                x,
                y: rect.bottom + LABEL_GAP * 2.5,
                text: format_time_label(mapper.x_to_timestamp(x), state.interval),
                color: self.palette.text,
                align: TextAlign::Center,
            });
        }
        layer
    }

    fn candle_layer(&self, mapper: &CoordinateMapper, state: &ChartState) -> SceneLayer {
        let rect = mapper.plot_rect();
        let mut layer = SceneLayer::clipped(LayerKind::Candles, rect);

        let body_width = (mapper.bucket_width(state.interval.duration_secs()) * BODY_WIDTH_RATIO)
            .clamp(MIN_BODY_WIDTH, MAX_BODY_WIDTH);
        let geometry = CandleGeometry {
            mapper: *mapper,
            rect,
            body_width,
            max_volume: state.series.max_volume(),
            palette: self.palette,
        };

        let candles: Vec<&Candle> = state.series.iter().collect();
        for commands in self.map_candles(&candles, &geometry) {
            layer.commands.extend(commands);
        }

        if let Some(price) = state.series.get_latest_price() {
            let y = mapper.price_to_y(price.value());
            layer.push(DrawCommand::Line {
                x1: rect.left,
                y1: y,
                x2: rect.right,
                y2: y,
                stroke: Stroke::dashed(self.palette.current_price, 1.0, DashStyle::Dashed),
            });
        }
        layer
    }

    #[cfg(feature = "parallel")]
    fn map_candles(&self, candles: &[&Candle], geometry: &CandleGeometry) -> Vec<Vec<DrawCommand>> {
        if candles.len() >= PARALLEL_THRESHOLD {
            candles.par_iter().filter_map(|candle| geometry.commands(candle)).collect()
        } else {
            candles.iter().filter_map(|candle| geometry.commands(candle)).collect()
        }
    }

    #[cfg(not(feature = "parallel"))]
    fn map_candles(&self, candles: &[&Candle], geometry: &CandleGeometry) -> Vec<Vec<DrawCommand>> {
        candles.iter().filter_map(|candle| geometry.commands(candle)).collect()
    }

    fn prediction_layer(&self, mapper: &CoordinateMapper, state: &ChartState) -> SceneLayer {
        let mut layer = SceneLayer::clipped(LayerKind::Predictions, mapper.plot_rect());
        let points: Vec<(f64, f64)> = state
            .predictions
            .iter()
            .filter(|point| point.price.is_finite())
            .map(|point| (mapper.timestamp_to_x(point.timestamp), mapper.price_to_y(point.price)))
            .collect();
        if !points.is_empty() {
            layer.push(DrawCommand::Polyline {
                points,
                stroke: Stroke::dashed(self.palette.prediction, 1.5, DashStyle::Dashed),
            });
        }
        layer
    }

    fn signal_layer(&self, mapper: &CoordinateMapper, signal: &SignalLevels) -> SceneLayer {
        let rect = mapper.plot_rect();
        let mut layer = SceneLayer::clipped(LayerKind::Signals, rect);

        if let Some((low, high)) = signal.entry_zone() {
            let top = mapper.price_to_y(high);
            let bottom = mapper.price_to_y(low);
            layer.push(DrawCommand::FillRect {
                x: rect.left,
                y: top,
                width: rect.width(),
                height: (bottom - top).max(1.0),
                color: self.palette.entry_zone,
            });
        }

        for (kind, price) in signal.levels() {
            let y = mapper.price_to_y(price);
            let stroke = if kind.is_take_profit() {
                Stroke::dashed(self.palette.take_profit, 1.0, DashStyle::Dashed)
            } else {
                Stroke::dashed(self.palette.stop_loss, 1.5, DashStyle::DashDot)
            };
            layer.push(DrawCommand::Line { x1: rect.left, y1: y, x2: rect.right, y2: y, stroke });
            layer.push(DrawCommand::Text {
                x: rect.right - LABEL_GAP,
                y: y - 3.0,
                text: format!("{} {}", kind, format_price(price)),
                color: self.level_color(kind),
                align: TextAlign::Right,
            });
        }

        let x = mapper.timestamp_to_x(signal.posted_at);
        layer.push(DrawCommand::Line {
            x1: x,
            y1: rect.top,
            x2: x,
            y2: rect.bottom,
            stroke: Stroke::dashed(self.palette.posted_marker, 1.0, DashStyle::Dotted),
        });
        layer
    }

    fn level_color(&self, kind: LevelKind) -> Color {
        if kind.is_take_profit() { self.palette.take_profit } else { self.palette.stop_loss }
    }
}

/// Per-frame constants for mapping candles to primitives
struct CandleGeometry {
    mapper: CoordinateMapper,
    rect: PlotRect,
    body_width: f64,
    max_volume: f64,
    palette: Palette,
}

impl CandleGeometry {
    /// Volume bar, wick and body, or `None` when the candle is off-screen
    fn commands(&self, candle: &Candle) -> Option<Vec<DrawCommand>> {
        let x = self.mapper.timestamp_to_x(candle.timestamp);
        let half = self.body_width / 2.0;
        if !self.rect.overlaps_x(x - half, x + half) {
            return None;
        }

        let color = if candle.is_bullish() { self.palette.bullish } else { self.palette.bearish };
        let ohlcv = &candle.ohlcv;
        let mut commands = Vec::with_capacity(3);

        if self.max_volume > 0.0 {
            let height = ohlcv.volume.value() / self.max_volume * self.rect.height() * VOLUME_HEIGHT_RATIO;
            if height > 0.0 {
                commands.push(DrawCommand::FillRect {
                    x: x - half,
                    y: self.rect.bottom - height,
                    width: self.body_width,
                    height,
                    color: color.with_alpha(0.3),
                });
            }
        }

        commands.push(DrawCommand::Line {
            x1: x,
            y1: self.mapper.price_to_y(ohlcv.high.value()),
            x2: x,
            y2: self.mapper.price_to_y(ohlcv.low.value()),
            stroke: Stroke::solid(color, 1.0),
        });

        let top = self.mapper.price_to_y(candle.body_top());
        let bottom = self.mapper.price_to_y(candle.body_bottom());
        commands.push(DrawCommand::FillRect {
            x: x - half,
            y: top,
            width: self.body_width,
            height: (bottom - top).max(1.0),
            color,
        });
        Some(commands)
    }
}
