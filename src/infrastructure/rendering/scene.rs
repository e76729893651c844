//! Backend-independent draw list produced by the layer compositor.

use std::fmt::Write as _;

use strum::{AsRefStr, Display, EnumIter};

use crate::domain::chart::{Color, PlotRect};

/// Layers in back-to-front order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, AsRefStr, EnumIter)]
pub enum LayerKind {
    Background,
    Grid,
    Axes,
    Candles,
    Predictions,
    Signals,
    NoData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum DashStyle {
    Solid,
    Dashed,
    Dotted,
    DashDot,
}

impl DashStyle {
    /// Segment pattern for `setLineDash`
    pub fn pattern(&self) -> &'static [f64] {
        match self {
            DashStyle::Solid => &[],
            DashStyle::Dashed => &[6.0, 4.0],
            DashStyle::Dotted => &[2.0, 3.0],
            DashStyle::DashDot => &[8.0, 3.0, 2.0, 3.0],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stroke {
    pub color: Color,
    pub width: f64,
    pub dash: DashStyle,
}

impl Stroke {
    pub fn solid(color: Color, width: f64) -> Self {
        Self { color, width, dash: DashStyle::Solid }
    }

    pub fn dashed(color: Color, width: f64, dash: DashStyle) -> Self {
        Self { color, width, dash }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum TextAlign {
    Left,
    Center,
    Right,
}

impl TextAlign {
    pub fn as_css(&self) -> &'static str {
        match self {
            TextAlign::Left => "left",
            TextAlign::Center => "center",
            TextAlign::Right => "right",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    FillRect { x: f64, y: f64, width: f64, height: f64, color: Color },
    Line { x1: f64, y1: f64, x2: f64, y2: f64, stroke: Stroke },
    Polyline { points: Vec<(f64, f64)>, stroke: Stroke },
    Text { x: f64, y: f64, text: String, color: Color, align: TextAlign },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneLayer {
    pub kind: LayerKind,
    /// Rectangle the layer is clipped to; `None` draws unclipped
    pub clip: Option<PlotRect>,
    pub commands: Vec<DrawCommand>,
}

impl SceneLayer {
    pub fn clipped(kind: LayerKind, clip: PlotRect) -> Self {
        Self { kind, clip: Some(clip), commands: Vec::new() }
    }

    pub fn unclipped(kind: LayerKind) -> Self {
        Self { kind, clip: None, commands: Vec::new() }
    }

    pub fn push(&mut self, command: DrawCommand) {
        self.commands.push(command);
    }

    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().filter_map(|command| match command {
            DrawCommand::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }
}

/// A fully composed frame
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub width: f64,
    pub height: f64,
    pub layers: Vec<SceneLayer>,
}

impl Scene {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height, layers: Vec::new() }
    }

    pub fn push_layer(&mut self, layer: SceneLayer) {
        self.layers.push(layer);
    }

    pub fn layer(&self, kind: LayerKind) -> Option<&SceneLayer> {
        self.layers.iter().find(|layer| layer.kind == kind)
    }

    pub fn layer_kinds(&self) -> Vec<LayerKind> {
        self.layers.iter().map(|layer| layer.kind).collect()
    }

    pub fn command_count(&self) -> usize {
        self.layers.iter().map(|layer| layer.commands.len()).sum()
    }

    pub fn is_no_data(&self) -> bool {
        self.layer(LayerKind::NoData).is_some()
    }

    /// One line per layer: kind, clip flag and command count
    pub fn summary(&self) -> String {
        let mut out = String::new();
        for layer in &self.layers {
            let clip = if layer.clip.is_some() { "clipped" } else { "free" };
            let _ = writeln!(out, "{} {} {}", layer.kind, clip, layer.commands.len());
        }
        out
    }
}
