use js_sys::Array;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

use super::scene::{DrawCommand, Scene, SceneLayer, Stroke};
use crate::domain::errors::{ChartError, ChartResult};
use crate::domain::logging::LogComponent;
use crate::log_debug;

const FONT: &str = "11px sans-serif";

/// Canvas 2D backend - replays a [`Scene`] layer by layer
pub struct CanvasRenderer {
    canvas_id: String,
}

impl CanvasRenderer {
    pub fn new(canvas_id: impl Into<String>) -> Self {
        Self { canvas_id: canvas_id.into() }
    }

    pub fn canvas_id(&self) -> &str {
        &self.canvas_id
    }

    fn canvas_context(&self) -> ChartResult<(HtmlCanvasElement, CanvasRenderingContext2d)> {
        let document = web_sys::window()
            .and_then(|window| window.document())
            .ok_or_else(|| ChartError::Rendering("document is not available".to_string()))?;
        let canvas = document
            .get_element_by_id(&self.canvas_id)
            .ok_or_else(|| ChartError::Rendering(format!("canvas '{}' not found", self.canvas_id)))?
            .dyn_into::<HtmlCanvasElement>()
            .map_err(|_| ChartError::Rendering("element is not a canvas".to_string()))?;
        let context = canvas
            .get_context("2d")
            .map_err(|_| ChartError::Rendering("failed to get 2D context".to_string()))?
            .ok_or_else(|| ChartError::Rendering("2D context unavailable".to_string()))?
            .dyn_into::<CanvasRenderingContext2d>()
            .map_err(|_| ChartError::Rendering("failed to cast to 2D context".to_string()))?;
        Ok((canvas, context))
    }

    pub fn render(&self, scene: &Scene) -> ChartResult<()> {
        let (canvas, context) = self.canvas_context()?;
        let width = scene.width.max(1.0);
        let height = scene.height.max(1.0);
        canvas.set_width(width as u32);
        canvas.set_height(height as u32);
        context.clear_rect(0.0, 0.0, width, height);
        context.set_font(FONT);
        context.set_text_baseline("middle");

        for layer in &scene.layers {
            self.render_layer(&context, layer)?;
        }

        log_debug!(
            LogComponent::Infrastructure("CanvasRenderer"),
            "Rendered {} layers ({} commands) to #{}",
            scene.layers.len(),
            scene.command_count(),
            self.canvas_id
        );
        Ok(())
    }

    fn render_layer(&self, context: &CanvasRenderingContext2d, layer: &SceneLayer) -> ChartResult<()> {
        context.save();
        if let Some(clip) = layer.clip {
            context.begin_path();
            context.rect(clip.left, clip.top, clip.width(), clip.height());
            context.clip();
        }
        let drawn = layer.commands.iter().try_for_each(|command| draw(context, command));
        context.restore();
        drawn
    }
}

fn apply_stroke(context: &CanvasRenderingContext2d, stroke: &Stroke) -> ChartResult<()> {
    context.set_stroke_style_str(&stroke.color.to_css());
    context.set_line_width(stroke.width);
    let pattern: Array = stroke.dash.pattern().iter().map(|v| JsValue::from_f64(*v)).collect();
    context
        .set_line_dash(&pattern)
        .map_err(|_| ChartError::Rendering("failed to set line dash".to_string()))
}

fn draw(context: &CanvasRenderingContext2d, command: &DrawCommand) -> ChartResult<()> {
    match command {
        DrawCommand::FillRect { x, y, width, height, color } => {
            context.set_fill_style_str(&color.to_css());
            context.fill_rect(*x, *y, *width, *height);
        }
        DrawCommand::Line { x1, y1, x2, y2, stroke } => {
            apply_stroke(context, stroke)?;
            context.begin_path();
            context.move_to(*x1, *y1);
            context.line_to(*x2, *y2);
            context.stroke();
        }
        DrawCommand::Polyline { points, stroke } => {
            let Some(((x0, y0), rest)) = points.split_first() else {
                return Ok(());
            };
            apply_stroke(context, stroke)?;
            context.begin_path();
            context.move_to(*x0, *y0);
            for (x, y) in rest {
                context.line_to(*x, *y);
            }
            context.stroke();
        }
        DrawCommand::Text { x, y, text, color, align } => {
            context.set_fill_style_str(&color.to_css());
            context.set_text_align(align.as_css());
            context
                .fill_text(text, *x, *y)
                .map_err(|_| ChartError::Rendering("failed to draw text".to_string()))?;
        }
    }
    Ok(())
}
