use gloo::events::EventListener;

use crate::domain::errors::{ChartError, ChartResult};
use crate::domain::logging::LogComponent;
use crate::log_debug;

/// Width available to the chart: the canvas container, else the window
pub fn measure_available_width(canvas_id: &str) -> Option<f64> {
    let window = web_sys::window()?;
    let container_width = window
        .document()
        .and_then(|document| document.get_element_by_id(canvas_id))
        .and_then(|canvas| canvas.parent_element())
        .map(|parent| parent.client_width() as f64)
        .filter(|width| *width > 0.0);
    container_width.or_else(|| window.inner_width().ok().and_then(|width| width.as_f64()))
}

/// Window-resize subscription owned by one chart instance.
///
/// The listener is removed when the subscription is dropped.
pub struct ResizeSubscription {
    _listener: EventListener,
}

impl ResizeSubscription {
    pub fn new<F>(canvas_id: &str, mut on_resize: F) -> ChartResult<Self>
    where
        F: FnMut(f64) + 'static,
    {
        let window = web_sys::window().ok_or_else(|| ChartError::Rendering("window is not available".to_string()))?;
        let canvas_id = canvas_id.to_string();
        let listener = EventListener::new(&window, "resize", move |_event| {
            if let Some(width) = measure_available_width(&canvas_id) {
                log_debug!(LogComponent::Infrastructure("Resize"), "#{} resized to {}px", canvas_id, width);
                on_resize(width);
            }
        });
        Ok(Self { _listener: listener })
    }
}
