pub mod compositor;
pub mod scene;

#[cfg(target_arch = "wasm32")]
pub mod canvas_renderer;

pub use compositor::*;
pub use scene::*;

#[cfg(target_arch = "wasm32")]
pub use canvas_renderer::CanvasRenderer;
