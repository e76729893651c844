#[cfg(target_arch = "wasm32")]
pub mod wasm_api;

#[cfg(target_arch = "wasm32")]
pub use wasm_api::SignalChart;
