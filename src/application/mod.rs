pub mod candle_store;
pub mod chart_service;
pub mod config;
pub mod live_refresh;

pub use candle_store::{CandleStore, LoadOutcome, LoadTicket};
pub use chart_service::ChartEngine;
pub use config::{ChartConfig, LayerToggles};
pub use live_refresh::{RefreshHandle, RefreshScheduler};

#[cfg(target_arch = "wasm32")]
pub use live_refresh::BrowserScheduler;
