pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod presentation;
pub mod time_utils;

pub use application::{ChartConfig, ChartEngine, LayerToggles};
pub use domain::errors::{ChartError, ChartResult};

/// Install panic hook, console logger and browser clock
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen::prelude::wasm_bindgen(start)]
pub fn initialize() {
    use crate::domain::logging::{self, LogComponent};
    use crate::log_info;

    console_error_panic_hook::set_once();

    let logger = if cfg!(debug_assertions) {
        infrastructure::services::ConsoleLogger::new_development()
    } else {
        infrastructure::services::ConsoleLogger::new_production()
    };
    logging::init_logger(Box::new(logger));
    logging::init_time_provider(Box::new(infrastructure::services::BrowserTimeProvider::new()));

    log_info!(LogComponent::Presentation("Initialize"), "Signal chart module initialized");
}
