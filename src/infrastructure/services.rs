use wasm_bindgen::JsValue;

use crate::domain::logging::{LogEntry, LogLevel, Logger, TimeProvider, get_time_provider};

/// Console logger implementation for the browser
pub struct ConsoleLogger {
    min_level: LogLevel,
}

impl ConsoleLogger {
    pub fn new(min_level: LogLevel) -> Self {
        Self { min_level }
    }

    pub fn new_production() -> Self {
        Self::new(LogLevel::Info)
    }

    pub fn new_development() -> Self {
        Self::new(LogLevel::Debug)
    }

    pub fn min_level(&self) -> LogLevel {
        self.min_level
    }

    pub fn format_log_entry(&self, entry: &LogEntry) -> String {
        let timestamp = get_time_provider().format_timestamp(entry.timestamp);
        match &entry.metadata {
            Some(metadata) => format!(
                "[{}] {} {} | {} | {}",
                timestamp, entry.level, entry.component, entry.message, metadata
            ),
            None => format!("[{}] {} {} | {}", timestamp, entry.level, entry.component, entry.message),
        }
    }
}

impl Logger for ConsoleLogger {
    fn log(&self, entry: LogEntry) {
        if entry.level < self.min_level {
            return;
        }
        let formatted = JsValue::from(self.format_log_entry(&entry));
        match entry.level {
            LogLevel::Trace | LogLevel::Debug => web_sys::console::debug_1(&formatted),
            LogLevel::Info => web_sys::console::info_1(&formatted),
            LogLevel::Warn => web_sys::console::warn_1(&formatted),
            LogLevel::Error => web_sys::console::error_1(&formatted),
        }
    }
}

/// Wall clock backed by `Date.now()`
#[cfg(target_arch = "wasm32")]
#[derive(Debug, Default)]
pub struct BrowserTimeProvider;

#[cfg(target_arch = "wasm32")]
impl BrowserTimeProvider {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(target_arch = "wasm32")]
impl TimeProvider for BrowserTimeProvider {
    fn current_timestamp(&self) -> u64 {
        js_sys::Date::now() as u64
    }

    fn format_timestamp(&self, timestamp: u64) -> String {
        let date = js_sys::Date::new(&(timestamp as f64).into());
        format!(
            "{:02}:{:02}:{:02}.{:03}",
            date.get_hours(),
            date.get_minutes(),
            date.get_seconds(),
            date.get_milliseconds()
        )
    }
}

/// Clock pinned to a fixed instant, for deterministic runs
#[derive(Debug, Clone, Copy)]
pub struct FixedTimeProvider {
    millis: u64,
}

impl FixedTimeProvider {
    pub fn new(millis: u64) -> Self {
        Self { millis }
    }
}

impl TimeProvider for FixedTimeProvider {
    fn current_timestamp(&self) -> u64 {
        self.millis
    }

    fn format_timestamp(&self, timestamp: u64) -> String {
        timestamp.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::logging::LogComponent;

    #[test]
    fn formats_entry_with_metadata() {
        let logger = ConsoleLogger::new_production();
        let mut entry = LogEntry::new_with_metadata(
            LogLevel::Warn,
            LogComponent::Application("CandleStore"),
            "fallback",
            "key=A@1m",
        );
        entry.timestamp = 1_234_567;
        let line = logger.format_log_entry(&entry);
        assert!(line.ends_with(" WARN APP:CandleStore | fallback | key=A@1m"), "{line}");
        assert_eq!(logger.min_level(), LogLevel::Info);
    }

    #[test]
    fn fixed_clock() {
        let clock = FixedTimeProvider::new(42_000);
        assert_eq!(clock.current_timestamp(), 42_000);
        assert_eq!(clock.format_timestamp(7), "7");
    }
}
