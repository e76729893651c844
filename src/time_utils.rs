use chrono::{DateTime, Utc};

use crate::domain::market_data::{TimeInterval, Timestamp};

/// Format an axis timestamp for the chart interval using UTC components.
///
/// - `1s` -> `HH:MM:SS`
/// - intraday intervals -> `HH:MM`
/// - `1d` -> `DD.MM`
pub fn format_time_label(timestamp: Timestamp, interval: TimeInterval) -> String {
    let Some(date) = DateTime::<Utc>::from_timestamp(timestamp.value(), 0) else {
        return String::new();
    };
    let pattern = match interval {
        TimeInterval::OneSecond => "%H:%M:%S",
        TimeInterval::OneDay => "%d.%m",
        _ => "%H:%M",
    };
    date.format(pattern).to_string()
}

/// Decimal places for a price of the given magnitude
pub fn price_precision(price: f64) -> usize {
    let magnitude = price.abs();
    if magnitude >= 100.0 {
        2
    } else if magnitude >= 1.0 {
        3
    } else if magnitude >= 0.01 {
        5
    } else if magnitude > 0.0 {
        8
    } else {
        2
    }
}

pub fn format_price(price: f64) -> String {
    format!("{:.*}", price_precision(price), price)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_by_interval() {
        let ts = Timestamp::from_secs(1_700_000_000);
        assert_eq!(format_time_label(ts, TimeInterval::OneSecond), "22:13:20");
        assert_eq!(format_time_label(ts, TimeInterval::FifteenMinutes), "22:13");
        assert_eq!(format_time_label(ts, TimeInterval::OneDay), "14.11");
    }

    #[test]
    fn precision_follows_magnitude() {
        assert_eq!(format_price(64_250.123), "64250.12");
        assert_eq!(format_price(1.23456), "1.235");
        assert_eq!(format_price(0.0123456), "0.01235");
        assert_eq!(format_price(0.000012344), "0.00001234");
        assert_eq!(format_price(0.0), "0.00");
    }
}
