use signal_chart_wasm::domain::chart::{
    CoordinateMapper, DomainCalculator, EMPTY_TIME_WINDOW_SECS, PlotLayout, Viewport,
};
use signal_chart_wasm::domain::market_data::{Candle, Timestamp};
use signal_chart_wasm::domain::signal::{Side, SignalLevels};

fn now() -> Timestamp {
    Timestamp::from_secs(1_700_000_000)
}

fn signal() -> SignalLevels {
    SignalLevels {
        side: Side::Long,
        entry_min: 100.0,
        entry_max: 101.0,
        tp1: 104.0,
        tp2: 108.0,
        tp3: None,
        sl: 97.0,
        posted_at: Timestamp::from_secs(1_699_999_000),
    }
}

#[test]
fn flat_single_candle_still_gets_a_range() {
    let candles = [Candle::from_values(60, 50.0, 50.0, 50.0, 50.0, 0.0)];
    let domain = DomainCalculator::default().compute(candles.iter(), None, now());

    assert!(domain.price_max > domain.price_min);
    assert!(domain.contains_price(50.0));

    let mapper = CoordinateMapper::new(domain, Viewport::new(PlotLayout::default()));
    let y = mapper.price_to_y(50.0);
    assert!(y.is_finite());
    assert!((y - 200.0).abs() < 1e-6);
    assert_eq!(mapper.timestamp_to_x(Timestamp::from_secs(60)), 40.0);
}

#[test]
fn padding_ratio_widens_both_sides() {
    let candles = [
        Candle::from_values(0, 95.0, 100.0, 90.0, 98.0, 1.0),
        Candle::from_values(60, 98.0, 110.0, 97.0, 105.0, 1.0),
    ];
    let domain = DomainCalculator::new(0.1).compute(candles.iter(), None, now());
    assert!((domain.price_min - 88.0).abs() < 1e-9);
    assert!((domain.price_max - 112.0).abs() < 1e-9);
    assert_eq!(domain.time_min, Timestamp::from_secs(0));
    assert_eq!(domain.time_max, Timestamp::from_secs(60));
}

#[test]
fn signal_levels_extend_the_range() {
    let candles = [Candle::from_values(0, 100.0, 102.0, 99.0, 101.0, 1.0)];
    let signal = signal();
    let domain = DomainCalculator::default().compute(candles.iter(), Some(&signal), now());

    for price in signal.price_levels() {
        assert!(domain.contains_price(price), "{price} outside {domain:?}");
    }
    assert!(domain.price_min < 97.0);
    assert!(domain.price_max > 108.0);
}

#[test]
fn empty_series_uses_signal_and_recent_window() {
    let signal = signal();
    let domain = DomainCalculator::default().compute(std::iter::empty(), Some(&signal), now());

    assert!(domain.contains_price(97.0) && domain.contains_price(108.0));
    assert_eq!(domain.time_max, now());
    assert_eq!(domain.time_span(), EMPTY_TIME_WINDOW_SECS);
}

#[test]
fn nothing_at_all_falls_back_to_default_range() {
    let domain = DomainCalculator::default().compute(std::iter::empty(), None, now());
    assert!(domain.price_min <= 0.0);
    assert!(domain.price_max >= 100.0);
    assert!(domain.price_max > domain.price_min);
}
