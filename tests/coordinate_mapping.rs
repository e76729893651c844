use quickcheck_macros::quickcheck;
use signal_chart_wasm::domain::chart::{CoordinateMapper, PlotLayout, PriceDomain, Viewport, ZoomController};
use signal_chart_wasm::domain::market_data::Timestamp;

fn domain(price_min: f64, price_max: f64, time_min: i64, time_max: i64) -> PriceDomain {
    PriceDomain {
        price_min,
        price_max,
        time_min: Timestamp::from_secs(time_min),
        time_max: Timestamp::from_secs(time_max),
    }
}

fn mapper(domain: PriceDomain) -> CoordinateMapper {
    CoordinateMapper::new(domain, Viewport::new(PlotLayout::default()))
}

#[test]
fn two_candle_window_spans_the_plot() {
    let mapper = mapper(domain(95.0, 105.0, 0, 60));

    assert!((mapper.timestamp_to_x(Timestamp::from_secs(0)) - 40.0).abs() < 1e-9);
    assert!((mapper.timestamp_to_x(Timestamp::from_secs(60)) - 760.0).abs() < 1e-9);
    assert!(mapper.price_to_y(105.0) < mapper.price_to_y(95.0));
    assert!((mapper.price_to_y(105.0) - 40.0).abs() < 1e-9);
    assert!((mapper.price_to_y(95.0) - 360.0).abs() < 1e-9);
}

#[test]
fn zoomed_mapping_stays_invertible() {
    let layout = PlotLayout::default();
    let mut zoom = ZoomController::default();
    zoom.zoom_in(layout.center_x());
    zoom.pan_by(-35.0);

    let mapper = CoordinateMapper::new(domain(10.0, 20.0, 1_000, 4_600), zoom.viewport(layout));
    let ts = Timestamp::from_secs(2_500);
    assert_eq!(mapper.x_to_timestamp(mapper.timestamp_to_x(ts)), ts);
}

#[quickcheck]
fn higher_price_is_never_lower_on_screen(a: i32, b: i32) -> bool {
    let mapper = mapper(domain(-1e6, 1e6, 0, 3_600));
    let (lo, hi) = if a <= b { (a as f64 / 10.0, b as f64 / 10.0) } else { (b as f64 / 10.0, a as f64 / 10.0) };
    mapper.price_to_y(hi) <= mapper.price_to_y(lo)
}

#[quickcheck]
fn later_timestamp_is_never_left_of_earlier(a: u32, b: u32) -> bool {
    let mapper = mapper(domain(0.0, 1.0, 0, u32::MAX as i64));
    let (early, late) = (a.min(b) as i64, a.max(b) as i64);
    mapper.timestamp_to_x(Timestamp::from_secs(early)) <= mapper.timestamp_to_x(Timestamp::from_secs(late))
}

#[quickcheck]
fn price_round_trips_through_pixels(raw: i32) -> bool {
    let mapper = mapper(domain(-50_000.0, 50_000.0, 0, 60));
    let price = (raw % 5_000_000) as f64 / 100.0;
    (mapper.y_to_price(mapper.price_to_y(price)) - price).abs() < 1e-6
}

#[quickcheck]
fn timestamp_round_trips_through_pixels(raw: u16) -> bool {
    let mapper = mapper(domain(0.0, 1.0, 1_700_000_000, 1_700_065_535));
    let ts = Timestamp::from_secs(1_700_000_000 + raw as i64);
    mapper.x_to_timestamp(mapper.timestamp_to_x(ts)) == ts
}
