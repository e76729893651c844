use crate::domain::market_data::Timestamp;

use super::price_domain::PriceDomain;
use super::value_objects::PlotRect;
use super::viewport::Viewport;

/// Maps prices and timestamps to pixels for one domain/viewport pair.
///
/// Every layer places its primitives through this type so that all of them
/// agree on the geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateMapper {
    domain: PriceDomain,
    viewport: Viewport,
}

impl CoordinateMapper {
    pub fn new(domain: PriceDomain, viewport: Viewport) -> Self {
        Self { domain, viewport }
    }

    pub fn domain(&self) -> &PriceDomain {
        &self.domain
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn plot_rect(&self) -> PlotRect {
        self.viewport.plot_rect()
    }

    /// Higher prices map to smaller y
    pub fn price_to_y(&self, price: f64) -> f64 {
        let layout = &self.viewport.layout;
        let span = self.domain.price_span();
        if span <= 0.0 || !span.is_finite() {
            return layout.top_pad + layout.plot_height() / 2.0;
        }
        layout.top_pad + (self.domain.price_max - price) / span * layout.plot_height()
    }

    pub fn y_to_price(&self, y: f64) -> f64 {
        let layout = &self.viewport.layout;
        let plot_height = layout.plot_height();
        if plot_height <= 0.0 {
            return (self.domain.price_min + self.domain.price_max) / 2.0;
        }
        self.domain.price_max - (y - layout.top_pad) / plot_height * self.domain.price_span()
    }

    /// Horizontal position before zoom and pan
    pub fn timestamp_base_x(&self, ts: Timestamp) -> f64 {
        let layout = &self.viewport.layout;
        let span = self.domain.time_span();
        if span == 0 {
            return layout.left_pad;
        }
        let offset = (ts.value() - self.domain.time_min.value()) as f64;
        layout.left_pad + offset / span as f64 * layout.plot_width()
    }

    pub fn timestamp_to_x(&self, ts: Timestamp) -> f64 {
        if self.domain.time_span() == 0 {
            return self.viewport.layout.left_pad;
        }
        self.viewport.transform_x(self.timestamp_base_x(ts))
    }

    /// Inverse of [`timestamp_to_x`](Self::timestamp_to_x), rounded to whole seconds
    pub fn x_to_timestamp(&self, x: f64) -> Timestamp {
        let layout = &self.viewport.layout;
        let span = self.domain.time_span();
        let plot_width = layout.plot_width();
        if span == 0 || plot_width <= 0.0 || self.viewport.zoom == 0.0 {
            return self.domain.time_min;
        }
        let base_x = self.viewport.inverse_transform_x(x);
        let fraction = (base_x - layout.left_pad) / plot_width;
        let secs = self.domain.time_min.as_f64() + fraction * span as f64;
        Timestamp::from_secs(secs.round() as i64)
    }

    /// Pixel distance between two consecutive buckets of `interval_secs`, after zoom
    pub fn bucket_width(&self, interval_secs: i64) -> f64 {
        let span = self.domain.time_span();
        if span == 0 {
            return self.viewport.layout.plot_width() * self.viewport.zoom;
        }
        interval_secs as f64 / span as f64 * self.viewport.layout.plot_width() * self.viewport.zoom
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::chart::viewport::PlotLayout;

    fn mapper() -> CoordinateMapper {
        let domain = PriceDomain {
            price_min: 90.0,
            price_max: 110.0,
            time_min: Timestamp::from_secs(0),
            time_max: Timestamp::from_secs(60),
        };
        CoordinateMapper::new(domain, Viewport::new(PlotLayout::default()))
    }

    #[test]
    fn maps_domain_corners_to_plot_corners() {
        let mapper = mapper();
        assert_eq!(mapper.price_to_y(110.0), 40.0);
        assert_eq!(mapper.price_to_y(90.0), 360.0);
        assert_eq!(mapper.timestamp_to_x(Timestamp::from_secs(0)), 40.0);
        assert_eq!(mapper.timestamp_to_x(Timestamp::from_secs(60)), 760.0);
    }

    #[test]
    fn inverse_mapping() {
        let mapper = mapper();
        assert!((mapper.y_to_price(mapper.price_to_y(97.3)) - 97.3).abs() < 1e-9);
        assert_eq!(mapper.x_to_timestamp(400.0).value(), 30);
    }

    #[test]
    fn collapsed_time_range_returns_left_pad() {
        let mut domain = *mapper().domain();
        domain.time_max = domain.time_min;
        let mut viewport = Viewport::new(PlotLayout::default());
        viewport.zoom = 2.0;
        viewport.pan_offset.x = 17.0;
        let mapper = CoordinateMapper::new(domain, viewport);
        assert_eq!(mapper.timestamp_to_x(Timestamp::from_secs(999)), 40.0);
    }

    #[test]
    fn collapsed_price_range_stays_finite() {
        let mut domain = *mapper().domain();
        domain.price_max = domain.price_min;
        let mapper = CoordinateMapper::new(domain, Viewport::new(PlotLayout::default()));
        let y = mapper.price_to_y(90.0);
        assert!(y.is_finite());
        assert_eq!(y, 200.0);
    }

    #[test]
    fn bucket_width_scales_with_zoom() {
        let mut viewport = Viewport::new(PlotLayout::default());
        viewport.zoom = 2.0;
        let mapper = CoordinateMapper::new(*mapper().domain(), viewport);
        assert!((mapper.bucket_width(6) - 144.0).abs() < 1e-9);
    }
}
