pub mod dto;

use url::Url;

use crate::domain::errors::{ChartError, ChartResult};
use crate::domain::logging::LogComponent;
use crate::domain::market_data::{MarketDataPayload, MarketDataSource, SeriesKey};
use crate::log_debug;

pub use dto::{CandleDto, CandleResponseDto, parse_candle_response};

/// HTTP client for `GET /candles/{signalId}?interval=...`
#[derive(Debug, Clone)]
pub struct MarketDataHttpClient {
    base_url: Url,
}

impl MarketDataHttpClient {
    pub fn new(base_url: &str) -> ChartResult<Self> {
        let mut base_url = Url::parse(base_url.trim())?;
        if base_url.cannot_be_a_base() {
            return Err(ChartError::Validation(format!("{base_url} cannot be a base url")));
        }
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self { base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn candles_url(&self, key: &SeriesKey) -> ChartResult<Url> {
        let mut url = self.base_url.join("candles/")?;
        url.path_segments_mut()
            .map_err(|_| ChartError::Validation(format!("{} cannot be a base url", self.base_url)))?
            .pop_if_empty()
            .push(key.signal_id.value());
        url.query_pairs_mut().append_pair("interval", key.interval.as_ref());
        Ok(url)
    }

    #[cfg(target_arch = "wasm32")]
    async fn get_text(&self, url: &Url) -> ChartResult<String> {
        use gloo_net::http::Request;

        let response = Request::get(url.as_str())
            .send()
            .await
            .map_err(|e| ChartError::Network(format!("request failed: {e}")))?;
        if !response.ok() {
            return Err(ChartError::Network(format!(
                "HTTP error: {} - {}",
                response.status(),
                response.status_text()
            )));
        }
        response
            .text()
            .await
            .map_err(|e| ChartError::Network(format!("failed to read body: {e}")))
    }

    #[cfg(not(target_arch = "wasm32"))]
    async fn get_text(&self, url: &Url) -> ChartResult<String> {
        Err(ChartError::Network(format!("no HTTP transport on this target for {url}")))
    }
}

impl MarketDataSource for MarketDataHttpClient {
    async fn fetch_candles(&self, key: &SeriesKey) -> ChartResult<MarketDataPayload> {
        let url = self.candles_url(key)?;
        log_debug!(LogComponent::Infrastructure("MarketDataHttpClient"), "GET {}", url);
        let body = self.get_text(&url).await?;
        parse_candle_response(&body)
    }
}
