use derive_more::Display;

/// Error taxonomy of the chart engine.
///
/// `Network` and `MalformedResponse` are recovered inside the candle store by
/// falling back to synthetic data; `EmptySeries` turns into a "no data" scene;
/// `DegenerateDomain` is absorbed by the domain calculator.
#[derive(Debug, Clone, PartialEq, Display)]
pub enum ChartError {
    #[display(fmt = "Network Error: {}", _0)]
    Network(String),
    #[display(fmt = "Malformed Response: {}", _0)]
    MalformedResponse(String),
    #[display(fmt = "Empty Series")]
    EmptySeries,
    #[display(fmt = "Degenerate Domain: {}", _0)]
    DegenerateDomain(String),
    #[display(fmt = "Validation Error: {}", _0)]
    Validation(String),
    #[display(fmt = "Rendering Error: {}", _0)]
    Rendering(String),
}

impl ChartError {
    /// Errors the candle store answers with synthetic data
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ChartError::Network(_) | ChartError::MalformedResponse(_) | ChartError::EmptySeries)
    }
}

impl std::error::Error for ChartError {}

impl From<serde_json::Error> for ChartError {
    fn from(error: serde_json::Error) -> Self {
        ChartError::MalformedResponse(error.to_string())
    }
}

impl From<url::ParseError> for ChartError {
    fn from(error: url::ParseError) -> Self {
        ChartError::Validation(format!("invalid url: {error}"))
    }
}

pub type ChartResult<T> = Result<T, ChartError>;
