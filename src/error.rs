use thiserror::Error;

/// Failure talking to the openSenseMap API (network, timeout, non-2xx, or an
/// undecodable body).
#[derive(Debug, Error)]
#[error("upstream unavailable: {0}")]
pub struct UpstreamError(pub String);

impl From<reqwest::Error> for UpstreamError {
    fn from(e: reqwest::Error) -> Self {
        Self(e.to_string())
    }
}

/// The key-value cache could not be reached or returned something unusable.
#[derive(Debug, Error)]
#[error("cache unavailable: {0}")]
pub struct CacheError(pub String);

impl From<redis::RedisError> for CacheError {
    fn from(e: redis::RedisError) -> Self {
        Self(e.to_string())
    }
}

/// The durable object store rejected or failed a request.
#[derive(Debug, Error)]
#[error("object store error: {0}")]
pub struct StoreError(pub String);

impl From<reqwest::Error> for StoreError {
    fn from(e: reqwest::Error) -> Self {
        Self(e.to_string())
    }
}

/// Errors produced while computing the aggregate temperature.
#[derive(Debug, Error)]
pub enum TemperatureError {
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    /// No sensor titled `Temperatur` was found in any box.
    #[error("No temperature data found")]
    NoDataFound,

    /// A `Temperatur` sensor carried a value that is not a finite number.
    #[error("malformed measurement {raw:?} in senseBox {box_id}")]
    MalformedValue { box_id: String, raw: String },
}

/// Everything that can end a snapshot iteration early.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Temperature(#[from] TemperatureError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
