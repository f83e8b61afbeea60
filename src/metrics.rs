//! Prometheus instrumentation for the temperature read path.
//!
//! The registry is owned by [`Metrics`] and handed to whoever needs it, so
//! tests get an isolated registry per instance.

use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, Registry, TextEncoder};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub cache_hit: IntCounter,
    pub cache_miss: IntCounter,
    /// Time spent fetching and aggregating on a cache miss.
    pub api_response_time: Histogram,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let cache_hit = IntCounter::new("cache_hit_total", "Number of cache hits")?;
        let cache_miss = IntCounter::new("cache_miss_total", "Number of cache misses")?;
        let api_response_time = Histogram::with_opts(
            HistogramOpts::new("api_response_time_seconds", "API response time in seconds")
                .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0]),
        )?;

        registry.register(Box::new(cache_hit.clone()))?;
        registry.register(Box::new(cache_miss.clone()))?;
        registry.register(Box::new(api_response_time.clone()))?;

        Ok(Self { registry, cache_hit, cache_miss, api_response_time })
    }

    /// Text exposition of every registered metric.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buf)?;
        String::from_utf8(buf).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
