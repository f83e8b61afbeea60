use std::sync::Arc;

use tracing::{info, warn};

use super::{aggregate, AggregateTemperature};
use crate::{
    cache::TemperatureCache, error::TemperatureError, metrics::Metrics,
    sensebox::SenseBoxSource,
};

/// Cache-first read path for the aggregate temperature.
#[derive(Clone)]
pub struct TemperatureService {
    source: Arc<dyn SenseBoxSource>,
    cache: TemperatureCache,
    metrics: Metrics,
}

impl TemperatureService {
    pub fn new(source: Arc<dyn SenseBoxSource>, cache: TemperatureCache, metrics: Metrics) -> Self {
        Self { source, cache, metrics }
    }

    /// Fetch every box from upstream and reduce to one aggregate.
    /// Never touches the cache.
    pub async fn compute(&self) -> Result<i64, TemperatureError> {
        let boxes = self.source.fetch_boxes().await?;
        aggregate(&boxes)
    }

    /// Serve from cache when possible, otherwise compute and cache.
    ///
    /// A cache that cannot be read is treated as a miss, and a failed write
    /// after a successful computation is only logged.
    pub async fn current(&self) -> Result<AggregateTemperature, TemperatureError> {
        let cached = self.cache.get().await.unwrap_or_else(|e| {
            warn!(error = %e, "Cache read failed; falling back to openSenseMap");
            None
        });

        if let Some(value) = cached {
            self.metrics.cache_hit.inc();
            info!(temperature = value, "Temperature served from cache");
            return Ok(AggregateTemperature::new(value));
        }

        self.metrics.cache_miss.inc();
        info!("Cache miss; fetching temperature from openSenseMap");

        let timer = self.metrics.api_response_time.start_timer();
        let value = match self.compute().await {
            Ok(v) => v,
            Err(e) => {
                timer.stop_and_discard();
                return Err(e);
            }
        };

        if let Err(e) = self.cache.put(value).await {
            warn!(error = %e, "Failed to cache temperature");
        } else {
            info!(temperature = value, "Temperature stored in cache");
        }
        timer.observe_duration();

        Ok(AggregateTemperature::new(value))
    }
}
