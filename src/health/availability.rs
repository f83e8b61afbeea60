use std::sync::Arc;

use futures::{future, stream, StreamExt};
use tracing::{debug, info};

use crate::{error::UpstreamError, sensebox::SenseBoxSource};

/// Result of one availability scan. `inaccessible <= total` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AvailabilitySample {
    pub total: usize,
    pub inaccessible: usize,
}

impl AvailabilitySample {
    /// Share of unreachable boxes in percent; `None` when there are no boxes.
    pub fn inaccessible_pct(&self) -> Option<f64> {
        (self.total > 0).then(|| self.inaccessible as f64 / self.total as f64 * 100.0)
    }
}

/// Probes every senseBox's sensor resource to estimate upstream health.
#[derive(Clone)]
pub struct AvailabilitySampler {
    source: Arc<dyn SenseBoxSource>,
    concurrency: usize,
}

impl AvailabilitySampler {
    /// `concurrency` must be non-zero; `Config` rejects `PROBE_CONCURRENCY=0`.
    pub fn new(source: Arc<dyn SenseBoxSource>, concurrency: usize) -> Self {
        Self { source, concurrency }
    }

    /// List all boxes, then probe each one independently.
    ///
    /// Only the listing can fail. A probe that errors or answers non-2xx is
    /// counted as inaccessible and the scan carries on.
    pub async fn sample(&self) -> Result<AvailabilitySample, UpstreamError> {
        let boxes = self.source.fetch_boxes().await?;
        let total = boxes.len();

        let probes = boxes.into_iter().map(|b| {
            let source = Arc::clone(&self.source);
            async move { is_accessible(source.as_ref(), &b.id).await }
        });
        let inaccessible = stream::iter(probes)
            .buffer_unordered(self.concurrency)
            .filter(|accessible| future::ready(!*accessible))
            .count()
            .await;

        info!(total, inaccessible, "senseBox availability sampled");
        Ok(AvailabilitySample { total, inaccessible })
    }

}

async fn is_accessible(source: &dyn SenseBoxSource, box_id: &str) -> bool {
    match source.probe_box(box_id).await {
        Ok(status) if status.is_success() => true,
        Ok(status) => {
            debug!(box_id = %box_id, status = %status, "senseBox probe returned error status");
            false
        }
        Err(e) => {
            debug!(box_id = %box_id, error = %e, "senseBox probe failed");
            false
        }
    }
}
