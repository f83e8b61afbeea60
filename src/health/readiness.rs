use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info};
use utoipa::ToSchema;

use super::availability::{AvailabilitySample, AvailabilitySampler};
use crate::{
    cache::TemperatureCache,
    error::{CacheError, UpstreamError},
};

/// At or above this share of unreachable boxes the service is unavailable.
pub const UNAVAILABLE_THRESHOLD_PCT: f64 = 50.0;

pub const READY_MESSAGE: &str = "Application is ready";
pub const NO_BOXES_MESSAGE: &str = "No senseBoxes found";
pub const UNAVAILABLE_MESSAGE: &str = "More than 50% of senseBoxes are inaccessible";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ReadinessStatus {
    Ready,
    Unavailable,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ReadinessVerdict {
    pub status: ReadinessStatus,
    pub message: String,
}

impl ReadinessVerdict {
    pub fn ready() -> Self {
        Self { status: ReadinessStatus::Ready, message: READY_MESSAGE.to_owned() }
    }

    fn error(message: impl Into<String>) -> Self {
        Self { status: ReadinessStatus::Error, message: message.into() }
    }

    pub fn http_status(&self) -> StatusCode {
        match self.status {
            ReadinessStatus::Ready => StatusCode::OK,
            ReadinessStatus::Unavailable | ReadinessStatus::Error => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Verdict for a fresh availability sample (no cache involved).
    pub fn from_sample(sample: AvailabilitySample) -> Self {
        match sample.inaccessible_pct() {
            None => Self::error(NO_BOXES_MESSAGE),
            Some(pct) if pct >= UNAVAILABLE_THRESHOLD_PCT => Self {
                status: ReadinessStatus::Unavailable,
                message: UNAVAILABLE_MESSAGE.to_owned(),
            },
            Some(_) => Self::ready(),
        }
    }
}

#[derive(Debug, Error)]
enum ReadinessError {
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

/// Decides readiness from cache freshness first, upstream health second.
#[derive(Clone)]
pub struct ReadinessEvaluator {
    cache: TemperatureCache,
    sampler: AvailabilitySampler,
}

impl ReadinessEvaluator {
    pub fn new(cache: TemperatureCache, sampler: AvailabilitySampler) -> Self {
        Self { cache, sampler }
    }

    /// Never fails: any fault becomes an `Error` verdict.
    pub async fn evaluate(&self) -> ReadinessVerdict {
        match self.try_evaluate().await {
            Ok(verdict) => verdict,
            Err(e) => {
                error!(error = %e, "Readiness check failed");
                ReadinessVerdict::error(e.to_string())
            }
        }
    }

    async fn try_evaluate(&self) -> Result<ReadinessVerdict, ReadinessError> {
        if self.cache.is_fresh().await? {
            info!("Cached temperature is fresh; skipping senseBox probes");
            return Ok(ReadinessVerdict::ready());
        }

        let sample = self.sampler.sample().await?;
        let verdict = ReadinessVerdict::from_sample(sample);
        match verdict.status {
            ReadinessStatus::Ready => info!(
                total = sample.total,
                inaccessible = sample.inaccessible,
                "Application is ready"
            ),
            _ => error!(
                total = sample.total,
                inaccessible = sample.inaccessible,
                message = %verdict.message,
                "Application is not ready"
            ),
        }
        Ok(verdict)
    }
}
