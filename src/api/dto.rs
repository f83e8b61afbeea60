use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::temperature::{AggregateTemperature, TemperatureStatus};

/// Response for `GET /temperature`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TemperatureDto {
    /// Mean of all `Temperatur` sensors, truncated to whole °C.
    pub temperature: i64,
    pub status: TemperatureStatus,
}

impl From<AggregateTemperature> for TemperatureDto {
    fn from(t: AggregateTemperature) -> Self {
        Self { temperature: t.value, status: t.status }
    }
}

/// Response for `GET /store`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StoreDto {
    pub temperature: i64,
    /// Name of the written snapshot; `null` when the write failed.
    pub object_name: Option<String>,
}

/// Error body, `{"detail": "..."}`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDto {
    pub detail: String,
}
