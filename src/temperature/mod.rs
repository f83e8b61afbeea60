pub mod service;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    error::TemperatureError,
    sensebox::models::{Reading, SenseBox},
};

pub use service::TemperatureService;

/// Exact sensor title that marks a temperature sensor on openSenseMap.
pub const TEMPERATURE_TITLE: &str = "Temperatur";

/// Lowest aggregate still considered `Good`.
pub const GOOD_MIN: i64 = 10;
/// Highest aggregate still considered `Good`.
pub const GOOD_MAX: i64 = 36;

/// Comfort band of an aggregate temperature.
///
/// The bands partition the integers: `< 10`, `10..=36`, `> 36`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum TemperatureStatus {
    #[serde(rename = "Too cold")]
    TooCold,
    #[serde(rename = "Good")]
    Good,
    #[serde(rename = "Too hot")]
    TooHot,
}

/// Classify an aggregate into its band. Pure and total.
pub fn classify(value: i64) -> TemperatureStatus {
    match value {
        v if v < GOOD_MIN => TemperatureStatus::TooCold,
        GOOD_MIN..=GOOD_MAX => TemperatureStatus::Good,
        _ => TemperatureStatus::TooHot,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregateTemperature {
    pub value: i64,
    pub status: TemperatureStatus,
}

impl AggregateTemperature {
    pub fn new(value: i64) -> Self {
        Self { value, status: classify(value) }
    }
}

/// Extract every `Temperatur` reading across all boxes.
///
/// A matching sensor without a measurement, or with a value that is not a
/// finite number, fails the whole extraction.
pub fn temperature_readings(boxes: &[SenseBox]) -> Result<Vec<Reading>, TemperatureError> {
    boxes
        .iter()
        .flat_map(|b| {
            b.sensors
                .iter()
                .filter(|s| s.title == TEMPERATURE_TITLE)
                .map(move |s| (b, s))
        })
        .map(|(b, s)| {
            let m = s.last_measurement.as_ref().ok_or_else(|| {
                TemperatureError::MalformedValue {
                    box_id: b.id.clone(),
                    raw: "<missing>".to_owned(),
                }
            })?;
            let value = m.value.as_f64().ok_or_else(|| TemperatureError::MalformedValue {
                box_id: b.id.clone(),
                raw: m.value.raw(),
            })?;
            Ok(Reading {
                sensor_title: s.title.clone(),
                value,
                captured_at: m.created_at,
            })
        })
        .collect()
}

/// Mean of all `Temperatur` readings, truncated toward zero.
pub fn aggregate(boxes: &[SenseBox]) -> Result<i64, TemperatureError> {
    let readings = temperature_readings(boxes)?;
    if readings.is_empty() {
        return Err(TemperatureError::NoDataFound);
    }
    let sum: f64 = readings.iter().map(|r| r.value).sum();
    let mean = sum / readings.len() as f64;
    Ok(mean.trunc() as i64)
}
