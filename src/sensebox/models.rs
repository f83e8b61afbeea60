use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

// ---------------------------------------------------------------------------
// GET /boxes?date=...&phenomenon=temperature&format=json
//
// The API returns a bare JSON array of boxes:
//
//   [ { "_id": "5a...", "name": "Station", "sensors": [
//         { "_id": "5b...", "title": "Temperatur", "unit": "°C",
//           "lastMeasurement": { "value": "21.34", "createdAt": "2024-..." } },
//         ...
//     ] }, ... ]
//
// Only the fields used by aggregation and probing are modelled; everything
// else is ignored by serde.
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SenseBox {
    #[serde(rename = "_id")]
    pub id: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub sensors: Vec<Sensor>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Sensor {
    #[serde(default)]
    pub title: String,

    #[serde(rename = "lastMeasurement", default)]
    pub last_measurement: Option<LastMeasurement>,
}

/// Decoded leniently: sensors other than `Temperatur` are never inspected,
/// so a `null`, missing or odd value must not reject the whole listing.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LastMeasurement {
    #[serde(default)]
    pub value: MeasurementValue,

    #[serde(rename = "createdAt", default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Unparseable timestamps decode as `None`.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = serde_json::Value::deserialize(deserializer)?;
    Ok(raw
        .as_str()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|t| t.with_timezone(&Utc)))
}

// ---------------------------------------------------------------------------
// MeasurementValue
//
// openSenseMap serialises measurements as strings ("21.34"), but some
// mirrors and older boxes emit bare numbers. Number MUST come before Text so
// a JSON number is never captured as a string. Anything else (null, bools,
// objects) lands in Other and only matters if the sensor is aggregated.
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum MeasurementValue {
    Number(f64),
    Text(String),
    Other(serde_json::Value),
}

impl Default for MeasurementValue {
    fn default() -> Self {
        MeasurementValue::Other(serde_json::Value::Null)
    }
}

impl MeasurementValue {
    /// Parse into a finite `f64`; `None` for anything else (including `NaN`).
    pub fn as_f64(&self) -> Option<f64> {
        let v = match self {
            MeasurementValue::Number(v) => *v,
            MeasurementValue::Text(s) => s.trim().parse().ok()?,
            MeasurementValue::Other(_) => return None,
        };
        v.is_finite().then_some(v)
    }

    /// Raw textual form, used in error messages.
    pub fn raw(&self) -> String {
        match self {
            MeasurementValue::Number(v) => v.to_string(),
            MeasurementValue::Text(s) => s.clone(),
            MeasurementValue::Other(v) => v.to_string(),
        }
    }
}

/// One sensor's latest measurement, flattened out of its box.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub sensor_title: String,
    pub value: f64,
    pub captured_at: Option<DateTime<Utc>>,
}
