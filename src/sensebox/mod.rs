pub mod models;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use tracing::debug;

use crate::{config::Config, error::UpstreamError};

use self::models::SenseBox;

/// Phenomenon filter sent with every box listing.
pub const PHENOMENON: &str = "temperature";

/// Read-only view of the upstream sensor network.
#[async_trait]
pub trait SenseBoxSource: Send + Sync {
    /// List every box reporting the temperature phenomenon right now.
    async fn fetch_boxes(&self) -> Result<Vec<SenseBox>, UpstreamError>;

    /// Hit the box's sensor-detail resource and report the HTTP status.
    /// Transport failures (connect, timeout) are returned as errors.
    async fn probe_box(&self, box_id: &str) -> Result<StatusCode, UpstreamError>;
}

#[derive(Debug, Clone)]
pub struct OpenSenseMapClient {
    http: Client,
    base_url: String,
    fetch_timeout: Duration,
    probe_timeout: Duration,
}

impl OpenSenseMapClient {
    pub fn new(config: &Config) -> Self {
        Self {
            http: Client::new(),
            base_url: config.opensensemap_url.clone(),
            fetch_timeout: config.fetch_timeout,
            probe_timeout: config.probe_timeout,
        }
    }

    fn boxes_url(&self) -> Result<Url, UpstreamError> {
        let date = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string();
        Url::parse_with_params(
            &format!("{}/boxes", self.base_url),
            &[
                ("date", date.as_str()),
                ("phenomenon", PHENOMENON),
                ("format", "json"),
            ],
        )
        .map_err(|e| UpstreamError(format!("invalid openSenseMap URL: {e}")))
    }
}

#[async_trait]
impl SenseBoxSource for OpenSenseMapClient {
    async fn fetch_boxes(&self) -> Result<Vec<SenseBox>, UpstreamError> {
        let url = self.boxes_url()?;
        debug!(url = %url, "Fetching senseBoxes");

        let boxes = self
            .http
            .get(url)
            .timeout(self.fetch_timeout)
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<SenseBox>>()
            .await?;

        debug!(count = boxes.len(), "senseBoxes fetched");
        Ok(boxes)
    }

    async fn probe_box(&self, box_id: &str) -> Result<StatusCode, UpstreamError> {
        let url = format!("{}/boxes/{}/sensors", self.base_url, box_id);
        let resp = self
            .http
            .get(&url)
            .timeout(self.probe_timeout)
            .send()
            .await?;
        Ok(resp.status())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base_url: &str) -> OpenSenseMapClient {
        OpenSenseMapClient {
            http: Client::new(),
            base_url: base_url.to_owned(),
            fetch_timeout: Duration::from_secs(120),
            probe_timeout: Duration::from_secs(10),
        }
    }

    #[test]
    fn boxes_url_carries_filters() {
        let url = client("https://api.opensensemap.org").boxes_url().unwrap();
        assert_eq!(url.path(), "/boxes");

        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("phenomenon".into(), "temperature".into())));
        assert!(pairs.contains(&("format".into(), "json".into())));

        let (_, date) = pairs.iter().find(|(k, _)| k == "date").unwrap();
        assert!(date.ends_with('Z'));
        assert!(chrono::DateTime::parse_from_rfc3339(date).is_ok());
    }

    #[test]
    fn boxes_url_rejects_garbage_base() {
        let err = client("not a url").boxes_url().unwrap_err();
        assert!(err.to_string().contains("invalid openSenseMap URL"));
    }
}
