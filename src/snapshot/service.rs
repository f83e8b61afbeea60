use std::time::Duration;

use tokio::{task::JoinHandle, time};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::{
    cache::TemperatureCache, error::SnapshotError, storage::SnapshotWriter,
    temperature::TemperatureService,
};

/// Periodically persists the current aggregate to the object store.
pub struct SnapshotService {
    temperature: TemperatureService,
    cache: TemperatureCache,
    writer: SnapshotWriter,
    interval: Duration,
}

impl SnapshotService {
    pub fn new(
        temperature: TemperatureService,
        cache: TemperatureCache,
        writer: SnapshotWriter,
        interval: Duration,
    ) -> Self {
        Self { temperature, cache, writer, interval }
    }

    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    /// Runs until `shutdown` is cancelled.
    ///
    /// Each iteration finishes (or is cancelled) and is followed by a full
    /// interval of sleep, whether it succeeded or not.
    pub async fn run(self, shutdown: CancellationToken) {
        info!(interval_secs = self.interval.as_secs(), "Snapshot loop started");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                result = self.run_once() => {
                    if let Err(e) = result {
                        error!(error = %e, "Snapshot iteration failed");
                    }
                }
            }

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = time::sleep(self.interval) => {}
            }
        }

        info!("Snapshot loop stopped");
    }

    /// Persist the cached aggregate, or a freshly computed one on a miss.
    /// The cache is only read, never written.
    pub async fn run_once(&self) -> Result<String, SnapshotError> {
        let value = match self.cache.get().await? {
            Some(v) => v,
            None => {
                info!("Temperature not cached; fetching from openSenseMap");
                self.temperature.compute().await?
            }
        };
        Ok(self.writer.write(value).await?)
    }
}
