//! In-memory collaborators shared by unit and handler tests.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use reqwest::StatusCode;

use crate::{
    cache::KeyValueStore,
    error::{CacheError, StoreError, UpstreamError},
    sensebox::{
        models::{LastMeasurement, MeasurementValue, SenseBox, Sensor},
        SenseBoxSource,
    },
    storage::ObjectStore,
};

/// A box whose sensors are all titled `Temperatur` with the given values.
pub fn box_with(id: &str, values: &[&str]) -> SenseBox {
    SenseBox {
        id: id.to_owned(),
        name: None,
        sensors: values
            .iter()
            .map(|v| Sensor {
                title: "Temperatur".to_owned(),
                last_measurement: Some(LastMeasurement {
                    value: MeasurementValue::Text((*v).to_owned()),
                    created_at: None,
                }),
            })
            .collect(),
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Probe {
    Status(StatusCode),
    Unreachable,
}

/// Scripted [`SenseBoxSource`]. Probes default to `200 OK`.
pub struct FakeSource {
    boxes: Result<Vec<SenseBox>, String>,
    probes: HashMap<String, Probe>,
    fetch_calls: AtomicUsize,
    probe_calls: AtomicUsize,
}

impl FakeSource {
    pub fn with_boxes(boxes: Vec<SenseBox>) -> Self {
        Self {
            boxes: Ok(boxes),
            probes: HashMap::new(),
            fetch_calls: AtomicUsize::new(0),
            probe_calls: AtomicUsize::new(0),
        }
    }

    pub fn unavailable(message: &str) -> Self {
        Self { boxes: Err(message.to_owned()), ..Self::with_boxes(vec![]) }
    }

    /// `n` boxes named `box-0..n`, each with one `20` reading; the first
    /// `down` of them fail their probe with `503`.
    pub fn fleet(n: usize, down: usize) -> Self {
        let boxes = (0..n).map(|i| box_with(&format!("box-{i}"), &["20"])).collect();
        let mut source = Self::with_boxes(boxes);
        for i in 0..down {
            source = source.probe(&format!("box-{i}"), Probe::Status(StatusCode::SERVICE_UNAVAILABLE));
        }
        source
    }

    pub fn probe(mut self, box_id: &str, outcome: Probe) -> Self {
        self.probes.insert(box_id.to_owned(), outcome);
        self
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn probe_calls(&self) -> usize {
        self.probe_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SenseBoxSource for FakeSource {
    async fn fetch_boxes(&self) -> Result<Vec<SenseBox>, UpstreamError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.boxes.clone().map_err(UpstreamError)
    }

    async fn probe_box(&self, box_id: &str) -> Result<StatusCode, UpstreamError> {
        self.probe_calls.fetch_add(1, Ordering::SeqCst);
        match self.probes.get(box_id) {
            None => Ok(StatusCode::OK),
            Some(Probe::Status(s)) => Ok(*s),
            Some(Probe::Unreachable) => Err(UpstreamError(format!("{box_id}: connection reset"))),
        }
    }
}

/// Cache backend whose every call fails.
pub struct FailingKvStore;

#[async_trait]
impl KeyValueStore for FailingKvStore {
    async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        Err(CacheError("connection refused".to_owned()))
    }

    async fn set_ex(&self, _key: &str, _value: &[u8], _ttl: Duration) -> Result<(), CacheError> {
        Err(CacheError("connection refused".to_owned()))
    }

    async fn ttl(&self, _key: &str) -> Result<Option<Duration>, CacheError> {
        Err(CacheError("connection refused".to_owned()))
    }
}

/// Object store that records every upload, or fails every call.
#[derive(Default)]
pub struct RecordingStore {
    fail: bool,
    objects: Mutex<Vec<(String, String, Vec<u8>)>>,
    put_calls: AtomicUsize,
}

impl RecordingStore {
    pub fn failing() -> Self {
        Self { fail: true, ..Self::default() }
    }

    pub fn put_calls(&self) -> usize {
        self.put_calls.load(Ordering::SeqCst)
    }

    /// `(bucket, name, body)` of every successful upload, in order.
    pub fn objects(&self) -> Vec<(String, String, Vec<u8>)> {
        self.objects.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObjectStore for RecordingStore {
    async fn ensure_bucket(&self, _bucket: &str) -> Result<(), StoreError> {
        if self.fail {
            return Err(StoreError("bucket check refused".to_owned()));
        }
        Ok(())
    }

    async fn put_object(&self, bucket: &str, name: &str, body: Vec<u8>) -> Result<(), StoreError> {
        self.put_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(StoreError("disk full".to_owned()));
        }
        self.objects
            .lock()
            .unwrap()
            .push((bucket.to_owned(), name.to_owned(), body));
        Ok(())
    }
}
