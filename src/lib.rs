pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod health;
pub mod metrics;
pub mod sensebox;
pub mod snapshot;
pub mod storage;
pub mod temperature;

#[cfg(test)]
pub(crate) mod test_support;
