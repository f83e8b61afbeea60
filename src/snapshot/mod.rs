pub mod service;

pub use service::SnapshotService;
