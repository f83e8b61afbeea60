pub mod availability;
pub mod readiness;

pub use availability::{AvailabilitySample, AvailabilitySampler};
pub use readiness::{ReadinessEvaluator, ReadinessStatus, ReadinessVerdict};
