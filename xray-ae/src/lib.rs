//! The building blocks of reconstruction-based radiograph anomaly detection.

mod common;
pub mod dataset;
pub mod loss;
pub mod metrics;
pub mod model;
pub mod processor;
