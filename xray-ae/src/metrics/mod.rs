//! Anomaly detection metrics over per-sample reconstruction errors.

mod accumulator;
mod classification;
mod roc;

pub use accumulator::*;
pub use classification::*;
pub use roc::*;
