//! Dataset discovery, splitting and batching.

mod loader;
mod mura;
mod record;
mod splitter;

pub use loader::*;
pub use mura::*;
pub use record::*;
pub use splitter::*;
