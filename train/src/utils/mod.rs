//! Misc utilities.

mod checkpoint;
mod progress;
mod prompt;
mod rate_counter;

pub use checkpoint::*;
pub use progress::*;
pub use prompt::*;
pub use rate_counter::*;
