//! Loss functions for reconstruction and adversarial training.

mod bce_with_logits_loss;
mod masked_mse;
mod reconstruction;

pub use bce_with_logits_loss::*;
pub use masked_mse::*;
pub use reconstruction::*;
