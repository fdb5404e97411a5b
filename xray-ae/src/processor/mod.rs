//! Image preprocessing and augmentation.

mod augmentation;
mod gray_scale;
mod hist_equalisation;
mod min_max;
mod padding;
mod preprocessor;
mod resize;

pub use augmentation::*;
pub use gray_scale::*;
pub use hist_equalisation::*;
pub use min_max::*;
pub use padding::*;
pub use preprocessor::*;
pub use resize::*;
