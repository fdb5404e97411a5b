//! Layer building blocks of the encoder/decoder stacks.

mod conv_bn_2d;
mod deconv_bn_2d;
mod max_pool_2d;

pub use conv_bn_2d::*;
pub use deconv_bn_2d::*;
pub use max_pool_2d::*;
