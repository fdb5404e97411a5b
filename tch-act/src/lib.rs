#[cfg(feature = "tch")]
pub use impls::*;
#[cfg(feature = "tch")]
mod impls;

#[cfg(feature = "tch")]
pub use r#trait::*;
#[cfg(feature = "tch")]
mod r#trait;

/// Element-wise activation functions used by the encoder/decoder stacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Activation {
    Linear,
    Relu,
    /// Leaky ReLU with slope 0.2 on the negative side.
    LRelu,
    Logistic,
    Tanh,
}

impl Activation {
    /// The layer name used in model summaries.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Linear => "Linear",
            Self::Relu => "ReLU",
            Self::LRelu => "LeakyReLU",
            Self::Logistic => "Sigmoid",
            Self::Tanh => "Tanh",
        }
    }
}
