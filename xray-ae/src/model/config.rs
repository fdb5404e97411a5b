use super::{
    autoencoder::AutoencoderLayout, baseline::BaselineAutoencoderInit,
    bottleneck::BottleneckAutoencoderInit, dcgan::DcganInit,
};
use crate::common::*;

/// Selects one of the model variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum ModelInit {
    Baseline(BaselineAutoencoderInit),
    Bottleneck(BottleneckAutoencoderInit),
    Dcgan(DcganInit),
}

impl ModelInit {
    /// The model name, used for experiment names and saved model files.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Baseline(_) => "BaselineAutoencoder",
            Self::Bottleneck(_) => "BottleneckAutoencoder",
            Self::Dcgan(_) => "DCGAN",
        }
    }

    /// The layout of the network that reconstructs images.
    pub fn autoencoder_layout(&self) -> Result<AutoencoderLayout> {
        match self {
            Self::Baseline(init) => init.layout(),
            Self::Bottleneck(init) => init.layout(),
            Self::Dcgan(init) => init.generator.layout(),
        }
    }

    pub fn batch_norm(&self) -> bool {
        match self {
            Self::Baseline(init) => init.batch_norm,
            Self::Bottleneck(init) => init.batch_norm,
            Self::Dcgan(init) => init.generator.batch_norm,
        }
    }
}
