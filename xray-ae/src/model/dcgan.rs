use super::{baseline::BaselineAutoencoderInit, discriminator::DiscriminatorInit};
use crate::common::*;

/// The adversarially regularized autoencoder.
///
/// The generator is a plain autoencoder trained on reconstruction loss plus
/// a weighted adversarial term. Anomaly scores still come from the
/// reconstruction error of the generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DcganInit {
    pub generator: BaselineAutoencoderInit,
    pub discriminator: DiscriminatorInit,
    /// The weight of the adversarial term in the generator loss.
    pub adversarial_weight: R64,
}

impl Default for DcganInit {
    fn default() -> Self {
        Self {
            generator: BaselineAutoencoderInit {
                final_activation: Activation::Logistic,
                ..Default::default()
            },
            discriminator: Default::default(),
            adversarial_weight: r64(1e-3),
        }
    }
}
