use super::{
    autoencoder::{AutoencoderLayout, ConvAutoencoder},
    module::{ConvBn2DInit, DeconvBn2DInit},
    stack::LayerStack,
};
use crate::common::*;

/// The plain autoencoder: strided convolutions mirrored by transposed
/// convolutions, without skip connections.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct BaselineAutoencoderInit {
    pub encoder: LayerStack,
    pub decoder: LayerStack,
    pub batch_norm: bool,
    pub internal_activation: Activation,
    pub final_activation: Activation,
}

impl Default for BaselineAutoencoderInit {
    fn default() -> Self {
        Self {
            encoder: LayerStack::new(
                [1, 16, 32, 32, 64, 64, 128, 128, 256, 256],
                [16, 32, 32, 64, 64, 128, 128, 256, 256, 512],
                [3, 4, 3, 4, 3, 4, 3, 4, 3, 4],
                [1, 2, 1, 2, 1, 2, 1, 2, 1, 2],
            ),
            decoder: LayerStack::new(
                [512, 256, 128, 64, 32, 16],
                [256, 128, 64, 32, 16, 1],
                [4, 4, 4, 4, 4, 3],
                [2, 2, 2, 2, 2, 1],
            ),
            batch_norm: true,
            internal_activation: Activation::Relu,
            final_activation: Activation::Tanh,
        }
    }
}

impl BaselineAutoencoderInit {
    /// Lowers the stack description to per-layer initializers.
    ///
    /// Every encoder layer is `conv -> [bn] -> act`. Every decoder layer is
    /// `deconv -> [bn] -> act` with no batch norm after the last one, and
    /// the final activation follows the whole decoder.
    pub fn layout(&self) -> Result<AutoencoderLayout> {
        let Self {
            ref encoder,
            ref decoder,
            batch_norm,
            internal_activation,
            final_activation,
        } = *self;

        encoder.validate("encoder")?;
        decoder.validate("decoder")?;
        ensure!(
            encoder.last_out_channels() == decoder.first_in_channels(),
            "the encoder outputs {:?} channels but the decoder expects {:?}",
            encoder.last_out_channels(),
            decoder.first_in_channels()
        );

        let encoder_inits = encoder
            .layers()
            .map(|layer| ConvBn2DInit {
                s: layer.s,
                batch_norm,
                activation: internal_activation,
                ..ConvBn2DInit::new(layer.in_c, layer.out_c, layer.k)
            })
            .collect();

        let num_decoder_layers = decoder.len();
        let decoder_inits = decoder
            .layers()
            .enumerate()
            .map(|(index, layer)| {
                let is_last = index + 1 == num_decoder_layers;
                DeconvBn2DInit {
                    s: layer.s,
                    batch_norm: batch_norm && !is_last,
                    bias: !batch_norm,
                    activation: internal_activation,
                    ..DeconvBn2DInit::new(layer.in_c, layer.out_c, layer.k)
                }
            })
            .collect();

        Ok(AutoencoderLayout {
            encoder: encoder_inits,
            decoder: decoder_inits,
            final_activation: Some(final_activation),
        })
    }

    pub fn build<'p, P>(&self, path: P) -> Result<ConvAutoencoder>
    where
        P: Borrow<nn::Path<'p>>,
    {
        Ok(self.layout()?.build(path))
    }
}
