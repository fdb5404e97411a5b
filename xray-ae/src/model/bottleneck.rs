use super::{
    autoencoder::{AutoencoderLayout, ConvAutoencoder},
    module::{ConvBn2DInit, DeconvBn2DInit},
    stack::LayerStack,
};
use crate::common::*;

/// The bottleneck autoencoder: the encoder max-pools after every layer but
/// the last and records the argmax indices, the decoder unpools with the
/// same indices in reverse order so the spatial correspondence is kept.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct BottleneckAutoencoderInit {
    pub encoder: LayerStack,
    pub decoder: LayerStack,
    pub batch_norm: bool,
    pub internal_activation: Activation,
    pub final_activation: Activation,
}

impl Default for BottleneckAutoencoderInit {
    fn default() -> Self {
        Self {
            encoder: LayerStack::new(
                [1, 16, 32, 64, 128, 256],
                [16, 32, 64, 128, 256, 256],
                [3, 4, 4, 4, 4, 1],
                [1, 2, 2, 2, 2, 1],
            ),
            decoder: LayerStack::new(
                [256, 256, 128, 64, 32, 16],
                [256, 128, 64, 32, 16, 1],
                [1, 4, 4, 4, 4, 3],
                [1, 2, 2, 2, 2, 1],
            ),
            batch_norm: true,
            internal_activation: Activation::Relu,
            final_activation: Activation::Logistic,
        }
    }
}

impl BottleneckAutoencoderInit {
    /// Lowers the stack description to per-layer initializers.
    ///
    /// Encoder layers are `conv -> [pool] -> [bn] -> act`, decoder layers are
    /// `deconv -> [unpool] -> [bn] -> act`. Neither the last encoder layer
    /// pools nor the last decoder layer unpools, and the last decoder layer
    /// uses the final activation without batch norm.
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
        ensure!(
            encoder.len() == decoder.len(),
            "the bottleneck encoder and decoder must have equal depth, but get {} and {}",
            encoder.len(),
            decoder.len()
        );

        let num_layers = encoder.len();

        let encoder_inits = encoder
            .layers()
            .enumerate()
            .map(|(index, layer)| ConvBn2DInit {
                s: layer.s,
                max_pool: index + 1 < num_layers,
                batch_norm,
                activation: internal_activation,
                ..ConvBn2DInit::new(layer.in_c, layer.out_c, layer.k)
            })
            .collect();

        let decoder_inits = decoder
            .layers()
            .enumerate()
            .map(|(index, layer)| {
                let is_last = index + 1 == num_layers;
                DeconvBn2DInit {
                    s: layer.s,
                    max_unpool: !is_last,
                    batch_norm: batch_norm && !is_last,
                    bias: !batch_norm,
                    activation: if is_last {
                        final_activation
                    } else {
                        internal_activation
                    },
                    ..DeconvBn2DInit::new(layer.in_c, layer.out_c, layer.k)
                }
            })
            .collect();

        Ok(AutoencoderLayout {
            encoder: encoder_inits,
            decoder: decoder_inits,
            final_activation: None,
        })
    }

    pub fn build<'p, P>(&self, path: P) -> Result<ConvAutoencoder>
    where
        P: Borrow<nn::Path<'p>>,
    {
        Ok(self.layout()?.build(path))
    }
}
