use super::{
    module::{ConvBn2D, ConvBn2DInit},
    shape::Chw,
    stack::LayerStack,
};
use crate::common::*;

/// The convolutional critic of the adversarial variant.
///
/// Strided `conv -> [bn] -> leaky relu` layers are followed by global
/// average pooling and a linear head producing one logit per image.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscriminatorInit {
    pub layers: LayerStack,
    pub batch_norm: bool,
}

impl Default for DiscriminatorInit {
    fn default() -> Self {
        Self {
            layers: LayerStack::new(
                [1, 16, 32, 64, 128],
                [16, 32, 64, 128, 256],
                [4, 4, 4, 4, 4],
                [2, 2, 2, 2, 2],
            ),
            batch_norm: true,
        }
    }
}

impl DiscriminatorInit {
    fn layer_inits(&self) -> Result<Vec<ConvBn2DInit>> {
        self.layers.validate("discriminator")?;

        let inits = self
            .layers
            .layers()
            .enumerate()
            .map(|(index, layer)| ConvBn2DInit {
                s: layer.s,
                // the first layer sees raw pixels
                batch_norm: self.batch_norm && index > 0,
                activation: Activation::LRelu,
                ..ConvBn2DInit::new(layer.in_c, layer.out_c, layer.k)
            })
            .collect();
        Ok(inits)
    }

    /// Checks that no feature map collapses for the given input shape.
    pub fn check_input_shape(&self, input_shape: Chw) -> Result<()> {
        self.layer_inits()?
            .iter()
            .enumerate()
            .try_fold(input_shape, |shape, (index, init)| {
                init.output_shape(shape)
                    .with_context(|| format!("invalid discriminator layer {}", index))
            })?;
        Ok(())
    }

    pub fn build<'p, P>(&self, path: P) -> Result<Discriminator>
    where
        P: Borrow<nn::Path<'p>>,
    {
        let path = path.borrow();
        let inits = self.layer_inits()?;
        let out_c = self
            .layers
            .last_out_channels()
            .ok_or_else(|| format_err!("the discriminator has no layers"))?;

        let convs = inits
            .into_iter()
            .enumerate()
            .map(|(index, init)| init.build(&(path / "conv") / index))
            .collect();
        let head = nn::linear(path / "head", out_c as i64, 1, Default::default());

        Ok(Discriminator { convs, head })
    }
}

#[derive(Debug)]
pub struct Discriminator {
    convs: Vec<ConvBn2D>,
    head: nn::Linear,
}

impl Discriminator {
    /// Produces a `[batch_size]` logit tensor, positive for images judged real.
    pub fn forward_t(&self, xs: &Tensor, train: bool) -> Result<Tensor> {
        let features = self
            .convs
            .iter()
            .try_fold(xs.shallow_clone(), |xs, conv| -> Result<_> {
                let (xs, _indices) = conv.forward_t(&xs, train)?;
                Ok(xs)
            })?;
        let pooled = features.mean_dim(&[2, 3], false, Kind::Float);
        Ok(pooled.apply(&self.head).view([-1]))
    }
}
