use super::{
    module::{ConvBn2D, ConvBn2DInit, DeconvBn2D, DeconvBn2DInit, PoolIndices},
    shape::Chw,
    summary::{LayerSummary, ModelSummary},
};
use crate::common::*;

/// The layer-level description of a convolutional autoencoder.
///
/// Both the plain and the bottleneck variants lower to this layout.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AutoencoderLayout {
    pub encoder: Vec<ConvBn2DInit>,
    pub decoder: Vec<DeconvBn2DInit>,
    /// Applied once after the decoder stack.
    pub final_activation: Option<Activation>,
}

impl AutoencoderLayout {
    pub fn build<'p, P>(&self, path: P) -> ConvAutoencoder
    where
        P: Borrow<nn::Path<'p>>,
    {
        let path = path.borrow();

        let encoder: Vec<_> = self
            .encoder
            .iter()
            .enumerate()
            .map(|(index, init)| init.clone().build(&(path / "encoder") / index))
            .collect();
        let decoder: Vec<_> = self
            .decoder
            .iter()
            .enumerate()
            .map(|(index, init)| init.clone().build(&(path / "decoder") / index))
            .collect();

        ConvAutoencoder {
            encoder,
            decoder,
            final_activation: self.final_activation,
            layout: self.clone(),
        }
    }

    /// Infers the output shape of every block for the given input shape.
    ///
    /// It fails if a spatial size collapses to zero, if an unpooling layer
    /// has no matching pooling layer, or if the reconstruction shape differs
    /// from the input shape.
    pub fn summary(&self, input_shape: Chw) -> Result<ModelSummary> {
        let mut layers = vec![];
        let mut pooled_shapes: Vec<(Chw, Chw)> = vec![];
        let mut shape = input_shape;

        for (index, init) in self.encoder.iter().enumerate() {
            let output = init
                .output_shape(shape)
                .with_context(|| format!("invalid encoder layer {}", index))?;

            if init.max_pool {
                let pre_pool = ConvBn2DInit {
                    max_pool: false,
                    ..init.clone()
                }
                .output_shape(shape)?;
                pooled_shapes.push((pre_pool, output));
            }

            let kind = layer_kind(&[
                Some("Conv2d"),
                init.max_pool.then(|| "MaxPool2d"),
                init.batch_norm.then(|| "BatchNorm2d"),
                Some(init.activation.name()),
            ]);
            layers.push(LayerSummary {
                name: format!("encoder.{}", index),
                kind,
                output_shape: output,
                num_params: init.num_params(),
            });
            shape = output;
        }

        for (index, init) in self.decoder.iter().enumerate() {
            let deconv = init
                .deconv_output_shape(shape)
                .with_context(|| format!("invalid decoder layer {}", index))?;

            let output = if init.max_unpool {
                let (pre_pool, pooled) = pooled_shapes.pop().ok_or_else(|| {
                    format_err!("decoder layer {} unpools without a matching pooling layer", index)
                })?;
                ensure!(
                    deconv == pooled,
                    "decoder layer {} produces {} but the matching pooling indices have shape {}",
                    index,
                    deconv,
                    pooled
                );
                pre_pool
            } else {
                deconv
            };

            let kind = layer_kind(&[
                Some("ConvTranspose2d"),
                init.max_unpool.then(|| "MaxUnpool2d"),
                init.batch_norm.then(|| "BatchNorm2d"),
                Some(init.activation.name()),
            ]);
            layers.push(LayerSummary {
                name: format!("decoder.{}", index),
                kind,
                output_shape: output,
                num_params: init.num_params(),
            });
            shape = output;
        }

        if let Some(act) = self.final_activation {
            layers.push(LayerSummary {
                name: "final".into(),
                kind: act.name().into(),
                output_shape: shape,
                num_params: 0,
            });
        }

        ensure!(
            pooled_shapes.is_empty(),
            "{} pooling layers have no matching unpooling layer",
            pooled_shapes.len()
        );
        ensure!(
            shape == input_shape,
            "the reconstruction shape {} does not match the input shape {}",
            shape,
            input_shape
        );

        Ok(ModelSummary {
            input_shape,
            layers,
        })
    }
}

/// Joins the present layer kinds with `+`.
fn layer_kind(parts: &[Option<&str>]) -> String {
    parts.iter().flatten().join("+")
}

/// A convolutional encoder/decoder network.
#[derive(Debug)]
pub struct ConvAutoencoder {
    encoder: Vec<ConvBn2D>,
    decoder: Vec<DeconvBn2D>,
    final_activation: Option<Activation>,
    layout: AutoencoderLayout,
}

impl ConvAutoencoder {
    pub fn layout(&self) -> &AutoencoderLayout {
        &self.layout
    }

    pub fn summary(&self, input_shape: Chw) -> Result<ModelSummary> {
        self.layout.summary(input_shape)
    }

    /// Encodes the input, returning the code and the recorded pooling indices.
    pub fn encode(&self, xs: &Tensor, train: bool) -> Result<(Tensor, Vec<PoolIndices>)> {
        let mut indices_stack = vec![];
        let xs = self
            .encoder
            .iter()
            .try_fold(xs.shallow_clone(), |xs, layer| -> Result<_> {
                let (xs, indices) = layer.forward_t(&xs, train)?;
                indices_stack.extend(indices);
                Ok(xs)
            })?;
        Ok((xs, indices_stack))
    }

    /// Decodes a code, consuming pooling indices in reverse order of recording.
    pub fn decode(
        &self,
        code: &Tensor,
        mut indices_stack: Vec<PoolIndices>,
        train: bool,
    ) -> Result<Tensor> {
        let xs = self
            .decoder
            .iter()
            .try_fold(code.shallow_clone(), |xs, layer| -> Result<_> {
                let indices = if layer.unpools() {
                    Some(
                        indices_stack
                            .pop()
                            .ok_or_else(|| format_err!("pooling indices are exhausted"))?,
                    )
                } else {
                    None
                };
                layer.forward_t(&xs, indices.as_ref(), train)
            })?;
        ensure!(
            indices_stack.is_empty(),
            "{} pooling indices were not consumed",
            indices_stack.len()
        );

        let xs = match self.final_activation {
            Some(act) => xs.activation(act),
            None => xs,
        };
        Ok(xs)
    }

    pub fn forward_t(&self, xs: &Tensor, train: bool) -> Result<Tensor> {
        let (code, indices) = self.encode(xs, train)?;
        self.decode(&code, indices, train)
    }
}
