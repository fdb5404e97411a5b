use super::{MaxUnpool2D, PoolIndices};
use crate::{
    common::*,
    model::shape::{self, Chw},
};

/// Initializer of a decoder layer: `transposed conv -> [max unpool] -> [batch norm] -> activation`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeconvBn2DInit {
    pub in_c: usize,
    pub out_c: usize,
    pub k: usize,
    pub s: usize,
    pub p: usize,
    pub op: usize,
    pub max_unpool: bool,
    pub batch_norm: bool,
    /// Whether the convolution carries a bias term.
    pub bias: bool,
    pub activation: Activation,
}

impl DeconvBn2DInit {
    pub fn new(in_c: usize, out_c: usize, k: usize) -> Self {
        Self {
            in_c,
            out_c,
            k,
            s: 1,
            p: 1,
            op: 0,
            max_unpool: false,
            batch_norm: true,
            bias: false,
            activation: Activation::Relu,
        }
    }

    pub fn num_params(&self) -> usize {
        let Self {
            in_c, out_c, k, ..
        } = *self;
        let deconv = in_c * out_c * k * k + if self.bias { out_c } else { 0 };
        let bn = if self.batch_norm { 2 * out_c } else { 0 };
        deconv + bn
    }

    /// The output shape of the transposed convolution.
    ///
    /// Unpooling restores a recorded size, which the caller supplies to the
    /// stack-level shape inference.
    pub fn deconv_output_shape(&self, input: Chw) -> Result<Chw> {
        ensure!(
            input.c == self.in_c,
            "expect {} input channels, but get {}",
            self.in_c,
            input.c
        );
        Ok(Chw::new(
            self.out_c,
            shape::deconv_output_len(input.h, self.k, self.s, self.p, self.op)?,
            shape::deconv_output_len(input.w, self.k, self.s, self.p, self.op)?,
        ))
    }

    pub fn build<'p, P>(self, path: P) -> DeconvBn2D
    where
        P: Borrow<nn::Path<'p>>,
    {
        let path = path.borrow();

        let Self {
            in_c,
            out_c,
            k,
            s,
            p,
            op,
            max_unpool,
            batch_norm,
            bias,
            activation,
        } = self;

        let deconv = nn::conv_transpose2d(
            path / "deconv",
            in_c as i64,
            out_c as i64,
            k as i64,
            nn::ConvTransposeConfig {
                stride: s as i64,
                padding: p as i64,
                output_padding: op as i64,
                bias,
                ..Default::default()
            },
        );
        let max_unpool = max_unpool.then(|| MaxUnpool2D);
        let bn = batch_norm.then(|| nn::batch_norm2d(path / "bn", out_c as i64, Default::default()));

        DeconvBn2D {
            deconv,
            max_unpool,
            bn,
            activation,
        }
    }
}

#[derive(Debug)]
pub struct DeconvBn2D {
    deconv: nn::ConvTranspose2D,
    max_unpool: Option<MaxUnpool2D>,
    bn: Option<nn::BatchNorm>,
    activation: Activation,
}

impl DeconvBn2D {
    pub fn unpools(&self) -> bool {
        self.max_unpool.is_some()
    }

    pub fn forward_t(
        &self,
        xs: &Tensor,
        indices: Option<&PoolIndices>,
        train: bool,
    ) -> Result<Tensor> {
        let Self {
            ref deconv,
            ref max_unpool,
            ref bn,
            activation,
        } = *self;

        let xs = xs.apply(deconv);
        let xs = match (max_unpool, indices) {
            (Some(unpool), Some(indices)) => unpool.forward(&xs, indices)?,
            (Some(_), None) => bail!("unpooling layer received no pooling indices"),
            (None, _) => xs,
        };
        let xs = match bn {
            Some(bn) => xs.apply_t(bn, train),
            None => xs,
        };

        Ok(xs.activation(activation))
    }
}
