use super::{MaxPool2D, PoolIndices};
use crate::{
    common::*,
    model::shape::{self, Chw},
};

/// Initializer of an encoder layer: `conv -> [max pool] -> [batch norm] -> activation`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConvBn2DInit {
    pub in_c: usize,
    pub out_c: usize,
    pub k: usize,
    pub s: usize,
    pub p: usize,
    pub max_pool: bool,
    pub batch_norm: bool,
    pub activation: Activation,
}

impl ConvBn2DInit {
    pub fn new(in_c: usize, out_c: usize, k: usize) -> Self {
        Self {
            in_c,
            out_c,
            k,
            s: 1,
            p: 1,
            max_pool: false,
            batch_norm: true,
            activation: Activation::Relu,
        }
    }

    /// The convolution has a bias term only if batch normalization is disabled.
    pub fn bias(&self) -> bool {
        !self.batch_norm
    }

    pub fn num_params(&self) -> usize {
        let Self {
            in_c, out_c, k, ..
        } = *self;
        let conv = in_c * out_c * k * k + if self.bias() { out_c } else { 0 };
        let bn = if self.batch_norm { 2 * out_c } else { 0 };
        conv + bn
    }

    pub fn output_shape(&self, input: Chw) -> Result<Chw> {
        ensure!(
            input.c == self.in_c,
            "expect {} input channels, but get {}",
            self.in_c,
            input.c
        );
        let conv = Chw::new(
            self.out_c,
            shape::conv_output_len(input.h, self.k, self.s, self.p)?,
            shape::conv_output_len(input.w, self.k, self.s, self.p)?,
        );
        if self.max_pool {
            MaxPool2D.output_shape(conv)
        } else {
            Ok(conv)
        }
    }

    pub fn build<'p, P>(self, path: P) -> ConvBn2D
    where
        P: Borrow<nn::Path<'p>>,
    {
        let path = path.borrow();
        let bias = self.bias();

        let Self {
            in_c,
            out_c,
            k,
            s,
            p,
            max_pool,
            batch_norm,
            activation,
        } = self;

        let conv = nn::conv2d(
            path / "conv",
            in_c as i64,
            out_c as i64,
            k as i64,
            nn::ConvConfig {
                stride: s as i64,
                padding: p as i64,
                bias,
                ..Default::default()
            },
        );
        let max_pool = max_pool.then(|| MaxPool2D);
        let bn = batch_norm.then(|| nn::batch_norm2d(path / "bn", out_c as i64, Default::default()));

        ConvBn2D {
            conv,
            max_pool,
            bn,
            activation,
        }
    }
}

#[derive(Debug)]
pub struct ConvBn2D {
    conv: nn::Conv2D,
    max_pool: Option<MaxPool2D>,
    bn: Option<nn::BatchNorm>,
    activation: Activation,
}

impl ConvBn2D {
    /// Runs the layer, returning the pooling indices if the layer pools.
    pub fn forward_t(&self, xs: &Tensor, train: bool) -> Result<(Tensor, Option<PoolIndices>)> {
        let Self {
            ref conv,
            ref max_pool,
            ref bn,
            activation,
        } = *self;

        let xs = xs.apply(conv);
        let (xs, indices) = match max_pool {
            Some(pool) => {
                let (xs, indices) = pool.forward(&xs)?;
                (xs, Some(indices))
            }
            None => (xs, None),
        };
        let xs = match bn {
            Some(bn) => xs.apply_t(bn, train),
            None => xs,
        };

        Ok((xs.activation(activation), indices))
    }
}
