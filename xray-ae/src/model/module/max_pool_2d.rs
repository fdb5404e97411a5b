use crate::{
    common::*,
    model::shape::{self, Chw},
};

/// The argmax locations recorded by a [MaxPool2D] layer.
///
/// The pre-pooling spatial size is kept alongside the indices so that the
/// matching [MaxUnpool2D] restores the exact input size, including odd
/// lengths that pooling rounds down.
#[derive(Debug, TensorLike)]
pub struct PoolIndices {
    pub indices: Tensor,
    #[tensor_like(clone)]
    pub input_hw: [i64; 2],
}

/// 2x2 max pooling with stride 2 that records pooling indices.
#[derive(Debug, Clone, Copy, Default)]
pub struct MaxPool2D;

impl MaxPool2D {
    pub const KERNEL: i64 = 2;
    pub const STRIDE: i64 = 2;

    pub fn forward(&self, xs: &Tensor) -> Result<(Tensor, PoolIndices)> {
        let (_b, _c, h, w) = xs.size4()?;
        let (output, indices) = xs.f_max_pool2d_with_indices(
            &[Self::KERNEL, Self::KERNEL],
            &[Self::STRIDE, Self::STRIDE],
            &[0, 0],
            &[1, 1],
            false,
        )?;
        Ok((
            output,
            PoolIndices {
                indices,
                input_hw: [h, w],
            },
        ))
    }

    pub fn output_shape(&self, input: Chw) -> Result<Chw> {
        Ok(Chw::new(
            input.c,
            shape::pool_output_len(input.h)?,
            shape::pool_output_len(input.w)?,
        ))
    }
}

/// The inverse of [MaxPool2D], scattering values back to the recorded argmax locations.
#[derive(Debug, Clone, Copy, Default)]
pub struct MaxUnpool2D;

impl MaxUnpool2D {
    pub fn forward(&self, xs: &Tensor, indices: &PoolIndices) -> Result<Tensor> {
        let PoolIndices {
            indices,
            input_hw: [h, w],
        } = indices;
        ensure!(
            xs.size() == indices.size(),
            "unpooling input shape {:?} does not match recorded indices shape {:?}",
            xs.size(),
            indices.size()
        );
        let output = xs.f_max_unpool2d(indices, &[*h, *w])?;
        Ok(output)
    }
}
