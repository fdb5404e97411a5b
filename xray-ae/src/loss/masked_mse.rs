use crate::common::*;

/// Mean squared error restricted to the valid pixels of a mask.
///
/// Both the input and the target are multiplied by the mask before the
/// squared error is taken. The mean reduction divides by the mask sum
/// instead of the pixel count. An all-zero mask yields a non-finite mean.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaskedMse {
    reduction: Reduction,
}

impl MaskedMse {
    pub fn new(reduction: Reduction) -> Self {
        Self { reduction }
    }

    pub fn reduction(&self) -> Reduction {
        self.reduction
    }

    pub fn forward(&self, input: &Tensor, target: &Tensor, mask: &Tensor) -> Result<Tensor> {
        ensure!(
            input.size() == target.size(),
            "input shape {:?} and target shape {:?} differ",
            input.size(),
            target.size()
        );

        let loss = (input * mask).mse_loss(&(target * mask), Reduction::None);

        let loss = match self.reduction {
            Reduction::None => loss,
            Reduction::Sum => loss.sum(Kind::Float),
            Reduction::Mean => loss.sum(Kind::Float) / mask.sum(Kind::Float),
            Reduction::Other(_) => bail!("unsupported reduction {:?}", self.reduction),
        };
        Ok(loss)
    }

    /// Sums the unreduced loss over `(C, H, W)`, producing a `[batch_size]` tensor.
    pub fn per_sample(input: &Tensor, target: &Tensor, mask: &Tensor) -> Result<Tensor> {
        let loss = Self::new(Reduction::None).forward(input, target, mask)?;
        Ok(loss.sum_dim_intlist(&[1, 2, 3], false, Kind::Float))
    }
}

impl Default for MaskedMse {
    fn default() -> Self {
        Self::new(Reduction::Mean)
    }
}
