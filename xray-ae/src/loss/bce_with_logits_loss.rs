use crate::common::*;

/// Binary cross entropy on raw discriminator logits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BceWithLogitsLoss {
    reduction: Reduction,
}

impl BceWithLogitsLoss {
    pub fn new(reduction: Reduction) -> Self {
        Self { reduction }
    }

    pub fn forward(&self, input: &Tensor, target: &Tensor) -> Result<Tensor> {
        ensure!(
            input.size() == target.size(),
            "input and target tensors must have equal shape"
        );

        // return zero tensor if (1) input is empty and (2) using mean reduction
        if input.numel() == 0 && self.reduction == Reduction::Mean {
            return Ok(Tensor::zeros(&[], (Kind::Float, input.device())));
        }

        Ok(input.binary_cross_entropy_with_logits::<Tensor>(target, None, None, self.reduction))
    }

    /// The loss against the "real" label for every logit.
    pub fn real(&self, logits: &Tensor) -> Result<Tensor> {
        self.forward(logits, &logits.ones_like())
    }

    /// The loss against the "fake" label for every logit.
    pub fn fake(&self, logits: &Tensor) -> Result<Tensor> {
        self.forward(logits, &logits.zeros_like())
    }
}

impl Default for BceWithLogitsLoss {
    fn default() -> Self {
        Self::new(Reduction::Mean)
    }
}
