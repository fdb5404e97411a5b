use super::MaskedMse;
use crate::common::*;

/// Selects masked or unmasked mean squared error.
///
/// Training and evaluation choose their variant independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReconstructionLoss {
    Masked,
    Plain,
}

impl ReconstructionLoss {
    pub fn new(masked: bool) -> Self {
        if masked {
            Self::Masked
        } else {
            Self::Plain
        }
    }

    pub fn forward(
        &self,
        input: &Tensor,
        target: &Tensor,
        mask: &Tensor,
        reduction: Reduction,
    ) -> Result<Tensor> {
        match self {
            Self::Masked => MaskedMse::new(reduction).forward(input, target, mask),
            Self::Plain => {
                ensure!(
                    input.size() == target.size(),
                    "input shape {:?} and target shape {:?} differ",
                    input.size(),
                    target.size()
                );
                Ok(input.mse_loss(target, reduction))
            }
        }
    }

    /// Per-sample reconstruction error normalized by each sample's mask sum.
    ///
    /// The output is a `[batch_size]` tensor used as anomaly scores.
    pub fn anomaly_scores(&self, input: &Tensor, target: &Tensor, mask: &Tensor) -> Result<Tensor> {
        let loss = self.forward(input, target, mask, Reduction::None)?;
        let summed = loss.sum_dim_intlist(&[1, 2, 3], false, Kind::Float);
        let valid = mask.sum_dim_intlist(&[1, 2, 3], false, Kind::Float);
        Ok(summed / valid)
    }
}
