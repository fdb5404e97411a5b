use super::shape::Chw;
use crate::common::*;

/// One row of a model summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerSummary {
    pub name: String,
    pub kind: String,
    pub output_shape: Chw,
    pub num_params: usize,
}

/// Layer-wise output shapes and parameter counts of a model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSummary {
    pub input_shape: Chw,
    pub layers: Vec<LayerSummary>,
}

impl ModelSummary {
    pub fn output_shape(&self) -> Chw {
        self.layers
            .last()
            .map(|layer| layer.output_shape)
            .unwrap_or(self.input_shape)
    }

    pub fn trainable_params(&self) -> usize {
        self.layers.iter().map(|layer| layer.num_params).sum()
    }
}
