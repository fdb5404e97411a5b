//! Scoring a dataset split with a trained model.

use crate::{common::*, model::Model, utils};
use tokio::runtime::Handle;

/// The outcome of an evaluation pass.
#[derive(Debug)]
pub struct Evaluation {
    pub metrics: EvaluationMetrics,
    /// The requested input image and its reconstruction, `[1, H, W]` each.
    pub example: Option<(Tensor, Tensor)>,
}

/// Scores every image of the dataset by its reconstruction error.
///
/// If `threshold` is `None`, the F1-optimal threshold of this split is
/// used. Otherwise the F1 score is computed at the given threshold.
/// The image at `example_index` is kept along with its reconstruction.
#[allow(clippy::too_many_arguments)]
pub fn evaluate(
    model: &Model,
    dataset: &MuraDataset,
    loss_fn: ReconstructionLoss,
    threshold: Option<R64>,
    example_index: Option<usize>,
    batch_size: usize,
    device: Device,
    runtime: &Handle,
    desc: &str,
) -> Result<Evaluation> {
    ensure!(!dataset.is_empty(), "the {} set is empty", desc);
    if let Some(index) = example_index {
        ensure!(
            index < dataset.len(),
            "example index {} is out of range for {} images",
            index,
            dataset.len()
        );
    }

    let bar = utils::batch_progress_bar(desc, dataset.num_batches(batch_size))?;
    let mut accumulator = ScoreAccumulator::new();
    let mut example = None;
    let mut stream = dataset.batches(batch_size, None)?;
    let mut offset = 0;

    while let Some(batch) = runtime.block_on(stream.next()) {
        let batch = batch?.to_device(device);
        let output = model.reconstruct(&batch.image)?;
        let scores = tch::no_grad(|| loss_fn.anomaly_scores(&output, &batch.image, &batch.mask))?;
        accumulator.push_batch(&scores, &batch.labels)?;

        let len = batch.image.size()[0] as usize;
        if let Some(index) = example_index {
            if (offset..offset + len).contains(&index) {
                let index = (index - offset) as i64;
                example = Some((batch.image.get(index), output.get(index)));
            }
        }
        offset += len;
        bar.inc(1);
    }
    bar.finish();

    let metrics = accumulator.finish(threshold)?;
    info!(
        "{}: roc-auc {:.5}\tmse {:.5}\tf1-score {:.5}\tthreshold {:.5}",
        desc, metrics.roc_auc, metrics.mse, metrics.f1_score, metrics.threshold
    );

    Ok(Evaluation { metrics, example })
}
