use super::{classification, roc};
use crate::common::*;

/// The outcome of one evaluation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationMetrics {
    pub roc_auc: R64,
    /// The mean anomaly score.
    pub mse: R64,
    pub f1_score: R64,
    /// The threshold selected on validation data, or the one supplied in test mode.
    pub threshold: R64,
}

impl EvaluationMetrics {
    /// Names and values in reporting order.
    pub fn to_map(&self) -> IndexMap<&'static str, f64> {
        let Self {
            roc_auc,
            mse,
            f1_score,
            threshold,
        } = *self;

        IndexMap::from_iter([
            ("roc-auc", roc_auc.raw()),
            ("mse", mse.raw()),
            ("f1-score", f1_score.raw()),
            ("optimal mse threshold", threshold.raw()),
        ])
    }
}

/// Collects per-sample anomaly scores and labels across batches.
#[derive(Debug, Clone, Default)]
pub struct ScoreAccumulator {
    scores: Vec<R64>,
    labels: Vec<bool>,
}

impl ScoreAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    pub fn scores(&self) -> &[R64] {
        &self.scores
    }

    pub fn labels(&self) -> &[bool] {
        &self.labels
    }

    /// Appends a `[batch_size]` score tensor with its `[batch_size]` label tensor.
    pub fn push_batch(&mut self, scores: &Tensor, labels: &Tensor) -> Result<()> {
        ensure!(
            scores.size() == labels.size() && scores.dim() == 1,
            "expect scores and labels of equal 1-d shape, but get {:?} and {:?}",
            scores.size(),
            labels.size()
        );

        let scores = Vec::<f64>::from(&scores.to_device(Device::Cpu).to_kind(Kind::Double));
        let labels = Vec::<i64>::from(&labels.to_device(Device::Cpu).to_kind(Kind::Int64));

        for (score, label) in izip!(scores, labels) {
            ensure!(
                score.is_finite(),
                "non-finite anomaly score {}, is the mask of some sample empty?",
                score
            );
            self.scores.push(r64(score));
            self.labels.push(label != 0);
        }
        Ok(())
    }

    /// Computes the metrics.
    ///
    /// Without a threshold the F1-optimal threshold is selected. With a
    /// threshold the F1 score at that threshold is reported.
    pub fn finish(&self, threshold: Option<R64>) -> Result<EvaluationMetrics> {
        let Self { scores, labels } = self;
        ensure!(!scores.is_empty(), "no samples were evaluated");

        let roc_auc = roc::roc_auc(scores, labels)?;
        let mse = scores.iter().cloned().sum::<R64>() / scores.len() as f64;

        let (threshold, f1_score) = match threshold {
            Some(threshold) => (
                threshold,
                classification::f1_score(scores, labels, threshold)?,
            ),
            None => classification::optimal_threshold(scores, labels)?,
        };

        Ok(EvaluationMetrics {
            roc_auc,
            mse,
            f1_score,
            threshold,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn accumulate_and_finish() -> Result<()> {
        let mut acc = ScoreAccumulator::new();
        acc.push_batch(
            &Tensor::of_slice(&[0.1f32, 0.2]),
            &Tensor::of_slice(&[0i64, 0]),
        )?;
        acc.push_batch(
            &Tensor::of_slice(&[0.6f32, 0.9, 0.3]),
            &Tensor::of_slice(&[1i64, 1, 0]),
        )?;
        assert_eq!(acc.len(), 5);

        let val = acc.finish(None)?;
        assert_abs_diff_eq!(val.roc_auc.raw(), 1.0);
        assert_abs_diff_eq!(val.f1_score.raw(), 1.0);
        assert_abs_diff_eq!(val.threshold.raw(), 0.6, epsilon = 1e-6);
        assert_abs_diff_eq!(val.mse.raw(), 0.42, epsilon = 1e-6);

        // a stricter threshold misses one abnormal sample
        let test = acc.finish(Some(r64(0.7)))?;
        assert_abs_diff_eq!(test.f1_score.raw(), 2.0 / 3.0, epsilon = 1e-9);
        assert_eq!(test.threshold, r64(0.7));

        let names: Vec<_> = val.to_map().keys().cloned().collect();
        assert_eq!(names, ["roc-auc", "mse", "f1-score", "optimal mse threshold"]);
        Ok(())
    }

    #[test]
    fn non_finite_scores_are_rejected() {
        let mut acc = ScoreAccumulator::new();
        let result = acc.push_batch(
            &Tensor::of_slice(&[f32::NAN]),
            &Tensor::of_slice(&[0i64]),
        );
        assert!(result.is_err());
        assert!(acc.finish(None).is_err());
    }
}
