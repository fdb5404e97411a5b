use super::roc::group_by_decreasing_score;
use crate::common::*;

/// A point of the precision/recall curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrecRec {
    pub threshold: R64,
    pub precision: R64,
    pub recall: R64,
}

impl PrecRec {
    /// The harmonic mean of precision and recall, or `None` if both are zero.
    pub fn f1(&self) -> Option<R64> {
        let Self {
            precision, recall, ..
        } = *self;
        let sum = precision + recall;
        (sum > 0.0).then(|| precision * recall * 2.0 / sum)
    }
}

/// Computes precision and recall at every distinct score threshold.
///
/// A sample is predicted abnormal when `score >= threshold`. Points are
/// ordered by decreasing threshold and the curve stops at the first point
/// reaching full recall.
pub fn precision_recall_curve(scores: &[R64], labels: &[bool]) -> Result<Vec<PrecRec>> {
    ensure!(
        scores.len() == labels.len(),
        "get {} scores but {} labels",
        scores.len(),
        labels.len()
    );
    let num_pos = labels.iter().filter(|&&label| label).count();
    ensure!(
        num_pos > 0,
        "the precision/recall curve requires at least one positive sample"
    );

    let mut curve = vec![];
    let mut tp = 0;
    let mut fp = 0;

    for (threshold, group_tp, group_fp) in group_by_decreasing_score(scores, labels) {
        tp += group_tp;
        fp += group_fp;
        curve.push(PrecRec {
            threshold,
            precision: r64(tp as f64 / (tp + fp) as f64),
            recall: r64(tp as f64 / num_pos as f64),
        });

        if tp == num_pos {
            break;
        }
    }

    Ok(curve)
}

/// F1 score when predicting abnormal for `score > threshold`.
///
/// A score equal to the threshold is predicted normal. It is zero when
/// nothing is correctly predicted abnormal.
pub fn f1_score(scores: &[R64], labels: &[bool], threshold: R64) -> Result<R64> {
    ensure!(
        scores.len() == labels.len(),
        "get {} scores but {} labels",
        scores.len(),
        labels.len()
    );

    let (tp, fp, fn_) = izip!(scores, labels).fold(
        (0usize, 0usize, 0usize),
        |(tp, fp, fn_), (&score, &label)| match (score > threshold, label) {
            (true, true) => (tp + 1, fp, fn_),
            (true, false) => (tp, fp + 1, fn_),
            (false, true) => (tp, fp, fn_ + 1),
            (false, false) => (tp, fp, fn_),
        },
    );

    if tp == 0 {
        return Ok(r64(0.0));
    }
    Ok(r64((2 * tp) as f64 / (2 * tp + fp + fn_) as f64))
}

/// Finds the threshold maximizing F1 on the precision/recall curve.
///
/// Returns `(threshold, f1)`. Among equal F1 values the lowest threshold
/// wins.
pub fn optimal_threshold(scores: &[R64], labels: &[bool]) -> Result<(R64, R64)> {
    let curve = precision_recall_curve(scores, labels)?;

    curve
        .iter()
        .filter_map(|point| Some((point.threshold, point.f1()?)))
        .fold(None, |best: Option<(R64, R64)>, (threshold, f1)| match best {
            Some((_, best_f1)) if best_f1 > f1 => best,
            _ => Some((threshold, f1)),
        })
        .ok_or_else(|| format_err!("no threshold yields a defined F1 score"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn to_r64(values: &[f64]) -> Vec<R64> {
        values.iter().cloned().map(r64).collect()
    }

    #[test]
    fn perfect_separation_gives_unit_f1() -> Result<()> {
        let scores = to_r64(&[0.05, 0.1, 0.2, 0.7, 0.9]);
        let labels = [false, false, false, true, true];

        let (threshold, f1) = optimal_threshold(&scores, &labels)?;
        assert_abs_diff_eq!(f1.raw(), 1.0);
        assert_abs_diff_eq!(threshold.raw(), 0.7);
        // a threshold between the classes separates them
        assert_abs_diff_eq!(f1_score(&scores, &labels, r64(0.5))?.raw(), 1.0);
        Ok(())
    }

    #[test]
    fn curve_points() -> Result<()> {
        let scores = to_r64(&[0.9, 0.8, 0.7, 0.6, 0.5]);
        let labels = [true, false, true, false, false];

        let curve = precision_recall_curve(&scores, &labels)?;
        // stops at 0.7 where recall reaches 1
        assert_eq!(curve.len(), 3);
        assert_abs_diff_eq!(curve[0].precision.raw(), 1.0);
        assert_abs_diff_eq!(curve[0].recall.raw(), 0.5);
        assert_abs_diff_eq!(curve[1].precision.raw(), 0.5);
        assert_abs_diff_eq!(curve[2].precision.raw(), 2.0 / 3.0);
        assert_abs_diff_eq!(curve[2].recall.raw(), 1.0);

        let (threshold, f1) = optimal_threshold(&scores, &labels)?;
        assert_abs_diff_eq!(threshold.raw(), 0.7);
        assert_abs_diff_eq!(f1.raw(), 0.8);
        Ok(())
    }

    #[test]
    fn f1_edge_cases() -> Result<()> {
        let scores = to_r64(&[0.1, 0.2, 0.3]);
        let labels = [false, true, false];

        // nothing predicted abnormal
        assert_abs_diff_eq!(f1_score(&scores, &labels, r64(1.0))?.raw(), 0.0);
        // everything predicted abnormal
        assert_abs_diff_eq!(f1_score(&scores, &labels, r64(0.0))?.raw(), 0.5);

        assert!(precision_recall_curve(&scores, &[false; 3]).is_err());
        Ok(())
    }

    #[test]
    fn score_at_threshold_is_normal() -> Result<()> {
        let scores = to_r64(&[0.2, 0.5, 0.8]);
        let labels = [false, true, true];

        // 0.5 is not above the threshold, so one abnormal sample is missed
        assert_abs_diff_eq!(
            f1_score(&scores, &labels, r64(0.5))?.raw(),
            2.0 / 3.0,
            epsilon = 1e-9
        );
        assert_abs_diff_eq!(f1_score(&scores, &labels, r64(0.49))?.raw(), 1.0);
        Ok(())
    }
}
