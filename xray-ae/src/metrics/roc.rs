use crate::common::*;

/// Area under the ROC curve of scores against binary labels.
///
/// Higher scores mean more likely abnormal. Equal scores are grouped into
/// a single curve point and the area is integrated with the trapezoidal
/// rule. It fails if only one class is present.
pub fn roc_auc(scores: &[R64], labels: &[bool]) -> Result<R64> {
    ensure!(
        scores.len() == labels.len(),
        "get {} scores but {} labels",
        scores.len(),
        labels.len()
    );

    let num_pos = labels.iter().filter(|&&label| label).count();
    let num_neg = labels.len() - num_pos;
    ensure!(
        num_pos > 0 && num_neg > 0,
        "ROC-AUC is undefined with {} positive and {} negative samples",
        num_pos,
        num_neg
    );

    let groups = group_by_decreasing_score(scores, labels);

    let (_, _, area) = groups.into_iter().fold(
        (0usize, 0usize, r64(0.0)),
        |(tp, fp, area), (_score, group_tp, group_fp)| {
            let prev_tpr = r64(tp as f64 / num_pos as f64);
            let prev_fpr = r64(fp as f64 / num_neg as f64);
            let tp = tp + group_tp;
            let fp = fp + group_fp;
            let tpr = r64(tp as f64 / num_pos as f64);
            let fpr = r64(fp as f64 / num_neg as f64);
            let area = area + (fpr - prev_fpr) * (tpr + prev_tpr) / 2.0;
            (tp, fp, area)
        },
    );

    Ok(area)
}

/// Groups samples by distinct score in decreasing order, counting
/// positives and negatives in each group.
pub(crate) fn group_by_decreasing_score(
    scores: &[R64],
    labels: &[bool],
) -> Vec<(R64, usize, usize)> {
    let mut pairs: Vec<_> = scores.iter().cloned().zip(labels.iter().cloned()).collect();
    pairs.sort_by(|(lhs, _), (rhs, _)| rhs.cmp(lhs));

    pairs
        .into_iter()
        .group_by(|(score, _)| *score)
        .into_iter()
        .map(|(score, group)| {
            let (num_pos, num_neg) = group.fold((0, 0), |(num_pos, num_neg), (_, label)| {
                if label {
                    (num_pos + 1, num_neg)
                } else {
                    (num_pos, num_neg + 1)
                }
            });
            (score, num_pos, num_neg)
        })
        .collect()
}
