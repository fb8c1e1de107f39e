// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! ROC AUC with a NaN sentinel for undefined cases

use std::cmp::Ordering;
use std::collections::BTreeSet;

/// Area under the ROC curve of `scores` against binary `labels`.
///
/// The greater of the two label values is the positive class. Returns
/// `f64::NAN` unless `labels` holds exactly two distinct values; callers are
/// expected to let the NaN propagate through any averaging.
///
/// Equal scores form a single threshold, so binary predictions are scored
/// with the diagonal interpolation between their two ROC points.
pub fn roc_auc(labels: &[i64], scores: &[f64]) -> f64 {
    debug_assert_eq!(labels.len(), scores.len(), "labels and scores lengths must match");

    let classes: BTreeSet<i64> = labels.iter().copied().collect();
    let positive = match (classes.len(), classes.last()) {
        (2, Some(&max)) => max,
        _ => return f64::NAN,
    };

    // Sort by score descending
    let mut pairs: Vec<(bool, f64)> = labels
        .iter()
        .zip(scores.iter())
        .map(|(&l, &s)| (l == positive, s))
        .collect();
    pairs.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));

    let n_pos = pairs.iter().filter(|(p, _)| *p).count() as f64;
    let n_neg = pairs.len() as f64 - n_pos;

    let mut tp = 0.0;
    let mut fp = 0.0;
    let mut tpr_prev = 0.0;
    let mut fpr_prev = 0.0;
    let mut auc = 0.0;

    let mut i = 0;
    while i < pairs.len() {
        let threshold = pairs[i].1;
        while i < pairs.len() && pairs[i].1 == threshold {
            if pairs[i].0 {
                tp += 1.0;
            } else {
                fp += 1.0;
            }
            i += 1;
        }

        let tpr = tp / n_pos;
        let fpr = fp / n_neg;

        // Trapezoidal rule
        auc += (fpr - fpr_prev) * (tpr + tpr_prev) / 2.0;

        tpr_prev = tpr;
        fpr_prev = fpr;
    }

    auc
}

/// [`roc_auc`] over integer predictions
pub fn roc_auc_labels(labels: &[i64], predictions: &[i64]) -> f64 {
    let scores: Vec<f64> = predictions.iter().map(|&p| p as f64).collect();
    roc_auc(labels, &scores)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auc_perfect() {
        let auc = roc_auc(&[1, 1, 0, 0], &[0.9, 0.8, 0.2, 0.1]);
        assert!((auc - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_auc_inverted() {
        let auc = roc_auc(&[1, 1, 0, 0], &[0.1, 0.2, 0.8, 0.9]);
        assert!(auc.abs() < 1e-12);
    }

    #[test]
    fn test_auc_with_ties() {
        // pos scores {0.5, 0.8}, neg scores {0.5, 0.2}: pairs won 3, tied 1 of 4
        let auc = roc_auc(&[1, 1, 0, 0], &[0.5, 0.8, 0.5, 0.2]);
        assert!((auc - 0.875).abs() < 1e-12);
    }

    #[test]
    fn test_auc_binary_predictions() {
        // TPR = 2/3, FPR = 1/2 -> (1 + 2/3 - 1/2) / 2
        let auc = roc_auc_labels(&[1, 1, 1, 0, 0], &[1, 1, 0, 1, 0]);
        assert!((auc - 7.0 / 12.0).abs() < 1e-12);
    }

    #[test]
    fn test_auc_constant_scores() {
        let auc = roc_auc_labels(&[1, 0, 1, 0], &[1, 1, 1, 1]);
        assert!((auc - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_auc_single_class_is_nan() {
        assert!(roc_auc_labels(&[1, 1, 1], &[0, 1, 1]).is_nan());
        assert!(roc_auc_labels(&[], &[]).is_nan());
    }

    #[test]
    fn test_auc_in_unit_interval() {
        let labels = [0, 1, 0, 1, 1, 0, 0, 1];
        let scores = [0.3, 0.7, 0.6, 0.4, 0.5, 0.5, 0.1, 0.9];
        let auc = roc_auc(&labels, &scores);
        assert!((0.0..=1.0).contains(&auc));
    }
}
