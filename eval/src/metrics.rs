// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Classification metrics for integer-labelled predictions
//!
//! Implements:
//! - One-vs-rest confusion matrix per class
//! - Accuracy, Precision, Recall, F1-Score
//! - Macro averages over the classes seen in gold or predictions

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Confusion matrix of one class against all others
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub tp: usize,
    pub tn: usize,
    pub fp: usize,
    /// False negatives
    pub fn_: usize,
}

impl ConfusionMatrix {
    /// Count outcomes treating `class` as the positive label
    pub fn for_class(class: i64, predictions: &[i64], ground_truth: &[i64]) -> Self {
        assert_eq!(predictions.len(), ground_truth.len(), "Prediction and ground truth lengths must match");

        let mut matrix = Self::default();

        for (&pred, &truth) in predictions.iter().zip(ground_truth.iter()) {
            match (pred == class, truth == class) {
                (true, true) => matrix.tp += 1,
                (false, false) => matrix.tn += 1,
                (true, false) => matrix.fp += 1,
                (false, true) => matrix.fn_ += 1,
            }
        }

        matrix
    }

    pub fn total(&self) -> usize {
        self.tp + self.tn + self.fp + self.fn_
    }

    /// Precision: TP / (TP + FP), 0 when nothing was predicted as the class
    pub fn precision(&self) -> f64 {
        let denom = self.tp + self.fp;
        if denom == 0 {
            return 0.0;
        }
        self.tp as f64 / denom as f64
    }

    /// Recall: TP / (TP + FN), 0 when the class never occurs
    pub fn recall(&self) -> f64 {
        let denom = self.tp + self.fn_;
        if denom == 0 {
            return 0.0;
        }
        self.tp as f64 / denom as f64
    }

    /// F1 Score: 2 * (Precision * Recall) / (Precision + Recall)
    pub fn f1_score(&self) -> f64 {
        let precision = self.precision();
        let recall = self.recall();
        let denom = precision + recall;
        if denom == 0.0 {
            return 0.0;
        }
        2.0 * precision * recall / denom
    }

    /// Number of gold rows carrying the class
    pub fn support(&self) -> usize {
        self.tp + self.fn_
    }
}

/// Metrics of a single class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub class: i64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub support: usize,
}

/// Per-class and macro-averaged metrics of one label column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub accuracy: f64,
    pub macro_precision: f64,
    pub macro_recall: f64,
    pub macro_f1: f64,
    pub per_class: Vec<ClassMetrics>,
    pub support: usize,
}

impl ClassificationReport {
    /// Generate report from predictions and ground truth.
    ///
    /// Classes are the sorted union of values in both sequences, so a class
    /// that is only ever predicted still counts towards the macro average.
    pub fn from_predictions(predictions: &[i64], ground_truth: &[i64]) -> Self {
        let classes: BTreeSet<i64> = ground_truth.iter().chain(predictions.iter()).copied().collect();

        let per_class: Vec<ClassMetrics> = classes
            .iter()
            .map(|&class| {
                let cm = ConfusionMatrix::for_class(class, predictions, ground_truth);
                ClassMetrics {
                    class,
                    precision: cm.precision(),
                    recall: cm.recall(),
                    f1_score: cm.f1_score(),
                    support: cm.support(),
                }
            })
            .collect();

        let correct = predictions.iter().zip(ground_truth.iter()).filter(|(p, t)| p == t).count();
        let accuracy = if ground_truth.is_empty() {
            0.0
        } else {
            correct as f64 / ground_truth.len() as f64
        };

        Self {
            accuracy,
            macro_precision: mean(per_class.iter().map(|c| c.precision)),
            macro_recall: mean(per_class.iter().map(|c| c.recall)),
            macro_f1: mean(per_class.iter().map(|c| c.f1_score)),
            support: ground_truth.len(),
            per_class,
        }
    }

    /// Format as a human-readable string
    pub fn format(&self) -> String {
        let mut output = format!(
            "Accuracy:        {:.4}\nMacro Precision: {:.4}\nMacro Recall:    {:.4}\nMacro F1:        {:.4}\nSupport:         {}\n",
            self.accuracy, self.macro_precision, self.macro_recall, self.macro_f1, self.support
        );
        for class in &self.per_class {
            output.push_str(&format!(
                "  class {}: P={:.4} R={:.4} F1={:.4} (n={})\n",
                class.class, class.precision, class.recall, class.f1_score, class.support
            ));
        }
        output
    }
}

/// Arithmetic mean, `NaN` for an empty sequence or any `NaN` element
pub fn mean(values: impl IntoIterator<Item = f64>) -> f64 {
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        return f64::NAN;
    }
    sum / count as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confusion_matrix_for_class() {
        let predictions = vec![1, 1, 0, 0];
        let ground_truth = vec![1, 0, 0, 1];

        let cm = ConfusionMatrix::for_class(1, &predictions, &ground_truth);

        assert_eq!(cm, ConfusionMatrix { tp: 1, tn: 1, fp: 1, fn_: 1 });
        assert_eq!(cm.total(), 4);
        assert!((cm.f1_score() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_perfect_report() {
        let labels = vec![0, 1, 1, 0, 1];
        let report = ClassificationReport::from_predictions(&labels, &labels);

        assert_eq!(report.per_class.len(), 2);
        assert!((report.macro_f1 - 1.0).abs() < 1e-12);
        assert!((report.accuracy - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_macro_f1_unweighted_by_support() {
        // class 0: P=2/3 R=1 F1=0.8; class 1: P=1 R=0.5 F1=2/3
        let predictions = vec![0, 0, 0, 1];
        let ground_truth = vec![0, 0, 1, 1];
        let report = ClassificationReport::from_predictions(&predictions, &ground_truth);

        assert!((report.macro_f1 - (0.8 + 2.0 / 3.0) / 2.0).abs() < 1e-12);
        assert!((report.accuracy - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_class_never_predicted_scores_zero() {
        let predictions = vec![0, 0, 0, 0];
        let ground_truth = vec![0, 0, 1, 1];
        let report = ClassificationReport::from_predictions(&predictions, &ground_truth);

        let class_one = &report.per_class[1];
        assert_eq!(class_one.precision, 0.0);
        assert_eq!(class_one.f1_score, 0.0);
        // class 0: P=0.5 R=1 F1=2/3
        assert!((report.macro_f1 - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_mean_propagates_nan() {
        assert_eq!(mean([1.0, 0.5]), 0.75);
        assert!(mean([1.0, f64::NAN]).is_nan());
        assert!(mean(std::iter::empty()).is_nan());
    }

    #[test]
    fn test_report_format() {
        let report = ClassificationReport::from_predictions(&[0, 1], &[0, 1]);
        let formatted = report.format();

        assert!(formatted.contains("Macro F1"));
        assert!(formatted.contains("class 1"));
    }
}
