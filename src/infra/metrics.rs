// ============================================================
// Layer 6 - Classification Metrics
// ============================================================
// Scores predicted dialog acts against the gold labels.
//
// Per class c (over the classes that occur in either sequence):
//   precision = TP / (TP + FP)
//   recall    = TP / (TP + FN)
//   f1        = 2·P·R / (P + R)          (0 when P + R = 0)
//
// Aggregates:
//   macro    - unweighted mean of the per-class F1
//   weighted - per-class F1 weighted by gold support
//   micro    - F1 from the pooled TP/FP/FN counts
//   accuracy - fraction of exact matches
//
// The text report follows the familiar column layout:
//
//                 precision    recall  f1-score   support
//
//             sd     0.8000    0.6667    0.7273         6
//            ...
//
//       accuracy                         0.7000        10
//      macro avg     ...
//   weighted avg     ...
//
// Reference: Manning et al. (2008) Introduction to IR §8.3

use serde::Serialize;
use std::collections::BTreeSet;

/// Aggregate scores, all in [0, 1].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MetricScores {
    pub f1_macro:    f64,
    pub f1_micro:    f64,
    pub f1_weighted: f64,
    pub accuracy:    f64,
}

/// Counts for one class.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct ClassScore {
    precision: f64,
    recall:    f64,
    f1:        f64,
    support:   usize,
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

fn f1(precision: f64, recall: f64) -> f64 {
    if precision + recall == 0.0 { 0.0 } else { 2.0 * precision * recall / (precision + recall) }
}

/// Scores label id sequences against a fixed label vocabulary.
#[derive(Debug, Clone)]
pub struct ClassificationMetrics {
    labels: Vec<String>,
}

impl ClassificationMetrics {
    pub fn new(labels: Vec<String>) -> Self {
        Self { labels }
    }

    /// Label ids occurring in either sequence, ascending.
    fn present_classes(y_true: &[usize], y_pred: &[usize]) -> Vec<usize> {
        y_true
            .iter()
            .chain(y_pred)
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    fn class_scores(y_true: &[usize], y_pred: &[usize]) -> Vec<(usize, ClassScore)> {
        Self::present_classes(y_true, y_pred)
            .into_iter()
            .map(|class| {
                let pairs = y_true.iter().zip(y_pred);
                let tp = pairs.clone().filter(|&(&t, &p)| t == class && p == class).count();
                let gold = y_true.iter().filter(|&&t| t == class).count();
                let predicted = y_pred.iter().filter(|&&p| p == class).count();
                let precision = ratio(tp, predicted);
                let recall = ratio(tp, gold);
                (class, ClassScore { precision, recall, f1: f1(precision, recall), support: gold })
            })
            .collect()
    }

    pub fn classification_metrics(&self, y_true: &[usize], y_pred: &[usize]) -> MetricScores {
        let n = y_true.len().min(y_pred.len());
        let (y_true, y_pred) = (&y_true[..n], &y_pred[..n]);
        if n == 0 {
            return MetricScores::default();
        }

        let scores = Self::class_scores(y_true, y_pred);
        let correct = y_true.iter().zip(y_pred).filter(|(t, p)| t == p).count();

        let f1_macro = scores.iter().map(|(_, s)| s.f1).sum::<f64>() / scores.len() as f64;
        let f1_weighted = scores
            .iter()
            .map(|(_, s)| s.f1 * s.support as f64)
            .sum::<f64>()
            / n as f64;
        // Single-label: pooled FP = pooled FN = n - TP, so micro P = R = accuracy
        let accuracy = ratio(correct, n);

        MetricScores { f1_macro, f1_micro: f1(accuracy, accuracy), f1_weighted, accuracy }
    }

    fn label_name(&self, class: usize) -> String {
        self.labels
            .get(class)
            .cloned()
            .unwrap_or_else(|| class.to_string())
    }

    /// Per-class precision / recall / F1 / support table with 4 digits.
    pub fn classification_report(&self, y_true: &[usize], y_pred: &[usize]) -> String {
        let n = y_true.len().min(y_pred.len());
        let (y_true, y_pred) = (&y_true[..n], &y_pred[..n]);
        if n == 0 {
            return "No samples to report.".to_string();
        }

        let scores = Self::class_scores(y_true, y_pred);
        let totals = self.classification_metrics(y_true, y_pred);
        let k = scores.len() as f64;
        let macro_p = scores.iter().map(|(_, s)| s.precision).sum::<f64>() / k;
        let macro_r = scores.iter().map(|(_, s)| s.recall).sum::<f64>() / k;
        let weighted = |pick: fn(&ClassScore) -> f64| {
            scores.iter().map(|(_, s)| pick(s) * s.support as f64).sum::<f64>() / n as f64
        };

        let names: Vec<String> = scores.iter().map(|(c, _)| self.label_name(*c)).collect();
        let width = names
            .iter()
            .map(String::len)
            .chain(std::iter::once("weighted avg".len()))
            .max()
            .unwrap_or(0);

        let row = |name: &str, p: f64, r: f64, f: f64, support: usize| {
            format!("{name:>width$} {p:>9.4} {r:>9.4} {f:>9.4} {support:>9}\n")
        };

        let mut out = format!(
            "{:>width$} {:>9} {:>9} {:>9} {:>9}\n\n",
            "", "precision", "recall", "f1-score", "support"
        );
        for (name, (_, s)) in names.iter().zip(&scores) {
            out.push_str(&row(name, s.precision, s.recall, s.f1, s.support));
        }
        out.push('\n');
        out.push_str(&format!(
            "{:>width$} {:>9} {:>9} {:>9.4} {:>9}\n",
            "accuracy", "", "", totals.accuracy, n
        ));
        out.push_str(&row("macro avg", macro_p, macro_r, totals.f1_macro, n));
        out.push_str(&row(
            "weighted avg",
            weighted(|s| s.precision),
            weighted(|s| s.recall),
            totals.f1_weighted,
            n,
        ));
        out
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn metrics() -> ClassificationMetrics {
        ClassificationMetrics::new(vec!["sd".into(), "qy".into(), "b".into()])
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_perfect_predictions() {
        let y = [0, 1, 2, 1];
        let scores = metrics().classification_metrics(&y, &y);
        assert_eq!(scores, MetricScores { f1_macro: 1.0, f1_micro: 1.0, f1_weighted: 1.0, accuracy: 1.0 });
    }

    #[test]
    fn test_mixed_predictions() {
        // class 0: tp 1, fp 1, fn 1 → f1 0.5 (support 2)
        // class 1: tp 1, fp 1, fn 0 → P 0.5 R 1 → f1 2/3 (support 1)
        // class 2: tp 0, fp 0, fn 1 → f1 0 (support 1)
        let y_true = [0, 0, 1, 2];
        let y_pred = [0, 1, 1, 0];
        let scores = metrics().classification_metrics(&y_true, &y_pred);
        assert!(close(scores.accuracy, 0.5));
        assert!(close(scores.f1_micro, 0.5));
        assert!(close(scores.f1_macro, (0.5 + 2.0 / 3.0 + 0.0) / 3.0));
        assert!(close(scores.f1_weighted, (0.5 * 2.0 + 2.0 / 3.0) / 4.0));
    }

    #[test]
    fn test_empty_inputs_are_zero() {
        let m = metrics();
        assert_eq!(m.classification_metrics(&[], &[]), MetricScores::default());
        assert_eq!(m.classification_report(&[], &[]), "No samples to report.");
    }

    #[test]
    fn test_report_lists_only_present_classes() {
        let report = metrics().classification_report(&[0, 2], &[0, 0]);
        assert!(report.contains("sd"));
        assert!(report.contains(" b "));
        assert!(!report.contains("qy"));
        assert!(report.contains("accuracy"));
        assert!(report.contains("macro avg"));
        assert!(report.contains("weighted avg"));
        assert!(report.contains("0.5000"));
    }
}
