//! Error matrix and the accuracy statistics derived from it.
use std::fmt::Write;

use crate::types::LandClass;

const N: usize = LandClass::COUNT;

/// Confusion matrix with rows = reference class, columns = predicted class.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConfusionMatrix {
    counts: [[u64; N]; N],
}

impl ConfusionMatrix {
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (LandClass, LandClass)>,
    {
        let mut m = Self::default();
        for (actual, predicted) in pairs {
            m.counts[actual.id() as usize][predicted.id() as usize] += 1;
        }
        m
    }

    pub fn get(&self, actual: LandClass, predicted: LandClass) -> u64 {
        self.counts[actual.id() as usize][predicted.id() as usize]
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().flatten().sum()
    }

    fn diagonal(&self) -> u64 {
        (0..N).map(|i| self.counts[i][i]).sum()
    }

    fn row_total(&self, i: usize) -> u64 {
        self.counts[i].iter().sum()
    }

    fn col_total(&self, j: usize) -> u64 {
        self.counts.iter().map(|row| row[j]).sum()
    }

    /// Overall accuracy; None for an empty matrix.
    pub fn accuracy(&self) -> Option<f64> {
        let total = self.total();
        (total > 0).then(|| self.diagonal() as f64 / total as f64)
    }

    /// Cohen's kappa. None when empty or when chance agreement is 1.
    pub fn kappa(&self) -> Option<f64> {
        let total = self.total() as f64;
        if total == 0.0 {
            return None;
        }
        let observed = self.diagonal() as f64 / total;
        let expected: f64 = (0..N)
            .map(|i| self.row_total(i) as f64 * self.col_total(i) as f64)
            .sum::<f64>()
            / (total * total);
        if (1.0 - expected).abs() < f64::EPSILON {
            return None;
        }
        Some((observed - expected) / (1.0 - expected))
    }

    /// Recall of one class: correct / reference total. None if the class never occurs.
    pub fn producers_accuracy(&self, class: LandClass) -> Option<f64> {
        let i = class.id() as usize;
        let total = self.row_total(i);
        (total > 0).then(|| self.counts[i][i] as f64 / total as f64)
    }

    /// Precision of one class: correct / predicted total. None if never predicted.
    pub fn consumers_accuracy(&self, class: LandClass) -> Option<f64> {
        let j = class.id() as usize;
        let total = self.col_total(j);
        (total > 0).then(|| self.counts[j][j] as f64 / total as f64)
    }

    /// Text block with the matrix, overall statistics and per-class accuracies.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Confusion matrix (rows = reference, columns = predicted):");
        let _ = write!(out, "{:>12}", "");
        for class in LandClass::ALL {
            let _ = write!(out, "{:>12}", class.label());
        }
        let _ = writeln!(out);
        for actual in LandClass::ALL {
            let _ = write!(out, "{:>12}", actual.label());
            for predicted in LandClass::ALL {
                let _ = write!(out, "{:>12}", self.get(actual, predicted));
            }
            let _ = writeln!(out);
        }
        let _ = writeln!(out, "Overall Accuracy: {}", fmt_stat(self.accuracy()));
        let _ = writeln!(out, "Kappa: {}", fmt_stat(self.kappa()));
        let _ = writeln!(out, "Producer's Accuracy:");
        for class in LandClass::ALL {
            let _ = writeln!(
                out,
                "  {}: {}",
                class.label(),
                fmt_stat(self.producers_accuracy(class))
            );
        }
        let _ = writeln!(out, "Consumer's Accuracy:");
        for class in LandClass::ALL {
            let _ = writeln!(
                out,
                "  {}: {}",
                class.label(),
                fmt_stat(self.consumers_accuracy(class))
            );
        }
        out
    }
}

fn fmt_stat(v: Option<f64>) -> String {
    match v {
        Some(v) => format!("{:.4}", v),
        None => "N/A".to_string(),
    }
}
