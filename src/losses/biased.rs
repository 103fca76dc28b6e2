use crate::dataset::{normalize, Dataset};
use crate::errors::{LogLinError, Result};
use crate::scheme::IndexScheme;

const ROW_SUM_TOLERANCE: f64 = 1e-6;

/// Fixed noise model between true and observed labels.
///
/// Row `y` holds the weight of each true class `c` given the observed label
/// `y`. Every row is a probability distribution.
#[derive(Clone, Debug, PartialEq)]
pub struct ConfusionMatrix {
    log_rows: Vec<Vec<f64>>,
}

impl ConfusionMatrix {
    /// Creates a confusion matrix from its rows.
    ///
    /// Zero entries are allowed and mark a true class as impossible for the
    /// observed label.
    ///
    /// # Errors
    ///
    /// The matrix must be square and non-empty, every entry must lie in
    /// `[0, 1]` and every row must sum to 1.
    pub fn new(rows: &[Vec<f64>]) -> Result<Self> {
        if rows.is_empty() {
            return Err(LogLinError::invalid_argument(
                "confusion matrix must not be empty",
            ));
        }
        let mut log_rows = Vec::with_capacity(rows.len());
        for row in rows {
            if row.len() != rows.len() {
                return Err(LogLinError::invalid_argument(
                    "confusion matrix must be square",
                ));
            }
            if row.iter().any(|p| !(0.0..=1.0).contains(p)) {
                return Err(LogLinError::invalid_argument(
                    "confusion matrix entries must lie in [0, 1]",
                ));
            }
            if (row.iter().sum::<f64>() - 1.0).abs() > ROW_SUM_TOLERANCE {
                return Err(LogLinError::invalid_argument(
                    "confusion matrix rows must sum to 1",
                ));
            }
            log_rows.push(row.iter().map(|p| p.ln()).collect());
        }
        Ok(Self { log_rows })
    }

    /// Creates the noise-free matrix.
    pub fn identity(num_classes: usize) -> Self {
        let log_rows = (0..num_classes)
            .map(|y| {
                (0..num_classes)
                    .map(|c| if c == y { 0.0 } else { f64::NEG_INFINITY })
                    .collect()
            })
            .collect();
        Self { log_rows }
    }

    /// Number of classes.
    pub fn num_classes(&self) -> usize {
        self.log_rows.len()
    }

    /// `ln C[observed][true_class]`, `-inf` for a zero entry.
    #[inline(always)]
    pub fn log_weight(&self, observed: usize, true_class: usize) -> f64 {
        self.log_rows[observed][true_class]
    }
}

/// Log-linear loss that treats the observed labels as noisy.
///
/// The loss of an example with observed label `y` is
/// `-ln Σ_c C[y][c] p(c | x)`.
#[derive(Debug)]
pub struct BiasedLoss<'a> {
    dataset: &'a Dataset,
    confusion: ConfusionMatrix,
    scheme: IndexScheme,
}

impl<'a> BiasedLoss<'a> {
    /// Creates a loss over a labeled dataset.
    ///
    /// # Errors
    ///
    /// The dataset must be labeled, must not carry real feature values, and
    /// must have as many classes as the confusion matrix.
    pub fn new(dataset: &'a Dataset, confusion: ConfusionMatrix) -> Result<Self> {
        if !dataset.is_labeled() {
            return Err(LogLinError::invalid_argument("dataset must be labeled"));
        }
        if dataset.has_values() {
            return Err(LogLinError::unsupported(
                "biased loss is not implemented for real-valued features",
            ));
        }
        if confusion.num_classes() != dataset.num_classes() {
            return Err(LogLinError::invalid_argument(
                "confusion matrix size must equal num_classes",
            ));
        }
        Ok(Self {
            dataset,
            confusion,
            scheme: IndexScheme::feature_major(dataset.num_features(), dataset.num_classes()),
        })
    }

    /// Gets the weight layout.
    pub const fn scheme(&self) -> IndexScheme {
        self.scheme
    }

    pub(crate) fn accumulate(&self, weights: &[f64], gradient: &mut [f64]) -> f64 {
        let num_classes = self.dataset.num_classes();
        let mut sums = vec![0.0; num_classes];
        let mut probs = vec![0.0; num_classes];
        let mut weighted_sums = vec![0.0; num_classes];
        let mut weighted_probs = vec![0.0; num_classes];
        let mut value = 0.0;
        for (i, &y) in self.dataset.labels().iter().enumerate() {
            let weight = self.dataset.weight(i);
            if weight == 0.0 {
                continue;
            }
            let example = self.dataset.example(i);
            example.activations(&self.scheme, weights, &mut sums);
            let total = normalize(&sums, &mut probs);
            for (c, (ws, &s)) in weighted_sums.iter_mut().zip(&sums).enumerate() {
                *ws = self.confusion.log_weight(y, c) + s;
            }
            let weighted_total = normalize(&weighted_sums, &mut weighted_probs);
            value -= weight * (weighted_total - total);
            for (p, &wp) in probs.iter_mut().zip(&weighted_probs) {
                *p = weight * (*p - wp);
            }
            example.add_gradient(&self.scheme, &probs, gradient);
        }
        value
    }
}
