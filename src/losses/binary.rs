use crate::dataset::Dataset;
use crate::errors::{LogLinError, Result};
use crate::math::{log1p_exp, sigmoid};
use crate::scheme::IndexScheme;

/// Two-class logistic loss with a single weight per feature.
///
/// The weight vector scores class 1; class 0 is the reference class, so
/// `P(y = 1 | x) = sigmoid(Σ w_f v_f)`.
#[derive(Debug)]
pub struct BinaryLoss<'a> {
    dataset: &'a Dataset,
}

impl<'a> BinaryLoss<'a> {
    /// Creates a loss over a labeled two-class dataset.
    ///
    /// # Errors
    ///
    /// The dataset must be labeled and have exactly two classes.
    pub fn new(dataset: &'a Dataset) -> Result<Self> {
        if !dataset.is_labeled() {
            return Err(LogLinError::invalid_argument("dataset must be labeled"));
        }
        if dataset.num_classes() != 2 {
            return Err(LogLinError::invalid_argument(
                "binary loss requires exactly two classes",
            ));
        }
        Ok(Self { dataset })
    }

    /// Gets the weight layout.
    pub const fn scheme(&self) -> IndexScheme {
        IndexScheme::reference(self.dataset.num_features(), 2)
    }

    pub(crate) fn accumulate(&self, weights: &[f64], gradient: &mut [f64]) -> f64 {
        let mut value = 0.0;
        for (i, &y) in self.dataset.labels().iter().enumerate() {
            let weight = self.dataset.weight(i);
            if weight == 0.0 {
                continue;
            }
            let example = self.dataset.example(i);
            let mut sum = 0.0;
            for (f, v) in example.iter() {
                sum += weights[f] * v;
            }
            let derivative = if y == 0 {
                value += weight * log1p_exp(sum);
                weight * sigmoid(sum)
            } else {
                value += weight * log1p_exp(-sum);
                -weight * sigmoid(-sum)
            };
            for (f, v) in example.iter() {
                gradient[f] += derivative * v;
            }
        }
        value
    }
}
