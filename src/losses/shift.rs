use core::ops::Range;

use crate::dataset::{normalize, Dataset};
use crate::errors::{LogLinError, Result};
use crate::prior::Prior;
use crate::scheme::IndexScheme;

/// Multinomial loss with one shift parameter per example and class.
///
/// Example `i` carries an extra synthetic feature `num_features + i`, which
/// lets the model absorb a noisy label into a per-example bias. Class 0 is
/// the reference class, so the weights are laid out by
/// [`IndexScheme::reference`] over `num_features + len` features.
#[derive(Debug)]
pub struct ShiftParamLoss<'a> {
    dataset: &'a Dataset,
    scheme: IndexScheme,
    shift_prior: Prior,
}

impl<'a> ShiftParamLoss<'a> {
    /// Creates a loss over a labeled dataset. `shift_prior` penalizes the
    /// shift parameters only.
    ///
    /// # Errors
    ///
    /// The dataset must be labeled and have at least two classes, and
    /// `shift_prior` must be valid.
    pub fn new(dataset: &'a Dataset, shift_prior: Prior) -> Result<Self> {
        shift_prior.validate()?;
        if !dataset.is_labeled() {
            return Err(LogLinError::invalid_argument("dataset must be labeled"));
        }
        if dataset.num_classes() < 2 {
            return Err(LogLinError::invalid_argument(
                "shift parameters require at least two classes",
            ));
        }
        let scheme =
            IndexScheme::reference(dataset.num_features() + dataset.len(), dataset.num_classes());
        log::debug!(
            "shift parameter loss: {} features, {} shift features, dimension {}",
            dataset.num_features(),
            dataset.len(),
            scheme.dimension(),
        );
        Ok(Self {
            dataset,
            scheme,
            shift_prior,
        })
    }

    /// Gets the weight layout.
    pub const fn scheme(&self) -> IndexScheme {
        self.scheme
    }

    /// Index blocks of the real feature weights, one per non-reference class.
    pub fn feature_ranges(&self) -> Vec<Range<usize>> {
        self.blocks(0, self.dataset.num_features())
    }

    /// Index blocks of the shift parameters, one per non-reference class.
    pub fn shift_ranges(&self) -> Vec<Range<usize>> {
        self.blocks(self.dataset.num_features(), self.dataset.len())
    }

    fn blocks(&self, first_feature: usize, len: usize) -> Vec<Range<usize>> {
        if len == 0 {
            return vec![];
        }
        self.scheme
            .free_classes()
            .map(|c| {
                let start = self.scheme.index(first_feature, c);
                start..start + len
            })
            .collect()
    }

    /// Copies the real feature weights into a reference-class vector over
    /// the original features.
    pub fn strip_shift_parameters(&self, weights: &[f64]) -> (IndexScheme, Vec<f64>) {
        let scheme = IndexScheme::reference(self.dataset.num_features(), self.dataset.num_classes());
        let mut stripped = Vec::with_capacity(scheme.dimension());
        for range in self.feature_ranges() {
            stripped.extend_from_slice(&weights[range]);
        }
        (scheme, stripped)
    }

    pub(crate) fn accumulate(&self, weights: &[f64], gradient: &mut [f64]) -> f64 {
        let num_features = self.dataset.num_features();
        let mut sums = vec![0.0; self.dataset.num_classes()];
        let mut probs = vec![0.0; self.dataset.num_classes()];
        let mut value = 0.0;
        for (i, &y) in self.dataset.labels().iter().enumerate() {
            let weight = self.dataset.weight(i);
            if weight == 0.0 {
                continue;
            }
            let example = self.dataset.example(i);
            example.activations(&self.scheme, weights, &mut sums);
            for c in self.scheme.free_classes() {
                sums[c] += weights[self.scheme.index(num_features + i, c)];
            }
            let total = normalize(&sums, &mut probs);
            value -= weight * (sums[y] - total);
            for p in &mut probs {
                *p *= weight;
            }
            probs[y] -= weight;
            example.add_gradient(&self.scheme, &probs, gradient);
            for c in self.scheme.free_classes() {
                gradient[self.scheme.index(num_features + i, c)] += probs[c];
            }
        }
        for range in self.shift_ranges() {
            value += self
                .shift_prior
                .apply(&weights[range.clone()], &mut gradient[range]);
        }
        value
    }
}
