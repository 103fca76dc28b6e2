use crate::errors::{LogLinError, Result};
use crate::losses::log_linear;
use crate::scheme::IndexScheme;

/// Encoded training data.
///
/// Feature and label ids are already resolved to dense integers. The
/// dataset is validated once at construction and is read-only afterwards.
#[derive(Clone, Debug)]
pub struct Dataset {
    num_features: usize,
    num_classes: usize,
    data: Vec<Vec<usize>>,
    values: Option<Vec<Vec<f64>>>,
    labels: Option<Vec<usize>>,
    weights: Option<Vec<f64>>,
}

impl Dataset {
    /// Creates a labeled dataset.
    ///
    /// # Errors
    ///
    /// `labels` must have the same length as `data`, every feature id must be
    /// less than `num_features` and every label less than `num_classes`.
    pub fn new(
        num_features: usize,
        num_classes: usize,
        data: Vec<Vec<usize>>,
        labels: Vec<usize>,
    ) -> Result<Self> {
        if labels.len() != data.len() {
            return Err(LogLinError::invalid_argument(
                "labels must have the same length as data",
            ));
        }
        if labels.iter().any(|&y| y >= num_classes) {
            return Err(LogLinError::invalid_argument(
                "label must be less than num_classes",
            ));
        }
        let mut dataset = Self::unlabeled(num_features, num_classes, data)?;
        dataset.labels = Some(labels);
        Ok(dataset)
    }

    /// Creates a dataset without gold labels.
    ///
    /// # Errors
    ///
    /// Every feature id must be less than `num_features`, and there must be
    /// at least one class.
    pub fn unlabeled(num_features: usize, num_classes: usize, data: Vec<Vec<usize>>) -> Result<Self> {
        if num_classes == 0 {
            return Err(LogLinError::invalid_argument("num_classes must not be 0"));
        }
        if data.iter().flatten().any(|&f| f >= num_features) {
            return Err(LogLinError::invalid_argument(
                "feature id must be less than num_features",
            ));
        }
        Ok(Self {
            num_features,
            num_classes,
            data,
            values: None,
            labels: None,
            weights: None,
        })
    }

    /// Attaches real values parallel to the feature ids.
    ///
    /// # Errors
    ///
    /// `values` must have exactly the shape of the feature ids, and every
    /// value must be finite.
    pub fn with_values(mut self, values: Vec<Vec<f64>>) -> Result<Self> {
        if values.len() != self.data.len()
            || values.iter().zip(&self.data).any(|(v, d)| v.len() != d.len())
        {
            return Err(LogLinError::invalid_argument(
                "values must have the same shape as data",
            ));
        }
        if values.iter().flatten().any(|v| !v.is_finite()) {
            return Err(LogLinError::invalid_argument("values must be finite"));
        }
        self.values = Some(values);
        Ok(self)
    }

    /// Attaches a non-negative importance weight to every example.
    ///
    /// # Errors
    ///
    /// `weights` must have the same length as data, and every weight must be
    /// finite and non-negative.
    pub fn with_weights(mut self, weights: Vec<f64>) -> Result<Self> {
        if weights.len() != self.data.len() {
            return Err(LogLinError::invalid_argument(
                "weights must have the same length as data",
            ));
        }
        if weights.iter().any(|&w| !w.is_finite() || w < 0.0) {
            return Err(LogLinError::invalid_argument(
                "weights must be finite and non-negative",
            ));
        }
        self.weights = Some(weights);
        Ok(self)
    }

    /// Number of features.
    #[inline(always)]
    pub const fn num_features(&self) -> usize {
        self.num_features
    }

    /// Number of classes.
    #[inline(always)]
    pub const fn num_classes(&self) -> usize {
        self.num_classes
    }

    /// Number of examples.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if there is no example.
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns `true` if the dataset carries gold labels.
    #[inline(always)]
    pub const fn is_labeled(&self) -> bool {
        self.labels.is_some()
    }

    /// Returns `true` if the dataset carries real feature values.
    #[inline(always)]
    pub const fn has_values(&self) -> bool {
        self.values.is_some()
    }

    /// Gold labels, or an empty slice for an unlabeled dataset.
    #[inline(always)]
    pub fn labels(&self) -> &[usize] {
        self.labels.as_deref().unwrap_or(&[])
    }

    /// Importance weight of the `i`-th example, 1 when none were given.
    #[inline(always)]
    pub fn weight(&self, i: usize) -> f64 {
        self.weights.as_ref().map_or(1.0, |w| w[i])
    }

    /// Gets the `i`-th example.
    #[inline(always)]
    pub fn example(&self, i: usize) -> Example<'_> {
        Example {
            features: &self.data[i],
            values: self.values.as_ref().map(|v| v[i].as_slice()),
        }
    }

    /// Iterates over all examples.
    pub fn examples(&self) -> impl Iterator<Item = Example<'_>> + '_ {
        (0..self.len()).map(|i| self.example(i))
    }

    /// Weighted conditional log-likelihood of the gold labels under `weights`.
    ///
    /// # Errors
    ///
    /// The dataset must be labeled and `weights` must match `scheme`, which
    /// must cover the dataset's features and classes.
    pub fn log_likelihood(&self, scheme: &IndexScheme, weights: &[f64]) -> Result<f64> {
        if !self.is_labeled() {
            return Err(LogLinError::invalid_argument("dataset must be labeled"));
        }
        if scheme.num_features() < self.num_features || scheme.num_classes() != self.num_classes {
            return Err(LogLinError::invalid_argument(
                "scheme does not match the dataset",
            ));
        }
        if weights.len() != scheme.dimension() {
            return Err(LogLinError::invalid_argument(
                "weights must have the dimension of the scheme",
            ));
        }
        Ok(-log_linear::negative_log_likelihood(self, scheme, weights, None))
    }
}

/// Active features of one example.
#[derive(Clone, Copy, Debug)]
pub struct Example<'a> {
    features: &'a [usize],
    values: Option<&'a [f64]>,
}

impl<'a> Example<'a> {
    /// Feature ids.
    #[inline(always)]
    pub const fn features(&self) -> &'a [usize] {
        self.features
    }

    /// Returns `true` if no feature is active.
    #[inline(always)]
    pub const fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Iterates over `(feature, value)` pairs. Presence-only features have value 1.
    #[inline(always)]
    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + 'a {
        let values = self.values;
        self.features
            .iter()
            .enumerate()
            .map(move |(i, &f)| (f, values.map_or(1.0, |v| v[i])))
    }

    /// Writes the activation of every class into `sums`.
    ///
    /// Classes without weights in `scheme` (the reference class) stay at 0.
    #[inline]
    pub(crate) fn activations(&self, scheme: &IndexScheme, weights: &[f64], sums: &mut [f64]) {
        sums.fill(0.0);
        for (f, v) in self.iter() {
            for c in scheme.free_classes() {
                sums[c] += weights[scheme.index(f, c)] * v;
            }
        }
    }

    /// Adds `coefs[c] * value(f)` to the derivative of every `(f, c)` weight.
    #[inline]
    pub(crate) fn add_gradient(&self, scheme: &IndexScheme, coefs: &[f64], gradient: &mut [f64]) {
        for (f, v) in self.iter() {
            for c in scheme.free_classes() {
                gradient[scheme.index(f, c)] += coefs[c] * v;
            }
        }
    }
}

/// Normalizes activations into probabilities and returns their log-sum-exp.
#[inline]
pub(crate) fn normalize(sums: &[f64], probs: &mut [f64]) -> f64 {
    let total = crate::math::logsumexp_slice(sums);
    for (p, &s) in probs.iter_mut().zip(sums) {
        *p = (s - total).exp();
    }
    total
}
