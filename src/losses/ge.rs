use hashbrown::HashMap;

use crate::dataset::{normalize, Dataset};
use crate::errors::{LogLinError, Result};
use crate::losses::log_linear::negative_log_likelihood;
use crate::scheme::IndexScheme;

/// Pseudo-count added to every class when estimating label distributions.
const SMOOTHING: f64 = 1.0;

/// Conditional log-likelihood of labeled data plus a generalized expectation
/// penalty on unlabeled data.
///
/// For every GE feature `k`, the label distribution of the labeled examples
/// containing `k` is estimated once. At every evaluation the model's
/// expected label distribution over the unlabeled examples containing `k`
/// is recomputed, and `KL(empirical || model)` is added to the loss.
#[derive(Debug)]
pub struct GeLoss<'a> {
    labeled: &'a Dataset,
    unlabeled: &'a Dataset,
    scheme: IndexScheme,
    ge_features: Vec<usize>,
    empirical: Vec<Vec<f64>>,
    active: Vec<Vec<usize>>,
}

impl<'a> GeLoss<'a> {
    /// Creates a loss.
    ///
    /// # Errors
    ///
    /// `labeled` must be labeled, both datasets must have the same numbers of
    /// features and classes, and the GE features must be distinct valid ids.
    pub fn new(labeled: &'a Dataset, unlabeled: &'a Dataset, ge_features: &[usize]) -> Result<Self> {
        if !labeled.is_labeled() {
            return Err(LogLinError::invalid_argument("dataset must be labeled"));
        }
        if labeled.num_features() != unlabeled.num_features()
            || labeled.num_classes() != unlabeled.num_classes()
        {
            return Err(LogLinError::invalid_argument(
                "labeled and unlabeled datasets must share features and classes",
            ));
        }
        let mut slots = HashMap::with_capacity(ge_features.len());
        for (k, &f) in ge_features.iter().enumerate() {
            if f >= labeled.num_features() {
                return Err(LogLinError::invalid_argument(
                    "GE feature must be less than num_features",
                ));
            }
            if slots.insert(f, k).is_some() {
                return Err(LogLinError::invalid_argument("GE features must be distinct"));
            }
        }

        let num_classes = labeled.num_classes();
        let mut counts = vec![vec![0.0; num_classes]; ge_features.len()];
        for (i, &y) in labeled.labels().iter().enumerate() {
            let weight = labeled.weight(i);
            for_each_slot(labeled.example(i).features(), &slots, |k| {
                counts[k][y] += weight;
            });
        }
        let empirical: Vec<Vec<f64>> = counts
            .into_iter()
            .map(|row| {
                let total = row.iter().sum::<f64>() + SMOOTHING * num_classes as f64;
                row.into_iter().map(|n| (n + SMOOTHING) / total).collect()
            })
            .collect();

        let mut active = vec![vec![]; ge_features.len()];
        for i in 0..unlabeled.len() {
            for_each_slot(unlabeled.example(i).features(), &slots, |k| {
                active[k].push(i);
            });
        }
        log::debug!(
            "GE loss: {} GE features, {} active unlabeled examples",
            ge_features.len(),
            active.iter().map(Vec::len).sum::<usize>(),
        );

        Ok(Self {
            labeled,
            unlabeled,
            scheme: IndexScheme::feature_major(labeled.num_features(), num_classes),
            ge_features: ge_features.to_vec(),
            empirical,
            active,
        })
    }

    /// Gets the weight layout.
    pub const fn scheme(&self) -> IndexScheme {
        self.scheme
    }

    /// GE feature ids.
    pub fn ge_features(&self) -> &[usize] {
        &self.ge_features
    }

    /// Smoothed label distribution of the labeled examples containing the
    /// `k`-th GE feature.
    pub fn empirical(&self, k: usize) -> &[f64] {
        &self.empirical[k]
    }

    /// Unlabeled examples containing the `k`-th GE feature.
    pub fn active_examples(&self, k: usize) -> &[usize] {
        &self.active[k]
    }

    pub(crate) fn accumulate(&self, weights: &[f64], gradient: &mut [f64]) -> f64 {
        let mut value =
            negative_log_likelihood(self.labeled, &self.scheme, weights, Some(&mut *gradient));

        let num_classes = self.scheme.num_classes();
        let mut sums = vec![0.0; num_classes];
        let mut probs = vec![vec![]; self.unlabeled.len()];
        for indices in &self.active {
            for &i in indices {
                if probs[i].is_empty() {
                    let mut p = vec![0.0; num_classes];
                    self.unlabeled
                        .example(i)
                        .activations(&self.scheme, weights, &mut sums);
                    normalize(&sums, &mut p);
                    probs[i] = p;
                }
            }
        }

        let mut model = vec![0.0; num_classes];
        let mut outer = vec![0.0; num_classes];
        let mut coefs = vec![0.0; num_classes];
        for (empirical, indices) in self.empirical.iter().zip(&self.active) {
            if indices.is_empty() {
                continue;
            }
            model.fill(SMOOTHING);
            for &i in indices {
                for (m, &p) in model.iter_mut().zip(&probs[i]) {
                    *m += p;
                }
            }
            let total = indices.len() as f64 + SMOOTHING * num_classes as f64;
            for m in &mut model {
                *m /= total;
            }
            for ((o, &e), &m) in outer.iter_mut().zip(empirical).zip(&model) {
                value += e * (e / m).ln();
                // d KL / d (expected count of class c)
                *o = -e / (m * total);
            }
            for &i in indices {
                let p = &probs[i];
                // d p[c] / d s[c2] = p[c] * (δ(c, c2) - p[c2])
                for (c2, coef) in coefs.iter_mut().enumerate() {
                    *coef = 0.0;
                    for c in 0..num_classes {
                        let delta = if c == c2 { 1.0 } else { 0.0 };
                        *coef += outer[c] * p[c] * (delta - p[c2]);
                    }
                }
                self.unlabeled
                    .example(i)
                    .add_gradient(&self.scheme, &coefs, gradient);
            }
        }
        value
    }
}

/// Calls `f` once for every GE slot present in `features`.
fn for_each_slot<F>(features: &[usize], slots: &HashMap<usize, usize>, mut f: F)
where
    F: FnMut(usize),
{
    let mut seen: Vec<usize> = vec![];
    for feature in features {
        if let Some(&k) = slots.get(feature) {
            if !seen.contains(&k) {
                seen.push(k);
                f(k);
            }
        }
    }
}
