use crate::dataset::{normalize, Dataset};
use crate::errors::{LogLinError, Result};
use crate::scheme::IndexScheme;

/// Negative conditional log-likelihood of the gold labels.
///
/// If `gradient` is given, the expected minus the observed feature counts
/// are added to it. Examples with weight 0 are skipped.
pub(crate) fn negative_log_likelihood(
    dataset: &Dataset,
    scheme: &IndexScheme,
    weights: &[f64],
    mut gradient: Option<&mut [f64]>,
) -> f64 {
    let mut sums = vec![0.0; dataset.num_classes()];
    let mut probs = vec![0.0; dataset.num_classes()];
    let mut value = 0.0;
    for (i, &y) in dataset.labels().iter().enumerate() {
        let weight = dataset.weight(i);
        if weight == 0.0 {
            continue;
        }
        let example = dataset.example(i);
        example.activations(scheme, weights, &mut sums);
        let total = normalize(&sums, &mut probs);
        value -= weight * (sums[y] - total);
        if let Some(gradient) = gradient.as_deref_mut() {
            for p in &mut probs {
                *p *= weight;
            }
            probs[y] -= weight;
            example.add_gradient(scheme, &probs, gradient);
        }
    }
    value
}

/// Multinomial log-linear loss over a feature-major weight vector.
#[derive(Debug)]
pub struct LogLinearLoss<'a> {
    dataset: &'a Dataset,
    scheme: IndexScheme,
}

impl<'a> LogLinearLoss<'a> {
    /// Creates a loss over a labeled dataset.
    ///
    /// # Errors
    ///
    /// The dataset must be labeled.
    pub fn new(dataset: &'a Dataset) -> Result<Self> {
        if !dataset.is_labeled() {
            return Err(LogLinError::invalid_argument("dataset must be labeled"));
        }
        Ok(Self {
            dataset,
            scheme: IndexScheme::feature_major(dataset.num_features(), dataset.num_classes()),
        })
    }

    /// Gets the weight layout.
    pub const fn scheme(&self) -> IndexScheme {
        self.scheme
    }

    pub(crate) fn accumulate(&self, weights: &[f64], gradient: &mut [f64]) -> f64 {
        negative_log_likelihood(self.dataset, &self.scheme, weights, Some(gradient))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use crate::cache::DiffFunction;
    use crate::objective::Objective;
    use crate::prior::Prior;
    use crate::test_utils::{self, logsumexp};

    // weights (feature-major, 3 classes):
    //   f0: [1, 2, 3]
    //   f1: [0, -1, 4]
    // example 0: {f0, f1}, gold 2 -> sums [1, 1, 7]
    // example 1: {f1},     gold 0 -> sums [0, -1, 4]
    #[test]
    fn test_loss() {
        let dataset = Dataset::new(2, 3, vec![vec![0, 1], vec![1]], vec![2, 0]).unwrap();
        let loss = LogLinearLoss::new(&dataset).unwrap();
        let weights = vec![1.0, 2.0, 3.0, 0.0, -1.0, 4.0];
        let mut gradient = vec![0.0; 6];
        let result = loss.accumulate(&weights, &mut gradient);

        let z0 = logsumexp!(1.0, 1.0, 7.0);
        let z1 = logsumexp!(0.0, -1.0, 4.0);
        let expected = (z0 - 7.0) + (z1 - 0.0);
        assert!((expected - result).abs() < 1e-12);

        let p0 = [(1.0 - z0).exp(), (1.0 - z0).exp(), (7.0 - z0).exp()];
        let p1 = [(0.0 - z1).exp(), (-1.0 - z1).exp(), (4.0 - z1).exp()];
        let expected = vec![
            p0[0],
            p0[1],
            p0[2] - 1.0,
            p0[0] + p1[0] - 1.0,
            p0[1] + p1[1],
            p0[2] - 1.0 + p1[2],
        ];
        for (a, b) in expected.iter().zip(&gradient) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn test_empty_example_is_uniform() {
        let dataset = Dataset::new(2, 4, vec![vec![]], vec![1]).unwrap();
        let loss = LogLinearLoss::new(&dataset).unwrap();
        let mut gradient = vec![0.0; 8];
        let result = loss.accumulate(&[0.5; 8], &mut gradient);
        assert!((result - 4f64.ln()).abs() < 1e-12);
        assert!(gradient.iter().all(|&g| g == 0.0));
    }

    #[test]
    fn test_weights_scale_value_and_gradient() {
        let data = vec![vec![0, 1], vec![1]];
        let plain = Dataset::new(2, 2, data.clone(), vec![0, 1]).unwrap();
        let weighted = Dataset::new(2, 2, data, vec![0, 1])
            .unwrap()
            .with_weights(vec![2.0, 0.0])
            .unwrap();
        let only_first = Dataset::new(2, 2, vec![vec![0, 1]], vec![0]).unwrap();
        let x = vec![0.3, -0.2, 0.1, 0.7];

        let mut g_weighted = vec![0.0; 4];
        let mut g_first = vec![0.0; 4];
        let v_weighted = LogLinearLoss::new(&weighted)
            .unwrap()
            .accumulate(&x, &mut g_weighted);
        let v_first = LogLinearLoss::new(&only_first)
            .unwrap()
            .accumulate(&x, &mut g_first);
        assert!((v_weighted - 2.0 * v_first).abs() < 1e-12);
        for (a, b) in g_weighted.iter().zip(&g_first) {
            assert!((a - 2.0 * b).abs() < 1e-12);
        }
        assert!(LogLinearLoss::new(&plain).is_ok());
    }

    #[test]
    fn test_unlabeled_dataset() {
        let dataset = Dataset::unlabeled(2, 2, vec![vec![0]]).unwrap();
        assert!(matches!(
            LogLinearLoss::new(&dataset),
            Err(LogLinError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_gradient() {
        let mut rng = StdRng::seed_from_u64(11);
        for with_values in [false, true] {
            let dataset = test_utils::random_dataset(&mut rng, 5, 3, 12, with_values, true);
            let objective = Objective::log_linear(&dataset, Prior::quadratic(1.5).unwrap()).unwrap();
            let x = test_utils::random_point(&mut rng, objective.domain_dimension());
            test_utils::assert_gradient(&objective, &x);
        }
    }

    #[test]
    fn test_caching() {
        let mut rng = StdRng::seed_from_u64(3);
        let dataset = test_utils::random_dataset(&mut rng, 4, 3, 10, false, false);
        let objective = Objective::log_linear(&dataset, Prior::Null).unwrap();
        let x = test_utils::random_point(&mut rng, objective.domain_dimension());
        test_utils::assert_single_pass(&objective, &x);
    }
}
