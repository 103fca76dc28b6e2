use core::ops::Range;

use crate::cache::{check_dimension, DiffFunction, Memo};
use crate::dataset::Dataset;
use crate::errors::{LogLinError, Result};
use crate::losses::biased::{BiasedLoss, ConfusionMatrix};
use crate::losses::binary::BinaryLoss;
use crate::losses::ge::GeLoss;
use crate::losses::log_linear::LogLinearLoss;
use crate::losses::semi_supervised::SemiSupervisedLoss;
use crate::losses::shift::ShiftParamLoss;
use crate::prior::Prior;
use crate::scheme::IndexScheme;

/// Data term of an [`Objective`].
#[derive(Debug)]
pub enum Loss<'a> {
    /// Multinomial log-linear loss.
    LogLinear(LogLinearLoss<'a>),

    /// Two-class logistic loss.
    Binary(BinaryLoss<'a>),

    /// Log-linear loss under a label noise model.
    Biased(BiasedLoss<'a>),

    /// Log-linear loss with per-example shift parameters.
    ShiftParams(ShiftParamLoss<'a>),

    /// Log-linear loss with a generalized expectation penalty.
    GeneralizedExpectation(GeLoss<'a>),

    /// Convex combination of two objectives.
    SemiSupervised(SemiSupervisedLoss<'a>),
}

impl Loss<'_> {
    fn scheme(&self) -> IndexScheme {
        match self {
            Self::LogLinear(loss) => loss.scheme(),
            Self::Binary(loss) => loss.scheme(),
            Self::Biased(loss) => loss.scheme(),
            Self::ShiftParams(loss) => loss.scheme(),
            Self::GeneralizedExpectation(loss) => loss.scheme(),
            Self::SemiSupervised(loss) => loss.scheme(),
        }
    }

    fn accumulate(&self, weights: &[f64], gradient: &mut [f64]) -> Result<f64> {
        Ok(match self {
            Self::LogLinear(loss) => loss.accumulate(weights, gradient),
            Self::Binary(loss) => loss.accumulate(weights, gradient),
            Self::Biased(loss) => loss.accumulate(weights, gradient),
            Self::ShiftParams(loss) => loss.accumulate(weights, gradient),
            Self::GeneralizedExpectation(loss) => loss.accumulate(weights, gradient),
            Self::SemiSupervised(loss) => loss.accumulate(weights, gradient)?,
        })
    }
}

/// Differentiable training objective: a loss plus a prior.
///
/// Value and gradient are computed together in one pass and cached for the
/// last point, so querying both at the same point costs one evaluation.
/// Points are compared by value.
#[derive(Debug)]
pub struct Objective<'a> {
    loss: Loss<'a>,
    prior: Prior,
    memo: Memo,
}

impl<'a> Objective<'a> {
    fn with_loss(loss: Loss<'a>, prior: Prior) -> Result<Self> {
        prior.validate()?;
        Ok(Self {
            loss,
            prior,
            memo: Memo::new(),
        })
    }

    /// Multinomial log-linear objective over a feature-major layout.
    ///
    /// # Errors
    ///
    /// The dataset must be labeled and `prior` valid.
    pub fn log_linear(dataset: &'a Dataset, prior: Prior) -> Result<Self> {
        Self::with_loss(Loss::LogLinear(LogLinearLoss::new(dataset)?), prior)
    }

    /// Binary logistic objective with one weight per feature.
    ///
    /// # Errors
    ///
    /// The dataset must be labeled and have exactly two classes, and `prior`
    /// must be valid.
    pub fn binary(dataset: &'a Dataset, prior: Prior) -> Result<Self> {
        Self::with_loss(Loss::Binary(BinaryLoss::new(dataset)?), prior)
    }

    /// Objective that treats the labels as observed through `confusion`.
    ///
    /// # Errors
    ///
    /// See [`BiasedLoss::new`]. `prior` must be valid.
    pub fn biased(dataset: &'a Dataset, confusion: ConfusionMatrix, prior: Prior) -> Result<Self> {
        Self::with_loss(Loss::Biased(BiasedLoss::new(dataset, confusion)?), prior)
    }

    /// Objective with a shift parameter per example.
    ///
    /// `prior` regularizes the feature weights and `shift_prior` the shift
    /// parameters.
    ///
    /// # Errors
    ///
    /// See [`ShiftParamLoss::new`]. `prior` must be valid.
    pub fn shift_params(dataset: &'a Dataset, prior: Prior, shift_prior: Prior) -> Result<Self> {
        Self::with_loss(
            Loss::ShiftParams(ShiftParamLoss::new(dataset, shift_prior)?),
            prior,
        )
    }

    /// Log-linear objective regularized by generalized expectation
    /// constraints on `ge_features`.
    ///
    /// # Errors
    ///
    /// See [`GeLoss::new`]. `prior` must be valid.
    pub fn generalized_expectation(
        labeled: &'a Dataset,
        unlabeled: &'a Dataset,
        ge_features: &[usize],
        prior: Prior,
    ) -> Result<Self> {
        Self::with_loss(
            Loss::GeneralizedExpectation(GeLoss::new(labeled, unlabeled, ge_features)?),
            prior,
        )
    }

    /// `alpha * first + (1 - alpha) * second`, plus `prior` once.
    ///
    /// # Errors
    ///
    /// See [`SemiSupervisedLoss::new`]. `prior` must be valid.
    pub fn semi_supervised(
        first: Objective<'a>,
        second: Objective<'a>,
        alpha: f64,
        prior: Prior,
    ) -> Result<Self> {
        Self::with_loss(
            Loss::SemiSupervised(SemiSupervisedLoss::new(first, second, alpha)?),
            prior,
        )
    }

    /// Gets the loss.
    pub const fn loss(&self) -> &Loss<'a> {
        &self.loss
    }

    /// Gets the prior.
    pub const fn prior(&self) -> Prior {
        self.prior
    }

    /// Gets the weight layout.
    pub fn scheme(&self) -> IndexScheme {
        self.loss.scheme()
    }

    /// Number of full evaluations performed so far.
    pub fn evaluations(&self) -> usize {
        self.memo.evaluations()
    }

    /// Converts trained weights into a layout over the real features only.
    ///
    /// # Errors
    ///
    /// `weights` must have the domain dimension.
    pub fn classifier_weights(&self, weights: &[f64]) -> Result<(IndexScheme, Vec<f64>)> {
        check_dimension(weights, self.domain_dimension())?;
        Ok(match &self.loss {
            Loss::ShiftParams(loss) => loss.strip_shift_parameters(weights),
            _ => (self.scheme(), weights.to_vec()),
        })
    }

    fn calculate(&self, weights: &[f64], gradient: &mut [f64]) -> Result<f64> {
        if weights.iter().any(|w| !w.is_finite()) {
            return Err(LogLinError::invalid_argument("point must be finite"));
        }
        let mut value = self.loss.accumulate(weights, gradient)?;
        if self.prior != Prior::Null {
            for range in self.regularized_ranges() {
                value += self
                    .prior
                    .apply(&weights[range.clone()], &mut gradient[range]);
            }
        }
        log::debug!("objective value = {value}");
        Ok(value)
    }
}

impl DiffFunction for Objective<'_> {
    fn domain_dimension(&self) -> usize {
        self.scheme().dimension()
    }

    fn value_at(&self, x: &[f64]) -> Result<f64> {
        check_dimension(x, self.domain_dimension())?;
        self.memo.value(x, |x, gradient| self.calculate(x, gradient))
    }

    fn derivative_at(&self, x: &[f64]) -> Result<Vec<f64>> {
        check_dimension(x, self.domain_dimension())?;
        self.memo.gradient(x, |x, gradient| self.calculate(x, gradient))
    }

    /// Index ranges the prior applies to. The shift block of a shift
    /// parameter objective is excluded.
    fn regularized_ranges(&self) -> Vec<Range<usize>> {
        match &self.loss {
            Loss::ShiftParams(loss) => loss.feature_ranges(),
            _ => vec![0..self.scheme().dimension()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use crate::test_utils;

    #[test]
    fn test_dimension_mismatch() {
        let dataset = Dataset::new(2, 3, vec![vec![0]], vec![1]).unwrap();
        let objective = Objective::log_linear(&dataset, Prior::Null).unwrap();
        assert_eq!(6, objective.domain_dimension());
        assert!(matches!(
            objective.value_at(&[0.0; 5]),
            Err(LogLinError::InvalidArgument(_))
        ));
        assert_eq!(0, objective.evaluations());
    }

    #[test]
    fn test_invalid_prior() {
        let dataset = Dataset::new(2, 2, vec![vec![0], vec![1]], vec![0, 1]).unwrap();
        for prior in [
            Prior::Quadratic { sigma: 0.0 },
            Prior::Huber {
                sigma: 1.0,
                epsilon: -1.0,
            },
        ] {
            assert!(matches!(
                Objective::log_linear(&dataset, prior),
                Err(LogLinError::InvalidArgument(_))
            ));
            assert!(matches!(
                Objective::shift_params(&dataset, Prior::Null, prior),
                Err(LogLinError::InvalidArgument(_))
            ));
        }
    }

    #[test]
    fn test_non_finite_point() {
        let dataset = Dataset::new(1, 2, vec![vec![0]], vec![1]).unwrap();
        let objective = Objective::log_linear(&dataset, Prior::Null).unwrap();
        assert!(matches!(
            objective.derivative_at(&[f64::NAN, 0.0]),
            Err(LogLinError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_cache_keyed_on_point() {
        let mut rng = StdRng::seed_from_u64(59);
        let dataset = test_utils::random_dataset(&mut rng, 3, 2, 6, false, false);
        let objective = Objective::log_linear(&dataset, Prior::Null).unwrap();
        let x = test_utils::random_point(&mut rng, 6);
        let mut y = x.clone();
        y[0] += 1.0;

        let vx = objective.value_at(&x).unwrap();
        let gy = objective.derivative_at(&y).unwrap();
        let vy = objective.value_at(&y).unwrap();
        assert_eq!(2, objective.evaluations());
        assert_ne!(vx, vy);

        let fresh = Objective::log_linear(&dataset, Prior::Null).unwrap();
        assert_eq!(vy, fresh.value_at(&y).unwrap());
        assert_eq!(gy, fresh.derivative_at(&y).unwrap());
        assert_eq!(vx, objective.value_at(&x).unwrap());
        assert_eq!(3, objective.evaluations());
    }

    #[test]
    fn test_prior_added_once() {
        let dataset = Dataset::new(2, 2, vec![vec![0, 1]], vec![1]).unwrap();
        let prior = Prior::quadratic(1.0).unwrap();
        let plain = Objective::log_linear(&dataset, Prior::Null).unwrap();
        let regularized = Objective::log_linear(&dataset, prior).unwrap();
        let x = vec![1.0, -1.0, 0.5, 2.0];
        let expected = plain.value_at(&x).unwrap() + (1.0 + 1.0 + 0.25 + 4.0) / 2.0;
        assert!((regularized.value_at(&x).unwrap() - expected).abs() < 1e-12);
        let g_plain = plain.derivative_at(&x).unwrap();
        let g_regularized = regularized.derivative_at(&x).unwrap();
        for ((a, b), w) in g_regularized.iter().zip(&g_plain).zip(&x) {
            assert!((a - b - w).abs() < 1e-12);
        }
    }

    #[test]
    fn test_classifier_weights() {
        let dataset = Dataset::new(2, 2, vec![vec![0], vec![1]], vec![0, 1]).unwrap();
        let objective = Objective::log_linear(&dataset, Prior::Null).unwrap();
        let (scheme, weights) = objective.classifier_weights(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(IndexScheme::feature_major(2, 2), scheme);
        assert_eq!(vec![1.0, 2.0, 3.0, 4.0], weights);
    }
}
