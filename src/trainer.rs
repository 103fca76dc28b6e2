use argmin::core::observers::ObserverMode;
use argmin::core::{CostFunction, Executor, Gradient, State};
use argmin::solver::linesearch::condition::ArmijoCondition;
use argmin::solver::linesearch::{BacktrackingLineSearch, MoreThuenteLineSearch};
use argmin::solver::quasinewton::LBFGS;
use argmin_observer_slog::SlogLogger;

use crate::cache::{check_dimension, DiffFunction};
use crate::classifier::LinearClassifier;
use crate::dataset::Dataset;
use crate::errors::{LogLinError, Result};
use crate::objective::Objective;
use crate::prior::Prior;
use crate::scheme::IndexScheme;
use crate::vocab::Vocabulary;

/// Exposes a [`DiffFunction`] to argmin.
struct Problem<'f, F> {
    function: &'f F,
}

impl<F: DiffFunction> CostFunction for Problem<'_, F> {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, param: &Self::Param) -> Result<Self::Output, argmin::core::Error> {
        Ok(self.function.value_at(param)?)
    }
}

impl<F: DiffFunction> Gradient for Problem<'_, F> {
    type Param = Vec<f64>;
    type Gradient = Vec<f64>;

    fn gradient(&self, param: &Self::Param) -> Result<Self::Gradient, argmin::core::Error> {
        Ok(self.function.derivative_at(param)?)
    }
}

/// Trainer of log-linear classifiers.
///
/// Minimizes an objective with L-BFGS. When [`Trainer::l1`] is set, the
/// orthant-wise variant (OWL-QN) adds `lambda * |w|` on top of the
/// objective's own prior; combine it with [`Prior::Null`] for pure L1.
#[derive(Clone, Copy, Debug)]
pub struct Trainer {
    max_iter: u64,
    prior: Prior,
    l1: Option<f64>,
    memory: usize,
    verbose: bool,
}

impl Trainer {
    /// Creates a new trainer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_iter: 100,
            prior: Prior::default(),
            l1: None,
            memory: 7,
            verbose: false,
        }
    }

    /// Sets the maximum number of iterations.
    ///
    /// # Errors
    ///
    /// `max_iter` must be >= 1.
    pub fn max_iter(mut self, max_iter: u64) -> Result<Self> {
        if max_iter == 0 {
            return Err(LogLinError::invalid_argument("max_iter must be >= 1"));
        }
        self.max_iter = max_iter;
        Ok(self)
    }

    /// Sets the prior of the objectives built by [`Trainer::train`].
    #[must_use]
    pub const fn prior(mut self, prior: Prior) -> Self {
        self.prior = prior;
        self
    }

    /// Enables L1 regularization with the given strength.
    ///
    /// The L1 term covers every weight, so [`Trainer::minimize`] refuses
    /// functions whose [`DiffFunction::regularized_ranges`] leave some
    /// weights out, such as shift parameter objectives.
    ///
    /// # Errors
    ///
    /// `lambda` must be finite and positive.
    pub fn l1(mut self, lambda: f64) -> Result<Self> {
        if !lambda.is_finite() || lambda <= 0.0 {
            return Err(LogLinError::invalid_argument(
                "lambda must be finite and positive",
            ));
        }
        self.l1 = Some(lambda);
        Ok(self)
    }

    /// Sets the number of correction pairs L-BFGS keeps.
    ///
    /// # Errors
    ///
    /// `memory` must not be 0.
    pub fn memory(mut self, memory: usize) -> Result<Self> {
        if memory == 0 {
            return Err(LogLinError::invalid_argument("memory must not be 0"));
        }
        self.memory = memory;
        Ok(self)
    }

    /// Prints every iteration to the terminal.
    #[must_use]
    pub const fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Minimizes `function` starting from `init` and returns the best point.
    ///
    /// # Errors
    ///
    /// `init` must have the domain dimension. With L1 enabled, the
    /// regularized ranges of `function` must cover the whole domain. Errors
    /// of `function` and of the optimizer are propagated.
    pub fn minimize<F: DiffFunction>(&self, function: &F, init: Vec<f64>) -> Result<Vec<f64>> {
        check_dimension(&init, function.domain_dimension())?;
        if self.l1.is_some()
            && function.regularized_ranges() != [0..function.domain_dimension()]
        {
            return Err(LogLinError::unsupported(
                "L1 regularization cannot skip part of the domain",
            ));
        }
        let problem = Problem { function };
        let mut state = match self.l1 {
            Some(lambda) => {
                let linesearch =
                    BacktrackingLineSearch::new(ArmijoCondition::new(1e-4)?).rho(0.5)?;
                let solver =
                    LBFGS::new(linesearch, self.memory).with_l1_regularization(lambda)?;
                let mut executor = Executor::new(problem, solver)
                    .configure(|state| state.param(init).max_iters(self.max_iter));
                if self.verbose {
                    executor = executor.add_observer(SlogLogger::term(), ObserverMode::Always);
                }
                executor.run()?.state().clone()
            }
            None => {
                let linesearch = MoreThuenteLineSearch::new().with_c(1e-4, 0.9)?;
                let solver = LBFGS::new(linesearch, self.memory);
                let mut executor = Executor::new(problem, solver)
                    .configure(|state| state.param(init).max_iters(self.max_iter));
                if self.verbose {
                    executor = executor.add_observer(SlogLogger::term(), ObserverMode::Always);
                }
                executor.run()?.state().clone()
            }
        };
        log::info!(
            "L-BFGS stopped after {} iterations ({:?}), best cost = {}",
            state.get_iter(),
            state.get_termination_status(),
            state.get_best_cost(),
        );
        state
            .take_best_param()
            .ok_or_else(|| LogLinError::Optimization("no parameter was evaluated".to_string()))
    }

    /// Trains a multinomial log-linear model and returns its weights in the
    /// feature-major layout.
    ///
    /// # Errors
    ///
    /// The dataset must be labeled.
    pub fn train(&self, dataset: &Dataset) -> Result<Vec<f64>> {
        let objective = Objective::log_linear(dataset, self.prior)?;
        self.minimize(&objective, vec![0.0; objective.domain_dimension()])
    }

    /// Trains a model and wraps it into a classifier.
    ///
    /// # Errors
    ///
    /// See [`Trainer::train`] and [`LinearClassifier::new`].
    pub fn train_classifier(
        &self,
        dataset: &Dataset,
        features: Vocabulary,
        labels: Vocabulary,
    ) -> Result<LinearClassifier> {
        let weights = self.train(dataset)?;
        LinearClassifier::new(
            IndexScheme::feature_major(dataset.num_features(), dataset.num_classes()),
            weights,
            features,
            labels,
        )
    }

    /// Trains one model per candidate sigma and returns the sigma whose
    /// model has the highest log-likelihood on `heldout`. Ties go to the
    /// earlier candidate.
    ///
    /// # Errors
    ///
    /// `candidates` must not be empty, every candidate must be a valid
    /// sigma, and both datasets must be labeled with matching shapes.
    pub fn tune_sigma(&self, train: &Dataset, heldout: &Dataset, candidates: &[f64]) -> Result<f64> {
        if candidates.is_empty() {
            return Err(LogLinError::invalid_argument("candidates must not be empty"));
        }
        let scheme = IndexScheme::feature_major(train.num_features(), train.num_classes());
        let mut best = None;
        for &sigma in candidates {
            let trainer = self.prior(self.prior.with_sigma(sigma)?);
            let weights = trainer.train(train)?;
            let score = heldout.log_likelihood(&scheme, &weights)?;
            log::info!("sigma = {sigma}: held-out log-likelihood = {score}");
            match best {
                Some((_, best_score)) if best_score >= score => {}
                _ => best = Some((sigma, score)),
            }
        }
        best.map(|(sigma, _)| sigma)
            .ok_or(LogLinError::invalid_argument("candidates must not be empty"))
    }
}

impl Default for Trainer {
    fn default() -> Self {
        Self::new()
    }
}
