use core::str::FromStr;

use crate::errors::{LogLinError, Result};

/// Regularization term added to the value and the gradient of an objective.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Prior {
    /// No regularization.
    Null,

    /// Gaussian prior: `w² / (2σ²)` per weight.
    Quadratic {
        /// Standard deviation.
        sigma: f64,
    },

    /// Quadratic within `epsilon` of zero and linear beyond it.
    Huber {
        /// Scale of the penalty.
        sigma: f64,

        /// Width of the quadratic region.
        epsilon: f64,
    },

    /// `w⁴ / (2σ⁴)` per weight.
    Quartic {
        /// Scale of the penalty.
        sigma: f64,
    },
}

fn check_positive(x: f64, msg: &'static str) -> Result<()> {
    if x.is_finite() && x > 0.0 {
        Ok(())
    } else {
        Err(LogLinError::invalid_argument(msg))
    }
}

impl Prior {
    /// Default sigma used by [`Prior::from_name`].
    pub const DEFAULT_SIGMA: f64 = 1.0;

    /// Default epsilon used by [`Prior::from_name`].
    pub const DEFAULT_EPSILON: f64 = 0.1;

    /// Creates a quadratic prior.
    ///
    /// # Errors
    ///
    /// `sigma` must be finite and positive.
    pub fn quadratic(sigma: f64) -> Result<Self> {
        check_positive(sigma, "sigma must be finite and positive")?;
        Ok(Self::Quadratic { sigma })
    }

    /// Creates a Huber prior.
    ///
    /// # Errors
    ///
    /// `sigma` and `epsilon` must be finite and positive.
    pub fn huber(sigma: f64, epsilon: f64) -> Result<Self> {
        check_positive(sigma, "sigma must be finite and positive")?;
        check_positive(epsilon, "epsilon must be finite and positive")?;
        Ok(Self::Huber { sigma, epsilon })
    }

    /// Creates a quartic prior.
    ///
    /// # Errors
    ///
    /// `sigma` must be finite and positive.
    pub fn quartic(sigma: f64) -> Result<Self> {
        check_positive(sigma, "sigma must be finite and positive")?;
        Ok(Self::Quartic { sigma })
    }

    /// Creates a prior by name with the given hyperparameters.
    ///
    /// Accepted names are `null`, `quadratic`, `huber` and `quartic`
    /// (case-insensitive). `epsilon` is only read by the Huber prior.
    ///
    /// # Errors
    ///
    /// The name must be known and the hyperparameters valid.
    pub fn from_name(name: &str, sigma: f64, epsilon: f64) -> Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "null" => Ok(Self::Null),
            "quadratic" => Self::quadratic(sigma),
            "huber" => Self::huber(sigma, epsilon),
            "quartic" => Self::quartic(sigma),
            _ => Err(LogLinError::invalid_argument("unknown prior type")),
        }
    }

    /// Checks the hyperparameters of a prior that may have been built
    /// without its constructor.
    ///
    /// # Errors
    ///
    /// `sigma` and `epsilon` must be finite and positive.
    pub fn validate(&self) -> Result<()> {
        match *self {
            Self::Null => Ok(()),
            Self::Quadratic { sigma } | Self::Quartic { sigma } => {
                check_positive(sigma, "sigma must be finite and positive")
            }
            Self::Huber { sigma, epsilon } => {
                check_positive(sigma, "sigma must be finite and positive")?;
                check_positive(epsilon, "epsilon must be finite and positive")
            }
        }
    }

    /// Returns the same prior with another sigma. The null prior is unchanged.
    ///
    /// # Errors
    ///
    /// `sigma` must be finite and positive.
    pub fn with_sigma(self, sigma: f64) -> Result<Self> {
        match self {
            Self::Null => Ok(Self::Null),
            Self::Quadratic { .. } => Self::quadratic(sigma),
            Self::Huber { epsilon, .. } => Self::huber(sigma, epsilon),
            Self::Quartic { .. } => Self::quartic(sigma),
        }
    }

    /// Adds the prior's derivative to `gradient` and returns its value.
    pub fn apply(&self, weights: &[f64], gradient: &mut [f64]) -> f64 {
        debug_assert_eq!(weights.len(), gradient.len());
        match *self {
            Self::Null => 0.0,
            Self::Quadratic { sigma } => {
                let sigma_sq = sigma * sigma;
                let mut value = 0.0;
                for (g, &w) in gradient.iter_mut().zip(weights) {
                    value += w * w / (2.0 * sigma_sq);
                    *g += w / sigma_sq;
                }
                value
            }
            Self::Huber { sigma, epsilon } => {
                let sigma_sq = sigma * sigma;
                let mut value = 0.0;
                for (g, &w) in gradient.iter_mut().zip(weights) {
                    if w.abs() < epsilon {
                        value += w * w / (2.0 * epsilon * sigma_sq);
                        *g += w / (epsilon * sigma_sq);
                    } else {
                        value += (w.abs() - epsilon / 2.0) / sigma_sq;
                        *g += w.signum() / sigma_sq;
                    }
                }
                value
            }
            Self::Quartic { sigma } => {
                let sigma_qu = sigma.powi(4);
                let mut value = 0.0;
                for (g, &w) in gradient.iter_mut().zip(weights) {
                    value += w.powi(4) / (2.0 * sigma_qu);
                    *g += 2.0 * w.powi(3) / sigma_qu;
                }
                value
            }
        }
    }
}

impl Default for Prior {
    fn default() -> Self {
        Self::Quadratic {
            sigma: Self::DEFAULT_SIGMA,
        }
    }
}

impl FromStr for Prior {
    type Err = LogLinError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s, Self::DEFAULT_SIGMA, Self::DEFAULT_EPSILON)
    }
}
