use crate::cache::DiffFunction;
use crate::errors::{LogLinError, Result};
use crate::objective::Objective;
use crate::prior::Prior;
use crate::scheme::IndexScheme;

/// Convex combination `α f1 + (1 - α) f2` of two objectives.
///
/// The inner objectives keep their own caches but carry no prior; the
/// combined objective adds its prior once.
#[derive(Debug)]
pub struct SemiSupervisedLoss<'a> {
    first: Box<Objective<'a>>,
    second: Box<Objective<'a>>,
    alpha: f64,
}

impl<'a> SemiSupervisedLoss<'a> {
    /// Combines two objectives over the same weight layout.
    ///
    /// # Errors
    ///
    /// `alpha` must lie in `[0, 1]`, both objectives must share a layout and
    /// both must have [`Prior::Null`].
    pub fn new(first: Objective<'a>, second: Objective<'a>, alpha: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&alpha) {
            return Err(LogLinError::invalid_argument("alpha must lie in [0, 1]"));
        }
        if first.prior() != Prior::Null || second.prior() != Prior::Null {
            return Err(LogLinError::invalid_argument(
                "combined objectives must not carry their own prior",
            ));
        }
        if first.scheme() != second.scheme() {
            return Err(LogLinError::invalid_argument(
                "combined objectives must share a weight layout",
            ));
        }
        Ok(Self {
            first: Box::new(first),
            second: Box::new(second),
            alpha,
        })
    }

    /// Gets the weight layout.
    pub fn scheme(&self) -> IndexScheme {
        self.first.scheme()
    }

    /// Gets the mixing weight of the first objective.
    pub const fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Gets the first objective.
    pub fn first(&self) -> &Objective<'a> {
        &self.first
    }

    /// Gets the second objective.
    pub fn second(&self) -> &Objective<'a> {
        &self.second
    }

    pub(crate) fn accumulate(&self, weights: &[f64], gradient: &mut [f64]) -> Result<f64> {
        let beta = 1.0 - self.alpha;
        let v1 = self.first.value_at(weights)?;
        let v2 = self.second.value_at(weights)?;
        let g1 = self.first.derivative_at(weights)?;
        let g2 = self.second.derivative_at(weights)?;
        for ((g, a), b) in gradient.iter_mut().zip(g1).zip(g2) {
            *g += self.alpha * a + beta * b;
        }
        Ok(self.alpha * v1 + beta * v2)
    }
}
