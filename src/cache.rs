use core::cell::RefCell;
use core::ops::Range;

use crate::errors::{LogLinError, Result};

/// A value and gradient oracle consumed by gradient-based optimizers.
pub trait DiffFunction {
    /// Length of the points this function accepts.
    fn domain_dimension(&self) -> usize;

    /// Evaluates the function at `x`.
    ///
    /// # Errors
    ///
    /// `x` must have [`Self::domain_dimension`] elements.
    fn value_at(&self, x: &[f64]) -> Result<f64>;

    /// Evaluates the gradient at `x`.
    ///
    /// # Errors
    ///
    /// `x` must have [`Self::domain_dimension`] elements.
    fn derivative_at(&self, x: &[f64]) -> Result<Vec<f64>>;

    /// Index ranges a regularizer may penalize. Defaults to the whole domain.
    fn regularized_ranges(&self) -> Vec<Range<usize>> {
        vec![0..self.domain_dimension()]
    }
}

#[derive(Debug, Default)]
struct Entry {
    point: Option<Vec<f64>>,
    value: f64,
    gradient: Vec<f64>,
    evaluations: usize,
}

/// Remembers the value and the gradient of the last evaluated point.
///
/// Points are compared by value, so a point containing NaN never hits.
#[derive(Debug, Default)]
pub(crate) struct Memo {
    cell: RefCell<Entry>,
}

impl Memo {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Number of times `calculate` actually ran.
    pub(crate) fn evaluations(&self) -> usize {
        self.cell.borrow().evaluations
    }

    /// Makes sure the cell holds the results for `x`, calling `calculate`
    /// only if `x` differs from the last point.
    ///
    /// `calculate` receives a zeroed gradient buffer of length `x.len()` and
    /// returns the value. The buffer is allocated once and reused.
    fn ensure<F>(&self, x: &[f64], calculate: F) -> Result<()>
    where
        F: FnOnce(&[f64], &mut [f64]) -> Result<f64>,
    {
        let mut cell = self.cell.borrow_mut();
        if cell.point.as_deref() == Some(x) {
            return Ok(());
        }
        // A failed calculation must not leave a result keyed on the old point.
        let mut point = cell.point.take().unwrap_or_default();
        if cell.gradient.len() == x.len() {
            cell.gradient.fill(0.0);
        } else {
            cell.gradient = vec![0.0; x.len()];
        }
        let value = calculate(x, &mut cell.gradient)?;
        cell.value = value;
        cell.evaluations += 1;
        point.clear();
        point.extend_from_slice(x);
        cell.point = Some(point);
        Ok(())
    }

    pub(crate) fn value<F>(&self, x: &[f64], calculate: F) -> Result<f64>
    where
        F: FnOnce(&[f64], &mut [f64]) -> Result<f64>,
    {
        self.ensure(x, calculate)?;
        Ok(self.cell.borrow().value)
    }

    pub(crate) fn gradient<F>(&self, x: &[f64], calculate: F) -> Result<Vec<f64>>
    where
        F: FnOnce(&[f64], &mut [f64]) -> Result<f64>,
    {
        self.ensure(x, calculate)?;
        Ok(self.cell.borrow().gradient.clone())
    }
}

pub(crate) fn check_dimension(x: &[f64], dimension: usize) -> Result<()> {
    if x.len() == dimension {
        Ok(())
    } else {
        Err(LogLinError::invalid_argument(
            "point must have the domain dimension",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x: &[f64], gradient: &mut [f64]) -> Result<f64> {
        let mut value = 0.0;
        for (g, &v) in gradient.iter_mut().zip(x) {
            value += v * v;
            *g += 2.0 * v;
        }
        Ok(value)
    }

    #[test]
    fn test_one_calculation_per_point() {
        let memo = Memo::new();
        let x = vec![1.0, 2.0];
        assert_eq!(5.0, memo.value(&x, square).unwrap());
        assert_eq!(vec![2.0, 4.0], memo.gradient(&x, square).unwrap());
        assert_eq!(5.0, memo.value(&x.clone(), square).unwrap());
        assert_eq!(1, memo.evaluations());

        let y = vec![1.0, 3.0];
        assert_eq!(vec![2.0, 6.0], memo.gradient(&y, square).unwrap());
        assert_eq!(10.0, memo.value(&y, square).unwrap());
        assert_eq!(2, memo.evaluations());
    }

    #[test]
    fn test_gradient_buffer_is_zeroed() {
        let memo = Memo::new();
        memo.value(&[1.0], square).unwrap();
        assert_eq!(vec![4.0], memo.gradient(&[2.0], square).unwrap());
    }

    #[test]
    fn test_nan_point_always_recomputes() {
        let memo = Memo::new();
        let x = [f64::NAN];
        memo.value(&x, square).unwrap();
        memo.value(&x, square).unwrap();
        assert_eq!(2, memo.evaluations());
    }

    #[test]
    fn test_failed_calculation_is_not_cached() {
        let memo = Memo::new();
        memo.value(&[1.0], square).unwrap();
        let result = memo.value(&[2.0], |_, _| {
            Err(LogLinError::unsupported("always fails"))
        });
        assert!(result.is_err());
        assert_eq!(4.0, memo.value(&[2.0], square).unwrap());
        assert_eq!(2, memo.evaluations());
    }
}
