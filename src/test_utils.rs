use finitediff::FiniteDiff;
use rand::rngs::StdRng;
use rand::Rng;

use crate::cache::DiffFunction;
use crate::dataset::Dataset;
use crate::objective::Objective;

macro_rules! logsumexp {
    ( $($x:expr,)* ) => {
        {
            let mut y = f64::NEG_INFINITY;
            $(
                y = $crate::math::logsumexp(y, $x);
            )*
            y
        }
    };
    ( $($x:expr),* ) => {
        logsumexp!($( $x, )*)
    };
}

/// Generates a labeled dataset. Examples may be empty or repeat a feature.
pub fn random_dataset(
    rng: &mut StdRng,
    num_features: usize,
    num_classes: usize,
    len: usize,
    with_values: bool,
    with_weights: bool,
) -> Dataset {
    let mut data = Vec::with_capacity(len);
    let mut labels = Vec::with_capacity(len);
    for _ in 0..len {
        let n = rng.gen_range(0..=4);
        data.push((0..n).map(|_| rng.gen_range(0..num_features)).collect::<Vec<_>>());
        labels.push(rng.gen_range(0..num_classes));
    }
    let values: Vec<Vec<f64>> = data
        .iter()
        .map(|features| features.iter().map(|_| rng.gen_range(-2.0..2.0)).collect())
        .collect();
    let weights: Vec<f64> = (0..len).map(|_| rng.gen_range(0.0..3.0)).collect();

    let mut dataset = Dataset::new(num_features, num_classes, data, labels).unwrap();
    if with_values {
        dataset = dataset.with_values(values).unwrap();
    }
    if with_weights {
        dataset = dataset.with_weights(weights).unwrap();
    }
    dataset
}

pub fn random_point(rng: &mut StdRng, dimension: usize) -> Vec<f64> {
    (0..dimension).map(|_| rng.gen_range(-1.0..1.0)).collect()
}

/// Compares the analytic gradient with central differences.
pub fn assert_gradient(objective: &Objective, x: &[f64]) {
    let analytic = objective.derivative_at(x).unwrap();
    let numeric = x
        .to_vec()
        .central_diff(&|p: &Vec<f64>| objective.value_at(p).unwrap());
    assert_eq!(analytic.len(), numeric.len());
    for (i, (a, b)) in analytic.iter().zip(&numeric).enumerate() {
        assert!(
            (a - b).abs() <= 1e-4 * b.abs().max(1.0),
            "gradient mismatch at {i}: analytic {a}, numeric {b}",
        );
    }
}

/// Value, gradient, value at a new point must cost exactly one evaluation.
pub fn assert_single_pass(objective: &Objective, x: &[f64]) {
    let mut x = x.to_vec();
    x[0] += 0.125;
    let before = objective.evaluations();
    let v1 = objective.value_at(&x).unwrap();
    let gradient = objective.derivative_at(&x).unwrap();
    let v2 = objective.value_at(&x).unwrap();
    assert_eq!(before + 1, objective.evaluations());
    assert_eq!(v1, v2);
    assert_eq!(gradient, objective.derivative_at(&x).unwrap());
    assert_eq!(before + 1, objective.evaluations());
}

pub(crate) use logsumexp;
