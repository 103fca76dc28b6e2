//! # loglin
//!
//! Objective functions for training log-linear (maximum entropy) classifiers.
//!
//! An [`Objective`] couples a loss over a [`Dataset`] with a [`Prior`] and
//! exposes value and gradient through [`DiffFunction`]. Both are computed in
//! a single pass and cached for the last point queried.
#![cfg_attr(
    feature = "train",
    doc = "
## Examples

```rust
use loglin::{Dataset, DiffFunction, Objective, Prior, Trainer};

// features: 0 = sunny, 1 = rainy, 2 = bias
// labels: 0 = dry, 1 = wet
let dataset = Dataset::new(
    3,
    2,
    vec![vec![0, 2], vec![1, 2], vec![0, 2], vec![1, 2]],
    vec![0, 1, 0, 1],
)?;
let objective = Objective::log_linear(&dataset, Prior::quadratic(1.0)?)?;

let init = vec![0.0; objective.domain_dimension()];
let weights = Trainer::new().minimize(&objective, init.clone())?;

assert!(objective.value_at(&weights)? < objective.value_at(&init)?);
# Ok::<(), loglin::LogLinError>(())
```
"
)]
#![deny(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod cache;
mod classifier;
mod dataset;
mod losses;
mod math;
mod objective;
mod prior;
mod scheme;
mod vocab;

pub mod errors;

#[cfg(feature = "train")]
mod trainer;

#[cfg(test)]
mod test_utils;

pub use cache::DiffFunction;
pub use classifier::LinearClassifier;
pub use dataset::{Dataset, Example};
pub use errors::{LogLinError, Result};
pub use losses::biased::{BiasedLoss, ConfusionMatrix};
pub use losses::binary::BinaryLoss;
pub use losses::ge::GeLoss;
pub use losses::log_linear::LogLinearLoss;
pub use losses::semi_supervised::SemiSupervisedLoss;
pub use losses::shift::ShiftParamLoss;
pub use objective::{Loss, Objective};
pub use prior::Prior;
pub use scheme::{IndexScheme, Layout};
pub use vocab::Vocabulary;

#[cfg(feature = "train")]
pub use trainer::Trainer;
