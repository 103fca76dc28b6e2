use core::ops::Range;

use bincode::{Decode, Encode};

/// Memory layout of a weight matrix.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Decode, Encode)]
pub enum Layout {
    /// Every class has a weight per feature, stored as `f * num_classes + c`.
    FeatureMajor,

    /// Class 0 is the reference class with activation fixed at 0. The
    /// remaining classes are stored row by row as `(c - 1) * num_features + f`.
    Reference,
}

/// Bijection between a flat weight index and a `(feature, class)` pair.
///
/// Every read and write of a weight vector goes through this type so that
/// objectives and classifiers agree on the layout.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Decode, Encode)]
pub struct IndexScheme {
    num_features: usize,
    num_classes: usize,
    layout: Layout,
}

impl IndexScheme {
    /// Creates a feature-major scheme.
    #[inline(always)]
    pub const fn feature_major(num_features: usize, num_classes: usize) -> Self {
        Self {
            num_features,
            num_classes,
            layout: Layout::FeatureMajor,
        }
    }

    /// Creates a reference-class scheme. Only `num_classes - 1` rows are stored.
    #[inline(always)]
    pub const fn reference(num_features: usize, num_classes: usize) -> Self {
        Self {
            num_features,
            num_classes,
            layout: Layout::Reference,
        }
    }

    /// Number of features, including any synthetic ones.
    #[inline(always)]
    pub const fn num_features(&self) -> usize {
        self.num_features
    }

    /// Number of classes, including the reference class.
    #[inline(always)]
    pub const fn num_classes(&self) -> usize {
        self.num_classes
    }

    /// Gets the layout.
    #[inline(always)]
    pub const fn layout(&self) -> Layout {
        self.layout
    }

    /// Classes that own weights. The reference class is excluded.
    #[inline(always)]
    pub fn free_classes(&self) -> Range<usize> {
        match self.layout {
            Layout::FeatureMajor => 0..self.num_classes,
            Layout::Reference => 1..self.num_classes.max(1),
        }
    }

    /// Length of a weight vector in this layout.
    #[inline(always)]
    pub fn dimension(&self) -> usize {
        self.num_features * self.free_classes().len()
    }

    /// Flat index of `(feature, class)`.
    ///
    /// `class` must be one of [`Self::free_classes`].
    #[inline(always)]
    pub fn index(&self, feature: usize, class: usize) -> usize {
        debug_assert!(feature < self.num_features);
        debug_assert!(self.free_classes().contains(&class));
        match self.layout {
            Layout::FeatureMajor => feature * self.num_classes + class,
            Layout::Reference => (class - 1) * self.num_features + feature,
        }
    }

    /// Inverse of [`Self::index`].
    #[inline(always)]
    pub fn locate(&self, index: usize) -> (usize, usize) {
        debug_assert!(index < self.dimension());
        match self.layout {
            Layout::FeatureMajor => (index / self.num_classes, index % self.num_classes),
            Layout::Reference => (index % self.num_features, index / self.num_features + 1),
        }
    }

    /// Reads the weight of `(feature, class)`, which is 0 for the reference class.
    #[inline(always)]
    pub fn weight(&self, weights: &[f64], feature: usize, class: usize) -> f64 {
        if self.free_classes().contains(&class) {
            weights[self.index(feature, class)]
        } else {
            0.0
        }
    }

    /// Unflattens a weight vector into a `[num_features][num_classes]` matrix.
    pub fn to_matrix(&self, weights: &[f64]) -> Vec<Vec<f64>> {
        (0..self.num_features)
            .map(|f| {
                (0..self.num_classes)
                    .map(|c| self.weight(weights, f, c))
                    .collect()
            })
            .collect()
    }
}
