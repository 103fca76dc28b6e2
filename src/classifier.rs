use bincode::{
    de::Decoder,
    enc::Encoder,
    error::{DecodeError, EncodeError},
    Decode, Encode,
};

use crate::errors::{LogLinError, Result};
use crate::math;
use crate::scheme::IndexScheme;
use crate::vocab::Vocabulary;

/// Log-linear classifier built from trained weights.
#[derive(Clone, Debug)]
pub struct LinearClassifier {
    scheme: IndexScheme,
    weights: Vec<f64>,
    features: Vocabulary,
    labels: Vocabulary,
}

impl LinearClassifier {
    /// Creates a classifier.
    ///
    /// # Errors
    ///
    /// `weights` must have the dimension of `scheme`, `labels` must name every
    /// class of `scheme`, and `features` must not have more entries than
    /// `scheme` has features.
    pub fn new(
        scheme: IndexScheme,
        weights: Vec<f64>,
        features: Vocabulary,
        labels: Vocabulary,
    ) -> Result<Self> {
        if weights.len() != scheme.dimension() {
            return Err(LogLinError::invalid_argument(
                "weights must have the dimension of the scheme",
            ));
        }
        if labels.is_empty() || labels.len() != scheme.num_classes() {
            return Err(LogLinError::invalid_argument(
                "labels must name every class",
            ));
        }
        if features.len() > scheme.num_features() {
            return Err(LogLinError::invalid_argument(
                "feature vocabulary is larger than the scheme",
            ));
        }
        Ok(Self {
            scheme,
            weights,
            features,
            labels,
        })
    }

    /// Gets the weight layout.
    pub const fn scheme(&self) -> IndexScheme {
        self.scheme
    }

    /// Gets the feature vocabulary.
    pub const fn features(&self) -> &Vocabulary {
        &self.features
    }

    /// Gets the label vocabulary.
    pub const fn labels(&self) -> &Vocabulary {
        &self.labels
    }

    /// Weight of `(feature, class)`. The reference class reads 0.
    pub fn weight(&self, feature: usize, class: usize) -> f64 {
        self.scheme.weight(&self.weights, feature, class)
    }

    /// Weights as a `[num_features][num_classes]` matrix.
    pub fn weight_matrix(&self) -> Vec<Vec<f64>> {
        self.scheme.to_matrix(&self.weights)
    }

    /// Activation of every class. Unknown feature ids are ignored.
    pub fn scores(&self, example: &[(usize, f64)]) -> Vec<f64> {
        let mut scores = vec![0.0; self.scheme.num_classes()];
        for &(f, v) in example {
            if f >= self.scheme.num_features() {
                continue;
            }
            for c in self.scheme.free_classes() {
                scores[c] += self.weights[self.scheme.index(f, c)] * v;
            }
        }
        scores
    }

    /// Class distribution of an example.
    pub fn probabilities(&self, example: &[(usize, f64)]) -> Vec<f64> {
        let mut scores = self.scores(example);
        let total = math::logsumexp_slice(&scores);
        for s in &mut scores {
            *s = (*s - total).exp();
        }
        scores
    }

    /// Class with the highest score. Ties go to the smallest id.
    pub fn classify(&self, example: &[(usize, f64)]) -> usize {
        let mut best = 0;
        let mut best_score = f64::NEG_INFINITY;
        for (c, score) in self.scores(example).into_iter().enumerate() {
            if score > best_score {
                best = c;
                best_score = score;
            }
        }
        best
    }

    /// Classifies an example given by feature names. Unknown names are ignored.
    pub fn classify_named(&self, example: &[(&str, f64)]) -> Option<&str> {
        let example: Vec<_> = example
            .iter()
            .filter_map(|&(name, v)| self.features.id(name).map(|f| (f, v)))
            .collect();
        self.labels.get(self.classify(&example))
    }
}

impl<Context> Decode<Context> for LinearClassifier {
    fn decode<D: Decoder<Context = Context>>(decoder: &mut D) -> Result<Self, DecodeError> {
        let scheme = Decode::decode(decoder)?;
        let weights = Decode::decode(decoder)?;
        let features: Vec<String> = Decode::decode(decoder)?;
        let labels: Vec<String> = Decode::decode(decoder)?;
        Self::new(
            scheme,
            weights,
            features.into_iter().collect(),
            labels.into_iter().collect(),
        )
        .map_err(|_| DecodeError::Other("inconsistent classifier"))
    }
}

impl Encode for LinearClassifier {
    fn encode<E: Encoder>(&self, encoder: &mut E) -> Result<(), EncodeError> {
        Encode::encode(&self.scheme, encoder)?;
        Encode::encode(&self.weights, encoder)?;
        Encode::encode(self.features.items(), encoder)?;
        Encode::encode(self.labels.items(), encoder)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weather() -> LinearClassifier {
        let features: Vocabulary = ["cloudy", "humid", "windy"].into_iter().collect();
        let labels: Vocabulary = ["dry", "rain"].into_iter().collect();
        // feature-major: [dry, rain] per feature
        let weights = vec![-1.0, 1.0, 0.0, 2.0, 0.5, -0.5];
        LinearClassifier::new(IndexScheme::feature_major(3, 2), weights, features, labels).unwrap()
    }

    #[test]
    fn test_scores_and_probabilities() {
        let classifier = weather();
        let example = [(0, 1.0), (1, 0.5), (7, 3.0)];
        assert_eq!(vec![-1.0, 2.0], classifier.scores(&example));
        let probs = classifier.probabilities(&example);
        assert!((probs[1] - 1.0 / (1.0 + (-3f64).exp())).abs() < 1e-12);
        assert!((probs.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert_eq!(1, classifier.classify(&example));
    }

    #[test]
    fn test_classify_named() {
        let classifier = weather();
        assert_eq!(
            Some("rain"),
            classifier.classify_named(&[("humid", 1.0), ("sunny", 1.0)])
        );
        assert_eq!(Some("dry"), classifier.classify_named(&[("windy", 1.0)]));
        // empty example: uniform scores, first class wins
        assert_eq!(Some("dry"), classifier.classify_named(&[]));
    }

    #[test]
    fn test_reference_layout() {
        let features: Vocabulary = ["a", "b"].into_iter().collect();
        let labels: Vocabulary = ["x", "y", "z"].into_iter().collect();
        let classifier = LinearClassifier::new(
            IndexScheme::reference(2, 3),
            vec![1.0, 2.0, 3.0, 4.0],
            features,
            labels,
        )
        .unwrap();
        assert_eq!(vec![0.0, 2.0, 4.0], classifier.scores(&[(1, 1.0)]));
        assert_eq!(0.0, classifier.weight(0, 0));
        assert_eq!(
            vec![vec![0.0, 1.0, 3.0], vec![0.0, 2.0, 4.0]],
            classifier.weight_matrix()
        );
    }

    #[test]
    fn test_invalid() {
        let features: Vocabulary = ["a"].into_iter().collect();
        let labels: Vocabulary = ["x", "y"].into_iter().collect();
        assert!(matches!(
            LinearClassifier::new(IndexScheme::feature_major(1, 2), vec![0.0], features, labels),
            Err(LogLinError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_encode_decode() {
        let classifier = weather();
        let config = bincode::config::standard();
        let bytes = bincode::encode_to_vec(&classifier, config).unwrap();
        let (decoded, _): (LinearClassifier, usize) =
            bincode::decode_from_slice(&bytes, config).unwrap();
        assert_eq!(classifier.scheme(), decoded.scheme());
        assert_eq!(classifier.weight_matrix(), decoded.weight_matrix());
        assert_eq!(classifier.labels().items(), decoded.labels().items());
        assert_eq!(Some(2), decoded.features().id("windy"));
    }
}
