use hashbrown::HashMap;

/// Append-only bijection between strings and dense ids.
#[derive(Clone, Debug, Default)]
pub struct Vocabulary {
    items: Vec<String>,
    ids: HashMap<String, usize>,
}

impl Vocabulary {
    /// Creates a new [`Vocabulary`].
    #[inline(always)]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the vocabulary has no item.
    #[inline(always)]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns the number of items.
    #[inline(always)]
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Adds an item if it is new and returns its ID.
    pub fn add(&mut self, item: &str) -> usize {
        let items = &mut self.items;
        *self.ids.entry_ref(item).or_insert_with(|| {
            items.push(item.to_string());
            items.len() - 1
        })
    }

    /// Returns the ID of the given item.
    #[inline(always)]
    pub fn id(&self, item: &str) -> Option<usize> {
        self.ids.get(item).copied()
    }

    /// Returns the item corresponding to the given ID.
    #[inline(always)]
    pub fn get(&self, id: usize) -> Option<&str> {
        self.items.get(id).map(String::as_str)
    }

    /// Items in ID order.
    #[inline(always)]
    pub fn items(&self) -> &[String] {
        &self.items
    }
}

impl<S: AsRef<str>> FromIterator<S> for Vocabulary {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut vocab = Self::new();
        for item in iter {
            vocab.add(item.as_ref());
        }
        vocab
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add() {
        let mut vocab = Vocabulary::new();
        assert!(vocab.is_empty());
        assert_eq!(0, vocab.add("sunny"));
        assert_eq!(1, vocab.add("rainy"));
        assert_eq!(0, vocab.add("sunny"));
        assert_eq!(2, vocab.len());
        assert_eq!(Some(1), vocab.id("rainy"));
        assert_eq!(None, vocab.id("cloudy"));
        assert_eq!(Some("sunny"), vocab.get(0));
        assert_eq!(None, vocab.get(2));
    }

    #[test]
    fn test_from_iter() {
        let vocab: Vocabulary = ["a", "b", "a", "c"].into_iter().collect();
        assert_eq!(&["a", "b", "c"], vocab.items());
    }
}
