use crate::zfx_id::Id;

use std::collections::HashMap;

/// Stake weight of a validator.
pub type Weight = u64;

/// A snapshot mapping validator identifiers to their stake weight.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidatorSet {
    weights: HashMap<Id, Weight>,
}

impl std::ops::Deref for ValidatorSet {
    type Target = HashMap<Id, Weight>;

    fn deref(&self) -> &'_ Self::Target {
        &self.weights
    }
}

impl ValidatorSet {
    pub fn new() -> Self {
        ValidatorSet { weights: HashMap::default() }
    }

    /// Builds a set where every validator has the same weight.
    pub fn uniform(ids: impl IntoIterator<Item = Id>) -> Self {
        ids.into_iter().map(|id| (id, 1)).collect()
    }

    /// Inserts or replaces the weight of a validator, returning the previous weight.
    pub fn insert(&mut self, id: Id, weight: Weight) -> Option<Weight> {
        self.weights.insert(id, weight)
    }

    pub fn remove(&mut self, id: &Id) -> Option<Weight> {
        self.weights.remove(id)
    }

    pub fn total_weight(&self) -> Weight {
        self.weights.values().fold(0u64, |acc, w| acc.saturating_add(*w))
    }

    /// Validator ids in a stable order.
    pub fn sorted_ids(&self) -> Vec<Id> {
        let mut ids: Vec<Id> = self.weights.keys().cloned().collect();
        ids.sort();
        ids
    }
}

impl std::iter::FromIterator<(Id, Weight)> for ValidatorSet {
    fn from_iter<I: IntoIterator<Item = (Id, Weight)>>(iter: I) -> Self {
        ValidatorSet { weights: iter.into_iter().collect() }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_total_weight() {
        let mut set = ValidatorSet::new();
        set.insert(Id::one(), 10);
        set.insert(Id::two(), 5);
        assert_eq!(set.total_weight(), 15);
        assert_eq!(set.insert(Id::one(), 1), Some(10));
        assert_eq!(set.total_weight(), 6);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_uniform() {
        let set = ValidatorSet::uniform(vec![Id::one(), Id::two()]);
        assert_eq!(set.get(&Id::one()), Some(&1));
        assert_eq!(set.sorted_ids(), vec![Id::one(), Id::two()]);
    }
}
