//! [ConflictSet] is the Snowball instance deciding between mutually exclusive containers.
use crate::zfx_id::Id;

use std::collections::HashSet;

/// `ConflictSet` represents a set of containers sharing a conflict key.
///
/// A container without conflict keys lives in its own singleton set, for which `beta1`
/// confidence is needed. If there are conflicts the preferred container is only accepted
/// after `beta2` consecutive successful polls (in the DAG a vote for a child also counts
/// for its ancestors).
#[derive(Debug, Eq, PartialEq, Clone)]
pub struct ConflictSet {
    /// The set of conflicts
    pub conflicts: HashSet<Id>,
    /// The preferred element
    pub pref: Id,
    /// The winner of the last conclusive poll
    pub last: Id,
    /// Consecutive successful polls of `last`
    pub cnt: u32,
}

impl std::ops::Deref for ConflictSet {
    type Target = HashSet<Id>;

    fn deref(&self) -> &'_ Self::Target {
        &self.conflicts
    }
}

impl ConflictSet {
    /// Create a new singleton conflict set
    pub fn new(id: Id) -> Self {
        let mut conflicts = HashSet::new();
        conflicts.insert(id);
        ConflictSet { conflicts, pref: id, last: id, cnt: 0 }
    }

    pub fn insert(&mut self, id: Id) -> bool {
        self.conflicts.insert(id)
    }

    /// Return if the given element is the preferred one
    pub fn is_preferred(&self, id: &Id) -> bool {
        self.pref == *id
    }

    /// Return if the conflict set is a singleton, i.e., has only one element
    pub fn is_singleton(&self) -> bool {
        self.conflicts.len() == 1
    }

    /// The confidence in `id`: the number of consecutive successful polls it won.
    pub fn confidence(&self, id: &Id) -> u32 {
        if self.last == *id {
            self.cnt
        } else {
            0
        }
    }

    /// Records the outcome of a poll.
    ///
    /// `winner` is the member which gathered a quorum of votes, if any. A round without a
    /// winner resets the confidence to zero. A winner other than the last one restarts the
    /// confidence at one and becomes the preference, an unchanged winner increments it.
    pub fn record_poll(&mut self, winner: Option<Id>) {
        let winner = match winner {
            Some(winner) if self.conflicts.contains(&winner) => winner,
            _ => {
                self.cnt = 0;
                return;
            }
        };
        if winner != self.last {
            self.pref = winner;
            self.last = winner;
            self.cnt = 1;
        } else {
            self.cnt += 1;
        }
    }

    /// Settles the set on `id` once it has been accepted.
    pub fn settle(&mut self, id: Id) {
        self.pref = id;
        self.last = id;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_singleton() {
        let a = Id::one();
        let mut cs = ConflictSet::new(a);
        assert!(cs.is_singleton());
        assert!(cs.is_preferred(&a));
        assert_eq!(cs.confidence(&a), 0);

        cs.record_poll(Some(a));
        cs.record_poll(Some(a));
        assert_eq!(cs.confidence(&a), 2);

        cs.record_poll(None);
        assert_eq!(cs.confidence(&a), 0);
        cs.record_poll(Some(a));
        assert_eq!(cs.confidence(&a), 1);
    }

    #[test]
    fn test_flip_resets_to_one() {
        let (a, b) = (Id::one(), Id::two());
        let mut cs = ConflictSet::new(a);
        assert!(cs.insert(b));
        assert!(!cs.is_singleton());

        cs.record_poll(Some(a));
        cs.record_poll(Some(a));
        assert_eq!(cs.confidence(&a), 2);

        cs.record_poll(Some(b));
        assert_eq!(cs.confidence(&b), 1);
        assert_eq!(cs.confidence(&a), 0);
        assert!(cs.is_preferred(&b));

        cs.record_poll(Some(b));
        assert_eq!(cs.confidence(&b), 2);

        // An inconclusive round keeps the preference.
        cs.record_poll(None);
        assert!(cs.is_preferred(&b));
        cs.record_poll(Some(a));
        assert!(cs.is_preferred(&a));
        assert_eq!(cs.confidence(&a), 1);
    }

    #[test]
    fn test_foreign_winner_is_no_winner() {
        let a = Id::one();
        let mut cs = ConflictSet::new(a);
        cs.record_poll(Some(a));
        cs.record_poll(Some(Id::two()));
        assert_eq!(cs.confidence(&a), 0);
        assert!(cs.is_preferred(&a));
    }

    #[test]
    fn test_settle() {
        let (a, b) = (Id::one(), Id::two());
        let mut cs = ConflictSet::new(a);
        cs.insert(b);
        cs.settle(b);
        assert!(cs.is_preferred(&b));
        assert_eq!(cs.confidence(&a), 0);
    }
}
