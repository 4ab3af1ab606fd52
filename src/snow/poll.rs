use crate::zfx_id::Id;

use std::collections::{HashMap, HashSet};

/// One polling round of a container.
///
/// The round is finished once every sampled peer has either voted or been given up on
/// (timeout or delivery failure), though the engine may settle it earlier. Only the first
/// vote of each sampled peer counts.
#[derive(Debug, Clone)]
pub struct Poll {
    pub container_id: Id,
    pub request_id: u32,
    sampled: usize,
    pending: HashSet<Id>,
    votes: HashMap<Id, HashSet<Id>>,
}

impl Poll {
    pub fn new(container_id: Id, request_id: u32, peers: HashSet<Id>) -> Self {
        Poll { container_id, request_id, sampled: peers.len(), pending: peers, votes: HashMap::default() }
    }

    /// Records the vote of `peer`. Returns `false` when the peer was not expected to vote
    /// (never sampled, already voted or already given up on).
    pub fn vote(&mut self, peer: Id, votes: HashSet<Id>) -> bool {
        if !self.pending.remove(&peer) {
            return false;
        }
        let _ = self.votes.insert(peer, votes);
        true
    }

    /// Gives up on `peer`.
    pub fn drop_peer(&mut self, peer: &Id) -> bool {
        self.pending.remove(peer)
    }

    pub fn is_finished(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn sampled(&self) -> usize {
        self.sampled
    }

    pub fn pending(&self) -> &HashSet<Id> {
        &self.pending
    }

    /// The votes received so far, per peer.
    pub fn responses(&self) -> &HashMap<Id, HashSet<Id>> {
        &self.votes
    }
}
