//! Frontier discovery.
//!
//! A joining node asks a sample of validators for their accepted frontier, unions the
//! answers, then asks the same validators which of the union they consider accepted. A
//! container survives the second phase when at least `alpha` validators report it
//! accepted. Each phase is a single round.
use crate::zfx_id::Id;

use std::collections::{HashMap, HashSet};

/// What the engine has to do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Wait for more responses.
    Wait,
    /// The frontier phase is over: ask the sampled peers which of these are accepted.
    QueryAccepted(HashSet<Id>),
    /// Bootstrapping is over with this accepted set.
    Finished(HashSet<Id>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Frontier,
    Accepted,
    Done,
}

#[derive(Debug, Clone)]
pub struct Bootstrapper {
    alpha: usize,
    phase: Phase,
    peers: HashSet<Id>,
    pending: HashSet<Id>,
    /// The request id of the current phase.
    request_id: u32,
    frontier: HashSet<Id>,
    votes: HashMap<Id, usize>,
    /// Which peers reported each container, used to fetch missing ones.
    sources: HashMap<Id, Vec<Id>>,
}

impl Bootstrapper {
    /// Starts the frontier phase against `peers` under `request_id`.
    pub fn new(alpha: usize, peers: HashSet<Id>, request_id: u32) -> Self {
        Bootstrapper {
            alpha,
            phase: Phase::Frontier,
            pending: peers.clone(),
            peers,
            request_id,
            frontier: HashSet::new(),
            votes: HashMap::default(),
            sources: HashMap::default(),
        }
    }

    pub fn request_id(&self) -> u32 {
        self.request_id
    }

    pub fn peers(&self) -> &HashSet<Id> {
        &self.peers
    }

    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Done
    }

    /// Peers which reported `container_id` in their frontier or accepted set.
    pub fn sources(&self, container_id: &Id) -> &[Id] {
        self.sources.get(container_id).map(|s| s.as_slice()).unwrap_or(&[])
    }

    /// Starts the accepted phase under `request_id`.
    pub fn query_accepted(&mut self, request_id: u32) {
        self.phase = Phase::Accepted;
        self.request_id = request_id;
        self.pending = self.peers.clone();
    }

    pub fn on_accepted_frontier(&mut self, peer: Id, container_ids: HashSet<Id>) -> Step {
        if self.phase != Phase::Frontier || !self.pending.remove(&peer) {
            return Step::Wait;
        }
        for id in container_ids.into_iter() {
            self.sources.entry(id).or_insert_with(Vec::new).push(peer);
            let _ = self.frontier.insert(id);
        }
        self.step()
    }

    pub fn on_accepted(&mut self, peer: Id, container_ids: HashSet<Id>) -> Step {
        if self.phase != Phase::Accepted || !self.pending.remove(&peer) {
            return Step::Wait;
        }
        // Only containers from the union count.
        let frontier = &self.frontier;
        for id in container_ids.into_iter().filter(|id| frontier.contains(id)) {
            *self.votes.entry(id).or_insert(0) += 1;
            let sources = self.sources.entry(id).or_insert_with(Vec::new);
            if !sources.contains(&peer) {
                sources.push(peer);
            }
        }
        self.step()
    }

    /// Gives up on `peer` for the current phase.
    pub fn drop_peer(&mut self, peer: &Id) -> Step {
        if self.phase == Phase::Done || !self.pending.remove(peer) {
            return Step::Wait;
        }
        self.step()
    }

    fn step(&mut self) -> Step {
        if !self.pending.is_empty() {
            return Step::Wait;
        }
        match self.phase {
            Phase::Frontier if self.frontier.is_empty() => {
                self.phase = Phase::Done;
                Step::Finished(HashSet::new())
            }
            Phase::Frontier => Step::QueryAccepted(self.frontier.clone()),
            Phase::Accepted => {
                self.phase = Phase::Done;
                let accepted = self
                    .votes
                    .iter()
                    .filter(|(_, n)| **n >= self.alpha)
                    .map(|(id, _)| *id)
                    .collect();
                Step::Finished(accepted)
            }
            Phase::Done => Step::Wait,
        }
    }
}
