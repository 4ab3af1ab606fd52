use super::conflict_set::ConflictSet;
use super::{Parameters, Status};

use crate::colored::Colorize;
use crate::graph::DAG;
use crate::vm::ParsedContainer;
use crate::zfx_id::Id;
use crate::{Error, Result};

use tracing::{debug, info};

use std::collections::{HashMap, HashSet};

/// The finality decisions taken while recording a poll.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Decisions {
    /// Whether the polled container itself gathered a quorum.
    pub conclusive: bool,
    /// Newly accepted containers, ancestors before descendants.
    pub accepted: Vec<Id>,
    pub rejected: Vec<Id>,
}

impl Decisions {
    pub fn is_empty(&self) -> bool {
        self.accepted.is_empty() && self.rejected.is_empty()
    }
}

/// The vote tally holds the consensus state of one chain: the DAG of known containers,
/// their status and the conflict sets they compete in.
pub struct VoteTally {
    params: Parameters,
    dag: DAG<Id>,
    status: HashMap<Id, Status>,
    /// Conflict key to the Snowball instance of the containers sharing it.
    sets: HashMap<Id, ConflictSet>,
    /// The conflict keys of every container. A container without keys is keyed by its
    /// own id.
    keys: HashMap<Id, Vec<Id>>,
}

impl VoteTally {
    pub fn new(params: Parameters) -> Self {
        VoteTally {
            params,
            dag: DAG::new(),
            status: HashMap::default(),
            sets: HashMap::default(),
            keys: HashMap::default(),
        }
    }

    pub fn params(&self) -> &Parameters {
        &self.params
    }

    pub fn status(&self, id: &Id) -> Status {
        self.status.get(id).cloned().unwrap_or(Status::Unknown)
    }

    pub fn contains(&self, id: &Id) -> bool {
        self.status.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.status.len()
    }

    pub fn is_empty(&self) -> bool {
        self.status.is_empty()
    }

    pub fn parents(&self, id: &Id) -> &[Id] {
        self.dag.parents(id)
    }

    /// The Snowball instance of a conflict key.
    pub fn conflict_set(&self, key: &Id) -> Option<&ConflictSet> {
        self.sets.get(key)
    }

    pub fn processing(&self) -> Vec<Id> {
        self.with_status(Status::Processing)
    }

    pub fn accepted(&self) -> Vec<Id> {
        self.with_status(Status::Accepted)
    }

    fn with_status(&self, status: Status) -> Vec<Id> {
        self.status.iter().filter(|(_, s)| **s == status).map(|(id, _)| *id).collect()
    }

    /// Adds a container whose parents are all known. Adding a known container returns its
    /// current status and changes nothing.
    ///
    /// A container is rejected on arrival if one of its parents was rejected or if it
    /// conflicts with an accepted container.
    pub fn add(&mut self, container: &ParsedContainer) -> Result<Status> {
        let id = container.id;
        if let Some(status) = self.status.get(&id) {
            return Ok(*status);
        }
        if container.parents.iter().any(|parent| !self.status.contains_key(parent)) {
            return Err(Error::MissingParents(id));
        }
        self.dag.insert_vx(id, container.parents.clone())?;

        let mut keys: Vec<Id> = vec![];
        for key in container.conflicts.iter() {
            if !keys.contains(key) {
                keys.push(*key);
            }
        }
        if keys.is_empty() {
            keys.push(id);
        }

        let mut status = Status::Processing;
        if container.parents.iter().any(|parent| self.status(parent) == Status::Rejected) {
            status = Status::Rejected;
        }
        for key in keys.iter() {
            let set = self.sets.entry(*key).or_insert_with(|| ConflictSet::new(id));
            let _ = set.insert(id);
            let statuses = &self.status;
            if set.iter().any(|member| statuses.get(member) == Some(&Status::Accepted)) {
                status = Status::Rejected;
            }
        }
        if status == Status::Processing {
            // A set whose preferred member was rejected prefers the newcomer.
            for key in keys.iter() {
                if let Some(set) = self.sets.get_mut(key) {
                    if self.status.get(&set.pref) == Some(&Status::Rejected) {
                        set.pref = id;
                    }
                }
            }
        }
        let _ = self.keys.insert(id, keys);
        let _ = self.status.insert(id, status);
        debug!("[{}] added {} as {}", "tally".cyan(), id.short(), status);
        Ok(status)
    }

    fn keys(&self, id: &Id) -> &[Id] {
        self.keys.get(id).map(|keys| keys.as_slice()).unwrap_or(&[])
    }

    /// Whether `id` is the preferred member of every conflict set it belongs to.
    pub fn is_preferred(&self, id: &Id) -> bool {
        self.keys(id)
            .iter()
            .all(|key| self.sets.get(key).map(|set| set.is_preferred(id)).unwrap_or(false))
    }

    /// Starts at some container and does a depth first search in order to compute
    /// whether it is strongly preferred, i.e. whether its whole undecided ancestry is
    /// preferred.
    pub fn is_strongly_preferred(&self, id: &Id) -> bool {
        if !self.contains(id) {
            return false;
        }
        for ancestor in self.dag.dfs(id) {
            match self.status(ancestor) {
                Status::Accepted => (),
                Status::Processing if self.is_preferred(ancestor) => (),
                _ => return false,
            }
        }
        true
    }

    /// The confidence in `id`, the lowest over its conflict sets.
    pub fn confidence(&self, id: &Id) -> u32 {
        self.keys(id)
            .iter()
            .filter_map(|key| self.sets.get(key))
            .map(|set| set.confidence(id))
            .min()
            .unwrap_or(0)
    }

    /// The votes to answer a query on `id` with: `id` itself when it is strongly
    /// preferred, otherwise the preferred rivals of its non-preferred ancestry. Nothing
    /// for unknown containers.
    pub fn preferences(&self, id: &Id) -> HashSet<Id> {
        let mut votes = HashSet::new();
        match self.status(id) {
            Status::Unknown => return votes,
            Status::Accepted => {
                let _ = votes.insert(*id);
                return votes;
            }
            _ => (),
        }
        if self.is_strongly_preferred(id) {
            let _ = votes.insert(*id);
            return votes;
        }
        for ancestor in self.dag.dfs(id) {
            if self.status(ancestor) == Status::Accepted || self.is_preferred(ancestor) {
                continue;
            }
            for key in self.keys(ancestor).iter() {
                if let Some(set) = self.sets.get(key) {
                    if self.status(&set.pref) != Status::Rejected {
                        let _ = votes.insert(set.pref);
                    }
                }
            }
        }
        votes
    }

    // A vote for a container is a vote for all of its ancestors. Each responder counts at
    // most once per container, and not at all in a conflict set where it backs more than
    // one member.
    fn count_votes(&self, responses: &HashMap<Id, HashSet<Id>>) -> HashMap<Id, usize> {
        let mut counts = HashMap::new();
        for votes in responses.values() {
            let mut closure: HashSet<Id> = HashSet::new();
            for vote in votes.iter() {
                if !self.contains(vote) || closure.contains(vote) {
                    continue;
                }
                for ancestor in self.dag.dfs(vote) {
                    let _ = closure.insert(*ancestor);
                }
            }
            let equivocated = self.equivocated(&closure);
            for id in closure.into_iter().filter(|id| !equivocated.contains(id)) {
                *counts.entry(id).or_insert(0) += 1;
            }
        }
        counts
    }

    // The members of `closure` which share a conflict set with another member.
    fn equivocated(&self, closure: &HashSet<Id>) -> HashSet<Id> {
        let mut equivocated = HashSet::new();
        for id in closure.iter() {
            for key in self.keys(id).iter() {
                let set = match self.sets.get(key) {
                    Some(set) => set,
                    None => continue,
                };
                let backed: Vec<Id> = set.iter().filter(|m| closure.contains(*m)).cloned().collect();
                if backed.len() > 1 {
                    equivocated.extend(backed);
                }
            }
        }
        equivocated
    }

    /// Whether a round on `container_id` is settled before the `outstanding` peers have
    /// answered: the container already has `alpha` votes, or no container can reach
    /// `alpha` any more.
    pub fn is_settled(
        &self,
        container_id: &Id,
        responses: &HashMap<Id, HashSet<Id>>,
        outstanding: usize,
    ) -> bool {
        let counts = self.count_votes(responses);
        let alpha = self.params.alpha;
        if counts.get(container_id).cloned().unwrap_or(0) >= alpha {
            return true;
        }
        let best = counts.values().max().cloned().unwrap_or(0);
        best + outstanding < alpha
    }

    /// Records the outcome of a polling round on `container_id`.
    ///
    /// Every conflict set touching the container or its undecided ancestry is updated:
    /// the member with at least `alpha` votes wins the round, a set without such a member
    /// loses its confidence. Containers reaching their confidence threshold are accepted
    /// together with their undecided ancestry, and their rivals are rejected.
    pub fn record_poll(
        &mut self,
        container_id: &Id,
        responses: &HashMap<Id, HashSet<Id>>,
    ) -> Result<Decisions> {
        match self.status(container_id) {
            Status::Processing => (),
            Status::Unknown => return Err(Error::UnknownContainer(*container_id)),
            _ => return Err(Error::AlreadyDecided(*container_id)),
        }
        let counts = self.count_votes(responses);
        let alpha = self.params.alpha;

        let scope: Vec<Id> = self
            .dag
            .dfs(container_id)
            .filter(|id| self.status(id) == Status::Processing)
            .cloned()
            .collect();
        let mut keys: Vec<Id> = vec![];
        for id in scope.iter() {
            for key in self.keys(id).iter() {
                if !keys.contains(key) {
                    keys.push(*key);
                }
            }
        }
        for key in keys.iter() {
            let winner = match self.sets.get(key) {
                Some(set) => set
                    .iter()
                    .filter(|member| self.status(member) == Status::Processing)
                    .find(|member| counts.get(member).cloned().unwrap_or(0) >= alpha)
                    .cloned(),
                None => continue,
            };
            if let Some(set) = self.sets.get_mut(key) {
                set.record_poll(winner);
            }
        }

        let mut decisions = Decisions {
            conclusive: counts.get(container_id).cloned().unwrap_or(0) >= alpha,
            ..Decisions::default()
        };
        for id in scope.into_iter() {
            if self.is_acceptable(&id) {
                self.accept(&id, &mut decisions);
            }
        }
        Ok(decisions)
    }

    fn is_acceptable(&self, id: &Id) -> bool {
        if self.status(id) != Status::Processing || !self.is_strongly_preferred(id) {
            return false;
        }
        self.keys(id).iter().all(|key| match self.sets.get(key) {
            Some(set) => {
                let beta = if set.is_singleton() { self.params.beta1 } else { self.params.beta2 };
                set.confidence(id) >= beta
            }
            None => false,
        })
    }

    // Accepts `id` and its undecided ancestry, parents first.
    fn accept(&mut self, id: &Id, decisions: &mut Decisions) {
        let mut remaining: HashSet<Id> = self
            .dag
            .dfs(id)
            .filter(|ancestor| self.status(ancestor) == Status::Processing)
            .cloned()
            .collect();
        let mut ordered = vec![];
        while !remaining.is_empty() {
            let ready: Vec<Id> = remaining
                .iter()
                .filter(|c| self.dag.parents(c).iter().all(|p| !remaining.contains(p)))
                .cloned()
                .collect();
            if ready.is_empty() {
                break;
            }
            for c in ready.into_iter() {
                let _ = remaining.remove(&c);
                ordered.push(c);
            }
        }

        for c in ordered.into_iter() {
            if self.status(&c) != Status::Processing {
                continue;
            }
            let _ = self.status.insert(c, Status::Accepted);
            decisions.accepted.push(c);
            info!("[{}] accepted {}", "snow".cyan(), c);
            for key in self.keys(&c).to_vec().into_iter() {
                let rivals: Vec<Id> = match self.sets.get_mut(&key) {
                    Some(set) => {
                        set.settle(c);
                        set.iter().filter(|rival| **rival != c).cloned().collect()
                    }
                    None => vec![],
                };
                for rival in rivals.into_iter() {
                    self.reject(rival, decisions);
                }
            }
        }
    }

    // Rejects `id` and every undecided descendant.
    fn reject(&mut self, id: Id, decisions: &mut Decisions) {
        for descendant in self.dag.descendants(id).into_iter() {
            if self.status(&descendant) == Status::Processing {
                let _ = self.status.insert(descendant, Status::Rejected);
                decisions.rejected.push(descendant);
                info!("[{}] rejected {}", "snow".cyan(), descendant);
            }
        }
    }

    /// The accepted containers without accepted children.
    pub fn accepted_frontier(&self) -> HashSet<Id> {
        self.status
            .iter()
            .filter(|(_, status)| **status == Status::Accepted)
            .filter(|(id, _)| {
                self.dag.children(id).iter().all(|child| self.status(child) != Status::Accepted)
            })
            .map(|(id, _)| *id)
            .collect()
    }

    /// The subset of `ids` which is accepted.
    pub fn filter_accepted(&self, ids: &HashSet<Id>) -> HashSet<Id> {
        ids.iter().filter(|id| self.status(id) == Status::Accepted).cloned().collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn params() -> Parameters {
        Parameters::new(3, 2, 2, 3).unwrap()
    }

    fn container(id: Id, parents: Vec<Id>, conflicts: Vec<Id>) -> ParsedContainer {
        ParsedContainer { id, parents, conflicts }
    }

    fn votes(responses: Vec<(Id, Vec<Id>)>) -> HashMap<Id, HashSet<Id>> {
        responses.into_iter().map(|(peer, votes)| (peer, votes.into_iter().collect())).collect()
    }

    fn peers() -> (Id, Id, Id) {
        (Id::new(&[1]), Id::new(&[2]), Id::new(&[3]))
    }

    #[test]
    fn test_add() {
        let mut tally = VoteTally::new(params());
        let a = Id::new(&[10]);
        assert_eq!(tally.status(&a), Status::Unknown);
        assert_eq!(tally.add(&container(a, vec![], vec![])).unwrap(), Status::Processing);
        // Adding twice changes nothing.
        assert_eq!(tally.add(&container(a, vec![], vec![])).unwrap(), Status::Processing);
        assert_eq!(tally.len(), 1);
        assert!(tally.is_strongly_preferred(&a));
        assert!(tally.conflict_set(&a).unwrap().is_singleton());
    }

    #[test]
    fn test_missing_parents() {
        let mut tally = VoteTally::new(params());
        let a = Id::new(&[10]);
        match tally.add(&container(a, vec![Id::new(&[11])], vec![])) {
            Err(Error::MissingParents(id)) => assert_eq!(id, a),
            other => panic!("unexpected: {:?}", other),
        }
        assert!(!tally.contains(&a));
    }

    #[test]
    fn test_quorum_accepts_after_beta_rounds() {
        let mut tally = VoteTally::new(Parameters::new(3, 2, 2, 2).unwrap());
        let x = Id::new(&[10]);
        let (p1, p2, p3) = peers();
        tally.add(&container(x, vec![], vec![])).unwrap();

        let round = votes(vec![(p1, vec![x]), (p2, vec![x]), (p3, vec![])]);
        let decisions = tally.record_poll(&x, &round).unwrap();
        assert!(decisions.conclusive);
        assert!(decisions.is_empty());
        assert_eq!(tally.confidence(&x), 1);

        let decisions = tally.record_poll(&x, &round).unwrap();
        assert_eq!(decisions.accepted, vec![x]);
        assert_eq!(tally.status(&x), Status::Accepted);
    }

    #[test]
    fn test_no_quorum_resets_confidence() {
        let mut tally = VoteTally::new(params());
        let x = Id::new(&[10]);
        let (p1, p2, _) = peers();
        tally.add(&container(x, vec![], vec![])).unwrap();

        tally.record_poll(&x, &votes(vec![(p1, vec![x]), (p2, vec![x])])).unwrap();
        assert_eq!(tally.confidence(&x), 1);

        let decisions = tally.record_poll(&x, &votes(vec![(p1, vec![x])])).unwrap();
        assert!(!decisions.conclusive);
        assert_eq!(tally.confidence(&x), 0);
        assert_eq!(tally.status(&x), Status::Processing);
    }

    #[test]
    fn test_votes_for_children_count_for_ancestors() {
        let mut tally = VoteTally::new(params());
        let (a, b) = (Id::new(&[10]), Id::new(&[11]));
        let (p1, p2, p3) = peers();
        tally.add(&container(a, vec![], vec![])).unwrap();
        tally.add(&container(b, vec![a], vec![])).unwrap();

        let round = votes(vec![(p1, vec![b]), (p2, vec![b, a]), (p3, vec![a])]);
        tally.record_poll(&b, &round).unwrap();
        assert_eq!(tally.confidence(&b), 1);
        assert_eq!(tally.confidence(&a), 1);

        // Accepting the child accepts its ancestry first.
        let decisions = tally.record_poll(&b, &round).unwrap();
        assert_eq!(decisions.accepted, vec![a, b]);
        assert_eq!(tally.accepted_frontier(), vec![b].into_iter().collect());
    }

    #[test]
    fn test_conflicts_need_beta2() {
        let mut tally = VoteTally::new(params());
        let key = Id::new(&[99]);
        let (a, b) = (Id::new(&[10]), Id::new(&[11]));
        let c = Id::new(&[12]);
        let (p1, p2, p3) = peers();
        tally.add(&container(a, vec![], vec![key])).unwrap();
        tally.add(&container(b, vec![], vec![key])).unwrap();
        tally.add(&container(c, vec![b], vec![])).unwrap();
        assert!(tally.is_preferred(&a));
        assert!(!tally.is_strongly_preferred(&c));
        assert_eq!(tally.preferences(&c), vec![a].into_iter().collect());

        let round = votes(vec![(p1, vec![a]), (p2, vec![a]), (p3, vec![b])]);
        for _ in 0..2 {
            assert!(tally.record_poll(&a, &round).unwrap().is_empty());
        }
        let decisions = tally.record_poll(&a, &round).unwrap();
        assert_eq!(decisions.accepted, vec![a]);
        let rejected: HashSet<Id> = decisions.rejected.into_iter().collect();
        assert_eq!(rejected, vec![b, c].into_iter().collect());
        assert_eq!(tally.status(&b), Status::Rejected);
    }

    #[test]
    fn test_flip_resets_confidence_to_one() {
        let mut tally = VoteTally::new(Parameters::new(3, 2, 5, 5).unwrap());
        let key = Id::new(&[99]);
        let (a, b) = (Id::new(&[10]), Id::new(&[11]));
        let (p1, p2, p3) = peers();
        tally.add(&container(a, vec![], vec![key])).unwrap();
        tally.add(&container(b, vec![], vec![key])).unwrap();

        let for_a = votes(vec![(p1, vec![a]), (p2, vec![a]), (p3, vec![b])]);
        let for_b = votes(vec![(p1, vec![b]), (p2, vec![b]), (p3, vec![a])]);
        tally.record_poll(&a, &for_a).unwrap();
        tally.record_poll(&a, &for_a).unwrap();
        assert_eq!(tally.confidence(&a), 2);
        assert!(tally.is_preferred(&a));
        tally.record_poll(&b, &for_b).unwrap();
        assert_eq!(tally.confidence(&b), 1);
        assert_eq!(tally.confidence(&a), 0);
        // The winner of the latest quorum round is the preference, and what we vote for.
        assert!(tally.is_preferred(&b));
        assert!(!tally.is_preferred(&a));
        assert_eq!(tally.preferences(&b), vec![b].into_iter().collect());
        assert_eq!(tally.preferences(&a), vec![b].into_iter().collect());
        tally.record_poll(&b, &for_b).unwrap();
        assert_eq!(tally.confidence(&b), 2);
    }

    #[test]
    fn test_votes_for_rivals_do_not_count() {
        let mut tally = VoteTally::new(params());
        let key = Id::new(&[99]);
        let (a, b) = (Id::new(&[10]), Id::new(&[11]));
        let (p1, p2, p3) = peers();
        tally.add(&container(a, vec![], vec![key])).unwrap();
        tally.add(&container(b, vec![], vec![key])).unwrap();

        let round = votes(vec![(p1, vec![a, b]), (p2, vec![a, b]), (p3, vec![b])]);
        let decisions = tally.record_poll(&a, &round).unwrap();
        assert!(!decisions.conclusive);
        assert_eq!(tally.confidence(&a), 0);
        assert_eq!(tally.confidence(&b), 0);
        assert!(tally.is_preferred(&a));

        // Backing both rivals through a child is the same equivocation.
        let c = Id::new(&[12]);
        tally.add(&container(c, vec![b], vec![])).unwrap();
        let round = votes(vec![(p1, vec![a, c]), (p2, vec![a, c]), (p3, vec![a])]);
        let decisions = tally.record_poll(&a, &round).unwrap();
        assert!(!decisions.conclusive);
        assert_eq!(tally.confidence(&a), 0);
    }

    #[test]
    fn test_accepted_is_terminal() {
        let mut tally = VoteTally::new(Parameters::new(1, 1, 1, 1).unwrap());
        let x = Id::new(&[10]);
        let (p1, _, _) = peers();
        tally.add(&container(x, vec![], vec![])).unwrap();
        tally.record_poll(&x, &votes(vec![(p1, vec![x])])).unwrap();
        assert_eq!(tally.status(&x), Status::Accepted);

        match tally.record_poll(&x, &votes(vec![])) {
            Err(Error::AlreadyDecided(id)) => assert_eq!(id, x),
            other => panic!("unexpected: {:?}", other),
        }
        assert_eq!(tally.status(&x), Status::Accepted);

        // A late rival is rejected on arrival.
        let conflicting = Id::new(&[12]);
        let key = Id::new(&[99]);
        let mut tally = VoteTally::new(Parameters::new(1, 1, 1, 1).unwrap());
        tally.add(&container(x, vec![], vec![key])).unwrap();
        tally.record_poll(&x, &votes(vec![(p1, vec![x])])).unwrap();
        assert_eq!(tally.add(&container(conflicting, vec![], vec![key])).unwrap(), Status::Rejected);
        assert_eq!(tally.status(&x), Status::Accepted);
    }

    #[test]
    fn test_children_of_rejected_are_rejected() {
        let mut tally = VoteTally::new(Parameters::new(1, 1, 1, 1).unwrap());
        let key = Id::new(&[99]);
        let (a, b) = (Id::new(&[10]), Id::new(&[11]));
        let (p1, _, _) = peers();
        tally.add(&container(a, vec![], vec![key])).unwrap();
        tally.add(&container(b, vec![], vec![key])).unwrap();
        tally.record_poll(&a, &votes(vec![(p1, vec![a])])).unwrap();
        assert_eq!(tally.status(&b), Status::Rejected);
        let child = Id::new(&[12]);
        assert_eq!(tally.add(&container(child, vec![b], vec![])).unwrap(), Status::Rejected);
        assert_eq!(tally.preferences(&b), vec![a].into_iter().collect());
    }

    #[test]
    fn test_filter_accepted() {
        let mut tally = VoteTally::new(Parameters::new(1, 1, 1, 1).unwrap());
        let (a, b) = (Id::new(&[10]), Id::new(&[11]));
        let (p1, _, _) = peers();
        tally.add(&container(a, vec![], vec![])).unwrap();
        tally.add(&container(b, vec![], vec![])).unwrap();
        tally.record_poll(&a, &votes(vec![(p1, vec![a])])).unwrap();
        let asked: HashSet<Id> = vec![a, b, Id::new(&[12])].into_iter().collect();
        assert_eq!(tally.filter_accepted(&asked), vec![a].into_iter().collect());
        assert_eq!(tally.accepted(), vec![a]);
        assert_eq!(tally.processing(), vec![b]);
    }
}
