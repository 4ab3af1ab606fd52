use super::bootstrap::{Bootstrapper, Step};
use super::poll::Poll;
use super::tally::{Decisions, VoteTally};
use super::{Parameters, Status};

use crate::colored::Colorize;
use crate::p2p::{Discard, ExponentialBackoff, Outstanding, RequestKey, Router, Sender};
use crate::protocol::{Message, MessageKind};
use crate::storage::Storage;
use crate::view::{Sampler, SamplingMode, ValidatorSet};
use crate::vm::{ParsedContainer, Vm};
use crate::zfx_id::Id;
use crate::{Error, Result};

use actix::{Actor, AsyncContext, Context, Handler, MessageResult, Recipient};

use bytes::Bytes;

use tokio::time::Duration;

use tracing::{debug, error, info, warn};

use std::collections::{HashMap, HashSet};
use std::sync::Arc;


/// How often a missing container is requested before giving up on it.
const MAX_FETCH_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub node_id: Id,
    pub chain_id: Id,
    pub params: Parameters,
    pub sampling: SamplingMode,
    /// Re-polling delays after inconclusive rounds.
    pub backoff: ExponentialBackoff,
}

/// The consensus loop of one chain.
///
/// Instead of an infinite polling loop the engine is an `Actor`: every inbound message,
/// request failure and scheduled re-poll is a message, and rounds are started from the
/// handlers. Rounds on the same container are strictly sequential, rounds on different
/// containers overlap freely.
pub struct Engine {
    node_id: Id,
    chain_id: Id,
    params: Parameters,
    vm: Arc<dyn Vm + Send + Sync>,
    storage: Arc<dyn Storage + Send + Sync>,
    sender: Arc<dyn Sender>,
    router: Arc<Router>,
    /// The validators to sample, without this node.
    validators: ValidatorSet,
    sampler: Sampler,
    tally: VoteTally,
    /// Active polls by request id.
    polls: HashMap<u32, Poll>,
    /// Containers with an active poll, and its request id.
    polling: HashMap<Id, u32>,
    /// Containers which were already pushed to peers.
    pushed: HashSet<Id>,
    /// Consecutive inconclusive rounds per container.
    stalls: HashMap<Id, u32>,
    backoff: ExponentialBackoff,
    /// Containers waiting for parents, with the parents they still miss.
    blocked: HashMap<Id, (ParsedContainer, HashSet<Id>)>,
    /// Missing containers and the blocked containers waiting for them.
    waiting: HashMap<Id, HashSet<Id>>,
    /// Requested containers and the number of attempts so far.
    fetching: HashMap<Id, u32>,
    bootstrapper: Option<Bootstrapper>,
    bootstrapped: bool,
    /// Re-polls to schedule once the current handler returns.
    scheduled: Vec<(Id, Duration)>,
    subscriber: Option<Recipient<Decided>>,
}

impl Engine {
    pub fn new(
        config: EngineConfig,
        vm: Arc<dyn Vm + Send + Sync>,
        storage: Arc<dyn Storage + Send + Sync>,
        sender: Arc<dyn Sender>,
        router: Arc<Router>,
        mut validators: ValidatorSet,
    ) -> Self {
        let _ = validators.remove(&config.node_id);
        Engine {
            node_id: config.node_id,
            chain_id: config.chain_id,
            params: config.params,
            vm,
            storage,
            sender,
            router,
            validators,
            sampler: Sampler::new(config.sampling),
            tally: VoteTally::new(config.params),
            polls: HashMap::default(),
            polling: HashMap::default(),
            pushed: HashSet::new(),
            stalls: HashMap::default(),
            backoff: config.backoff,
            blocked: HashMap::default(),
            waiting: HashMap::default(),
            fetching: HashMap::default(),
            bootstrapper: None,
            bootstrapped: false,
            scheduled: vec![],
            subscriber: None,
        }
    }

    pub fn chain_id(&self) -> Id {
        self.chain_id
    }

    pub fn tally(&self) -> &VoteTally {
        &self.tally
    }

    /// The request id of the active poll on `container_id`.
    pub fn active_poll(&self, container_id: &Id) -> Option<u32> {
        self.polling.get(container_id).cloned()
    }

    pub fn is_blocked(&self, container_id: &Id) -> bool {
        self.blocked.contains_key(container_id)
    }

    pub fn is_bootstrapped(&self) -> bool {
        self.bootstrapped
    }

    pub fn set_validators(&mut self, mut validators: ValidatorSet) {
        let _ = validators.remove(&self.node_id);
        self.validators = validators;
    }

    pub fn subscribe(&mut self, recipient: Recipient<Decided>) {
        self.subscriber = Some(recipient);
    }

    /// Drains the re-polls decided since the last call.
    pub fn take_scheduled(&mut self) -> Vec<(Id, Duration)> {
        std::mem::take(&mut self.scheduled)
    }

    // Containers

    /// Issues a locally created container. Its parents must be known.
    pub fn issue(&mut self, container: Bytes) -> Result<Id> {
        let parsed = self.vm.parse(&container)?;
        if parsed.parents.iter().any(|parent| !self.tally.contains(parent)) {
            return Err(Error::MissingParents(parsed.id));
        }
        info!("[{}] issuing {}", "snow".cyan(), parsed.id);
        self.ingest(container, None)
    }

    /// Stores and adds a container received from `from` (or issued locally). Containers
    /// with unknown parents are buffered until the parents arrive, and the parents are
    /// requested from `from`. Known containers are left untouched.
    fn ingest(&mut self, container: Bytes, from: Option<Id>) -> Result<Id> {
        let parsed = self.vm.parse(&container)?;
        let id = parsed.id;
        if self.tally.contains(&id) || self.blocked.contains_key(&id) {
            return Ok(id);
        }
        self.storage.put(id, &container)?;
        let _ = self.fetching.remove(&id);

        let missing: HashSet<Id> =
            parsed.parents.iter().filter(|parent| !self.tally.contains(parent)).cloned().collect();
        if missing.is_empty() {
            self.insert(parsed)?;
            return Ok(id);
        }
        debug!("[{}] {} waits for {} parents", "snow".cyan(), id.short(), missing.len());
        for parent in missing.iter() {
            let _ = self.waiting.entry(*parent).or_insert_with(HashSet::new).insert(id);
            if !self.blocked.contains_key(parent) {
                if let Some(peer) = from {
                    self.fetch(*parent, peer)?;
                }
            }
        }
        let _ = self.blocked.insert(id, (parsed, missing));
        Ok(id)
    }

    // Adds a container whose parents are known, then every buffered container it
    // unblocks.
    fn insert(&mut self, parsed: ParsedContainer) -> Result<()> {
        let mut ready = vec![parsed];
        while let Some(container) = ready.pop() {
            let id = container.id;
            match self.tally.add(&container)? {
                Status::Processing => self.start_poll(id)?,
                Status::Rejected => self.publish(id, Status::Rejected),
                _ => (),
            }
            let waiters = match self.waiting.remove(&id) {
                Some(waiters) => waiters,
                None => continue,
            };
            for waiter in waiters.into_iter() {
                let unblocked = match self.blocked.get_mut(&waiter) {
                    Some((_, missing)) => {
                        let _ = missing.remove(&id);
                        missing.is_empty()
                    }
                    None => false,
                };
                if unblocked {
                    if let Some((container, _)) = self.blocked.remove(&waiter) {
                        ready.push(container);
                    }
                }
            }
        }
        Ok(())
    }

    /// Requests an unknown container from a sampled validator.
    pub fn issue_get(&mut self, container_id: Id) -> Result<()> {
        if self.tally.contains(&container_id) || self.blocked.contains_key(&container_id) {
            return Ok(());
        }
        let peers = self.sampler.sample(&self.validators, 1, true)?;
        match peers.into_iter().next() {
            Some(peer) => self.fetch(container_id, peer),
            None => Ok(()),
        }
    }

    fn fetch(&mut self, container_id: Id, peer: Id) -> Result<()> {
        if self.fetching.contains_key(&container_id) {
            return Ok(());
        }
        let peers = vec![peer].into_iter().collect();
        let _ = self.sender.get(self.chain_id, peers, container_id)?;
        let _ = self.fetching.insert(container_id, 1);
        Ok(())
    }

    // Asks another validator for a container `peer` did not deliver.
    fn refetch(&mut self, container_id: Id, peer: Id) -> Result<()> {
        if self.tally.contains(&container_id) || self.blocked.contains_key(&container_id) {
            let _ = self.fetching.remove(&container_id);
            return Ok(());
        }
        let attempts = self.fetching.get(&container_id).cloned().unwrap_or(0);
        if attempts >= MAX_FETCH_ATTEMPTS {
            warn!("[{}] giving up on fetching {}", "snow".cyan(), container_id);
            let _ = self.fetching.remove(&container_id);
            return Ok(());
        }
        let mut others = self.validators.clone();
        let _ = others.remove(&peer);
        let peers = self.sampler.sample(&others, 1, false)?;
        if peers.is_empty() {
            let _ = self.fetching.remove(&container_id);
            return Ok(());
        }
        let _ = self.fetching.insert(container_id, attempts + 1);
        let _ = self.sender.get(self.chain_id, peers, container_id)?;
        Ok(())
    }

    // Polling

    /// Starts a polling round on `container_id` unless it is decided or already being
    /// polled. The first round pushes the container, later rounds pull.
    pub fn start_poll(&mut self, container_id: Id) -> Result<()> {
        if self.tally.status(&container_id) != Status::Processing
            || self.polling.contains_key(&container_id)
        {
            return Ok(());
        }
        let peers = self.sampler.sample(&self.validators, self.params.k, false)?;
        if peers.is_empty() {
            warn!("[{}] no validators to poll {}", "snow".cyan(), container_id.short());
            self.schedule_retry(container_id);
            return Ok(());
        }
        let container = if self.pushed.insert(container_id) {
            self.storage.get(&container_id)?
        } else {
            None
        };
        let request_id = match container {
            Some(container) => {
                self.sender.push_query(self.chain_id, peers.clone(), container_id, container)?
            }
            None => self.sender.pull_query(self.chain_id, peers.clone(), container_id)?,
        };
        debug!(
            "[{}] poll #{} on {} sampled {} validators",
            "snow".cyan(),
            request_id,
            container_id.short(),
            peers.len()
        );
        let _ = self.polls.insert(request_id, Poll::new(container_id, request_id, peers));
        let _ = self.polling.insert(container_id, request_id);
        Ok(())
    }

    fn schedule_retry(&mut self, container_id: Id) {
        let stalls = self.stalls.entry(container_id).or_insert(0);
        *stalls += 1;
        let delay = self.backoff.delay(*stalls);
        debug!(
            "[{}] re-polling {} in {:?} ({} inconclusive rounds)",
            "snow".cyan(),
            container_id.short(),
            delay,
            stalls
        );
        self.scheduled.push((container_id, delay));
    }

    fn on_chits(&mut self, from: Id, request_id: u32, votes: HashSet<Id>) -> Result<()> {
        match self.polls.get_mut(&request_id) {
            Some(poll) => {
                if !poll.vote(from, votes.clone()) {
                    return Ok(());
                }
            }
            None => {
                debug!("[{}] no active poll #{}", "snow".cyan(), request_id);
                return Ok(());
            }
        }
        // Votes for containers we have never seen reveal rivals or descendants.
        for vote in votes.into_iter() {
            if !self.tally.contains(&vote) && !self.blocked.contains_key(&vote) {
                if let Err(err) = self.fetch(vote, from) {
                    warn!("[{}] failed to fetch {}: {}", "snow".cyan(), vote.short(), err);
                }
            }
        }
        if self.is_round_over(request_id) {
            self.finish_poll(request_id)?;
        }
        Ok(())
    }

    // A round is over when every sampled peer is accounted for, or when the votes still
    // outstanding cannot change its outcome.
    fn is_round_over(&self, request_id: u32) -> bool {
        match self.polls.get(&request_id) {
            Some(poll) => {
                poll.is_finished()
                    || self.tally.is_settled(&poll.container_id, poll.responses(), poll.pending().len())
            }
            None => false,
        }
    }

    fn finish_poll(&mut self, request_id: u32) -> Result<()> {
        let poll = match self.polls.remove(&request_id) {
            Some(poll) => poll,
            None => return Ok(()),
        };
        let container_id = poll.container_id;
        let _ = self.polling.remove(&container_id);
        if !poll.is_finished() {
            let cancelled = self.router.cancel(&self.chain_id, request_id);
            debug!(
                "[{}] poll #{} settled early, ignoring {} late answers",
                "snow".cyan(),
                request_id,
                cancelled
            );
        }
        if self.tally.status(&container_id) != Status::Processing {
            return Ok(());
        }
        let decisions = self.tally.record_poll(&container_id, poll.responses())?;
        info!(
            "[{}] poll #{} on {}: {}/{} votes, conclusive = {}, confidence = {}",
            "snow".cyan(),
            request_id,
            container_id.short(),
            poll.responses().len(),
            poll.sampled(),
            decisions.conclusive,
            self.tally.confidence(&container_id)
        );
        let conclusive = decisions.conclusive;
        self.apply(decisions);
        if self.tally.status(&container_id) == Status::Processing {
            if conclusive {
                let _ = self.stalls.remove(&container_id);
                self.start_poll(container_id)?;
            } else {
                self.schedule_retry(container_id);
            }
        }
        Ok(())
    }

    // Publishes decisions and abandons the polls of decided containers.
    fn apply(&mut self, decisions: Decisions) {
        let accepted = decisions.accepted.into_iter().map(|id| (id, Status::Accepted));
        let rejected = decisions.rejected.into_iter().map(|id| (id, Status::Rejected));
        for (id, status) in accepted.chain(rejected) {
            if let Some(request_id) = self.polling.remove(&id) {
                let _ = self.polls.remove(&request_id);
                let cancelled = self.router.cancel(&self.chain_id, request_id);
                debug!(
                    "[{}] abandoned poll #{} on {} ({} outstanding)",
                    "snow".cyan(),
                    request_id,
                    id.short(),
                    cancelled
                );
            }
            let _ = self.stalls.remove(&id);
            self.publish(id, status);
        }
    }

    fn publish(&self, container_id: Id, status: Status) {
        if let Some(subscriber) = self.subscriber.as_ref() {
            let _ = subscriber.do_send(Decided { chain_id: self.chain_id, container_id, status });
        }
    }

    // Inbound messages

    /// Handles a message from `from`. Responses are matched against the request they
    /// answer first, and discarded when nothing is waiting for them.
    pub fn on_message(
        &mut self,
        from: Id,
        chain_id: Id,
        request_id: u32,
        message: Message,
    ) -> Result<()> {
        if chain_id != self.chain_id {
            return Err(Error::MalformedRouting(format!(
                "{} for chain {} delivered to chain {}",
                message.kind(),
                chain_id,
                self.chain_id
            )));
        }
        if message.kind().is_request() {
            return self.on_request(from, request_id, message);
        }
        let request = match self.router.on_response(from, chain_id, request_id, message.kind()) {
            Ok(request) => request,
            Err(Discard::StaleResponse) => return Ok(()),
            Err(Discard::ProtocolViolation { request, .. }) => {
                return self.on_unresponsive(from, request_id, request);
            }
        };
        match message {
            Message::Chits { votes } => self.on_chits(from, request_id, votes),
            Message::Put { container_id, container } => {
                self.on_put(from, request, container_id, container)
            }
            Message::AcceptedFrontier { container_ids } => {
                let step = match self.bootstrapper.as_mut() {
                    Some(b) if b.request_id() == request_id => {
                        b.on_accepted_frontier(from, container_ids)
                    }
                    _ => Step::Wait,
                };
                self.on_bootstrap_step(step)
            }
            Message::Accepted { container_ids } => {
                let step = match self.bootstrapper.as_mut() {
                    Some(b) if b.request_id() == request_id => b.on_accepted(from, container_ids),
                    _ => Step::Wait,
                };
                self.on_bootstrap_step(step)
            }
            _ => Ok(()),
        }
    }

    fn on_request(&mut self, from: Id, request_id: u32, message: Message) -> Result<()> {
        let chain_id = self.chain_id;
        match message {
            Message::GetAcceptedFrontier => {
                let frontier = self.tally.accepted_frontier();
                self.sender.accepted_frontier(chain_id, from, request_id, frontier)
            }
            Message::GetAccepted { container_ids } => {
                let accepted = self.tally.filter_accepted(&container_ids);
                self.sender.accepted(chain_id, from, request_id, accepted)
            }
            Message::Get { container_id } => match self.storage.get(&container_id)? {
                Some(container) => {
                    self.sender.put(chain_id, from, request_id, container_id, container)
                }
                None => {
                    debug!("[{}] {} asked for unknown {}", "snow".cyan(), from.short(), container_id);
                    Ok(())
                }
            },
            Message::PushQuery { container_id, container } => {
                match self.ingest(container, Some(from)) {
                    Ok(id) if id != container_id => warn!(
                        "[{}] {} pushed {} as {}",
                        "snow".cyan(),
                        from.short(),
                        id,
                        container_id
                    ),
                    Ok(_) => (),
                    Err(err) => warn!("[{}] invalid container from {}: {}", "snow".cyan(), from.short(), err),
                }
                let votes = self.tally.preferences(&container_id);
                self.sender.chits(chain_id, from, request_id, votes)
            }
            Message::PullQuery { container_id } => {
                if !self.tally.contains(&container_id) && !self.blocked.contains_key(&container_id) {
                    self.fetch(container_id, from)?;
                }
                let votes = self.tally.preferences(&container_id);
                self.sender.chits(chain_id, from, request_id, votes)
            }
            _ => Ok(()),
        }
    }

    fn on_put(&mut self, from: Id, request: Outstanding, container_id: Id, container: Bytes) -> Result<()> {
        if request.container_id != Some(container_id) {
            warn!("[{}] {} put {} which was not asked for", "snow".cyan(), from.short(), container_id);
        }
        match self.ingest(container, Some(from)) {
            Ok(id) if id != container_id => {
                warn!("[{}] {} put {} as {}", "snow".cyan(), from.short(), id, container_id)
            }
            Ok(_) => (),
            Err(err) => warn!("[{}] invalid container from {}: {}", "snow".cyan(), from.short(), err),
        }
        Ok(())
    }

    /// Handles a request which `peer` will never answer: it timed out, could not be
    /// delivered or was answered with the wrong kind.
    pub fn on_unresponsive(&mut self, peer: Id, request_id: u32, request: Outstanding) -> Result<()> {
        match request.kind {
            MessageKind::PushQuery | MessageKind::PullQuery => {
                let dropped = match self.polls.get_mut(&request_id) {
                    Some(poll) => poll.drop_peer(&peer),
                    None => false,
                };
                if dropped && self.is_round_over(request_id) {
                    self.finish_poll(request_id)?;
                }
                Ok(())
            }
            MessageKind::Get => match request.container_id {
                Some(container_id) => self.refetch(container_id, peer),
                None => Ok(()),
            },
            MessageKind::GetAcceptedFrontier | MessageKind::GetAccepted => {
                let step = match self.bootstrapper.as_mut() {
                    Some(b) if b.request_id() == request_id => b.drop_peer(&peer),
                    _ => Step::Wait,
                };
                self.on_bootstrap_step(step)
            }
            _ => Ok(()),
        }
    }

    // Bootstrapping

    /// Starts frontier discovery against a sample of `k` validators.
    pub fn bootstrap(&mut self) -> Result<()> {
        let peers = self.sampler.sample(&self.validators, self.params.k, false)?;
        if peers.is_empty() {
            info!("[{}] nothing to bootstrap from", "snow".cyan());
            self.bootstrapped = true;
            return Ok(());
        }
        let request_id = self.sender.get_accepted_frontier(self.chain_id, peers.clone())?;
        info!("[{}] bootstrapping from {} validators", "snow".cyan(), peers.len());
        self.bootstrapper = Some(Bootstrapper::new(self.params.alpha, peers, request_id));
        Ok(())
    }

    fn on_bootstrap_step(&mut self, step: Step) -> Result<()> {
        match step {
            Step::Wait => Ok(()),
            Step::QueryAccepted(container_ids) => {
                let peers = match self.bootstrapper.as_ref() {
                    Some(b) => b.peers().clone(),
                    None => return Ok(()),
                };
                let request_id = self.sender.get_accepted(self.chain_id, peers, container_ids)?;
                if let Some(b) = self.bootstrapper.as_mut() {
                    b.query_accepted(request_id);
                }
                Ok(())
            }
            Step::Finished(accepted) => {
                info!("[{}] bootstrapped with {} accepted containers", "snow".cyan(), accepted.len());
                self.bootstrapped = true;
                let bootstrapper = match self.bootstrapper.take() {
                    Some(b) => b,
                    None => return Ok(()),
                };
                for container_id in accepted.into_iter() {
                    if self.tally.contains(&container_id) || self.blocked.contains_key(&container_id) {
                        continue;
                    }
                    if let Some(peer) = bootstrapper.sources(&container_id).first() {
                        self.fetch(container_id, *peer)?;
                    }
                }
                Ok(())
            }
        }
    }

    fn schedule(&mut self, ctx: &mut Context<Self>) {
        for (container_id, delay) in self.take_scheduled().into_iter() {
            let _ = ctx.notify_later(Repoll { container_id }, delay);
        }
    }
}

impl Actor for Engine {
    type Context = Context<Self>;

    fn started(&mut self, _ctx: &mut Context<Self>) {
        info!("[{}] engine started for chain {}", "snow".cyan(), self.chain_id);
    }

    fn stopped(&mut self, _ctx: &mut Context<Self>) {
        info!("[{}] engine stopped for chain {}", "snow".cyan(), self.chain_id);
    }
}

/// A consensus message for this chain.
#[derive(Debug, Clone, Message)]
#[rtype(result = "()")]
pub struct Deliver {
    pub from: Id,
    pub chain_id: Id,
    pub request_id: u32,
    pub message: Message,
}

impl Handler<Deliver> for Engine {
    type Result = ();

    fn handle(&mut self, msg: Deliver, ctx: &mut Context<Self>) -> Self::Result {
        let kind = msg.message.kind();
        if let Err(err) = self.on_message(msg.from, msg.chain_id, msg.request_id, msg.message) {
            error!("[{}] failed to handle {} from {}: {}", "snow".cyan(), kind, msg.from.short(), err);
        }
        self.schedule(ctx);
    }
}

/// A request which will not be answered.
#[derive(Debug, Clone, Message)]
#[rtype(result = "()")]
pub struct Unresponsive {
    pub key: RequestKey,
    pub request: Outstanding,
}

impl Handler<Unresponsive> for Engine {
    type Result = ();

    fn handle(&mut self, msg: Unresponsive, ctx: &mut Context<Self>) -> Self::Result {
        debug!(
            "[{}] {} #{} to {} unanswered",
            "snow".cyan(),
            msg.request.kind,
            msg.key.request_id,
            msg.key.peer.short()
        );
        if let Err(err) = self.on_unresponsive(msg.key.peer, msg.key.request_id, msg.request) {
            error!("[{}] {}", "snow".cyan(), err);
        }
        self.schedule(ctx);
    }
}

/// Issues a locally created container.
#[derive(Debug, Clone, Message)]
#[rtype(result = "Result<Id>")]
pub struct Issue {
    pub container: Bytes,
}

impl Handler<Issue> for Engine {
    type Result = Result<Id>;

    fn handle(&mut self, msg: Issue, ctx: &mut Context<Self>) -> Self::Result {
        let result = self.issue(msg.container);
        self.schedule(ctx);
        result
    }
}

#[derive(Debug, Clone, Message)]
#[rtype(result = "()")]
pub struct Repoll {
    pub container_id: Id,
}

impl Handler<Repoll> for Engine {
    type Result = ();

    fn handle(&mut self, msg: Repoll, ctx: &mut Context<Self>) -> Self::Result {
        if let Err(err) = self.start_poll(msg.container_id) {
            error!("[{}] cannot poll {}: {}", "snow".cyan(), msg.container_id, err);
        }
        self.schedule(ctx);
    }
}

#[derive(Debug, Clone, Message)]
#[rtype(result = "()")]
pub struct Bootstrap;

impl Handler<Bootstrap> for Engine {
    type Result = ();

    fn handle(&mut self, _msg: Bootstrap, _ctx: &mut Context<Self>) -> Self::Result {
        if let Err(err) = self.bootstrap() {
            error!("[{}] cannot bootstrap: {}", "snow".cyan(), err);
        }
    }
}

#[derive(Debug, Clone, Message)]
#[rtype(result = "()")]
pub struct UpdateValidators {
    pub validators: ValidatorSet,
}

impl Handler<UpdateValidators> for Engine {
    type Result = ();

    fn handle(&mut self, msg: UpdateValidators, _ctx: &mut Context<Self>) -> Self::Result {
        self.set_validators(msg.validators);
    }
}

/// A finality decision.
#[derive(Debug, Clone, PartialEq, Eq, Message)]
#[rtype(result = "()")]
pub struct Decided {
    pub chain_id: Id,
    pub container_id: Id,
    pub status: Status,
}

#[derive(Clone, Message)]
#[rtype(result = "()")]
pub struct Subscribe {
    pub recipient: Recipient<Decided>,
}

impl Handler<Subscribe> for Engine {
    type Result = ();

    fn handle(&mut self, msg: Subscribe, _ctx: &mut Context<Self>) -> Self::Result {
        self.subscribe(msg.recipient);
    }
}

#[derive(Debug, Clone, Message)]
#[rtype(result = "Status")]
pub struct GetStatus {
    pub container_id: Id,
}

impl Handler<GetStatus> for Engine {
    type Result = MessageResult<GetStatus>;

    fn handle(&mut self, msg: GetStatus, _ctx: &mut Context<Self>) -> Self::Result {
        MessageResult(self.tally.status(&msg.container_id))
    }
}
