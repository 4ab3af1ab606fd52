use super::dispatcher::Dispatch;
use super::prelude::*;
use super::request_tracker::{RequestKey, RequestTracker};

use crate::protocol::{Envelope, Message, MessageKind};

use bytes::Bytes;

use std::collections::HashSet;
use std::iter::FromIterator;
use std::time::Instant;

/// One outbound call: a message of one of the nine kinds for one or many peers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outbound {
    pub chain_id: Id,
    pub peers: HashSet<Id>,
    /// Requests may carry a caller-chosen id, a fresh one is allocated otherwise.
    /// Responses must echo the id of the request they answer.
    pub request_id: Option<u32>,
    pub message: Message,
}

impl Outbound {
    pub fn request(chain_id: Id, peers: HashSet<Id>, message: Message) -> Self {
        Outbound { chain_id, peers, request_id: None, message }
    }

    pub fn response(chain_id: Id, peer: Id, request_id: u32, message: Message) -> Self {
        Outbound { chain_id, peers: HashSet::from_iter(vec![peer]), request_id: Some(request_id), message }
    }

    pub fn kind(&self) -> MessageKind {
        self.message.kind()
    }
}

/// Turns consensus intents into outbound messages.
///
/// `send` is the only required method, the per-kind methods build the matching
/// [Outbound]. Request-style calls return the request id they were sent under. No call
/// ever waits for the network: a peer which cannot be reached shows up later as a
/// failure notification or a timeout.
pub trait Sender: Send + Sync {
    fn send(&self, outbound: Outbound) -> Result<u32>;

    fn get_accepted_frontier(&self, chain_id: Id, peers: HashSet<Id>) -> Result<u32> {
        self.send(Outbound::request(chain_id, peers, Message::GetAcceptedFrontier))
    }

    fn accepted_frontier(
        &self,
        chain_id: Id,
        peer: Id,
        request_id: u32,
        container_ids: HashSet<Id>,
    ) -> Result<()> {
        let message = Message::AcceptedFrontier { container_ids };
        self.send(Outbound::response(chain_id, peer, request_id, message)).map(|_| ())
    }

    fn get_accepted(
        &self,
        chain_id: Id,
        peers: HashSet<Id>,
        container_ids: HashSet<Id>,
    ) -> Result<u32> {
        self.send(Outbound::request(chain_id, peers, Message::GetAccepted { container_ids }))
    }

    fn accepted(
        &self,
        chain_id: Id,
        peer: Id,
        request_id: u32,
        container_ids: HashSet<Id>,
    ) -> Result<()> {
        let message = Message::Accepted { container_ids };
        self.send(Outbound::response(chain_id, peer, request_id, message)).map(|_| ())
    }

    fn get(&self, chain_id: Id, peers: HashSet<Id>, container_id: Id) -> Result<u32> {
        self.send(Outbound::request(chain_id, peers, Message::Get { container_id }))
    }

    fn put(
        &self,
        chain_id: Id,
        peer: Id,
        request_id: u32,
        container_id: Id,
        container: Bytes,
    ) -> Result<()> {
        let message = Message::Put { container_id, container };
        self.send(Outbound::response(chain_id, peer, request_id, message)).map(|_| ())
    }

    fn push_query(
        &self,
        chain_id: Id,
        peers: HashSet<Id>,
        container_id: Id,
        container: Bytes,
    ) -> Result<u32> {
        let message = Message::PushQuery { container_id, container };
        self.send(Outbound::request(chain_id, peers, message))
    }

    fn pull_query(&self, chain_id: Id, peers: HashSet<Id>, container_id: Id) -> Result<u32> {
        self.send(Outbound::request(chain_id, peers, Message::PullQuery { container_id }))
    }

    fn chits(&self, chain_id: Id, peer: Id, request_id: u32, votes: HashSet<Id>) -> Result<()> {
        self.send(Outbound::response(chain_id, peer, request_id, Message::Chits { votes }))
            .map(|_| ())
    }
}

/// The production sender. Registers request-style calls with the request tracker and
/// queues every message on the dispatcher mailbox.
pub struct OutboundSender {
    tracker: Arc<RequestTracker>,
    dispatcher: Recipient<Dispatch>,
    timeout: Duration,
}

impl OutboundSender {
    pub fn new(tracker: Arc<RequestTracker>, dispatcher: Recipient<Dispatch>, timeout: Duration) -> Self {
        OutboundSender { tracker, dispatcher, timeout }
    }

    fn register(&self, outbound: &Outbound, kind: MessageKind) -> Result<u32> {
        let request_id = match outbound.request_id {
            Some(request_id) => request_id,
            None => self.tracker.new_request_id(),
        };
        let deadline = Instant::now() + self.timeout;
        let container_id = outbound.message.container_ref();
        let mut registered = vec![];
        for peer in outbound.peers.iter() {
            let key = RequestKey::new(*peer, outbound.chain_id, request_id);
            if let Err(err) = self.tracker.register(key, kind, container_id, deadline) {
                for key in registered.iter() {
                    let _ = self.tracker.resolve(key);
                }
                return Err(err);
            }
            registered.push(key);
        }
        Ok(request_id)
    }
}

impl Sender for OutboundSender {
    fn send(&self, outbound: Outbound) -> Result<u32> {
        let kind = outbound.kind();
        let request_id = if kind.is_request() {
            self.register(&outbound, kind)?
        } else {
            if outbound.peers.len() != 1 {
                return Err(Error::MalformedRouting(format!(
                    "{} must be addressed to exactly one peer, got {}",
                    kind,
                    outbound.peers.len()
                )));
            }
            match outbound.request_id {
                Some(request_id) => request_id,
                None => {
                    return Err(Error::MalformedRouting(format!(
                        "{} must echo the id of the request it answers",
                        kind
                    )))
                }
            }
        };
        let Outbound { chain_id, peers, message, .. } = outbound;
        for peer in peers.into_iter() {
            let envelope = Envelope::new(chain_id, request_id, message.clone());
            let _ = self.dispatcher.do_send(Dispatch { peer, envelope });
        }
        Ok(request_id)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use actix::{Actor, Context, Handler};

    use std::sync::Mutex;

    struct Recorder {
        dispatched: Arc<Mutex<Vec<Dispatch>>>,
    }

    impl Actor for Recorder {
        type Context = Context<Self>;
    }

    impl Handler<Dispatch> for Recorder {
        type Result = ();

        fn handle(&mut self, msg: Dispatch, _ctx: &mut Context<Self>) -> Self::Result {
            self.dispatched.lock().unwrap().push(msg);
        }
    }

    fn sender() -> (OutboundSender, Arc<RequestTracker>, Arc<Mutex<Vec<Dispatch>>>) {
        let dispatched = Arc::new(Mutex::new(vec![]));
        let recorder = Recorder { dispatched: dispatched.clone() }.start();
        let tracker = Arc::new(RequestTracker::new());
        let sender = OutboundSender::new(tracker.clone(), recorder.recipient(), Duration::from_secs(1));
        (sender, tracker, dispatched)
    }

    fn peers(ids: Vec<Id>) -> HashSet<Id> {
        ids.into_iter().collect()
    }

    #[actix_rt::test]
    async fn test_request_fans_out_and_registers() {
        let (sender, tracker, dispatched) = sender();
        let chain = Id::zero();
        let container = Id::generate();
        let request_id = sender.pull_query(chain, peers(vec![Id::one(), Id::two()]), container).unwrap();

        assert_eq!(tracker.len(), 2);
        for peer in vec![Id::one(), Id::two()] {
            let entry = tracker.resolve(&RequestKey::new(peer, chain, request_id)).unwrap();
            assert_eq!(entry.kind, MessageKind::PullQuery);
            assert_eq!(entry.container_id, Some(container));
        }

        actix_rt::time::sleep(Duration::from_millis(10)).await;
        let dispatched = dispatched.lock().unwrap();
        assert_eq!(dispatched.len(), 2);
        for d in dispatched.iter() {
            assert_eq!(d.envelope.request_id, request_id);
            assert_eq!(d.envelope.message, Message::PullQuery { container_id: container });
        }
    }

    #[actix_rt::test]
    async fn test_fresh_request_ids() {
        let (sender, _, _) = sender();
        let a = sender.get_accepted_frontier(Id::zero(), peers(vec![Id::one()])).unwrap();
        let b = sender.get_accepted_frontier(Id::zero(), peers(vec![Id::one()])).unwrap();
        assert!(b > a);
    }

    #[actix_rt::test]
    async fn test_duplicate_request_rolls_back() {
        let (sender, tracker, _) = sender();
        let chain = Id::zero();
        let outbound = Outbound {
            chain_id: chain,
            peers: peers(vec![Id::one()]),
            request_id: Some(5),
            message: Message::Get { container_id: Id::two() },
        };
        assert_eq!(sender.send(outbound).unwrap(), 5);

        let outbound = Outbound {
            chain_id: chain,
            peers: peers(vec![Id::one(), Id::two(), Id::generate()]),
            request_id: Some(5),
            message: Message::Get { container_id: Id::two() },
        };
        match sender.send(outbound) {
            Err(Error::DuplicateRequest { request_id: 5, .. }) => (),
            other => panic!("unexpected: {:?}", other),
        }
        // Only the first registration survives.
        assert_eq!(tracker.len(), 1);
        assert!(tracker.contains(&RequestKey::new(Id::one(), chain, 5)));
    }

    #[actix_rt::test]
    async fn test_responses_are_not_tracked() {
        let (sender, tracker, dispatched) = sender();
        sender.chits(Id::zero(), Id::one(), 11, peers(vec![Id::two()])).unwrap();
        assert!(tracker.is_empty());

        actix_rt::time::sleep(Duration::from_millis(10)).await;
        let dispatched = dispatched.lock().unwrap();
        assert_eq!(dispatched.len(), 1);
        assert_eq!(dispatched[0].peer, Id::one());
        assert_eq!(dispatched[0].envelope.request_id, 11);
    }

    #[actix_rt::test]
    async fn test_malformed_responses() {
        let (sender, _, _) = sender();
        let no_id = Outbound {
            chain_id: Id::zero(),
            peers: peers(vec![Id::one()]),
            request_id: None,
            message: Message::Accepted { container_ids: HashSet::new() },
        };
        match sender.send(no_id) {
            Err(Error::MalformedRouting(_)) => (),
            other => panic!("unexpected: {:?}", other),
        }
        let two_peers = Outbound {
            chain_id: Id::zero(),
            peers: peers(vec![Id::one(), Id::two()]),
            request_id: Some(1),
            message: Message::Chits { votes: HashSet::new() },
        };
        match sender.send(two_peers) {
            Err(Error::MalformedRouting(_)) => (),
            other => panic!("unexpected: {:?}", other),
        }
    }
}
