//! The hand-off point between the sender and the network.
//!
//! Outbound messages are queued as [Dispatch] messages on the [Dispatcher] mailbox and
//! written to the transport from there, so the consensus engine never waits on the
//! network. Delivery failures come back asynchronously as [SendFailed].
use super::prelude::*;

use crate::protocol::{Envelope, MessageKind};

/// Delivers envelopes to peers. Implementations must not block and report failures
/// through their own failure signal instead of a return value.
pub trait Transport: Send + Sync {
    fn send(&self, peer: Id, envelope: Envelope);
}

#[derive(Debug, Clone, Message)]
#[rtype(result = "()")]
pub struct Dispatch {
    pub peer: Id,
    pub envelope: Envelope,
}

/// Raw bytes received from a peer.
#[derive(Debug, Clone, Message)]
#[rtype(result = "()")]
pub struct Inbound {
    pub from: Id,
    pub bytes: Vec<u8>,
}

/// The transport could not deliver a message to `peer`.
#[derive(Debug, Clone, PartialEq, Eq, Message)]
#[rtype(result = "()")]
pub struct SendFailed {
    pub peer: Id,
    pub chain_id: Id,
    pub request_id: u32,
    pub kind: MessageKind,
}

impl SendFailed {
    pub fn new(peer: Id, envelope: &Envelope) -> Self {
        SendFailed {
            peer,
            chain_id: envelope.chain_id,
            request_id: envelope.request_id,
            kind: envelope.message.kind(),
        }
    }
}

pub struct Dispatcher {
    transport: Arc<dyn Transport>,
    dispatched: u64,
}

impl Dispatcher {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Dispatcher { transport, dispatched: 0 }
    }
}

impl Actor for Dispatcher {
    type Context = Context<Self>;

    fn stopped(&mut self, _ctx: &mut Context<Self>) {
        debug!("[{}] stopped after {} messages", "dispatcher".cyan(), self.dispatched);
    }
}

impl Handler<Dispatch> for Dispatcher {
    type Result = ();

    fn handle(&mut self, msg: Dispatch, _ctx: &mut Context<Self>) -> Self::Result {
        debug!(
            "[{}] {} #{} -> {}",
            "dispatcher".cyan(),
            msg.envelope.message.kind(),
            msg.envelope.request_id,
            msg.peer.short()
        );
        self.dispatched += 1;
        self.transport.send(msg.peer, msg.envelope);
    }
}
