//! An in-process transport connecting nodes running in the same actor system.
use super::dispatcher::{Inbound, SendFailed, Transport};
use super::prelude::*;

use crate::protocol::Envelope;

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

struct Endpoint {
    inbound: Recipient<Inbound>,
    failures: Recipient<SendFailed>,
    online: bool,
}

/// The set of nodes reachable over loopback. Cheap to clone, every clone shares the
/// same endpoints.
#[derive(Clone, Default)]
pub struct Switchboard {
    endpoints: Arc<RwLock<HashMap<Id, Endpoint>>>,
}

impl Switchboard {
    pub fn new() -> Self {
        Switchboard::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<Id, Endpoint>> {
        self.endpoints.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<Id, Endpoint>> {
        self.endpoints.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Connects `node_id`: inbound messages for it are delivered to `inbound` and its own
    /// undeliverable messages are reported to `failures`.
    pub fn connect(&self, node_id: Id, inbound: Recipient<Inbound>, failures: Recipient<SendFailed>) {
        let _ = self.write().insert(node_id, Endpoint { inbound, failures, online: true });
    }

    /// Takes a node off the network (or back on). An offline node neither sends nor
    /// receives.
    pub fn set_online(&self, node_id: &Id, online: bool) {
        if let Some(endpoint) = self.write().get_mut(node_id) {
            endpoint.online = online;
        }
    }

    pub fn is_online(&self, node_id: &Id) -> bool {
        self.read().get(node_id).map(|endpoint| endpoint.online).unwrap_or(false)
    }

    pub fn transport(&self, node_id: Id) -> LoopbackTransport {
        LoopbackTransport { node_id, switchboard: self.clone() }
    }
}

/// The sending half of a node on a [Switchboard]. Envelopes are encoded on the way out
/// and decoded by the receiving node, as they would be on a real network.
pub struct LoopbackTransport {
    node_id: Id,
    switchboard: Switchboard,
}

impl LoopbackTransport {
    fn fail(&self, peer: Id, envelope: &Envelope) {
        debug!(
            "[{}] {} cannot reach {}",
            "loopback".cyan(),
            self.node_id.short(),
            peer.short()
        );
        if let Some(endpoint) = self.switchboard.read().get(&self.node_id) {
            let _ = endpoint.failures.do_send(SendFailed::new(peer, envelope));
        }
    }
}

impl Transport for LoopbackTransport {
    fn send(&self, peer: Id, envelope: Envelope) {
        let bytes = match envelope.encode() {
            Ok(bytes) => bytes,
            Err(err) => {
                error!("[{}] cannot encode {:?}: {}", "loopback".cyan(), envelope, err);
                return self.fail(peer, &envelope);
            }
        };
        let delivered = {
            let endpoints = self.switchboard.read();
            let sender_online = endpoints.get(&self.node_id).map(|e| e.online).unwrap_or(false);
            match endpoints.get(&peer) {
                Some(endpoint) if sender_online && endpoint.online => {
                    endpoint.inbound.do_send(Inbound { from: self.node_id, bytes }).is_ok()
                }
                _ => false,
            }
        };
        if !delivered {
            self.fail(peer, &envelope);
        }
    }
}
