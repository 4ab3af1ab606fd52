//! Matches inbound responses with the requests which asked for them.
use super::prelude::*;
use super::request_tracker::{Outstanding, RequestKey, RequestTracker};

use crate::protocol::MessageKind;

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Instant;

/// Why a response was dropped. Discards are expected on a lossy or adversarial network
/// and are never reported to the caller which sent the original request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Discard {
    /// No outstanding request matches the response: it is late, duplicated or was never
    /// asked for.
    StaleResponse,
    /// The response kind does not answer the kind of request which was sent. Carries the
    /// request entry, which the response consumed.
    ProtocolViolation { request: Outstanding, received: MessageKind },
}

impl std::fmt::Display for Discard {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Discard::StaleResponse => write!(f, "stale response"),
            Discard::ProtocolViolation { request, received } => {
                write!(f, "protocol violation: {} answered with {}", request.kind, received)
            }
        }
    }
}

pub struct Router {
    tracker: Arc<RequestTracker>,
    /// Protocol violations per peer, for the policy layer.
    misbehaving: Mutex<HashMap<Id, u32>>,
}

impl Router {
    pub fn new(tracker: Arc<RequestTracker>) -> Self {
        Router { tracker, misbehaving: Mutex::new(HashMap::default()) }
    }

    pub fn tracker(&self) -> &Arc<RequestTracker> {
        &self.tracker
    }

    /// Resolves the request answered by a response of kind `kind`.
    ///
    /// The outstanding entry is consumed in both the matching and the mismatching case,
    /// so a peer cannot answer the same request twice.
    pub fn on_response(
        &self,
        peer: Id,
        chain_id: Id,
        request_id: u32,
        kind: MessageKind,
    ) -> std::result::Result<Outstanding, Discard> {
        let key = RequestKey::new(peer, chain_id, request_id);
        let entry = match self.tracker.resolve(&key) {
            Some(entry) => entry,
            None => {
                debug!(
                    "[{}] discarding {} #{} from {}: {}",
                    "router".cyan(),
                    kind,
                    request_id,
                    peer.short(),
                    Discard::StaleResponse
                );
                return Err(Discard::StaleResponse);
            }
        };
        if entry.kind.expected_response() != Some(kind) {
            let discard = Discard::ProtocolViolation { request: entry, received: kind };
            warn!(
                "[{}] discarding #{} from {}: {}",
                "router".cyan(),
                request_id,
                peer.short(),
                discard
            );
            *self.lock_misbehaving().entry(peer).or_insert(0) += 1;
            return Err(discard);
        }
        Ok(entry)
    }

    /// Resolves a request which the transport could not deliver. Yields the entry when it
    /// was still outstanding.
    pub fn on_failure(&self, peer: Id, chain_id: Id, request_id: u32) -> Option<Outstanding> {
        self.tracker.resolve(&RequestKey::new(peer, chain_id, request_id))
    }

    /// Abandons every outstanding entry of a request. Responses arriving afterwards are
    /// discarded as stale.
    pub fn cancel(&self, chain_id: &Id, request_id: u32) -> usize {
        self.tracker.cancel(chain_id, request_id).len()
    }

    pub fn sweep(&self, now: Instant) -> Vec<(RequestKey, Outstanding)> {
        self.tracker.sweep(now)
    }

    /// The number of protocol violations attributed to `peer`.
    pub fn violations(&self, peer: &Id) -> u32 {
        self.lock_misbehaving().get(peer).cloned().unwrap_or(0)
    }

    fn lock_misbehaving(&self) -> std::sync::MutexGuard<'_, HashMap<Id, u32>> {
        self.misbehaving.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use std::time::Duration;

    fn router() -> Router {
        Router::new(Arc::new(RequestTracker::new()))
    }

    fn register(router: &Router, peer: Id, request_id: u32, kind: MessageKind) {
        let key = RequestKey::new(peer, Id::zero(), request_id);
        let deadline = Instant::now() + Duration::from_secs(10);
        router.tracker().register(key, kind, Some(Id::two()), deadline).unwrap();
    }

    #[test]
    fn test_matching_response() {
        let router = router();
        register(&router, Id::one(), 1, MessageKind::Get);
        let entry = router.on_response(Id::one(), Id::zero(), 1, MessageKind::Put).unwrap();
        assert_eq!(entry.kind, MessageKind::Get);
        assert_eq!(entry.container_id, Some(Id::two()));
    }

    #[test]
    fn test_second_put_is_stale() {
        let router = router();
        register(&router, Id::one(), 1, MessageKind::Get);
        assert!(router.on_response(Id::one(), Id::zero(), 1, MessageKind::Put).is_ok());
        assert_eq!(
            router.on_response(Id::one(), Id::zero(), 1, MessageKind::Put),
            Err(Discard::StaleResponse)
        );
    }

    #[test]
    fn test_unknown_response_is_stale() {
        let router = router();
        assert_eq!(
            router.on_response(Id::one(), Id::zero(), 99, MessageKind::Chits),
            Err(Discard::StaleResponse)
        );
        // Same request id from a peer which was never asked.
        register(&router, Id::one(), 2, MessageKind::PullQuery);
        assert_eq!(
            router.on_response(Id::two(), Id::zero(), 2, MessageKind::Chits),
            Err(Discard::StaleResponse)
        );
        assert_eq!(router.violations(&Id::two()), 0);
    }

    #[test]
    fn test_mismatched_kind_is_a_violation() {
        let router = router();
        register(&router, Id::one(), 3, MessageKind::PullQuery);
        match router.on_response(Id::one(), Id::zero(), 3, MessageKind::Put) {
            Err(Discard::ProtocolViolation { request, received: MessageKind::Put }) => {
                assert_eq!(request.kind, MessageKind::PullQuery)
            }
            other => panic!("unexpected: {:?}", other),
        }
        assert_eq!(router.violations(&Id::one()), 1);
        // The entry was consumed by the violating response.
        assert_eq!(
            router.on_response(Id::one(), Id::zero(), 3, MessageKind::Chits),
            Err(Discard::StaleResponse)
        );
    }

    #[test]
    fn test_request_kind_as_response_is_a_violation() {
        let router = router();
        register(&router, Id::one(), 4, MessageKind::GetAccepted);
        match router.on_response(Id::one(), Id::zero(), 4, MessageKind::GetAccepted) {
            Err(Discard::ProtocolViolation { .. }) => (),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_cancelled_request_is_stale() {
        let router = router();
        register(&router, Id::one(), 5, MessageKind::PushQuery);
        register(&router, Id::two(), 5, MessageKind::PushQuery);
        assert_eq!(router.cancel(&Id::zero(), 5), 2);
        assert_eq!(
            router.on_response(Id::one(), Id::zero(), 5, MessageKind::Chits),
            Err(Discard::StaleResponse)
        );
    }

    #[test]
    fn test_failure_resolves_once() {
        let router = router();
        register(&router, Id::one(), 6, MessageKind::Get);
        assert!(router.on_failure(Id::one(), Id::zero(), 6).is_some());
        assert!(router.on_failure(Id::one(), Id::zero(), 6).is_none());
    }
}
