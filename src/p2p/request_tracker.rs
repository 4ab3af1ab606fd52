//! Outstanding request bookkeeping.
//!
//! Every request-style message sent to a peer is recorded under the key
//! `(peer, chain, request id)` until it is answered, reported as failed or times out.
//! Entries are spread over independently locked shards so that concurrent rounds on
//! different chains only contend when their keys land in the same shard.
use super::prelude::*;

use crate::protocol::MessageKind;

use priority_queue::PriorityQueue;

use std::cmp::Reverse;
use std::collections::hash_map::DefaultHasher;
use std::collections::{hash_map::Entry, HashMap};
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;

const DEFAULT_SHARDS: usize = 16;

/// Identifies one outstanding request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestKey {
    pub peer: Id,
    pub chain_id: Id,
    pub request_id: u32,
}

impl RequestKey {
    pub fn new(peer: Id, chain_id: Id, request_id: u32) -> Self {
        RequestKey { peer, chain_id, request_id }
    }
}

/// What was sent under a [RequestKey].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outstanding {
    /// The kind of the request which was sent.
    pub kind: MessageKind,
    /// The container the request refers to, if any.
    pub container_id: Option<Id>,
    pub deadline: Instant,
}

#[derive(Default)]
struct Shard {
    entries: HashMap<RequestKey, Outstanding>,
    deadlines: PriorityQueue<RequestKey, Reverse<Instant>>,
    /// Number of outstanding entries per request id.
    ids: HashMap<u32, usize>,
}

impl Shard {
    fn remove(&mut self, key: &RequestKey) -> Option<Outstanding> {
        let entry = self.entries.remove(key)?;
        let _ = self.deadlines.remove(key);
        if let Entry::Occupied(mut o) = self.ids.entry(key.request_id) {
            *o.get_mut() -= 1;
            if *o.get() == 0 {
                let _ = o.remove();
            }
        }
        Some(entry)
    }
}

pub struct RequestTracker {
    next: AtomicU32,
    /// Set once the id counter has wrapped; from then on fresh ids are checked against
    /// the outstanding ones.
    wrapped: AtomicBool,
    shards: Vec<Mutex<Shard>>,
}

impl Default for RequestTracker {
    fn default() -> Self {
        RequestTracker::new()
    }
}

impl RequestTracker {
    pub fn new() -> Self {
        RequestTracker::starting_at(0)
    }

    /// A tracker whose first fresh request id is `request_id`.
    pub fn starting_at(request_id: u32) -> Self {
        let shards = (0..DEFAULT_SHARDS).map(|_| Mutex::new(Shard::default())).collect();
        RequestTracker { next: AtomicU32::new(request_id), wrapped: AtomicBool::new(false), shards }
    }

    fn shard(&self, key: &RequestKey) -> MutexGuard<'_, Shard> {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        let i = (hasher.finish() % self.shards.len() as u64) as usize;
        lock(&self.shards[i])
    }

    /// Allocates a fresh request id. Ids increase monotonically; after the counter wraps
    /// an id is only handed out again once no entry carries it.
    pub fn new_request_id(&self) -> u32 {
        loop {
            let id = self.next.fetch_add(1, Ordering::Relaxed);
            if id == u32::MAX {
                self.wrapped.store(true, Ordering::Relaxed);
            }
            if !self.wrapped.load(Ordering::Relaxed) || !self.is_outstanding_id(id) {
                return id;
            }
        }
    }

    fn is_outstanding_id(&self, request_id: u32) -> bool {
        self.shards.iter().any(|shard| lock(shard).ids.contains_key(&request_id))
    }

    /// Records an outstanding request. Fails with `DuplicateRequest` if the key is
    /// already outstanding.
    pub fn register(
        &self,
        key: RequestKey,
        kind: MessageKind,
        container_id: Option<Id>,
        deadline: Instant,
    ) -> Result<()> {
        let mut shard = self.shard(&key);
        match shard.entries.entry(key) {
            Entry::Occupied(_) => {
                return Err(Error::DuplicateRequest {
                    peer: key.peer,
                    chain_id: key.chain_id,
                    request_id: key.request_id,
                })
            }
            Entry::Vacant(v) => {
                v.insert(Outstanding { kind, container_id, deadline });
            }
        }
        let _ = shard.deadlines.push(key, Reverse(deadline));
        *shard.ids.entry(key.request_id).or_insert(0) += 1;
        Ok(())
    }

    /// Removes and returns the entry for `key`. Unknown or already resolved keys yield
    /// `None`; late and duplicate responses are expected.
    pub fn resolve(&self, key: &RequestKey) -> Option<Outstanding> {
        let entry = self.shard(key).remove(key);
        if entry.is_none() {
            debug!(
                "[{}] no outstanding request {} for {} on {}",
                "tracker".cyan(),
                key.request_id,
                key.peer.short(),
                key.chain_id.short()
            );
        }
        entry
    }

    pub fn contains(&self, key: &RequestKey) -> bool {
        self.shard(key).entries.contains_key(key)
    }

    /// Removes every entry of `request_id` on `chain_id`, returning the removed keys.
    /// Responses arriving afterwards are stale.
    pub fn cancel(&self, chain_id: &Id, request_id: u32) -> Vec<RequestKey> {
        let mut cancelled = vec![];
        for shard in self.shards.iter() {
            let mut shard = lock(shard);
            if !shard.ids.contains_key(&request_id) {
                continue;
            }
            let keys: Vec<RequestKey> = shard
                .entries
                .keys()
                .filter(|k| k.request_id == request_id && k.chain_id == *chain_id)
                .cloned()
                .collect();
            for key in keys {
                let _ = shard.remove(&key);
                cancelled.push(key);
            }
        }
        cancelled
    }

    /// Removes and yields every entry whose deadline is at or before `now`.
    pub fn sweep(&self, now: Instant) -> Vec<(RequestKey, Outstanding)> {
        let mut expired = vec![];
        for shard in self.shards.iter() {
            let mut shard = lock(shard);
            loop {
                let key = match shard.deadlines.peek() {
                    Some((key, Reverse(deadline))) if *deadline <= now => *key,
                    _ => break,
                };
                if let Some(entry) = shard.remove(&key) {
                    expired.push((key, entry));
                }
            }
        }
        expired
    }

    pub fn len(&self) -> usize {
        self.shards.iter().map(|shard| lock(shard).entries.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// A panic while holding a shard cannot leave an entry half-written, so a poisoned lock is
// still usable.
fn lock(shard: &Mutex<Shard>) -> MutexGuard<'_, Shard> {
    shard.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod test {
    use super::*;

    use std::collections::HashSet;
    use std::sync::Arc;
    use std::time::Duration;

    fn key(peer: Id, request_id: u32) -> RequestKey {
        RequestKey::new(peer, Id::one(), request_id)
    }

    #[test]
    fn test_request_ids_increase() {
        let tracker = RequestTracker::new();
        let a = tracker.new_request_id();
        let b = tracker.new_request_id();
        assert!(b > a);
    }

    #[test]
    fn test_register_and_resolve() {
        let tracker = RequestTracker::new();
        let deadline = Instant::now() + Duration::from_secs(1);
        let k = key(Id::two(), 1);
        tracker.register(k, MessageKind::Get, Some(Id::one()), deadline).unwrap();
        assert!(tracker.contains(&k));
        let entry = tracker.resolve(&k).unwrap();
        assert_eq!(entry.kind, MessageKind::Get);
        assert_eq!(entry.container_id, Some(Id::one()));
        // A second resolution finds nothing and does not fail.
        assert_eq!(tracker.resolve(&k), None);
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_resolve_unknown_key() {
        let tracker = RequestTracker::new();
        assert_eq!(tracker.resolve(&key(Id::two(), 42)), None);
    }

    #[test]
    fn test_duplicate_request() {
        let tracker = RequestTracker::new();
        let deadline = Instant::now();
        let k = key(Id::two(), 3);
        tracker.register(k, MessageKind::PullQuery, None, deadline).unwrap();
        match tracker.register(k, MessageKind::PullQuery, None, deadline) {
            Err(Error::DuplicateRequest { request_id: 3, .. }) => (),
            other => panic!("unexpected: {:?}", other),
        }
        // Same request id to another peer is a different key.
        tracker.register(key(Id::one(), 3), MessageKind::PullQuery, None, deadline).unwrap();
        assert_eq!(tracker.len(), 2);
    }

    #[test]
    fn test_sweep() {
        let tracker = RequestTracker::new();
        let now = Instant::now();
        let early = key(Id::one(), 1);
        let late = key(Id::two(), 2);
        tracker.register(early, MessageKind::Get, None, now).unwrap();
        tracker
            .register(late, MessageKind::Get, None, now + Duration::from_secs(10))
            .unwrap();

        let expired = tracker.sweep(now + Duration::from_millis(1));
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].0, early);
        assert!(!tracker.contains(&early));
        assert!(tracker.contains(&late));
        assert!(tracker.sweep(now + Duration::from_millis(2)).is_empty());
        assert_eq!(tracker.sweep(now + Duration::from_secs(11)).len(), 1);
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_cancel() {
        let tracker = RequestTracker::new();
        let deadline = Instant::now();
        for peer in vec![Id::one(), Id::two(), Id::generate()] {
            tracker.register(key(peer, 9), MessageKind::PullQuery, None, deadline).unwrap();
        }
        tracker.register(key(Id::one(), 10), MessageKind::PullQuery, None, deadline).unwrap();
        let other_chain = RequestKey::new(Id::one(), Id::two(), 9);
        tracker.register(other_chain, MessageKind::PullQuery, None, deadline).unwrap();

        assert_eq!(tracker.cancel(&Id::one(), 9).len(), 3);
        assert_eq!(tracker.resolve(&key(Id::one(), 9)), None);
        assert!(tracker.contains(&key(Id::one(), 10)));
        assert!(tracker.contains(&other_chain));
    }

    #[test]
    fn test_wrapped_ids_skip_outstanding() {
        let tracker = RequestTracker::starting_at(u32::MAX);
        let deadline = Instant::now();
        assert_eq!(tracker.new_request_id(), u32::MAX);
        tracker.register(key(Id::one(), 0), MessageKind::Get, None, deadline).unwrap();
        // 0 is still outstanding after the wrap, so it is skipped.
        assert_eq!(tracker.new_request_id(), 1);
    }

    #[test]
    fn test_concurrent_registration() {
        let tracker = Arc::new(RequestTracker::new());
        let mut handles = vec![];
        for _ in 0..8 {
            let tracker = tracker.clone();
            handles.push(std::thread::spawn(move || {
                let mut ids = vec![];
                for _ in 0..100 {
                    let id = tracker.new_request_id();
                    let k = RequestKey::new(Id::one(), Id::two(), id);
                    tracker.register(k, MessageKind::Get, None, Instant::now()).unwrap();
                    ids.push(id);
                }
                ids
            }));
        }
        let mut all = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(all.insert(id));
            }
        }
        assert_eq!(tracker.len(), 800);
    }
}
