//! An asserting [Sender] decorator for tests.
//!
//! Each of the nine kinds can be forbidden with [ExpectSender::cant]. Calling a forbidden
//! kind without an explicit handler installed panics, which surfaces unintended coupling
//! at the messaging boundary. Every call is recorded, and calls which are neither
//! forbidden nor handled are forwarded to the wrapped sender.
use super::prelude::*;
use super::sender::{Outbound, Sender};

use crate::protocol::{MessageKind, ALL_KINDS};

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

type CallHandler = Arc<dyn Fn(&Outbound) -> Result<u32> + Send + Sync>;

#[derive(Default)]
struct Expectations {
    cant: HashSet<MessageKind>,
    handlers: HashMap<MessageKind, CallHandler>,
    calls: Vec<Outbound>,
}

pub struct ExpectSender {
    inner: Option<Arc<dyn Sender>>,
    expectations: Mutex<Expectations>,
    next_request_id: AtomicU32,
}

impl ExpectSender {
    /// Wraps `inner`; nothing is forbidden until [ExpectSender::cant] is called.
    pub fn wrap(inner: Arc<dyn Sender>) -> Self {
        ExpectSender {
            inner: Some(inner),
            expectations: Mutex::new(Expectations::default()),
            next_request_id: AtomicU32::new(0),
        }
    }

    /// A sender without a network behind it. Calls which are allowed but unhandled
    /// succeed, request-style ones with locally allocated ids.
    pub fn detached() -> Self {
        ExpectSender {
            inner: None,
            expectations: Mutex::new(Expectations::default()),
            next_request_id: AtomicU32::new(0),
        }
    }

    fn expectations(&self) -> std::sync::MutexGuard<'_, Expectations> {
        self.expectations.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Forbids `kinds` unless a handler is installed for them.
    pub fn cant(&self, kinds: &[MessageKind]) {
        self.expectations().cant.extend(kinds.iter().cloned());
    }

    pub fn cant_all(&self) {
        self.cant(&ALL_KINDS);
    }

    /// Lifts the prohibition on `kinds`.
    pub fn can(&self, kinds: &[MessageKind]) {
        let mut expectations = self.expectations();
        for kind in kinds.iter() {
            let _ = expectations.cant.remove(kind);
        }
    }

    /// Installs `handler` for `kind`. Handled calls are never forwarded. The handler runs
    /// unlocked and may call back into the sender.
    pub fn expect<F>(&self, kind: MessageKind, handler: F)
    where
        F: Fn(&Outbound) -> Result<u32> + Send + Sync + 'static,
    {
        let _ = self.expectations().handlers.insert(kind, Arc::new(handler));
    }

    pub fn clear(&self, kind: MessageKind) {
        let _ = self.expectations().handlers.remove(&kind);
    }

    /// Every call made so far, in order, with the request id it was sent under.
    pub fn calls(&self) -> Vec<Outbound> {
        self.expectations().calls.clone()
    }

    pub fn calls_of(&self, kind: MessageKind) -> Vec<Outbound> {
        self.calls().into_iter().filter(|call| call.kind() == kind).collect()
    }

    /// Forgets the recorded calls.
    pub fn take_calls(&self) -> Vec<Outbound> {
        std::mem::take(&mut self.expectations().calls)
    }
}

// Records the call with the request id it was sent under.
fn stamped(mut outbound: Outbound, result: &Result<u32>) -> Outbound {
    if let Ok(request_id) = result {
        outbound.request_id = Some(*request_id);
    }
    outbound
}

impl Sender for ExpectSender {
    fn send(&self, outbound: Outbound) -> Result<u32> {
        let kind = outbound.kind();
        let mut expectations = self.expectations();
        if let Some(handler) = expectations.handlers.get(&kind).cloned() {
            drop(expectations);
            let result = handler(&outbound);
            self.expectations().calls.push(stamped(outbound, &result));
            return result;
        }
        if expectations.cant.contains(&kind) {
            expectations.calls.push(outbound.clone());
            // Unlock first so that the panic does not poison the expectations.
            drop(expectations);
            panic!("unexpectedly called {} on chain {}", kind, outbound.chain_id);
        }
        drop(expectations);
        let result = match self.inner.as_ref() {
            Some(inner) => inner.send(outbound.clone()),
            None => match outbound.request_id {
                Some(request_id) => Ok(request_id),
                None => Ok(self.next_request_id.fetch_add(1, Ordering::Relaxed)),
            },
        };
        self.expectations().calls.push(stamped(outbound, &result));
        result
    }
}
