//! Outbound consensus messaging.
//!
//! The sender turns consensus intents into messages and records request-style calls
//! with the request tracker. The dispatcher actor hands messages to the transport. The
//! router matches responses against the tracker and drops the ones nobody is waiting for.
pub mod backoff;
pub mod dispatcher;
pub mod loopback;
pub mod prelude;
pub mod request_tracker;
pub mod router;
pub mod sender;

// Asserting sender for exercising the messaging boundary in tests.
#[cfg(any(test, feature = "expect_sender"))]
pub mod expect_sender;

pub use backoff::ExponentialBackoff;
pub use dispatcher::{Dispatch, Dispatcher, Inbound, SendFailed, Transport};
pub use loopback::{LoopbackTransport, Switchboard};
pub use request_tracker::{Outstanding, RequestKey, RequestTracker};
pub use router::{Discard, Router};
pub use sender::{Outbound, OutboundSender, Sender};

#[cfg(any(test, feature = "expect_sender"))]
pub use expect_sender::ExpectSender;
