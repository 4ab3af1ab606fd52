//! The consensus message protocol.
//!
//! Every message exchanged between validators is one of nine kinds. Request kinds fan out
//! to a set of peers, response kinds are addressed to the single peer which asked.

mod envelope;
mod message;

pub use envelope::Envelope;
pub use message::{Message, MessageKind, ALL_KINDS};
