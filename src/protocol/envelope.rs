use super::message::{Message, MessageKind};

use crate::zfx_id::Id;
use crate::Result;

use std::convert::TryFrom;

// The message variant index follows the 32 byte chain id and the 4 byte request id.
const KIND_OFFSET: usize = 36;

/// A message with the routing metadata it travels with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub chain_id: Id,
    pub request_id: u32,
    pub message: Message,
}

impl Envelope {
    pub fn new(chain_id: Id, request_id: u32, message: Message) -> Self {
        Envelope { chain_id, request_id, message }
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Decodes an envelope. A message variant outside of the nine known kinds is rejected.
    pub fn decode(bytes: &[u8]) -> Result<Envelope> {
        if let Some(tag) = bytes.get(KIND_OFFSET..KIND_OFFSET + 4) {
            let tag = u32::from_le_bytes([tag[0], tag[1], tag[2], tag[3]]);
            let _ = MessageKind::try_from(u8::try_from(tag).unwrap_or(u8::MAX))?;
        }
        Ok(bincode::deserialize(bytes)?)
    }
}
