use crate::zfx_id::Id;
use crate::{Error, Result};

use bytes::Bytes;

use std::collections::HashSet;
use std::convert::TryFrom;

/// The kind of a consensus message, without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MessageKind {
    GetAcceptedFrontier,
    AcceptedFrontier,
    GetAccepted,
    Accepted,
    Get,
    Put,
    PushQuery,
    PullQuery,
    Chits,
}

/// The nine kinds, in wire tag order.
pub const ALL_KINDS: [MessageKind; 9] = [
    MessageKind::GetAcceptedFrontier,
    MessageKind::AcceptedFrontier,
    MessageKind::GetAccepted,
    MessageKind::Accepted,
    MessageKind::Get,
    MessageKind::Put,
    MessageKind::PushQuery,
    MessageKind::PullQuery,
    MessageKind::Chits,
];

impl MessageKind {
    /// Whether this kind opens an exchange (and is therefore tracked until answered).
    pub fn is_request(&self) -> bool {
        match self {
            MessageKind::GetAcceptedFrontier
            | MessageKind::GetAccepted
            | MessageKind::Get
            | MessageKind::PushQuery
            | MessageKind::PullQuery => true,
            MessageKind::AcceptedFrontier
            | MessageKind::Accepted
            | MessageKind::Put
            | MessageKind::Chits => false,
        }
    }

    /// The only kind which may answer a request of this kind, `None` for response kinds.
    pub fn expected_response(&self) -> Option<MessageKind> {
        match self {
            MessageKind::GetAcceptedFrontier => Some(MessageKind::AcceptedFrontier),
            MessageKind::GetAccepted => Some(MessageKind::Accepted),
            MessageKind::Get => Some(MessageKind::Put),
            MessageKind::PushQuery | MessageKind::PullQuery => Some(MessageKind::Chits),
            _ => None,
        }
    }

    pub fn tag(&self) -> u8 {
        match self {
            MessageKind::GetAcceptedFrontier => 0,
            MessageKind::AcceptedFrontier => 1,
            MessageKind::GetAccepted => 2,
            MessageKind::Accepted => 3,
            MessageKind::Get => 4,
            MessageKind::Put => 5,
            MessageKind::PushQuery => 6,
            MessageKind::PullQuery => 7,
            MessageKind::Chits => 8,
        }
    }
}

impl TryFrom<u8> for MessageKind {
    type Error = Error;

    fn try_from(tag: u8) -> Result<Self> {
        ALL_KINDS.get(tag as usize).cloned().ok_or(Error::UnknownMessageKind(tag))
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// A consensus message together with its payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Message {
    /// Asks for the peer's accepted frontier.
    GetAcceptedFrontier,
    /// The containers the sender considers accepted and without undecided descendants.
    AcceptedFrontier { container_ids: HashSet<Id> },
    /// Asks which of `container_ids` the peer considers accepted.
    GetAccepted { container_ids: HashSet<Id> },
    /// The subset of the asked containers which the sender considers accepted.
    Accepted { container_ids: HashSet<Id> },
    /// Asks for the bytes of a container.
    Get { container_id: Id },
    /// Carries the bytes of a container.
    Put { container_id: Id, container: Bytes },
    /// Asks for a vote on a container, carrying the container.
    PushQuery { container_id: Id, container: Bytes },
    /// Asks for a vote on a container which the peer is expected to know.
    PullQuery { container_id: Id },
    /// The sender's preferred containers.
    Chits { votes: HashSet<Id> },
}

impl Message {
    pub fn kind(&self) -> MessageKind {
        match self {
            Message::GetAcceptedFrontier => MessageKind::GetAcceptedFrontier,
            Message::AcceptedFrontier { .. } => MessageKind::AcceptedFrontier,
            Message::GetAccepted { .. } => MessageKind::GetAccepted,
            Message::Accepted { .. } => MessageKind::Accepted,
            Message::Get { .. } => MessageKind::Get,
            Message::Put { .. } => MessageKind::Put,
            Message::PushQuery { .. } => MessageKind::PushQuery,
            Message::PullQuery { .. } => MessageKind::PullQuery,
            Message::Chits { .. } => MessageKind::Chits,
        }
    }

    /// The single container a message refers to, if any. Recorded alongside outstanding
    /// requests.
    pub fn container_ref(&self) -> Option<Id> {
        match self {
            Message::Get { container_id }
            | Message::Put { container_id, .. }
            | Message::PushQuery { container_id, .. }
            | Message::PullQuery { container_id } => Some(*container_id),
            _ => None,
        }
    }
}
