#[macro_use]
extern crate serde_derive;
#[macro_use(Message)]
extern crate actix_derive;
extern crate colored;

pub mod genesis;
pub mod graph;
pub mod p2p;
pub mod protocol;
pub mod server;
pub mod snow;
pub mod storage;
pub mod view;
pub mod vm;
pub mod zfx_id;

#[cfg(test)]
mod integration_test;

use zfx_id::Id;

#[derive(Debug)]
pub enum Error {
    IO(std::io::Error),
    Sled(sled::Error),
    Actix(actix::MailboxError),
    Bincode(String),
    Config(String),
    Graph(graph::Error),
    TryFromStringError,

    // request tracking errors
    /// A request identifier collided with an outstanding entry for the same key.
    DuplicateRequest { peer: Id, chain_id: Id, request_id: u32 },
    /// An outbound or inbound message carried routing metadata that cannot be honoured.
    MalformedRouting(String),
    /// A wire tag outside of the nine known message kinds.
    UnknownMessageKind(u8),

    // sampling errors
    InsufficientValidators { requested: usize, available: usize },

    // consensus errors
    InvalidParameters(String),
    UnknownContainer(Id),
    MissingParents(Id),
    /// The container was already decided and cannot be polled again.
    AlreadyDecided(Id),

    // vm and genesis errors
    InvalidContainer,
    UnknownNetwork(u32),
    InvalidNetworkName(String),
    /// An alias is already bound to another identifier.
    AliasExists(String),
    UnknownChain(String),
}

impl std::error::Error for Error {}

impl std::convert::From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Error::IO(error)
    }
}

impl std::convert::From<sled::Error> for Error {
    fn from(error: sled::Error) -> Self {
        Error::Sled(error)
    }
}

impl std::convert::From<actix::MailboxError> for Error {
    fn from(error: actix::MailboxError) -> Self {
        Error::Actix(error)
    }
}

impl std::convert::From<Box<bincode::ErrorKind>> for Error {
    fn from(error: Box<bincode::ErrorKind>) -> Self {
        Error::Bincode(format!("{:?}", error))
    }
}

impl std::convert::From<config::ConfigError> for Error {
    fn from(error: config::ConfigError) -> Self {
        Error::Config(format!("{}", error))
    }
}

impl std::convert::From<graph::Error> for Error {
    fn from(error: graph::Error) -> Self {
        Error::Graph(error)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::DuplicateRequest { peer, chain_id, request_id } => write!(
                f,
                "duplicate request {} to {} on chain {}",
                request_id, peer, chain_id
            ),
            Error::UnknownMessageKind(tag) => write!(f, "unknown message kind {}", tag),
            Error::InsufficientValidators { requested, available } => write!(
                f,
                "insufficient validators: requested {}, available {}",
                requested, available
            ),
            Error::MalformedRouting(s) => write!(f, "malformed routing: {}", s),
            err => write!(f, "{:?}", err),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
