//! The virtual machine seam.
//!
//! Consensus never interprets container payloads itself. A [Vm] parses raw container
//! bytes into the dependency and conflict information the vote tally needs, and reads the
//! chain creation records out of the network genesis.
mod memo;

pub use memo::{MemoContainer, MemoVm, MEMO_VM_NAME};

use crate::zfx_id::Id;
use crate::Result;

/// What consensus needs to know about a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedContainer {
    /// The content identifier of the container.
    pub id: Id,
    /// The containers this one depends on (DAG edges).
    pub parents: Vec<Id>,
    /// Application-defined conflict keys. Two containers sharing a key are mutually
    /// exclusive.
    pub conflicts: Vec<Id>,
}

/// A chain declared by the genesis of the network.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChainRecord {
    pub vm_id: Id,
    pub name: String,
    pub genesis_data: Vec<u8>,
}

impl ChainRecord {
    pub fn new(vm_id: Id, name: &str, genesis_data: Vec<u8>) -> Self {
        ChainRecord { vm_id, name: name.to_string(), genesis_data }
    }

    /// The chain identifier is derived from the creation record.
    pub fn id(&self) -> Id {
        let mut bytes = self.vm_id.bytes().to_vec();
        bytes.extend_from_slice(self.name.as_bytes());
        bytes.extend_from_slice(&self.genesis_data);
        Id::new(&bytes)
    }
}

pub trait Vm {
    /// The identifier of this virtual machine.
    fn id(&self) -> Id;

    /// Parses raw container bytes.
    fn parse(&self, bytes: &[u8]) -> Result<ParsedContainer>;

    /// The chain creation records declared by a genesis chain's bytes.
    fn genesis_chains(&self, genesis: &[u8]) -> Result<Vec<ChainRecord>>;
}
