use super::{ChainRecord, ParsedContainer, Vm};

use crate::genesis::Genesis;
use crate::zfx_id::Id;
use crate::{Error, Result};

/// The name the memo virtual machine is registered under.
pub const MEMO_VM_NAME: &str = "memo";

/// A container of the memo virtual machine: a note with explicit dependencies and
/// conflict keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoContainer {
    pub parents: Vec<Id>,
    pub conflicts: Vec<Id>,
    pub memo: String,
}

impl MemoContainer {
    pub fn new(parents: Vec<Id>, conflicts: Vec<Id>, memo: &str) -> Self {
        MemoContainer { parents, conflicts, memo: memo.to_string() }
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// The container id, i.e. the hash of the encoded container.
    pub fn id(&self) -> Result<Id> {
        Ok(Id::new(&self.encode()?))
    }
}

/// A minimal virtual machine whose containers are bincode encoded [MemoContainer]s.
#[derive(Debug, Clone, Default)]
pub struct MemoVm;

impl MemoVm {
    pub fn vm_id() -> Id {
        Id::new(MEMO_VM_NAME.as_bytes())
    }
}

impl Vm for MemoVm {
    fn id(&self) -> Id {
        MemoVm::vm_id()
    }

    fn parse(&self, bytes: &[u8]) -> Result<ParsedContainer> {
        let container: MemoContainer =
            bincode::deserialize(bytes).map_err(|_| Error::InvalidContainer)?;
        Ok(ParsedContainer {
            id: Id::new(bytes),
            parents: container.parents,
            conflicts: container.conflicts,
        })
    }

    fn genesis_chains(&self, genesis: &[u8]) -> Result<Vec<ChainRecord>> {
        Ok(Genesis::decode(genesis)?.chains)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse() {
        let container = MemoContainer::new(vec![Id::one()], vec![Id::two()], "hello");
        let bytes = container.encode().unwrap();
        let parsed = MemoVm.parse(&bytes).unwrap();
        assert_eq!(parsed.id, container.id().unwrap());
        assert_eq!(parsed.parents, vec![Id::one()]);
        assert_eq!(parsed.conflicts, vec![Id::two()]);
    }

    #[test]
    fn test_parse_garbage() {
        match MemoVm.parse(&[1, 2, 3]) {
            Err(Error::InvalidContainer) => (),
            other => panic!("unexpected: {:?}", other),
        }
    }
}
