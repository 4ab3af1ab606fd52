//! Network genesis state and naming.
//!
//! The platform chain defines the genesis state of the whole network (which chains
//! exist and which virtual machine runs each of them), so defining the genesis of the
//! platform chain is the same as defining the genesis of the network.
mod aliases;
mod network;

pub use aliases::AliasTable;
pub use network::*;

use crate::view::{ValidatorSet, Weight};
use crate::vm::{ChainRecord, MemoVm};
use crate::zfx_id::Id;
use crate::{Error, Result};

/// Names of the virtual machines known at genesis. Their ids are derived from the names.
pub const PLATFORM_VM: &str = "platform";
pub const AVM: &str = "avm";
pub const EVM: &str = "evm";
pub const SPDAG_VM: &str = "spdag";
pub const SPCHAIN_VM: &str = "spchain";
pub const TIMESTAMP_VM: &str = "timestamp";

pub const KNOWN_VMS: [&str; 7] =
    [PLATFORM_VM, AVM, EVM, SPDAG_VM, SPCHAIN_VM, TIMESTAMP_VM, crate::vm::MEMO_VM_NAME];

/// The stakers of the local network. Each validates with unit weight from genesis on.
pub const STAKER_IDS: [&str; 5] = [
    "7Xhw2mDxuDS44j42TCB6U5579esbSt3Lg",
    "MFrZFVCXPv5iCn6M9K6XduxGTYp891xXZ",
    "NFBbbJ4qCmNaCzeW7sxErhvWqvEQMnYcN",
    "GWPcbFJZFfZreETSoWjPimr846mXEKCtu",
    "P7oB2McjBGgW2NXXWVYjV8JEDFoW9xDE5",
];

/// Addresses funded at genesis.
pub const ADDRESSES: [&str; 1] = ["6Y3kysjF9jnHnYkdS9yGAuoHyae2eNmeV"];

const STAKER_WEIGHT: Weight = 1;

/// The node id of a genesis staker.
pub fn staker_id(name: &str) -> Id {
    Id::new(name.as_bytes())
}

pub fn vm_id(name: &str) -> Id {
    Id::new(name.as_bytes())
}

/// The platform chain always has the empty id.
pub fn platform_chain_id() -> Id {
    Id::zero()
}

/// The genesis state of the platform chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genesis {
    pub network_id: u32,
    pub accounts: Vec<Id>,
    pub validators: Vec<(Id, Weight)>,
    pub chains: Vec<ChainRecord>,
    pub timestamp: u64,
}

impl Genesis {
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Genesis> {
        Ok(bincode::deserialize(bytes)?)
    }

    pub fn validator_set(&self) -> ValidatorSet {
        self.validators.iter().cloned().collect()
    }
}

/// Returns the genesis bytes of the network `network_id`. Only the local network has a
/// genesis; it declares the local stakers and a single memo chain.
pub fn genesis(network_id: u32) -> Result<Vec<u8>> {
    if network_id != LOCAL_ID {
        return Err(Error::UnknownNetwork(network_id));
    }
    let genesis = Genesis {
        network_id,
        accounts: ADDRESSES.iter().map(|address| Id::new(address.as_bytes())).collect(),
        validators: STAKER_IDS.iter().map(|name| (staker_id(name), STAKER_WEIGHT)).collect(),
        chains: vec![ChainRecord::new(MemoVm::vm_id(), "memo", vec![])],
        timestamp: 0,
    };
    genesis.encode()
}

/// The validators of the network `network_id` at genesis.
pub fn validators(network_id: u32) -> Result<ValidatorSet> {
    Ok(Genesis::decode(&genesis(network_id)?)?.validator_set())
}

/// The creation record of the genesis chain running `vm_id`, if there is one.
pub fn vm_genesis(network_id: u32, vm_id: &Id) -> Result<Option<ChainRecord>> {
    let genesis = Genesis::decode(&genesis(network_id)?)?;
    Ok(genesis.chains.into_iter().find(|chain| chain.vm_id == *vm_id))
}
