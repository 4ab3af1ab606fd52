use super::*;

use crate::colored::Colorize;
use crate::vm::Vm;

use tracing::debug;

use std::collections::{hash_map::Entry, HashMap};

/// Human readable aliases for chains and virtual machines.
///
/// Built once from the genesis of the network and passed to the components which need
/// it. Aliases can be added for chains created later on, but never removed or rebound.
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    /// `vm/<id>` and `bc/<id>` keys to their aliases.
    general: HashMap<String, Vec<String>>,
    chains: HashMap<Id, Vec<String>>,
    vms: HashMap<Id, Vec<String>>,
    /// Every chain alias to the chain it names.
    lookup: HashMap<String, Id>,
}

impl AliasTable {
    /// Builds the default aliases of the network `network_id`, reading the genesis chains
    /// through the platform `vm`.
    pub fn build(network_id: u32, vm: &dyn Vm) -> Result<AliasTable> {
        let mut table = AliasTable::default();
        for name in KNOWN_VMS.iter() {
            let id = vm_id(name);
            table.general.insert(format!("vm/{}", id), vec![format!("vm/{}", name)]);
            table.vms.insert(id, vec![name.to_string()]);
        }
        table.general.insert(
            format!("bc/{}", platform_chain_id()),
            vec!["P", "platform", "bc/P", "bc/platform"].into_iter().map(String::from).collect(),
        );
        table.bind_chain(platform_chain_id(), &["P", "platform"])?;

        let genesis_bytes = genesis(network_id)?;
        for chain in vm.genesis_chains(&genesis_bytes)? {
            let chain_id = chain.id();
            let (general, aliases): (Vec<&str>, Vec<&str>) = match chain.vm_id {
                id if id == vm_id(AVM) => (vec!["X", "avm", "bc/X", "bc/avm"], vec!["X", "avm"]),
                id if id == vm_id(EVM) => (vec!["C", "evm", "bc/C", "bc/evm"], vec!["C", "evm"]),
                id => match table.vms.get(&id).and_then(|names| names.first()).cloned() {
                    Some(name) => {
                        let key = format!("bc/{}", name);
                        table.general.insert(format!("bc/{}", chain_id), vec![key]);
                        table.bind_chain(chain_id, &[name.as_str()])?;
                        continue;
                    }
                    None => {
                        debug!("[{}] chain {} runs an unknown vm", "genesis".cyan(), chain_id);
                        continue;
                    }
                },
            };
            table.general.insert(
                format!("bc/{}", chain_id),
                general.into_iter().map(String::from).collect(),
            );
            table.bind_chain(chain_id, &aliases)?;
        }
        Ok(table)
    }

    fn bind_chain(&mut self, chain_id: Id, aliases: &[&str]) -> Result<()> {
        for alias in aliases.iter() {
            self.alias_chain(chain_id, alias)?;
        }
        Ok(())
    }

    /// Adds `alias` for `chain_id`. Re-adding an existing binding is a no-op, binding an
    /// alias which already names another chain fails.
    pub fn alias_chain(&mut self, chain_id: Id, alias: &str) -> Result<()> {
        match self.lookup.entry(alias.to_string()) {
            Entry::Occupied(o) => {
                if *o.get() != chain_id {
                    return Err(Error::AliasExists(alias.to_string()));
                }
                Ok(())
            }
            Entry::Vacant(v) => {
                v.insert(chain_id);
                self.chains.entry(chain_id).or_insert_with(Vec::new).push(alias.to_string());
                Ok(())
            }
        }
    }

    pub fn chain_aliases(&self, chain_id: &Id) -> &[String] {
        self.chains.get(chain_id).map(|a| a.as_slice()).unwrap_or(&[])
    }

    pub fn vm_aliases(&self, vm_id: &Id) -> &[String] {
        self.vms.get(vm_id).map(|a| a.as_slice()).unwrap_or(&[])
    }

    pub fn general_aliases(&self, key: &str) -> &[String] {
        self.general.get(key).map(|a| a.as_slice()).unwrap_or(&[])
    }

    /// Resolves a chain from one of its aliases or its base58check id.
    pub fn resolve_chain(&self, name: &str) -> Result<Id> {
        if let Some(id) = self.lookup.get(name) {
            return Ok(*id);
        }
        name.parse::<Id>().map_err(|_| Error::UnknownChain(name.to_string()))
    }
}
