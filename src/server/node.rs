use crate::colored::Colorize;
use crate::genesis::{self, AliasTable};
use crate::p2p::{Dispatcher, OutboundSender, RequestTracker, Router, Sender, Switchboard};
use crate::server::chain_manager::{ChainManager, IssueTo, StatusOf, SubscribeTo};
use crate::server::Settings;
use crate::snow::engine::{Bootstrap, Decided, Engine, EngineConfig};
use crate::snow::Status;
use crate::storage::{SledStorage, Storage};
use crate::view::ValidatorSet;
use crate::vm::{MemoVm, Vm, MEMO_VM_NAME};
use crate::zfx_id::Id;
use crate::{Error, Result};

use actix::{Actor, Addr, Recipient};

use bytes::Bytes;

use tracing::info;

use std::sync::Arc;

/// A validator running the memo chain of the network in the current actor system.
pub struct Node {
    node_id: Id,
    chain_id: Id,
    router: Arc<Router>,
    manager: Addr<ChainManager>,
    engine: Addr<Engine>,
}

impl Node {
    /// Starts the actors of node `node_id` and connects it to `switchboard`. Must be called
    /// from within a running actor system.
    pub fn spawn(
        node_id: Id,
        settings: &Settings,
        validators: ValidatorSet,
        switchboard: &Switchboard,
    ) -> Result<Node> {
        let params = settings.parameters()?;
        let vm = MemoVm;
        let chain_id = match genesis::vm_genesis(settings.network_id, &vm.id())? {
            Some(chain) => chain.id(),
            None => return Err(Error::UnknownChain(MEMO_VM_NAME.to_string())),
        };
        let aliases = AliasTable::build(settings.network_id, &vm)?;

        let tracker = Arc::new(RequestTracker::new());
        let router = Arc::new(Router::new(tracker.clone()));
        let dispatcher = Dispatcher::new(Arc::new(switchboard.transport(node_id))).start();
        let sender: Arc<dyn Sender> = Arc::new(OutboundSender::new(
            tracker,
            dispatcher.recipient(),
            settings.request_timeout(),
        ));
        let storage: Arc<dyn Storage + Send + Sync> = Arc::new(SledStorage::temporary()?);

        let config = EngineConfig {
            node_id,
            chain_id,
            params,
            sampling: settings.sampling,
            backoff: settings.backoff(),
        };
        let engine =
            Engine::new(config, Arc::new(vm), storage, sender, router.clone(), validators).start();

        let mut manager =
            ChainManager::new(node_id, aliases, router.clone(), settings.sweep_interval());
        manager.register(chain_id, engine.clone(), None)?;
        let manager = manager.start();
        switchboard.connect(node_id, manager.clone().recipient(), manager.clone().recipient());

        info!("[{}] {} is running chain {}", "node".green(), node_id, chain_id);
        Ok(Node { node_id, chain_id, router, manager, engine })
    }

    pub fn id(&self) -> Id {
        self.node_id
    }

    /// The memo chain this node validates.
    pub fn chain_id(&self) -> Id {
        self.chain_id
    }

    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    /// Starts frontier discovery on the memo chain.
    pub fn bootstrap(&self) {
        self.engine.do_send(Bootstrap);
    }

    /// Issues a container on the chain named `chain`.
    pub async fn issue(&self, chain: &str, container: Bytes) -> Result<Id> {
        self.manager.send(IssueTo { chain: chain.to_string(), container }).await?
    }

    pub async fn status(&self, chain: &str, container_id: Id) -> Result<Status> {
        self.manager.send(StatusOf { chain: chain.to_string(), container_id }).await?
    }

    pub async fn subscribe(&self, chain: &str, recipient: Recipient<Decided>) -> Result<()> {
        self.manager.send(SubscribeTo { chain: chain.to_string(), recipient }).await?
    }
}
