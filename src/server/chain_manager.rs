//! Routes inbound traffic and request failures to the engine of each chain.
use crate::colored::Colorize;
use crate::genesis::AliasTable;
use crate::p2p::{Inbound, RequestKey, Router, SendFailed};
use crate::protocol::Envelope;
use crate::snow::engine::{Decided, Deliver, Engine, GetStatus, Issue, Subscribe, Unresponsive};
use crate::snow::Status;
use crate::zfx_id::Id;
use crate::{Error, Result};

use actix::{Actor, Addr, AsyncContext, Context, Handler, Recipient, ResponseFuture};

use bytes::Bytes;

use tokio::time::Duration;

use tracing::{debug, info, warn};

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

pub struct ChainManager {
    node_id: Id,
    aliases: AliasTable,
    router: Arc<Router>,
    engines: HashMap<Id, Addr<Engine>>,
    sweep_interval: Duration,
}

impl ChainManager {
    pub fn new(node_id: Id, aliases: AliasTable, router: Arc<Router>, sweep_interval: Duration) -> Self {
        ChainManager { node_id, aliases, router, engines: HashMap::default(), sweep_interval }
    }

    /// Routes the traffic of `chain_id` to `engine`, and names it `alias` if given.
    pub fn register(&mut self, chain_id: Id, engine: Addr<Engine>, alias: Option<&str>) -> Result<()> {
        if let Some(alias) = alias {
            self.aliases.alias_chain(chain_id, alias)?;
        }
        let _ = self.engines.insert(chain_id, engine);
        Ok(())
    }

    fn engine(&self, chain: &str) -> Result<Addr<Engine>> {
        let chain_id = self.aliases.resolve_chain(chain)?;
        self.engines.get(&chain_id).cloned().ok_or_else(|| Error::UnknownChain(chain.to_string()))
    }

    // Hands expired requests to the engines which sent them.
    fn sweep(&mut self) {
        let expired = self.router.sweep(Instant::now());
        if !expired.is_empty() {
            debug!("[{}] {} requests timed out", "chains".magenta(), expired.len());
        }
        for (key, request) in expired.into_iter() {
            match self.engines.get(&key.chain_id) {
                Some(engine) => engine.do_send(Unresponsive { key, request }),
                None => debug!("[{}] timeout on unknown chain {}", "chains".magenta(), key.chain_id),
            }
        }
    }
}

impl Actor for ChainManager {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Context<Self>) {
        info!("[{}] {} routing {} chains", "chains".magenta(), self.node_id.short(), self.engines.len());
        let _ = ctx.run_interval(self.sweep_interval, |act, _ctx| act.sweep());
    }
}

impl Handler<Inbound> for ChainManager {
    type Result = ();

    fn handle(&mut self, msg: Inbound, _ctx: &mut Context<Self>) -> Self::Result {
        let envelope = match Envelope::decode(&msg.bytes) {
            Ok(envelope) => envelope,
            Err(err) => {
                warn!("[{}] undecodable message from {}: {}", "chains".magenta(), msg.from.short(), err);
                return;
            }
        };
        match self.engines.get(&envelope.chain_id) {
            Some(engine) => engine.do_send(Deliver {
                from: msg.from,
                chain_id: envelope.chain_id,
                request_id: envelope.request_id,
                message: envelope.message,
            }),
            None => debug!(
                "[{}] {} from {} for unknown chain {}",
                "chains".magenta(),
                envelope.message.kind(),
                msg.from.short(),
                envelope.chain_id
            ),
        }
    }
}

impl Handler<SendFailed> for ChainManager {
    type Result = ();

    fn handle(&mut self, msg: SendFailed, _ctx: &mut Context<Self>) -> Self::Result {
        // Only requests are tracked, failed responses need no follow-up.
        let request = match self.router.on_failure(msg.peer, msg.chain_id, msg.request_id) {
            Some(request) => request,
            None => return,
        };
        if let Some(engine) = self.engines.get(&msg.chain_id) {
            let key = RequestKey::new(msg.peer, msg.chain_id, msg.request_id);
            engine.do_send(Unresponsive { key, request });
        }
    }
}

/// Issues a container on the chain named `chain` (an alias or an id).
#[derive(Debug, Clone, Message)]
#[rtype(result = "Result<Id>")]
pub struct IssueTo {
    pub chain: String,
    pub container: Bytes,
}

impl Handler<IssueTo> for ChainManager {
    type Result = ResponseFuture<Result<Id>>;

    fn handle(&mut self, msg: IssueTo, _ctx: &mut Context<Self>) -> Self::Result {
        let engine = self.engine(&msg.chain);
        Box::pin(async move { engine?.send(Issue { container: msg.container }).await? })
    }
}

/// The status of a container on the chain named `chain`.
#[derive(Debug, Clone, Message)]
#[rtype(result = "Result<Status>")]
pub struct StatusOf {
    pub chain: String,
    pub container_id: Id,
}

impl Handler<StatusOf> for ChainManager {
    type Result = ResponseFuture<Result<Status>>;

    fn handle(&mut self, msg: StatusOf, _ctx: &mut Context<Self>) -> Self::Result {
        let engine = self.engine(&msg.chain);
        Box::pin(async move {
            let status = engine?.send(GetStatus { container_id: msg.container_id }).await?;
            Ok(status)
        })
    }
}

/// Subscribes to the decisions of the chain named `chain`.
#[derive(Clone, Message)]
#[rtype(result = "Result<()>")]
pub struct SubscribeTo {
    pub chain: String,
    pub recipient: Recipient<Decided>,
}

impl Handler<SubscribeTo> for ChainManager {
    type Result = Result<()>;

    fn handle(&mut self, msg: SubscribeTo, _ctx: &mut Context<Self>) -> Self::Result {
        let engine = self.engine(&msg.chain)?;
        engine.do_send(Subscribe { recipient: msg.recipient });
        Ok(())
    }
}
