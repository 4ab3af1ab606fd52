use tracing::info;
use tracing_subscriber;

use clap::{value_t, App, Arg};

use actix::{Actor, Context, Handler};

use bytes::Bytes;

use zfx_snowline::genesis::{self, staker_id, STAKER_IDS};
use zfx_snowline::p2p::Switchboard;
use zfx_snowline::server::{Node, Settings};
use zfx_snowline::snow::engine::Decided;
use zfx_snowline::view::ValidatorSet;
use zfx_snowline::vm::MemoContainer;
use zfx_snowline::zfx_id::Id;
use zfx_snowline::{Error, Result};

const CHAIN: &str = "memo";

/// Logs the decisions of one node.
struct Reporter {
    node_id: Id,
}

impl Actor for Reporter {
    type Context = Context<Self>;
}

impl Handler<Decided> for Reporter {
    type Result = ();

    fn handle(&mut self, msg: Decided, _ctx: &mut Context<Self>) -> Self::Result {
        info!("{} decided {} on {}: {}", self.node_id.short(), msg.container_id, msg.chain_id, msg.status);
    }
}

// Runs the first `nodes` genesis stakers.
async fn run(nodes: usize, containers: usize, settings: Settings) -> Result<Vec<Node>> {
    let stakers = genesis::validators(settings.network_id)?;
    let ids: Vec<Id> = STAKER_IDS.iter().take(nodes).map(|name| staker_id(name)).collect();
    let validators: ValidatorSet =
        ids.iter().filter_map(|id| stakers.get(id).map(|weight| (*id, *weight))).collect();
    let switchboard = Switchboard::new();
    let mut running = vec![];
    for id in ids.into_iter() {
        let node = Node::spawn(id, &settings, validators.clone(), &switchboard)?;
        node.subscribe(CHAIN, Reporter { node_id: id }.start().recipient()).await?;
        running.push(node);
    }

    let mut parents = vec![];
    for i in 0..containers {
        let container = MemoContainer::new(parents.clone(), vec![], &format!("memo #{}", i));
        let node = &running[i % running.len()];
        let id = node.issue(CHAIN, Bytes::from(container.encode()?)).await?;
        info!("{} issued {}", node.id().short(), id);
        parents = vec![id];
    }
    Ok(running)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_level(false)
        .with_target(false)
        .without_time()
        .compact()
        .with_max_level(tracing::Level::INFO)
        .init();

    let matches = App::new("zfx-snowline")
        .version("0.1")
        .author("zero.fx labs ltd.")
        .about("Runs a network of in-process validators over loopback")
        .arg(
            Arg::with_name("nodes")
                .short("n")
                .long("nodes")
                .value_name("NODES")
                .takes_value(true)
                .default_value("5"),
        )
        .arg(
            Arg::with_name("containers")
                .short("c")
                .long("containers")
                .value_name("CONTAINERS")
                .takes_value(true)
                .default_value("3"),
        )
        .get_matches();

    let nodes = value_t!(matches.value_of("nodes"), usize).unwrap_or_else(|e| e.exit());
    let containers = value_t!(matches.value_of("containers"), usize).unwrap_or_else(|e| e.exit());

    if nodes == 0 || nodes > STAKER_IDS.len() {
        return Err(Error::InsufficientValidators { requested: nodes, available: STAKER_IDS.len() });
    }

    let mut settings = Settings::new()?;
    // The sample cannot exceed the number of peers.
    if settings.k >= nodes {
        let k = nodes.saturating_sub(1);
        settings.k = k;
        settings.alpha = k / 2 + 1;
        settings.beta1 = settings.beta1.min(4);
        settings.beta2 = settings.beta2.min(5).max(settings.beta1);
    }
    settings.parameters()?;

    let sys = actix::System::new();
    sys.block_on(async move {
        let _nodes = match run(nodes, containers, settings).await {
            Ok(nodes) => nodes,
            Err(err) => {
                tracing::error!("cannot start the network: {}", err);
                actix::System::current().stop();
                return;
            }
        };

        let sig = if cfg!(unix) {
            use futures::future::FutureExt;
            use tokio::signal::unix::{signal, SignalKind};

            let mut sigint = signal(SignalKind::interrupt()).unwrap();
            let mut sigterm = signal(SignalKind::terminate()).unwrap();

            futures::select! {
                _ = sigint.recv().fuse() => "SIGINT",
                _ = sigterm.recv().fuse() => "SIGTERM"
            }
        } else {
            tokio::signal::ctrl_c().await.unwrap();
            "Ctrl+C"
        };
        info!(target: "snowline", "Got {}, stopping...", sig);

        actix::System::current().stop();
    });
    sys.run()?;

    Ok(())
}
