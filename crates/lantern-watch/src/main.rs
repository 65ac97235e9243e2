//! lantern-watch: print live presence for a handful of identities.
//!
//! Seeds each identity from the REST snapshot, subscribes it through one
//! shared gateway connection and prints a line for every change until
//! interrupted.

mod render;
mod settings;
mod snapshot;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use futures_util::future::join_all;
use lantern_common::Result;
use lantern_config::LanternConfig;
use lantern_presence::{ConnectionState, Identity, PresenceClient, Subscription};
use tracing::{info, warn};

use crate::snapshot::SnapshotClient;

#[derive(Parser)]
#[command(name = "lantern-watch", about = "Watch live presence for one or more identities")]
struct Args {
    /// Identities (user ids) to watch.
    #[arg(required = true)]
    identities: Vec<String>,

    /// Config file to use instead of the platform default.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Gateway WebSocket URL, overriding the config file.
    #[arg(long)]
    url: Option<String>,

    /// Skip the REST snapshot and wait for the gateway.
    #[arg(long)]
    no_snapshot: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("lantern-watch: {e}");
            return ExitCode::FAILURE;
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| settings::default_log_filter(&config).into()),
        )
        .init();

    match run(args, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "lantern-watch failed");
            ExitCode::FAILURE
        }
    }
}

fn load_config(args: &Args) -> Result<LanternConfig> {
    let config = match &args.config {
        Some(path) => lantern_config::load_config_from(path)?,
        None => lantern_config::load_config()?,
    };
    Ok(config)
}

async fn run(args: Args, config: LanternConfig) -> Result<()> {
    let identities: Vec<Identity> = args.identities.iter().map(Identity::new).collect();
    let client = PresenceClient::new(settings::client_config(&config, args.url.as_deref()));

    if config.snapshot.enabled && !args.no_snapshot {
        seed_from_snapshot(&client, &config, &identities).await?;
    }

    tokio::spawn(log_state_changes(client.clone()));

    let subscriptions: Vec<Subscription> = identities
        .iter()
        .map(|identity| {
            let label = identity.clone();
            client.subscribe(identity.clone(), move |presence| {
                println!("{}", render::describe(&label, &presence));
            })
        })
        .collect();
    info!(count = subscriptions.len(), "Watching presence");

    tokio::signal::ctrl_c().await?;
    info!("Interrupted, closing connection");

    let mut state = client.state_changes();
    drop(subscriptions);
    let closed = tokio::time::timeout(
        Duration::from_secs(2),
        state.wait_for(|s| *s == ConnectionState::Disconnected),
    )
    .await
    .is_ok();
    if !closed {
        warn!("Connection did not close in time");
    }
    Ok(())
}

/// Fetch every identity concurrently. A failed fetch only means that
/// identity starts out unknown.
async fn seed_from_snapshot(
    client: &PresenceClient,
    config: &LanternConfig,
    identities: &[Identity],
) -> Result<()> {
    let rest = SnapshotClient::new(&config.snapshot)?;
    let results = join_all(identities.iter().map(|id| rest.fetch(id))).await;

    for (identity, result) in identities.iter().zip(results) {
        match result {
            Ok(state) => {
                client.seed(identity.clone(), state);
            }
            Err(e) => warn!(identity = %identity, error = %e, "Snapshot unavailable"),
        }
    }
    Ok(())
}

async fn log_state_changes(client: PresenceClient) {
    let mut rx = client.state_changes();
    // Only the receiver is needed from here on.
    drop(client);

    while rx.changed().await.is_ok() {
        let state = *rx.borrow_and_update();
        match state {
            ConnectionState::Connected { heartbeat_interval } => info!(
                heartbeat_ms = heartbeat_interval.as_millis() as u64,
                "Connected to presence gateway"
            ),
            ConnectionState::Reconnecting { attempt, delay } => warn!(
                attempt,
                delay_ms = delay.as_millis() as u64,
                "Presence stream degraded, reconnecting"
            ),
            ConnectionState::Disconnected => info!("Disconnected from presence gateway"),
            ConnectionState::Connecting | ConnectionState::AwaitingHello => {}
        }
    }
}
