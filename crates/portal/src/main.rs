use anyhow::Result;
use clap::Parser;
use log::{debug, error, LevelFilter};
use portal::{
    start_server, AutoExtendWorker, LoopHeartbeats, RedisStore, ServerMode, StoreContext,
};
use shared::grid::GridClient;
use shared::wallet::WalletClient;
use std::sync::Arc;
use tokio::task::JoinSet;
use url::Url;

#[derive(Parser)]
struct Args {
    /// Server mode
    #[arg(long, value_enum, default_value = "full")]
    mode: ServerMode,

    /// Bind address
    #[arg(short = 'e', long, default_value = "0.0.0.0")]
    host: String,

    /// Port
    #[arg(short = 'p', long, default_value = "8090")]
    port: u16,

    /// Redis store url
    #[arg(short = 's', long, default_value = "redis://localhost:6380")]
    redis_store_url: String,

    /// Grid explorer url, also decides the network users consent to
    #[arg(long, default_value = "https://explorer.testnet.grid.tf/api/v1")]
    explorer_url: String,

    /// Stellar-bridge wallet service url
    #[arg(long, default_value = "http://localhost:8060")]
    wallet_service_url: String,

    /// Secret the login service signs session tokens with
    #[arg(long)]
    session_secret: String,

    /// Admin names seeded into an empty admin set
    #[arg(long)]
    initial_admin: Vec<String>,

    /// Auto-extend interval in seconds
    #[arg(short = 'i', long, default_value = "300")]
    extend_interval: u64,

    /// Log level
    #[arg(short = 'l', long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let log_level = match args.log_level.as_str() {
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "info" => LevelFilter::Info,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Info,
    };
    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();

    debug!("Log level: {}", log_level);
    debug!("Server mode: {:?}", args.mode);

    let explorer_url: Url = args.explorer_url.parse().unwrap_or_else(|err| {
        error!("Invalid explorer url: {:?}", err);
        std::process::exit(1);
    });
    let wallet_service_url: Url = args.wallet_service_url.parse().unwrap_or_else(|err| {
        error!("Invalid wallet service url: {:?}", err);
        std::process::exit(1);
    });

    let store = Arc::new(RedisStore::new(&args.redis_store_url)?);
    let store_context = Arc::new(StoreContext::new(store.clone()));
    store_context.admin_store.seed(&args.initial_admin).await?;

    let grid = Arc::new(GridClient::new(explorer_url));
    let wallet = Arc::new(WalletClient::new(wallet_service_url));
    let heartbeats = Arc::new(LoopHeartbeats::new(&args.mode));

    let mut tasks: JoinSet<Result<()>> = JoinSet::new();

    if args.mode == ServerMode::Full {
        let extender_store_context = store_context.clone();
        let extender_grid = grid.clone();
        let extender_wallet = wallet.clone();
        let extender_heartbeats = heartbeats.clone();
        let extend_interval = args.extend_interval;
        tasks.spawn(async move {
            let worker = AutoExtendWorker::new(
                extender_store_context,
                extender_grid,
                extender_wallet,
                extend_interval,
                extender_heartbeats,
            );
            worker.run().await
        });
    }

    tokio::select! {
        res = start_server(
            &args.host,
            args.port,
            store_context.clone(),
            grid.clone(),
            wallet.clone(),
            args.session_secret,
            heartbeats.clone(),
            store.clone(),
            args.explorer_url,
        ) => {
            if let Err(e) = res {
                error!("Server error: {}", e);
            }
        }
        Some(res) = tasks.join_next() => {
            if let Err(e) = res? {
                error!("Task error: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            error!("Shutdown signal received");
        }
    }

    tasks.shutdown().await;
    Ok(())
}
