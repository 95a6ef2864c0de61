use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use showroom::leads::{self, Dealer};
use showroom::manager::{self, SystemProfile};
use showroom::seed;
use showroom::server::{self, AppState};
use showroom::store::{CatalogStore, LogStore, MemoryStore};

#[derive(Parser, Clone, Debug)]
#[clap(author, version, about = "Motorcycle showroom API", long_about = None)]
struct Args {
    #[clap(long, default_value = "127.0.0.1:5000")]
    addr: SocketAddr,

    /// Segment file holding the showroom log.
    #[clap(long, default_value = "showroom_log.dat")]
    data: PathBuf,

    /// Keep everything in memory; nothing survives a restart.
    #[clap(long)]
    memory: bool,

    /// Start with an empty showroom instead of the default floor stock.
    #[clap(long)]
    no_seed: bool,

    /// Dealer WhatsApp number, digits only with country code.
    #[clap(long, default_value = leads::DEFAULT_PHONE)]
    whatsapp_number: String,

    /// Name used to greet the dealer in offer enquiries.
    #[clap(long, default_value = leads::DEFAULT_DEALER)]
    dealer_name: String,

    /// Seconds between background log compactions; 0 disables them.
    #[clap(long, default_value = "600")]
    compact_every: u64,
}

fn main() {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info,showroom=info");
    }
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_level(true)
        .init();

    let args = Args::parse();
    let profile = SystemProfile::detect();

    info!("--- [Showroom Resource Manager] ---");
    info!("Detected Cores: {}", profile.logical_cores);
    info!("Worker Threads: {}", profile.worker_threads);
    info!(
        "Durability Mode: {}",
        if profile.strict_durability { "Strict (Fsync)" } else { "High Throughput (Buffered)" }
    );

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .worker_threads(profile.worker_threads)
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            error!("failed to start runtime: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(async_main(args, profile)) {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn async_main(args: Args, profile: SystemProfile) -> showroom::Result<()> {
    let dealer = Dealer::new(args.whatsapp_number, args.dealer_name)?;

    let store: Arc<dyn CatalogStore> = if args.memory {
        info!("Using in-memory store");
        Arc::new(MemoryStore::new())
    } else {
        info!("Opening showroom log at {}", args.data.display());
        let log = Arc::new(LogStore::open(&args.data, profile.strict_durability)?);
        if args.compact_every > 0 {
            manager::start_compaction_thread(log.clone(), Duration::from_secs(args.compact_every));
        }
        log
    };

    if !args.no_seed {
        seed::seed_if_empty(store.as_ref())?;
    }

    let state = Arc::new(AppState::new(store, dealer));
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Shutting down.");
    };

    server::serve(state, args.addr, shutdown).await
}
