use std::panic;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use clap::Parser;
use signal_hook::consts::{SIGHUP, SIGINT, SIGTERM};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use fleetdash::app::{self, App, Executor};
use fleetdash::ci::{CiClient, GhCli};
use fleetdash::config::{self, Config};
use fleetdash::fleet::{AwsCli, FleetClient};
use fleetdash::logging;

/// Terminal dashboard for a fleet of container services.
#[derive(Debug, Parser)]
#[command(name = "fleetdash", version, about)]
struct Args {
    /// AWS region of the cluster.
    #[arg(long, default_value = config::DEFAULT_REGION)]
    region: String,

    /// ECS cluster name.
    #[arg(long, default_value = config::DEFAULT_CLUSTER)]
    cluster: String,

    /// GitHub repository (owner/name) hosting the deploy workflows.
    #[arg(long, default_value = config::DEFAULT_REPO)]
    repo: String,

    /// Name of the application load balancer.
    #[arg(long, default_value = config::DEFAULT_ALB)]
    alb: String,

    /// Path to workers.json. Defaults to $LJHOME/config/workers.json.
    #[arg(long)]
    workers_json: Option<PathBuf>,

    /// Directory for the rolling log file.
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Seconds between automatic dashboard refreshes.
    #[arg(long, default_value_t = 30)]
    refresh_secs: u64,
}

fn build_config(args: &Args) -> Config {
    let mut config = Config {
        cluster: args.cluster.clone(),
        region: args.region.clone(),
        repo: args.repo.clone(),
        alb_name: args.alb.clone(),
        refresh_interval: Duration::from_secs(args.refresh_secs.max(1)),
        ..Config::default()
    };

    match config::workers_json_path(args.workers_json.as_deref()) {
        Some(path) => match config::load_workers(&path) {
            Ok((catalog, chain)) => {
                info!(path = %path.display(), workers = catalog.workers.len(), "loaded worker catalog");
                config.workers = catalog;
                if let Some(chain) = chain.filter(|c| !c.is_empty()) {
                    config.rollout_chain = chain;
                }
            }
            Err(e) => warn!(error = %e, "worker catalog unavailable, workers will be uncategorized"),
        },
        None => warn!("LJHOME not set and no --workers-json given, workers will be uncategorized"),
    }
    config
}

fn register_signals(flag: &Arc<AtomicBool>) {
    for signal in [SIGTERM, SIGINT, SIGHUP] {
        if let Err(e) = signal_hook::flag::register(signal, Arc::clone(flag)) {
            warn!(signal, error = %e, "failed to register signal handler");
        }
    }
}

/// Leave the alternate screen before the default hook prints the panic.
fn install_panic_hook() {
    let prev = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        app::restore_terminal();
        error!(panic = %info, "panicked");
        prev(info);
    }));
}

fn main() -> ExitCode {
    let args = Args::parse();

    let log_dir = args.log_dir.clone().unwrap_or_else(logging::default_log_dir);
    let _guard = match logging::init(&log_dir) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("fleetdash: logging disabled: {e}");
            None
        }
    };

    let config = build_config(&args);
    info!(cluster = %config.cluster, region = %config.region, "starting");

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .worker_threads(2)
        .build()
    {
        Ok(rt) => Arc::new(rt),
        Err(e) => {
            eprintln!("fleetdash: failed to start runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    let fleet: Arc<dyn FleetClient> = Arc::new(AwsCli::new(&config));
    let checkout = std::env::var_os("LJHOME").map(PathBuf::from);
    let ci: Arc<dyn CiClient> = Arc::new(GhCli::new(checkout));

    // Fail fast on missing credentials or a wrong cluster, before the screen is taken over.
    if let Err(e) = rt.block_on(fleet.list_service_names()) {
        error!(error = %e, "cannot reach cluster");
        eprintln!("fleetdash: cannot list services in {}: {e}", config.cluster);
        return ExitCode::FAILURE;
    }

    let should_quit = Arc::new(AtomicBool::new(false));
    register_signals(&should_quit);
    install_panic_hook();

    let (tx, rx) = mpsc::unbounded_channel();
    let executor = Executor::new(rt.handle().clone(), fleet, ci, &config, tx);

    let result = app::run(App::new(config), executor, rx, should_quit);
    match result {
        Ok(()) => {
            info!("exited");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "terminal loop failed");
            eprintln!("fleetdash: {e}");
            ExitCode::FAILURE
        }
    }
}
