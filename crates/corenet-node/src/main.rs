// Path: crates/corenet-node/src/main.rs
#![forbid(unsafe_code)]

//! Thin wiring binary: starts the worker pool, transport registry,
//! cluster membership, global-DB, and the CLI/JSON-RPC admin channel in
//! one process, then idles until `SIGINT`. Grounded on the shape of
//! `ioi-local.rs`: parse opts, materialize a data directory, stand up
//! each subsystem in turn, `tokio::select!` on shutdown.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::Parser;

use corenet_cluster::{ClusterRegistry, LinkManager, LinkManagerCallbacks};
use corenet_config::Config;
use corenet_gdb::GlobalDb;
use corenet_reactor::WorkerPool;
use corenet_rpc::{AccessControl, CommandRegistry, Dispatcher, RateLimiter, ResponseValue};
use corenet_telemetry::http::Readiness;
use corenet_telemetry::LogFormat;
use corenet_transport::TransportRegistry;

#[derive(Parser, Debug)]
#[clap(name = "corenet-node", about = "corenet peer process")]
struct NodeOpts {
    /// Directory holding this node's persisted state (`gdb-<driver>`, config overlays).
    #[clap(long, default_value = "./corenet-data")]
    data_dir: PathBuf,

    /// Global-DB storage backend. Only `redb` is concretely implemented.
    #[clap(long, default_value = "redb")]
    gdb_driver: String,

    /// Number of reactor worker threads.
    #[clap(long, default_value_t = 4)]
    workers: usize,

    /// Idle-close timeout for TCP-client-like event-sockets.
    #[clap(long, default_value_t = 30)]
    connection_timeout_sec: u64,

    /// How long an erased/tombstoned record may be discarded after.
    #[clap(long, default_value_t = 86_400)]
    store_time_limit_sec: u64,

    /// Address the `/metrics`, `/healthz`, `/readyz` endpoints listen on.
    #[clap(long, default_value = "127.0.0.1:9090")]
    telemetry_addr: String,

    /// Address the CLI/JSON-RPC admin channel listens on.
    #[clap(long, default_value = "127.0.0.1:9191")]
    admin_addr: String,

    /// Optional Unix-domain socket path for the admin channel, in addition
    /// to the TCP listener.
    #[clap(long)]
    admin_socket: Option<PathBuf>,

    /// Whether non-loopback, non-Unix-domain admin connections may reach
    /// allow-listed commands at all.
    #[clap(long, default_value_t = false)]
    allowed_cmd_control: bool,

    /// Token-bucket refill rate for remote admin-channel callers, in
    /// requests per second. Loopback and Unix-domain callers are exempt.
    #[clap(long, default_value_t = 20.0)]
    rpc_rate_limit_rps: f64,

    /// Token-bucket burst size for remote admin-channel callers.
    #[clap(long, default_value_t = 40.0)]
    rpc_rate_limit_burst: f64,

    /// `json` for one JSON object per line, `pretty` for ANSI text.
    #[clap(long, default_value = "json")]
    log_format: String,

    /// Maximum link-connect attempts before the link manager gives up.
    #[clap(long, default_value_t = 5)]
    max_link_attempts: u32,

    /// Delay before retrying a failed link.
    #[clap(long, default_value_t = 10)]
    reconnect_delay_sec: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let opts = NodeOpts::parse();
    corenet_telemetry::init_tracing(LogFormat::parse(&opts.log_format))
        .context("failed to initialize tracing")?;

    std::fs::create_dir_all(&opts.data_dir)
        .with_context(|| format!("creating data dir {:?}", opts.data_dir))?;

    let prometheus_sink: &'static corenet_telemetry::prometheus::PrometheusSink =
        Box::leak(Box::new(corenet_telemetry::prometheus::PrometheusSink::new()?));
    corenet_telemetry::sinks::install(prometheus_sink);

    let config = Config::open(&opts.data_dir, "corenet").unwrap_or_default();
    let store_time_limit_sec =
        config.get_item_int("general", "store_time_limit_sec", opts.store_time_limit_sec as i64) as u64;

    tracing::info!(target: "node", data_dir = %opts.data_dir.display(), "starting corenet node");

    let gdb_driver = corenet_gdb::open_driver(&opts.gdb_driver, &opts.data_dir)
        .with_context(|| format!("opening global-db driver {:?}", opts.gdb_driver))?;
    let gdb = Arc::new(GlobalDb::new(gdb_driver, store_time_limit_sec));

    let pool = Arc::new(WorkerPool::worker_init(opts.workers, opts.connection_timeout_sec));
    // No concrete transport backend ships in this workspace; the registry
    // stays empty until one registers against it, which is itself
    // spec-faithful (a null transport falls back to the platform default).
    let transports = Arc::new(TransportRegistry::new());
    let clusters = Arc::new(ClusterRegistry::new());
    let links = Arc::new(LinkManager::new(
        opts.max_link_attempts,
        opts.reconnect_delay_sec,
        LinkManagerCallbacks::default(),
    ));
    links.set_active(true);

    let readiness = Readiness::new();
    let telemetry_addr: SocketAddr = opts
        .telemetry_addr
        .parse()
        .with_context(|| format!("invalid telemetry address {:?}", opts.telemetry_addr))?;
    let telemetry_readiness = readiness.clone();
    tokio::spawn(async move {
        if let Err(e) = corenet_telemetry::http::serve(telemetry_addr, telemetry_readiness).await {
            tracing::error!(target: "node", error = %e, "telemetry server exited");
        }
    });

    let registry = Arc::new(build_command_registry(
        gdb.clone(),
        clusters.clone(),
        pool.clone(),
        transports.clone(),
    ));
    let access = AccessControl::new(opts.allowed_cmd_control).allow("status");
    let rate_limiter = RateLimiter::new(opts.rpc_rate_limit_rps, opts.rpc_rate_limit_burst);
    let dispatcher = Arc::new(Dispatcher::new(registry, access).with_rate_limiter(rate_limiter));

    let admin_addr: SocketAddr = opts
        .admin_addr
        .parse()
        .with_context(|| format!("invalid admin address {:?}", opts.admin_addr))?;
    let admin_dispatcher = dispatcher.clone();
    tokio::spawn(async move {
        if let Err(e) = corenet_rpc::serve_tcp(admin_addr, admin_dispatcher).await {
            tracing::error!(target: "node", error = %e, "admin channel (tcp) exited");
        }
    });

    if let Some(socket_path) = opts.admin_socket.clone() {
        let socket_dispatcher = dispatcher.clone();
        tokio::spawn(async move {
            if let Err(e) = corenet_rpc::serve_unix(&socket_path, socket_dispatcher).await {
                tracing::error!(target: "node", error = %e, "admin channel (unix) exited");
            }
        });
    }

    readiness.mark_ready();
    tracing::info!(
        target: "node",
        workers = opts.workers,
        telemetry_addr = %telemetry_addr,
        admin_addr = %admin_addr,
        "node is ready"
    );

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!(target: "node", "shutdown signal received");
        }
    }

    links.set_active(false);
    pool.shutdown_all().await;
    gdb.driver().flush().map_err(|e| anyhow!("flush on shutdown: {e}"))?;

    Ok(())
}

fn build_command_registry(
    gdb: Arc<GlobalDb>,
    clusters: Arc<ClusterRegistry>,
    pool: Arc<WorkerPool>,
    transports: Arc<TransportRegistry>,
) -> CommandRegistry {
    let registry = CommandRegistry::new();

    let status = registry.register(
        "status",
        "reports worker, cluster, and registered-transport counts",
        Arc::new(move |_params| {
            Ok(ResponseValue::Json(serde_json::json!({
                "workers": pool.len(),
                "clusters": clusters.len(),
                "transports": transports.len(),
            })))
        }),
    );
    if let Err(e) = status {
        tracing::error!(target: "node", error = %e, "failed to register the 'status' command");
    }

    let gdb_groups = registry.register(
        "gdb.groups",
        "lists group names matching a shell-glob mask (params: [mask])",
        Arc::new(move |params| {
            let mask = params.first().and_then(|v| v.as_str()).unwrap_or("*").to_string();
            match gdb.driver().get_groups_by_mask(&mask) {
                Ok(groups) => Ok(ResponseValue::Json(serde_json::json!(groups))),
                Err(e) => Err(vec![corenet_rpc::CommandError::new(-2, e.to_string())]),
            }
        }),
    );
    if let Err(e) = gdb_groups {
        tracing::error!(target: "node", error = %e, "failed to register the 'gdb.groups' command");
    }

    registry
}
