//! mangrove-admin: admin dashboard daemon for mangrove carbon-credit projects
//!
//! Serves the dashboard API over one registry session backed by a SQLite
//! store in the data directory.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tracing::{debug, info, warn};

use mangrove_admin::config::{Config, DEFAULT_CONFIG_FILE};
use mangrove_admin::dashboard::{create_router, DashboardState};
use mangrove_admin::registry::Registry;
use mangrove_admin::store::{SqliteBackend, Store};

#[derive(Parser)]
#[command(name = "mangrove-admin")]
#[command(about = "Admin dashboard for mangrove carbon-credit monitoring")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Data directory
    #[arg(short, long, env = "MANGROVE_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// HTTP port (overrides config file)
    #[arg(short, long, env = "MANGROVE_HTTP_PORT")]
    port: Option<u16>,

    /// Keep data for this session only
    #[arg(long)]
    in_memory: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("mangrove_admin=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    info!("Starting mangrove-admin");
    info!("Config file: {}", cli.config.display());

    let mut config = Config::load(&cli.config)?;

    // Apply CLI overrides
    if let Some(data_dir) = cli.data_dir {
        config.node.data_dir = data_dir;
    }
    if let Some(port) = cli.port {
        config.api.http_port = port;
    }

    let store = if cli.in_memory {
        info!("Using session-only store");
        Store::in_memory()
    } else {
        match SqliteBackend::open(&config.node.data_dir) {
            Ok(backend) => {
                info!("Data dir: {}", config.node.data_dir.display());
                Store::new(backend)
            }
            Err(e) => {
                warn!(
                    error = %e,
                    "Failed to open dashboard store, changes will not survive restart"
                );
                Store::in_memory()
            }
        }
    };

    let registry =
        Registry::open(store).with_recent_limit(config.views.recent_activity_limit);

    // Trace each published view
    let mut views = registry.subscribe();
    tokio::spawn(async move {
        while views.changed().await.is_ok() {
            let rendered = views.borrow_and_update();
            debug!(
                revision = rendered.revision,
                changed = ?rendered.changed,
                "Dashboard views refreshed"
            );
        }
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], config.api.http_port));
    let state = DashboardState::new(&config, registry).shared();
    let app = create_router(state, &config.api.static_dir);

    info!("Dashboard listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
