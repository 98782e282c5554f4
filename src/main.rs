use std::env;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use forumd::config::Config;
use forumd::notify::LogMailer;
use forumd::permission::PermissionEnforcer;
use forumd::render::MarkdownRenderer;
use forumd::state::AppState;
use forumd::{db, routes};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    if args.iter().any(|arg| arg == "-help" || arg == "--help") {
        println!("Usage: forumd [OPTIONS]");
        println!("Options:");
        println!("  -config <path>  Path to configuration file (default: ./etc/forumd.toml)");
        println!("  -help, --help   Print this help message");
        return Ok(());
    }

    let config_path = args
        .iter()
        .skip_while(|arg| arg.as_str() != "-config")
        .nth(1)
        .map(|s| s.to_string())
        .unwrap_or_else(|| "./etc/forumd.toml".to_string());

    // Load configuration first (before logging init)
    let config = Config::load(&config_path).unwrap_or_else(|e| {
        eprintln!("Could not load config file: {}, using defaults", e);
        Config::default()
    });

    // Initialize logging
    // Priority: RUST_LOG env var > config file > default "info"
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log.level));

    fmt::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .init();

    info!("Starting Forumd server...");
    info!("Loading configuration from: {}", config_path);

    // Initialize database connection
    let db_conn = db::init_database(&config.database).await.map_err(|e| {
        tracing::error!("Database initialization failed: {}", e);
        anyhow::anyhow!("Database initialization failed: {}", e)
    })?;

    // Initialize permission enforcer
    let perm = PermissionEnforcer::new(
        db_conn.clone(),
        config
            .casbin_conf
            .to_str()
            .unwrap_or("./etc/casbin_model.conf"),
    )
    .await
    .map_err(|e| {
        tracing::error!("Permission enforcer initialization failed: {}", e);
        anyhow::anyhow!("Permission enforcer initialization failed: {}", e)
    })?;
    info!("Permission enforcer initialized");

    // Make sure a fresh installation has an administrator
    perm.ensure_admin(&config.discussion.admin_user).await?;

    // Create application state
    let state = AppState::new(
        db_conn,
        perm,
        config.clone(),
        Arc::new(LogMailer),
        Arc::new(MarkdownRenderer),
    );

    // Create router
    let app = routes::create_router(state);

    // Parse address
    let addr: SocketAddr = config.addr.parse().unwrap_or_else(|_| {
        tracing::warn!("Invalid address '{}', using default 0.0.0.0:8080", config.addr);
        "0.0.0.0:8080".parse().unwrap()
    });

    info!("Server listening on {}", addr);

    // Start server
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
