//! itdesk-portal - IT service desk and asset management portal
//!
//! Serves the JSON API, localized pages and the event stream, and carries
//! the database maintenance commands (`seed`, `reset`, `seed-minimal`) and
//! the locale report (`locales`).

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use itdesk_common::config::{
    load_toml_config_or_default, CliOverrides, PortalConfig, RootFolderInitializer,
    RootFolderResolver,
};
use itdesk_common::db::init::init_database;
use itdesk_common::db::sessions::purge_expired_sessions;
use itdesk_common::locale::validation_report;
use itdesk_common::seed::{reset_database, seed_database, seed_minimal};
use itdesk_portal::{build_router, AppState};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info, warn};

/// How often idle rate-limit keys and expired sessions are dropped
const HOUSEKEEPING_INTERVAL: Duration = Duration::from_secs(300);

#[derive(Debug, Parser)]
#[command(name = "itdesk-portal", version, about = "IT service desk portal")]
struct Cli {
    /// Root folder holding the database
    #[arg(long, global = true)]
    root_folder: Option<PathBuf>,

    /// Config file (defaults to ~/.config/itdesk/config.toml)
    #[arg(long, env = "ITDESK_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Log level filter, overridden by RUST_LOG
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP service (default)
    Serve {
        #[arg(long)]
        bind: Option<String>,
        #[arg(long)]
        port: Option<u16>,
        /// Directory with extra or overriding locale bundles
        #[arg(long)]
        locales_dir: Option<PathBuf>,
    },
    /// Replace all data with the demo data set
    Seed,
    /// Delete all data
    Reset,
    /// Insert only the two demo login accounts
    SeedMinimal,
    /// Print the locale completeness report
    Locales {
        #[arg(long)]
        locales_dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let toml_config = load_toml_config_or_default(cli.config.as_deref());

    let mut overrides = CliOverrides {
        log_level: cli.log_level.clone(),
        ..Default::default()
    };
    match &cli.command {
        Some(Command::Serve {
            bind,
            port,
            locales_dir,
        }) => {
            overrides.bind_address = bind.clone();
            overrides.port = *port;
            overrides.locales_dir = locales_dir.clone();
        }
        Some(Command::Locales { locales_dir }) => {
            overrides.locales_dir = locales_dir.clone();
        }
        _ => {}
    }
    let config = PortalConfig::resolve(&overrides, &toml_config);

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .init();

    // Build identification first, before any database delay
    info!(
        "Starting ITDESK portal (itdesk-portal) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    if let Some(Command::Locales { .. }) = &cli.command {
        let registry = itdesk_common::locale::LocaleRegistry::new(
            config.default_locale.clone(),
            config.locales_dir.clone(),
        );
        print!("{}", validation_report(&registry, &registry.available_locales()));
        return Ok(());
    }

    let root_folder = RootFolderResolver::new("portal")
        .with_cli_arg(cli.root_folder.clone())
        .with_toml(&toml_config)
        .resolve();
    let initializer = RootFolderInitializer::new(root_folder)
        .with_database_file(toml_config.database_file.as_deref());
    initializer
        .ensure_directory_exists()
        .context("Failed to initialize root folder")?;

    let db_path = initializer.database_path();
    info!("Database: {}", db_path.display());
    let pool = match init_database(&db_path).await {
        Ok(pool) => pool,
        Err(e) => {
            error!("Failed to open database: {}", e);
            return Err(e.into());
        }
    };

    match cli.command {
        Some(Command::Seed) => {
            let counts = seed_database(&pool).await?;
            info!(
                "Seeded {} users, {} tickets, {} assets, {} licenses",
                counts.users, counts.tickets, counts.assets, counts.licenses
            );
            println!("Demo login: user@company.com / password123");
            println!("Demo login: admin@company.com / admin123");
            Ok(())
        }
        Some(Command::Reset) => {
            reset_database(&pool).await?;
            info!("All data deleted");
            Ok(())
        }
        Some(Command::SeedMinimal) => {
            let created = seed_minimal(&pool).await?;
            info!("Created {} login users", created);
            Ok(())
        }
        Some(Command::Serve { .. }) | None => serve(pool, config).await,
        Some(Command::Locales { .. }) => Ok(()),
    }
}

async fn serve(pool: SqlitePool, config: PortalConfig) -> Result<()> {
    let listen_address = config.listen_address();
    let state = AppState::new(pool, config);

    let locales = state.registry.available_locales();
    info!("Locales available: {}", locales.join(", "));

    spawn_housekeeping(state.clone());

    let app = build_router(state.clone());
    let listener = tokio::net::TcpListener::bind(&listen_address)
        .await
        .with_context(|| format!("Failed to bind {}", listen_address))?;
    info!("itdesk-portal listening on http://{}", listen_address);
    info!("Health check: http://{}/health", listen_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state))
        .await?;

    info!("itdesk-portal stopped");
    Ok(())
}

fn spawn_housekeeping(state: AppState) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(HOUSEKEEPING_INTERVAL);
        loop {
            interval.tick().await;
            state.rate_limiter.retain_recent();
            if let Err(e) = purge_expired_sessions(&state.db).await {
                warn!("Session cleanup failed: {}", e);
            }
        }
    });
}

async fn shutdown_signal(state: AppState) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
    state.begin_shutdown();
}
