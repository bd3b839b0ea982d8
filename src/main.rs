//! shortlinkd - Main entry point
//!
//! The daemon serves the session-authenticated admin panel for shortlink
//! records plus the public slug redirect of the shortener itself.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{Level, info, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use shortlinkd::config::{self, Config, DatabaseConfig};
use shortlinkd::db::Database;
use shortlinkd::gate::{GateSettings, build_authenticated_router};
use shortlinkd::panel::FormConfig;
use shortlinkd::session::{SessionStore, SqliteSessionStore};
use shortlinkd::shortener::{
    self, AdminDirectory, Branding, LinkStore, ShortlinkAdmin,
};

/// Shortlink admin panel daemon
#[derive(Parser)]
#[command(name = "shortlinkd")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value_os_t = Config::default_path())]
    config: PathBuf,

    /// Data directory for the database and logs
    #[arg(short, long, default_value_os_t = Config::default_data_dir())]
    data_dir: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the daemon
    Serve {
        /// Address to listen on (overrides config)
        #[arg(long)]
        listen: Option<SocketAddr>,
    },

    /// Panel administrator management
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },

    /// Generate a default configuration file
    InitConfig {
        /// Output path (defaults to stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum AdminCommands {
    /// Create a panel administrator
    Add {
        /// Username for the new administrator
        username: String,

        /// Password; prompted on stdin when omitted
        #[arg(long)]
        password: Option<String>,
    },

    /// List panel administrators
    List,

    /// Remove a panel administrator
    Remove {
        /// Username to remove
        username: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::from_default_env().add_directive(Level::DEBUG.into())
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };

    match cli.command {
        Commands::Serve { listen } => serve(&cli.config, &cli.data_dir, listen, filter).await,
        Commands::Admin { command } => {
            init_cli_logging(filter);
            handle_admin_command(command, &cli.data_dir).await
        }
        Commands::InitConfig { output } => {
            init_cli_logging(filter);
            generate_config(output)
        }
    }
}

/// Initialize logging for CLI commands (stdout only).
fn init_cli_logging(filter: EnvFilter) {
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .init();
}

/// Initialize logging for daemon mode (stdout + rotating file).
fn init_daemon_logging(data_dir: &Path, filter: EnvFilter) -> Result<()> {
    let log_dir = data_dir.join("logs");
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("Failed to create log directory: {}", log_dir.display()))?;

    // Daily rotating file appender (e.g. shortlinkd.2026-08-06.log)
    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("shortlinkd")
        .filename_suffix("log")
        .build(&log_dir)
        .with_context(|| "Failed to create log file appender")?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // Keep the writer alive for the lifetime of the daemon.
    std::mem::forget(guard);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(
            fmt::layer()
                .with_target(true)
                .with_ansi(false)
                .with_writer(non_blocking),
        )
        .init();

    info!("Logging to: {}", log_dir.display());
    Ok(())
}

/// Run the daemon
async fn serve(
    config_path: &Path,
    data_dir: &Path,
    listen_override: Option<SocketAddr>,
    base_filter: EnvFilter,
) -> Result<()> {
    ensure_data_dir(data_dir)?;
    let config = Config::load(config_path)?;

    let filter = base_filter.add_directive(
        config
            .log
            .level
            .parse()
            .with_context(|| format!("Invalid log.level: {}", config.log.level))?,
    );
    if config.log.file_disabled {
        init_cli_logging(filter);
    } else {
        init_daemon_logging(data_dir, filter)?;
    }

    let db = Database::new(&config.database, data_dir).await?;
    let pool = db.pool();

    let links = Arc::new(LinkStore::new(pool.clone()));
    let directory = Arc::new(AdminDirectory::new(pool.clone()));
    let sessions = Arc::new(SqliteSessionStore::new(
        pool,
        chrono::Duration::seconds(config.session.ttl_secs as i64),
    ));

    let panel = Arc::new(ShortlinkAdmin::new(
        config.panel.path.clone(),
        Branding {
            name: config.panel.name.clone(),
            logo: config.panel.logo.clone(),
        },
        config.panel.assets_dir.clone(),
    ));
    let actions = panel.actions(links.clone());

    let settings = GateSettings::new(
        config.session.name.clone(),
        &config.session.secret,
        config.session.cookie_domain.clone(),
        config.session.cookie_secure,
    );
    let form = FormConfig {
        max_body_bytes: config.panel.upload_limit_bytes,
    };

    let store: Arc<dyn SessionStore> = sessions.clone();
    let gated = build_authenticated_router(
        panel.clone(),
        &actions,
        directory,
        axum::Router::new(),
        store,
        settings,
        &form,
    )
    .await?;

    let app = axum::Router::new()
        .route("/health", axum::routing::get(health))
        .merge(shortener::public_router(links))
        .nest(&config.panel.path, gated);

    // Sweep expired sessions in the background.
    let cleanup_sessions = sessions.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(std::time::Duration::from_secs(300));
        loop {
            ticker.tick().await;
            match cleanup_sessions.cleanup_expired().await {
                Ok(0) => {}
                Ok(removed) => info!(count = removed, "expired sessions removed"),
                Err(e) => warn!(error = %e, "session cleanup failed"),
            }
        }
    });

    let listener = match listen_override {
        Some(addr) => tokio::net::TcpListener::bind(addr).await,
        None => {
            tokio::net::TcpListener::bind((config.web.host.as_str(), config.web.port)).await
        }
    }
    .context("Failed to bind listener")?;

    info!(
        "Admin panel online at {}:{}{}",
        if config.web.host.contains("0.0.0.0") {
            "*"
        } else {
            &config.web.host
        },
        config.web.port,
        config.panel.path
    );

    axum::serve(listener, app).await.context("Server error")
}

async fn health() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({ "status": "ok" }))
}

/// Ensure data directory exists
fn ensure_data_dir(data_dir: &Path) -> Result<()> {
    if !data_dir.exists() {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;
        info!("Created data directory: {}", data_dir.display());
    }
    Ok(())
}

/// Handle admin subcommands
async fn handle_admin_command(command: AdminCommands, data_dir: &Path) -> Result<()> {
    ensure_data_dir(data_dir)?;

    // Admin commands only need the shared database, not the full config.
    let db = Database::new(&DatabaseConfig::default(), data_dir).await?;
    let directory = AdminDirectory::new(db.pool());

    match command {
        AdminCommands::Add { username, password } => {
            let password = match password {
                Some(p) => p,
                None => prompt_password()?,
            };
            if password.len() < 8 {
                anyhow::bail!("Password must be at least 8 characters");
            }

            directory.create_user(&username, &password).await?;
            println!("Administrator '{username}' created.");
            Ok(())
        }

        AdminCommands::List => {
            let users = directory.list_users().await?;

            if users.is_empty() {
                println!("No administrators. Create one with `shortlinkd admin add <username>`.");
                return Ok(());
            }

            println!("{:<20} {:<20} {:<20}", "USERNAME", "CREATED", "LAST LOGIN");
            println!("{}", "-".repeat(60));

            for user in users {
                let created = user.created_at.format("%Y-%m-%d %H:%M");
                let last_login = user
                    .last_login
                    .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| "never".to_string());
                println!("{:<20} {:<20} {:<20}", user.username, created, last_login);
            }

            Ok(())
        }

        AdminCommands::Remove { username } => {
            directory.delete_user(&username).await?;
            println!("Administrator '{username}' removed. Existing sessions expire normally.");
            Ok(())
        }
    }
}

/// Read a password from stdin.
fn prompt_password() -> Result<String> {
    print!("Password: ");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

/// Generate a default configuration file
fn generate_config(output: Option<PathBuf>) -> Result<()> {
    let template = config::default_config_template();

    match output {
        Some(path) => {
            std::fs::write(&path, &template)?;
            println!("Configuration written to: {}", path.display());
        }
        None => {
            print!("{template}");
        }
    }

    Ok(())
}
