//! lotdeck - operator dashboard backend for parking lots.
//!
//! Runs the HTTP API the dashboard talks to, and provides the operator
//! bootstrap and lot import commands.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use directories::ProjectDirs;
use lotdeck_app::commands;
use lotdeck_server::{Server, ServerConfig, DEFAULT_HOST, DEFAULT_PORT};
use lotdeck_storage::Database;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// lotdeck - parking lot pricing dashboard backend
#[derive(Parser, Debug)]
#[command(name = "lotdeck", version, about)]
struct Args {
    /// Database file (defaults to the platform data directory)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API server (default)
    Serve {
        /// Address to bind to
        #[arg(long, default_value = DEFAULT_HOST)]
        host: String,

        /// Port to listen on
        #[arg(long, default_value_t = DEFAULT_PORT)]
        port: u16,
    },

    /// Create an operator account, or reset its password
    CreateOperator {
        #[arg(long)]
        email: String,

        #[arg(long)]
        password: String,

        /// Name shown in the dashboard
        #[arg(long)]
        name: Option<String>,
    },

    /// Import lots from a JSON array file
    ImportLots {
        /// Email of the operator who will own the lots
        #[arg(long)]
        operator: String,

        file: PathBuf,
    },
}

/// Get the logs directory path.
fn logs_dir() -> Option<PathBuf> {
    ProjectDirs::from("com", "lotdeck", "lotdeck").map(|dirs| dirs.data_dir().join("logs"))
}

/// Initialize console logging plus a daily-rotated log file.
fn init_logging(args: &Args) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let log_level = if args.debug { "debug" } else { &args.log_level };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "lotdeck={0},lotdeck_app={0},lotdeck_server={0},lotdeck_storage={0},warn",
            log_level
        ))
    });

    if let Some(log_dir) = logs_dir() {
        if std::fs::create_dir_all(&log_dir).is_ok() {
            let file_appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .max_log_files(7)
                .filename_prefix("lotdeck")
                .filename_suffix("log")
                .build(&log_dir)
                .ok();

            if let Some(appender) = file_appender {
                let (non_blocking, guard) = tracing_appender::non_blocking(appender);

                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt::layer().with_writer(std::io::stdout))
                    .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
                    .init();

                tracing::info!("Logging to {:?}", log_dir);
                return Some(guard);
            }
        }
    }

    // Fallback: console logging only
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    tracing::warn!("File logging unavailable, using console only");
    None
}

fn open_database(path: Option<&PathBuf>) -> anyhow::Result<Database> {
    let db = match path {
        Some(path) => Database::with_path(path)?,
        None => Database::new()?,
    };
    Ok(db)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Keep the guard alive so buffered file logs are flushed on exit.
    let _log_guard = init_logging(&args);

    tracing::debug!("Args: {:?}", args);

    let db = open_database(args.db.as_ref())?;

    let command = args.command.unwrap_or(Command::Serve {
        host: DEFAULT_HOST.to_string(),
        port: DEFAULT_PORT,
    });

    match command {
        Command::Serve { host, port } => {
            if db.count_operators()? == 0 {
                tracing::warn!("No operator accounts yet; run `lotdeck create-operator` to add one");
            }

            let config = ServerConfig::default().with_host(host).with_port(port);
            let server = Server::with_database(config, db)?;
            tracing::info!("Starting lotdeck...");
            server.run().await?;
        }
        Command::CreateOperator {
            email,
            password,
            name,
        } => {
            let id = commands::create_operator(&db, &email, &password, name)?;
            println!("Operator {email} ready (id {id})");
        }
        Command::ImportLots { operator, file } => {
            let ids = commands::import_lots(&db, &file, &operator)?;
            println!("Imported {} lots for {}", ids.len(), operator);
        }
    }

    tracing::info!("lotdeck shutting down");
    Ok(())
}
