//! PlayUR REST queue CLI - send requests through the durable queue and inspect
//! its snapshots.

mod app;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use playur_config_and_utils::{init_logging, Config, Paths};

/// PlayUR REST queue command-line interface.
#[derive(Parser)]
#[command(name = "playur-rest")]
#[command(about = "Send PlayUR REST requests through the durable retry queue")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error). Defaults to the configured level
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Base directory for config, snapshots and logs. Defaults to <data dir>/playur
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Enqueue requests and deliver them in order, retrying transient failures
    Send {
        /// HTTP method (GET, POST, PUT)
        #[arg(short, long, default_value = "GET")]
        method: String,

        /// Endpoint relative to the server URL; repeat to queue several
        #[arg(short, long)]
        endpoint: Vec<String>,

        /// Absolute URL; repeat to queue several (queued after endpoints)
        #[arg(long)]
        url: Vec<String>,

        /// Request body (usually JSON)
        #[arg(short, long)]
        body: Option<String>,

        /// Drop request bodies from memory and snapshots once delivered
        #[arg(long)]
        clear_body: bool,

        /// Session id stamped into snapshots
        #[arg(long)]
        session_id: Option<i64>,

        /// Game id stamped into snapshots
        #[arg(long)]
        game_id: Option<i64>,

        /// User stamped into snapshots
        #[arg(long)]
        user: Option<String>,
    },
    /// Decode a queue snapshot and print its contents
    Inspect {
        /// Snapshot file. Defaults to the configured snapshot location
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Print the whole snapshot as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the effective configuration
    Config,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let paths = match cli.base_dir {
        Some(base) => Paths::with_base_dir(base),
        None => Paths::new()?,
    };
    let config = Config::load(&paths)?;
    paths.ensure_dirs()?;

    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| config.log_level.clone());
    init_logging("playur-rest", &level, &paths);

    match cli.command {
        Commands::Send {
            method,
            endpoint,
            url,
            body,
            clear_body,
            session_id,
            game_id,
            user,
        } => {
            let args = app::SendArgs {
                method: method.parse()?,
                endpoints: endpoint,
                urls: url,
                body: body.map(String::into_bytes),
                clear_body,
                session: app::session_from_flags(session_id, game_id, user),
            };
            app::send(&config, &paths, args)?;
        }
        Commands::Inspect { file, json } => {
            let path = file.unwrap_or_else(|| paths.snapshot_file(&config.snapshot_file_name));
            app::inspect(&path, json)?;
        }
        Commands::Config => {
            app::show_config(&config, &paths)?;
        }
    }

    Ok(())
}
