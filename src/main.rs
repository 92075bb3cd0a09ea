use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use storegate::{gateway, shell::Shell, Config, Database, Gate};

/// Product catalog behind a login gate.
#[derive(Parser, Debug)]
#[command(name = "storegate", version, about)]
struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// SQLite database path, overriding `[store] path`
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the web UI and JSON API
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
    /// Interactive terminal session
    Shell,
    /// Create the schema and print the database path
    Init,
    /// List registered users
    Users,
}

fn init_tracing(default_level: &str) {
    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn open_gate(config: &Config) -> Result<Gate> {
    let db = Database::open(&config.store.path)
        .with_context(|| format!("Failed to open store at {}", config.store.path.display()))?;
    Ok(Gate::new(db, config.auth.allow_registration))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(db) = cli.db {
        config.store.path = db;
    }
    init_tracing(&config.log.level);

    match cli.command {
        Commands::Serve { host, port } => {
            let host = host.unwrap_or_else(|| config.gateway.host.clone());
            let port = port.unwrap_or(config.gateway.port);
            gateway::run_gateway(&host, port, &config).await
        }
        Commands::Shell => {
            let gate = open_gate(&config)?;
            tokio::task::block_in_place(|| Shell::new(gate).run())
        }
        Commands::Init => {
            open_gate(&config)?;
            println!("Store ready at {}", config.store.path.display());
            Ok(())
        }
        Commands::Users => {
            let gate = open_gate(&config)?;
            let users = gate.credentials().list_users()?;
            if users.is_empty() {
                println!("No registered users.");
            }
            for user in users {
                println!("{:>4}  {:<50}  {}", user.id, user.name, user.email);
            }
            Ok(())
        }
    }
}
