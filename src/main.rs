//! wg-controller main entry point
//!
//! This binary serves the control API, or runs a single reconcile, status or
//! down operation from the command line.

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use wg_controller::{
    config::ControllerConfig,
    control::ControlServer,
    executor::SystemExecutor,
    reconcile::Reconciler,
    security::check_privileges,
    wireguard::{ConfigStore, InterfaceConfig, InterfaceName},
    APP_NAME, VERSION,
};

/// WireGuard interface reconciliation controller
#[derive(Parser, Debug)]
#[command(name = APP_NAME, version = VERSION, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the HTTP control API
    Serve,

    /// Reconcile one interface from a configuration file
    Apply {
        /// Interface name
        #[arg(short, long)]
        interface: String,

        /// Configuration file to apply
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Show live status of an interface
    Status {
        /// Interface name
        interface: String,
    },

    /// Bring an interface down
    Down {
        /// Interface name
        interface: String,
    },

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose);

    info!("Starting {} v{}", APP_NAME, VERSION);

    // Execute command
    if let Err(e) = run(cli).await {
        error!("Error: {:#}", e);
        std::process::exit(1);
    }
}

/// Initialize structured logging with tracing
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Reconciler against the real host
fn host_reconciler(config: &ControllerConfig) -> Reconciler<SystemExecutor> {
    let executor = Arc::new(SystemExecutor::new(config.command_timeout()));
    Reconciler::new(executor, ConfigStore::new(config.storage.config_dir.clone()))
}

/// Run the CLI command
async fn run(cli: Cli) -> anyhow::Result<()> {
    if let Commands::Version = cli.command {
        println!("{} v{}", APP_NAME, VERSION);
        return Ok(());
    }

    let config = ControllerConfig::load(cli.config.as_deref()).context("loading configuration")?;
    check_privileges();

    match cli.command {
        Commands::Serve => {
            if config.uses_default_api_key() {
                warn!("Using default API key; set WIREGUARD_API_KEY before exposing the API");
            }
            info!(
                "Storing interface configurations in {}",
                config.storage.config_dir.display()
            );

            ControlServer::from_config(&config)
                .run(shutdown_signal())
                .await?;

            info!("Shutting down controller");
            Ok(())
        }
        Commands::Apply { interface, file } => {
            let name = InterfaceName::new(interface)?;
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let desired = InterfaceConfig::new(text)?;

            let outcome = host_reconciler(&config).reconcile(&name, &desired).await?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
            Ok(())
        }
        Commands::Status { interface } => {
            let name = InterfaceName::new(interface)?;
            let reconciler = host_reconciler(&config);

            if !reconciler.probe().exists(&name).await {
                println!("{}: down", name);
                return Ok(());
            }
            let status = reconciler.probe().describe(&name).await;
            println!("{}", status.wireguard_info);
            println!("{}", status.ip_info);
            Ok(())
        }
        Commands::Down { interface } => {
            let name = InterfaceName::new(interface)?;
            let result = host_reconciler(&config).bring_down(&name).await;
            if !result.succeeded {
                anyhow::bail!("wg-quick down {} failed: {}", name, result.diagnostic());
            }
            println!("{}: down", name);
            Ok(())
        }
        Commands::Version => Ok(()),
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}
