use clap::{Parser, Subcommand};
use ferrous_mdns_domain::{CliOverrides, InterfaceChoice};
use tracing::info;

mod bootstrap;
mod commands;

#[derive(Parser)]
#[command(name = "ferrous-mdns")]
#[command(version = "0.1.0")]
#[command(about = "Ferrous mDNS - Multicast DNS responder and DNS-SD browser")]
struct Cli {
    /// Configuration file path
    #[arg(short = 'c', long, value_name = "FILE", global = true)]
    config: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Interfaces to use: "all", "default" or a comma-separated address list
    #[arg(short = 'i', long, global = true)]
    interface: Option<InterfaceChoice>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Publish a service until interrupted
    Register(commands::register::RegisterArgs),
    /// Follow instances of a service type until interrupted
    Browse(commands::browse::BrowseArgs),
    /// Resolve one instance to its host, port and properties
    Resolve(commands::resolve::ResolveArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cli_overrides = CliOverrides {
        log_level: cli.log_level.clone(),
        interfaces: cli.interface.clone(),
    };
    let config = bootstrap::load_config(cli.config.as_deref(), cli_overrides)?;

    bootstrap::init_logging(&config);

    info!("Starting Ferrous mDNS v{}", env!("CARGO_PKG_VERSION"));

    let engine = bootstrap::start_engine(&config).await?;

    let result = match cli.command {
        Command::Register(args) => commands::register::run(&engine, args).await,
        Command::Browse(args) => commands::browse::run(&engine, args).await,
        Command::Resolve(args) => commands::resolve::run(&engine, args).await,
    };

    engine.close().await;
    info!("Shutdown complete");
    result
}
