use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use zonekeeper::{
    config::Config,
    error::DnsError,
    server::DnsServer,
    zone::{ZoneLoader, ZoneRegistry},
};

/// Authoritative DNS server answering from lazily loaded zone files
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "configuration.toml")]
    config: PathBuf,

    /// Log filter used when RUST_LOG is not set
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Err(e) = run(args).await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), DnsError> {
    let config = Config::load(&args.config)?;
    let registry = Arc::new(ZoneRegistry::from_config(&config));
    info!(
        "Serving {} zones on {} addresses",
        registry.zones().len(),
        registry.addresses().len()
    );

    let server = DnsServer::bind(registry).await?;
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            // Keep the sender alive so the server is not told to stop
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl-C, shutting down");
        let _ = shutdown_tx.send(());
    });

    start_reload_handler(server.loader())?;

    server.run(shutdown_rx).await
}

/// SIGHUP drops the active zone so the next query re-reads its file
#[cfg(unix)]
fn start_reload_handler(loader: Arc<ZoneLoader>) -> Result<(), DnsError> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sighup = signal(SignalKind::hangup())?;
    tokio::spawn(async move {
        while sighup.recv().await.is_some() {
            info!("Received SIGHUP, dropping active zone");
            loader.invalidate();
        }
    });
    Ok(())
}

#[cfg(not(unix))]
fn start_reload_handler(_loader: Arc<ZoneLoader>) -> Result<(), DnsError> {
    Ok(())
}
