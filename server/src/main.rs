use std::{
    net::{SocketAddr, ToSocketAddrs},
    time::Duration,
};

use anyhow::Context;
use clap::Parser;
use dns_forwarder::{constants, DnsServer, ServerConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dns-forwarder")]
#[command(version)]
#[command(about = "Answers DNS queries locally or by forwarding each question upstream")]
struct Cli {
    /// Address to listen on
    #[arg(short = 'b', long, default_value = constants::DEFAULT_BIND_ADDRESS)]
    bind: SocketAddr,

    /// Upstream resolver to forward questions to (host:port)
    #[arg(short = 'r', long, value_name = "ADDR")]
    resolver: Option<String>,

    /// Upstream reply timeout in milliseconds
    #[arg(long, default_value_t = 2000)]
    timeout_ms: u64,

    /// Questions of one query forwarded concurrently
    #[arg(long, default_value_t = 1)]
    max_in_flight: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

fn init_logging(log_level: Option<&str>) {
    let filter = match log_level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn resolve_upstream(addr: &str) -> anyhow::Result<SocketAddr> {
    addr.to_socket_addrs()
        .with_context(|| format!("Failed to resolve forward address {}", addr))?
        .next()
        .with_context(|| format!("No address found for {}", addr))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref());

    let upstream = cli.resolver.as_deref().map(resolve_upstream).transpose()?;
    let config = ServerConfig {
        bind: cli.bind,
        upstream,
        upstream_timeout: Duration::from_millis(cli.timeout_ms),
        max_in_flight: cli.max_in_flight,
    };

    info!(
        "Starting dns-forwarder v{} (upstream: {:?})",
        env!("CARGO_PKG_VERSION"),
        config.upstream
    );

    let server = DnsServer::bind(&config)
        .with_context(|| format!("Failed to bind to address {}", config.bind))?;
    server.serve()?;
    Ok(())
}
