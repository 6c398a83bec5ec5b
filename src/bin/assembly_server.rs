//! Companion multi-agent demo server binary.

use std::path::PathBuf;

use assembly::server::{AgentServer, ServerConfig};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Assembly agent server: REST + WebSocket query fan-out.
#[derive(Parser)]
#[command(name = "assembly-server", version, about)]
struct Cli {
    /// Host to bind.
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Port to bind.
    #[arg(long, default_value_t = 3000)]
    port: u16,

    /// Directory of agent descriptor JSON files; seeded from the built-in
    /// personas when omitted.
    #[arg(long)]
    agents_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("assembly=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = ServerConfig {
        host: cli.host,
        port: cli.port,
        agents_dir: cli.agents_dir,
    };

    let server = AgentServer::start(&config).await?;
    println!("Agent server running on http://{}", server.addr());
    println!("WebSocket channel at ws://{}/ws", server.addr());

    tokio::signal::ctrl_c().await?;
    info!("received Ctrl+C, shutting down...");
    server.shutdown();
    Ok(())
}
