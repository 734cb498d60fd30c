#![forbid(unsafe_code)]
//! Ledger node: serves the HTTP API for one participant in the network

use clap::Parser;
use ledgerchain::api::run_api_server;
use ledgerchain::config::{load_config, DEFAULT_CONFIG_PATH};
use ledgerchain::node::Node;
use std::sync::Arc;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: String,
    /// Port to listen on, overriding the configuration file
    #[arg(short, long)]
    port: Option<u16>,
    /// Peer location to register at startup; may be repeated
    #[arg(long = "peer")]
    peers: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let mut config = load_config(&cli.config)?;
    if let Some(port) = cli.port {
        config.network.api_port = port;
    }
    config.network.bootstrap_peers.extend(cli.peers);
    config.validate()?;

    let addr = config.network.bind_socket_addr().await?;

    let node = Arc::new(Node::new(&config));
    tracing::info!(
        node_identifier = %node.node_identifier(),
        config = %cli.config,
        "ledger-node starting"
    );

    run_api_server(node, addr).await?;
    Ok(())
}
