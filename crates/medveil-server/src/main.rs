//! MedVeil Server CLI
//!
//! Starts the HTTP server for medical queries, attestation and audit access.

use anyhow::Context;
use clap::Parser;
use medveil_crypto::CipherContext;
use medveil_server::{config::ServerConfig, start_server};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

/// MedVeil - private medical inference demo service
#[derive(Debug, Parser)]
#[command(name = "medveil-server", version, about)]
struct Args {
    /// TOML configuration file
    #[arg(long, env = "MEDVEIL_CONFIG")]
    config: Option<PathBuf>,

    /// Address to bind (overrides the file)
    #[arg(long, env = "MEDVEIL_BIND_ADDRESS")]
    bind_address: Option<String>,

    /// Port to bind (overrides the file)
    #[arg(long, env = "MEDVEIL_PORT")]
    port: Option<u16>,

    /// Print a fresh base64 encryption key and exit
    #[arg(long)]
    generate_key: bool,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.generate_key {
        println!("{}", CipherContext::generate_key_base64());
        return Ok(());
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut config = match &args.config {
        Some(path) => ServerConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => {
            eprintln!("Warning: No config file specified, using defaults");
            eprintln!("Usage: medveil-server --config <path-to-config.toml>");
            ServerConfig::default()
        }
    };

    config.apply_env_overrides();
    if let Some(address) = args.bind_address {
        config.bind_address = address;
    }
    if let Some(port) = args.port {
        config.bind_port = port;
    }

    start_server(config).await?;
    Ok(())
}
