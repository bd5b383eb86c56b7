//! MedVeil Server
//!
//! HTTP surface of the medical private-inference demo. Queries run through
//! [`pipeline::QueryPipeline`]; every completed or failed query is recorded in
//! the audit log before the response leaves.

#![warn(missing_docs)]

pub mod audit_io;
pub mod config;
pub mod handlers;
pub mod pipeline;

use config::ServerConfig;
use handlers::{create_router, AppState};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::info;

/// Server error
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// A component could not be built
    #[error("Startup failed: {0}")]
    Startup(String),

    /// Server binding error
    #[error("Failed to bind server: {0}")]
    Bind(#[from] std::io::Error),

    /// Server error
    #[error("Server error: {0}")]
    Server(String),
}

/// Start the HTTP server
///
/// Validates configuration, builds every component and serves until the
/// process is stopped.
pub async fn start_server(config: ServerConfig) -> Result<(), ServerError> {
    config.validate()?;

    info!("Starting MedVeil server");
    info!("Bind address: {}", config.bind_addr());
    info!("Model: {}", config.inference.model);
    info!("Audit backend: {:?}", config.audit.backend);

    let bind_addr = config.bind_addr();
    let state = AppState::from_config(config)?;
    if !state.provider.has_credential() {
        info!("No inference credential configured; queries will return 503");
    }

    let app = create_router(state);

    let listener = TcpListener::bind(&bind_addr).await?;
    info!("Server listening on {}", bind_addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .map_err(|e| ServerError::Server(e.to_string()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_from_test_config() {
        let state = AppState::from_config(ServerConfig::default_test_config()).unwrap();
        assert!(state.provider.has_credential());
        assert_eq!(state.audit.backend(), medveil_audit::AuditBackend::Memory);
    }

    #[test]
    fn test_configured_key_is_used() {
        let mut config = ServerConfig::default_test_config();
        let key = medveil_crypto::CipherContext::generate_key_base64();
        config.encryption.key = Some(key.clone());

        let state = AppState::from_config(config).unwrap();
        let expected = medveil_crypto::CipherContext::from_base64_key(&key).unwrap();
        assert_eq!(state.cipher.key_id(), expected.key_id());
    }
}
