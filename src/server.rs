//! Server bootstrap — wires the key authority, store, and services into the
//! router and runs the HTTP listener until shutdown.

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};

use crate::auth::{
    AccessGate, AdminAuthority, CertificateIssuer, CertificateStore, CertificateVerifier,
    FileCertificateStore, KeyAuthority,
};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::router::{AppState, create_router};

/// The certificate authentication server.
pub struct Server {
    config: Config,
}

impl Server {
    /// Create a server from configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Run the server until a shutdown signal arrives.
    ///
    /// # Errors
    ///
    /// Returns [`Error::KeyInit`] when the signing keypair cannot be loaded
    /// or generated (fatal, nothing is served), [`Error::Store`] when the
    /// certificate store cannot be opened, and [`Error::Internal`] on
    /// listener failures.
    pub async fn run(self) -> Result<()> {
        // Fatal if the keypair cannot be established: serving without a
        // working signing key would reject every certificate.
        let keys = Arc::new(KeyAuthority::initialize(&self.config.auth.keys_dir)?);
        let store: Arc<dyn CertificateStore> =
            FileCertificateStore::open(&self.config.auth.store_path)?;

        let issuer = Arc::new(CertificateIssuer::new(Arc::clone(&keys), Arc::clone(&store)));
        let verifier = Arc::new(CertificateVerifier::new(
            Arc::clone(&keys),
            Arc::clone(&store),
        ));
        let admin = AdminAuthority::new(self.config.auth.resolve_admin_token());
        let gate = Arc::new(AccessGate {
            verifier: Arc::clone(&verifier),
            public_paths: self.config.auth.public_paths.clone(),
        });

        let state = Arc::new(AppState {
            issuer,
            verifier,
            store,
            admin: admin.clone(),
            gate,
        });

        let app = create_router(state);

        let addr = format!("{}:{}", self.config.server.host, self.config.server.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| Error::Internal(format!("Cannot bind {addr}: {e}")))?;

        info!("============================================================");
        info!("JOINERY PROJECT MANAGER v{}", env!("CARGO_PKG_VERSION"));
        info!("============================================================");
        info!(host = %self.config.server.host, port = %self.config.server.port, "Listening");
        info!(
            keys_dir = %self.config.auth.keys_dir.display(),
            store = %self.config.auth.store_path.display(),
            "Certificate authority ready"
        );

        if admin.is_configured() {
            info!("ADMIN endpoints enabled (shared secret configured)");
        } else {
            warn!("ADMIN secret not configured - management endpoints return 503");
        }

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| Error::Internal(e.to_string()))?;

        info!("Server stopped");
        Ok(())
    }
}

/// Shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received");
}
