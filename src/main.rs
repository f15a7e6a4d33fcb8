//! Joinery Manager - certificate-gated project management API

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};

use joinery_manager::{
    auth::{CertificateIssuer, CertificateStore, FileCertificateStore, KeyAuthority, RevokeOutcome},
    cli::{CertCommand, Cli, Command},
    config::Config,
    server::Server,
    setup_tracing,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup tracing
    if let Err(e) = setup_tracing(&cli.log_level, cli.log_format.as_deref()) {
        eprintln!("Failed to setup tracing: {e}");
        return ExitCode::FAILURE;
    }

    // Handle subcommands
    match cli.command {
        Some(Command::Cert(cert_cmd)) => run_cert_command(cli.config.as_deref(), cert_cmd).await,
        Some(Command::Serve) | None => run_server(cli).await,
    }
}

/// Run certificate management commands against the local key and store
/// files, without a running server.
async fn run_cert_command(config_path: Option<&std::path::Path>, cmd: CertCommand) -> ExitCode {
    let config = match Config::load(config_path) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    let keys = match KeyAuthority::initialize(&config.auth.keys_dir) {
        Ok(k) => Arc::new(k),
        Err(e) => {
            eprintln!("❌ Key initialization failed: {e}");
            return ExitCode::FAILURE;
        }
    };
    let store: Arc<dyn CertificateStore> = match FileCertificateStore::open(&config.auth.store_path)
    {
        Ok(s) => s,
        Err(e) => {
            eprintln!("❌ Failed to open certificate store: {e}");
            return ExitCode::FAILURE;
        }
    };

    match cmd {
        CertCommand::Issue { name, email, days } => {
            let issuer = CertificateIssuer::new(keys, store);
            match issuer.issue(&name, &email, days).await {
                Ok(issued) => {
                    println!("✅ Certificate issued");
                    println!("   ID:      {}", issued.certificate_id);
                    println!("   Client:  {} <{}>", issued.client_name, issued.client_email);
                    println!("   Expires: {}", issued.expires_at.to_rfc3339());
                    println!();
                    println!("{}", issued.certificate);
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    eprintln!("❌ Issuance failed: {e}");
                    ExitCode::FAILURE
                }
            }
        }

        CertCommand::List => {
            let records = store.list().await;
            if records.is_empty() {
                println!("No certificates issued.");
                return ExitCode::SUCCESS;
            }
            println!("Found {} certificate(s):\n", records.len());
            for record in records {
                let state = if record.is_active { "active" } else { "revoked" };
                println!("  {} [{}]", record.certificate_id, state);
                println!("    Client:  {} <{}>", record.client_name, record.client_email);
                println!("    Expires: {}", record.expires_at.to_rfc3339());
            }
            ExitCode::SUCCESS
        }

        CertCommand::Revoke { certificate_id } => match store.revoke(&certificate_id).await {
            Ok(RevokeOutcome::Revoked) => {
                println!("✅ Certificate {certificate_id} revoked");
                ExitCode::SUCCESS
            }
            Ok(RevokeOutcome::NotFound) => {
                eprintln!("❌ No certificate with id {certificate_id}");
                ExitCode::FAILURE
            }
            Err(e) => {
                eprintln!("❌ Revocation failed: {e}");
                ExitCode::FAILURE
            }
        },
    }
}

/// Run the API server
async fn run_server(cli: Cli) -> ExitCode {
    // Load configuration
    let config = match Config::load(cli.config.as_deref()) {
        Ok(mut config) => {
            // Apply CLI overrides
            if let Some(port) = cli.port {
                config.server.port = port;
            }
            if let Some(ref host) = cli.host {
                config.server.host = host.clone();
            }
            config
        }
        Err(e) => {
            error!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    info!(
        version = env!("CARGO_PKG_VERSION"),
        port = config.server.port,
        "Starting Joinery Manager"
    );

    if let Err(e) = Server::new(config).run().await {
        error!("Server error: {e}");
        return ExitCode::FAILURE;
    }

    info!("Shutdown complete");
    ExitCode::SUCCESS
}
