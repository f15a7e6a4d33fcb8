//! Command-line interface

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Joinery Manager - certificate-gated project management API
#[derive(Parser, Debug)]
#[command(name = "joinery-manager")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short, long, env = "JOINERY_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, env = "JOINERY_PORT")]
    pub port: Option<u16>,

    /// Host to bind to
    #[arg(long, env = "JOINERY_HOST")]
    pub host: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "JOINERY_LOG_LEVEL", global = true)]
    pub log_level: String,

    /// Log format (text, json)
    #[arg(long, env = "JOINERY_LOG_FORMAT", global = true)]
    pub log_format: Option<String>,

    /// Subcommand (optional - defaults to server mode)
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the API server (default)
    Serve,

    /// Certificate management commands (offline, no running server required)
    #[command(subcommand)]
    Cert(CertCommand),
}

/// Certificate subcommands
#[derive(Subcommand, Debug)]
pub enum CertCommand {
    /// Issue a new client certificate
    Issue {
        /// Client name the certificate is issued to
        #[arg(long)]
        name: String,

        /// Client email address
        #[arg(long)]
        email: String,

        /// Validity period in days (1-3650)
        #[arg(long, default_value_t = 365)]
        days: u16,
    },

    /// List issued certificates, most recent first
    List,

    /// Revoke a certificate by its identifier
    Revoke {
        /// Certificate identifier to revoke
        #[arg(required = true)]
        certificate_id: String,
    },
}
