//! Joinery Manager API
//!
//! REST backend for a small joinery business-management application
//! (project, cost, and revenue tracking). Access is gated entirely by
//! admin-issued client certificates — there is no self-registration.
//!
//! # Authentication model
//!
//! - The admin mints signed certificates (ES256 JWTs) bound to a client
//!   identity and an expiry, via the HTTP API or the `cert` CLI.
//! - Clients present the certificate as a bearer credential on every request.
//! - Every certificate is verified per request: signature, expiry, and
//!   revocation state against the durable certificate store.
//! - Admin management endpoints are guarded by a separate shared secret,
//!   compared in constant time.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod router;
pub mod server;

pub use error::{Error, Result};

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Issuer name embedded in every certificate's claims
pub const CERTIFICATE_ISSUER: &str = "Joinery Project Manager";

/// Setup tracing/logging
pub fn setup_tracing(level: &str, format: Option<&str>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::registry().with(filter);

    match format {
        Some("json") => {
            subscriber.with(fmt::layer().json()).init();
        }
        _ => {
            subscriber.with(fmt::layer()).init();
        }
    }

    Ok(())
}
